use std::fmt;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// What happens to the labels of a formula that is added to a sequent which already
/// contains the same formula with different labels.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum LabelMerge {
    // The existing formula gets the union of both label sets.
    #[default]
    Union,

    // The existing formula keeps its labels, the new ones are dropped.
    KeepExisting,
}

/// Settings for rule application in one proof.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProofSettings {
    // Goes between the name of an addrule and its unique suffix.
    pub addrule_infix: String,

    pub label_merge: LabelMerge,

    // The most assumes instantiations a single taclet application will enumerate.
    pub max_assumes_candidates: usize,

    // Goes between the base name of a program variable and its counter, when the
    // variable namer makes a name unique.
    pub rename_separator: String,
}

impl Default for ProofSettings {
    fn default() -> Self {
        Self {
            addrule_infix: "_taclet".to_string(),
            label_merge: LabelMerge::Union,
            max_assumes_candidates: 4096,
            rename_separator: "_".to_string(),
        }
    }
}

impl ProofSettings {
    /// Reads settings from a JSON file. Missing fields get their defaults.
    pub fn load(path: &Path) -> Result<ProofSettings, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        ProofSettings::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<ProofSettings, SettingsError> {
        let settings: ProofSettings = serde_json::from_str(text)?;
        if settings.max_assumes_candidates == 0 {
            return Err(SettingsError::Invalid(
                "max_assumes_candidates must be positive".to_string(),
            ));
        }
        Ok(settings)
    }
}

#[derive(Debug)]
pub enum SettingsError {
    Io(io::Error),
    Json(serde_json::Error),
    Invalid(String),
}

impl From<io::Error> for SettingsError {
    fn from(error: io::Error) -> Self {
        SettingsError::Io(error)
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(error: serde_json::Error) -> Self {
        SettingsError::Json(error)
    }
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "could not read settings: {}", e),
            SettingsError::Json(e) => write!(f, "could not parse settings: {}", e),
            SettingsError::Invalid(message) => write!(f, "invalid settings: {}", message),
        }
    }
}

impl std::error::Error for SettingsError {}
