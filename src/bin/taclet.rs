// The taclet CLI.
// You can list a rule base, export the builtin rules as JSON, or watch a small proof run.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mimalloc::MiMalloc;
use taclet::kernel::operator::{Function, Junctor};
use taclet::kernel::term::{Term, TermError};
use taclet::proof::Proof;
use taclet::rule_base::{RuleBase, RuleBaseError};
use taclet::sequent::{Sequent, SequentFormula};
use taclet::settings::ProofSettings;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
#[clap(
    name = "taclet",
    about = "A taclet matching and application engine",
    version = env!("CARGO_PKG_VERSION")
)]
struct Args {
    /// A JSON rule base to use instead of the builtin rules
    #[clap(long, global = true, value_name = "FILE")]
    rules: Option<PathBuf>,

    /// A JSON file with proof settings
    #[clap(long, global = true, value_name = "FILE")]
    settings: Option<PathBuf>,

    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List the taclets of the rule base (default)
    Rules,

    /// Write the rule base as JSON
    Export {
        #[clap(value_name = "FILE")]
        file: PathBuf,
    },

    /// Prove a small propositional sequent, showing the proof tree
    Demo {
        /// The most rule applications to try
        #[clap(long, default_value = "100")]
        steps: usize,
    },
}

// The order the demo tries rules in. Closing rules first, branching rules last.
const DEMO_STRATEGY: [&str; 11] = [
    "close",
    "closeTrue",
    "closeFalse",
    "impRight",
    "andLeft",
    "orRight",
    "notLeft",
    "notRight",
    "andRight",
    "orLeft",
    "impLeft",
];

// ==> imp(and(p, q), and(q, p))
fn demo_sequent() -> Result<Sequent, TermError> {
    let p = Term::func(&Function::predicate("p", vec![]), vec![])?;
    let q = Term::func(&Function::predicate("q", vec![]), vec![])?;
    let left = Term::junctor(Junctor::And, vec![p.clone(), q.clone()])?;
    let right = Term::junctor(Junctor::And, vec![q, p])?;
    let goal = Term::junctor(Junctor::Imp, vec![left, right])?;
    Ok(Sequent::from_formulas(vec![], vec![SequentFormula::new(goal)?]))
}

fn run_demo(rules: &RuleBase, settings: ProofSettings, steps: usize) -> Result<(), String> {
    let sequent = demo_sequent().map_err(|e| e.to_string())?;
    let mut proof = Proof::new(sequent, rules.index(), settings);
    for _ in 0..steps {
        let Some(goal) = proof.open_goals().first().map(|g| g.node) else {
            break;
        };
        let app = proof
            .all_applications(goal)
            .into_iter()
            .filter_map(|app| {
                DEMO_STRATEGY
                    .iter()
                    .position(|name| *name == app.taclet().name.as_str())
                    .map(|rank| (rank, app))
            })
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, app)| app);
        let Some(app) = app else {
            println!("no rule applies to goal {}", goal);
            break;
        };
        proof.apply(goal, &app).map_err(|e| e.to_string())?;
    }
    print!("{}", proof);
    if proof.is_closed() {
        println!("proof closed");
    } else {
        println!("{} open goals", proof.open_goals().len());
    }
    Ok(())
}

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_ansi(false).without_time())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args = Args::parse();

    let rules: Result<RuleBase, RuleBaseError> = match &args.rules {
        Some(path) => RuleBase::load(path),
        None => RuleBase::builtin(),
    };
    let rules = match rules {
        Ok(rules) => rules,
        Err(e) => {
            println!("Error loading rules: {}", e);
            std::process::exit(1);
        }
    };

    let settings = match &args.settings {
        Some(path) => match ProofSettings::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                println!("Error loading settings: {}", e);
                std::process::exit(1);
            }
        },
        None => ProofSettings::default(),
    };

    match args.command.unwrap_or(Command::Rules) {
        Command::Rules => {
            for taclet in rules.iter() {
                println!("{}", taclet);
            }
        }
        Command::Export { file } => {
            if let Err(e) = rules.save(&file) {
                println!("Error: {}", e);
                std::process::exit(1);
            }
            println!("{} taclets written to {}", rules.len(), file.display());
        }
        Command::Demo { steps } => {
            if let Err(e) = run_demo(&rules, settings, steps) {
                println!("Error: {}", e);
                std::process::exit(1);
            }
        }
    }
}
