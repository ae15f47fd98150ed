pub mod executor;
pub mod goal;
pub mod kernel;
pub mod namer;
pub mod node;
pub mod proof;
pub mod rule_base;
pub mod sequent;
pub mod settings;
pub mod taclet;
pub mod taclet_app;
pub mod taclet_index;

#[cfg(test)]
mod tests;
