pub mod instantiations;
pub mod label;
pub mod matcher;
pub mod name;
pub mod operator;
pub mod program;
pub mod replace;
pub mod schema_variable;
pub mod sort;
pub mod term;
pub mod term_builder;
