#[cfg(test)]
mod common;


#[cfg(test)]
mod program_test;

#[cfg(test)]
mod rule_base_test;
