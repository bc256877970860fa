//! Command-line front end: argument parsing and usage text.

pub mod args;
pub mod help;
