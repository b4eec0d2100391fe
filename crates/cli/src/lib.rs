//! The `recurra` command-line front-end.

pub mod cli;
