//! Library half of the `adlc` binary: argument definitions and commands.

pub mod cli;
pub mod commands;
