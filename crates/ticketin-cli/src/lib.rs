//! TicketIn CLI library.
//!
//! This crate provides the command-line interface, the headless commands
//! and the interactive REPL for the ticket pool simulation.

pub mod app;
pub mod cli;
pub mod commands;
pub mod repl;
