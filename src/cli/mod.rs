//! CLI command definitions for task-manager
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod client;

use clap::{Parser, Subcommand};
use client::{AddArgs, DeleteArgs, ListArgs, ToggleArgs};

/// Task Manager service and command-line client
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to a SQLite database file (selects the sqlite backend)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Port for the HTTP service (overrides PORT)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// API base URL for client commands (overrides TASKS_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP service (default if no subcommand given)
    Serve,

    /// List all tasks, newest first
    List(ListArgs),

    /// Add a task
    Add(AddArgs),

    /// Flip a task between open and completed
    Toggle(ToggleArgs),

    /// Delete a task
    Delete(DeleteArgs),
}
