//! Command line interface definition

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// imgkit - OS plumbing helpers for image builds
#[derive(Parser)]
#[command(name = "imgkit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "OS plumbing helpers for image builds")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show the os-release of a tree
    #[command(name = "os-release")]
    OsRelease {
        /// Root of the tree (defaults to the configured root, then /)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },

    /// Parse a KEY=value environment file
    #[command(name = "env-file")]
    EnvFile {
        /// File to parse
        path: PathBuf,
    },

    /// Show the user that invoked imgkit (through sudo or pkexec)
    Whoami,

    /// Show soft:hard resource limits
    Rlimits,

    /// Sort package names: plain names, then paths, then conditionals
    #[command(name = "sort-packages")]
    SortPackages {
        /// Package names
        packages: Vec<String>,
    },

    /// Check whether optional tools are installed
    Probe {
        /// Tool names to look up on PATH
        #[arg(required = true)]
        tools: Vec<String>,
    },

    /// Run a command under a file lock, umask, directory and environment
    Run {
        /// Hold an exclusive lock on this file while the command runs
        #[arg(long, value_name = "PATH")]
        lock: Option<PathBuf>,

        /// File-creation mask (octal)
        #[arg(long, value_name = "MODE", value_parser = parse_umask_arg)]
        umask: Option<u32>,

        /// Working directory for the command
        #[arg(long, value_name = "DIR")]
        chdir: Option<PathBuf>,

        /// Extra environment variable (repeatable)
        #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_key_val)]
        env: Vec<(String, String)>,

        /// Command and arguments
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
}

fn parse_umask_arg(value: &str) -> Result<u32, String> {
    imgkit_config::parse_umask("--umask", value).map_err(|e| e.to_string())
}

fn parse_key_val(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.is_empty() => Ok((key.to_string(), val.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{value}'")),
    }
}
