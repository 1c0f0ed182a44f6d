//! imgkit - OS plumbing helpers for image builds
//!
//! Thin CLI over the `imgkit-platform` helpers: os-release and env file
//! parsing, invoking-user resolution, resource limits, and running commands
//! under scoped locks, umask, directory and environment.

mod cli;
mod display;
mod error;

use crate::cli::{Cli, Commands};
use crate::display::{CommandResult, OutputRenderer};
use crate::error::CliError;
use clap::Parser;
use imgkit_config::Config;
use imgkit_platform::{
    format_rlimit, invoking_user, probe_tool, read_env_file, read_os_release, sort_packages,
    with_chdir, with_flock, with_scoped_env, with_umask, Resource,
};
use std::collections::BTreeMap;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    match run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            error!("Application error: {}", e);
            eprintln!("Error: {e}");
            process::exit(if json_mode { 2 } else { 1 });
        }
    }
}

/// Main application logic; returns the process exit code
async fn run(cli: Cli) -> Result<i32, CliError> {
    // 1. Start with file config (or defaults)
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;

    // 2. Merge environment variables
    config.merge_env()?;

    // Fix the invoking user before `run` can override SUDO_UID and friends
    invoking_user();

    init_tracing(cli.global.json, cli.global.debug, &config.general.log_level);
    info!("Starting imgkit v{}", env!("CARGO_PKG_VERSION"));

    // 3. Apply CLI flags (highest precedence)
    apply_cli_config(&mut config, &cli.command);

    let renderer = OutputRenderer::new(cli.global.json);
    let result = execute_command(cli.command, &config).await?;
    renderer.render_result(&result)?;

    debug!("Command completed successfully");
    Ok(match result {
        CommandResult::Exit(code) => code,
        _ => 0,
    })
}

/// Execute the specified command
async fn execute_command(command: Commands, config: &Config) -> Result<CommandResult, CliError> {
    match command {
        Commands::OsRelease { .. } => {
            let release = read_os_release(config.root_path())?;
            Ok(CommandResult::Vars(sorted_pairs(release)))
        }

        Commands::EnvFile { path } => {
            let vars = read_env_file(&path)?;
            Ok(CommandResult::Vars(sorted_pairs(vars)))
        }

        Commands::Whoami => {
            let user = invoking_user();
            user.init()?;
            let rows = vec![
                ("name".to_string(), user.name()?.to_string()),
                ("uid".to_string(), user.uid().to_string()),
                ("gid".to_string(), user.gid().to_string()),
                ("home".to_string(), user.home()?.display().to_string()),
                (
                    "invoked_as_root".to_string(),
                    user.invoked_as_root().to_string(),
                ),
                (
                    "is_running_user".to_string(),
                    user.is_running_user().to_string(),
                ),
            ];
            Ok(CommandResult::Table {
                header: ["Field", "Value"],
                rows,
            })
        }

        Commands::Rlimits => {
            let rows = Resource::all()
                .into_iter()
                .map(|resource| Ok((resource.to_string(), format_rlimit(resource)?)))
                .collect::<Result<Vec<_>, CliError>>()?;
            Ok(CommandResult::Table {
                header: ["Resource", "Soft:Hard"],
                rows,
            })
        }

        Commands::SortPackages { packages } => Ok(CommandResult::List(sort_packages(packages))),

        Commands::Probe { tools } => {
            let rows = tools
                .into_iter()
                .map(|tool| {
                    let location = probe_tool(&tool)
                        .map_or_else(|| "not found".to_string(), |p| p.display().to_string());
                    (tool, location)
                })
                .collect();
            Ok(CommandResult::Table {
                header: ["Tool", "Location"],
                rows,
            })
        }

        Commands::Run {
            chdir,
            env,
            command,
            ..
        } => {
            let plan = RunPlan {
                lock: config.paths.lock_file.clone(),
                umask: config.process.umask,
                chdir,
                env: merged_env(&config.process.env, env),
                command,
            };
            let code = tokio::task::spawn_blocking(move || plan.execute())
                .await
                .map_err(|e| imgkit_errors::Error::internal(format!("run task failed: {e}")))??;
            Ok(CommandResult::Exit(code))
        }
    }
}

fn sorted_pairs(map: std::collections::HashMap<String, String>) -> Vec<(String, String)> {
    map.into_iter().collect::<BTreeMap<_, _>>().into_iter().collect()
}

fn merged_env(
    configured: &BTreeMap<String, String>,
    cli: Vec<(String, String)>,
) -> BTreeMap<String, String> {
    let mut env = configured.clone();
    env.extend(cli);
    env
}

/// Everything `imgkit run` needs, resolved from config and flags
struct RunPlan {
    lock: Option<PathBuf>,
    umask: Option<u32>,
    chdir: Option<PathBuf>,
    env: BTreeMap<String, String>,
    command: Vec<String>,
}

impl RunPlan {
    /// Run the command; the lock is taken first and released last
    fn execute(&self) -> Result<i32, imgkit_errors::Error> {
        match &self.lock {
            Some(path) => with_flock(path, |_| self.execute_unlocked()),
            None => self.execute_unlocked(),
        }
    }

    fn execute_unlocked(&self) -> Result<i32, imgkit_errors::Error> {
        match self.umask {
            Some(mask) => with_umask(mask, || self.execute_in_env()),
            None => self.execute_in_env(),
        }
    }

    fn execute_in_env(&self) -> Result<i32, imgkit_errors::Error> {
        with_scoped_env(&self.env, || match &self.chdir {
            Some(dir) => with_chdir(dir, || self.spawn()),
            None => self.spawn(),
        })
    }

    fn spawn(&self) -> Result<i32, imgkit_errors::Error> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(imgkit_errors::Error::internal("no command given"));
        };
        debug!("running {program} {args:?}");

        let status = process::Command::new(program)
            .args(args)
            .status()
            .map_err(|e| imgkit_errors::Error::io_with_path(&e, Path::new(program)))?;

        Ok(status
            .code()
            .or_else(|| status.signal().map(|signal| 128 + signal))
            .unwrap_or(1))
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, command: &Commands) {
    match command {
        Commands::OsRelease { root: Some(root) } => {
            config.paths.root = Some(root.clone());
        }
        Commands::Run { lock, umask, .. } => {
            if let Some(lock) = lock {
                config.paths.lock_file = Some(lock.clone());
            }
            if let Some(umask) = umask {
                config.process.umask = Some(*umask);
            }
        }
        _ => {}
    }
}

fn init_tracing(json_mode: bool, debug_enabled: bool, configured_level: &str) {
    let default_filter = if debug_enabled {
        "debug"
    } else {
        configured_level
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    if json_mode {
        // Keep stdout clean for the JSON result
        tracing_subscriber::fmt()
            .json()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(filter)
            .init();
    }
}
