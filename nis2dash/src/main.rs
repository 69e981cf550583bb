use std::fs;
use std::path::{Path, PathBuf};
use std::process::{ExitCode, Termination};

use clap::Parser;

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Serve the dashboard data
    Api(dashboard_api::Run),
}

#[derive(clap::Parser, Debug)]
#[command(
    author,
    version = env!("CARGO_PKG_VERSION"),
    about = "Compliance dashboard backend",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

impl Cli {
    async fn run(self) -> ExitCode {
        match self.run_command().await {
            Ok(code) => code,
            Err(err) => {
                eprintln!("Error: {err}");
                for (n, err) in err.chain().skip(1).enumerate() {
                    if n == 0 {
                        eprintln!("Caused by:");
                    }
                    eprintln!("\t{err}");
                }

                ExitCode::FAILURE
            }
        }
    }

    async fn run_command(self) -> anyhow::Result<ExitCode> {
        match self.command {
            Command::Api(run) => run.run(None).await,
        }
    }
}

#[tokio::main]
async fn main() -> impl Termination {
    load_xdg_config();
    Cli::parse().run().await
}

fn config_dir() -> Option<PathBuf> {
    if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
        Some(Path::new(&xdg_config_home).join("nis2dash"))
    } else if let Ok(home) = std::env::var("HOME") {
        Some(Path::new(&home).join(".config").join("nis2dash"))
    } else {
        None
    }
}

/// Every file of the configuration directory becomes an environment variable.
fn load_xdg_config() {
    let Some(config_dir) = config_dir() else {
        return;
    };
    if !config_dir.is_dir() {
        return;
    }

    match config_dir.read_dir() {
        Ok(dir) => {
            for entry in dir.flatten() {
                let Some(var_name) = entry.file_name().to_str().map(ToString::to_string) else {
                    continue;
                };
                if let Ok(var_value) = fs::read_to_string(entry.path()) {
                    std::env::set_var(var_name, var_value.trim());
                }
            }
        }
        Err(err) => {
            eprintln!("Warning: unable to read configuration directory {config_dir:?}: {err}");
        }
    }
}
