use std::process::Command;

use clap::{Parser, Subcommand};

use holeylight_core::{AppConfig, AppConfigExt};
use holeylight_overlay::LoopExit;

mod logging;
mod simulate;

#[derive(Parser)]
#[command(name = "holeylight")]
#[command(about = "Notification light ring around the display cutout")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine against a headless host and a scripted device
    Simulate(simulate::SimulateArgs),
    /// Print the current configuration
    Config {
        /// Print the config file location instead
        #[arg(long)]
        path: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let _log_guard = logging::init();

    match cli.command {
        Commands::Simulate(args) => {
            if simulate::run(args)? == LoopExit::Restart {
                relaunch()?;
            }
        }
        Commands::Config { path: true } => {
            println!("{}", AppConfig::config_path()?.display());
        }
        Commands::Config { path: false } => {
            print!("{}", AppConfig::load().to_toml()?);
        }
    }
    Ok(())
}

/// Start this binary again with the same arguments and wait for it
fn relaunch() -> Result<(), Box<dyn std::error::Error>> {
    let exe = std::env::current_exe()?;
    tracing::info!(exe = %exe.display(), "Relaunching");
    let status = Command::new(exe)
        .args(std::env::args_os().skip(1))
        .status()?;
    if !status.success() {
        return Err(format!("relaunched process exited with {status}").into());
    }
    Ok(())
}
