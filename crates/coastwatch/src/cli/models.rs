//! The `coastwatch models` command.

use clap::{Args, Subcommand};
use coastwatch_core::classify::required_files;
use coastwatch_core::config::BackendChoice;
use coastwatch_core::Config;

/// Arguments for the `models` command.
#[derive(Args, Debug)]
pub struct ModelsArgs {
    #[command(subcommand)]
    pub command: ModelsCommand,
}

/// Subcommands for model inspection.
#[derive(Subcommand, Debug)]
pub enum ModelsCommand {
    /// Show which backends have their files in place
    Status,

    /// Show model directory path
    Path,
}

/// Installation state of one backend.
#[derive(Debug, PartialEq, Eq)]
struct BackendStatus {
    name: &'static str,
    present: usize,
    required: usize,
}

impl BackendStatus {
    fn installed(&self) -> bool {
        self.present == self.required
    }
}

fn backend_statuses(config: &Config) -> Vec<BackendStatus> {
    let files = required_files(config);
    let mut statuses: Vec<BackendStatus> = Vec::new();
    for (backend, path) in &files {
        let present = usize::from(path.exists());
        match statuses.iter_mut().find(|s| s.name == *backend) {
            Some(status) => {
                status.present += present;
                status.required += 1;
            }
            None => statuses.push(BackendStatus {
                name: *backend,
                present,
                required: 1,
            }),
        }
    }
    statuses
}

/// Which backend `auto` would end up with, judged by files on disk.
fn auto_pick(statuses: &[BackendStatus]) -> Option<&'static str> {
    ["semantic", "grid"].into_iter().find(|name| {
        statuses
            .iter()
            .any(|s| s.name == *name && s.installed())
    })
}

pub fn execute(args: ModelsArgs, config: &Config) -> anyhow::Result<()> {
    match args.command {
        ModelsCommand::Status => {
            println!("Model directory: {}", config.model_dir().display());
            println!();
            for (backend, path) in required_files(config) {
                let mark = if path.exists() { "ok" } else { "missing" };
                println!("  [{:<7}] {:<9} {}", mark, backend, path.display());
            }
            println!();

            let statuses = backend_statuses(config);
            let configured = config.classifier.backend;
            let active = match configured {
                BackendChoice::Auto => auto_pick(&statuses),
                BackendChoice::Grid => statuses
                    .iter()
                    .find(|s| s.name == "grid" && s.installed())
                    .map(|s| s.name),
                BackendChoice::Semantic => statuses
                    .iter()
                    .find(|s| s.name == "semantic" && s.installed())
                    .map(|s| s.name),
            };
            match active {
                Some(name) => println!("Configured backend {:?} will use: {}", configured, name),
                None => println!(
                    "Configured backend {:?} has no model files; every upload will get the fallback result.",
                    configured
                ),
            }
        }

        ModelsCommand::Path => {
            println!("{}", config.model_dir().display());
        }
    }

    Ok(())
}
