use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tokio::fs;

use crate::cli::context::CliContext;
use crate::config::AppConfig;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration, environment overrides included
    Show,

    /// Validate the configuration file and overrides
    Validate,
}

pub async fn cmd_config(args: ConfigArgs, ctx: &CliContext) -> Result<()> {
    let path = ctx.config_path();
    match args.action {
        ConfigAction::Show => {
            println!("Current configuration ({}):", path.display());
            println!("{}", ctx.config().to_yaml()?);
        }
        ConfigAction::Validate => {
            if fs::try_exists(path).await? {
                // Re-read so the report is about the file itself.
                AppConfig::read_file(path)
                    .await
                    .with_context(|| format!("validating {}", path.display()))?;
                ctx.config()
                    .validate()
                    .with_context(|| format!("validating {}", path.display()))?;
                println!("Configuration file {} is valid", path.display());
            } else {
                ctx.config().validate().context("validating defaults")?;
                println!(
                    "No configuration file at {}; defaults are valid",
                    path.display()
                );
            }
        }
    }

    Ok(())
}
