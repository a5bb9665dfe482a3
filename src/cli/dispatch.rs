use super::cache::cmd_cache;
use super::config::cmd_config;
use super::env::CliArgs;
use super::info::cmd_info;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Cache(args) => cmd_cache(args, ctx).await,
        Commands::Config(args) => cmd_config(args, ctx).await,
        Commands::Info => cmd_info(ctx),
    }
}
