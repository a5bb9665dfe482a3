use anyhow::{bail, Result};
use chrono::{TimeZone, Utc};
use clap::{Args, Subcommand};
use testpilot_core_types::RequestId;
use tracing::info;

use crate::cli::context::CliContext;

#[derive(Args, Clone, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand, Clone, Debug)]
pub enum CacheAction {
    /// Show entry counts and age range
    Stats {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove entries older than the configured maximum age
    Sweep,

    /// Remove every entry
    Reset,

    /// Remove every entry written on behalf of one request
    Purge {
        #[arg(long, value_name = "ID")]
        request_id: String,
    },

    /// Remove a single entry
    Delete {
        #[arg(long, value_name = "HASH")]
        key: String,
    },
}

pub async fn cmd_cache(args: CacheArgs, ctx: &CliContext) -> Result<()> {
    ctx.config().validate()?;
    let cache = ctx.cache();
    let path = cache.config().path.display().to_string();

    match args.action {
        CacheAction::Stats { json } => {
            let Some(stats) = cache.stats().await else {
                bail!("cache lock for {} could not be acquired", path);
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Result cache ({}):", path);
                println!("- Entries: {}", stats.entries);
                println!("- Request ids: {}", stats.request_ids);
                println!("- Oldest entry: {}", format_timestamp(stats.oldest_timestamp));
                println!("- Newest entry: {}", format_timestamp(stats.newest_timestamp));
            }
        }
        CacheAction::Sweep => {
            let removed = cache.sweep_stale().await;
            info!(removed, "cache swept");
            println!("Removed {} stale entries from {}", removed, path);
        }
        CacheAction::Reset => {
            if !cache.reset().await {
                bail!("cache lock for {} could not be acquired", path);
            }
            println!("Cleared {}", path);
        }
        CacheAction::Purge { request_id } => {
            let removed = cache
                .delete_all_for_request_id(&RequestId::from(request_id.as_str()))
                .await;
            println!("Removed {} entries for request {}", removed, request_id);
        }
        CacheAction::Delete { key } => {
            if cache.delete(&key).await {
                println!("Deleted {}", key);
            } else {
                println!("No entry for {}", key);
            }
        }
    }

    Ok(())
}

fn format_timestamp(millis: Option<i64>) -> String {
    millis
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "n/a".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_render_as_rfc3339() {
        assert_eq!(format_timestamp(None), "n/a");
        assert_eq!(format_timestamp(Some(0)), "1970-01-01T00:00:00+00:00");
    }
}
