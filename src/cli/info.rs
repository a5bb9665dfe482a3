use anyhow::Result;

use crate::cli::context::CliContext;

pub fn cmd_info(ctx: &CliContext) -> Result<()> {
    let config = ctx.config();

    println!("TestPilot System Information");
    println!("============================");
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Build Date: {}", env!("BUILD_DATE"));
    println!("Git Commit: {}", env!("GIT_HASH"));
    println!("Git Branch: {}", env!("GIT_BRANCH"));
    println!();

    println!("Configuration:");
    println!("- Config File: {}", ctx.config_path().display());
    println!("- Result Cache: {}", config.cache.path.display());
    println!("- Lock Timeout: {}ms", config.cache.lock_timeout_ms);
    println!(
        "- Planning Limits: depth={} backtracks={} ungrounded={}",
        config.planning.max_depth,
        config.planning.max_backtracks,
        config.planning.max_ungrounded_retries
    );
    match config.planning.wall_clock_timeout_ms {
        Some(ms) => println!("- Wall-clock Timeout: {}ms", ms),
        None => println!("- Wall-clock Timeout: none"),
    }

    Ok(())
}
