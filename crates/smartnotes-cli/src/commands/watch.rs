use std::sync::Arc;

use smartnotes_core::connectivity::HttpProbe;

use crate::commands::common::{open_context, GlobalOptions};
use crate::error::CliError;

/// Poll reachability and drain on every reconnect until interrupted.
pub async fn run_watch(options: &GlobalOptions) -> Result<(), CliError> {
    let ctx = open_context(options).await?;
    if !ctx.engine.has_token() {
        return Err(CliError::NotSignedIn);
    }

    let probe = HttpProbe::new(&ctx.config.api_base_url, ctx.config.request_timeout())?;
    let polling = ctx
        .monitor
        .spawn_polling(Arc::new(probe), ctx.config.probe_interval());
    let auto_drain = ctx.engine.spawn_auto_drain();

    println!(
        "Watching {} every {}s (Ctrl-C to stop)",
        ctx.config.api_base_url, ctx.config.probe_interval_secs
    );
    tokio::signal::ctrl_c().await?;

    auto_drain.stop();
    polling.abort();
    let pending = ctx.engine.pending_count().await?;
    println!("Stopped; {pending} change(s) pending");
    Ok(())
}
