use serde::Serialize;

use crate::commands::common::{
    entry_to_pending_item, format_pending_lines, open_context, GlobalOptions, PendingItem,
};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub api_base_url: String,
    pub online: bool,
    pub signed_in: bool,
    pub pending: Vec<PendingItem>,
}

pub async fn run_status(as_json: bool, options: &GlobalOptions) -> Result<(), CliError> {
    let ctx = open_context(options).await?;
    let entries = ctx.engine.pending_entries().await?;

    let report = StatusReport {
        api_base_url: ctx.config.api_base_url.clone(),
        online: ctx.engine.is_online(),
        signed_in: ctx.engine.has_token(),
        pending: entries.iter().map(entry_to_pending_item).collect(),
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("server:    {}", report.api_base_url);
    println!(
        "network:   {}",
        if report.online { "online" } else { "offline" }
    );
    println!(
        "signed in: {}",
        if report.signed_in { "yes" } else { "no" }
    );
    println!("pending:   {}", report.pending.len());
    for line in format_pending_lines(&entries) {
        println!("  {line}");
    }
    Ok(())
}
