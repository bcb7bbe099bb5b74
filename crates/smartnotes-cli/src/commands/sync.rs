use crate::commands::common::{open_context, GlobalOptions};
use crate::error::CliError;

pub async fn run_sync(as_json: bool, options: &GlobalOptions) -> Result<(), CliError> {
    let ctx = open_context(options).await?;
    let report = ctx.engine.drain().await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }

    if report.skipped.is_none() && !report.is_complete() {
        return Err(CliError::SyncIncomplete(report.remaining));
    }
    Ok(())
}
