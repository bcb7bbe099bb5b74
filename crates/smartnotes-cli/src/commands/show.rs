use crate::commands::common::{format_note_detail, open_context, resolve_note_id, GlobalOptions};
use crate::error::CliError;

pub async fn run_show(id: &str, as_json: bool, options: &GlobalOptions) -> Result<(), CliError> {
    let ctx = open_context(options).await?;
    let note_id = resolve_note_id(id, ctx.store.as_ref()).await?;
    let note = ctx.engine.get_note(&note_id).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        for line in format_note_detail(&note) {
            println!("{line}");
        }
    }
    Ok(())
}
