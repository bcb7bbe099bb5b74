use crate::commands::common::{open_context, resolve_note_id, GlobalOptions};
use crate::error::CliError;

pub async fn run_delete(id: &str, options: &GlobalOptions) -> Result<(), CliError> {
    let ctx = open_context(options).await?;
    let note_id = resolve_note_id(id, ctx.store.as_ref()).await?;

    ctx.engine.delete_note(&note_id).await?;
    println!("{note_id}");
    Ok(())
}
