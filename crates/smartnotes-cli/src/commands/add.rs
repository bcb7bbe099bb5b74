use smartnotes_core::NoteDraft;

use crate::commands::common::{open_context, resolve_note_content, sync_state_label, GlobalOptions};
use crate::error::CliError;

pub async fn run_add(
    title: &str,
    content_parts: &[String],
    options: &GlobalOptions,
) -> Result<(), CliError> {
    let content = resolve_note_content(content_parts)?;

    let ctx = open_context(options).await?;
    let note = ctx
        .engine
        .create_note(NoteDraft::new(title, content))
        .await?;

    println!("{}", note.id);
    if !note.is_synced {
        eprintln!("Saved locally ({})", sync_state_label(&note));
    }
    Ok(())
}
