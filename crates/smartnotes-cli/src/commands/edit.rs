use smartnotes_core::NotePatch;

use crate::commands::common::{normalize_content, open_context, resolve_note_id, GlobalOptions};
use crate::error::CliError;

pub async fn run_edit(
    id: &str,
    title: Option<&str>,
    content: Option<&str>,
    options: &GlobalOptions,
) -> Result<(), CliError> {
    let patch = build_patch(title, content)?;

    let ctx = open_context(options).await?;
    let note_id = resolve_note_id(id, ctx.store.as_ref()).await?;
    let updated = ctx.engine.update_note(&note_id, patch).await?;

    println!("{}", updated.id);
    Ok(())
}

pub fn build_patch(title: Option<&str>, content: Option<&str>) -> Result<NotePatch, CliError> {
    let mut patch = NotePatch::default();
    if let Some(title) = title {
        patch = patch.title(normalize_content(title).ok_or(CliError::NothingToEdit)?);
    }
    if let Some(content) = content {
        patch = patch.content(normalize_content(content).ok_or(CliError::EmptyContent)?);
    }
    if patch.is_empty() {
        return Err(CliError::NothingToEdit);
    }
    Ok(patch)
}
