use crate::commands::common::{open_context, resolve_note_id, GlobalOptions};
use crate::error::CliError;

pub async fn run_summarize(
    id: Option<&str>,
    text: Option<&str>,
    options: &GlobalOptions,
) -> Result<(), CliError> {
    let ctx = open_context(options).await?;

    let summary = match (id, text) {
        (_, Some(text)) => ctx.engine.summarize_text(text).await?,
        (Some(id), None) => {
            let note_id = resolve_note_id(id, ctx.store.as_ref()).await?;
            ctx.engine.summarize_note(&note_id).await?.summary
        }
        (None, None) => return Err(CliError::EmptyContent),
    };

    println!("{summary}");
    Ok(())
}
