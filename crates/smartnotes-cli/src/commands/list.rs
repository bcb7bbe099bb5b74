use crate::commands::common::{
    format_note_lines, note_to_list_item, open_context, GlobalOptions, NoteListItem,
};
use crate::error::CliError;

pub async fn run_list(limit: usize, as_json: bool, options: &GlobalOptions) -> Result<(), CliError> {
    let ctx = open_context(options).await?;
    let mut notes = ctx.engine.get_notes().await?;
    notes.truncate(limit);

    if as_json {
        let json_items = notes
            .iter()
            .map(note_to_list_item)
            .collect::<Vec<NoteListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if notes.is_empty() {
        println!("No notes yet.");
        return Ok(());
    }

    for line in format_note_lines(&notes) {
        println!("{line}");
    }
    if !ctx.engine.is_online() {
        eprintln!("(offline: showing local copies)");
    }
    Ok(())
}
