use super::state::JournalState;
use crate::error::CoreResult;
use crate::models::{DateWindow, NoteMap, parse_date_key};
use crate::sync::{SaveOutcome, SaveStatus};

/// Save the note for a `YYYY-MM-DD` day. The calendar sees the new content
/// immediately; a store failure rolls it back and notifies the user.
pub async fn save_day_note(
    state: &JournalState,
    account_id: &str,
    date_key: &str,
    content: &str,
) -> CoreResult<SaveOutcome> {
    let date = parse_date_key(date_key)?;
    state.notes.save_note(account_id, date, content).await
}

pub async fn get_day_notes(
    state: &JournalState,
    account_id: &str,
    start_key: &str,
    end_key: &str,
) -> CoreResult<NoteMap> {
    let window = DateWindow::new(parse_date_key(start_key)?, parse_date_key(end_key)?);
    state.notes.load_notes(account_id, window).await
}

pub async fn get_note_save_status(
    state: &JournalState,
    account_id: &str,
    date_key: &str,
) -> CoreResult<SaveStatus> {
    let date = parse_date_key(date_key)?;
    Ok(state.notes.save_status(account_id, date).await)
}
