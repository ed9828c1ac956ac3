use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::date_key::parse_date_key;

/// Day notes keyed by calendar day, as consumed by the calendar aggregator.
pub type NoteMap = BTreeMap<NaiveDate, String>;

/// A committed journal note. At most one exists per (account_id, date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalNote {
    pub account_id: String,
    pub date: NaiveDate,
    pub content: String,
    pub updated_at: i64, // Unix milliseconds
}

/// Note row as returned by the note store listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteRecord {
    pub date: String, // YYYY-MM-DD
    pub content: String,
    #[serde(default)]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoteKey {
    pub account_id: String,
    pub date: NaiveDate,
}

impl NoteKey {
    pub fn new(account_id: &str, date: NaiveDate) -> Self {
        Self {
            account_id: account_id.to_string(),
            date,
        }
    }
}

/// Collapse store rows into one note per day. Duplicate days resolve to the
/// most recent `updated_at`; rows without a timestamp lose to rows with one,
/// and equal timestamps go to the later row. Malformed dates are skipped.
pub fn collapse_note_records(records: Vec<NoteRecord>) -> NoteMap {
    let mut latest: BTreeMap<NaiveDate, (Option<i64>, String)> = BTreeMap::new();

    for record in records {
        let date = match parse_date_key(&record.date) {
            Ok(date) => date,
            Err(e) => {
                log::warn!("Skipping note with malformed date: {}", e);
                continue;
            }
        };

        match latest.get(&date) {
            Some((existing, _)) if *existing > record.updated_at => {}
            _ => {
                latest.insert(date, (record.updated_at, record.content));
            }
        }
    }

    latest
        .into_iter()
        .map(|(date, (_, content))| (date, content))
        .collect()
}
