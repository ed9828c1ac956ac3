//! Local view of journal notes with optimistic saves.
//!
//! Every (account, date) key moves through `Idle -> Saving -> Committed | RolledBack`.
//! A save writes the new content into the local view before the note store is
//! called, so calendar reads see it immediately. Each key remembers the last
//! value the store is known to hold (fetched or committed); if the store
//! rejects the write only that key is put back to it, and every query for the
//! account is marked stale. Other keys keep whatever they committed or are
//! still saving.
//!
//! Reads are keyed by (account, window). A fetch records the window's
//! generation when it starts. Applying, committing or rolling back a write
//! bumps the generation of every window containing its date, so a fetch that
//! started before the write settled is discarded instead of overwriting it.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::{ApiError, LogNotifier, NoteStore, Notifier};
use crate::error::{CoreError, CoreResult};
use crate::models::{
    DateWindow, JournalNote, NoteKey, NoteMap, collapse_note_records, format_date_key,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStatus {
    Idle,
    Saving,
    Committed,
    RolledBack,
}

/// Result of a save that the store did not reject.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Committed(JournalNote),
    /// A newer save for the same key was applied before this one reached the store
    Superseded,
}

struct KeyState {
    status: SaveStatus,
    token: Uuid,
    // Last value the store is known to hold, None when it has no note
    baseline: Option<String>,
    // Serializes store writes for this key
    write_lock: Arc<Mutex<()>>,
}

#[derive(Debug, Clone, Copy)]
struct QueryState {
    stale: bool,
    generation: u64,
}

#[derive(Default)]
struct AccountView {
    notes: NoteMap,
    queries: HashMap<DateWindow, QueryState>,
    keys: HashMap<NaiveDate, KeyState>,
}

impl AccountView {
    fn notes_in(&self, window: DateWindow) -> NoteMap {
        self.notes
            .range(window.start..=window.end)
            .map(|(date, content)| (*date, content.clone()))
            .collect()
    }

    fn is_saving(&self, date: &NaiveDate) -> bool {
        self.keys
            .get(date)
            .is_some_and(|key| key.status == SaveStatus::Saving)
    }

    /// Replace the window's notes with `fetched`, keeping optimistic values
    /// for keys that are still saving.
    fn replace_window(&mut self, window: DateWindow, fetched: NoteMap) {
        let outdated: Vec<NaiveDate> = self
            .notes
            .range(window.start..=window.end)
            .map(|(date, _)| *date)
            .filter(|date| !self.is_saving(date))
            .collect();
        for date in outdated {
            self.notes.remove(&date);
        }

        for (date, content) in fetched {
            if window.contains(date) && !self.is_saving(&date) {
                self.notes.insert(date, content);
            }
        }
    }

    fn is_current(&self, date: &NaiveDate, token: Uuid) -> bool {
        self.keys.get(date).is_some_and(|key| key.token == token)
    }

    /// Cancel in-flight fetches of every window containing `date`.
    fn bump_generations(&mut self, date: NaiveDate) {
        for (window, query) in self.queries.iter_mut() {
            if window.contains(date) {
                query.generation += 1;
            }
        }
    }
}

struct Inner {
    store: Arc<dyn NoteStore>,
    notifier: Arc<dyn Notifier>,
    accounts: Mutex<HashMap<String, AccountView>>,
}

/// Cheap to clone; clones share one local view.
#[derive(Clone)]
pub struct NoteSyncController {
    inner: Arc<Inner>,
}

impl NoteSyncController {
    pub fn new(store: Arc<dyn NoteStore>) -> Self {
        Self::with_notifier(store, Arc::new(LogNotifier))
    }

    pub fn with_notifier(store: Arc<dyn NoteStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                notifier,
                accounts: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Notes for `window`, served locally when that query is fresh and
    /// fetched from the note store otherwise.
    pub async fn load_notes(&self, account_id: &str, window: DateWindow) -> CoreResult<NoteMap> {
        let generation = {
            let mut accounts = self.inner.accounts.lock().await;
            let view = accounts.entry(account_id.to_string()).or_default();

            let query = view.queries.entry(window).or_insert(QueryState {
                stale: true,
                generation: 0,
            });
            if !query.stale {
                return Ok(view.notes_in(window));
            }
            query.generation
        };

        log::debug!(
            "Fetching notes for {} ({} to {})",
            account_id,
            window.start,
            window.end
        );
        let records = self
            .inner
            .store
            .list_notes(account_id, window.start, window.end)
            .await?;
        let fetched = collapse_note_records(records);

        let mut accounts = self.inner.accounts.lock().await;
        let view = accounts.entry(account_id.to_string()).or_default();
        let current_generation = view.queries.get(&window).map(|q| q.generation);

        if current_generation != Some(generation) {
            // A local write landed in this window while the fetch was running
            log::debug!(
                "Discarding notes fetch for {} ({} to {}): superseded by a local write",
                account_id,
                window.start,
                window.end
            );
            return Ok(view.notes_in(window));
        }

        view.replace_window(window, fetched);
        if let Some(query) = view.queries.get_mut(&window) {
            query.stale = false;
        }

        Ok(view.notes_in(window))
    }

    /// Save a day note. The new content is visible in the local view before
    /// this returns; the store write runs on its own task, so dropping the
    /// returned future still commits or rolls the key back.
    pub async fn save_note(
        &self,
        account_id: &str,
        date: NaiveDate,
        content: &str,
    ) -> CoreResult<SaveOutcome> {
        let key = NoteKey::new(account_id, date);
        let (token, write_lock) = self.apply_optimistic(&key, content).await;

        let inner = Arc::clone(&self.inner);
        let content = content.to_string();
        let task = tokio::spawn(async move {
            inner
                .persist(key, content, token, write_lock)
                .await
        });

        task.await
            .map_err(|e| CoreError::Task(format!("note save task failed: {}", e)))?
    }

    pub async fn save_status(&self, account_id: &str, date: NaiveDate) -> SaveStatus {
        let accounts = self.inner.accounts.lock().await;
        accounts
            .get(account_id)
            .and_then(|view| view.keys.get(&date))
            .map_or(SaveStatus::Idle, |key| key.status)
    }

    /// Whatever the local view currently holds for `window`, without fetching.
    pub async fn local_view(&self, account_id: &str, window: DateWindow) -> NoteMap {
        let accounts = self.inner.accounts.lock().await;
        accounts
            .get(account_id)
            .map(|view| view.notes_in(window))
            .unwrap_or_default()
    }

    /// Mark every query for the account for revalidation on next read.
    pub async fn invalidate(&self, account_id: &str) {
        let mut accounts = self.inner.accounts.lock().await;
        if let Some(view) = accounts.get_mut(account_id) {
            for query in view.queries.values_mut() {
                query.stale = true;
            }
        }
    }

    async fn apply_optimistic(
        &self,
        key: &NoteKey,
        content: &str,
    ) -> (Uuid, Arc<Mutex<()>>) {
        let mut accounts = self.inner.accounts.lock().await;
        let view = accounts.entry(key.account_id.clone()).or_default();

        // While an earlier save is unconfirmed the local value is not known-good
        let saving = view.is_saving(&key.date);
        let previous = view.notes.insert(key.date, content.to_string());
        view.bump_generations(key.date);

        let token = Uuid::new_v4();
        let state = view.keys.entry(key.date).or_insert_with(|| KeyState {
            status: SaveStatus::Idle,
            token,
            baseline: None,
            write_lock: Arc::new(Mutex::new(())),
        });
        if !saving {
            state.baseline = previous;
        }
        state.status = SaveStatus::Saving;
        state.token = token;

        log::info!(
            "Applied note for {} on {} locally, saving",
            key.account_id,
            key.date
        );

        (token, Arc::clone(&state.write_lock))
    }
}

impl Inner {
    async fn persist(
        &self,
        key: NoteKey,
        content: String,
        token: Uuid,
        write_lock: Arc<Mutex<()>>,
    ) -> CoreResult<SaveOutcome> {
        let _write = write_lock.lock().await;

        if !self.is_current(&key, token).await {
            log::debug!(
                "Skipping note save for {} on {}: a newer save exists",
                key.account_id,
                key.date
            );
            return Ok(SaveOutcome::Superseded);
        }

        let date_key = format_date_key(key.date);
        match self
            .store
            .upsert_note(&key.account_id, &date_key, &content)
            .await
        {
            Ok(note) => {
                self.commit(&key, token, &note).await;
                Ok(SaveOutcome::Committed(note))
            }
            Err(e) => {
                self.roll_back(&key, token, &e).await;
                Err(CoreError::NoteSaveFailed {
                    account_id: key.account_id,
                    date: key.date,
                    message: e.to_string(),
                })
            }
        }
    }

    async fn is_current(&self, key: &NoteKey, token: Uuid) -> bool {
        let accounts = self.accounts.lock().await;
        accounts
            .get(&key.account_id)
            .is_some_and(|view| view.is_current(&key.date, token))
    }

    async fn commit(&self, key: &NoteKey, token: Uuid, note: &JournalNote) {
        let mut accounts = self.accounts.lock().await;
        let view = accounts.entry(key.account_id.clone()).or_default();
        view.bump_generations(key.date);

        let current = view.is_current(&key.date, token);
        if let Some(state) = view.keys.get_mut(&key.date) {
            state.baseline = Some(note.content.clone());
            if current {
                state.status = SaveStatus::Committed;
            }
        }

        if !current {
            log::debug!(
                "Note for {} on {} saved, newer local value kept",
                key.account_id,
                key.date
            );
            return;
        }

        view.notes.insert(key.date, note.content.clone());

        log::info!("Note for {} on {} saved", key.account_id, key.date);
    }

    async fn roll_back(&self, key: &NoteKey, token: Uuid, error: &ApiError) {
        let mut accounts = self.accounts.lock().await;
        let view = accounts.entry(key.account_id.clone()).or_default();
        view.bump_generations(key.date);

        if !view.is_current(&key.date, token) {
            log::warn!(
                "Superseded note save for {} on {} failed: {}",
                key.account_id,
                key.date,
                error
            );
            return;
        }

        let baseline = match view.keys.get_mut(&key.date) {
            Some(state) => {
                state.status = SaveStatus::RolledBack;
                state.baseline.clone()
            }
            None => None,
        };
        match baseline {
            Some(content) => view.notes.insert(key.date, content),
            None => view.notes.remove(&key.date),
        };
        for query in view.queries.values_mut() {
            query.stale = true;
        }

        log::error!(
            "Failed to save note for {} on {}, local changes rolled back: {}",
            key.account_id,
            key.date,
            error
        );
        drop(accounts);

        self.notifier.notify_failure(
            "Note not saved",
            &format!("Your note for {} could not be saved: {}", key.date, error),
        );
    }
}
