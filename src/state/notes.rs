//! Per-character notes.
//!
//! Each character has its own ordered list under `character-notes-{id}`.
//! Lists load lazily on first access, not at startup. Add and edit share
//! one validation function; nothing is mutated when validation fails.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::api::types::CharacterId;
use crate::error::{ErrorCode, ErrorKind};
use crate::storage::KvStore;

pub const MIN_NOTE_LEN: usize = 3;
pub const MAX_NOTE_LEN: usize = 500;

#[must_use]
pub fn notes_key(id: CharacterId) -> String {
    format!("character-notes-{id}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Which input a validation message belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteField {
    /// The "add a note" box.
    New,
    /// The edit box of an existing note.
    Existing(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationReason {
    Empty,
    TooShort,
    TooLong,
}

impl ValidationReason {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Empty => "Note cannot be empty",
            Self::TooShort => "Note must be at least 3 characters",
            Self::TooLong => "Note must be less than 500 characters",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .reason.message())]
pub struct ValidationError {
    pub field: NoteField,
    pub reason: ValidationReason,
}

impl ErrorCode for ValidationError {
    fn error_code(&self) -> &'static str {
        match self.reason {
            ValidationReason::Empty => "E_NOTE_EMPTY",
            ValidationReason::TooShort => "E_NOTE_TOO_SHORT",
            ValidationReason::TooLong => "E_NOTE_TOO_LONG",
        }
    }

    fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}

/// Check note text and return it trimmed. Length is counted in characters
/// after trimming.
///
/// # Errors
///
/// Returns the [`ValidationReason`] for empty, too-short, or too-long text.
pub fn validate_note_text(text: &str) -> Result<&str, ValidationReason> {
    let trimmed = text.trim();
    let len = trimmed.chars().count();
    if len == 0 {
        Err(ValidationReason::Empty)
    } else if len > MAX_NOTE_LEN {
        Err(ValidationReason::TooLong)
    } else if len < MIN_NOTE_LEN {
        Err(ValidationReason::TooShort)
    } else {
        Ok(trimmed)
    }
}

// =============================================================================
// STORE
// =============================================================================

pub struct NotesStore {
    kv: KvStore,
    character_id: CharacterId,
    notes: Option<Vec<Note>>,
}

impl NotesStore {
    /// Bind to one character's notes. Nothing is read until first use.
    #[must_use]
    pub fn open(kv: KvStore, character_id: CharacterId) -> Self {
        Self { kv, character_id, notes: None }
    }

    #[must_use]
    pub fn character_id(&self) -> CharacterId {
        self.character_id
    }

    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.notes.is_some()
    }

    /// Notes in insertion order.
    pub fn notes(&mut self) -> &[Note] {
        self.loaded()
    }

    /// Append a note.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] keyed to [`NoteField::New`].
    pub fn add_note(&mut self, text: &str) -> Result<Note, ValidationError> {
        let text = validate_note_text(text).map_err(|reason| ValidationError { field: NoteField::New, reason })?;
        let now = OffsetDateTime::now_utc();
        let note = Note { id: Uuid::now_v7().to_string(), text: text.to_owned(), created_at: now, updated_at: now };

        self.loaded().push(note.clone());
        self.persist();
        debug!(character_id = self.character_id, note_id = %note.id, "note added");
        Ok(note)
    }

    /// Replace a note's text. `Ok(None)` when `note_id` does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] keyed to [`NoteField::Existing`].
    pub fn edit_note(&mut self, note_id: &str, text: &str) -> Result<Option<Note>, ValidationError> {
        let text = validate_note_text(text)
            .map_err(|reason| ValidationError { field: NoteField::Existing(note_id.to_owned()), reason })?;

        let Some(note) = self.loaded().iter_mut().find(|n| n.id == note_id) else {
            return Ok(None);
        };
        text.clone_into(&mut note.text);
        note.updated_at = OffsetDateTime::now_utc().max(note.created_at);
        let updated = note.clone();

        self.persist();
        debug!(character_id = self.character_id, %note_id, "note edited");
        Ok(Some(updated))
    }

    /// Remove a note. Returns `false` if it was not there.
    pub fn delete_note(&mut self, note_id: &str) -> bool {
        let notes = self.loaded();
        let before = notes.len();
        notes.retain(|n| n.id != note_id);
        if notes.len() == before {
            return false;
        }
        self.persist();
        debug!(character_id = self.character_id, %note_id, "note deleted");
        true
    }

    fn loaded(&mut self) -> &mut Vec<Note> {
        let (kv, id) = (&self.kv, self.character_id);
        self.notes.get_or_insert_with(|| kv.read::<Vec<Note>>(&notes_key(id)).unwrap_or_default())
    }

    fn persist(&self) {
        if let Some(notes) = &self.notes {
            // Failure is logged by the KV store; the in-memory list stays.
            let _ = self.kv.write(&notes_key(self.character_id), notes);
        }
    }
}

#[cfg(test)]
#[path = "notes_test.rs"]
mod tests;
