use super::*;
use crate::storage::MemoryStorage;
use std::sync::Arc;

fn store() -> (KvStore, NotesStore) {
    let kv = KvStore::in_memory();
    (kv.clone(), NotesStore::open(kv, 1))
}

// =============================================================================
// validation
// =============================================================================

#[test]
fn validation_bounds() {
    assert_eq!(validate_note_text(""), Err(ValidationReason::Empty));
    assert_eq!(validate_note_text("   \n\t"), Err(ValidationReason::Empty));
    assert_eq!(validate_note_text("a"), Err(ValidationReason::TooShort));
    assert_eq!(validate_note_text("  ab  "), Err(ValidationReason::TooShort));
    assert_eq!(validate_note_text("abc"), Ok("abc"));
    assert_eq!(validate_note_text(&"x".repeat(500)).map(str::len), Ok(500));
    assert_eq!(validate_note_text(&"x".repeat(501)), Err(ValidationReason::TooLong));
}

#[test]
fn validation_trims_before_measuring() {
    let padded = format!("   {}   ", "y".repeat(500));
    assert_eq!(validate_note_text(&padded).map(str::len), Ok(500));
}

#[test]
fn validation_counts_characters_not_bytes() {
    let text = "é".repeat(500);
    assert!(validate_note_text(&text).is_ok());
}

#[test]
fn validation_messages() {
    let err = ValidationError { field: NoteField::New, reason: ValidationReason::TooShort };
    assert_eq!(err.to_string(), "Note must be at least 3 characters");
    assert_eq!(err.error_code(), "E_NOTE_TOO_SHORT");
    assert_eq!(err.kind(), ErrorKind::Validation);
}

// =============================================================================
// add
// =============================================================================

#[test]
fn add_appends_trimmed_note_with_matching_timestamps() {
    let (kv, mut notes) = store();
    let note = notes.add_note("  Wubba lubba dub dub  ").unwrap();

    assert_eq!(note.text, "Wubba lubba dub dub");
    assert_eq!(note.created_at, note.updated_at);
    assert_eq!(notes.notes(), &[note.clone()]);
    assert_eq!(kv.read::<Vec<Note>>(&notes_key(1)), Some(vec![note]));
}

#[test]
fn add_rejects_invalid_text_without_mutating() {
    let (kv, mut notes) = store();
    notes.add_note("first note").unwrap();

    let long = "z".repeat(501);
    for bad in ["", "hi", long.as_str()] {
        let err = notes.add_note(bad).unwrap_err();
        assert_eq!(err.field, NoteField::New);
    }
    assert_eq!(notes.notes().len(), 1);
    assert_eq!(kv.read::<Vec<Note>>(&notes_key(1)).unwrap().len(), 1);
}

#[test]
fn note_ids_are_unique_and_ordered() {
    let (_, mut notes) = store();
    let a = notes.add_note("one note").unwrap();
    let b = notes.add_note("two note").unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(notes.notes().iter().map(|n| n.id.clone()).collect::<Vec<_>>(), vec![a.id, b.id]);
}

// =============================================================================
// edit
// =============================================================================

#[test]
fn edit_replaces_text_and_keeps_created_at() {
    let (kv, mut notes) = store();
    let original = notes.add_note("original").unwrap();

    let edited = notes.edit_note(&original.id, " revised ").unwrap().unwrap();

    assert_eq!(edited.text, "revised");
    assert_eq!(edited.created_at, original.created_at);
    assert!(edited.updated_at >= edited.created_at);
    assert_eq!(kv.read::<Vec<Note>>(&notes_key(1)).unwrap()[0].text, "revised");
}

#[test]
fn edit_validation_error_is_keyed_to_note() {
    let (_, mut notes) = store();
    let note = notes.add_note("original").unwrap();

    let err = notes.edit_note(&note.id, "no").unwrap_err();

    assert_eq!(err.field, NoteField::Existing(note.id.clone()));
    assert_eq!(err.reason, ValidationReason::TooShort);
    assert_eq!(notes.notes()[0].text, "original");
}

#[test]
fn edit_missing_note_is_noop() {
    let (_, mut notes) = store();
    notes.add_note("original").unwrap();
    assert_eq!(notes.edit_note("missing", "whatever").unwrap(), None);
    assert_eq!(notes.notes()[0].text, "original");
}

// =============================================================================
// delete
// =============================================================================

#[test]
fn delete_removes_and_persists() {
    let (kv, mut notes) = store();
    let keep = notes.add_note("keep me").unwrap();
    let drop = notes.add_note("drop me").unwrap();

    assert!(notes.delete_note(&drop.id));
    assert_eq!(notes.notes(), &[keep.clone()]);
    assert_eq!(kv.read::<Vec<Note>>(&notes_key(1)), Some(vec![keep]));
}

#[test]
fn delete_missing_note_is_noop() {
    let (_, mut notes) = store();
    notes.add_note("keep me").unwrap();
    assert!(!notes.delete_note("nope"));
    assert_eq!(notes.notes().len(), 1);
}

// =============================================================================
// loading / isolation
// =============================================================================

#[test]
fn open_does_not_read_until_first_use() {
    let (kv, mut notes) = store();
    assert!(!notes.is_loaded());
    kv.write(&notes_key(1), &Vec::<Note>::new()).unwrap();
    assert!(notes.notes().is_empty());
    assert!(notes.is_loaded());
}

#[test]
fn characters_have_independent_lists() {
    let kv = KvStore::in_memory();
    let mut rick = NotesStore::open(kv.clone(), 1);
    let mut morty = NotesStore::open(kv.clone(), 2);

    rick.add_note("genius").unwrap();

    assert_eq!(rick.notes().len(), 1);
    assert!(morty.notes().is_empty());
    assert_eq!(NotesStore::open(kv, 1).notes().len(), 1);
}

#[test]
fn serialized_notes_use_camel_case_and_rfc3339() {
    let (kv, mut notes) = store();
    notes.add_note("check shape").unwrap();

    let raw = kv.read::<serde_json::Value>(&notes_key(1)).unwrap();
    let first = &raw[0];
    assert!(first.get("createdAt").and_then(|v| v.as_str()).is_some());
    assert!(first.get("updatedAt").and_then(|v| v.as_str()).is_some());
    assert!(first.get("created_at").is_none());
}

#[test]
fn write_failure_keeps_in_memory_note() {
    let kv = KvStore::new(Arc::new(MemoryStorage::with_quota(8)));
    let mut notes = NotesStore::open(kv.clone(), 3);

    notes.add_note("too big for the quota").unwrap();

    assert_eq!(notes.notes().len(), 1);
    assert_eq!(kv.read::<Vec<Note>>(&notes_key(3)), None);
}
