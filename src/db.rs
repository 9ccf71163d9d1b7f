//! Collection-level data access over a [`Storage`].
//!
//! Every mutation reads the whole collection, changes it in memory and writes
//! the whole collection back. Callers are expected to serialize writers.

use crate::error::StoreError;
use crate::models::{Branch, Note, NoteRequest, Semester, User};
use crate::storage::{Storage, NOTES_KEY, REQUESTS_KEY, SESSION_KEY, USERS_KEY};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub struct NoteDb<S> {
    storage: S,
}

impl<S: Storage> NoteDb<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn users(&self) -> Result<Vec<User>, StoreError> {
        Ok(self.load(USERS_KEY)?.unwrap_or_default())
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users()?.into_iter().find(|u| u.email == email))
    }

    pub fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users()?.into_iter().find(|u| u.id == id))
    }

    pub fn save_user(&self, user: User) -> Result<(), StoreError> {
        let mut users = self.users()?;
        users.push(user);
        self.save(USERS_KEY, &users)
    }

    /// Replaces the stored user with the same id. Returns `false` if there is none.
    ///
    /// When that user is the active session identity, the session slot is
    /// rewritten too (without the password).
    pub fn update_user(&self, updated: User) -> Result<bool, StoreError> {
        let mut users = self.users()?;
        let Some(slot) = users.iter_mut().find(|u| u.id == updated.id) else {
            return Ok(false);
        };
        *slot = updated.clone();
        self.save(USERS_KEY, &users)?;

        if let Some(active) = self.active_user()? {
            if active.id == updated.id {
                self.set_active_user(&updated)?;
            }
        }

        Ok(true)
    }

    /// Returns every note, seeding the fixture notes when the slot has never been written.
    pub fn notes(&self) -> Result<Vec<Note>, StoreError> {
        match self.load(NOTES_KEY)? {
            Some(notes) => Ok(notes),
            None => {
                let seeded = fixture_notes();
                self.save(NOTES_KEY, &seeded)?;
                tracing::debug!(count = seeded.len(), "seeded notes collection");
                Ok(seeded)
            }
        }
    }

    pub fn find_note(&self, id: &str) -> Result<Option<Note>, StoreError> {
        Ok(self.notes()?.into_iter().find(|n| n.id == id))
    }

    /// Inserts at the front so the newest upload lists first.
    pub fn save_note(&self, note: Note) -> Result<(), StoreError> {
        let mut notes = self.notes()?;
        notes.insert(0, note);
        self.save(NOTES_KEY, &notes)
    }

    pub fn update_note_download(&self, id: &str) -> Result<bool, StoreError> {
        let mut notes = self.notes()?;
        let Some(note) = notes.iter_mut().find(|n| n.id == id) else {
            return Ok(false);
        };
        note.download_count = note.download_count.saturating_add(1);
        self.save(NOTES_KEY, &notes)?;
        Ok(true)
    }

    pub fn delete_note(&self, id: &str) -> Result<bool, StoreError> {
        let mut notes = self.notes()?;
        let before = notes.len();
        notes.retain(|n| n.id != id);
        if notes.len() == before {
            return Ok(false);
        }
        self.save(NOTES_KEY, &notes)?;
        Ok(true)
    }

    pub fn requests(&self) -> Result<Vec<NoteRequest>, StoreError> {
        Ok(self.load(REQUESTS_KEY)?.unwrap_or_default())
    }

    pub fn add_request(&self, request: NoteRequest) -> Result<(), StoreError> {
        let mut requests = self.requests()?;
        requests.insert(0, request);
        self.save(REQUESTS_KEY, &requests)
    }

    pub fn active_user(&self) -> Result<Option<User>, StoreError> {
        self.load(SESSION_KEY)
    }

    pub fn set_active_user(&self, user: &User) -> Result<(), StoreError> {
        self.save(SESSION_KEY, &user.without_password())
    }

    pub fn clear_active_user(&self) -> Result<(), StoreError> {
        self.storage.remove_item(SESSION_KEY)
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(data) = self.storage.get_item(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&data)
            .map(Some)
            .map_err(|source| StoreError::Corrupt {
                key: key.to_string(),
                source,
            })
    }

    fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.storage.set_item(key, &json)
    }
}

fn fixture_notes() -> Vec<Note> {
    let now = Utc::now();
    vec![
        Note {
            id: "1".into(),
            title: "Data Structures and Algorithms".into(),
            subject: "Computer Science".into(),
            description:
                "Comprehensive notes covering linked lists, trees, and sorting algorithms.".into(),
            branch: Branch::Cse,
            semester: Semester::Sem3,
            uploader_id: "u1".into(),
            uploader_name: "Alice Smith".into(),
            file_name: "dsa_notes.pdf".into(),
            file_size: 2_500_000,
            file_type: "application/pdf".into(),
            file_data: None,
            download_count: 12,
            created_at: now,
        },
        Note {
            id: "2".into(),
            title: "Microprocessors & Interfacing".into(),
            subject: "Digital Systems".into(),
            description: "Full semester 8085 architecture and instruction set details.".into(),
            branch: Branch::Ece,
            semester: Semester::Sem4,
            uploader_id: "u2".into(),
            uploader_name: "Bob Johnson".into(),
            file_name: "micro_notes.pdf".into(),
            file_size: 1_800_000,
            file_type: "application/pdf".into(),
            file_data: None,
            download_count: 5,
            created_at: now,
        },
    ]
}
