//! Read-only user directory.
//!
//! The directory is a fixed, ordered set of user records. It is built once at
//! startup, shared behind an `Arc`, and only ever borrowed immutably, so
//! repeated reads always observe the same records in the same order.
//!
//! # Invariants
//!
//! - At least one record
//! - Ids are unique and greater than 0
//! - Insertion order is preserved by [`UserDirectory::list`]

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::DirectoryError;

/// A single user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// Unique numeric identifier (> 0)
    pub id: u32,

    /// Display name
    pub name: String,
}

impl UserRecord {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Ordered, immutable collection of user records.
#[derive(Debug, Clone)]
pub struct UserDirectory {
    records: Vec<UserRecord>,
}

impl UserDirectory {
    /// Build a directory from records, validating its invariants.
    pub fn new(records: Vec<UserRecord>) -> Result<Self, DirectoryError> {
        if records.is_empty() {
            return Err(DirectoryError::Empty);
        }

        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if record.id == 0 {
                return Err(DirectoryError::InvalidId(record.id));
            }
            if !seen.insert(record.id) {
                return Err(DirectoryError::DuplicateId(record.id));
            }
        }

        Ok(Self { records })
    }

    /// The statically seeded directory served by the API.
    pub fn seeded() -> Self {
        Self {
            records: vec![
                UserRecord::new(1, "John Doe"),
                UserRecord::new(2, "Jane Doe"),
            ],
        }
    }

    /// All records in insertion order.
    pub fn list(&self) -> &[UserRecord] {
        &self.records
    }

    /// Look up a record by id.
    ///
    /// Takes a signed value so that any parsed integer can be passed; ids
    /// outside the valid range simply find no match.
    pub fn get(&self, id: i64) -> Option<&UserRecord> {
        let id = u32::try_from(id).ok()?;
        self.records.iter().find(|record| record.id == id)
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the directory has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::seeded()
    }
}
