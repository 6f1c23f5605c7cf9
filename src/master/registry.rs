//! Password records and the registry that owns them
//!
//! Each record keeps its encrypted hints and their decrypted values side
//! by side in one `HintSlot` list, so the two views can never drift out of
//! alignment. Records are only mutated through the registry, which the
//! coordinator owns exclusively.

use crate::error::{RegistryError, RegistryResult};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Batch-unique record identifier
pub type RecordId = u32;

/// One encrypted hint and its decrypted value, once known
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HintSlot {
    /// Hash of a permutation of the alphabet minus one character
    pub encrypted: String,

    /// The permutation itself, once a worker found it
    pub decrypted: Option<String>,
}

impl HintSlot {
    fn new(encrypted: String) -> Self {
        Self {
            encrypted,
            decrypted: None,
        }
    }

    /// Whether a worker has decrypted this hint
    pub fn is_resolved(&self) -> bool {
        self.decrypted.is_some()
    }
}

/// One password entry with its hints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordRecord {
    /// Record ID from the input file
    id: RecordId,

    /// Owner of the password
    name: String,

    /// Full alphabet of the run (shared between all records)
    #[serde(serialize_with = "serialize_alphabet")]
    alphabet: Arc<[char]>,

    /// Fixed password length
    password_length: usize,

    /// Hash of the password
    encrypted_password: String,

    /// Cleartext password, written at most once
    decrypted_password: Option<String>,

    /// Hints in input order
    hints: Vec<HintSlot>,
}

fn serialize_alphabet<S: serde::Serializer>(
    alphabet: &Arc<[char]>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&alphabet.iter().collect::<String>())
}

impl PasswordRecord {
    /// Create a record with no hint decrypted yet
    pub fn new(
        id: RecordId,
        name: String,
        encrypted_password: String,
        encrypted_hints: Vec<String>,
        alphabet: Arc<[char]>,
        password_length: usize,
    ) -> Self {
        Self {
            id,
            name,
            alphabet,
            password_length,
            encrypted_password,
            decrypted_password: None,
            hints: encrypted_hints.into_iter().map(HintSlot::new).collect(),
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alphabet(&self) -> &[char] {
        &self.alphabet
    }

    pub fn password_length(&self) -> usize {
        self.password_length
    }

    pub fn encrypted_password(&self) -> &str {
        &self.encrypted_password
    }

    pub fn decrypted_password(&self) -> Option<&str> {
        self.decrypted_password.as_deref()
    }

    pub fn hints(&self) -> &[HintSlot] {
        &self.hints
    }

    /// Encrypted hints in input order
    pub fn encrypted_hints(&self) -> impl Iterator<Item = &str> {
        self.hints.iter().map(|h| h.encrypted.as_str())
    }

    /// Decrypted hints, index-aligned with `encrypted_hints`
    pub fn decrypted_hints(&self) -> impl Iterator<Item = Option<&str>> {
        self.hints.iter().map(|h| h.decrypted.as_deref())
    }

    /// True once every hint slot is filled (vacuously true without hints)
    pub fn all_hints_resolved(&self) -> bool {
        self.hints.iter().all(HintSlot::is_resolved)
    }

    /// Fill every slot whose encrypted value matches; returns the number of
    /// slots matched.
    fn resolve_hint(&mut self, encrypted: &str, decrypted: &str) -> usize {
        let mut matched = 0;
        for slot in self.hints.iter_mut().filter(|h| h.encrypted == encrypted) {
            slot.decrypted = Some(decrypted.to_string());
            matched += 1;
        }
        matched
    }
}

impl fmt::Display for PasswordRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resolved = self.hints.iter().filter(|h| h.is_resolved()).count();
        write!(
            f,
            "{};{};{};hints {}/{}",
            self.id,
            self.name,
            self.decrypted_password.as_deref().unwrap_or("<unresolved>"),
            resolved,
            self.hints.len()
        )
    }
}

/// Owns every record of the run, keyed by ID
#[derive(Debug, Default)]
pub struct PasswordRegistry {
    records: HashMap<RecordId, PasswordRecord>,
}

impl PasswordRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record from a parsed input line
    pub fn create(
        &mut self,
        id: RecordId,
        name: String,
        encrypted_password: String,
        encrypted_hints: Vec<String>,
        alphabet: Arc<[char]>,
        password_length: usize,
    ) -> RegistryResult<&PasswordRecord> {
        use std::collections::hash_map::Entry;

        match self.records.entry(id) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateId { id }),
            Entry::Vacant(slot) => Ok(slot.insert(PasswordRecord::new(
                id,
                name,
                encrypted_password,
                encrypted_hints,
                alphabet,
                password_length,
            ))),
        }
    }

    /// Record a decrypted hint. Re-recording the same hint is harmless.
    pub fn record_hint(
        &mut self,
        id: RecordId,
        encrypted_hint: &str,
        decrypted: &str,
    ) -> RegistryResult<()> {
        let record = self.get_mut(id)?;
        if record.resolve_hint(encrypted_hint, decrypted) == 0 {
            return Err(RegistryError::UnknownHint {
                id,
                hint: encrypted_hint.to_string(),
            });
        }
        Ok(())
    }

    /// Whether every hint of the record is decrypted
    pub fn all_hints_resolved(&self, id: RecordId) -> RegistryResult<bool> {
        Ok(self.get(id)?.all_hints_resolved())
    }

    /// Deep copy of the record for a password task
    pub fn snapshot(&self, id: RecordId) -> RegistryResult<PasswordRecord> {
        self.get(id).cloned()
    }

    /// Record the cracked password.
    ///
    /// Returns `Ok(true)` when the password was stored. An empty password
    /// means the worker found nothing and is ignored; a record keeps the
    /// first password it was given.
    pub fn record_password(&mut self, id: RecordId, decrypted: &str) -> RegistryResult<bool> {
        let record = self.get_mut(id)?;

        if decrypted.is_empty() {
            return Ok(false);
        }

        if let Some(existing) = &record.decrypted_password {
            if existing != decrypted {
                warn!(record = id, "Ignoring second password for an already cracked record");
            }
            return Ok(false);
        }

        record.decrypted_password = Some(decrypted.to_string());
        Ok(true)
    }

    /// Look up a record
    pub fn get(&self, id: RecordId) -> RegistryResult<&PasswordRecord> {
        self.records
            .get(&id)
            .ok_or(RegistryError::UnknownRecord { id })
    }

    fn get_mut(&mut self, id: RecordId) -> RegistryResult<&mut PasswordRecord> {
        self.records
            .get_mut(&id)
            .ok_or(RegistryError::UnknownRecord { id })
    }

    /// All records in ID order
    pub fn records(&self) -> Vec<&PasswordRecord> {
        let mut records: Vec<_> = self.records.values().collect();
        records.sort_by_key(|r| r.id);
        records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records whose password is known
    pub fn cracked_count(&self) -> usize {
        self.records
            .values()
            .filter(|r| r.decrypted_password.is_some())
            .count()
    }
}
