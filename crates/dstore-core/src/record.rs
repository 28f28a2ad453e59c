#![forbid(unsafe_code)]

//! Records and record identifiers.
//!
//! A [`Record`] is an opaque JSON object describing one business entity. The
//! only field the store interprets is `id`, which must hold an integer that
//! fits in an `i64`. Negative ids are legal; they mark records that exist only
//! on the client and have not been saved yet.
//!
//! # Merging
//!
//! Two merge strategies exist:
//!
//! | Method | Used by | Fields kept |
//! |--------|---------|-------------|
//! | [`Record::patched`] | `UpdateById` | stored fields plus every patch field |
//! | [`Record::refreshed`] | `Refresh` | only the fields already stored |
//!
//! Both recurse into nested objects so partially loaded references keep the
//! fields the patch or fresh copy does not mention.

use std::fmt;

use serde_json::{Map, Value};

use crate::error::{Result, StoreError};

/// Name of the identifier field.
pub const ID_FIELD: &str = "id";

/// Unique identifier of a record within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(pub i64);

impl RecordId {
    /// Create a new record id from a raw value.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn raw(self) -> i64 {
        self.0
    }

    /// Whether this id belongs to a record that was never persisted.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        self.0 < 0
    }

    /// Parse a loosely typed JSON identifier.
    ///
    /// Only JSON integers in `i64` range are accepted. Strings, floats, and
    /// anything else yield [`StoreError::MalformedId`], since they indicate a
    /// caller bug rather than a missing record.
    pub fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(Self).ok_or_else(|| StoreError::malformed(value)),
            _ => Err(StoreError::malformed(value)),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<RecordId> for Value {
    fn from(id: RecordId) -> Self {
        Self::from(id.0)
    }
}

/// One business entity: a JSON object with a validated integer `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    fields: Map<String, Value>,
}

impl Record {
    /// Validate a field map and wrap it as a record.
    pub fn new(fields: Map<String, Value>) -> Result<Self> {
        let id = fields
            .get(ID_FIELD)
            .ok_or(StoreError::MissingId)
            .and_then(RecordId::from_value)?;
        Ok(Self { id, fields })
    }

    /// Validate an arbitrary JSON value as a record.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Self::new(fields),
            other => Err(StoreError::not_an_object(&other)),
        }
    }

    #[must_use]
    pub const fn id(&self) -> RecordId {
        self.id
    }

    /// Look up a top-level field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Resolve a dotted path (`"customer.name"`) through nested objects.
    #[must_use]
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        lookup_path(&self.fields, path)
    }

    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.fields
    }

    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }

    /// Return a copy with `patch` merged in.
    ///
    /// Patch fields overwrite stored fields, except that two objects under the
    /// same key are merged recursively. A patch `id` must equal this record's
    /// id.
    pub fn patched(&self, patch: &Map<String, Value>) -> Result<Self> {
        check_patch_id(self.id, patch)?;
        let mut fields = self.fields.clone();
        merge_into(&mut fields, patch);
        Ok(Self {
            id: self.id,
            fields,
        })
    }

    /// Return a copy refreshed from a freshly read version of this record.
    ///
    /// Only fields already present here survive. Dotted field names are
    /// looked up as paths in `fresh`; absent fields keep their stored value.
    #[must_use]
    pub fn refreshed(&self, fresh: &Self) -> Self {
        Self {
            id: self.id,
            fields: refresh_map(&self.fields, &fresh.fields),
        }
    }
}

impl TryFrom<Value> for Record {
    type Error = StoreError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Self::Object(record.fields)
    }
}

/// Reject a patch whose `id` field is malformed or names another record.
pub fn check_patch_id(target: RecordId, patch: &Map<String, Value>) -> Result<()> {
    match patch.get(ID_FIELD) {
        None => Ok(()),
        Some(raw) => {
            let found = RecordId::from_value(raw)?;
            if found == target {
                Ok(())
            } else {
                Err(StoreError::IdMismatch { target, found })
            }
        }
    }
}

/// Validate a batch of JSON values as records.
pub fn records_from_values(values: impl IntoIterator<Item = Value>) -> Result<Vec<Record>> {
    values.into_iter().map(Record::from_value).collect()
}

fn merge_into(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        match (target.get_mut(key), value) {
            (Some(Value::Object(current)), Value::Object(nested)) => merge_into(current, nested),
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

fn refresh_map(initial: &Map<String, Value>, fresh: &Map<String, Value>) -> Map<String, Value> {
    initial
        .iter()
        .map(|(name, stored)| {
            let value = if name.contains('.') {
                lookup_path(fresh, name).unwrap_or(stored).clone()
            } else {
                match (stored, fresh.get(name)) {
                    (Value::Object(stored), Some(Value::Object(nested))) => {
                        Value::Object(refresh_map(stored, nested))
                    }
                    (_, Some(value)) => value.clone(),
                    (stored, None) => stored.clone(),
                }
            };
            (name.clone(), value)
        })
        .collect()
}

fn lookup_path<'a>(fields: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = fields.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}
