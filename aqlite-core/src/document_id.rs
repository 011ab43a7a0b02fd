//! Document identifiers of the form `collection/key`.

use std::{fmt, str::FromStr};

use crate::error::{DatabaseError, DatabaseResult};

const MAX_COLLECTION_NAME_LENGTH: usize = 256;
const MAX_KEY_LENGTH: usize = 254;

/// Checks a collection name: `[A-Za-z0-9_-]`, non-empty, at most 256 bytes.
///
/// # Errors
///
/// Returns a 400/1208 error if the name is illegal.
pub fn validate_collection_name(name: &str) -> DatabaseResult<()> {
    let legal = !name.is_empty()
        && name.len() <= MAX_COLLECTION_NAME_LENGTH
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if !legal {
        return Err(DatabaseError::illegal_name(name));
    }

    Ok(())
}

/// Checks a document key: non-empty, at most 254 bytes, and restricted to
/// ASCII alphanumerics plus `_-:.@()+,=;$!*'%`.
///
/// # Errors
///
/// Returns a 400/1221 error if the key is illegal.
pub fn validate_key(key: &str) -> DatabaseResult<()> {
    let legal = !key.is_empty()
        && key.len() <= MAX_KEY_LENGTH
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-:.@()+,=;$!*'%".contains(c));

    if !legal {
        return Err(DatabaseError::illegal_key(key));
    }

    Ok(())
}

/// A `(collection, key)` pair identifying a document.
///
/// Both parts are optional; when both are absent the id is the null id.
/// Every part that is set has passed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DocumentId {
    collection: Option<String>,
    key: Option<String>,
}

impl DocumentId {
    /// Creates a fully qualified id after validating both parts.
    pub fn new(collection: impl Into<String>, key: impl Into<String>) -> DatabaseResult<Self> {
        let mut id = Self::null();
        id.set_collection(Some(collection.into()))?;
        id.set_key(Some(key.into()))?;
        Ok(id)
    }

    /// The null id.
    pub fn null() -> Self {
        Self::default()
    }

    /// Parses `collection/key`, splitting on the first `/`.
    ///
    /// `None` yields the null id.
    ///
    /// # Errors
    ///
    /// Returns 400/1221 if the input has no `/`, or the validation error of
    /// whichever part is illegal.
    pub fn parse(id: Option<&str>) -> DatabaseResult<Self> {
        let Some(id) = id else {
            return Ok(Self::null());
        };

        let (collection, key) = id
            .split_once('/')
            .ok_or_else(|| DatabaseError::illegal_key(id))?;

        Self::new(collection, key)
    }

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Sets the collection part, validating it when present.
    pub fn set_collection(&mut self, collection: Option<String>) -> DatabaseResult<()> {
        if let Some(name) = &collection {
            validate_collection_name(name)?;
        }

        self.collection = collection;
        Ok(())
    }

    /// Sets the key part, validating it when present.
    pub fn set_key(&mut self, key: Option<String>) -> DatabaseResult<()> {
        if let Some(key) = &key {
            validate_key(key)?;
        }

        self.key = key;
        Ok(())
    }

    /// Returns `collection/key`, or `None` if either part is missing.
    pub fn id(&self) -> Option<String> {
        match (&self.collection, &self.key) {
            (Some(collection), Some(key)) => Some(format!("{collection}/{key}")),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        self.collection.is_none() && self.key.is_none()
    }

    /// Fails with 400/1221 unless both parts are present.
    pub fn ensure_complete(&self) -> DatabaseResult<()> {
        match (&self.collection, &self.key) {
            (Some(_), Some(_)) => Ok(()),
            _ => Err(DatabaseError::illegal_key(&self.to_string())),
        }
    }
}

impl FromStr for DocumentId {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(Some(s))
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.collection.as_deref().unwrap_or_default(),
            self.key.as_deref().unwrap_or_default()
        )
    }
}
