//! Validated value types shared across the artifactorium workspace.

use std::borrow::Borrow;

/// Errors that can occur when creating an [`EntryName`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NameError {
    /// The input was empty or contained only whitespace
    #[error("entry name cannot be empty")]
    Empty,
}

/// The logical name of a registry entry.
///
/// Guarantees that the name contains at least one non-whitespace character.
/// Unlike a trimmed text type the original input is kept verbatim, because the
/// name doubles as the default relative path of the entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryName(String);

impl EntryName {
    /// Creates a new `EntryName` from the given input.
    ///
    /// # Errors
    ///
    /// Returns [`NameError::Empty`] if the input is empty or whitespace-only.
    pub fn new(input: impl Into<String>) -> Result<Self, NameError> {
        let input = input.into();
        if input.trim().is_empty() {
            return Err(NameError::Empty);
        }
        Ok(Self(input))
    }

    /// Returns the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for EntryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Lets maps keyed by `EntryName` be queried with a plain `&str`.
impl Borrow<str> for EntryName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl TryFrom<&str> for EntryName {
    type Error = NameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for EntryName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl PartialEq<str> for EntryName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for EntryName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl serde::Serialize for EntryName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for EntryName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EntryName::new(s).map_err(serde::de::Error::custom)
    }
}
