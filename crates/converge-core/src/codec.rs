//! Composite identifiers for association objects
//!
//! An association ("this route table is associated with this attachment") has
//! no remote-assigned ID of its own; the natural keys of both sides are its
//! identity. They are joined with a reserved separator and split back with a
//! strict part count.

use crate::error::FormatError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the parts of a composite ID
pub const RESOURCE_ID_SEPARATOR: char = ',';

/// Encoder/decoder for composite IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeKeyCodec {
    separator: char,
    allow_empty_parts: bool,
}

impl Default for CompositeKeyCodec {
    fn default() -> Self {
        Self {
            separator: RESOURCE_ID_SEPARATOR,
            allow_empty_parts: true,
        }
    }
}

impl CompositeKeyCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec that also rejects empty parts
    pub fn strict() -> Self {
        Self {
            allow_empty_parts: false,
            ..Self::default()
        }
    }

    pub fn separator(&self) -> char {
        self.separator
    }

    pub fn encode<S: AsRef<str>>(&self, parts: &[S]) -> Result<String, FormatError> {
        if parts.is_empty() {
            return Err(FormatError::NoParts);
        }

        for (index, part) in parts.iter().enumerate() {
            let part = part.as_ref();
            if part.contains(self.separator) {
                return Err(FormatError::ReservedSeparator {
                    part: part.to_string(),
                    separator: self.separator,
                });
            }
            if part.is_empty() && !self.allow_empty_parts {
                return Err(FormatError::EmptyPart { index });
            }
        }

        let mut buf = [0u8; 4];
        let separator: &str = self.separator.encode_utf8(&mut buf);
        Ok(parts
            .iter()
            .map(|p| p.as_ref())
            .collect::<Vec<&str>>()
            .join(separator))
    }

    pub fn decode(&self, id: &str, arity: usize) -> Result<Vec<String>, FormatError> {
        let parts: Vec<&str> = id.split(self.separator).collect();

        if arity == 0 || parts.len() != arity {
            return Err(FormatError::Arity {
                id: id.to_string(),
                expected: arity,
                got: parts.len(),
                separator: self.separator,
            });
        }

        if !self.allow_empty_parts {
            if let Some(index) = parts.iter().position(|p| p.is_empty()) {
                return Err(FormatError::EmptyPart { index });
            }
        }

        Ok(parts.into_iter().map(str::to_string).collect())
    }
}

/// Join `parts` with [`RESOURCE_ID_SEPARATOR`]
pub fn encode<S: AsRef<str>>(parts: &[S]) -> Result<String, FormatError> {
    CompositeKeyCodec::default().encode(parts)
}

/// Split `id` into exactly `arity` parts
pub fn decode(id: &str, arity: usize) -> Result<Vec<String>, FormatError> {
    CompositeKeyCodec::default().decode(id, arity)
}

/// An ordered tuple of natural keys identifying an association object
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompositeKey {
    parts: Vec<String>,
}

impl CompositeKey {
    pub fn new<S: AsRef<str>>(parts: &[S]) -> Result<Self, FormatError> {
        // validate through the encoder so a key always has a string form
        encode(parts)?;
        Ok(Self {
            parts: parts.iter().map(|p| p.as_ref().to_string()).collect(),
        })
    }

    pub fn parse(id: &str, arity: usize) -> Result<Self, FormatError> {
        Ok(Self {
            parts: decode(id, arity)?,
        })
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    pub fn arity(&self) -> usize {
        self.parts.len()
    }

    pub fn part(&self, index: usize) -> Option<&str> {
        self.parts.get(index).map(String::as_str)
    }
}

impl fmt::Display for CompositeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = [0u8; 4];
        f.write_str(&self.parts.join(RESOURCE_ID_SEPARATOR.encode_utf8(&mut buf)))
    }
}

impl From<CompositeKey> for String {
    fn from(key: CompositeKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for CompositeKey {
    type Error = FormatError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        let arity = id.split(RESOURCE_ID_SEPARATOR).count();
        Self::parse(&id, arity)
    }
}
