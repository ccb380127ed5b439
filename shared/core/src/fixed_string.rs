use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::serde_utils::{serde_deserialize_string, serde_serialize_string};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedStringError {
    #[error("string of length {len} doesn't fit in FixedString<{capacity}>")]
    TooLong { len: usize, capacity: usize },
    #[error("empty string")]
    Empty,
    #[error("string contains a NUL byte at offset {0}")]
    Nul(usize),
}

/// Zero-padded UTF-8 label with a compile-time capacity. Being `Copy`, it can
/// be used as a key and as an identity without allocation.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FixedString<const L: usize>(
    #[serde(
        serialize_with = "serde_serialize_string",
        deserialize_with = "serde_deserialize_string"
    )]
    [u8; L],
);

impl<const L: usize> std::fmt::Debug for FixedString<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\" ({}/{} bytes)", String::from(self), self.len(), L)
    }
}

impl<const L: usize> Display for FixedString<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from(self))
    }
}

impl<const L: usize> Default for FixedString<L> {
    fn default() -> Self {
        Self([0u8; L])
    }
}

impl<const L: usize> FixedString<L> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_str_truncated(s: &str) -> Self {
        let mut array = [0u8; L];
        let mut len = s.len().min(L);
        // never split a multi-byte character
        while !s.is_char_boundary(len) {
            len -= 1;
        }
        array[..len].copy_from_slice(&s.as_bytes()[..len]);
        Self(array)
    }

    pub fn len(&self) -> usize {
        self.0.iter().position(|&b| b == 0).unwrap_or(L)
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0[..self.len()]
    }
}

impl<const L: usize> TryFrom<&str> for FixedString<L> {
    type Error = FixedStringError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let bytes = s.as_bytes();
        if bytes.is_empty() {
            return Err(FixedStringError::Empty);
        }
        // NUL is the padding byte, so it can't appear inside the string
        if let Some(offset) = bytes.iter().position(|&b| b == 0) {
            return Err(FixedStringError::Nul(offset));
        }
        if bytes.len() > L {
            return Err(FixedStringError::TooLong {
                len: bytes.len(),
                capacity: L,
            });
        }
        let mut array = [0u8; L];
        array[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(array))
    }
}

impl<const L: usize> FromStr for FixedString<L> {
    type Err = FixedStringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

impl<const L: usize> From<&FixedString<L>> for String {
    fn from(value: &FixedString<L>) -> Self {
        String::from_utf8_lossy(value.as_bytes()).to_string()
    }
}

impl<const L: usize> AsRef<[u8]> for FixedString<L> {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}
