use std::{
    fmt::{Debug, Display},
    hash::Hash,
    str::FromStr,
};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{FixedString, FixedStringError};

/// Anything that can own shares, create pools or hold an asset balance.
pub trait Identity:
    Display + Debug + Copy + PartialEq + Eq + Hash + Send + Sync + Serialize + DeserializeOwned + 'static
{
}

impl<T> Identity for T where
    T: Display
        + Debug
        + Copy
        + PartialEq
        + Eq
        + Hash
        + Send
        + Sync
        + Serialize
        + DeserializeOwned
        + 'static
{
}

pub const ACCOUNT_ID_BYTES: usize = 32;

/// Named account, e.g. `trader0` or `pool-custody`.
#[derive(
    Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AccountId(FixedString<ACCOUNT_ID_BYTES>);

impl AccountId {
    pub fn new(name: &str) -> Result<Self, FixedStringError> {
        Ok(Self(FixedString::try_from(name)?))
    }
}

impl FromStr for AccountId {
    type Err = FixedStringError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Debug for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountId({})", self.0)
    }
}

impl AsRef<[u8]> for AccountId {
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_names() {
        let trader: AccountId = "trader0".parse().unwrap();
        assert_eq!(trader.to_string(), "trader0");
        assert_eq!(AccountId::new(""), Err(FixedStringError::Empty));
        assert_eq!(AccountId::new("a\0b"), Err(FixedStringError::Nul(1)));
        assert!(AccountId::new(&"x".repeat(ACCOUNT_ID_BYTES + 1)).is_err());
    }

    #[test]
    fn test_rejects_nul_when_deserializing() {
        assert!(serde_json::from_str::<AccountId>("\"a\\u0000b\"").is_err());
    }
}
