mod clock;
mod fixed_string;
mod identity;
mod serde_utils;
mod units;

pub use clock::{Clock, ManualClock, OffsetClock, SystemClock, SECONDS_PER_DAY};
pub use fixed_string::{FixedString, FixedStringError};
pub use identity::{AccountId, Identity, ACCOUNT_ID_BYTES};
pub use serde_utils::{serde_deserialize_string, serde_serialize_string};
pub use units::{format_units, parse_units, UnitsError, ASSET_DECIMALS, ONE_UNIT};
