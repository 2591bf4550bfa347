pub mod dashboard;
pub mod feed;
pub mod market;
pub mod quote;

use serde::{Deserialize, Deserializer};

/// The backend serializes empty lists as `null`; treat that the same as `[]`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
