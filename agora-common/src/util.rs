/// Serde adapter serializing a [`UtcDateTime`] as an RFC 3339 string.
///
/// `time`'s well-known formats are written against [`OffsetDateTime`], so
/// this round-trips through the zero offset.
pub mod rfc3339 {
    use serde::{Deserializer, Serializer};
    use time::{OffsetDateTime, UtcDateTime};

    pub fn serialize<S>(datetime: &UtcDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        time::serde::rfc3339::serialize(&OffsetDateTime::from(*datetime), serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<UtcDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        time::serde::rfc3339::deserialize(deserializer).map(OffsetDateTime::to_utc)
    }
}
