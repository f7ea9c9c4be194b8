//! Wire format for timestamps: `YYYY-MM-DD HH:MM:SS`, always UTC.
//!
//! Use with `#[serde(with = "crate::timefmt")]`; the submodules cover
//! nullable fields and fields where "absent" and "explicitly empty" differ.

use serde::{de, ser, Deserialize, Deserializer, Serializer};
use time::{
    format_description::FormatItem, macros::format_description, Duration, OffsetDateTime,
    PrimitiveDateTime, UtcOffset,
};

pub const FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Drops sub-second precision so stored values compare consistently.
pub fn truncate(t: OffsetDateTime) -> OffsetDateTime {
    let t = t.to_offset(UtcOffset::UTC);
    t - Duration::nanoseconds(i64::from(t.nanosecond()))
}

pub fn now() -> OffsetDateTime {
    truncate(OffsetDateTime::now_utc())
}

pub fn format(t: OffsetDateTime) -> Result<String, time::error::Format> {
    t.to_offset(UtcOffset::UTC).format(FORMAT)
}

pub fn parse(raw: &str) -> Result<OffsetDateTime, time::error::Parse> {
    PrimitiveDateTime::parse(raw.trim(), FORMAT).map(PrimitiveDateTime::assume_utc)
}

pub fn serialize<S: Serializer>(t: &OffsetDateTime, s: S) -> Result<S::Ok, S::Error> {
    let text = format(*t).map_err(ser::Error::custom)?;
    s.serialize_str(&text)
}

pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<OffsetDateTime, D::Error> {
    let raw = String::deserialize(d)?;
    parse(&raw).map_err(de::Error::custom)
}

/// `null` and `""` both mean "no value".
pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(t: &Option<OffsetDateTime>, s: S) -> Result<S::Ok, S::Error> {
        match t {
            Some(t) => super::serialize(t, s),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        match Option::<String>::deserialize(d)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => parse(&raw).map(Some).map_err(de::Error::custom),
        }
    }
}

/// Three states for partial updates, paired with `#[serde(default)]`:
/// `None` = field absent, `Some(None)` = explicitly empty, `Some(Some(t))` = value.
pub mod present {
    use super::*;

    pub fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<Option<OffsetDateTime>>, D::Error> {
        option::deserialize(d).map(Some)
    }
}
