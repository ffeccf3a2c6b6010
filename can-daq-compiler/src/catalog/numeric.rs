//! Serde helpers for A2L-style numbers
//!
//! Catalog files carry numbers either as JSON integers or as strings in the
//! A2L notation (`"0x1F"`, `"42"`).

use crate::types::CanId;
use serde::de::Error;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Int(u64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCanId {
    Raw(RawNumber),
    Fields {
        id: RawNumber,
        #[serde(default)]
        extended: bool,
    },
}

/// Parse an integer written either in decimal or with a `0x` prefix
pub fn parse_int(text: &str) -> Option<u64> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

/// Parse a hexadecimal integer, with or without the `0x` prefix
pub fn parse_hex(text: &str) -> Option<u64> {
    let text = text.trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u64::from_str_radix(digits, 16).ok()
}

fn resolve<E: Error>(raw: RawNumber) -> Result<u64, E> {
    match raw {
        RawNumber::Int(value) => Ok(value),
        RawNumber::Text(text) => {
            parse_int(&text).ok_or_else(|| E::custom(format!("invalid number '{}'", text)))
        }
    }
}

fn narrow<T, E>(value: u64) -> Result<T, E>
where
    T: TryFrom<u64>,
    E: Error,
{
    T::try_from(value).map_err(|_| E::custom(format!("number {} out of range", value)))
}

pub fn hex_or_int<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    let value = resolve(RawNumber::deserialize(deserializer)?)?;
    narrow(value)
}

pub fn hex_or_int_opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    match Option::<RawNumber>::deserialize(deserializer)? {
        Some(raw) => Ok(Some(narrow(resolve(raw)?)?)),
        None => Ok(None),
    }
}

fn resolve_can_id<E: Error>(raw: RawCanId) -> Result<CanId, E> {
    match raw {
        RawCanId::Raw(number) => Ok(CanId::from_raw(narrow(resolve(number)?)?)),
        RawCanId::Fields { id, extended } => {
            let id: u32 = narrow(resolve(id)?)?;
            Ok(if extended {
                CanId::extended(id)
            } else {
                CanId::from_raw(id)
            })
        }
    }
}

/// Accepts `"0x80000701"`, `2147485441` or `{ "id": "0x701", "extended": true }`
pub fn can_id<'de, D>(deserializer: D) -> Result<CanId, D::Error>
where
    D: Deserializer<'de>,
{
    resolve_can_id(RawCanId::deserialize(deserializer)?)
}

pub fn can_id_opt<'de, D>(deserializer: D) -> Result<Option<CanId>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawCanId>::deserialize(deserializer)? {
        Some(raw) => Ok(Some(resolve_can_id(raw)?)),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("0x1F"), Some(0x1F));
        assert_eq!(parse_int(" 42 "), Some(42));
        assert_eq!(parse_int("0X0040"), Some(64));
        assert_eq!(parse_int("abc"), None);
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("10"), Some(0x10));
        assert_eq!(parse_hex("0x0A"), Some(0x0A));
        assert_eq!(parse_hex("zz"), None);
    }
}
