//! Deserializers that accept any scalar where a string is expected.
//!
//! Environment-variable config providers parse values, so
//! `MULTI_ACCOUNT_ACCOUNTS__US__TEST__SECRET=4242424242` arrives as an
//! integer. Credentials and account ids are strings regardless of how they
//! look.
//!
//! ```ignore
//! #[derive(Deserialize)]
//! struct Settings {
//!     #[serde(default, deserialize_with = "multi_account_sdk::scalar::option_string")]
//!     default_account: Option<String>,
//! }
//! ```

use std::fmt;

use serde::de::{self, Deserializer, Visitor};

struct ScalarString;

impl Visitor<'_> for ScalarString {
    type Value = String;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string, number or boolean")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<String, E> {
        Ok(v.to_owned())
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<String, E> {
        Ok(v)
    }

    fn visit_char<E: de::Error>(self, v: char) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_i128<E: de::Error>(self, v: i128) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<String, E> {
        Ok(v.to_string())
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<String, E> {
        Ok(v.to_string())
    }
}

struct OptionalScalarString;

impl<'de> Visitor<'de> for OptionalScalarString {
    type Value = Option<String>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("an optional string, number or boolean")
    }

    fn visit_none<E: de::Error>(self) -> Result<Option<String>, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Option<String>, E> {
        Ok(None)
    }

    fn visit_some<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        string(deserializer).map(Some)
    }
}

/// Deserialize a string, stringifying numbers and booleans.
///
/// # Errors
/// Fails on sequences, maps and other non-scalar input.
pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    deserializer.deserialize_any(ScalarString)
}

/// [`string`] for optional fields; `null` maps to `None`.
///
/// # Errors
/// Fails on sequences, maps and other non-scalar input.
pub fn option_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    deserializer.deserialize_option(OptionalScalarString)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Fields {
        #[serde(deserialize_with = "super::string")]
        id: String,
        #[serde(default, deserialize_with = "super::option_string")]
        name: Option<String>,
    }

    fn parse(value: serde_json::Value) -> Result<Fields, serde_json::Error> {
        serde_json::from_value(value)
    }

    #[test]
    fn numbers_and_booleans_are_stringified() {
        let p = parse(json!({ "id": 4_242_424_242_u64, "name": true })).unwrap();
        assert_eq!(p.id, "4242424242");
        assert_eq!(p.name.as_deref(), Some("true"));

        let p = parse(json!({ "id": -7, "name": 1.5 })).unwrap();
        assert_eq!(p.id, "-7");
        assert_eq!(p.name.as_deref(), Some("1.5"));
    }

    #[test]
    fn strings_pass_through_and_null_is_none() {
        let p = parse(json!({ "id": "us", "name": null })).unwrap();
        assert_eq!(p.id, "us");
        assert_eq!(p.name, None);

        let p = parse(json!({ "id": "eu" })).unwrap();
        assert_eq!(p.name, None);
    }

    #[test]
    fn non_scalars_are_rejected() {
        assert!(parse(json!({ "id": ["us"] })).is_err());
        assert!(parse(json!({ "id": "us", "name": { "a": 1 } })).is_err());
    }
}
