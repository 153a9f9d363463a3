//! Loading options from JSON.
//!
//! Every options struct in this crate implements `Default` and `Deserialize` with
//! `#[serde(default)]`, so a host can pass only the keys it wants to override.

use serde::de::DeserializeOwned;

use crate::error::{TransformError, TransformResult};

/// Deserializes options from JSON text. Blank text yields the defaults.
pub fn options_from_json<T: DeserializeOwned + Default>(text: &str) -> TransformResult<T> {
    if text.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(text).map_err(|e| TransformError::invalid_config(e.to_string()))
}

/// Deserializes options from an already-parsed JSON value.
pub fn options_from_value<T: DeserializeOwned>(value: serde_json::Value) -> TransformResult<T> {
    serde_json::from_value(value).map_err(|e| TransformError::invalid_config(e.to_string()))
}

/// Implements `FromStr`, `Display` and string-based serde for a strategy enum.
///
/// Unknown names fail with [`TransformError::UnknownStrategy`].
macro_rules! strategy_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::TransformError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($text => Ok($name::$variant),)+
                    other => Err($crate::error::TransformError::UnknownStrategy {
                        kind: $kind,
                        name: other.to_string(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = <String as serde::Deserialize>::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use strategy_enum;
