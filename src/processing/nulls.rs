//! The null-value predicate shared by filling, deduplication and validation.

use serde::{Deserialize, Serialize};

use crate::types::Value;

/// Decides whether a value counts as null.
///
/// - missing / [`Value::Null`]: always null
/// - `""`: null iff `treat_empty_string_as_null`
/// - non-empty, all-whitespace string: null iff `treat_whitespace_as_null`
/// - a value contained in `custom_null_values` (exact, not case-folded): null
/// - float NaN: always null
pub fn is_null(
    value: Option<&Value>,
    custom_null_values: &[Value],
    treat_empty_string_as_null: bool,
    treat_whitespace_as_null: bool,
) -> bool {
    let Some(value) = value else {
        return true;
    };
    match value {
        Value::Null => return true,
        Value::Float64(f) if f.is_nan() => return true,
        Value::Utf8(s) if s.is_empty() => {
            if treat_empty_string_as_null {
                return true;
            }
        }
        Value::Utf8(s) if s.trim().is_empty() => {
            if treat_whitespace_as_null {
                return true;
            }
        }
        _ => {}
    }
    custom_null_values.contains(value)
}

/// Configured form of [`is_null`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NullPolicy {
    pub treat_empty_string_as_null: bool,
    pub treat_whitespace_as_null: bool,
    pub custom_null_values: Vec<Value>,
}

impl Default for NullPolicy {
    fn default() -> Self {
        Self {
            treat_empty_string_as_null: true,
            treat_whitespace_as_null: false,
            custom_null_values: Vec::new(),
        }
    }
}

impl NullPolicy {
    /// Only `null`, missing values and NaN count as null.
    pub fn strict() -> Self {
        Self {
            treat_empty_string_as_null: false,
            treat_whitespace_as_null: false,
            custom_null_values: Vec::new(),
        }
    }

    /// Treats `""` and whitespace-only strings as null too.
    pub fn blank_strings() -> Self {
        Self {
            treat_empty_string_as_null: true,
            treat_whitespace_as_null: true,
            custom_null_values: Vec::new(),
        }
    }

    pub fn with_custom_nulls(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.custom_null_values.extend(values);
        self
    }

    pub fn is_null(&self, value: Option<&Value>) -> bool {
        is_null(
            value,
            &self.custom_null_values,
            self.treat_empty_string_as_null,
            self.treat_whitespace_as_null,
        )
    }

    pub fn is_null_value(&self, value: &Value) -> bool {
        self.is_null(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::{NullPolicy, is_null};
    use crate::types::Value;

    #[test]
    fn missing_null_and_nan_are_always_null() {
        assert!(is_null(None, &[], false, false));
        assert!(is_null(Some(&Value::Null), &[], false, false));
        assert!(is_null(Some(&Value::Float64(f64::NAN)), &[], false, false));
        assert!(!is_null(Some(&Value::Int64(0)), &[], true, true));
    }

    #[test]
    fn empty_and_whitespace_flags_are_independent() {
        let empty = Value::from("");
        let blank = Value::from("   ");
        assert!(is_null(Some(&empty), &[], true, false));
        assert!(!is_null(Some(&empty), &[], false, true));
        assert!(is_null(Some(&blank), &[], false, true));
        assert!(!is_null(Some(&blank), &[], true, false));
    }

    #[test]
    fn custom_values_match_exactly() {
        let policy = NullPolicy::strict().with_custom_nulls([Value::from("N/A"), Value::Int64(-1)]);
        assert!(policy.is_null_value(&Value::from("N/A")));
        assert!(!policy.is_null_value(&Value::from("n/a")));
        assert!(policy.is_null_value(&Value::Float64(-1.0)));
    }
}
