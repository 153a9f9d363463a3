//! The comparison operator table.

use std::cmp::Ordering;

use regex::Regex;

use crate::config::strategy_enum;
use crate::types::{DataType, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Regex,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    Between,
}

strategy_enum!(Operator, "operator", {
    Eq => "==",
    Ne => "!=",
    Gt => ">",
    Ge => ">=",
    Lt => "<",
    Le => "<=",
    Contains => "contains",
    NotContains => "not_contains",
    StartsWith => "starts_with",
    EndsWith => "ends_with",
    Regex => "regex",
    In => "in",
    NotIn => "not_in",
    IsNull => "is_null",
    IsNotNull => "is_not_null",
    Between => "between",
});

impl Operator {
    /// Operators that look only at the actual value.
    pub fn is_unary(self) -> bool {
        matches!(self, Operator::IsNull | Operator::IsNotNull)
    }

    /// The value whose type strict typing coerces the actual value to.
    ///
    /// Membership and range operators take their element type from the first list item.
    pub fn coercion_target(self, expected: &Value) -> Option<DataType> {
        match self {
            Operator::In | Operator::NotIn | Operator::Between => match expected {
                Value::List(items) => items.first().and_then(Value::data_type),
                other => other.data_type(),
            },
            Operator::IsNull | Operator::IsNotNull | Operator::Regex => None,
            _ => expected.data_type(),
        }
    }
}

/// Settings shared by every comparison of one evaluation.
#[derive(Debug, Clone, Copy)]
pub struct Comparison {
    pub case_sensitive: bool,
}

impl Comparison {
    fn fold(&self, s: &str) -> String {
        if self.case_sensitive {
            s.to_string()
        } else {
            s.to_lowercase()
        }
    }

    fn equals(&self, a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Utf8(a), Value::Utf8(b)) if !self.case_sensitive => a.to_lowercase() == b.to_lowercase(),
            _ => a == b,
        }
    }

    fn order(&self, a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Utf8(a), Value::Utf8(b)) if !self.case_sensitive => {
                Some(a.to_lowercase().cmp(&b.to_lowercase()))
            }
            _ => a.partial_compare(b),
        }
    }

    /// `needle` occurs in `haystack`: substring for strings, membership for lists, key lookup
    /// for mappings.
    fn contains(&self, haystack: &Value, needle: &Value) -> bool {
        match haystack {
            Value::Utf8(s) => self.fold(s).contains(&self.fold(&needle.to_string())),
            Value::List(items) => items.iter().any(|item| self.equals(item, needle)),
            Value::Map(record) => {
                let key = needle.to_string();
                record.keys().any(|k| self.fold(k) == self.fold(&key))
            }
            _ => false,
        }
    }

    /// Applies `op`. `pattern` is the precompiled expression for [`Operator::Regex`].
    pub fn apply(&self, op: Operator, actual: &Value, expected: &Value, pattern: Option<&Regex>) -> bool {
        match op {
            Operator::Eq => self.equals(actual, expected),
            Operator::Ne => !self.equals(actual, expected),
            Operator::Gt => self.order(actual, expected) == Some(Ordering::Greater),
            Operator::Ge => matches!(self.order(actual, expected), Some(Ordering::Greater | Ordering::Equal)),
            Operator::Lt => self.order(actual, expected) == Some(Ordering::Less),
            Operator::Le => matches!(self.order(actual, expected), Some(Ordering::Less | Ordering::Equal)),
            Operator::Contains => self.contains(actual, expected),
            Operator::NotContains => !self.contains(actual, expected),
            Operator::StartsWith => self
                .fold(&actual.to_string())
                .starts_with(&self.fold(&expected.to_string())),
            Operator::EndsWith => self
                .fold(&actual.to_string())
                .ends_with(&self.fold(&expected.to_string())),
            Operator::Regex => pattern.is_some_and(|re| re.is_match(&actual.to_string())),
            Operator::In => self.contains(expected, actual),
            Operator::NotIn => !self.contains(expected, actual),
            Operator::IsNull => actual.is_null(),
            Operator::IsNotNull => !actual.is_null(),
            Operator::Between => match expected.as_list() {
                Some([low, high]) => {
                    matches!(self.order(actual, low), Some(Ordering::Greater | Ordering::Equal))
                        && matches!(self.order(actual, high), Some(Ordering::Less | Ordering::Equal))
                }
                _ => false,
            },
        }
    }
}
