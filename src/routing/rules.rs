//! Rule-set definitions and their eager validation.
//!
//! A rule set is a JSON list:
//!
//! ```json
//! [
//!   {"name": "big", "logic": "AND", "priority": 2, "score": 0.9,
//!    "conditions": [{"field": "order.total", "operator": ">", "value": 100}]}
//! ]
//! ```
//!
//! `logic` defaults to `AND`, `priority`/`score` to `0`, a condition's `value` to `null`.
//! Every structural problem is reported as [`TransformError::InvalidRule`] before any record is
//! evaluated.

use serde::Serialize;
use serde_json::Value as Json;

use super::operators::Operator;
use crate::error::{TransformError, TransformResult};
use crate::types::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
    And,
    Or,
}

impl Logic {
    fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "AND" => Some(Logic::And),
            "OR" => Some(Logic::Or),
            _ => None,
        }
    }
}

/// One `field operator value` test. `field` is a dot path into the record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Checks operator-specific shape: `between` needs a two-item bound, `in`/`not_in` a list
    /// or string.
    pub(crate) fn validate(&self, rule: &str) -> TransformResult<()> {
        match self.operator {
            Operator::Between if !matches!(self.value.as_list(), Some([_, _])) => {
                Err(TransformError::invalid_rule(format!(
                    "condition on '{}' in rule '{rule}': 'between' expects a [low, high] value",
                    self.field
                )))
            }
            Operator::In | Operator::NotIn if !matches!(self.value, Value::List(_) | Value::Utf8(_)) => {
                Err(TransformError::invalid_rule(format!(
                    "condition on '{}' in rule '{rule}': '{}' expects a list or string value",
                    self.field, self.operator
                )))
            }
            Operator::Regex if self.value.as_str().is_none() => Err(TransformError::invalid_rule(
                format!("condition on '{}' in rule '{rule}': 'regex' expects a pattern string", self.field),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rule {
    pub name: String,
    pub conditions: Vec<Condition>,
    pub logic: Logic,
    pub priority: f64,
    pub score: f64,
}

impl Rule {
    pub fn new(name: impl Into<String>, logic: Logic, conditions: Vec<Condition>) -> Self {
        Self {
            name: name.into(),
            conditions,
            logic,
            priority: 0.0,
            score: 0.0,
        }
    }

    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }
}

/// An ordered, validated list of rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> TransformResult<Self> {
        for rule in &rules {
            if rule.name.trim().is_empty() {
                return Err(TransformError::invalid_rule("rule name must not be empty"));
            }
            for condition in &rule.conditions {
                condition.validate(&rule.name)?;
            }
        }
        Ok(Self { rules })
    }

    /// Parses and validates rule-set JSON text.
    pub fn from_json(text: &str) -> TransformResult<Self> {
        let json: Json = serde_json::from_str(text)
            .map_err(|e| TransformError::invalid_rule(format!("rules are not valid JSON: {e}")))?;
        Self::from_value(json)
    }

    pub fn from_value(json: Json) -> TransformResult<Self> {
        let Json::Array(items) = json else {
            return Err(TransformError::invalid_rule("rules must be a list"));
        };
        let rules = items
            .into_iter()
            .enumerate()
            .map(|(i, item)| parse_rule(i, item))
            .collect::<TransformResult<Vec<_>>>()?;
        Self::new(rules)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn number(value: Option<&Json>, what: &str, rule: &str) -> TransformResult<f64> {
    match value {
        None | Some(Json::Null) => Ok(0.0),
        Some(v) => v
            .as_f64()
            .ok_or_else(|| TransformError::invalid_rule(format!("rule '{rule}': {what} must be a number"))),
    }
}

fn parse_rule(index: usize, item: Json) -> TransformResult<Rule> {
    let Json::Object(mut obj) = item else {
        return Err(TransformError::invalid_rule(format!("rule {index} must be an object")));
    };
    let name = match obj.remove("name") {
        Some(Json::String(name)) => name,
        Some(other) => other.to_string(),
        None => return Err(TransformError::invalid_rule(format!("rule {index} is missing 'name'"))),
    };
    let Some(Json::Array(raw_conditions)) = obj.remove("conditions") else {
        return Err(TransformError::invalid_rule(format!(
            "rule '{name}' is missing a 'conditions' list"
        )));
    };
    let logic = match obj.remove("logic") {
        None | Some(Json::Null) => Logic::And,
        Some(Json::String(s)) => Logic::parse(&s).ok_or_else(|| {
            TransformError::invalid_rule(format!("rule '{name}': unknown logic '{s}'"))
        })?,
        Some(other) => {
            return Err(TransformError::invalid_rule(format!(
                "rule '{name}': unknown logic {other}"
            )));
        }
    };
    let priority = number(obj.get("priority"), "priority", &name)?;
    let score = number(obj.get("score"), "score", &name)?;

    let conditions = raw_conditions
        .into_iter()
        .enumerate()
        .map(|(j, raw)| parse_condition(&name, j, raw))
        .collect::<TransformResult<Vec<_>>>()?;

    Ok(Rule {
        name,
        conditions,
        logic,
        priority,
        score,
    })
}

fn parse_condition(rule: &str, index: usize, raw: Json) -> TransformResult<Condition> {
    let Json::Object(mut obj) = raw else {
        return Err(TransformError::invalid_rule(format!(
            "condition {index} of rule '{rule}' must be an object"
        )));
    };
    let Some(Json::String(field)) = obj.remove("field") else {
        return Err(TransformError::invalid_rule(format!(
            "condition {index} of rule '{rule}' is missing 'field'"
        )));
    };
    let Some(Json::String(op)) = obj.remove("operator") else {
        return Err(TransformError::invalid_rule(format!(
            "condition {index} of rule '{rule}' is missing 'operator'"
        )));
    };
    let operator: Operator = op
        .parse()
        .map_err(|_| TransformError::invalid_rule(format!("rule '{rule}': unknown operator '{op}'")))?;
    let value = obj.remove("value").map(Value::from).unwrap_or(Value::Null);
    Ok(Condition {
        field,
        operator,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::{Logic, RuleSet};
    use crate::error::TransformError;
    use crate::routing::operators::Operator;
    use crate::types::Value;

    fn rule_error(text: &str) -> String {
        match RuleSet::from_json(text) {
            Err(TransformError::InvalidRule { message }) => message,
            other => panic!("expected InvalidRule, got {other:?}"),
        }
    }

    #[test]
    fn parses_defaults() {
        let rules = RuleSet::from_json(
            r#"[{"name":"big","conditions":[{"field":"x","operator":">","value":10}]},
                {"name":"any","logic":"or","priority":3,"conditions":[{"field":"y","operator":"is_null"}]}]"#,
        )
        .unwrap();
        assert_eq!(rules.len(), 2);
        let big = &rules.rules()[0];
        assert_eq!(big.logic, Logic::And);
        assert_eq!(big.conditions[0].operator, Operator::Gt);
        assert_eq!(big.conditions[0].value, Value::Int64(10));
        let any = &rules.rules()[1];
        assert_eq!(any.logic, Logic::Or);
        assert_eq!(any.priority, 3.0);
        assert_eq!(any.conditions[0].value, Value::Null);
    }

    #[test]
    fn structural_problems_are_invalid_rules() {
        assert_eq!(rule_error(r#"{"name":"x"}"#), "rules must be a list");
        assert_eq!(rule_error(r#"[{"conditions":[]}]"#), "rule 0 is missing 'name'");
        assert_eq!(rule_error(r#"[{"name":"a"}]"#), "rule 'a' is missing a 'conditions' list");
        assert_eq!(
            rule_error(r#"[{"name":"a","logic":"XOR","conditions":[]}]"#),
            "rule 'a': unknown logic 'XOR'"
        );
        assert_eq!(
            rule_error(r#"[{"name":"a","conditions":[{"field":"x","operator":"~"}]}]"#),
            "rule 'a': unknown operator '~'"
        );
        assert_eq!(
            rule_error(r#"[{"name":"a","conditions":[{"operator":"=="}]}]"#),
            "condition 0 of rule 'a' is missing 'field'"
        );
        assert!(rule_error(r#"[{"name":"a","conditions":[{"field":"x","operator":"between","value":[1]}]}]"#)
            .contains("between"));
        assert!(rule_error("not json").starts_with("rules are not valid JSON"));
    }
}
