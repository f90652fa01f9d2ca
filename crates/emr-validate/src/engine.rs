//! Rule engine that checks a cohort record against sum-consistency rules.
//!
//! Every rule is evaluated, independent of earlier violations, and violations
//! are reported in rule declaration order. A field missing from the record is
//! a hard error for the whole run.

use emr_model::CohortData;
use serde::Serialize;
use tracing::debug;

use crate::error::{Result, ValidationError};
use crate::rules::{ValidationRule, cohort_rules};

/// A rule that did not hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleViolation {
    /// Index of the rule in declaration order.
    pub rule: usize,
    /// The rule's error message.
    pub error: String,
    /// Comparator field name.
    pub comparator: String,
    /// Value stored under the comparator.
    pub expected: i64,
    /// Sum of the indicator values.
    pub actual: i64,
}

/// Outcome of validating one cohort record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CohortReport {
    pub rules_checked: usize,
    pub violations: Vec<RuleViolation>,
}

impl CohortReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Error messages of every violated rule, in declaration order.
    pub fn errors(&self) -> Vec<String> {
        self.violations
            .iter()
            .map(|violation| violation.error.clone())
            .collect()
    }
}

/// Rule engine holding an ordered rule set.
#[derive(Debug, Clone, Default)]
pub struct RuleEngine {
    rules: Vec<ValidationRule>,
}

impl RuleEngine {
    /// Create a new empty rule engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine loaded with the default cohort rule set.
    pub fn cohort() -> Self {
        Self {
            rules: cohort_rules().to_vec(),
        }
    }

    /// Append rules after the ones already registered.
    pub fn add_rules(&mut self, rules: impl IntoIterator<Item = ValidationRule>) {
        self.rules.extend(rules);
    }

    pub fn rules(&self) -> &[ValidationRule] {
        &self.rules
    }

    /// Evaluate every rule against `data`.
    pub fn execute(&self, data: &CohortData) -> Result<CohortReport> {
        let violations = find_violations(data, &self.rules)?;
        Ok(CohortReport {
            rules_checked: self.rules.len(),
            violations,
        })
    }
}

/// Error messages of every rule in `rules` that `data` violates.
pub fn validate(data: &CohortData, rules: &[ValidationRule]) -> Result<Vec<String>> {
    Ok(find_violations(data, rules)?
        .into_iter()
        .map(|violation| violation.error)
        .collect())
}

/// Validate against the default cohort rule set.
pub fn validate_cohort(data: &CohortData) -> Result<Vec<String>> {
    validate(data, cohort_rules())
}

/// Every violated rule with its expected and actual values.
pub fn find_violations(
    data: &CohortData,
    rules: &[ValidationRule],
) -> Result<Vec<RuleViolation>> {
    let mut violations = Vec::new();
    for (index, rule) in rules.iter().enumerate() {
        let expected = field(data, index, rule.comparator())?;
        let actual = sum_indicators(data, index, rule)?;
        if expected != actual {
            debug!(
                rule = index,
                comparator = rule.comparator(),
                expected,
                actual,
                "cohort rule violated"
            );
            violations.push(RuleViolation {
                rule: index,
                error: rule.error().to_string(),
                comparator: rule.comparator().to_string(),
                expected,
                actual,
            });
        }
    }
    Ok(violations)
}

fn sum_indicators(data: &CohortData, index: usize, rule: &ValidationRule) -> Result<i64> {
    rule.indicators().iter().try_fold(0i64, |sum, indicator| {
        let value = field(data, index, indicator)?;
        sum.checked_add(value)
            .ok_or(ValidationError::Overflow { rule: index })
    })
}

fn field(data: &CohortData, rule: usize, name: &str) -> Result<i64> {
    data.get(name).ok_or_else(|| ValidationError::MissingField {
        rule,
        field: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(indicators: &[&str], comparator: &str, error: &str) -> ValidationRule {
        ValidationRule::new(indicators.iter().copied(), comparator, error).unwrap()
    }

    fn data(pairs: &[(&str, i64)]) -> CohortData {
        pairs.iter().map(|(k, v)| (*k, *v)).collect()
    }

    #[test]
    fn reports_mismatch() {
        let rules = [rule(&["a", "b"], "total", "mismatch")];
        let errors = validate(&data(&[("a", 2), ("b", 3), ("total", 6)]), &rules).unwrap();
        assert_eq!(errors, vec!["mismatch".to_string()]);
    }

    #[test]
    fn passes_when_sum_matches() {
        let rules = [rule(&["a", "b"], "total", "mismatch")];
        let errors = validate(&data(&[("a", 2), ("b", 3), ("total", 5)]), &rules).unwrap();
        assert!(errors.is_empty());
    }

    #[test]
    fn missing_indicator_is_fatal() {
        let rules = [rule(&["a", "b"], "total", "mismatch")];
        let err = validate(&data(&[("a", 2), ("total", 2)]), &rules).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                rule: 0,
                field: "b".to_string()
            }
        );
    }

    #[test]
    fn missing_comparator_is_fatal() {
        let rules = [rule(&["a"], "total", "mismatch")];
        assert!(matches!(
            validate(&data(&[("a", 1)]), &rules),
            Err(ValidationError::MissingField { .. })
        ));
    }

    #[test]
    fn violations_follow_declaration_order() {
        let rules = [
            rule(&["a"], "x", "first"),
            rule(&["a"], "y", "second"),
            rule(&["a"], "z", "third"),
        ];
        let cohort = data(&[("a", 1), ("x", 2), ("y", 1), ("z", 0)]);
        let errors = validate(&cohort, &rules).unwrap();
        assert_eq!(errors, vec!["first".to_string(), "third".to_string()]);
    }

    #[test]
    fn overflow_is_reported() {
        let rules = [rule(&["a", "b"], "total", "mismatch")];
        let cohort = data(&[("a", i64::MAX), ("b", 1), ("total", 0)]);
        assert_eq!(
            validate(&cohort, &rules),
            Err(ValidationError::Overflow { rule: 0 })
        );
    }

    #[test]
    fn engine_collects_details() {
        let mut engine = RuleEngine::new();
        engine.add_rules([rule(&["a", "b"], "total", "mismatch")]);
        let report = engine
            .execute(&data(&[("a", 2), ("b", 3), ("total", 6)]))
            .unwrap();
        assert_eq!(report.rules_checked, 1);
        assert!(!report.is_valid());
        assert_eq!(report.violations[0].expected, 6);
        assert_eq!(report.violations[0].actual, 5);
        assert_eq!(report.errors(), vec!["mismatch".to_string()]);
    }
}
