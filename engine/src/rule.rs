use std::sync::Arc;

use serde::Deserialize;

use crate::indicators::{Indicator, IndicatorError, IndicatorLibrary, Parameters};
use crate::operator;

/// One `indicators[]` entry of a registration request.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSpec {
    pub indicator: String,
    #[serde(default)]
    pub parameters: Parameters,
    pub operator: String,
    pub threshold: f64,
}

/// Immutable indicator/operator/threshold condition of a job.
///
/// The operator is kept verbatim; an unrecognised one only fails when the
/// rule is evaluated, so it never blocks sibling rules at registration.
#[derive(Debug, Clone)]
pub struct IndicatorRule {
    pub name: String,
    pub parameters: Parameters,
    pub operator: String,
    pub threshold: f64,
    indicator: Arc<dyn Indicator>,
}

/// Result of one rule on one update.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub met: bool,
    pub detail: String,
}

impl RuleOutcome {
    pub fn failed(name: &str, reason: impl std::fmt::Display) -> Self {
        Self {
            met: false,
            detail: format!("{name} error: {reason}"),
        }
    }
}

impl IndicatorRule {
    pub fn from_spec(spec: RuleSpec, library: &IndicatorLibrary) -> Result<Self, IndicatorError> {
        let indicator = library.build(&spec.indicator, &spec.parameters)?;
        Ok(Self {
            name: spec.indicator,
            parameters: spec.parameters,
            operator: spec.operator,
            threshold: spec.threshold,
            indicator,
        })
    }

    pub fn compute(&self, closes: &[f64]) -> f64 {
        self.indicator.compute(closes)
    }

    pub fn evaluate(&self, value: f64, previous: f64) -> RuleOutcome {
        match operator::evaluate(&self.operator, value, self.threshold, previous) {
            Ok(met) => RuleOutcome {
                met,
                detail: format!(
                    "{} => current: {:.4}, prev: {:.4}, op: {}, thr: {:.4}, met: {}",
                    self.name, value, previous, self.operator, self.threshold, met
                ),
            },
            Err(e) => RuleOutcome::failed(&self.name, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rule(op: &str, threshold: f64) -> IndicatorRule {
        let spec: RuleSpec = serde_json::from_value(json!({
            "indicator": "RSI",
            "parameters": {"period": 14},
            "operator": op,
            "threshold": threshold
        }))
        .unwrap();
        IndicatorRule::from_spec(spec, &IndicatorLibrary::default()).unwrap()
    }

    #[test]
    fn detail_text_format() {
        let out = rule("CROSSING UP", 50.0).evaluate(55.5, 45.25);

        assert!(out.met);
        assert_eq!(
            out.detail,
            "RSI => current: 55.5000, prev: 45.2500, op: CROSSING UP, thr: 50.0000, met: true"
        );
    }

    #[test]
    fn unknown_operator_is_rule_level_failure() {
        let out = rule("ABOVE-ISH", 50.0).evaluate(99.0, 0.0);

        assert!(!out.met);
        assert_eq!(out.detail, "RSI error: unknown operator: ABOVE-ISH");
    }

    #[test]
    fn spec_rejects_unknown_indicator() {
        let spec: RuleSpec = serde_json::from_value(json!({
            "indicator": "MACD", "operator": "CROSSING", "threshold": 0
        }))
        .unwrap();

        let err = IndicatorRule::from_spec(spec, &IndicatorLibrary::default()).unwrap_err();
        assert_eq!(err, IndicatorError::Unknown("MACD".into()));
    }

    #[test]
    fn missing_parameters_default_to_empty() {
        let spec: RuleSpec = serde_json::from_value(json!({
            "indicator": "EMA", "operator": "GREATER THAN", "threshold": 1.5
        }))
        .unwrap();

        assert!(spec.parameters.is_empty());
        assert!(IndicatorRule::from_spec(spec, &IndicatorLibrary::default()).is_err());
    }
}
