use std::collections::{BTreeMap, BTreeSet};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Reconciled, Value};
use crate::domain::ports::ReconcilerOverrides;

use super::{display_path, join_path, Reconciler};

/// Key-by-key reconciliation of records.
///
/// Every key present in at least one input is reconciled from the inputs that
/// carry it. Per-field overrides registered on the task type take precedence
/// over shape dispatch.
#[derive(Debug, Clone, Default)]
pub struct StructuredReconciler {
    overrides: ReconcilerOverrides,
}

impl StructuredReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides(mut self, overrides: ReconcilerOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Reconcile a list of values that must all be records.
    pub fn reconcile(&self, values: &[Value]) -> DomainResult<Reconciled> {
        super::reconcile_payloads(values, &self.overrides)
    }
}

pub(super) fn reconcile_records(
    reconciler: &Reconciler<'_>,
    records: &[&BTreeMap<String, Value>],
    path: &str,
) -> DomainResult<Reconciled> {
    if records.is_empty() {
        return Err(DomainError::InvalidInput(format!(
            "no records to reconcile at '{}'",
            display_path(path)
        )));
    }

    let keys: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.keys().map(String::as_str))
        .collect();

    let mut fields = BTreeMap::new();
    let mut confidence: f64 = 1.0;

    for key in keys {
        // Inputs missing the key abstain.
        let values: Vec<&Value> = records.iter().filter_map(|r| r.get(key)).collect();
        let field_path = join_path(path, key);

        let reconciled = match reconciler.override_for(&field_path) {
            Some(custom) => {
                let r = custom.reconcile(&values)?;
                Reconciled::new(r.value, r.confidence)
            }
            None => reconciler.reconcile(&values, &field_path)?,
        };

        tracing::trace!(
            path = %field_path,
            votes = values.len(),
            confidence = reconciled.confidence,
            "reconciled field"
        );

        confidence = confidence.min(reconciled.confidence);
        fields.insert(key.to_string(), reconciled.value);
    }

    Ok(Reconciled::new(Value::Record(fields), confidence))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::reconciliation::UnanimousReconciler;
    use serde_json::json;

    fn records(items: &[serde_json::Value]) -> Vec<Value> {
        items.iter().cloned().map(Value::from).collect()
    }

    #[test]
    fn test_minimum_over_fields() {
        let result = StructuredReconciler::new()
            .reconcile(&records(&[
                json!({"name": "Acme", "city": "Lodz"}),
                json!({"name": "Acme", "city": "Lodz"}),
                json!({"name": "Acme", "city": "Lodz"}),
                json!({"name": "Acme", "city": "Kalisz"}),
            ]))
            .unwrap();
        assert_eq!(result.value.to_json(), json!({"name": "Acme", "city": "Lodz"}));
        assert!((result.confidence - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_missing_key_abstains() {
        let result = StructuredReconciler::new()
            .reconcile(&records(&[
                json!({"name": "Acme", "note": "x"}),
                json!({"name": "Acme"}),
            ]))
            .unwrap();
        // "note" is reconciled from the single input that has it.
        assert_eq!(result.value.to_json(), json!({"name": "Acme", "note": "x"}));
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_empty_records_are_certain() {
        let result = StructuredReconciler::new()
            .reconcile(&records(&[json!({}), json!({})]))
            .unwrap();
        assert_eq!(result.value, Value::default());
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_nested_record_paths() {
        let result = StructuredReconciler::new()
            .reconcile(&records(&[
                json!({"owner": {"name": "Jan", "age": 40}}),
                json!({"owner": {"name": "Jan", "age": 41}}),
            ]))
            .unwrap();
        assert_eq!(result.value.to_json(), json!({"owner": {"name": "Jan", "age": 40}}));
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn test_nested_mismatch_reports_dotted_path() {
        let err = StructuredReconciler::new()
            .reconcile(&records(&[
                json!({"owner": {"age": 40}}),
                json!({"owner": {"age": [40]}}),
            ]))
            .unwrap_err();
        match err {
            DomainError::SchemaMismatch { path, .. } => assert_eq!(path, "owner.age"),
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_override_confidence_is_clamped() {
        let overrides = ReconcilerOverrides::new().with(
            "score",
            |values: &[&Value]| -> DomainResult<Reconciled> {
                Ok(Reconciled {
                    value: values[0].clone(),
                    confidence: 7.0,
                })
            },
        );
        let result = StructuredReconciler::new()
            .with_overrides(overrides)
            .reconcile(&records(&[json!({"score": 1}), json!({"score": 2})]))
            .unwrap();
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_override_only_applies_to_its_path() {
        let overrides = ReconcilerOverrides::new().with("a", UnanimousReconciler);
        let result = StructuredReconciler::new()
            .with_overrides(overrides)
            .reconcile(&records(&[
                json!({"a": 1, "b": 1}),
                json!({"a": 1, "b": 2}),
            ]))
            .unwrap();
        assert_eq!(result.confidence, 0.5);
    }
}
