//! Consensus reconciliation of redundant entry payloads.
//!
//! Values gathered from several entries are reconciled according to their
//! shape:
//! - scalars by majority vote ([`ScalarReconciler`])
//! - ordered sequences position by position, gated by length agreement
//!   ([`OrderedSequenceReconciler`])
//! - records key by key, recursively ([`StructuredReconciler`])
//!
//! Every reconciler returns a value of the same shape as its inputs together
//! with a confidence in [0, 1]. Disagreement between users only ever lowers the
//! confidence; errors are reserved for caller bugs (empty input) and payloads
//! whose shapes cannot be compared at all.

pub mod record;
pub mod scalar;
pub mod sequence;

pub use record::StructuredReconciler;
pub use scalar::ScalarReconciler;
pub use sequence::{length_confidence, OrderedSequenceReconciler};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Reconciled, Shape, Value};
use crate::domain::ports::{FieldReconciler, ReconcilerOverrides};

/// Shape-dispatching reconciler carrying the per-field overrides of one task
/// type.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler<'a> {
    overrides: &'a ReconcilerOverrides,
}

impl<'a> Reconciler<'a> {
    pub fn new(overrides: &'a ReconcilerOverrides) -> Self {
        Self { overrides }
    }

    /// Reconcile the values gathered for one field.
    ///
    /// All values must share the shape of the first one.
    pub fn reconcile(&self, values: &[&Value], path: &str) -> DomainResult<Reconciled> {
        let first = values.first().ok_or_else(|| {
            DomainError::InvalidInput(format!("no values to reconcile at '{}'", display_path(path)))
        })?;
        let shape = first.shape();

        if let Some(odd) = values.iter().find(|v| v.shape() != shape) {
            return Err(DomainError::SchemaMismatch {
                path: display_path(path).to_string(),
                expected: shape.to_string(),
                found: odd.shape().to_string(),
            });
        }

        match shape {
            Shape::Scalar => {
                let scalars: Vec<_> = values.iter().filter_map(|v| v.as_scalar()).collect();
                ScalarReconciler::reconcile_scalars(&scalars)
            }
            Shape::Sequence => {
                let sequences: Vec<_> = values.iter().filter_map(|v| v.as_sequence()).collect();
                sequence::reconcile_sequences(self, &sequences, path)
            }
            Shape::Record => {
                let records: Vec<_> = values.iter().filter_map(|v| v.as_record()).collect();
                record::reconcile_records(self, &records, path)
            }
        }
    }

    /// Override registered for a field path, if any.
    fn override_for(&self, path: &str) -> Option<&dyn FieldReconciler> {
        self.overrides.get(path).map(|r| &**r)
    }
}

/// Reconcile the payloads of all entries of a task. Payloads must be records.
pub fn reconcile_payloads<'v>(
    payloads: impl IntoIterator<Item = &'v Value>,
    overrides: &ReconcilerOverrides,
) -> DomainResult<Reconciled> {
    let records = payloads
        .into_iter()
        .map(|p| {
            p.as_record().ok_or_else(|| DomainError::SchemaMismatch {
                path: display_path("").to_string(),
                expected: Shape::Record.to_string(),
                found: p.shape().to_string(),
            })
        })
        .collect::<DomainResult<Vec<_>>>()?;

    if records.is_empty() {
        return Err(DomainError::InvalidInput(
            "cannot reconcile an empty list of entries".to_string(),
        ));
    }

    record::reconcile_records(&Reconciler::new(overrides), &records, "")
}

/// Confidence 1 when every value is identical, 0 otherwise. The first value
/// is returned either way.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnanimousReconciler;

impl FieldReconciler for UnanimousReconciler {
    fn reconcile(&self, values: &[&Value]) -> DomainResult<Reconciled> {
        let first = values.first().ok_or_else(|| {
            DomainError::InvalidInput("no values to reconcile".to_string())
        })?;
        let confidence = if values.iter().all(|v| v == first) { 1.0 } else { 0.0 };
        Ok(Reconciled::new((*first).clone(), confidence))
    }
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payloads(items: &[serde_json::Value]) -> Vec<Value> {
        items.iter().cloned().map(Value::from).collect()
    }

    #[test]
    fn test_identical_payloads_are_certain() {
        let data = json!({"fld": "val1"});
        let result =
            reconcile_payloads(&payloads(&[data.clone(), data.clone()]), &ReconcilerOverrides::new())
                .unwrap();
        assert_eq!(result.value.to_json(), data);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_complex_payloads() {
        let data = json!({"cars": [{"model": "A", "year": 2011}, {"model": "B", "year": 2012}]});
        let result =
            reconcile_payloads(&payloads(&[data.clone(), data.clone()]), &ReconcilerOverrides::new())
                .unwrap();
        assert_eq!(result.value.to_json(), data);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_disagreeing_payloads_lower_confidence() {
        let result = reconcile_payloads(
            &payloads(&[json!({"fld": "val1"}), json!({"fld": "whatever"})]),
            &ReconcilerOverrides::new(),
        )
        .unwrap();
        assert_eq!(result.confidence, 0.5);
    }

    #[test]
    fn test_empty_entry_list_is_invalid() {
        let err = reconcile_payloads(&Vec::<Value>::new(), &ReconcilerOverrides::new()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn test_non_record_payload_is_schema_mismatch() {
        let err = reconcile_payloads(
            &payloads(&[json!({"a": 1}), json!([1, 2])]),
            &ReconcilerOverrides::new(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_field_shape_mismatch_names_path() {
        let err = reconcile_payloads(
            &payloads(&[json!({"owner": "Jan"}), json!({"owner": {"name": "Jan"}})]),
            &ReconcilerOverrides::new(),
        )
        .unwrap_err();
        match err {
            DomainError::SchemaMismatch { path, expected, found } => {
                assert_eq!(path, "owner");
                assert_eq!(expected, "scalar");
                assert_eq!(found, "record");
            }
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_override_replaces_dispatch_for_path() {
        let overrides = ReconcilerOverrides::new().with("name", UnanimousReconciler);
        let result = reconcile_payloads(
            &payloads(&[
                json!({"name": "a", "year": 1}),
                json!({"name": "a", "year": 1}),
                json!({"name": "b", "year": 1}),
            ]),
            &overrides,
        )
        .unwrap();
        // Majority vote would give 2/3; the unanimous rule gives 0.
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn test_override_reaches_fields_inside_sequences() {
        let overrides = ReconcilerOverrides::new().with(
            "cars.model",
            |values: &[&Value]| -> DomainResult<Reconciled> {
                Ok(Reconciled::new(Value::from("forced"), values.len() as f64 / 10.0))
            },
        );
        let result = reconcile_payloads(
            &payloads(&[
                json!({"cars": [{"model": "A"}]}),
                json!({"cars": [{"model": "A"}]}),
            ]),
            &overrides,
        )
        .unwrap();
        assert_eq!(result.value.to_json(), json!({"cars": [{"model": "forced"}]}));
        assert!((result.confidence - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_unanimous_reconciler() {
        let a = Value::from("a");
        let b = Value::from("b");
        let same = UnanimousReconciler.reconcile(&[&a, &a]).unwrap();
        assert_eq!(same.confidence, 1.0);
        let differ = UnanimousReconciler.reconcile(&[&a, &b]).unwrap();
        assert_eq!(differ.confidence, 0.0);
        assert_eq!(differ.value, a);
        assert!(UnanimousReconciler.reconcile(&[]).is_err());
    }
}
