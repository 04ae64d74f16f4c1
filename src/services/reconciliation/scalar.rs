use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Reconciled, Scalar, Value};

/// Majority vote over primitive values.
///
/// The most frequent value wins; ties go to the value seen first. Confidence
/// is the winner's share of the votes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarReconciler;

impl ScalarReconciler {
    /// Reconcile a list of values that must all be scalars.
    pub fn reconcile(values: &[Value]) -> DomainResult<Reconciled> {
        let scalars = values
            .iter()
            .map(|v| {
                v.as_scalar().ok_or_else(|| DomainError::SchemaMismatch {
                    path: "<root>".to_string(),
                    expected: "scalar".to_string(),
                    found: v.shape().to_string(),
                })
            })
            .collect::<DomainResult<Vec<_>>>()?;
        Self::reconcile_scalars(&scalars)
    }

    pub(crate) fn reconcile_scalars(values: &[&Scalar]) -> DomainResult<Reconciled> {
        if values.is_empty() {
            return Err(DomainError::InvalidInput(
                "cannot reconcile an empty list of values".to_string(),
            ));
        }

        // Scalars hold floats, so tally in first-seen order instead of hashing.
        let mut tally: Vec<(&Scalar, usize)> = Vec::new();
        for &value in values {
            match tally.iter_mut().find(|(seen, _)| *seen == value) {
                Some((_, count)) => *count += 1,
                None => tally.push((value, 1)),
            }
        }

        let mut best = tally[0];
        for candidate in &tally[1..] {
            if candidate.1 > best.1 {
                best = *candidate;
            }
        }

        let confidence = best.1 as f64 / values.len() as f64;
        Ok(Reconciled::new(Value::Scalar(best.0.clone()), confidence))
    }
}
