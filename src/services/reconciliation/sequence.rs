use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Reconciled, Value};
use crate::domain::ports::ReconcilerOverrides;

use super::{display_path, Reconciler};

/// Position-wise reconciliation of ordered sequences.
///
/// Only positions present in every input are reconciled, so the result is as
/// long as the shortest input. The overall confidence is capped by how well
/// the input lengths agree.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderedSequenceReconciler;

impl OrderedSequenceReconciler {
    /// Reconcile a list of values that must all be sequences.
    pub fn reconcile(values: &[Value]) -> DomainResult<Reconciled> {
        let refs: Vec<&Value> = values.iter().collect();
        Reconciler::new(&ReconcilerOverrides::default()).reconcile_sequence_values(&refs, "")
    }
}

impl Reconciler<'_> {
    fn reconcile_sequence_values(&self, values: &[&Value], path: &str) -> DomainResult<Reconciled> {
        let sequences = values
            .iter()
            .map(|v| {
                v.as_sequence().ok_or_else(|| DomainError::SchemaMismatch {
                    path: display_path(path).to_string(),
                    expected: "sequence".to_string(),
                    found: v.shape().to_string(),
                })
            })
            .collect::<DomainResult<Vec<_>>>()?;
        reconcile_sequences(self, &sequences, path)
    }
}

pub(super) fn reconcile_sequences(
    reconciler: &Reconciler<'_>,
    sequences: &[&[Value]],
    path: &str,
) -> DomainResult<Reconciled> {
    if sequences.is_empty() {
        return Err(DomainError::InvalidInput(format!(
            "no sequences to reconcile at '{}'",
            display_path(path)
        )));
    }
    if sequences.iter().any(|s| s.is_empty()) {
        return Err(DomainError::InvalidInput(format!(
            "empty sequence at '{}'",
            display_path(path)
        )));
    }

    // Stable: equal-length inputs keep submission order for tie-breaking.
    let mut sorted = sequences.to_vec();
    sorted.sort_by_key(|s| s.len());

    let lengths: Vec<usize> = sorted.iter().map(|s| s.len()).collect();
    let mut confidence = length_confidence(&lengths);
    let shortest = lengths[0];

    let mut items = Vec::with_capacity(shortest);
    for position in 0..shortest {
        let column: Vec<&Value> = sorted.iter().map(|s| &s[position]).collect();
        let reconciled = reconciler.reconcile(&column, path)?;
        confidence = confidence.min(reconciled.confidence);
        items.push(reconciled.value);
    }

    tracing::trace!(
        path = display_path(path),
        inputs = sequences.len(),
        reconciled_len = shortest,
        confidence,
        "reconciled sequence"
    );

    Ok(Reconciled::new(Value::Sequence(items), confidence))
}

/// How well a set of sequence lengths agree, in [0, 1].
///
/// 1 when all lengths are equal, otherwise `1 - 2 * stddev / (max - min)`
/// floored at 0, using the population standard deviation.
pub fn length_confidence(lengths: &[usize]) -> f64 {
    let (Some(&min), Some(&max)) = (lengths.iter().min(), lengths.iter().max()) else {
        return 1.0;
    };
    let spread = max - min;
    if spread == 0 {
        return 1.0;
    }

    let n = lengths.len() as f64;
    let mean = lengths.iter().sum::<usize>() as f64 / n;
    let variance = lengths
        .iter()
        .map(|&l| {
            let d = l as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;

    (1.0 - 2.0 * variance.sqrt() / spread as f64).max(0.0)
}
