/// Port for batch cost evaluation used by the optimizer.
///
/// Implementations must be deterministic for a given candidate when the
/// optimizer is expected to be reproducible. Lower cost is better.
pub trait FitnessFunction: Sync {
    /// One cost per candidate row, in the same order.
    fn evaluate_batch(&self, candidates: &[Vec<f64>]) -> Vec<f64>;

    /// Whether `cost` marks a failed candidate rather than a real score.
    fn is_failure(&self, cost: f64) -> bool {
        !cost.is_finite()
    }
}

impl<F> FitnessFunction for F
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    fn evaluate_batch(&self, candidates: &[Vec<f64>]) -> Vec<f64> {
        candidates.iter().map(|c| self(c)).collect()
    }
}
