use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::{LogRegOptions, PriorFunction, VectorClassifier};
use crate::classification::ClassificationError;
use crate::ml::LabeledVector;

/// Share of the shrinkage an elastic-band prior applies as L1.
const ELASTIC_L1_SHARE: f64 = 0.5;

/// Annealed learning rate for the given step:
/// `learning_rate * alpha^step * (step + step_offset)^-decay_exponent`.
pub fn learning_rate_at(options: &LogRegOptions, step: u64) -> f64 {
    let step = step as f64;
    let base = (step + f64::from(options.step_offset)).max(1.0);
    options.learning_rate * options.alpha.powf(step) * base.powf(-options.decay_exponent)
}

/// Pull `weight` towards zero according to `prior`; `shrink` is rate times lambda.
pub(super) fn regularize(prior: PriorFunction, weight: f64, shrink: f64) -> f64 {
    match prior {
        PriorFunction::Uniform => weight,
        PriorFunction::L1 => soft_threshold(weight, shrink),
        PriorFunction::L2 => weight * (1.0 - shrink).max(0.0),
        PriorFunction::ElasticBand => {
            let l1 = soft_threshold(weight, shrink * ELASTIC_L1_SHARE);
            l1 * (1.0 - shrink * (1.0 - ELASTIC_L1_SHARE)).max(0.0)
        }
    }
}

fn soft_threshold(weight: f64, amount: f64) -> f64 {
    weight.signum() * (weight.abs() - amount).max(0.0)
}

/// Numerically stable softmax; falls back to uniform on degenerate input.
pub fn softmax(raw: &[f64]) -> Vec<f64> {
    if raw.is_empty() {
        return Vec::new();
    }
    let max = raw.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut exps: Vec<f64> = raw.iter().map(|v| (v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    if sum == 0.0 || !sum.is_finite() {
        return vec![1.0 / raw.len() as f64; raw.len()];
    }
    for v in &mut exps {
        *v /= sum;
    }
    exps
}

/// Train `model` on `examples` for `epochs` passes, shuffling each pass with a
/// seeded RNG. Returns the number of updates applied.
pub fn train_shuffled<M: VectorClassifier + ?Sized>(
    model: &mut M,
    examples: &[LabeledVector],
    epochs: usize,
    seed: u64,
    is_cancelled: impl Fn() -> bool,
) -> Result<usize, ClassificationError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut order: Vec<usize> = (0..examples.len()).collect();
    let mut updates = 0usize;
    for epoch in 0..epochs.max(1) {
        order.shuffle(&mut rng);
        for &idx in &order {
            if is_cancelled() {
                return Err(ClassificationError::Interrupted);
            }
            let example = &examples[idx];
            model.train(example.class, &example.features)?;
            updates += 1;
        }
        tracing::trace!(epoch, updates, "Finished training pass");
    }
    Ok(updates)
}
