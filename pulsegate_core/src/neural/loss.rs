//! Cross-entropy loss with a floored probability.

use ndarray::Array1;

/// Smallest probability fed to the log, to keep the loss finite even
/// when the network assigns ~0 to the true class.
pub const PROB_FLOOR: f32 = 1e-4;

/// Negative log-likelihood of the target class.
pub fn cross_entropy(probs: &Array1<f32>, target: usize) -> f32 {
    -probs[target].max(PROB_FLOOR).ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr1;

    #[test]
    fn confident_correct_prediction_has_near_zero_loss() {
        let probs = arr1(&[0.01, 0.97, 0.01, 0.01]);
        assert!(cross_entropy(&probs, 1) < 0.05);
    }

    #[test]
    fn zero_probability_is_floored_not_infinite() {
        let probs = arr1(&[1.0, 0.0, 0.0, 0.0]);
        let loss = cross_entropy(&probs, 1);
        assert!(loss.is_finite());
        assert!((loss - (-(PROB_FLOOR.ln()))).abs() < 1e-4);
    }
}
