//! Raw biometric sample record produced by the sensor board.

use serde::{Deserialize, Serialize};

/// One normalized sensor reading, produced every sensor tick.
///
/// Immutable once created. The engine borrows samples; it never keeps
/// them beyond its rolling history window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiometricSample {
    /// Heart rate in beats per minute.
    pub heart_rate: f32,
    /// Skin temperature in degrees Celsius.
    pub temperature: f32,
    /// Galvanic skin response, raw ADC-scaled units.
    pub gsr_value: f32,
    /// Milliseconds since device boot.
    pub timestamp_ms: u32,
}

impl BiometricSample {
    pub fn new(heart_rate: f32, temperature: f32, gsr_value: f32, timestamp_ms: u32) -> Self {
        Self {
            heart_rate,
            temperature,
            gsr_value,
            timestamp_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_is_plain_value() {
        let a = BiometricSample::new(72.0, 36.6, 310.0, 1_000);
        let b = a;
        assert_eq!(a, b);
        assert_eq!(b.timestamp_ms, 1_000);
    }
}
