//! PulseGate Shared Library
//!
//! Plain records exchanged between the decision engine and the other
//! boards (sensor acquisition, display, actuator drivers).
//!
//! This library provides:
//! - Biometric sample records pushed by the sensor board
//! - Stress level / change tier classifications
//! - The per-tick `StressDecision` record and its actuator projection
//!
//! Nothing in this crate performs I/O or holds mutable state; every type
//! is a value that can cross a board boundary as-is.

pub mod decision;
pub mod sample;

// Re-export commonly used types
pub use decision::{
    ActuatorCommand, ChangeTier, RecommendedAction, StressDecision, StressLevel,
};
pub use sample::BiometricSample;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
