//! Error types for jamming runs.

use std::fmt;
use std::io;

/// Errors that can abort a jamming run.
#[derive(Debug)]
pub enum JammingError {
    /// Malformed or insufficient initial-state data.
    Configuration(String),
    /// The minimizer exhausted its iteration budget before reaching the
    /// force tolerance.
    NonConvergence {
        phi: f64,
        iterations: u64,
        max_force: f64,
    },
    /// The adaptive search hit its step-size floor or ran out of
    /// compression range without bracketing the jamming point.
    SearchExhausted { phi: f64, step: f64 },
    /// Failed to read or write a collaborator file.
    Io(io::Error),
}

impl fmt::Display for JammingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JammingError::Configuration(msg) => write!(f, "invalid configuration: {}", msg),
            JammingError::NonConvergence {
                phi,
                iterations,
                max_force,
            } => write!(
                f,
                "minimizer did not converge at phi = {} after {} iterations (max force {:.3e})",
                phi, iterations, max_force
            ),
            JammingError::SearchExhausted { phi, step } => write!(
                f,
                "search exhausted at phi = {} with step {:.3e}",
                phi, step
            ),
            JammingError::Io(e) => write!(f, "i/o failure: {}", e),
        }
    }
}

impl std::error::Error for JammingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            JammingError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for JammingError {
    fn from(e: io::Error) -> Self {
        JammingError::Io(e)
    }
}
