//! Input/output boundaries of the core.
//!
//! The core exchanges scalar/array data only: initial diameters and
//! positions come in through `sources`, log output and the stress-strain
//! curve sink live in `output`. File naming stays with the caller.

mod output;
mod sources;

pub use output::{setup_output, CurveFile, CurveSink};
pub use sources::{read_diameters, read_jamming_point, read_positions};
