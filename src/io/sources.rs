//! Readers for the external configuration sources.

use std::fs;
use std::path::Path;

use nalgebra::SVector;

use crate::error::JammingError;

fn parse_floats(content: &str, path: &Path) -> Result<Vec<f64>, JammingError> {
    content
        .split_whitespace()
        .map(|token| {
            token.parse::<f64>().map_err(|_| {
                JammingError::Configuration(format!(
                    "unparsable value {:?} in {}",
                    token,
                    path.display()
                ))
            })
        })
        .collect()
}

/// Read exactly `n` diameter records (one positive scalar each).
pub fn read_diameters<P: AsRef<Path>>(path: P, n: usize) -> Result<Vec<f64>, JammingError> {
    let path = path.as_ref();
    let values = parse_floats(&fs::read_to_string(path)?, path)?;
    if values.len() != n {
        return Err(JammingError::Configuration(format!(
            "expected {} diameter records in {}, found {}",
            n,
            path.display(),
            values.len()
        )));
    }
    Ok(values)
}

/// Read exactly `n` position records of D coordinates each.
pub fn read_positions<const D: usize, P: AsRef<Path>>(
    path: P,
    n: usize,
) -> Result<Vec<SVector<f64, D>>, JammingError> {
    let path = path.as_ref();
    let values = parse_floats(&fs::read_to_string(path)?, path)?;
    if values.len() != n * D {
        return Err(JammingError::Configuration(format!(
            "expected {} coordinates ({} records x {}) in {}, found {}",
            n * D,
            n,
            D,
            path.display(),
            values.len()
        )));
    }
    Ok(values
        .chunks_exact(D)
        .map(SVector::from_column_slice)
        .collect())
}

/// Read a previously discovered jamming point (a single scalar).
pub fn read_jamming_point<P: AsRef<Path>>(path: P) -> Result<f64, JammingError> {
    let path = path.as_ref();
    let values = parse_floats(&fs::read_to_string(path)?, path)?;
    match values.first() {
        Some(&phi) if phi > 0.0 => Ok(phi),
        _ => Err(JammingError::Configuration(format!(
            "no usable jamming point in {}",
            path.display()
        ))),
    }
}
