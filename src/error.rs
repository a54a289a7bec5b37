// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use crate::graph::GraphError;
use crate::params::{MAX_CUTS, MAX_LUT_SIZE};

/// Configuration problems detected by `Mapper::new` before any work is done.
#[derive(Debug, Clone, PartialEq)]
pub enum MapError {
    LutSizeTooLarge { requested: usize },
    /// K is below 2 or below the arity of some gate in the graph.
    LutSizeTooSmall { requested: usize, required: usize },
    TooManyCuts { requested: usize },
    TooFewCuts { requested: usize },
    /// The library does not describe every LUT size up to K.
    LibraryTooSmall { lut_size: usize, library_max: usize },
    InvalidDelayTarget(f64),
    InvalidGraph(GraphError),
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapError::LutSizeTooLarge { requested } => write!(
                f,
                "LUT size {} exceeds the supported maximum of {}",
                requested, MAX_LUT_SIZE
            ),
            MapError::LutSizeTooSmall {
                requested,
                required,
            } => write!(
                f,
                "LUT size {} is too small; at least {} inputs are needed",
                requested, required
            ),
            MapError::TooManyCuts { requested } => write!(
                f,
                "{} cuts per node exceeds the supported maximum of {}",
                requested, MAX_CUTS
            ),
            MapError::TooFewCuts { requested } => {
                write!(f, "{} cuts per node is too few; need at least 2", requested)
            }
            MapError::LibraryTooSmall {
                lut_size,
                library_max,
            } => write!(
                f,
                "LUT library only describes sizes up to {}, mapping needs {}",
                library_max, lut_size
            ),
            MapError::InvalidDelayTarget(target) => {
                write!(f, "delay target {} is outside the supported range", target)
            }
            MapError::InvalidGraph(e) => write!(f, "invalid subject graph: {}", e),
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MapError::InvalidGraph(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GraphError> for MapError {
    fn from(e: GraphError) -> Self {
        MapError::InvalidGraph(e)
    }
}
