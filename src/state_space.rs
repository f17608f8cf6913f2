//! State-space enumeration for parameter sweeps.
//!
//! A [`StateSpace`] is an ordered list of named axes with positive sizes. A
//! [`StateVectorGenerator`] walks it in one of two modes:
//!
//! - **full**: the Cartesian product as a mixed-radix counter, first axis
//!   fastest. `{a:2, b:3}` yields `[0,0] [1,0] [0,1] [1,1] [0,2] [1,2]`.
//! - **stepped**: one counter shared by every axis, clamped per axis, for
//!   `max(sizes)` steps. `{a:2, b:3}` yields `[0,0] [1,1] [1,2]`.
//!
//! Vectors are computed from their index, so `len()` and `get()` never
//! materialise the sequence and every `iter()` restarts from the beginning.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while defining a state space.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SweepError {
    #[error("Invalid axis '{axis}': {reason}")]
    InvalidAxis { axis: String, reason: String },

    #[error("Unknown traversal mode '{0}' (expected 'full' or 'stepped')")]
    UnknownMode(String),

    #[error("State space with axes {axes:?} has more than usize::MAX vectors")]
    TooLarge { axes: Vec<String> },
}

/// How a generator walks the space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalMode {
    #[default]
    Full,
    Stepped,
}

impl FromStr for TraversalMode {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(TraversalMode::Full),
            "stepped" => Ok(TraversalMode::Stepped),
            other => Err(SweepError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for TraversalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraversalMode::Full => write!(f, "full"),
            TraversalMode::Stepped => write!(f, "stepped"),
        }
    }
}

/// Ordered axis name → size mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSpace {
    axes: Vec<(String, usize)>,
}

impl StateSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an axis. Sizes must be positive and names unique.
    pub fn add_axis(&mut self, name: impl Into<String>, size: usize) -> Result<(), SweepError> {
        let name = name.into();
        if size == 0 {
            return Err(SweepError::InvalidAxis {
                axis: name,
                reason: "size must be positive".to_string(),
            });
        }
        if self.axes.iter().any(|(existing, _)| *existing == name) {
            return Err(SweepError::InvalidAxis {
                axis: name,
                reason: "axis already defined".to_string(),
            });
        }
        self.axes.push((name, size));
        Ok(())
    }

    /// Builder form of [`add_axis`](Self::add_axis).
    pub fn with_axis(mut self, name: impl Into<String>, size: usize) -> Result<Self, SweepError> {
        self.add_axis(name, size)?;
        Ok(self)
    }

    pub fn axes(&self) -> impl Iterator<Item = (&str, usize)> {
        self.axes.iter().map(|(name, size)| (name.as_str(), *size))
    }

    pub fn axis_names(&self) -> Vec<&str> {
        self.axes.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn size_of(&self, name: &str) -> Option<usize> {
        self.axes.iter().find(|(n, _)| n == name).map(|(_, size)| *size)
    }

    pub fn dimensions(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }
}

/// One position of a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateVector {
    pub index: usize,
    /// One coordinate per axis, in axis order
    pub coords: Vec<usize>,
}

impl StateVector {
    /// Coordinate on the axis at `axis` position.
    pub fn coord(&self, axis: usize) -> Option<usize> {
        self.coords.get(axis).copied()
    }
}

/// Finite, restartable sequence of state vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateVectorGenerator {
    sizes: Vec<usize>,
    names: Vec<String>,
    mode: TraversalMode,
    len: usize,
}

impl StateVectorGenerator {
    /// Fails with `TooLarge` when a full traversal has more vectors than
    /// fit in a `usize`.
    pub fn new(space: &StateSpace, mode: TraversalMode) -> Result<Self, SweepError> {
        let sizes: Vec<usize> = space.axes.iter().map(|(_, size)| *size).collect();
        let names: Vec<String> = space.axes.iter().map(|(name, _)| name.clone()).collect();
        let len = if sizes.is_empty() {
            0
        } else {
            match mode {
                TraversalMode::Full => sizes
                    .iter()
                    .try_fold(1usize, |acc, &size| acc.checked_mul(size))
                    .ok_or_else(|| SweepError::TooLarge { axes: names.clone() })?,
                TraversalMode::Stepped => sizes.iter().copied().max().unwrap_or(0),
            }
        };
        Ok(Self {
            names,
            sizes,
            mode,
            len,
        })
    }

    pub fn mode(&self) -> TraversalMode {
        self.mode
    }

    pub fn axis_names(&self) -> &[String] {
        &self.names
    }

    /// Exact number of vectors.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The vector at `index`, or `None` past the end.
    pub fn get(&self, index: usize) -> Option<StateVector> {
        if index >= self.len {
            return None;
        }
        let coords = match self.mode {
            TraversalMode::Full => {
                let mut rest = index;
                self.sizes
                    .iter()
                    .map(|&size| {
                        let coord = rest % size;
                        rest /= size;
                        coord
                    })
                    .collect()
            }
            TraversalMode::Stepped => self.sizes.iter().map(|&size| index.min(size - 1)).collect(),
        };
        Some(StateVector { index, coords })
    }

    /// Iterate from the first vector. Each call starts over.
    pub fn iter(&self) -> StateVectorIter<'_> {
        StateVectorIter {
            generator: self,
            next: 0,
        }
    }
}

impl<'a> IntoIterator for &'a StateVectorGenerator {
    type Item = StateVector;
    type IntoIter = StateVectorIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a generator's vectors.
#[derive(Debug, Clone)]
pub struct StateVectorIter<'a> {
    generator: &'a StateVectorGenerator,
    next: usize,
}

impl Iterator for StateVectorIter<'_> {
    type Item = StateVector;

    fn next(&mut self) -> Option<Self::Item> {
        let vector = self.generator.get(self.next)?;
        self.next += 1;
        Some(vector)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.generator.len.saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for StateVectorIter<'_> {}
