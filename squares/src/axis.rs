//! Digit axes: which trailing score digit each row and column represents.
//!
//! An axis is either fully unset (before the host scrambles) or a pair of
//! permutations of `0..GRID_SIZE`. Quarterly boards carry one axis per
//! [`QuarterKey`]; everything else uses the single fixed axis.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{QuarterKey, ScrambleMode, GRID_SIZE};

/// Row and column digit permutations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Axis {
    #[serde(default)]
    pub rows: Vec<u8>,
    #[serde(default)]
    pub cols: Vec<u8>,
}

impl Axis {
    /// An axis that has not been scrambled yet.
    pub fn unset() -> Self {
        Self::default()
    }

    /// Draw a fresh, independent permutation for rows and for columns.
    pub fn scrambled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            rows: shuffled_digits(rng),
            cols: shuffled_digits(rng),
        }
    }

    pub fn is_set(&self) -> bool {
        !self.rows.is_empty() && !self.cols.is_empty()
    }

    /// Unset, or both sequences are permutations of `0..GRID_SIZE`.
    pub fn is_valid(&self) -> bool {
        (self.rows.is_empty() && self.cols.is_empty())
            || (is_permutation(&self.rows) && is_permutation(&self.cols))
    }

    /// Row index showing `digit`, or `None` when the axis is unset.
    pub fn row_of(&self, digit: u8) -> Option<usize> {
        self.rows.iter().position(|&d| d == digit)
    }

    /// Column index showing `digit`, or `None` when the axis is unset.
    pub fn col_of(&self, digit: u8) -> Option<usize> {
        self.cols.iter().position(|&d| d == digit)
    }
}

/// Per-quarter axes, generated together in one scramble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarterlyAxes {
    pub axes: BTreeMap<QuarterKey, Axis>,
    pub generated_at: DateTime<Utc>,
}

impl QuarterlyAxes {
    pub fn scrambled<R: Rng + ?Sized>(rng: &mut R, generated_at: DateTime<Utc>) -> Self {
        let axes = QuarterKey::ALL
            .iter()
            .map(|key| (*key, Axis::scrambled(rng)))
            .collect();
        Self { axes, generated_at }
    }
}

/// Everything the board knows about its digits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisSet {
    #[serde(default)]
    pub fixed: Axis,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quarterly: Option<QuarterlyAxes>,
}

impl AxisSet {
    /// Build a freshly scrambled axis set for the given mode.
    pub fn scramble<R: Rng + ?Sized>(mode: ScrambleMode, rng: &mut R, now: DateTime<Utc>) -> Self {
        match mode {
            ScrambleMode::Static => Self {
                fixed: Axis::scrambled(rng),
                quarterly: None,
            },
            ScrambleMode::Quarterly => Self {
                fixed: Axis::unset(),
                quarterly: Some(QuarterlyAxes::scrambled(rng, now)),
            },
        }
    }

    pub fn is_scrambled(&self) -> bool {
        self.fixed.is_set() || self.quarterly.as_ref().is_some_and(|q| !q.axes.is_empty())
    }

    pub fn is_valid(&self) -> bool {
        self.fixed.is_valid()
            && self
                .quarterly
                .as_ref()
                .map_or(true, |q| q.axes.values().all(Axis::is_valid))
    }
}

/// The axis in force for `key`: the quarter's own axis when one exists,
/// otherwise the fixed axis. The result may be unset.
pub fn resolve_axis(axes: &AxisSet, key: QuarterKey) -> &Axis {
    axes.quarterly
        .as_ref()
        .and_then(|q| q.axes.get(&key))
        .unwrap_or(&axes.fixed)
}

/// Uniform permutation of `0..GRID_SIZE` (Fisher-Yates).
pub fn shuffled_digits<R: Rng + ?Sized>(rng: &mut R) -> Vec<u8> {
    let mut digits: Vec<u8> = (0..GRID_SIZE as u8).collect();
    digits.shuffle(rng);
    digits
}

pub fn is_permutation(seq: &[u8]) -> bool {
    if seq.len() != GRID_SIZE {
        return false;
    }
    let mut seen = [false; GRID_SIZE];
    for &d in seq {
        let i = d as usize;
        if i >= GRID_SIZE || seen[i] {
            return false;
        }
        seen[i] = true;
    }
    true
}
