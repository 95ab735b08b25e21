//! Position algebra for sibling reordering.
//!
//! Pure and synchronous. Given the current ordered siblings and a drag from
//! `active_index` to `over_index`, computes which contiguous siblings shift and
//! in which direction.

use crate::model::request::ShiftDirection;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Siblings displaced by one reorder.
#[derive(Debug, PartialEq, Eq)]
pub struct ShiftRange<'a, T> {
    /// Affected siblings, in list order, with their original values.
    pub shifted: &'a [T],
    pub direction: ShiftDirection,
}

/// Caller-side contract violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionError {
    /// Index is outside `[0, len)`.
    OutOfRange { index: usize, len: usize },
    /// Active and over index are equal; callers must short-circuit.
    SamePosition(usize),
}

impl Display for PositionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { index, len } => {
                write!(f, "position {index} out of range for {len} siblings")
            }
            Self::SamePosition(index) => {
                write!(f, "active and over position are both {index}")
            }
        }
    }
}

impl Error for PositionError {}

/// Computes the siblings displaced when the entry at `active_index` is
/// dropped on the entry at `over_index`.
///
/// - moving later (`active < over`): `(active, over]` shifts [`ShiftDirection::Up`]
/// - moving earlier (`active > over`): `[over, active)` shifts [`ShiftDirection::Down`]
///
/// The moved entry takes the position previously held at `over_index`.
pub fn compute_shift_range<T>(
    active_index: usize,
    over_index: usize,
    siblings: &[T],
) -> Result<ShiftRange<'_, T>, PositionError> {
    let len = siblings.len();
    for index in [active_index, over_index] {
        if index >= len {
            return Err(PositionError::OutOfRange { index, len });
        }
    }

    if active_index < over_index {
        Ok(ShiftRange {
            shifted: &siblings[active_index + 1..=over_index],
            direction: ShiftDirection::Up,
        })
    } else if active_index > over_index {
        Ok(ShiftRange {
            shifted: &siblings[over_index..active_index],
            direction: ShiftDirection::Down,
        })
    } else {
        Err(PositionError::SamePosition(active_index))
    }
}
