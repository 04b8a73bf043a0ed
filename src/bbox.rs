//! # Bounding box
//!
//! Minimal axis-aligned box enclosing a set of n-dimensional coordinate tuples.
//!
//! A box is either empty (dimension 0) or holds a lower-left and an upper-right
//! corner of equal length with `lower_left[i] <= upper_right[i]`. Corners only
//! change through [`BoundingBox::union`], [`BoundingBox::union_point`] and
//! [`BoundingBox::pad`]; accessors hand out borrowed slices.
//!
//! A box that degenerates to a single point can be padded so downstream
//! consumers never see a zero-area envelope. A padded box no longer bounds the
//! geometry exactly and refuses further unions.

use tracing::{debug, warn};

use crate::coords::{CoordinateList, TupleSource};
use crate::error::{GmlError, Result};

/// Added to every upper-right component of a degenerate box by [`BoundingBox::pad`].
pub const PADDING_EPSILON: f64 = 1e-6;

#[derive(Debug, PartialEq, Default)]
pub struct BoundingBox {
    lower_left: Vec<f64>,
    upper_right: Vec<f64>,
    padded: bool,
}

/// Copies the corners. The padding flag is not carried over.
impl Clone for BoundingBox {
    fn clone(&self) -> Self {
        Self {
            lower_left: self.lower_left.clone(),
            upper_right: self.upper_right.clone(),
            padded: false,
        }
    }
}

fn reject_nan(values: &[f64]) -> Result<()> {
    if values.iter().any(|v| v.is_nan()) {
        return Err(GmlError::NanCoordinate);
    }
    Ok(())
}

/// The first `dimension` components of `tuple`.
fn leading(tuple: &[f64], dimension: usize) -> Result<&[f64]> {
    if tuple.len() < dimension {
        return Err(GmlError::DimensionMismatch {
            expected: dimension,
            found: tuple.len(),
        });
    }
    let tuple = &tuple[..dimension];
    reject_nan(tuple)?;
    Ok(tuple)
}

impl BoundingBox {
    /// Creates an empty box.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a box from two explicit corners, copying both.
    ///
    /// # Errors
    /// * [`GmlError::DimensionMismatch`] if the corners differ in length
    /// * [`GmlError::NanCoordinate`] if any component is NaN
    /// * [`GmlError::InvertedBounds`] if a lower component exceeds its upper one
    pub fn new(lower_left: &[f64], upper_right: &[f64]) -> Result<Self> {
        if lower_left.len() != upper_right.len() {
            return Err(GmlError::DimensionMismatch {
                expected: lower_left.len(),
                found: upper_right.len(),
            });
        }
        reject_nan(lower_left)?;
        reject_nan(upper_right)?;
        for (axis, (&lower, &upper)) in lower_left.iter().zip(upper_right).enumerate() {
            if lower > upper {
                return Err(GmlError::InvertedBounds { axis, lower, upper });
            }
        }

        Ok(Self {
            lower_left: lower_left.to_vec(),
            upper_right: upper_right.to_vec(),
            padded: false,
        })
    }

    /// Computes the box of every tuple in `source` in a single pass.
    ///
    /// The dimension is the one the source reports. A source of unknown or
    /// mixed dimension yields an empty box. Components beyond the dimension
    /// are ignored; a tuple with fewer components is an error.
    pub fn from_tuples<S: TupleSource + ?Sized>(source: &S) -> Result<Self> {
        let mut bbox = Self::empty();
        if source.is_empty() {
            return Ok(bbox);
        }

        let dimension = match source.dimension() {
            Some(dimension) => dimension,
            None => {
                warn!(
                    "Tuple source of {} tuples reports no dimension; leaving box empty",
                    source.len()
                );
                0
            }
        };
        if dimension == 0 {
            return Ok(bbox);
        }

        let first = leading(source.tuple(0), dimension)?;
        bbox.lower_left = first.to_vec();
        bbox.upper_right = first.to_vec();

        for index in 1..source.len() {
            let tuple = leading(source.tuple(index), dimension)?;
            bbox.extend(tuple, tuple);
        }

        Ok(bbox)
    }

    fn extend(&mut self, lower: &[f64], upper: &[f64]) {
        for (current, &value) in self.lower_left.iter_mut().zip(lower) {
            *current = current.min(value);
        }
        for (current, &value) in self.upper_right.iter_mut().zip(upper) {
            *current = current.max(value);
        }
    }

    fn ensure_unpadded(&self) -> Result<()> {
        if self.padded {
            return Err(GmlError::InvalidState(
                "bounding box has been padded and can no longer be unioned".to_string(),
            ));
        }
        Ok(())
    }

    /// Grows this box to enclose `other`.
    ///
    /// An empty `other` changes nothing; an empty `self` takes a copy of `other`.
    ///
    /// # Errors
    /// * [`GmlError::InvalidState`] if either box is padded
    /// * [`GmlError::DimensionMismatch`] if both are non-empty with different dimensions
    pub fn union(&mut self, other: &BoundingBox) -> Result<()> {
        self.ensure_unpadded()?;
        other.ensure_unpadded()?;
        if other.is_empty() {
            return Ok(());
        }
        if self.is_empty() {
            self.lower_left = other.lower_left.clone();
            self.upper_right = other.upper_right.clone();
            return Ok(());
        }
        if self.dimension() != other.dimension() {
            return Err(GmlError::DimensionMismatch {
                expected: self.dimension(),
                found: other.dimension(),
            });
        }

        self.extend(&other.lower_left, &other.upper_right);
        Ok(())
    }

    /// Grows this box to enclose `point`. An empty box becomes the point itself.
    pub fn union_point(&mut self, point: &[f64]) -> Result<()> {
        self.ensure_unpadded()?;
        reject_nan(point)?;
        if self.is_empty() {
            self.lower_left = point.to_vec();
            self.upper_right = point.to_vec();
            return Ok(());
        }
        if point.len() != self.dimension() {
            return Err(GmlError::DimensionMismatch {
                expected: self.dimension(),
                found: point.len(),
            });
        }

        self.extend(point, point);
        Ok(())
    }

    /// Widens a degenerate (single point) box by [`PADDING_EPSILON`] on every upper component.
    pub fn pad(&mut self) {
        if self.padded || self.is_empty() || self.lower_left != self.upper_right {
            return;
        }
        for value in &mut self.upper_right {
            *value += PADDING_EPSILON;
        }
        self.padded = true;
        debug!("Padded degenerate bounding box at {:?}", self.lower_left);
    }

    pub fn is_empty(&self) -> bool {
        self.lower_left.is_empty()
    }

    pub fn is_padded(&self) -> bool {
        self.padded
    }

    pub fn dimension(&self) -> usize {
        self.lower_left.len()
    }

    pub fn lower_left(&self) -> &[f64] {
        &self.lower_left
    }

    pub fn upper_right(&self) -> &[f64] {
        &self.upper_right
    }

    pub fn min_x(&self) -> Option<f64> {
        self.planar().then(|| self.lower_left[0])
    }

    pub fn min_y(&self) -> Option<f64> {
        self.planar().then(|| self.lower_left[1])
    }

    pub fn max_x(&self) -> Option<f64> {
        self.planar().then(|| self.upper_right[0])
    }

    pub fn max_y(&self) -> Option<f64> {
        self.planar().then(|| self.upper_right[1])
    }

    fn planar(&self) -> bool {
        self.dimension() >= 2
    }

    /// The two corners as a tuple list, lower-left first.
    pub fn corners(&self) -> CoordinateList {
        if self.is_empty() {
            return CoordinateList::default();
        }
        CoordinateList::with_dimension(
            Some(self.dimension()),
            vec![self.lower_left.clone(), self.upper_right.clone()],
        )
    }
}
