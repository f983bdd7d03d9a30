//! Per-vertex weight masks.
//!
//! A [`SelectionSet`] maps every vertex index of a mesh to a weight, normally
//! in `[0, 1]`. Operators treat the weight as a continuous blend factor, so a
//! selection is never assumed to be binary.
//!
//! The one producer of weights outside `[0, 1]` is an unlimited linear
//! gradient, whose weights extrapolate past the ends of its segment; operators
//! then extrapolate their blend in the same way.

use serde::{Deserialize, Serialize};

use super::error::{DeformError, DeformResult};

/// Dense weight mask over the vertices of one mesh.
///
/// Deserialized weights are clamped like [`SelectionSet::from_weights`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "SelectionData")]
pub struct SelectionSet {
    weights: Vec<f64>,
}

#[derive(Deserialize)]
struct SelectionData {
    weights: Vec<f64>,
}

impl From<SelectionData> for SelectionSet {
    fn from(data: SelectionData) -> Self {
        Self::from_weights(data.weights)
    }
}

impl SelectionSet {
    /// Every vertex fully selected.
    #[must_use]
    pub fn all_selected(vertex_count: usize) -> Self {
        Self {
            weights: vec![1.0; vertex_count],
        }
    }

    /// Every vertex unselected.
    #[must_use]
    pub fn all_deselected(vertex_count: usize) -> Self {
        Self {
            weights: vec![0.0; vertex_count],
        }
    }

    /// 1.0 where `predicate(index)` holds, 0.0 elsewhere.
    #[must_use]
    pub fn from_predicate(vertex_count: usize, mut predicate: impl FnMut(usize) -> bool) -> Self {
        Self {
            weights: (0..vertex_count)
                .map(|i| if predicate(i) { 1.0 } else { 0.0 })
                .collect(),
        }
    }

    /// Builds a selection from raw weights, clamping each into `[0, 1]`.
    #[must_use]
    pub fn from_weights(weights: impl IntoIterator<Item = f64>) -> Self {
        Self {
            weights: weights.into_iter().map(clamp_weight).collect(),
        }
    }

    /// Unclamped weights; NaN still becomes 0.
    pub(crate) fn from_raw_weights(weights: impl IntoIterator<Item = f64>) -> Self {
        Self {
            weights: weights
                .into_iter()
                .map(|w| if w.is_nan() { 0.0 } else { w })
                .collect(),
        }
    }

    /// Number of vertices this selection covers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weight of `index`, or 0.0 for an index outside the domain.
    #[must_use]
    pub fn weight(&self, index: usize) -> f64 {
        self.weights.get(index).copied().unwrap_or(0.0)
    }

    /// Sets the weight of `index`, clamped into `[0, 1]` (NaN becomes 0).
    ///
    /// # Errors
    /// [`DeformError::InvalidRange`] when `index` is outside the domain.
    pub fn set_weight(&mut self, index: usize, weight: f64) -> DeformResult<()> {
        let len = self.weights.len();
        let slot = self.weights.get_mut(index).ok_or_else(|| {
            DeformError::invalid(format!("vertex index {index} outside selection of {len}"))
        })?;
        *slot = clamp_weight(weight);
        Ok(())
    }

    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.weights.iter().copied()
    }

    /// Number of vertices with a non-zero weight.
    #[must_use]
    pub fn selected_count(&self) -> usize {
        self.weights.iter().filter(|&&w| w > 0.0).count()
    }

    /// Per-vertex maximum.
    ///
    /// # Errors
    /// [`DeformError::SizeMismatch`] when the domains differ.
    pub fn union(&self, other: &Self) -> DeformResult<Self> {
        self.zip_with(other, f64::max)
    }

    /// Per-vertex minimum.
    ///
    /// # Errors
    /// [`DeformError::SizeMismatch`] when the domains differ.
    pub fn intersection(&self, other: &Self) -> DeformResult<Self> {
        self.zip_with(other, f64::min)
    }

    /// Per-vertex `max(a - b, 0)`: removes `other` from this selection.
    ///
    /// # Errors
    /// [`DeformError::SizeMismatch`] when the domains differ.
    pub fn subtract(&self, other: &Self) -> DeformResult<Self> {
        self.zip_with(other, |a, b| (a - b).max(0.0))
    }

    /// Per-vertex `1 - w`.
    #[must_use]
    pub fn invert(&self) -> Self {
        Self {
            weights: self.weights.iter().map(|w| 1.0 - w).collect(),
        }
    }

    /// Fails unless this selection covers exactly `vertex_count` vertices.
    ///
    /// # Errors
    /// [`DeformError::SizeMismatch`] on disagreement.
    pub fn ensure_len(&self, vertex_count: usize) -> DeformResult<()> {
        if self.weights.len() == vertex_count {
            Ok(())
        } else {
            Err(DeformError::SizeMismatch {
                expected: vertex_count,
                actual: self.weights.len(),
            })
        }
    }

    fn zip_with(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> DeformResult<Self> {
        other.ensure_len(self.len())?;
        Ok(Self {
            weights: self
                .weights
                .iter()
                .zip(&other.weights)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }
}

fn clamp_weight(weight: f64) -> f64 {
    if weight.is_nan() {
        0.0
    } else {
        weight.clamp(0.0, 1.0)
    }
}

/// Effective weight of `index` under an optional selection (full effect when absent).
#[inline]
pub(crate) fn effective_weight(selection: Option<&SelectionSet>, index: usize) -> f64 {
    selection.map_or(1.0, |s| s.weight(index))
}
