use cloudreg_3d::matrix::Matrix;

use crate::error::RegistrationError;
use crate::registration::RegistrationResult;
use crate::search::{NearestNeighborSearch, NO_MATCH};

/// Correspondence search strategy used by the registration entry points.
///
/// Both strategies agree on the output contract; they differ in how the
/// distance gate is enforced during the nearest-neighbor query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMethod {
    /// Forced 1-nearest-neighbor per source point, gated afterwards.
    ///
    /// Correct baseline, but it pays for a full tree descent even for
    /// source points far beyond the gate.
    Knn,
    /// Distance-gated 1-nearest-neighbor returning a sentinel beyond the
    /// gate.
    #[default]
    HybridGated,
}

/// Which source points matched, and which target points they matched to.
#[derive(Debug, Clone, Default)]
pub struct CorrespondenceSet {
    /// One flag per source point, true when it matched within the gate.
    pub mask: Vec<bool>,
    /// Target indices for exactly the selected source points, in source
    /// order. `indices.len()` equals the number of true flags in `mask`.
    pub indices: Vec<usize>,
}

impl CorrespondenceSet {
    /// Number of matched pairs.
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// True when no source point matched.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Run the selected correspondence strategy and score the match.
///
/// The single place where the linear distance gate becomes a squared one;
/// everything below this boundary works in squared distances. The supplied
/// transformation is echoed into the result, it is the caller's current
/// estimate and is not recomputed here. A non-positive gate short-circuits
/// to the zero-state result.
pub(crate) fn compute_registration_result(
    source_points: &[[f32; 3]],
    nns: &NearestNeighborSearch,
    max_correspondence_distance: f32,
    transformation: &Matrix,
    method: SearchMethod,
) -> Result<RegistrationResult, RegistrationError> {
    if max_correspondence_distance <= 0.0 {
        return Ok(RegistrationResult::new(transformation.clone()));
    }

    let gate_sq = max_correspondence_distance * max_correspondence_distance;
    let (correspondences, selected_distances_sq) = match method {
        SearchMethod::Knn => correspondences_from_knn(source_points, nns, gate_sq)?,
        SearchMethod::HybridGated => correspondences_from_hybrid(source_points, nns, gate_sq)?,
    };

    let num_selected = correspondences.len();
    let squared_error: f32 = selected_distances_sq.iter().sum();

    let fitness = num_selected as f32 / source_points.len() as f32;
    let inlier_rmse = if num_selected == 0 {
        0.0
    } else {
        (squared_error / num_selected as f32).sqrt()
    };

    Ok(RegistrationResult {
        fitness,
        inlier_rmse,
        correspondences,
        transformation: transformation.clone(),
        num_iterations: 0,
    })
}

/// Forced nearest-neighbor strategy: every source point gets a neighbor,
/// the gate is applied to the returned distances.
fn correspondences_from_knn(
    source_points: &[[f32; 3]],
    nns: &NearestNeighborSearch,
    gate_sq: f32,
) -> Result<(CorrespondenceSet, Vec<f32>), RegistrationError> {
    let (indices, distances_sq) = nns.knn_search(source_points)?;

    let mask: Vec<bool> = distances_sq.iter().map(|&d| d <= gate_sq).collect();
    let (selected_indices, selected_distances_sq) = indices
        .iter()
        .zip(distances_sq.iter())
        .filter(|&(_, &d)| d <= gate_sq)
        .map(|(&idx, &d)| (idx as usize, d))
        .unzip();

    Ok((
        CorrespondenceSet {
            mask,
            indices: selected_indices,
        },
        selected_distances_sq,
    ))
}

/// Gated strategy: the index itself rejects matches beyond the gate and
/// reports a sentinel, the mask comes from the sentinel test.
fn correspondences_from_hybrid(
    source_points: &[[f32; 3]],
    nns: &NearestNeighborSearch,
    gate_sq: f32,
) -> Result<(CorrespondenceSet, Vec<f32>), RegistrationError> {
    let (indices, distances_sq) = nns.hybrid_search(source_points, gate_sq)?;

    let mask: Vec<bool> = indices.iter().map(|&idx| idx != NO_MATCH).collect();
    let (selected_indices, selected_distances_sq) = indices
        .iter()
        .zip(distances_sq.iter())
        .filter(|&(&idx, _)| idx != NO_MATCH)
        .map(|(&idx, &d)| (idx as usize, d))
        .unzip();

    Ok((
        CorrespondenceSet {
            mask,
            indices: selected_indices,
        },
        selected_distances_sq,
    ))
}
