use kiddo::immutable::float::kdtree::ImmutableKdTree;
use kiddo::SquaredEuclidean;

use crate::error::RegistrationError;

/// Sentinel index returned by [`NearestNeighborSearch::hybrid_search`] when
/// no target point lies within the gate.
pub const NO_MATCH: i64 = -1;

/// Nearest-neighbor search over a fixed target point set.
///
/// Thin adapter around a kd-tree. The tree is built once per registration
/// call and treated as read-only afterwards; the two query modes must be
/// marked ready via [`knn_index`](Self::knn_index) /
/// [`hybrid_index`](Self::hybrid_index) before their search method may be
/// used. All distances are squared Euclidean.
pub struct NearestNeighborSearch {
    tree: ImmutableKdTree<f32, u32, 3, 32>,
    knn_ready: bool,
    hybrid_ready: bool,
}

impl NearestNeighborSearch {
    /// Build the search structure over the target points.
    pub fn new(points: &[[f32; 3]]) -> Self {
        Self {
            tree: ImmutableKdTree::new_from_slice(points),
            knn_ready: false,
            hybrid_ready: false,
        }
    }

    /// Make the plain nearest-neighbor query mode available.
    pub fn knn_index(&mut self) -> bool {
        self.knn_ready = true;
        true
    }

    /// Make the distance-gated query mode available.
    pub fn hybrid_index(&mut self) -> bool {
        self.hybrid_ready = true;
        true
    }

    /// Forced 1-nearest-neighbor query for every point in `queries`.
    ///
    /// Returns the matched target index and squared distance per query
    /// point. Fails with [`RegistrationError::IndexNotReady`] when
    /// [`knn_index`](Self::knn_index) was not called.
    pub fn knn_search(
        &self,
        queries: &[[f32; 3]],
    ) -> Result<(Vec<i64>, Vec<f32>), RegistrationError> {
        if !self.knn_ready {
            return Err(RegistrationError::IndexNotReady { mode: "knn" });
        }

        let mut indices = Vec::with_capacity(queries.len());
        let mut distances_sq = Vec::with_capacity(queries.len());
        for query in queries {
            let nn = self.tree.nearest_one::<SquaredEuclidean>(query);
            indices.push(nn.item as i64);
            distances_sq.push(nn.distance);
        }
        Ok((indices, distances_sq))
    }

    /// Gated 1-nearest-neighbor query for every point in `queries`.
    ///
    /// A query point whose nearest target lies beyond `max_distance_sq`
    /// yields the [`NO_MATCH`] sentinel and a zero distance. Fails with
    /// [`RegistrationError::IndexNotReady`] when
    /// [`hybrid_index`](Self::hybrid_index) was not called.
    pub fn hybrid_search(
        &self,
        queries: &[[f32; 3]],
        max_distance_sq: f32,
    ) -> Result<(Vec<i64>, Vec<f32>), RegistrationError> {
        if !self.hybrid_ready {
            return Err(RegistrationError::IndexNotReady { mode: "hybrid" });
        }

        let mut indices = Vec::with_capacity(queries.len());
        let mut distances_sq = Vec::with_capacity(queries.len());
        for query in queries {
            let nn = self.tree.nearest_one::<SquaredEuclidean>(query);
            if nn.distance <= max_distance_sq {
                indices.push(nn.item as i64);
                distances_sq.push(nn.distance);
            } else {
                indices.push(NO_MATCH);
                distances_sq.push(0.0);
            }
        }
        Ok((indices, distances_sq))
    }
}
