use cloudreg_3d::matrix::Matrix;
use cloudreg_3d::pointcloud::PointCloud;

use crate::correspondence::{compute_registration_result, CorrespondenceSet, SearchMethod};
use crate::error::RegistrationError;
use crate::estimation::TransformationEstimation;
use crate::search::NearestNeighborSearch;
use crate::validate;

/// Outcome of one registration evaluation or one full ICP run.
///
/// Constructed fresh per evaluation; the ICP driver replaces it wholesale
/// each iteration and hands the final one to the caller.
#[derive(Debug, Clone)]
pub struct RegistrationResult {
    /// Fraction of source points with a valid correspondence, in [0, 1].
    pub fitness: f32,
    /// Root-mean-square distance over the matched pairs, in source units.
    pub inlier_rmse: f32,
    /// The selection mask and matched target indices behind the score.
    pub correspondences: CorrespondenceSet,
    /// The transformation that produced this result.
    pub transformation: Matrix,
    /// Refinement iterations performed; zero for a single-shot evaluation.
    pub num_iterations: usize,
}

impl RegistrationResult {
    /// The zero-state result: no correspondences, zero fitness and RMSE,
    /// carrying the given transformation unchanged.
    pub fn new(transformation: Matrix) -> Self {
        Self {
            fitness: 0.0,
            inlier_rmse: 0.0,
            correspondences: CorrespondenceSet::default(),
            transformation,
            num_iterations: 0,
        }
    }
}

/// Stopping configuration for the ICP loop.
#[derive(Debug, Clone)]
pub struct ConvergenceCriteria {
    /// Hard cap on the number of refinement iterations.
    pub max_iteration: usize,
    /// Minimum fitness improvement required to keep iterating.
    pub relative_fitness: f32,
    /// Minimum RMSE improvement required to keep iterating.
    pub relative_rmse: f32,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            max_iteration: 30,
            relative_fitness: 1e-6,
            relative_rmse: 1e-6,
        }
    }
}

/// Convergence predicate over two consecutive results.
///
/// Stops only when both metrics have plateaued; improvement in a single
/// metric keeps the loop going. Never evaluated before the first iteration.
pub fn has_converged(
    previous: &RegistrationResult,
    current: &RegistrationResult,
    criteria: &ConvergenceCriteria,
) -> bool {
    (previous.fitness - current.fitness).abs() < criteria.relative_fitness
        && (previous.inlier_rmse - current.inlier_rmse).abs() < criteria.relative_rmse
}

/// Evaluate how well `transformation` aligns `source` onto `target`.
///
/// One-shot quality snapshot: applies the transformation to a private copy
/// of the source, builds the target index, and scores the correspondences.
/// The supplied transformation is echoed in the result, never mutated.
pub fn evaluate_registration(
    source: &PointCloud,
    target: &PointCloud,
    max_correspondence_distance: f32,
    transformation: &Matrix,
    method: SearchMethod,
) -> Result<RegistrationResult, RegistrationError> {
    validate::check_point_clouds(source, target)?;
    validate::check_transformation(transformation, source)?;

    let mut target_nns = NearestNeighborSearch::new(validate::points_f32(target)?);
    build_index(&mut target_nns, method);

    let mut source_transformed = source.clone();
    source_transformed.transform(transformation)?;

    compute_registration_result(
        validate::points_f32(&source_transformed)?,
        &target_nns,
        max_correspondence_distance,
        transformation,
        method,
    )
}

/// Iterative closest point refinement from an initial transform.
///
/// The target index is built exactly once; each iteration estimates an
/// incremental update `U` from the current correspondences, composes it as
/// `U * T`, applies it to the working copy of the source, rescores, and
/// checks [`has_converged`]. Stops early on a plateau or when too few
/// correspondences remain for the estimator.
pub fn registration_icp(
    source: &PointCloud,
    target: &PointCloud,
    max_correspondence_distance: f32,
    init: &Matrix,
    estimation: &dyn TransformationEstimation,
    criteria: &ConvergenceCriteria,
    method: SearchMethod,
) -> Result<RegistrationResult, RegistrationError> {
    validate::check_point_clouds(source, target)?;
    validate::check_transformation(init, source)?;

    let mut transformation = init.clone();
    let mut target_nns = NearestNeighborSearch::new(validate::points_f32(target)?);
    build_index(&mut target_nns, method);

    let mut source_transformed = source.clone();
    source_transformed.transform(&transformation)?;

    let mut result = compute_registration_result(
        validate::points_f32(&source_transformed)?,
        &target_nns,
        max_correspondence_distance,
        &transformation,
        method,
    )?;

    for i in 0..criteria.max_iteration {
        log::debug!(
            "ICP iteration #{}: fitness {:.4}, inlier rmse {:.4}",
            i,
            result.fitness,
            result.inlier_rmse
        );

        if result.correspondences.len() < estimation.minimum_correspondences() {
            log::warn!(
                "stopping ICP at iteration {}: {} correspondences left, estimator needs {}",
                i,
                result.correspondences.len(),
                estimation.minimum_correspondences()
            );
            break;
        }

        let update = estimation.compute_transformation(
            &source_transformed,
            target,
            &result.correspondences,
        )?;
        transformation = update.matmul(&transformation)?;
        source_transformed.transform(&update)?;

        let mut current = compute_registration_result(
            validate::points_f32(&source_transformed)?,
            &target_nns,
            max_correspondence_distance,
            &transformation,
            method,
        )?;
        current.num_iterations = i + 1;

        let converged = has_converged(&result, &current, criteria);
        result = current;
        if converged {
            log::debug!("ICP converged after {} iterations", result.num_iterations);
            break;
        }
    }

    Ok(result)
}

fn build_index(target_nns: &mut NearestNeighborSearch, method: SearchMethod) {
    match method {
        SearchMethod::Knn => target_nns.knn_index(),
        SearchMethod::HybridGated => target_nns.hybrid_index(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimation::PointToPoint;
    use approx::assert_relative_eq;
    use cloudreg_3d::device::Device;
    use cloudreg_3d::linalg::transform_points;
    use glam::{Mat3, Vec3};

    fn create_random_points(num_points: usize) -> Vec<[f32; 3]> {
        (0..num_points)
            .map(|_| {
                [
                    rand::random::<f32>(),
                    rand::random::<f32>(),
                    rand::random::<f32>(),
                ]
            })
            .collect()
    }

    fn translation(t: [f32; 3]) -> Matrix {
        Matrix::from_array4x4(&[
            [1.0, 0.0, 0.0, t[0]],
            [0.0, 1.0, 0.0, t[1]],
            [0.0, 0.0, 1.0, t[2]],
            [0.0, 0.0, 0.0, 1.0],
        ])
    }

    #[test]
    fn test_evaluate_identical_clouds() -> Result<(), RegistrationError> {
        let points = create_random_points(64);
        let source = PointCloud::from_vec(points.clone(), None)?;
        let target = PointCloud::from_vec(points, None)?;

        for method in [SearchMethod::Knn, SearchMethod::HybridGated] {
            let result = evaluate_registration(
                &source,
                &target,
                0.05,
                &Matrix::identity(4),
                method,
            )?;
            assert_relative_eq!(result.fitness, 1.0);
            assert_relative_eq!(result.inlier_rmse, 0.0);
            assert_eq!(result.correspondences.len(), source.len());
            assert_eq!(result.num_iterations, 0);
        }
        Ok(())
    }

    #[test]
    fn test_evaluate_degenerate_gate() -> Result<(), RegistrationError> {
        let source = PointCloud::from_vec(create_random_points(16), None)?;
        let target = PointCloud::from_vec(create_random_points(16), None)?;
        let init = translation([1.0, 2.0, 3.0]);

        let result = evaluate_registration(
            &source,
            &target,
            0.0,
            &init,
            SearchMethod::default(),
        )?;
        assert_relative_eq!(result.fitness, 0.0);
        assert_relative_eq!(result.inlier_rmse, 0.0);
        assert!(result.correspondences.is_empty());
        assert_eq!(result.transformation, init);
        Ok(())
    }

    #[test]
    fn test_evaluate_validation_failures() -> Result<(), RegistrationError> {
        let source = PointCloud::from_vec(create_random_points(8), None)?;

        let f64_target = PointCloud::from_vec_f64(vec![[0.0, 0.0, 0.0]])?;
        assert!(matches!(
            evaluate_registration(
                &source,
                &f64_target,
                1.0,
                &Matrix::identity(4),
                SearchMethod::default()
            ),
            Err(RegistrationError::DtypeMismatch { .. })
        ));

        let off_device = PointCloud::from_vec(create_random_points(8), None)?
            .with_device(Device::Cuda { device_id: 0 });
        assert!(matches!(
            evaluate_registration(
                &source,
                &off_device,
                1.0,
                &Matrix::identity(4),
                SearchMethod::default()
            ),
            Err(RegistrationError::DeviceMismatch { .. })
        ));

        let target = PointCloud::from_vec(create_random_points(8), None)?;
        assert!(matches!(
            evaluate_registration(
                &source,
                &target,
                1.0,
                &Matrix::identity(3),
                SearchMethod::default()
            ),
            Err(RegistrationError::ShapeError { rows: 3, cols: 3 })
        ));
        Ok(())
    }

    #[test]
    fn test_icp_degenerate_gate() -> Result<(), RegistrationError> {
        let source = PointCloud::from_vec(create_random_points(16), None)?;
        let target = PointCloud::from_vec(create_random_points(16), None)?;
        let init = translation([1.0, 2.0, 3.0]);

        let result = registration_icp(
            &source,
            &target,
            0.0,
            &init,
            &PointToPoint,
            &ConvergenceCriteria::default(),
            SearchMethod::default(),
        )?;
        assert_relative_eq!(result.fitness, 0.0);
        assert_relative_eq!(result.inlier_rmse, 0.0);
        assert!(result.correspondences.is_empty());
        assert_eq!(result.transformation, init);
        assert_eq!(result.num_iterations, 0);
        Ok(())
    }

    #[test]
    fn test_icp_converges_on_identical_clouds() -> Result<(), RegistrationError> {
        let points = create_random_points(64);
        let source = PointCloud::from_vec(points.clone(), None)?;
        let target = PointCloud::from_vec(points, None)?;

        let criteria = ConvergenceCriteria::default();
        let result = registration_icp(
            &source,
            &target,
            0.1,
            &Matrix::identity(4),
            &PointToPoint,
            &criteria,
            SearchMethod::default(),
        )?;

        // already aligned: the first refinement changes nothing and the
        // plateau check fires well before the iteration cap
        assert_eq!(result.num_iterations, 1);
        assert_relative_eq!(result.fitness, 1.0);
        assert_relative_eq!(result.inlier_rmse, 0.0);
        Ok(())
    }

    #[test]
    fn test_icp_iteration_cap() -> Result<(), RegistrationError> {
        let source = PointCloud::from_vec(create_random_points(32), None)?;
        let target = PointCloud::from_vec(create_random_points(32), None)?;

        let criteria = ConvergenceCriteria {
            max_iteration: 2,
            // impossible thresholds: the loop can only stop by exhaustion
            relative_fitness: 0.0,
            relative_rmse: 0.0,
        };
        let result = registration_icp(
            &source,
            &target,
            2.0,
            &Matrix::identity(4),
            &PointToPoint,
            &criteria,
            SearchMethod::default(),
        )?;
        assert!(result.num_iterations <= 2);
        assert!(result.fitness >= 0.0 && result.fitness <= 1.0);
        assert!(result.inlier_rmse >= 0.0);
        Ok(())
    }

    #[test]
    fn test_icp_zero_iterations() -> Result<(), RegistrationError> {
        let points = create_random_points(16);
        let source = PointCloud::from_vec(points.clone(), None)?;
        let target = PointCloud::from_vec(points, None)?;

        let criteria = ConvergenceCriteria {
            max_iteration: 0,
            ..Default::default()
        };
        let result = registration_icp(
            &source,
            &target,
            0.1,
            &Matrix::identity(4),
            &PointToPoint,
            &criteria,
            SearchMethod::default(),
        )?;
        assert_eq!(result.num_iterations, 0);
        assert_relative_eq!(result.fitness, 1.0);
        Ok(())
    }

    #[test]
    fn test_icp_stops_without_correspondences() -> Result<(), RegistrationError> {
        let source = PointCloud::from_vec(vec![[100.0, 100.0, 100.0]; 4], None)?;
        let target = PointCloud::from_vec(vec![[0.0, 0.0, 0.0]; 4], None)?;

        let result = registration_icp(
            &source,
            &target,
            0.5,
            &Matrix::identity(4),
            &PointToPoint,
            &ConvergenceCriteria::default(),
            SearchMethod::default(),
        )?;
        assert_eq!(result.num_iterations, 0);
        assert_relative_eq!(result.fitness, 0.0);
        assert_eq!(result.transformation, Matrix::identity(4));
        Ok(())
    }

    #[test]
    fn test_icp_recovers_translation() -> Result<(), RegistrationError> {
        let points_src = create_random_points(100);
        let shift = [0.05, -0.03, 0.02];
        let points_dst: Vec<[f32; 3]> = points_src
            .iter()
            .map(|p| [p[0] + shift[0], p[1] + shift[1], p[2] + shift[2]])
            .collect();

        let source = PointCloud::from_vec(points_src, None)?;
        let target = PointCloud::from_vec(points_dst, None)?;

        let result = registration_icp(
            &source,
            &target,
            0.5,
            &Matrix::identity(4),
            &PointToPoint,
            &ConvergenceCriteria::default(),
            SearchMethod::default(),
        )?;

        assert!(result.num_iterations < ConvergenceCriteria::default().max_iteration);
        assert_relative_eq!(result.fitness, 1.0);
        assert!(result.inlier_rmse < 1e-4);
        for (i, &expected) in shift.iter().enumerate() {
            assert_relative_eq!(
                result.transformation.get(i, 3).unwrap() as f32,
                expected,
                epsilon = 1e-4
            );
        }
        Ok(())
    }

    #[test]
    fn test_icp_recovers_small_rigid_perturbation() -> Result<(), RegistrationError> {
        let points_src = create_random_points(200);
        // row-major rotation, 0.05 rad around z
        let rotation = Mat3::from_axis_angle(Vec3::Z, 0.05)
            .transpose()
            .to_cols_array_2d();
        let shift = [0.02, 0.01, -0.015];

        let mut points_dst = vec![[0.0; 3]; points_src.len()];
        transform_points(&points_src, &rotation, &shift, &mut points_dst);

        let source = PointCloud::from_vec(points_src, None)?;
        let target = PointCloud::from_vec(points_dst, None)?;

        let result = registration_icp(
            &source,
            &target,
            0.5,
            &Matrix::identity(4),
            &PointToPoint,
            &ConvergenceCriteria::default(),
            SearchMethod::default(),
        )?;

        assert_relative_eq!(result.fitness, 1.0);
        assert!(result.inlier_rmse < 1e-3);
        Ok(())
    }

    #[test]
    fn test_correspondence_invariant() -> Result<(), RegistrationError> {
        let source = PointCloud::from_vec(create_random_points(40), None)?;
        let target = PointCloud::from_vec(create_random_points(40), None)?;

        for method in [SearchMethod::Knn, SearchMethod::HybridGated] {
            let result =
                evaluate_registration(&source, &target, 0.3, &Matrix::identity(4), method)?;
            let selected = result.correspondences.mask.iter().filter(|&&m| m).count();
            assert_eq!(result.correspondences.indices.len(), selected);
            assert!(result.fitness >= 0.0 && result.fitness <= 1.0);
            assert!(result.inlier_rmse >= 0.0);
        }
        Ok(())
    }

    #[test]
    fn test_convergence_predicate() {
        let criteria = ConvergenceCriteria {
            max_iteration: 10,
            relative_fitness: 1e-3,
            relative_rmse: 1e-3,
        };
        let mut previous = RegistrationResult::new(Matrix::identity(4));
        previous.fitness = 0.9;
        previous.inlier_rmse = 0.01;

        let mut current = previous.clone();
        assert!(has_converged(&previous, &current, &criteria));

        // one metric still improving keeps the loop alive
        current.fitness = 0.95;
        assert!(!has_converged(&previous, &current, &criteria));

        current.fitness = 0.9;
        current.inlier_rmse = 0.005;
        assert!(!has_converged(&previous, &current, &criteria));
    }
}
