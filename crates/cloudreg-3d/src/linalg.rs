use glam::{Mat3, Vec3};

/// Transform a set of points using a rotation and translation.
///
/// # Arguments
///
/// * `src_points` - A set of points to be transformed.
/// * `dst_r_src` - A rotation matrix, row major.
/// * `dst_t_src` - A translation vector.
/// * `dst_points` - A pre-allocated slice to store the transformed points.
///
/// PRECONDITION: `dst_points` has the same length as `src_points`.
pub fn transform_points(
    src_points: &[[f32; 3]],
    dst_r_src: &[[f32; 3]; 3],
    dst_t_src: &[f32; 3],
    dst_points: &mut [[f32; 3]],
) {
    assert_eq!(src_points.len(), dst_points.len());

    // glam matrices are column major
    let rotation = Mat3::from_cols(
        Vec3::new(dst_r_src[0][0], dst_r_src[1][0], dst_r_src[2][0]),
        Vec3::new(dst_r_src[0][1], dst_r_src[1][1], dst_r_src[2][1]),
        Vec3::new(dst_r_src[0][2], dst_r_src[1][2], dst_r_src[2][2]),
    );
    let translation = Vec3::from_array(*dst_t_src);

    for (src, dst) in src_points.iter().zip(dst_points.iter_mut()) {
        let p = rotation * Vec3::from_array(*src) + translation;
        *dst = p.to_array();
    }
}
