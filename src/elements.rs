//! The 3D frame element kernel: local stiffness, orientation, and assembly
//! into global coordinates.

use crate::core::{Member, Node};
use crate::error::{FrameCalcError, Result};
use nalgebra::{DMatrix, Matrix3};

const MIN_LENGTH: f64 = 1e-9;
/// Below this value of D = sqrt(cx^2 + cz^2) a member is treated as vertical
/// and the degenerate orientation formula is used instead.
const VERTICAL_THRESHOLD: f64 = 1e-6;

pub fn member_length(start: &Node, end: &Node) -> f64 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let dz = end.z - start.z;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Local 12x12 stiffness matrix for a prismatic Bernoulli-Euler frame member
/// of the given length, in its own local axes (x along the member).
pub fn local_stiffness_matrix(member: &Member, length: f64) -> Result<DMatrix<f64>> {
    if length < MIN_LENGTH {
        return Err(FrameCalcError::TopologyError(
            format!("member {} has zero or near-zero length", member.id)
        ));
    }

    let l = length;
    let l2 = l * l;
    let l3 = l2 * l;

    let mut k = DMatrix::zeros(12, 12);

    // Axial
    let ea_l = member.e * member.a / l;
    k[(0, 0)] = ea_l;
    k[(0, 6)] = -ea_l;
    k[(6, 0)] = -ea_l;
    k[(6, 6)] = ea_l;

    // Torsion
    let gj_l = member.g * member.j / l;
    k[(3, 3)] = gj_l;
    k[(3, 9)] = -gj_l;
    k[(9, 3)] = -gj_l;
    k[(9, 9)] = gj_l;

    // Bending about local y (deflection in the x-z plane): dofs uz, ry
    let ei_y = member.e * member.iy;
    k[(2, 2)] = 12.0 * ei_y / l3;
    k[(2, 4)] = 6.0 * ei_y / l2;
    k[(2, 8)] = -12.0 * ei_y / l3;
    k[(2, 10)] = 6.0 * ei_y / l2;
    k[(4, 2)] = 6.0 * ei_y / l2;
    k[(4, 4)] = 4.0 * ei_y / l;
    k[(4, 8)] = -6.0 * ei_y / l2;
    k[(4, 10)] = 2.0 * ei_y / l;
    k[(8, 2)] = -12.0 * ei_y / l3;
    k[(8, 4)] = -6.0 * ei_y / l2;
    k[(8, 8)] = 12.0 * ei_y / l3;
    k[(8, 10)] = -6.0 * ei_y / l2;
    k[(10, 2)] = 6.0 * ei_y / l2;
    k[(10, 4)] = 2.0 * ei_y / l;
    k[(10, 8)] = -6.0 * ei_y / l2;
    k[(10, 10)] = 4.0 * ei_y / l;

    // Bending about local z (deflection in the x-y plane): dofs uy, rz
    let ei_z = member.e * member.iz;
    k[(1, 1)] = 12.0 * ei_z / l3;
    k[(1, 5)] = -6.0 * ei_z / l2;
    k[(1, 7)] = -12.0 * ei_z / l3;
    k[(1, 11)] = -6.0 * ei_z / l2;
    k[(5, 1)] = -6.0 * ei_z / l2;
    k[(5, 5)] = 4.0 * ei_z / l;
    k[(5, 7)] = 6.0 * ei_z / l2;
    k[(5, 11)] = 2.0 * ei_z / l;
    k[(7, 1)] = -12.0 * ei_z / l3;
    k[(7, 5)] = 6.0 * ei_z / l2;
    k[(7, 7)] = 12.0 * ei_z / l3;
    k[(7, 11)] = 6.0 * ei_z / l2;
    k[(11, 1)] = -6.0 * ei_z / l2;
    k[(11, 5)] = 2.0 * ei_z / l;
    k[(11, 7)] = 6.0 * ei_z / l2;
    k[(11, 11)] = 4.0 * ei_z / l;

    Ok(k)
}

/// 3x3 rotation matrix whose rows are the member's local x/y/z axes
/// expressed in global coordinates, including the member's roll angle
/// about its own local x-axis.
pub fn orientation_matrix(start: &Node, end: &Node, roll: f64, length: f64) -> Result<Matrix3<f64>> {
    if length < MIN_LENGTH {
        return Err(FrameCalcError::TopologyError("member has zero length".to_string()));
    }

    let cx = (end.x - start.x) / length;
    let cy = (end.y - start.y) / length;
    let cz = (end.z - start.z) / length;
    let d = (cx * cx + cz * cz).sqrt();

    let base = if d > VERTICAL_THRESHOLD {
        Matrix3::new(
            cx, cy, cz,
            -cx * cy / d, d, -cy * cz / d,
            -cz / d, 0.0, cx / d,
        )
    } else {
        // Member runs parallel to the global y-axis: the x-z-plane formula
        // above degenerates, so the local z-axis is fixed to global x (or
        // its negative, keyed off the sign of cy) and y/z fall out from
        // orthogonality.
        let s = cy.signum();
        Matrix3::new(
            0.0, cy, 0.0,
            -s, 0.0, 0.0,
            0.0, 0.0, s,
        )
    };

    if roll.abs() < 1e-12 {
        return Ok(base);
    }

    let (sin_b, cos_b) = roll.sin_cos();
    let rot_x = Matrix3::new(
        1.0, 0.0, 0.0,
        0.0, cos_b, sin_b,
        0.0, -sin_b, cos_b,
    );
    Ok(rot_x * base)
}

/// Full 12x12 block-diagonal transformation matrix (four repeats of the
/// 3x3 orientation matrix, one per translational/rotational DOF triple).
pub fn transformation_matrix(start: &Node, end: &Node, roll: f64, length: f64) -> Result<DMatrix<f64>> {
    let rotation = orientation_matrix(start, end, roll, length)?;
    let mut t = DMatrix::zeros(12, 12);
    for i in 0..4 {
        let idx = i * 3;
        t.fixed_view_mut::<3, 3>(idx, idx).copy_from(&rotation);
    }
    Ok(t)
}

/// Member stiffness matrix in global coordinates: k_global = T' * k_local * T.
pub fn global_stiffness_matrix(member: &Member, start: &Node, end: &Node) -> Result<DMatrix<f64>> {
    let length = member_length(start, end);
    let k_local = local_stiffness_matrix(member, length)?;
    let t = transformation_matrix(start, end, member.roll, length)?;
    Ok(t.transpose() * k_local * t)
}

/// Local equivalent-nodal-load vector (12 components) for a transverse point
/// load of `magnitude` acting in `local_y` or `local_z` at fractional
/// `position` (0 = start, 1 = end) along a member of the given length, or an
/// axial point load. Entries use the same sign convention as a direct nodal
/// load: a load concentrated exactly at a node (`position` 0 or 1) reduces
/// to the same value `Load::nodal` would add at that node's dof.
pub fn point_load_local_fixed_end(
    direction: crate::loads::LoadDirection,
    magnitude: f64,
    position: f64,
    length: f64,
) -> [f64; 12] {
    let mut f = [0.0; 12];
    let a = position * length;
    let b = length - a;
    let l = length;
    let l2 = l * l;
    let l3 = l2 * l;

    match direction {
        crate::loads::LoadDirection::Axial => {
            f[0] = magnitude * b / l;
            f[6] = magnitude * a / l;
        }
        crate::loads::LoadDirection::LocalY => {
            let v1 = magnitude * b * b * (3.0 * a + b) / l3;
            let v2 = magnitude * a * a * (a + 3.0 * b) / l3;
            let m1 = -magnitude * a * b * b / l2;
            let m2 = magnitude * a * a * b / l2;
            f[1] = v1;
            f[5] = m1;
            f[7] = v2;
            f[11] = m2;
        }
        crate::loads::LoadDirection::LocalZ => {
            let v1 = magnitude * b * b * (3.0 * a + b) / l3;
            let v2 = magnitude * a * a * (a + 3.0 * b) / l3;
            let m1 = -magnitude * a * b * b / l2;
            let m2 = magnitude * a * a * b / l2;
            f[2] = v1;
            f[4] = -m1;
            f[8] = v2;
            f[10] = -m2;
        }
    }
    f
}

/// Local equivalent-nodal-load vector for a linearly-varying distributed
/// load over the full member length, decomposed into a uniform component
/// plus a triangular component. Same sign convention as
/// `point_load_local_fixed_end`.
pub fn distributed_load_local_fixed_end(
    direction: crate::loads::LoadDirection,
    w_start: f64,
    w_end: f64,
    length: f64,
) -> [f64; 12] {
    let mut f = [0.0; 12];
    let l = length;

    // Uniform part (w_start applied over the whole length).
    let w0 = w_start;
    let v_uniform = w0 * l / 2.0;
    let m_uniform = w0 * l * l / 12.0;

    // Triangular part rising from 0 at the start to (w_end - w_start) at the end.
    let dw = w_end - w_start;
    let v1_tri = 3.0 * dw * l / 20.0;
    let v2_tri = 7.0 * dw * l / 20.0;
    let m1_tri = dw * l * l / 20.0;
    let m2_tri = dw * l * l / 30.0;

    let v1 = v_uniform + v1_tri;
    let v2 = v_uniform + v2_tri;
    let m1 = m_uniform + m1_tri;
    let m2 = m_uniform + m2_tri;

    match direction {
        crate::loads::LoadDirection::Axial => {
            f[0] = v1;
            f[6] = v2;
        }
        crate::loads::LoadDirection::LocalY => {
            f[1] = v1;
            f[5] = m1;
            f[7] = v2;
            f[11] = -m2;
        }
        crate::loads::LoadDirection::LocalZ => {
            f[2] = v1;
            f[4] = -m1;
            f[8] = v2;
            f[10] = m2;
        }
    }
    f
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn local_stiffness_is_symmetric() {
        let m = Member::new("m1", "a", "b", 200e9, 80e9, 0.01, 8e-6, 8e-6, 1.5e-6);
        let k = local_stiffness_matrix(&m, 3.0).unwrap();
        for i in 0..12 {
            for j in 0..12 {
                assert_abs_diff_eq!(k[(i, j)], k[(j, i)], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn horizontal_member_has_identity_like_x_axis() {
        let start = Node::new("a", 0.0, 0.0, 0.0);
        let end = Node::new("b", 5.0, 0.0, 0.0);
        let r = orientation_matrix(&start, &end, 0.0, 5.0).unwrap();
        assert_abs_diff_eq!(r[(0, 0)], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r[(0, 1)], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(r[(0, 2)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn vertical_member_uses_degenerate_orientation() {
        let start = Node::new("a", 0.0, 0.0, 0.0);
        let end = Node::new("b", 0.0, 4.0, 0.0);
        let r = orientation_matrix(&start, &end, 0.0, 4.0).unwrap();
        // local x-axis must align with global y
        assert_abs_diff_eq!(r[(0, 1)], 1.0, epsilon = 1e-12);
        // rotation is orthonormal
        let rt = r.transpose();
        let identity = r * rt;
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(identity[(i, j)], expected, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn global_stiffness_matches_local_for_axis_aligned_member() {
        let m = Member::new("m1", "a", "b", 200e9, 80e9, 0.01, 8e-6, 8e-6, 1.5e-6);
        let start = Node::new("a", 0.0, 0.0, 0.0);
        let end = Node::new("b", 2.0, 0.0, 0.0);
        let k_local = local_stiffness_matrix(&m, 2.0).unwrap();
        let k_global = global_stiffness_matrix(&m, &start, &end).unwrap();
        assert_abs_diff_eq!(k_local[(0, 0)], k_global[(0, 0)], epsilon = 1e-6);
    }
}
