//! Per-member force and deflection diagrams, sampled at a fixed number of
//! stations along each member's length.
//!
//! Internal actions are recovered as the superposition of two parts: a
//! "homogeneous" part driven by the member's own end forces (itself
//! recovered from `k_local * d_local` net of the equivalent nodal load the
//! member contributed at assembly), and a "particular" part from any point
//! or distributed loads applied along the member. Because the end forces
//! already carry the true reactions transmitted through the rest of the
//! structure, the particular part is a plain free-body accumulation of the
//! member's own loads over `[0, x]` — it must not reintroduce a support
//! reaction of its own, or the end reaction would be counted twice. Interior
//! deflection gets a clamped-clamped correction on top of the Hermite
//! homogeneous term, since the Hermite cubic already matches the true end
//! displacements and rotations exactly and the residual bulge from a
//! distributed/point load vanishes in both value and slope at both ends.

use crate::core::{Member, Model, Node};
use crate::elements;
use crate::error::{FrameCalcError, Result};
use crate::loads::{LoadDirection, LoadKind};
use nalgebra::DVector;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Station {
    pub x: f64,
    pub axial: f64,
    pub torsion: f64,
    pub shear_y: f64,
    pub shear_z: f64,
    pub moment_y: f64,
    pub moment_z: f64,
    pub deflection_y: f64,
    pub deflection_z: f64,
}

#[derive(Debug, Clone)]
pub struct MemberDiagram {
    pub member_id: String,
    pub length: f64,
    pub stations: Vec<Station>,
}

#[derive(Debug, Clone)]
pub struct PostprocessReport {
    pub diagrams: Vec<MemberDiagram>,
    /// Member ids that failed post-processing; the solve itself still
    /// succeeded, and every other member's diagram is unaffected.
    pub failures: Vec<(String, String)>,
}

#[derive(Default)]
struct MemberLocalLoads {
    axial_points: Vec<(f64, f64)>,
    axial_dist: Vec<(f64, f64)>,
    y_points: Vec<(f64, f64)>,
    y_dist: Vec<(f64, f64)>,
    z_points: Vec<(f64, f64)>,
    z_dist: Vec<(f64, f64)>,
}

fn gather_member_loads(model: &Model, member_id: &str) -> MemberLocalLoads {
    let mut loads = MemberLocalLoads::default();
    for load in &model.loads {
        match &load.kind {
            LoadKind::MemberPoint { member_id: mid, direction, magnitude, position } if mid == member_id => {
                match direction {
                    LoadDirection::Axial => loads.axial_points.push((*position, *magnitude)),
                    LoadDirection::LocalY => loads.y_points.push((*position, *magnitude)),
                    LoadDirection::LocalZ => loads.z_points.push((*position, *magnitude)),
                }
            }
            LoadKind::MemberDistributed { member_id: mid, direction, w_start, w_end } if mid == member_id => {
                match direction {
                    LoadDirection::Axial => loads.axial_dist.push((*w_start, *w_end)),
                    LoadDirection::LocalY => loads.y_dist.push((*w_start, *w_end)),
                    LoadDirection::LocalZ => loads.z_dist.push((*w_start, *w_end)),
                }
            }
            _ => {}
        }
    }
    loads
}

/// Free-body shear jump at x due to a point load p at fraction a_frac along
/// the member. No support reaction term: the end force already carries it.
fn point_shear(l: f64, a_frac: f64, p: f64, x: f64) -> f64 {
    let a = a_frac * l;
    if x < a { 0.0 } else { -p }
}

fn point_moment(l: f64, a_frac: f64, p: f64, x: f64) -> f64 {
    let a = a_frac * l;
    if x <= a { 0.0 } else { -p * (x - a) }
}

/// Clamped-clamped particular deflection under a point load: vanishes in
/// both value and slope at x=0 and x=l, matching the exact end conditions
/// already carried by the Hermite homogeneous term.
fn point_deflection(l: f64, a_frac: f64, p: f64, ei: f64, x: f64) -> f64 {
    let a = a_frac * l;
    let b = l - a;
    let l3 = l * l * l;
    if x <= a {
        p * b * b * x * x * (3.0 * a * l - 3.0 * a * x - b * x) / (6.0 * ei * l3)
    } else {
        let xp = l - x;
        p * a * a * xp * xp * (3.0 * b * l - 3.0 * b * xp - a * xp) / (6.0 * ei * l3)
    }
}

fn udl_shear(w: f64, x: f64) -> f64 {
    -w * x
}

fn udl_moment(w: f64, x: f64) -> f64 {
    -w * x * x / 2.0
}

fn udl_deflection(l: f64, w: f64, ei: f64, x: f64) -> f64 {
    w * x * x * (l - x) * (l - x) / (24.0 * ei)
}

/// Triangular load rising from 0 at x=0 to w at x=l.
fn tri_shear(l: f64, w: f64, x: f64) -> f64 {
    -w * x * x / (2.0 * l)
}

fn tri_moment(l: f64, w: f64, x: f64) -> f64 {
    -w * x.powi(3) / (6.0 * l)
}

fn tri_deflection(l: f64, w: f64, ei: f64, x: f64) -> f64 {
    w * x * x * (l - x) * (l - x) * (x + 2.0 * l) / (120.0 * l * ei)
}

fn distributed_shear(l: f64, w_start: f64, w_end: f64, x: f64) -> f64 {
    udl_shear(w_start, x) + tri_shear(l, w_end - w_start, x)
}

fn distributed_moment(l: f64, w_start: f64, w_end: f64, x: f64) -> f64 {
    udl_moment(w_start, x) + tri_moment(l, w_end - w_start, x)
}

fn distributed_deflection(l: f64, w_start: f64, w_end: f64, ei: f64, x: f64) -> f64 {
    udl_deflection(l, w_start, ei, x) + tri_deflection(l, w_end - w_start, ei, x)
}

/// Free-body axial force contribution from the member's own axial loads,
/// accumulated the same way as transverse shear.
fn axial_particular(loads_points: &[(f64, f64)], loads_dist: &[(f64, f64)], l: f64, x: f64) -> f64 {
    let mut n = 0.0;
    for &(a_frac, p) in loads_points {
        n += point_shear(l, a_frac, p, x);
    }
    for &(w_start, w_end) in loads_dist {
        n += distributed_shear(l, w_start, w_end, x);
    }
    n
}

fn transverse_particular(
    points: &[(f64, f64)],
    dist: &[(f64, f64)],
    l: f64,
    ei: f64,
    x: f64,
) -> (f64, f64, f64) {
    let mut shear = 0.0;
    let mut moment = 0.0;
    let mut defl = 0.0;
    for &(a_frac, p) in points {
        shear += point_shear(l, a_frac, p, x);
        moment += point_moment(l, a_frac, p, x);
        defl += point_deflection(l, a_frac, p, ei, x);
    }
    for &(w_start, w_end) in dist {
        shear += distributed_shear(l, w_start, w_end, x);
        moment += distributed_moment(l, w_start, w_end, x);
        defl += distributed_deflection(l, w_start, w_end, ei, x);
    }
    (shear, moment, defl)
}

fn hermite(l: f64, x: f64, d1: f64, r1: f64, d2: f64, r2: f64) -> f64 {
    let xi = x / l;
    let n1 = 1.0 - 3.0 * xi * xi + 2.0 * xi.powi(3);
    let n2 = l * (xi - 2.0 * xi * xi + xi.powi(3));
    let n3 = 3.0 * xi * xi - 2.0 * xi.powi(3);
    let n4 = l * (-xi * xi + xi.powi(3));
    n1 * d1 + n2 * r1 + n3 * d2 + n4 * r2
}

fn member_diagram(
    model: &Model,
    member: &Member,
    start: &Node,
    end: &Node,
    u_global: &DVector<f64>,
) -> Result<MemberDiagram> {
    let length = elements::member_length(start, end);
    let start_idx = model.node_index_of(&member.start_id).expect("validated");
    let end_idx = model.node_index_of(&member.end_id).expect("validated");

    let mut d_global = [0.0; 12];
    for (i, &dof) in crate::core::Dof::ALL.iter().enumerate() {
        d_global[i] = u_global[model.global_dof(start_idx, dof)];
        d_global[i + 6] = u_global[model.global_dof(end_idx, dof)];
    }

    let t = elements::transformation_matrix(start, end, member.roll, length)?;
    let d_global_vec = DVector::from_row_slice(&d_global);
    let d_local = &t * d_global_vec;

    let k_local = elements::local_stiffness_matrix(member, length)?;
    let f_internal = &k_local * &d_local;

    let loads = gather_member_loads(model, &member.id);

    // Equivalent nodal load contribution this member's own loads made to
    // the global system, needed to recover true end actions from d_local.
    let mut f_equiv_local = [0.0; 12];
    for &(pos, mag) in &loads.axial_points {
        let local = elements::point_load_local_fixed_end(LoadDirection::Axial, mag, pos, length);
        for i in 0..12 { f_equiv_local[i] += local[i]; }
    }
    for &(w1, w2) in &loads.axial_dist {
        let local = elements::distributed_load_local_fixed_end(LoadDirection::Axial, w1, w2, length);
        for i in 0..12 { f_equiv_local[i] += local[i]; }
    }
    for &(pos, mag) in &loads.y_points {
        let local = elements::point_load_local_fixed_end(LoadDirection::LocalY, mag, pos, length);
        for i in 0..12 { f_equiv_local[i] += local[i]; }
    }
    for &(w1, w2) in &loads.y_dist {
        let local = elements::distributed_load_local_fixed_end(LoadDirection::LocalY, w1, w2, length);
        for i in 0..12 { f_equiv_local[i] += local[i]; }
    }
    for &(pos, mag) in &loads.z_points {
        let local = elements::point_load_local_fixed_end(LoadDirection::LocalZ, mag, pos, length);
        for i in 0..12 { f_equiv_local[i] += local[i]; }
    }
    for &(w1, w2) in &loads.z_dist {
        let local = elements::distributed_load_local_fixed_end(LoadDirection::LocalZ, w1, w2, length);
        for i in 0..12 { f_equiv_local[i] += local[i]; }
    }

    let f_m: Vec<f64> = (0..12).map(|i| f_internal[i] - f_equiv_local[i]).collect();

    let ei_y = member.e * member.iy;
    let ei_z = member.e * member.iz;

    let n1 = f_m[0];
    let t1 = f_m[3];
    // Local dof 1/5 (uy/rz) is the y-bending plane: shear_y/moment_z.
    let vy1 = f_m[1];
    let mz1 = f_m[5];
    // Local dof 2/4 (uz/ry) is the z-bending plane: shear_z/moment_y.
    let vz1 = f_m[2];
    let my1 = f_m[4];

    let num_stations = model.settings.num_stations.max(2);
    let mut stations = Vec::with_capacity(num_stations);

    for i in 0..num_stations {
        let x = length * (i as f64) / ((num_stations - 1) as f64);

        let axial_homog = -n1;
        let axial_particular_val = axial_particular(&loads.axial_points, &loads.axial_dist, length, x);
        let axial = axial_homog + axial_particular_val;

        let torsion = -t1;

        let shear_homog_y = vy1;
        let moment_homog_y = -mz1 + vy1 * x;
        let (shear_part_y, moment_part_y, defl_part_y) =
            transverse_particular(&loads.y_points, &loads.y_dist, length, ei_z.max(1e-30), x);
        let shear_y = shear_homog_y + shear_part_y;
        let moment_z = moment_homog_y + moment_part_y;

        let shear_homog_z = vz1;
        let moment_homog_z = -my1 + vz1 * x;
        let (shear_part_z, moment_part_z, defl_part_z) =
            transverse_particular(&loads.z_points, &loads.z_dist, length, ei_y.max(1e-30), x);
        let shear_z = shear_homog_z + shear_part_z;
        let moment_y = moment_homog_z + moment_part_z;

        let defl_homog_y = hermite(length, x, d_local[1], d_local[5], d_local[7], d_local[11]);
        let defl_homog_z = hermite(length, x, d_local[2], d_local[4], d_local[8], d_local[10]);

        let deflection_y = defl_homog_y + defl_part_y;
        let deflection_z = defl_homog_z + defl_part_z;

        stations.push(Station {
            x,
            axial,
            torsion,
            shear_y,
            shear_z,
            moment_y,
            moment_z,
            deflection_y,
            deflection_z,
        });
    }

    Ok(MemberDiagram { member_id: member.id.clone(), length, stations })
}

/// Compute diagrams for every member. A failure for one member (invalid
/// geometry, degenerate stiffness) is recorded and skipped rather than
/// aborting the whole report.
pub fn postprocess(model: &Model, u_global: &DVector<f64>) -> Result<PostprocessReport> {
    let mut diagrams = Vec::with_capacity(model.members.len());
    let mut failures = Vec::new();

    for member in &model.members {
        let start = model.node(&member.start_id)?;
        let end = model.node(&member.end_id)?;
        match member_diagram(model, member, start, end, u_global) {
            Ok(diagram) => diagrams.push(diagram),
            Err(FrameCalcError::PostprocessFailure { member_id, detail }) => {
                failures.push((member_id, detail));
            }
            Err(e) => failures.push((member.id.clone(), e.to_string())),
        }
    }

    Ok(PostprocessReport { diagrams, failures })
}
