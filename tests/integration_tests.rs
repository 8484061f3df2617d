//! Closed-form verification scenarios for the frame solver

use approx::assert_abs_diff_eq;
use framecalc::core::{Dof, Member, Model, Node, Support};
use framecalc::error::FrameCalcError;
use framecalc::loads::{Load, LoadDirection};
use framecalc::analysis::Analysis;

const E: f64 = 200e9;
const G: f64 = 80e9;
const A: f64 = 0.01;
const IY: f64 = 8e-6;
const IZ: f64 = 8e-6;
const J: f64 = 1.5e-6;

fn steel_member(id: &str, start: &str, end: &str) -> Member {
    Member::new(id, start, end, E, G, A, IY, IZ, J)
}

/// In-plane support that also locks out-of-plane DOFs (uz, rx) so a purely
/// planar bending problem stays numerically stable.
fn planar_pin() -> Support {
    Support {
        restrain_ux: true,
        restrain_uy: true,
        restrain_uz: true,
        restrain_rx: true,
        restrain_ry: false,
        restrain_rz: false,
    }
}

fn planar_roller() -> Support {
    Support {
        restrain_ux: false,
        restrain_uy: true,
        restrain_uz: true,
        restrain_rx: true,
        restrain_ry: false,
        restrain_rz: false,
    }
}

#[test]
fn simply_supported_midspan_point_load_matches_closed_form() {
    let mut model = Model::new();
    model.add_node(Node::new("a", 0.0, 0.0, 0.0)).unwrap();
    model.add_node(Node::new("b", 2.0, 0.0, 0.0)).unwrap();
    model.add_node(Node::new("c", 4.0, 0.0, 0.0)).unwrap();
    model.add_member(steel_member("ab", "a", "b")).unwrap();
    model.add_member(steel_member("bc", "b", "c")).unwrap();
    model.set_support("a", planar_pin());
    model.set_support("c", planar_roller());
    model.add_load(Load::nodal("p1", "b", Dof::Uy, -10_000.0));

    let result = Analysis::new(model.clone()).run().expect("solve should succeed");

    let b_idx = model.node_index_of("b").unwrap();
    let uy_dof = model.global_dof(b_idx, Dof::Uy);
    let deflection = result.displacements[uy_dof];

    let length: f64 = 4.0;
    let expected = 10_000.0 * length.powi(3) / (48.0 * E * IZ);

    assert!(deflection < 0.0, "midspan deflection should follow the downward load");
    assert_abs_diff_eq!(deflection.abs(), expected, epsilon = expected * 1e-6);
}

#[test]
fn axial_point_load_elongates_member_per_closed_form() {
    let mut model = Model::new();
    model.add_node(Node::new("a", 0.0, 0.0, 0.0)).unwrap();
    model.add_node(Node::new("b", 3.0, 0.0, 0.0)).unwrap();
    model.add_member(steel_member("ab", "a", "b")).unwrap();
    model.set_support("a", Support::fixed());
    model.add_load(Load::nodal("p1", "b", Dof::Ux, 50_000.0));

    let result = Analysis::new(model.clone()).run().expect("solve should succeed");

    let b_idx = model.node_index_of("b").unwrap();
    let ux_dof = model.global_dof(b_idx, Dof::Ux);
    let elongation = result.displacements[ux_dof];

    let expected = 50_000.0 * 3.0 / (E * A);
    assert_abs_diff_eq!(elongation, expected, epsilon = expected * 1e-9);
}

#[test]
fn torsional_moment_twists_member_per_closed_form() {
    let mut model = Model::new();
    model.add_node(Node::new("a", 0.0, 0.0, 0.0)).unwrap();
    model.add_node(Node::new("b", 2.0, 0.0, 0.0)).unwrap();
    model.add_member(steel_member("ab", "a", "b")).unwrap();
    model.set_support("a", Support::fixed());
    model.add_load(Load::nodal("m1", "b", Dof::Rx, 2_000.0));

    let result = Analysis::new(model.clone()).run().expect("solve should succeed");

    let b_idx = model.node_index_of("b").unwrap();
    let rx_dof = model.global_dof(b_idx, Dof::Rx);
    let twist = result.displacements[rx_dof];

    let expected = 2_000.0 * 2.0 / (G * J);
    assert_abs_diff_eq!(twist, expected, epsilon = expected * 1e-9);
}

#[test]
fn cantilever_udl_deflects_toward_the_load_and_balances_reactions() {
    let mut model = Model::new();
    model.add_node(Node::new("a", 0.0, 0.0, 0.0)).unwrap();
    model.add_node(Node::new("b", 3.0, 0.0, 0.0)).unwrap();
    model.add_member(steel_member("ab", "a", "b")).unwrap();
    model.set_support("a", Support::fixed());
    model.add_load(Load::member_distributed("w1", "ab", LoadDirection::LocalY, -1_000.0, -1_000.0));

    let result = Analysis::new(model.clone()).run().expect("solve should succeed");

    let b_idx = model.node_index_of("b").unwrap();
    let uy_dof = model.global_dof(b_idx, Dof::Uy);
    assert!(result.displacements[uy_dof] < 0.0, "tip should deflect toward the applied load");

    let a_idx = model.node_index_of("a").unwrap();
    let reaction_uy = result.reactions[model.global_dof(a_idx, Dof::Uy)];
    assert_abs_diff_eq!(reaction_uy, 3_000.0, epsilon = 1e-3);
}

#[test]
fn portal_frame_reactions_balance_applied_load() {
    let mut model = Model::new();
    model.add_node(Node::new("base_left", 0.0, 0.0, 0.0)).unwrap();
    model.add_node(Node::new("top_left", 0.0, 3.0, 0.0)).unwrap();
    model.add_node(Node::new("top_right", 4.0, 3.0, 0.0)).unwrap();
    model.add_node(Node::new("base_right", 4.0, 0.0, 0.0)).unwrap();
    model.add_member(steel_member("col1", "base_left", "top_left")).unwrap();
    model.add_member(steel_member("beam", "top_left", "top_right")).unwrap();
    model.add_member(steel_member("col2", "top_right", "base_right")).unwrap();
    model.set_support("base_left", Support::fixed());
    model.set_support("base_right", Support::fixed());
    model.add_load(Load::nodal("lateral", "top_left", Dof::Ux, 5_000.0));

    let result = Analysis::new(model.clone()).run().expect("solve should succeed");

    let mut total_ux = 0.0;
    for node in &model.nodes {
        let idx = model.node_index_of(&node.id).unwrap();
        total_ux += result.reactions[model.global_dof(idx, Dof::Ux)];
    }
    assert_abs_diff_eq!(total_ux + 5_000.0, 0.0, epsilon = 1e-3);
}

#[test]
fn isolated_unconnected_node_is_reported_as_unstable() {
    let mut model = Model::new();
    model.add_node(Node::new("a", 0.0, 0.0, 0.0)).unwrap();
    model.add_node(Node::new("b", 1.0, 0.0, 0.0)).unwrap();
    model.add_node(Node::new("c", 5.0, 0.0, 0.0)).unwrap();
    model.add_member(steel_member("ab", "a", "b")).unwrap();
    model.set_support("a", Support::fixed());
    model.add_load(Load::nodal("stray", "c", Dof::Ux, 1_000.0));

    let result = Analysis::new(model).run();
    assert!(
        matches!(result, Err(FrameCalcError::Instability(_)) | Err(FrameCalcError::NonConvergent { .. })),
        "a load on a disconnected node should not produce a stable solution, got {:?}",
        result.err()
    );
}
