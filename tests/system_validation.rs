//! Structural invariants that should hold for any well-posed model,
//! independent of the specific closed-form scenario under test.

use framecalc::core::{Dof, Member, Model, Node, Support};
use framecalc::error::FrameCalcError;
use framecalc::loads::{Load, LoadDirection};
use framecalc::solvers;
use framecalc::sparse_assembly::{self, sparse_matvec};

fn steel_member(id: &str, start: &str, end: &str) -> Member {
    Member::new(id, start, end, 200e9, 80e9, 0.01, 8e-6, 8e-6, 1.5e-6)
}

fn cantilever_model() -> Model {
    let mut model = Model::new();
    model.add_node(Node::new("a", 0.0, 0.0, 0.0)).unwrap();
    model.add_node(Node::new("b", 1.0, 0.0, 0.0)).unwrap();
    model.add_node(Node::new("c", 2.0, 0.0, 0.0)).unwrap();
    model.add_member(steel_member("ab", "a", "b")).unwrap();
    model.add_member(steel_member("bc", "b", "c")).unwrap();
    model.set_support("a", Support::fixed());
    model.add_load(Load::nodal("p1", "c", Dof::Uy, -2_500.0));
    model.add_load(Load::nodal("p2", "b", Dof::Uz, 900.0));
    model
}

#[test]
fn global_stiffness_matrix_is_symmetric() {
    let model = cantilever_model();
    let (k, stats) = sparse_assembly::assemble_stiffness(&model).unwrap();
    assert_eq!(stats.dofs, model.total_dofs());

    let mut entries = std::collections::HashMap::new();
    for (row, col, value) in k.triplet_iter() {
        entries.insert((row, col), *value);
    }
    for (&(row, col), &value) in &entries {
        let mirrored = entries.get(&(col, row)).copied().unwrap_or(0.0);
        assert!(
            (value - mirrored).abs() < 1e-6,
            "K[{row},{col}] = {value} != K[{col},{row}] = {mirrored}"
        );
    }
}

#[test]
fn repeated_solves_of_the_same_model_are_deterministic() {
    let model = cantilever_model();
    let (k1, _) = sparse_assembly::assemble_stiffness(&model).unwrap();
    let f1 = sparse_assembly::assemble_loads(&model).unwrap();
    let out1 = solvers::solve(&model, &k1, &f1).unwrap();

    let (k2, _) = sparse_assembly::assemble_stiffness(&model).unwrap();
    let f2 = sparse_assembly::assemble_loads(&model).unwrap();
    let out2 = solvers::solve(&model, &k2, &f2).unwrap();

    for (a, b) in out1.displacements.iter().zip(out2.displacements.iter()) {
        assert_eq!(a, b, "identical assembly and solve should produce bit-identical displacements");
    }
}

#[test]
fn global_equilibrium_holds_between_reactions_and_applied_loads() {
    let model = cantilever_model();
    let (k, _) = sparse_assembly::assemble_stiffness(&model).unwrap();
    let f = sparse_assembly::assemble_loads(&model).unwrap();
    let out = solvers::solve(&model, &k, &f).unwrap();

    let mut sum_fy = 0.0;
    let mut sum_fz = 0.0;
    for node in &model.nodes {
        let idx = model.node_index_of(&node.id).unwrap();
        sum_fy += f[model.global_dof(idx, Dof::Uy)] + out.reactions[model.global_dof(idx, Dof::Uy)];
        sum_fz += f[model.global_dof(idx, Dof::Uz)] + out.reactions[model.global_dof(idx, Dof::Uz)];
    }
    assert!(sum_fy.abs() < 1e-6, "sum of applied + reaction forces in y should vanish, got {sum_fy}");
    assert!(sum_fz.abs() < 1e-6, "sum of applied + reaction forces in z should vanish, got {sum_fz}");
}

#[test]
fn ku_minus_f_matches_sparse_matvec_residual() {
    let model = cantilever_model();
    let (k, _) = sparse_assembly::assemble_stiffness(&model).unwrap();
    let f = sparse_assembly::assemble_loads(&model).unwrap();
    let out = solvers::solve(&model, &k, &f).unwrap();

    let ku = sparse_matvec(&k, &out.displacements);
    let residual = &ku - &f;
    for i in 0..residual.len() {
        assert!(
            (residual[i] - out.reactions[i]).abs() < 1e-4,
            "recovered reaction at dof {i} should equal K*u - F"
        );
    }
}

#[test]
fn fully_restrained_model_reports_fully_constrained_error() {
    let mut model = Model::new();
    model.add_node(Node::new("a", 0.0, 0.0, 0.0)).unwrap();
    model.add_node(Node::new("b", 1.0, 0.0, 0.0)).unwrap();
    model.add_member(steel_member("ab", "a", "b")).unwrap();
    model.set_support("a", Support::fixed());
    model.set_support("b", Support::fixed());
    model.add_load(Load::nodal("p1", "b", Dof::Uy, -1.0));

    let (k, _) = sparse_assembly::assemble_stiffness(&model).unwrap();
    let f = sparse_assembly::assemble_loads(&model).unwrap();
    let result = solvers::solve(&model, &k, &f);
    assert!(matches!(result, Err(FrameCalcError::FullyConstrained)));
}

#[test]
fn iterative_solver_agrees_with_direct_solver() {
    let mut iterative_model = cantilever_model();
    let direct_model = cantilever_model();
    iterative_model.settings.use_iterative = true;

    let (k, _) = sparse_assembly::assemble_stiffness(&direct_model).unwrap();
    let f = sparse_assembly::assemble_loads(&direct_model).unwrap();
    let direct_out = solvers::solve(&direct_model, &k, &f).unwrap();
    let iterative_out = solvers::solve(&iterative_model, &k, &f).unwrap();

    for (a, b) in direct_out.displacements.iter().zip(iterative_out.displacements.iter()) {
        assert!((a - b).abs() < 1e-5, "direct and CG solutions should agree closely: {a} vs {b}");
    }
}

#[test]
fn validation_rejects_member_referencing_unknown_node() {
    let mut model = Model::new();
    model.add_node(Node::new("a", 0.0, 0.0, 0.0)).unwrap();
    model.members.push(steel_member("ab", "a", "missing"));

    use framecalc::error::Validate;
    let result = model.validate();
    assert!(matches!(result, Err(FrameCalcError::TopologyError(_))));
}

#[test]
fn member_point_load_position_outside_unit_interval_is_rejected() {
    let mut model = Model::new();
    model.add_node(Node::new("a", 0.0, 0.0, 0.0)).unwrap();
    model.add_node(Node::new("b", 1.0, 0.0, 0.0)).unwrap();
    model.add_member(steel_member("ab", "a", "b")).unwrap();
    model.set_support("a", Support::fixed());

    let load = Load::member_point("p1", "ab", LoadDirection::LocalY, -1.0, 1.5);
    let result = load.validate_against(&model);
    assert!(matches!(result, Err(FrameCalcError::InvalidInput(_))));
}
