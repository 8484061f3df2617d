//! Sparse global stiffness and load vector assembly.
//!
//! FEA stiffness matrices are typically 95-99% sparse, so we accumulate
//! triplets and hand them to `nalgebra-sparse` for conversion to CSR rather
//! than ever materializing a dense global matrix.

use crate::core::{Dof, Model};
use crate::elements;
use crate::error::{FrameCalcError, Result};
use crate::loads::LoadKind;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use rayon::prelude::*;

/// Member count above which element stiffness matrices are computed on a
/// rayon thread pool before being folded into the triplet list serially.
const PARALLEL_THRESHOLD: usize = 64;

/// Accumulates (row, col, value) triplets for the global stiffness matrix.
pub struct GlobalMatrixBuilder {
    size: usize,
    entries: Vec<(usize, usize, f64)>,
}

impl GlobalMatrixBuilder {
    pub fn new(size: usize) -> Self {
        let estimated_nnz = size * 60;
        Self { size, entries: Vec::with_capacity(estimated_nnz) }
    }

    #[inline]
    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        if value.abs() > 1e-15 {
            self.entries.push((row, col, value));
        }
    }

    pub fn add_member_matrix(&mut self, dofs: &[usize; 12], k: &DMatrix<f64>) {
        for (i, &di) in dofs.iter().enumerate() {
            for (j, &dj) in dofs.iter().enumerate() {
                self.add(di, dj, k[(i, j)]);
            }
        }
    }

    pub fn to_csr(&self) -> CsrMatrix<f64> {
        let mut coo = CooMatrix::new(self.size, self.size);
        for &(row, col, val) in &self.entries {
            coo.push(row, col, val);
        }
        CsrMatrix::from(&coo)
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn density(&self) -> f64 {
        if self.size == 0 {
            return 0.0;
        }
        self.entries.len() as f64 / (self.size * self.size) as f64
    }
}

/// Diagnostics about an assembled system, surfaced to the progress sink.
#[derive(Debug, Clone)]
pub struct AssemblyStats {
    pub dofs: usize,
    pub members: usize,
    pub nnz: usize,
    pub density: f64,
}

fn member_dofs(model: &Model, start_idx: usize, end_idx: usize) -> [usize; 12] {
    let mut dofs = [0usize; 12];
    for (i, &dof) in Dof::ALL.iter().enumerate() {
        dofs[i] = model.global_dof(start_idx, dof);
        dofs[i + 6] = model.global_dof(end_idx, dof);
    }
    dofs
}

/// Assemble the global stiffness matrix in CSR form, by folding every
/// member's 12x12 global stiffness matrix into the appropriate global DOFs.
pub fn assemble_stiffness(model: &Model) -> Result<(CsrMatrix<f64>, AssemblyStats)> {
    let size = model.total_dofs();
    let mut builder = GlobalMatrixBuilder::new(size);

    let member_matrices: Vec<Result<DMatrix<f64>>> = if model.members.len() > PARALLEL_THRESHOLD {
        model
            .members
            .par_iter()
            .map(|member| {
                let start = model.node(&member.start_id)?;
                let end = model.node(&member.end_id)?;
                elements::global_stiffness_matrix(member, start, end)
            })
            .collect()
    } else {
        model
            .members
            .iter()
            .map(|member| {
                let start = model.node(&member.start_id)?;
                let end = model.node(&member.end_id)?;
                elements::global_stiffness_matrix(member, start, end)
            })
            .collect()
    };

    for (member, k_result) in model.members.iter().zip(member_matrices.into_iter()) {
        let k = k_result?;
        let start_idx = model.node_index_of(&member.start_id).expect("validated");
        let end_idx = model.node_index_of(&member.end_id).expect("validated");
        let dofs = member_dofs(model, start_idx, end_idx);
        builder.add_member_matrix(&dofs, &k);
    }

    let stats = AssemblyStats {
        dofs: size,
        members: model.members.len(),
        nnz: builder.nnz(),
        density: builder.density(),
    };
    Ok((builder.to_csr(), stats))
}

/// Assemble the global load vector: direct nodal loads plus the equivalent
/// nodal loads of every member point/distributed load, rotated into global
/// coordinates through that member's transformation matrix.
pub fn assemble_loads(model: &Model) -> Result<DVector<f64>> {
    let size = model.total_dofs();
    let mut f = DVector::zeros(size);

    for load in &model.loads {
        match &load.kind {
            LoadKind::Nodal { node_id, dof, magnitude } => {
                let idx = model.node_index_of(node_id).ok_or_else(|| {
                    FrameCalcError::TopologyError(format!("unknown node {} in load {}", node_id, load.id))
                })?;
                f[model.global_dof(idx, *dof)] += magnitude;
            }
            LoadKind::MemberPoint { member_id, direction, magnitude, position } => {
                let member = model
                    .members
                    .iter()
                    .find(|m| &m.id == member_id)
                    .ok_or_else(|| FrameCalcError::TopologyError(format!("unknown member {}", member_id)))?;
                let start = model.node(&member.start_id)?;
                let end = model.node(&member.end_id)?;
                let length = elements::member_length(start, end);
                let local = elements::point_load_local_fixed_end(*direction, *magnitude, *position, length);
                add_member_equivalent_load(model, member, start, end, length, &local, &mut f)?;
            }
            LoadKind::MemberDistributed { member_id, direction, w_start, w_end } => {
                let member = model
                    .members
                    .iter()
                    .find(|m| &m.id == member_id)
                    .ok_or_else(|| FrameCalcError::TopologyError(format!("unknown member {}", member_id)))?;
                let start = model.node(&member.start_id)?;
                let end = model.node(&member.end_id)?;
                let length = elements::member_length(start, end);
                let local = elements::distributed_load_local_fixed_end(*direction, *w_start, *w_end, length);
                add_member_equivalent_load(model, member, start, end, length, &local, &mut f)?;
            }
        }
    }

    Ok(f)
}

/// Sparse matrix-vector product y = A * x, used by both the iterative
/// solver and reaction recovery.
pub fn sparse_matvec(csr: &CsrMatrix<f64>, x: &DVector<f64>) -> DVector<f64> {
    let n = csr.nrows();
    let mut y = DVector::zeros(n);
    let row_offsets = csr.row_offsets();
    let col_indices = csr.col_indices();
    let values = csr.values();
    for row in 0..n {
        let start = row_offsets[row];
        let end = row_offsets[row + 1];
        let mut sum = 0.0;
        for idx in start..end {
            sum += values[idx] * x[col_indices[idx]];
        }
        y[row] = sum;
    }
    y
}

fn add_member_equivalent_load(
    model: &Model,
    member: &crate::core::Member,
    start: &crate::core::Node,
    end: &crate::core::Node,
    length: f64,
    local: &[f64; 12],
    f: &mut DVector<f64>,
) -> Result<()> {
    let t = elements::transformation_matrix(start, end, member.roll, length)?;
    let local_vec = DVector::from_row_slice(local);
    let global_vec = t.transpose() * local_vec;

    let start_idx = model.node_index_of(&member.start_id).expect("validated");
    let end_idx = model.node_index_of(&member.end_id).expect("validated");
    let dofs = member_dofs(model, start_idx, end_idx);
    for (i, &d) in dofs.iter().enumerate() {
        f[d] += global_vec[i];
    }
    Ok(())
}
