//! Free/constrained DOF partitioning and the direct and iterative solve
//! paths, grounded on the same skyline Cholesky and Jacobi-preconditioned
//! conjugate gradient approach used elsewhere in the sparse FEA ecosystem.

use crate::core::{ConvergenceInfo, Model, SolveMethod};
use crate::error::{FrameCalcError, Result};
use crate::sparse_assembly::sparse_matvec;
use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use std::collections::HashMap;

pub struct SolveOutput {
    pub displacements: DVector<f64>,
    pub reactions: DVector<f64>,
    pub convergence: ConvergenceInfo,
}

/// Solve K u = F for the model's free DOFs and recover support reactions.
pub fn solve(model: &Model, k: &CsrMatrix<f64>, f: &DVector<f64>) -> Result<SolveOutput> {
    let n = model.total_dofs();
    let restrained = restrained_mask(model);

    let mut free_dofs = Vec::with_capacity(n);
    for (dof, &is_restrained) in restrained.iter().enumerate() {
        if !is_restrained {
            free_dofs.push(dof);
        }
    }
    if free_dofs.is_empty() {
        return Err(FrameCalcError::FullyConstrained);
    }

    let mut to_reduced: HashMap<usize, usize> = HashMap::with_capacity(free_dofs.len());
    for (reduced_idx, &dof) in free_dofs.iter().enumerate() {
        to_reduced.insert(dof, reduced_idx);
    }

    let nf = free_dofs.len();
    let mut coo_ff = CooMatrix::new(nf, nf);
    for (row, col, &val) in k.triplet_iter() {
        if let (Some(&r), Some(&c)) = (to_reduced.get(&row), to_reduced.get(&col)) {
            coo_ff.push(r, c, val);
        }
    }
    let k_ff = CsrMatrix::from(&coo_ff);

    let mut f_f = DVector::zeros(nf);
    for (reduced_idx, &dof) in free_dofs.iter().enumerate() {
        f_f[reduced_idx] = f[dof];
    }

    let use_iterative = model.settings.use_iterative
        || nf > model.settings.direct_dof_limit
        || model.nodes.len() > model.settings.direct_node_limit;

    let (u_f, convergence) = if use_iterative {
        solve_iterative(&k_ff, &f_f, model.settings.cg_tolerance, model.settings.cg_max_iterations)?
    } else {
        match solve_direct(&k_ff, &f_f) {
            Ok(u) => (
                u,
                ConvergenceInfo {
                    method: SolveMethod::Direct,
                    iterations: 1,
                    residual_norm: 0.0,
                    converged: true,
                },
            ),
            Err(_) => solve_iterative(&k_ff, &f_f, model.settings.cg_tolerance, model.settings.cg_max_iterations)?,
        }
    };

    let mut u = DVector::zeros(n);
    for (reduced_idx, &dof) in free_dofs.iter().enumerate() {
        u[dof] = u_f[reduced_idx];
    }

    let reactions_full = sparse_matvec(k, &u) - f;
    let mut reactions = DVector::zeros(n);
    for (dof, &is_restrained) in restrained.iter().enumerate() {
        if is_restrained {
            reactions[dof] = reactions_full[dof];
        }
    }

    Ok(SolveOutput { displacements: u, reactions, convergence })
}

fn restrained_mask(model: &Model) -> Vec<bool> {
    let mut mask = vec![false; model.total_dofs()];
    for (idx, node) in model.nodes.iter().enumerate() {
        let support = model.support_of(&node.id);
        for &dof in &crate::core::Dof::ALL {
            if support.is_restrained(dof) {
                mask[model.global_dof(idx, dof)] = true;
            }
        }
    }
    mask
}

/// Skyline-storage Cholesky factorization and solve for a reduced,
/// symmetric positive definite system.
fn solve_direct(k_ff: &CsrMatrix<f64>, f_f: &DVector<f64>) -> std::result::Result<DVector<f64>, &'static str> {
    let mut solver = SkylineCholesky::new(k_ff);
    solver.factorize()?;
    Ok(solver.solve(f_f))
}

struct SkylineCholesky {
    size: usize,
    skyline: Vec<Vec<f64>>,
    heights: Vec<usize>,
}

impl SkylineCholesky {
    fn new(csr: &CsrMatrix<f64>) -> Self {
        let size = csr.nrows();
        let mut heights = vec![0usize; size];
        for (row, col, _) in csr.triplet_iter() {
            if col < row {
                let height = row - col;
                if height > heights[row] {
                    heights[row] = height;
                }
            }
        }

        let mut skyline: Vec<Vec<f64>> = Vec::with_capacity(size);
        for &h in &heights {
            skyline.push(vec![0.0; h + 1]);
        }

        for (row, col, &val) in csr.triplet_iter() {
            if col <= row && col >= row - heights[row] {
                let idx = col - (row - heights[row]);
                skyline[row][idx] += val;
            }
        }

        Self { size, skyline, heights }
    }

    fn factorize(&mut self) -> std::result::Result<(), &'static str> {
        for i in 0..self.size {
            let hi = self.heights[i];
            let start_i = i - hi;

            for j in start_i..i {
                let hj = self.heights[j];
                let start_j = j - hj;
                let start = start_i.max(start_j);

                let mut sum = 0.0;
                for k in start..j {
                    sum += self.get(i, k) * self.get(j, k);
                }

                let diag_j = self.skyline[j][hj];
                if diag_j.abs() < 1e-15 {
                    return Err("zero pivot during factorization");
                }

                let idx = j - start_i;
                self.skyline[i][idx] = (self.skyline[i][idx] - sum) / diag_j;
            }

            let mut sum = 0.0;
            for j in start_i..i {
                let val = self.get(i, j);
                sum += val * val;
            }

            let diag = self.skyline[i][hi] - sum;
            if diag <= 0.0 {
                return Err("matrix is not positive definite");
            }
            self.skyline[i][hi] = diag.sqrt();
        }
        Ok(())
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> f64 {
        if col > row {
            return self.get(col, row);
        }
        let h = self.heights[row];
        let start = row - h;
        if col < start {
            return 0.0;
        }
        self.skyline[row][col - start]
    }

    fn solve(&self, b: &DVector<f64>) -> DVector<f64> {
        let mut x = b.clone();

        for i in 0..self.size {
            let hi = self.heights[i];
            let start = i - hi;
            let mut sum = 0.0;
            for j in start..i {
                sum += self.get(i, j) * x[j];
            }
            x[i] = (x[i] - sum) / self.get(i, i);
        }

        for i in (0..self.size).rev() {
            x[i] /= self.get(i, i);
            let hi = self.heights[i];
            let start = i - hi;
            for j in start..i {
                x[j] -= self.get(i, j) * x[i];
            }
        }

        x
    }
}

/// Jacobi-preconditioned conjugate gradient with explicit iteration and
/// residual reporting.
fn solve_iterative(
    k_ff: &CsrMatrix<f64>,
    f_f: &DVector<f64>,
    tol: f64,
    max_iter: usize,
) -> Result<(DVector<f64>, ConvergenceInfo)> {
    let n = k_ff.nrows();

    let mut diag = DVector::zeros(n);
    for (row, col, &val) in k_ff.triplet_iter() {
        if row == col {
            diag[row] = val;
        }
    }
    for d in diag.iter_mut() {
        if d.abs() < 1e-15 {
            *d = 1.0;
        }
    }

    let mut x = DVector::zeros(n);
    let mut r = f_f.clone();
    let mut z = r.component_div(&diag);
    let mut p = z.clone();
    let mut r_dot_z = r.dot(&z);

    let mut iterations = 0;
    let mut residual_norm = r.norm();

    for iter in 0..max_iter {
        iterations = iter + 1;
        let ap = sparse_matvec(k_ff, &p);
        let p_dot_ap = p.dot(&ap);
        if p_dot_ap.abs() < 1e-15 {
            return Err(FrameCalcError::Instability(
                "conjugate gradient breakdown: search direction orthogonal to stiffness action".to_string()
            ));
        }

        let alpha = r_dot_z / p_dot_ap;
        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &ap, 1.0);

        residual_norm = r.norm();
        if residual_norm < tol {
            return Ok((
                x,
                ConvergenceInfo {
                    method: SolveMethod::ConjugateGradient,
                    iterations,
                    residual_norm,
                    converged: true,
                },
            ));
        }

        z = r.component_div(&diag);
        let r_dot_z_new = r.dot(&z);
        let beta = r_dot_z_new / r_dot_z;
        r_dot_z = r_dot_z_new;
        p = &z + beta * &p;
    }

    Err(FrameCalcError::NonConvergent { iterations, residual: residual_norm })
}
