//! The top-level pipeline: ingest, assemble, solve, post-process, with
//! progress reported at each stage boundary.

use crate::core::{ConvergenceInfo, Model};
use crate::error::{FrameCalcError, Result, Validate};
use crate::postprocess::{self, PostprocessReport, Station};
use crate::progress::{self, EventSink, LogSink, Stage};
use crate::sparse_assembly::{self, AssemblyStats};
use crate::{ingest, solvers};
use log::info;
use serde::Serialize;
use std::path::Path;
use std::time::Instant;

#[derive(Debug, Serialize)]
pub struct FrameResult {
    pub displacements: Vec<f64>,
    pub reactions: Vec<f64>,
    pub convergence: ConvergenceSummary,
    pub assembly: AssemblySummary,
    pub members: Vec<MemberResultSummary>,
    pub global: GlobalSummary,
    pub postprocess_failures: Vec<(String, String)>,
}

/// Envelope values across every member's diagrams, for a quick worst-case
/// read without walking `members` by hand.
#[derive(Debug, Serialize)]
pub struct GlobalSummary {
    pub max_shear: f64,
    pub max_moment: f64,
    pub max_displacement: f64,
}

#[derive(Debug, Serialize)]
pub struct ConvergenceSummary {
    pub method: &'static str,
    pub iterations: usize,
    pub residual_norm: f64,
    pub converged: bool,
}

#[derive(Debug, Serialize)]
pub struct AssemblySummary {
    pub dofs: usize,
    pub members: usize,
    pub nnz: usize,
    pub density: f64,
}

#[derive(Debug, Serialize)]
pub struct MemberResultSummary {
    pub member_id: String,
    pub length: f64,
    pub stations: Vec<Station>,
    pub max_abs_axial: f64,
    pub max_abs_torsion: f64,
    pub max_abs_shear: f64,
    pub max_abs_moment_y: f64,
    pub max_abs_moment_z: f64,
    pub max_abs_deflection: f64,
}

impl From<&ConvergenceInfo> for ConvergenceSummary {
    fn from(c: &ConvergenceInfo) -> Self {
        Self {
            method: match c.method {
                crate::core::SolveMethod::Direct => "direct",
                crate::core::SolveMethod::ConjugateGradient => "conjugate_gradient",
            },
            iterations: c.iterations,
            residual_norm: c.residual_norm,
            converged: c.converged,
        }
    }
}

impl From<&AssemblyStats> for AssemblySummary {
    fn from(s: &AssemblyStats) -> Self {
        Self { dofs: s.dofs, members: s.members, nnz: s.nnz, density: s.density }
    }
}

/// Drives a model through ingest (already done by the caller), assembly,
/// solve, and post-processing, reporting staged progress along the way.
pub struct Analysis {
    model: Model,
}

impl Analysis {
    pub fn new(model: Model) -> Self {
        Self { model }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let model = ingest::model_from_path(path)?;
        Ok(Self { model })
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Force the iterative conjugate-gradient solver regardless of the
    /// problem-size thresholds in the model's own settings.
    pub fn with_iterative_solver(mut self) -> Self {
        self.model.settings.use_iterative = true;
        self
    }

    pub fn run(&self) -> Result<FrameResult> {
        self.run_with_sink(&mut LogSink::default())
    }

    pub fn run_with_sink(&self, sink: &mut dyn EventSink) -> Result<FrameResult> {
        let start = Instant::now();

        progress::emit_stage(sink, Stage::Ingest, 0, "validating model topology");
        if let Err(e) = self.model.validate() {
            progress::emit_error(sink, &e);
            return Err(e);
        }

        progress::emit_stage(sink, Stage::Assemble, 20, "assembling global stiffness matrix");
        let (k, stats) = match sparse_assembly::assemble_stiffness(&self.model) {
            Ok(v) => v,
            Err(e) => {
                progress::emit_error(sink, &e);
                return Err(e);
            }
        };
        info!("assembled {} dofs, {} nonzeros ({:.2}% dense)", stats.dofs, stats.nnz, stats.density * 100.0);

        let f = match sparse_assembly::assemble_loads(&self.model) {
            Ok(v) => v,
            Err(e) => {
                progress::emit_error(sink, &e);
                return Err(e);
            }
        };

        progress::emit_stage(sink, Stage::Solve, 50, "solving for nodal displacements");
        let solve_output = match solvers::solve(&self.model, &k, &f) {
            Ok(v) => v,
            Err(e) => {
                progress::emit_error(sink, &e);
                return Err(e);
            }
        };
        info!(
            "solve converged via {:?} in {} iterations (residual {:.3e})",
            solve_output.convergence.method, solve_output.convergence.iterations, solve_output.convergence.residual_norm
        );

        progress::emit_stage(sink, Stage::Postprocess, 80, "computing member force and deflection diagrams");
        let report: PostprocessReport = postprocess::postprocess(&self.model, &solve_output.displacements)?;
        for (member_id, detail) in &report.failures {
            progress::emit_error(sink, &FrameCalcError::PostprocessFailure {
                member_id: member_id.clone(),
                detail: detail.clone(),
            });
        }

        let members: Vec<MemberResultSummary> = report
            .diagrams
            .iter()
            .map(|d| {
                let max_abs_shear = d
                    .stations
                    .iter()
                    .map(|s| s.shear_y.hypot(s.shear_z))
                    .fold(0.0, f64::max);
                MemberResultSummary {
                    member_id: d.member_id.clone(),
                    length: d.length,
                    stations: d.stations.clone(),
                    max_abs_axial: d.stations.iter().map(|s| s.axial.abs()).fold(0.0, f64::max),
                    max_abs_torsion: d.stations.iter().map(|s| s.torsion.abs()).fold(0.0, f64::max),
                    max_abs_shear,
                    max_abs_moment_y: d.stations.iter().map(|s| s.moment_y.abs()).fold(0.0, f64::max),
                    max_abs_moment_z: d.stations.iter().map(|s| s.moment_z.abs()).fold(0.0, f64::max),
                    max_abs_deflection: d
                        .stations
                        .iter()
                        .map(|s| s.deflection_y.hypot(s.deflection_z))
                        .fold(0.0, f64::max),
                }
            })
            .collect();

        let global = GlobalSummary {
            max_shear: members.iter().map(|m| m.max_abs_shear).fold(0.0, f64::max),
            max_moment: members
                .iter()
                .map(|m| m.max_abs_moment_y.max(m.max_abs_moment_z))
                .fold(0.0, f64::max),
            max_displacement: members.iter().map(|m| m.max_abs_deflection).fold(0.0, f64::max),
        };

        progress::emit_stage(sink, Stage::Done, 100, format!("completed in {:?}", start.elapsed()));

        Ok(FrameResult {
            displacements: solve_output.displacements.iter().copied().collect(),
            reactions: solve_output.reactions.iter().copied().collect(),
            convergence: (&solve_output.convergence).into(),
            assembly: (&stats).into(),
            members,
            global,
            postprocess_failures: report.failures,
        })
    }
}
