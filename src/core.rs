//! Core data structures for the frame model

use crate::error::{FrameCalcError, Result, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A node in the frame model, in SI meters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Node {
    pub fn new(id: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self { id: id.into(), x, y, z }
    }

    pub fn position(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl Validate for Node {
    fn validate(&self) -> Result<()> {
        if self.x.is_nan() || self.y.is_nan() || self.z.is_nan()
            || self.x.is_infinite() || self.y.is_infinite() || self.z.is_infinite()
        {
            return Err(FrameCalcError::InvalidInput(
                format!("node {} has non-finite coordinates", self.id)
            ));
        }
        Ok(())
    }
}

/// The six degrees of freedom carried by every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dof {
    Ux,
    Uy,
    Uz,
    Rx,
    Ry,
    Rz,
}

impl Dof {
    pub const ALL: [Dof; 6] = [Dof::Ux, Dof::Uy, Dof::Uz, Dof::Rx, Dof::Ry, Dof::Rz];

    pub fn local_offset(self) -> usize {
        match self {
            Dof::Ux => 0,
            Dof::Uy => 1,
            Dof::Uz => 2,
            Dof::Rx => 3,
            Dof::Ry => 4,
            Dof::Rz => 5,
        }
    }
}

/// A straight prismatic 3D frame member connecting two nodes.
///
/// `e`, `g` (Pa), `a` (m²) and `iy`, `iz`, `j` (m⁴) are mandatory: this model
/// never derives shear modulus from Young's modulus and Poisson's ratio, and
/// never defaults torsional constant from the bending inertias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub start_id: String,
    pub end_id: String,
    pub e: f64,
    pub g: f64,
    pub a: f64,
    pub iy: f64,
    pub iz: f64,
    pub j: f64,
    /// Roll angle about the local x-axis, radians.
    #[serde(default)]
    pub roll: f64,
}

impl Member {
    pub fn new(
        id: impl Into<String>,
        start_id: impl Into<String>,
        end_id: impl Into<String>,
        e: f64,
        g: f64,
        a: f64,
        iy: f64,
        iz: f64,
        j: f64,
    ) -> Self {
        Self {
            id: id.into(),
            start_id: start_id.into(),
            end_id: end_id.into(),
            e,
            g,
            a,
            iy,
            iz,
            j,
            roll: 0.0,
        }
    }

    pub fn with_roll(mut self, roll: f64) -> Self {
        self.roll = roll;
        self
    }
}

impl Validate for Member {
    fn validate(&self) -> Result<()> {
        let props = [
            ("E", self.e),
            ("G", self.g),
            ("A", self.a),
            ("Iy", self.iy),
            ("Iz", self.iz),
            ("J", self.j),
        ];
        for (name, value) in props {
            if !value.is_finite() || value <= 0.0 {
                return Err(FrameCalcError::InvalidInput(
                    format!("member {} has invalid {} = {}", self.id, name, value)
                ));
            }
        }
        if !self.roll.is_finite() {
            return Err(FrameCalcError::InvalidInput(
                format!("member {} has non-finite roll angle", self.id)
            ));
        }
        Ok(())
    }
}

/// The support condition at a node: six independent restraint flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Support {
    pub restrain_ux: bool,
    pub restrain_uy: bool,
    pub restrain_uz: bool,
    pub restrain_rx: bool,
    pub restrain_ry: bool,
    pub restrain_rz: bool,
}

impl Support {
    pub fn free() -> Self {
        Self::default()
    }

    pub fn fixed() -> Self {
        Self {
            restrain_ux: true,
            restrain_uy: true,
            restrain_uz: true,
            restrain_rx: true,
            restrain_ry: true,
            restrain_rz: true,
        }
    }

    pub fn pinned() -> Self {
        Self {
            restrain_ux: true,
            restrain_uy: true,
            restrain_uz: true,
            ..Self::default()
        }
    }

    /// A roller restrains translation along every axis except `free_axis`.
    pub fn roller(free_axis: Dof) -> Self {
        let mut s = Self::pinned();
        match free_axis {
            Dof::Ux => s.restrain_ux = false,
            Dof::Uy => s.restrain_uy = false,
            Dof::Uz => s.restrain_uz = false,
            _ => {}
        }
        s
    }

    pub fn is_restrained(&self, dof: Dof) -> bool {
        match dof {
            Dof::Ux => self.restrain_ux,
            Dof::Uy => self.restrain_uy,
            Dof::Uz => self.restrain_uz,
            Dof::Rx => self.restrain_rx,
            Dof::Ry => self.restrain_ry,
            Dof::Rz => self.restrain_rz,
        }
    }

    pub fn any_restrained(&self) -> bool {
        Dof::ALL.iter().any(|&d| self.is_restrained(d))
    }
}

/// Solver tuning and thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Free-DOF count above which the direct solver is abandoned for CG.
    pub direct_dof_limit: usize,
    /// Node count above which CG is forced regardless of DOF count.
    pub direct_node_limit: usize,
    /// Force the iterative solver regardless of problem size.
    pub use_iterative: bool,
    pub cg_tolerance: f64,
    pub cg_max_iterations: usize,
    /// Number of stations sampled along each member during post-processing.
    pub num_stations: usize,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            direct_dof_limit: 10_000,
            direct_node_limit: 2_000,
            use_iterative: false,
            cg_tolerance: 1e-8,
            cg_max_iterations: 2_000,
            num_stations: 100,
        }
    }
}

/// The complete frame model: nodes, members, supports, and loads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Model {
    pub nodes: Vec<Node>,
    pub members: Vec<Member>,
    pub supports: HashMap<String, Support>,
    pub loads: Vec<crate::loads::Load>,
    #[serde(default)]
    pub settings: AnalysisSettings,
    #[serde(skip, default)]
    node_index: HashMap<String, usize>,
}

impl Model {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            members: Vec::new(),
            supports: HashMap::new(),
            loads: Vec::new(),
            settings: AnalysisSettings::default(),
            node_index: HashMap::new(),
        }
    }

    pub fn add_node(&mut self, node: Node) -> Result<()> {
        node.validate()?;
        if self.node_index.contains_key(&node.id) {
            return Err(FrameCalcError::TopologyError(
                format!("duplicate node id {}", node.id)
            ));
        }
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    pub fn add_member(&mut self, member: Member) -> Result<()> {
        member.validate()?;
        self.members.push(member);
        Ok(())
    }

    pub fn set_support(&mut self, node_id: impl Into<String>, support: Support) {
        self.supports.insert(node_id.into(), support);
    }

    pub fn add_load(&mut self, load: crate::loads::Load) {
        self.loads.push(load);
    }

    /// Rebuild the id -> index map. Must be called after deserializing a
    /// `Model` from JSON/YAML, since `node_index` is not itself serialized.
    pub fn reindex(&mut self) {
        self.node_index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.clone(), i))
            .collect();
    }

    pub fn node_index_of(&self, id: &str) -> Option<usize> {
        self.node_index.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Result<&Node> {
        self.node_index_of(id)
            .map(|i| &self.nodes[i])
            .ok_or_else(|| FrameCalcError::TopologyError(format!("unknown node id {}", id)))
    }

    pub fn support_of(&self, node_id: &str) -> Support {
        self.supports.get(node_id).copied().unwrap_or_default()
    }

    pub fn total_dofs(&self) -> usize {
        self.nodes.len() * 6
    }

    pub fn global_dof(&self, node_index: usize, dof: Dof) -> usize {
        node_index * 6 + dof.local_offset()
    }
}

impl Validate for Model {
    fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(FrameCalcError::InvalidInput("model has no nodes".to_string()));
        }
        if self.members.is_empty() {
            return Err(FrameCalcError::InvalidInput("model has no members".to_string()));
        }
        for node in &self.nodes {
            node.validate()?;
        }
        for member in &self.members {
            member.validate()?;
            if self.node_index_of(&member.start_id).is_none() {
                return Err(FrameCalcError::TopologyError(
                    format!("member {} references unknown start node {}", member.id, member.start_id)
                ));
            }
            if self.node_index_of(&member.end_id).is_none() {
                return Err(FrameCalcError::TopologyError(
                    format!("member {} references unknown end node {}", member.id, member.end_id)
                ));
            }
        }
        for load in &self.loads {
            load.validate_against(self)?;
        }
        Ok(())
    }
}

/// Convergence diagnostics attached to a solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceInfo {
    pub method: SolveMethod,
    pub iterations: usize,
    pub residual_norm: f64,
    pub converged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveMethod {
    Direct,
    ConjugateGradient,
}
