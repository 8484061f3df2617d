//! Load definitions applied to a model

use crate::core::{Dof, Model};
use crate::error::{FrameCalcError, Result};
use serde::{Deserialize, Serialize};

/// A single applied load, tagged by the entity it acts on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Load {
    pub id: String,
    #[serde(flatten)]
    pub kind: LoadKind,
}

impl Load {
    pub fn nodal(id: impl Into<String>, node_id: impl Into<String>, dof: Dof, magnitude: f64) -> Self {
        Self {
            id: id.into(),
            kind: LoadKind::Nodal { node_id: node_id.into(), dof, magnitude },
        }
    }

    pub fn member_point(
        id: impl Into<String>,
        member_id: impl Into<String>,
        direction: LoadDirection,
        magnitude: f64,
        position: f64,
    ) -> Self {
        Self {
            id: id.into(),
            kind: LoadKind::MemberPoint {
                member_id: member_id.into(),
                direction,
                magnitude,
                position,
            },
        }
    }

    pub fn member_distributed(
        id: impl Into<String>,
        member_id: impl Into<String>,
        direction: LoadDirection,
        w_start: f64,
        w_end: f64,
    ) -> Self {
        Self {
            id: id.into(),
            kind: LoadKind::MemberDistributed {
                member_id: member_id.into(),
                direction,
                w_start,
                w_end,
            },
        }
    }

    pub fn validate_against(&self, model: &Model) -> Result<()> {
        match &self.kind {
            LoadKind::Nodal { node_id, magnitude, .. } => {
                if model.node_index_of(node_id).is_none() {
                    return Err(FrameCalcError::TopologyError(
                        format!("load {} references unknown node {}", self.id, node_id)
                    ));
                }
                if !magnitude.is_finite() {
                    return Err(FrameCalcError::InvalidInput(
                        format!("load {} has non-finite magnitude", self.id)
                    ));
                }
            }
            LoadKind::MemberPoint { member_id, magnitude, position, .. } => {
                self.require_member(model, member_id)?;
                if !magnitude.is_finite() {
                    return Err(FrameCalcError::InvalidInput(
                        format!("load {} has non-finite magnitude", self.id)
                    ));
                }
                if !(0.0..=1.0).contains(position) {
                    return Err(FrameCalcError::InvalidInput(
                        format!("load {} has position {} outside [0, 1]", self.id, position)
                    ));
                }
            }
            LoadKind::MemberDistributed { member_id, w_start, w_end, .. } => {
                self.require_member(model, member_id)?;
                if !w_start.is_finite() || !w_end.is_finite() {
                    return Err(FrameCalcError::InvalidInput(
                        format!("load {} has non-finite intensity", self.id)
                    ));
                }
            }
        }
        Ok(())
    }

    fn require_member(&self, model: &Model, member_id: &str) -> Result<()> {
        if !model.members.iter().any(|m| m.id == member_id) {
            return Err(FrameCalcError::TopologyError(
                format!("load {} references unknown member {}", self.id, member_id)
            ));
        }
        Ok(())
    }
}

/// Direction of a member-local load, in the member's local axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoadDirection {
    LocalY,
    LocalZ,
    Axial,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LoadKind {
    /// A concentrated force or moment applied directly at a node's DOF.
    Nodal {
        node_id: String,
        dof: Dof,
        magnitude: f64,
    },
    /// A concentrated transverse or axial force at a fractional position
    /// along a member (0 = start node, 1 = end node).
    MemberPoint {
        member_id: String,
        direction: LoadDirection,
        magnitude: f64,
        position: f64,
    },
    /// A linearly varying distributed load along the full member length.
    MemberDistributed {
        member_id: String,
        direction: LoadDirection,
        w_start: f64,
        w_end: f64,
    },
}
