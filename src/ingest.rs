//! Model ingest: JSON/YAML parsing, unit conversion, and topology
//! validation, all performed before a model ever reaches assembly.

use crate::core::Model;
use crate::error::{FrameCalcError, Result, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The unit system a model file was authored in. `Si` is the default and
/// is used internally everywhere past this module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Si,
    /// E and G in MPa, cross-sectional area in mm^2, second moments of
    /// area and torsional constant in mm^4. Node coordinates are always
    /// read as meters regardless of this tag.
    Engineering,
}

#[derive(Debug, Deserialize)]
struct WireModel {
    #[serde(default)]
    units: UnitSystem,
    #[serde(flatten)]
    model: Model,
}

fn to_si(model: &mut Model, units: UnitSystem) {
    if units == UnitSystem::Si {
        return;
    }
    for member in &mut model.members {
        member.e *= 1.0e6;
        member.g *= 1.0e6;
        member.a *= 1.0e-6;
        member.iy *= 1.0e-12;
        member.iz *= 1.0e-12;
        member.j *= 1.0e-12;
    }
}

fn finalize(mut model: Model, units: UnitSystem) -> Result<Model> {
    to_si(&mut model, units);
    model.reindex();
    model.validate()?;
    Ok(model)
}

pub fn model_from_json(text: &str) -> Result<Model> {
    let wire: WireModel = serde_json::from_str(text)?;
    finalize(wire.model, wire.units)
}

pub fn model_from_yaml(text: &str) -> Result<Model> {
    let wire: WireModel = serde_yaml::from_str(text)?;
    finalize(wire.model, wire.units)
}

/// Load a model from disk, dispatching on file extension (`.json`, `.yaml`,
/// or `.yml`).
pub fn model_from_path(path: impl AsRef<Path>) -> Result<Model> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => model_from_yaml(&text),
        Some("json") | _ => model_from_json(&text),
    }
}
