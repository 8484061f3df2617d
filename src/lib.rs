//! # framecalc
//!
//! A 3D frame finite-element solver: sparse stiffness assembly, direct
//! (skyline Cholesky) and iterative (Jacobi-preconditioned conjugate
//! gradient) solves, and per-member force and deflection diagrams.
//!
//! ## Example
//!
//! ```rust
//! use framecalc::prelude::*;
//!
//! let mut model = Model::new();
//! model.add_node(Node::new("a", 0.0, 0.0, 0.0)).unwrap();
//! model.add_node(Node::new("b", 2.0, 0.0, 0.0)).unwrap();
//! model.add_member(Member::new("m1", "a", "b", 200e9, 80e9, 0.01, 8e-6, 8e-6, 1.5e-6)).unwrap();
//! model.set_support("a", Support::fixed());
//! model.add_load(Load::nodal("p1", "b", Dof::Uy, -1000.0));
//!
//! let result = Analysis::new(model).run();
//! ```

pub mod analysis;
pub mod core;
pub mod elements;
pub mod error;
pub mod ingest;
pub mod loads;
pub mod postprocess;
pub mod prelude;
pub mod progress;
pub mod solvers;
pub mod sparse_assembly;

pub use error::{FrameCalcError, Result};
pub use core::*;

pub use nalgebra as na;
