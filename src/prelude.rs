//! Prelude module for convenient imports

pub use crate::analysis::{Analysis, FrameResult};
pub use crate::core::*;
pub use crate::elements;
pub use crate::error::{FrameCalcError, Result};
pub use crate::ingest;
pub use crate::loads::*;
pub use crate::postprocess::{MemberDiagram, PostprocessReport, Station};
pub use crate::progress::{EventSink, LogSink, VecSink};
pub use crate::solvers;
pub use nalgebra as na;
