//! Staged progress reporting, decoupled from any particular transport so a
//! CLI run can log to stderr while a future caller could collect the same
//! records into a channel or buffer.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Ingest,
    Assemble,
    Solve,
    Postprocess,
    Done,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Ingest => "ingest",
            Stage::Assemble => "assemble",
            Stage::Solve => "solve",
            Stage::Postprocess => "postprocess",
            Stage::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub stage: Stage,
    pub percent: u8,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub error_kind: String,
    pub detail: String,
}

/// Receives progress and error records emitted during a solve pipeline.
pub trait EventSink {
    fn emit(&mut self, record: ProgressRecord);
    fn emit_error(&mut self, record: ErrorRecord);
}

/// Forwards every record to the `log` crate at info/error level.
#[derive(Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&mut self, record: ProgressRecord) {
        log::info!("[{:>3}%] {}: {}", record.percent, record.stage.label(), record.message);
    }

    fn emit_error(&mut self, record: ErrorRecord) {
        log::error!("{}: {}", record.error_kind, record.detail);
    }
}

/// Collects records in memory, useful for tests and for embedding callers
/// that want to inspect the full run history after the fact.
#[derive(Default)]
pub struct VecSink {
    pub progress: Vec<ProgressRecord>,
    pub errors: Vec<ErrorRecord>,
}

impl EventSink for VecSink {
    fn emit(&mut self, record: ProgressRecord) {
        self.progress.push(record);
    }

    fn emit_error(&mut self, record: ErrorRecord) {
        self.errors.push(record);
    }
}

pub fn emit_stage(sink: &mut dyn EventSink, stage: Stage, percent: u8, message: impl Into<String>) {
    sink.emit(ProgressRecord { stage, percent, message: message.into() });
}

pub fn emit_error(sink: &mut dyn EventSink, error: &crate::error::FrameCalcError) {
    sink.emit_error(ErrorRecord {
        error_kind: error_kind_name(error),
        detail: error.to_string(),
    });
}

fn error_kind_name(error: &crate::error::FrameCalcError) -> String {
    use crate::error::FrameCalcError::*;
    match error {
        InvalidInput(_) => "invalid_input",
        TopologyError(_) => "topology_error",
        FullyConstrained => "fully_constrained",
        Instability(_) => "instability",
        NonConvergent { .. } => "non_convergent",
        PostprocessFailure { .. } => "postprocess_failure",
        IoError(_) => "io_error",
        JsonError(_) => "json_error",
        YamlError(_) => "yaml_error",
    }
    .to_string()
}
