//! Error taxonomy (§7). One enum per failure bucket, united under [`ControllerError`].
//!
//! Fail-soft operations (cascade, resolver, hit-test retries) return `Option`/plain
//! defaults rather than these types; these are for operations that raise typed rejections
//! at the controller boundary.

use thiserror::Error;

/// Input validation failures from setters on the public controller API.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `setZoom` received a non-positive or non-finite value.
    #[error("zoom must be a positive finite number, got {0}")]
    InvalidZoom(String),
    /// An unrecognized layout mode string.
    #[error("invalid layout mode: {0}")]
    InvalidLayoutMode(String),
    /// An unrecognized document mode string.
    #[error("invalid document mode: {0}")]
    InvalidDocumentMode(String),
    /// An unrecognized tracked-changes mode string.
    #[error("invalid tracked-changes mode: {0}")]
    InvalidTrackedChangesMode(String),
}

/// The pipeline stage a [`LayoutError`] originated in (§7's "source stage is recorded").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutStage {
    /// Snapshotting the document as JSON.
    GetJson,
    /// Converting the snapshot to flow blocks.
    ToFlowBlocks,
    /// The incremental layout/pack pass.
    IncrementalLayout,
    /// Handing the result to the painter.
    PainterHandoff,
}

impl std::fmt::Display for LayoutStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LayoutStage::GetJson => "getJSON",
            LayoutStage::ToFlowBlocks => "toFlowBlocks",
            LayoutStage::IncrementalLayout => "incrementalLayout",
            LayoutStage::PainterHandoff => "painterHandoff",
        };
        f.write_str(s)
    }
}

/// Errors raised during re-layout (§4.L, §7 "Render errors").
///
/// These are recoverable: the controller keeps the last-good layout and marks itself
/// `degraded` rather than propagating the error past its boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("layout failed at stage {stage}: {message}")]
pub struct LayoutError {
    /// Which stage failed.
    pub stage: LayoutStage,
    /// A human-readable description.
    pub message: String,
}

impl LayoutError {
    /// Construct a layout error at a given stage.
    pub fn new(stage: LayoutStage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

/// Errors from selection/coordinate mapping on edge positions (§7 "Position errors").
///
/// Most position-mapping code paths retry at `pos-1`/`pos+1` before surfacing this; it is
/// the terminal "all fallbacks exhausted" case.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PositionError {
    /// The position is outside `[0, docSize]`.
    #[error("position {pos} is out of bounds (doc size {doc_size})")]
    OutOfBounds {
        /// The offending position.
        pos: usize,
        /// The document's size.
        doc_size: usize,
    },
    /// No fragment could be found at the position, even after the ±1 retry.
    #[error("no fragment found at or near position {0}")]
    NoFragmentAt(usize),
    /// The requested anchor name has no entry in the current layout's anchor map.
    #[error("unknown anchor: {0}")]
    UnknownAnchor(String),
}

/// Header/footer session entry/exit failures (§7 "Permission/session errors", §4.J).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The document mode is `viewing`, or the main target isn't editable.
    #[error("header/footer editing is not permitted in the current mode")]
    PermissionDenied,
    /// The region's containing page did not mount within the timeout.
    #[error("timed out waiting for the target page to mount")]
    MountTimeout,
    /// Attempted to enter a session while one was already active.
    #[error("a header/footer session is already active")]
    AlreadyActive,
    /// Attempted to exit while no session was active.
    #[error("no header/footer session is active")]
    NotActive,
}

/// The union of all error buckets, as seen at the controller boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// Input validation failure.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Re-layout failure.
    #[error(transparent)]
    Layout(#[from] LayoutError),
    /// Position-mapping failure.
    #[error(transparent)]
    Position(#[from] PositionError),
    /// Session entry/exit failure.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// The controller's coarse-grained health state, derived from recent errors (§7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// No unresolved errors.
    Healthy,
    /// A render error occurred but a previous good layout exists.
    Degraded,
    /// Construction failed, or a render error occurred with no previous good layout.
    Failed,
}
