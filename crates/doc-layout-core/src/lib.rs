#![warn(missing_docs)]
//! doc-layout-core - a headless document layout engine
//!
//! # Overview
//!
//! `doc-layout-core` resolves OOXML-shaped style cascades, paginates flow content
//! incrementally, and converts between document positions and page geometry for a
//! word-processor-style document editor. It does not own the document model, does not
//! render to a DOM, and does not implement text editing itself — those are host
//! responsibilities, modeled here as the [`model::DocumentModel`], [`model::Painter`], and
//! [`model::CollaborationTransport`] traits.
//!
//! # Core Features
//!
//! - **Style Cascade Resolver**: `docDefaults`/named-style/`basedOn` chains, numbering, and
//!   theme-font substitution, merged by first-writer-wins precedence.
//! - **Incremental Layout Engine**: diffs flow blocks against a previous pass and reuses
//!   measures for structurally unchanged blocks, packing the rest into pages.
//! - **Header/Footer Layout**: a secondary pass keyed by section variant
//!   (default/first/even/odd) with digit-bucket fallback for large documents.
//! - **Anchor Index**: bookmark name to page number, built on an interval tree over
//!   fragment position ranges (O(log n + k) queries).
//! - **Hit Testing & Geometry**: viewport <-> layout coordinate conversion, word/paragraph
//!   boundary expansion, table cell resolution.
//! - **Selection, Overlay, Presence**: the pointer-driven selection state machine, caret/
//!   selection overlay geometry, and a throttled remote-cursor presence mirror.
//! - **Header/Footer Session & Input Bridge**: the embedded editing-context state machine
//!   and the event-forwarding rules that keep body and header/footer editing from crossing
//!   wires.
//! - **Controller**: orchestrates all of the above behind a single scheduling/error-state
//!   boundary, runtime-agnostic (no async runtime dependency) so hosts drive it from their
//!   own event loop via `pump()`.
//!
//! # Architecture Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  Controller                                  │  ← Public API, scheduling, errors
//! ├─────────────────────────────────────────────┤
//! │  Session · Selection · Overlay · Presence   │  ← Interaction & collaboration state
//! ├─────────────────────────────────────────────┤
//! │  Hit Test & Geometry · Anchor Index          │  ← Coordinate/position mapping
//! ├─────────────────────────────────────────────┤
//! │  Header/Footer Layout                        │  ← Secondary layout pass
//! ├─────────────────────────────────────────────┤
//! │  Incremental Layout Engine                   │  ← Pagination
//! ├─────────────────────────────────────────────┤
//! │  Style Cascade Resolver                      │  ← Effective property resolution
//! ├─────────────────────────────────────────────┤
//! │  Data Model (FlowBlock, Measure, Fragment)   │  ← Plain data + host traits
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use doc_layout_core::controller::{Controller, ControllerOptions, NullPainter};
//!
//! let mut controller = Controller::new(ControllerOptions::default(), NullPainter);
//! controller.schedule_rerender();
//! // `document` is anything implementing `DocumentModel`; hosts own the real document state
//! // and call `controller.pump(&document, now_ms)` from their own event loop.
//! ```
//!
//! # Module Description
//!
//! - [`model`] - flow blocks, measures, fragments, pages, and host traits
//! - [`error`] - the error taxonomy (§7)
//! - [`cascade`] - property-chain merge primitives
//! - [`style_resolver`] - style/numbering/theme-font resolution
//! - [`intervals`] - the generic interval tree used by the anchor index
//! - [`layout`] - the incremental pagination engine
//! - [`header_footer`] - header/footer variant selection and layout
//! - [`anchors`] - the bookmark-to-page index
//! - [`hit_test`] - coordinate conversion and boundary expansion
//! - [`selection`] - the pointer-driven selection state machine
//! - [`overlay`] - caret and selection overlay geometry
//! - [`presence`] - the remote-cursor presence mirror
//! - [`session`] - the header/footer editing session machine
//! - [`input_bridge`] - input event forwarding rules
//! - [`controller`] - the orchestrating public API

pub mod anchors;
pub mod cascade;
pub mod controller;
pub mod error;
pub mod header_footer;
pub mod input_bridge;
pub mod intervals;
pub mod layout;
pub mod model;
pub mod overlay;
pub mod presence;
pub mod selection;
pub mod session;
pub mod style_resolver;

pub use controller::{
    Controller, ControllerOptions, LayoutMode, NoopForwardTarget, NullPainter, PageDecoration, TelemetryEvent,
    TelemetrySink, TrackedChangesMode, TrackedChangesOverride,
};
pub use error::{ControllerError, HealthState, LayoutError, LayoutStage, PositionError, SessionError, ValidationError};
pub use input_bridge::{ForwardTarget, InputBridge};
pub use model::{DocumentModel, Painter, CollaborationTransport};
pub use session::{DocumentMode, Session};

#[cfg(test)]
pub use controller::TestDocumentModel;
