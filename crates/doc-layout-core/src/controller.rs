//! Controller (§4.L): orchestrates the cascade resolver, layout engine, header/footer pass,
//! anchor index, selection, presence, and session state behind a single public API.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::anchors::AnchorIndex;
use crate::error::{ControllerError, HealthState, LayoutError, LayoutStage, PositionError, ValidationError};
use crate::header_footer::{select_variant, HeaderFooterConstraints};
use crate::hit_test::{get_range_rects, PositionedRect, ViewportTransform};
use crate::input_bridge::{EventOrigin, ForwardTarget, InputBridge, InputEventKind, KeyDescriptor};
use crate::layout::{incremental_layout, LayoutOptions};
use crate::model::{
    BlockId, DocumentModel, FlowBlock, FlowBlockKind, HeaderFooterVariant, Layout, Measure, Painter, Pos,
    SectionBreak, ToFlowBlocksOptions,
};
use crate::presence::PresenceMirror;
use crate::selection::{MultiClickThresholds, SelectionMachine};
use crate::session::{DocumentMode, Session};

/// Vertical/book/horizontal page flow (§6 `setLayoutMode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LayoutMode {
    /// Pages flow top-to-bottom.
    Vertical,
    /// Pages are paired as a spread.
    Book,
    /// Pages flow left-to-right.
    Horizontal,
}

/// Tracked-changes display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackedChangesMode {
    /// Show insertions/deletions inline with markup.
    Review,
    /// Show a simplified single-color markup.
    Simple,
    /// Show the document as it was before changes.
    Original,
    /// Show the document as it will be after changes are accepted.
    Final,
}

/// Tracked-changes override state (§6 `setDocumentMode`'s companion setter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedChangesOverride {
    /// Display mode.
    pub mode: TrackedChangesMode,
    /// Whether tracked-changes recording is enabled for new edits.
    pub enabled: bool,
}

impl Default for TrackedChangesOverride {
    fn default() -> Self {
        Self {
            mode: TrackedChangesMode::Review,
            enabled: false,
        }
    }
}

/// Controller configuration: a plain serde-derived struct with a `Default` impl matching
/// the documented defaults for each field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControllerOptions {
    /// Zoom factor; must stay positive and finite.
    pub zoom: f64,
    /// Page flow direction.
    pub layout_mode: LayoutMode,
    /// Editing/viewing/suggesting.
    pub document_mode: DocumentMode,
    /// Multi-click depth thresholds.
    pub multi_click: MultiClickThresholds,
    /// Whether re-layout requests coalesce onto a single RAF-modeled tick.
    pub raf_coalescing: bool,
    /// Max remote cursors rendered per presence pass.
    pub presence_visibility_cap: usize,
    /// Remote cursor staleness prune timeout, in milliseconds.
    pub presence_stale_timeout_ms: u64,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            layout_mode: LayoutMode::Vertical,
            document_mode: DocumentMode::Editing,
            multi_click: MultiClickThresholds::default(),
            raf_coalescing: true,
            presence_visibility_cap: crate::presence::DEFAULT_VISIBILITY_CAP,
            presence_stale_timeout_ms: crate::presence::DEFAULT_STALE_TIMEOUT_MS,
        }
    }
}

/// One structured telemetry event (§4.L, §10.4: emitted through `tracing` with this struct
/// as a thin adapter for hosts that want the `{type, data}` stream literally).
#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    /// A completed re-layout pass.
    Layout {
        /// Wall-clock duration, in milliseconds.
        duration_ms: u64,
        /// Number of flow blocks processed.
        block_count: usize,
        /// Number of pages produced.
        page_count: usize,
    },
    /// A render/layout error.
    Error {
        /// The stage that failed.
        stage: LayoutStage,
        /// Human-readable message.
        message: String,
    },
    /// A remote-cursor re-render pass.
    RemoteCursorsRender {
        /// Total known collaborators.
        collaborator_count: usize,
        /// Collaborators actually rendered (after the visibility cap).
        visible_count: usize,
        /// Wall-clock duration, in milliseconds.
        render_time_ms: u64,
    },
}

/// A host-supplied sink for [`TelemetryEvent`]s. The CORE also always logs via `tracing`
/// regardless of whether a sink is installed.
pub trait TelemetrySink {
    /// Receive one telemetry event.
    fn emit(&self, event: TelemetryEvent);
}

/// Validate and parse a zoom value (§7 "zoom must be a positive finite number").
pub fn validate_zoom(zoom: f64) -> Result<f64, ValidationError> {
    if zoom.is_finite() && zoom > 0.0 {
        Ok(zoom)
    } else {
        Err(ValidationError::InvalidZoom(zoom.to_string()))
    }
}

/// A forwarding target that drops composition-flush notifications. The default type
/// parameter for [`Controller`], for hosts that don't wire up input forwarding at all.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NoopForwardTarget;

impl ForwardTarget for NoopForwardTarget {
    fn flush_composition(&mut self) {}
}

/// The header/footer geometry and variant resolved for one physical page, produced by
/// `relayout`'s header/footer pass and consumed by a host's decoration provider (a
/// function that supplies, per page, the header/footer fragments and geometry to render).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDecoration {
    /// Which variant (default/first/even/odd) applies to this page.
    pub variant: HeaderFooterVariant,
    /// The geometry constraints header/footer content must lay out within.
    pub constraints: HeaderFooterConstraints,
}

/// Resolve the header/footer variant and geometry for every page in a fresh layout (§4.D),
/// keyed both by variant (for single-section documents) and by physical page number (for
/// documents with multiple sections, where two pages can share a variant but not geometry).
fn resolve_page_decorations(
    layout: &Layout,
    sections: &[SectionBreak],
) -> (HashMap<HeaderFooterVariant, HeaderFooterConstraints>, HashMap<usize, PageDecoration>) {
    let mut first_page_of_section: HashMap<usize, usize> = HashMap::new();
    for page in &layout.pages {
        first_page_of_section.entry(page.section_index).or_insert(page.number);
    }

    let mut header_footer_results = HashMap::new();
    let mut decorations = HashMap::new();

    for page in &layout.pages {
        let section = sections.get(page.section_index);
        let title_pg = section.map(|s| s.title_pg).unwrap_or(false);
        let alternate_headers = section.map(|s| s.alternate_headers).unwrap_or(false);
        let first_physical_page = first_page_of_section.get(&page.section_index).copied().unwrap_or(0);

        let variant = select_variant(page.number, first_physical_page, title_pg, alternate_headers);
        let constraints = HeaderFooterConstraints::from_section(page.size, page.margins);

        header_footer_results.insert(variant, constraints);
        decorations.insert(page.number, PageDecoration { variant, constraints });
    }

    (header_footer_results, decorations)
}

/// The controller's full mutable state: layout results, section metadata, session,
/// selection, presence, and scheduling bookkeeping (§4.L).
pub struct Controller<P: Painter, T: ForwardTarget = NoopForwardTarget> {
    options: ControllerOptions,
    tracked_changes: TrackedChangesOverride,
    painter: P,
    telemetry: Option<Box<dyn TelemetrySink>>,

    blocks: Vec<FlowBlock>,
    measures: HashMap<BlockId, Measure>,
    layout: Option<Layout>,
    bookmarks: Vec<(String, Pos)>,
    anchor_index: AnchorIndex,

    sections: Vec<SectionBreak>,
    active_section_index: usize,
    header_footer_results: HashMap<HeaderFooterVariant, HeaderFooterConstraints>,
    decorations: HashMap<usize, PageDecoration>,
    input_bridge: InputBridge<T>,

    health: HealthState,
    last_error: Option<LayoutError>,

    pending: bool,
    inflight: bool,
    version: u64,

    session: Session,
    selection: SelectionMachine,
    presence: PresenceMirror,
}

impl<P: Painter> Controller<P, NoopForwardTarget> {
    /// Construct a new controller (§6 `new(options)`). Construction itself cannot fail in
    /// this headless crate (no DOM/network setup); initialization errors are a host-level
    /// concern in the real system.
    ///
    /// Defaults the input bridge's forwarding target to [`NoopForwardTarget`]; hosts that
    /// need real event forwarding should use [`Controller::with_forward_target`] instead.
    pub fn new(options: ControllerOptions, painter: P) -> Self {
        Self::with_forward_target(options, painter)
    }
}

impl<P: Painter, T: ForwardTarget> Controller<P, T> {
    /// Construct a new controller with an explicit input-bridge forwarding target type.
    pub fn with_forward_target(options: ControllerOptions, painter: P) -> Self {
        Self {
            selection: SelectionMachine::with_thresholds(options.multi_click),
            presence: PresenceMirror::with_limits(options.presence_visibility_cap, options.presence_stale_timeout_ms),
            options,
            tracked_changes: TrackedChangesOverride::default(),
            painter,
            telemetry: None,
            blocks: Vec::new(),
            measures: HashMap::new(),
            layout: None,
            bookmarks: Vec::new(),
            anchor_index: AnchorIndex::build(
                &Layout { pages: Vec::new(), page_size: crate::model::PageSize { width: 0, height: 0 }, page_gap: 0.0 },
                &[],
            ),
            sections: Vec::new(),
            active_section_index: 0,
            header_footer_results: HashMap::new(),
            decorations: HashMap::new(),
            input_bridge: InputBridge::new(),
            health: HealthState::Healthy,
            last_error: None,
            pending: false,
            inflight: false,
            version: 0,
            session: Session::Body,
        }
    }

    /// Install a telemetry sink.
    pub fn set_telemetry_sink(&mut self, sink: Box<dyn TelemetrySink>) {
        self.telemetry = Some(sink);
    }

    fn emit(&self, event: TelemetryEvent) {
        if let Some(sink) = &self.telemetry {
            sink.emit(event);
        }
    }

    /// `setZoom` (§6): rejects invalid input with a typed error, otherwise updates state.
    pub fn set_zoom(&mut self, zoom: f64) -> Result<(), ControllerError> {
        self.options.zoom = validate_zoom(zoom)?;
        Ok(())
    }

    /// `setLayoutMode` (§6).
    pub fn set_layout_mode(&mut self, mode: LayoutMode) {
        self.options.layout_mode = mode;
        self.schedule_rerender();
    }

    /// `setDocumentMode` (§6).
    pub fn set_document_mode(&mut self, mode: DocumentMode) {
        self.options.document_mode = mode;
    }

    /// Tracked-changes override setter (§6).
    pub fn set_tracked_changes(&mut self, overrides: TrackedChangesOverride) {
        self.tracked_changes = overrides;
        self.schedule_rerender();
    }

    /// Current options snapshot (`getLayoutOptions`).
    pub fn options(&self) -> &ControllerOptions {
        &self.options
    }

    /// `getLayoutError`.
    pub fn layout_error(&self) -> Option<&LayoutError> {
        self.last_error.as_ref()
    }

    /// `getLayoutHealthState`.
    pub fn health_state(&self) -> HealthState {
        self.health
    }

    /// `getPages`.
    pub fn pages(&self) -> &[crate::model::Page] {
        self.layout.as_ref().map(|l| l.pages.as_slice()).unwrap_or(&[])
    }

    /// `getLayoutSnapshot`.
    pub fn layout_snapshot(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    /// Request a re-layout pass. Coalesces: if a pass is already in flight, the request is
    /// recorded as `pending` and serviced by the next `pump()` once the in-flight pass
    /// finishes (§4.L scheduling, §5's "two back-to-back document changes coalesce").
    pub fn schedule_rerender(&mut self) {
        self.pending = true;
    }

    /// Whether a re-layout is currently queued (for host RAF scheduling decisions).
    pub fn has_pending_rerender(&self) -> bool {
        self.pending && !self.inflight
    }

    /// Drive one scheduling step: if a re-layout is pending and none is in flight, run it.
    /// Hosts call this from their own RAF/microtask callback (§5's runtime-agnostic model).
    #[tracing::instrument(skip_all, fields(version = self.version))]
    pub fn pump(
        &mut self,
        document: &dyn DocumentModel,
        now_ms: u64,
    ) -> Result<(), ControllerError> {
        if !self.pending || self.inflight {
            return Ok(());
        }

        self.pending = false;
        self.inflight = true;
        let result = self.relayout(document, now_ms);
        self.inflight = false;

        // A change that arrived during the in-flight pass is already reflected in
        // `pending` (schedule_rerender can be called reentrantly by setters); nothing
        // further to do here beyond surfacing the result.
        result
    }

    /// The re-layout procedure (§4.L steps 1-9).
    #[tracing::instrument(skip_all)]
    fn relayout(&mut self, document: &dyn DocumentModel, now_ms: u64) -> Result<(), ControllerError> {
        let start = now_ms;
        self.version += 1;

        let options = ToFlowBlocksOptions {
            show_tracked_changes: matches!(self.tracked_changes.mode, TrackedChangesMode::Review | TrackedChangesMode::Simple),
        };

        let (new_blocks, bookmarks) = match document.to_flow_blocks(&options) {
            Ok(result) => result,
            Err(err) => {
                self.record_render_error(err.clone());
                return Err(ControllerError::Layout(err));
            }
        };

        let sections: Vec<SectionBreak> = new_blocks
            .iter()
            .filter_map(|b| match &b.kind {
                FlowBlockKind::SectionBreak(section) => Some(section.clone()),
                _ => None,
            })
            .collect();

        let layout_opts = match sections.first() {
            Some(first) => LayoutOptions {
                page_size: first.page_size,
                margins: first.margins,
                ..LayoutOptions::default()
            },
            None => LayoutOptions::default(),
        };

        let measure_fn = |block: &FlowBlock, max_width: f64, default_line_height: f64| match &block.kind {
            FlowBlockKind::Paragraph(p) => Some(crate::layout::default_measure_fn(p, max_width, default_line_height)),
            FlowBlockKind::Table(t) => Some(crate::layout::default_table_measure_fn(t, max_width, default_line_height)),
            FlowBlockKind::Image(img) => Some(Measure::Image(*img)),
            FlowBlockKind::Drawing(d) => Some(Measure::Drawing(*d)),
            FlowBlockKind::SectionBreak(_) => None,
        };

        let (layout, measures) =
            match incremental_layout(&self.blocks, &self.measures, &new_blocks, &layout_opts, measure_fn) {
                Ok(result) => result,
                Err(err) => {
                    self.record_render_error(err.clone());
                    return Err(ControllerError::Layout(err));
                }
            };

        self.anchor_index = AnchorIndex::build(&layout, &bookmarks);
        self.bookmarks = bookmarks;
        self.blocks = new_blocks;
        let block_count = self.blocks.len();
        let page_count = layout.pages.len();

        self.painter.paint(&layout, &self.blocks, &measures);

        let (header_footer_results, decorations) = resolve_page_decorations(&layout, &sections);
        self.header_footer_results = header_footer_results;
        self.decorations = decorations;
        self.active_section_index = layout.pages.last().map(|p| p.section_index).unwrap_or(0);
        self.sections = sections;

        self.measures = measures;
        self.layout = Some(layout);

        self.health = HealthState::Healthy;
        self.last_error = None;

        let duration_ms = now_ms.saturating_sub(start).max(1);
        tracing::info!(duration_ms, block_count, page_count, "layout pass complete");
        self.emit(TelemetryEvent::Layout { duration_ms, block_count, page_count });

        Ok(())
    }

    fn record_render_error(&mut self, err: LayoutError) {
        self.health = if self.layout.is_some() { HealthState::Degraded } else { HealthState::Failed };
        tracing::warn!(stage = %err.stage, message = %err.message, "layout pass failed");
        self.emit(TelemetryEvent::Error { stage: err.stage, message: err.message.clone() });
        self.last_error = Some(err);
    }

    /// Clear the current error and reschedule a re-layout (§7's "reload layout" banner
    /// action).
    pub fn reload_layout(&mut self) {
        self.last_error = None;
        self.schedule_rerender();
    }

    /// `getRangeRects`.
    pub fn range_rects(&self, from: Pos, to: Pos, transform: &ViewportTransform) -> Vec<PositionedRect> {
        match &self.layout {
            Some(layout) => get_range_rects(layout, &self.measures, from, to, transform),
            None => Vec::new(),
        }
    }

    /// Section metadata for the document's current layout pass (§4.L state), in document
    /// order.
    pub fn sections(&self) -> &[SectionBreak] {
        &self.sections
    }

    /// The section the document's last page belongs to.
    pub fn active_section_index(&self) -> usize {
        self.active_section_index
    }

    /// The decoration (header/footer variant + geometry) resolved for a physical page, if
    /// the page exists in the current layout.
    pub fn page_decoration(&self, page_number: usize) -> Option<&PageDecoration> {
        self.decorations.get(&page_number)
    }

    /// Header/footer geometry constraints by variant, for single-section documents or
    /// hosts that don't need per-page precision.
    pub fn header_footer_results(&self) -> &HashMap<HeaderFooterVariant, HeaderFooterConstraints> {
        &self.header_footer_results
    }

    /// `goToAnchor`: resolve a bookmark name to a page number (§6, ≤2s in the real system;
    /// here resolution is synchronous since there's no DOM scroll to await).
    pub fn go_to_anchor(&self, name: &str) -> Result<usize, PositionError> {
        self.anchor_index.page_for(name).ok_or_else(|| PositionError::UnknownAnchor(name.to_string()))
    }

    /// Current session (body, or an active header/footer context).
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Selection machine, mutably, for pointer event handling.
    pub fn selection_mut(&mut self) -> &mut SelectionMachine {
        &mut self.selection
    }

    /// Presence mirror, mutably, for awareness normalization/throttled rendering.
    pub fn presence_mut(&mut self) -> &mut PresenceMirror {
        &mut self.presence
    }

    /// Enter a header/footer session, updating internal session state and retargeting the
    /// input bridge to the embedded region's forwarding target (§4.J step 5).
    pub fn enter_header_footer_session(&mut self, entry: crate::session::SessionEntry, target: T) {
        self.session = entry.session;
        self.input_bridge.retarget(target);
    }

    /// Exit the current header/footer session back to `Body`, clearing the input bridge's
    /// active target (flushing any in-progress composition first).
    pub fn exit_header_footer_session(&mut self) -> Result<(), ControllerError> {
        self.session = crate::session::exit(&self.session).map_err(ControllerError::Session)?;
        self.input_bridge.clear();
        self.schedule_rerender();
        Ok(())
    }

    /// The input bridge's currently active forwarding target, if a header/footer session is
    /// active.
    pub fn input_target(&self) -> Option<&T> {
        self.input_bridge.active()
    }

    /// Whether an observed input event should be forwarded to the active target, given the
    /// controller's current document mode (§4.K).
    pub fn should_forward_input(
        &self,
        kind: InputEventKind,
        origin: EventOrigin,
        key: Option<KeyDescriptor>,
    ) -> bool {
        crate::input_bridge::should_forward(kind, origin, self.options.document_mode, key)
    }
}

/// A no-op painter, used by tests and headless embedders that only need layout geometry
/// (§6: "the CORE ships a NullPainter... used by the integration tests").
#[derive(Debug, Default)]
pub struct NullPainter;

impl Painter for NullPainter {
    fn paint(&mut self, _layout: &Layout, _blocks: &[FlowBlock], _measures: &HashMap<BlockId, Measure>) {}
}

/// An in-memory document model for tests (`#[cfg(test)]`-only per §6).
#[cfg(test)]
pub struct TestDocumentModel {
    pub blocks: Vec<FlowBlock>,
    pub bookmarks: Vec<(String, Pos)>,
    pub doc_size: Pos,
}

#[cfg(test)]
impl DocumentModel for TestDocumentModel {
    fn to_flow_blocks(&self, _options: &ToFlowBlocksOptions) -> Result<(Vec<FlowBlock>, Vec<(String, Pos)>), LayoutError> {
        Ok((self.blocks.clone(), self.bookmarks.clone()))
    }

    fn doc_size(&self) -> Pos {
        self.doc_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Alignment, FlowBlockKind, Paragraph, ParagraphProperties, Run, RunProperties};

    fn paragraph_block(id: BlockId, text: &str) -> FlowBlock {
        FlowBlock {
            id,
            kind: FlowBlockKind::Paragraph(Paragraph {
                properties: ParagraphProperties { alignment: Some(Alignment::Left), ..Default::default() },
                runs: vec![Run {
                    text: text.to_string(),
                    properties: RunProperties::default(),
                    pm_range: Some(0..text.chars().count()),
                }],
            }),
        }
    }

    #[test]
    fn zoom_validation_rejects_non_positive_and_non_finite() {
        assert!(validate_zoom(1.5).is_ok());
        assert!(validate_zoom(0.0).is_err());
        assert!(validate_zoom(-1.0).is_err());
        assert!(validate_zoom(f64::NAN).is_err());
        assert!(validate_zoom(f64::INFINITY).is_err());
    }

    #[test]
    fn pump_runs_pending_relayout_and_clears_pending() {
        let mut controller = Controller::new(ControllerOptions::default(), NullPainter);
        let doc = TestDocumentModel {
            blocks: vec![paragraph_block(1, "hello world")],
            bookmarks: vec![],
            doc_size: 11,
        };

        controller.schedule_rerender();
        assert!(controller.has_pending_rerender());

        controller.pump(&doc, 0).unwrap();
        assert!(!controller.has_pending_rerender());
        assert_eq!(controller.pages().len(), 1);
        assert_eq!(controller.health_state(), HealthState::Healthy);
    }

    #[test]
    fn pump_is_noop_without_pending_request() {
        let mut controller = Controller::new(ControllerOptions::default(), NullPainter);
        let doc = TestDocumentModel { blocks: vec![], bookmarks: vec![], doc_size: 0 };
        controller.pump(&doc, 0).unwrap();
        assert!(controller.layout_snapshot().is_none());
    }

    #[test]
    fn go_to_anchor_resolves_after_layout() {
        let mut controller = Controller::new(ControllerOptions::default(), NullPainter);
        let doc = TestDocumentModel {
            blocks: vec![paragraph_block(1, "hello world")],
            bookmarks: vec![("intro".to_string(), 2)],
            doc_size: 11,
        };
        controller.schedule_rerender();
        controller.pump(&doc, 0).unwrap();

        assert_eq!(controller.go_to_anchor("intro"), Ok(0));
        assert_eq!(controller.go_to_anchor("missing"), Err(PositionError::UnknownAnchor("missing".to_string())));
    }

    #[test]
    fn reload_layout_clears_error_and_reschedules() {
        let mut controller = Controller::new(ControllerOptions::default(), NullPainter);
        controller.record_render_error(LayoutError::new(LayoutStage::ToFlowBlocks, "boom"));
        assert!(controller.layout_error().is_some());

        controller.reload_layout();
        assert!(controller.layout_error().is_none());
        assert!(controller.has_pending_rerender());
    }
}
