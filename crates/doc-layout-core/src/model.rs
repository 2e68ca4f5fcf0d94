//! Core data model: flow blocks, measures, fragments, pages, and the host-implemented
//! traits (`DocumentModel`, `Painter`, `CollaborationTransport`) that stand in for the
//! external collaborators described as out of scope.

use std::collections::HashMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::LayoutError;

/// A stable identifier for a [`FlowBlock`], assigned by the adapter and preserved across
/// edits when the block has not structurally changed. The layout engine diffs on this id
/// to decide what can be reused from a previous layout pass.
pub type BlockId = u64;

/// An absolute position in the document state, as exposed by the document model
/// collaborator (an integer offset, not a line/column pair).
pub type Pos = usize;

/// A named style id (`w:styleId` in OOXML terms).
pub type StyleId = String;

/// A numbering definition id (`w:numId`).
pub type NumId = i64;

/// An abstract numbering id (`w:abstractNumId`).
pub type AbstractNumId = i64;

/// One inline character run inside a [`Paragraph`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// The run's text content.
    pub text: String,
    /// Effective or inline-declared run properties.
    pub properties: RunProperties,
    /// The run's position range in the document state, when known.
    pub pm_range: Option<Range<Pos>>,
}

/// Run-level (character) formatting properties, composed by the cascade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunProperties {
    /// Font family name (already resolved through theme substitution if applicable).
    pub font_family: Option<String>,
    /// Font size in half-points.
    pub font_size_half_points: Option<u32>,
    /// Bold.
    pub bold: Option<bool>,
    /// Italic.
    pub italic: Option<bool>,
    /// Underline.
    pub underline: Option<bool>,
    /// Strikethrough.
    pub strike: Option<bool>,
    /// Text color, `#RRGGBB`.
    pub color: Option<String>,
    /// Tracked-change id, when the run belongs to an insertion/deletion.
    pub tracked_change_id: Option<String>,
}

/// Paragraph indentation, composed field-by-field rather than wholesale
/// (`combineIndentProperties`, §4.A).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndentProperties {
    /// Left indent, twentieths of a point (twips).
    pub left: Option<i32>,
    /// Right indent, twips.
    pub right: Option<i32>,
    /// First-line indent, twips.
    pub first_line: Option<i32>,
    /// Hanging indent, twips.
    pub hanging: Option<i32>,
}

/// Paragraph alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    /// Left-aligned (or start, in LTR).
    Left,
    /// Centered.
    Center,
    /// Right-aligned (or end, in LTR).
    Right,
    /// Justified.
    Both,
}

/// Spacing before/after a paragraph, in twips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpacingProperties {
    /// Space before the paragraph.
    pub before: Option<i32>,
    /// Space after the paragraph.
    pub after: Option<i32>,
    /// Line spacing (twips, or a multiple depending on `line_rule`).
    pub line: Option<i32>,
}

/// A resolved or inline reference into the numbering registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberingProperties {
    /// The numbering definition id.
    pub num_id: Option<NumId>,
    /// The indentation level (0-based).
    pub ilvl: Option<u32>,
}

/// Effective paragraph-level formatting properties, composed by the cascade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParagraphProperties {
    /// Alignment.
    pub alignment: Option<Alignment>,
    /// Indentation.
    pub indent: IndentProperties,
    /// Spacing.
    pub spacing: SpacingProperties,
    /// Resolved style id this paragraph carries (may differ from the input styleId; see
    /// §4.B's `resolveParagraphProperties` numbering-adoption rule).
    pub style_id: Option<StyleId>,
    /// Numbering reference, if the paragraph is a list item.
    pub numbering: Option<NumberingProperties>,
}

/// A paragraph block: attributes plus an ordered run sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Effective paragraph properties.
    pub properties: ParagraphProperties,
    /// Ordered runs.
    pub runs: Vec<Run>,
}

impl Paragraph {
    /// The paragraph's PM range: the min start and max end across its runs, used when the
    /// paragraph itself carries no explicit range (§4.E fallback).
    pub fn pm_range(&self) -> Option<Range<Pos>> {
        let mut start = None;
        let mut end = None;
        for run in &self.runs {
            if let Some(r) = &run.pm_range {
                start = Some(start.map_or(r.start, |s: Pos| s.min(r.start)));
                end = Some(end.map_or(r.end, |e: Pos| e.max(r.end)));
            }
        }
        match (start, end) {
            (Some(s), Some(e)) => Some(s..e),
            _ => None,
        }
    }
}

/// A single table cell; may itself contain nested blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    /// Column span (>= 1).
    pub colspan: u32,
    /// Row span (>= 1).
    pub rowspan: u32,
    /// The cell's block content.
    pub blocks: Vec<FlowBlock>,
}

/// A table row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Cells in column order.
    pub cells: Vec<TableCell>,
}

/// A table block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Rows.
    pub rows: Vec<TableRow>,
    /// The style id applied to the table, consulted by `resolveParagraphProperties` for
    /// cells that don't specify their own paragraph style.
    pub style_id: Option<StyleId>,
}

/// Page margins, expressed in twips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    /// Top margin.
    pub top: i32,
    /// Right margin.
    pub right: i32,
    /// Bottom margin.
    pub bottom: i32,
    /// Left margin.
    pub left: i32,
    /// Header distance from the top edge.
    pub header: i32,
    /// Footer distance from the bottom edge.
    pub footer: i32,
}

/// Physical page dimensions, in twips.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

/// A section break: starts a new section with its own page geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionBreak {
    /// Page size for this section.
    pub page_size: PageSize,
    /// Margins for this section.
    pub margins: Margins,
    /// Column count (>= 1).
    pub columns: u32,
    /// Whether this is the document's first section.
    pub is_first_section: bool,
    /// Whether the first page of the section has a distinct title-page header/footer.
    pub title_pg: bool,
    /// Whether even/odd pages alternate headers/footers.
    pub alternate_headers: bool,
}

/// An inline image placement (bounding box only; no rendering fidelity, per Non-goals).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageBox {
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

/// A free-floating drawing anchor (bounding box only).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawingBox {
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

/// A top-level flow content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FlowBlockKind {
    /// A paragraph.
    Paragraph(Paragraph),
    /// A table.
    Table(Table),
    /// A section break.
    SectionBreak(SectionBreak),
    /// An inline image.
    Image(ImageBox),
    /// A floating drawing.
    Drawing(DrawingBox),
}

/// A flow block: a stable id plus its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowBlock {
    /// Stable id, preserved across edits when the block is structurally unchanged.
    pub id: BlockId,
    /// The block's content.
    pub kind: FlowBlockKind,
}

/// A single laid-out line inside a [`ParagraphMeasure`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    /// Line height, in layout units.
    pub line_height: f64,
    /// The line's position range within its paragraph's concatenated text.
    pub pm_range: Range<Pos>,
    /// Per-character x offsets within the line (same length as the line's character count).
    pub char_x: Vec<f64>,
    /// Total line width.
    pub width: f64,
}

/// The measured shape of a block, produced by `measureFn` under a `{max_width, max_height}`
/// constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Measure {
    /// A paragraph's wrapped lines, plus an optional list-marker width.
    Paragraph {
        /// Wrapped lines.
        lines: Vec<Line>,
        /// Numbering marker width, if the paragraph is a list item.
        marker_width: Option<f64>,
    },
    /// A table's row heights and column boundaries.
    Table {
        /// Per-row height.
        rows: Vec<f64>,
        /// Cumulative column boundaries (length = column count + 1).
        column_boundaries: Vec<f64>,
    },
    /// An image's placed box (identical to its declared size; no reflow).
    Image(ImageBox),
    /// A drawing's placed box.
    Drawing(DrawingBox),
}

/// A positioned slice of a block within a single page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Fragment {
    /// A slice of a paragraph's lines.
    Para {
        /// The paragraph block's id.
        block_id: BlockId,
        /// Page-local x.
        x: f64,
        /// Page-local y.
        y: f64,
        /// Width.
        width: f64,
        /// First line index (inclusive) from the paragraph's measure.
        from_line: usize,
        /// Last line index (exclusive).
        to_line: usize,
        /// The fragment's position range in the document.
        pm_range: Range<Pos>,
        /// Numbering marker width occupied on this fragment's first line.
        marker_width: f64,
        /// True if a previous fragment of the same block ended before `from_line`.
        continues_from_prev: bool,
    },
    /// A slice of a table's rows.
    Table {
        /// The table block's id.
        block_id: BlockId,
        /// Page-local x.
        x: f64,
        /// Page-local y.
        y: f64,
        /// Width.
        width: f64,
        /// Height.
        height: f64,
        /// First row index (inclusive).
        from_row: usize,
        /// Last row index (exclusive).
        to_row: usize,
        /// Column boundaries, copied from the table's measure.
        column_boundaries: Vec<f64>,
    },
    /// An image fragment (never split across pages).
    Image {
        /// The block's id.
        block_id: BlockId,
        /// Page-local x.
        x: f64,
        /// Page-local y.
        y: f64,
        /// Width.
        width: f64,
        /// Height.
        height: f64,
    },
    /// A drawing fragment.
    Drawing {
        /// The block's id.
        block_id: BlockId,
        /// Page-local x.
        x: f64,
        /// Page-local y.
        y: f64,
        /// Width.
        width: f64,
        /// Height.
        height: f64,
    },
}

impl Fragment {
    /// The fragment's block id, regardless of kind.
    pub fn block_id(&self) -> BlockId {
        match self {
            Fragment::Para { block_id, .. }
            | Fragment::Table { block_id, .. }
            | Fragment::Image { block_id, .. }
            | Fragment::Drawing { block_id, .. } => *block_id,
        }
    }

    /// The fragment's page-local `(x, y)` origin.
    pub fn origin(&self) -> (f64, f64) {
        match self {
            Fragment::Para { x, y, .. }
            | Fragment::Table { x, y, .. }
            | Fragment::Image { x, y, .. }
            | Fragment::Drawing { x, y, .. } => (*x, *y),
        }
    }

    /// The fragment's PM range, when it carries one (paragraphs only; table/image
    /// fragments don't carry per-character positions).
    pub fn pm_range(&self) -> Option<Range<Pos>> {
        match self {
            Fragment::Para { pm_range, .. } => Some(pm_range.clone()),
            _ => None,
        }
    }
}

/// References to the header/footer descriptor ids active for a page's section, per
/// variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionRefs {
    /// `w:headerReference` rIds by variant.
    pub header_refs: HashMap<HeaderFooterVariant, String>,
    /// `w:footerReference` rIds by variant.
    pub footer_refs: HashMap<HeaderFooterVariant, String>,
}

/// A laid-out page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 0-based page index.
    pub number: usize,
    /// Display page number text (accounting for section restarts/formats).
    pub number_text: String,
    /// Page size.
    pub size: PageSize,
    /// Margins.
    pub margins: Margins,
    /// True if landscape.
    pub landscape: bool,
    /// Content fragments, sorted by (y, x).
    pub fragments: Vec<Fragment>,
    /// Index of the section this page belongs to.
    pub section_index: usize,
    /// Per-variant header/footer rId references for this page's section.
    pub section_refs: SectionRefs,
}

/// The result of a layout pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Pages, in reading order.
    pub pages: Vec<Page>,
    /// Page size used (first section's, for callers that want a single value).
    pub page_size: PageSize,
    /// Inter-page gap, in screen pixels.
    pub page_gap: f64,
}

/// Header/footer variant selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeaderFooterVariant {
    /// Applies when no other variant matches.
    Default,
    /// The first page of a section, when `title_pg` is set.
    First,
    /// Even physical pages, when `alternate_headers` is set.
    Even,
    /// Odd physical pages, when `alternate_headers` is set.
    Odd,
}

/// Which kind of region a [`HeaderFooterIdentifier`] or [`crate::session::Session`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderFooterKind {
    /// A header region.
    Header,
    /// A footer region.
    Footer,
}

/// Identifies a concrete header/footer instance: which section, which variant, which
/// descriptor id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeaderFooterIdentifier {
    /// Header or footer.
    pub kind: HeaderFooterKind,
    /// Which variant.
    pub variant: HeaderFooterVariant,
    /// The descriptor/content id this identifier resolves to.
    pub id: String,
}

/// One named style entry in the style registry (§3's "Style").
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedStyle {
    /// The style this one is based on, if any.
    pub based_on: Option<StyleId>,
    /// Whether this style is the document's default for its kind (`w:default="1"`).
    pub is_default: bool,
    /// Raw paragraph properties (kind-specific; the translator decides what to extract).
    pub paragraph_properties: Option<ParagraphProperties>,
    /// Raw run properties.
    pub run_properties: Option<RunProperties>,
}

/// A numbering level's properties, as declared on `w:abstractNum/w:lvl` or as a
/// `w:lvlOverride`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberingLevel {
    /// Paragraph properties contributed by this level.
    pub paragraph_properties: Option<ParagraphProperties>,
    /// Run properties contributed by this level (marker formatting).
    pub run_properties: Option<RunProperties>,
    /// `w:pStyle`, if this level references a paragraph style.
    pub p_style: Option<StyleId>,
}

/// An abstract numbering definition: its levels, and an optional style link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbstractNumbering {
    /// Levels, keyed by `ilvl`.
    pub levels: HashMap<u32, NumberingLevel>,
    /// `w:numStyleLink`, if this abstract numbering defers to a style's numbering.
    pub num_style_link: Option<StyleId>,
}

/// A concrete numbering definition (`w:num`): links to an abstract, plus per-level
/// overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberingDefinition {
    /// The abstract numbering this definition links to.
    pub abstract_id: AbstractNumId,
    /// Level overrides, keyed by `ilvl`.
    pub level_overrides: HashMap<u32, NumberingLevel>,
}

/// The numbering registry (`word/numbering.xml`'s shape).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberingRegistry {
    /// Concrete definitions, keyed by `numId`.
    pub definitions: HashMap<NumId, NumberingDefinition>,
    /// Abstract definitions, keyed by `abstractNumId`.
    pub abstracts: HashMap<AbstractNumId, AbstractNumbering>,
}

/// Resolver input: the style registry, document defaults, numbering, and theme.
#[derive(Debug, Clone, Default)]
pub struct StyleSheet {
    /// Named styles, keyed by styleId.
    pub styles: HashMap<StyleId, NamedStyle>,
    /// Document default paragraph properties (`docDefaults/pPrDefault/pPr`).
    pub default_paragraph_properties: Option<ParagraphProperties>,
    /// Document default run properties (`docDefaults/rPrDefault/rPr`).
    pub default_run_properties: Option<RunProperties>,
    /// Numbering registry.
    pub numbering: NumberingRegistry,
    /// Theme font scheme.
    pub theme_fonts: doc_style_defaults::ThemeFonts,
}

/// State of one remote collaborator's cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteCursorState {
    /// The collaborator's transport-assigned client id.
    pub client_id: u64,
    /// Display name, if known.
    pub user_name: Option<String>,
    /// Email, if known.
    pub user_email: Option<String>,
    /// Display color, `#RRGGBB`, if declared and valid.
    pub user_color: Option<String>,
    /// Selection anchor (absolute position).
    pub anchor: Pos,
    /// Selection head (absolute position).
    pub head: Pos,
    /// Monotonic timestamp (milliseconds) of the last change to `anchor`/`head`.
    pub updated_at: u64,
}

/// A host-owned document state snapshot handed to `toFlowBlocks`.
pub trait DocumentModel {
    /// Convert the current document state into flow blocks plus bookmarks, honoring the
    /// supplied adapter options (tracked-changes mode, etc).
    fn to_flow_blocks(
        &self,
        options: &ToFlowBlocksOptions,
    ) -> Result<(Vec<FlowBlock>, Vec<(String, Pos)>), LayoutError>;

    /// The size of the document in absolute positions.
    fn doc_size(&self) -> Pos;
}

/// Options threaded through to `DocumentModel::to_flow_blocks` (§4.L step 2).
#[derive(Debug, Clone, Default)]
pub struct ToFlowBlocksOptions {
    /// Whether tracked changes should be shown inline (`true`) or resolved (`false`).
    pub show_tracked_changes: bool,
}

/// A host-owned painter: consumes `{blocks, measures}` plus the resulting `Layout` and
/// renders it. The CORE never implements a real painter; hosts provide one, and tests use
/// [`crate::NullPainter`].
pub trait Painter {
    /// Hand the painter a freshly produced layout plus the blocks/measures it was built
    /// from (main content, and optionally header/footer content).
    fn paint(&mut self, layout: &Layout, blocks: &[FlowBlock], measures: &HashMap<BlockId, Measure>);
}

/// A host-owned collaboration transport: exposes awareness state and relative-to-absolute
/// position conversion (§4.I).
pub trait CollaborationTransport {
    /// Current awareness states, keyed by client id.
    fn awareness_states(&self) -> Vec<RawAwarenessState>;

    /// Convert a relative position (opaque to the CORE) to an absolute document position,
    /// against the CURRENT document state. Returns `None` if the position can no longer be
    /// resolved (e.g. the referenced node was deleted).
    fn relative_to_absolute(&self, relative: &RelativePosition) -> Option<Pos>;
}

/// An opaque, transport-defined relative position (see [`CollaborationTransport`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativePosition(pub Vec<u8>);

/// One client's raw awareness payload, before normalization.
#[derive(Debug, Clone)]
pub struct RawAwarenessState {
    /// The client's transport-assigned id.
    pub client_id: u64,
    /// Cursor anchor/head as relative positions, if the client has a cursor.
    pub cursor: Option<(RelativePosition, RelativePosition)>,
    /// Display name.
    pub user_name: Option<String>,
    /// Email.
    pub user_email: Option<String>,
    /// Declared color.
    pub user_color: Option<String>,
}
