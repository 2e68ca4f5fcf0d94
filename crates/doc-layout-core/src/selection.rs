//! Selection State Machine (§4.G): tracks pointer-driven text and table-cell selection,
//! including multi-click word/paragraph extension.

use serde::{Deserialize, Serialize};

use crate::model::{BlockId, Pos};

/// The unit a drag/click extends the selection by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionMode {
    /// Single characters.
    Char,
    /// Whole words.
    Word,
    /// Whole paragraphs.
    Paragraph,
}

/// A table cell anchor recorded on pointerdown inside a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellAnchor {
    /// The position inside the containing table block.
    pub table_pos: Pos,
    /// The position inside the anchor cell.
    pub cell_pos: Pos,
    /// The anchor cell's row.
    pub row: usize,
    /// The anchor cell's column.
    pub col: usize,
    /// The table's block id.
    pub block_id: BlockId,
}

/// A cell range selection, anchor cell to current cell (inclusive, unordered).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSelection {
    /// The table's block id.
    pub block_id: BlockId,
    /// Anchor row/col.
    pub anchor: (usize, usize),
    /// Current row/col.
    pub current: (usize, usize),
}

/// The selection machine's state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionState {
    /// Awaiting interaction.
    Idle,
    /// Dragging a text selection in the given extension mode.
    Dragging(ExtensionMode),
    /// Pointerdown occurred inside a cell; no crossing has happened yet.
    CellAnchorPending(CellAnchor),
    /// A subsequent pointermove crossed into a different cell.
    CellAnchorActive(CellAnchor, CellSelection),
}

/// A recorded click, used to detect multi-click sequences.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ClickRecord {
    x: f64,
    y: f64,
    at_ms: u64,
    pos: Pos,
}

/// Thresholds for multi-click detection (§4.G).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiClickThresholds {
    /// Max elapsed time between clicks, in milliseconds.
    pub time_ms: u64,
    /// Max pointer movement between clicks, in layout units.
    pub distance: f64,
}

impl Default for MultiClickThresholds {
    fn default() -> Self {
        Self { time_ms: 400, distance: 5.0 }
    }
}

/// An anchor/head text selection, with the direction it was extended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSelection {
    /// The selection anchor (where extension started).
    pub anchor: Pos,
    /// The selection head (where extension currently ends).
    pub head: Pos,
}

impl TextSelection {
    /// Whether the selection is empty (a caret).
    pub fn is_empty(&self) -> bool {
        self.anchor == self.head
    }

    /// Ordered `(min, max)`.
    pub fn ordered(&self) -> (Pos, Pos) {
        if self.anchor <= self.head {
            (self.anchor, self.head)
        } else {
            (self.head, self.anchor)
        }
    }

    /// Whether the selection was extended backward (head before anchor).
    pub fn is_backward(&self) -> bool {
        self.head < self.anchor
    }
}

/// The pointer-driven selection machine.
pub struct SelectionMachine {
    state: SelectionState,
    thresholds: MultiClickThresholds,
    last_click: Option<ClickRecord>,
    click_depth: u32,
    first_click_pos: Option<Pos>,
    selection: TextSelection,
}

impl SelectionMachine {
    /// Create a new machine in the idle state with default thresholds.
    pub fn new() -> Self {
        Self::with_thresholds(MultiClickThresholds::default())
    }

    /// Create a new machine with custom multi-click thresholds.
    pub fn with_thresholds(thresholds: MultiClickThresholds) -> Self {
        Self {
            state: SelectionState::Idle,
            thresholds,
            last_click: None,
            click_depth: 0,
            first_click_pos: None,
            selection: TextSelection { anchor: 0, head: 0 },
        }
    }

    /// Current machine state.
    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Current text selection.
    pub fn selection(&self) -> TextSelection {
        self.selection
    }

    /// Register a pointerdown at document position `pos`, client coordinates `(x, y)`, and
    /// timestamp `at_ms`. Returns the extension mode the resulting drag should use.
    ///
    /// Depths 2/3 (double/triple click) immediately extend the selection to the word or
    /// paragraph at the FIRST click's position, not the (possibly drifted) current one.
    pub fn pointerdown(
        &mut self,
        pos: Pos,
        x: f64,
        y: f64,
        at_ms: u64,
        word_boundary: impl Fn(Pos) -> (Pos, Pos),
        paragraph_boundary: impl Fn(Pos) -> (Pos, Pos),
    ) -> ExtensionMode {
        self.state = SelectionState::Idle;

        let is_repeat = self.last_click.is_some_and(|prev| {
            at_ms.saturating_sub(prev.at_ms) <= self.thresholds.time_ms
                && ((x - prev.x).powi(2) + (y - prev.y).powi(2)).sqrt() <= self.thresholds.distance
        });

        if is_repeat {
            self.click_depth = (self.click_depth + 1).min(3);
        } else {
            self.click_depth = 1;
            self.first_click_pos = Some(pos);
        }

        self.last_click = Some(ClickRecord { x, y, at_ms, pos });
        let anchor_pos = self.first_click_pos.unwrap_or(pos);

        let mode = match self.click_depth {
            2 => ExtensionMode::Word,
            3 => ExtensionMode::Paragraph,
            _ => ExtensionMode::Char,
        };

        self.selection = match mode {
            ExtensionMode::Char => TextSelection { anchor: pos, head: pos },
            ExtensionMode::Word => {
                let (s, e) = word_boundary(anchor_pos);
                TextSelection { anchor: s, head: e }
            }
            ExtensionMode::Paragraph => {
                let (s, e) = paragraph_boundary(anchor_pos);
                TextSelection { anchor: s, head: e }
            }
        };

        self.state = SelectionState::Dragging(mode);
        mode
    }

    /// Register pointerdown inside a table cell.
    pub fn pointerdown_in_cell(&mut self, anchor: CellAnchor) {
        self.state = SelectionState::CellAnchorPending(anchor);
    }

    /// Register pointerdown outside any cell: clears any cell anchor (§4.G).
    pub fn pointerdown_outside_cell(&mut self) {
        if matches!(self.state, SelectionState::CellAnchorPending(_) | SelectionState::CellAnchorActive(..)) {
            self.state = SelectionState::Idle;
        }
    }

    /// Register a pointermove while the button is pressed, currently hovering `(row, col)`
    /// of table `block_id`, or `None` if not currently over any table cell.
    pub fn pointermove_cell(&mut self, current: Option<(BlockId, usize, usize)>) {
        match (&self.state, current) {
            (SelectionState::CellAnchorPending(anchor), Some((block_id, row, col)))
                if anchor.block_id == block_id && (anchor.row, anchor.col) != (row, col) =>
            {
                let anchor = *anchor;
                self.state = SelectionState::CellAnchorActive(
                    anchor,
                    CellSelection {
                        block_id,
                        anchor: (anchor.row, anchor.col),
                        current: (row, col),
                    },
                );
            }
            (SelectionState::CellAnchorActive(anchor, _), Some((block_id, row, col)))
                if anchor.block_id == block_id =>
            {
                let anchor = *anchor;
                self.state = SelectionState::CellAnchorActive(
                    anchor,
                    CellSelection {
                        block_id,
                        anchor: (anchor.row, anchor.col),
                        current: (row, col),
                    },
                );
            }
            // Leaving the table while active: keep the last cell selection (§4.G).
            (SelectionState::CellAnchorActive(..), None) => {}
            _ => {}
        }
    }

    /// Register a text-extending pointermove to `pos`, per the current extension mode.
    pub fn pointermove_text(
        &mut self,
        pos: Pos,
        word_boundary: impl Fn(Pos) -> (Pos, Pos),
        paragraph_boundary: impl Fn(Pos) -> (Pos, Pos),
    ) {
        let mode = match self.state {
            SelectionState::Dragging(mode) => mode,
            _ => return,
        };

        self.selection.head = match mode {
            ExtensionMode::Char => pos,
            ExtensionMode::Word => {
                let (_, e) = word_boundary(pos);
                e
            }
            ExtensionMode::Paragraph => {
                let (_, e) = paragraph_boundary(pos);
                e
            }
        };
    }

    /// Shift+click extension: extend in the current mode with direction-aware boundaries.
    pub fn shift_click(
        &mut self,
        pos: Pos,
        word_boundary: impl Fn(Pos) -> (Pos, Pos),
        paragraph_boundary: impl Fn(Pos) -> (Pos, Pos),
    ) {
        let mode = match self.state {
            SelectionState::Dragging(mode) => mode,
            _ => ExtensionMode::Char,
        };

        let forward = pos >= self.selection.anchor;

        let (anchor_unit, head_unit) = match mode {
            ExtensionMode::Char => ((self.selection.anchor, self.selection.anchor), (pos, pos)),
            ExtensionMode::Word => (word_boundary(self.selection.anchor), word_boundary(pos)),
            ExtensionMode::Paragraph => (paragraph_boundary(self.selection.anchor), paragraph_boundary(pos)),
        };

        if forward {
            self.selection.anchor = anchor_unit.0;
            self.selection.head = head_unit.1;
        } else {
            self.selection.anchor = anchor_unit.1;
            self.selection.head = head_unit.0;
        }

        self.state = SelectionState::Dragging(mode);
    }

    /// Register pointerup: ends dragging, but preserves the extension mode so subsequent
    /// shift+clicks keep extending by word/paragraph.
    pub fn pointerup(&mut self) {
        // Extension mode is read off `self.state` by later shift_click calls; nothing to do
        // beyond leaving the Dragging(mode) state as-is (no separate "ended" state exists).
    }

    /// Clear any active cell anchor (called on document change, §4.G).
    pub fn on_document_change(&mut self) {
        if matches!(self.state, SelectionState::CellAnchorPending(_) | SelectionState::CellAnchorActive(..)) {
            self.state = SelectionState::Idle;
        }
    }
}

impl Default for SelectionMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(pos: Pos) -> (Pos, Pos) {
        (pos.saturating_sub(2), pos + 2)
    }

    fn paras(pos: Pos) -> (Pos, Pos) {
        (pos.saturating_sub(10), pos + 10)
    }

    #[test]
    fn double_click_within_threshold_selects_word_at_first_click() {
        let mut m = SelectionMachine::new();
        m.pointerdown(100, 10.0, 10.0, 0, words, paras);
        let mode = m.pointerdown(100, 11.0, 11.0, 200, words, paras);
        assert_eq!(mode, ExtensionMode::Word);
        assert_eq!(m.selection(), TextSelection { anchor: 98, head: 102 });
    }

    #[test]
    fn triple_click_selects_paragraph() {
        let mut m = SelectionMachine::new();
        m.pointerdown(100, 10.0, 10.0, 0, words, paras);
        m.pointerdown(100, 11.0, 11.0, 100, words, paras);
        let mode = m.pointerdown(100, 11.0, 11.0, 200, words, paras);
        assert_eq!(mode, ExtensionMode::Paragraph);
        assert_eq!(m.selection(), TextSelection { anchor: 90, head: 110 });
    }

    #[test]
    fn click_outside_time_window_resets_depth() {
        let mut m = SelectionMachine::new();
        m.pointerdown(100, 10.0, 10.0, 0, words, paras);
        let mode = m.pointerdown(100, 10.0, 10.0, 1000, words, paras);
        assert_eq!(mode, ExtensionMode::Char);
    }

    #[test]
    fn click_outside_distance_window_resets_depth() {
        let mut m = SelectionMachine::new();
        m.pointerdown(100, 10.0, 10.0, 0, words, paras);
        let mode = m.pointerdown(100, 100.0, 100.0, 100, words, paras);
        assert_eq!(mode, ExtensionMode::Char);
    }

    #[test]
    fn cellanchor_pending_becomes_active_on_crossing() {
        let mut m = SelectionMachine::new();
        m.pointerdown_in_cell(CellAnchor { table_pos: 0, cell_pos: 0, row: 0, col: 0, block_id: 1 });
        m.pointermove_cell(Some((1, 0, 1)));
        match m.state() {
            SelectionState::CellAnchorActive(_, sel) => {
                assert_eq!(sel.anchor, (0, 0));
                assert_eq!(sel.current, (0, 1));
            }
            other => panic!("expected CellAnchorActive, got {other:?}"),
        }
    }

    #[test]
    fn pointerdown_outside_cell_clears_anchor() {
        let mut m = SelectionMachine::new();
        m.pointerdown_in_cell(CellAnchor { table_pos: 0, cell_pos: 0, row: 0, col: 0, block_id: 1 });
        m.pointerdown_outside_cell();
        assert!(matches!(m.state(), SelectionState::Idle));
    }

    #[test]
    fn document_change_clears_cell_anchor() {
        let mut m = SelectionMachine::new();
        m.pointerdown_in_cell(CellAnchor { table_pos: 0, cell_pos: 0, row: 0, col: 0, block_id: 1 });
        m.on_document_change();
        assert!(matches!(m.state(), SelectionState::Idle));
    }

    #[test]
    fn shift_click_forward_extends_from_anchor_start_to_head_end() {
        let mut m = SelectionMachine::new();
        m.pointerdown(100, 10.0, 10.0, 0, words, paras);
        m.pointerdown(100, 11.0, 11.0, 100, words, paras); // word mode, selection 98..102
        m.shift_click(200, words, paras);
        assert_eq!(m.selection(), TextSelection { anchor: 98, head: 202 });
    }
}
