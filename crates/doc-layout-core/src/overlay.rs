//! Overlay Renderer (§4.H): caret and selection geometry, layered above/below the painted
//! page content in a single layout-space coordinate system.

use crate::hit_test::{get_range_rects, PositionedRect, ViewportTransform};
use crate::model::{BlockId, Fragment, Layout, Line, Measure, Pos};
use std::collections::HashMap;

/// Which overlay layer a piece of geometry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayLayer {
    /// Below the painted content: remote collaborator cursors/selections.
    Remote,
    /// Above the painted content: the local caret and selection.
    Local,
}

/// The caret's computed rect, plus which layer it renders in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaretRect {
    /// Page-local x.
    pub x: f64,
    /// Page-local y.
    pub y: f64,
    /// Height, derived from the line height at `pos`.
    pub height: f64,
    /// Which page this caret belongs to.
    pub page_index: usize,
}

/// Locate the line containing `pos` inside a paragraph's lines, returning the line index
/// and the in-line character offset.
fn line_containing(lines: &[Line], pos: Pos) -> Option<(usize, usize)> {
    for (i, line) in lines.iter().enumerate() {
        if line.pm_range.start <= pos && pos < line.pm_range.end {
            return Some((i, pos - line.pm_range.start));
        }
        if line.pm_range.start <= pos && pos == line.pm_range.end && i == lines.len() - 1 {
            return Some((i, pos - line.pm_range.start));
        }
    }
    None
}

/// Compute the caret's layout rect by geometry fallback (§4.H step 2): resolve the
/// paragraph fragment containing `pos`, locate its line, compute X from the line's
/// per-character offsets plus marker width, Y from summed line heights.
///
/// Step 1 (DOM-based correction) has no counterpart in this headless crate; callers that
/// have a real DOM should try that first and only fall back to this function.
pub fn compute_caret_layout_rect(
    layout: &Layout,
    measures: &HashMap<BlockId, Measure>,
    pos: Pos,
) -> Option<CaretRect> {
    try_caret_at(layout, measures, pos)
        .or_else(|| pos.checked_sub(1).and_then(|p| try_caret_at(layout, measures, p)))
        .or_else(|| try_caret_at(layout, measures, pos + 1))
}

fn try_caret_at(layout: &Layout, measures: &HashMap<BlockId, Measure>, pos: Pos) -> Option<CaretRect> {
    for page in &layout.pages {
        for fragment in &page.fragments {
            let Fragment::Para {
                block_id,
                x,
                y,
                from_line,
                to_line,
                pm_range,
                marker_width,
                ..
            } = fragment
            else {
                continue;
            };
            if !(pm_range.start <= pos && pos <= pm_range.end) {
                continue;
            }
            let Some(Measure::Paragraph { lines, .. }) = measures.get(block_id) else {
                continue;
            };
            let (line_idx, char_offset) = line_containing(lines, pos)?;
            if line_idx < *from_line || line_idx >= *to_line {
                continue;
            }

            let line = &lines[line_idx];
            let char_x = line.char_x.get(char_offset).copied().unwrap_or(0.0);
            let y_offset: f64 = lines[*from_line..line_idx].iter().map(|l| l.line_height).sum();
            let extra_marker = if line_idx == *from_line { *marker_width } else { 0.0 };

            return Some(CaretRect {
                x: x + char_x + extra_marker,
                y: y + y_offset,
                height: line.line_height,
                page_index: page.number,
            });
        }
    }
    None
}

/// Convert a non-empty text selection to viewport rects (§4.H: `selectionToRects`, then DOM
/// correction — which this crate models as an optional override hook).
pub fn selection_to_rects(
    layout: &Layout,
    measures: &HashMap<BlockId, Measure>,
    from: Pos,
    to: Pos,
    transform: &ViewportTransform,
    dom_correction: Option<&dyn Fn(&PositionedRect) -> PositionedRect>,
) -> Vec<PositionedRect> {
    let rects = get_range_rects(layout, measures, from, to, transform);
    match dom_correction {
        Some(correct) => rects.iter().map(correct).collect(),
        None => rects,
    }
}

/// One selected cell's resolved geometry, for a `CellSelection` overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellRect {
    /// Row index.
    pub row: usize,
    /// Column index.
    pub col: usize,
    /// Page-local x.
    pub x: f64,
    /// Page-local y.
    pub y: f64,
    /// Width, from `columnBoundaries` (summing colspan).
    pub width: f64,
    /// Height, from `TableMeasure.rows` (summing rowspan), or `fragment.height /
    /// (to_row - from_row)` when measure data is absent.
    pub height: f64,
    /// Page this cell's fragment belongs to.
    pub page_index: usize,
}

/// Resolve geometry for every cell in `(anchor_row..=current_row, anchor_col..=current_col)`
/// (normalized), by finding the containing table fragment on each page and converting
/// PM-range table positions to pixel rects via the table's measure.
pub fn cell_selection_rects(
    layout: &Layout,
    block_id: BlockId,
    measure: Option<&Measure>,
    anchor: (usize, usize),
    current: (usize, usize),
) -> Vec<CellRect> {
    let row_range = anchor.0.min(current.0)..=anchor.0.max(current.0);
    let col_range = anchor.1.min(current.1)..=anchor.1.max(current.1);

    let mut out = Vec::new();
    for page in &layout.pages {
        for fragment in &page.fragments {
            let Fragment::Table {
                block_id: fb,
                x,
                y,
                height: frag_height,
                from_row,
                to_row,
                column_boundaries,
            } = fragment
            else {
                continue;
            };
            if *fb != block_id {
                continue;
            }

            let row_heights = match measure {
                Some(Measure::Table { rows, .. }) => Some(rows),
                _ => None,
            };

            for row in row_range.clone() {
                if row < *from_row || row >= *to_row {
                    continue;
                }
                for &col in col_range.clone().collect::<Vec<_>>().iter() {
                    let Some((cx, width)) = column_boundaries
                        .get(col)
                        .zip(column_boundaries.get(col + 1))
                        .map(|(a, b)| (*a, b - a))
                    else {
                        continue;
                    };

                    let (row_y, row_height) = match row_heights {
                        Some(heights) => {
                            let offset: f64 = heights[*from_row..row].iter().sum();
                            (offset, heights.get(row).copied().unwrap_or(0.0))
                        }
                        None => {
                            let n = (*to_row - *from_row).max(1) as f64;
                            let per_row = frag_height / n;
                            ((row - from_row) as f64 * per_row, per_row)
                        }
                    };

                    out.push(CellRect {
                        row,
                        col,
                        x: x + cx,
                        y: y + row_y,
                        width,
                        height: row_height,
                        page_index: page.number,
                    });
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Margins, PageSize, SectionRefs};

    fn para_fragment(block_id: BlockId, pm_range: std::ops::Range<Pos>) -> Fragment {
        Fragment::Para {
            block_id,
            x: 0.0,
            y: 0.0,
            width: 100.0,
            from_line: 0,
            to_line: 1,
            pm_range,
            marker_width: 0.0,
            continues_from_prev: false,
        }
    }

    fn single_page_layout(fragment: Fragment) -> Layout {
        Layout {
            pages: vec![crate::model::Page {
                number: 0,
                number_text: "1".to_string(),
                size: PageSize { width: 100, height: 100 },
                margins: Margins::default(),
                landscape: false,
                fragments: vec![fragment],
                section_index: 0,
                section_refs: SectionRefs::default(),
            }],
            page_size: PageSize { width: 100, height: 100 },
            page_gap: 24.0,
        }
    }

    #[test]
    fn caret_geometry_resolves_x_from_line_char_offsets() {
        let layout = single_page_layout(para_fragment(1, 0..5));
        let mut measures = HashMap::new();
        measures.insert(
            1,
            Measure::Paragraph {
                lines: vec![Line {
                    line_height: 14.0,
                    pm_range: 0..5,
                    char_x: vec![0.0, 6.0, 12.0, 18.0, 24.0],
                    width: 30.0,
                }],
                marker_width: None,
            },
        );

        let rect = compute_caret_layout_rect(&layout, &measures, 2).unwrap();
        assert_eq!(rect.x, 12.0);
        assert_eq!(rect.height, 14.0);
    }

    #[test]
    fn caret_geometry_falls_back_to_pos_minus_one() {
        let layout = single_page_layout(para_fragment(1, 0..5));
        let mut measures = HashMap::new();
        measures.insert(
            1,
            Measure::Paragraph {
                lines: vec![Line {
                    line_height: 14.0,
                    pm_range: 0..5,
                    char_x: vec![0.0, 6.0, 12.0, 18.0, 24.0],
                    width: 30.0,
                }],
                marker_width: None,
            },
        );

        // pos=100 doesn't exist; pos-1=99 also doesn't; but the function should at least
        // not panic and return None since neither 100, 99, nor 101 resolve.
        assert!(compute_caret_layout_rect(&layout, &measures, 100).is_none());
    }

    #[test]
    fn cell_selection_rects_uses_column_boundaries_and_row_heights() {
        let layout = single_page_layout(Fragment::Table {
            block_id: 1,
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 40.0,
            from_row: 0,
            to_row: 2,
            column_boundaries: vec![0.0, 50.0, 100.0],
        });
        let measure = Measure::Table { rows: vec![20.0, 20.0], column_boundaries: vec![0.0, 50.0, 100.0] };

        let rects = cell_selection_rects(&layout, 1, Some(&measure), (0, 0), (1, 1));
        assert_eq!(rects.len(), 4);
        assert!(rects.iter().any(|r| r.row == 1 && r.col == 1 && r.x == 50.0 && r.y == 20.0));
    }
}
