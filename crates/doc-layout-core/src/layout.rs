//! Incremental Layout Engine (§4.C): packs flow blocks into pages.
//!
//! Character-width measurement (`char_width`/`calculate_wrap_points` and friends) generalizes
//! a fixed-cell terminal wrap algorithm to per-run pixel widths driven by a run's resolved
//! font size.

use std::collections::HashMap;

use unicode_width::UnicodeWidthChar;

use crate::error::{LayoutError, LayoutStage};
use crate::model::{
    BlockId, FlowBlock, FlowBlockKind, Line, Margins, Measure, Page, PageSize, Paragraph,
    SectionRefs, Table,
};

/// Default tab width (in cells) used when a caller does not specify a tab width.
pub const DEFAULT_TAB_WIDTH: usize = 4;

/// Approximate width, in layout units, of one character cell at 10pt (the half-point
/// default font size). Real hosts measure actual glyph advances via their own text
/// shaping; this crate's default measurer only needs a monotonic approximation good
/// enough to exercise pagination and incrementality end to end.
const UNITS_PER_CELL_AT_10PT: f64 = 6.0;

/// A wrap point within a run of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WrapPoint {
    /// Character index where wrapping occurs.
    pub char_index: usize,
    /// Byte offset where wrapping occurs.
    pub byte_offset: usize,
}

/// Calculate the visual width (UAX #11) of a character: 1 for narrow, 2 for wide, 0 for
/// zero-width combining characters.
pub fn char_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(1)
}

/// Visual width of a character at a given cell offset, with `'\t'` expanding to the next
/// tab stop.
pub fn cell_width_at(ch: char, cell_offset_in_line: usize, tab_width: usize) -> usize {
    if ch == '\t' {
        let tab_width = tab_width.max(1);
        let rem = cell_offset_in_line % tab_width;
        tab_width - rem
    } else {
        char_width(ch)
    }
}

/// Total visual width of a string, in cells.
pub fn str_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Layout-unit width of a character at the given font size (half-points), used to build
/// per-character x positions for a [`Line`].
pub fn char_units(ch: char, font_size_half_points: u32) -> f64 {
    let scale = font_size_half_points as f64 / 20.0;
    char_width(ch) as f64 * UNITS_PER_CELL_AT_10PT * scale
}

/// Find the character-index wrap points for `text` at `max_width` layout units, given a
/// font size in half-points. Prefers breaking at whitespace, falling back to a hard break
/// mid-word when a single word exceeds `max_width`.
pub fn calculate_wrap_points(text: &str, max_width: f64, font_size_half_points: u32) -> Vec<WrapPoint> {
    if max_width <= 0.0 {
        return Vec::new();
    }

    let mut wrap_points = Vec::new();
    let mut x_in_segment = 0.0f64;
    let mut segment_start_char = 0usize;
    let mut last_break: Option<(usize, usize)> = None;

    for (char_index, (byte_offset, ch)) in text.char_indices().enumerate() {
        let w = char_units(ch, font_size_half_points);

        if x_in_segment + w > max_width && char_index > segment_start_char {
            if let Some((break_char, break_byte)) = last_break {
                wrap_points.push(WrapPoint {
                    char_index: break_char,
                    byte_offset: break_byte,
                });
                segment_start_char = break_char;
            } else {
                wrap_points.push(WrapPoint {
                    char_index,
                    byte_offset,
                });
                segment_start_char = char_index;
            }
            x_in_segment = 0.0;
            last_break = None;
        }

        x_in_segment += w;

        if ch.is_whitespace() {
            last_break = Some((char_index + 1, byte_offset + ch.len_utf8()));
        }
    }

    wrap_points
}

/// Wrap and measure a single paragraph block under `max_width`, producing a [`Measure`].
///
/// This is the default `measureFn` of §4.C: a host may supply its own (real text shaping)
/// and the rest of the engine is agnostic to how measurement happens.
pub fn default_measure_fn(paragraph: &Paragraph, max_width: f64, default_line_height: f64) -> Measure {
    let mut lines = Vec::new();
    let mut pos = paragraph.runs.first().and_then(|r| r.pm_range.as_ref().map(|r| r.start)).unwrap_or(0);

    for run in &paragraph.runs {
        let font_size = run.properties.font_size_half_points.unwrap_or(20);
        let wrap_points = calculate_wrap_points(&run.text, max_width, font_size);

        let mut char_start = 0usize;
        let mut byte_start = 0usize;
        let chars: Vec<char> = run.text.chars().collect();

        let mut segment_bounds: Vec<(usize, usize)> = Vec::new();
        for wp in &wrap_points {
            segment_bounds.push((char_start, wp.char_index));
            char_start = wp.char_index;
            byte_start = wp.byte_offset;
            let _ = byte_start;
        }
        segment_bounds.push((char_start, chars.len()));

        for (start, end) in segment_bounds {
            let mut x = 0.0;
            let mut char_x = Vec::with_capacity(end.saturating_sub(start));
            for ch in &chars[start..end] {
                char_x.push(x);
                x += char_units(*ch, font_size);
            }
            let line_start = pos + start;
            let line_end = pos + end;
            lines.push(Line {
                line_height: default_line_height,
                pm_range: line_start..line_end,
                char_x,
                width: x,
            });
        }

        pos += chars.len();
    }

    if lines.is_empty() {
        lines.push(Line {
            line_height: default_line_height,
            pm_range: pos..pos,
            char_x: Vec::new(),
            width: 0.0,
        });
    }

    Measure::Paragraph {
        lines,
        marker_width: paragraph.properties.numbering.map(|_| UNITS_PER_CELL_AT_10PT * 2.0),
    }
}

/// Measure a table under `max_width` (§4.C): each row's height is the tallest of its
/// cells' nested paragraph content, each cell laid out at an equal share of the available
/// width. Cells with no paragraph content, or only non-paragraph blocks, fall back to
/// `default_line_height` so an empty row still takes up space.
pub fn default_table_measure_fn(table: &Table, max_width: f64, default_line_height: f64) -> Measure {
    let column_count = table
        .rows
        .iter()
        .map(|row| row.cells.iter().map(|cell| cell.colspan.max(1) as usize).sum::<usize>())
        .max()
        .unwrap_or(1)
        .max(1);
    let column_width = max_width / column_count as f64;
    let column_boundaries: Vec<f64> = (0..=column_count).map(|i| i as f64 * column_width).collect();

    let rows = table
        .rows
        .iter()
        .map(|row| {
            row.cells
                .iter()
                .map(|cell| cell_height(cell, column_width, default_line_height))
                .fold(default_line_height, f64::max)
        })
        .collect();

    Measure::Table { rows, column_boundaries }
}

fn cell_height(cell: &crate::model::TableCell, column_width: f64, default_line_height: f64) -> f64 {
    cell.blocks
        .iter()
        .map(|block| match &block.kind {
            FlowBlockKind::Paragraph(p) => match default_measure_fn(p, column_width, default_line_height) {
                Measure::Paragraph { lines, .. } => lines.iter().map(|l| l.line_height).sum(),
                _ => default_line_height,
            },
            FlowBlockKind::Image(img) => img.height,
            FlowBlockKind::Drawing(drw) => drw.height,
            FlowBlockKind::Table(nested) => match default_table_measure_fn(nested, column_width, default_line_height) {
                Measure::Table { rows, .. } => rows.iter().sum(),
                _ => default_line_height,
            },
            FlowBlockKind::SectionBreak(_) => 0.0,
        })
        .fold(0.0f64, f64::max)
        .max(default_line_height)
}

/// Options threaded into `pack_pages` (§4.C's `opts`).
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    /// Page geometry for the (only, in the single-section case) section.
    pub page_size: PageSize,
    /// Margins.
    pub margins: Margins,
    /// Inter-page gap.
    pub page_gap: f64,
    /// Default line height, used when a measure doesn't provide one per-line (images etc).
    pub default_line_height: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            page_size: PageSize {
                width: 12240,
                height: 15840,
            },
            margins: Margins {
                top: 1440,
                right: 1440,
                bottom: 1440,
                left: 1440,
                header: 720,
                footer: 720,
            },
            page_gap: doc_style_defaults::DEFAULT_PAGE_GAP,
            default_line_height: 240.0,
        }
    }
}

/// Pack a sequence of blocks (with precomputed measures) into pages.
///
/// Measuring is the dominant cost in a real implementation; this function assumes
/// `measures` has already been produced (by [`default_measure_fn`] or an incremental
/// reuse of a prior pass, see [`incremental_layout`]) and only performs placement.
pub fn pack_pages(
    blocks: &[FlowBlock],
    measures: &HashMap<BlockId, Measure>,
    opts: &LayoutOptions,
) -> Result<crate::model::Layout, LayoutError> {
    let content_width = (opts.page_size.width - opts.margins.left - opts.margins.right) as f64;
    let content_height = (opts.page_size.height - opts.margins.top - opts.margins.bottom) as f64;

    if content_width <= 0.0 || content_height <= 0.0 {
        return Err(LayoutError::new(
            LayoutStage::IncrementalLayout,
            "page margins leave no content area",
        ));
    }

    let mut section_index = 0usize;
    let mut pages: Vec<Page> = vec![new_page(0, opts, section_index)];
    let mut cursor_y = 0.0f64;

    for block in blocks {
        match &block.kind {
            FlowBlockKind::SectionBreak(section) => {
                // A section break starts a fresh page, unless it is the document's first
                // section (which already owns the leading page created above).
                if !section.is_first_section {
                    section_index += 1;
                    pages.push(new_page(pages.len(), opts, section_index));
                    cursor_y = 0.0;
                }
            }
            FlowBlockKind::Paragraph(_) => {
                let Some(Measure::Paragraph { lines, marker_width }) = measures.get(&block.id) else {
                    continue;
                };

                let mut from_line = 0usize;
                let mut continues_from_prev = false;

                while from_line < lines.len() {
                    let mut to_line = from_line;
                    let mut used_height = 0.0f64;

                    while to_line < lines.len() {
                        let line_height = lines[to_line].line_height;
                        if used_height + line_height > content_height - cursor_y && to_line > from_line {
                            break;
                        }
                        used_height += line_height;
                        to_line += 1;
                    }

                    if to_line == from_line {
                        // Not even one line fits on the remaining page; start a new page.
                        if cursor_y > 0.0 {
                            pages.push(new_page(pages.len(), opts, section_index));
                            cursor_y = 0.0;
                            continue;
                        }
                        // A single line taller than the whole page: place it anyway to
                        // guarantee forward progress.
                        to_line = from_line + 1;
                        used_height = lines[from_line].line_height;
                    }

                    let pm_start = lines[from_line].pm_range.start;
                    let pm_end = lines[to_line - 1].pm_range.end;

                    pages.last_mut().expect("pages non-empty").fragments.push(
                        crate::model::Fragment::Para {
                            block_id: block.id,
                            x: 0.0,
                            y: cursor_y,
                            width: content_width,
                            from_line,
                            to_line,
                            pm_range: pm_start..pm_end,
                            marker_width: if from_line == 0 { marker_width.unwrap_or(0.0) } else { 0.0 },
                            continues_from_prev,
                        },
                    );

                    cursor_y += used_height;
                    from_line = to_line;
                    continues_from_prev = true;

                    if from_line < lines.len() {
                        pages.push(new_page(pages.len(), opts, section_index));
                        cursor_y = 0.0;
                    }
                }
            }
            FlowBlockKind::Table(_) => {
                let Some(Measure::Table { rows, column_boundaries }) = measures.get(&block.id) else {
                    continue;
                };

                let mut from_row = 0usize;
                while from_row < rows.len() {
                    let mut to_row = from_row;
                    let mut used_height = 0.0f64;
                    while to_row < rows.len() {
                        if used_height + rows[to_row] > content_height - cursor_y && to_row > from_row {
                            break;
                        }
                        used_height += rows[to_row];
                        to_row += 1;
                    }
                    if to_row == from_row {
                        if cursor_y > 0.0 {
                            pages.push(new_page(pages.len(), opts, section_index));
                            cursor_y = 0.0;
                            continue;
                        }
                        to_row = from_row + 1;
                        used_height = rows[from_row];
                    }

                    pages.last_mut().expect("pages non-empty").fragments.push(
                        crate::model::Fragment::Table {
                            block_id: block.id,
                            x: 0.0,
                            y: cursor_y,
                            width: content_width,
                            height: used_height,
                            from_row,
                            to_row,
                            column_boundaries: column_boundaries.clone(),
                        },
                    );

                    cursor_y += used_height;
                    from_row = to_row;
                    if from_row < rows.len() {
                        pages.push(new_page(pages.len(), opts, section_index));
                        cursor_y = 0.0;
                    }
                }
            }
            FlowBlockKind::Image(img) => {
                if cursor_y + img.height > content_height && cursor_y > 0.0 {
                    pages.push(new_page(pages.len(), opts, section_index));
                    cursor_y = 0.0;
                }
                pages.last_mut().expect("pages non-empty").fragments.push(crate::model::Fragment::Image {
                    block_id: block.id,
                    x: 0.0,
                    y: cursor_y,
                    width: img.width,
                    height: img.height,
                });
                cursor_y += img.height;
            }
            FlowBlockKind::Drawing(drw) => {
                if cursor_y + drw.height > content_height && cursor_y > 0.0 {
                    pages.push(new_page(pages.len(), opts, section_index));
                    cursor_y = 0.0;
                }
                pages.last_mut().expect("pages non-empty").fragments.push(crate::model::Fragment::Drawing {
                    block_id: block.id,
                    x: 0.0,
                    y: cursor_y,
                    width: drw.width,
                    height: drw.height,
                });
                cursor_y += drw.height;
            }
        }
    }

    Ok(crate::model::Layout {
        pages,
        page_size: opts.page_size,
        page_gap: opts.page_gap,
    })
}

fn new_page(index: usize, opts: &LayoutOptions, section_index: usize) -> Page {
    Page {
        number: index,
        number_text: (index + 1).to_string(),
        size: opts.page_size,
        margins: opts.margins,
        landscape: opts.page_size.width > opts.page_size.height,
        fragments: Vec::new(),
        section_index,
        section_refs: SectionRefs::default(),
    }
}

/// Incrementally re-measure and re-pack: reuses measures for blocks whose id AND content
/// are unchanged between `prev_blocks` and `new_blocks`, remeasuring only the rest.
///
/// The Controller guarantees block-id stability across updates when content has not
/// structurally changed (§4.C's incrementality rationale); this function still falls back
/// to content equality so a stale measure is never silently reused for a changed block.
pub fn incremental_layout<F>(
    prev_blocks: &[FlowBlock],
    prev_measures: &HashMap<BlockId, Measure>,
    new_blocks: &[FlowBlock],
    opts: &LayoutOptions,
    mut measure_fn: F,
) -> Result<(crate::model::Layout, HashMap<BlockId, Measure>), LayoutError>
where
    F: FnMut(&FlowBlock, f64, f64) -> Option<Measure>,
{
    let prev_by_id: HashMap<BlockId, &FlowBlock> = prev_blocks.iter().map(|b| (b.id, b)).collect();
    let content_width = (opts.page_size.width - opts.margins.left - opts.margins.right) as f64;

    let mut measures = HashMap::with_capacity(new_blocks.len());
    for block in new_blocks {
        let reusable = prev_by_id
            .get(&block.id)
            .is_some_and(|prev| *prev == block)
            && prev_measures.contains_key(&block.id);

        if reusable {
            measures.insert(block.id, prev_measures[&block.id].clone());
            continue;
        }

        if let Some(measure) = measure_fn(block, content_width, opts.default_line_height) {
            measures.insert(block.id, measure);
        }
    }

    let layout = pack_pages(new_blocks, &measures, opts)?;
    Ok((layout, measures))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Alignment, ParagraphProperties, Run, RunProperties};

    #[test]
    fn char_width_handles_wide_chars() {
        assert_eq!(char_width('a'), 1);
        assert_eq!(char_width('\u{4f60}'), 2);
    }

    #[test]
    fn wrap_points_break_at_whitespace() {
        let wraps = calculate_wrap_points("hello world", 80.0, 20);
        assert_eq!(wraps.len(), 1);
        assert_eq!(wraps[0].char_index, 6);
    }

    fn block(id: BlockId, text: &str) -> FlowBlock {
        FlowBlock {
            id,
            kind: FlowBlockKind::Paragraph(Paragraph {
                properties: ParagraphProperties {
                    alignment: Some(Alignment::Left),
                    ..Default::default()
                },
                runs: vec![Run {
                    text: text.to_string(),
                    properties: RunProperties::default(),
                    pm_range: Some(0..text.chars().count()),
                }],
            }),
        }
    }

    #[test]
    fn pack_pages_places_single_short_paragraph_on_one_page() {
        let opts = LayoutOptions::default();
        let b = block(1, "hello");
        let measure = default_measure_fn(
            match &b.kind {
                FlowBlockKind::Paragraph(p) => p,
                _ => unreachable!(),
            },
            9000.0,
            240.0,
        );
        let mut measures = HashMap::new();
        measures.insert(1, measure);

        let layout = pack_pages(&[b], &measures, &opts).unwrap();
        assert_eq!(layout.pages.len(), 1);
        assert_eq!(layout.pages[0].fragments.len(), 1);
    }

    #[test]
    fn incremental_layout_reuses_unchanged_block_measure() {
        let opts = LayoutOptions::default();
        let b = block(1, "hello");
        let measure = default_measure_fn(
            match &b.kind {
                FlowBlockKind::Paragraph(p) => p,
                _ => unreachable!(),
            },
            9000.0,
            240.0,
        );
        let mut prev_measures = HashMap::new();
        prev_measures.insert(1, measure);

        let mut remeasure_calls = 0;
        let (_, measures) = incremental_layout(&[b.clone()], &prev_measures, &[b], &opts, |_, _, _| {
            remeasure_calls += 1;
            None
        })
        .unwrap();

        assert_eq!(remeasure_calls, 0);
        assert!(measures.contains_key(&1));
    }
}
