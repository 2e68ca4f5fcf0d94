//! Anchor/Bookmark Index (§4.E): maps bookmark name to page number, built fresh on every
//! successful layout.

use std::collections::HashMap;

use crate::intervals::{EntryId, Interval, IntervalTree};
use crate::model::{Fragment, Layout, Pos};

/// A bookmark's page resolution, precomputed once per layout so the click/navigation path
/// never re-scans fragments.
pub struct AnchorIndex {
    /// name -> page number.
    pages: HashMap<String, usize>,
}

impl AnchorIndex {
    /// Build the index for a layout, given the document's `(name, position)` bookmarks.
    ///
    /// For each bookmark, find the `ParaFragment` whose `[pmStart, pmEnd)` contains the
    /// bookmark position; bookmarks in structural gaps resolve to the page of the nearest
    /// subsequent fragment.
    pub fn build(layout: &Layout, bookmarks: &[(String, Pos)]) -> Self {
        let mut intervals = Vec::new();
        let mut page_of_entry: HashMap<EntryId, usize> = HashMap::new();

        let mut entry_id: EntryId = 0;
        for page in &layout.pages {
            for fragment in &page.fragments {
                if let Fragment::Para { pm_range, .. } = fragment {
                    intervals.push(Interval::new(pm_range.start, pm_range.end.max(pm_range.start + 1), entry_id));
                    page_of_entry.insert(entry_id, page.number);
                    entry_id += 1;
                }
            }
        }

        let tree = IntervalTree::from_intervals(intervals);

        let mut pages = HashMap::with_capacity(bookmarks.len());
        for (name, pos) in bookmarks {
            let resolved = tree
                .first_containing(*pos)
                .or_else(|| tree.first_starting_at_or_after(*pos))
                .and_then(|interval| page_of_entry.get(&interval.entry_id))
                .copied();

            if let Some(page) = resolved {
                pages.insert(name.clone(), page);
            }
        }

        Self { pages }
    }

    /// Look up the page number for a bookmark name.
    pub fn page_for(&self, name: &str) -> Option<usize> {
        self.pages.get(name).copied()
    }

    /// Number of resolved bookmarks.
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// Whether the index is empty.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Fragment, Page, PageSize, Margins, SectionRefs};

    fn page_with_fragment(number: usize, start: Pos, end: Pos) -> Page {
        Page {
            number,
            number_text: (number + 1).to_string(),
            size: PageSize { width: 100, height: 100 },
            margins: Margins::default(),
            landscape: false,
            fragments: vec![Fragment::Para {
                block_id: 1,
                x: 0.0,
                y: 0.0,
                width: 10.0,
                from_line: 0,
                to_line: 1,
                pm_range: start..end,
                marker_width: 0.0,
                continues_from_prev: false,
            }],
            section_index: 0,
            section_refs: SectionRefs::default(),
        }
    }

    #[test]
    fn bookmark_resolves_to_containing_fragment_page() {
        let layout = Layout {
            pages: vec![page_with_fragment(0, 0, 10), page_with_fragment(1, 10, 20)],
            page_size: PageSize { width: 100, height: 100 },
            page_gap: 24.0,
        };

        let index = AnchorIndex::build(&layout, &[("bm1".to_string(), 15)]);
        assert_eq!(index.page_for("bm1"), Some(1));
    }

    #[test]
    fn bookmark_in_structural_gap_falls_back_to_next_fragment() {
        let layout = Layout {
            pages: vec![page_with_fragment(0, 0, 10), page_with_fragment(1, 50, 60)],
            page_size: PageSize { width: 100, height: 100 },
            page_gap: 24.0,
        };

        let index = AnchorIndex::build(&layout, &[("bm1".to_string(), 30)]);
        assert_eq!(index.page_for("bm1"), Some(1));
    }

    #[test]
    fn unresolvable_bookmark_is_absent() {
        let layout = Layout {
            pages: vec![page_with_fragment(0, 0, 10)],
            page_size: PageSize { width: 100, height: 100 },
            page_gap: 24.0,
        };

        let index = AnchorIndex::build(&layout, &[("bm1".to_string(), 50)]);
        assert_eq!(index.page_for("bm1"), None);
    }
}
