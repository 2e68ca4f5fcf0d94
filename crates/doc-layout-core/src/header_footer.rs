//! Header/Footer Layout (§4.D): a secondary layout pass for header/footer content, keyed
//! by section variant and physical page bucket.

use std::collections::HashMap;

use crate::model::{HeaderFooterVariant, Margins, PageSize};

/// Geometry constraints for header/footer content, derived from the first section's page
/// size and margins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeaderFooterConstraints {
    /// Available width (`pageWidth - leftMargin - rightMargin`).
    pub width: f64,
    /// Available header height (`top - headerDistance`).
    pub header_height: f64,
    /// Available footer height (`bottom - footerDistance`).
    pub footer_height: f64,
}

impl HeaderFooterConstraints {
    /// Derive constraints from a section's page size and margins.
    pub fn from_section(page_size: PageSize, margins: Margins) -> Self {
        Self {
            width: (page_size.width - margins.left - margins.right) as f64,
            header_height: (margins.top - margins.header).max(0) as f64,
            footer_height: (margins.bottom - margins.footer).max(0) as f64,
        }
    }
}

/// Select the header/footer variant that applies to physical page `page` in section
/// `section_index`, given the section's `title_pg`/`alternate_headers` flags.
///
/// `first_physical_page_of_section` is the 0-based physical page index where the section
/// begins.
pub fn select_variant(
    page: usize,
    first_physical_page_of_section: usize,
    title_pg: bool,
    alternate_headers: bool,
) -> HeaderFooterVariant {
    let sp = page.saturating_sub(first_physical_page_of_section) + 1;

    if sp == 1 && title_pg {
        return HeaderFooterVariant::First;
    }

    if alternate_headers {
        return if page % 2 == 0 {
            HeaderFooterVariant::Even
        } else {
            HeaderFooterVariant::Odd
        };
    }

    HeaderFooterVariant::Default
}

/// Map a physical page number (1-based display number) to a digit-bucket representative
/// page, used as a fallback when large documents don't have a per-variant sample for the
/// exact page (§4.D).
pub fn digit_bucket(page_number: usize) -> usize {
    match page_number {
        0 => 0,
        1..=9 => 5,
        10..=99 => 50,
        100..=999 => 500,
        _ => 5000,
    }
}

/// Look up a header/footer layout result for a physical page, trying the per-rId path
/// first and falling back to the legacy variant-based path (DESIGN.md Open Question 3:
/// both paths are implemented; single-section renderers may populate only the variant
/// path).
///
/// `by_rid` and `by_variant` are keyed by whatever identifier the caller resolved the
/// header/footer descriptor to (a content id); `rid` is the page's `sectionRefs` entry for
/// the resolved variant, if any.
pub fn resolve_header_footer<'a, T>(
    rid: Option<&str>,
    variant: HeaderFooterVariant,
    by_rid: &'a HashMap<String, T>,
    by_variant: &'a HashMap<HeaderFooterVariant, T>,
) -> Option<&'a T> {
    if let Some(rid) = rid {
        if let Some(result) = by_rid.get(rid) {
            return Some(result);
        }
    }
    by_variant.get(&variant)
}

/// Resolve a page-number-keyed sample (such as a cached header/footer layout keyed by the
/// physical page it was resolved against) with digit-bucket and first-page fallbacks.
pub fn resolve_page_sample<'a, T>(samples: &'a HashMap<usize, T>, page_number: usize) -> Option<&'a T> {
    if let Some(exact) = samples.get(&page_number) {
        return Some(exact);
    }
    if let Some(bucket) = samples.get(&digit_bucket(page_number)) {
        return Some(bucket);
    }
    samples.get(&1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_first_page_of_section_with_title_pg() {
        assert_eq!(select_variant(5, 5, true, false), HeaderFooterVariant::First);
    }

    #[test]
    fn variant_alternate_headers_even_odd() {
        assert_eq!(select_variant(4, 0, false, true), HeaderFooterVariant::Even);
        assert_eq!(select_variant(5, 0, false, true), HeaderFooterVariant::Odd);
    }

    #[test]
    fn variant_defaults_without_flags() {
        assert_eq!(select_variant(3, 0, false, false), HeaderFooterVariant::Default);
    }

    #[test]
    fn digit_bucket_boundaries() {
        assert_eq!(digit_bucket(1), 5);
        assert_eq!(digit_bucket(9), 5);
        assert_eq!(digit_bucket(10), 50);
        assert_eq!(digit_bucket(99), 50);
        assert_eq!(digit_bucket(100), 500);
        assert_eq!(digit_bucket(1000), 5000);
    }

    #[test]
    fn per_rid_wins_over_variant() {
        let mut by_rid = HashMap::new();
        by_rid.insert("rId5".to_string(), "rid-result");
        let mut by_variant = HashMap::new();
        by_variant.insert(HeaderFooterVariant::Default, "variant-result");

        assert_eq!(
            resolve_header_footer(Some("rId5"), HeaderFooterVariant::Default, &by_rid, &by_variant),
            Some(&"rid-result")
        );
        assert_eq!(
            resolve_header_footer(None, HeaderFooterVariant::Default, &by_rid, &by_variant),
            Some(&"variant-result")
        );
    }

    #[test]
    fn page_sample_falls_back_to_bucket_then_first() {
        let mut samples = HashMap::new();
        samples.insert(50, "bucket-50");
        samples.insert(1, "page-1");

        assert_eq!(resolve_page_sample(&samples, 37), Some(&"bucket-50"));
        assert_eq!(resolve_page_sample(&samples, 2000), Some(&"page-1"));
    }
}
