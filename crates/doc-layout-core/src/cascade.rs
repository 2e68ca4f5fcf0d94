//! Property-map cascade composition (§4.A). Left-to-right, first-writer-wins merges with
//! special handlers for indent (composes by field) and font size (validity + fallback).

use doc_style_defaults::{DEFAULT_FONT_SIZE_HALF_POINTS, is_valid_font_size_half_points};

use crate::model::{IndentProperties, ParagraphProperties, RunProperties};

/// Left-to-right, first-writer-wins merge of paragraph property maps.
///
/// Each `Some` field in an earlier chain entry wins over later ones; indent is merged
/// field-by-field via [`combine_indent_properties`] rather than wholesale.
pub fn combine_properties(chain: &[ParagraphProperties]) -> ParagraphProperties {
    let mut result = ParagraphProperties::default();
    let indents: Vec<IndentProperties> = chain.iter().map(|p| p.indent).collect();

    for props in chain {
        if result.alignment.is_none() {
            result.alignment = props.alignment;
        }
        if result.spacing.before.is_none() {
            result.spacing.before = props.spacing.before;
        }
        if result.spacing.after.is_none() {
            result.spacing.after = props.spacing.after;
        }
        if result.spacing.line.is_none() {
            result.spacing.line = props.spacing.line;
        }
        if result.style_id.is_none() {
            result.style_id = props.style_id.clone();
        }
        if result.numbering.is_none() {
            result.numbering = props.numbering;
        }
    }

    result.indent = combine_indent_properties(&indents);
    result
}

/// Left-to-right, first-writer-wins merge of run property maps, with the font-size special
/// handler applied across the whole chain (not just the first writer) via
/// [`resolve_font_size_with_fallback`] at the call site.
pub fn combine_run_properties(chain: &[RunProperties]) -> RunProperties {
    let mut result = RunProperties::default();
    for props in chain {
        if result.font_family.is_none() {
            result.font_family = props.font_family.clone();
        }
        if result.font_size_half_points.is_none() {
            result.font_size_half_points = props.font_size_half_points;
        }
        if result.bold.is_none() {
            result.bold = props.bold;
        }
        if result.italic.is_none() {
            result.italic = props.italic;
        }
        if result.underline.is_none() {
            result.underline = props.underline;
        }
        if result.strike.is_none() {
            result.strike = props.strike;
        }
        if result.color.is_none() {
            result.color = props.color.clone();
        }
        if result.tracked_change_id.is_none() {
            result.tracked_change_id = props.tracked_change_id.clone();
        }
    }
    result
}

/// Field-by-field first-writer-wins merge of indent properties.
pub fn combine_indent_properties(chain: &[IndentProperties]) -> IndentProperties {
    let mut result = IndentProperties::default();
    for props in chain {
        if result.left.is_none() {
            result.left = props.left;
        }
        if result.right.is_none() {
            result.right = props.right;
        }
        if result.first_line.is_none() {
            result.first_line = props.first_line;
        }
        if result.hanging.is_none() {
            result.hanging = props.hanging;
        }
    }
    result
}

/// OOXML's `w:default="1"` on the "Normal" style inverts precedence of `docDefaults`
/// versus the Normal style. Returns `[defaults, normal]` in the order they should be
/// combined (earlier wins).
pub fn order_defaults_and_normal<T: Clone>(defaults: T, normal_props: T, is_normal_default: bool) -> [T; 2] {
    if is_normal_default {
        [defaults, normal_props]
    } else {
        [normal_props, defaults]
    }
}

/// Copy a fixed allow-list of inline properties from `inline_source` onto `target`,
/// overriding whatever the style cascade produced. Paragraph-level inline overrides are
/// limited to alignment and style id; everything else must come from the cascade.
pub fn apply_inline_overrides(
    mut target: ParagraphProperties,
    inline_source: &ParagraphProperties,
) -> ParagraphProperties {
    if inline_source.alignment.is_some() {
        target.alignment = inline_source.alignment;
    }
    if inline_source.style_id.is_some() {
        target.style_id = inline_source.style_id.clone();
    }
    target
}

/// Copy a fixed allow-list of inline run properties onto `target`.
pub fn apply_inline_run_overrides(mut target: RunProperties, inline_source: &RunProperties) -> RunProperties {
    if inline_source.font_family.is_some() {
        target.font_family = inline_source.font_family.clone();
    }
    if inline_source.font_size_half_points.is_some() {
        target.font_size_half_points = inline_source.font_size_half_points;
    }
    if inline_source.bold.is_some() {
        target.bold = inline_source.bold;
    }
    if inline_source.italic.is_some() {
        target.italic = inline_source.italic;
    }
    if inline_source.underline.is_some() {
        target.underline = inline_source.underline;
    }
    if inline_source.strike.is_some() {
        target.strike = inline_source.strike;
    }
    if inline_source.color.is_some() {
        target.color = inline_source.color.clone();
    }
    target
}

/// Return `size` if it is a valid half-point font size; otherwise the first valid size
/// among `defaults` then `normal`; otherwise the half-point constant default.
pub fn resolve_font_size_with_fallback(
    size: Option<u32>,
    defaults: Option<u32>,
    normal: Option<u32>,
) -> u32 {
    if is_valid_font_size_half_points(size) {
        return size.expect("checked by is_valid_font_size_half_points");
    }
    if is_valid_font_size_half_points(defaults) {
        return defaults.expect("checked by is_valid_font_size_half_points");
    }
    if is_valid_font_size_half_points(normal) {
        return normal.expect("checked by is_valid_font_size_half_points");
    }
    DEFAULT_FONT_SIZE_HALF_POINTS
}
