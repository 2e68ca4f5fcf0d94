//! Style chain resolution (§4.B): walks `basedOn` chains, extracts numbering properties,
//! resolves theme fonts, and produces effective run/paragraph properties.
//!
//! All operations here fail soft: missing nodes resolve to empty/default property maps
//! rather than errors, matching §4.B's "never throw on malformed input".

use std::collections::HashSet;

use doc_style_defaults::{ThemeFontSlot, ThemeFonts};

use crate::cascade::{
    apply_inline_overrides, apply_inline_run_overrides, combine_properties, combine_run_properties,
    resolve_font_size_with_fallback,
};
use crate::model::{
    NumberingProperties, NumberingRegistry, ParagraphProperties, RunProperties, StyleId,
    StyleSheet,
};

/// Walk a `basedOn` chain starting at `style_id`, combining properties root-first.
///
/// The starting style id is seeded into the cycle-detection seen-set before the walk
/// begins (Open Question 1 in DESIGN.md: this is the stricter reading — a style's own id
/// reappearing anywhere in its `basedOn` chain, including immediately, counts as a cycle).
pub fn resolve_style_chain(
    sheet: &StyleSheet,
    style_id: Option<&str>,
    follow_based_on: bool,
) -> ParagraphProperties {
    let Some(style_id) = style_id else {
        return ParagraphProperties::default();
    };
    if style_id == "Normal" {
        return ParagraphProperties::default();
    }

    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    seen.insert(style_id.to_string());

    let mut current = Some(style_id.to_string());
    while let Some(id) = current {
        let Some(style) = sheet.styles.get(&id) else {
            break;
        };
        if let Some(props) = &style.paragraph_properties {
            chain.push(props.clone());
        }

        if !follow_based_on {
            break;
        }

        match &style.based_on {
            Some(next) if !seen.contains(next) => {
                seen.insert(next.clone());
                current = Some(next.clone());
            }
            _ => break,
        }
    }

    chain.reverse();
    combine_properties(&chain)
}

/// Like [`resolve_style_chain`] but for run properties.
pub fn resolve_style_chain_run(
    sheet: &StyleSheet,
    style_id: Option<&str>,
    follow_based_on: bool,
) -> RunProperties {
    let Some(style_id) = style_id else {
        return RunProperties::default();
    };
    if style_id == "Normal" {
        return RunProperties::default();
    }

    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    seen.insert(style_id.to_string());

    let mut current = Some(style_id.to_string());
    while let Some(id) = current {
        let Some(style) = sheet.styles.get(&id) else {
            break;
        };
        if let Some(props) = &style.run_properties {
            chain.push(props.clone());
        }

        if !follow_based_on {
            break;
        }

        match &style.based_on {
            Some(next) if !seen.contains(next) => {
                seen.insert(next.clone());
                current = Some(next.clone());
            }
            _ => break,
        }
    }

    chain.reverse();
    combine_run_properties(&chain)
}

/// `word/styles.xml -> docDefaults -> pPrDefault -> pPr`. Returns the empty map on any
/// missing step.
pub fn get_default_paragraph_properties(sheet: &StyleSheet) -> ParagraphProperties {
    sheet.default_paragraph_properties.clone().unwrap_or_default()
}

/// `word/styles.xml -> docDefaults -> rPrDefault -> rPr`.
pub fn get_default_run_properties(sheet: &StyleSheet) -> RunProperties {
    sheet.default_run_properties.clone().unwrap_or_default()
}

/// Whether the document declares `Normal` as `w:default="1"`.
pub fn is_normal_default(sheet: &StyleSheet) -> bool {
    sheet
        .styles
        .get("Normal")
        .map(|s| s.is_default)
        .unwrap_or(false)
}

/// Resolve numbering properties for a given `(num_id, ilvl)` pair (§4.B
/// `getNumberingProperties`).
///
/// `tries` bounds `w:numStyleLink` resolution to a single hop: a link that points at a
/// style whose own numbering is itself another link is not followed further.
pub fn get_numbering_properties(
    registry: &NumberingRegistry,
    sheet: &StyleSheet,
    ilvl: u32,
    num_id: i64,
    tries: u32,
) -> ParagraphProperties {
    let Some(def) = registry.definitions.get(&num_id) else {
        return ParagraphProperties::default();
    };

    let mut chain = Vec::new();

    let override_props = def
        .level_overrides
        .get(&ilvl)
        .and_then(|lvl| lvl.paragraph_properties.clone());

    let Some(abstract_def) = registry.abstracts.get(&def.abstract_id) else {
        return ParagraphProperties::default();
    };

    if let Some(linked_style) = &abstract_def.num_style_link {
        if tries < 1 {
            if let Some(linked_num_id) = sheet
                .styles
                .get(linked_style)
                .and_then(|s| s.paragraph_properties.as_ref())
                .and_then(|p| p.numbering)
                .and_then(|n| n.num_id)
            {
                return get_numbering_properties(registry, sheet, ilvl, linked_num_id, tries + 1);
            }
        }
    }

    let abstract_props = abstract_def
        .levels
        .get(&ilvl)
        .and_then(|lvl| lvl.paragraph_properties.clone());

    if let Some(p) = abstract_props {
        chain.push(p);
    }
    if let Some(p) = override_props {
        chain.push(p);
    }

    // Reverse `[override, abstract]` before combining so override wins (first-writer-wins).
    chain.reverse();
    combine_properties(&chain)
}

/// Resolve a run's effective font family, substituting the theme typeface when the run
/// references a theme slot and no explicit `ascii` is set more specifically (§4.B
/// `resolveDocxFontFamily`).
pub fn resolve_docx_font_family(
    ascii: Option<&str>,
    ascii_theme: Option<ThemeFontSlot>,
    theme: &ThemeFonts,
    to_css_font_family: Option<&dyn Fn(&str) -> String>,
) -> Option<String> {
    let resolved = match ascii_theme.and_then(|slot| theme.latin(slot)) {
        Some(theme_name) => Some(theme_name.to_string()),
        None => ascii.map(|s| s.to_string()),
    };

    resolved.map(|name| match to_css_font_family {
        Some(transform) => transform(&name),
        None => name,
    })
}

/// Build the run property chain `[defaults, paragraphStyleProps, runStyleProps, inline]`
/// and resolve it, applying the list-number special case and the font-size fallback
/// (§4.B `resolveRunProperties`).
#[allow(clippy::too_many_arguments)]
pub fn resolve_run_properties(
    sheet: &StyleSheet,
    paragraph_style_id: Option<&str>,
    run_style_id: Option<&str>,
    inline_rpr: &RunProperties,
    is_toc_style: bool,
    is_list_number: bool,
    numbering_defined_inline: bool,
    numbering_run_properties: Option<&RunProperties>,
) -> RunProperties {
    let defaults = get_default_run_properties(sheet);
    let paragraph_style_props = resolve_style_chain_run(sheet, paragraph_style_id, true);
    let run_style_props = if is_toc_style {
        RunProperties::default()
    } else {
        resolve_style_chain_run(sheet, run_style_id, true)
    };

    let mut chain = vec![defaults.clone(), paragraph_style_props, run_style_props];

    if is_list_number {
        let mut inline_slot = if numbering_defined_inline {
            inline_rpr.clone()
        } else {
            RunProperties::default()
        };
        inline_slot.underline = None;
        chain.push(inline_slot);
        if let Some(marker_props) = numbering_run_properties {
            chain.push(marker_props.clone());
        }
    } else {
        chain.push(inline_rpr.clone());
    }

    let combined = combine_run_properties(&chain);
    let with_inline = apply_inline_run_overrides(combined, inline_rpr);

    let normal_size = resolve_style_chain_run(sheet, Some("Normal"), true).font_size_half_points;
    let resolved_size = resolve_font_size_with_fallback(
        with_inline.font_size_half_points,
        defaults.font_size_half_points,
        normal_size,
    );

    RunProperties {
        font_size_half_points: Some(resolved_size),
        ..with_inline
    }
}

/// Resolve a paragraph's effective properties (§4.B `resolveParagraphProperties`).
///
/// `override_inline_style_id`: when numbering is active and the numbering definition
/// itself carries a `styleId`, adopt it as the paragraph's effective style id; if it
/// matches the inline numbering exactly, the inline numbering reference is dropped (the
/// style's own numbering takes over). Per DESIGN.md's Open Question 2 decision, this
/// returns a new record rather than mutating `inline_props` in place.
pub fn resolve_paragraph_properties(
    sheet: &StyleSheet,
    inline_props: &ParagraphProperties,
    inside_table: bool,
    override_inline_style_id: bool,
    table_style_id: Option<&str>,
) -> ParagraphProperties {
    let mut inline_props = inline_props.clone();

    let style_id = inline_props.style_id.clone();

    let mut numbering = inline_props.numbering.filter(|n| n.num_id != Some(0));

    let style_props = resolve_style_chain(sheet, style_id.as_deref(), true);
    if numbering.is_none() {
        numbering = style_props.numbering;
    }

    let numbering_props = match numbering {
        Some(n) => {
            let np = get_numbering_properties(&sheet.numbering, sheet, n.ilvl.unwrap_or(0), n.num_id.unwrap_or(0), 0);
            if override_inline_style_id {
                if let Some(np_style) = &np.style_id {
                    inline_props.style_id = Some(np_style.clone());
                    if inline_props.numbering == Some(n) {
                        inline_props.numbering = None;
                    }
                }
            }
            np
        }
        None => ParagraphProperties::default(),
    };

    let table_props = match table_style_id {
        Some(id) => resolve_style_chain(sheet, Some(id), true),
        None => ParagraphProperties::default(),
    };

    let defaults = get_default_paragraph_properties(sheet);
    let style_props = resolve_style_chain(sheet, inline_props.style_id.as_deref(), true);

    let main_chain = [
        defaults.clone(),
        table_props.clone(),
        numbering_props.clone(),
        style_props.clone(),
        inline_props.clone(),
    ];
    let mut final_props = combine_properties(&main_chain);

    let is_list = numbering.is_some();
    let indent_chain: Vec<ParagraphProperties> = if is_list && override_inline_style_id {
        vec![
            defaults.clone(),
            style_props.clone(),
            numbering_props.clone(),
            inline_props.clone(),
        ]
    } else if is_list {
        let style_props_no_based_on = resolve_style_chain(sheet, inline_props.style_id.as_deref(), false);
        vec![
            defaults.clone(),
            numbering_props.clone(),
            style_props_no_based_on,
            inline_props.clone(),
        ]
    } else {
        vec![
            defaults.clone(),
            numbering_props.clone(),
            style_props.clone(),
            inline_props.clone(),
        ]
    };

    final_props.indent = combine_properties(&indent_chain).indent;
    final_props = apply_inline_overrides(final_props, &inline_props);

    if inside_table && inline_props.spacing.before.is_none() && style_props.spacing.before.is_none() {
        final_props.spacing.before = None;
        final_props.spacing.after = None;
        final_props.spacing.line = None;
    }

    final_props
}
