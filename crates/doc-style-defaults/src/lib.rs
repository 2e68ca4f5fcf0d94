#![warn(missing_docs)]
//! `doc-style-defaults` - data-driven style/theme default helpers for `doc-layout-core`.
//!
//! This crate intentionally stays lightweight and does **not** depend on any document
//! parsing or rendering system. It provides small, serializable structs describing the
//! theme-font slots and numeric defaults a style cascade resolver falls back on when a
//! document doesn't specify them explicitly.

use serde::{Deserialize, Serialize};

/// The default font size, in half-points, used when no size is found anywhere in the
/// cascade (document defaults, named style, or inline run properties).
///
/// OOXML measures font size in half-points; 20 half-points is 10pt.
pub const DEFAULT_FONT_SIZE_HALF_POINTS: u32 = 20;

/// Default inter-page gap (screen pixels) used by the layout engine when laying out a
/// normal scrolling view.
pub const DEFAULT_PAGE_GAP: f64 = 24.0;

/// Inter-page gap used when the viewport is virtualized (pages rendered as placeholders
/// until scrolled into view) and the renderer wants extra visual separation.
pub const DEFAULT_VIRTUALIZED_PAGE_GAP: f64 = 72.0;

/// A slot in a theme's font scheme, as referenced by `w:asciiTheme` et al.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThemeFontSlot {
    /// `a:minorFont` - the theme's body text font.
    Minor,
    /// `a:majorFont` - the theme's heading font.
    Major,
}

/// A resolved theme font scheme: the Latin typeface name for each slot.
///
/// Mirrors `word/theme/theme1.xml -> a:themeElements -> a:fontScheme -> a:{minor,major}Font
/// -> a:latin[@typeface]`. Hosts that don't carry a theme can leave both fields `None`, in
/// which case font resolution falls back to the explicit `ascii` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeFonts {
    /// Latin typeface for the minor (body) font.
    pub minor_latin: Option<String>,
    /// Latin typeface for the major (heading) font.
    pub major_latin: Option<String>,
}

impl ThemeFonts {
    /// Look up the Latin typeface for a given slot.
    pub fn latin(&self, slot: ThemeFontSlot) -> Option<&str> {
        match slot {
            ThemeFontSlot::Minor => self.minor_latin.as_deref(),
            ThemeFontSlot::Major => self.major_latin.as_deref(),
        }
    }
}

/// The abstract numbering format for a list level, as declared on `w:abstractNum/w:lvl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberingFormat {
    /// Arabic decimal numerals: 1, 2, 3, ...
    Decimal,
    /// Lowercase roman numerals: i, ii, iii, ...
    LowerRoman,
    /// Uppercase roman numerals: I, II, III, ...
    UpperRoman,
    /// Lowercase letters: a, b, c, ...
    LowerLetter,
    /// Uppercase letters: A, B, C, ...
    UpperLetter,
    /// Unordered bullet; the level's text is a literal glyph, not a counter.
    Bullet,
    /// No numbering glyph is produced for this level.
    None,
}

impl Default for NumberingFormat {
    fn default() -> Self {
        NumberingFormat::Decimal
    }
}

/// Returns `true` if `size` is a valid half-point font size (OOXML treats 0 and negative
/// values as absent, not as an explicit zero size).
pub fn is_valid_font_size_half_points(size: Option<u32>) -> bool {
    matches!(size, Some(s) if s > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_fonts_latin_lookup() {
        let theme = ThemeFonts {
            minor_latin: Some("Calibri".into()),
            major_latin: Some("Calibri Light".into()),
        };
        assert_eq!(theme.latin(ThemeFontSlot::Minor), Some("Calibri"));
        assert_eq!(theme.latin(ThemeFontSlot::Major), Some("Calibri Light"));
    }

    #[test]
    fn theme_fonts_missing_slot() {
        let theme = ThemeFonts::default();
        assert_eq!(theme.latin(ThemeFontSlot::Minor), None);
    }

    #[test]
    fn font_size_validity() {
        assert!(is_valid_font_size_half_points(Some(20)));
        assert!(!is_valid_font_size_half_points(Some(0)));
        assert!(!is_valid_font_size_half_points(None));
    }

    #[test]
    fn numbering_format_default_is_decimal() {
        assert_eq!(NumberingFormat::default(), NumberingFormat::Decimal);
    }
}
