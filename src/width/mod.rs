// Licensed under the Apache License, Version 2.0. See LICENSE.

//! The unicode width oracle: classifies a grapheme cluster as width 0, 1, or 2 under
//! one of two policies. Selected at buffer-creation time and immutable thereafter —
//! see [`WidthPolicy`].

use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Two selectable width policies. Chosen once, at buffer/`TextBuffer`
/// creation, and never switched mid-life without a full re-measurement — callers that
/// need a different policy create a new buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum WidthPolicy {
    /// Delegates straight to `unicode_width`: the classic POSIX `wcwidth` table.
    /// Treats most emoji and ZWJ sequences as narrower than modern terminals render
    /// them (each codepoint measured independently, then summed per cluster).
    Wcwidth,
    /// Modern emoji/ZWJ aware policy (default). Builds on `unicode_width` but folds
    /// an entire grapheme cluster (as segmented by `unicode-segmentation`, UAX #29)
    /// into a single width rather than summing codepoint widths, and special-cases
    /// variation selectors and ZWJ joins so a cluster like "👨‍👩‍👧‍👦" measures as one
    /// width-2 unit instead of the sum of four emoji widths.
    #[default]
    Unicode,
}

const VARIATION_SELECTOR_16: char = '\u{FE0F}';
const VARIATION_SELECTOR_15: char = '\u{FE0E}';
const ZERO_WIDTH_JOINER: char = '\u{200D}';

impl WidthPolicy {
    /// Splits `text` into grapheme clusters (UAX #29) and returns them paired with
    /// their display width under this policy. This is the entry point `draw_text`,
    /// `TextBuffer`, and the view-layer wrap algorithms all funnel through, so the
    /// width semantics can never drift between drawing and wrapping.
    #[must_use]
    pub fn segment<'a>(&self, text: &'a str) -> Vec<(&'a str, u8)> {
        text.graphemes(true)
            .map(|g| (g, self.cluster_width(g)))
            .collect()
    }

    /// Width of a single grapheme cluster (already segmented) under this policy.
    #[must_use]
    pub fn cluster_width(&self, cluster: &str) -> u8 {
        match self {
            WidthPolicy::Wcwidth => wcwidth_cluster(cluster),
            WidthPolicy::Unicode => unicode_cluster(cluster),
        }
    }

    /// Width of a whole string (sum of cluster widths), used for `display_width`
    /// bookkeeping on rope leaves and `TextBuffer` lines.
    #[must_use]
    pub fn str_width(&self, text: &str) -> usize {
        self.segment(text).iter().map(|(_, w)| *w as usize).sum()
    }
}

fn wcwidth_cluster(cluster: &str) -> u8 {
    // `wcwidth` has no notion of grapheme clusters; approximate it by summing the
    // widths of the constituent codepoints, which is exactly what a terminal running
    // a plain wcwidth table does (and why combining emoji look broken under it).
    let w: usize = cluster.chars().map(|c| char_width(c)).sum();
    w.min(2) as u8
}

fn char_width(c: char) -> usize {
    unicode_width::UnicodeWidthChar::width(c).unwrap_or(0)
}

fn unicode_cluster(cluster: &str) -> u8 {
    if cluster.is_empty() {
        return 0;
    }
    // A ZWJ-joined sequence (e.g. family/profession emoji) or a sequence followed by
    // VS16 (emoji presentation) always measures as a single width-2 unit regardless
    // of how many codepoints it's built from.
    if cluster.contains(ZERO_WIDTH_JOINER) || cluster.contains(VARIATION_SELECTOR_16) {
        return 2;
    }
    if cluster.contains(VARIATION_SELECTOR_15) {
        // Text presentation selector forces narrow (width 1) regardless of the base
        // character's default presentation.
        return 1;
    }
    // Regional indicator pairs (flags) are two codepoints, one cluster, width 2.
    let mut chars = cluster.chars();
    if let (Some(a), Some(b)) = (chars.next(), chars.next()) {
        if is_regional_indicator(a) && is_regional_indicator(b) && chars.next().is_none() {
            return 2;
        }
    }
    let w = cluster.width();
    w.min(2) as u8
}

fn is_regional_indicator(c: char) -> bool {
    ('\u{1F1E6}'..='\u{1F1FF}').contains(&c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_width_one() {
        assert_eq!(WidthPolicy::Unicode.cluster_width("a"), 1);
        assert_eq!(WidthPolicy::Wcwidth.cluster_width("a"), 1);
    }

    #[test]
    fn cjk_is_width_two() {
        assert_eq!(WidthPolicy::Unicode.cluster_width("中"), 2);
        assert_eq!(WidthPolicy::Wcwidth.cluster_width("中"), 2);
    }

    #[test]
    fn combining_zwj_sequence_is_one_cluster_width_two() {
        let family = "👨\u{200D}👩\u{200D}👧\u{200D}👦";
        // One grapheme cluster...
        assert_eq!(family.graphemes(true).count(), 1);
        // ...measuring as a single width-2 unit under the modern policy.
        assert_eq!(WidthPolicy::Unicode.cluster_width(family), 2);
    }

    #[test]
    fn flag_regional_indicator_pair_is_width_two() {
        let flag = "\u{1F1FA}\u{1F1F8}"; // US flag
        assert_eq!(flag.graphemes(true).count(), 1);
        assert_eq!(WidthPolicy::Unicode.cluster_width(flag), 2);
    }

    #[test]
    fn zero_width_combining_mark_is_width_zero() {
        // "e" + combining acute accent is one grapheme cluster, display width 1.
        let e_acute = "e\u{0301}";
        assert_eq!(e_acute.graphemes(true).count(), 1);
        assert_eq!(WidthPolicy::Unicode.cluster_width(e_acute), 1);
    }

    #[test]
    fn str_width_sums_clusters() {
        assert_eq!(WidthPolicy::Unicode.str_width("ab中"), 4);
    }
}
