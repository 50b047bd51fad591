//! Server-side emoji acceptance rule.
//!
//! An emoji is accepted exactly when it is a single extended grapheme cluster
//! whose every scalar falls in a symbol/pictograph, regional-indicator, or
//! variation-selector class. This is enforced on top of whatever the emoji
//! provider returns, so a misbehaving upstream can never smuggle arbitrary
//! text into an item.

use unicode_segmentation::UnicodeSegmentation;

use super::types::MAX_EMOJI_BYTES;

/// Returns true iff `input` is exactly one valid emoji grapheme cluster.
pub fn is_valid_emoji(input: &str) -> bool {
    if input.is_empty() || input.len() > MAX_EMOJI_BYTES {
        return false;
    }
    if input.graphemes(true).count() != 1 {
        return false;
    }
    if input.chars().any(|c| c.is_ascii_alphabetic()) {
        return false;
    }

    // Keycap sequences ("5\u{FE0F}\u{20E3}") are the only place an ASCII
    // digit, '#', or '*' is permitted.
    let has_keycap = input.chars().any(|c| c == '\u{20E3}');

    input.chars().all(|c| match c {
        '#' | '*' | '0'..='9' => has_keycap,
        _ => is_pictographic_scalar(c),
    })
}

/// Scalar-level class check: symbol and pictograph blocks, regional
/// indicators, joiners, and variation selectors.
fn is_pictographic_scalar(c: char) -> bool {
    matches!(c,
        '\u{200D}'                   // zero-width joiner
        | '\u{20E3}'                 // combining enclosing keycap
        | '\u{2139}'                 // information source
        | '\u{2194}'..='\u{21AA}'    // arrows with emoji presentation
        | '\u{231A}'..='\u{231B}'    // watch, hourglass
        | '\u{2328}'                 // keyboard
        | '\u{23CF}'..='\u{23FA}'    // media control symbols
        | '\u{24C2}'                 // circled M
        | '\u{25A0}'..='\u{25FF}'    // geometric shapes
        | '\u{2600}'..='\u{26FF}'    // miscellaneous symbols
        | '\u{2700}'..='\u{27BF}'    // dingbats
        | '\u{2934}'..='\u{2935}'    // right arrows curving up/down
        | '\u{2B00}'..='\u{2BFF}'    // miscellaneous symbols and arrows
        | '\u{3030}' | '\u{303D}'    // wavy dash, part alternation mark
        | '\u{3297}' | '\u{3299}'    // circled ideographs
        | '\u{FE00}'..='\u{FE0F}'    // variation selectors
        | '\u{1F000}'..='\u{1FAFF}'  // pictographs, emoticons, transport,
                                     // regional indicators, supplemental
        | '\u{1FB00}'..='\u{1FBFF}'  // symbols for legacy computing
    )
}
