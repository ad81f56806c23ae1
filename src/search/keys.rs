//! Derivation of trie keys and their insertion weights from entity names.

use crate::entity::SearchableEntity;

/// Private-use marker placed in keys before structural separator segments.
///
/// The code point is unassigned, so it can never appear in a valid query.
pub const SEGMENT_DIVIDER: char = '\u{0378}';

/// Skip marker in queries: `a~s` skips lowercase characters up to the next `s`.
pub const SKIP: char = '~';

/// Characters that structure qualified names.
pub const SEPARATORS: [char; 9] = ['.', ',', '(', ')', '<', '>', '/', '[', ']'];

/// Weight of a key that is the entity's complete name.
pub const FULL_KEY_WEIGHT: f64 = 3.0;
/// Weight of a suffix starting at or right after a `.` or `/`.
pub const DIVIDER_SUFFIX_WEIGHT: f64 = 2.5;
/// Weight of a suffix starting at a word start inside a segment.
pub const WORD_SUFFIX_WEIGHT: f64 = 1.25;

pub fn is_separator(c: char) -> bool {
    SEPARATORS.contains(&c)
}

/// The full key an entity is stored under.
pub fn trie_key(entity: &SearchableEntity) -> String {
    join_segments(entity.segments().iter().map(String::as_str))
}

/// Joins qualified-name segments, marking every segment that is a single
/// separator with [`SEGMENT_DIVIDER`], then normalizes spaces.
pub fn join_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    let mut joined = String::new();
    for segment in segments {
        if is_separator_segment(segment) {
            joined.push(SEGMENT_DIVIDER);
        }
        joined.push_str(segment);
    }
    normalize_spaces(&joined)
}

fn is_separator_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if is_separator(c))
}

/// The full key and every weighted suffix of it worth indexing.
///
/// A suffix is kept when it starts at a divider boundary (`.` or `/` on
/// either side) or at a word start: after a separator, `_` or space, or on a
/// separator, an uppercase letter or `_`.
pub fn key_variants(key: &str) -> Vec<(&str, f64)> {
    let mut variants = vec![(key, FULL_KEY_WEIGHT)];
    let mut chars = key.char_indices();
    let Some((_, mut previous)) = chars.next() else {
        return variants;
    };

    for (offset, current) in chars {
        if let Some(weight) = suffix_weight(previous, current) {
            let suffix = &key[offset..];
            if is_useful(suffix) {
                variants.push((suffix, weight));
            }
        }
        previous = current;
    }
    variants
}

fn suffix_weight(previous: char, current: char) -> Option<f64> {
    let is_divider = |c: char| c == '.' || c == '/';
    if is_divider(previous) || is_divider(current) {
        Some(DIVIDER_SUFFIX_WEIGHT)
    } else if is_separator(previous)
        || previous == '_'
        || previous == ' '
        || is_separator(current)
        || current.is_uppercase()
        || current == '_'
    {
        Some(WORD_SUFFIX_WEIGHT)
    } else {
        None
    }
}

/// Whether a key suffix can plausibly be searched for: anything longer than
/// two characters, or shorter text containing a letter or digit.
pub fn is_useful(text: &str) -> bool {
    let mut chars = text.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (None, _, _) => false,
        (Some(_), Some(_), Some(_)) => true,
        _ => text.chars().any(char::is_alphanumeric),
    }
}

/// Collapses whitespace runs to one space and drops spaces that do not sit
/// between two word characters. A space next to [`SKIP`] is kept.
pub(crate) fn normalize_spaces(text: &str) -> String {
    let mut collapsed: Vec<char> = Vec::with_capacity(text.len());
    for c in text.chars() {
        if c.is_whitespace() {
            if collapsed.last() != Some(&' ') {
                collapsed.push(' ');
            }
        } else {
            collapsed.push(c);
        }
    }

    collapsed
        .iter()
        .enumerate()
        .filter(|&(index, &c)| c != ' ' || !is_removable_space(&collapsed, index))
        .map(|(_, &c)| c)
        .collect()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_removable_space(chars: &[char], index: usize) -> bool {
    let before = index.checked_sub(1).map(|i| chars[i]);
    let after = chars.get(index + 1).copied();
    let no_boundary_after = !after.is_some_and(is_word_char) && after != Some(SKIP);
    let no_boundary_before = !before.is_some_and(is_word_char) && before != Some(SKIP);
    no_boundary_after || no_boundary_before
}
