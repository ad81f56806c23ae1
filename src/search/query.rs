//! Compilation of free-text queries into possessive regexes.
//!
//! A query is a sequence of identifier fragments and separators. Each
//! uppercase letter (or `_`) starts a new word that may be abbreviated, so
//! `IOOBE` finds `IndexOutOfBoundsException`; `~` skips lowercase characters
//! up to the next literal one; a space or separator lets the match cross into
//! the next name segment.

use thiserror::Error;

use super::keys::{SEGMENT_DIVIDER, SKIP, is_separator, normalize_spaces};
use crate::regex::{CharPredicate, Regex};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("query must not contain the segment divider U+0378")]
    SegmentDivider,
}

/// One element of a query part before joining. `NoWhitespace` suppresses the
/// optional whitespace that is otherwise allowed between adjacent elements.
enum Piece {
    NoWhitespace,
    Pattern(Regex),
}

fn any_lowercase() -> Regex {
    Regex::star(Regex::class(CharPredicate::Lowercase))
}

fn optional_divider() -> Regex {
    Regex::star(Regex::literal(SEGMENT_DIVIDER.to_string()))
}

/// Compiles `query` into the regex that trie keys are matched against.
pub fn query_regex(query: &str) -> Result<Regex, QueryError> {
    if query.contains(SEGMENT_DIVIDER) {
        return Err(QueryError::SegmentDivider);
    }
    let mut clean = normalize_spaces(query.trim());
    if let Some(shouted) = clean.strip_suffix("^^") {
        clean = shouted.to_uppercase();
    }
    Ok(regex_for_clean_query(&clean))
}

fn is_insufficient(query: &str) -> bool {
    let mut chars = query.chars();
    match (chars.next(), chars.next()) {
        (None, _) => true,
        (Some(c), None) => is_separator(c) || c == SKIP,
        _ => false,
    }
}

fn regex_for_clean_query(query: &str) -> Regex {
    if is_insufficient(query) {
        return Regex::empty();
    }

    let mut pieces = Vec::new();
    for part in split_parts(query) {
        part_pieces(part.trim(), &mut pieces);
    }

    let mut joined: Vec<Regex> = Vec::with_capacity(pieces.len() * 2);
    let mut previous_allows_whitespace = false;
    for piece in pieces {
        match piece {
            Piece::NoWhitespace => previous_allows_whitespace = false,
            Piece::Pattern(regex) => {
                if previous_allows_whitespace {
                    joined.push(Regex::star(Regex::class(CharPredicate::Whitespace)));
                }
                joined.push(regex);
                previous_allows_whitespace = true;
            }
        }
    }

    let mut flat: Vec<Regex> = joined
        .into_iter()
        .flat_map(Regex::into_flat)
        .skip_while(Regex::is_star)
        .collect();
    flat.push(Regex::star(Regex::class(CharPredicate::Not(SEGMENT_DIVIDER))));
    Regex::Concatenation(flat)
}

/// Splits before and after every separator and space.
fn split_parts(query: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (offset, c) in query.char_indices() {
        if is_separator(c) || c == ' ' {
            if start < offset {
                parts.push(&query[start..offset]);
            }
            let end = offset + c.len_utf8();
            parts.push(&query[offset..end]);
            start = end;
        }
    }
    if start < query.len() {
        parts.push(&query[start..]);
    }
    parts
}

fn part_pieces(part: &str, pieces: &mut Vec<Piece>) {
    let mut chars = part.chars();
    match (chars.next(), chars.next()) {
        // a space between words: the next word may start a new segment
        (None, _) => {
            pieces.push(Piece::NoWhitespace);
            pieces.push(Piece::Pattern(any_lowercase()));
            pieces.push(Piece::NoWhitespace);
            pieces.push(Piece::Pattern(Regex::concat([
                optional_divider(),
                Regex::class(CharPredicate::WhitespaceOr(Box::new(['/', '.']))),
            ])));
        }
        (Some(c), None) if is_separator(c) => {
            pieces.push(Piece::NoWhitespace);
            pieces.push(Piece::Pattern(any_lowercase()));
            pieces.push(Piece::Pattern(Regex::concat([
                optional_divider(),
                Regex::literal(part),
            ])));
        }
        _ => pieces.push(Piece::Pattern(identifier_regex(part))),
    }
}

/// Words start at uppercase letters and `_`; the rest of each word may be
/// left out.
fn identifier_regex(identifier: &str) -> Regex {
    let mut parts = Vec::new();
    for (index, word) in split_words(identifier).into_iter().enumerate() {
        if index > 0 {
            parts.push(any_lowercase());
        }
        parts.push(word_regex(word));
    }
    Regex::Concatenation(parts)
}

fn split_words(identifier: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut start = 0;
    for (offset, c) in identifier.char_indices() {
        if offset > 0 && (c.is_uppercase() || c == '_') {
            words.push(&identifier[start..offset]);
            start = offset;
        }
    }
    words.push(&identifier[start..]);
    words
}

/// `a~s~set` becomes `a`, one or more lowercase non-`s`, `s`, and so on.
fn word_regex(word: &str) -> Regex {
    let mut fragments: Vec<&str> = word.split(SKIP).filter(|f| !f.is_empty()).collect();
    // a leading skip marker must skip at least one character
    if word.starts_with(SKIP) && !fragments.is_empty() {
        fragments.insert(0, "");
    }

    let mut parts = Vec::new();
    for (index, fragment) in fragments.iter().enumerate() {
        if index > 0
            && let Some(next) = fragment.chars().next()
        {
            let skipped = Regex::class(CharPredicate::LowercaseExcept(next));
            parts.push(skipped.clone());
            parts.push(Regex::star(skipped));
        }
        parts.push(Regex::literal(*fragment));
    }
    Regex::Concatenation(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::CompiledRegex;
    use assert2::{check, let_assert};
    use rstest::rstest;

    fn matches(query: &str, key: &str) -> bool {
        let_assert!(Ok(regex) = query_regex(query));
        let_assert!(Ok(matcher) = CompiledRegex::new(&regex, false));
        matcher.matches(key)
    }

    fn matches_ignoring_case(query: &str, key: &str) -> bool {
        let_assert!(Ok(regex) = query_regex(query));
        let_assert!(Ok(matcher) = CompiledRegex::new(&regex, true));
        matcher.matches(key)
    }

    #[test]
    fn test_divider_is_rejected() {
        check!(query_regex("a\u{378}b") == Err(QueryError::SegmentDivider));
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case(".")]
    #[case("~")]
    #[case(" / ")]
    fn test_insufficient_queries_compile_to_empty(#[case] query: &str) {
        let_assert!(Ok(regex) = query_regex(query));
        check!(regex == Regex::empty());
    }

    #[rstest]
    #[case("IOOBE", "IndexOutOfBoundsException", true)]
    #[case("IOOBE", "IndexOutOfBoundsException(String)", true)]
    #[case("IOOBE", "IllegalArgumentException", false)]
    #[case("IOOBE", "IndexOutOfBoundsException\u{378}.getMessage()", false)]
    #[case("HashM", "HashMap", true)]
    #[case("HM", "HashMap", true)]
    #[case("HM", "HashSetMap", false)]
    #[case(".Collector", ".Collectors", true)]
    #[case(".Collector", "Collectors", false)]
    #[case("java.base/...Files", "java.base\u{378}/java.nio.file\u{378}.Files", true)]
    #[case("java.base/...Files", "java.base\u{378}/java.nio.file\u{378}.FileSystems", false)]
    #[case("a~s~set", "abstractset", true)]
    #[case("a~s~set", "abstractSet", false)]
    #[case("List add", "List\u{378}.add(E)", true)]
    #[case("Map.Entry", "Map\u{378}.Entry", true)]
    fn test_case_sensitive_matching(#[case] query: &str, #[case] key: &str, #[case] expected: bool) {
        check!(matches(query, key) == expected);
    }

    #[rstest]
    #[case("math max", "Math\u{378}.max(int,int)", true)]
    #[case("a~s~set", "AbstractSet", true)]
    #[case("a~s~set", "AbstractSequentialList", false)]
    #[case("a~s~set", "AbstractSet\u{378}.AbstractSet()", false)]
    fn test_case_insensitive_matching(
        #[case] query: &str,
        #[case] key: &str,
        #[case] expected: bool,
    ) {
        check!(matches_ignoring_case(query, key) == expected);
    }

    #[test]
    fn test_leading_stars_are_dropped() {
        let_assert!(Ok(Regex::Concatenation(parts)) = query_regex(".Collector"));
        check!(parts.first() == Some(&Regex::literal(".")));
        check!(
            parts.last() == Some(&Regex::star(Regex::class(CharPredicate::Not(SEGMENT_DIVIDER))))
        );
    }

    #[test]
    fn test_shouted_suffix_uppercases_the_query() {
        let_assert!(Ok(shouted) = query_regex("ioobe^^"));
        let_assert!(Ok(plain) = query_regex("IOOBE"));
        check!(shouted == plain);
    }

    #[test]
    fn test_skip_marker_at_word_start() {
        let_assert!(Ok(regex) = query_regex("~set"));
        let_assert!(Ok(matcher) = CompiledRegex::new(&regex, false));
        check!(matcher.matches("xset"));
        check!(!matcher.matches("set"));
        check!(!matcher.matches("sset"));
    }

    #[rstest]
    #[case("Map.Entry", &["Map", ".", "Entry"])]
    #[case("math max", &["math", " ", "max"])]
    #[case("..", &[".", "."])]
    #[case("(int)", &["(", "int", ")"])]
    fn test_split_parts(#[case] query: &str, #[case] expected: &[&str]) {
        check!(split_parts(query) == expected);
    }

    #[rstest]
    #[case("IOOBE", &["I", "O", "O", "B", "E"])]
    #[case("hashCode", &["hash", "Code"])]
    #[case("_value", &["_value"])]
    #[case("MAX_VALUE", &["M", "A", "X", "_", "V", "A", "L", "U", "E"])]
    fn test_split_words(#[case] identifier: &str, #[case] expected: &[&str]) {
        check!(split_words(identifier) == expected);
    }
}
