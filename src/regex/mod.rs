//! A tiny possessive regex dialect.
//!
//! Every repetition is possessive: a [`Regex::Star`] consumes the longest run
//! its inner pattern accepts and never gives characters back, even when that
//! makes the overall match fail. This is what allows the trie search to prune
//! whole subtrees as soon as a label fails to step.

pub mod compiled;
mod predicate;

use std::fmt::{self, Display, Formatter};

pub use compiled::{CompiledRegex, MatchState, UnsupportedPattern};
pub use predicate::CharPredicate;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Regex {
    /// Exact text.
    Literal(Box<str>),
    /// One character accepted by the predicate.
    CharClass(CharPredicate),
    /// Possessive zero-or-more repetition.
    Star(Box<Regex>),
    /// Parts matched left to right.
    Concatenation(Vec<Regex>),
}

impl Regex {
    pub fn literal(text: impl Into<Box<str>>) -> Self {
        Self::Literal(text.into())
    }

    pub const fn class(predicate: CharPredicate) -> Self {
        Self::CharClass(predicate)
    }

    pub fn star(inner: Self) -> Self {
        Self::Star(Box::new(inner))
    }

    pub fn concat(parts: impl IntoIterator<Item = Self>) -> Self {
        Self::Concatenation(parts.into_iter().collect())
    }

    /// The empty concatenation, which only matches the empty string.
    pub const fn empty() -> Self {
        Self::Concatenation(Vec::new())
    }

    pub const fn is_star(&self) -> bool {
        matches!(self, Self::Star(_))
    }

    /// Whether the pattern matches the whole of `text`.
    pub fn matches(&self, text: &str) -> bool {
        self.matches_at(text, 0) == Some(text.len())
    }

    /// Matches starting at byte offset `start`, returning the end offset.
    pub fn matches_at(&self, text: &str, start: usize) -> Option<usize> {
        match self {
            Self::Literal(literal) => text
                .get(start..)
                .filter(|rest| rest.starts_with(&**literal))
                .map(|_| start + literal.len()),
            Self::CharClass(predicate) => {
                let c = text.get(start..)?.chars().next()?;
                predicate.test(c).then(|| start + c.len_utf8())
            }
            Self::Star(inner) => {
                let mut pos = start;
                while let Some(next) = inner.matches_at(text, pos) {
                    if next == pos {
                        break;
                    }
                    pos = next;
                }
                Some(pos)
            }
            Self::Concatenation(parts) => parts
                .iter()
                .try_fold(start, |pos, part| part.matches_at(text, pos)),
        }
    }

    /// Expands nested concatenations into a flat sequence of leaf patterns.
    pub fn into_flat(self) -> Vec<Self> {
        let mut flat = Vec::new();
        self.flatten_into(&mut flat);
        flat
    }

    fn flatten_into(self, out: &mut Vec<Self>) {
        match self {
            Self::Concatenation(parts) => {
                for part in parts {
                    part.flatten_into(out);
                }
            }
            other => out.push(other),
        }
    }
}

impl Display for Regex {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(literal) => write!(f, "\\Q{}\\E", literal),
            Self::CharClass(predicate) => write!(f, "{}", predicate),
            Self::Star(inner) => write!(f, "({})*+", inner),
            Self::Concatenation(parts) => parts.iter().try_for_each(|part| write!(f, "{}", part)),
        }
    }
}
