//! Character predicates for [`Regex::CharClass`](super::Regex::CharClass).

use std::fmt::{self, Display, Formatter};

/// A single-character test.
///
/// Predicates form a closed set so that regexes stay value-comparable and the
/// compiled matcher can de-duplicate its predicate table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CharPredicate {
    /// Matches every character.
    Any,
    Whitespace,
    Lowercase,
    Alphanumeric,
    NotAlphanumeric,
    /// Matches exactly this character (case-dependent).
    Exactly(char),
    /// Matches everything except this character.
    Not(char),
    /// A lowercase character that is not the given one.
    LowercaseExcept(char),
    /// Whitespace or any of the listed characters.
    WhitespaceOr(Box<[char]>),
    /// Tests both the lowercase and uppercase mapping of the character.
    CaseFolded(Box<CharPredicate>),
}

impl CharPredicate {
    pub fn test(&self, c: char) -> bool {
        match self {
            Self::Any => true,
            Self::Whitespace => c.is_whitespace(),
            Self::Lowercase => c.is_lowercase(),
            Self::Alphanumeric => c.is_alphanumeric(),
            Self::NotAlphanumeric => !c.is_alphanumeric(),
            Self::Exactly(expected) => c == *expected,
            Self::Not(excluded) => c != *excluded,
            Self::LowercaseExcept(excluded) => c != *excluded && c.is_lowercase(),
            Self::WhitespaceOr(chars) => c.is_whitespace() || chars.contains(&c),
            Self::CaseFolded(inner) => {
                c.to_lowercase().any(|l| inner.test(l)) || c.to_uppercase().any(|u| inner.test(u))
            }
        }
    }

    /// Whether the predicate yields the same answer regardless of the case mode.
    pub const fn is_case_independent(&self) -> bool {
        !matches!(self, Self::Exactly(_))
    }

    /// The predicate to use when matching case-insensitively.
    pub fn ignore_case(self) -> Self {
        if self.is_case_independent() {
            self
        } else {
            Self::CaseFolded(Box::new(self))
        }
    }
}

impl Display for CharPredicate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("."),
            Self::Whitespace => f.write_str("\\s"),
            Self::Lowercase => f.write_str("\\p{javaLowerCase}"),
            Self::Alphanumeric => f.write_str("[\\p{Alnum}]"),
            Self::NotAlphanumeric => f.write_str("[^\\p{Alnum}]"),
            Self::Exactly(c) => write!(f, "\\Q{}\\E", c),
            Self::Not(c) => write!(f, "[^{}]", c),
            Self::LowercaseExcept(c) => write!(f, "[\\p{{javaLowerCase}}&&[^{}]]", c),
            Self::WhitespaceOr(chars) => {
                f.write_str("[\\s")?;
                for c in chars.iter() {
                    write!(f, "{}", c)?;
                }
                f.write_str("]")
            }
            Self::CaseFolded(inner) => write!(f, "(?i:{})", inner),
        }
    }
}
