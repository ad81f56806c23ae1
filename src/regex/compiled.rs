//! Flat instruction form of a [`Regex`] that can be stepped one character at a time.
//!
//! The trie search walks labels character by character and needs to resume
//! matching at every child, so the matcher state must be a small `Copy` value
//! rather than a position in the input.

use super::{CharPredicate, Regex};
use thiserror::Error;

/// Raised when a regex uses a shape outside the compilable subset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported pattern `{pattern}`: {reason}")]
pub struct UnsupportedPattern {
    pub pattern: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Instruction {
    Literal(char),
    Class(u32),
    StarLiteral(char),
    StarClass(u32),
}

impl Instruction {
    const fn is_star(self) -> bool {
        matches!(self, Self::StarLiteral(_) | Self::StarClass(_))
    }
}

/// Opaque matcher state.
///
/// Layout: bits 0..31 hold the instruction index, bit 31 records whether the
/// repetition at that index consumed a character, and bits 32..64 count the
/// repetitions already closed after consuming something. [`MatchState::DEAD`]
/// is all ones and never produced by a live step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatchState(u64);

impl MatchState {
    pub const START: Self = Self(0);
    pub const DEAD: Self = Self(u64::MAX);

    const INDEX_MASK: u64 = (1 << 31) - 1;
    const STAR_MATCHED: u64 = 1 << 31;
    const COUNT_SHIFT: u32 = 32;

    const fn new(index: usize, star_matched: bool, matched_stars: u32) -> Self {
        let flag = if star_matched { Self::STAR_MATCHED } else { 0 };
        Self((index as u64 & Self::INDEX_MASK) | flag | ((matched_stars as u64) << Self::COUNT_SHIFT))
    }

    const fn index(self) -> usize {
        (self.0 & Self::INDEX_MASK) as usize
    }

    const fn star_matched(self) -> bool {
        self.0 & Self::STAR_MATCHED != 0
    }

    const fn matched_stars(self) -> u32 {
        (self.0 >> Self::COUNT_SHIFT) as u32
    }

    /// Whether a match is still possible from this state.
    pub fn is_ok(self) -> bool {
        self != Self::DEAD
    }
}

/// A [`Regex`] compiled to one instruction per literal character, char class
/// reference or repetition.
#[derive(Debug, Clone)]
pub struct CompiledRegex {
    instructions: Box<[Instruction]>,
    predicates: Box<[CharPredicate]>,
    case_insensitive: bool,
    /// Index of the first trailing repetition; reaching it means a match.
    match_end: usize,
    star_count: u32,
}

impl CompiledRegex {
    pub fn new(regex: &Regex, case_insensitive: bool) -> Result<Self, UnsupportedPattern> {
        let mut builder = Builder {
            instructions: Vec::new(),
            predicates: Vec::new(),
            case_insensitive,
        };
        builder.compile(regex)?;

        let Builder {
            instructions,
            predicates,
            ..
        } = builder;
        if instructions.len() as u64 >= MatchState::INDEX_MASK {
            return Err(UnsupportedPattern {
                pattern: regex.to_string(),
                reason: "too many instructions",
            });
        }
        let trailing_stars = instructions
            .iter()
            .rev()
            .take_while(|instruction| instruction.is_star())
            .count();
        let star_count = instructions.iter().filter(|i| i.is_star()).count() as u32;

        Ok(Self {
            match_end: instructions.len() - trailing_stars,
            instructions: instructions.into_boxed_slice(),
            predicates: predicates.into_boxed_slice(),
            case_insensitive,
            star_count,
        })
    }

    pub const fn is_case_insensitive(&self) -> bool {
        self.case_insensitive
    }

    /// Advances the state by one character.
    pub fn step(&self, c: char, state: MatchState) -> MatchState {
        if !state.is_ok() {
            return MatchState::DEAD;
        }
        let mut index = state.index();
        let mut star_matched = state.star_matched();
        let mut matched_stars = state.matched_stars();

        while let Some(&instruction) = self.instructions.get(index) {
            let (accepted, repeat) = match instruction {
                Instruction::Literal(expected) => (self.char_matches(expected, c), false),
                Instruction::Class(predicate) => (self.predicates[predicate as usize].test(c), false),
                Instruction::StarLiteral(expected) => (self.char_matches(expected, c), true),
                Instruction::StarClass(predicate) => (self.predicates[predicate as usize].test(c), true),
            };
            match (accepted, repeat) {
                (true, true) => return MatchState::new(index, true, matched_stars),
                (true, false) => return MatchState::new(index + 1, false, matched_stars),
                (false, false) => return MatchState::DEAD,
                (false, true) => {
                    // close the repetition and retry c on the next instruction
                    matched_stars += u32::from(star_matched);
                    star_matched = false;
                    index += 1;
                }
            }
        }
        MatchState::DEAD
    }

    /// Folds [`step`](Self::step) over every character of `text`.
    pub fn step_through(&self, text: &str, state: MatchState) -> MatchState {
        let mut state = state;
        for c in text.chars() {
            state = self.step(c, state);
            if !state.is_ok() {
                break;
            }
        }
        state
    }

    pub fn is_match(&self, state: MatchState) -> bool {
        state.is_ok() && state.index() >= self.match_end
    }

    pub fn matches(&self, text: &str) -> bool {
        self.is_match(self.step_through(text, MatchState::START))
    }

    pub const fn star_count(&self) -> u32 {
        self.star_count
    }

    /// Number of repetitions that consumed nothing (so far) in this state.
    pub fn empty_star_count(&self, state: MatchState) -> u32 {
        let consumed = state.matched_stars() + u32::from(state.star_matched());
        self.star_count.saturating_sub(consumed)
    }

    /// Match tightness in `0.0..=1.0`, only meaningful when [`is_match`](Self::is_match) holds.
    pub fn grade(&self, state: MatchState) -> f64 {
        if self.star_count == 0 {
            return 1.0;
        }
        f64::from(self.empty_star_count(state)) / f64::from(self.star_count)
    }

    fn char_matches(&self, expected: char, c: char) -> bool {
        expected == c
            || (self.case_insensitive
                && (expected.to_lowercase().eq(c.to_lowercase())
                    || expected.to_uppercase().eq(c.to_uppercase())))
    }
}

struct Builder {
    instructions: Vec<Instruction>,
    predicates: Vec<CharPredicate>,
    case_insensitive: bool,
}

impl Builder {
    fn compile(&mut self, regex: &Regex) -> Result<(), UnsupportedPattern> {
        match regex {
            Regex::Literal(literal) => {
                self.instructions.extend(literal.chars().map(Instruction::Literal));
            }
            Regex::CharClass(predicate) => {
                let id = self.predicate_id(predicate);
                self.instructions.push(Instruction::Class(id));
            }
            Regex::Concatenation(parts) => {
                for part in parts {
                    self.compile(part)?;
                }
            }
            Regex::Star(inner) => {
                let instruction = match inner.as_ref() {
                    Regex::Literal(literal) => match single_char(literal) {
                        Some(c) => Instruction::StarLiteral(c),
                        None => return Err(unsupported(regex, "star over a multi-character literal")),
                    },
                    Regex::CharClass(predicate) => Instruction::StarClass(self.predicate_id(predicate)),
                    _ => return Err(unsupported(regex, "star over a repeated sub-pattern")),
                };
                self.instructions.push(instruction);
            }
        }
        Ok(())
    }

    fn predicate_id(&mut self, predicate: &CharPredicate) -> u32 {
        let predicate = if self.case_insensitive {
            predicate.clone().ignore_case()
        } else {
            predicate.clone()
        };
        if let Some(existing) = self.predicates.iter().position(|p| *p == predicate) {
            return existing as u32;
        }
        self.predicates.push(predicate);
        (self.predicates.len() - 1) as u32
    }
}

fn single_char(text: &str) -> Option<char> {
    let mut chars = text.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

fn unsupported(regex: &Regex, reason: &'static str) -> UnsupportedPattern {
    UnsupportedPattern {
        pattern: regex.to_string(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::{check, let_assert};
    use rstest::rstest;

    fn lower_star() -> Regex {
        Regex::star(Regex::class(CharPredicate::Lowercase))
    }

    /// `I[a-z]*O[a-z]*O[a-z]*B[a-z]*E[^x]*`
    fn abbreviation() -> CompiledRegex {
        let regex = Regex::concat([
            Regex::literal("I"),
            lower_star(),
            Regex::literal("O"),
            lower_star(),
            Regex::literal("O"),
            lower_star(),
            Regex::literal("B"),
            lower_star(),
            Regex::literal("E"),
            Regex::star(Regex::class(CharPredicate::Not('x'))),
        ]);
        let_assert!(Ok(compiled) = CompiledRegex::new(&regex, false));
        compiled
    }

    #[rstest]
    #[case("IndexOutOfBoundsException", true)]
    #[case("IOOBE", true)]
    #[case("IOOBEx", false)]
    #[case("IndexOutOf", false)]
    #[case("ArrayIndexOutOfBoundsException", false)]
    fn test_step_through(#[case] text: &str, #[case] expected: bool) {
        check!(abbreviation().matches(text) == expected);
    }

    #[test]
    fn test_grade_counts_empty_stars() {
        let compiled = abbreviation();
        check!(compiled.star_count() == 5);

        let tight = compiled.step_through("IOOBE", MatchState::START);
        check!(compiled.is_match(tight));
        check!(compiled.empty_star_count(tight) == 5);
        check!(compiled.grade(tight) == 1.0);

        // four fillers consumed, the trailing star is still open and empty
        let loose = compiled.step_through("IndexOutOfBoundsE", MatchState::START);
        check!(compiled.is_match(loose));
        check!(compiled.empty_star_count(loose) == 1);
        check!(compiled.grade(loose) == 0.2);

        // the open trailing star counts once it consumed something
        let trailing = compiled.step_through("IOOBEs", MatchState::START);
        check!(compiled.empty_star_count(trailing) == 4);
    }

    #[test]
    fn test_grade_without_stars_is_one() {
        let_assert!(Ok(compiled) = CompiledRegex::new(&Regex::literal("Set"), false));
        let state = compiled.step_through("Set", MatchState::START);
        check!(compiled.is_match(state));
        check!(compiled.grade(state) == 1.0);
    }

    #[test]
    fn test_dead_state_is_absorbing() {
        let compiled = abbreviation();
        let dead = compiled.step('x', MatchState::START);
        check!(dead == MatchState::DEAD);
        check!(!dead.is_ok());
        check!(compiled.step('I', dead) == MatchState::DEAD);
        check!(!compiled.is_match(dead));
    }

    #[test]
    fn test_running_past_the_end_is_dead() {
        let_assert!(Ok(compiled) = CompiledRegex::new(&Regex::literal("ab"), false));
        let state = compiled.step_through("ab", MatchState::START);
        check!(compiled.is_match(state));
        check!(compiled.step('c', state) == MatchState::DEAD);
    }

    #[test]
    fn test_case_insensitive() {
        let regex = Regex::concat([
            Regex::literal("math"),
            Regex::star(Regex::class(CharPredicate::Whitespace)),
            Regex::literal("max"),
        ]);
        let_assert!(Ok(sensitive) = CompiledRegex::new(&regex, false));
        let_assert!(Ok(insensitive) = CompiledRegex::new(&regex, true));

        check!(!sensitive.matches("Math max"));
        check!(insensitive.matches("Math max"));
        check!(insensitive.matches("MATHMAX"));
        check!(insensitive.is_case_insensitive());
    }

    #[test]
    fn test_predicates_are_deduplicated() {
        let regex = Regex::concat([lower_star(), Regex::literal("a"), lower_star()]);
        let_assert!(Ok(compiled) = CompiledRegex::new(&regex, false));
        check!(compiled.predicates.len() == 1);
        check!(compiled.instructions.len() == 3);
    }

    #[rstest]
    #[case(Regex::star(Regex::literal("ab")))]
    #[case(Regex::star(Regex::literal("")))]
    #[case(Regex::star(lower_star()))]
    #[case(Regex::concat([Regex::literal("a"), Regex::star(Regex::concat([Regex::literal("b")]))]))]
    fn test_unsupported_patterns(#[case] regex: Regex) {
        let_assert!(Err(error) = CompiledRegex::new(&regex, false));
        check!(error.pattern.ends_with(")*+"));
    }
}
