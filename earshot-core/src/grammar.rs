//! Key-phrase grammar compilation.
//!
//! A grammar restricts the decoder to a known phrase list. The trailing
//! `"[unk]"` entry lets out-of-grammar speech surface as an explicit unknown
//! token instead of being forced onto the nearest key phrase.
//!
//! Phrases are not escaped: a phrase containing `"` yields malformed JSON.

use std::fmt;

/// Token appended to every non-empty grammar.
pub const UNKNOWN_TOKEN: &str = "[unk]";

/// Ordered, case-insensitive phrase list supplied at session start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPhraseSet(Vec<String>);

impl KeyPhraseSet {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(phrases.into_iter().map(Into::into).collect())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for KeyPhraseSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter)
    }
}

/// Compiled decoder grammar. Empty means unconstrained decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Grammar(String);

impl Grammar {
    pub fn unconstrained() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compile a phrase set into a grammar string.
///
/// `["Yes", "No"]` compiles to `["yes","no","[unk]"]`.
pub fn compile(phrases: &KeyPhraseSet) -> Grammar {
    if phrases.is_empty() {
        return Grammar::unconstrained();
    }

    let entries: Vec<String> = phrases
        .iter()
        .map(|p| format!("\"{}\"", p.to_lowercase()))
        .chain(std::iter::once(format!("\"{UNKNOWN_TOKEN}\"")))
        .collect();

    Grammar(format!("[{}]", entries.join(",")))
}
