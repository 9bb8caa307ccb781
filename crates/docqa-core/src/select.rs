//! Adaptive top-k sizing.
//!
//! Longer questions tend to reference more distinct facts, so more
//! candidate passages are requested before outlier filtering. The tiers are
//! keyed on the question's character count:
//!
//! | length | k |
//! |--------|---|
//! | < 50 | 3 |
//! | 50–149 | 5 |
//! | 150–299 | 8 |
//! | ≥ 300 | 10 |

use std::fmt;
use std::str::FromStr;

/// K used when adaptive sizing is turned off and nothing else is configured.
pub const DEFAULT_TOP_K: usize = 5;

/// How many candidates a retrieval requests from the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopK {
    /// Size by question length via [`select_k`].
    #[default]
    Adaptive,
    /// Always request this many.
    Fixed(usize),
}

impl TopK {
    pub fn resolve(&self, question: &str) -> usize {
        match self {
            TopK::Adaptive => select_k(question),
            TopK::Fixed(k) => *k,
        }
    }
}

impl FromStr for TopK {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("adaptive") {
            return Ok(TopK::Adaptive);
        }
        match s.parse::<usize>() {
            Ok(k) if k > 0 => Ok(TopK::Fixed(k)),
            _ => Err(format!(
                "Invalid top_k: '{}'. Must be \"adaptive\" or a positive integer.",
                s
            )),
        }
    }
}

impl fmt::Display for TopK {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopK::Adaptive => f.write_str("adaptive"),
            TopK::Fixed(k) => write!(f, "{}", k),
        }
    }
}

/// Pick k from the question length in characters.
pub fn select_k(question: &str) -> usize {
    match question.chars().count() {
        0..=49 => 3,
        50..=149 => 5,
        150..=299 => 8,
        _ => 10,
    }
}
