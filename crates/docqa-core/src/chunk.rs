//! Bounded-size text chunker.
//!
//! Splits extracted document text into passages of at most `max_chars`
//! characters. Two policies are available through [`ChunkMode`]:
//!
//! - **Words** (default): accumulate whitespace-delimited words into a
//!   buffer joined by single spaces. When adding the next word would exceed
//!   `max_chars`, flush the buffer as one chunk and start a new buffer with
//!   that word. A word longer than `max_chars` on its own is hard-split at
//!   character boundaries.
//! - **Fixed**: cut every `max_chars` characters regardless of word
//!   boundaries, trimming each piece.
//!
//! Lengths are measured in `char`s, never bytes, so no cut lands inside a
//! UTF-8 sequence.
//!
//! # Guarantees
//!
//! - Empty or all-whitespace text yields no chunks.
//! - No chunk is empty after trimming, and no chunk exceeds `max_chars`.
//! - The output depends only on `(text, max_chars, mode)`.
//!
//! # Example
//!
//! ```rust
//! use docqa_core::chunk::{chunk_text, ChunkMode};
//!
//! let chunks = chunk_text("alpha beta gamma", 10, ChunkMode::Words);
//! assert_eq!(chunks, vec!["alpha beta", "gamma"]);
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Splitting policy for [`chunk_text`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkMode {
    #[default]
    Words,
    Fixed,
}

impl FromStr for ChunkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "words" => Ok(ChunkMode::Words),
            "fixed" => Ok(ChunkMode::Fixed),
            other => Err(format!(
                "Unknown chunk mode: '{}'. Must be words or fixed.",
                other
            )),
        }
    }
}

impl fmt::Display for ChunkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChunkMode::Words => f.write_str("words"),
            ChunkMode::Fixed => f.write_str("fixed"),
        }
    }
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// `max_chars == 0` is treated as 1.
pub fn chunk_text(text: &str, max_chars: usize, mode: ChunkMode) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    let max_chars = max_chars.max(1);

    match mode {
        ChunkMode::Words => chunk_words(text, max_chars),
        ChunkMode::Fixed => chunk_fixed(text, max_chars),
    }
}

fn chunk_words(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut buf_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !buf.is_empty() {
                chunks.push(std::mem::take(&mut buf));
            }
            let mut pieces = split_chars(word, max_chars);
            // The tail of an oversized word may still share a chunk with
            // the words that follow it.
            let tail = pieces.pop().unwrap_or_default();
            chunks.extend(pieces);
            buf_len = tail.chars().count();
            buf = tail;
            continue;
        }

        let would_be = if buf.is_empty() {
            word_len
        } else {
            buf_len + 1 + word_len
        };

        if would_be > max_chars {
            chunks.push(std::mem::take(&mut buf));
            buf.push_str(word);
            buf_len = word_len;
        } else {
            if !buf.is_empty() {
                buf.push(' ');
            }
            buf.push_str(word);
            buf_len = would_be;
        }
    }

    if !buf.is_empty() {
        chunks.push(buf);
    }

    chunks
}

fn chunk_fixed(text: &str, max_chars: usize) -> Vec<String> {
    split_chars(text, max_chars)
        .into_iter()
        .filter_map(|piece| {
            let trimmed = piece.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
        .collect()
}

/// Cut `s` into consecutive pieces of `max_chars` characters (the last one
/// may be shorter).
fn split_chars(s: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    chars
        .chunks(max_chars)
        .map(|piece| piece.iter().collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn strip_ws(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn test_empty_text() {
        assert!(chunk_text("", 100, ChunkMode::Words).is_empty());
        assert!(chunk_text("", 100, ChunkMode::Fixed).is_empty());
        assert!(chunk_text("  \n\t ", 100, ChunkMode::Words).is_empty());
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_text("Hello, world!", 1000, ChunkMode::Words);
        assert_eq!(chunks, vec!["Hello, world!"]);
    }

    #[test]
    fn test_words_flush_before_overflow() {
        let chunks = chunk_text("aaa bbb ccc ddd", 7, ChunkMode::Words);
        assert_eq!(chunks, vec!["aaa bbb", "ccc ddd"]);
    }

    #[test]
    fn test_words_normalizes_whitespace() {
        let chunks = chunk_text("one\n\ntwo\tthree   four", 100, ChunkMode::Words);
        assert_eq!(chunks, vec!["one two three four"]);
    }

    #[test]
    fn test_words_oversized_word_is_hard_split() {
        let chunks = chunk_text("ab abcdefghij cd", 4, ChunkMode::Words);
        assert_eq!(chunks, vec!["ab", "abcd", "efgh", "ij", "cd"]);
        for c in &chunks {
            assert!(c.chars().count() <= 4);
        }
    }

    #[test]
    fn test_words_oversized_tail_shares_chunk() {
        let chunks = chunk_text("abcdefg h", 5, ChunkMode::Words);
        assert_eq!(chunks, vec!["abcde", "fg h"]);
    }

    #[test]
    fn test_fixed_cuts_through_words() {
        let chunks = chunk_text("abcdefghij", 4, ChunkMode::Fixed);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_fixed_drops_whitespace_pieces() {
        let chunks = chunk_text("abc   def", 3, ChunkMode::Fixed);
        assert_eq!(chunks, vec!["abc", "def"]);
    }

    #[test]
    fn test_2300_chars_three_passages() {
        let text = "abcdefghi ".repeat(230);
        assert_eq!(text.chars().count(), 2300);

        for mode in [ChunkMode::Words, ChunkMode::Fixed] {
            let chunks = chunk_text(&text, 1000, mode);
            assert_eq!(chunks.len(), 3, "mode {}", mode);
            for c in &chunks {
                assert!(c.chars().count() <= 1000);
            }
        }
    }

    #[test]
    fn test_multibyte_utf8_chars() {
        let text = "┌──────┐ │ héllo wörld │ └──────┘";
        for mode in [ChunkMode::Words, ChunkMode::Fixed] {
            let chunks = chunk_text(text, 3, mode);
            assert!(!chunks.is_empty());
            for c in &chunks {
                assert!(c.chars().count() <= 3);
                assert!(!c.trim().is_empty());
            }
        }
    }

    #[test]
    fn test_zero_max_chars_treated_as_one() {
        let chunks = chunk_text("ab", 0, ChunkMode::Fixed);
        assert_eq!(chunks, vec!["a", "b"]);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("words".parse::<ChunkMode>().unwrap(), ChunkMode::Words);
        assert_eq!("fixed".parse::<ChunkMode>().unwrap(), ChunkMode::Fixed);
        assert!("sentences".parse::<ChunkMode>().is_err());
    }

    proptest! {
        #[test]
        fn prop_chunks_bounded_and_nonempty(
            text in "[a-z \n\té]{0,400}",
            max in 1usize..60,
            fixed in any::<bool>(),
        ) {
            let mode = if fixed { ChunkMode::Fixed } else { ChunkMode::Words };
            for c in chunk_text(&text, max, mode) {
                prop_assert!(c.chars().count() <= max);
                prop_assert!(!c.trim().is_empty());
            }
        }

        #[test]
        fn prop_chunks_reconstruct_content(
            text in "[a-zA-Z0-9 \n.,]{0,400}",
            max in 1usize..60,
            fixed in any::<bool>(),
        ) {
            let mode = if fixed { ChunkMode::Fixed } else { ChunkMode::Words };
            let chunks = chunk_text(&text, max, mode);
            prop_assert_eq!(strip_ws(&chunks.concat()), strip_ws(&text));
        }

        #[test]
        fn prop_chunking_is_deterministic(text in ".{0,300}", max in 1usize..80) {
            prop_assert_eq!(
                chunk_text(&text, max, ChunkMode::Words),
                chunk_text(&text, max, ChunkMode::Words)
            );
            prop_assert_eq!(
                chunk_text(&text, max, ChunkMode::Fixed),
                chunk_text(&text, max, ChunkMode::Fixed)
            );
        }
    }
}
