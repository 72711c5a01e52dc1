//! Rough prompt-size estimation.
//!
//! Estimates are only logged. The prompt is never trimmed to fit a budget.

const CHARS_PER_TOKEN: usize = 4;
const TOKENS_PER_WORD_NUM: usize = 4;
const TOKENS_PER_WORD_DEN: usize = 3;

/// Estimated prompt size above which a warning is logged.
///
/// Matches the context window of the default chat model minus the reserved
/// completion.
pub(crate) const LARGE_PROMPT_TOKENS: usize = 15_585;

/// Trait for estimating token counts in text.
pub trait TokenEstimator {
    /// Estimates the number of tokens in the given text.
    fn estimate(&self, text: &str) -> usize;
}

/// Heuristic tuned for English prose.
///
/// Takes the larger of a character-based estimate (~4 chars per token) and a
/// word-based one (~4 tokens per 3 words), which keeps URLs and long words
/// from being undercounted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProseTokenizer;

impl TokenEstimator for ProseTokenizer {
    fn estimate(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }

        let chars = text.chars().count();
        let words = text.split_whitespace().count();

        let char_estimate = chars.div_ceil(CHARS_PER_TOKEN);
        let word_estimate = words
            .saturating_mul(TOKENS_PER_WORD_NUM)
            .div_ceil(TOKENS_PER_WORD_DEN);

        char_estimate.max(word_estimate).max(1)
    }
}

/// Returns true when a prompt of `tokens` is likely to overflow the model's
/// context window.
#[must_use]
pub(crate) const fn is_large_prompt(tokens: usize) -> bool {
    tokens > LARGE_PROMPT_TOKENS
}
