/// Approximate tokens per whitespace-separated word for the default estimator.
pub const DEFAULT_TOKENS_PER_WORD: f64 = 1.3;

/// Maps text to an approximate token count.
///
/// Implementations must be deterministic and free of side effects. Any
/// `Fn(&str) -> usize` closure is an estimator, so a model-specific tokenizer
/// can be injected without a wrapper type.
pub trait TokenEstimator {
    fn estimate(&self, text: &str) -> usize;
}

impl<F> TokenEstimator for F
where
    F: Fn(&str) -> usize,
{
    fn estimate(&self, text: &str) -> usize {
        self(text)
    }
}

/// `ceil(word_count * tokens_per_word)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WordCountEstimator {
    tokens_per_word: f64,
}

impl WordCountEstimator {
    /// Non-finite or negative ratios fall back to [`DEFAULT_TOKENS_PER_WORD`].
    #[must_use]
    pub fn with_ratio(tokens_per_word: f64) -> Self {
        let tokens_per_word = if tokens_per_word.is_finite() && tokens_per_word >= 0.0 {
            tokens_per_word
        } else {
            DEFAULT_TOKENS_PER_WORD
        };

        Self { tokens_per_word }
    }

    #[must_use]
    pub fn tokens_per_word(&self) -> f64 {
        self.tokens_per_word
    }
}

impl Default for WordCountEstimator {
    fn default() -> Self {
        Self {
            tokens_per_word: DEFAULT_TOKENS_PER_WORD,
        }
    }
}

impl TokenEstimator for WordCountEstimator {
    fn estimate(&self, text: &str) -> usize {
        let words = text.split_whitespace().count();
        (words as f64 * self.tokens_per_word).ceil() as usize
    }
}
