//! Sentence boundary detection

use unicode_segmentation::UnicodeSegmentation;

/// Splits generated text into an ordered, non-overlapping list of sentences
///
/// Implemented for any `Fn(&str) -> Vec<String>` so callers can plug in an
/// external NLP tokenizer without a wrapper type.
pub trait SentenceSplitter {
    fn split(&self, text: &str) -> Vec<String>;
}

impl<F> SentenceSplitter for F
where
    F: Fn(&str) -> Vec<String>,
{
    fn split(&self, text: &str) -> Vec<String> {
        self(text)
    }
}

/// UAX #29 sentence boundaries, with every newline treated as a hard break
#[derive(Debug, Clone, Copy, Default)]
pub struct UnicodeSentenceSplitter;

impl SentenceSplitter for UnicodeSentenceSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        text.split('\n')
            .flat_map(|line| line.split_sentence_bounds())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unicode_splitter() {
        let sentences =
            UnicodeSentenceSplitter.split("Paris is the capital. It has the Eiffel Tower.");
        assert_eq!(
            sentences,
            vec!["Paris is the capital.", "It has the Eiffel Tower."]
        );
    }

    #[test]
    fn test_newline_is_a_boundary() {
        let sentences = UnicodeSentenceSplitter.split("First line\n\nSecond line.");
        assert_eq!(sentences, vec!["First line", "Second line."]);
    }

    #[test]
    fn test_closure_splitter() {
        let by_pipe = |text: &str| -> Vec<String> {
            text.split('|').map(|s| s.to_string()).collect()
        };
        assert_eq!(by_pipe.split("a|b"), vec!["a", "b"]);
    }
}
