use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use unicode_segmentation::UnicodeSegmentation;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("punctuation pattern is valid"));

/// NLTK's English stop-word list.
pub const ENGLISH_STOP_WORDS: [&str; 179] = [
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "you're", "you've",
    "you'll", "you'd", "your", "yours", "yourself", "yourselves", "he", "him", "his", "himself",
    "she", "she's", "her", "hers", "herself", "it", "it's", "its", "itself", "they", "them",
    "their", "theirs", "themselves", "what", "which", "who", "whom", "this", "that", "that'll",
    "these", "those", "am", "is", "are", "was", "were", "be", "been", "being", "have", "has",
    "had", "having", "do", "does", "did", "doing", "a", "an", "the", "and", "but", "if", "or",
    "because", "as", "until", "while", "of", "at", "by", "for", "with", "about", "against",
    "between", "into", "through", "during", "before", "after", "above", "below", "to", "from",
    "up", "down", "in", "out", "on", "off", "over", "under", "again", "further", "then", "once",
    "here", "there", "when", "where", "why", "how", "all", "any", "both", "each", "few", "more",
    "most", "other", "some", "such", "no", "nor", "not", "only", "own", "same", "so", "than",
    "too", "very", "s", "t", "can", "will", "just", "don", "don't", "should", "should've", "now",
    "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren", "aren't", "couldn", "couldn't", "didn",
    "didn't", "doesn", "doesn't", "hadn", "hadn't", "hasn", "hasn't", "haven", "haven't", "isn",
    "isn't", "ma", "mightn", "mightn't", "mustn", "mustn't", "needn", "needn't", "shan", "shan't",
    "shouldn", "shouldn't", "wasn", "wasn't", "weren", "weren't", "won", "won't", "wouldn",
    "wouldn't",
];

/// Turns a description into lowercase word tokens with punctuation and stop words removed.
pub struct TextNormalizer {
    stop_words: HashSet<String>,
}

impl TextNormalizer {
    pub fn new() -> Self {
        Self::with_stop_words(ENGLISH_STOP_WORDS.iter().map(|w| w.to_string()))
    }

    pub fn with_stop_words(stop_words: impl IntoIterator<Item = String>) -> Self {
        TextNormalizer {
            stop_words: stop_words.into_iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    /// Adds words on top of the current set, e.g. domain terms from configuration.
    pub fn extend_stop_words(mut self, extra: impl IntoIterator<Item = String>) -> Self {
        self.stop_words
            .extend(extra.into_iter().map(|w| w.to_lowercase()));
        self
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(word)
    }

    /// Tokens in text order, duplicates kept. Lowercasing and punctuation stripping
    /// happen up front; segmentation and stop-word filtering are lazy.
    pub fn tokenize(&self, text: &str) -> Tokens<'_> {
        let cleaned = NON_WORD.replace_all(&text.to_lowercase(), "").into_owned();
        Tokens {
            cleaned,
            pos: 0,
            stop_words: &self.stop_words,
        }
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Tokens<'a> {
    cleaned: String,
    pos: usize,
    stop_words: &'a HashSet<String>,
}

impl Iterator for Tokens<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            // Only word characters and whitespace remain, so resuming segmentation
            // at the end of the previous word yields the same boundaries.
            let rest = &self.cleaned[self.pos..];
            let (start, word) = rest.unicode_word_indices().next()?;
            self.pos += start + word.len();

            if !self.stop_words.contains(word) {
                return Some(word.to_string());
            }
        }
    }
}
