use jieba_rs::Jieba;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z0-9_]+").expect("word pattern is valid"));

/// True when `text` holds at least one CJK unified ideograph (U+4E00..=U+9FFF).
pub fn contains_cjk(text: &str) -> bool {
    text.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}

/// Lexical tokenizer shared by corpus building and querying.
///
/// Text with any CJK ideograph goes through jieba in full, including any
/// Latin words it contains. Everything else is lowercased and split into
/// runs of ASCII letters, digits and underscore. The jieba dictionary is
/// loaded on first CJK input only.
#[derive(Default)]
pub struct Tokenizer {
    jieba: OnceCell<Jieba>,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let text = text.trim();
        if text.is_empty() {
            return Vec::new();
        }
        if contains_cjk(text) {
            return self
                .jieba()
                .cut(text, true)
                .into_iter()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }
        let lower = text.to_lowercase();
        WORD_RE.find_iter(&lower).map(|m| m.as_str().to_string()).collect()
    }

    fn jieba(&self) -> &Jieba {
        self.jieba.get_or_init(Jieba::new)
    }
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer").field("jieba_loaded", &self.jieba.get().is_some()).finish()
    }
}
