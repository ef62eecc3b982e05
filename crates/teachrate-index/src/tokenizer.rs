//! Name normalization and prefix token generation.
//!
//! Names go through a tantivy analyzer (simple tokenizer, lowercasing, ASCII
//! folding) and the surviving words are joined by single spaces. Index tokens
//! are bounded-length prefixes of that normalized form.
use tantivy::tokenizer::{AsciiFoldingFilter, LowerCaser, SimpleTokenizer, TextAnalyzer, TokenStream};

pub fn build_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SimpleTokenizer::default())
        .filter(LowerCaser)
        .filter(AsciiFoldingFilter)
        .build()
}

/// Reusable normalizer; holds one analyzer instance.
#[derive(Clone)]
pub struct NameNormalizer {
    analyzer: TextAnalyzer,
}

impl Default for NameNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl NameNormalizer {
    pub fn new() -> Self {
        Self { analyzer: build_analyzer() }
    }

    /// "  Zoë O'Brien " -> "zoe o brien". Punctuation-only input yields "".
    pub fn normalize(&mut self, text: &str) -> String {
        let mut stream = self.analyzer.token_stream(text);
        let mut words: Vec<String> = Vec::new();
        while stream.advance() {
            words.push(stream.token().text.clone());
        }
        words.join(" ")
    }
}

/// CJK ideographs are searchable from any position, since names written in
/// them have no word separators.
pub fn is_cjk_ideograph(c: char) -> bool {
    matches!(
        c as u32,
        0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF | 0x20000..=0x2A6DF | 0x2A700..=0x2EBEF | 0x30000..=0x3134F
    )
}

/// Positions (in chars) where prefix tokens start: the beginning, after
/// every space, and at every CJK ideograph.
fn start_positions(chars: &[char]) -> Vec<usize> {
    (0..chars.len())
        .filter(|&i| i == 0 || chars[i - 1] == ' ' || is_cjk_ideograph(chars[i]))
        .filter(|&i| chars[i] != ' ')
        .collect()
}

/// Every index token for an already-normalized name: the full name plus all
/// prefixes of `min..=max` chars from each start position. Prefixes ending
/// in a space are skipped; the shorter one without it is already present.
pub fn prefix_tokens(normalized: &str, min: usize, max: usize) -> Vec<String> {
    let mut tokens = Vec::new();
    if normalized.is_empty() {
        return tokens;
    }
    tokens.push(normalized.to_string());

    let chars: Vec<char> = normalized.chars().collect();
    for start in start_positions(&chars) {
        let longest = max.min(chars.len() - start);
        for len in min.max(1)..=longest {
            let end = start + len;
            if chars[end - 1] == ' ' {
                continue;
            }
            tokens.push(chars[start..end].iter().collect());
        }
    }
    tokens.sort();
    tokens.dedup();
    tokens
}

/// Cuts a normalized query down to at most `max` chars, dropping a trailing
/// space the cut may leave behind.
pub fn bounded_prefix(normalized: &str, max: usize) -> String {
    let cut: String = normalized.chars().take(max).collect();
    cut.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_diacritics_and_punctuation() {
        let mut n = NameNormalizer::new();
        assert_eq!(n.normalize("  Zoë  O'Brien "), "zoe o brien");
        assert_eq!(n.normalize("LI Wei"), "li wei");
        assert_eq!(n.normalize("-- ."), "");
    }

    #[test]
    fn cjk_names_stay_whole_words() {
        let mut n = NameNormalizer::new();
        assert_eq!(n.normalize("王小明"), "王小明");
    }

    #[test]
    fn prefixes_start_at_word_boundaries() {
        let tokens = prefix_tokens("li wei", 2, 12);
        for t in ["li", "li w", "li we", "li wei", "we", "wei"] {
            assert!(tokens.contains(&t.to_string()), "missing {t}");
        }
        assert!(!tokens.contains(&"li ".to_string()));
        assert!(!tokens.contains(&"l".to_string()));
        assert!(!tokens.contains(&"ei".to_string()));
    }

    #[test]
    fn prefixes_are_bounded_but_full_name_is_kept() {
        let name = "maximiliana vandersloot";
        let tokens = prefix_tokens(name, 2, 12);
        assert!(tokens.contains(&name.to_string()));
        assert!(tokens.iter().filter(|t| t.as_str() != name).all(|t| t.chars().count() <= 12));
        assert!(tokens.contains(&"maximiliana".to_string()));
        assert!(tokens.contains(&"vandersloot".to_string()));
    }

    #[test]
    fn cjk_prefixes_start_at_every_ideograph() {
        let tokens = prefix_tokens("王小明", 2, 12);
        assert_eq!(tokens, vec!["小明".to_string(), "王小".to_string(), "王小明".to_string()]);
    }

    #[test]
    fn bounded_prefix_drops_trailing_space() {
        assert_eq!(bounded_prefix("abcdefghijk lmn", 12), "abcdefghijk");
        assert_eq!(bounded_prefix("li wei", 12), "li wei");
    }
}
