/// Split a phrase into tokens.
///
/// The phrase corpus ships pre-tokenized, with punctuation and clitics already separated by
/// spaces, so whitespace splitting recovers the original tokens. Case is preserved.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn splits_pretokenized_phrases() {
        assert_eq!(
            tokenize("A series of escapades , some of which are n't"),
            vec!["A", "series", "of", "escapades", ",", "some", "of", "which", "are", "n't"]
        );
    }

    #[test]
    fn collapses_repeated_whitespace() {
        assert_eq!(tokenize("  good \t  movie\n"), vec!["good", "movie"]);
    }

    #[test]
    fn empty_phrase_has_no_tokens() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   ").is_empty());
    }
}
