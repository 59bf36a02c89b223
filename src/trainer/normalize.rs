//! Text normalization shared by training and querying.

use regex::Regex;
use std::sync::LazyLock;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\w\s]").expect("static pattern")
});

/// Penn Treebank contraction splits. Only the forms without an apostrophe
/// can still occur once punctuation is gone.
static CONTRACTIONS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(can)(not)\b",
        r"\b(gim)(me)\b",
        r"\b(gon)(na)\b",
        r"\b(got)(ta)\b",
        r"\b(lem)(me)\b",
        r"\b(wan)(na)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

/// Lowercase, drop everything that is not a word character or whitespace,
/// split Treebank contractions, then re-join the tokens with single spaces.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut text = NON_WORD.replace_all(&lowered, "").into_owned();
    for pattern in CONTRACTIONS.iter() {
        if pattern.is_match(&text) {
            text = pattern.replace_all(&text, "$1 $2").into_owned();
        }
    }
    tokenize(&text).collect::<Vec<_>>().join(" ")
}

/// Whitespace tokenizer used on already-normalized text.
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split_whitespace()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_lowercases_and_strips_punctuation() {
        assert_eq!(normalize("Hello, World!"), "hello world");
        assert_eq!(normalize("What's up?"), "whats up");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(normalize("  lots \t of\n\nspace  "), "lots of space");
    }

    #[test]
    fn test_keeps_digits_and_underscores() {
        assert_eq!(normalize("Order #42 ships_today."), "order 42 ships_today");
    }

    #[test]
    fn test_keeps_unicode_letters() {
        assert_eq!(normalize("Crème Brûlée!"), "crème brûlée");
    }

    #[test]
    fn test_splits_contractions() {
        assert_eq!(normalize("I cannot go, gonna wait"), "i can not go gon na wait");
        assert_eq!(normalize("Wanna? Gimme that, lemme see. Gotta run"), "wan na gim me that lem me see got ta run");
    }

    #[test]
    fn test_contraction_split_needs_whole_word() {
        assert_eq!(normalize("gonnagle scannot gotten wannabe"), "gonnagle scannot gotten wannabe");
        assert_eq!(normalize("can not"), "can not");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("?!..."), "");
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(text in "[a-zA-Z0-9àéîõüÀÉÎ _,.;:!?'\"\\t\\n-]{0,64}") {
            let once = normalize(&text);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn prop_no_double_spaces(text in "[a-zA-Z ,.!?\\t\\n]{0,64}") {
            let out = normalize(&text);
            prop_assert!(!out.contains("  "));
            prop_assert_eq!(out.trim(), out.as_str());
        }
    }
}
