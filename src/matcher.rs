/// Fuzzy word matching for OCR output
///
/// OCR on game text is noisy: characters get misread, words get merged or
/// split, and the tail of a word is often cut off by the capture region.
/// The matcher answers one question: is every word of a target phrase
/// "present enough" somewhere in the observed text?

/// Smallest window used by the partial-match path.
const MIN_WINDOW: usize = 3;

/// Check whether `target` is contained in `observed`, tolerating OCR noise.
///
/// Both strings are lower-cased and split on whitespace. The result is true
/// when every target token partially matches at least one observed token.
/// Order is irrelevant and one observed token may satisfy several target
/// tokens. A target with no tokens matches vacuously.
pub fn matches(target: &str, observed: &str) -> bool {
    let target = normalize(target);
    let observed = normalize(observed);
    let observed_tokens = tokens(&observed);

    tokens(&target).into_iter().all(|target_word| {
        observed_tokens
            .iter()
            .any(|text_word| partial_word_match(target_word, text_word))
    })
}

/// Partial-match predicate between one target token and one observed token.
///
/// True if `word` occurs inside `text`, or if some window of `text` that is
/// `max(3, len(word) / 2)` characters long occurs inside `word`. Lengths are
/// counted in characters, not bytes.
pub fn partial_word_match(word: &str, text: &str) -> bool {
    if text.contains(word) {
        return true;
    }

    let min_match_length = MIN_WINDOW.max(word.chars().count() / 2);

    // Char boundaries of `text`, including the end offset.
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();

    bounds
        .windows(min_match_length + 1)
        .any(|w| word.contains(&text[w[0]..w[min_match_length]]))
}

/// Lower-case, collapse whitespace runs to one space and trim.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
}

fn tokens(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// A configured list of target phrases.
///
/// Phrases are normalized once up front. Blank phrases are dropped, so a set
/// built from nothing but whitespace never matches anything.
#[derive(Debug, Clone, Default)]
pub struct PhraseSet {
    phrases: Vec<(String, String)>,
}

impl PhraseSet {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases = phrases
            .into_iter()
            .filter_map(|p| {
                let original = p.as_ref().trim();
                let normalized = normalize(original);
                (!normalized.is_empty()).then(|| (original.to_string(), normalized))
            })
            .collect();

        Self { phrases }
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    /// Return the first configured phrase (in configured order) found in `observed`.
    pub fn first_match(&self, observed: &str) -> Option<&str> {
        if self.phrases.is_empty() {
            return None;
        }

        let observed = normalize(observed);
        self.phrases
            .iter()
            .find(|(_, normalized)| matches(normalized, &observed))
            .map(|(original, _)| original.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.phrases.iter().map(|(original, _)| original.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_containment() {
        assert!(matches("Item Name", "Rare Item Name Found"));
        assert!(matches("Item Name", "item name"));
    }

    #[test]
    fn test_truncation_tolerance() {
        assert!(partial_word_match("hellborne", "hellb"));
        assert!(matches("Hellborne", "Hellb"));
        assert!(matches("Hellborne Helm", "HELLB0RNE Helm"));
    }

    #[test]
    fn test_unrelated_words_fail() {
        assert!(!matches("Item Name", "xyz qrs tuv"));
        assert!(!matches("Hellborne", ""));
    }

    #[test]
    fn test_every_token_required() {
        assert!(!matches("rare item", "this is a rare thing"));
        assert!(matches("rare item", "item of rare quality"));
    }

    #[test]
    fn test_order_does_not_matter() {
        assert!(matches("Name Item", "Rare Item Name Found"));
        assert_eq!(
            matches("a b c", "c b a"),
            matches("c b a", "a b c")
        );
    }

    #[test]
    fn test_case_invariance() {
        let cases = [
            ("Item Name", "Rare Item Name Found"),
            ("Hellborne", "Hellb"),
            ("rare item", "this is a rare thing"),
        ];
        for (target, observed) in cases {
            assert_eq!(
                matches(target, observed),
                matches(&target.to_uppercase(), &observed.to_lowercase())
            );
        }
    }

    #[test]
    fn test_whitespace_invariance() {
        assert_eq!(
            matches("Item Name", "Rare Item Name Found"),
            matches("  Item \t  Name ", "Rare\n\nItem   Name\tFound  ")
        );
        assert!(matches("  Item \t  Name ", "Rare\n\nItem   Name\tFound  "));
    }

    #[test]
    fn test_merged_tokens() {
        // OCR dropped the space between two words
        assert!(matches("Item Name", "ItemName"));
    }

    #[test]
    fn test_short_word_floor() {
        // "of" is too short for the window path; only containment works
        assert!(partial_word_match("of", "ofthe"));
        assert!(!partial_word_match("of", "o"));
        assert!(!partial_word_match("ab", "xa"));
        assert!(!partial_word_match("cat", "ca"));
    }

    #[test]
    fn test_window_longer_than_observed() {
        // min window for "hellborne" is 4, observed token is 3 chars
        assert!(!partial_word_match("hellborne", "hel"));
        assert!(partial_word_match("hellborne", "ellb"));
    }

    #[test]
    fn test_window_found_inside_target() {
        // "amp" window of "ample" occurs in "sample"
        assert!(partial_word_match("sample", "ample"));
        assert!(partial_word_match("sample", "xxampl"));
        assert!(!partial_word_match("sample", "xyzxyz"));
    }

    #[test]
    fn test_empty_target_is_vacuous() {
        assert!(matches("", "anything"));
        assert!(matches("   ", ""));
    }

    #[test]
    fn test_multibyte_text() {
        assert!(matches("Épée", "grande épée"));
        assert!(partial_word_match("épéeforte", "xépée"));
        assert!(!matches("Épée", "ÿÿÿ"));
    }

    #[test]
    fn test_deterministic() {
        for _ in 0..10 {
            assert!(matches("Item Name", "Rare Item Name Found"));
            assert!(!matches("Item Name", "xyz qrs tuv"));
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("  Rare\tItem\n Name "), "rare item name");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_phrase_set_first_match_in_order() {
        let set = PhraseSet::new(["Missing Thing", " Item Name ", "Rare"]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.first_match("Rare Item Name Found"), Some("Item Name"));
        assert_eq!(set.first_match("xyz qrs"), None);
    }

    #[test]
    fn test_phrase_set_drops_blank_phrases() {
        let set = PhraseSet::new(["", "   ", "\t"]);
        assert!(set.is_empty());
        assert_eq!(set.first_match("anything at all"), None);
    }
}
