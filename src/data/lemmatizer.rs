// ============================================================
// Layer 4 - Noun Lemmatizer
// ============================================================
// A dictionary-free approximation of WordNet's noun morphology:
// irregular plurals come from a small exception table, regular
// plurals lose their inflectional suffix.
//
//   accounts → account      boxes   → box
//   policies → policy       classes → class
//   children → child        status  → status
//
// Tokens of three characters or fewer are never touched.

const EXCEPTIONS: &[(&str, &str)] = &[
    ("children", "child"),
    ("men", "man"),
    ("women", "woman"),
    ("mice", "mouse"),
    ("geese", "goose"),
    ("feet", "foot"),
    ("teeth", "tooth"),
    ("people", "people"),
    ("data", "data"),
    ("news", "news"),
    ("series", "series"),
    ("species", "species"),
    ("means", "means"),
    ("thanks", "thanks"),
];

// Words ending in "s" that are not plural nouns at all
const INVARIANT: &[&str] = &[
    "always", "perhaps", "sometimes", "afterwards", "towards", "besides", "whereas", "nowadays",
];

// Endings that look plural but are not
const PROTECTED_ENDINGS: &[&str] = &["ss", "us", "is", "ous"];

/// Reduce a lowercase token to its singular noun form.
pub fn lemmatize(token: &str) -> String {
    if let Some((_, lemma)) = EXCEPTIONS.iter().find(|(w, _)| *w == token) {
        return (*lemma).to_string();
    }
    if token.chars().count() <= 3 || !token.ends_with('s') || INVARIANT.contains(&token) {
        return token.to_string();
    }
    if PROTECTED_ENDINGS.iter().any(|e| token.ends_with(e)) {
        return token.to_string();
    }

    if let Some(stem) = token.strip_suffix("sses") {
        return format!("{stem}ss");
    }
    if let Some(stem) = token.strip_suffix("ies") {
        if stem.len() >= 2 {
            return format!("{stem}y");
        }
    }
    for suffix in ["xes", "ches", "shes", "zzes"] {
        if token.ends_with(suffix) {
            return token[..token.len() - 2].to_string();
        }
    }
    token[..token.len() - 1].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regular_plurals() {
        assert_eq!(lemmatize("accounts"), "account");
        assert_eq!(lemmatize("policies"), "policy");
        assert_eq!(lemmatize("boxes"), "box");
        assert_eq!(lemmatize("matches"), "match");
        assert_eq!(lemmatize("classes"), "class");
    }

    #[test]
    fn test_adverbs_and_singular_s_words_unchanged() {
        for word in ["always", "perhaps", "series", "thanks", "sometimes"] {
            assert_eq!(lemmatize(word), word);
        }
        // ordinary plurals with similar endings still lose their "s"
        assert_eq!(lemmatize("days"), "day");
        assert_eq!(lemmatize("maps"), "map");
    }

    #[test]
    fn test_non_plurals_unchanged() {
        assert_eq!(lemmatize("status"), "status");
        assert_eq!(lemmatize("business"), "business");
        assert_eq!(lemmatize("analysis"), "analysis");
        assert_eq!(lemmatize("bus"), "bus");
        assert_eq!(lemmatize("click"), "click");
    }

    #[test]
    fn test_irregular_plurals() {
        assert_eq!(lemmatize("children"), "child");
        assert_eq!(lemmatize("women"), "woman");
    }
}
