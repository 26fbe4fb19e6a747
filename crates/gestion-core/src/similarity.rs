//! # Client Name Similarity
//!
//! Detects likely duplicate clients before insert ("Mohamed Alami" vs
//! "mohamed  alamI", "Hassan" vs "Hasan").
//!
//! ```text
//! raw name ──► fold ──► contains? ──yes──► similar
//!                          │ no
//!                          ▼
//!                 levenshtein ≤ threshold ──► similar
//! ```
//!
//! Thresholds: one edit for folded names up to 5 characters, two above.
//! Containment needs the shorter name to have at least 3 characters so
//! that "Al" does not match every "Ali…".

/// Minimum length of the shorter name for a containment match.
const MIN_CONTAINS_LEN: usize = 3;

/// Folds a name for comparison: lowercase, Latin diacritics stripped,
/// whitespace collapsed to single spaces.
pub fn fold_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for word in name.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        for c in word.chars().flat_map(char::to_lowercase) {
            match strip_diacritic(c) {
                Some(plain) => out.push_str(plain),
                None => out.push(c),
            }
        }
    }
    out
}

/// Plain form of a lowercase accented Latin letter.
fn strip_diacritic(c: char) -> Option<&'static str> {
    let plain = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'æ' => "ae",
        'ç' => "c",
        'è' | 'é' | 'ê' | 'ë' => "e",
        'ì' | 'í' | 'î' | 'ï' => "i",
        'ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => "o",
        'œ' => "oe",
        'ù' | 'ú' | 'û' | 'ü' => "u",
        'ý' | 'ÿ' => "y",
        _ => return None,
    };
    Some(plain)
}

/// Levenshtein edit distance over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Returns true when two client names probably denote the same person.
pub fn names_similar(a: &str, b: &str) -> bool {
    let a = fold_name(a);
    let b = fold_name(b);

    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }

    let (short, long) = if a.chars().count() <= b.chars().count() {
        (&a, &b)
    } else {
        (&b, &a)
    };
    if short.chars().count() >= MIN_CONTAINS_LEN && long.contains(short.as_str()) {
        return true;
    }

    let threshold = if long.chars().count() <= 5 { 1 } else { 2 };
    levenshtein(&a, &b) <= threshold
}

/// Filters `candidates` down to the ones similar to `name`.
pub fn find_similar<'a, T, F>(name: &str, candidates: &'a [T], name_of: F) -> Vec<&'a T>
where
    F: Fn(&T) -> &str,
{
    candidates
        .iter()
        .filter(|c| names_similar(name, name_of(*c)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_name() {
        assert_eq!(fold_name("  Éric   LÉVÊQUE "), "eric leveque");
        assert_eq!(fold_name("Ali"), "ali");
        assert_eq!(fold_name("Œuvre Ça"), "oeuvre ca");
        assert_eq!(fold_name("محمد"), "محمد");
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("hassan", "hasan"), 1);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn test_similar_names() {
        assert!(names_similar("Mohamed Alami", "mohamed  ALAMI"));
        assert!(names_similar("Hassan", "Hasan"));
        assert!(names_similar("Youssef", "Youssef Bennani"));
        assert!(names_similar("Hélène", "Helene"));
        assert!(names_similar("Ali", "Aly"));
    }

    #[test]
    fn test_distinct_names() {
        assert!(!names_similar("Ali", "Omar"));
        assert!(!names_similar("Karim", "Samir"));
        // Two-letter names are too short for a containment match
        assert!(!names_similar("Al", "Alexandre"));
        assert!(!names_similar("", "Ali"));
    }

    #[test]
    fn test_find_similar() {
        let names = vec![
            "Hassan".to_string(),
            "Omar".to_string(),
            "Hassan Idrissi".to_string(),
        ];
        let found = find_similar("hassan", &names, |n| n.as_str());
        assert_eq!(found, vec![&names[0], &names[2]]);
    }
}
