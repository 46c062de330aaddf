//! Fuzzy text matching for lesson search.
//!
//! A term matches a candidate when some substring of the candidate is within
//! a small edit distance of the term. Distances count insertions, deletions,
//! substitutions and adjacent transpositions; the score is
//! `1 - distance / term_len`, so with the default threshold of 0.9 a term
//! needs roughly ten characters before a single typo is tolerated.
//!
//! Both sides are normalized first: lowercased, symbols dropped, runs of
//! whitespace collapsed to one space.

use crate::trace_log;

/// Minimum score for a candidate to match.
pub const DEFAULT_THRESHOLD: f64 = 0.9;

/// Lowercase, drop symbols and collapse whitespace.
pub fn normalize(text: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(text.len());
    let mut pending_space = false;
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
        } else if c.is_alphanumeric() {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(c);
        }
    }
    out
}

/// Smallest edit distance between `term` and any substring of `text`.
///
/// Sellers' variant of the optimal-string-alignment distance: the first row
/// is all zeros so a match may start anywhere in `text`, and the minimum of
/// the last row lets it end anywhere.
fn substring_distance(term: &[char], text: &[char]) -> usize {
    if term.is_empty() {
        return 0;
    }
    let width = text.len() + 1;
    // rows i-2, i-1 and i of the DP matrix
    let mut before: Vec<usize> = vec![0; width];
    let mut previous: Vec<usize> = vec![0; width];
    let mut row: Vec<usize> = vec![0; width];

    for i in 1..=term.len() {
        row[0] = i;
        for j in 1..width {
            let cost = usize::from(term[i - 1] != text[j - 1]);
            let mut best = (previous[j - 1] + cost)
                .min(previous[j] + 1)
                .min(row[j - 1] + 1);
            if i > 1 && j > 1 && term[i - 1] == text[j - 2] && term[i - 2] == text[j - 1] {
                best = best.min(before[j - 2] + 1);
            }
            row[j] = best;
        }
        std::mem::swap(&mut before, &mut previous);
        std::mem::swap(&mut previous, &mut row);
    }

    previous.iter().copied().min().unwrap_or(term.len())
}

/// Similarity of `term` to the best-matching part of `candidate`, in `0.0..=1.0`.
pub fn score(term: &str, candidate: &str) -> f64 {
    let term = normalize(term);
    if term.is_empty() {
        return 1.0;
    }
    let candidate = normalize(candidate);
    let distance = substring_distance(&term, &candidate);
    (1.0 - distance as f64 / term.len() as f64).max(0.0)
}

/// Items whose key scores at least `threshold` against `term`, best first.
///
/// Items with equal scores keep their original order.
pub fn search<'a, T, F>(term: &str, items: &'a [T], key: F, threshold: f64) -> Vec<&'a T>
where
    F: Fn(&T) -> String,
{
    let mut scored: Vec<(f64, &T)> = items
        .iter()
        .filter_map(|item| {
            let score = score(term, &key(item));
            (score >= threshold).then_some((score, item))
        })
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    trace_log!(
        "Fuzzy search '{}' matched {} of {} items",
        term,
        scored.len(),
        items.len()
    );
    scored.into_iter().map(|(_, item)| item).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTRO: &str = "Intro Introduction to Async React";
    const TRANSITIONS: &str = "Transitions Coordinating Async";

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize("  Async   React!! ").into_iter().collect::<String>(),
            "async react"
        );
        assert_eq!(normalize("Co-ordinating").into_iter().collect::<String>(), "coordinating");
    }

    #[test]
    fn test_exact_substring_scores_one() {
        assert_eq!(score("async", INTRO), 1.0);
        assert_eq!(score("ASYNC react", INTRO), 1.0);
    }

    #[test]
    fn test_transposition_counts_once() {
        // 11 characters, one swap: 1 - 1/11 > 0.9
        assert!(score("transitoins", TRANSITIONS) >= DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_short_typo_rejected() {
        // 5 characters, one substitution: 0.8
        let value = score("asxnc", INTRO);
        assert!((value - 0.8).abs() < 1e-9);
        assert!(value < DEFAULT_THRESHOLD);
    }

    #[test]
    fn test_search_orders_by_score() {
        let items = ["Suspense Deferred loading", "Transitions Coordinating Async", "Intro Introduction to Async React"];
        let found = search("async react", &items, |s| s.to_string(), 0.5);
        assert_eq!(found.first(), Some(&&"Intro Introduction to Async React"));

        let found = search("async", &items, |s| s.to_string(), DEFAULT_THRESHOLD);
        assert_eq!(found, vec![&items[1], &items[2]]);
    }

    #[test]
    fn test_empty_term_matches_everything() {
        let items = ["a", "b"];
        assert_eq!(search("", &items, |s| s.to_string(), DEFAULT_THRESHOLD).len(), 2);
    }
}
