// Heuristic matchers over a token stream

use super::lexer::Token;
use std::collections::HashSet;

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2099;

/// An uppercase ASCII letter followed only by lowercase ASCII letters.
pub fn is_capitalized_word(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {}
        _ => return false,
    }
    let rest = chars.as_str();
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_lowercase())
}

/// Exactly one whitespace character.
fn is_single_space(gap: &str) -> bool {
    let mut chars = gap.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_whitespace())
}

fn candidate<'a>(token: Option<&Token<'a>>, ignored: &HashSet<String>) -> Option<&'a str> {
    match token {
        Some(Token::Word(w)) if is_capitalized_word(w) && !ignored.contains(&w.to_lowercase()) => {
            Some(*w)
        }
        _ => None,
    }
}

/// Capitalized words, or pairs of capitalized words separated by a single
/// whitespace character, case-folded and in order of first appearance.
///
/// `ignored` holds lowercase words that never count as capitalized words.
pub fn country_candidates(tokens: &[Token<'_>], ignored: &HashSet<String>) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let Some(first) = candidate(tokens.get(i), ignored) else {
            i += 1;
            continue;
        };

        let second = match tokens.get(i + 1) {
            Some(Token::Gap(g)) if is_single_space(g) => candidate(tokens.get(i + 2), ignored),
            _ => None,
        };

        let name = match second {
            Some(second) => {
                i += 3;
                format!("{} {}", first, second)
            }
            None => {
                i += 1;
                first.to_string()
            }
        };

        let name = name.to_lowercase();
        if !found.contains(&name) {
            found.push(name);
        }
    }
    found
}

/// Whole four-digit words within [`MIN_YEAR`, `MAX_YEAR`], in order.
pub fn year_candidates(tokens: &[Token<'_>]) -> Vec<i32> {
    tokens
        .iter()
        .filter_map(|token| match token {
            Token::Word(w) if w.len() == 4 && w.bytes().all(|b| b.is_ascii_digit()) => {
                w.parse::<i32>().ok()
            }
            _ => None,
        })
        .filter(|year| (MIN_YEAR..=MAX_YEAR).contains(year))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::lexer::tokenize;

    fn no_ignored() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn test_is_capitalized_word() {
        assert!(is_capitalized_word("China"));
        assert!(!is_capitalized_word("china"));
        assert!(!is_capitalized_word("USA"));
        assert!(!is_capitalized_word("C"));
        assert!(!is_capitalized_word("McDonald"));
        assert!(!is_capitalized_word("Côte"));
    }

    #[test]
    fn test_single_and_paired_candidates() {
        let tokens = tokenize("Compare United States with China");
        let found = country_candidates(&tokens, &no_ignored());
        assert_eq!(found, vec!["compare united", "states", "china"]);
    }

    #[test]
    fn test_ignored_words_break_pairs() {
        let ignored: HashSet<String> = ["compare".to_string()].into_iter().collect();
        let tokens = tokenize("Compare United States with China");
        let found = country_candidates(&tokens, &ignored);
        assert_eq!(found, vec!["united states", "china"]);
    }

    #[test]
    fn test_pair_requires_single_whitespace() {
        let tokens = tokenize("China  India, Japan");
        let found = country_candidates(&tokens, &no_ignored());
        assert_eq!(found, vec!["china", "india", "japan"]);
    }

    #[test]
    fn test_candidates_deduplicated() {
        let tokens = tokenize("Chad and Chad");
        assert_eq!(country_candidates(&tokens, &no_ignored()), vec!["chad"]);
    }

    #[test]
    fn test_unknown_capitalized_phrase_is_still_candidate() {
        let tokens = tokenize("data for Atlantis");
        assert_eq!(country_candidates(&tokens, &no_ignored()), vec!["atlantis"]);
    }

    #[test]
    fn test_year_candidates_bounds() {
        let tokens = tokenize("1899 1900 2099 2100 20015 2001s 1999");
        assert_eq!(year_candidates(&tokens), vec![1900, 2099, 1999]);
    }

    #[test]
    fn test_year_candidates_keep_order() {
        let tokens = tokenize("from 2015 to 2001");
        assert_eq!(year_candidates(&tokens), vec![2015, 2001]);
    }
}
