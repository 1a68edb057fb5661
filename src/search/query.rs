//! Compile free-text user queries into FTS5 MATCH expressions.
//!
//! FTS5 has its own query language (`AND`, `NEAR`, `col:`, `*`, quotes).
//! Every term is emitted as a quoted string, so user input is always matched
//! literally and can never produce a syntax error.

/// Implicit-AND expression over every whitespace-separated term.
///
/// Returns `None` when no term carries an alphanumeric character, which
/// callers treat as "nothing to search for".
#[must_use]
pub fn match_all(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .filter(|term| has_token(term))
        .map(quote)
        .collect();
    (!terms.is_empty()).then(|| terms.join(" "))
}

/// OR expression over the given terms. Embedded quotes are removed rather
/// than escaped; multi-word terms stay phrases.
#[must_use]
pub fn match_any<S: AsRef<str>>(terms: &[S]) -> Option<String> {
    let quoted: Vec<String> = terms
        .iter()
        .map(|term| clean(term.as_ref()).replace('"', ""))
        .filter(|term| has_token(term))
        .map(|term| format!("\"{}\"", term.trim()))
        .collect();
    (!quoted.is_empty()).then(|| quoted.join(" OR "))
}

fn has_token(term: &str) -> bool {
    term.chars().any(char::is_alphanumeric)
}

fn quote(term: &str) -> String {
    format!("\"{}\"", clean(term).replace('"', "\"\""))
}

/// Control characters never form tokens; NUL would end the bound text early.
fn clean(term: &str) -> String {
    term.chars().filter(|c| !c.is_control()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_all_quotes_each_term() {
        assert_eq!(
            match_all("cultural capital").as_deref(),
            Some("\"cultural\" \"capital\"")
        );
    }

    #[test]
    fn test_match_all_escapes_quotes_and_operators() {
        assert_eq!(
            match_all("say \"hi").as_deref(),
            Some("\"say\" \"\"\"hi\"")
        );
        assert_eq!(
            match_all("title:foo NEAR bar*").as_deref(),
            Some("\"title:foo\" \"NEAR\" \"bar*\"")
        );
    }

    #[test]
    fn test_match_all_blank_or_punctuation_only() {
        assert_eq!(match_all(""), None);
        assert_eq!(match_all("   \t "), None);
        assert_eq!(match_all("\" * - ()"), None);
        assert_eq!(match_all("- habitus").as_deref(), Some("\"habitus\""));
    }

    #[test]
    fn test_match_any_joins_with_or() {
        assert_eq!(
            match_any(&["social capital", "he said \"no\""]).as_deref(),
            Some("\"social capital\" OR \"he said no\"")
        );
        assert_eq!(match_any::<&str>(&[]), None);
        assert_eq!(match_any(&["\"\""]), None);
    }
}
