//! Library data model: references, document pages and search result shapes.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, ShelfError};

/// One bibliographic entry. `rec_number` is the stable identifier and the
/// only key dependent rows (pages, embeddings) refer to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reference {
    pub rec_number: i64,
    pub ref_type: String,
    pub title: String,
    /// Citation order, surname first where the source provides it.
    #[serde(deserialize_with = "string_list")]
    pub authors: Vec<String>,
    /// Kept as text: sources carry values like "in press" or "2019a".
    pub year: String,
    pub journal: String,
    pub volume: String,
    pub issue: String,
    pub pages: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    #[serde(deserialize_with = "string_list")]
    pub keywords: Vec<String>,
    pub doi: String,
    pub url: String,
    pub publisher: String,
    pub place_published: String,
    pub edition: String,
    pub isbn: String,
    pub label: String,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_path: Option<String>,
}

impl Reference {
    #[must_use]
    pub fn new(rec_number: i64, title: impl Into<String>) -> Self {
        Self {
            rec_number,
            title: title.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn summary(&self) -> ReferenceSummary {
        ReferenceSummary {
            rec_number: self.rec_number,
            title: self.title.clone(),
            authors: short_authors(&self.authors),
            year: self.year.clone(),
            journal: self.journal.clone(),
            ref_type: self.ref_type.clone(),
            doi: self.doi.clone(),
            keywords: self.keywords.clone(),
        }
    }
}

/// Accepts a native list, a JSON-array-encoded string, or null.
fn string_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Encoded(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::List(values)) => values,
        Some(Raw::Encoded(raw)) => parse_string_list(&raw),
        None => Vec::new(),
    })
}

/// Decode a stored JSON array of strings. Anything that is not a JSON array
/// but still carries text is kept as a single element.
#[must_use]
pub fn parse_string_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    serde_json::from_str::<Vec<String>>(trimmed).unwrap_or_else(|_| vec![trimmed.to_string()])
}

/// Display form used in result lists: "Unknown", "A", "A & B" or "A et al.".
#[must_use]
pub fn short_authors(authors: &[String]) -> String {
    match authors {
        [] => "Unknown".to_string(),
        [only] => only.clone(),
        [first, second] => format!("{first} & {second}"),
        [first, ..] => format!("{first} et al."),
    }
}

/// Compact view of a reference returned by every search operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSummary {
    pub rec_number: i64,
    pub title: String,
    pub authors: String,
    pub year: String,
    pub journal: String,
    pub ref_type: String,
    pub doi: String,
    pub keywords: Vec<String>,
}

/// Full record plus the number of document pages indexed for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceDetail {
    #[serde(flatten)]
    pub reference: Reference,
    pub indexed_pages: usize,
}

/// Extracted text of one page, 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPage {
    pub rec_number: i64,
    pub page_number: u32,
    #[serde(alias = "text_content")]
    pub text: String,
}

impl DocumentPage {
    #[must_use]
    pub fn new(rec_number: i64, page_number: u32, text: impl Into<String>) -> Self {
        Self {
            rec_number,
            page_number,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snippet {
    pub page: u32,
    pub snippet: String,
}

/// A reference with its best matching pages, best first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FulltextHit {
    #[serde(flatten)]
    pub summary: ReferenceSummary,
    pub snippets: Vec<Snippet>,
}

/// Which lexical domains matched a combined-search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    Both,
    Metadata,
    Fulltext,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryHit {
    #[serde(flatten)]
    pub summary: ReferenceSummary,
    pub snippets: Vec<Snippet>,
    pub source: MatchSource,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SemanticHit {
    #[serde(flatten)]
    pub summary: ReferenceSummary,
    pub similarity: f32,
}

/// Optional restrictions applied to metadata searches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Inclusive lower bound.
    pub year_from: Option<i32>,
    /// Inclusive upper bound.
    pub year_to: Option<i32>,
    /// Case-insensitive substring of any author.
    pub author: Option<String>,
    /// Case-insensitive substring of the type tag.
    pub ref_type: Option<String>,
}

impl SearchFilters {
    #[must_use]
    pub fn years(mut self, from: Option<i32>, to: Option<i32>) -> Self {
        self.year_from = from;
        self.year_to = to;
        self
    }

    #[must_use]
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    #[must_use]
    pub fn ref_type(mut self, ref_type: impl Into<String>) -> Self {
        self.ref_type = Some(ref_type.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LibraryStats {
    pub total_references: usize,
    pub total_pages: usize,
    pub references_with_pages: usize,
    pub references_with_embeddings: usize,
}

/// Parse a comma-separated identifier list such as `"12, 45,78"`.
///
/// Empty segments are ignored; any non-integer segment rejects the whole
/// list so callers can tell a typo apart from "nothing matched".
pub fn parse_rec_numbers(input: &str) -> Result<Vec<i64>> {
    let numbers = input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>().map_err(|_| {
                ShelfError::MalformedInput(format!(
                    "invalid record number {part:?}; use comma-separated integers (e.g. 12,45,78)"
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if numbers.is_empty() {
        return Err(ShelfError::MalformedInput(
            "no record numbers provided".to_string(),
        ));
    }
    Ok(numbers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_authors() {
        assert_eq!(short_authors(&[]), "Unknown");
        assert_eq!(short_authors(&["Smith, J.".to_string()]), "Smith, J.");
        assert_eq!(
            short_authors(&["Smith, J.".to_string(), "Jones, M.".to_string()]),
            "Smith, J. & Jones, M."
        );
        let many: Vec<String> = ["A", "B", "C", "D"].iter().map(ToString::to_string).collect();
        assert_eq!(short_authors(&many), "A et al.");
    }

    #[test]
    fn test_reference_accepts_native_and_encoded_lists() {
        let native: Reference = serde_json::from_str(
            r#"{"rec_number": 1, "authors": ["A", "B"], "keywords": ["x"]}"#,
        )
        .unwrap();
        assert_eq!(native.authors, vec!["A", "B"]);

        let encoded: Reference = serde_json::from_str(
            r#"{"rec_number": 2, "authors": "[\"A\", \"B\"]", "keywords": "[]"}"#,
        )
        .unwrap();
        assert_eq!(encoded.authors, vec!["A", "B"]);
        assert!(encoded.keywords.is_empty());

        let null: Reference =
            serde_json::from_str(r#"{"rec_number": 3, "authors": null}"#).unwrap();
        assert!(null.authors.is_empty());
    }

    #[test]
    fn test_reference_abstract_field_name() {
        let reference: Reference =
            serde_json::from_str(r#"{"rec_number": 1, "abstract": "About things."}"#).unwrap();
        assert_eq!(reference.abstract_text, "About things.");
        let json = serde_json::to_value(&reference).unwrap();
        assert_eq!(json["abstract"], "About things.");
    }

    #[test]
    fn test_parse_string_list_fallbacks() {
        assert!(parse_string_list("").is_empty());
        assert_eq!(parse_string_list(r#"["a","b"]"#), vec!["a", "b"]);
        assert_eq!(parse_string_list("Smith, J."), vec!["Smith, J."]);
    }

    #[test]
    fn test_parse_rec_numbers() {
        assert_eq!(parse_rec_numbers("12, 45,78").unwrap(), vec![12, 45, 78]);
        assert_eq!(parse_rec_numbers("1,,2,").unwrap(), vec![1, 2]);
        assert!(matches!(
            parse_rec_numbers("1,two"),
            Err(ShelfError::MalformedInput(_))
        ));
        assert!(matches!(
            parse_rec_numbers(" , "),
            Err(ShelfError::MalformedInput(_))
        ));
    }
}
