//! Sample library used across unit, integration and CLI tests.
//!
//! Five references on cultural capital and qualitative method. Reference 1
//! mentions "habitus" only in its page text, reference 5 only in metadata;
//! both pages of reference 2 discuss grounded theory.

use std::path::PathBuf;

use serde_json::json;
use tempfile::TempDir;

use crate::app::AppContext;
use crate::config::Config;
use crate::model::{DocumentPage, Reference};
use crate::storage::Database;

fn reference(
    rec_number: i64,
    ref_type: &str,
    title: &str,
    authors: &[&str],
    year: &str,
    keywords: &[&str],
) -> Reference {
    let mut r = Reference::new(rec_number, title);
    r.ref_type = ref_type.to_string();
    r.authors = authors.iter().map(ToString::to_string).collect();
    r.year = year.to_string();
    r.keywords = keywords.iter().map(ToString::to_string).collect();
    r
}

#[must_use]
pub fn sample_references() -> Vec<Reference> {
    let mut dimaggio = reference(
        1,
        "Journal Article",
        "Cultural Capital and School Success",
        &["DiMaggio, Paul"],
        "1982",
        &["cultural capital", "education"],
    );
    dimaggio.journal = "American Sociological Review".to_string();
    dimaggio.abstract_text =
        "Examines the effect of cultural capital on the grades of high school students."
            .to_string();
    dimaggio.doi = "10.2307/2094962".to_string();

    let mut glaser = reference(
        2,
        "Book",
        "The Discovery of Grounded Theory",
        &["Glaser, Barney", "Strauss, Anselm"],
        "1967",
        &["qualitative methods", "grounded theory"],
    );
    glaser.publisher = "Aldine".to_string();
    glaser.abstract_text =
        "Strategies for generating theory from data in qualitative research.".to_string();

    let mut seidman = reference(
        3,
        "Book",
        "Interviewing as Qualitative Research",
        &["Seidman, Irving"],
        "2013",
        &["interviews", "qualitative methods"],
    );
    seidman.abstract_text = "A guide for researchers in education and the social sciences."
        .to_string();

    let mut coleman = reference(
        4,
        "Journal Article",
        "Social Capital in the Creation of Human Capital",
        &["Coleman, James S."],
        "1988",
        &["social capital", "education"],
    );
    coleman.journal = "American Journal of Sociology".to_string();

    let mut bourdieu = reference(
        5,
        "Book Section",
        "The Forms of Capital",
        &["Bourdieu, Pierre"],
        "1986",
        &["cultural capital", "social capital", "habitus"],
    );
    bourdieu.abstract_text =
        "Distinguishes economic, cultural and social capital and their conversion.".to_string();

    vec![dimaggio, glaser, seidman, coleman, bourdieu]
}

#[must_use]
pub fn sample_pages() -> Vec<DocumentPage> {
    vec![
        DocumentPage::new(
            1,
            1,
            "Students from families rich in cultural capital receive higher grades.",
        ),
        DocumentPage::new(
            1,
            2,
            "Participation in elite status culture is shaped by the habitus of the home.",
        ),
        DocumentPage::new(
            2,
            1,
            "We argue that grounded theory should be discovered from data.",
        ),
        DocumentPage::new(
            2,
            2,
            "Constant comparison is the core procedure of grounded theory.",
        ),
    ]
}

/// In-memory database holding the sample references and pages.
#[must_use]
pub fn sample_library() -> Database {
    let db = Database::open_in_memory().expect("open in-memory database");
    db.upsert_references(&sample_references())
        .expect("insert sample references");
    for rec_number in [1, 2] {
        let pages: Vec<DocumentPage> = sample_pages()
            .into_iter()
            .filter(|p| p.rec_number == rec_number)
            .collect();
        db.replace_pages(rec_number, &pages).expect("insert sample pages");
    }
    db
}

/// Default configuration over the sample library, human output.
#[must_use]
pub fn sample_context() -> AppContext {
    AppContext::new(Config::default(), sample_library())
}

/// The sample library in the JSON import format.
#[must_use]
pub fn sample_import_json() -> serde_json::Value {
    json!({
        "references": sample_references(),
        "pages": sample_pages(),
    })
}

/// Isolated directory for on-disk databases and import files.
pub struct LibraryFixture {
    pub temp_dir: TempDir,
    pub db_path: PathBuf,
}

impl Default for LibraryFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl LibraryFixture {
    #[must_use]
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("library.db");
        println!("[FIXTURE] Created temp directory: {:?}", temp_dir.path());
        Self { temp_dir, db_path }
    }

    /// Write a file relative to the fixture root.
    #[must_use]
    pub fn create_file(&self, relative_path: &str, content: &str) -> PathBuf {
        let full_path = self.temp_dir.path().join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&full_path, content).expect("Failed to write file");
        full_path
    }

    /// Write the sample library as an import file and return its path.
    #[must_use]
    pub fn write_sample_import(&self) -> PathBuf {
        let body = serde_json::to_string_pretty(&sample_import_json())
            .expect("serialize sample import");
        self.create_file("import.json", &body)
    }
}
