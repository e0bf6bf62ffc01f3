use crate::error::IngestError;
use crate::models::DocumentExtraction;
use lopdf::Document;
use regex::Regex;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

/// One detected table; `None` marks a cell the row did not have.
#[derive(Debug, Clone, PartialEq)]
pub struct PageTable {
    pub page: u32,
    pub rows: Vec<Vec<Option<String>>>,
}

pub trait PdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError>;

    fn extract_tables(&self, path: &Path) -> Result<Vec<PageTable>, IngestError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl LopdfExtractor {
    fn load(path: &Path) -> Result<Document, IngestError> {
        Document::load(path).map_err(|error| IngestError::PdfParse(error.to_string()))
    }

    fn page_texts(document: &Document) -> Result<Vec<PageText>, IngestError> {
        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| IngestError::PdfParse(error.to_string()))?;
            pages.push(PageText {
                number: page_no,
                text,
            });
        }
        Ok(pages)
    }
}

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, IngestError> {
        let document = Self::load(path)?;
        let pages = Self::page_texts(&document)?;

        if pages.iter().all(|page| page.text.trim().is_empty()) {
            warn!(path = %path.display(), "pdf had no readable page text");
        }

        Ok(pages)
    }

    fn extract_tables(&self, path: &Path) -> Result<Vec<PageTable>, IngestError> {
        let document = Self::load(path)?;
        let mut tables = Vec::new();

        for page in Self::page_texts(&document)? {
            for rows in detect_tables(&page.text)? {
                tables.push(PageTable {
                    page: page.number,
                    rows,
                });
            }
        }

        Ok(tables)
    }
}

const CELL_SEPARATOR: &str = r"\t+|[ ]*\|[ ]*|[ ]{2,}";

fn split_cells(separator: &Regex, line: &str) -> Option<Vec<String>> {
    let trimmed = line.trim().trim_matches('|').trim();
    if trimmed.is_empty() {
        return None;
    }

    let cells: Vec<String> = separator
        .split(trimmed)
        .map(|cell| cell.trim().to_string())
        .collect();

    (cells.len() >= 2).then_some(cells)
}

/// Finds column-aligned runs in page text.
///
/// Two or more consecutive lines that each split into at least two cells form
/// a table. Narrow rows are padded to the widest row with missing cells.
pub fn detect_tables(page_text: &str) -> Result<Vec<Vec<Vec<Option<String>>>>, IngestError> {
    fn flush(run: &mut Vec<Vec<String>>, tables: &mut Vec<Vec<Vec<Option<String>>>>) {
        if run.len() >= 2 {
            let width = run.iter().map(Vec::len).max().unwrap_or_default();
            let rows = run
                .drain(..)
                .map(|cells| {
                    let mut row: Vec<Option<String>> = cells.into_iter().map(Some).collect();
                    row.resize(width, None);
                    row
                })
                .collect();
            tables.push(rows);
        }
        run.clear();
    }

    let separator = Regex::new(CELL_SEPARATOR)?;
    let mut tables = Vec::new();
    let mut run = Vec::new();

    for line in page_text.lines() {
        match split_cells(&separator, line) {
            Some(cells) => run.push(cells),
            None => flush(&mut run, &mut tables),
        }
    }
    flush(&mut run, &mut tables);

    Ok(tables)
}

/// Renders one table row as ` - cellA | cellB | …`.
pub fn flatten_row(row: &[Option<String>]) -> String {
    let cells = row
        .iter()
        .map(|cell| cell.as_deref().map(str::trim).unwrap_or_default())
        .collect::<Vec<_>>();
    format!(" - {}", cells.join(" | "))
}

/// Runs text and table extraction independently and merges what succeeded.
///
/// Page text comes first in page order, then table rows. A failing stage is
/// logged and recorded on the result; it never aborts the caller.
pub fn extract_document<E>(extractor: &E, path: &Path) -> DocumentExtraction
where
    E: PdfExtractor + ?Sized,
{
    let mut text = String::new();
    let mut page_count = 0;
    let mut table_rows = 0;

    let text_failure = match extractor.extract_pages(path) {
        Ok(pages) => {
            page_count = pages.len();
            for page in pages {
                text.push_str(&page.text);
                text.push('\n');
            }
            None
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "error reading text from pdf");
            Some(error.to_string())
        }
    };

    let table_failure = match extractor.extract_tables(path) {
        Ok(tables) => {
            for table in tables {
                for row in &table.rows {
                    text.push_str(&flatten_row(row));
                    text.push('\n');
                    table_rows += 1;
                }
            }
            None
        }
        Err(error) => {
            warn!(path = %path.display(), %error, "error reading tables from pdf");
            Some(error.to_string())
        }
    };

    debug!(
        path = %path.display(),
        pages = page_count,
        table_rows,
        chars = text.chars().count(),
        "extracted document"
    );

    DocumentExtraction {
        path: path.to_path_buf(),
        chars: text.chars().count(),
        text,
        pages: page_count,
        table_rows,
        text_failure,
        table_failure,
    }
}
