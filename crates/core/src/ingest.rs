use crate::chunking::{split_text, ChunkingConfig};
use crate::embeddings::Embedder;
use crate::error::{IngestError, SearchError};
use crate::extractor::{extract_document, PdfExtractor};
use crate::index::VectorIndex;
use crate::models::{Chunk, CorpusReport, EmbeddedChunk};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

const DOCUMENT_SEPARATOR: &str = "\n\n";

/// Lists the PDFs directly inside `folder`, ordered by file name.
pub fn discover_pdf_files(folder: &Path) -> Vec<PathBuf> {
    WalkDir::new(folder)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|item| item.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// Extracts every PDF in `folder` and joins the non-empty results into one corpus.
///
/// Unreadable documents are recorded in the report and skipped; only a
/// missing folder is an error.
pub fn build_corpus<E>(folder: &Path, extractor: &E) -> Result<CorpusReport, IngestError>
where
    E: PdfExtractor + ?Sized,
{
    if !folder.is_dir() {
        return Err(IngestError::MissingDirectory(folder.display().to_string()));
    }

    let files = discover_pdf_files(folder);
    if files.is_empty() {
        warn!(folder = %folder.display(), "no pdf files found");
    }

    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        info!(path = %path.display(), "extracting document");
        documents.push(extract_document(extractor, &path));
    }

    let corpus = documents
        .iter()
        .filter(|document| !document.is_empty())
        .map(|document| document.text.as_str())
        .collect::<Vec<_>>()
        .join(DOCUMENT_SEPARATOR);

    let report = CorpusReport {
        corpus,
        documents,
        built_at: Utc::now(),
    };

    for failed in report.failures() {
        warn!(
            path = %failed.path.display(),
            text_failure = failed.text_failure.as_deref().unwrap_or("-"),
            table_failure = failed.table_failure.as_deref().unwrap_or("-"),
            "document extracted partially"
        );
    }

    Ok(report)
}

/// Embeds chunks one at a time, in order.
pub async fn embed_chunks<E>(
    chunks: Vec<Chunk>,
    embedder: &E,
) -> Result<Vec<EmbeddedChunk>, SearchError>
where
    E: Embedder + ?Sized,
{
    let mut embedded = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let vector = embedder.embed(&chunk.text).await?;
        embedded.push(EmbeddedChunk { chunk, vector });
    }
    Ok(embedded)
}

pub struct IndexBuild {
    pub index: VectorIndex,
    pub report: CorpusReport,
}

/// Startup batch: extract, chunk, embed and index a folder of PDFs.
pub async fn build_index<X, E>(
    folder: &Path,
    extractor: &X,
    embedder: &E,
    config: ChunkingConfig,
) -> Result<IndexBuild, IngestError>
where
    X: PdfExtractor + ?Sized,
    E: Embedder + ?Sized,
{
    config.validate()?;

    let report = build_corpus(folder, extractor)?;
    let chunks = split_text(&report.corpus, config)?;
    info!(
        documents = report.documents.len(),
        corpus_chars = report.corpus.chars().count(),
        chunk_count = chunks.len(),
        "chunked corpus"
    );

    let embedded = embed_chunks(chunks, embedder).await?;
    let index = VectorIndex::build(embedded)?;
    info!(
        chunk_count = index.len(),
        dimensions = index.dimensions(),
        "vector index ready"
    );

    Ok(IndexBuild { index, report })
}
