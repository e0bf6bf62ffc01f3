mod server;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use pdf_chat_core::providers::{
    DEFAULT_EMBEDDING_MODEL, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_EMBEDDING_DIMENSIONS,
    DEFAULT_LLM_MODEL, DEFAULT_TEMPERATURE,
};
use pdf_chat_core::{
    build_corpus, build_index, split_text, Answerer, CharacterNgramEmbedder, ChatOrchestrator,
    ChatRequest, ChunkingConfig, Embedder, ExtractiveAnswerer, GeminiAnswerer, GeminiClient,
    GeminiConfig, GeminiEmbedder, LopdfExtractor, RagOptions, Retriever, DEFAULT_TOP_K,
};
use server::{build_router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "pdf-chat", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Folder with the source PDFs (not searched recursively)
    #[arg(long, env = "PDF_DIR", default_value = "./documents")]
    documents: PathBuf,

    /// Maximum characters per chunk
    #[arg(long, default_value_t = 1_000)]
    chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, default_value_t = 150)]
    chunk_overlap: usize,

    /// Chunks handed to the answerer per question
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Embedding backend
    #[arg(long, value_enum, default_value_t = EmbedderKind::Gemini)]
    embedder: EmbedderKind,

    /// Gemini embedding model
    #[arg(long, default_value = DEFAULT_EMBEDDING_MODEL)]
    embedding_model: String,

    /// Dimensions requested from the Gemini embedding model
    #[arg(long, default_value_t = DEFAULT_GEMINI_EMBEDDING_DIMENSIONS)]
    embedding_dimensions: usize,

    /// Answer backend
    #[arg(long, value_enum, default_value_t = AnswererKind::Gemini)]
    answerer: AnswererKind,

    /// Gemini model used to write answers
    #[arg(long, default_value = DEFAULT_LLM_MODEL)]
    llm_model: String,

    /// Sampling temperature for answers
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    temperature: f32,

    /// Generative Language API base URL
    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_GEMINI_BASE_URL)]
    gemini_base_url: String,

    /// Timeout for each Gemini call, in seconds
    #[arg(long, default_value_t = 60)]
    request_timeout_secs: u64,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum EmbedderKind {
    /// Generative Language API embeddings
    Gemini,
    /// Offline character trigram hashing
    Ngram,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AnswererKind {
    /// Gemini answer synthesis over the retrieved chunks
    Gemini,
    /// Reply with the best matching chunk
    Extractive,
}

#[derive(Subcommand)]
enum Command {
    /// Build the index and serve POST /chat.
    Serve {
        /// Address to listen on
        #[arg(long, env = "CHAT_BIND", default_value = "127.0.0.1:5000")]
        bind: String,
    },
    /// Build the index and answer a single question.
    Ask {
        /// Question text
        #[arg(long)]
        query: String,
    },
    /// Extract the documents and report what was read, without embedding.
    Inspect,
}

type Chat = ChatOrchestrator<Arc<dyn Embedder>, Arc<dyn Answerer>>;

impl Cli {
    fn options(&self) -> RagOptions {
        RagOptions {
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            top_k: self.top_k,
        }
    }

    fn gemini_client(&self) -> anyhow::Result<GeminiClient> {
        let api_key = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .context("GEMINI_API_KEY is required when a gemini backend is selected")?;

        let config = GeminiConfig {
            api_key: api_key.to_string(),
            base_url: self.gemini_base_url.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        };
        Ok(GeminiClient::new(config)?)
    }

    fn collaborators(&self) -> anyhow::Result<(Arc<dyn Embedder>, Arc<dyn Answerer>)> {
        let needs_gemini =
            self.embedder == EmbedderKind::Gemini || self.answerer == AnswererKind::Gemini;
        let client = if needs_gemini {
            Some(self.gemini_client()?)
        } else {
            None
        };

        let embedder: Arc<dyn Embedder> = match (self.embedder, &client) {
            (EmbedderKind::Gemini, Some(client)) => Arc::new(GeminiEmbedder::new(
                client.clone(),
                self.embedding_model.clone(),
                self.embedding_dimensions,
            )),
            _ => Arc::new(CharacterNgramEmbedder::default()),
        };

        let answerer: Arc<dyn Answerer> = match (self.answerer, client) {
            (AnswererKind::Gemini, Some(client)) => Arc::new(GeminiAnswerer::new(
                client,
                self.llm_model.clone(),
                self.temperature,
            )),
            _ => Arc::new(ExtractiveAnswerer),
        };

        Ok((embedder, answerer))
    }

    async fn assemble(&self, chunking: ChunkingConfig) -> anyhow::Result<Chat> {
        let (embedder, answerer) = self.collaborators()?;

        let built = build_index(&self.documents, &LopdfExtractor, &embedder, chunking)
            .await
            .with_context(|| format!("building index from {}", self.documents.display()))?;

        let skipped = built.report.failures().count();
        if skipped > 0 {
            warn!(documents = skipped, "some documents were only partially extracted");
        }

        println!(
            "{} chunks indexed from {} documents at {}",
            built.index.len(),
            built.report.documents.len(),
            Utc::now().to_rfc3339()
        );

        let retriever = Retriever::new(Arc::new(built.index), embedder, self.top_k);
        Ok(ChatOrchestrator::new(retriever, answerer))
    }
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(%error, "failed to listen for ctrl-c");
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let chunking = ChunkingConfig::from(cli.options());
    chunking.validate().context("invalid chunking options")?;

    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        documents = %cli.documents.display(),
        "pdf-chat boot"
    );

    match &cli.command {
        Command::Serve { bind } => {
            let chat = cli.assemble(chunking).await?;
            let app = build_router(AppState {
                chat: Arc::new(chat),
            });

            let listener = tokio::net::TcpListener::bind(bind)
                .await
                .with_context(|| format!("binding {bind}"))?;
            info!(%bind, "serving POST /chat and GET /health");

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
        Command::Ask { query } => {
            let chat = cli.assemble(chunking).await?;
            let reply = chat
                .respond(&ChatRequest {
                    message: query.clone(),
                })
                .await;
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Command::Inspect => {
            let report = build_corpus(&cli.documents, &LopdfExtractor)?;
            let chunks = split_text(&report.corpus, chunking)?;

            for document in &report.documents {
                println!("{}", serde_json::to_string(document)?);
            }
            println!(
                "documents={} failures={} corpus_chars={} chunks={}",
                report.documents.len(),
                report.failures().count(),
                report.corpus.chars().count(),
                chunks.len()
            );
        }
    }

    Ok(())
}
