use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use pdf_chat_core::{Answerer, ChatOrchestrator, ChatReply, ChatRequest, Embedder};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::warn;

pub type SharedChat = Arc<ChatOrchestrator<Arc<dyn Embedder>, Arc<dyn Answerer>>>;

#[derive(Clone)]
pub struct AppState {
    pub chat: SharedChat,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "chunks": state.chat.retriever().index().len(),
        "top_k": state.chat.retriever().top_k(),
    }))
}

/// Every request gets a 200 with a tagged reply; an unreadable body counts
/// as a request without query text.
async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Json<ChatReply> {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "unreadable chat request body");
            ChatRequest::default()
        }
    };

    Json(state.chat.respond(&request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use pdf_chat_core::{
        CharacterNgramEmbedder, Chunk, EmbeddedChunk, RetrievalResult, Retriever, SearchError,
        VectorIndex, EMPTY_QUERY_MESSAGE, NO_ANSWER_MESSAGE,
    };
    use tower::ServiceExt;

    struct FixedAnswerer(&'static str);

    #[async_trait]
    impl Answerer for FixedAnswerer {
        async fn answer(
            &self,
            _query: &str,
            _context: &RetrievalResult,
        ) -> Result<String, SearchError> {
            Ok(self.0.to_string())
        }
    }

    fn app(answer: &'static str) -> Result<Router, SearchError> {
        let embedder = CharacterNgramEmbedder::default();
        let text = "Top grade artists are invited for national broadcasts.";
        let index = VectorIndex::build(vec![EmbeddedChunk {
            chunk: Chunk {
                chunk_id: "chunk-0".to_string(),
                chunk_index: 0,
                char_start: 0,
                text: text.to_string(),
            },
            vector: embedder.embed_sync(text),
        }])?;

        let embedder: Arc<dyn Embedder> = Arc::new(embedder);
        let answerer: Arc<dyn Answerer> = Arc::new(FixedAnswerer(answer));
        let retriever = Retriever::new(Arc::new(index), embedder, 5);
        let chat = Arc::new(ChatOrchestrator::new(retriever, answerer));
        Ok(build_router(AppState { chat }))
    }

    async fn post_chat(
        app: Router,
        body: &str,
    ) -> Result<(StatusCode, Value), Box<dyn std::error::Error>> {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/chat")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))?,
            )
            .await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        Ok((status, serde_json::from_slice(&bytes)?))
    }

    #[tokio::test]
    async fn chat_returns_the_answer() -> Result<(), Box<dyn std::error::Error>> {
        let (status, body) = post_chat(
            app("National broadcasts are for Top grade.")?,
            r#"{"message": "Who gets national broadcasts?"}"#,
        )
        .await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply_type"], "gemini");
        assert_eq!(body["reply"], "National broadcasts are for Top grade.");
        Ok(())
    }

    #[tokio::test]
    async fn empty_message_is_an_error_reply() -> Result<(), Box<dyn std::error::Error>> {
        let (status, body) = post_chat(app("unused")?, r#"{"message": "  "}"#).await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["reply_type"], "error");
        assert_eq!(body["message"], EMPTY_QUERY_MESSAGE);
        Ok(())
    }

    #[tokio::test]
    async fn malformed_body_is_treated_as_empty_query() -> Result<(), Box<dyn std::error::Error>> {
        let (_, body) = post_chat(app("unused")?, "not json").await?;
        assert_eq!(body["message"], EMPTY_QUERY_MESSAGE);
        Ok(())
    }

    #[tokio::test]
    async fn refusal_is_replaced_by_the_fallback() -> Result<(), Box<dyn std::error::Error>> {
        let (_, body) = post_chat(
            app("Sorry, the documents do not say.")?,
            r#"{"message": "What is the weather?"}"#,
        )
        .await?;

        assert_eq!(body["reply_type"], "error");
        assert_eq!(body["message"], NO_ANSWER_MESSAGE);
        Ok(())
    }

    #[tokio::test]
    async fn health_reports_index_size() -> Result<(), Box<dyn std::error::Error>> {
        let response = app("unused")?
            .oneshot(Request::builder().uri("/health").body(Body::empty())?)
            .await?;
        let bytes = response.into_body().collect().await?.to_bytes();
        let body: Value = serde_json::from_slice(&bytes)?;

        assert_eq!(body["status"], "ok");
        assert_eq!(body["chunks"], 1);
        assert_eq!(body["top_k"], 5);
        Ok(())
    }

    #[tokio::test]
    async fn cors_preflight_is_allowed() -> Result<(), Box<dyn std::error::Error>> {
        let response = app("unused")?
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/chat")
                    .header(header::ORIGIN, "http://localhost:8080")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
                    .body(Body::empty())?,
            )
            .await?;

        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
        Ok(())
    }
}
