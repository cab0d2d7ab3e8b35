//! HTTP router construction.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::api;
use crate::state::AppState;

fn cors_layer(origin: &str) -> CorsLayer {
    if origin == "*" {
        return CorsLayer::permissive();
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => CorsLayer::permissive().allow_origin(AllowOrigin::exact(value)),
        Err(_) => {
            warn!(origin, "invalid CORS origin, allowing any");
            CorsLayer::permissive()
        }
    }
}

/// Build the complete application router with all routes and middleware.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origin);

    Router::new()
        .route("/health", get(api::health))
        .route("/collector", post(api::collector))
        .route("/analyzer", get(api::analyzer))
        .route("/mapper", post(api::mapper))
        .route("/runs/{id}", get(api::run_by_id))
        .route("/reporter", post(api::reporter))
        .route("/summarizer", post(api::summarizer))
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tokio::sync::RwLock;
    use tower::ServiceExt;

    use netsoc_core::Config;
    use netsoc_detect::IocList;
    use netsoc_ingest::embedding::HashingEmbedder;
    use netsoc_ingest::tactic_seeds;
    use netsoc_llm::{LlmError, LlmProvider, Message, RetrievalIndex};

    use super::*;
    use crate::state::RunCache;

    struct CannedProvider {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmProvider for CannedProvider {
        async fn complete(
            &self,
            messages: Vec<Message>,
            _temperature: f32,
            _max_tokens: u32,
        ) -> Result<String, LlmError> {
            let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            self.prompts.lock().unwrap().push(prompt);
            Ok("Discovery, Lateral Movement".into())
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    /// App state whose data directory is `<tmp>/data`, holding `events.json`.
    struct Fixture {
        dir: tempfile::TempDir,
        state: Arc<AppState>,
    }

    impl Fixture {
        fn app(&self) -> Router {
            build_router(self.state.clone())
        }
    }

    fn write_dataset(path: &Path) {
        let lines = [
            r#"{"ts": 1700000000, "_path": "conn", "id.orig_h": "10.0.0.5", "id.resp_h": "10.0.0.9", "id.resp_p": 4444, "conn_state": "S0"}"#,
            r#"{"ts": 1700000010, "_path": "ssh", "id.orig_h": "203.0.113.7", "id.resp_h": "10.0.0.2", "id.resp_p": 22, "auth_attempts": 9}"#,
            r#"{"ts": 1700000600, "_path": "dns", "id.orig_h": "10.0.0.5", "id.resp_h": "10.0.0.53", "id.resp_p": 53, "query": "relay.tor-exit.example"}"#,
        ];
        std::fs::write(path, lines.join("\n")).unwrap();
    }

    async fn fixture(with_provider: bool, iocs: Option<&str>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let data = dir.path().join("data");
        std::fs::create_dir(&data).unwrap();
        write_dataset(&data.join("events.json"));

        let mut config = Config::for_profile("netsoc_router_test");
        config.data.log_path = data.join("logs.json");
        config.data.ioc_path = data.join("iocs.txt");

        let mut index = RetrievalIndex::new(Arc::new(HashingEmbedder::new(64)));
        let corpus_documents = index.add_documents(tactic_seeds()).await.unwrap();
        let provider: Option<Arc<dyn LlmProvider>> = with_provider.then(|| {
            Arc::new(CannedProvider {
                prompts: Mutex::new(Vec::new()),
            }) as Arc<dyn LlmProvider>
        });
        let state = Arc::new(AppState {
            config,
            retriever: Arc::new(index),
            provider,
            corpus_documents,
            iocs: iocs.map(|text| Arc::new(IocList::parse(text))),
            runs: RwLock::new(RunCache::default()),
        });
        Fixture { dir, state }
    }

    async fn call(app: Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(if body.is_null() {
                Body::empty()
            } else {
                Body::from(body.to_string())
            })
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn collect(fx: &Fixture) -> Value {
        let (status, body) = call(fx.app(), "POST", "/collector", json!({ "path": "events.json" })).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body
    }

    #[tokio::test]
    async fn health_reports_index_and_provider() {
        let fx = fixture(false, None).await;
        let (status, body) = call(fx.app(), "GET", "/health", Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["llm_ready"], false);
        assert_eq!(body["corpus_documents"], 14);
        assert!(body["current_run"].is_null());
    }

    #[tokio::test]
    async fn analyzer_without_logs_is_a_bad_request() {
        let fx = fixture(true, None).await;
        let (status, body) = call(fx.app(), "GET", "/analyzer", Value::Null).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No logs loaded");
    }

    #[tokio::test]
    async fn missing_dataset_is_not_found() {
        let fx = fixture(true, None).await;
        let (status, _) = call(fx.app(), "POST", "/collector", json!({ "path": "not-here.json" })).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // No body means the configured default export, which does not exist.
        let (status, _) = call(fx.app(), "POST", "/collector", Value::Null).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn collector_paths_cannot_leave_the_data_dir() {
        let fx = fixture(true, None).await;
        let outside = fx.dir.path().join("secret.json");
        std::fs::write(&outside, r#"{"ts": 1, "_path": "conn"}"#).unwrap();

        for path in [
            json!("../secret.json"),
            json!(outside.to_str().unwrap()),
            json!("/dev/zero"),
        ] {
            let (status, body) = call(fx.app(), "POST", "/collector", json!({ "path": path })).await;
            if status == StatusCode::NOT_FOUND && path == "/dev/zero" {
                continue;
            }
            assert_eq!(status, StatusCode::FORBIDDEN, "{path}: {body}");
        }
        assert!(fx.state.runs.read().await.current_id().is_none());
    }

    #[tokio::test]
    async fn full_run_lifecycle() {
        let fx = fixture(true, None).await;

        let body = collect(&fx).await;
        assert_eq!(body["stats"]["rows"], 3);
        let run_id = body["run_id"].as_str().unwrap().to_string();

        let (status, body) = call(fx.app(), "GET", "/analyzer", Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["run_id"], run_id.as_str());
        assert!(!body["alerts"].as_array().unwrap().is_empty());
        let episodes = body["episodes"].as_array().unwrap().len();
        assert_eq!(episodes, 2);
        assert_eq!(body["techniques"].as_array().unwrap().len(), episodes);

        let (status, body) = call(fx.app(), "POST", "/mapper", Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["run_id"], run_id.as_str());
        assert_eq!(body["mapped"].as_array().unwrap().len(), episodes);
        assert_eq!(body["mapped"][0]["mapping_text"], "Discovery, Lateral Movement");
        assert!(body["failed"].as_array().unwrap().is_empty());

        let (status, body) = call(fx.app(), "GET", &format!("/runs/{run_id}"), Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mappings"].as_object().unwrap().len(), episodes);

        let (status, body) = call(fx.app(), "POST", "/reporter", json!({ "tactic": "Discovery" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tactic"], "Discovery");
        assert_eq!(body["episodes"], episodes);
    }

    #[tokio::test]
    async fn ioc_list_adds_alerts_to_the_analysis() {
        let fx = fixture(false, Some("203.0.113.7\n")).await;
        collect(&fx).await;

        let (status, body) = call(fx.app(), "GET", "/analyzer", Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        let hits: Vec<&Value> = body["alerts"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|a| a["kind"] == "IocMatch")
            .collect();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0]["source_host"], "203.0.113.7");
    }

    #[tokio::test]
    async fn summarizer_filters_by_log_family() {
        let fx = fixture(true, None).await;

        let (status, body) = call(fx.app(), "POST", "/summarizer", json!({ "event_filter": "dns" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No logs loaded");

        collect(&fx).await;

        let (status, body) = call(fx.app(), "POST", "/summarizer", json!({ "event_filter": "dns" })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["event_filter"], "dns");
        assert_eq!(body["stats"]["rows"], 1);
        assert_eq!(body["summary"], "Discovery, Lateral Movement");

        // Default filter is dhcp, which this dataset does not contain.
        let (status, body) = call(fx.app(), "POST", "/summarizer", Value::Null).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["event_filter"], "dhcp");
        assert_eq!(body["stats"]["rows"], 0);
        assert_eq!(body["summary"], "No data available to summarize.");

        let (status, _) = call(fx.app(), "POST", "/summarizer", json!({ "event_filter": "x509" })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reingestion_evicts_the_previous_run() {
        let fx = fixture(false, None).await;

        let first = collect(&fx).await;
        let second = collect(&fx).await;
        assert_ne!(first["run_id"], second["run_id"]);

        let uri = format!("/runs/{}", first["run_id"].as_str().unwrap());
        let (status, _) = call(fx.app(), "GET", &uri, Value::Null).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn llm_routes_need_a_provider() {
        let fx = fixture(false, None).await;
        collect(&fx).await;
        let (status, _) = call(fx.app(), "POST", "/mapper", Value::Null).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let (status, _) = call(fx.app(), "POST", "/summarizer", Value::Null).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
