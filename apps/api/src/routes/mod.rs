pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::get,
    Router,
};

use crate::screening::handlers as screening;
use crate::settings::handlers as settings;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        // Screening API
        .route(
            "/api/v1/screenings",
            get(screening::handle_list_screenings).post(screening::handle_create_screening),
        )
        .route("/api/v1/screenings/:id", get(screening::handle_get_screening))
        // Settings API
        .route(
            "/api/v1/settings/:user_id",
            get(settings::handle_get_settings).put(settings::handle_put_settings),
        )
        .layer(DefaultBodyLimit::max(upload_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::activity::ActivityKind;
    use crate::config::Config;
    use crate::intake::archive::tests::build_zip;
    use crate::test_support::{
        assessment_reply, engine, FakeEncoder, MemoryDocumentStore, MemorySettingsStore,
        RecordingActivityLog, RecordingObserver, ScriptedModel,
    };

    const BOUNDARY: &str = "screener-test-boundary";

    struct Harness {
        runs: Arc<MemoryDocumentStore>,
        settings: Arc<MemorySettingsStore>,
        activity: Arc<RecordingActivityLog>,
        router: Router,
    }

    fn harness() -> Harness {
        let encoder = FakeEncoder::new()
            .with("Backend Engineer\n\nRust services", vec![1.0, 0.0])
            .with("Alice\nRust, Tokio", vec![0.9, 0.1])
            .with("Bob\nJava", vec![0.2, 0.8])
            .with("Carol\nGo, Rust", vec![0.7, 0.3]);
        let model = ScriptedModel::new()
            .with_name("Alice\nRust, Tokio", "Alice Smith")
            .with_assessment("Alice\nRust, Tokio", assessment_reply(70.0))
            .with_assessment("Bob\nJava", assessment_reply(20.0))
            .with_assessment("Carol\nGo, Rust", assessment_reply(85.0));

        let runs = Arc::new(MemoryDocumentStore::default());
        let settings = Arc::new(MemorySettingsStore::default());
        let activity = Arc::new(RecordingActivityLog::default());
        let state = AppState {
            config: Config::test_default(),
            engine: Arc::new(engine(
                encoder,
                model,
                Arc::new(RecordingObserver::default()),
            )),
            runs: runs.clone(),
            settings: settings.clone(),
            activity: activity.clone(),
        };

        Harness {
            runs,
            settings,
            activity,
            router: build_router(state),
        }
    }

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(file_name, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"files\"; filename=\"{file_name}\"\r\n\
                             Content-Type: application/octet-stream\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn screening_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/screenings")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let h = harness();
        let (status, body) = send(&h.router, get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "screener");
    }

    #[tokio::test]
    async fn test_screening_returns_finalists_in_fit_order() {
        let h = harness();
        let user_id = Uuid::new_v4();
        h.settings.rows.lock().unwrap().insert(
            user_id,
            crate::settings::FunnelSettings {
                phase1_width: 2,
                phase2_width: 2,
                questions_to_generate: None,
            },
        );

        let zip = build_zip(&[
            ("cvs/", b""),
            ("cvs/alice.txt", b"Alice\nRust, Tokio"),
            ("cvs/notes.md", b"ignored"),
            ("cvs/bob.txt", b"Bob\nJava"),
        ]);
        let user = user_id.to_string();
        let body = multipart_body(&[
            Part::Text("user_id", &user),
            Part::Text("job_role", "Backend Engineer"),
            Part::Text("job_description", "Rust services"),
            Part::File("batch.zip", &zip),
            Part::File("carol.txt", b"Carol\nGo, Rust"),
        ]);

        let (status, body) = send(&h.router, screening_request(body)).await;
        assert_eq!(status, StatusCode::OK, "{body}");

        // phase 1 keeps alice (.99) and carol (.92); bob is cut
        let candidates = body["candidates"].as_array().unwrap();
        let files: Vec<_> = candidates.iter().map(|c| c["fileName"].clone()).collect();
        assert_eq!(files, vec![json!("carol.txt"), json!("cvs/alice.txt")]);
        assert_eq!(candidates[0]["fitScore"], 85.0);
        assert_eq!(candidates[0]["name"], "Carol");
        assert_eq!(candidates[1]["name"], "Alice Smith");
        assert_eq!(candidates[1]["skillBreakdown"]["exactMatches"][0], "Rust");
        assert_eq!(candidates[1]["extractionStatus"], "ok");

        let run_id = body["runId"].as_str().unwrap().to_string();
        assert_eq!(h.runs.runs.lock().unwrap().len(), 1);
        let events = h.activity.events.lock().unwrap().clone();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ActivityKind::ScreeningCompleted);

        let (status, stored) = send(&h.router, get(&format!("/api/v1/screenings/{run_id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(stored["candidates"], body["candidates"]);
        assert!(stored["timeTaken"].as_f64().unwrap() >= 0.0);
        assert_eq!(stored["settings"]["phase1_ranking_number"], 2);
    }

    #[tokio::test]
    async fn test_invalid_stored_settings_reject_request() {
        let h = harness();
        let user_id = Uuid::new_v4();
        h.settings.rows.lock().unwrap().insert(
            user_id,
            crate::settings::FunnelSettings {
                phase1_width: 5,
                phase2_width: 10,
                questions_to_generate: None,
            },
        );
        let user = user_id.to_string();
        let body = multipart_body(&[
            Part::Text("user_id", &user),
            Part::Text("job_role", "Backend Engineer"),
            Part::Text("job_description", "Rust services"),
            Part::File("carol.txt", b"Carol\nGo, Rust"),
        ]);

        let (status, body) = send(&h.router, screening_request(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert!(h.runs.runs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_form_field_is_bad_request() {
        let h = harness();
        let body = multipart_body(&[
            Part::Text("job_role", "Backend Engineer"),
            Part::File("carol.txt", b"Carol\nGo, Rust"),
        ]);
        let (status, body) = send(&h.router, screening_request(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("user_id"));
    }

    #[tokio::test]
    async fn test_upload_without_documents_is_bad_request() {
        let h = harness();
        let user = Uuid::new_v4().to_string();
        let body = multipart_body(&[
            Part::Text("user_id", &user),
            Part::Text("job_role", "Backend Engineer"),
            Part::Text("job_description", "Rust services"),
            Part::File("blank.txt", b"   "),
        ]);
        let (status, _) = send(&h.router, screening_request(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unsupported_upload_is_bad_request() {
        let h = harness();
        let user = Uuid::new_v4().to_string();
        let body = multipart_body(&[
            Part::Text("user_id", &user),
            Part::Text("job_role", "Backend Engineer"),
            Part::Text("job_description", "Rust services"),
            Part::File("resume.docx", b"binary"),
        ]);
        let (status, body) = send(&h.router, screening_request(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("resume.docx"));
    }

    #[tokio::test]
    async fn test_storage_failure_is_server_error() {
        let h = harness();
        h.runs.fail.store(true, Ordering::SeqCst);
        let user = Uuid::new_v4().to_string();
        let body = multipart_body(&[
            Part::Text("user_id", &user),
            Part::Text("job_role", "Backend Engineer"),
            Part::Text("job_description", "Rust services"),
            Part::File("carol.txt", b"Carol\nGo, Rust"),
        ]);
        let (status, _) = send(&h.router, screening_request(body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(h.activity.events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_run_is_not_found() {
        let h = harness();
        let (status, body) =
            send(&h.router, get(&format!("/api/v1/screenings/{}", Uuid::new_v4()))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_history_lists_runs_and_404s_when_empty() {
        let h = harness();
        let user_id = Uuid::new_v4();
        let uri = format!("/api/v1/screenings?user_id={user_id}");

        let (status, _) = send(&h.router, get(&uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let user = user_id.to_string();
        for _ in 0..2 {
            let body = multipart_body(&[
                Part::Text("user_id", &user),
                Part::Text("job_role", "Backend Engineer"),
                Part::Text("job_description", "Rust services"),
                Part::File("carol.txt", b"Carol\nGo, Rust"),
            ]);
            let (status, _) = send(&h.router, screening_request(body)).await;
            assert_eq!(status, StatusCode::OK);
        }

        let (status, body) = send(&h.router, get(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);

        let (status, _) = send(
            &h.router,
            get(&format!("{uri}&start_date=2001-01-01&end_date=2001-01-31")),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&h.router, get(&format!("{uri}&start_date=yesterday"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_settings_default_then_update() {
        let h = harness();
        let uri = format!("/api/v1/settings/{}", Uuid::new_v4());

        let (status, body) = send(&h.router, get(&uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase1_ranking_number"], 20);
        assert_eq!(body["phase2_ranking_number"], 10);
        assert_eq!(body["source"], "default");

        let put = Request::builder()
            .method("PUT")
            .uri(&uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({"phase1_ranking_number": 8, "phase2_ranking_number": 3}).to_string(),
            ))
            .unwrap();
        let (status, body) = send(&h.router, put).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "stored");

        let (_, body) = send(&h.router, get(&uri)).await;
        assert_eq!(body["phase1_ranking_number"], 8);
        assert_eq!(body["source"], "stored");

        let events = h.activity.events.lock().unwrap().clone();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, ActivityKind::SettingsUpdated);
    }

    #[tokio::test]
    async fn test_settings_violating_width_invariant_are_rejected() {
        let h = harness();
        let uri = format!("/api/v1/settings/{}", Uuid::new_v4());
        for payload in [
            json!({"phase1_ranking_number": 5, "phase2_ranking_number": 10}),
            json!({"phase1_ranking_number": 0, "phase2_ranking_number": 0}),
        ] {
            let put = Request::builder()
                .method("PUT")
                .uri(&uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap();
            let (status, _) = send(&h.router, put).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
        assert!(h.settings.rows.lock().unwrap().is_empty());
    }
}
