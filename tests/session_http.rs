//! Integration tests for the intake REST surface.
//!
//! Each test spins up an Axum server on a random port with a stub generator
//! and the real PDF renderer, then drives it over HTTP.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::timeout;

use wellness_planner::error::{LlmError, RenderError};
use wellness_planner::intake::{IntakeRouteState, IntakeWizard, WizardConfig, intake_routes};
use wellness_planner::llm::{CompletionRequest, CompletionResponse, FinishReason, LlmProvider};
use wellness_planner::render::{DocumentRenderer, PdfRenderer};
use wellness_planner::render::pdf::PdfLayout;

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

const PLAN: &str = "\
# Leo's Weekly Plan

| Day | Morning | Afternoon | Evening | Night |
|-----|---------|-----------|---------|-------|
| Monday | Visual schedule | Park walk | Lego | Bath and story |
| Tuesday | Music | Library | Puzzles | Weighted blanket |

## Notes

- Keep transitions predictable
- Offer headphones in busy places
";

/// Stub generator; can be switched into a failing mode.
struct StubLlm {
    failing: AtomicBool,
    calls: AtomicUsize,
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(LlmError::RequestFailed {
                provider: "stub".to_string(),
                reason: "503 Service Unavailable".to_string(),
            });
        }
        let content = if request.messages[0]
            .content
            .starts_with("Create a detailed weekly wellness plan")
        {
            PLAN.to_string()
        } else {
            "Thanks, that really helps.".to_string()
        };
        Ok(CompletionResponse {
            content,
            input_tokens: 0,
            output_tokens: 0,
            finish_reason: FinishReason::Stop,
        })
    }
}

struct TestServer {
    base: String,
    llm: Arc<StubLlm>,
    client: reqwest::Client,
}

impl TestServer {
    async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{}", self.base, path))
            .send()
            .await
            .unwrap()
    }

    async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.base, path))
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn say(&self, content: &str) -> Value {
        let resp = self
            .post("/api/session/message", json!({ "content": content }))
            .await;
        assert_eq!(resp.status(), 200, "message {content:?} failed");
        resp.json().await.unwrap()
    }
}

/// Renderer that always fails.
struct BrokenRenderer;

impl DocumentRenderer for BrokenRenderer {
    fn render(&self, _markup: &str, _title: &str) -> Result<Vec<u8>, RenderError> {
        Err(RenderError::Pdf("font table missing".to_string()))
    }
}

/// Start an Axum server on a random port with the real PDF renderer.
async fn start_server() -> TestServer {
    start_server_with(Arc::new(PdfRenderer::new(PdfLayout::default()))).await
}

async fn start_server_with(renderer: Arc<dyn DocumentRenderer>) -> TestServer {
    let llm = Arc::new(StubLlm {
        failing: AtomicBool::new(false),
        calls: AtomicUsize::new(0),
    });
    let wizard = Arc::new(IntakeWizard::new(
        llm.clone(),
        renderer,
        WizardConfig::default(),
    ));
    let app = intake_routes(IntakeRouteState { wizard });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        base: format!("http://127.0.0.1:{port}"),
        llm,
        client: reqwest::Client::new(),
    }
}

#[tokio::test]
async fn health_reports_ok() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let resp = server.get("/health").await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn full_session_produces_downloadable_pdf() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;

        let reset: Value = server
            .post("/api/session/reset", json!({}))
            .await
            .json()
            .await
            .unwrap();
        assert_eq!(reset["messages"].as_array().unwrap().len(), 2);
        assert_eq!(reset["session"]["step"], 1);

        let turn = server.say("This is Leo, he is 7").await;
        assert_eq!(
            turn["messages"][0],
            "Nice to meet you! Leo is 7 years old. Let's continue."
        );
        assert_eq!(turn["messages"][1], "How does Leo behave in public settings?");
        assert_eq!(turn["step"], 2);

        for answer in ["anxious in crowds", "trains", "quiet music", "hand flapping"] {
            let turn = server.say(answer).await;
            assert_eq!(turn["messages"].as_array().unwrap().len(), 2);
            assert!(turn.get("document").is_none());
            assert!(turn.get("download_url").is_none());
        }

        let not_yet = server.get("/api/session/plan.pdf").await;
        assert_eq!(not_yet.status(), 404);

        let last = server.say("making friends").await;
        assert_eq!(last["phase"]["phase"], "complete");
        assert_eq!(last["step"], 6);
        assert_eq!(last["document"]["filename"], "Leo_wellness_plan.pdf");
        assert_eq!(last["download_url"], "/api/session/plan.pdf");
        assert_eq!(last["messages"][2], PLAN.trim());

        let status: Value = server.get("/api/session").await.json().await.unwrap();
        assert_eq!(status["child_name"], "Leo");
        assert_eq!(status["child_age"], "7");
        assert_eq!(status["answers"], 5);
        assert_eq!(status["document_ready"], true);

        let pdf = server.get("/api/session/plan.pdf").await;
        assert_eq!(pdf.status(), 200);
        assert_eq!(pdf.headers()["content-type"], "application/pdf");
        assert_eq!(
            pdf.headers()["content-disposition"],
            "attachment; filename=\"Leo_wellness_plan.pdf\""
        );
        let bytes = pdf.bytes().await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        let transcript: Value = server
            .get("/api/session/transcript")
            .await
            .json()
            .await
            .unwrap();
        let entries = transcript.as_array().unwrap();
        assert_eq!(entries.len(), 21);
        assert_eq!(entries[2]["role"], "user");
        assert_eq!(entries[2]["content"], "This is Leo, he is 7");

        // One acknowledgment per answer plus the plan.
        assert_eq!(server.llm.calls.load(Ordering::SeqCst), 6);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn empty_message_is_bad_request() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let resp = server
            .post("/api/session/message", json!({ "content": "   " }))
            .await;
        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("empty"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn generation_failure_is_bad_gateway_and_retryable() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        server.say("My child is Maya and she is 5").await;

        server.llm.failing.store(true, Ordering::SeqCst);
        let resp = server
            .post("/api/session/message", json!({ "content": "she hides" }))
            .await;
        assert_eq!(resp.status(), 502);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("503"));

        let status: Value = server.get("/api/session").await.json().await.unwrap();
        assert_eq!(status["step"], 2);
        assert_eq!(status["answers"], 0);

        server.llm.failing.store(false, Ordering::SeqCst);
        let turn = server.say("she hides").await;
        assert_eq!(turn["step"], 3);
        assert_eq!(turn["messages"][0], "Thanks, that really helps.");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn reset_discards_finished_plan() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        server.say("My child is Maya and she is 5").await;
        for answer in ["a", "b", "c", "d", "e"] {
            server.say(answer).await;
        }
        assert_eq!(server.get("/api/session/plan.pdf").await.status(), 200);

        server.post("/api/session/reset", json!({})).await;
        assert_eq!(server.get("/api/session/plan.pdf").await.status(), 404);
        let status: Value = server.get("/api/session").await.json().await.unwrap();
        assert_eq!(status["step"], 1);
        assert_eq!(status["document_ready"], false);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn render_failure_is_server_error_and_keeps_last_answer_pending() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server_with(Arc::new(BrokenRenderer)).await;
        server.say("My child is Maya and she is 5").await;
        for answer in ["a", "b", "c", "d"] {
            server.say(answer).await;
        }

        let resp = server
            .post("/api/session/message", json!({ "content": "e" }))
            .await;
        assert_eq!(resp.status(), 500);
        let body: Value = resp.json().await.unwrap();
        assert!(body["error"].as_str().unwrap().contains("font table missing"));

        let status: Value = server.get("/api/session").await.json().await.unwrap();
        assert_eq!(status["answers"], 4);
        assert_eq!(status["document_ready"], false);
        assert_eq!(server.get("/api/session/plan.pdf").await.status(), 404);
    })
    .await
    .expect("test timed out");
}
