//! HTTP endpoint for chat interactions.
//!
//! `POST /api` verifies the request signature, then dispatches on the
//! interaction type. The comparison command answers with a deferred
//! acknowledgement and finishes in a detached task that delivers the
//! rendered report through the [`ResultSink`].

use super::delivery::ResultSink;
use super::payload::{
    CallbackTarget, Interaction, InteractionResponse, INTERACTION_COMMAND, INTERACTION_PING,
};
use super::signature::{SignatureError, SignatureVerifier};
use crate::analysis::{compare_guilds, GuildAggregator};
use crate::report::{render_failure, render_outcome};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

const SIGNATURE_HEADER: &str = "x-signature-ed25519";
const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

const PING_COMMAND: &str = "ping";
const COMPARE_COMMAND: &str = "twcompare";
const OWN_GUILD_OPTION: &str = "own_guild";
const OPPONENT_GUILD_OPTION: &str = "opponent_guild";

const USAGE_MESSAGE: &str =
    "Both `own_guild` and `opponent_guild` are required: /twcompare own_guild:<id> opponent_guild:<id>";

/// Shared state for the interaction handlers.
#[derive(Clone)]
pub struct AppState {
    pub verifier: Arc<SignatureVerifier>,
    pub aggregator: GuildAggregator,
    pub sink: Arc<dyn ResultSink>,
}

/// Errors surfaced to the HTTP caller.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<SignatureError> for ApiError {
    fn from(err: SignatureError) -> Self {
        ApiError::Unauthorized(err.to_string())
    }
}

/// Create the router with all routes and middleware.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api", get(liveness).post(interactions))
        .route("/health", get(liveness))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /api, GET /health
async fn liveness() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// POST /api
async fn interactions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let signature = header_str(&headers, SIGNATURE_HEADER);
    let timestamp = header_str(&headers, TIMESTAMP_HEADER);

    if let Err(e) = state.verifier.verify(timestamp, &body, signature) {
        warn!("Rejected interaction: {}", e);
        return Err(e.into());
    }

    let interaction: Interaction = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid interaction payload: {}", e)))?;

    debug!("Interaction type {}", interaction.kind);

    let response = match interaction.kind {
        INTERACTION_PING => Json(InteractionResponse::pong()).into_response(),
        INTERACTION_COMMAND => Json(handle_command(&state, &interaction)).into_response(),
        _ => Json(json!({ "message": "Unhandled interaction type" })).into_response(),
    };

    Ok(response)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Dispatch an application command.
fn handle_command(state: &AppState, interaction: &Interaction) -> InteractionResponse {
    let Some(data) = interaction.data.as_ref() else {
        return InteractionResponse::message("Missing command data");
    };

    match data.name.as_str() {
        PING_COMMAND => InteractionResponse::message("Pong!"),
        COMPARE_COMMAND => {
            let (Some(own), Some(opponent)) = (
                data.option(OWN_GUILD_OPTION),
                data.option(OPPONENT_GUILD_OPTION),
            ) else {
                return InteractionResponse::message(USAGE_MESSAGE);
            };

            let Some(target) = interaction.callback_target() else {
                return InteractionResponse::message("Interaction is missing callback details");
            };

            info!("Comparing guild {} against {}", own, opponent);
            spawn_comparison(state.clone(), target, own, opponent);
            InteractionResponse::deferred()
        }
        other => InteractionResponse::message(format!("Unknown command: {}", other)),
    }
}

/// Run the comparison in the background and deliver its report.
///
/// The work runs in its own task so a panic is caught at the join and
/// still produces a message for the caller.
pub fn spawn_comparison(
    state: AppState,
    target: CallbackTarget,
    own_guild: String,
    opponent_guild: String,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let aggregator = state.aggregator.clone();
        let work = tokio::spawn(async move {
            let outcome = compare_guilds(&aggregator, &own_guild, &opponent_guild).await;
            render_outcome(&outcome)
        });

        let content = match work.await {
            Ok(content) => content,
            Err(e) => {
                error!("Comparison task failed: {}", e);
                render_failure(&["internal error while comparing guilds".to_string()])
            }
        };

        if let Err(e) = state.sink.deliver(&target, &content).await {
            warn!("Failed to deliver comparison: {}", e);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interactions::delivery::DeliveryError;
    use crate::interactions::signature::tests::{public_key_hex, sign};
    use crate::models::{MemberDetail, Roster, RosterEntry};
    use crate::provider::{Fetch, GuildDataSource};
    use async_trait::async_trait;
    use axum::body::{self, Body};
    use axum::http::Request;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tower::ServiceExt; // for `oneshot`

    #[derive(Default)]
    struct StaticSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GuildDataSource for StaticSource {
        async fn fetch_roster(&self, guild_id: &str) -> Fetch<Roster> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if guild_id == "missing" {
                return Fetch::Absent;
            }
            Fetch::Found(Roster {
                name: format!("Guild {}", guild_id),
                members: vec![
                    RosterEntry {
                        member_id: "1".to_string(),
                        name: "one".to_string(),
                        power: 10_000_000,
                        league: Some("KYBER".to_string()),
                    },
                    RosterEntry {
                        member_id: "2".to_string(),
                        name: "two".to_string(),
                        power: 8_000_000,
                        league: Some("CHROMIUM".to_string()),
                    },
                ],
            })
        }

        async fn fetch_member_detail(&self, member_id: &str) -> Fetch<MemberDetail> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if member_id == "2" {
                return Fetch::Absent;
            }
            Fetch::Found(MemberDetail::default())
        }
    }

    struct ChannelSink {
        tx: mpsc::UnboundedSender<(CallbackTarget, String)>,
    }

    #[async_trait]
    impl ResultSink for ChannelSink {
        async fn deliver(
            &self,
            target: &CallbackTarget,
            content: &str,
        ) -> Result<(), DeliveryError> {
            let _ = self.tx.send((target.clone(), content.to_string()));
            Ok(())
        }
    }

    fn setup() -> (
        Router,
        Arc<StaticSource>,
        mpsc::UnboundedReceiver<(CallbackTarget, String)>,
    ) {
        let source = Arc::new(StaticSource::default());
        let dyn_source: Arc<dyn GuildDataSource> = source.clone();
        let (tx, rx) = mpsc::unbounded_channel();

        let state = AppState {
            verifier: Arc::new(SignatureVerifier::from_hex(&public_key_hex()).unwrap()),
            aggregator: GuildAggregator::new(dyn_source, 20),
            sink: Arc::new(ChannelSink { tx }),
        };

        (create_router(state), source, rx)
    }

    fn signed_request(body: &serde_json::Value) -> Request<Body> {
        let body = body.to_string();
        let timestamp = "1700000000";
        Request::builder()
            .method("POST")
            .uri("/api")
            .header("content-type", "application/json")
            .header("X-Signature-Ed25519", sign(timestamp, body.as_bytes()))
            .header("X-Signature-Timestamp", timestamp)
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn compare_payload(options: serde_json::Value) -> serde_json::Value {
        json!({
            "type": 2,
            "application_id": "app",
            "token": "tok",
            "data": {"name": "twcompare", "options": options}
        })
    }

    #[tokio::test]
    async fn test_liveness() {
        let (app, _, _) = setup();
        let response = app
            .oneshot(Request::builder().uri("/api").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_missing_signature_is_unauthorized() {
        let (app, _, _) = setup();
        let request = Request::builder()
            .method("POST")
            .uri("/api")
            .body(Body::from(r#"{"type":1}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            json_body(response).await,
            json!({"detail": "Missing signature headers"})
        );
    }

    #[tokio::test]
    async fn test_bad_signature_is_unauthorized() {
        let (app, _, _) = setup();
        let request = Request::builder()
            .method("POST")
            .uri("/api")
            .header("X-Signature-Ed25519", sign("1", b"something else"))
            .header("X-Signature-Timestamp", "1")
            .body(Body::from(r#"{"type":1}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await, json!({"detail": "Invalid signature"}));
    }

    #[tokio::test]
    async fn test_ping_interaction() {
        let (app, _, _) = setup();
        let response = app.oneshot(signed_request(&json!({"type": 1}))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"type": 1}));
    }

    #[tokio::test]
    async fn test_ping_command() {
        let (app, _, _) = setup();
        let payload = json!({"type": 2, "data": {"name": "ping"}});
        let response = app.oneshot(signed_request(&payload)).await.unwrap();

        assert_eq!(
            json_body(response).await,
            json!({"type": 4, "data": {"content": "Pong!"}})
        );
    }

    #[tokio::test]
    async fn test_unhandled_type() {
        let (app, _, _) = setup();
        let response = app.oneshot(signed_request(&json!({"type": 3}))).await.unwrap();

        assert_eq!(
            json_body(response).await,
            json!({"message": "Unhandled interaction type"})
        );
    }

    #[tokio::test]
    async fn test_invalid_json_after_valid_signature() {
        let (app, _, _) = setup();
        let body = "not json";
        let request = Request::builder()
            .method("POST")
            .uri("/api")
            .header("X-Signature-Ed25519", sign("1", body.as_bytes()))
            .header("X-Signature-Timestamp", "1")
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_option_makes_no_calls() {
        let (app, source, mut rx) = setup();
        let payload = compare_payload(json!([{"name": "own_guild", "value": "abc"}]));
        let response = app.oneshot(signed_request(&payload)).await.unwrap();

        let body = json_body(response).await;
        assert_eq!(body["type"], 4);
        assert!(body["data"]["content"]
            .as_str()
            .unwrap()
            .contains("opponent_guild"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_compare_defers_then_delivers() {
        let (app, _, mut rx) = setup();
        let payload = compare_payload(json!([
            {"name": "own_guild", "value": "alpha"},
            {"name": "opponent_guild", "value": "beta"}
        ]));
        let response = app.oneshot(signed_request(&payload)).await.unwrap();
        assert_eq!(json_body(response).await, json!({"type": 5}));

        let (target, content) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(target.application_id, "app");
        assert_eq!(target.token, "tok");
        assert!(content.contains("Guild alpha vs Guild beta"));
        assert!(content.contains("Guild alpha: 1/2 records retrieved"));
        assert!(content.contains("Guild beta: 1/2 records retrieved"));
    }

    #[tokio::test]
    async fn test_compare_failure_is_delivered_as_message() {
        let (app, _, mut rx) = setup();
        let payload = compare_payload(json!([
            {"name": "own_guild", "value": "alpha"},
            {"name": "opponent_guild", "value": "missing"}
        ]));
        let response = app.oneshot(signed_request(&payload)).await.unwrap();
        assert_eq!(json_body(response).await, json!({"type": 5}));

        let (_, content) = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(content.starts_with("Could not compare guilds."));
        assert!(content.contains("roster unavailable"));
    }

    struct PanickingSource;

    #[async_trait]
    impl GuildDataSource for PanickingSource {
        async fn fetch_roster(&self, _guild_id: &str) -> Fetch<Roster> {
            panic!("roster decoder blew up");
        }

        async fn fetch_member_detail(&self, _member_id: &str) -> Fetch<MemberDetail> {
            Fetch::Absent
        }
    }

    /// Rejects the first delivery, then forwards the rest.
    struct FlakySink {
        attempts: AtomicUsize,
        tx: mpsc::UnboundedSender<(CallbackTarget, String)>,
    }

    #[async_trait]
    impl ResultSink for FlakySink {
        async fn deliver(
            &self,
            target: &CallbackTarget,
            content: &str,
        ) -> Result<(), DeliveryError> {
            if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(DeliveryError::Rejected {
                    status: 404,
                    body: "Unknown Webhook".to_string(),
                });
            }
            let _ = self.tx.send((target.clone(), content.to_string()));
            Ok(())
        }
    }

    fn target(token: &str) -> CallbackTarget {
        CallbackTarget {
            application_id: "app".to_string(),
            token: token.to_string(),
        }
    }

    #[tokio::test]
    async fn test_panicking_comparison_delivers_internal_error() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let state = AppState {
            verifier: Arc::new(SignatureVerifier::from_hex(&public_key_hex()).unwrap()),
            aggregator: GuildAggregator::new(Arc::new(PanickingSource), 4),
            sink: Arc::new(ChannelSink { tx }),
        };

        let handle = spawn_comparison(state, target("tok"), "alpha".into(), "beta".into());
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        let (delivered_to, content) = rx.try_recv().unwrap();
        assert_eq!(delivered_to, target("tok"));
        assert!(content.starts_with("Could not compare guilds."));
        assert!(content.contains("internal error while comparing guilds"));
    }

    #[tokio::test]
    async fn test_failed_delivery_does_not_block_later_comparisons() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let source: Arc<dyn GuildDataSource> = Arc::new(StaticSource::default());
        let state = AppState {
            verifier: Arc::new(SignatureVerifier::from_hex(&public_key_hex()).unwrap()),
            aggregator: GuildAggregator::new(source, 4),
            sink: Arc::new(FlakySink {
                attempts: AtomicUsize::new(0),
                tx,
            }),
        };

        let first = spawn_comparison(state.clone(), target("first"), "alpha".into(), "beta".into());
        tokio::time::timeout(Duration::from_secs(5), first)
            .await
            .unwrap()
            .unwrap();
        assert!(rx.try_recv().is_err());

        let second = spawn_comparison(state, target("second"), "alpha".into(), "beta".into());
        tokio::time::timeout(Duration::from_secs(5), second)
            .await
            .unwrap()
            .unwrap();

        let (delivered_to, content) = rx.try_recv().unwrap();
        assert_eq!(delivered_to.token, "second");
        assert!(content.contains("Guild alpha vs Guild beta"));
    }
}
