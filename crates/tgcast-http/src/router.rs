use std::{future::Future, sync::Arc};

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio_util::task::TaskTracker;

use tgcast_core::{config::Config, dispatcher::BroadcastDispatcher, store::RecipientStore};

use crate::handlers;

pub struct AppState {
    pub cfg: Arc<Config>,
    pub store: Arc<dyn RecipientStore>,
    pub dispatcher: Arc<BroadcastDispatcher>,
    /// Broadcasts outlive the request that started them.
    pub broadcasts: TaskTracker,
}

impl AppState {
    pub fn new(cfg: Arc<Config>, dispatcher: Arc<BroadcastDispatcher>) -> Self {
        Self {
            cfg,
            store: dispatcher.store().clone(),
            dispatcher,
            broadcasts: TaskTracker::new(),
        }
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/useradd", post(handlers::handle_useradd))
        .route("/broadcast", post(handlers::handle_broadcast))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves, then drain in-flight requests
/// and wait for running broadcasts to settle.
pub async fn serve(
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = state.cfg.listen_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(
        addr = %listener.local_addr()?,
        bots_dir = %state.cfg.bots_dir.display(),
        "tgcast listening"
    );

    axum::serve(listener, build_router(state.clone()))
        .with_graceful_shutdown(shutdown)
        .await?;

    state.broadcasts.close();
    if !state.broadcasts.is_empty() {
        tracing::info!(running = state.broadcasts.len(), "waiting for broadcasts");
    }
    state.broadcasts.wait().await;

    tracing::info!("tgcast stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use std::{sync::Mutex, time::Duration};
    use tgcast_core::{
        domain::{Credential, MessageId, MessageRef, RecipientId},
        messaging::{MessagingClient, ProviderError},
        store::JsonFileStore,
    };
    use tokio::io::AsyncWriteExt;
    use tower::ServiceExt;

    #[derive(Default)]
    struct FakeMessenger {
        fail_operator: bool,
        blocked: Vec<String>,
        delay: Option<Duration>,
        sends: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MessagingClient for FakeMessenger {
        async fn send(
            &self,
            to: &RecipientId,
            _text: &str,
            _credential: &Credential,
        ) -> Result<MessageRef, ProviderError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.sends.lock().unwrap().push(to.to_string());
            if to.as_str() == "admin" && self.fail_operator {
                return Err(ProviderError::new(400, "Bad Request: chat not found"));
            }
            if self.blocked.iter().any(|b| b == to.as_str()) {
                return Err(ProviderError::new(403, "Forbidden"));
            }
            Ok(MessageRef {
                chat: to.clone(),
                message_id: MessageId(1),
            })
        }

        async fn edit(
            &self,
            _msg: &MessageRef,
            _text: &str,
            _credential: &Credential,
        ) -> Result<(), ProviderError> {
            Ok(())
        }
    }

    fn state(dir: &std::path::Path, messenger: Arc<FakeMessenger>) -> Arc<AppState> {
        let cfg = Config::from_lookup(|_| None).unwrap();
        let store = Arc::new(JsonFileStore::new(dir));
        let dispatcher = Arc::new(BroadcastDispatcher::new(store, messenger));
        Arc::new(AppState::new(Arc::new(cfg), dispatcher))
    }

    fn app(dir: &std::path::Path, messenger: Arc<FakeMessenger>) -> Router {
        build_router(state(dir, messenger))
    }

    async fn post_raw(
        app: &Router,
        uri: &str,
        content_type: Option<&str>,
        body: impl Into<Body>,
    ) -> (StatusCode, serde_json::Value) {
        let mut req = Request::builder().method("POST").uri(uri);
        if let Some(ct) = content_type {
            req = req.header("content-type", ct);
        }
        let resp = app
            .clone()
            .oneshot(req.body(body.into()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn post_json(
        app: &Router,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        post_raw(app, uri, Some("application/json"), body.to_string()).await
    }

    #[tokio::test]
    async fn useradd_registers_once() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), Arc::new(FakeMessenger::default()));

        for _ in 0..2 {
            let (status, body) = post_json(
                &app,
                "/useradd",
                serde_json::json!({ "bot_id": "news", "user_id": 42 }),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["success"], true);
            assert_eq!(body["message"], "User 42 added to bot news");
        }

        let raw = std::fs::read_to_string(dir.path().join("news/user.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["users"], serde_json::json!(["42"]));
    }

    #[tokio::test]
    async fn useradd_missing_field_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), Arc::new(FakeMessenger::default()));

        let (status, body) =
            post_json(&app, "/useradd", serde_json::json!({ "bot_id": "news" })).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(!dir.path().join("news").exists());
    }

    #[tokio::test]
    async fn useradd_without_body_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), Arc::new(FakeMessenger::default()));

        let (status, body) = post_raw(&app, "/useradd", None, Body::empty()).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "bot_id and user_id are required");
    }

    #[tokio::test]
    async fn useradd_padded_bot_id_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(dir.path(), Arc::new(FakeMessenger::default()));

        let (status, body) = post_json(
            &app,
            "/useradd",
            serde_json::json!({ "bot_id": " news ", "user_id": 1 }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(!dir.path().join(" news ").exists());
    }

    #[tokio::test]
    async fn useradd_corrupt_registry_is_500() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("news")).unwrap();
        std::fs::write(dir.path().join("news/user.json"), "{not json").unwrap();
        let app = app(dir.path(), Arc::new(FakeMessenger::default()));

        let (status, body) = post_json(
            &app,
            "/useradd",
            serde_json::json!({ "bot_id": "news", "user_id": 42 }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Error adding user");
        assert!(!body["error"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn broadcast_reports_stats() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(FakeMessenger {
            blocked: vec!["b".to_string()],
            ..FakeMessenger::default()
        });
        let app = app(dir.path(), messenger.clone());

        for user in ["a", "b", "c"] {
            post_json(
                &app,
                "/useradd",
                serde_json::json!({ "bot_id": "c1", "user_id": user }),
            )
            .await;
        }

        let (status, body) = post_json(
            &app,
            "/broadcast",
            serde_json::json!({ "bot_id": "c1", "text": "hi", "admin_id": "admin", "token": "t" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Broadcast completed with live updates");
        assert_eq!(
            body["stats"],
            serde_json::json!({ "total": 3, "success": 2, "blocked": 1, "deleted": 0, "failed": 0 })
        );
        assert_eq!(
            *messenger.sends.lock().unwrap(),
            vec!["admin", "a", "b", "c"]
        );
    }

    #[tokio::test]
    async fn broadcast_missing_token_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(FakeMessenger::default());
        let app = app(dir.path(), messenger.clone());

        let (status, body) = post_json(
            &app,
            "/broadcast",
            serde_json::json!({ "bot_id": "c1", "text": "hi", "admin_id": "admin" }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(messenger.sends.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn broadcast_malformed_body_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(FakeMessenger::default());
        let app = app(dir.path(), messenger.clone());

        let (status, body) =
            post_raw(&app, "/broadcast", Some("application/json"), "{\"bot_id\": ").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["message"],
            "bot_id, text, bot token, and admin_id are required"
        );
        assert!(messenger.sends.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn broadcast_survives_client_disconnect() {
        let dir = tempfile::tempdir().unwrap();
        let recipients: Vec<String> = (0..20).map(|i| format!("r{i}")).collect();
        std::fs::create_dir_all(dir.path().join("c1")).unwrap();
        std::fs::write(
            dir.path().join("c1/user.json"),
            serde_json::json!({ "users": recipients }).to_string(),
        )
        .unwrap();

        let messenger = Arc::new(FakeMessenger {
            delay: Some(Duration::from_millis(20)),
            ..FakeMessenger::default()
        });
        let state = state(dir.path(), messenger.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = build_router(state.clone());
        tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });

        let payload =
            serde_json::json!({ "bot_id": "c1", "text": "hi", "admin_id": "admin", "token": "t" })
                .to_string();
        let mut client = tokio::net::TcpStream::connect(addr).await.unwrap();
        client
            .write_all(
                format!(
                    "POST /broadcast HTTP/1.1\r\nHost: {addr}\r\n\
                     Content-Type: application/json\r\nContent-Length: {}\r\n\r\n{payload}",
                    payload.len()
                )
                .as_bytes(),
            )
            .await
            .unwrap();

        // Hang up once delivery is under way.
        while messenger.sends.lock().unwrap().len() < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        drop(client);

        state.broadcasts.close();
        tokio::time::timeout(Duration::from_secs(5), state.broadcasts.wait())
            .await
            .unwrap();

        let mut expected = vec!["admin".to_string()];
        expected.extend(recipients);
        assert_eq!(*messenger.sends.lock().unwrap(), expected);
    }

    #[tokio::test]
    async fn broadcast_unknown_channel_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(FakeMessenger::default());
        let app = app(dir.path(), messenger.clone());

        let (status, body) = post_json(
            &app,
            "/broadcast",
            serde_json::json!({ "bot_id": "ghost", "text": "hi", "admin_id": "admin", "token": "t" }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Error during broadcast");
        assert!(body["error"].as_str().unwrap().contains("ghost"));
        assert!(messenger.sends.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn broadcast_operator_unreachable_is_500() {
        let dir = tempfile::tempdir().unwrap();
        let messenger = Arc::new(FakeMessenger {
            fail_operator: true,
            ..FakeMessenger::default()
        });
        let app = app(dir.path(), messenger.clone());
        post_json(
            &app,
            "/useradd",
            serde_json::json!({ "bot_id": "c1", "user_id": "a" }),
        )
        .await;

        let (status, body) = post_json(
            &app,
            "/broadcast",
            serde_json::json!({ "bot_id": "c1", "text": "hi", "admin_id": "admin", "token": "t" }),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Failed to notify admin about broadcast start");
        assert_eq!(*messenger.sends.lock().unwrap(), vec!["admin"]);
    }
}
