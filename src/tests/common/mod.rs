// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json,
};
use reqwest::Client;
use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

/// Write a service config pointing at `base_url` with a file token store
/// under `dir`; returns the config path.
pub fn write_config(dir: &Path, base_url: &str) -> String {
    let yaml = format!(
        r#"
settings:
  logging: {{ level: debug, format: compact }}
  fetch: {{ max_concurrency: 4, request_timeout_ms: 2000, batch_deadline_ms: 10000 }}
remote:
  base_url: {base_url}
credential:
  username: {{ value: operator }}
  secret: {{ value: hunter2 }}
store:
  type: file
  path: {store}
"#,
        base_url = base_url,
        store = dir.join("token.json").display(),
    );
    let path = dir.join("greenform-fetch.yaml");
    std::fs::write(&path, yaml).expect("write config");
    path.display().to_string()
}

/// In-process stand-in for the order service.
///
/// Login hands out `token-1`, `token-2`, ... Lookups answer from `orders`;
/// tokens in `revoked_for` are rejected with 401 for the listed ids only,
/// which is how a token expiring mid-batch looks from the client side.
#[derive(Clone, Default)]
pub struct FakeRemote {
    pub logins: Arc<AtomicUsize>,
    pub orders: Arc<HashMap<String, serde_json::Value>>,
    pub revoked_for: Arc<HashMap<String, HashSet<String>>>,
    pub lookups: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakeRemote {
    pub fn lookups(&self) -> Vec<(String, String)> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/auth/login", post(fake_login))
            .route("/api/order/greenform/get", get(fake_lookup))
            .with_state(self.clone())
    }
}

async fn fake_login(State(remote): State<FakeRemote>, Json(body): Json<serde_json::Value>) -> impl IntoResponse {
    if body["username"] != "operator" || body["password"] != "hunter2" {
        return (StatusCode::UNAUTHORIZED, Json(json!({"success": false, "message": "bad credentials"})));
    }
    let n = remote.logins.fetch_add(1, Ordering::SeqCst) + 1;
    (StatusCode::OK, Json(json!({"success": true, "token": format!("token-{}", n)})))
}

async fn fake_lookup(
    State(remote): State<FakeRemote>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let order_id = query.get("orderID").cloned().unwrap_or_default();
    let token = headers
        .get("x-access-token")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    remote.lookups.lock().unwrap().push((order_id.clone(), token.clone()));

    let rejected = remote
        .revoked_for
        .get(&token)
        .map(|ids| ids.contains(&order_id))
        .unwrap_or(false);
    if token.is_empty() || rejected {
        return (StatusCode::UNAUTHORIZED, Json(json!({"message": "jwt expired"})));
    }

    match remote.orders.get(&order_id) {
        Some(data) => (StatusCode::OK, Json(json!({"success": true, "data": data}))),
        None => (StatusCode::OK, Json(json!({"success": false, "message": "No data found"}))),
    }
}
