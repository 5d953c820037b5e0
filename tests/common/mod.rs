#![allow(dead_code)]

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;

use inventory_manager::auth::{generate_jwt, Claims};
use inventory_manager::client::ApiClient;
use inventory_manager::database::MemoryRepository;
use inventory_manager::routes::{app, AppState};

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Bind before returning so requests queue until the server loop runs
        let listener = std::net::TcpListener::bind(("127.0.0.1", port)).context("failed to bind test port")?;
        listener.set_nonblocking(true)?;

        // Own runtime on its own thread: each #[tokio::test] drops its runtime on exit
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .expect("failed to build server runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).expect("failed to adopt listener");
                let state = AppState::new(Arc::new(MemoryRepository::demo()));
                axum::serve(listener, app(state)).await.expect("server stopped");
            });
        });

        Ok(Self { port, base_url })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to start test server"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Bearer token for a demo user (1 owns the main data set, 2 owns one row per table)
pub fn token_for(user_id: i64) -> String {
    generate_jwt(&Claims::new(user_id, format!("user{}", user_id))).expect("failed to sign test token")
}

pub async fn api_client(user_id: i64) -> Result<Arc<ApiClient>> {
    let server = ensure_server().await?;
    Ok(Arc::new(ApiClient::new(&server.base_url, Some(token_for(user_id)))?))
}

pub async fn get(path: &str, user_id: Option<i64>) -> Result<(StatusCode, serde_json::Value)> {
    let server = ensure_server().await?;
    let mut request = reqwest::Client::new().get(format!("{}{}", server.base_url, path));
    if let Some(user_id) = user_id {
        request = request.bearer_auth(token_for(user_id));
    }
    let res = request.send().await?;
    let status = res.status();
    let body = res.json::<serde_json::Value>().await.unwrap_or(serde_json::Value::Null);
    Ok((status, body))
}
