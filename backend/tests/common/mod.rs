//! Shared setup for the integration tests: a full app over temporary storage.
#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use gastro_tracker::config::AppConfig;
use gastro_tracker::storage::cloud::InMemoryDocumentStore;
use gastro_tracker::storage::files::FolderFileStore;
use gastro_tracker::{build_app_state, create_router, AppState};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

pub const WAIT: Duration = Duration::from_secs(2);

pub struct TestApp {
    pub temp_dir: TempDir,
    pub config: AppConfig,
    pub state: AppState,
    pub router: Router,
    pub remote: Arc<InMemoryDocumentStore>,
    pub files: Arc<FolderFileStore>,
}

impl TestApp {
    /// A local-mode app with empty storage
    pub async fn start() -> TestApp {
        let temp_dir = TempDir::new().unwrap();
        let config = AppConfig {
            data_directory: temp_dir.path().join("data"),
            remote_timeout_secs: 2,
            ..Default::default()
        };
        let remote = Arc::new(InMemoryDocumentStore::new());
        let files = Arc::new(FolderFileStore::new(temp_dir.path().join("cloud_files")).unwrap());
        let app = Self::over(temp_dir, config, remote, files);
        app.state.state_manager.restore_session().await.unwrap();
        app
    }

    /// A second app over the same directories, as after a restart
    pub async fn restart(&self) -> AppState {
        let state = build_app_state(&self.config, self.remote.clone(), self.files.clone()).unwrap();
        state.state_manager.restore_session().await.unwrap();
        state
    }

    fn over(
        temp_dir: TempDir,
        config: AppConfig,
        remote: Arc<InMemoryDocumentStore>,
        files: Arc<FolderFileStore>,
    ) -> TestApp {
        let state = build_app_state(&config, remote.clone(), files.clone()).unwrap();
        let router = create_router(state.clone());
        TestApp {
            temp_dir,
            config,
            state,
            router,
            remote,
            files,
        }
    }

    pub async fn request(&self, method: Method, uri: &str, body: Body, content_type: &str) -> (StatusCode, Vec<u8>, String) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type)
            .body(body)
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec(), disposition)
    }

    pub async fn get<T: DeserializeOwned>(&self, uri: &str) -> (StatusCode, T) {
        let (status, bytes, _) = self.request(Method::GET, uri, Body::empty(), "application/json").await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    pub async fn send<B: Serialize, T: DeserializeOwned>(&self, method: Method, uri: &str, body: &B) -> (StatusCode, T) {
        let json = serde_json::to_vec(body).unwrap();
        let (status, bytes, _) = self.request(method, uri, Body::from(json), "application/json").await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, uri: &str, body: &B) -> (StatusCode, T) {
        self.send(Method::POST, uri, body).await
    }
}

pub fn purchase_request(amount: f64, merchant: &str) -> shared::CreatePurchaseRequest {
    shared::CreatePurchaseRequest {
        amount,
        date: None,
        merchant_name: merchant.to_string(),
        merchant_location: None,
        description: None,
        receipt_image: None,
    }
}

pub fn sign_in_request(uid: &str) -> shared::SignInRequest {
    shared::IdentityInfo {
        uid: uid.to_string(),
        email: format!("{}@example.com", uid),
        display_name: Some("Ana".to_string()),
    }
}
