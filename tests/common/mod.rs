//! Fake WhatsApp Cloud API shared by the integration tests.
//!
//! Records every request it receives and answers the way the real Graph API
//! does, with knobs to make uploads or sends fail.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    routing::post,
};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use order_portal::config::MessagingConfig;

pub const PHONE_NUMBER_ID: &str = "1098765";
pub const ACCESS_TOKEN: &str = "test-token";
pub const RECIPIENT: &str = "919800000000";

/// Maximum time any test is allowed to run before we consider it hung.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub enum VendorCall {
    Upload {
        version: String,
        phone_number_id: String,
        authorization: Option<String>,
        messaging_product: Option<String>,
        media_type: Option<String>,
        file_name: Option<String>,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
    Message {
        version: String,
        phone_number_id: String,
        authorization: Option<String>,
        body: Value,
    },
}

impl VendorCall {
    pub fn is_upload(&self) -> bool {
        matches!(self, Self::Upload { .. })
    }
}

/// How the fake vendor misbehaves.
#[derive(Debug, Clone, Default)]
pub struct VendorBehavior {
    /// Uploads answer 200 but omit the media id.
    pub upload_without_id: bool,
    /// Uploads of these file names answer 400.
    pub reject_uploads_named: Vec<String>,
    /// Every message send answers 401.
    pub reject_messages: bool,
}

#[derive(Clone)]
struct VendorState {
    calls: Arc<Mutex<Vec<VendorCall>>>,
    behavior: VendorBehavior,
    counter: Arc<AtomicUsize>,
}

pub struct FakeVendor {
    pub base_url: String,
    calls: Arc<Mutex<Vec<VendorCall>>>,
}

impl FakeVendor {
    /// Start the fake API on a random port.
    pub async fn start(behavior: VendorBehavior) -> Self {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let state = VendorState {
            calls: Arc::clone(&calls),
            behavior,
            counter: Arc::new(AtomicUsize::new(1)),
        };

        let app = Router::new()
            .route("/{version}/{phone}/media", post(upload_media))
            .route("/{version}/{phone}/messages", post(send_message))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting connections.
        tokio::time::sleep(Duration::from_millis(50)).await;

        Self {
            base_url: format!("http://127.0.0.1:{port}"),
            calls,
        }
    }

    pub async fn calls(&self) -> Vec<VendorCall> {
        self.calls.lock().await.clone()
    }

    pub fn messaging_config(&self) -> MessagingConfig {
        MessagingConfig {
            phone_number_id: PHONE_NUMBER_ID.into(),
            access_token: SecretString::from(ACCESS_TOKEN),
            recipient: RECIPIENT.into(),
            api_base_url: self.base_url.clone(),
            api_version: "v19.0".into(),
        }
    }
}

fn authorization(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

async fn upload_media(
    State(state): State<VendorState>,
    Path((version, phone_number_id)): Path<(String, String)>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> (StatusCode, Json<Value>) {
    let mut messaging_product = None;
    let mut media_type = None;
    let mut file_name = None;
    let mut content_type = None;
    let mut bytes = Vec::new();

    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(String::from);
                content_type = field.content_type().map(String::from);
                bytes = field.bytes().await.unwrap().to_vec();
            }
            "messaging_product" => messaging_product = Some(field.text().await.unwrap()),
            "type" => media_type = Some(field.text().await.unwrap()),
            _ => {}
        }
    }

    let rejected = file_name
        .as_ref()
        .is_some_and(|n| state.behavior.reject_uploads_named.contains(n));

    state.calls.lock().await.push(VendorCall::Upload {
        version,
        phone_number_id,
        authorization: authorization(&headers),
        messaging_product,
        media_type,
        file_name,
        content_type,
        bytes,
    });

    if rejected {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": {"message": "(#100) Param file must be a file", "code": 100}})),
        );
    }
    if state.behavior.upload_without_id {
        return (StatusCode::OK, Json(json!({"success": true})));
    }

    let n = state.counter.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, Json(json!({"id": format!("media-{n}")})))
}

async fn send_message(
    State(state): State<VendorState>,
    Path((version, phone_number_id)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let to = body["to"].clone();

    state.calls.lock().await.push(VendorCall::Message {
        version,
        phone_number_id,
        authorization: authorization(&headers),
        body,
    });

    if state.behavior.reject_messages {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"message": "Invalid OAuth access token.", "code": 190}})),
        );
    }

    let n = state.counter.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::OK,
        Json(json!({
            "messaging_product": "whatsapp",
            "contacts": [{"input": to, "wa_id": to}],
            "messages": [{"id": format!("wamid.{n}")}]
        })),
    )
}
