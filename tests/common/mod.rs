#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::routing::any;
use axum::{Json, Router};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::{json, Value};

use certkit::api::ApiConfig;
use certkit::email::{EmailError, Mailer, OutgoingEmail};

pub const API_KEY: &str = "test-key";

/// In-memory stand-in for the certificate registry service
#[derive(Default)]
pub struct MockState {
    pub records: Mutex<BTreeMap<String, Value>>,
    pub requests: AtomicUsize,
    /// Answer this many upcoming requests with 503
    pub fail_next: AtomicUsize,
}

pub struct MockRegistry {
    pub base_url: String,
    pub state: Arc<MockState>,
}

impl MockRegistry {
    pub async fn start() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let state = Arc::new(MockState::default());

        let app = Router::new()
            .route("/api.php", any(handle))
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port)).await?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { base_url: format!("http://127.0.0.1:{}/api.php", port), state })
    }

    pub fn config(&self) -> ApiConfig {
        ApiConfig {
            api_enabled: true,
            api_base_url: self.base_url.clone(),
            api_key: API_KEY.to_string(),
            default_expiry_years: 2,
            timeout_seconds: 5,
            retry_attempts: 2,
            retry_delay_ms: 10,
        }
    }

    pub fn fail_next(&self, count: usize) {
        self.state.fail_next.store(count, Ordering::SeqCst);
    }

    pub fn requests(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    pub fn record(&self, certificate_id: &str) -> Option<Value> {
        self.state.records.lock().unwrap().get(certificate_id).cloned()
    }

    pub fn insert(&self, record: Value) {
        let id = record["certificate_id"].as_str().unwrap().to_string();
        self.state.records.lock().unwrap().insert(id, record);
    }
}

fn reply(status: StatusCode, body: Value) -> (StatusCode, Json<Value>) {
    (status, Json(body))
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    body: String,
) -> (StatusCode, Json<Value>) {
    state.requests.fetch_add(1, Ordering::SeqCst);

    let pending = state.fail_next.load(Ordering::SeqCst);
    if pending > 0 {
        state.fail_next.store(pending - 1, Ordering::SeqCst);
        return reply(StatusCode::SERVICE_UNAVAILABLE, json!({"success": false, "message": "try later"}));
    }

    if headers.get("x-api-key").and_then(|v| v.to_str().ok()) != Some(API_KEY) {
        return reply(StatusCode::UNAUTHORIZED, json!({"success": false, "message": "Invalid API key"}));
    }

    let mut records = state.records.lock().unwrap();
    let payload: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

    match method {
        Method::GET => {
            if let Some(id) = params.get("certificate_id") {
                return match records.get(id) {
                    Some(record) => reply(StatusCode::OK, json!({"success": true, "data": record})),
                    None => reply(StatusCode::NOT_FOUND, json!({"success": false, "message": "Certificate not found"})),
                };
            }
            if !params.contains_key("page") {
                return reply(StatusCode::BAD_REQUEST, json!({"success": false, "message": "certificate_id required"}));
            }

            let page: usize = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1).max(1);
            let limit: usize = params.get("limit").and_then(|l| l.parse().ok()).unwrap_or(20);
            let search = params.get("search").map(|s| s.to_lowercase());
            let matching: Vec<&Value> = records
                .values()
                .filter(|r| match &search {
                    Some(s) => r["recipient_name"].as_str().unwrap_or("").to_lowercase().contains(s),
                    None => true,
                })
                .collect();
            let data: Vec<&Value> = matching.iter().skip((page - 1) * limit).take(limit).copied().collect();
            reply(
                StatusCode::OK,
                json!({"success": true, "data": data, "pagination": {"page": page, "limit": limit, "total": matching.len()}}),
            )
        }
        Method::POST => {
            let Some(id) = payload["certificate_id"].as_str().map(str::to_string) else {
                return reply(StatusCode::BAD_REQUEST, json!({"success": false, "message": "certificate_id required"}));
            };
            if records.contains_key(&id) {
                return reply(StatusCode::CONFLICT, json!({"success": false, "message": "Certificate already exists"}));
            }
            records.insert(id.clone(), payload);
            reply(StatusCode::CREATED, json!({"success": true, "message": "Certificate created", "certificate_id": id}))
        }
        Method::PUT => {
            let id = payload["certificate_id"].as_str().unwrap_or_default().to_string();
            match (records.get_mut(&id), payload.as_object()) {
                (Some(Value::Object(existing)), Some(changes)) => {
                    for (key, value) in changes {
                        existing.insert(key.clone(), value.clone());
                    }
                    reply(StatusCode::OK, json!({"success": true, "message": "Certificate updated"}))
                }
                _ => reply(StatusCode::NOT_FOUND, json!({"success": false, "message": "Certificate not found"})),
            }
        }
        Method::DELETE => {
            let id = params.get("certificate_id").cloned().unwrap_or_default();
            match records.remove(&id) {
                Some(_) => reply(StatusCode::OK, json!({"success": true, "message": "Certificate deleted"})),
                None => reply(StatusCode::NOT_FOUND, json!({"success": false, "message": "Certificate not found"})),
            }
        }
        _ => reply(StatusCode::METHOD_NOT_ALLOWED, json!({"success": false})),
    }
}

/// Records every message instead of sending it
#[derive(Default)]
pub struct MockMailer {
    pub sent: Mutex<Vec<OutgoingEmail>>,
    /// Addresses whose send fails
    pub reject: Vec<String>,
    pub refuse_connect: bool,
}

impl MockMailer {
    pub fn rejecting(addresses: &[&str]) -> Self {
        Self { reject: addresses.iter().map(|a| a.to_string()).collect(), ..Default::default() }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn connect(&self) -> Result<(), EmailError> {
        if self.refuse_connect {
            return Err(EmailError::Connect {
                server: "mock:587".to_string(),
                message: "authentication failed".to_string(),
            });
        }
        Ok(())
    }

    async fn send(&self, email: &OutgoingEmail) -> Result<(), EmailError> {
        if self.reject.contains(&email.to) {
            return Err(EmailError::Send(format!("550 mailbox unavailable: {}", email.to)));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Single-page landscape A4 template with some existing text on it
pub fn write_template(path: &Path) -> Result<()> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 24.into()]),
            Operation::new("Td", vec![100.into(), 500.into()]),
            Operation::new("Tj", vec![Object::string_literal("Certificate of Completion")]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 842.into(), 595.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path)?;
    Ok(())
}

/// Concatenated content streams of the first page
pub fn first_page_content(path: &Path) -> Result<Vec<u8>> {
    let doc = Document::load(path)?;
    let page_id = *doc.get_pages().values().next().context("no pages")?;
    Ok(doc.get_page_content(page_id)?)
}

pub fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle.as_bytes())
}
