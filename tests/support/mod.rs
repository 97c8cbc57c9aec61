//! In-process store server speaking the JSON envelope protocol.
//!
//! Keys live under `/api/`. A few reserved keys misbehave on purpose:
//! - `broken`: 500 with a plain-text body
//! - `garbled`: 200 with a body that is not JSON
//! - `refused`: 500 with a well-formed `success: false` envelope
//! - `slow`: answers after two seconds
//! - `nullish`: succeeds with `null` for `message` and `value`

#![allow(dead_code)]

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use percent_encoding::percent_decode_str;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const PREFIX: &str = "/api/";

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

#[derive(Clone)]
pub struct MockStore {
    token: String,
    entries: Arc<Mutex<Vec<(String, String)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    addr: SocketAddr,
}

impl MockStore {
    /// Bind to an ephemeral port and serve until the test runtime shuts down.
    pub async fn start(token: &str) -> MockStore {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let store = MockStore {
            token: token.to_string(),
            entries: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            addr: listener.local_addr().unwrap(),
        };

        let service = store.clone();
        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => continue,
                };
                let service = service.clone();
                tokio::spawn(async move {
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        store
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn raw_value(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    async fn handle(&self, req: Request<Incoming>) -> Response<Full<Bytes>> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let authorization = req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = req
            .into_body()
            .collect()
            .await
            .map(|c| String::from_utf8_lossy(&c.to_bytes()).into_owned())
            .unwrap_or_default();

        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            authorization: authorization.clone(),
            body: body.clone(),
        });

        if authorization.as_deref() != Some(format!("Bearer {}", self.token).as_str()) {
            return envelope(StatusCode::UNAUTHORIZED, json!({"success": false, "message": "unauthorized"}));
        }

        let key = match path.strip_prefix(PREFIX) {
            Some(rest) => percent_decode_str(rest).decode_utf8_lossy().into_owned(),
            None => {
                return envelope(StatusCode::NOT_FOUND, json!({"success": false, "message": "no such route"}));
            }
        };

        match key.as_str() {
            "broken" => return plain(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            "garbled" => return plain(StatusCode::OK, "not json at all"),
            "refused" => {
                return envelope(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({"success": false, "message": "disk full"}),
                );
            }
            "nullish" if method == Method::GET => {
                return envelope(StatusCode::OK, json!({"success": true, "message": null, "value": null}));
            }
            "slow" => tokio::time::sleep(Duration::from_secs(2)).await,
            _ => {}
        }

        match (method.as_str(), key.is_empty()) {
            ("GET", true) => self.list(),
            ("GET", false) => self.get(&key),
            ("POST", false) | ("PUT", false) => self.set(&key, &body),
            ("DELETE", false) => self.delete(&key),
            _ => envelope(StatusCode::BAD_REQUEST, json!({"success": false, "message": "key required"})),
        }
    }

    fn list(&self) -> Response<Full<Bytes>> {
        let entries = self.entries.lock().unwrap();
        if entries.is_empty() {
            // empty lists come back as null
            return envelope(StatusCode::OK, json!({"success": true, "message": "", "items": null}));
        }
        let items: Vec<Value> = entries.iter().map(|(k, _)| json!({"k": k})).collect();
        envelope(StatusCode::OK, json!({"success": true, "message": "", "items": items}))
    }

    fn get(&self, key: &str) -> Response<Full<Bytes>> {
        match self.raw_value(key) {
            Some(value) => envelope(StatusCode::OK, json!({"success": true, "message": "", "value": value})),
            None => envelope(StatusCode::OK, json!({"success": false, "message": "not found"})),
        }
    }

    fn set(&self, key: &str, body: &str) -> Response<Full<Bytes>> {
        let value = match serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("value").and_then(Value::as_str).map(str::to_string))
        {
            Some(value) => value,
            None => {
                return envelope(StatusCode::BAD_REQUEST, json!({"success": false, "message": "bad body"}));
            }
        };

        let mut entries = self.entries.lock().unwrap();
        let message = match entries.iter().position(|(k, _)| k == key) {
            Some(idx) => {
                entries[idx].1 = value;
                "updated"
            }
            None => {
                entries.push((key.to_string(), value));
                "created"
            }
        };
        envelope(StatusCode::OK, json!({"success": true, "message": message}))
    }

    fn delete(&self, key: &str) -> Response<Full<Bytes>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.iter().position(|(k, _)| k == key) {
            Some(idx) => {
                entries.remove(idx);
                envelope(StatusCode::OK, json!({"success": true, "message": "deleted"}))
            }
            None => envelope(StatusCode::OK, json!({"success": false, "message": "not found"})),
        }
    }
}

fn envelope(status: StatusCode, body: Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

fn plain(status: StatusCode, body: &'static str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/plain")
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap()
}

impl hyper::service::Service<Request<Incoming>> for MockStore {
    type Response = Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let store = self.clone();
        Box::pin(async move { Ok(store.handle(req).await) })
    }
}
