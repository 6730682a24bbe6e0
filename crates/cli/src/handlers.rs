//! Request shim: one thin translation layer between an external transport
//! and the engine.
//!
//! Each operation maps an incoming request to exactly one kind of engine
//! call and folds the outcome into a [`Response`] with an HTTP-style
//! status code:
//!
//! | outcome                        | status |
//! |--------------------------------|--------|
//! | success                        | 200    |
//! | missing key / malformed payload| 400    |
//! | key not found / tombstoned     | 404    |
//! | engine failure                 | 500    |
//!
//! The shim knows nothing about sockets or framing; an HTTP server, a
//! REPL, or a test harness can all sit on top of it unchanged.

use engine::{Db, Error};
use serde_json::Value;
use tracing::warn;

/// A transport-agnostic response: a status code plus raw body bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: Vec<u8>,
}

impl Response {
    fn ok(body: Vec<u8>) -> Self {
        Self { status: 200, body }
    }

    fn bad_request(msg: &str) -> Self {
        Self {
            status: 400,
            body: msg.as_bytes().to_vec(),
        }
    }

    fn not_found() -> Self {
        Self {
            status: 404,
            body: b"key not found".to_vec(),
        }
    }

    fn internal(err: &Error) -> Self {
        warn!(error = %err, "request failed inside the engine");
        Self {
            status: 500,
            body: err.to_string().into_bytes(),
        }
    }
}

/// `get(key)`: the value bytes, or 404 when the key is absent or
/// tombstoned, or 400 when no key was supplied.
pub fn get(db: &Db, key: Option<&str>) -> Response {
    let key = match key.filter(|k| !k.is_empty()) {
        Some(k) => k,
        None => return Response::bad_request("key not provided"),
    };

    match db.get(key.as_bytes()) {
        Ok(value) => Response::ok(value),
        Err(Error::KeyNotFound) => Response::not_found(),
        Err(e) => Response::internal(&e),
    }
}

/// `set(payload)`: the payload is a JSON object; every pair is applied as
/// one engine `set`. String values are stored as their UTF-8 bytes; any
/// other JSON value is stored as its canonical JSON text (object keys come
/// out sorted, so the encoding is deterministic). The first failing pair
/// aborts the request.
pub fn set(db: &Db, payload: &[u8]) -> Response {
    let parsed: Value = match serde_json::from_slice(payload) {
        Ok(v) => v,
        Err(_) => return Response::bad_request("invalid json payload"),
    };
    let pairs = match parsed {
        Value::Object(pairs) => pairs,
        _ => return Response::bad_request("payload must be a json object"),
    };
    if pairs.is_empty() {
        return Response::bad_request("no key-value pairs in payload");
    }

    for (key, value) in pairs {
        let bytes = match value {
            Value::String(s) => s.into_bytes(),
            other => other.to_string().into_bytes(),
        };
        match db.set(key.into_bytes(), bytes) {
            Ok(()) => {}
            // an unusable key inside the object is the payload's fault
            Err(Error::InvalidArgument(msg)) => return Response::bad_request(&msg),
            Err(e) => return Response::internal(&e),
        }
    }
    Response::ok(Vec::new())
}

/// `del(key)`: the pre-delete value bytes, or 404 when there was nothing
/// to delete, or 400 when no key was supplied.
pub fn del(db: &Db, key: Option<&str>) -> Response {
    let key = match key.filter(|k| !k.is_empty()) {
        Some(k) => k,
        None => return Response::bad_request("key not provided"),
    };

    match db.delete(key.as_bytes()) {
        Ok(previous) => Response::ok(previous),
        Err(Error::KeyNotFound) => Response::not_found(),
        Err(e) => Response::internal(&e),
    }
}
