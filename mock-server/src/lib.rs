//! Small person API used to exercise eaters over real HTTP.
//!
//! Besides the person endpoints it serves the awkward cases a client has to
//! classify: non-JSON and binary bodies, arbitrary error statuses, redirects,
//! slow responses and bodies that fail validation.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

/// How long `/slow` waits before answering.
pub const SLOW_DELAY: Duration = Duration::from_millis(1500);

/// Served by `/binary/{code}`; not valid UTF-8.
pub const BINARY_BODY: [u8; 4] = [0xff, 0xfe, 0x00, 0x81];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub pk: i64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdatePersonResponse {
    pub status: String,
    pub person: Person,
}

pub type Db = Arc<RwLock<HashMap<i64, Person>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/person/{pk}/", get(get_person).post(update_person))
        .route("/people/{name}/", get(person_by_name))
        .route("/headers", get(echo_headers))
        .route("/text", get(plain_text))
        .route("/status/{code}", get(status))
        .route("/binary/{code}", get(binary))
        .route("/redirect", get(redirect))
        .route("/echo", get(echo))
        .route("/slow", get(slow))
        .route("/invalid", get(invalid))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn get_person(State(db): State<Db>, Path(pk): Path<i64>) -> Result<Json<Person>, StatusCode> {
    let people = db.read().await;
    people.get(&pk).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update_person(
    State(db): State<Db>,
    Path(pk): Path<i64>,
    Json(input): Json<Person>,
) -> Result<Json<UpdatePersonResponse>, StatusCode> {
    if input.pk != pk {
        return Err(StatusCode::BAD_REQUEST);
    }
    debug!(pk, name = %input.name, "storing person");
    db.write().await.insert(pk, input.clone());
    Ok(Json(UpdatePersonResponse {
        status: "success".to_string(),
        person: input,
    }))
}

async fn person_by_name(Path(name): Path<String>) -> Json<Value> {
    Json(json!({ "name": name }))
}

/// Echo the headers a client is expected to configure on its session.
async fn echo_headers(headers: HeaderMap) -> Json<Value> {
    let get = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
    Json(json!({
        "authorization": get("authorization"),
        "eggs": get("eggs"),
    }))
}

async fn plain_text() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], "Hello world")
}

async fn status(Path(code): Path<u16>) -> impl IntoResponse {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, Json(json!({ "name": "John" })))
}

async fn binary(Path(code): Path<u16>) -> impl IntoResponse {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST);
    (status, [(header::CONTENT_TYPE, "application/octet-stream")], BINARY_BODY.to_vec())
}

async fn redirect() -> Redirect {
    Redirect::to("/status/404")
}

/// Reflect a JSON body sent with GET.
async fn echo(Json(body): Json<Value>) -> Json<Value> {
    Json(body)
}

async fn slow() -> Json<Value> {
    tokio::time::sleep(SLOW_DELAY).await;
    Json(json!({ "name": "John" }))
}

async fn invalid() -> Json<Value> {
    Json(json!({ "name": "Joh" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn person_serializes_to_json() {
        let person = Person {
            pk: 1,
            name: "John".to_string(),
        };
        let json = serde_json::to_value(&person).unwrap();
        assert_eq!(json, json!({"pk": 1, "name": "John"}));
    }

    #[test]
    fn update_response_nests_person() {
        let response = UpdatePersonResponse {
            status: "success".to_string(),
            person: Person {
                pk: 1,
                name: "John".to_string(),
            },
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["person"]["name"], "John");
    }

    #[test]
    fn person_rejects_missing_pk() {
        let result: Result<Person, _> = serde_json::from_str(r#"{"name":"John"}"#);
        assert!(result.is_err());
    }
}
