//! Entity handlers

use crate::error::{ApiError, ApiResult};
use crate::services::{ListOptions, NewEntity};
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use exquisite_core::Entity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Listing size when `count` is absent or below 1
pub const LIST_COUNT_DEFAULT: i64 = 1000;

/// Upper bound on a single listing
pub const LIST_COUNT_MAX: i64 = 10000;

/// Query string of `GET /entities`.
///
/// `offset` is an older name for `start`; when both are given `start` wins.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    count: Option<i64>,
    filter: Option<String>,
    start: Option<i64>,
    offset: Option<i64>,
}

impl ListParams {
    fn into_options(self) -> ListOptions {
        let count = match self.count {
            Some(count) if count >= 1 => count.min(LIST_COUNT_MAX),
            _ => LIST_COUNT_DEFAULT,
        };
        let start = self.start.or(self.offset).unwrap_or(0).max(0);

        ListOptions {
            limit: count as usize,
            filter: self.filter,
            offset: start as usize,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateEntityRequest {
    #[serde(default, alias = "uuid")]
    id: Option<String>,
    #[serde(default)]
    data: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateEntityRequest {
    #[serde(default)]
    data: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    result: &'static str,
}

/// Validate an identifier and return its canonical form.
///
/// Uppercase, simple, braced and URN spellings of a UUID all map to the
/// same lowercase hyphenated key.
fn parse_id(raw: &str) -> ApiResult<String> {
    Uuid::parse_str(raw)
        .map(|id| id.hyphenated().to_string())
        .map_err(|_| ApiError::invalid_id())
}

pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<Json<Vec<Entity>>> {
    let Query(params) = params?;
    let entities = state.service.list(&params.into_options()).await?;
    Ok(Json(entities))
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<CreateEntityRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Entity>)> {
    let Json(req) = payload?;

    let id = match req.id {
        Some(id) if !id.is_empty() => Some(parse_id(&id)?),
        _ => None,
    };

    let entity = state
        .service
        .create(NewEntity { id, data: req.data })
        .await?;
    Ok((StatusCode::CREATED, Json(entity)))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Entity>> {
    let id = parse_id(&id)?;
    Ok(Json(state.service.get(&id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateEntityRequest>, JsonRejection>,
) -> ApiResult<Json<Entity>> {
    let id = parse_id(&id)?;
    let Json(req) = payload?;

    Ok(Json(state.service.update(&id, &req.data).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteResponse>> {
    let id = parse_id(&id)?;
    state.service.delete(&id).await?;
    Ok(Json(DeleteResponse { result: "success" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::EntityService;
    use crate::{build_router, AppState};
    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request},
        Router,
    };
    use exquisite_core::generator::{generate_entities, generate_id};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> (Router, Arc<EntityService>) {
        let service = Arc::new(EntityService::fallback());
        let router = build_router(AppState {
            service: service.clone(),
        });
        (router, service)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let request = builder
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        if bytes.is_empty() {
            return (status, Value::Null);
        }
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_root_is_ok() {
        let (app, _) = app();
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("server"));

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert_eq!(text.len(), 10);
        assert!(text.starts_with("OK"));
        assert!(text[2..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (app, _) = app();

        let (status, created) = send(&app, Method::POST, "/entity", Some(r#"{"data":"test data"}"#)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["data"], "test data");
        let id = created["id"].as_str().unwrap().to_string();
        assert!(Uuid::parse_str(&id).is_ok());

        let (status, fetched) = send(&app, Method::GET, &format!("/entity/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_with_caller_id() {
        let (app, _) = app();
        let id = generate_id();

        let body = json!({ "uuid": id, "data": "given" }).to_string();
        let (status, created) = send(&app, Method::POST, "/entity", Some(&body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["id"], id.as_str());

        // Second insert with the same id hits the uniqueness constraint
        let (status, _) = send(&app, Method::POST, "/entity", Some(&body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_uuid_spellings_share_one_key() {
        let (app, service) = app();
        let id = generate_id();
        let upper = id.to_uppercase();

        let body = json!({ "id": upper, "data": "one" }).to_string();
        let (status, created) = send(&app, Method::POST, "/entity", Some(&body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["id"], id.as_str());

        let (status, fetched) = send(&app, Method::GET, &format!("/entity/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["data"], "one");

        // Every other spelling names the entity that already exists
        let simple = id.replace('-', "");
        for other in [upper.clone(), simple.clone(), format!("{{{id}}}"), format!("urn:uuid:{id}")] {
            let body = json!({ "id": other, "data": "two" }).to_string();
            let (status, _) = send(&app, Method::POST, "/entity", Some(&body)).await;
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        }
        assert_eq!(service.count().await.unwrap(), 1);

        let (status, fetched) = send(&app, Method::GET, &format!("/entity/{upper}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["id"], id.as_str());

        let (status, _) = send(&app, Method::DELETE, &format!("/entity/{simple}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_missing_entity() {
        let (app, _) = app();

        let uri = format!("/entity/{}", generate_id());
        let (status, body) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "entity not found" }));
    }

    #[tokio::test]
    async fn test_invalid_ids_are_rejected() {
        let (app, _) = app();

        let (status, body) = send(&app, Method::GET, "/entity/not-a-uuid", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid entity id");

        let (status, _) = send(&app, Method::DELETE, "/entity/123", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(&app, Method::POST, "/entity", Some(r#"{"id":"nope","data":"x"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_malformed_payload() {
        let (app, _) = app();

        let (status, body) = send(&app, Method::POST, "/entity", Some("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid request payload");
    }

    #[tokio::test]
    async fn test_update_entity() {
        let (app, _) = app();
        let (_, created) = send(&app, Method::POST, "/entity", Some(r#"{"data":"before"}"#)).await;
        let uri = format!("/entity/{}", created["id"].as_str().unwrap());

        let (status, updated) = send(&app, Method::PUT, &uri, Some(r#"{"data":"after"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["id"], created["id"]);
        assert_eq!(updated["data"], "after");

        let (_, fetched) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(fetched["data"], "after");
    }

    #[tokio::test]
    async fn test_update_missing_entity() {
        let (app, service) = app();

        let uri = format!("/entity/{}", generate_id());
        let (status, _) = send(&app, Method::PUT, &uri, Some(r#"{"data":"x"}"#)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(service.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_entity() {
        let (app, _) = app();
        let (_, created) = send(&app, Method::POST, "/entity", Some(r#"{"data":"bye"}"#)).await;
        let uri = format!("/entity/{}", created["id"].as_str().unwrap());

        let (status, body) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "result": "success" }));

        let (status, _) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_count_and_start() {
        let (app, service) = app();
        service.bulk_insert(generate_entities(15, 8)).await.unwrap();

        let (status, body) = send(&app, Method::GET, "/entities?count=10", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 10);

        let (_, body) = send(&app, Method::GET, "/entities?count=10&start=10", None).await;
        assert_eq!(body.as_array().unwrap().len(), 5);

        let (_, body) = send(&app, Method::GET, "/entities?count=10&offset=12", None).await;
        assert_eq!(body.as_array().unwrap().len(), 3);

        // Both given: start is used, offset ignored
        let (status, body) = send(&app, Method::GET, "/entities?count=10&start=14&offset=2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        // Absent or non-positive count falls back to the default
        let (_, body) = send(&app, Method::GET, "/entities", None).await;
        assert_eq!(body.as_array().unwrap().len(), 15);
        let (_, body) = send(&app, Method::GET, "/entities?count=0", None).await;
        assert_eq!(body.as_array().unwrap().len(), 15);

        let (status, _) = send(&app, Method::GET, "/entities?count=ten", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_filter() {
        let (app, _) = app();
        for i in 0..3 {
            let body = json!({ "data": format!("alpha {i}") }).to_string();
            send(&app, Method::POST, "/entity", Some(&body)).await;
        }
        send(&app, Method::POST, "/entity", Some(r#"{"data":"beta"}"#)).await;

        let (status, body) = send(&app, Method::GET, "/entities?filter=alpha*", None).await;
        assert_eq!(status, StatusCode::OK);
        let listed = body.as_array().unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed.iter().all(|e| e["data"].as_str().unwrap().starts_with("alpha")));

        let (_, body) = send(&app, Method::GET, "/entities?filter=", None).await;
        assert_eq!(body.as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_list_params_clamping() {
        let options = ListParams {
            count: Some(50_000),
            start: Some(-4),
            ..Default::default()
        }
        .into_options();
        assert_eq!(options.limit, LIST_COUNT_MAX as usize);
        assert_eq!(options.offset, 0);

        let options = ListParams::default().into_options();
        assert_eq!(options.limit, LIST_COUNT_DEFAULT as usize);
    }
}
