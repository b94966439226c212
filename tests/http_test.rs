use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use family_graph::{router, Family, MemoryCollection};
use http_body_util::BodyExt;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceExt;

fn app() -> Router {
    let family = Family::new(Arc::new(MemoryCollection::new()));
    router(Arc::new(RwLock::new(family)))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<JsonValue>) -> (StatusCode, JsonValue) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

async fn add(app: &Router, body: JsonValue) -> u64 {
    let (status, member) = send(app, Method::POST, "/family", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    member["id"].as_u64().unwrap()
}

#[tokio::test]
async fn test_add_and_get_member() {
    let app = app();
    let a = add(&app, json!({ "member": { "first_name": "Ana", "last_name": "Lopes", "generation": 0 } })).await;
    let b = add(
        &app,
        json!({
            "member": { "first_name": "Bia", "last_name": "Lopes", "attributes": { "born": 1990 } },
            "previous": a,
            "relationship": 1
        }),
    )
    .await;

    let (status, member) = send(&app, Method::GET, &format!("/family/{}", b), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(member["generation"], 1);
    assert_eq!(member["attributes"]["born"], 1990);
    assert_eq!(member["relationships"][0]["target"], a);
    assert_eq!(member["relationships"][0]["relationship"], 1);
}

#[tokio::test]
async fn test_missing_member_is_404() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/family/77", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("not found"));

    let (status, _) = send(&app, Method::DELETE, "/family/77", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_half_link_is_400() {
    let app = app();
    let (status, _) = send(
        &app,
        Method::POST,
        "/family",
        Some(json!({ "member": { "first_name": "Rui" }, "previous": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_members_has_positions() {
    let app = app();
    let a = add(&app, json!({ "member": { "first_name": "Ana", "generation": 0 } })).await;
    add(&app, json!({ "member": { "first_name": "Bia" }, "previous": a, "relationship": 1 })).await;

    let (status, members) = send(&app, Method::GET, "/family", None).await;
    assert_eq!(status, StatusCode::OK);
    let members = members.as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert!(members[0]["position"]["y"].as_f64().unwrap() < members[1]["position"]["y"].as_f64().unwrap());
}

#[tokio::test]
async fn test_search() {
    let app = app();
    add(&app, json!({ "member": { "first_name": "Joana" } })).await;
    add(&app, json!({ "member": { "first_name": "Pedro" } })).await;

    let (status, found) = send(&app, Method::GET, "/family/search?field=first_name&pattern=JOA", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);

    let (status, found) = send(&app, Method::GET, "/family/search?field=first_name&pattern=xyz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(found.as_array().unwrap().is_empty());

    let (status, _) = send(&app, Method::GET, "/family/search?field=first_name&pattern=%28", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_member() {
    let app = app();
    let a = add(&app, json!({ "member": { "first_name": "Ana" } })).await;

    let (status, member) = send(
        &app,
        Method::PATCH,
        &format!("/family/{}", a),
        Some(json!({ "last_name": "Dias", "attributes": { "nickname": "Aninhas" } })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(member["first_name"], "Ana");
    assert_eq!(member["last_name"], "Dias");
    assert_eq!(member["attributes"]["nickname"], "Aninhas");
}

#[tokio::test]
async fn test_relationship_lifecycle() {
    let app = app();
    let a = add(&app, json!({ "member": { "first_name": "Ana", "generation": 0 } })).await;
    let b = add(&app, json!({ "member": { "first_name": "Bia", "generation": 0 } })).await;

    let pair = json!({ "source": a, "target": b, "relationship": 0 });
    let (status, body) = send(&app, Method::POST, "/relationships", Some(pair.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["inverse"]["source"], b);

    let (status, _) = send(&app, Method::POST, "/relationships", Some(pair)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/relationships",
        Some(json!({ "source": a, "target": b, "relationship": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["forward"]["relationship"], -1);
    assert_eq!(body["inverse"]["relationship"], 1);

    let uri = format!("/relationships/{}/{}", b, a);
    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        Method::POST,
        "/relationships",
        Some(json!({ "source": a, "target": a, "relationship": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_out_of_range_codes_are_400() {
    let app = app();
    let a = add(&app, json!({ "member": { "first_name": "Ana", "generation": i64::MAX } })).await;
    let b = add(&app, json!({ "member": { "first_name": "Bia", "generation": 0 } })).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/relationships",
        Some(json!({ "source": a, "target": b, "relationship": i64::MIN })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Invalid relationship"));

    let (status, _) = send(
        &app,
        Method::POST,
        "/family",
        Some(json!({ "member": { "first_name": "Caio" }, "previous": a, "relationship": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, members) = send(&app, Method::GET, "/family", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(members.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_remove_member() {
    let app = app();
    let a = add(&app, json!({ "member": { "first_name": "Ana", "generation": 0 } })).await;
    let b = add(&app, json!({ "member": { "first_name": "Bia" }, "previous": a, "relationship": 1 })).await;

    let (status, _) = send(&app, Method::DELETE, &format!("/family/{}", a), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, member) = send(&app, Method::GET, &format!("/family/{}", b), None).await;
    assert!(member["relationships"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_status() {
    let app = app();
    let a = add(&app, json!({ "member": { "first_name": "Ana" } })).await;
    add(&app, json!({ "member": { "first_name": "Bia" }, "previous": a, "relationship": 1 })).await;

    let (status, body) = send(&app, Method::GET, "/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"]["members"], 2);
    assert_eq!(body["storage"]["relationships"], 1);
}
