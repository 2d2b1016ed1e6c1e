mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use common::*;
use reelsync::app::build_router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt;

fn app() -> (Router, Arc<reelsync::session::Session>) {
    let session = Arc::new(session_with(
        Arc::new(FakeTmdb::new(30)),
        Arc::new(FakeStore::default()),
    ));
    (build_router(session.clone()), session)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(res: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_responds_ok() {
    let (app, _) = app();
    let res = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn catalog_before_genres_is_a_conflict() {
    let (app, _) = app();
    let res = app
        .clone()
        .oneshot(post_json("/catalog", json!({ "type": "movie" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    assert_eq!(
        body_json(res).await["error"],
        "genres have not been loaded yet"
    );

    let res = app
        .clone()
        .oneshot(post_json("/genres/load", json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = app
        .clone()
        .oneshot(post_json("/catalog/genre", json!({ "genre": "", "type": "tv" })))
        .await
        .unwrap();
    assert_eq!(body_json(res).await, json!({ "applied": true }));

    let state = body_json(app.oneshot(get("/state")).await.unwrap()).await;
    assert_eq!(state["genresLoaded"], true);
    assert_eq!(state["movies"].as_array().unwrap().len(), 60);
    assert_eq!(state["movies"][0]["name"], "/discover/tv");
    assert_eq!(state["movies"][0]["genres"], json!(["Action", "Comedy"]));
}

#[tokio::test]
async fn rejected_sign_in_maps_to_unauthorized() {
    let (app, session) = app();
    let res = app
        .oneshot(post_json(
            "/auth/sign-in",
            json!({ "email": "a@x.com", "password": "wrong" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(res).await["error"],
        "Invalid email or password. Please try again."
    );
    assert!(session.identity.current().is_none());
}

#[tokio::test]
async fn liked_endpoints_round_trip_for_signed_in_user() {
    let (app, _) = app();

    let res = app
        .clone()
        .oneshot(post_json("/liked", json!({ "id": 1, "name": "T", "image": "/t.jpg", "genres": [] })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = app
        .clone()
        .oneshot(post_json(
            "/auth/sign-in",
            json!({ "email": "a@x.com", "password": "secret123" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let identity = body_json(res).await;
    assert_eq!(identity["email"], "a@x.com");
    assert!(identity.get("id_token").is_none());

    let res = app
        .clone()
        .oneshot(post_json("/liked", json!({ "id": 1, "name": "T", "image": "/t.jpg", "genres": ["Drama"] })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_json(res).await.as_array().unwrap().len(), 1);

    let liked = body_json(app.clone().oneshot(get("/liked/1")).await.unwrap()).await;
    assert_eq!(liked, json!({ "liked": true }));

    let res = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/liked/1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(body_json(res).await, json!([]));

    let liked = body_json(app.oneshot(get("/liked/1")).await.unwrap()).await;
    assert_eq!(liked, json!({ "liked": false }));
}

#[tokio::test]
async fn unknown_movie_details_is_not_found() {
    let (app, _) = app();
    let res = app.clone().oneshot(get("/movies/404")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.oneshot(get("/movies/11")).await.unwrap();
    assert_eq!(body_json(res).await["runtime"], 100);
}

#[tokio::test]
async fn search_input_is_accepted_and_close_clears() {
    let (app, session) = app();
    let res = app
        .clone()
        .oneshot(post_json("/search/input", json!({ "term": "heat" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::ACCEPTED);
    assert_eq!(session.search.pending_term(), "heat");

    let res = app
        .oneshot(post_json("/search/close", json!({})))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(session.search.pending_term(), "");
}
