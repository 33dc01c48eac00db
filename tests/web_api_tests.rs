use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use coursedesk::client::{NotificationLevel, SEAT_ASSIGNMENTS_PATH, SEAT_PLAN_PATH};
use coursedesk::storage::catalog::{COURSE_PHASE, INTRO_COURSE_PARTICIPATION, SEAT};
use coursedesk::web::{AppState, build_router};
use coursedesk::{
    Catalog, Console, DeskConfig, DeskError, EntityStore, EntityTransport, HttpTransport,
    Notification, PATCH_CONTENT_TYPE, PatchOperation,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

async fn seeded_store() -> Arc<EntityStore> {
    let store = Arc::new(EntityStore::with_catalog(&Catalog::builtin()));
    let router = build_router(AppState::new(Arc::clone(&store)));

    let created = router
        .oneshot(json_request(
            Method::POST,
            "/api/course_phase",
            json!({ "id": "p1", "name": "Intro Course", "sequence_order": 1 }),
        ))
        .await
        .expect("create response");
    assert_eq!(created.status(), StatusCode::CREATED);
    store
}

#[tokio::test]
async fn patch_with_patch_content_type_returns_updated_entity() {
    let store = seeded_store().await;
    let router = build_router(AppState::new(Arc::clone(&store)));

    let response = router
        .oneshot(patch_request(
            "/api/course_phase/p1",
            PATCH_CONTENT_TYPE,
            json!([{ "op": "replace", "path": "/sequence_order", "value": "3" }]),
        ))
        .await
        .expect("patch response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = decode_json(response).await;
    assert_eq!(body["id"], "p1");
    assert_eq!(body["sequence_order"], 3);
    assert_eq!(body["name"], "Intro Course");
}

#[tokio::test]
async fn patch_with_foreign_content_type_is_rejected() {
    let store = seeded_store().await;
    let router = build_router(AppState::new(Arc::clone(&store)));

    let response = router
        .oneshot(patch_request(
            "/api/course_phase/p1",
            "text/plain",
            json!([{ "op": "replace", "path": "/name", "value": "Kickoff" }]),
        ))
        .await
        .expect("patch response");
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let entity = store.get(COURSE_PHASE, &"p1".into()).await.unwrap();
    assert_eq!(entity.get("name"), Some(&"Intro Course".into()));
}

#[tokio::test]
async fn invalid_patch_returns_400_and_applies_nothing() {
    let store = seeded_store().await;
    let router = build_router(AppState::new(Arc::clone(&store)));

    let response = router
        .oneshot(patch_request(
            "/api/course_phase/p1",
            PATCH_CONTENT_TYPE,
            json!([
                { "op": "replace", "path": "/name", "value": "Kickoff" },
                { "op": "replace", "path": "/sequence_order", "value": "second" }
            ]),
        ))
        .await
        .expect("patch response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = decode_json(response).await;
    assert_eq!(body["code"], "validation_error");
    assert!(body["error"].as_str().unwrap().contains("sequence_order"));

    let entity = store.get(COURSE_PHASE, &"p1".into()).await.unwrap();
    assert_eq!(entity.get("name"), Some(&"Intro Course".into()));
}

#[tokio::test]
async fn malformed_body_and_unknown_targets() {
    let store = seeded_store().await;
    let router = build_router(AppState::new(store));

    let malformed = Request::builder()
        .method(Method::PATCH)
        .uri("/api/course_phase/p1")
        .header("content-type", PATCH_CONTENT_TYPE)
        .body(Body::from("{not json"))
        .expect("request");
    let response = router.clone().oneshot(malformed).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(decode_json(response).await["code"], "input_error");

    let response = router
        .clone()
        .oneshot(patch_request(
            "/api/course_phase/missing",
            PATCH_CONTENT_TYPE,
            json!([{ "op": "replace", "path": "/name", "value": "x" }]),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/team/t1")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bulk_seat_assignment_is_all_or_nothing() {
    let store = Arc::new(EntityStore::with_catalog(&Catalog::builtin()));
    store
        .insert(
            INTRO_COURSE_PARTICIPATION,
            Some("a".into()),
            [("student_name".to_string(), "Ada".into())].into_iter().collect(),
        )
        .await
        .unwrap();
    let router = build_router(AppState::new(Arc::clone(&store)));

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            SEAT_ASSIGNMENTS_PATH,
            json!([
                { "introCourseParticipationId": "a", "seat": "A1" },
                { "introCourseParticipationId": "ghost", "seat": "A2" }
            ]),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let ada = store.get(INTRO_COURSE_PARTICIPATION, &"a".into()).await.unwrap();
    assert!(ada.get("seat").unwrap().is_null());

    let response = router
        .oneshot(json_request(
            Method::POST,
            SEAT_PLAN_PATH,
            json!([{ "seat": "A1", "chairDevice": "mac-07" }]),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let seats = store.list(SEAT).await.unwrap();
    assert_eq!(seats.len(), 1);
    assert_eq!(seats[0].get("chair_device"), Some(&"mac-07".into()));
}

#[tokio::test]
async fn malformed_json_bodies_return_400_with_error_body() {
    let store = seeded_store().await;
    let router = build_router(AppState::new(store));

    let response = router
        .clone()
        .oneshot(json_request(
            Method::POST,
            SEAT_ASSIGNMENTS_PATH,
            json!([{ "introCourseParticipationId": "p1" }]),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = decode_json(response).await;
    assert_eq!(body["code"], "input_error");
    assert!(body["error"].as_str().unwrap().contains("seat"));

    let untyped = Request::builder()
        .method(Method::POST)
        .uri(SEAT_PLAN_PATH)
        .body(Body::from("{not json"))
        .expect("request");
    let response = router.clone().oneshot(untyped).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(decode_json(response).await["code"], "input_error");

    let response = router
        .oneshot(json_request(Method::POST, "/api/course_phase", json!(["p2"])))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(decode_json(response).await["code"], "input_error");
}

#[tokio::test]
async fn http_transport_surfaces_server_message_verbatim() {
    let store = seeded_store().await;
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let address = listener.local_addr().expect("local addr");
    let server = tokio::spawn(async move {
        axum::serve(listener, build_router(AppState::new(store)))
            .await
            .expect("serve");
    });

    let config = DeskConfig::new().api_base_url(&format!("http://{}/", address));
    let transport = HttpTransport::new(&config).expect("transport");

    let updated = transport
        .patch(
            COURSE_PHASE,
            &"p1".into(),
            &[PatchOperation::replace("name", "Kickoff")],
        )
        .await
        .expect("patch");
    assert_eq!(updated.get("name"), Some(&"Kickoff".into()));

    let err = transport
        .patch(COURSE_PHASE, &"p1".into(), &[PatchOperation::replace("colour", "red")])
        .await
        .unwrap_err();
    assert_eq!(
        err,
        DeskError::Validation("Operation 0 (replace /colour): Unknown field 'colour' for course_phase".into())
    );

    let notification = Notification::from_error(&err);
    assert_eq!(notification.level, NotificationLevel::Error);
    assert_eq!(notification.message, err.user_message());

    let console = Console::new(transport, config);
    let phases = console.list(COURSE_PHASE).await.expect("list");
    assert_eq!(phases.len(), 1);

    server.abort();
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn patch_request(uri: &str, content_type: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::PATCH)
        .uri(uri)
        .header("content-type", content_type)
        .body(Body::from(body.to_string()))
        .expect("request")
}

async fn decode_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body");
    serde_json::from_slice(&bytes).expect("json body")
}
