//! Integration tests for the HTTP API and the login gate.

use actix_web::cookie::{Cookie, Key};
use actix_web::http::StatusCode;
use actix_web::{test, web::Data, App};
use court_rotation::web::{configure, session_middleware};
use court_rotation::{AllocationEngine, AppConfig, SessionSnapshot};
use serde_json::{json, Value};
use std::sync::RwLock;

macro_rules! test_app {
    () => {{
        let config = AppConfig::default();
        let middleware = session_middleware(&config, Key::generate());
        test::init_service(
            App::new()
                .app_data(Data::new(RwLock::new(AllocationEngine::new(2))))
                .app_data(Data::new(config))
                .wrap(middleware)
                .configure(configure),
        )
        .await
    }};
}

macro_rules! login {
    ($app:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/login")
            .set_json(json!({ "username": "admin", "password": "1234" }))
            .to_request();
        let resp = test::call_service($app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie: Cookie<'static> = resp
            .response()
            .cookies()
            .next()
            .expect("session cookie")
            .into_owned();
        cookie
    }};
}

#[actix_web::test]
async fn health_is_public() {
    let app = test_app!();
    let req = test::TestRequest::get().uri("/api/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["ok"], true);
}

#[actix_web::test]
async fn api_requires_login() {
    let app = test_app!();
    let req = test::TestRequest::get().uri("/api/session").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/login")
        .set_json(json!({ "username": "admin", "password": "wrong" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn queue_and_court_flow() {
    let app = test_app!();
    let cookie = login!(&app);

    for name in ["Alice", "Bob", "Carol", "Dave"] {
        let req = test::TestRequest::post()
            .uri("/api/queue")
            .cookie(cookie.clone())
            .set_json(json!({ "name": name }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let req = test::TestRequest::post()
        .uri("/api/queue")
        .cookie(cookie.clone())
        .set_json(json!({ "name": " x " }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["kind"], "validation");

    let req = test::TestRequest::post()
        .uri("/api/courts/1/assign")
        .cookie(cookie.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["outcome"]["outcome"], "assigned");
    assert_eq!(body["session"]["courts"][0]["occupants"].as_array().unwrap().len(), 4);

    let req = test::TestRequest::post()
        .uri("/api/courts/1/release")
        .cookie(cookie.clone())
        .set_json(json!({ "mode": "selected" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    for position in [0, 1] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/courts/1/marks/{position}"))
            .cookie(cookie.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    // Default equipment amount: one shuttlecock shared by four.
    let req = test::TestRequest::post()
        .uri("/api/courts/1/equipment")
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/courts/1/release")
        .cookie(cookie.clone())
        .set_json(json!({ "mode": "selected" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/api/session")
        .cookie(cookie.clone())
        .to_request();
    let snapshot: SessionSnapshot = test::call_and_read_body_json(&app, req).await;
    assert_eq!(snapshot.queue.len(), 2);
    assert_eq!(snapshot.courts[0].occupants.len(), 2);
    let alice = snapshot.players.iter().find(|p| p.name == "Alice").unwrap();
    assert_eq!(alice.stats.completed_rounds, 1);
    assert_eq!(alice.stats.equipment_usage, 0.25);

    // Playing players cannot leave the queue.
    let carol = snapshot.players.iter().find(|p| p.name == "Carol").unwrap();
    let req = test::TestRequest::delete()
        .uri(&format!("/api/queue/{}", carol.id))
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::delete()
        .uri(&format!("/api/queue/{}", alice.id))
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/players/{}", alice.id))
        .cookie(cookie.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let req = test::TestRequest::get()
        .uri("/api/stats.csv")
        .cookie(cookie)
        .to_request();
    let body = test::call_and_read_body(&app, req).await;
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert_eq!(text.lines().count(), 4);
}

#[actix_web::test]
async fn malformed_optional_bodies_are_rejected() {
    let app = test_app!();
    let cookie = login!(&app);

    for name in ["Alice", "Bob"] {
        let req = test::TestRequest::post()
            .uri("/api/queue")
            .cookie(cookie.clone())
            .set_json(json!({ "name": name }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let req = test::TestRequest::post()
        .uri("/api/courts/1/assign")
        .cookie(cookie.clone())
        .set_json(json!({ "player_ids": ["not-a-uuid"] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["kind"], "validation");

    let req = test::TestRequest::get()
        .uri("/api/session")
        .cookie(cookie.clone())
        .to_request();
    let snapshot: SessionSnapshot = test::call_and_read_body_json(&app, req).await;
    assert!(snapshot.courts[0].occupants.is_empty());
    assert_eq!(snapshot.queue.len(), 2);

    // An empty body still fills from the queue front.
    let req = test::TestRequest::post()
        .uri("/api/courts/1/assign")
        .cookie(cookie.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["outcome"]["player_ids"].as_array().unwrap().len(), 2);

    let req = test::TestRequest::post()
        .uri("/api/courts/1/equipment")
        .cookie(cookie.clone())
        .set_json(json!({ "amount": "abc" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = test::TestRequest::get()
        .uri("/api/session")
        .cookie(cookie.clone())
        .to_request();
    let snapshot: SessionSnapshot = test::call_and_read_body_json(&app, req).await;
    assert!(snapshot.players.iter().all(|p| p.stats.equipment_usage == 0.0));

    let req = test::TestRequest::post()
        .uri("/api/courts/1/equipment")
        .cookie(cookie)
        .set_json(json!({ "amount": 1.0 }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["session"]["players"][0]["stats"]["equipment_usage"], 1.0);
}

#[actix_web::test]
async fn malformed_body_without_login_is_unauthorized() {
    let app = test_app!();
    let req = test::TestRequest::post()
        .uri("/api/courts/1/assign")
        .set_json(json!({ "player_ids": ["not-a-uuid"] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
