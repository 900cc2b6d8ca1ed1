use actix_web::{test, web, App};
use authkeeper::{not_found, routes, AppState, MemoryStore, Settings, TokenService};
use serde_json::{json, Value};
use std::sync::Arc;

fn test_state() -> AppState {
    let config = Settings::new_for_test().expect("Failed to load test config");
    let store = Arc::new(MemoryStore::new());
    AppState::from_parts(config, store.clone(), store).expect("Failed to build state")
}

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state))
                .configure(routes)
                .default_service(web::to(not_found)),
        )
        .await
    };
}

fn ann() -> Value {
    json!({
        "email": "a@x.com",
        "password": "Abcdef1!",
        "name": "Ann Lee"
    })
}

#[actix_web::test]
async fn test_register_login_profile_flow() {
    let app = test_app!(test_state());

    let register_response = test::TestRequest::post()
        .uri("/auth/register")
        .insert_header(("X-Forwarded-For", "10.0.0.1"))
        .set_json(ann())
        .send_request(&app)
        .await;
    assert_eq!(register_response.status(), 201);
    let register_body: Value = test::read_body_json(register_response).await;
    assert_eq!(register_body["status"], true);
    assert_eq!(register_body["data"]["email"], "a@x.com");
    assert_eq!(register_body["data"]["name"], "Ann Lee");
    assert!(register_body["data"].get("password").is_none());
    assert!(register_body["data"].get("password_hash").is_none());
    let user_id = register_body["data"]["id"].as_str().unwrap().to_string();

    let login_response = test::TestRequest::post()
        .uri("/auth/login")
        .insert_header(("X-Forwarded-For", "10.0.0.1"))
        .set_json(json!({ "email": "a@x.com", "password": "Abcdef1!" }))
        .send_request(&app)
        .await;
    assert_eq!(login_response.status(), 200);
    let login_body: Value = test::read_body_json(login_response).await;
    assert_eq!(login_body["status"], true);
    assert_eq!(login_body["data"]["user"]["id"], user_id.as_str());
    assert!(login_body["data"]["user"].get("password").is_none());

    let token = &login_body["data"]["token"];
    let access_token = token["access_token"].as_str().unwrap();
    assert!(!access_token.is_empty());
    assert!(token["refresh_token"].as_str().is_some());
    assert!(token["expires_at"].as_str().is_some());
    assert!(token["refresh_expires_at"].as_str().is_some());

    let claims = TokenService::with_default_ttls("test_secret")
        .unwrap()
        .verify(access_token)
        .unwrap();
    assert_eq!(claims.sub, user_id);

    let profile_response = test::TestRequest::get()
        .uri("/user/profile")
        .insert_header(("Authorization", format!("Bearer {}", access_token)))
        .send_request(&app)
        .await;
    assert_eq!(profile_response.status(), 200);
    let profile_body: Value = test::read_body_json(profile_response).await;
    assert_eq!(profile_body["status"], true);
    assert_eq!(profile_body["data"]["id"], user_id.as_str());
    assert_eq!(profile_body["data"]["name"], "Ann Lee");
    assert!(profile_body["data"].get("password").is_none());
}

#[actix_web::test]
async fn test_register_duplicate_email() {
    let app = test_app!(test_state());

    let first = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(ann())
        .send_request(&app)
        .await;
    assert_eq!(first.status(), 201);

    let second = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "email": "a@x.com", "password": "Other123!", "name": "Ann Other" }))
        .send_request(&app)
        .await;
    assert_eq!(second.status(), 400);
    let body: Value = test::read_body_json(second).await;
    assert_eq!(body["status"], false);
    assert_eq!(body["message"], "User already exists");
}

#[actix_web::test]
async fn test_invalid_login_responses_are_identical() {
    let app = test_app!(test_state());

    test::TestRequest::post()
        .uri("/auth/register")
        .set_json(ann())
        .send_request(&app)
        .await;

    let wrong_password = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": "a@x.com", "password": "Wrong123!" }))
        .send_request(&app)
        .await;
    assert_eq!(wrong_password.status(), 401);
    let wrong_password: Value = test::read_body_json(wrong_password).await;

    let unknown_email = test::TestRequest::post()
        .uri("/auth/login")
        .set_json(json!({ "email": "nobody@x.com", "password": "Abcdef1!" }))
        .send_request(&app)
        .await;
    assert_eq!(unknown_email.status(), 401);
    let unknown_email: Value = test::read_body_json(unknown_email).await;

    assert_eq!(wrong_password, unknown_email);
    assert_eq!(wrong_password["message"], "Invalid credentials");
}

#[actix_web::test]
async fn test_invalid_registration() {
    let app = test_app!(test_state());

    let response = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({
            "email": "not-an-email",
            "password": "weak",
            "name": "Al"
        }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 422);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["status"], false);
    assert_eq!(body["message"], "Validation error");
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 3);
    assert!(errors[0].as_str().unwrap().starts_with("email: "));
    assert!(errors[1].as_str().unwrap().starts_with("password: "));
    assert!(errors[2].as_str().unwrap().starts_with("name: "));
}

#[actix_web::test]
async fn test_missing_fields_are_validation_errors() {
    let app = test_app!(test_state());

    let response = test::TestRequest::post()
        .uri("/auth/register")
        .set_json(json!({ "email": "a@x.com", "password": "Abcdef1!" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 422);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["message"], "Validation error");
    assert!(body["errors"][0].as_str().unwrap().contains("name"));
}

#[actix_web::test]
async fn test_login_rate_limited() {
    let app = test_app!(test_state());

    for _ in 0..5 {
        let response = test::TestRequest::post()
            .uri("/auth/login")
            .insert_header(("X-Forwarded-For", "203.0.113.7, 10.0.0.1"))
            .set_json(json!({ "email": "a@x.com", "password": "Abcdef1!" }))
            .send_request(&app)
            .await;
        assert_eq!(response.status(), 401);
    }

    let limited = test::TestRequest::post()
        .uri("/auth/login")
        .insert_header(("X-Forwarded-For", "203.0.113.7"))
        .set_json(json!({ "email": "a@x.com", "password": "Abcdef1!" }))
        .send_request(&app)
        .await;
    assert_eq!(limited.status(), 429);
    let body: Value = test::read_body_json(limited).await;
    assert_eq!(body["status"], false);
    assert_eq!(
        body["message"],
        "Rate limit exceeded. Maximum 5 requests per 60 seconds allowed."
    );

    // A different client is unaffected.
    let other = test::TestRequest::post()
        .uri("/auth/login")
        .insert_header(("X-Forwarded-For", "203.0.113.8"))
        .set_json(json!({ "email": "a@x.com", "password": "Abcdef1!" }))
        .send_request(&app)
        .await;
    assert_eq!(other.status(), 401);
}

#[actix_web::test]
async fn test_malformed_login_bodies_count_toward_rate_limit() {
    let app = test_app!(test_state());

    for _ in 0..5 {
        let response = test::TestRequest::post()
            .uri("/auth/login")
            .insert_header(("X-Forwarded-For", "203.0.113.9"))
            .set_json(json!({ "email": "a@x.com" }))
            .send_request(&app)
            .await;
        assert_eq!(response.status(), 422);
    }

    let limited = test::TestRequest::post()
        .uri("/auth/login")
        .insert_header(("X-Forwarded-For", "203.0.113.9"))
        .set_json(json!({ "email": "a@x.com" }))
        .send_request(&app)
        .await;
    assert_eq!(limited.status(), 429);

    let well_formed = test::TestRequest::post()
        .uri("/auth/login")
        .insert_header(("X-Forwarded-For", "203.0.113.9"))
        .set_json(json!({ "email": "a@x.com", "password": "Abcdef1!" }))
        .send_request(&app)
        .await;
    assert_eq!(well_formed.status(), 429);
}

#[actix_web::test]
async fn test_register_rate_limited() {
    let app = test_app!(test_state());

    for i in 0..5 {
        let response = test::TestRequest::post()
            .uri("/auth/register")
            .insert_header(("X-Forwarded-For", "198.51.100.20"))
            .set_json(json!({
                "email": format!("user{}@x.com", i),
                "password": "Abcdef1!",
                "name": "Ann Lee"
            }))
            .send_request(&app)
            .await;
        assert_eq!(response.status(), 201);
    }

    let limited = test::TestRequest::post()
        .uri("/auth/register")
        .insert_header(("X-Forwarded-For", "198.51.100.20"))
        .set_json(json!({ "email": "user5@x.com", "password": "Abcdef1!", "name": "Ann Lee" }))
        .send_request(&app)
        .await;
    assert_eq!(limited.status(), 429);
    let body: Value = test::read_body_json(limited).await;
    assert_eq!(body["status"], false);
    assert_eq!(
        body["message"],
        "Rate limit exceeded. Maximum 5 requests per 60 seconds allowed."
    );

    // Malformed bodies are gated as well.
    let malformed = test::TestRequest::post()
        .uri("/auth/register")
        .insert_header(("X-Forwarded-For", "198.51.100.20"))
        .insert_header(("Content-Type", "application/json"))
        .set_payload("not json")
        .send_request(&app)
        .await;
    assert_eq!(malformed.status(), 429);
}

#[actix_web::test]
async fn test_unknown_route() {
    let app = test_app!(test_state());

    let response = test::TestRequest::get().uri("/nope").send_request(&app).await;
    assert_eq!(response.status(), 404);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["status"], false);
}
