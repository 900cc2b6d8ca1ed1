use actix_web::{test, web, App};
use authkeeper::{routes, AppState, MemoryStore, Settings, TokenService, User, UserStore};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use std::sync::Arc;

async fn setup() -> (AppState, Arc<MemoryStore>, User) {
    let config = Settings::new_for_test().expect("Failed to load test config");
    let store = Arc::new(MemoryStore::new());
    let state = AppState::from_parts(config, store.clone(), store.clone()).unwrap();

    let user = store
        .create_user(&User::new("Ann Lee".into(), "a@x.com".into(), "unused".into()))
        .await
        .unwrap();
    (state, store, user)
}

fn tokens() -> TokenService {
    TokenService::with_default_ttls("test_secret").unwrap()
}

macro_rules! test_app {
    ($state:expr) => {
        test::init_service(App::new().app_data(web::Data::new($state)).configure(routes)).await
    };
}

#[actix_web::test]
async fn test_update_profile() {
    let (state, store, user) = setup().await;
    let app = test_app!(state);
    let access_token = tokens().issue(&user.id.to_string()).unwrap().access_token;

    let response = test::TestRequest::patch()
        .uri("/user/profile")
        .insert_header(("Authorization", format!("Bearer {}", access_token)))
        .set_json(json!({ "name": "Ann Smith" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["status"], true);
    assert_eq!(body["data"]["id"], user.id.to_string());
    assert_eq!(body["data"]["name"], "Ann Smith");

    let stored = store.get_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Ann Smith");
}

#[actix_web::test]
async fn test_update_profile_rejects_invalid_name() {
    let (state, store, user) = setup().await;
    let app = test_app!(state);
    let access_token = tokens().issue(&user.id.to_string()).unwrap().access_token;

    let response = test::TestRequest::patch()
        .uri("/user/profile")
        .insert_header(("Authorization", format!("Bearer {}", access_token)))
        .set_json(json!({ "name": "R2" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 422);

    let stored = store.get_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Ann Lee");
}

#[actix_web::test]
async fn test_update_profile_requires_authentication() {
    let (state, _, _) = setup().await;
    let app = test_app!(state);

    let response = test::TestRequest::patch()
        .uri("/user/profile")
        .set_json(json!({ "name": "Ann Smith" }))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 401);
    let body: Value = test::read_body_json(response).await;
    assert_eq!(body["message"], "Authorization header missing");
}

#[actix_web::test]
async fn test_malformed_authorization_headers() {
    let (state, _, _) = setup().await;
    let app = test_app!(state);

    for header in ["Bearer", "Token xyz", "Bearer a b"] {
        let response = test::TestRequest::get()
            .uri("/user/profile")
            .insert_header(("Authorization", header))
            .send_request(&app)
            .await;
        assert_eq!(response.status(), 401, "header {:?}", header);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["status"], false);
        assert_eq!(
            body["message"],
            "Invalid authorization header format. Expected: Bearer <token>"
        );
    }
}

#[actix_web::test]
async fn test_rejected_tokens_share_one_message() {
    let (state, _, user) = setup().await;
    let app = test_app!(state);
    let subject = user.id.to_string();

    let pair = tokens().issue(&subject).unwrap();
    let expired = tokens()
        .issue_at(&subject, Utc::now() - Duration::days(1))
        .unwrap()
        .access_token;
    let foreign = TokenService::with_default_ttls("someone_elses_secret")
        .unwrap()
        .issue(&subject)
        .unwrap()
        .access_token;

    for token in [expired, foreign, pair.refresh_token, "not.a.token".to_string()] {
        let response = test::TestRequest::get()
            .uri("/user/profile")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .send_request(&app)
            .await;
        assert_eq!(response.status(), 401);
        let body: Value = test::read_body_json(response).await;
        assert_eq!(body["message"], "Invalid or expired token");
    }
}

#[actix_web::test]
async fn test_profile_of_unknown_user() {
    let (state, _, _) = setup().await;
    let app = test_app!(state);
    let access_token = tokens()
        .issue(&uuid::Uuid::new_v4().to_string())
        .unwrap()
        .access_token;

    let response = test::TestRequest::get()
        .uri("/user/profile")
        .insert_header(("Authorization", format!("Bearer {}", access_token)))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 404);
}

#[actix_web::test]
async fn test_non_uuid_subject_is_unauthenticated() {
    let (state, _, _) = setup().await;
    let app = test_app!(state);
    let access_token = tokens().issue("not-a-uuid").unwrap().access_token;

    let response = test::TestRequest::get()
        .uri("/user/profile")
        .insert_header(("Authorization", format!("Bearer {}", access_token)))
        .send_request(&app)
        .await;
    assert_eq!(response.status(), 401);
}
