//! HTTP API tests.
//!
//! Drive the real router with `tower::ServiceExt::oneshot` against the
//! in-memory repositories, so no database is needed.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use chrono::Duration;
use raffle_auth::TokenIssuer;
use raffle_core::environment::Clock;
use raffle_core::{User, UserRepository};
use raffle_server::server::ReadinessProbe;
use raffle_server::{AppState, build_router};
use raffle_testing::{InMemoryStore, helpers, test_clock};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &[u8] = b"http-api-test-secret-0123456789abcdef";

struct StaticProbe(bool);

#[async_trait]
impl ReadinessProbe for StaticProbe {
    async fn database_ready(&self) -> bool {
        self.0
    }
}

struct TestApp {
    router: Router,
    store: InMemoryStore,
    tokens: TokenIssuer,
}

impl TestApp {
    fn new() -> Self {
        Self::with_probe(true)
    }

    fn with_probe(ready: bool) -> Self {
        let store = InMemoryStore::seeded(42);
        let state = AppState::new(
            Arc::new(store.users()),
            Arc::new(store.rewards()),
            TokenIssuer::new(SECRET),
            Arc::new(test_clock()),
            Arc::new(StaticProbe(ready)),
        );
        Self {
            router: build_router(state, &[]),
            store,
            tokens: TokenIssuer::new(SECRET),
        }
    }

    /// Insert a user directly and return it with a valid token.
    async fn user(&self, name: &str) -> (User, String) {
        let email = format!("{}@example.com", name.to_lowercase());
        let user = self
            .store
            .users()
            .create(&helpers::user(name, &email, test_clock().now()))
            .await
            .unwrap();
        let token = self.token_for(&user);
        (user, token)
    }

    async fn admin(&self, name: &str) -> (User, String) {
        let email = format!("{}@example.com", name.to_lowercase());
        let user = self
            .store
            .users()
            .create(&helpers::admin(name, &email, test_clock().now()))
            .await
            .unwrap();
        let token = self.token_for(&user);
        (user, token)
    }

    fn token_for(&self, user: &User) -> String {
        self.tokens
            .issue(&user.profile(), test_clock().now())
            .unwrap()
            .token
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn create_reward(&self, token: &str, body: Value) -> String {
        let (status, reward) = self
            .send(Method::POST, "/api/v1/rewards", Some(token), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{reward}");
        reward["id"].as_str().unwrap().to_string()
    }
}

fn bike() -> Value {
    json!({
        "name": "Mountain Bike",
        "description": "Brand new",
        "image": "https://img.example.com/bike.png",
        "draw_date": "2025-02-01T20:00:00Z",
        "images": ["https://img.example.com/1.png", ""],
        "price": 2.5,
        "min_quota": 2
    })
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_and_readiness() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = app.send(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], true);

    let down = TestApp::with_probe(false);
    let (status, body) = down.send(Method::GET, "/ready", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["ready"], false);
}

#[tokio::test]
async fn test_correlation_id_is_echoed() {
    let app = TestApp::new();
    let request = Request::builder()
        .uri("/health")
        .header("X-Correlation-ID", "7f1c7d2e-8a4b-4c1e-9f0a-2b3c4d5e6f70")
        .body(Body::empty())
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response.headers().get("x-correlation-id").unwrap(),
        "7f1c7d2e-8a4b-4c1e-9f0a-2b3c4d5e6f70"
    );
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_register_and_login() {
    let app = TestApp::new();

    let (status, user) = app
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"name": "Ana", "email": "Ana@Example.com", "password": "secret1"})),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["email"], "ana@example.com");
    assert_eq!(user["role"], "user");
    assert!(user.get("password_hash").is_none());

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"name": "Ana 2", "email": "ana@example.com", "password": "secret1"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "EMAIL_TAKEN");

    let (status, login) = app
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "ana@example.com", "password": "secret1"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["user"]["id"], user["id"]);

    let token = login["token"].as_str().unwrap();
    let (status, me) = app
        .send(
            Method::GET,
            &format!("/api/v1/users/{}", user["id"].as_str().unwrap()),
            Some(token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["name"], "Ana");

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "ana@example.com", "password": "wrong-password"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_login_behind_proxy_and_unknown_email() {
    let app = TestApp::new();
    app.send(
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({"name": "Ana", "email": "ana@example.com", "password": "secret1"})),
    )
    .await;

    let login = |email: &str| {
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/auth/login")
            .header("Content-Type", "application/json")
            .header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
            .header("User-Agent", "raffle-client/1.0")
            .body(Body::from(
                json!({"email": email, "password": "secret1"}).to_string(),
            ))
            .unwrap()
    };

    let response = app.router.clone().oneshot(login("ana@example.com")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.router.clone().oneshot(login("nobody@example.com")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_register_validation() {
    let app = TestApp::new();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"name": "Ana", "email": "not-an-email", "password": "secret1"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/auth/register",
            None,
            Some(json!({"name": "Ana"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_protected_routes_require_valid_token() {
    let app = TestApp::new();
    let (user, _) = app.user("Ana").await;

    let (status, _) = app.send(Method::GET, "/api/v1/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(Method::GET, "/api/v1/users", Some("not-a-jwt"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let expired = app
        .tokens
        .issue(&user.profile(), test_clock().now() - Duration::days(2))
        .unwrap()
        .token;
    let (status, body) = app
        .send(Method::GET, "/api/v1/users", Some(&expired), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TOKEN_EXPIRED");

    let foreign = TokenIssuer::new(b"some-other-secret-0123456789abcdef")
        .issue(&user.profile(), test_clock().now())
        .unwrap()
        .token;
    let (status, _) = app
        .send(Method::GET, "/api/v1/users", Some(&foreign), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_user_management_permissions() {
    let app = TestApp::new();
    let (ana, ana_token) = app.user("Ana").await;
    let (bob, bob_token) = app.user("Bob").await;
    let (_, admin_token) = app.admin("Root").await;

    let (status, list) = app
        .send(Method::GET, "/api/v1/users?limit=2", Some(&ana_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["users"].as_array().unwrap().len(), 2);
    assert_eq!(list["pagination"]["total"], 3);
    assert_eq!(list["pagination"]["has_next"], true);

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/v1/users/{}", bob.id),
            Some(&ana_token),
            Some(json!({"name": "Bobby"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/v1/users/{}", ana.id),
            Some(&ana_token),
            Some(json!({"role": "admin"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .send(
            Method::PUT,
            &format!("/api/v1/users/{}", ana.id),
            Some(&ana_token),
            Some(json!({"name": "Ana Maria", "email": "ANA.MARIA@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Ana Maria");
    assert_eq!(updated["email"], "ana.maria@example.com");

    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/v1/users/{}", ana.id),
            Some(&ana_token),
            Some(json!({"email": "bob@example.com"})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "EMAIL_TAKEN");

    let (status, updated) = app
        .send(
            Method::PUT,
            &format!("/api/v1/users/{}", bob.id),
            Some(&admin_token),
            Some(json!({"active": false})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["active"], false);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/users/{}", bob.id),
            Some(&bob_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app
        .send(
            Method::GET,
            &format!("/api/v1/users/{}", bob.id),
            Some(&ana_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

// ============================================================================
// Rewards
// ============================================================================

#[tokio::test]
async fn test_reward_crud_and_search() {
    let app = TestApp::new();
    let (_, owner_token) = app.user("Owner").await;
    let (_, other_token) = app.user("Other").await;

    let bike_id = app.create_reward(&owner_token, bike()).await;
    app.create_reward(
        &other_token,
        json!({"name": "Television", "draw_date": "2025-03-01T20:00:00Z"}),
    )
    .await;

    let (status, found) = app
        .send(Method::GET, "/api/v1/rewards?search=BIKE", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found["pagination"]["total"], 1);
    assert_eq!(found["rewards"][0]["id"], bike_id.as_str());

    let (status, mine) = app
        .send(Method::GET, "/api/v1/rewards/mine", Some(&owner_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine["rewards"].as_array().unwrap().len(), 1);

    let (status, details) = app
        .send(
            Method::GET,
            &format!("/api/v1/rewards/{bike_id}/details"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["name"], "Mountain Bike");
    assert_eq!(details["images"], json!(["https://img.example.com/1.png"]));
    assert_eq!(details["price"], 2.5);
    assert_eq!(details["min_quota"], 2);
    assert!(details.get("winner_user").is_none());

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/v1/rewards/{bike_id}"),
            Some(&other_token),
            Some(json!({"name": "Stolen"})),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .send(
            Method::PUT,
            &format!("/api/v1/rewards/{bike_id}"),
            Some(&owner_token),
            Some(json!({"name": "Road Bike", "min_quota": 3})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Road Bike");

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/v1/rewards/{bike_id}"),
            Some(&owner_token),
            Some(json!({"price": -1})),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/rewards/{bike_id}"),
            Some(&owner_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send(Method::GET, &format!("/api/v1/rewards/{bike_id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_ids_are_bad_requests() {
    let app = TestApp::new();

    let (status, body) = app
        .send(Method::GET, "/api/v1/rewards/not-a-uuid", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let (status, _) = app
        .send(Method::GET, "/api/v1/rewards?page=abc", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Purchases and draws
// ============================================================================

#[tokio::test]
async fn test_full_raffle_flow() {
    let app = TestApp::new();
    let (owner, owner_token) = app.user("Owner").await;
    let (ana, ana_token) = app.user("Ana").await;
    let (bob, bob_token) = app.user("Bob").await;
    let reward_id = app.create_reward(&owner_token, bike()).await;
    let buy = |user: &User| format!("/api/v1/rewards/{reward_id}/buyers/{}", user.id);

    // Below the minimum quota
    let (status, body) = app
        .send(Method::POST, &buy(&ana), Some(&ana_token), Some(json!({"quantity": 1})))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "QUANTITY_BELOW_MINIMUM");

    // Buying for someone else
    let (status, _) = app
        .send(Method::POST, &buy(&bob), Some(&ana_token), Some(json!({"quantity": 2})))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::POST, &buy(&ana), Some(&ana_token), Some(json!({"quantity": 3})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["numbers"], json!([1, 2, 3]));
    assert_eq!(body["quantity"], 3);

    let (status, body) = app
        .send(Method::POST, &buy(&bob), Some(&bob_token), Some(json!({"quantity": 2})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["numbers"], json!([4, 5]));

    let (status, numbers) = app
        .send(
            Method::GET,
            &format!("{}/numbers", buy(&bob)),
            Some(&ana_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(numbers["numbers"], json!([4, 5]));

    let (status, buyers) = app
        .send(
            Method::GET,
            &format!("/api/v1/rewards/{reward_id}/buyers"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(buyers["buyers"][0]["user"]["id"], ana.id.to_string());
    assert_eq!(buyers["buyers"][0]["total_numbers"], 3);

    // Only the owner draws
    let draw = format!("/api/v1/rewards/{reward_id}/draw");
    let (status, _) = app.send(Method::POST, &draw, Some(&ana_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, outcome) = app.send(Method::POST, &draw, Some(&owner_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let winner_number = outcome["winner_number"].as_i64().unwrap();
    assert!((1..=5).contains(&winner_number));
    let expected_winner = if winner_number <= 3 { ana.id } else { bob.id };
    assert_eq!(outcome["winner_user"]["id"], expected_winner.to_string());

    // Exactly once
    let (status, body) = app.send(Method::POST, &draw, Some(&owner_token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_DRAWN");

    let (status, body) = app
        .send(Method::POST, &buy(&ana), Some(&ana_token), Some(json!({"quantity": 2})))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "REWARD_COMPLETED");

    let (status, _) = app
        .send(Method::DELETE, &buy(&bob), Some(&owner_token), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, details) = app
        .send(
            Method::GET,
            &format!("/api/v1/rewards/{reward_id}/details"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(details["completed"], true);
    assert_eq!(details["winner_number"], winner_number);
    assert_eq!(details["winner_user"]["id"], expected_winner.to_string());

    // Purchase history
    let (status, history) = app
        .send(
            Method::GET,
            &format!("/api/v1/purchases/user/{}", ana.id),
            Some(&ana_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["purchases"][0]["numbers"], json!([1, 2, 3]));
    assert_eq!(history["purchases"][0]["total_amount"], 7.5);
    assert_eq!(history["purchases"][0]["status"], "completed");

    let (status, _) = app
        .send(
            Method::GET,
            &format!("/api/v1/purchases/user/{}", ana.id),
            Some(&bob_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The owner still holds a reward, so the account cannot go yet
    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/v1/users/{}", owner.id),
            Some(&owner_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_extreme_page_numbers_are_clamped() {
    let app = TestApp::new();
    let (ana, ana_token) = app.user("Ana").await;

    let (status, history) = app
        .send(
            Method::GET,
            &format!("/api/v1/purchases/user/{}?page=9223372036854775807", ana.id),
            Some(&ana_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["purchases"], json!([]));
    assert_eq!(history["pagination"]["has_next"], false);

    let (status, list) = app
        .send(
            Method::GET,
            "/api/v1/rewards?page=9223372036854775807&limit=100",
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["rewards"], json!([]));
}

#[tokio::test]
async fn test_draw_without_sales() {
    let app = TestApp::new();
    let (_, owner_token) = app.user("Owner").await;
    let reward_id = app.create_reward(&owner_token, bike()).await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/rewards/{reward_id}/draw"),
            Some(&owner_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "NO_NUMBERS_SOLD");
}

#[tokio::test]
async fn test_owner_removes_buyer_and_admin_buys_for_user() {
    let app = TestApp::new();
    let (_, owner_token) = app.user("Owner").await;
    let (ana, _) = app.user("Ana").await;
    let (_, admin_token) = app.admin("Root").await;
    let reward_id = app.create_reward(&owner_token, bike()).await;
    let path = format!("/api/v1/rewards/{reward_id}/buyers/{}", ana.id);

    let (status, body) = app
        .send(Method::POST, &path, Some(&admin_token), Some(json!({"quantity": 2})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["numbers"], json!([1, 2]));

    let (status, body) = app.send(Method::DELETE, &path, Some(&owner_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 2);

    let (status, _) = app.send(Method::DELETE, &path, Some(&owner_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_closed_reward_rejects_purchases() {
    let app = TestApp::new();
    let (_, owner_token) = app.user("Owner").await;
    let (ana, ana_token) = app.user("Ana").await;
    let reward_id = app.create_reward(&owner_token, bike()).await;

    let (status, _) = app
        .send(
            Method::PUT,
            &format!("/api/v1/rewards/{reward_id}"),
            Some(&owner_token),
            Some(json!({"completed": true})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/rewards/{reward_id}/buyers/{}", ana.id),
            Some(&ana_token),
            Some(json!({"quantity": 2})),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "REWARD_COMPLETED");
}
