//! Integration tests for the HTTP API.
//!
//! Every test drives the real router over an in-memory SQLite database
//! (same migrations as production) and the in-process cache.

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use loan_servicing::api::{create_router, AppState};
use loan_servicing::config::Config;
use loan_servicing::infra::{Cache, Database};
use loan_servicing::services::{AuthService, ServiceContainer, Services};

const JWT_SECRET: &str = "integration-test-secret-at-least-32-chars";
const ADMIN_SECRET: &str = "let-me-in";
const PASSWORD: &str = "Abcd1234!";

struct TestApp {
    router: Router,
    auth: Arc<dyn AuthService>,
}

async fn spawn_app() -> TestApp {
    let config = Config::new("sqlite::memory:", "redis://unused", JWT_SECRET)
        .with_admin_register_secret(ADMIN_SECRET);

    // One connection: every pooled connection to `sqlite::memory:` is its own database.
    let database = Database::connect_url("sqlite::memory:", 1)
        .await
        .expect("sqlite connects");
    database.run_migrations().await.expect("migrations apply");

    let cache = Cache::in_memory();
    let services = Services::from_connection(database.get_connection(), cache.clone(), &config);
    let auth = services.auth();
    let state = AppState::new(&services, cache, Arc::new(database));

    TestApp {
        router: create_router(state, &config),
        auth,
    }
}

impl TestApp {
    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, token, Some(body)).await
    }

    /// Register a borrower; returns (user id, access token).
    async fn register(&self, username: &str, phone: &str) -> (String, String) {
        let (status, body) = self
            .post(
                "/api/auth/register",
                None,
                json!({"phone_number": phone, "username": username, "password": PASSWORD}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        (
            body["user"]["id"].as_str().unwrap().to_string(),
            body["tokens"]["access_token"].as_str().unwrap().to_string(),
        )
    }

    /// Bootstrap an admin and sign in over HTTP; returns the access token.
    async fn admin(&self, username: &str, email: &str) -> String {
        self.auth
            .create_admin(username.into(), email.into(), PASSWORD.into())
            .await
            .unwrap();
        let (status, body) = self
            .post(
                "/api/auth/admin/login",
                None,
                json!({"email": email, "password": PASSWORD}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["tokens"]["access_token"].as_str().unwrap().to_string()
    }

    async fn apply(&self, token: &str) -> (StatusCode, Value) {
        self.post(
            "/api/loans/",
            Some(token),
            json!({"amount": 150000, "termMonths": 24}),
        )
        .await
    }

    async fn issue_otp(&self, admin: &str, customer_id: &str) -> String {
        let (status, body) = self
            .post(
                "/api/admin/generate-otp",
                Some(admin),
                json!({"customer_id": customer_id}),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["otp_code"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_and_root() {
    let app = spawn_app().await;

    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, _) = app.send(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_register_apply_and_list() {
    let app = spawn_app().await;
    let (_, token) = app.register("bob", "+15551234567").await;

    let (status, created) = app.apply(&token).await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["message"], "Loan application submitted successfully");
    let number = created["application_number"].as_str().unwrap().to_string();
    assert!(number.starts_with("LN"));
    assert_eq!(number.len(), 16);
    assert_eq!(created["loan"]["status"], "pending");

    let (status, page) = app.get("/api/loans/", &token).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["application_number"], number.as_str());
    assert_eq!(page["items"][0]["status"], "pending");
}

#[tokio::test]
async fn test_duplicate_registration_conflicts() {
    let app = spawn_app().await;
    app.register("bob", "+15551234567").await;

    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({"phone_number": "+15551234567", "username": "robert", "password": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_second_pending_application_is_refused() {
    let app = spawn_app().await;
    let (_, token) = app.register("bob", "+15551234567").await;

    let (_, first) = app.apply(&token).await;
    let (status, body) = app.apply(&token).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PENDING_LOAN_EXISTS");
    assert_eq!(body["application_number"], first["application_number"]);
}

#[tokio::test]
async fn test_loan_validation_messages() {
    let app = spawn_app().await;
    let (_, token) = app.register("bob", "+15551234567").await;

    let (status, body) = app.post("/api/loans", Some(&token), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No input data provided");

    let (status, body) = app
        .post("/api/loans", Some(&token), json!({"amount": 150000}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Loan term is required");

    let (status, body) = app
        .post(
            "/api/loans",
            Some(&token),
            json!({"amount": 50000, "termMonths": 12}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Loan amount must be at least PHP 100,000.00");
}

#[tokio::test]
async fn test_protected_routes_need_a_token() {
    let app = spawn_app().await;

    let (status, body) = app.send(Method::GET, "/api/loans", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app.get("/api/loans", "not-a-jwt").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_token() {
    let app = spawn_app().await;
    let (_, token) = app.register("bob", "+15551234567").await;

    let (status, _) = app.send(Method::POST, "/api/auth/logout", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/loans", &token).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TOKEN_REVOKED");
}

#[tokio::test]
async fn test_logout_also_revokes_refresh_token() {
    let app = spawn_app().await;
    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({"phone_number": "+15551234567", "username": "bob", "password": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let access = body["tokens"]["access_token"].as_str().unwrap().to_string();
    let refresh = body["tokens"]["refresh_token"].as_str().unwrap().to_string();

    let (status, _) = app
        .send(Method::POST, "/api/auth/logout", Some(&access), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .post("/api/auth/refresh", None, json!({"refresh_token": refresh}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "TOKEN_REVOKED");
}

#[tokio::test]
async fn test_refresh_issues_access_token() {
    let app = spawn_app().await;
    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            json!({"phone_number": "+15551234567", "username": "bob", "password": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let access = body["tokens"]["access_token"].as_str().unwrap().to_string();
    let refresh = body["tokens"]["refresh_token"].as_str().unwrap().to_string();

    let (status, refreshed) = app
        .post("/api/auth/refresh", None, json!({"refresh_token": refresh}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(refreshed["token_type"], "Bearer");

    // An access token is not a refresh token
    let (status, _) = app
        .post("/api/auth/refresh", None, json!({"refresh_token": access}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_decision_only_from_pending() {
    let app = spawn_app().await;
    let admin = app.admin("root", "root@admin.test").await;
    let (_, token) = app.register("bob", "+15551234567").await;
    let (_, created) = app.apply(&token).await;
    let loan_id = created["loan"]["id"].as_str().unwrap().to_string();
    let status_uri = format!("/api/loans/{}/status", loan_id);

    // Borrowers cannot decide
    let (status, _) = app
        .post(&status_uri, Some(&token), json!({"status": "approved"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.post(&status_uri, Some(&admin), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Status is required");

    let (status, approved) = app
        .post(&status_uri, Some(&admin), json!({"status": "approved"}))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", approved);
    assert_eq!(approved["status"], "approved");
    assert!(approved["approval_date"].is_string());
    assert!(approved["due_date"].is_string());

    let (status, body) = app
        .post(&status_uri, Some(&admin), json!({"status": "rejected"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Loan is already approved, cannot change status");

    let (_, loan) = app.get(&format!("/api/loans/{}", loan_id), &token).await;
    assert_eq!(loan["status"], "approved");

    let (_, logs) = app.get("/api/admin/activity-logs", &admin).await;
    assert_eq!(logs["total"], 1);
    assert_eq!(logs["items"][0]["action"], "LOAN_STATUS_UPDATE");
}

#[tokio::test]
async fn test_borrower_edits_and_cancels_pending_loan() {
    let app = spawn_app().await;
    let (_, token) = app.register("bob", "+15551234567").await;
    let (_, created) = app.apply(&token).await;
    let uri = format!("/api/loans/{}", created["loan"]["id"].as_str().unwrap());

    let (status, updated) = app
        .send(Method::PUT, &uri, Some(&token), Some(json!({"termMonths": 36})))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["term_months"], 36);

    let (status, _) = app.send(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .send(Method::PUT, &uri, Some(&token), Some(json!({"termMonths": 12})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_STATUS_TRANSITION");

    // The cancelled loan no longer blocks a new application
    let (status, _) = app.apply(&token).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_withdrawal_needs_latest_otp_and_cancels_once() {
    let app = spawn_app().await;
    let admin = app.admin("root", "root@admin.test").await;
    let (user_id, token) = app.register("bob", "+15551234567").await;

    let (status, body) = app
        .post(
            "/api/withdrawals",
            Some(&token),
            json!({"amount": 5000, "otp-code": "123456"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid OTP code");

    let code = app.issue_otp(&admin, &user_id).await;
    assert_eq!(code.len(), 6);

    let (status, created) = app
        .post(
            "/api/withdrawals/",
            Some(&token),
            json!({"amount": 5000, "otp-code": code, "notes": "  rent  "}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["status"], "pending");
    assert_eq!(created["notes"], "rent");

    let cancel_uri = format!("/api/withdrawals/{}/cancel", created["id"].as_str().unwrap());
    let (status, cancelled) = app.send(Method::POST, &cancel_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (status, body) = app.send(Method::POST, &cancel_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["message"],
        "Cannot cancel withdrawal that is not in pending status"
    );
}

#[tokio::test]
async fn test_withdrawal_pagination_last_page() {
    let app = spawn_app().await;
    let admin = app.admin("root", "root@admin.test").await;
    let (user_id, token) = app.register("bob", "+15551234567").await;
    let code = app.issue_otp(&admin, &user_id).await;

    for _ in 0..25 {
        let (status, _) = app
            .post(
                "/api/withdrawals",
                Some(&token),
                json!({"amount": 1000, "otp_code": code}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, page) = app
        .get("/api/withdrawals?page=3&per_page=10", &token)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["items"].as_array().unwrap().len(), 5);
    assert_eq!(page["total"], 25);
    assert_eq!(page["pages"], 3);
    assert_eq!(page["current_page"], 3);
}

#[tokio::test]
async fn test_admin_processes_withdrawal() {
    let app = spawn_app().await;
    let admin = app.admin("root", "root@admin.test").await;
    let (user_id, token) = app.register("bob", "+15551234567").await;
    let code = app.issue_otp(&admin, &user_id).await;
    let (_, created) = app
        .post(
            "/api/withdrawals",
            Some(&token),
            json!({"amount": 5000, "otp-code": code}),
        )
        .await;
    let uri = format!("/api/withdrawals/{}/process", created["id"].as_str().unwrap());

    let (status, processed) = app
        .post(&uri, Some(&admin), json!({"status": "completed"}))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", processed);
    assert_eq!(processed["status"], "completed");
    assert!(processed["processed_date"].is_string());

    let (status, body) = app
        .post(&uri, Some(&admin), json!({"status": "paused"}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid processing status");
}

#[tokio::test]
async fn test_admin_user_search_by_email_fragment() {
    let app = spawn_app().await;
    let admin = app.admin("root", "root@admin.test").await;
    app.auth
        .create_admin("alice".into(), "alice@x.com".into(), PASSWORD.into())
        .await
        .unwrap();
    app.auth
        .create_admin("carol".into(), "carol@y.org".into(), PASSWORD.into())
        .await
        .unwrap();
    app.register("bob", "+15551234567").await;

    let (status, page) = app.get("/api/admin/users?search=X.COM", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["email"], "alice@x.com");

    let (_, page) = app.get("/api/admin/users?role=user", &admin).await;
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["username"], "bob");

    let (status, body) = app.get("/api/admin/users?role=root", &admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid role");
}

#[tokio::test]
async fn test_admin_loan_listing_and_edit() {
    let app = spawn_app().await;
    let admin = app.admin("root", "root@admin.test").await;
    let (_, bob) = app.register("bob", "+15551234567").await;
    let (_, eve) = app.register("eve", "+15557654321").await;
    let (_, bob_loan) = app.apply(&bob).await;
    app.apply(&eve).await;

    let (status, page) = app
        .get("/api/admin/loans?search=bob&sort=-loan_amount", &admin)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["borrower"]["username"], "bob");

    let number = bob_loan["application_number"].as_str().unwrap();
    let uri = format!("/api/admin/loans/{}", number);

    let (status, body) = app
        .send(Method::PATCH, &uri, Some(&admin), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No changes provided");

    let (status, edited) = app
        .send(
            Method::PUT,
            &uri,
            Some(&admin),
            Some(json!({"username": "robert", "status": "under_review"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", edited);
    assert_eq!(edited["status"], "under_review");
    assert_eq!(edited["borrower"]["username"], "robert");

    let (_, logs) = app.get("/api/admin/activity-logs", &admin).await;
    assert_eq!(logs["items"][0]["action"], "CUSTOMER_LOAN_UPDATE");
    assert_eq!(
        logs["items"][0]["description"],
        "username changed from bob to robert | Status changed from pending to under_review"
    );
}

#[tokio::test]
async fn test_admin_delete_deactivates_borrower() {
    let app = spawn_app().await;
    let admin = app.admin("root", "root@admin.test").await;
    let (_, token) = app.register("bob", "+15551234567").await;
    let (_, created) = app.apply(&token).await;
    let number = created["application_number"].as_str().unwrap();

    let (status, _) = app
        .send(
            Method::DELETE,
            &format!("/api/admin/loans/{}", number),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, loan) = app.get(&format!("/api/admin/loans/{}", number), &admin).await;
    assert_eq!(loan["status"], "deleted");
    assert_eq!(loan["borrower"]["account_status"], "inactive");

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            json!({"phone_number": "+15551234567", "password": PASSWORD}),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "ACCOUNT_INACTIVE");
}

#[tokio::test]
async fn test_admin_stats_reflect_new_loans() {
    let app = spawn_app().await;
    let admin = app.admin("root", "root@admin.test").await;
    let (_, token) = app.register("bob", "+15551234567").await;

    let (status, before) = app.get("/api/admin/stats", &admin).await;
    assert_eq!(status, StatusCode::OK, "{}", before);
    assert_eq!(before["loans"]["total"], 0);
    assert_eq!(before["users"]["total"], 2);

    // Applying invalidates the cached figures
    app.apply(&token).await;

    let (_, after) = app.get("/api/admin/stats", &admin).await;
    assert_eq!(after["loans"]["total"], 1);
    assert_eq!(after["loans"]["by_status"]["pending"], 1);
    assert_eq!(after["loans"]["total_amount"], 150000.0);
    assert_eq!(after["recent"]["loans"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_registration_requires_secret() {
    let app = spawn_app().await;
    let admin = app.admin("root", "root@admin.test").await;
    let (_, borrower) = app.register("bob", "+15551234567").await;
    let request = |secret: &str| {
        json!({
            "username": "ops",
            "email": "ops@admin.test",
            "password": PASSWORD,
            "admin_secret": secret,
        })
    };

    let (status, _) = app
        .post("/api/auth/admin/register", Some(&borrower), request(ADMIN_SECRET))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .post("/api/auth/admin/register", Some(&admin), request("guess"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid admin secret");

    let (status, created) = app
        .post("/api/auth/admin/register", Some(&admin), request(ADMIN_SECRET))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", created);
    assert_eq!(created["role"], "admin");
}

#[tokio::test]
async fn test_auth_routes_are_rate_limited() {
    let app = spawn_app().await;
    let attempt = json!({"phone_number": "+15550000000", "password": "Wrong1234!"});

    for _ in 0..10 {
        let (status, _) = app.post("/api/auth/login", None, attempt.clone()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (status, body) = app.post("/api/auth/login", None, attempt).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["code"], "RATE_LIMITED");
}
