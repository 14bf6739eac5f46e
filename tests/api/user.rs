use rstest::rstest;
use serde_json::{json, Value};

use crate::utils::{doctor_body, spawn_app};

#[tokio::test]
async fn registered_patients_can_log_in() {
    let app = spawn_app().await;
    app.register_patient("Alice Liddell", "Alice@Example.com").await;

    let response = app.login("alice@example.com", "password123", "patient").await;
    assert_eq!(200, response.status().as_u16());

    let body: Value = response.json().await.expect("Failed to parse response.");
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["role"], "patient");
    assert!(body["user"].get("passwordHash").is_none());
}

#[rstest]
#[case(json!({ "email": "a@example.com", "password": "password123" }))]
#[case(json!({ "name": "Alice", "password": "password123" }))]
#[case(json!({ "name": "Alice", "email": "a@example.com" }))]
#[case(json!({ "name": "Al", "email": "a@example.com", "password": "password123" }))]
#[case(json!({ "name": "Alice", "email": "not-an-email", "password": "password123" }))]
#[case(json!({ "name": "Alice", "email": "a@example.com", "password": "123" }))]
#[tokio::test]
async fn invalid_registrations_are_bad_requests(#[case] body: Value) {
    let app = spawn_app().await;

    let response = app.post("/auth/register", &body, None).await;

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response.");
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn duplicate_emails_conflict_regardless_of_case() {
    let app = spawn_app().await;
    app.register_patient("Alice Liddell", "alice@example.com").await;

    let response = app
        .post(
            "/auth/register",
            &json!({
                "name": "Other Alice",
                "email": "ALICE@example.com",
                "password": "password123"
            }),
            None,
        )
        .await;

    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn admins_cannot_self_register() {
    let app = spawn_app().await;

    let response = app
        .post(
            "/auth/register",
            &json!({
                "name": "Mallory",
                "email": "mallory@example.com",
                "password": "password123",
                "role": "admin"
            }),
            None,
        )
        .await;

    assert_eq!(403, response.status().as_u16());
}

#[rstest]
#[case("alice@example.com", "wrong-password", "patient")]
#[case("nobody@example.com", "password123", "patient")]
#[case("alice@example.com", "password123", "doctor")]
#[tokio::test]
async fn bad_logins_share_one_message(
    #[case] email: &str,
    #[case] password: &str,
    #[case] role: &str,
) {
    let app = spawn_app().await;
    app.register_patient("Alice Liddell", "alice@example.com").await;

    let response = app.login(email, password, role).await;

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response.");
    assert_eq!(body["message"], "Invalid credentials");
}

#[tokio::test]
async fn doctors_wait_for_approval_before_logging_in() {
    let app = spawn_app().await;
    let response = app
        .post(
            "/auth/register",
            &doctor_body("Gregory House", "house@example.com"),
            None,
        )
        .await;
    assert_eq!(201, response.status().as_u16());

    let response = app.login("house@example.com", "password123", "doctor").await;
    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response.");
    assert_eq!(body["message"], "Your account is pending approval from admin");

    let admin_token = app.admin_token().await;
    let users: Value = app
        .get("/users", Some(&admin_token))
        .await
        .json()
        .await
        .expect("Failed to parse response.");
    let house = users["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "house@example.com")
        .expect("Doctor not listed")
        .clone();
    assert_eq!(house["isApproved"], false);

    let response = app
        .put(
            &format!("/users/{}/approve", house["id"].as_str().unwrap()),
            &json!({}),
            Some(&admin_token),
        )
        .await;
    assert_eq!(200, response.status().as_u16());

    let response = app.login("house@example.com", "password123", "doctor").await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response.");
    assert!(body["user"]["doctorId"].is_string());
}

#[tokio::test]
async fn a_pending_doctor_cannot_use_the_registration_token() {
    let app = spawn_app().await;
    let response = app
        .post(
            "/auth/register",
            &doctor_body("Gregory House", "house@example.com"),
            None,
        )
        .await;
    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response.");
    let token = body["token"].as_str().unwrap().to_string();

    let response = app.get("/appointments/doctor", Some(&token)).await;
    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response.");
    assert_eq!(body["message"], "Your account is pending approval from admin");
    assert_eq!(401, app.get("/users/me", Some(&token)).await.status().as_u16());

    let admin_token = app.admin_token().await;
    let users: Value = app
        .get("/users", Some(&admin_token))
        .await
        .json()
        .await
        .expect("Failed to parse response.");
    let id = users["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|u| u["email"] == "house@example.com")
        .expect("Doctor not listed")["id"]
        .as_str()
        .unwrap()
        .to_string();
    let response = app
        .put(&format!("/users/{}/approve", id), &json!({}), Some(&admin_token))
        .await;
    assert_eq!(200, response.status().as_u16());

    let response = app.get("/appointments/doctor", Some(&token)).await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn malformed_block_requests_leave_the_user_alone() {
    let app = spawn_app().await;
    let token = app.register_patient("Alice Liddell", "alice@example.com").await;
    let me: Value = app
        .get("/auth/me", Some(&token))
        .await
        .json()
        .await
        .expect("Failed to parse response.");
    let id = me["user"]["id"].as_str().unwrap().to_string();
    let admin_token = app.admin_token().await;

    let response = app
        .put(
            &format!("/users/{}/block", id),
            &json!({ "isBlocked": "false" }),
            Some(&admin_token),
        )
        .await;

    assert_eq!(400, response.status().as_u16());
    assert_eq!(200, app.get("/auth/me", Some(&token)).await.status().as_u16());
}

#[tokio::test]
async fn blocked_users_lose_access() {
    let app = spawn_app().await;
    let token = app.register_patient("Alice Liddell", "alice@example.com").await;
    let me: Value = app
        .get("/auth/me", Some(&token))
        .await
        .json()
        .await
        .expect("Failed to parse response.");
    let id = me["user"]["id"].as_str().unwrap().to_string();

    let admin_token = app.admin_token().await;
    let response = app
        .put(&format!("/users/{}/block", id), &json!({}), Some(&admin_token))
        .await;
    assert_eq!(200, response.status().as_u16());

    assert_eq!(401, app.get("/auth/me", Some(&token)).await.status().as_u16());
    let response = app.login("alice@example.com", "password123", "patient").await;
    let body: Value = response.json().await.expect("Failed to parse response.");
    assert_eq!(body["message"], "Your account has been blocked. Please contact admin.");

    let response = app
        .put(
            &format!("/users/{}/block", id),
            &json!({ "isBlocked": false }),
            Some(&admin_token),
        )
        .await;
    assert_eq!(200, response.status().as_u16());
    assert_eq!(200, app.get("/auth/me", Some(&token)).await.status().as_u16());
}

#[rstest]
#[case(None)]
#[case(Some("not-a-token"))]
#[tokio::test]
async fn protected_routes_require_a_valid_token(#[case] token: Option<&str>) {
    let app = spawn_app().await;

    let response = app.get("/auth/me", token).await;

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response.");
    assert_eq!(body["message"], "Not authorized to access this route");
}

#[tokio::test]
async fn users_can_update_their_own_profile() {
    let app = spawn_app().await;
    let token = app.register_patient("Alice Liddell", "alice@example.com").await;

    let response = app
        .put("/users/me", &json!({ "name": "Alice Kingsleigh" }), Some(&token))
        .await;
    assert_eq!(200, response.status().as_u16());

    let me: Value = app
        .get("/users/me", Some(&token))
        .await
        .json()
        .await
        .expect("Failed to parse response.");
    assert_eq!(me["data"]["name"], "Alice Kingsleigh");
    assert_eq!(me["data"]["email"], "alice@example.com");
}

#[tokio::test]
async fn only_admins_manage_users() {
    let app = spawn_app().await;
    let token = app.register_patient("Alice Liddell", "alice@example.com").await;

    assert_eq!(403, app.get("/users", Some(&token)).await.status().as_u16());

    let admin_token = app.admin_token().await;
    let response = app.get("/users", Some(&admin_token)).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response.");
    // The bootstrap admin and Alice.
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn admins_can_register_further_admins() {
    let app = spawn_app().await;
    let admin_token = app.admin_token().await;
    let body = json!({
        "name": "Second Admin",
        "email": "second@example.com",
        "password": "password123"
    });

    assert_eq!(401, app.post("/auth/admin/register", &body, None).await.status().as_u16());
    let response = app.post("/auth/admin/register", &body, Some(&admin_token)).await;
    assert_eq!(201, response.status().as_u16());

    let response = app
        .post(
            "/admin/login",
            &json!({ "email": "second@example.com", "password": "password123" }),
            None,
        )
        .await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn patients_cannot_use_the_admin_login() {
    let app = spawn_app().await;
    app.register_patient("Alice Liddell", "alice@example.com").await;

    let response = app
        .post(
            "/auth/admin/login",
            &json!({ "email": "alice@example.com", "password": "password123" }),
            None,
        )
        .await;

    assert_eq!(401, response.status().as_u16());
}
