use serde_json::{json, Value};
use uuid::Uuid;

use crate::utils::spawn_app;

async fn availability(app: &crate::utils::TestApp, doctor_id: &str, date: &str) -> Value {
    let response = app
        .get(
            &format!("/doctors/{}/availability?date={}", doctor_id, date),
            None,
        )
        .await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response.");
    body["data"].clone()
}

#[tokio::test]
async fn booking_a_slot_removes_it_from_availability() {
    let app = spawn_app().await;
    let admin_token = app.admin_token().await;
    let doctor_id = app
        .create_doctor(&admin_token, "Gregory House", "house@example.com")
        .await;

    app.register_patient("Alice Liddell", "alice@example.com").await;
    let token = app
        .token_for("alice@example.com", "password123", "patient")
        .await;

    assert_eq!(
        availability(&app, &doctor_id, "2024-06-01").await,
        json!(["09:00", "10:00"])
    );

    let response = app
        .post(
            "/appointments",
            &json!({
                "doctorId": doctor_id,
                "date": "2024-06-01",
                "time": "09:00",
                "symptoms": "Headache",
                "paymentAmount": 500
            }),
            Some(&token),
        )
        .await;
    assert_eq!(201, response.status().as_u16());

    assert_eq!(
        availability(&app, &doctor_id, "2024-06-01").await,
        json!(["10:00"])
    );
    // Other days are untouched.
    assert_eq!(
        availability(&app, &doctor_id, "2024-06-02").await,
        json!(["09:00", "10:00"])
    );
}

#[tokio::test]
async fn cancelling_frees_the_slot_again() {
    let app = spawn_app().await;
    let admin_token = app.admin_token().await;
    let doctor_id = app
        .create_doctor(&admin_token, "Gregory House", "house@example.com")
        .await;
    let token = app.register_patient("Alice Liddell", "alice@example.com").await;

    let booked: Value = app
        .post(
            "/appointments",
            &json!({
                "doctorId": doctor_id,
                "date": "2024-06-01",
                "time": "10:00",
                "symptoms": "Headache",
                "paymentAmount": 500
            }),
            Some(&token),
        )
        .await
        .json()
        .await
        .expect("Failed to parse response.");
    let appointment_id = booked["data"]["id"].as_str().unwrap();

    let response = app
        .put(
            &format!("/appointments/{}", appointment_id),
            &json!({ "status": "cancelled" }),
            Some(&token),
        )
        .await;
    assert_eq!(200, response.status().as_u16());

    assert_eq!(
        availability(&app, &doctor_id, "2024-06-01").await,
        json!(["09:00", "10:00"])
    );
}

#[tokio::test]
async fn availability_of_an_unknown_doctor_is_not_found() {
    let app = spawn_app().await;

    let response = app
        .get(
            &format!("/doctors/{}/availability?date=2024-06-01", Uuid::new_v4()),
            None,
        )
        .await;

    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn availability_requires_a_valid_date() {
    let app = spawn_app().await;
    let admin_token = app.admin_token().await;
    let doctor_id = app
        .create_doctor(&admin_token, "Gregory House", "house@example.com")
        .await;

    for query in ["", "?date=someday"] {
        let response = app
            .get(&format!("/doctors/{}/availability{}", doctor_id, query), None)
            .await;
        assert_eq!(400, response.status().as_u16());
    }
}

#[tokio::test]
async fn the_directory_lists_only_approved_doctors() {
    let app = spawn_app().await;
    let admin_token = app.admin_token().await;
    let approved = app
        .create_doctor(&admin_token, "Gregory House", "house@example.com")
        .await;
    let response = app
        .post(
            "/auth/register",
            &crate::utils::doctor_body("Chris Taub", "taub@example.com"),
            None,
        )
        .await;
    assert_eq!(201, response.status().as_u16());

    let response = app.get("/users/doctors", None).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.expect("Failed to parse response.");
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["id"], approved.as_str());
    assert_eq!(body["data"][0]["name"], "Gregory House");
    assert_eq!(body["data"][0]["qualifications"], json!(["MBBS", "MD"]));

    let admin_view: Value = app
        .get("/admin/doctors", Some(&admin_token))
        .await
        .json()
        .await
        .expect("Failed to parse response.");
    assert_eq!(admin_view["count"], 2);
}

#[tokio::test]
async fn directory_filters_are_combined() {
    let app = spawn_app().await;
    let admin_token = app.admin_token().await;
    app.create_doctor(&admin_token, "Gregory House", "house@example.com")
        .await;

    for (query, expected) in [
        ("?name=house", 1),
        ("?name=wilson", 0),
        ("?specialization=cardio&availableDay=Monday", 1),
        ("?availableDay=Sunday", 0),
    ] {
        let body: Value = app
            .get(&format!("/users/doctors{}", query), None)
            .await
            .json()
            .await
            .expect("Failed to parse response.");
        assert_eq!(body["count"], expected, "query {}", query);
    }
}

#[tokio::test]
async fn doctor_details_are_public() {
    let app = spawn_app().await;
    let admin_token = app.admin_token().await;
    let doctor_id = app
        .create_doctor(&admin_token, "Gregory House", "house@example.com")
        .await;

    for path in [
        format!("/doctors/{}", doctor_id),
        format!("/users/doctors/{}", doctor_id),
    ] {
        let response = app.get(&path, None).await;
        assert_eq!(200, response.status().as_u16());
        let body: Value = response.json().await.expect("Failed to parse response.");
        assert_eq!(body["data"]["specialization"], "Cardiology");
        assert_eq!(body["data"]["email"], "house@example.com");
    }
}
