use medibook::config::{get_configuration, StorageBackend};
use medibook::startup::Application;
use medibook::telemetry::{get_subscriber, init_subscriber};
use once_cell::sync::Lazy;
use secrecy::ExposeSecret;
use serde_json::{json, Value};

// Ensure that the `tracing` stack is only initialised once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    };
});

pub struct TestUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub api_client: reqwest::Client,
    pub admin: TestUser,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.address, path)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut request = self.api_client.get(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request.")
    }

    pub async fn post(&self, path: &str, body: &Value, token: Option<&str>) -> reqwest::Response {
        let mut request = self.api_client.post(self.url(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request.")
    }

    pub async fn put(&self, path: &str, body: &Value, token: Option<&str>) -> reqwest::Response {
        let mut request = self.api_client.put(self.url(path)).json(body);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request.")
    }

    pub async fn delete(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut request = self.api_client.delete(self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        request.send().await.expect("Failed to execute request.")
    }

    pub async fn login(&self, email: &str, password: &str, role: &str) -> reqwest::Response {
        self.post(
            "/auth/login",
            &json!({ "email": email, "password": password, "role": role }),
            None,
        )
        .await
    }

    /// Logs in and returns the bearer token, panicking on failure.
    pub async fn token_for(&self, email: &str, password: &str, role: &str) -> String {
        let response = self.login(email, password, role).await;
        assert_eq!(200, response.status().as_u16());
        let body: Value = response.json().await.expect("Failed to parse response.");
        body["token"].as_str().expect("Missing token").to_string()
    }

    pub async fn admin_token(&self) -> String {
        let response = self
            .post(
                "/auth/admin/login",
                &json!({ "email": self.admin.email, "password": self.admin.password }),
                None,
            )
            .await;
        assert_eq!(200, response.status().as_u16());
        let body: Value = response.json().await.expect("Failed to parse response.");
        body["token"].as_str().expect("Missing token").to_string()
    }

    /// Registers a patient and returns their token.
    pub async fn register_patient(&self, name: &str, email: &str) -> String {
        let response = self
            .post(
                "/auth/register",
                &json!({
                    "name": name,
                    "email": email,
                    "password": "password123",
                    "role": "patient"
                }),
                None,
            )
            .await;
        assert_eq!(201, response.status().as_u16());
        let body: Value = response.json().await.expect("Failed to parse response.");
        body["token"].as_str().expect("Missing token").to_string()
    }

    /// Creates an approved doctor through the admin API and returns the
    /// doctor profile id.
    pub async fn create_doctor(&self, admin_token: &str, name: &str, email: &str) -> String {
        let response = self
            .post("/admin/doctors", &doctor_body(name, email), Some(admin_token))
            .await;
        assert_eq!(201, response.status().as_u16());
        let body: Value = response.json().await.expect("Failed to parse response.");
        body["data"]["id"].as_str().expect("Missing doctor id").to_string()
    }
}

pub fn doctor_body(name: &str, email: &str) -> Value {
    json!({
        "name": name,
        "email": email,
        "password": "password123",
        "role": "doctor",
        "specialization": "Cardiology",
        "qualifications": "MBBS, MD",
        "experience": "8 years",
        "fees": 500,
        "availableDays": ["Monday", "Saturday"],
        "availableSlots": ["09:00", "10:00"],
        "clinicAddress": "221B Baker Street"
    })
}

pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let config = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        // Use a random OS port
        c.application.port = 0;
        c.storage.backend = StorageBackend::Memory;
        c
    };
    let admin = TestUser {
        name: config.admin.name.clone(),
        email: config.admin.email.clone(),
        password: config.admin.password.expose_secret().clone(),
    };

    let application = Application::build(config.clone())
        .await
        .expect("Failed to build application.");
    let application_port = application.port();
    let _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address: format!("http://127.0.0.1:{}", application_port),
        port: application_port,
        api_client: reqwest::Client::new(),
        admin,
    }
}
