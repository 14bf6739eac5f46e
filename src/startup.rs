use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use crate::auth::TokenKeys;
use crate::config::{DatabaseSettings, Settings, StorageBackend};
use crate::error::ApiError;
use crate::routes::{
    add_prescription, admin_appointments, admin_create_doctor, admin_delete_doctor,
    admin_list_doctors, admin_login, admin_register, admin_stats, admin_update_doctor,
    approve_user, block_user, booking_appointment, create_user, delete_user, get_appointment,
    get_doctor, get_doctor_appointments, get_doctor_availability, get_me,
    get_patient_appointments, get_user, health_check, list_doctors, list_users, login, me,
    register, update_appointment_status, update_me, update_user,
};
use crate::services::accounts::ensure_default_admin;
use crate::store::{InMemoryRepository, PgRepository, Repository};

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, anyhow::Error> {
        let store = build_store(&config).await?;
        ensure_default_admin(store.as_ref(), &config.admin).await?;

        let address = format!("{}:{}", config.application.host, config.application.port);
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();
        let keys = TokenKeys::new(
            &config.application.jwt_secret,
            config.application.token_ttl_days,
        );
        let server = run(listener, store, keys)?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn get_connection_pool(config: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(config.with_db())
}

async fn build_store(config: &Settings) -> Result<Arc<dyn Repository>, anyhow::Error> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!("Using the in-memory store");
            Ok(Arc::new(InMemoryRepository::new()))
        }
        StorageBackend::Postgres => {
            let pool = get_connection_pool(&config.database);
            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;
            Ok(Arc::new(PgRepository::new(pool)))
        }
    }
}

pub fn run(
    listener: TcpListener,
    store: Arc<dyn Repository>,
    keys: TokenKeys,
) -> Result<Server, anyhow::Error> {
    let store: web::Data<dyn Repository> = web::Data::from(store);
    let keys = web::Data::new(keys);
    let server: Server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(json_config())
            .app_data(query_config())
            .app_data(path_config())
            .route("/health_check", web::get().to(health_check))
            .service(web::scope("/api/v1").configure(api_routes))
            .app_data(store.clone())
            .app_data(keys.clone())
    })
    .listen(listener)?
    .run();
    Ok(server)
}

fn api_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/me", web::get().to(me))
            .route("/admin/login", web::post().to(admin_login))
            .route("/admin/register", web::post().to(admin_register)),
    )
    .service(
        web::scope("/doctors")
            .route("/{id}/availability", web::get().to(get_doctor_availability))
            .route("/{id}", web::get().to(get_doctor)),
    )
    .service(
        web::scope("/users")
            .route("/me", web::get().to(get_me))
            .route("/me", web::put().to(update_me))
            .route("/doctors", web::get().to(list_doctors))
            .route("/doctors/{id}", web::get().to(get_doctor))
            .route("", web::get().to(list_users))
            .route("", web::post().to(create_user))
            .route("/{id}", web::get().to(get_user))
            .route("/{id}", web::put().to(update_user))
            .route("/{id}", web::delete().to(delete_user))
            .route("/{id}/approve", web::put().to(approve_user))
            .route("/{id}/block", web::put().to(block_user)),
    )
    .service(
        web::scope("/appointments")
            .route("", web::post().to(booking_appointment))
            .route("/patient", web::get().to(get_patient_appointments))
            .route("/doctor", web::get().to(get_doctor_appointments))
            .route("/{id}", web::get().to(get_appointment))
            .route("/{id}", web::put().to(update_appointment_status))
            .route("/{id}/prescription", web::post().to(add_prescription)),
    )
    .service(
        web::scope("/admin")
            .route("/login", web::post().to(admin_login))
            .route("/stats", web::get().to(admin_stats))
            .route("/appointments", web::get().to(admin_appointments))
            .route("/doctors", web::get().to(admin_list_doctors))
            .route("/doctors", web::post().to(admin_create_doctor))
            .route("/doctors/{id}", web::put().to(admin_update_doctor))
            .route("/doctors/{id}", web::delete().to(admin_delete_doctor)),
    );
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|e, _| ApiError::BadRequest(format!("Invalid request body: {}", e)).into())
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|e, _| ApiError::BadRequest(format!("Invalid query string: {}", e)).into())
}

fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|e, _| ApiError::BadRequest(format!("Invalid path: {}", e)).into())
}
