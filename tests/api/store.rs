use chrono::{NaiveDate, Utc};
use medibook::config::get_configuration;
use medibook::models::{
    Appointment, AppointmentStatus, DayOfWeek, DoctorProfile, Identity, PaymentStatus,
    Prescription, Role,
};
use medibook::startup::get_connection_pool;
use medibook::store::{AppointmentQuery, PgRepository, Repository, StoreError};
use secrecy::Secret;
use sqlx::{Connection, Executor, PgConnection};
use uuid::Uuid;

/// A repository over a freshly created, migrated database. `None` when the
/// configured Postgres server cannot be reached, in which case the calling
/// test has nothing to check.
async fn pg_store() -> Option<PgRepository> {
    let mut config = get_configuration().expect("Failed to read configuration.");
    config.database.database_name = Uuid::new_v4().to_string();

    let mut connection = match PgConnection::connect_with(&config.database.without_db()).await {
        Ok(connection) => connection,
        Err(e) => {
            eprintln!("Skipping Postgres store test, database unreachable: {}", e);
            return None;
        }
    };
    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.database.database_name).as_str())
        .await
        .expect("Failed to create database.");

    let pool = get_connection_pool(&config.database);
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate the database.");
    Some(PgRepository::new(pool))
}

fn identity(email: &str, role: Role) -> Identity {
    Identity {
        id: Uuid::new_v4(),
        name: "Test Person".into(),
        email: email.into(),
        password_hash: Secret::new("$argon2id$stub".into()),
        role,
        is_approved: true,
        is_blocked: false,
        created_at: Utc::now(),
    }
}

fn appointment(doctor_id: Uuid, date: NaiveDate, time: &str, status: AppointmentStatus) -> Appointment {
    Appointment {
        id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        doctor_id,
        date,
        time: time.into(),
        status,
        symptoms: "Headache".into(),
        prescription: None,
        payment_status: PaymentStatus::Pending,
        payment_amount: 250.0,
        created_at: Utc::now(),
    }
}

fn june_first() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

#[tokio::test]
async fn booked_times_skip_cancelled_appointments() {
    let Some(store) = pg_store().await else { return };
    let doctor_id = Uuid::new_v4();
    for (time, status) in [
        ("09:00", AppointmentStatus::Pending),
        ("10:00", AppointmentStatus::Cancelled),
        ("11:00", AppointmentStatus::Rejected),
    ] {
        store
            .insert_appointment(&appointment(doctor_id, june_first(), time, status))
            .await
            .unwrap();
    }
    let next_day = june_first().succ_opt().unwrap();
    store
        .insert_appointment(&appointment(doctor_id, next_day, "12:00", AppointmentStatus::Pending))
        .await
        .unwrap();

    let mut booked = store.booked_times(doctor_id, june_first()).await.unwrap();
    booked.sort();

    assert_eq!(booked, vec!["09:00", "11:00"]);
}

#[tokio::test]
async fn duplicate_emails_are_a_conflict() {
    let Some(store) = pg_store().await else { return };
    store
        .insert_identity(&identity("alice@example.com", Role::Patient))
        .await
        .unwrap();

    let result = store
        .insert_identity(&identity("alice@example.com", Role::Doctor))
        .await;

    assert!(matches!(result, Err(StoreError::Conflict(_))));
}

#[tokio::test]
async fn prescriptions_and_statuses_round_trip() {
    let Some(store) = pg_store().await else { return };
    let booked = appointment(Uuid::new_v4(), june_first(), "09:00", AppointmentStatus::Pending);
    store.insert_appointment(&booked).await.unwrap();
    let prescription = Prescription {
        diagnosis: Some("Migraine".into()),
        medications: Some("Ibuprofen 400mg".into()),
        instructions: None,
        follow_up_date: NaiveDate::from_ymd_opt(2024, 6, 15),
    };

    assert!(store.set_prescription(booked.id, &prescription).await.unwrap());
    assert!(store
        .set_appointment_status(booked.id, AppointmentStatus::Confirmed)
        .await
        .unwrap());
    assert!(!store
        .set_appointment_status(Uuid::new_v4(), AppointmentStatus::Confirmed)
        .await
        .unwrap());

    let stored = store.appointment_by_id(booked.id).await.unwrap().unwrap();
    assert_eq!(stored.prescription, Some(prescription));
    assert_eq!(stored.status, AppointmentStatus::Confirmed);
    assert_eq!(stored.payment_status, PaymentStatus::Pending);

    let listed = store
        .list_appointments(AppointmentQuery {
            patient_id: Some(booked.patient_id),
            doctor_id: None,
        })
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn identities_are_listed_by_optional_role() {
    let Some(store) = pg_store().await else { return };
    store
        .insert_identity(&identity("alice@example.com", Role::Patient))
        .await
        .unwrap();
    store
        .insert_identity(&identity("house@example.com", Role::Doctor))
        .await
        .unwrap();

    assert_eq!(store.list_identities(None).await.unwrap().len(), 2);
    let doctors = store.list_identities(Some(Role::Doctor)).await.unwrap();
    assert_eq!(doctors.len(), 1);
    assert_eq!(doctors[0].email, "house@example.com");
    assert!(store
        .list_identities(Some(Role::Admin))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn deleting_an_identity_removes_its_doctor_profile() {
    let Some(store) = pg_store().await else { return };
    let owner = identity("house@example.com", Role::Doctor);
    store.insert_identity(&owner).await.unwrap();
    let profile = DoctorProfile {
        id: Uuid::new_v4(),
        identity_id: owner.id,
        specialization: "Diagnostics".into(),
        qualifications: vec!["MD".into()],
        experience: "20 years".into(),
        fees: 900.0,
        available_days: vec![DayOfWeek::Monday, DayOfWeek::Friday],
        available_slots: vec!["09:00".into(), "10:00".into()],
        bio: None,
        address: "Princeton-Plainsboro".into(),
    };
    store.insert_doctor(&profile).await.unwrap();
    assert_eq!(
        store.doctor_by_identity(owner.id).await.unwrap(),
        Some(profile.clone())
    );

    assert!(store.delete_identity(owner.id).await.unwrap());

    assert_eq!(store.doctor_by_id(profile.id).await.unwrap(), None);
}

#[tokio::test]
async fn counts_are_aggregated_in_the_database() {
    let Some(store) = pg_store().await else { return };
    let mut pending = identity("taub@example.com", Role::Doctor);
    pending.is_approved = false;
    let mut blocked = identity("bob@example.com", Role::Patient);
    blocked.is_blocked = true;
    for account in [
        identity("alice@example.com", Role::Patient),
        identity("admin@example.com", Role::Admin),
        pending,
        blocked,
    ] {
        store.insert_identity(&account).await.unwrap();
    }
    let doctor_id = Uuid::new_v4();
    for (time, status) in [
        ("09:00", AppointmentStatus::Completed),
        ("10:00", AppointmentStatus::Completed),
        ("11:00", AppointmentStatus::Cancelled),
        ("12:00", AppointmentStatus::Pending),
    ] {
        store
            .insert_appointment(&appointment(doctor_id, june_first(), time, status))
            .await
            .unwrap();
    }

    let identities = store.identity_counts().await.unwrap();
    assert_eq!(identities.patients, 2);
    assert_eq!(identities.doctors, 1);
    assert_eq!(identities.admins, 1);
    assert_eq!(identities.pending_doctors, 1);
    assert_eq!(identities.blocked, 1);

    let appointments = store.appointment_counts().await.unwrap();
    assert_eq!(appointments.total, 4);
    assert_eq!(appointments.completed, 2);
    assert_eq!(appointments.cancelled, 1);
    assert_eq!(appointments.pending, 1);
    assert_eq!(appointments.confirmed, 0);
    assert_eq!(appointments.revenue, 500.0);
}
