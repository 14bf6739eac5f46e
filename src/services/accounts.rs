use anyhow::Context;
use chrono::Utc;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::{hash_password, validate_credentials, AuthError, Credentials, TokenKeys};
use crate::config::AdminSettings;
use crate::error::ApiError;
use crate::models::user::{check_password_strength, parse_email, parse_name};
use crate::models::{DoctorFields, DoctorProfile, Identity, Role, UserView};
use crate::store::Repository;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationForm {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<Secret<String>>,
    pub role: Option<Role>,
    #[serde(flatten)]
    pub doctor: DoctorFields,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: Option<String>,
    pub password: Option<Secret<String>>,
    pub role: Option<Role>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(flatten)]
    pub doctor: DoctorFields,
}

/// Everything needed to open an account, already checked for presence.
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: Secret<String>,
    pub role: Role,
    pub approved: bool,
    /// Required when `role` is doctor, ignored otherwise.
    pub doctor: Option<DoctorFields>,
}

impl NewAccount {
    pub fn from_parts(
        name: Option<String>,
        email: Option<String>,
        password: Option<Secret<String>>,
        role: Role,
    ) -> Result<Self, ApiError> {
        match (name, email, password) {
            (Some(name), Some(email), Some(password)) => Ok(NewAccount {
                name,
                email,
                password,
                role,
                approved: role.approved_on_registration(),
                doctor: None,
            }),
            _ => Err(ApiError::bad_request(
                "Please provide name, email and password",
            )),
        }
    }
}

/// Creates an identity and, for doctors, its profile.
///
/// The profile is validated before anything is written; if writing it fails
/// the identity is removed again.
#[tracing::instrument(
    name = "Opening a new account",
    skip(store, account),
    fields(role = %account.role, approved = account.approved)
)]
pub async fn create_account(
    store: &dyn Repository,
    account: NewAccount,
) -> Result<(Identity, Option<DoctorProfile>), ApiError> {
    let name = parse_name(&account.name)?;
    let email = parse_email(&account.email)?;
    check_password_strength(account.password.expose_secret())?;

    let identity_id = Uuid::new_v4();
    let profile = match account.role {
        Role::Doctor => Some(
            account
                .doctor
                .unwrap_or_default()
                .into_profile(identity_id)?,
        ),
        Role::Patient | Role::Admin => None,
    };

    if store.identity_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict(
            "User already exists with this email".into(),
        ));
    }

    let identity = Identity {
        id: identity_id,
        name,
        email,
        password_hash: hash_password(account.password).await?,
        role: account.role,
        is_approved: account.approved,
        is_blocked: false,
        created_at: Utc::now(),
    };
    store.insert_identity(&identity).await?;

    if let Some(profile) = &profile {
        if let Err(e) = store.insert_doctor(profile).await {
            tracing::error!(error = ?e, "Failed to store doctor profile, removing identity");
            store.delete_identity(identity.id).await?;
            return Err(e.into());
        }
    }
    tracing::info!(user_id = %identity.id, "Account created");
    Ok((identity, profile))
}

#[tracing::instrument(name = "Registering a new user", skip(store, keys, form))]
pub async fn register(
    store: &dyn Repository,
    keys: &TokenKeys,
    form: RegistrationForm,
) -> Result<String, ApiError> {
    let role = form.role.unwrap_or(Role::Patient);
    if role == Role::Admin {
        return Err(ApiError::forbidden(
            "Admin accounts cannot be created through registration",
        ));
    }
    let mut account = NewAccount::from_parts(form.name, form.email, form.password, role)?;
    account.doctor = Some(form.doctor);

    let (identity, _) = create_account(store, account).await?;
    Ok(keys.issue(&identity)?)
}

/// Opens another admin account. Callers must already be admins.
#[tracing::instrument(name = "Registering a new admin", skip(store, keys, form))]
pub async fn register_admin(
    store: &dyn Repository,
    keys: &TokenKeys,
    form: RegistrationForm,
) -> Result<String, ApiError> {
    let account = NewAccount::from_parts(form.name, form.email, form.password, Role::Admin)?;
    let (identity, _) = create_account(store, account).await?;
    Ok(keys.issue(&identity)?)
}

/// Verifies the password before revealing anything about the account.
#[tracing::instrument(
    name = "Logging in",
    skip(store, keys, form),
    fields(user_id = tracing::field::Empty)
)]
pub async fn login(
    store: &dyn Repository,
    keys: &TokenKeys,
    form: LoginForm,
) -> Result<(String, UserView), ApiError> {
    let (email, password) = match (form.email, form.password) {
        (Some(email), Some(password)) => (email, password),
        _ => {
            return Err(ApiError::bad_request(
                "Please provide an email and password",
            ))
        }
    };
    let credentials = Credentials {
        email: email.trim().to_lowercase(),
        password,
    };

    let identity = validate_credentials(credentials, store)
        .await
        .map_err(|e| match e {
            AuthError::InvalidCredentials(_) => ApiError::invalid_credentials(),
            AuthError::UnexpectedError(e) => ApiError::UnexpectedError(e),
        })?;
    tracing::Span::current().record("user_id", tracing::field::display(identity.id));

    if let Some(reason) = identity.login_refusal() {
        return Err(ApiError::Unauthorized(reason.into()));
    }
    if form.role != Some(identity.role) {
        return Err(ApiError::invalid_credentials());
    }

    let token = keys.issue(&identity)?;
    Ok((token, current_user(store, &identity).await?))
}

/// Seeds the bootstrap admin when the store holds none. Safe to call from
/// several instances at once: a lost race surfaces as a conflict and is ignored.
#[tracing::instrument(name = "Ensuring a default admin exists", skip(store, settings))]
pub async fn ensure_default_admin(
    store: &dyn Repository,
    settings: &AdminSettings,
) -> Result<(), anyhow::Error> {
    let admins = store
        .list_identities(Some(Role::Admin))
        .await
        .context("Failed to look up admin accounts")?;
    if !admins.is_empty() {
        return Ok(());
    }

    let account = NewAccount {
        name: settings.name.clone(),
        email: settings.email.clone(),
        password: settings.password.clone(),
        role: Role::Admin,
        approved: true,
        doctor: None,
    };
    match create_account(store, account).await {
        Ok(_) => {
            tracing::info!("Default admin account created");
            Ok(())
        }
        Err(ApiError::Conflict(_)) => Ok(()),
        Err(e) => Err(anyhow::Error::from(e).context("Failed to create the default admin")),
    }
}

pub async fn current_user(store: &dyn Repository, identity: &Identity) -> Result<UserView, ApiError> {
    let mut view = UserView::from(identity);
    if identity.role == Role::Doctor {
        view.doctor_id = store.doctor_by_identity(identity.id).await?.map(|p| p.id);
    }
    Ok(view)
}

#[tracing::instrument(name = "Updating own profile", skip(store, identity, update), fields(user_id = %identity.id))]
pub async fn update_profile(
    store: &dyn Repository,
    identity: &Identity,
    update: ProfileUpdate,
) -> Result<UserView, ApiError> {
    let mut updated = identity.clone();
    if let Some(name) = update.name {
        updated.name = parse_name(&name)?;
    }
    if let Some(email) = update.email {
        updated.email = parse_email(&email)?;
    }

    // Validate doctor fields before touching the identity.
    let profile = match identity.role {
        Role::Doctor => match store.doctor_by_identity(identity.id).await? {
            Some(mut profile) => {
                update.doctor.apply_to(&mut profile)?;
                Some(profile)
            }
            None => return Err(ApiError::not_found("Doctor profile not found")),
        },
        Role::Patient | Role::Admin => None,
    };

    if !store.update_identity(&updated).await? {
        return Err(ApiError::not_found("User not found"));
    }
    if let Some(profile) = &profile {
        store.update_doctor(profile).await?;
    }
    current_user(store, &updated).await
}
