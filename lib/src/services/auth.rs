// lib/src/services/auth.rs
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use clinic_models::{parse_id, Login, NewUser, RecordKind, Role, User, UserProfile};
use clinic_security::{hash_password, verify_password, Caller, TokenService};

use super::resolve_caller;
use crate::errors::{ServiceError, ServiceResult};
use crate::storage_engine::{ClinicStorage, StorageError, UserStorageEngine};

const EMAIL_TAKEN: &str = "User already exists with this email address";

/// A user together with a freshly issued bearer token.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub user: UserProfile,
    pub token: String,
}

#[derive(Clone)]
pub struct AuthService {
    storage: Arc<dyn ClinicStorage>,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(storage: Arc<dyn ClinicStorage>, tokens: TokenService) -> Self {
        AuthService { storage, tokens }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Registers a patient. Any role in the payload is ignored.
    pub async fn register(&self, new_user: NewUser) -> ServiceResult<AuthSession> {
        let user = self.create_user(new_user, Role::Patient).await?;
        info!("Registered user {} as {}", user.id, user.role);
        self.session(user)
    }

    /// Creates a user with an explicit role. Only seeding reaches this with
    /// a role other than patient.
    pub async fn create_user(&self, new_user: NewUser, role: Role) -> ServiceResult<User> {
        let validated = new_user.validate()?;
        if self.storage.get_user_by_email(&validated.email).await?.is_some() {
            debug!("Registration rejected, email already in use");
            return Err(ServiceError::AlreadyExists(EMAIL_TAKEN.to_string()));
        }
        let password_hash = hash_password(&validated.password)?;
        let user = User::from_new_user(validated, password_hash, role);
        self.storage.create_user(&user).await.map_err(|e| match e {
            StorageError::AlreadyExists(_) => ServiceError::AlreadyExists(EMAIL_TAKEN.to_string()),
            other => other.into(),
        })?;
        Ok(user)
    }

    pub async fn login(&self, login: Login) -> ServiceResult<AuthSession> {
        login.validate()?;
        let user = match self.storage.get_user_by_email(login.email.trim()).await? {
            Some(user) => user,
            None => {
                debug!("Login for unknown email");
                return Err(ServiceError::InvalidCredentials);
            }
        };
        if !verify_password(&login.password, &user.password_hash)? {
            warn!("Failed login for user {}", user.id);
            return Err(ServiceError::InvalidCredentials);
        }
        info!("User {} logged in", user.id);
        self.session(user)
    }

    pub async fn me(&self, caller: &Caller) -> ServiceResult<UserProfile> {
        Ok(resolve_caller(self.storage.as_ref(), caller).await?.profile())
    }

    /// Admin only.
    pub async fn list_users(&self, caller: &Caller) -> ServiceResult<Vec<UserProfile>> {
        let actor = resolve_caller(self.storage.as_ref(), caller).await?;
        if !actor.role.is_admin() {
            return Err(ServiceError::Forbidden("Only admins can list users".to_string()));
        }
        Ok(self.storage.list_users().await?.iter().map(User::profile).collect())
    }

    /// The caller's own record, or any record for an admin.
    pub async fn get_user(&self, caller: &Caller, id: &str) -> ServiceResult<UserProfile> {
        let id = parse_id(RecordKind::User, id)?;
        let actor = resolve_caller(self.storage.as_ref(), caller).await?;
        if actor.id != id && !actor.role.is_admin() {
            return Err(ServiceError::Forbidden("You can only view your own profile".to_string()));
        }
        self.storage
            .get_user(&id)
            .await?
            .map(|user| user.profile())
            .ok_or_else(|| ServiceError::NotFound(format!("User not found with id of {}", id)))
    }

    fn session(&self, user: User) -> ServiceResult<AuthSession> {
        let token = self.tokens.issue(&user.id, user.role)?;
        Ok(AuthSession { user: user.profile(), token })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage_engine::SledClinicStorage;
    use clinic_models::ValidationError;
    use clinic_security::TokenConfig;

    fn service() -> AuthService {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let storage: Arc<dyn ClinicStorage> = Arc::new(SledClinicStorage::new(db).unwrap());
        let tokens = TokenService::new(&TokenConfig { secret: "auth-tests-secret".into(), ttl_hours: 1 });
        AuthService::new(storage, tokens)
    }

    fn registration(email: &str, password: &str) -> NewUser {
        NewUser {
            name: "Asha".into(),
            email: email.into(),
            password: password.into(),
            role: Some("admin".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn should_force_patient_role_on_register() {
        let auth = service();
        let session = auth.register(registration("asha@example.com", "secret1")).await.unwrap();
        assert_eq!(session.user.role, Role::Patient);

        let caller = auth.tokens().caller_from_header(Some(&format!("Bearer {}", session.token))).unwrap();
        assert_eq!(caller.user_id, session.user.id);
        assert_eq!(auth.me(&caller).await.unwrap().email, "asha@example.com");
    }

    #[tokio::test]
    async fn should_reject_short_password_without_storing() {
        let auth = service();
        let err = auth.register(registration("asha@example.com", "short")).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ValidationError::PasswordTooShort(6))));
        assert!(auth.storage.get_user_by_email("asha@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_reject_duplicate_email() {
        let auth = service();
        auth.register(registration("asha@example.com", "secret1")).await.unwrap();
        let err = auth.register(registration("asha@example.com", "secret2")).await.unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyExists(ref m) if m == EMAIL_TAKEN));
    }

    #[tokio::test]
    async fn should_login_only_with_matching_password() {
        let auth = service();
        auth.register(registration("asha@example.com", "secret1")).await.unwrap();

        let ok = auth
            .login(Login { email: "asha@example.com".into(), password: "secret1".into() })
            .await
            .unwrap();
        assert_eq!(ok.user.email, "asha@example.com");

        let bad = auth.login(Login { email: "asha@example.com".into(), password: "secret2".into() }).await;
        assert!(matches!(bad, Err(ServiceError::InvalidCredentials)));
        let unknown = auth.login(Login { email: "nobody@example.com".into(), password: "secret1".into() }).await;
        assert!(matches!(unknown, Err(ServiceError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn should_restrict_user_listing_to_admins() {
        let auth = service();
        let patient = auth.register(registration("p@example.com", "secret1")).await.unwrap();
        let admin = auth.create_user(registration("admin@example.com", "secret1"), Role::Admin).await.unwrap();

        let patient_caller = Caller::new(patient.user.id, Role::Patient);
        let admin_caller = Caller::new(admin.id, Role::Admin);
        assert!(matches!(auth.list_users(&patient_caller).await, Err(ServiceError::Forbidden(_))));
        assert_eq!(auth.list_users(&admin_caller).await.unwrap().len(), 2);

        let other = admin.id.to_string();
        assert!(matches!(auth.get_user(&patient_caller, &other).await, Err(ServiceError::Forbidden(_))));
        assert_eq!(auth.get_user(&admin_caller, &patient.user.id.to_string()).await.unwrap().id, patient.user.id);
    }

    #[tokio::test]
    async fn should_use_stored_role_over_token_role() {
        let auth = service();
        let patient = auth.register(registration("p@example.com", "secret1")).await.unwrap();
        let forged = Caller::new(patient.user.id, Role::Admin);
        assert!(matches!(auth.list_users(&forged).await, Err(ServiceError::Forbidden(_))));
    }
}
