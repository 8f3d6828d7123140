use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::{
    provider::AuthProvider,
    repo_types::{Identity, Profile, ProfileUpdate},
};
use crate::{
    error::{AppError, RemoteError},
    navigation::Screen,
    remote::{insert_as, select_one, Filter, Query, RemoteStore, Table},
};

const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    SignUp,
    SignIn,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthForm {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub username: String,
}

/// Session and profile operations on top of an [`AuthProvider`].
#[derive(Clone)]
pub struct AccountService {
    auth: Arc<dyn AuthProvider>,
    remote: Arc<dyn RemoteStore>,
}

impl AccountService {
    pub fn new(auth: Arc<dyn AuthProvider>, remote: Arc<dyn RemoteStore>) -> Self {
        Self { auth, remote }
    }

    /// Registers the account and creates its profile row.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<Identity, AppError> {
        if email.trim().is_empty() || password.trim().is_empty() || username.trim().is_empty() {
            return Err(AppError::validation("all fields are required"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation("password must be at least 6 characters"));
        }
        if !is_valid_email(email.trim()) {
            return Err(AppError::validation("invalid email"));
        }

        let identity = self.auth.sign_up(email.trim(), password).await?;
        let profile = Profile {
            id: identity.id.clone(),
            username: username.trim().to_string(),
            bio: None,
            avatar_url: None,
            created_at: None,
        };
        let _: Profile = insert_as(self.remote.as_ref(), Table::Profiles, &profile).await?;
        info!(user_id = %identity.id, "profile created");
        Ok(identity)
    }

    /// Every provider failure is reported as invalid credentials.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AppError::validation("email and password are required"));
        }
        self.auth.sign_in(email.trim(), password).await.map_err(|e| {
            warn!(error = %e, "sign-in failed");
            AppError::InvalidCredentials
        })
    }

    pub async fn sign_out(&self) -> Result<(), AppError> {
        self.auth.sign_out().await
    }

    pub async fn submit(&self, mode: AuthMode, form: &AuthForm) -> Result<Identity, AppError> {
        match mode {
            AuthMode::SignUp => self.sign_up(&form.email, &form.password, &form.username).await,
            AuthMode::SignIn => self.sign_in(&form.email, &form.password).await,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.auth.current_identity().is_some()
    }

    pub fn current_user_id(&self) -> Option<String> {
        self.auth.current_identity().map(|i| i.id)
    }

    pub async fn current_user(&self) -> Result<Option<Profile>, AppError> {
        match self.current_user_id() {
            Some(id) => self.get_profile(&id).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<Profile, AppError> {
        Ok(select_one(self.remote.as_ref(), Table::Profiles, Query::new().eq("id", user_id)).await?)
    }

    /// Read, overlay, write back. Concurrent edits from elsewhere between the
    /// read and the write are overwritten.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Profile, AppError> {
        let user_id = self.current_user_id().ok_or(AppError::NotAuthenticated)?;
        if update.username.as_deref().is_some_and(|u| u.trim().is_empty()) {
            return Err(AppError::validation("username cannot be empty"));
        }

        let merged = self.get_profile(&user_id).await?.merged(update);
        let row = serde_json::to_value(&merged).map_err(RemoteError::from)?;
        self.remote
            .update(Table::Profiles, row, vec![Filter::Eq("id", user_id.clone())])
            .await?;
        info!(%user_id, "profile updated");
        Ok(merged)
    }

    pub fn start_destination(&self) -> Screen {
        if self.is_logged_in() {
            Screen::Home
        } else {
            Screen::Auth
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{accounts::provider::MockAuthProvider, remote::memory::MemoryRemote};

    fn identity() -> Identity {
        Identity {
            id: "u1".into(),
            email: "cook@example.com".into(),
        }
    }

    fn signed_in() -> MockAuthProvider {
        let mut auth = MockAuthProvider::new();
        auth.expect_current_identity().returning(|| Some(identity()));
        auth
    }

    fn signed_out() -> MockAuthProvider {
        let mut auth = MockAuthProvider::new();
        auth.expect_current_identity().returning(|| None);
        auth
    }

    fn service(auth: MockAuthProvider) -> (AccountService, Arc<MemoryRemote>) {
        let remote = Arc::new(MemoryRemote::new());
        (AccountService::new(Arc::new(auth), remote.clone()), remote)
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
    }

    #[tokio::test]
    async fn sign_up_validates_before_calling_the_provider() {
        // No sign_up expectation: reaching the provider would panic.
        let (svc, remote) = service(MockAuthProvider::new());
        for (email, password, username) in [
            ("", "secret1", "anna"),
            ("a@b.co", "secret1", "  "),
            ("a@b.co", "12345", "anna"),
            ("not-an-email", "secret1", "anna"),
        ] {
            let err = svc.sign_up(email, password, username).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{email}/{username}");
        }
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn sign_up_creates_profile() {
        let mut auth = MockAuthProvider::new();
        auth.expect_sign_up().times(1).returning(|email, password| {
            assert_eq!(email, "cook@example.com");
            assert_eq!(password, "secret1");
            Ok(identity())
        });
        let (svc, remote) = service(auth);

        let id = svc
            .submit(
                AuthMode::SignUp,
                &AuthForm {
                    email: " cook@example.com ".into(),
                    password: "secret1".into(),
                    username: " anna ".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(id, identity());
        let rows = remote.rows(Table::Profiles);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["username"], json!("anna"));
        assert_eq!(rows[0]["id"], json!("u1"));
    }

    #[tokio::test]
    async fn sign_in_failures_become_invalid_credentials() {
        let mut auth = MockAuthProvider::new();
        auth.expect_sign_in()
            .returning(|_, _| Err(AppError::Auth("connection refused".into())));
        let (svc, _) = service(auth);

        assert!(matches!(
            svc.sign_in("cook@example.com", "secret1").await,
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(svc.sign_in(" ", "x").await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn session_state_drives_start_destination() {
        let (svc, _) = service(signed_out());
        assert!(!svc.is_logged_in());
        assert_eq!(svc.start_destination(), Screen::Auth);
        assert_eq!(svc.current_user().await.unwrap(), None);

        let (svc, _) = service(signed_in());
        assert_eq!(svc.current_user_id().as_deref(), Some("u1"));
        assert_eq!(svc.start_destination(), Screen::Home);
    }

    #[tokio::test]
    async fn update_profile_requires_a_session() {
        let (svc, remote) = service(signed_out());
        let err = svc.update_profile(ProfileUpdate::default()).await.unwrap_err();
        assert!(matches!(err, AppError::NotAuthenticated));
        assert_eq!(remote.calls(), 0);
    }

    #[tokio::test]
    async fn update_profile_merges_and_writes_back() {
        let (svc, remote) = service(signed_in());
        remote.seed(
            Table::Profiles,
            json!({
                "id": "u1",
                "username": "anna",
                "bio": "I bake",
                "created_at": "2024-05-01T10:00:00+00:00"
            }),
        );

        let updated = svc
            .update_profile(ProfileUpdate {
                bio: Some("I bake and fry".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(updated.username, "anna");
        assert_eq!(updated.bio.as_deref(), Some("I bake and fry"));
        assert_eq!(svc.current_user().await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn sign_out_delegates() {
        let mut auth = MockAuthProvider::new();
        auth.expect_sign_out().times(1).returning(|| Ok(()));
        let (svc, _) = service(auth);
        svc.sign_out().await.unwrap();
    }
}
