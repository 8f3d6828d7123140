use std::{
    io::ErrorKind,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{info, instrument, warn};

use super::{
    password::{hash_password, verify_password},
    repo_types::{Identity, User},
    session::{Session, SessionKeys},
};
use crate::error::AppError;

/// Identity backend. `current_identity` answers from local state only.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AppError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AppError>;

    async fn sign_out(&self) -> Result<(), AppError>;

    fn current_identity(&self) -> Option<Identity>;
}

/// Email/password accounts in the remote `users` table. The session token
/// is optionally kept in a file so a restart stays signed in.
pub struct PgAuthProvider {
    db: PgPool,
    keys: SessionKeys,
    session: RwLock<Option<Session>>,
    session_file: Option<PathBuf>,
}

impl PgAuthProvider {
    pub fn new(db: PgPool, keys: SessionKeys, session_file: Option<PathBuf>) -> Self {
        Self {
            db,
            keys,
            session: RwLock::new(None),
            session_file,
        }
    }

    /// Loads the stored token, if any. Invalid or expired tokens are discarded.
    pub async fn restore_session(&self) -> Result<bool, AppError> {
        let Some(path) = &self.session_file else {
            return Ok(false);
        };
        let token = match tokio::fs::read_to_string(path).await {
            Ok(token) => token,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(AppError::Auth(e.to_string())),
        };

        match self.keys.verify(token.trim()) {
            Ok(session) => {
                info!(user_id = %session.identity.id, "session restored");
                self.set_session(Some(session));
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "stored session rejected");
                self.forget_stored().await;
                Ok(false)
            }
        }
    }

    fn set_session(&self, session: Option<Session>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
    }

    async fn start_session(&self, identity: Identity) -> Result<Identity, AppError> {
        let session = self.keys.issue(identity)?;
        if let Some(path) = &self.session_file {
            if let Err(e) = tokio::fs::write(path, &session.token).await {
                warn!(error = %e, path = %path.display(), "session not persisted");
            }
        }
        let identity = session.identity.clone();
        self.set_session(Some(session));
        Ok(identity)
    }

    async fn forget_stored(&self) {
        if let Some(path) = &self.session_file {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(error = %e, path = %path.display(), "session file not removed"),
            }
        }
    }
}

fn identity_of(user: &User) -> Identity {
    Identity {
        id: user.id.to_string(),
        email: user.email.clone(),
    }
}

#[async_trait]
impl AuthProvider for PgAuthProvider {
    #[instrument(skip(self, password))]
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let email = email.trim().to_lowercase();
        if User::find_by_email(&self.db, &email).await?.is_some() {
            warn!(%email, "email already registered");
            return Err(AppError::Conflict("email already registered".into()));
        }

        let hash = hash_password(password)?;
        let user = User::create(&self.db, &email, &hash).await?;
        info!(user_id = %user.id, email = %user.email, "user registered");
        self.start_session(identity_of(&user)).await
    }

    #[instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let email = email.trim().to_lowercase();
        let Some(user) = User::find_by_email(&self.db, &email).await? else {
            warn!(%email, "sign-in with unknown email");
            return Err(AppError::InvalidCredentials);
        };
        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "sign-in with wrong password");
            return Err(AppError::InvalidCredentials);
        }
        info!(user_id = %user.id, "user signed in");
        self.start_session(identity_of(&user)).await
    }

    async fn sign_out(&self) -> Result<(), AppError> {
        self.set_session(None);
        self.forget_stored().await;
        info!("user signed out");
        Ok(())
    }

    fn current_identity(&self) -> Option<Identity> {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.identity.clone())
    }
}
