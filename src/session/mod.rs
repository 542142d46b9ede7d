pub mod store;

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::{AuthApi, AuthHeader};
use crate::error::AppError;
use crate::forms::RegisterDraft;
use crate::models::{AuthResponse, LoginRequest, User};
use crate::viewer::Viewer;

pub use store::{MemorySessionStore, SessionStore, SqliteSessionStore, StoredSession};

/// Logged-in state for one client process.
///
/// The stored token, the `Authorization` header and the in-memory user always
/// change together. The store is written first, so a storage failure leaves
/// the other two untouched.
pub struct SessionContext<A: AuthApi + ?Sized> {
    api: Arc<A>,
    store: Arc<dyn SessionStore>,
    header: AuthHeader,
    user: Option<User>,
}

impl<A: AuthApi + ?Sized> SessionContext<A> {
    pub fn new(api: Arc<A>, store: Arc<dyn SessionStore>, header: AuthHeader) -> Self {
        Self {
            api,
            store,
            header,
            user: None,
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn viewer(&self) -> Result<Viewer, AppError> {
        self.user
            .as_ref()
            .map(Viewer::from_user)
            .ok_or(AppError::Unauthorized)
    }

    /// Picks up a session persisted by an earlier run. Returns whether one
    /// was found.
    pub async fn restore(&mut self) -> Result<bool, AppError> {
        match self.store.load().await? {
            Some(StoredSession { token, user }) => {
                info!("restored session for {} ({})", user.username, user.role);
                self.header.set(Some(token));
                self.user = Some(user);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn login(&mut self, username: &str, password: &str) -> Result<&User, AppError> {
        let req = LoginRequest {
            username: username.trim().to_string(),
            password: password.to_string(),
        };
        let auth = self.api.login(&req).await.inspect_err(|e| {
            warn!("login failed for {}: {}", req.username, e);
        })?;
        self.install(auth).await
    }

    /// Validates the draft locally; nothing is sent unless it is clean.
    pub async fn register(&mut self, draft: &RegisterDraft) -> Result<&User, AppError> {
        let req = draft.to_payload()?;
        let auth = self.api.register(&req).await.inspect_err(|e| {
            warn!("registration failed for {}: {}", req.username, e);
        })?;
        self.install(auth).await
    }

    pub async fn logout(&mut self) -> Result<(), AppError> {
        self.store.clear().await?;
        self.header.set(None);
        if let Some(user) = self.user.take() {
            info!("logged out {}", user.username);
        }
        Ok(())
    }

    async fn install(&mut self, auth: AuthResponse) -> Result<&User, AppError> {
        let AuthResponse { token, user } = auth;
        let stored = StoredSession { token, user };
        self.store.save(&stored).await?;

        info!("logged in as {} ({})", stored.user.username, stored.user.role);
        self.header.set(Some(stored.token));
        Ok(self.user.insert(stored.user))
    }
}
