use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::backend::SupabaseClient;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::session::{Role, Session};

/// The signed-in account behind the live session
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Account {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub device_id: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub backend: Arc<SupabaseClient>,
    pub session: Session,
    pub account: Arc<RwLock<Option<Account>>>,
}

impl AppState {
    pub fn new(config: &Config, backend: SupabaseClient) -> Self {
        let backend = Arc::new(backend);
        let session = Session::new(
            backend.clone(),
            config.window_capacity,
            config.thresholds,
        );

        Self {
            backend,
            session,
            account: Arc::new(RwLock::new(None)),
        }
    }

    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` if nobody is signed in.
    pub async fn current_account(&self) -> AppResult<Account> {
        self.account
            .read()
            .await
            .clone()
            .ok_or_else(|| AppError::Unauthorized("Not signed in".to_string()))
    }

    /// # Errors
    ///
    /// Returns `AppError::Unauthorized` if nobody is signed in and
    /// `AppError::Forbidden` if the account is not an admin.
    pub async fn require_admin(&self) -> AppResult<Account> {
        let account = self.current_account().await?;
        if account.role != Role::Admin {
            return Err(AppError::Forbidden("Admin privileges required".to_string()));
        }
        Ok(account)
    }
}
