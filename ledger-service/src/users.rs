//! User, admin, and watchlist management

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use common::error::{Error, Result};
use common::model::price::PriceFeed;
use common::model::user::{AdminUser, User};
use common::model::watchlist::WatchlistEntry;

use crate::repository::LedgerRepository;

/// User service for registration, lookups, and watchlist bookkeeping.
///
/// Password hashing happens at the presentation layer; this service stores
/// and returns opaque hashes.
pub struct UserService {
    /// Repository for ledger data
    repo: Arc<dyn LedgerRepository>,
    /// Price feed, used to validate currencies before bookmarking them
    prices: Arc<dyn PriceFeed>,
}

impl UserService {
    /// Create a new user service
    pub fn new(repo: Arc<dyn LedgerRepository>, prices: Arc<dyn PriceFeed>) -> Self {
        Self { repo, prices }
    }

    /// Register a new user; the email must be unused
    pub async fn register_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User> {
        let name = name.trim();
        let email = email.trim().to_lowercase();

        if name.is_empty() {
            return Err(Error::Validation("name must not be empty".into()));
        }
        if !email.contains('@') {
            return Err(Error::Validation(format!("invalid email: {}", email)));
        }
        if self.repo.get_user_by_email(&email).await?.is_some() {
            return Err(Error::Validation(format!(
                "email {} is already registered",
                email
            )));
        }

        info!("Registering user {}", email);

        self.repo
            .create_user(User::new(
                name.to_string(),
                email,
                password_hash.to_string(),
            ))
            .await
    }

    /// Get a user by ID
    pub async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.repo.get_user(id).await
    }

    /// Get a user by email
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.repo.get_user_by_email(&email.trim().to_lowercase()).await
    }

    /// List all users ordered by creation time
    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.repo.list_users().await
    }

    /// Create a new admin account; the username must be unused
    pub async fn create_admin(&self, username: &str, password_hash: &str) -> Result<AdminUser> {
        let username = username.trim();

        if username.is_empty() {
            return Err(Error::Validation("username must not be empty".into()));
        }
        if self.repo.get_admin_by_username(username).await?.is_some() {
            return Err(Error::Validation(format!(
                "admin username {} is already taken",
                username
            )));
        }

        info!("Creating admin {}", username);

        self.repo
            .create_admin(AdminUser::new(
                username.to_string(),
                password_hash.to_string(),
            ))
            .await
    }

    /// Get an admin by ID
    pub async fn get_admin(&self, id: Uuid) -> Result<Option<AdminUser>> {
        self.repo.get_admin(id).await
    }

    /// Get an admin by username
    pub async fn get_admin_by_username(&self, username: &str) -> Result<Option<AdminUser>> {
        self.repo.get_admin_by_username(username.trim()).await
    }

    /// Bookmark a currency. Re-adding an existing bookmark is a no-op that
    /// returns the existing entry.
    pub async fn add_to_watchlist(
        &self,
        user_id: Uuid,
        currency_id: Uuid,
    ) -> Result<WatchlistEntry> {
        let _user = self
            .repo
            .get_user(user_id)
            .await?
            .ok_or_else(|| Error::UserNotFound(user_id.to_string()))?;

        let _currency = self
            .prices
            .currency(currency_id)
            .await?
            .ok_or_else(|| Error::CurrencyNotFound(currency_id.to_string()))?;

        self.repo
            .add_watchlist_entry(WatchlistEntry::new(user_id, currency_id))
            .await
    }

    /// Remove a bookmark
    pub async fn remove_from_watchlist(&self, user_id: Uuid, currency_id: Uuid) -> Result<()> {
        let removed = self
            .repo
            .remove_watchlist_entry(user_id, currency_id)
            .await?;

        if !removed {
            return Err(Error::WatchlistEntryNotFound(format!(
                "currency {} is not on the watchlist of user {}",
                currency_id, user_id
            )));
        }

        Ok(())
    }

    /// All bookmarks for a user, oldest first
    pub async fn watchlist(&self, user_id: Uuid) -> Result<Vec<WatchlistEntry>> {
        self.repo.watchlist_for_user(user_id).await
    }
}
