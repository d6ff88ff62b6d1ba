//! Repository for the trade ledger
//!
//! The settlement write path is a single `apply_settlement` call: one order,
//! its transaction, and the wallet balance delta commit together or not at
//! all. Everything else is plain record CRUD and ordered scans.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use common::db::models::{DbAdminUser, DbOrder, DbTransaction, DbUser, DbWallet, DbWatchlistEntry};
use common::decimal::Quantity;
use common::error::{Error, Result};
use common::model::trade::{Order, Transaction};
use common::model::user::{AdminUser, User};
use common::model::wallet::Wallet;
use common::model::watchlist::WatchlistEntry;

use crate::config::LedgerServiceConfig;

/// Ledger repository trait defining the interface for ledger storage
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Create a new user; the email must be unused
    async fn create_user(&self, user: User) -> Result<User>;

    /// Get a user by ID
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    /// Get a user by email
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// List all users ordered by creation time
    async fn list_users(&self) -> Result<Vec<User>>;

    /// Create a new admin; the username must be unused
    async fn create_admin(&self, admin: AdminUser) -> Result<AdminUser>;

    /// Get an admin by ID
    async fn get_admin(&self, id: Uuid) -> Result<Option<AdminUser>>;

    /// Get an admin by username
    async fn get_admin_by_username(&self, username: &str) -> Result<Option<AdminUser>>;

    /// Get a wallet by its (user, currency) key
    async fn get_wallet(&self, user_id: Uuid, currency_id: Uuid) -> Result<Option<Wallet>>;

    /// All wallets belonging to a user
    async fn wallets_for_user(&self, user_id: Uuid) -> Result<Vec<Wallet>>;

    /// Recent orders for a user, newest first
    async fn orders_for_user(&self, user_id: Uuid, limit: usize) -> Result<Vec<Order>>;

    /// Recent transactions for a user, newest first
    async fn transactions_for_user(&self, user_id: Uuid, limit: usize) -> Result<Vec<Transaction>>;

    /// Add a watchlist entry; returns the existing entry if one is already
    /// present for the (user, currency) pair
    async fn add_watchlist_entry(&self, entry: WatchlistEntry) -> Result<WatchlistEntry>;

    /// Remove a watchlist entry; returns whether an entry existed
    async fn remove_watchlist_entry(&self, user_id: Uuid, currency_id: Uuid) -> Result<bool>;

    /// All watchlist entries for a user, oldest first
    async fn watchlist_for_user(&self, user_id: Uuid) -> Result<Vec<WatchlistEntry>>;

    /// Apply a settlement: upsert the wallet by `delta` (positive for buy,
    /// negative for sell) and insert the order and transaction, all
    /// atomically. A delta that would take the balance below zero leaves
    /// the ledger untouched and fails with `InsufficientFunds`.
    async fn apply_settlement(
        &self,
        order: &Order,
        transaction: &Transaction,
        delta: Quantity,
    ) -> Result<Wallet>;
}

/// In-memory repository for ledger data
pub struct InMemoryLedgerRepository {
    /// Users by ID
    users: DashMap<Uuid, User>,
    /// Admins by ID
    admins: DashMap<Uuid, AdminUser>,
    /// Wallets by (user, currency)
    wallets: DashMap<(Uuid, Uuid), Wallet>,
    /// Orders by ID
    orders: DashMap<Uuid, Order>,
    /// Transactions by ID
    transactions: DashMap<Uuid, Transaction>,
    /// Watchlist entries by (user, currency)
    watchlist: DashMap<(Uuid, Uuid), WatchlistEntry>,
}

impl InMemoryLedgerRepository {
    /// Create a new in-memory ledger repository
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            admins: DashMap::new(),
            wallets: DashMap::new(),
            orders: DashMap::new(),
            transactions: DashMap::new(),
            watchlist: DashMap::new(),
        }
    }
}

impl Default for InMemoryLedgerRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLedgerRepository {
    async fn create_user(&self, user: User) -> Result<User> {
        let duplicate = self
            .users
            .iter()
            .any(|entry| entry.value().email == user.email);
        if duplicate {
            return Err(Error::Validation(format!(
                "email {} is already registered",
                user.email
            )));
        }

        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.clone()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().email == email)
            .map(|entry| entry.value().clone()))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|u| u.clone()).collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn create_admin(&self, admin: AdminUser) -> Result<AdminUser> {
        let duplicate = self
            .admins
            .iter()
            .any(|entry| entry.value().username == admin.username);
        if duplicate {
            return Err(Error::Validation(format!(
                "admin username {} is already taken",
                admin.username
            )));
        }

        self.admins.insert(admin.id, admin.clone());
        Ok(admin)
    }

    async fn get_admin(&self, id: Uuid) -> Result<Option<AdminUser>> {
        Ok(self.admins.get(&id).map(|a| a.clone()))
    }

    async fn get_admin_by_username(&self, username: &str) -> Result<Option<AdminUser>> {
        Ok(self
            .admins
            .iter()
            .find(|entry| entry.value().username == username)
            .map(|entry| entry.value().clone()))
    }

    async fn get_wallet(&self, user_id: Uuid, currency_id: Uuid) -> Result<Option<Wallet>> {
        Ok(self.wallets.get(&(user_id, currency_id)).map(|w| w.clone()))
    }

    async fn wallets_for_user(&self, user_id: Uuid) -> Result<Vec<Wallet>> {
        let wallets = self
            .wallets
            .iter()
            .filter_map(|entry| {
                let ((owner, _), wallet) = entry.pair();
                if *owner == user_id {
                    Some(wallet.clone())
                } else {
                    None
                }
            })
            .collect();

        Ok(wallets)
    }

    async fn orders_for_user(&self, user_id: Uuid, limit: usize) -> Result<Vec<Order>> {
        let mut orders: Vec<Order> = self
            .orders
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();

        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders.truncate(limit);
        Ok(orders)
    }

    async fn transactions_for_user(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Transaction>> {
        let mut transactions: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();

        transactions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        transactions.truncate(limit);
        Ok(transactions)
    }

    async fn add_watchlist_entry(&self, entry: WatchlistEntry) -> Result<WatchlistEntry> {
        let key = (entry.user_id, entry.currency_id);

        if let Some(existing) = self.watchlist.get(&key) {
            return Ok(existing.clone());
        }

        self.watchlist.insert(key, entry.clone());
        Ok(entry)
    }

    async fn remove_watchlist_entry(&self, user_id: Uuid, currency_id: Uuid) -> Result<bool> {
        Ok(self.watchlist.remove(&(user_id, currency_id)).is_some())
    }

    async fn watchlist_for_user(&self, user_id: Uuid) -> Result<Vec<WatchlistEntry>> {
        let mut entries: Vec<WatchlistEntry> = self
            .watchlist
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();

        entries.sort_by_key(|e| e.added_at);
        Ok(entries)
    }

    async fn apply_settlement(
        &self,
        order: &Order,
        transaction: &Transaction,
        delta: Quantity,
    ) -> Result<Wallet> {
        let key = (order.user_id, order.currency_id);

        // The entry guard makes the balance check and update one step; the
        // audit inserts below cannot fail, so the batch is all-or-nothing.
        let wallet = match self.wallets.entry(key) {
            Entry::Occupied(mut occupied) => {
                let next = occupied.get().balance + delta;
                if next < Quantity::ZERO {
                    return Err(Error::InsufficientFunds(format!(
                        "balance {} cannot absorb delta {}",
                        occupied.get().balance,
                        delta
                    )));
                }

                let wallet = occupied.get_mut();
                wallet.balance = next;
                wallet.updated_at = Utc::now();
                wallet.clone()
            }
            Entry::Vacant(vacant) => {
                if delta < Quantity::ZERO {
                    return Err(Error::InsufficientFunds(format!(
                        "no wallet exists for user {} and currency {}",
                        order.user_id, order.currency_id
                    )));
                }

                let mut wallet = Wallet::new(order.user_id, order.currency_id);
                wallet.credit(delta);
                vacant.insert(wallet.clone());
                wallet
            }
        };

        self.orders.insert(order.id, order.clone());
        self.transactions.insert(transaction.id, transaction.clone());

        Ok(wallet)
    }
}

/// PostgreSQL repository for ledger data
pub struct PostgresLedgerRepository {
    /// Database connection pool
    pool: PgPool,
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(dbe) if dbe.code().as_deref() == Some("23505")
    )
}

impl PostgresLedgerRepository {
    /// Create a repository over an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new PostgreSQL ledger repository with configuration
    pub async fn with_config(config: &LedgerServiceConfig) -> Result<Self> {
        info!(
            "Connecting to PostgreSQL database with pool size: {}",
            config.db_pool_size
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.db_pool_size)
            .connect(&config.database_url)
            .await
            .map_err(Error::Database)?;

        info!("Connected to PostgreSQL database");

        Ok(Self { pool })
    }
}

#[async_trait]
impl LedgerRepository for PostgresLedgerRepository {
    async fn create_user(&self, user: User) -> Result<User> {
        debug!("Creating user {} in database", user.email);

        sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Validation(format!("email {} is already registered", user.email))
            } else {
                Error::Database(e)
            }
        })?;

        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, DbUser>(
            "SELECT id, name, email, password_hash, created_at
             FROM users
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, DbUser>(
            "SELECT id, name, email, password_hash, created_at
             FROM users
             WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn list_users(&self) -> Result<Vec<User>> {
        let rows = sqlx::query_as::<_, DbUser>(
            "SELECT id, name, email, password_hash, created_at
             FROM users
             ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    async fn create_admin(&self, admin: AdminUser) -> Result<AdminUser> {
        debug!("Creating admin {} in database", admin.username);

        sqlx::query(
            "INSERT INTO admin_users (id, username, password_hash, created_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(admin.id)
        .bind(&admin.username)
        .bind(&admin.password_hash)
        .bind(admin.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Validation(format!("admin username {} is already taken", admin.username))
            } else {
                Error::Database(e)
            }
        })?;

        Ok(admin)
    }

    async fn get_admin(&self, id: Uuid) -> Result<Option<AdminUser>> {
        let row = sqlx::query_as::<_, DbAdminUser>(
            "SELECT id, username, password_hash, created_at
             FROM admin_users
             WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AdminUser::from))
    }

    async fn get_admin_by_username(&self, username: &str) -> Result<Option<AdminUser>> {
        let row = sqlx::query_as::<_, DbAdminUser>(
            "SELECT id, username, password_hash, created_at
             FROM admin_users
             WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(AdminUser::from))
    }

    async fn get_wallet(&self, user_id: Uuid, currency_id: Uuid) -> Result<Option<Wallet>> {
        let row = sqlx::query_as::<_, DbWallet>(
            "SELECT user_id, currency_id, balance, updated_at
             FROM wallets
             WHERE user_id = $1 AND currency_id = $2",
        )
        .bind(user_id)
        .bind(currency_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Wallet::from))
    }

    async fn wallets_for_user(&self, user_id: Uuid) -> Result<Vec<Wallet>> {
        let rows = sqlx::query_as::<_, DbWallet>(
            "SELECT user_id, currency_id, balance, updated_at
             FROM wallets
             WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Wallet::from).collect())
    }

    async fn orders_for_user(&self, user_id: Uuid, limit: usize) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, DbOrder>(
            "SELECT id, user_id, currency_id, side, quantity, unit_price, status, created_at
             FROM orders
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    async fn transactions_for_user(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, DbTransaction>(
            "SELECT id, order_id, user_id, amount, kind, created_at
             FROM transactions
             WHERE user_id = $1
             ORDER BY created_at DESC
             LIMIT $2",
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn add_watchlist_entry(&self, entry: WatchlistEntry) -> Result<WatchlistEntry> {
        let inserted = sqlx::query(
            "INSERT INTO watchlist_entries (id, user_id, currency_id, added_at)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (user_id, currency_id) DO NOTHING",
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.currency_id)
        .bind(entry.added_at)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() > 0 {
            return Ok(entry);
        }

        // Already bookmarked; hand back the existing entry
        let existing = sqlx::query_as::<_, DbWatchlistEntry>(
            "SELECT id, user_id, currency_id, added_at
             FROM watchlist_entries
             WHERE user_id = $1 AND currency_id = $2",
        )
        .bind(entry.user_id)
        .bind(entry.currency_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(existing.into())
    }

    async fn remove_watchlist_entry(&self, user_id: Uuid, currency_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM watchlist_entries
             WHERE user_id = $1 AND currency_id = $2",
        )
        .bind(user_id)
        .bind(currency_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn watchlist_for_user(&self, user_id: Uuid) -> Result<Vec<WatchlistEntry>> {
        let rows = sqlx::query_as::<_, DbWatchlistEntry>(
            "SELECT id, user_id, currency_id, added_at
             FROM watchlist_entries
             WHERE user_id = $1
             ORDER BY added_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(WatchlistEntry::from).collect())
    }

    async fn apply_settlement(
        &self,
        order: &Order,
        transaction: &Transaction,
        delta: Quantity,
    ) -> Result<Wallet> {
        debug!(
            "Applying settlement for order {} (delta {})",
            order.id, delta
        );

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Wallet first. The balance guard re-checks inside the transaction,
        // so even concurrent writers from another process cannot overdraw.
        let applied = if delta >= Quantity::ZERO {
            sqlx::query(
                "INSERT INTO wallets (user_id, currency_id, balance, updated_at)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (user_id, currency_id)
                 DO UPDATE SET
                    balance = wallets.balance + EXCLUDED.balance,
                    updated_at = EXCLUDED.updated_at",
            )
            .bind(order.user_id)
            .bind(order.currency_id)
            .bind(delta)
            .bind(now)
            .execute(&mut *tx)
            .await?
        } else {
            sqlx::query(
                "UPDATE wallets
                 SET balance = balance + $3, updated_at = $4
                 WHERE user_id = $1 AND currency_id = $2 AND balance + $3 >= 0",
            )
            .bind(order.user_id)
            .bind(order.currency_id)
            .bind(delta)
            .bind(now)
            .execute(&mut *tx)
            .await?
        };

        if applied.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(Error::InsufficientFunds(format!(
                "wallet for user {} and currency {} cannot absorb delta {}",
                order.user_id, order.currency_id, delta
            )));
        }

        sqlx::query(
            "INSERT INTO orders (id, user_id, currency_id, side, quantity, unit_price, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(order.currency_id)
        .bind(order.side.as_str())
        .bind(order.quantity)
        .bind(order.unit_price)
        .bind(order.status.as_str())
        .bind(order.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO transactions (id, order_id, user_id, amount, kind, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(transaction.id)
        .bind(transaction.order_id)
        .bind(transaction.user_id)
        .bind(transaction.amount)
        .bind(transaction.kind.as_str())
        .bind(transaction.created_at)
        .execute(&mut *tx)
        .await?;

        let wallet = sqlx::query_as::<_, DbWallet>(
            "SELECT user_id, currency_id, balance, updated_at
             FROM wallets
             WHERE user_id = $1 AND currency_id = $2",
        )
        .bind(order.user_id)
        .bind(order.currency_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(wallet.into())
    }
}
