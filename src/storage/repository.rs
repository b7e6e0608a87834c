use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteRow};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::application::BankError;
use crate::domain::{
    Account, Card, CardNetwork, Cents, Country, Order, TransactionRecord, TransactionType,
};

use super::{MIGRATION_001_ACCOUNTS, MIGRATION_002_CARDS, MIGRATION_003_ORDERS};

/// Repository for persisting accounts, the transaction ledger, cards
/// and orders.
///
/// All balance mutation goes through [`Repository::settle`], which runs
/// the sufficiency check, the balance writes and the record insertions
/// inside a single database transaction. SQLite admits one writer at a
/// time, so with the busy timeout below, concurrent settlements queue
/// rather than race; the conditional debit statement makes a stale
/// sufficiency check impossible even so.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to an existing SQLite database.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect_with(Self::connect_options(database_url, false)?)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Initialize a new database (connect + migrate), creating the file
    /// if it doesn't exist.
    pub async fn init(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect_with(Self::connect_options(database_url, true)?)
            .await
            .context("Failed to create database")?;
        let repo = Self::new(pool);
        repo.migrate().await?;
        Ok(repo)
    }

    fn connect_options(database_url: &str, create_if_missing: bool) -> Result<SqliteConnectOptions> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .create_if_missing(create_if_missing)
            // Cascade deletes on accounts require enforced FKs.
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            // Concurrent settlements wait for the write lock instead of
            // failing with SQLITE_BUSY.
            .busy_timeout(Duration::from_secs(5));
        Ok(options)
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_ACCOUNTS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        sqlx::query(MIGRATION_002_CARDS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 002")?;

        sqlx::query(MIGRATION_003_ORDERS)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 003")?;

        Ok(())
    }

    // ========================
    // Account operations
    // ========================

    /// Save a new account. An IBAN collision, generated or supplied,
    /// surfaces as `DuplicateIban`.
    pub async fn save_account(&self, account: &Account) -> std::result::Result<(), BankError> {
        sqlx::query(
            r#"
            INSERT INTO banks (iban, first_name, last_name, country, balance_cents)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.iban)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(account.country.as_str())
        .bind(account.balance_cents)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                BankError::DuplicateIban(account.iban.clone())
            }
            e => anyhow::Error::new(e)
                .context("Failed to save account")
                .into(),
        })?;
        Ok(())
    }

    /// Look up an account by IBAN. A missing IBAN is a normal outcome,
    /// not an error.
    pub async fn find_by_iban(&self, iban: &str) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT iban, first_name, last_name, country, balance_cents
            FROM banks
            WHERE iban = ?
            "#,
        )
        .bind(iban)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => Ok(None),
        }
    }

    /// List all accounts, ordered by IBAN.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query(
            r#"
            SELECT iban, first_name, last_name, country, balance_cents
            FROM banks
            ORDER BY iban
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// Delete an account. Dependent transactions and cards go with it.
    /// Returns false if no such account existed.
    pub async fn delete_account(&self, iban: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM banks WHERE iban = ?")
            .bind(iban)
            .execute(&self.pool)
            .await
            .context("Failed to delete account")?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_account(row: &SqliteRow) -> Result<Account> {
        let country_str: String = row.get("country");

        Ok(Account {
            iban: row.get("iban"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            country: Country::from_str(&country_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid country: {}", country_str))?,
            balance_cents: row.get("balance_cents"),
        })
    }

    // ========================
    // Settlement
    // ========================

    /// Apply a transaction record to the ledger: run the balance effects
    /// for its type and insert the record, all inside one database
    /// transaction. For transfers, also insert the system-generated
    /// counterparty DEPOSIT and return it.
    ///
    /// Any rejection (insufficient funds, missing account, missing
    /// destination) returns before commit, and the dropped transaction
    /// rolls every write back, so no durable state ever reflects half a
    /// settlement.
    pub async fn settle(
        &self,
        record: &mut TransactionRecord,
    ) -> std::result::Result<Option<TransactionRecord>, BankError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin settlement transaction")?;

        // Balance effects first. The opening statement is a write, so
        // concurrent settlements queue on the database write lock
        // instead of racing a stale balance read.
        match record.transaction_type {
            TransactionType::Deposit => {
                if !Self::credit(&mut tx, &record.bank_iban, record.amount_cents).await? {
                    return Err(BankError::AccountNotFound(record.bank_iban.clone()));
                }
            }
            TransactionType::Withdrawal => {
                Self::debit(&mut tx, &record.bank_iban, record.amount_cents).await?;
            }
            TransactionType::Transfer => {
                Self::debit(&mut tx, &record.bank_iban, record.amount_cents).await?;
                if !Self::credit(&mut tx, &record.iban, record.amount_cents).await? {
                    return Err(BankError::DestinationNotFound(record.iban.clone()));
                }
            }
        }

        Self::insert_record(&mut tx, record).await?;

        // The counterparty entry is inserted directly as a DEPOSIT
        // record; it never re-enters the transfer branch above.
        let counterpart = if record.is_transfer() {
            let mut deposit = record.counterpart_deposit();
            Self::insert_record(&mut tx, &mut deposit).await?;
            Some(deposit)
        } else {
            None
        };

        tx.commit()
            .await
            .context("Failed to commit settlement transaction")?;

        Ok(counterpart)
    }

    /// Conditionally debit an account. The single-statement guard
    /// (`balance_cents >= amount`) is what makes an overdraft under
    /// concurrency impossible: there is no window between the check and
    /// the write.
    async fn debit(
        tx: &mut Transaction<'_, Sqlite>,
        iban: &str,
        amount: Cents,
    ) -> std::result::Result<(), BankError> {
        let result = sqlx::query(
            r#"
            UPDATE banks
            SET balance_cents = balance_cents - ?1
            WHERE iban = ?2 AND balance_cents >= ?1
            "#,
        )
        .bind(amount)
        .bind(iban)
        .execute(&mut **tx)
        .await
        .context("Failed to debit account")?;

        if result.rows_affected() == 0 {
            // Either the account doesn't exist or the guard rejected it.
            let balance: Option<Cents> =
                sqlx::query_scalar("SELECT balance_cents FROM banks WHERE iban = ?")
                    .bind(iban)
                    .fetch_optional(&mut **tx)
                    .await
                    .context("Failed to fetch balance after rejected debit")?;

            return Err(match balance {
                Some(balance) => BankError::InsufficientFunds {
                    iban: iban.to_string(),
                    balance,
                    required: amount,
                },
                None => BankError::AccountNotFound(iban.to_string()),
            });
        }

        Ok(())
    }

    /// Credit an account. Returns false if no row matched the IBAN.
    async fn credit(
        tx: &mut Transaction<'_, Sqlite>,
        iban: &str,
        amount: Cents,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE banks
            SET balance_cents = balance_cents + ?1
            WHERE iban = ?2
            "#,
        )
        .bind(amount)
        .bind(iban)
        .execute(&mut **tx)
        .await
        .context("Failed to credit account")?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_record(
        tx: &mut Transaction<'_, Sqlite>,
        record: &mut TransactionRecord,
    ) -> Result<()> {
        let row = sqlx::query(
            r#"
            INSERT INTO transactions (bank_iban, first_name, last_name, transaction_type, amount_cents, iban, date)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&record.bank_iban)
        .bind(&record.first_name)
        .bind(&record.last_name)
        .bind(record.transaction_type.as_str())
        .bind(record.amount_cents)
        .bind(&record.iban)
        .bind(record.date.to_rfc3339())
        .fetch_one(&mut **tx)
        .await
        .context("Failed to insert transaction record")?;

        record.id = row.get("id");
        Ok(())
    }

    // ========================
    // Ledger queries
    // ========================

    /// Get a transaction record by id.
    pub async fn get_transaction(&self, id: i64) -> Result<Option<TransactionRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, bank_iban, first_name, last_name, transaction_type, amount_cents, iban, date
            FROM transactions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch transaction")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_transaction(&row)?)),
            None => Ok(None),
        }
    }

    /// List all transaction records, in insertion order.
    pub async fn list_transactions(&self) -> Result<Vec<TransactionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, bank_iban, first_name, last_name, transaction_type, amount_cents, iban, date
            FROM transactions
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// List the ledger for one account, in insertion order.
    pub async fn list_transactions_for_account(
        &self,
        iban: &str,
    ) -> Result<Vec<TransactionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, bank_iban, first_name, last_name, transaction_type, amount_cents, iban, date
            FROM transactions
            WHERE bank_iban = ?
            ORDER BY id
            "#,
        )
        .bind(iban)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions for account")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<TransactionRecord> {
        let type_str: String = row.get("transaction_type");
        let date_str: String = row.get("date");

        Ok(TransactionRecord {
            id: row.get("id"),
            bank_iban: row.get("bank_iban"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            transaction_type: TransactionType::from_str(&type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction type: {}", type_str))?,
            amount_cents: row.get("amount_cents"),
            iban: row.get("iban"),
            date: Self::parse_timestamp(&date_str)?,
        })
    }

    // ========================
    // Card operations
    // ========================

    /// Save a new card.
    pub async fn save_card(&self, card: &mut Card) -> std::result::Result<(), BankError> {
        let row = sqlx::query(
            r#"
            INSERT INTO cards (bank_iban, id_card, cvc, network, valid_until, is_valid)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&card.bank_iban)
        .bind(&card.id_card)
        .bind(&card.cvc)
        .bind(card.network.as_str())
        .bind(&card.valid_until)
        .bind(card.is_valid)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                if db.message().contains("id_card") {
                    BankError::DuplicateCard(card.id_card.clone())
                } else {
                    BankError::Validation(format!(
                        "account {} already holds a {} card",
                        card.bank_iban, card.network
                    ))
                }
            }
            e => anyhow::Error::new(e).context("Failed to save card").into(),
        })?;

        card.id = row.get("id");
        Ok(())
    }

    /// Look up a card by its number.
    pub async fn find_card(&self, id_card: &str) -> Result<Option<Card>> {
        let row = sqlx::query(
            r#"
            SELECT id, bank_iban, id_card, cvc, network, valid_until, is_valid
            FROM cards
            WHERE id_card = ?
            "#,
        )
        .bind(id_card)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch card")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_card(&row)?)),
            None => Ok(None),
        }
    }

    /// Look up the card an account holds on a given network, if any.
    pub async fn find_card_for_account(
        &self,
        iban: &str,
        network: CardNetwork,
    ) -> Result<Option<Card>> {
        let row = sqlx::query(
            r#"
            SELECT id, bank_iban, id_card, cvc, network, valid_until, is_valid
            FROM cards
            WHERE bank_iban = ? AND network = ?
            "#,
        )
        .bind(iban)
        .bind(network.as_str())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch card for account")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_card(&row)?)),
            None => Ok(None),
        }
    }

    /// Toggle a card's validity flag. Returns false if no such card.
    pub async fn set_card_validity(&self, id_card: &str, is_valid: bool) -> Result<bool> {
        let result = sqlx::query("UPDATE cards SET is_valid = ? WHERE id_card = ?")
            .bind(is_valid)
            .bind(id_card)
            .execute(&self.pool)
            .await
            .context("Failed to update card validity")?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_card(row: &SqliteRow) -> Result<Card> {
        let network_str: String = row.get("network");

        Ok(Card {
            id: row.get("id"),
            bank_iban: row.get("bank_iban"),
            id_card: row.get("id_card"),
            cvc: row.get("cvc"),
            network: CardNetwork::from_str(&network_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid card network: {}", network_str))?,
            valid_until: row.get("valid_until"),
            is_valid: row.get::<i32, _>("is_valid") != 0,
        })
    }

    // ========================
    // Order operations
    // ========================

    /// Save a new order.
    pub async fn save_order(&self, order: &mut Order) -> Result<()> {
        let row = sqlx::query(
            r#"
            INSERT INTO orders (client_first_name, client_last_name, client_email, total_cents, is_paid, link, date_of_order, date_of_payment)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(&order.client_first_name)
        .bind(&order.client_last_name)
        .bind(&order.client_email)
        .bind(order.total_cents)
        .bind(order.is_paid)
        .bind(order.link.to_string())
        .bind(order.date_of_order.to_rfc3339())
        .bind(order.date_of_payment.map(|dt| dt.to_rfc3339()))
        .fetch_one(&self.pool)
        .await
        .context("Failed to save order")?;

        order.id = row.get("id");
        Ok(())
    }

    /// Get an order by id.
    pub async fn get_order(&self, id: i64) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, client_first_name, client_last_name, client_email, total_cents, is_paid, link, date_of_order, date_of_payment
            FROM orders
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch order")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_order(&row)?)),
            None => Ok(None),
        }
    }

    /// Get an order by its payment link.
    pub async fn find_order_by_link(&self, link: Uuid) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, client_first_name, client_last_name, client_email, total_cents, is_paid, link, date_of_order, date_of_payment
            FROM orders
            WHERE link = ?
            "#,
        )
        .bind(link.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch order by link")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_order(&row)?)),
            None => Ok(None),
        }
    }

    /// Mark an order paid. Returns false if the order was missing or
    /// already paid.
    pub async fn mark_order_paid(&self, id: i64, paid_at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET is_paid = 1, date_of_payment = ?
            WHERE id = ? AND is_paid = 0
            "#,
        )
        .bind(paid_at.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to mark order paid")?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_order(row: &SqliteRow) -> Result<Order> {
        let link_str: String = row.get("link");
        let ordered_str: String = row.get("date_of_order");
        let paid_str: Option<String> = row.get("date_of_payment");

        Ok(Order {
            id: row.get("id"),
            client_first_name: row.get("client_first_name"),
            client_last_name: row.get("client_last_name"),
            client_email: row.get("client_email"),
            total_cents: row.get("total_cents"),
            is_paid: row.get::<i32, _>("is_paid") != 0,
            link: Uuid::parse_str(&link_str).context("Invalid order link")?,
            date_of_order: Self::parse_timestamp(&ordered_str)?,
            date_of_payment: paid_str.map(|s| Self::parse_timestamp(&s)).transpose()?,
        })
    }

    fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
        Ok(DateTime::parse_from_rfc3339(s)
            .context("Invalid timestamp")?
            .with_timezone(&Utc))
    }
}
