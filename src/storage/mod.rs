mod repository;

pub use repository::*;

/// SQL migration for accounts and the transaction ledger
pub const MIGRATION_001_ACCOUNTS: &str = include_str!("migrations/001_accounts.sql");

/// SQL migration for payment cards
pub const MIGRATION_002_CARDS: &str = include_str!("migrations/002_cards.sql");

/// SQL migration for orders
pub const MIGRATION_003_ORDERS: &str = include_str!("migrations/003_orders.sql");
