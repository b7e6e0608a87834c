use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    Account, Card, CardNetwork, Cents, Country, Order, TransactionRecord, TransactionType,
    format_cents, iban, validate_card_number, validate_cvc,
};
use crate::storage::Repository;

use super::BankError;

/// Application service providing the collaborator-facing operations of
/// the ledger core. The surrounding web layer calls into this; nothing
/// here knows about HTTP, sessions or templates.
pub struct BankService {
    repo: Repository,
}

/// Result of an applied settlement.
#[derive(Debug)]
pub struct Settlement {
    /// The record inserted on the initiating account's ledger.
    pub transaction: TransactionRecord,
    /// For transfers, the system-generated DEPOSIT inserted on the
    /// counterparty's ledger.
    pub counterpart: Option<TransactionRecord>,
}

/// Card fields as submitted by a payment form.
#[derive(Debug, Clone)]
pub struct CardDetails {
    pub id_card: String,
    pub cvc: String,
}

/// Receipt for a settled order payment.
#[derive(Debug)]
pub struct PaymentReceipt {
    pub order: Order,
    /// The payer-side TRANSFER record.
    pub transaction: TransactionRecord,
}

impl BankService {
    /// Create a new service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, BankError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, BankError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Account operations
    // ========================

    /// Open a new account. With no IBAN (or an empty one), a
    /// country-specific pseudo-IBAN is generated; an explicit IBAN is
    /// shape-checked and must be unused. The opening balance is
    /// administrative seed money and produces no ledger record.
    pub async fn open_account(
        &self,
        first_name: String,
        last_name: String,
        country: Country,
        iban: Option<String>,
        opening_balance_cents: Cents,
    ) -> Result<Account, BankError> {
        if opening_balance_cents < 0 {
            return Err(BankError::InvalidAmount(
                "opening balance cannot be negative".to_string(),
            ));
        }

        let account = match iban.filter(|i| !i.is_empty()) {
            Some(iban) => {
                if !iban::is_well_formed(&iban) {
                    return Err(BankError::Validation(format!("malformed IBAN: {}", iban)));
                }
                if self.repo.find_by_iban(&iban).await?.is_some() {
                    return Err(BankError::DuplicateIban(iban));
                }
                Account::new(first_name, last_name, country).with_iban(iban)
            }
            None => Account::new(first_name, last_name, country),
        }
        .with_balance(opening_balance_cents);

        self.repo.save_account(&account).await?;
        info!(iban = %account.iban, country = %account.country, "account opened");
        Ok(account)
    }

    /// Look up an account by IBAN. A missing account is a normal
    /// outcome; repeated calls with no intervening writes return the
    /// same balance.
    pub async fn find_account(&self, iban: &str) -> Result<Option<Account>, BankError> {
        Ok(self.repo.find_by_iban(iban).await?)
    }

    /// Get an account by IBAN, failing if it doesn't exist.
    pub async fn get_account(&self, iban: &str) -> Result<Account, BankError> {
        self.repo
            .find_by_iban(iban)
            .await?
            .ok_or_else(|| BankError::AccountNotFound(iban.to_string()))
    }

    /// Current balance of an account.
    pub async fn balance(&self, iban: &str) -> Result<Cents, BankError> {
        Ok(self.get_account(iban).await?.balance_cents)
    }

    /// List all accounts.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, BankError> {
        Ok(self.repo.list_accounts().await?)
    }

    /// Close an account administratively. Dependent transactions and
    /// cards are cascade-deleted.
    pub async fn close_account(&self, iban: &str) -> Result<Account, BankError> {
        let account = self.get_account(iban).await?;
        self.repo.delete_account(&account.iban).await?;
        info!(iban = %account.iban, "account closed");
        Ok(account)
    }

    // ========================
    // Ledger operations
    // ========================

    /// Single entry point for all three transaction types: build the
    /// record and settle it atomically against the account balances.
    ///
    /// `destination_iban` is required for transfers; for deposits and
    /// withdrawals it defaults to the owning account's own IBAN as the
    /// reference field.
    pub async fn record(
        &self,
        bank_iban: &str,
        transaction_type: TransactionType,
        amount_cents: Cents,
        first_name: &str,
        last_name: &str,
        destination_iban: Option<&str>,
    ) -> Result<Settlement, BankError> {
        if amount_cents <= 0 {
            return Err(BankError::InvalidAmount(format!(
                "amount must be positive, got {}",
                format_cents(amount_cents)
            )));
        }

        let reference = match transaction_type {
            TransactionType::Transfer => destination_iban.ok_or_else(|| {
                BankError::Validation("transfer requires a destination IBAN".to_string())
            })?,
            _ => destination_iban.unwrap_or(bank_iban),
        };

        let mut record = TransactionRecord::new(
            bank_iban,
            first_name,
            last_name,
            transaction_type,
            amount_cents,
            reference,
        );

        match self.repo.settle(&mut record).await {
            Ok(counterpart) => {
                info!(
                    id = record.id,
                    transaction_type = %record.transaction_type,
                    amount = record.amount_cents,
                    iban = %record.bank_iban,
                    "settlement applied"
                );
                Ok(Settlement {
                    transaction: record,
                    counterpart,
                })
            }
            Err(err) => {
                warn!(
                    transaction_type = %record.transaction_type,
                    amount = record.amount_cents,
                    iban = %record.bank_iban,
                    error = %err,
                    "settlement rejected"
                );
                Err(err)
            }
        }
    }

    /// Deposit funds into an account.
    pub async fn deposit(
        &self,
        iban: &str,
        amount_cents: Cents,
        first_name: &str,
        last_name: &str,
    ) -> Result<Settlement, BankError> {
        self.record(
            iban,
            TransactionType::Deposit,
            amount_cents,
            first_name,
            last_name,
            None,
        )
        .await
    }

    /// Withdraw funds from an account, rejecting overdrafts.
    pub async fn withdraw(
        &self,
        iban: &str,
        amount_cents: Cents,
        first_name: &str,
        last_name: &str,
    ) -> Result<Settlement, BankError> {
        self.record(
            iban,
            TransactionType::Withdrawal,
            amount_cents,
            first_name,
            last_name,
            None,
        )
        .await
    }

    /// Transfer funds to another account by IBAN.
    pub async fn transfer(
        &self,
        payer_iban: &str,
        destination_iban: &str,
        amount_cents: Cents,
        first_name: &str,
        last_name: &str,
    ) -> Result<Settlement, BankError> {
        self.record(
            payer_iban,
            TransactionType::Transfer,
            amount_cents,
            first_name,
            last_name,
            Some(destination_iban),
        )
        .await
    }

    /// List transaction records, optionally for a single account.
    pub async fn list_transactions(
        &self,
        iban: Option<&str>,
    ) -> Result<Vec<TransactionRecord>, BankError> {
        match iban {
            Some(iban) => Ok(self.repo.list_transactions_for_account(iban).await?),
            None => Ok(self.repo.list_transactions().await?),
        }
    }

    // ========================
    // Card operations
    // ========================

    /// Issue a card for an account on the given network. An account
    /// holds at most one card per network.
    pub async fn issue_card(
        &self,
        iban: &str,
        network: CardNetwork,
    ) -> Result<Card, BankError> {
        let account = self.get_account(iban).await?;

        if self
            .repo
            .find_card_for_account(&account.iban, network)
            .await?
            .is_some()
        {
            return Err(BankError::Validation(format!(
                "account {} already holds a {} card",
                account.iban, network
            )));
        }

        let mut card = Card::issue(account.iban.as_str(), network, Utc::now());
        self.repo.save_card(&mut card).await?;
        info!(iban = %card.bank_iban, network = %card.network, "card issued");
        Ok(card)
    }

    /// Look up a card by number.
    pub async fn find_card(&self, id_card: &str) -> Result<Option<Card>, BankError> {
        Ok(self.repo.find_card(id_card).await?)
    }

    /// Block or unblock a card.
    pub async fn set_card_validity(
        &self,
        id_card: &str,
        is_valid: bool,
    ) -> Result<(), BankError> {
        if !self.repo.set_card_validity(id_card, is_valid).await? {
            return Err(BankError::CardNotFound(id_card.to_string()));
        }
        info!(id_card, is_valid, "card validity updated");
        Ok(())
    }

    // ========================
    // Order payment flow
    // ========================

    /// Place a new order awaiting payment.
    pub async fn place_order(
        &self,
        client_first_name: String,
        client_last_name: String,
        client_email: String,
        total_cents: Cents,
    ) -> Result<Order, BankError> {
        if total_cents <= 0 {
            return Err(BankError::InvalidAmount(format!(
                "order total must be positive, got {}",
                format_cents(total_cents)
            )));
        }

        let mut order = Order::new(client_first_name, client_last_name, client_email, total_cents);
        self.repo.save_order(&mut order).await?;
        Ok(order)
    }

    /// Get an order by id, failing if it doesn't exist.
    pub async fn get_order(&self, id: i64) -> Result<Order, BankError> {
        self.repo
            .get_order(id)
            .await?
            .ok_or(BankError::OrderNotFound(id))
    }

    /// Get an order by its payment link.
    pub async fn find_order_by_link(&self, link: Uuid) -> Result<Option<Order>, BankError> {
        Ok(self.repo.find_order_by_link(link).await?)
    }

    /// Pay an order with a card: validate the card fields, resolve the
    /// payer account, transfer the order total to the merchant's
    /// account through the ledger, then mark the order paid.
    ///
    /// The ledger transfer is the atomic unit; every decline happens
    /// before it, and an `InsufficientFunds` rejection leaves the order
    /// unpaid with no record on either side.
    pub async fn pay_order(
        &self,
        order_id: i64,
        card: &CardDetails,
        merchant_iban: &str,
    ) -> Result<PaymentReceipt, BankError> {
        let mut order = self.get_order(order_id).await?;
        if order.is_paid {
            return Err(BankError::OrderAlreadyPaid(order.id));
        }

        // Form-level validation, before touching the ledger.
        validate_card_number(&card.id_card)
            .map_err(|e| BankError::Validation(e.to_string()))?;
        validate_cvc(&card.cvc).map_err(|e| BankError::Validation(e.to_string()))?;

        let stored = self
            .repo
            .find_card(&card.id_card)
            .await?
            .ok_or_else(|| BankError::CardNotFound(card.id_card.clone()))?;

        if !stored.is_valid {
            return Err(BankError::CardDeclined("card is blocked".to_string()));
        }
        if stored.is_expired(Utc::now()) {
            return Err(BankError::CardDeclined("card is expired".to_string()));
        }
        if stored.cvc != card.cvc {
            return Err(BankError::CardDeclined("CVC mismatch".to_string()));
        }

        let payer = self.get_account(&stored.bank_iban).await?;
        let settlement = self
            .transfer(
                &payer.iban,
                merchant_iban,
                order.total_cents,
                &payer.first_name,
                &payer.last_name,
            )
            .await?;

        let paid_at = Utc::now();
        self.repo.mark_order_paid(order.id, paid_at).await?;
        order.mark_paid(paid_at);

        info!(order = order.id, amount = order.total_cents, "order paid");
        Ok(PaymentReceipt {
            order,
            transaction: settlement.transaction,
        })
    }
}
