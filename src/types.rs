//! Core types and data structures for the posting engine

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Product type of a customer account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerAccountType {
    /// Interest-bearing savings account
    Savings,
    /// Transactional current account
    Current,
}

impl fmt::Display for CustomerAccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CustomerAccountType::Savings => write!(f, "Savings"),
            CustomerAccountType::Current => write!(f, "Current"),
        }
    }
}

/// Lifecycle status of an account. Accounts are never deleted, only deactivated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountStatus {
    Active,
    Inactive,
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Active => write!(f, "Active"),
            AccountStatus::Inactive => write!(f, "Inactive"),
        }
    }
}

/// Kind of money movement recorded in the journal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
}

impl TransactionType {
    /// Label used for display, filtering and per-type aggregation
    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "Deposit",
            TransactionType::Withdrawal => "Withdrawal",
            TransactionType::Transfer => "Transfer",
        }
    }

    /// Case-insensitive comparison against a label
    pub fn matches_label(&self, label: &str) -> bool {
        self.label().eq_ignore_ascii_case(label.trim())
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Customer-facing account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerAccount {
    /// Internal identifier
    pub id: Uuid,
    /// Unique account number
    pub account_number: String,
    /// Account holder's full name
    pub full_name: String,
    /// Raw account balance
    pub balance: BigDecimal,
    pub account_type: CustomerAccountType,
    pub status: AccountStatus,
    pub branch: String,
    pub email: String,
    pub phone_number: String,
    pub gender: String,
    pub address: String,
    pub state: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Concurrency token, `0` until first persisted
    pub version: u64,
}

impl CustomerAccount {
    /// Create a new, not yet persisted customer account with a zero balance
    pub fn new(details: NewCustomerAccount) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4(),
            account_number: details.account_number,
            full_name: details.full_name,
            balance: BigDecimal::from(0),
            account_type: details.account_type,
            status: AccountStatus::Active,
            branch: details.branch,
            email: details.email,
            phone_number: details.phone_number,
            gender: details.gender,
            address: details.address,
            state: details.state,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Move the raw balance by a signed delta
    pub fn adjust_balance(&mut self, delta: &BigDecimal) {
        self.balance += delta;
        self.updated_at = chrono::Utc::now().naive_utc();
    }
}

/// Details supplied when opening a customer account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCustomerAccount {
    pub account_number: String,
    pub full_name: String,
    pub account_type: CustomerAccountType,
    pub branch: String,
    pub email: String,
    pub phone_number: String,
    pub gender: String,
    pub address: String,
    pub state: String,
}

/// General-ledger account: the bank-side pool customer postings settle against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlAccount {
    pub id: Uuid,
    /// Unique GL account number
    pub account_number: String,
    pub account_name: String,
    pub balance: BigDecimal,
    pub status: AccountStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Concurrency token, `0` until first persisted
    pub version: u64,
}

impl GlAccount {
    /// Create a new, not yet persisted GL account
    pub fn new(account_number: String, account_name: String, opening_balance: BigDecimal) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4(),
            account_number,
            account_name,
            balance: opening_balance,
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Move the GL balance by a signed delta
    pub fn adjust_balance(&mut self, delta: &BigDecimal) {
        self.balance += delta;
        self.updated_at = chrono::Utc::now().naive_utc();
    }
}

/// Secondary per-customer balance snapshot maintained alongside the raw balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceLedger {
    /// Customer account this snapshot belongs to
    pub account_number: String,
    pub available_balance: BigDecimal,
    pub withdrawable_balance: BigDecimal,
    /// Accumulates the GL balance after every deposit/withdrawal rather than
    /// mirroring it; kept as-is pending product clarification.
    pub ledger_balance: BigDecimal,
    pub updated_at: NaiveDateTime,
    /// Concurrency token, `0` until first persisted
    pub version: u64,
}

impl BalanceLedger {
    /// Create a zeroed, not yet persisted balance ledger
    pub fn new(account_number: String) -> Self {
        Self {
            account_number,
            available_balance: BigDecimal::from(0),
            withdrawable_balance: BigDecimal::from(0),
            ledger_balance: BigDecimal::from(0),
            updated_at: chrono::Utc::now().naive_utc(),
            version: 0,
        }
    }

    /// Move available and withdrawable balances by the same signed delta
    pub fn adjust_spendable(&mut self, delta: &BigDecimal) {
        self.available_balance += delta;
        self.withdrawable_balance += delta;
        self.updated_at = chrono::Utc::now().naive_utc();
    }

    /// Add to the ledger balance accumulator
    pub fn accumulate_ledger(&mut self, amount: &BigDecimal) {
        self.ledger_balance += amount;
        self.updated_at = chrono::Utc::now().naive_utc();
    }
}

/// Immutable journal entry for a single money movement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub transaction_type: TransactionType,
    /// Narration supplied by the initiator
    pub description: String,
    /// Always positive
    pub amount: BigDecimal,
    pub money_in: Option<BigDecimal>,
    pub money_out: Option<BigDecimal>,
    /// Customer balance right after the posting
    pub balance: BigDecimal,
    pub customer_id: Uuid,
    pub gl_account_id: Uuid,
    pub created_at: NaiveDateTime,
}

impl Transaction {
    /// Journal entry for money credited to the customer
    pub fn money_in(
        customer: &CustomerAccount,
        gl_account: &GlAccount,
        amount: BigDecimal,
        description: String,
    ) -> Self {
        Self::build(
            TransactionType::Deposit,
            customer,
            gl_account,
            amount.clone(),
            Some(amount),
            None,
            description,
        )
    }

    /// Journal entry for money debited from the customer
    pub fn money_out(
        customer: &CustomerAccount,
        gl_account: &GlAccount,
        amount: BigDecimal,
        description: String,
    ) -> Self {
        Self::build(
            TransactionType::Withdrawal,
            customer,
            gl_account,
            amount.clone(),
            None,
            Some(amount),
            description,
        )
    }

    fn build(
        transaction_type: TransactionType,
        customer: &CustomerAccount,
        gl_account: &GlAccount,
        amount: BigDecimal,
        money_in: Option<BigDecimal>,
        money_out: Option<BigDecimal>,
        description: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            transaction_type,
            description,
            amount,
            money_in,
            money_out,
            balance: customer.balance.clone(),
            customer_id: customer.id,
            gl_account_id: gl_account.id,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Denormalized, read-optimised record of a posting.
///
/// Copies the customer's profile as it was at posting time so later profile
/// edits do not rewrite history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingRecord {
    pub id: Uuid,
    /// GL account name
    pub account_name: String,
    /// GL account number
    pub account_number: String,
    pub amount: BigDecimal,
    pub transaction_type: TransactionType,
    pub narration: String,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub customer_account_number: String,
    pub customer_account_type: CustomerAccountType,
    pub customer_branch: String,
    pub customer_email: String,
    pub customer_phone_number: String,
    pub customer_status: AccountStatus,
    pub customer_gender: String,
    pub customer_address: String,
    pub customer_state: String,
    pub date_posted: NaiveDateTime,
}

impl PostingRecord {
    /// Snapshot a posting between a customer and a GL account
    pub fn snapshot(
        transaction_type: TransactionType,
        customer: &CustomerAccount,
        gl_account: &GlAccount,
        amount: BigDecimal,
        narration: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_name: gl_account.account_name.clone(),
            account_number: gl_account.account_number.clone(),
            amount,
            transaction_type,
            narration,
            customer_id: customer.id,
            customer_name: customer.full_name.clone(),
            customer_account_number: customer.account_number.clone(),
            customer_account_type: customer.account_type,
            customer_branch: customer.branch.clone(),
            customer_email: customer.email.clone(),
            customer_phone_number: customer.phone_number.clone(),
            customer_status: customer.status,
            customer_gender: customer.gender.clone(),
            customer_address: customer.address.clone(),
            customer_state: customer.state.clone(),
            date_posted: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Deposit or withdrawal between a customer and a GL account.
///
/// Without an `idempotency_key` the engine does not deduplicate: submitting the
/// same request twice posts twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingRequest {
    pub customer_account_number: String,
    pub ledger_account_number: String,
    pub amount: BigDecimal,
    pub narration: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl PostingRequest {
    pub fn new(
        customer_account_number: impl Into<String>,
        ledger_account_number: impl Into<String>,
        amount: BigDecimal,
        narration: impl Into<String>,
    ) -> Self {
        Self {
            customer_account_number: customer_account_number.into(),
            ledger_account_number: ledger_account_number.into(),
            amount,
            narration: narration.into(),
            idempotency_key: None,
        }
    }

    /// Attach a client-generated key; repeats of the key replay the first result
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Transfer between two customer accounts.
///
/// Same deduplication rules as [`PostingRequest`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRequest {
    pub sender_account_number: String,
    pub receiver_account_number: String,
    pub amount: BigDecimal,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

impl TransferRequest {
    pub fn new(
        sender_account_number: impl Into<String>,
        receiver_account_number: impl Into<String>,
        amount: BigDecimal,
    ) -> Self {
        Self {
            sender_account_number: sender_account_number.into(),
            receiver_account_number: receiver_account_number.into(),
            amount,
            idempotency_key: None,
        }
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Category of a structured posting failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    AccountNotFound,
    InsufficientFunds,
    InvalidRequest,
}

/// Outcome handed back to the transport layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingResponse {
    pub status: bool,
    pub message: String,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl PostingResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
            errors: Vec::new(),
            failure: None,
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
            errors,
            failure: Some(kind),
        }
    }

    /// Convert a domain error into a structured failure.
    ///
    /// Returns `None` for infrastructure errors, which are not client-facing.
    pub fn from_domain_error(error: &PostingError) -> Option<Self> {
        match error {
            PostingError::AccountNotFound(detail) => Some(Self::failure(
                FailureKind::AccountNotFound,
                detail.clone(),
                vec![detail.clone()],
            )),
            PostingError::InsufficientFunds(detail) => Some(Self::failure(
                FailureKind::InsufficientFunds,
                "Insufficient funds",
                vec![detail.clone()],
            )),
            PostingError::Validation(detail) => Some(Self::failure(
                FailureKind::InvalidRequest,
                "Invalid posting request",
                vec![detail.clone()],
            )),
            PostingError::ConcurrencyConflict(_) | PostingError::PersistenceFailure(_) => None,
        }
    }
}

/// Errors that can occur in the posting engine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PostingError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

/// Result type for posting operations
pub type PostingResult<T> = Result<T, PostingError>;

/// Receipt delivery failure; logged by the engine, never propagated
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Receipt delivery failed: {0}")]
pub struct NotifyError(pub String);
