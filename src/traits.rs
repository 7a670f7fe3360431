//! Traits for storage abstraction and external collaborators

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::collections::HashMap;
use uuid::Uuid;

use crate::types::*;
use crate::utils::validation::{validate_account_name, validate_account_number};

/// Read/write access to customer and GL account records within a unit of work
#[async_trait]
pub trait AccountRepository: Send {
    /// Find a customer account by account number
    async fn find_customer_account(
        &mut self,
        account_number: &str,
    ) -> PostingResult<Option<CustomerAccount>>;

    /// Find a GL account by account number
    async fn find_gl_account(&mut self, account_number: &str) -> PostingResult<Option<GlAccount>>;

    /// Stage an insert (`version == 0`) or update of a customer account
    async fn save_customer_account(&mut self, account: &CustomerAccount) -> PostingResult<()>;

    /// Stage an insert (`version == 0`) or update of a GL account
    async fn save_gl_account(&mut self, account: &GlAccount) -> PostingResult<()>;
}

/// Per-customer balance snapshots
#[async_trait]
pub trait BalanceLedgerStore: Send {
    async fn find_balance_ledger(
        &mut self,
        account_number: &str,
    ) -> PostingResult<Option<BalanceLedger>>;

    async fn save_balance_ledger(&mut self, ledger: &BalanceLedger) -> PostingResult<()>;
}

/// Append-only journal of money movements
#[async_trait]
pub trait TransactionJournal: Send {
    async fn append_transaction(&mut self, transaction: &Transaction) -> PostingResult<()>;
}

/// Append-only store of denormalized posting records
#[async_trait]
pub trait PostingRecordStore: Send {
    async fn append_posting_record(&mut self, record: &PostingRecord) -> PostingResult<()>;
}

/// A single atomic unit of work spanning every store a posting touches.
///
/// Writes are staged and become visible to other units only on [`commit`].
/// Dropping a unit without committing discards its writes.
///
/// [`commit`]: UnitOfWork::commit
#[async_trait]
pub trait UnitOfWork:
    AccountRepository + BalanceLedgerStore + TransactionJournal + PostingRecordStore + Send
{
    /// Response previously stored under an idempotency key
    async fn stored_response(&mut self, key: &str) -> PostingResult<Option<PostingResponse>>;

    /// Stage a response under an idempotency key
    async fn store_response(&mut self, key: &str, response: &PostingResponse)
        -> PostingResult<()>;

    /// Apply every staged write, or none of them.
    ///
    /// Fails with [`PostingError::ConcurrencyConflict`] when another unit
    /// changed a row this unit read.
    async fn commit(self) -> PostingResult<()>;

    /// Discard every staged write
    async fn rollback(self) -> PostingResult<()>;
}

/// Storage backend able to open units of work.
///
/// Implement this for PostgreSQL, SQLite or any other engine; the crate ships
/// [`MemoryStorage`](crate::utils::MemoryStorage).
#[async_trait]
pub trait LedgerStore: Send + Sync {
    type Unit: UnitOfWork;

    /// Open a new unit of work
    async fn begin(&self) -> PostingResult<Self::Unit>;
}

/// Read-side queries over posting records and the journal
#[async_trait]
pub trait PostingRecordReader: Send + Sync {
    /// Number of posting records
    async fn count_postings(&self) -> PostingResult<usize>;

    /// Number of posting records per transaction type label
    async fn count_postings_by_type(&self) -> PostingResult<HashMap<String, usize>>;

    /// Posting records ordered by `date_posted` descending, skipping `skip` and taking `take`
    async fn postings_page(&self, skip: usize, take: usize) -> PostingResult<Vec<PostingRecord>>;

    /// Journal entries for a customer, newest first
    async fn transactions_for_customer(&self, customer_id: Uuid)
        -> PostingResult<Vec<Transaction>>;
}

/// Ledger balance history service
#[async_trait]
pub trait LedgerBalanceReader: Send + Sync {
    /// Most recent ledger balance recorded for a GL account
    async fn most_recent_balance(&self, gl_account_number: &str) -> PostingResult<BigDecimal>;
}

/// Outbound receipt delivery (email or otherwise)
#[async_trait]
pub trait ReceiptNotifier: Send + Sync {
    async fn send_receipt(
        &self,
        recipient: &str,
        subject: &str,
        html_body: &str,
    ) -> Result<(), NotifyError>;
}

/// Trait for implementing custom account validation rules
pub trait AccountValidator: Send + Sync {
    /// Validate a customer account before it is opened
    fn validate_customer_account(&self, account: &NewCustomerAccount) -> PostingResult<()>;

    /// Validate a GL account before it is opened
    fn validate_gl_account(&self, account_number: &str, account_name: &str)
        -> PostingResult<()>;
}

/// Default account validator with basic rules
pub struct DefaultAccountValidator;

impl AccountValidator for DefaultAccountValidator {
    fn validate_customer_account(&self, account: &NewCustomerAccount) -> PostingResult<()> {
        validate_account_number(&account.account_number)?;
        validate_account_name(&account.full_name)?;
        Ok(())
    }

    fn validate_gl_account(
        &self,
        account_number: &str,
        account_name: &str,
    ) -> PostingResult<()> {
        validate_account_number(account_number)?;
        validate_account_name(account_name)
    }
}
