//! In-memory storage implementation for testing

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

#[derive(Debug, Default)]
struct StoreState {
    customers: HashMap<String, CustomerAccount>,
    gl_accounts: HashMap<String, GlAccount>,
    balance_ledgers: HashMap<String, BalanceLedger>,
    transactions: Vec<Transaction>,
    postings: Vec<PostingRecord>,
    responses: HashMap<String, PostingResponse>,
    faults: FaultPlan,
}

/// Commit failures queued for upcoming units of work
#[derive(Debug, Default, Clone, Copy)]
struct FaultPlan {
    failed_commits: u32,
    conflicts: u32,
}

/// In-memory storage implementation for testing and development.
///
/// Units of work use optimistic concurrency: every row carries a version,
/// and a commit is rejected if any row it writes changed since it was read.
/// Cloning shares the underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<RwLock<StoreState>>,
}

impl MemoryStorage {
    /// Create a new memory storage instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` commits fail with a persistence failure
    pub fn fail_next_commits(&self, count: u32) -> PostingResult<()> {
        self.write()?.faults.failed_commits = count;
        Ok(())
    }

    /// Make the next `count` commits fail with a concurrency conflict
    pub fn conflict_next_commits(&self, count: u32) -> PostingResult<()> {
        self.write()?.faults.conflicts = count;
        Ok(())
    }

    /// Committed customer account
    pub fn customer_account(&self, account_number: &str) -> PostingResult<Option<CustomerAccount>> {
        Ok(self.read()?.customers.get(account_number).cloned())
    }

    /// Committed GL account
    pub fn gl_account(&self, account_number: &str) -> PostingResult<Option<GlAccount>> {
        Ok(self.read()?.gl_accounts.get(account_number).cloned())
    }

    /// Committed balance ledger
    pub fn balance_ledger(&self, account_number: &str) -> PostingResult<Option<BalanceLedger>> {
        Ok(self.read()?.balance_ledgers.get(account_number).cloned())
    }

    /// Every committed journal entry, in append order
    pub fn transactions(&self) -> PostingResult<Vec<Transaction>> {
        Ok(self.read()?.transactions.clone())
    }

    /// Every committed posting record, in append order
    pub fn posting_records(&self) -> PostingResult<Vec<PostingRecord>> {
        Ok(self.read()?.postings.clone())
    }

    fn read(&self) -> PostingResult<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| PostingError::PersistenceFailure("storage lock poisoned".to_string()))
    }

    fn write(&self) -> PostingResult<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| PostingError::PersistenceFailure("storage lock poisoned".to_string()))
    }
}

#[async_trait]
impl LedgerStore for MemoryStorage {
    type Unit = MemoryUnitOfWork;

    async fn begin(&self) -> PostingResult<MemoryUnitOfWork> {
        Ok(MemoryUnitOfWork {
            storage: self.clone(),
            customers: HashMap::new(),
            gl_accounts: HashMap::new(),
            balance_ledgers: HashMap::new(),
            transactions: Vec::new(),
            postings: Vec::new(),
            responses: HashMap::new(),
        })
    }
}

/// Staged writes of one unit of work against [`MemoryStorage`]
#[derive(Debug)]
pub struct MemoryUnitOfWork {
    storage: MemoryStorage,
    customers: HashMap<String, CustomerAccount>,
    gl_accounts: HashMap<String, GlAccount>,
    balance_ledgers: HashMap<String, BalanceLedger>,
    transactions: Vec<Transaction>,
    postings: Vec<PostingRecord>,
    responses: HashMap<String, PostingResponse>,
}

fn check_version(kind: &str, key: &str, staged: u64, stored: Option<u64>) -> PostingResult<()> {
    match stored {
        None if staged == 0 => Ok(()),
        Some(current) if current == staged => Ok(()),
        _ => Err(PostingError::ConcurrencyConflict(format!(
            "{} '{}' was modified concurrently",
            kind, key
        ))),
    }
}

impl MemoryUnitOfWork {
    fn validate_against(&self, state: &StoreState) -> PostingResult<()> {
        for (number, account) in &self.customers {
            let stored = state.customers.get(number).map(|a| a.version);
            check_version("customer account", number, account.version, stored)?;
        }
        for (number, account) in &self.gl_accounts {
            let stored = state.gl_accounts.get(number).map(|a| a.version);
            check_version("GL account", number, account.version, stored)?;
        }
        for (number, ledger) in &self.balance_ledgers {
            let stored = state.balance_ledgers.get(number).map(|l| l.version);
            check_version("balance ledger", number, ledger.version, stored)?;
        }
        for key in self.responses.keys() {
            if state.responses.contains_key(key) {
                return Err(PostingError::ConcurrencyConflict(format!(
                    "idempotency key '{}' was used concurrently",
                    key
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for MemoryUnitOfWork {
    async fn find_customer_account(
        &mut self,
        account_number: &str,
    ) -> PostingResult<Option<CustomerAccount>> {
        if let Some(staged) = self.customers.get(account_number) {
            return Ok(Some(staged.clone()));
        }
        self.storage.customer_account(account_number)
    }

    async fn find_gl_account(&mut self, account_number: &str) -> PostingResult<Option<GlAccount>> {
        if let Some(staged) = self.gl_accounts.get(account_number) {
            return Ok(Some(staged.clone()));
        }
        self.storage.gl_account(account_number)
    }

    async fn save_customer_account(&mut self, account: &CustomerAccount) -> PostingResult<()> {
        self.customers
            .insert(account.account_number.clone(), account.clone());
        Ok(())
    }

    async fn save_gl_account(&mut self, account: &GlAccount) -> PostingResult<()> {
        self.gl_accounts
            .insert(account.account_number.clone(), account.clone());
        Ok(())
    }
}

#[async_trait]
impl BalanceLedgerStore for MemoryUnitOfWork {
    async fn find_balance_ledger(
        &mut self,
        account_number: &str,
    ) -> PostingResult<Option<BalanceLedger>> {
        if let Some(staged) = self.balance_ledgers.get(account_number) {
            return Ok(Some(staged.clone()));
        }
        self.storage.balance_ledger(account_number)
    }

    async fn save_balance_ledger(&mut self, ledger: &BalanceLedger) -> PostingResult<()> {
        self.balance_ledgers
            .insert(ledger.account_number.clone(), ledger.clone());
        Ok(())
    }
}

#[async_trait]
impl TransactionJournal for MemoryUnitOfWork {
    async fn append_transaction(&mut self, transaction: &Transaction) -> PostingResult<()> {
        self.transactions.push(transaction.clone());
        Ok(())
    }
}

#[async_trait]
impl PostingRecordStore for MemoryUnitOfWork {
    async fn append_posting_record(&mut self, record: &PostingRecord) -> PostingResult<()> {
        self.postings.push(record.clone());
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn stored_response(&mut self, key: &str) -> PostingResult<Option<PostingResponse>> {
        if let Some(staged) = self.responses.get(key) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.storage.read()?.responses.get(key).cloned())
    }

    async fn store_response(
        &mut self,
        key: &str,
        response: &PostingResponse,
    ) -> PostingResult<()> {
        self.responses.insert(key.to_string(), response.clone());
        Ok(())
    }

    async fn commit(self) -> PostingResult<()> {
        let mut state = self.storage.write()?;

        if state.faults.failed_commits > 0 {
            state.faults.failed_commits -= 1;
            return Err(PostingError::PersistenceFailure(
                "injected commit failure".to_string(),
            ));
        }
        if state.faults.conflicts > 0 {
            state.faults.conflicts -= 1;
            return Err(PostingError::ConcurrencyConflict(
                "injected write conflict".to_string(),
            ));
        }

        self.validate_against(&state)?;

        for (number, mut account) in self.customers {
            account.version += 1;
            state.customers.insert(number, account);
        }
        for (number, mut account) in self.gl_accounts {
            account.version += 1;
            state.gl_accounts.insert(number, account);
        }
        for (number, mut ledger) in self.balance_ledgers {
            ledger.version += 1;
            state.balance_ledgers.insert(number, ledger);
        }
        state.transactions.extend(self.transactions);
        state.postings.extend(self.postings);
        state.responses.extend(self.responses);
        Ok(())
    }

    async fn rollback(self) -> PostingResult<()> {
        Ok(())
    }
}

#[async_trait]
impl PostingRecordReader for MemoryStorage {
    async fn count_postings(&self) -> PostingResult<usize> {
        Ok(self.read()?.postings.len())
    }

    async fn count_postings_by_type(&self) -> PostingResult<HashMap<String, usize>> {
        let state = self.read()?;
        let mut counts: HashMap<String, usize> = HashMap::new();
        for record in &state.postings {
            *counts
                .entry(record.transaction_type.label().to_string())
                .or_default() += 1;
        }
        Ok(counts)
    }

    async fn postings_page(&self, skip: usize, take: usize) -> PostingResult<Vec<PostingRecord>> {
        let state = self.read()?;
        // Newest first; the stable sort over the reversed log keeps later
        // appends ahead of earlier ones when timestamps tie.
        let mut ordered: Vec<&PostingRecord> = state.postings.iter().rev().collect();
        ordered.sort_by(|a, b| b.date_posted.cmp(&a.date_posted));
        Ok(ordered
            .into_iter()
            .skip(skip)
            .take(take)
            .cloned()
            .collect())
    }

    async fn transactions_for_customer(
        &self,
        customer_id: Uuid,
    ) -> PostingResult<Vec<Transaction>> {
        let state = self.read()?;
        let mut entries: Vec<Transaction> = state
            .transactions
            .iter()
            .rev()
            .filter(|txn| txn.customer_id == customer_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }
}

/// In-memory ledger balance history: the latest balance recorded per GL account.
///
/// GL accounts with no recorded balance report zero.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerBalances {
    balances: Arc<RwLock<HashMap<String, BigDecimal>>>,
}

impl MemoryLedgerBalances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new most-recent balance for a GL account
    pub fn record_balance(
        &self,
        gl_account_number: impl Into<String>,
        balance: BigDecimal,
    ) -> PostingResult<()> {
        self.balances
            .write()
            .map_err(|_| PostingError::PersistenceFailure("balance lock poisoned".to_string()))?
            .insert(gl_account_number.into(), balance);
        Ok(())
    }
}

#[async_trait]
impl LedgerBalanceReader for MemoryLedgerBalances {
    async fn most_recent_balance(&self, gl_account_number: &str) -> PostingResult<BigDecimal> {
        let balances = self
            .balances
            .read()
            .map_err(|_| PostingError::PersistenceFailure("balance lock poisoned".to_string()))?;
        Ok(balances
            .get(gl_account_number)
            .cloned()
            .unwrap_or_else(|| BigDecimal::from(0)))
    }
}
