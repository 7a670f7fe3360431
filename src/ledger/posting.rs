//! Posting engine: deposits, withdrawals and transfers

use bigdecimal::BigDecimal;
use std::future::Future;
use std::sync::Arc;
use tracing::Instrument;

use crate::config::EngineConfig;
use crate::ledger::receipt::render_receipt;
use crate::traits::*;
use crate::types::*;
use crate::utils::validation::{validate_posting_request, validate_transfer_request};

/// Direction of a customer/GL posting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Movement {
    Deposit,
    Withdrawal,
}

impl Movement {
    fn operation(self) -> &'static str {
        match self {
            Movement::Deposit => "deposit",
            Movement::Withdrawal => "withdraw",
        }
    }

    fn success_message(self) -> &'static str {
        match self {
            Movement::Deposit => "Deposit successful",
            Movement::Withdrawal => "Withdrawal successful",
        }
    }
}

/// What a committed unit of work produced
struct Applied {
    response: PostingResponse,
    /// Customer snapshot to send a receipt for
    receipt: Option<CustomerAccount>,
}

impl Applied {
    fn replayed(response: PostingResponse) -> Self {
        Self {
            response,
            receipt: None,
        }
    }
}

/// Orchestrates postings against a [`LedgerStore`].
///
/// Every posting runs in a single unit of work: either every account,
/// balance ledger, journal and posting record write commits, or none does.
/// The engine keeps no locks of its own and is safe to share behind an `Arc`.
/// Receipts are delivered on a detached tokio task, so a posting never waits
/// on the notifier.
pub struct PostingEngine<S: LedgerStore> {
    store: S,
    balances: Arc<dyn LedgerBalanceReader>,
    notifier: Arc<dyn ReceiptNotifier>,
    config: EngineConfig,
}

impl<S: LedgerStore> PostingEngine<S> {
    /// Create a new engine with the default configuration
    pub fn new(
        store: S,
        balances: impl LedgerBalanceReader + 'static,
        notifier: impl ReceiptNotifier + 'static,
    ) -> Self {
        Self::with_config(store, balances, notifier, EngineConfig::default())
    }

    /// Create a new engine with a custom configuration
    pub fn with_config(
        store: S,
        balances: impl LedgerBalanceReader + 'static,
        notifier: impl ReceiptNotifier + 'static,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            balances: Arc::new(balances),
            notifier: Arc::new(notifier),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Credit a customer account against a GL account.
    ///
    /// Rejected when the GL account's most recent ledger balance is below the amount.
    #[tracing::instrument(
        skip_all,
        fields(
            customer = %request.customer_account_number,
            ledger = %request.ledger_account_number,
            amount = %request.amount
        )
    )]
    pub async fn deposit(&self, request: &PostingRequest) -> PostingResult<PostingResponse> {
        let movement = Movement::Deposit;
        self.run(movement.operation(), || self.try_posting(request, movement))
            .await
    }

    /// Debit a customer account against a GL account.
    ///
    /// Rejected when the customer's own balance is below the amount; unlike
    /// [`deposit`](Self::deposit), the ledger balance is not consulted.
    #[tracing::instrument(
        skip_all,
        fields(
            customer = %request.customer_account_number,
            ledger = %request.ledger_account_number,
            amount = %request.amount
        )
    )]
    pub async fn withdraw(&self, request: &PostingRequest) -> PostingResult<PostingResponse> {
        let movement = Movement::Withdrawal;
        self.run(movement.operation(), || self.try_posting(request, movement))
            .await
    }

    /// Move money between two customer accounts. No GL account is touched and
    /// no journal entry or posting record is written.
    #[tracing::instrument(
        skip_all,
        fields(
            sender = %request.sender_account_number,
            receiver = %request.receiver_account_number,
            amount = %request.amount
        )
    )]
    pub async fn transfer(&self, request: &TransferRequest) -> PostingResult<PostingResponse> {
        self.run("transfer", || self.try_transfer(request)).await
    }

    /// Drive one operation to a response: replay conflicted units and turn
    /// domain errors into structured failures. The receipt goes out after commit.
    async fn run<F, Fut>(&self, operation: &'static str, mut attempt: F) -> PostingResult<PostingResponse>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = PostingResult<Applied>>,
    {
        let mut conflicts = 0u32;
        loop {
            match attempt().await {
                Ok(applied) => {
                    tracing::info!(operation, outcome = %applied.response.message, "posting committed");
                    if let Some(customer) = applied.receipt {
                        self.send_receipt(&customer);
                    }
                    return Ok(applied.response);
                }
                Err(PostingError::ConcurrencyConflict(reason)) => {
                    if conflicts < self.config.conflict_retries {
                        conflicts += 1;
                        tracing::warn!(operation, attempt = conflicts, %reason, "concurrency conflict, retrying");
                        continue;
                    }
                    tracing::error!(operation, %reason, "concurrency conflict persisted");
                    return Err(PostingError::PersistenceFailure(format!(
                        "{} aborted after {} retries: {}",
                        operation, conflicts, reason
                    )));
                }
                Err(error) => {
                    if let Some(response) = PostingResponse::from_domain_error(&error) {
                        tracing::warn!(operation, %error, "posting rejected");
                        return Ok(response);
                    }
                    tracing::error!(operation, %error, "posting failed");
                    return Err(error);
                }
            }
        }
    }

    async fn try_posting(&self, request: &PostingRequest, movement: Movement) -> PostingResult<Applied> {
        validate_posting_request(request)?;

        let mut unit = self.store.begin().await?;
        match self.apply_posting(&mut unit, request, movement).await {
            Ok(applied) => {
                unit.commit().await?;
                Ok(applied)
            }
            Err(error) => {
                discard(unit).await;
                Err(error)
            }
        }
    }

    async fn apply_posting(
        &self,
        unit: &mut S::Unit,
        request: &PostingRequest,
        movement: Movement,
    ) -> PostingResult<Applied> {
        if let Some(key) = request.idempotency_key.as_deref() {
            if let Some(response) = unit.stored_response(key).await? {
                tracing::debug!(key, "replaying stored response");
                return Ok(Applied::replayed(response));
            }
        }

        let mut customer = unit
            .find_customer_account(&request.customer_account_number)
            .await?
            .ok_or_else(|| PostingError::AccountNotFound("Customer not found".to_string()))?;
        let mut gl_account = unit
            .find_gl_account(&request.ledger_account_number)
            .await?
            .ok_or_else(|| PostingError::AccountNotFound("Ledger not found".to_string()))?;

        let amount = &request.amount;
        match movement {
            Movement::Deposit => {
                let ledger_balance = self
                    .balances
                    .most_recent_balance(&gl_account.account_number)
                    .await?;
                if ledger_balance < *amount {
                    return Err(PostingError::InsufficientFunds(
                        "Insufficient funds in ledger balance".to_string(),
                    ));
                }
            }
            Movement::Withdrawal => {
                if customer.balance < *amount {
                    return Err(PostingError::InsufficientFunds(
                        "Insufficient funds".to_string(),
                    ));
                }
            }
        }

        let mut balance_ledger = unit
            .find_balance_ledger(&customer.account_number)
            .await?
            .unwrap_or_else(|| BalanceLedger::new(customer.account_number.clone()));

        let customer_delta = match movement {
            Movement::Deposit => amount.clone(),
            Movement::Withdrawal => -amount.clone(),
        };
        let gl_delta = -customer_delta.clone();

        customer.adjust_balance(&customer_delta);
        gl_account.adjust_balance(&gl_delta);
        balance_ledger.accumulate_ledger(&gl_account.balance);
        balance_ledger.adjust_spendable(&customer_delta);

        let narration = request.narration.clone();
        let transaction = match movement {
            Movement::Deposit => {
                Transaction::money_in(&customer, &gl_account, amount.clone(), narration.clone())
            }
            Movement::Withdrawal => {
                Transaction::money_out(&customer, &gl_account, amount.clone(), narration.clone())
            }
        };
        let record = PostingRecord::snapshot(
            transaction.transaction_type,
            &customer,
            &gl_account,
            amount.clone(),
            narration,
        );

        unit.save_gl_account(&gl_account).await?;
        unit.save_customer_account(&customer).await?;
        unit.save_balance_ledger(&balance_ledger).await?;
        unit.append_transaction(&transaction).await?;
        unit.append_posting_record(&record).await?;

        let response = PostingResponse::success(movement.success_message());
        if let Some(key) = request.idempotency_key.as_deref() {
            unit.store_response(key, &response).await?;
        }

        Ok(Applied {
            response,
            receipt: Some(customer),
        })
    }

    async fn try_transfer(&self, request: &TransferRequest) -> PostingResult<Applied> {
        validate_transfer_request(request)?;

        let mut unit = self.store.begin().await?;
        match self.apply_transfer(&mut unit, request).await {
            Ok(applied) => {
                unit.commit().await?;
                Ok(applied)
            }
            Err(error) => {
                discard(unit).await;
                Err(error)
            }
        }
    }

    async fn apply_transfer(
        &self,
        unit: &mut S::Unit,
        request: &TransferRequest,
    ) -> PostingResult<Applied> {
        if let Some(key) = request.idempotency_key.as_deref() {
            if let Some(response) = unit.stored_response(key).await? {
                tracing::debug!(key, "replaying stored response");
                return Ok(Applied::replayed(response));
            }
        }

        let mut sender = unit
            .find_customer_account(&request.sender_account_number)
            .await?
            .ok_or_else(|| PostingError::AccountNotFound("Sender not found".to_string()))?;
        let mut receiver = unit
            .find_customer_account(&request.receiver_account_number)
            .await?
            .ok_or_else(|| PostingError::AccountNotFound("Receiver not found".to_string()))?;

        // Both sides would stage writes to the same row.
        if sender.id == receiver.id {
            return Err(PostingError::Validation(
                "Sender and receiver accounts must differ".to_string(),
            ));
        }

        let amount = &request.amount;
        if sender.balance < *amount {
            return Err(PostingError::InsufficientFunds(
                "Insufficient funds".to_string(),
            ));
        }

        let debit: BigDecimal = -amount.clone();
        sender.adjust_balance(&debit);
        receiver.adjust_balance(amount);

        let mut sender_ledger = unit
            .find_balance_ledger(&sender.account_number)
            .await?
            .unwrap_or_else(|| BalanceLedger::new(sender.account_number.clone()));
        let mut receiver_ledger = unit
            .find_balance_ledger(&receiver.account_number)
            .await?
            .unwrap_or_else(|| BalanceLedger::new(receiver.account_number.clone()));

        // Both ledger balances grow by the amount.
        sender_ledger.adjust_spendable(&debit);
        sender_ledger.accumulate_ledger(amount);
        receiver_ledger.adjust_spendable(amount);
        receiver_ledger.accumulate_ledger(amount);

        unit.save_customer_account(&sender).await?;
        unit.save_customer_account(&receiver).await?;
        unit.save_balance_ledger(&sender_ledger).await?;
        unit.save_balance_ledger(&receiver_ledger).await?;

        let response = PostingResponse::success("Transfer successful");
        if let Some(key) = request.idempotency_key.as_deref() {
            unit.store_response(key, &response).await?;
        }

        Ok(Applied {
            response,
            receipt: None,
        })
    }

    /// Deliver the receipt on a detached task so the caller never waits on
    /// the notifier. Deliveries outliving `receipt_timeout` are abandoned.
    fn send_receipt(&self, customer: &CustomerAccount) {
        if customer.email.trim().is_empty() {
            tracing::debug!(account_number = %customer.account_number, "no email on file, receipt skipped");
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(account_number = %customer.account_number, "no tokio runtime, receipt skipped");
            return;
        };

        let notifier = Arc::clone(&self.notifier);
        let recipient = customer.email.clone();
        let subject = self.config.receipt_subject.clone();
        let body = render_receipt(customer, chrono::Utc::now().naive_utc());
        let account_number = customer.account_number.clone();
        let timeout = self.config.receipt_timeout();

        runtime.spawn(
            async move {
                let delivery = notifier.send_receipt(&recipient, &subject, &body);
                match tokio::time::timeout(timeout, delivery).await {
                    Ok(Ok(())) => tracing::debug!(%account_number, "receipt sent"),
                    Ok(Err(error)) => tracing::warn!(
                        %account_number,
                        %error,
                        "receipt delivery failed, posting unaffected"
                    ),
                    Err(_) => tracing::warn!(
                        %account_number,
                        timeout_ms = timeout.as_millis() as u64,
                        "receipt delivery timed out, posting unaffected"
                    ),
                }
            }
            .in_current_span(),
        );
    }
}

async fn discard<U: UnitOfWork>(unit: U) {
    if let Err(error) = unit.rollback().await {
        tracing::warn!(%error, "rollback failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::AccountManager;
    use crate::utils::{MemoryLedgerBalances, MemoryStorage, RecordingNotifier, SentReceipt};
    use async_trait::async_trait;
    use std::time::Duration;

    struct Fixture {
        storage: MemoryStorage,
        balances: MemoryLedgerBalances,
        notifier: RecordingNotifier,
        engine: PostingEngine<MemoryStorage>,
    }

    async fn fixture() -> Fixture {
        let storage = MemoryStorage::new();
        let balances = MemoryLedgerBalances::new();
        let notifier = RecordingNotifier::new();
        let manager = AccountManager::new(storage.clone());

        manager
            .open_customer_account(NewCustomerAccount {
                account_number: "C1".to_string(),
                full_name: "Ngozi Eze".to_string(),
                account_type: CustomerAccountType::Savings,
                branch: "Yaba".to_string(),
                email: "ngozi@example.com".to_string(),
                phone_number: "08022222222".to_string(),
                gender: "Female".to_string(),
                address: "12 Herbert Macaulay Way".to_string(),
                state: "Lagos".to_string(),
            })
            .await
            .unwrap();
        manager
            .open_gl_account("G1", "Teller Cash", BigDecimal::from(1000))
            .await
            .unwrap();
        balances.record_balance("G1", BigDecimal::from(500)).unwrap();

        let engine = PostingEngine::new(storage.clone(), balances.clone(), notifier.clone());
        Fixture {
            storage,
            balances,
            notifier,
            engine,
        }
    }

    /// Wait for detached receipt deliveries to land
    async fn delivered(notifier: &RecordingNotifier, count: usize) -> Vec<SentReceipt> {
        for _ in 0..200 {
            let sent = notifier.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        notifier.sent()
    }

    /// Notifier whose deliveries never complete
    struct StalledNotifier;

    #[async_trait]
    impl ReceiptNotifier for StalledNotifier {
        async fn send_receipt(
            &self,
            _recipient: &str,
            _subject: &str,
            _html_body: &str,
        ) -> Result<(), NotifyError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_deposit_accumulates_ledger_balance() {
        let f = fixture().await;
        let request = PostingRequest::new("C1", "G1", BigDecimal::from(100), "cash in");
        let response = f.engine.deposit(&request).await.unwrap();
        assert!(response.status);

        let ledger = f.storage.balance_ledger("C1").unwrap().unwrap();
        assert_eq!(ledger.ledger_balance, BigDecimal::from(900));
        assert_eq!(ledger.available_balance, BigDecimal::from(100));
        assert_eq!(ledger.withdrawable_balance, BigDecimal::from(100));

        // Second deposit adds the new GL balance on top of the previous one
        f.engine.deposit(&request).await.unwrap();
        let ledger = f.storage.balance_ledger("C1").unwrap().unwrap();
        assert_eq!(ledger.ledger_balance, BigDecimal::from(900 + 800));
    }

    #[tokio::test]
    async fn test_deposit_checks_ledger_balance_not_gl_balance() {
        let f = fixture().await;
        // GL holds 1000 but its ledger balance history says 500
        let request = PostingRequest::new("C1", "G1", BigDecimal::from(600), "too much");
        let response = f.engine.deposit(&request).await.unwrap();
        assert_eq!(response.failure, Some(FailureKind::InsufficientFunds));
        assert_eq!(response.errors, vec!["Insufficient funds in ledger balance"]);

        f.balances.record_balance("G1", BigDecimal::from(600)).unwrap();
        let response = f.engine.deposit(&request).await.unwrap();
        assert!(response.status);
    }

    #[tokio::test]
    async fn test_missing_accounts_produce_structured_failures() {
        let f = fixture().await;

        let response = f
            .engine
            .deposit(&PostingRequest::new("C9", "G1", BigDecimal::from(1), ""))
            .await
            .unwrap();
        assert_eq!(response.message, "Customer not found");
        assert_eq!(response.failure, Some(FailureKind::AccountNotFound));

        let response = f
            .engine
            .withdraw(&PostingRequest::new("C1", "G9", BigDecimal::from(1), ""))
            .await
            .unwrap();
        assert_eq!(response.message, "Ledger not found");
    }

    #[tokio::test]
    async fn test_invalid_amount_is_rejected_before_any_read() {
        let f = fixture().await;
        let response = f
            .engine
            .deposit(&PostingRequest::new("C1", "G1", BigDecimal::from(0), ""))
            .await
            .unwrap();
        assert!(!response.status);
        assert_eq!(response.failure, Some(FailureKind::InvalidRequest));
        assert_eq!(response.errors, vec!["Amount must be positive"]);
        assert!(f.storage.transactions().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_receipt_sent_after_deposit() {
        let f = fixture().await;
        f.engine
            .deposit(&PostingRequest::new("C1", "G1", BigDecimal::from(100), "cash in"))
            .await
            .unwrap();

        let sent = delivered(&f.notifier, 1).await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].recipient, "ngozi@example.com");
        assert_eq!(sent[0].subject, "Transaction Receipt");
        assert!(sent[0].html_body.contains("<td>100</td>"));
    }

    #[tokio::test]
    async fn test_receipts_only_for_customers_with_email() {
        let f = fixture().await;
        AccountManager::new(f.storage.clone())
            .open_customer_account(NewCustomerAccount {
                account_number: "C2".to_string(),
                full_name: "Sola Ade".to_string(),
                account_type: CustomerAccountType::Current,
                branch: "Yaba".to_string(),
                email: String::new(),
                phone_number: "08044444444".to_string(),
                gender: "Male".to_string(),
                address: "5 Commercial Avenue".to_string(),
                state: "Lagos".to_string(),
            })
            .await
            .unwrap();

        let response = f
            .engine
            .deposit(&PostingRequest::new("C2", "G1", BigDecimal::from(40), "no email"))
            .await
            .unwrap();
        assert!(response.status);
        f.engine
            .deposit(&PostingRequest::new("C1", "G1", BigDecimal::from(100), "cash in"))
            .await
            .unwrap();
        let response = f
            .engine
            .withdraw(&PostingRequest::new("C1", "G1", BigDecimal::from(30), "atm"))
            .await
            .unwrap();
        assert!(response.status);

        let sent = delivered(&f.notifier, 2).await;
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|receipt| receipt.recipient == "ngozi@example.com"));
        assert!(sent.iter().any(|receipt| receipt.html_body.contains("<td>100</td>")));
        assert!(sent.iter().any(|receipt| receipt.html_body.contains("<td>70</td>")));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(f.notifier.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_stalled_notifier_does_not_hold_posting() {
        let f = fixture().await;
        let engine = PostingEngine::with_config(
            f.storage.clone(),
            f.balances.clone(),
            StalledNotifier,
            EngineConfig {
                receipt_timeout_ms: 50,
                ..EngineConfig::default()
            },
        );

        let response = tokio::time::timeout(
            Duration::from_secs(2),
            engine.deposit(&PostingRequest::new("C1", "G1", BigDecimal::from(100), "cash in")),
        )
        .await
        .expect("deposit waited on the notifier")
        .unwrap();

        assert!(response.status);
        assert_eq!(
            f.storage.customer_account("C1").unwrap().unwrap().balance,
            BigDecimal::from(100)
        );
    }

    #[tokio::test]
    async fn test_self_transfer_checked_after_lookup() {
        let f = fixture().await;

        let response = f
            .engine
            .transfer(&TransferRequest::new("X404", "X404", BigDecimal::from(5)))
            .await
            .unwrap();
        assert_eq!(response.failure, Some(FailureKind::AccountNotFound));
        assert_eq!(response.message, "Sender not found");

        let response = f
            .engine
            .transfer(&TransferRequest::new("C1", "C1", BigDecimal::from(5)))
            .await
            .unwrap();
        assert_eq!(response.failure, Some(FailureKind::InvalidRequest));
        assert_eq!(response.errors, vec!["Sender and receiver accounts must differ"]);
    }

    #[tokio::test]
    async fn test_conflict_retried_once_then_persistence_failure() {
        let f = fixture().await;
        let request = PostingRequest::new("C1", "G1", BigDecimal::from(10), "retry");

        f.storage.conflict_next_commits(1).unwrap();
        let response = f.engine.deposit(&request).await.unwrap();
        assert!(response.status);
        assert_eq!(
            f.storage.customer_account("C1").unwrap().unwrap().balance,
            BigDecimal::from(10)
        );

        f.storage.conflict_next_commits(2).unwrap();
        let result = f.engine.deposit(&request).await;
        assert!(matches!(result, Err(PostingError::PersistenceFailure(_))));
        assert_eq!(
            f.storage.customer_account("C1").unwrap().unwrap().balance,
            BigDecimal::from(10)
        );
    }

    #[tokio::test]
    async fn test_configured_retries_are_honoured() {
        let f = fixture().await;
        let engine = PostingEngine::with_config(
            f.storage.clone(),
            f.balances.clone(),
            f.notifier.clone(),
            EngineConfig {
                conflict_retries: 3,
                ..EngineConfig::default()
            },
        );
        f.storage.conflict_next_commits(3).unwrap();
        let response = engine
            .deposit(&PostingRequest::new("C1", "G1", BigDecimal::from(5), ""))
            .await
            .unwrap();
        assert!(response.status);
    }
}
