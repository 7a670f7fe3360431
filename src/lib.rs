//! # Posting Core
//!
//! The posting engine of a retail-banking backend: deposits, withdrawals and
//! transfers between customer accounts and general-ledger (GL) accounts.
//!
//! ## Features
//!
//! - **Atomic postings**: every account, balance ledger, journal and posting
//!   record write of a posting commits together or not at all
//! - **Conservation**: a deposit or withdrawal moves the customer and GL
//!   balances by the same amount in opposite directions; a transfer moves
//!   money between two customers only
//! - **Structured failures**: missing accounts and insufficient funds come back
//!   as a [`PostingResponse`] rather than an error
//! - **Optimistic concurrency**: conflicting units of work are replayed before
//!   surfacing as a persistence failure
//! - **Idempotency keys**: opt-in deduplication of retried requests
//! - **Storage abstraction**: implement [`LedgerStore`] for any backend
//!
//! ## Quick Start
//!
//! ```rust
//! use posting_core::{
//!     AccountManager, CustomerAccountType, MemoryLedgerBalances, MemoryStorage,
//!     NewCustomerAccount, PostingEngine, PostingRequest, RecordingNotifier,
//! };
//! use bigdecimal::BigDecimal;
//!
//! # let runtime = tokio::runtime::Runtime::new().unwrap();
//! # runtime.block_on(async {
//! let storage = MemoryStorage::new();
//! let balances = MemoryLedgerBalances::new();
//! let accounts = AccountManager::new(storage.clone());
//!
//! accounts.open_gl_account("GL-100", "Teller Cash", BigDecimal::from(1000)).await?;
//! balances.record_balance("GL-100", BigDecimal::from(500))?;
//! accounts
//!     .open_customer_account(NewCustomerAccount {
//!         account_number: "1000000001".into(),
//!         full_name: "Amaka Nwosu".into(),
//!         account_type: CustomerAccountType::Savings,
//!         branch: "Victoria Island".into(),
//!         email: "amaka@example.com".into(),
//!         phone_number: "08012345678".into(),
//!         gender: "Female".into(),
//!         address: "3 Adeola Odeku".into(),
//!         state: "Lagos".into(),
//!     })
//!     .await?;
//!
//! let engine = PostingEngine::new(storage, balances, RecordingNotifier::new());
//! let response = engine
//!     .deposit(&PostingRequest::new("1000000001", "GL-100", BigDecimal::from(100), "Cash deposit"))
//!     .await?;
//! assert!(response.status);
//! # Ok::<(), posting_core::PostingError>(())
//! # }).unwrap();
//! ```

pub mod config;
pub mod ledger;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use config::*;
pub use ledger::*;
pub use traits::*;
pub use types::*;
pub use utils::*;
