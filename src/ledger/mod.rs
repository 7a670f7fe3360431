//! Ledger module containing account management, postings and listings

pub mod account;
pub mod listing;
pub mod posting;
pub mod receipt;

pub use account::*;
pub use listing::*;
pub use posting::*;
pub use receipt::*;
