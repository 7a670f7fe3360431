//! Basic posting usage example

use posting_core::{
    AccountManager, CustomerAccountType, EngineConfig, LoggingNotifier, MemoryLedgerBalances,
    MemoryStorage, NewCustomerAccount, PostingEngine, PostingListing, PostingRequest,
    TransferRequest,
};
use bigdecimal::BigDecimal;
use tracing_subscriber::EnvFilter;

fn customer(account_number: &str, full_name: &str, email: &str) -> NewCustomerAccount {
    NewCustomerAccount {
        account_number: account_number.to_string(),
        full_name: full_name.to_string(),
        account_type: CustomerAccountType::Savings,
        branch: "Victoria Island".to_string(),
        email: email.to_string(),
        phone_number: "08012345678".to_string(),
        gender: "Female".to_string(),
        address: "3 Adeola Odeku".to_string(),
        state: "Lagos".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("🏦 Posting Core - Basic Posting Example\n");

    let config = EngineConfig::from_env("POSTING")?;
    let storage = MemoryStorage::new();
    let balances = MemoryLedgerBalances::new();
    let accounts = AccountManager::new(storage.clone());

    // 1. Open accounts
    println!("📊 Opening accounts...");
    let gl = accounts
        .open_gl_account("GL-100", "Teller Cash", BigDecimal::from(1000))
        .await?;
    balances.record_balance("GL-100", BigDecimal::from(500))?;
    println!("  ✓ GL {} - {} ({})", gl.account_number, gl.account_name, gl.balance);

    for (number, name, email) in [
        ("1000000001", "Amaka Nwosu", "amaka@example.com"),
        ("1000000002", "Bayo Ogun", ""),
    ] {
        let account = accounts.open_customer_account(customer(number, name, email)).await?;
        println!("  ✓ Customer {} - {}", account.account_number, account.full_name);
    }
    println!();

    let engine = PostingEngine::with_config(storage.clone(), balances, LoggingNotifier, config.clone());

    // 2. Postings
    println!("💰 Posting...\n");
    let steps = [
        ("Deposit 100 to 1000000001", engine
            .deposit(&PostingRequest::new("1000000001", "GL-100", BigDecimal::from(100), "Cash deposit"))
            .await?),
        ("Deposit 600 to 1000000001", engine
            .deposit(&PostingRequest::new("1000000001", "GL-100", BigDecimal::from(600), "Too large"))
            .await?),
        ("Withdraw 30 from 1000000001", engine
            .withdraw(&PostingRequest::new("1000000001", "GL-100", BigDecimal::from(30), "ATM"))
            .await?),
        ("Transfer 40 to 1000000002", engine
            .transfer(&TransferRequest::new("1000000001", "1000000002", BigDecimal::from(40)))
            .await?),
        ("Withdraw 500 from 1000000002", engine
            .withdraw(&PostingRequest::new("1000000002", "GL-100", BigDecimal::from(500), "ATM"))
            .await?),
    ];
    for (label, response) in &steps {
        let mark = if response.status { "✓" } else { "✗" };
        println!("  {} {}: {}", mark, label, response.message);
        for error in &response.errors {
            println!("      - {}", error);
        }
    }
    println!();

    // 3. Balances
    println!("📈 Balances:");
    for number in ["1000000001", "1000000002"] {
        let account = accounts.customer_account_required(number).await?;
        println!("  {} {:>10}", account.account_number, account.balance);
        if let Some(ledger) = accounts.balance_ledger(number).await? {
            println!(
                "      available {} | withdrawable {} | ledger {}",
                ledger.available_balance, ledger.withdrawable_balance, ledger.ledger_balance
            );
        }
    }
    if let Some(gl) = accounts.gl_account("GL-100").await? {
        println!("  {} {:>10}", gl.account_number, gl.balance);
    }
    println!();

    // 4. Listing
    println!("📋 Postings (page 1):");
    let listing = PostingListing::with_config(storage, &config);
    let page = listing.list_postings(1, 10, None).await?;
    println!("  total: {}", page.total_postings);
    for (label, count) in &page.total_postings_by_type {
        println!("  {}: {}", label, count);
    }
    for record in &page.filtered_postings {
        println!(
            "  {} {} {} -> {} ({})",
            record.date_posted.format("%Y-%m-%d %H:%M:%S"),
            record.transaction_type,
            record.amount,
            record.customer_account_number,
            record.narration
        );
    }

    Ok(())
}
