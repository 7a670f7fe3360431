//! Account management functionality

use bigdecimal::BigDecimal;

use crate::traits::*;
use crate::types::*;

/// Account manager over a [`LedgerStore`]
pub struct AccountManager<S: LedgerStore> {
    storage: S,
    validator: Box<dyn AccountValidator>,
}

impl<S: LedgerStore> AccountManager<S> {
    /// Create a new account manager
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            validator: Box::new(DefaultAccountValidator),
        }
    }

    /// Create a new account manager with custom validator
    pub fn with_validator(storage: S, validator: Box<dyn AccountValidator>) -> Self {
        Self { storage, validator }
    }

    /// Open a customer account together with its zeroed balance ledger
    pub async fn open_customer_account(
        &self,
        details: NewCustomerAccount,
    ) -> PostingResult<CustomerAccount> {
        self.validator.validate_customer_account(&details)?;

        let mut unit = self.storage.begin().await?;

        if unit
            .find_customer_account(&details.account_number)
            .await?
            .is_some()
        {
            unit.rollback().await?;
            return Err(PostingError::Validation(format!(
                "Account with number '{}' already exists",
                details.account_number
            )));
        }

        let account = CustomerAccount::new(details);
        let ledger = BalanceLedger::new(account.account_number.clone());

        unit.save_customer_account(&account).await?;
        unit.save_balance_ledger(&ledger).await?;
        unit.commit().await?;

        tracing::info!(account_number = %account.account_number, "customer account opened");
        Ok(account)
    }

    /// Open a GL account with an opening balance
    pub async fn open_gl_account(
        &self,
        account_number: impl Into<String>,
        account_name: impl Into<String>,
        opening_balance: BigDecimal,
    ) -> PostingResult<GlAccount> {
        let account_number = account_number.into();
        let account_name = account_name.into();
        self.validator
            .validate_gl_account(&account_number, &account_name)?;

        let mut unit = self.storage.begin().await?;

        if unit.find_gl_account(&account_number).await?.is_some() {
            unit.rollback().await?;
            return Err(PostingError::Validation(format!(
                "GL account with number '{}' already exists",
                account_number
            )));
        }

        let account = GlAccount::new(account_number, account_name, opening_balance);
        unit.save_gl_account(&account).await?;
        unit.commit().await?;

        tracing::info!(account_number = %account.account_number, "GL account opened");
        Ok(account)
    }

    /// Get a customer account by number
    pub async fn customer_account(
        &self,
        account_number: &str,
    ) -> PostingResult<Option<CustomerAccount>> {
        let mut unit = self.storage.begin().await?;
        let account = unit.find_customer_account(account_number).await?;
        unit.rollback().await?;
        Ok(account)
    }

    /// Get a customer account by number, returning an error if not found
    pub async fn customer_account_required(
        &self,
        account_number: &str,
    ) -> PostingResult<CustomerAccount> {
        self.customer_account(account_number)
            .await?
            .ok_or_else(|| PostingError::AccountNotFound(account_number.to_string()))
    }

    /// Get a GL account by number
    pub async fn gl_account(&self, account_number: &str) -> PostingResult<Option<GlAccount>> {
        let mut unit = self.storage.begin().await?;
        let account = unit.find_gl_account(account_number).await?;
        unit.rollback().await?;
        Ok(account)
    }

    /// Get the balance ledger of a customer account
    pub async fn balance_ledger(&self, account_number: &str) -> PostingResult<Option<BalanceLedger>> {
        let mut unit = self.storage.begin().await?;
        let ledger = unit.find_balance_ledger(account_number).await?;
        unit.rollback().await?;
        Ok(ledger)
    }

    /// Mark a customer account inactive. Accounts are never deleted.
    pub async fn deactivate_customer_account(
        &self,
        account_number: &str,
    ) -> PostingResult<CustomerAccount> {
        let mut unit = self.storage.begin().await?;

        let Some(mut account) = unit.find_customer_account(account_number).await? else {
            unit.rollback().await?;
            return Err(PostingError::AccountNotFound(account_number.to_string()));
        };

        account.status = AccountStatus::Inactive;
        account.updated_at = chrono::Utc::now().naive_utc();
        unit.save_customer_account(&account).await?;
        unit.commit().await?;

        account.version += 1;
        tracing::info!(account_number, "customer account deactivated");
        Ok(account)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_storage::MemoryStorage;

    fn details(account_number: &str) -> NewCustomerAccount {
        NewCustomerAccount {
            account_number: account_number.to_string(),
            full_name: "Chidi Okafor".to_string(),
            account_type: CustomerAccountType::Current,
            branch: "Ikeja".to_string(),
            email: "chidi@example.com".to_string(),
            phone_number: "08011111111".to_string(),
            gender: "Male".to_string(),
            address: "4 Allen Avenue".to_string(),
            state: "Lagos".to_string(),
        }
    }

    #[tokio::test]
    async fn test_open_customer_account_creates_balance_ledger() {
        let storage = MemoryStorage::new();
        let manager = AccountManager::new(storage.clone());

        let account = manager
            .open_customer_account(details("2000000001"))
            .await
            .unwrap();
        assert_eq!(account.balance, BigDecimal::from(0));
        assert_eq!(account.status, AccountStatus::Active);

        let ledger = manager.balance_ledger("2000000001").await.unwrap().unwrap();
        assert_eq!(ledger.available_balance, BigDecimal::from(0));
        assert_eq!(ledger.version, 1);

        let stored = storage.customer_account("2000000001").unwrap().unwrap();
        assert_eq!(stored.id, account.id);
    }

    #[tokio::test]
    async fn test_duplicate_account_numbers_are_rejected() {
        let manager = AccountManager::new(MemoryStorage::new());
        manager
            .open_customer_account(details("2000000001"))
            .await
            .unwrap();

        let result = manager.open_customer_account(details("2000000001")).await;
        assert!(matches!(result, Err(PostingError::Validation(_))));

        manager
            .open_gl_account("GL-1", "Vault Cash", BigDecimal::from(10))
            .await
            .unwrap();
        let result = manager
            .open_gl_account("GL-1", "Other", BigDecimal::from(0))
            .await;
        assert!(matches!(result, Err(PostingError::Validation(_))));
    }

    #[tokio::test]
    async fn test_invalid_details_are_rejected() {
        let manager = AccountManager::new(MemoryStorage::new());
        let mut bad = details("2000000001");
        bad.full_name = "  ".to_string();
        assert!(matches!(
            manager.open_customer_account(bad).await,
            Err(PostingError::Validation(_))
        ));
        assert!(manager.customer_account("2000000001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deactivate_keeps_account() {
        let manager = AccountManager::new(MemoryStorage::new());
        manager
            .open_customer_account(details("2000000001"))
            .await
            .unwrap();

        let account = manager
            .deactivate_customer_account("2000000001")
            .await
            .unwrap();
        assert_eq!(account.status, AccountStatus::Inactive);

        let stored = manager
            .customer_account_required("2000000001")
            .await
            .unwrap();
        assert_eq!(stored.status, AccountStatus::Inactive);
        assert_eq!(stored.version, 2);

        assert!(matches!(
            manager.deactivate_customer_account("missing").await,
            Err(PostingError::AccountNotFound(_))
        ));
    }

    /// Accepts legacy underscore numbers and only `GL-` ledger numbers
    struct LegacyNumberValidator;

    impl AccountValidator for LegacyNumberValidator {
        fn validate_customer_account(&self, account: &NewCustomerAccount) -> PostingResult<()> {
            if account.account_number.starts_with("ACC_") {
                Ok(())
            } else {
                Err(PostingError::Validation("Expected an ACC_ number".to_string()))
            }
        }

        fn validate_gl_account(&self, account_number: &str, _account_name: &str) -> PostingResult<()> {
            if account_number.starts_with("GL-") {
                Ok(())
            } else {
                Err(PostingError::Validation("Expected a GL- number".to_string()))
            }
        }
    }

    #[tokio::test]
    async fn test_custom_validator_replaces_default_rules() {
        let manager =
            AccountManager::with_validator(MemoryStorage::new(), Box::new(LegacyNumberValidator));

        let account = manager
            .open_customer_account(details("ACC_001"))
            .await
            .unwrap();
        assert_eq!(account.account_number, "ACC_001");
        assert!(matches!(
            manager.open_customer_account(details("2000000001")).await,
            Err(PostingError::Validation(_))
        ));

        assert!(manager
            .open_gl_account("GL-7", "Vault", BigDecimal::from(0))
            .await
            .is_ok());
        assert!(matches!(
            manager.open_gl_account("7", "Vault", BigDecimal::from(0)).await,
            Err(PostingError::Validation(_))
        ));
    }
}
