//! Validation utilities

use crate::types::*;
use bigdecimal::BigDecimal;

/// Fractional digits allowed in a posted amount
pub const MINOR_UNIT_SCALE: i64 = 2;

/// Validate that an amount is positive
pub fn validate_positive_amount(amount: &BigDecimal) -> PostingResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(PostingError::Validation(
            "Amount must be positive".to_string(),
        ))
    } else {
        Ok(())
    }
}

/// Validate that an amount has no more than minor-unit precision
pub fn validate_minor_units(amount: &BigDecimal) -> PostingResult<()> {
    let normalized = amount.normalized();
    let (_, scale) = normalized.as_bigint_and_exponent();
    if scale > MINOR_UNIT_SCALE {
        return Err(PostingError::Validation(format!(
            "Amount cannot have more than {} decimal places",
            MINOR_UNIT_SCALE
        )));
    }
    Ok(())
}

/// Validate that an account number is valid
pub fn validate_account_number(account_number: &str) -> PostingResult<()> {
    if account_number.trim().is_empty() {
        return Err(PostingError::Validation(
            "Account number cannot be empty".to_string(),
        ));
    }

    if account_number.len() > 20 {
        return Err(PostingError::Validation(
            "Account number cannot exceed 20 characters".to_string(),
        ));
    }

    if !account_number
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(PostingError::Validation(
            "Account number can only contain letters, digits and dashes".to_string(),
        ));
    }

    Ok(())
}

/// Validate that an account name is valid
pub fn validate_account_name(name: &str) -> PostingResult<()> {
    if name.trim().is_empty() {
        return Err(PostingError::Validation(
            "Account name cannot be empty".to_string(),
        ));
    }

    if name.len() > 100 {
        return Err(PostingError::Validation(
            "Account name cannot exceed 100 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate that a narration is within bounds. Empty narrations are allowed.
pub fn validate_narration(narration: &str) -> PostingResult<()> {
    if narration.len() > 500 {
        return Err(PostingError::Validation(
            "Narration cannot exceed 500 characters".to_string(),
        ));
    }

    Ok(())
}

/// Validate an account number named in a posting request.
///
/// Only emptiness is checked here; the format rules of
/// [`validate_account_number`] apply when accounts are opened, and an unknown
/// number surfaces as not found at lookup.
pub fn validate_account_reference(account_number: &str) -> PostingResult<()> {
    if account_number.trim().is_empty() {
        return Err(PostingError::Validation(
            "Account number cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validate a deposit or withdrawal request
pub fn validate_posting_request(request: &PostingRequest) -> PostingResult<()> {
    validate_account_reference(&request.customer_account_number)?;
    validate_account_reference(&request.ledger_account_number)?;
    validate_positive_amount(&request.amount)?;
    validate_minor_units(&request.amount)?;
    validate_narration(&request.narration)
}

/// Validate a transfer request
pub fn validate_transfer_request(request: &TransferRequest) -> PostingResult<()> {
    validate_account_reference(&request.sender_account_number)?;
    validate_account_reference(&request.receiver_account_number)?;
    validate_positive_amount(&request.amount)?;
    validate_minor_units(&request.amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn amount(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    #[test]
    fn test_amount_rules() {
        assert!(validate_positive_amount(&amount("0.01")).is_ok());
        assert!(validate_positive_amount(&amount("0")).is_err());
        assert!(validate_positive_amount(&amount("-5")).is_err());

        assert!(validate_minor_units(&amount("10.25")).is_ok());
        assert!(validate_minor_units(&amount("10.250")).is_ok());
        assert!(validate_minor_units(&amount("100")).is_ok());
        assert!(validate_minor_units(&amount("10.255")).is_err());
    }

    #[test]
    fn test_account_number_rules() {
        assert!(validate_account_number("0123456789").is_ok());
        assert!(validate_account_number("GL-1001").is_ok());
        assert!(validate_account_number("   ").is_err());
        assert!(validate_account_number("12 34").is_err());
        assert!(validate_account_number(&"9".repeat(21)).is_err());
    }

    #[test]
    fn test_requests_only_require_account_references() {
        let request = PostingRequest::new("ACC_001", "GL 100", amount("10"), "");
        assert!(validate_posting_request(&request).is_ok());
        assert!(validate_account_number("ACC_001").is_err());

        let request = PostingRequest::new(" ", "G1", amount("10"), "");
        assert_eq!(
            validate_posting_request(&request),
            Err(PostingError::Validation(
                "Account number cannot be empty".to_string()
            ))
        );

        let request = TransferRequest::new("C1", "", amount("10"));
        assert!(validate_transfer_request(&request).is_err());
        let request = TransferRequest::new("C1", "C1", amount("10.001"));
        assert!(validate_transfer_request(&request).is_err());
    }
}
