//! Receipt rendering

use chrono::NaiveDateTime;

use crate::types::CustomerAccount;

/// HTML receipt body for a customer after a posting
pub fn render_receipt(customer: &CustomerAccount, posted_at: NaiveDateTime) -> String {
    let name = escape_html(&customer.full_name);
    format!(
        r#"<h1>Transaction Receipt</h1>
<p>Dear {name},</p>
<p>Your transaction was successful. Below is the receipt of your transaction.</p>
<p>Thank you for banking with us.</p>
<p>Best regards,</p>
<p>Banking Team</p>
<br>
<br>
<table>
    <thead>
        <tr>
            <th>Account Number</th>
            <th>Full Name</th>
            <th>Balance</th>
            <th>Branch</th>
            <th>Date</th>
        </tr>
    </thead>
    <tbody>
        <tr>
            <td>{account_number}</td>
            <td>{name}</td>
            <td>{balance}</td>
            <td>{branch}</td>
            <td>{date}</td>
        </tr>
    </tbody>
</table>"#,
        name = name,
        account_number = escape_html(&customer.account_number),
        balance = customer.balance,
        branch = escape_html(&customer.branch),
        date = posted_at.format("%Y-%m-%d %H:%M:%S"),
    )
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CustomerAccountType, NewCustomerAccount};
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;

    #[test]
    fn test_receipt_contains_customer_snapshot() {
        let mut customer = CustomerAccount::new(NewCustomerAccount {
            account_number: "1000000001".to_string(),
            full_name: "Ada <Admin> Obi".to_string(),
            account_type: CustomerAccountType::Savings,
            branch: "Lekki".to_string(),
            email: "ada@example.com".to_string(),
            phone_number: "08000000000".to_string(),
            gender: "Female".to_string(),
            address: "1 Marina".to_string(),
            state: "Lagos".to_string(),
        });
        customer.adjust_balance(&BigDecimal::from(150));

        let posted_at = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let html = render_receipt(&customer, posted_at);

        assert!(html.contains("<td>1000000001</td>"));
        assert!(html.contains("<td>150</td>"));
        assert!(html.contains("<td>Lekki</td>"));
        assert!(html.contains("2024-03-01 09:30:00"));
        assert!(html.contains("Dear Ada &lt;Admin&gt; Obi,"));
        assert!(!html.contains("<Admin>"));
    }
}
