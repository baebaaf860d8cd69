//! Display helpers for transaction surfaces
//!
//! Data-side formatting used by list views: email masking and the fixed
//! display-rate conversion for USD-denominated rows.

use ledger_core::Currency;
use rust_decimal::Decimal;

/// Mask an email address for display in transaction tables.
///
/// `abcdef@gmail.com` becomes `abc***@gm...m.com`-style output; strings
/// without an `@` pass through unchanged.
pub fn mask_email(email: &str) -> String {
    let Some((local, domain)) = email.split_once('@') else {
        return email.to_string();
    };

    let masked_local = if local.len() > 3 {
        format!("{}***", &local[..3])
    } else {
        format!("{}***", local)
    };

    let masked_domain = match domain.rsplit_once('.') {
        Some((main, tld)) => {
            let masked_main = if main.len() > 3 {
                format!("{}...{}", &main[..2], &main[main.len() - 1..])
            } else {
                main.to_string()
            };
            format!("{}.{}", masked_main, tld)
        }
        None => {
            if domain.len() > 4 {
                format!("{}...{}", &domain[..2], &domain[domain.len() - 2..])
            } else {
                domain.to_string()
            }
        }
    };

    format!("{}@{}", masked_local, masked_domain)
}

/// Convert an amount to display currency using the fixed display rate.
///
/// Only USD rows are multiplied; everything else passes through.
pub fn to_display_currency(amount: Decimal, currency: Currency, rate: Decimal) -> Decimal {
    if currency == Currency::USD {
        amount * rate
    } else {
        amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_mask_email_long_parts() {
        assert_eq!(mask_email("abcdef@gmail.com"), "abc***@gm...l.com");
    }

    #[test]
    fn test_mask_email_short_local() {
        assert_eq!(mask_email("ab@go.ng"), "ab***@go.ng");
    }

    #[test]
    fn test_mask_email_without_at_passes_through() {
        assert_eq!(mask_email("not-an-email"), "not-an-email");
    }

    #[test]
    fn test_display_currency_only_converts_usd() {
        assert_eq!(
            to_display_currency(dec!(10.00), Currency::USD, dec!(1500)),
            dec!(15000.00)
        );
        assert_eq!(
            to_display_currency(dec!(10.00), Currency::NGN, dec!(1500)),
            dec!(10.00)
        );
    }
}
