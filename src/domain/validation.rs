//! Request validators.
//!
//! Each validator inspects a request-shaped value and returns either nothing
//! or the first human-readable problem it found. Malformed input never panics.
//!
//! `validate_email` only checks for an `@` and a `.`. This is a known weak
//! check kept for compatibility with existing admin accounts.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use validator::ValidationError;

use crate::config::{MAX_LOAN_TERM_MONTHS, MIN_PASSWORD_LENGTH, PASSWORD_SYMBOLS};

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]{10,15}$").expect("phone pattern compiles"));

/// Loan term keys accepted on loan payloads, in lookup order.
pub const TERM_KEYS: &[&str] = &["termMonths", "term_months"];

/// OTP keys accepted on withdrawal payloads, in lookup order.
pub const OTP_KEYS: &[&str] = &["otp-code", "otp_code"];

pub fn validate_phone(phone: &str) -> bool {
    PHONE_PATTERN.is_match(phone)
}

/// Returns the message of the first password rule that fails.
pub fn validate_password(password: &str) -> Option<String> {
    if password.is_empty() {
        return Some("Password is required".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Some(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Some("Password must contain at least one uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Some("Password must contain at least one lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Some("Password must contain at least one number".to_string());
    }
    if !password.chars().any(|c| PASSWORD_SYMBOLS.contains(c)) {
        return Some("Password must contain at least one special character".to_string());
    }
    None
}

pub fn validate_email(email: &str) -> bool {
    email.contains('@') && email.contains('.')
}

pub fn validate_loan_request(payload: &Value) -> Option<String> {
    let Some(amount) = field(payload, &["amount"]) else {
        return Some("Loan amount is required".to_string());
    };
    let Some(term) = field(payload, TERM_KEYS) else {
        return Some("Loan term is required".to_string());
    };

    match as_number(amount) {
        Some(value) if value <= 0.0 => {
            return Some("Loan amount must be greater than zero".to_string())
        }
        Some(_) => {}
        None => return Some("Invalid loan amount".to_string()),
    }

    match as_integer(term) {
        Some(months) if months <= 0 => {
            return Some("Loan term must be greater than zero".to_string())
        }
        Some(months) if months > MAX_LOAN_TERM_MONTHS => {
            return Some("Loan term cannot exceed 360 months (30 years)".to_string())
        }
        Some(_) => {}
        None => return Some("Invalid loan term".to_string()),
    }

    if let Some(rate) = field(payload, &["interest_rate"]) {
        match as_number(rate) {
            Some(value) if value == 4.0 => {
                return Some("Interest rate cannot be exactly 4%".to_string())
            }
            Some(_) => {}
            None => return Some("Invalid interest rate".to_string()),
        }
    }

    None
}

pub fn validate_withdrawal_request(payload: &Value) -> Option<String> {
    let Some(amount) = field(payload, &["amount"]) else {
        return Some("Withdrawal amount is required".to_string());
    };

    match as_number(amount) {
        Some(value) if value <= 0.0 => return Some("Amount must be greater than zero".to_string()),
        Some(_) => {}
        None => return Some("Invalid amount format".to_string()),
    }

    if field(payload, OTP_KEYS).is_none() {
        return Some("One time password (OTP) is required".to_string());
    }

    None
}

/// First present value under any of `keys`. Null and blank strings count as absent.
pub fn field<'a>(payload: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| payload.get(*key))
        .find(|value| match value {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            _ => true,
        })
}

/// Numeric value of a JSON number or numeric string.
pub fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Integral value of a JSON integer, integral float or integer string.
pub fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Trimmed string value; numbers are rendered as text.
pub fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// =============================================================================
// `validator` adapters for typed request bodies
// =============================================================================

fn rule_error(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

pub fn phone_rule(phone: &str) -> Result<(), ValidationError> {
    if validate_phone(phone) {
        Ok(())
    } else {
        Err(rule_error("phone", "Invalid phone number format"))
    }
}

pub fn password_rule(password: &str) -> Result<(), ValidationError> {
    match validate_password(password) {
        None => Ok(()),
        Some(message) => Err(rule_error("password", message)),
    }
}

pub fn email_rule(email: &str) -> Result<(), ValidationError> {
    if validate_email(email) {
        Ok(())
    } else {
        Err(rule_error("email", "Invalid email format"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_phone_format() {
        assert!(validate_phone("+15551234567"));
        assert!(validate_phone("09171234567"));
        assert!(!validate_phone("555-1234"));
        assert!(!validate_phone("+1555123456789012"));
        assert!(!validate_phone("+1555abc4567"));
    }

    #[test]
    fn test_password_accepts_all_classes() {
        assert_eq!(validate_password("Abcd1234!"), None);
    }

    #[test]
    fn test_password_reports_first_failing_rule() {
        let cases = [
            ("", "Password is required"),
            ("Ab1!", "Password must be at least 8 characters long"),
            ("abcd1234!", "Password must contain at least one uppercase letter"),
            ("ABCD1234!", "Password must contain at least one lowercase letter"),
            ("Abcdefgh!", "Password must contain at least one number"),
            ("Abcd12345", "Password must contain at least one special character"),
        ];
        for (password, expected) in cases {
            assert_eq!(validate_password(password).as_deref(), Some(expected), "{password}");
        }
    }

    #[test]
    fn test_email_is_weak_check() {
        assert!(validate_email("ops@lender.ph"));
        assert!(validate_email("a@b."));
        assert!(!validate_email("ops.lender.ph"));
        assert!(!validate_email("ops@lender"));
    }

    #[test]
    fn test_loan_request_accepts_valid_payload() {
        assert_eq!(validate_loan_request(&json!({"amount": 150000, "termMonths": 24})), None);
        assert_eq!(
            validate_loan_request(&json!({"amount": "150000", "term_months": "12", "interest_rate": 5.5})),
            None
        );
    }

    #[test]
    fn test_loan_request_rejections() {
        let cases = [
            (json!({"termMonths": 12}), "Loan amount is required"),
            (json!({"amount": 1000}), "Loan term is required"),
            (json!({"amount": 0, "termMonths": 12}), "Loan amount must be greater than zero"),
            (json!({"amount": -5, "termMonths": 12}), "Loan amount must be greater than zero"),
            (json!({"amount": "lots", "termMonths": 12}), "Invalid loan amount"),
            (json!({"amount": 1000, "termMonths": 0}), "Loan term must be greater than zero"),
            (json!({"amount": 1000, "termMonths": 361}), "Loan term cannot exceed 360 months (30 years)"),
            (json!({"amount": 1000, "termMonths": 12.5}), "Invalid loan term"),
            (json!({"amount": 1000, "termMonths": 12, "interest_rate": 4}), "Interest rate cannot be exactly 4%"),
            (json!({"amount": 1000, "termMonths": 12, "interest_rate": "x"}), "Invalid interest rate"),
        ];
        for (payload, expected) in cases {
            assert_eq!(validate_loan_request(&payload).as_deref(), Some(expected), "{payload}");
        }
    }

    #[test]
    fn test_withdrawal_request() {
        assert_eq!(
            validate_withdrawal_request(&json!({"amount": 500, "otp-code": "123456"})),
            None
        );
        assert_eq!(
            validate_withdrawal_request(&json!({"otp-code": "123456"})).as_deref(),
            Some("Withdrawal amount is required")
        );
        assert_eq!(
            validate_withdrawal_request(&json!({"amount": 0, "otp-code": "123456"})).as_deref(),
            Some("Amount must be greater than zero")
        );
        assert_eq!(
            validate_withdrawal_request(&json!({"amount": "abc", "otp-code": "1"})).as_deref(),
            Some("Invalid amount format")
        );
        assert_eq!(
            validate_withdrawal_request(&json!({"amount": 10, "otp-code": "  "})).as_deref(),
            Some("One time password (OTP) is required")
        );
    }

    #[test]
    fn test_non_object_payload_is_reported_not_panicked() {
        assert_eq!(
            validate_loan_request(&json!([1, 2, 3])).as_deref(),
            Some("Loan amount is required")
        );
    }
}
