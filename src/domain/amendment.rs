//! Admin edits of a loan and its borrower.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use super::activity_log::ChangeSet;
use super::loan::{Loan, LoanStatus};
use super::user::User;
use super::validation::{email_rule, phone_rule};
use crate::errors::{AppError, AppResult};

/// Body of `PUT`/`PATCH /api/admin/loans/{application_number}`.
/// Every field is optional; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct LoanAmendment {
    #[validate(length(min = 1, max = 80, message = "Username must be 1-80 characters"))]
    pub username: Option<String>,
    #[validate(custom(function = "email_rule"))]
    pub email: Option<String>,
    #[validate(custom(function = "phone_rule"))]
    pub phone_number: Option<String>,
    pub national_id: Option<String>,
    pub address: Option<String>,
    #[serde(alias = "amount")]
    #[validate(range(exclusive_min = 0.0, message = "Loan amount must be greater than zero"))]
    pub loan_amount: Option<f64>,
    #[validate(range(min = 0.0, message = "Interest rate cannot be negative"))]
    pub interest_rate: Option<f64>,
    #[serde(alias = "termMonths")]
    #[validate(range(min = 1, max = 360, message = "Loan term must be between 1 and 360 months"))]
    pub term_months: Option<i32>,
    pub purpose: Option<String>,
    pub employment_status: Option<String>,
    pub employer: Option<String>,
    pub employment_duration: Option<String>,
    pub monthly_income: Option<f64>,
    pub bank_name: Option<String>,
    pub account_name: Option<String>,
    pub account_number: Option<String>,
    #[schema(example = "under_review")]
    pub status: Option<String>,
}

fn trimmed(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string())
}

fn present(value: Option<String>) -> Option<Option<String>> {
    trimmed(value).map(Some)
}

impl LoanAmendment {
    /// Apply the edit in place and describe what changed.
    ///
    /// A status edit bypasses the decision table. Borrower fields need a borrower.
    pub fn apply(
        self,
        loan: &mut Loan,
        borrower: Option<&mut User>,
        now: DateTime<Utc>,
    ) -> AppResult<ChangeSet> {
        let mut changes = ChangeSet::new();

        let touches_borrower =
            self.username.is_some() || self.email.is_some() || self.phone_number.is_some();
        match borrower {
            Some(user) => {
                let mut touched =
                    changes.apply("username", &mut user.username, trimmed(self.username));
                touched |= changes.apply("email", &mut user.email, present(self.email));
                touched |=
                    changes.apply("phone_number", &mut user.phone_number, present(self.phone_number));
                if touched {
                    user.updated_at = now;
                }
            }
            None if touches_borrower => return Err(AppError::NotFound("Customer")),
            None => {}
        }

        changes.apply("national_id", &mut loan.national_id, present(self.national_id));
        changes.apply("address", &mut loan.address, present(self.address));
        changes.apply("loan_amount", &mut loan.loan_amount, self.loan_amount);
        changes.apply("interest_rate", &mut loan.interest_rate, self.interest_rate);
        changes.apply("term_months", &mut loan.term_months, self.term_months);
        changes.apply("purpose", &mut loan.purpose, trimmed(self.purpose));
        changes.apply(
            "employment_status",
            &mut loan.employment_status,
            present(self.employment_status),
        );
        changes.apply("employer", &mut loan.employer, present(self.employer));
        changes.apply(
            "employment_duration",
            &mut loan.employment_duration,
            present(self.employment_duration),
        );
        changes.apply(
            "monthly_income",
            &mut loan.monthly_income,
            self.monthly_income.map(Some),
        );
        changes.apply("bank_name", &mut loan.bank_name, present(self.bank_name));
        changes.apply("account_name", &mut loan.account_name, present(self.account_name));
        changes.apply(
            "account_number",
            &mut loan.account_number,
            present(self.account_number),
        );

        if let Some(raw) = self.status {
            let target: LoanStatus = raw.parse()?;
            if target != loan.status {
                let from = loan.status;
                let approval_stamped = loan.override_status(target, now)?;
                changes.note(format!("Status changed from {} to {}", from, target));
                if approval_stamped {
                    changes.note("Approval date set");
                }
            }
        }

        if changes.is_empty() {
            return Err(AppError::validation("No changes provided"));
        }
        loan.updated_at = now;
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountStatus, LoanApplication, UserRole};
    use serde_json::json;
    use uuid::Uuid;

    fn fixtures() -> (Loan, User) {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: "bob".into(),
            email: None,
            phone_number: Some("+15551234567".into()),
            password_hash: "hash".into(),
            role: UserRole::User,
            account_status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
        };
        let application =
            LoanApplication::from_payload(&json!({"amount": 150000, "termMonths": 24})).unwrap();
        (Loan::submit(user.id, application, now), user)
    }

    #[test]
    fn test_describes_every_changed_field() {
        let (mut loan, mut user) = fixtures();
        let amendment = LoanAmendment {
            username: Some("robert".into()),
            loan_amount: Some(200000.0),
            bank_name: Some("BDO".into()),
            purpose: Some("Personal Loan".into()),
            ..Default::default()
        };

        let changes = amendment.apply(&mut loan, Some(&mut user), Utc::now()).unwrap();

        assert_eq!(
            changes.describe(),
            "username changed from bob to robert | loan_amount changed from 150000 to 200000 | bank_name changed from none to BDO"
        );
        assert_eq!(user.username, "robert");
        assert_eq!(loan.loan_amount, 200000.0);
    }

    #[test]
    fn test_status_edit_bypasses_decision_table() {
        let (mut loan, mut user) = fixtures();
        loan.status = LoanStatus::Rejected;
        let amendment = LoanAmendment {
            status: Some("approved".into()),
            ..Default::default()
        };

        let changes = amendment.apply(&mut loan, Some(&mut user), Utc::now()).unwrap();

        assert_eq!(loan.status, LoanStatus::Approved);
        assert!(loan.approval_date.is_some());
        assert!(loan.due_date.is_some());
        assert_eq!(
            changes.describe(),
            "Status changed from rejected to approved | Approval date set"
        );
    }

    #[test]
    fn test_unchanged_request_is_rejected() {
        let (mut loan, mut user) = fixtures();
        let amendment = LoanAmendment {
            username: Some("bob".into()),
            status: Some("pending".into()),
            ..Default::default()
        };

        let err = amendment
            .apply(&mut loan, Some(&mut user), Utc::now())
            .unwrap_err();
        assert_eq!(err.to_string(), "No changes provided");
    }

    #[test]
    fn test_status_edit_cannot_delete() {
        let (mut loan, _) = fixtures();
        let amendment = LoanAmendment {
            status: Some("deleted".into()),
            ..Default::default()
        };
        assert!(matches!(
            amendment.apply(&mut loan, None, Utc::now()),
            Err(AppError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_borrower_fields_need_a_borrower() {
        let (mut loan, _) = fixtures();
        let amendment = LoanAmendment {
            email: Some("bob@example.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            amendment.apply(&mut loan, None, Utc::now()),
            Err(AppError::NotFound("Customer"))
        ));
    }
}
