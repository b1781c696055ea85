//! One-time passwords issued by admins to borrowers.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::config::{DEFAULT_OTP_LENGTH, OTP_LENGTHS};
use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Otp {
    pub id: Uuid,
    pub user_id: Uuid,
    pub otp_code: String,
    pub created_at: DateTime<Utc>,
}

impl Otp {
    /// Issue a random numeric code of `length` digits.
    pub fn issue(user_id: Uuid, length: usize, now: DateTime<Utc>) -> AppResult<Self> {
        if !OTP_LENGTHS.contains(&length) {
            return Err(AppError::validation("OTP length must be 6, 8, or 10 digits"));
        }
        let mut rng = rand::thread_rng();
        let otp_code = (0..length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();

        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            otp_code,
            created_at: now,
        })
    }
}

pub fn is_valid_otp_code(code: &str) -> bool {
    OTP_LENGTHS.contains(&code.len()) && code.chars().all(|c| c.is_ascii_digit())
}

/// Admin request to issue a code for a customer
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct GenerateOtpRequest {
    pub customer_id: Uuid,
    /// 6, 8 or 10 digits; defaults to 6
    #[schema(example = 6)]
    pub otp_length: Option<usize>,
}

impl GenerateOtpRequest {
    pub fn length(&self) -> usize {
        self.otp_length.unwrap_or(DEFAULT_OTP_LENGTH)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OtpResponse {
    #[schema(example = "482913")]
    pub otp_code: String,
}
