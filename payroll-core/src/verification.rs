//! Public verification identifiers printed on paystubs.
//!
//! Format: `PS-YYYYMMDD-XXXXXXXX`, the issue date followed by eight
//! uppercase hex digits from a random v4 UUID.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::Paystub;

const PREFIX: &str = "PS";

pub fn new_verification_id(issued_on: NaiveDate) -> String {
    let random = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("{PREFIX}-{}-{}", issued_on.format("%Y%m%d"), &random[..8])
}

/// Shape check only; says nothing about whether the id exists.
pub fn is_well_formed(id: &str) -> bool {
    let mut parts = id.split('-');
    let (Some(prefix), Some(date), Some(suffix), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    prefix == PREFIX
        && NaiveDate::parse_from_str(date, "%Y%m%d").is_ok()
        && date.len() == 8
        && suffix.len() == 8
        && suffix
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerificationStatus {
    Valid,
    Voided {
        voided_at: Option<DateTime<Utc>>,
        reason: Option<String>,
    },
}

/// Answer to a verification lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub paystub: Paystub,
    pub status: VerificationStatus,
}

impl Verification {
    pub fn of(paystub: Paystub) -> Self {
        let status = if paystub.is_voided() {
            VerificationStatus::Voided {
                voided_at: paystub.voided_at,
                reason: paystub.void_reason.clone(),
            }
        } else {
            VerificationStatus::Valid
        };
        Self { paystub, status }
    }

    pub fn is_valid(&self) -> bool {
        self.status == VerificationStatus::Valid
    }
}
