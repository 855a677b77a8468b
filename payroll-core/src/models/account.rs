use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Monthly paystub allowance granted by the subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaystubLimit {
    Unlimited,
    Monthly(u32),
}

impl PaystubLimit {
    /// Storage encoding: `-1` is unlimited, anything else is the monthly cap.
    pub fn to_sentinel(self) -> i64 {
        match self {
            Self::Unlimited => -1,
            Self::Monthly(n) => i64::from(n),
        }
    }

    pub fn from_sentinel(value: i64) -> Option<Self> {
        match value {
            -1 => Some(Self::Unlimited),
            n => u32::try_from(n).ok().map(Self::Monthly),
        }
    }
}

/// Loyalty tiers, ordered lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardTier {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl RewardTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bronze => "bronze",
            Self::Silver => "silver",
            Self::Gold => "gold",
            Self::Platinum => "platinum",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bronze" => Some(Self::Bronze),
            "silver" => Some(Self::Silver),
            "gold" => Some(Self::Gold),
            "platinum" => Some(Self::Platinum),
            _ => None,
        }
    }
}

impl fmt::Display for RewardTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAccount {
    pub company_name: String,
    pub paystub_limit: PaystubLimit,
}

/// A billed company account with its usage counter and loyalty balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub company_name: String,
    pub paystub_limit: PaystubLimit,
    pub paystubs_used_this_month: u32,
    pub reward_points: u64,
    pub lifetime_points: u64,
    pub reward_tier: RewardTier,
    pub created_at: DateTime<Utc>,
    /// Bumped by the store on every write; a save carrying an older value
    /// is rejected as a conflict.
    #[serde(default)]
    pub version: i64,
}

impl Account {
    pub fn from_new(id: i64, new: NewAccount, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            company_name: new.company_name,
            paystub_limit: new.paystub_limit,
            paystubs_used_this_month: 0,
            reward_points: 0,
            lifetime_points: 0,
            reward_tier: RewardTier::Bronze,
            created_at,
            version: 0,
        }
    }
}
