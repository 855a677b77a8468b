//! Monthly paystub quota and loyalty rewards.
//!
//! The tracker only moves the counter; when a month rolls over is decided by
//! the billing collaborator, which sends [`BillingEvent::ResetUsage`].

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Account, PaystubLimit, RewardTier};

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum QuotaError {
    #[error("monthly paystub limit reached ({used}/{limit})")]
    Exceeded { limit: u32, used: u32 },
}

/// Plan changes pushed by the external billing system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingEvent {
    SetLimit(PaystubLimit),
    ResetUsage,
}

/// Points per paystub and the lifetime-point thresholds for each tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardsConfig {
    pub points_per_paystub: u64,
    pub silver_threshold: u64,
    pub gold_threshold: u64,
    pub platinum_threshold: u64,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            points_per_paystub: 10,
            silver_threshold: 1000,
            gold_threshold: 5000,
            platinum_threshold: 10000,
        }
    }
}

impl RewardsConfig {
    pub fn tier_for(&self, lifetime_points: u64) -> RewardTier {
        if lifetime_points >= self.platinum_threshold {
            RewardTier::Platinum
        } else if lifetime_points >= self.gold_threshold {
            RewardTier::Gold
        } else if lifetime_points >= self.silver_threshold {
            RewardTier::Silver
        } else {
            RewardTier::Bronze
        }
    }
}

/// # Errors
///
/// [`QuotaError::Exceeded`] when a limited plan has used its allowance.
pub fn check(account: &Account) -> Result<(), QuotaError> {
    match account.paystub_limit {
        PaystubLimit::Monthly(limit) if account.paystubs_used_this_month >= limit => {
            Err(QuotaError::Exceeded {
                limit,
                used: account.paystubs_used_this_month,
            })
        }
        _ => Ok(()),
    }
}

pub fn record_generation(account: &mut Account) {
    account.paystubs_used_this_month = account.paystubs_used_this_month.saturating_add(1);
}

/// Gives back one paystub of allowance, never going below zero.
pub fn record_void(account: &mut Account) {
    account.paystubs_used_this_month = account.paystubs_used_this_month.saturating_sub(1);
}

pub fn apply_billing_event(account: &mut Account, event: BillingEvent) {
    match event {
        BillingEvent::SetLimit(limit) => account.paystub_limit = limit,
        BillingEvent::ResetUsage => account.paystubs_used_this_month = 0,
    }
}

/// Credits the per-paystub points and promotes the tier if lifetime points
/// crossed a threshold. Tiers never move down.
pub fn award_paystub_points(account: &mut Account, rewards: &RewardsConfig) {
    account.reward_points = account.reward_points.saturating_add(rewards.points_per_paystub);
    account.lifetime_points = account
        .lifetime_points
        .saturating_add(rewards.points_per_paystub);
    account.reward_tier = account
        .reward_tier
        .max(rewards.tier_for(account.lifetime_points));
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::NewAccount;

    fn account(limit: PaystubLimit, used: u32) -> Account {
        let mut account = Account::from_new(
            1,
            NewAccount {
                company_name: "Acme Payroll".to_string(),
                paystub_limit: limit,
            },
            Utc::now(),
        );
        account.paystubs_used_this_month = used;
        account
    }

    #[test]
    fn check_rejects_when_limit_reached() {
        let account = account(PaystubLimit::Monthly(10), 10);

        assert_eq!(
            check(&account),
            Err(QuotaError::Exceeded { limit: 10, used: 10 })
        );
    }

    #[test]
    fn check_allows_below_limit_and_unlimited() {
        assert_eq!(check(&account(PaystubLimit::Monthly(10), 9)), Ok(()));
        assert_eq!(check(&account(PaystubLimit::Unlimited, 5000)), Ok(()));
    }

    #[test]
    fn void_frees_one_slot() {
        let mut account = account(PaystubLimit::Monthly(10), 10);

        record_void(&mut account);

        assert_eq!(account.paystubs_used_this_month, 9);
        assert_eq!(check(&account), Ok(()));
    }

    #[test]
    fn void_saturates_at_zero() {
        let mut account = account(PaystubLimit::Monthly(10), 0);

        record_void(&mut account);

        assert_eq!(account.paystubs_used_this_month, 0);
    }

    #[test]
    fn billing_events_update_plan_state() {
        let mut account = account(PaystubLimit::Monthly(10), 7);

        apply_billing_event(&mut account, BillingEvent::SetLimit(PaystubLimit::Unlimited));
        apply_billing_event(&mut account, BillingEvent::ResetUsage);

        assert_eq!(account.paystub_limit, PaystubLimit::Unlimited);
        assert_eq!(account.paystubs_used_this_month, 0);
    }

    #[test]
    fn points_promote_tier_at_thresholds() {
        let mut account = account(PaystubLimit::Unlimited, 0);
        account.lifetime_points = 990;

        award_paystub_points(&mut account, &RewardsConfig::default());

        assert_eq!(account.reward_points, 10);
        assert_eq!(account.lifetime_points, 1000);
        assert_eq!(account.reward_tier, RewardTier::Silver);
    }

    #[test]
    fn default_thresholds() {
        let rewards = RewardsConfig::default();

        assert_eq!(rewards.tier_for(999), RewardTier::Bronze);
        assert_eq!(rewards.tier_for(4999), RewardTier::Silver);
        assert_eq!(rewards.tier_for(5000), RewardTier::Gold);
        assert_eq!(rewards.tier_for(9999), RewardTier::Gold);
        assert_eq!(rewards.tier_for(10000), RewardTier::Platinum);
    }

    #[test]
    fn tier_never_downgrades() {
        let mut account = account(PaystubLimit::Unlimited, 0);
        account.reward_tier = RewardTier::Gold;

        award_paystub_points(&mut account, &RewardsConfig::default());

        assert_eq!(account.reward_tier, RewardTier::Gold);
    }
}
