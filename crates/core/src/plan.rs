//! # Plan Module
//!
//! Defines the closed set of survey plans (Regular, Vip, Vvip).
//! Each plan carries a fixed survey threshold, total earning, activation fee
//! and withdrawal fee. The tables live here as exhaustive matches so an
//! unknown plan code is a compile-time concern, never a runtime lookup miss.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A survey plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Entry tier
    Regular,
    /// Mid tier
    Vip,
    /// Top tier - zero withdrawal fee
    Vvip,
}

impl Plan {
    /// Code string for DB storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Regular => "regular",
            Plan::Vip => "vip",
            Plan::Vvip => "vvip",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "regular" => Some(Plan::Regular),
            "vip" => Some(Plan::Vip),
            "vvip" => Some(Plan::Vvip),
            _ => None,
        }
    }

    /// All plan tiers, lowest first
    pub fn all() -> Vec<Plan> {
        vec![Plan::Regular, Plan::Vip, Plan::Vvip]
    }

    /// Total credited to `total_earned` when the survey batch completes
    pub fn total_earning(&self) -> Decimal {
        match self {
            Plan::Regular => Decimal::new(1500, 0),
            Plan::Vip => Decimal::new(2000, 0),
            Plan::Vvip => Decimal::new(3000, 0),
        }
    }

    /// One-time activation fee, paid out-of-band and verified by an operator
    pub fn activation_fee(&self) -> Decimal {
        match self {
            Plan::Regular => Decimal::new(100, 0),
            Plan::Vip => Decimal::new(150, 0),
            Plan::Vvip => Decimal::new(200, 0),
        }
    }

    /// Fee deducted from a normal withdrawal
    pub fn withdraw_fee(&self) -> Decimal {
        match self {
            Plan::Regular => Decimal::new(10, 0),
            Plan::Vip => Decimal::new(5, 0),
            Plan::Vvip => Decimal::ZERO,
        }
    }

    /// Tier rank for comparing activated plans (higher = better)
    pub fn rank(&self) -> u8 {
        match self {
            Plan::Regular => 0,
            Plan::Vip => 1,
            Plan::Vvip => 2,
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_plan_str_roundtrip() {
        assert_eq!(Plan::Regular.as_str(), "regular");
        assert_eq!(Plan::from_str("VVIP"), Some(Plan::Vvip));
        assert_eq!(Plan::from_str("unknown"), None);
    }

    #[test]
    fn test_plan_tables() {
        assert_eq!(Plan::Regular.total_earning(), dec!(1500));
        assert_eq!(Plan::Vip.total_earning(), dec!(2000));
        assert_eq!(Plan::Vvip.total_earning(), dec!(3000));

        assert_eq!(Plan::Regular.activation_fee(), dec!(100));
        assert_eq!(Plan::Vip.activation_fee(), dec!(150));
        assert_eq!(Plan::Vvip.activation_fee(), dec!(200));

        assert_eq!(Plan::Regular.withdraw_fee(), dec!(10));
        assert_eq!(Plan::Vip.withdraw_fee(), dec!(5));
        assert_eq!(Plan::Vvip.withdraw_fee(), dec!(0));
    }

    #[test]
    fn test_plan_rank_ordering() {
        assert!(Plan::Vvip.rank() > Plan::Vip.rank());
        assert!(Plan::Vip.rank() > Plan::Regular.rank());
    }

    #[test]
    fn test_plan_display() {
        assert_eq!(format!("{}", Plan::Vip), "vip");
    }
}
