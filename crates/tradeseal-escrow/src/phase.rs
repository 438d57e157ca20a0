//! # Escrow Phases
//!
//! ```text
//! Listed ─purchase─▶ Purchased ─confirm_order─▶ OrderConfirmed ─assign─▶ Bound ─deliver─▶ Delivered
//!                       │                            │                     │
//!                 seller_timeout                bid_timeout         delivery_timeout
//!                       ▼                            ▼                     ▼
//!                    Expired ◀───────────────────────┴─────────────────────┘
//! ```
//!
//! Numeric codes are stable and appear in persisted snapshots.

use serde::{Deserialize, Serialize};
use tradeseal_core::Stage;

use crate::error::EscrowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Listed = 0,
    Purchased = 1,
    OrderConfirmed = 2,
    Bound = 3,
    Delivered = 4,
    Expired = 5,
}

impl Phase {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Expired)
    }

    /// The credential stage a phase belongs to. `Expired` belongs to none.
    pub fn stage(self) -> Option<Stage> {
        match self {
            Self::Listed => Some(Stage::Listing),
            Self::Purchased | Self::OrderConfirmed | Self::Bound => Some(Stage::Purchase),
            Self::Delivered => Some(Stage::Delivery),
            Self::Expired => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Listed => write!(f, "Listed"),
            Self::Purchased => write!(f, "Purchased"),
            Self::OrderConfirmed => write!(f, "OrderConfirmed"),
            Self::Bound => write!(f, "Bound"),
            Self::Delivered => write!(f, "Delivered"),
            Self::Expired => write!(f, "Expired"),
        }
    }
}

/// Operations that move an escrow between phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transition {
    Purchase,
    ConfirmOrder,
    AssignTransporter,
    ConfirmDelivery,
    SellerTimeout,
    BidTimeout,
    DeliveryTimeout,
}

impl Transition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Purchase => "purchase",
            Self::ConfirmOrder => "confirm_order",
            Self::AssignTransporter => "set_transporter",
            Self::ConfirmDelivery => "confirm_delivery",
            Self::SellerTimeout => "seller_timeout",
            Self::BidTimeout => "bid_timeout",
            Self::DeliveryTimeout => "delivery_timeout",
        }
    }
}

/// Validate a transition and return the next phase.
pub fn next_phase(current: Phase, transition: Transition) -> Result<Phase, EscrowError> {
    let next = match (current, transition) {
        (Phase::Listed, Transition::Purchase) => Phase::Purchased,
        (Phase::Purchased, Transition::ConfirmOrder) => Phase::OrderConfirmed,
        (Phase::OrderConfirmed, Transition::AssignTransporter) => Phase::Bound,
        (Phase::Bound, Transition::ConfirmDelivery) => Phase::Delivered,
        (Phase::Purchased, Transition::SellerTimeout) => Phase::Expired,
        (Phase::OrderConfirmed, Transition::BidTimeout) => Phase::Expired,
        (Phase::Bound, Transition::DeliveryTimeout) => Phase::Expired,
        _ => {
            return Err(EscrowError::WrongPhase {
                action: transition.as_str(),
                phase: current,
            })
        }
    };
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path() {
        let mut p = Phase::Listed;
        for t in [
            Transition::Purchase,
            Transition::ConfirmOrder,
            Transition::AssignTransporter,
            Transition::ConfirmDelivery,
        ] {
            p = next_phase(p, t).unwrap();
        }
        assert_eq!(p, Phase::Delivered);
        assert!(p.is_terminal());
    }

    #[test]
    fn timeouts_only_from_their_phase() {
        assert_eq!(
            next_phase(Phase::Purchased, Transition::SellerTimeout).unwrap(),
            Phase::Expired
        );
        assert_eq!(
            next_phase(Phase::OrderConfirmed, Transition::BidTimeout).unwrap(),
            Phase::Expired
        );
        assert_eq!(
            next_phase(Phase::Bound, Transition::DeliveryTimeout).unwrap(),
            Phase::Expired
        );
        assert!(next_phase(Phase::Listed, Transition::SellerTimeout).is_err());
        assert!(next_phase(Phase::Bound, Transition::BidTimeout).is_err());
    }

    #[test]
    fn no_exit_from_terminal_phases() {
        for t in [
            Transition::Purchase,
            Transition::ConfirmOrder,
            Transition::AssignTransporter,
            Transition::ConfirmDelivery,
            Transition::SellerTimeout,
            Transition::BidTimeout,
            Transition::DeliveryTimeout,
        ] {
            assert!(next_phase(Phase::Delivered, t).is_err());
            assert!(next_phase(Phase::Expired, t).is_err());
        }
    }

    #[test]
    fn wrong_phase_error_names_action() {
        let err = next_phase(Phase::Listed, Transition::ConfirmDelivery).unwrap_err();
        assert_eq!(
            err.to_string(),
            "confirm_delivery not allowed in phase Listed"
        );
    }

    #[test]
    fn phase_to_stage() {
        assert_eq!(Phase::Listed.stage(), Some(Stage::Listing));
        assert_eq!(Phase::Bound.stage(), Some(Stage::Purchase));
        assert_eq!(Phase::Delivered.stage(), Some(Stage::Delivery));
        assert_eq!(Phase::Expired.stage(), None);
        assert_eq!(Phase::Expired.code(), 5);
    }
}
