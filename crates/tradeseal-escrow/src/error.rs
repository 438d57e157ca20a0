use thiserror::Error;
use tradeseal_core::{Address, Bytes32, ErrorKind, Timestamp, ValidationError, Wei};

use crate::ledger::LedgerError;
use crate::phase::Phase;

/// Reason an escrow or factory operation was rejected. A rejected
/// operation leaves all state untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscrowError {
    // -- Validation ----------------------------------------------------------
    #[error("price commitment must be non-zero")]
    ZeroCommitment,

    #[error("content address must not be empty")]
    EmptyCid,

    #[error("{0} must not be the zero address")]
    ZeroAddress(&'static str),

    #[error("revealed value and blinding do not open the price commitment")]
    RevealMismatch,

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    // -- State ---------------------------------------------------------------
    #[error("price commitment already frozen")]
    CommitmentFrozen,

    #[error("price commitment has not been set")]
    CommitmentNotSet,

    #[error("product already purchased")]
    AlreadyPurchased,

    #[error("public price already set")]
    PublicPriceAlreadySet,

    #[error("{action} not allowed in phase {phase}")]
    WrongPhase { action: &'static str, phase: Phase },

    #[error("transporter already assigned")]
    TransporterAlreadySet,

    #[error("{0} is not a registered transporter")]
    NotATransporter(Address),

    #[error("assigned transporter cannot withdraw its bid")]
    SelectedTransporterCannotWithdraw,

    #[error("bid limit of {0} reached")]
    BidCapReached(usize),

    #[error("seller window open until {deadline}")]
    SellerWindowNotExpired { deadline: Timestamp },

    #[error("bidding window open until {deadline}")]
    BiddingWindowNotExpired { deadline: Timestamp },

    #[error("delivery window open until {deadline}")]
    NotYetTimeout { deadline: Timestamp },

    #[error("factory is paused")]
    FactoryPaused,

    #[error("address {0} already holds an instance")]
    AddressOccupied(Address),

    #[error("salt {0} already used")]
    SaltAlreadyUsed(Bytes32),

    // -- Authorization -------------------------------------------------------
    #[error("caller {caller} is not the owner")]
    NotOwner { caller: Address },

    #[error("caller {caller} is not the buyer")]
    NotBuyer { caller: Address },

    #[error("owner cannot purchase own product")]
    OwnerCannotPurchase,

    #[error("{0} cannot bid as transporter")]
    IneligibleTransporter(Address),

    #[error("caller {caller} is not the factory owner")]
    NotFactoryOwner { caller: Address },

    // -- Funds ---------------------------------------------------------------
    #[error("{0} requires a non-zero value")]
    ZeroValue(&'static str),

    #[error("incorrect value: expected {expected}, got {got}")]
    IncorrectValue { expected: Wei, got: Wei },

    #[error("incorrect transporter fee: expected {expected}, got {got}")]
    IncorrectFee { expected: Wei, got: Wei },

    #[error("amount overflow")]
    Overflow,

    #[error("payout failed: {0}")]
    Ledger(#[from] LedgerError),
}

impl EscrowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ZeroCommitment
            | Self::EmptyCid
            | Self::ZeroAddress(_)
            | Self::RevealMismatch
            | Self::Invalid(_) => ErrorKind::Validation,

            Self::CommitmentFrozen
            | Self::CommitmentNotSet
            | Self::AlreadyPurchased
            | Self::PublicPriceAlreadySet
            | Self::WrongPhase { .. }
            | Self::TransporterAlreadySet
            | Self::NotATransporter(_)
            | Self::SelectedTransporterCannotWithdraw
            | Self::BidCapReached(_)
            | Self::SellerWindowNotExpired { .. }
            | Self::BiddingWindowNotExpired { .. }
            | Self::NotYetTimeout { .. }
            | Self::FactoryPaused
            | Self::AddressOccupied(_)
            | Self::SaltAlreadyUsed(_) => ErrorKind::State,

            Self::NotOwner { .. }
            | Self::NotBuyer { .. }
            | Self::OwnerCannotPurchase
            | Self::IneligibleTransporter(_)
            | Self::NotFactoryOwner { .. } => ErrorKind::Authorization,

            Self::ZeroValue(_)
            | Self::IncorrectValue { .. }
            | Self::IncorrectFee { .. }
            | Self::Overflow
            | Self::Ledger(_) => ErrorKind::Funds,
        }
    }
}

impl From<tradeseal_binding::BindingError> for EscrowError {
    fn from(err: tradeseal_binding::BindingError) -> Self {
        match err {
            tradeseal_binding::BindingError::Invalid(v) => Self::Invalid(v),
        }
    }
}
