//! # tradeseal-escrow — Escrow State Machine and Factory
//!
//! Each listed product gets its own [`EscrowInstance`]: it holds the
//! seller's hidden price commitment, takes the buyer's payment, collects
//! transporter bids and security deposits, anchors one credential per
//! lifecycle stage, and settles funds on delivery or timeout.
//!
//! The [`EscrowFactory`] hands out product ids and instance addresses, and
//! owns the template (implementation identity plus [`EscrowConfig`]) every
//! new instance shares.
//!
//! Instances never move value on their own. Outward payments are issued
//! through the [`Ledger`] trait as one batch per operation; a refused batch
//! rolls the operation back.

pub mod address;
pub mod config;
pub mod error;
pub mod events;
pub mod factory;
pub mod instance;
pub mod ledger;
pub mod phase;
pub mod transporter;

pub use address::{clone_init_code, create2_address, create_address, predict_clone_address};
pub use config::{ConfigError, EscrowConfig};
pub use error::EscrowError;
pub use events::{EscrowEvent, FactoryEvent};
pub use factory::{EscrowFactory, ProductHandle, SharedInstance};
pub use instance::{CallContext, EscrowInstance, EscrowSnapshot, EscrowTemplate, StageCids};
pub use ledger::{InMemoryLedger, Ledger, LedgerError, PayoutReason, Transfer};
pub use phase::{next_phase, Phase, Transition};
pub use transporter::{TransporterBid, TransporterRegistry};
