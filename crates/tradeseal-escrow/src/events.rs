//! Structured events appended by escrow instances and the factory.

use serde::{Deserialize, Serialize};
use tradeseal_core::{Address, Bytes32, Stage, Timestamp, Wei};

use crate::phase::Phase;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EscrowEvent {
    PriceCommitted {
        commitment: Bytes32,
    },
    PublicPriceSet {
        price: Wei,
        commitment: Option<Bytes32>,
    },
    Purchased {
        buyer: Address,
        amount: Wei,
    },
    PhaseChanged {
        from: Phase,
        to: Phase,
        at: Timestamp,
    },
    OrderConfirmed {
        cid: String,
        tx_hash_commitment: Option<Bytes32>,
    },
    VcUpdated {
        stage: Option<Stage>,
        cid: String,
    },
    TransporterCreated {
        transporter: Address,
        fee: Wei,
    },
    SecurityDeposited {
        transporter: Address,
        amount: Wei,
        total: Wei,
    },
    BidWithdrawn {
        transporter: Address,
        refunded: Wei,
    },
    TransporterAssigned {
        transporter: Address,
        fee: Wei,
    },
    DeliveryConfirmed {
        buyer: Address,
        transporter: Address,
        price: Wei,
        cid: String,
    },
    DeliveryConfirmedWithCommitment {
        cid: String,
        tx_hash_commitment: Bytes32,
    },
    Expired {
        reason: String,
        refunded_to_buyer: Wei,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FactoryEvent {
    ProductCreated {
        product: Address,
        seller: Address,
        product_id: u64,
        name: String,
    },
    ImplementationUpdated {
        old: Address,
        new: Address,
    },
    Paused {
        by: Address,
    },
    Unpaused {
        by: Address,
    },
}
