//! # Ledger Seam
//!
//! Escrow instances custody value but never move it themselves. Every
//! outward payment of one operation is handed to a [`Ledger`] as a single
//! batch, after the instance has already committed its own accounting. A
//! ledger must apply a batch entirely or not at all; on refusal the
//! instance rolls its accounting back.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tradeseal_core::{Address, Wei};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutReason {
    SalePrice,
    PurchaseRefund,
    TransporterFee,
    FeeRefund,
    DepositReturn,
    ForfeitedDeposit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub to: Address,
    pub amount: Wei,
    pub reason: PayoutReason,
}

impl Transfer {
    pub fn new(to: Address, amount: Wei, reason: PayoutReason) -> Self {
        Self { to, amount, reason }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("recipient {0} refused the transfer")]
    Rejected(Address),

    #[error("balance overflow crediting {0}")]
    Overflow(Address),
}

pub trait Ledger {
    /// Pay every transfer in `batch` out of `from`, atomically.
    fn pay(&mut self, from: Address, batch: &[Transfer]) -> Result<(), LedgerError>;
}

/// Account balances held in memory.
///
/// Recipients can be marked as refusing, which models a counterparty whose
/// receive hook reverts.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLedger {
    balances: HashMap<Address, Wei>,
    refusing: HashSet<Address>,
    journal: Vec<(Address, Transfer)>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, account: &Address) -> Wei {
        self.balances.get(account).copied().unwrap_or(Wei::ZERO)
    }

    pub fn refuse_payments_to(&mut self, account: Address) {
        self.refusing.insert(account);
    }

    pub fn accept_payments_to(&mut self, account: &Address) {
        self.refusing.remove(account);
    }

    /// Every transfer applied so far with its paying escrow.
    pub fn journal(&self) -> &[(Address, Transfer)] {
        &self.journal
    }
}

impl Ledger for InMemoryLedger {
    fn pay(&mut self, from: Address, batch: &[Transfer]) -> Result<(), LedgerError> {
        let mut credited: HashMap<Address, Wei> = HashMap::new();
        for t in batch {
            if self.refusing.contains(&t.to) {
                return Err(LedgerError::Rejected(t.to));
            }
            let current = credited
                .get(&t.to)
                .copied()
                .unwrap_or_else(|| self.balance_of(&t.to));
            let next = current
                .checked_add(t.amount)
                .ok_or(LedgerError::Overflow(t.to))?;
            credited.insert(t.to, next);
        }
        self.balances.extend(credited);
        self.journal
            .extend(batch.iter().cloned().map(|t| (from, t)));
        Ok(())
    }
}
