//! Transporter candidates and their bids.
//!
//! A candidate registers a fee, optionally backs it with a security deposit,
//! and may withdraw until the seller assigns someone. The assigned
//! transporter's deposit stays locked until delivery or delivery timeout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tradeseal_core::{Address, Wei};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransporterBid {
    pub fee: Wei,
    pub deposit: Wei,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransporterRegistry {
    bids: BTreeMap<Address, TransporterBid>,
}

impl TransporterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, candidate: &Address) -> Option<&TransporterBid> {
        self.bids.get(candidate)
    }

    pub fn contains(&self, candidate: &Address) -> bool {
        self.bids.contains_key(candidate)
    }

    pub fn len(&self) -> usize {
        self.bids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &TransporterBid)> {
        self.bids.iter()
    }

    /// Register `candidate` or replace its fee. Any deposit is kept.
    pub fn set_fee(&mut self, candidate: Address, fee: Wei) {
        self.bids.entry(candidate).or_default().fee = fee;
    }

    /// Add to a candidate's deposit and return the new total, or `None`
    /// if the candidate is unknown or the total would overflow.
    pub fn add_deposit(&mut self, candidate: &Address, amount: Wei) -> Option<Wei> {
        let bid = self.bids.get_mut(candidate)?;
        bid.deposit = bid.deposit.checked_add(amount)?;
        Some(bid.deposit)
    }

    /// Zero a candidate's deposit and return what it held.
    pub fn take_deposit(&mut self, candidate: &Address) -> Wei {
        self.bids
            .get_mut(candidate)
            .map(|bid| std::mem::take(&mut bid.deposit))
            .unwrap_or(Wei::ZERO)
    }

    pub fn remove(&mut self, candidate: &Address) -> Option<TransporterBid> {
        self.bids.remove(candidate)
    }

    /// Sum of all deposits currently held.
    pub fn total_deposits(&self) -> Option<Wei> {
        self.bids
            .values()
            .try_fold(Wei::ZERO, |acc, bid| acc.checked_add(bid.deposit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fee_update_keeps_deposit() {
        let mut reg = TransporterRegistry::new();
        let t = Address::from_low_u64(9);
        reg.set_fee(t, Wei::new(5));
        assert_eq!(reg.add_deposit(&t, Wei::new(100)), Some(Wei::new(100)));
        reg.set_fee(t, Wei::new(7));
        assert_eq!(
            reg.get(&t),
            Some(&TransporterBid {
                fee: Wei::new(7),
                deposit: Wei::new(100)
            })
        );
    }

    #[test]
    fn deposit_requires_registration() {
        let mut reg = TransporterRegistry::new();
        assert_eq!(reg.add_deposit(&Address::from_low_u64(1), Wei::new(1)), None);
    }

    #[test]
    fn totals_and_take() {
        let mut reg = TransporterRegistry::new();
        let a = Address::from_low_u64(1);
        let b = Address::from_low_u64(2);
        reg.set_fee(a, Wei::new(1));
        reg.set_fee(b, Wei::new(1));
        reg.add_deposit(&a, Wei::new(30));
        reg.add_deposit(&b, Wei::new(12));
        assert_eq!(reg.total_deposits(), Some(Wei::new(42)));
        assert_eq!(reg.take_deposit(&a), Wei::new(30));
        assert_eq!(reg.take_deposit(&a), Wei::ZERO);
        assert_eq!(reg.total_deposits(), Some(Wei::new(12)));
    }
}
