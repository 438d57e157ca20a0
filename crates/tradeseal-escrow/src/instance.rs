//! # Escrow Instance
//!
//! One instance per listed product. It holds the seller's price commitment,
//! the buyer's payment, transporter bids and deposits, and the credential
//! anchors for each lifecycle stage.
//!
//! ## Fund accounting
//!
//! At every observable point:
//!
//! ```text
//! balance == held purchase price + Σ transporter deposits + held transporter fee
//! ```
//!
//! The purchase price counts as held while the phase is `Purchased`,
//! `OrderConfirmed` or `Bound`. [`EscrowInstance::is_conserved`] checks the
//! equation.
//!
//! ## Payouts
//!
//! Value-moving operations run in three steps: checks, then accounting
//! effects on the instance, then one batch of transfers handed to the
//! [`Ledger`]. If the ledger refuses the batch the instance is restored to
//! the state it had before the call and no event is recorded.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tradeseal_binding::{
    binding_tag, check_previous_vc_cid, price_commitment, tx_hash_binding_tag, BindingContext, BindingTag,
};
use tradeseal_core::{Address, Bytes32, Stage, Timestamp, Wei};

use crate::config::EscrowConfig;
use crate::error::EscrowError;
use crate::events::EscrowEvent;
use crate::ledger::{Ledger, PayoutReason, Transfer};
use crate::phase::{next_phase, Phase, Transition};
use crate::transporter::{TransporterBid, TransporterRegistry};

// ─── Call context and template ───────────────────────────────────────

/// Who is calling and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self { caller, now }
    }
}

/// Behaviour shared by every instance a factory creates: the implementation
/// identity clones delegate to, and the escrow parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTemplate {
    pub implementation: Address,
    pub config: EscrowConfig,
}

impl EscrowTemplate {
    pub fn new(implementation: Address, config: EscrowConfig) -> Self {
        Self {
            implementation,
            config,
        }
    }
}

// ─── Persisted state ─────────────────────────────────────────────────

/// Credential content addresses, one slot per stage.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageCids {
    pub listing: Option<String>,
    pub purchase: Option<String>,
    pub delivery: Option<String>,
}

impl StageCids {
    pub fn get(&self, stage: Stage) -> Option<&str> {
        match stage {
            Stage::Listing => self.listing.as_deref(),
            Stage::Purchase => self.purchase.as_deref(),
            Stage::Delivery => self.delivery.as_deref(),
        }
    }

    fn set(&mut self, stage: Stage, cid: String) {
        let slot = match stage {
            Stage::Listing => &mut self.listing,
            Stage::Purchase => &mut self.purchase,
            Stage::Delivery => &mut self.delivery,
        };
        *slot = Some(cid);
    }
}

/// Full state of one escrow. Serializable so instances can be persisted
/// and restored with [`EscrowInstance::from_snapshot`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowSnapshot {
    pub address: Address,
    pub product_id: u64,
    pub name: String,
    pub owner: Address,
    /// Zero until set.
    pub price_commitment: Bytes32,
    pub commitment_frozen: bool,
    pub public_price: Option<Wei>,
    pub public_price_commitment: Option<Bytes32>,
    pub purchased: bool,
    pub buyer: Option<Address>,
    pub purchase_amount: Wei,
    pub transporters: TransporterRegistry,
    pub transporter: Option<Address>,
    pub fee_held: Wei,
    pub stage_cids: StageCids,
    pub vc_history: Vec<String>,
    pub purchase_tx_commitment: Option<Bytes32>,
    #[serde(default)]
    pub delivery_tx_commitment: Option<Bytes32>,
    pub phase: Phase,
    pub phase_changed_at: Timestamp,
    pub created_at: Timestamp,
    pub balance: Wei,
}

// ─── Instance ────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct EscrowInstance {
    template: Arc<EscrowTemplate>,
    state: EscrowSnapshot,
    events: Vec<EscrowEvent>,
}

fn add(a: Wei, b: Wei) -> Result<Wei, EscrowError> {
    a.checked_add(b).ok_or(EscrowError::Overflow)
}

fn sub(a: Wei, b: Wei) -> Result<Wei, EscrowError> {
    a.checked_sub(b).ok_or(EscrowError::Overflow)
}

/// Anchored CIDs later feed binding contexts as the previous credential.
fn check_cid(cid: &str) -> Result<(), EscrowError> {
    if cid.is_empty() {
        return Err(EscrowError::EmptyCid);
    }
    check_previous_vc_cid(cid)?;
    Ok(())
}

impl EscrowInstance {
    /// A fresh listing with no price commitment yet.
    pub fn new(
        template: Arc<EscrowTemplate>,
        address: Address,
        product_id: u64,
        name: impl Into<String>,
        owner: Address,
        now: Timestamp,
    ) -> Result<Self, EscrowError> {
        if owner.is_zero() {
            return Err(EscrowError::ZeroAddress("owner"));
        }
        if address.is_zero() {
            return Err(EscrowError::ZeroAddress("escrow"));
        }
        Ok(Self {
            template,
            state: EscrowSnapshot {
                address,
                product_id,
                name: name.into(),
                owner,
                price_commitment: Bytes32::ZERO,
                commitment_frozen: false,
                public_price: None,
                public_price_commitment: None,
                purchased: false,
                buyer: None,
                purchase_amount: Wei::ZERO,
                transporters: TransporterRegistry::new(),
                transporter: None,
                fee_held: Wei::ZERO,
                stage_cids: StageCids::default(),
                vc_history: Vec::new(),
                purchase_tx_commitment: None,
                delivery_tx_commitment: None,
                phase: Phase::Listed,
                phase_changed_at: now,
                created_at: now,
                balance: Wei::ZERO,
            },
            events: Vec::new(),
        })
    }

    pub fn from_snapshot(template: Arc<EscrowTemplate>, state: EscrowSnapshot) -> Self {
        Self {
            template,
            state,
            events: Vec::new(),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn address(&self) -> Address {
        self.state.address
    }

    pub fn product_id(&self) -> u64 {
        self.state.product_id
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    pub fn owner(&self) -> Address {
        self.state.owner
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn price_commitment(&self) -> Option<Bytes32> {
        (!self.state.price_commitment.is_zero()).then_some(self.state.price_commitment)
    }

    pub fn is_commitment_frozen(&self) -> bool {
        self.state.commitment_frozen
    }

    pub fn public_price(&self) -> Option<Wei> {
        self.state.public_price
    }

    pub fn public_price_commitment(&self) -> Option<Bytes32> {
        self.state.public_price_commitment
    }

    pub fn is_purchased(&self) -> bool {
        self.state.purchased
    }

    pub fn buyer(&self) -> Option<Address> {
        self.state.buyer
    }

    pub fn purchase_amount(&self) -> Wei {
        self.state.purchase_amount
    }

    pub fn transporters(&self) -> &TransporterRegistry {
        &self.state.transporters
    }

    pub fn bid(&self, candidate: &Address) -> Option<&TransporterBid> {
        self.state.transporters.get(candidate)
    }

    pub fn transporter(&self) -> Option<Address> {
        self.state.transporter
    }

    pub fn fee_held(&self) -> Wei {
        self.state.fee_held
    }

    pub fn balance(&self) -> Wei {
        self.state.balance
    }

    pub fn stage_cid(&self, stage: Stage) -> Option<&str> {
        self.state.stage_cids.get(stage)
    }

    pub fn vc_history(&self) -> &[String] {
        &self.state.vc_history
    }

    pub fn purchase_tx_commitment(&self) -> Option<Bytes32> {
        self.state.purchase_tx_commitment
    }

    pub fn delivery_tx_commitment(&self) -> Option<Bytes32> {
        self.state.delivery_tx_commitment
    }

    pub fn phase_changed_at(&self) -> Timestamp {
        self.state.phase_changed_at
    }

    pub fn config(&self) -> &EscrowConfig {
        &self.template.config
    }

    pub fn template(&self) -> &Arc<EscrowTemplate> {
        &self.template
    }

    pub fn events(&self) -> &[EscrowEvent] {
        &self.events
    }

    pub fn snapshot(&self) -> EscrowSnapshot {
        self.state.clone()
    }

    /// Purchase price currently in custody.
    pub fn held_price(&self) -> Wei {
        match self.state.phase {
            Phase::Purchased | Phase::OrderConfirmed | Phase::Bound => self.state.purchase_amount,
            _ => Wei::ZERO,
        }
    }

    /// Whether the balance equals the value the instance is accountable for.
    pub fn is_conserved(&self) -> bool {
        let Some(deposits) = self.state.transporters.total_deposits() else {
            return false;
        };
        self.held_price()
            .checked_add(deposits)
            .and_then(|v| v.checked_add(self.state.fee_held))
            .is_some_and(|expected| expected == self.state.balance)
    }

    /// End of the window for the current phase, if it has one.
    pub fn deadline(&self) -> Option<Timestamp> {
        let cfg = &self.template.config;
        let window = match self.state.phase {
            Phase::Purchased => cfg.seller_window_secs,
            Phase::OrderConfirmed => cfg.bid_window_secs,
            Phase::Bound => cfg.delivery_window_secs,
            _ => return None,
        };
        Some(self.state.phase_changed_at.plus_secs(window))
    }

    /// Binding context for proofs issued at `stage` of this escrow. The
    /// context links to the credential anchored for the preceding stage
    /// when there is one.
    pub fn binding_context(&self, stage: Stage) -> Result<BindingContext, EscrowError> {
        let ctx = BindingContext::new(
            self.template.config.chain_id,
            self.state.address,
            self.state.product_id,
            stage,
        )?;
        let previous = stage
            .previous()
            .and_then(|prev| self.state.stage_cids.get(prev))
            .map(str::to_string);
        Ok(match previous {
            Some(cid) => ctx.with_previous_vc_cid(cid)?,
            None => ctx,
        })
    }

    pub fn binding_tag(&self, stage: Stage) -> Result<BindingTag, EscrowError> {
        Ok(binding_tag(&self.binding_context(stage)?))
    }

    /// Tag linking purchase and delivery tx-hash commitments. Requires a buyer.
    pub fn tx_hash_binding_tag(&self) -> Option<Bytes32> {
        self.state.buyer.map(|buyer| {
            tx_hash_binding_tag(
                self.template.config.chain_id,
                &self.state.address,
                self.state.product_id,
                &buyer,
            )
        })
    }

    // ── Internals ────────────────────────────────────────────────────

    fn require_owner(&self, ctx: &CallContext) -> Result<(), EscrowError> {
        if ctx.caller != self.state.owner {
            return Err(EscrowError::NotOwner { caller: ctx.caller });
        }
        Ok(())
    }

    fn require_buyer(&self, ctx: &CallContext) -> Result<(), EscrowError> {
        if self.state.buyer != Some(ctx.caller) {
            return Err(EscrowError::NotBuyer { caller: ctx.caller });
        }
        Ok(())
    }

    fn enter_phase(&mut self, to: Phase, at: Timestamp) {
        let from = self.state.phase;
        self.state.phase = to;
        self.state.phase_changed_at = at;
        self.events.push(EscrowEvent::PhaseChanged { from, to, at });
    }

    fn anchor(&mut self, stage: Option<Stage>, cid: String) {
        if let Some(stage) = stage {
            self.state.stage_cids.set(stage, cid.clone());
        }
        self.state.vc_history.push(cid.clone());
        self.events.push(EscrowEvent::VcUpdated { stage, cid });
    }

    /// Run `op` with rollback. The closure performs checks and effects and
    /// returns the payouts; the payouts go to the ledger as one batch.
    fn transact<L, F>(&mut self, action: &'static str, ledger: &mut L, op: F) -> Result<(), EscrowError>
    where
        L: Ledger + ?Sized,
        F: FnOnce(&mut Self) -> Result<Vec<Transfer>, EscrowError>,
    {
        let saved = self.state.clone();
        let mark = self.events.len();
        let result = op(self).and_then(|batch| {
            if batch.is_empty() {
                return Ok(());
            }
            ledger.pay(self.state.address, &batch).map_err(EscrowError::from)
        });
        self.finish(action, saved, mark, result)
    }

    /// [`transact`](Self::transact) for operations that move no value out.
    fn apply<F>(&mut self, action: &'static str, op: F) -> Result<(), EscrowError>
    where
        F: FnOnce(&mut Self) -> Result<(), EscrowError>,
    {
        let saved = self.state.clone();
        let mark = self.events.len();
        let result = op(self);
        self.finish(action, saved, mark, result)
    }

    fn finish(
        &mut self,
        action: &'static str,
        saved: EscrowSnapshot,
        mark: usize,
        result: Result<(), EscrowError>,
    ) -> Result<(), EscrowError> {
        match &result {
            Ok(()) => tracing::info!(
                escrow = %self.state.address,
                product_id = self.state.product_id,
                action,
                phase = %self.state.phase,
                balance = %self.state.balance,
                "escrow operation applied"
            ),
            Err(e) => {
                self.state = saved;
                self.events.truncate(mark);
                tracing::warn!(
                    escrow = %self.state.address,
                    product_id = self.state.product_id,
                    action,
                    kind = %e.kind(),
                    error = %e,
                    "escrow operation rejected"
                );
            }
        }
        result
    }

    // ─── Seller: pricing ─────────────────────────────────────────────

    /// Set the hidden price commitment. Allowed exactly once.
    pub fn set_price_commitment(&mut self, ctx: &CallContext, commitment: Bytes32) -> Result<(), EscrowError> {
        self.apply("set_price_commitment", |this| {
            this.require_owner(ctx)?;
            if this.state.commitment_frozen {
                return Err(EscrowError::CommitmentFrozen);
            }
            if commitment.is_zero() {
                return Err(EscrowError::ZeroCommitment);
            }
            this.state.price_commitment = commitment;
            this.state.commitment_frozen = true;
            this.events.push(EscrowEvent::PriceCommitted { commitment });
            Ok(())
        })
    }

    pub fn set_public_price(&mut self, ctx: &CallContext, price: Wei) -> Result<(), EscrowError> {
        self.apply("set_public_price", |this| this.store_public_price(ctx, price, None))
    }

    pub fn set_public_price_with_commitment(
        &mut self,
        ctx: &CallContext,
        price: Wei,
        commitment: Bytes32,
    ) -> Result<(), EscrowError> {
        self.apply("set_public_price_with_commitment", |this| {
            if commitment.is_zero() {
                this.require_owner(ctx)?;
                return Err(EscrowError::ZeroCommitment);
            }
            this.store_public_price(ctx, price, Some(commitment))
        })
    }

    fn store_public_price(
        &mut self,
        ctx: &CallContext,
        price: Wei,
        commitment: Option<Bytes32>,
    ) -> Result<(), EscrowError> {
        self.require_owner(ctx)?;
        if self.state.phase != Phase::Listed {
            return Err(EscrowError::WrongPhase {
                action: "set_public_price",
                phase: self.state.phase,
            });
        }
        if self.state.public_price.is_some() {
            return Err(EscrowError::PublicPriceAlreadySet);
        }
        if price.is_zero() {
            return Err(EscrowError::ZeroValue("public price"));
        }
        self.state.public_price = Some(price);
        self.state.public_price_commitment = commitment;
        self.events.push(EscrowEvent::PublicPriceSet { price, commitment });
        Ok(())
    }

    // ─── Buyer: purchase ─────────────────────────────────────────────

    /// Pay `value` into the escrow and become its buyer.
    pub fn purchase(&mut self, ctx: &CallContext, value: Wei) -> Result<(), EscrowError> {
        self.apply("purchase", |this| {
            if this.state.purchased {
                return Err(EscrowError::AlreadyPurchased);
            }
            let next = next_phase(this.state.phase, Transition::Purchase)?;
            if !this.state.commitment_frozen {
                return Err(EscrowError::CommitmentNotSet);
            }
            if ctx.caller == this.state.owner {
                return Err(EscrowError::OwnerCannotPurchase);
            }
            if ctx.caller.is_zero() {
                return Err(EscrowError::ZeroAddress("buyer"));
            }
            if value.is_zero() {
                return Err(EscrowError::ZeroValue("purchase"));
            }
            if let Some(expected) = this.state.public_price {
                if value != expected {
                    return Err(EscrowError::IncorrectValue { expected, got: value });
                }
            }

            this.state.balance = add(this.state.balance, value)?;
            this.state.purchased = true;
            this.state.buyer = Some(ctx.caller);
            this.state.purchase_amount = value;
            this.events.push(EscrowEvent::Purchased {
                buyer: ctx.caller,
                amount: value,
            });
            this.enter_phase(next, ctx.now);
            Ok(())
        })
    }

    // ─── Seller: order confirmation ──────────────────────────────────

    pub fn confirm_order(&mut self, ctx: &CallContext, cid: impl Into<String>) -> Result<(), EscrowError> {
        self.confirm_order_with_commitment(ctx, cid, None)
    }

    /// Anchor the purchase credential and record the buyer's optional
    /// purchase tx-hash commitment.
    pub fn confirm_order_with_commitment(
        &mut self,
        ctx: &CallContext,
        cid: impl Into<String>,
        tx_hash_commitment: Option<Bytes32>,
    ) -> Result<(), EscrowError> {
        let cid = cid.into();
        self.apply("confirm_order", |this| {
            this.require_owner(ctx)?;
            let next = next_phase(this.state.phase, Transition::ConfirmOrder)?;
            check_cid(&cid)?;
            this.state.purchase_tx_commitment = tx_hash_commitment;
            this.anchor(Some(Stage::Purchase), cid.clone());
            this.events.push(EscrowEvent::OrderConfirmed {
                cid,
                tx_hash_commitment,
            });
            this.enter_phase(next, ctx.now);
            Ok(())
        })
    }

    /// Anchor a credential for the current stage. After expiry the CID is
    /// only appended to the history.
    pub fn update_vc_cid(&mut self, ctx: &CallContext, cid: impl Into<String>) -> Result<(), EscrowError> {
        let cid = cid.into();
        self.apply("update_vc_cid", |this| {
            this.require_owner(ctx)?;
            check_cid(&cid)?;
            let stage = this.state.phase.stage();
            this.anchor(stage, cid);
            Ok(())
        })
    }

    /// Buyer re-anchors the delivery credential once it carries the
    /// delivery tx-hash commitment. A zero commitment counts as none.
    pub fn update_vc_cid_after_delivery(
        &mut self,
        ctx: &CallContext,
        cid: impl Into<String>,
        tx_hash_commitment: Option<Bytes32>,
    ) -> Result<(), EscrowError> {
        let cid = cid.into();
        let commitment = tx_hash_commitment.filter(|c| !c.is_zero());
        self.apply("update_vc_cid_after_delivery", |this| {
            this.require_buyer(ctx)?;
            if this.state.phase != Phase::Delivered {
                return Err(EscrowError::WrongPhase {
                    action: "update_vc_cid_after_delivery",
                    phase: this.state.phase,
                });
            }
            check_cid(&cid)?;
            this.anchor(Some(Stage::Delivery), cid.clone());
            if let Some(c) = commitment {
                this.state.delivery_tx_commitment = Some(c);
                this.events.push(EscrowEvent::DeliveryConfirmedWithCommitment {
                    cid,
                    tx_hash_commitment: c,
                });
            }
            Ok(())
        })
    }

    // ─── Transporters ────────────────────────────────────────────────

    /// Register as a transporter candidate, or update an existing bid's fee.
    pub fn create_transporter(&mut self, ctx: &CallContext, fee: Wei) -> Result<(), EscrowError> {
        self.apply("create_transporter", |this| {
            if ctx.caller == this.state.owner || Some(ctx.caller) == this.state.buyer || ctx.caller.is_zero() {
                return Err(EscrowError::IneligibleTransporter(ctx.caller));
            }
            if this.state.phase.is_terminal() {
                return Err(EscrowError::WrongPhase {
                    action: "create_transporter",
                    phase: this.state.phase,
                });
            }
            if this.state.transporter.is_some() {
                return Err(EscrowError::TransporterAlreadySet);
            }
            if fee.is_zero() {
                return Err(EscrowError::ZeroValue("transporter fee"));
            }
            let max = this.template.config.max_bids;
            if !this.state.transporters.contains(&ctx.caller) && this.state.transporters.len() >= max {
                return Err(EscrowError::BidCapReached(max));
            }
            this.state.transporters.set_fee(ctx.caller, fee);
            this.events.push(EscrowEvent::TransporterCreated {
                transporter: ctx.caller,
                fee,
            });
            Ok(())
        })
    }

    /// Add `value` to the caller's security deposit.
    pub fn security_deposit(&mut self, ctx: &CallContext, value: Wei) -> Result<(), EscrowError> {
        self.apply("security_deposit", |this| {
            if !this.state.transporters.contains(&ctx.caller) {
                return Err(EscrowError::NotATransporter(ctx.caller));
            }
            if this.state.phase.is_terminal() {
                return Err(EscrowError::WrongPhase {
                    action: "security_deposit",
                    phase: this.state.phase,
                });
            }
            if value.is_zero() {
                return Err(EscrowError::ZeroValue("security deposit"));
            }
            this.state.balance = add(this.state.balance, value)?;
            let total = this
                .state
                .transporters
                .add_deposit(&ctx.caller, value)
                .ok_or(EscrowError::Overflow)?;
            this.events.push(EscrowEvent::SecurityDeposited {
                transporter: ctx.caller,
                amount: value,
                total,
            });
            Ok(())
        })
    }

    /// Leave the candidate list and take the deposit back. Not available to
    /// the assigned transporter.
    pub fn withdraw_bid<L: Ledger + ?Sized>(&mut self, ctx: &CallContext, ledger: &mut L) -> Result<(), EscrowError> {
        self.transact("withdraw_bid", ledger, |this| {
            if !this.state.transporters.contains(&ctx.caller) {
                return Err(EscrowError::NotATransporter(ctx.caller));
            }
            if this.state.transporter == Some(ctx.caller) {
                return Err(EscrowError::SelectedTransporterCannotWithdraw);
            }
            let refund = this
                .state
                .transporters
                .remove(&ctx.caller)
                .map(|bid| bid.deposit)
                .unwrap_or(Wei::ZERO);
            this.state.balance = sub(this.state.balance, refund)?;
            this.events.push(EscrowEvent::BidWithdrawn {
                transporter: ctx.caller,
                refunded: refund,
            });
            let mut batch = Vec::new();
            if !refund.is_zero() {
                batch.push(Transfer::new(ctx.caller, refund, PayoutReason::DepositReturn));
            }
            Ok(batch)
        })
    }

    /// Assign `transporter` and escrow its fee, paid by the seller as `value`.
    pub fn set_transporter(&mut self, ctx: &CallContext, transporter: Address, value: Wei) -> Result<(), EscrowError> {
        self.apply("set_transporter", |this| {
            this.require_owner(ctx)?;
            if this.state.transporter.is_some() {
                return Err(EscrowError::TransporterAlreadySet);
            }
            let next = next_phase(this.state.phase, Transition::AssignTransporter)?;
            let bid = *this
                .state
                .transporters
                .get(&transporter)
                .ok_or(EscrowError::NotATransporter(transporter))?;
            if value != bid.fee {
                return Err(EscrowError::IncorrectFee {
                    expected: bid.fee,
                    got: value,
                });
            }
            this.state.balance = add(this.state.balance, value)?;
            this.state.fee_held = value;
            this.state.transporter = Some(transporter);
            this.events.push(EscrowEvent::TransporterAssigned {
                transporter,
                fee: value,
            });
            this.enter_phase(next, ctx.now);
            Ok(())
        })
    }

    // ─── Buyer: delivery ─────────────────────────────────────────────

    /// Open the price commitment and confirm delivery. Pays the seller the
    /// price and the transporter its fee plus deposit.
    pub fn reveal_and_confirm_delivery<L: Ledger + ?Sized>(
        &mut self,
        ctx: &CallContext,
        value: Wei,
        blinding: Bytes32,
        cid: impl Into<String>,
        ledger: &mut L,
    ) -> Result<(), EscrowError> {
        let cid = cid.into();
        self.transact("confirm_delivery", ledger, |this| {
            this.require_buyer(ctx)?;
            let next = next_phase(this.state.phase, Transition::ConfirmDelivery)?;
            check_cid(&cid)?;
            if price_commitment(value.get(), &blinding) != this.state.price_commitment {
                return Err(EscrowError::RevealMismatch);
            }
            let price = this.state.purchase_amount;
            if value != price {
                return Err(EscrowError::IncorrectValue { expected: price, got: value });
            }
            let transporter = this.state.transporter.ok_or(EscrowError::WrongPhase {
                action: "confirm_delivery",
                phase: this.state.phase,
            })?;

            let fee = std::mem::take(&mut this.state.fee_held);
            let deposit = this.state.transporters.take_deposit(&transporter);
            let owed = add(add(price, fee)?, deposit)?;
            this.state.balance = sub(this.state.balance, owed)?;
            this.anchor(Some(Stage::Delivery), cid.clone());
            this.events.push(EscrowEvent::DeliveryConfirmed {
                buyer: ctx.caller,
                transporter,
                price,
                cid,
            });
            this.enter_phase(next, ctx.now);

            let mut batch = vec![Transfer::new(this.state.owner, price, PayoutReason::SalePrice)];
            if !fee.is_zero() {
                batch.push(Transfer::new(transporter, fee, PayoutReason::TransporterFee));
            }
            if !deposit.is_zero() {
                batch.push(Transfer::new(transporter, deposit, PayoutReason::DepositReturn));
            }
            Ok(batch)
        })
    }

    // ─── Timeouts ────────────────────────────────────────────────────

    /// Seller failed to confirm the order in time. Refunds the buyer.
    pub fn seller_timeout<L: Ledger + ?Sized>(&mut self, ctx: &CallContext, ledger: &mut L) -> Result<(), EscrowError> {
        self.transact("seller_timeout", ledger, |this| {
            let next = next_phase(this.state.phase, Transition::SellerTimeout)?;
            let deadline = this
                .state
                .phase_changed_at
                .plus_secs(this.template.config.seller_window_secs);
            if ctx.now <= deadline {
                return Err(EscrowError::SellerWindowNotExpired { deadline });
            }
            this.expire_with_refund(next, ctx.now, "seller_timeout", Vec::new())
        })
    }

    /// No transporter was assigned in time. Refunds the buyer; bidders keep
    /// their deposits until they withdraw.
    pub fn bid_timeout<L: Ledger + ?Sized>(&mut self, ctx: &CallContext, ledger: &mut L) -> Result<(), EscrowError> {
        self.transact("bid_timeout", ledger, |this| {
            let next = next_phase(this.state.phase, Transition::BidTimeout)?;
            let deadline = this
                .state
                .phase_changed_at
                .plus_secs(this.template.config.bid_window_secs);
            if ctx.now <= deadline {
                return Err(EscrowError::BiddingWindowNotExpired { deadline });
            }
            this.expire_with_refund(next, ctx.now, "bid_timeout", Vec::new())
        })
    }

    /// The assigned transporter failed to deliver in time. The buyer gets
    /// the price and the transporter's forfeited deposit; the seller gets
    /// the escrowed fee back.
    pub fn delivery_timeout<L: Ledger + ?Sized>(&mut self, ctx: &CallContext, ledger: &mut L) -> Result<(), EscrowError> {
        self.transact("delivery_timeout", ledger, |this| {
            let next = next_phase(this.state.phase, Transition::DeliveryTimeout)?;
            let deadline = this
                .state
                .phase_changed_at
                .plus_secs(this.template.config.delivery_window_secs);
            if ctx.now <= deadline {
                return Err(EscrowError::NotYetTimeout { deadline });
            }
            let buyer = this.state.buyer.ok_or(EscrowError::ZeroAddress("buyer"))?;
            let mut extra = Vec::new();

            let forfeited = match this.state.transporter {
                Some(t) => this.state.transporters.take_deposit(&t),
                None => Wei::ZERO,
            };
            if !forfeited.is_zero() {
                this.state.balance = sub(this.state.balance, forfeited)?;
                extra.push(Transfer::new(buyer, forfeited, PayoutReason::ForfeitedDeposit));
            }
            let fee = std::mem::take(&mut this.state.fee_held);
            if !fee.is_zero() {
                this.state.balance = sub(this.state.balance, fee)?;
                extra.push(Transfer::new(this.state.owner, fee, PayoutReason::FeeRefund));
            }
            this.expire_with_refund(next, ctx.now, "delivery_timeout", extra)
        })
    }

    fn expire_with_refund(
        &mut self,
        next: Phase,
        now: Timestamp,
        reason: &str,
        extra: Vec<Transfer>,
    ) -> Result<Vec<Transfer>, EscrowError> {
        let buyer = self.state.buyer.ok_or(EscrowError::ZeroAddress("buyer"))?;
        let refund = self.held_price();
        self.state.balance = sub(self.state.balance, refund)?;
        self.events.push(EscrowEvent::Expired {
            reason: reason.to_string(),
            refunded_to_buyer: refund,
        });
        self.enter_phase(next, now);

        let mut batch = Vec::with_capacity(1 + extra.len());
        if !refund.is_zero() {
            batch.push(Transfer::new(buyer, refund, PayoutReason::PurchaseRefund));
        }
        batch.extend(extra);
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{InMemoryLedger, LedgerError};
    use tradeseal_binding::deterministic_blinding;
    use tradeseal_core::{ErrorKind, ValidationError};

    const PRICE: u128 = 1_000;
    const FEE: u128 = 50;
    const DEPOSIT: u128 = 300;

    fn seller() -> Address {
        Address::from_low_u64(0xa1)
    }
    fn buyer() -> Address {
        Address::from_low_u64(0xb2)
    }
    fn carrier() -> Address {
        Address::from_low_u64(0xc3)
    }
    fn escrow_addr() -> Address {
        Address::from_low_u64(0xe5)
    }

    fn t0() -> Timestamp {
        Timestamp::from_unix_secs(1_700_000_000).unwrap()
    }

    fn at(who: Address, secs_after: u64) -> CallContext {
        CallContext::new(who, t0().plus_secs(secs_after))
    }

    fn blinding() -> Bytes32 {
        deterministic_blinding(&escrow_addr(), &seller())
    }

    fn listed() -> EscrowInstance {
        let template = Arc::new(EscrowTemplate::new(
            Address::from_low_u64(0x1111),
            EscrowConfig::default(),
        ));
        let mut e = EscrowInstance::new(template, escrow_addr(), 1, "Coffee beans", seller(), t0()).unwrap();
        e.set_price_commitment(&at(seller(), 0), price_commitment(PRICE, &blinding()))
            .unwrap();
        e
    }

    fn bound() -> EscrowInstance {
        let mut e = listed();
        e.purchase(&at(buyer(), 10), Wei::new(PRICE)).unwrap();
        e.confirm_order(&at(seller(), 20), "cid-purchase").unwrap();
        e.create_transporter(&at(carrier(), 30), Wei::new(FEE)).unwrap();
        e.security_deposit(&at(carrier(), 40), Wei::new(DEPOSIT)).unwrap();
        e.set_transporter(&at(seller(), 50), carrier(), Wei::new(FEE)).unwrap();
        e
    }

    #[test]
    fn commitment_is_single_use() {
        let mut e = listed();
        let err = e
            .set_price_commitment(&at(seller(), 1), Bytes32::from_low_u64(5))
            .unwrap_err();
        assert_eq!(err, EscrowError::CommitmentFrozen);
        assert_eq!(e.price_commitment(), Some(price_commitment(PRICE, &blinding())));
    }

    #[test]
    fn zero_commitment_rejected() {
        let template = Arc::new(EscrowTemplate::new(Address::from_low_u64(1), EscrowConfig::default()));
        let mut e = EscrowInstance::new(template, escrow_addr(), 1, "x", seller(), t0()).unwrap();
        let err = e.set_price_commitment(&at(seller(), 0), Bytes32::ZERO).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!e.is_commitment_frozen());
        assert_eq!(
            e.purchase(&at(buyer(), 1), Wei::new(PRICE)).unwrap_err(),
            EscrowError::CommitmentNotSet
        );
    }

    #[test]
    fn only_owner_sets_commitment() {
        let template = Arc::new(EscrowTemplate::new(Address::from_low_u64(1), EscrowConfig::default()));
        let mut e = EscrowInstance::new(template, escrow_addr(), 1, "x", seller(), t0()).unwrap();
        let err = e
            .set_price_commitment(&at(buyer(), 0), Bytes32::from_low_u64(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn double_purchase_leaves_state_unchanged() {
        let mut e = listed();
        e.purchase(&at(buyer(), 10), Wei::new(PRICE)).unwrap();
        let before = e.snapshot();
        let events = e.events().len();

        let err = e
            .purchase(&at(Address::from_low_u64(0xd4), 11), Wei::new(PRICE))
            .unwrap_err();
        assert_eq!(err, EscrowError::AlreadyPurchased);
        assert_eq!(err.kind(), ErrorKind::State);
        assert_eq!(e.snapshot(), before);
        assert_eq!(e.events().len(), events);
    }

    #[test]
    fn owner_cannot_buy() {
        let mut e = listed();
        assert_eq!(
            e.purchase(&at(seller(), 1), Wei::new(PRICE)).unwrap_err(),
            EscrowError::OwnerCannotPurchase
        );
    }

    #[test]
    fn public_price_enforced() {
        let mut e = listed();
        e.set_public_price(&at(seller(), 1), Wei::new(PRICE)).unwrap();
        assert_eq!(
            e.set_public_price(&at(seller(), 2), Wei::new(PRICE)).unwrap_err(),
            EscrowError::PublicPriceAlreadySet
        );
        let err = e.purchase(&at(buyer(), 3), Wei::new(PRICE - 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Funds);
        e.purchase(&at(buyer(), 4), Wei::new(PRICE)).unwrap();
    }

    #[test]
    fn public_price_with_zero_commitment_rejected() {
        let mut e = listed();
        assert_eq!(
            e.set_public_price_with_commitment(&at(seller(), 1), Wei::new(PRICE), Bytes32::ZERO)
                .unwrap_err(),
            EscrowError::ZeroCommitment
        );
        assert_eq!(e.public_price(), None);
    }

    #[test]
    fn balance_tracks_every_inflow() {
        let e = bound();
        assert_eq!(e.balance(), Wei::new(PRICE + DEPOSIT + FEE));
        assert!(e.is_conserved());
        assert_eq!(e.phase(), Phase::Bound);
    }

    #[test]
    fn delivery_settles_everyone() {
        let mut e = bound();
        let mut ledger = InMemoryLedger::new();
        e.reveal_and_confirm_delivery(&at(buyer(), 60), Wei::new(PRICE), blinding(), "cid-delivery", &mut ledger)
            .unwrap();
        assert_eq!(e.phase(), Phase::Delivered);
        assert_eq!(e.balance(), Wei::ZERO);
        assert!(e.is_conserved());
        assert_eq!(ledger.balance_of(&seller()), Wei::new(PRICE));
        assert_eq!(ledger.balance_of(&carrier()), Wei::new(FEE + DEPOSIT));
        assert_eq!(e.stage_cid(Stage::Delivery), Some("cid-delivery"));
        assert_eq!(e.vc_history(), &["cid-purchase".to_string(), "cid-delivery".to_string()]);
    }

    #[test]
    fn wrong_reveal_rejected() {
        let mut e = bound();
        let mut ledger = InMemoryLedger::new();
        let err = e
            .reveal_and_confirm_delivery(
                &at(buyer(), 60),
                Wei::new(PRICE + 1),
                blinding(),
                "cid",
                &mut ledger,
            )
            .unwrap_err();
        assert_eq!(err, EscrowError::RevealMismatch);
        assert_eq!(e.phase(), Phase::Bound);
    }

    #[test]
    fn only_buyer_confirms_delivery() {
        let mut e = bound();
        let mut ledger = InMemoryLedger::new();
        let err = e
            .reveal_and_confirm_delivery(&at(seller(), 60), Wei::new(PRICE), blinding(), "cid", &mut ledger)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authorization);
    }

    #[test]
    fn refused_payout_rolls_back() {
        let mut e = bound();
        let before = e.snapshot();
        let events = e.events().len();
        let mut ledger = InMemoryLedger::new();
        ledger.refuse_payments_to(carrier());

        let err = e
            .reveal_and_confirm_delivery(&at(buyer(), 60), Wei::new(PRICE), blinding(), "cid-delivery", &mut ledger)
            .unwrap_err();
        assert_eq!(err, EscrowError::Ledger(LedgerError::Rejected(carrier())));
        assert_eq!(e.snapshot(), before);
        assert_eq!(e.events().len(), events);
        assert_eq!(ledger.balance_of(&seller()), Wei::ZERO);

        ledger.accept_payments_to(&carrier());
        e.reveal_and_confirm_delivery(&at(buyer(), 61), Wei::new(PRICE), blinding(), "cid-delivery", &mut ledger)
            .unwrap();
        assert_eq!(e.balance(), Wei::ZERO);
    }

    #[test]
    fn withdraw_refunds_deposit_and_clears_candidate() {
        let mut e = listed();
        let mut ledger = InMemoryLedger::new();
        e.purchase(&at(buyer(), 1), Wei::new(PRICE)).unwrap();
        e.create_transporter(&at(carrier(), 2), Wei::new(FEE)).unwrap();
        e.security_deposit(&at(carrier(), 3), Wei::new(DEPOSIT)).unwrap();
        assert_eq!(e.balance(), Wei::new(PRICE + DEPOSIT));

        e.withdraw_bid(&at(carrier(), 4), &mut ledger).unwrap();
        assert!(e.bid(&carrier()).is_none());
        assert_eq!(e.balance(), Wei::new(PRICE));
        assert_eq!(ledger.balance_of(&carrier()), Wei::new(DEPOSIT));
        assert!(e.is_conserved());
    }

    #[test]
    fn assigned_transporter_cannot_withdraw() {
        let mut e = bound();
        let mut ledger = InMemoryLedger::new();
        assert_eq!(
            e.withdraw_bid(&at(carrier(), 60), &mut ledger).unwrap_err(),
            EscrowError::SelectedTransporterCannotWithdraw
        );
    }

    #[test]
    fn owner_and_buyer_cannot_bid() {
        let mut e = listed();
        e.purchase(&at(buyer(), 1), Wei::new(PRICE)).unwrap();
        assert_eq!(e.create_transporter(&at(seller(), 2), Wei::new(FEE)).unwrap_err().kind(), ErrorKind::Authorization);
        assert_eq!(e.create_transporter(&at(buyer(), 2), Wei::new(FEE)).unwrap_err().kind(), ErrorKind::Authorization);
    }

    #[test]
    fn bid_cap_enforced() {
        let template = Arc::new(EscrowTemplate::new(
            Address::from_low_u64(1),
            EscrowConfig {
                max_bids: 2,
                ..EscrowConfig::default()
            },
        ));
        let mut e = EscrowInstance::new(template, escrow_addr(), 1, "x", seller(), t0()).unwrap();
        e.create_transporter(&at(Address::from_low_u64(0x101), 0), Wei::new(1)).unwrap();
        e.create_transporter(&at(Address::from_low_u64(0x102), 0), Wei::new(1)).unwrap();
        assert_eq!(
            e.create_transporter(&at(Address::from_low_u64(0x103), 0), Wei::new(1)).unwrap_err(),
            EscrowError::BidCapReached(2)
        );
        e.create_transporter(&at(Address::from_low_u64(0x101), 0), Wei::new(3)).unwrap();
    }

    #[test]
    fn set_transporter_requires_exact_fee() {
        let mut e = listed();
        e.purchase(&at(buyer(), 1), Wei::new(PRICE)).unwrap();
        e.confirm_order(&at(seller(), 2), "cid").unwrap();
        e.create_transporter(&at(carrier(), 3), Wei::new(FEE)).unwrap();
        assert_eq!(
            e.set_transporter(&at(seller(), 4), carrier(), Wei::new(FEE - 1)).unwrap_err(),
            EscrowError::IncorrectFee {
                expected: Wei::new(FEE),
                got: Wei::new(FEE - 1)
            }
        );
        assert_eq!(
            e.set_transporter(&at(seller(), 4), Address::from_low_u64(0x77), Wei::new(FEE)).unwrap_err(),
            EscrowError::NotATransporter(Address::from_low_u64(0x77))
        );
    }

    #[test]
    fn seller_timeout_refunds_buyer() {
        let mut e = listed();
        let mut ledger = InMemoryLedger::new();
        e.purchase(&at(buyer(), 0), Wei::new(PRICE)).unwrap();
        let window = e.config().seller_window_secs;

        let err = e.seller_timeout(&at(buyer(), window), &mut ledger).unwrap_err();
        assert!(matches!(err, EscrowError::SellerWindowNotExpired { .. }));

        e.seller_timeout(&at(buyer(), window + 1), &mut ledger).unwrap();
        assert_eq!(e.phase(), Phase::Expired);
        assert_eq!(e.balance(), Wei::ZERO);
        assert_eq!(ledger.balance_of(&buyer()), Wei::new(PRICE));
    }

    #[test]
    fn bid_timeout_leaves_deposits_withdrawable() {
        let mut e = listed();
        let mut ledger = InMemoryLedger::new();
        e.purchase(&at(buyer(), 0), Wei::new(PRICE)).unwrap();
        e.confirm_order(&at(seller(), 0), "cid").unwrap();
        e.create_transporter(&at(carrier(), 0), Wei::new(FEE)).unwrap();
        e.security_deposit(&at(carrier(), 0), Wei::new(DEPOSIT)).unwrap();
        let window = e.config().bid_window_secs;

        e.bid_timeout(&at(carrier(), window + 1), &mut ledger).unwrap();
        assert_eq!(ledger.balance_of(&buyer()), Wei::new(PRICE));
        assert_eq!(e.balance(), Wei::new(DEPOSIT));
        assert!(e.is_conserved());

        e.withdraw_bid(&at(carrier(), window + 2), &mut ledger).unwrap();
        assert_eq!(e.balance(), Wei::ZERO);
    }

    #[test]
    fn delivery_timeout_compensates_buyer_and_refunds_fee() {
        let mut e = bound();
        let mut ledger = InMemoryLedger::new();
        let window = e.config().delivery_window_secs;
        assert!(matches!(
            e.delivery_timeout(&at(buyer(), 50 + window), &mut ledger).unwrap_err(),
            EscrowError::NotYetTimeout { .. }
        ));
        e.delivery_timeout(&at(buyer(), 51 + window), &mut ledger).unwrap();
        assert_eq!(e.phase(), Phase::Expired);
        assert_eq!(ledger.balance_of(&buyer()), Wei::new(PRICE + DEPOSIT));
        assert_eq!(ledger.balance_of(&seller()), Wei::new(FEE));
        assert_eq!(e.balance(), Wei::ZERO);
        assert!(e.is_conserved());
    }

    #[test]
    fn timeouts_only_in_their_phase() {
        let mut e = listed();
        let mut ledger = InMemoryLedger::new();
        assert!(matches!(
            e.seller_timeout(&at(buyer(), u64::MAX), &mut ledger).unwrap_err(),
            EscrowError::WrongPhase { .. }
        ));
    }

    #[test]
    fn update_vc_cid_writes_current_stage() {
        let mut e = listed();
        e.update_vc_cid(&at(seller(), 0), "cid-listing").unwrap();
        assert_eq!(e.stage_cid(Stage::Listing), Some("cid-listing"));
        assert_eq!(e.update_vc_cid(&at(seller(), 0), "").unwrap_err(), EscrowError::EmptyCid);
        assert_eq!(
            e.update_vc_cid(&at(buyer(), 0), "cid").unwrap_err().kind(),
            ErrorKind::Authorization
        );
    }

    #[test]
    fn cid_that_could_extend_a_schema_version_is_refused() {
        let mut e = listed();
        let before = e.snapshot();
        for cid in ["1Qm", ".0Qm"] {
            let err = e.update_vc_cid(&at(seller(), 0), cid).unwrap_err();
            assert!(
                matches!(err, EscrowError::Invalid(ValidationError::Malformed { field: "previousVCCid", .. })),
                "{cid}: {err:?}"
            );
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
        assert_eq!(e.snapshot(), before);
    }

    #[test]
    fn binding_context_links_previous_stage() {
        let mut e = listed();
        e.update_vc_cid(&at(seller(), 0), "cid-listing").unwrap();
        let ctx = e.binding_context(Stage::Purchase).unwrap();
        assert_eq!(ctx.previous_vc_cid(), Some("cid-listing"));
        assert_eq!(ctx.chain_id(), 11_155_111);
        assert_eq!(e.binding_context(Stage::Listing).unwrap().previous_vc_cid(), None);
        assert_ne!(
            e.binding_tag(Stage::Listing).unwrap(),
            e.binding_tag(Stage::Purchase).unwrap()
        );
    }

    #[test]
    fn tx_hash_tag_needs_buyer() {
        let mut e = listed();
        assert!(e.tx_hash_binding_tag().is_none());
        e.purchase(&at(buyer(), 0), Wei::new(PRICE)).unwrap();
        assert_eq!(
            e.tx_hash_binding_tag(),
            Some(tx_hash_binding_tag(11_155_111, &escrow_addr(), 1, &buyer()))
        );
    }

    #[test]
    fn buyer_reanchors_delivery_credential_with_commitment() {
        let mut e = bound();
        let mut ledger = InMemoryLedger::new();
        e.reveal_and_confirm_delivery(&at(buyer(), 60), Wei::new(PRICE), blinding(), "cid-delivery", &mut ledger)
            .unwrap();
        let tag = e.tx_hash_binding_tag().unwrap();
        let commitment = Bytes32::from_low_u64(0xde11);

        assert_eq!(
            e.update_vc_cid_after_delivery(&at(seller(), 61), "cid-final", Some(commitment))
                .unwrap_err()
                .kind(),
            ErrorKind::Authorization
        );
        e.update_vc_cid_after_delivery(&at(buyer(), 62), "cid-final", Some(commitment))
            .unwrap();
        assert_eq!(e.stage_cid(Stage::Delivery), Some("cid-final"));
        assert_eq!(e.vc_history().last().map(String::as_str), Some("cid-final"));
        assert_eq!(e.delivery_tx_commitment(), Some(commitment));
        assert_eq!(
            e.events().last(),
            Some(&EscrowEvent::DeliveryConfirmedWithCommitment {
                cid: "cid-final".into(),
                tx_hash_commitment: commitment,
            })
        );
        // The tag does not depend on phase, so purchase and delivery share it.
        assert_eq!(e.tx_hash_binding_tag(), Some(tag));
    }

    #[test]
    fn zero_delivery_commitment_emits_no_commitment_event() {
        let mut e = bound();
        let mut ledger = InMemoryLedger::new();
        e.reveal_and_confirm_delivery(&at(buyer(), 60), Wei::new(PRICE), blinding(), "cid-delivery", &mut ledger)
            .unwrap();
        e.update_vc_cid_after_delivery(&at(buyer(), 61), "cid-final", Some(Bytes32::ZERO))
            .unwrap();
        assert_eq!(e.delivery_tx_commitment(), None);
        assert!(!e
            .events()
            .iter()
            .any(|ev| matches!(ev, EscrowEvent::DeliveryConfirmedWithCommitment { .. })));
        assert_eq!(e.stage_cid(Stage::Delivery), Some("cid-final"));
    }

    #[test]
    fn delivery_reanchor_requires_delivered_phase() {
        let mut e = bound();
        let before = e.snapshot();
        let err = e
            .update_vc_cid_after_delivery(&at(buyer(), 55), "cid-final", None)
            .unwrap_err();
        assert!(matches!(err, EscrowError::WrongPhase { phase: Phase::Bound, .. }));
        assert_eq!(e.snapshot(), before);
    }

    #[test]
    fn snapshot_restores() {
        let e = bound();
        let json = serde_json::to_string(&e.snapshot()).unwrap();
        let snap: EscrowSnapshot = serde_json::from_str(&json).unwrap();
        let restored = EscrowInstance::from_snapshot(e.template().clone(), snap);
        assert_eq!(restored.snapshot(), e.snapshot());
        assert!(restored.is_conserved());
    }
}
