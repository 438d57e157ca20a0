//! # Escrow Factory
//!
//! Creates escrow instances from one shared [`EscrowTemplate`]. Each
//! instance gets a sequential product id (starting at 1, never reused) and
//! an EVM-style address:
//!
//! - [`EscrowFactory::create_product`] derives it from the factory address
//!   and nonce, as a plain contract creation would;
//! - [`EscrowFactory::create_product_deterministic`] derives it from the
//!   current implementation and a caller-chosen salt, so it can be
//!   predicted with [`EscrowFactory::predict_product_address`] first.
//!
//! ## Locking
//!
//! The id counter, nonce, creation order, pause flag and template live in
//! one mutex-guarded registry; every creation holds it for its whole
//! duration. Instances are indexed by address in a `DashMap` and each one
//! sits behind its own mutex, so operations on different products never
//! contend.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tradeseal_core::{Address, Bytes32, Wei};

use crate::address::{create_address, predict_clone_address};
use crate::config::EscrowConfig;
use crate::error::EscrowError;
use crate::events::FactoryEvent;
use crate::instance::{CallContext, EscrowInstance, EscrowTemplate};

/// An instance shared between the factory index and its callers.
pub type SharedInstance = Arc<Mutex<EscrowInstance>>;

#[derive(Debug, Clone)]
pub struct ProductHandle {
    pub address: Address,
    pub product_id: u64,
    pub instance: SharedInstance,
}

#[derive(Debug)]
struct Registry {
    owner: Address,
    template: Arc<EscrowTemplate>,
    paused: bool,
    product_count: u64,
    nonce: u64,
    order: Vec<Address>,
    events: Vec<FactoryEvent>,
}

#[derive(Debug)]
pub struct EscrowFactory {
    address: Address,
    registry: Mutex<Registry>,
    instances: DashMap<Address, SharedInstance>,
}

impl EscrowFactory {
    pub fn new(
        address: Address,
        owner: Address,
        implementation: Address,
        config: EscrowConfig,
    ) -> Result<Self, EscrowError> {
        if address.is_zero() {
            return Err(EscrowError::ZeroAddress("factory"));
        }
        if owner.is_zero() {
            return Err(EscrowError::ZeroAddress("factory owner"));
        }
        if implementation.is_zero() {
            return Err(EscrowError::ZeroAddress("implementation"));
        }
        Ok(Self {
            address,
            registry: Mutex::new(Registry {
                owner,
                template: Arc::new(EscrowTemplate::new(implementation, config)),
                paused: false,
                product_count: 0,
                nonce: 1,
                order: Vec::new(),
                events: Vec::new(),
            }),
            instances: DashMap::new(),
        })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.registry.lock().owner
    }

    pub fn implementation(&self) -> Address {
        self.registry.lock().template.implementation
    }

    pub fn config(&self) -> EscrowConfig {
        self.registry.lock().template.config.clone()
    }

    pub fn is_paused(&self) -> bool {
        self.registry.lock().paused
    }

    pub fn product_count(&self) -> u64 {
        self.registry.lock().product_count
    }

    pub fn product(&self, address: &Address) -> Option<SharedInstance> {
        self.instances.get(address).map(|entry| Arc::clone(entry.value()))
    }

    pub fn events(&self) -> Vec<FactoryEvent> {
        self.registry.lock().events.clone()
    }

    /// Addresses of up to `count` products starting at `offset`, in creation
    /// order. Ranges past the end are truncated.
    pub fn get_products_range(&self, offset: usize, count: usize) -> Vec<Address> {
        let reg = self.registry.lock();
        reg.order.iter().skip(offset).take(count).copied().collect()
    }

    /// Address a deterministic creation with `salt` would produce under the
    /// current implementation.
    pub fn predict_product_address(&self, salt: &Bytes32) -> Address {
        let implementation = self.registry.lock().template.implementation;
        predict_clone_address(&self.address, &implementation, salt)
    }

    // ─── Creation ────────────────────────────────────────────────────

    /// List a new product owned by the caller. The price commitment is set
    /// and frozen immediately; `public_price` optionally publishes a
    /// plaintext price as well.
    pub fn create_product(
        &self,
        ctx: &CallContext,
        name: &str,
        price_commitment: Bytes32,
        public_price: Option<Wei>,
    ) -> Result<ProductHandle, EscrowError> {
        let mut reg = self.registry.lock();
        let address = create_address(&self.address, reg.nonce);
        if self.instances.contains_key(&address) {
            return Err(EscrowError::AddressOccupied(address));
        }
        self.register(&mut reg, ctx, address, name, price_commitment, public_price)
    }

    /// List a new product at the address determined by `salt`.
    pub fn create_product_deterministic(
        &self,
        ctx: &CallContext,
        name: &str,
        price_commitment: Bytes32,
        salt: Bytes32,
    ) -> Result<ProductHandle, EscrowError> {
        let mut reg = self.registry.lock();
        let address = predict_clone_address(&self.address, &reg.template.implementation, &salt);
        if self.instances.contains_key(&address) {
            tracing::warn!(factory = %self.address, salt = %salt, "salt reuse rejected");
            return Err(EscrowError::SaltAlreadyUsed(salt));
        }
        self.register(&mut reg, ctx, address, name, price_commitment, None)
    }

    fn register(
        &self,
        reg: &mut Registry,
        ctx: &CallContext,
        address: Address,
        name: &str,
        price_commitment: Bytes32,
        public_price: Option<Wei>,
    ) -> Result<ProductHandle, EscrowError> {
        if reg.paused {
            return Err(EscrowError::FactoryPaused);
        }
        if price_commitment.is_zero() {
            return Err(EscrowError::ZeroCommitment);
        }
        let product_id = reg.product_count.checked_add(1).ok_or(EscrowError::Overflow)?;
        let nonce = reg.nonce.checked_add(1).ok_or(EscrowError::Overflow)?;

        let mut instance = EscrowInstance::new(
            Arc::clone(&reg.template),
            address,
            product_id,
            name,
            ctx.caller,
            ctx.now,
        )?;
        instance.set_price_commitment(ctx, price_commitment)?;
        if let Some(price) = public_price {
            instance.set_public_price(ctx, price)?;
        }

        let shared = Arc::new(Mutex::new(instance));
        self.instances.insert(address, Arc::clone(&shared));
        reg.product_count = product_id;
        reg.nonce = nonce;
        reg.order.push(address);
        reg.events.push(FactoryEvent::ProductCreated {
            product: address,
            seller: ctx.caller,
            product_id,
            name: name.to_string(),
        });
        tracing::info!(
            factory = %self.address,
            product = %address,
            product_id,
            seller = %ctx.caller,
            "product created"
        );
        Ok(ProductHandle {
            address,
            product_id,
            instance: shared,
        })
    }

    // ─── Administration ──────────────────────────────────────────────

    fn require_owner(reg: &Registry, ctx: &CallContext) -> Result<(), EscrowError> {
        if ctx.caller != reg.owner {
            return Err(EscrowError::NotFactoryOwner { caller: ctx.caller });
        }
        Ok(())
    }

    pub fn pause(&self, ctx: &CallContext) -> Result<(), EscrowError> {
        let mut reg = self.registry.lock();
        Self::require_owner(&reg, ctx)?;
        if reg.paused {
            return Err(EscrowError::FactoryPaused);
        }
        reg.paused = true;
        reg.events.push(FactoryEvent::Paused { by: ctx.caller });
        tracing::info!(factory = %self.address, "factory paused");
        Ok(())
    }

    /// Resume creation. Unpausing a running factory is a no-op.
    pub fn unpause(&self, ctx: &CallContext) -> Result<(), EscrowError> {
        let mut reg = self.registry.lock();
        Self::require_owner(&reg, ctx)?;
        if !reg.paused {
            return Ok(());
        }
        reg.paused = false;
        reg.events.push(FactoryEvent::Unpaused { by: ctx.caller });
        tracing::info!(factory = %self.address, "factory unpaused");
        Ok(())
    }

    /// Point future clones at a new implementation. Existing instances keep
    /// the template they were created with. Allowed while paused.
    pub fn set_implementation(&self, ctx: &CallContext, implementation: Address) -> Result<(), EscrowError> {
        let mut reg = self.registry.lock();
        Self::require_owner(&reg, ctx)?;
        if implementation.is_zero() {
            return Err(EscrowError::ZeroAddress("implementation"));
        }
        let old = reg.template.implementation;
        reg.template = Arc::new(EscrowTemplate::new(implementation, reg.template.config.clone()));
        reg.events.push(FactoryEvent::ImplementationUpdated {
            old,
            new: implementation,
        });
        tracing::info!(factory = %self.address, %old, new = %implementation, "implementation updated");
        Ok(())
    }
}
