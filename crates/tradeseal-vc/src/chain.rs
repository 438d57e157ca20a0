//! Provenance-chain traversal: follow `previousCredential` links from the
//! newest credential back to the listing credential.

use std::collections::HashSet;

use tradeseal_cas::ContentStore;
use tradeseal_core::ContentDigest;

use crate::credential::StageCredential;
use crate::error::VcError;

/// A lifecycle has three stages; anything deeper than this is malformed.
pub const DEFAULT_MAX_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLink {
    pub cid: ContentDigest,
    pub credential: StageCredential,
}

/// Credentials ordered newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceChain {
    links: Vec<ChainLink>,
}

impl ProvenanceChain {
    pub fn traverse<S: ContentStore + ?Sized>(
        store: &S,
        latest: &ContentDigest,
    ) -> Result<Self, VcError> {
        Self::traverse_with_limit(store, latest, DEFAULT_MAX_DEPTH)
    }

    pub fn traverse_with_limit<S: ContentStore + ?Sized>(
        store: &S,
        latest: &ContentDigest,
        max_depth: usize,
    ) -> Result<Self, VcError> {
        let mut links = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(*latest);

        while let Some(cid) = next {
            if !seen.insert(cid) {
                return Err(VcError::Cycle(cid.to_string()));
            }
            if links.len() == max_depth {
                return Err(VcError::TooDeep(max_depth));
            }
            let credential = StageCredential::load(store, &cid)?;
            next = credential.credential_subject.previous_digest()?;
            links.push(ChainLink { cid, credential });
        }

        tracing::debug!(latest = %latest, depth = links.len(), "traversed provenance chain");
        Ok(Self { links })
    }

    pub fn links(&self) -> &[ChainLink] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn latest(&self) -> Option<&ChainLink> {
        self.links.first()
    }

    /// The chain's root (the listing credential for a well-formed chain).
    pub fn origin(&self) -> Option<&ChainLink> {
        self.links.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::{Party, StageSubject};
    use tradeseal_cas::MemoryStore;
    use tradeseal_core::{Address, Stage, Timestamp};

    fn credential(stage: Stage, prev: Option<&ContentDigest>) -> StageCredential {
        let party = Party::ethr(1, &Address::from_low_u64(1), "Seller");
        let mut subject = StageSubject::new("Widget", 4, 1, Address::from_low_u64(9), stage);
        if let Some(p) = prev {
            subject = subject.with_previous(p);
        }
        StageCredential::new(
            party.clone(),
            party,
            subject,
            Timestamp::from_unix_secs(1_700_000_000).unwrap(),
        )
    }

    #[test]
    fn walks_back_to_listing() {
        let store = MemoryStore::new();
        let l = credential(Stage::Listing, None).publish(&store).unwrap();
        let p = credential(Stage::Purchase, Some(&l)).publish(&store).unwrap();
        let d = credential(Stage::Delivery, Some(&p)).publish(&store).unwrap();

        let chain = ProvenanceChain::traverse(&store, &d).unwrap();
        let cids: Vec<_> = chain.links().iter().map(|link| link.cid).collect();
        assert_eq!(cids, vec![d, p, l]);
        assert_eq!(chain.origin().unwrap().credential.stage(), Stage::Listing);
    }

    #[test]
    fn missing_link_is_store_error() {
        let store = MemoryStore::new();
        let dangling = tradeseal_core::sha256_bytes(b"gone");
        let d = credential(Stage::Delivery, Some(&dangling))
            .publish(&store)
            .unwrap();
        assert!(matches!(
            ProvenanceChain::traverse(&store, &d),
            Err(VcError::Store(_))
        ));
    }

    #[test]
    fn depth_limit_enforced() {
        let store = MemoryStore::new();
        let l = credential(Stage::Listing, None).publish(&store).unwrap();
        let p = credential(Stage::Purchase, Some(&l)).publish(&store).unwrap();
        assert!(matches!(
            ProvenanceChain::traverse_with_limit(&store, &p, 1),
            Err(VcError::TooDeep(1))
        ));
    }

    #[test]
    fn malformed_previous_link_rejected() {
        let store = MemoryStore::new();
        let mut vc = credential(Stage::Purchase, None);
        vc.credential_subject.previous_credential = Some("QmNotADigest".into());
        let cid = vc.publish(&store).unwrap();
        assert!(matches!(
            ProvenanceChain::traverse(&store, &cid),
            Err(VcError::Invalid(_))
        ));
    }
}
