//! Property Registry - unique asset custody and listing
//!
//! The registry is an external collaborator. The ledger only needs to read
//! an asset's declared value and listing flag, and, once authority has been
//! delegated to it, move custody and toggle the listing.

use std::collections::BTreeMap;

use hearth_primitives::{AccountId, Amount, ErrorKind, PropertyId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the registry reports about an asset
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    /// Declared value in pool units
    pub value: Amount,
    /// Whether the asset is open for financing
    pub is_listed: bool,
    /// Current controlling identity
    pub custodian: AccountId,
}

/// Registry contract consumed by the ledger
///
/// Write calls carry the caller so an implementation can restrict them to
/// the delegated operator.
pub trait PropertyRegistry {
    fn asset(&self, id: PropertyId) -> Result<AssetInfo, RegistryError>;

    fn list_asset(&mut self, caller: &AccountId, id: PropertyId) -> Result<(), RegistryError>;

    fn unlist_asset(&mut self, caller: &AccountId, id: PropertyId) -> Result<(), RegistryError>;

    fn transfer_custody(
        &mut self,
        caller: &AccountId,
        from: &AccountId,
        to: &AccountId,
        id: PropertyId,
    ) -> Result<(), RegistryError>;
}

/// In-memory registry with a single delegated operator
#[derive(Clone, Debug)]
pub struct AssetRegistry {
    /// Identity allowed to list, unlist and move custody
    operator: AccountId,
    assets: BTreeMap<PropertyId, AssetInfo>,
    /// Next id handed out by `mint`
    next_id: u64,
}

impl AssetRegistry {
    /// Create an empty registry delegating authority to `operator`
    pub fn new(operator: AccountId) -> Self {
        Self {
            operator,
            assets: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn operator(&self) -> &AccountId {
        &self.operator
    }

    /// Mint a new unlisted asset
    pub fn mint(&mut self, custodian: AccountId, value: Amount) -> PropertyId {
        let id = PropertyId(self.next_id);
        self.next_id += 1;

        self.assets.insert(
            id,
            AssetInfo {
                value,
                is_listed: false,
                custodian,
            },
        );

        id
    }

    /// Mint an asset that is immediately open for financing
    pub fn mint_listed(&mut self, custodian: AccountId, value: Amount) -> PropertyId {
        let id = self.mint(custodian, value);
        if let Some(asset) = self.assets.get_mut(&id) {
            asset.is_listed = true;
        }
        id
    }

    /// All assets currently open for financing
    pub fn listed(&self) -> Vec<PropertyId> {
        self.assets
            .iter()
            .filter(|(_, a)| a.is_listed)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn count(&self) -> usize {
        self.assets.len()
    }

    fn ensure_operator(&self, caller: &AccountId) -> Result<(), RegistryError> {
        if caller != &self.operator {
            return Err(RegistryError::NotOperator(*caller));
        }
        Ok(())
    }

    fn asset_mut(&mut self, id: PropertyId) -> Result<&mut AssetInfo, RegistryError> {
        self.assets.get_mut(&id).ok_or(RegistryError::NotFound(id))
    }
}

impl PropertyRegistry for AssetRegistry {
    fn asset(&self, id: PropertyId) -> Result<AssetInfo, RegistryError> {
        self.assets.get(&id).copied().ok_or(RegistryError::NotFound(id))
    }

    fn list_asset(&mut self, caller: &AccountId, id: PropertyId) -> Result<(), RegistryError> {
        self.ensure_operator(caller)?;
        self.asset_mut(id)?.is_listed = true;
        Ok(())
    }

    fn unlist_asset(&mut self, caller: &AccountId, id: PropertyId) -> Result<(), RegistryError> {
        self.ensure_operator(caller)?;
        self.asset_mut(id)?.is_listed = false;
        Ok(())
    }

    fn transfer_custody(
        &mut self,
        caller: &AccountId,
        from: &AccountId,
        to: &AccountId,
        id: PropertyId,
    ) -> Result<(), RegistryError> {
        self.ensure_operator(caller)?;
        let asset = self.asset_mut(id)?;

        if &asset.custodian != from {
            return Err(RegistryError::CustodyMismatch {
                id,
                expected: *from,
                actual: asset.custodian,
            });
        }

        asset.custodian = *to;
        Ok(())
    }
}

/// Registry errors
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{0} not found")]
    NotFound(PropertyId),

    #[error("{0} is not the registry operator")]
    NotOperator(AccountId),

    #[error("{id} is held by {actual}, not {expected}")]
    CustodyMismatch {
        id: PropertyId,
        expected: AccountId,
        actual: AccountId,
    },
}

impl RegistryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::NotFound(_) => ErrorKind::Validation,
            RegistryError::NotOperator(_) => ErrorKind::Authorization,
            RegistryError::CustodyMismatch { .. } => ErrorKind::Integrity,
        }
    }
}
