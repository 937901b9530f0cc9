//! shared fixtures for the integration tests

#![allow(dead_code)]

use hearth_ledger::{ledger_account, AssetRegistry, Protocol, ProtocolConfig};
use hearth_primitives::{AccountId, Amount, PropertyId, Timestamp};
use tracing_subscriber::EnvFilter;

pub const T0: Timestamp = Timestamp::from_secs(1_700_000_000);

/// RUST_LOG=hearth_ledger=debug shows every transition
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn account(label: &str) -> AccountId {
    AccountId::derive(label.as_bytes())
}

pub fn owner() -> AccountId {
    account("owner")
}

pub fn lender() -> AccountId {
    account("lender")
}

pub fn seller() -> AccountId {
    account("seller")
}

pub fn borrower() -> AccountId {
    account("borrower")
}

/// protocol over a registry holding one listed asset per entry in `values`,
/// all in the seller's custody
pub fn market(values: &[u64]) -> (Protocol<AssetRegistry>, Vec<PropertyId>) {
    init_tracing();

    let mut registry = AssetRegistry::new(ledger_account());
    let assets = values
        .iter()
        .map(|value| registry.mint_listed(seller(), Amount::from(*value)))
        .collect();

    let protocol = Protocol::new(owner(), ProtocolConfig::default(), registry)
        .expect("default config is valid");
    (protocol, assets)
}
