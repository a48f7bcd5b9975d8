use proptest::prelude::*;

use idrx_multichain::registry::{NetworkRegistry, DEFAULT_DECIMALS};

use crate::common::test_registry;

fn builtin_chain_ids() -> Vec<u64> {
    NetworkRegistry::builtin().list_chain_ids().into_iter().collect()
}

proptest! {
    #[test]
    fn test_chain_id_and_name_lookups_agree(chain_id in prop::sample::select(builtin_chain_ids())) {
        let registry = NetworkRegistry::builtin();

        let (by_chain, name) = registry.lookup_by_chain_id(chain_id).unwrap();
        let by_name = registry.lookup_by_name(name).unwrap();

        prop_assert_eq!(by_chain.chain_id, chain_id);
        prop_assert_eq!(by_name.chain_id, chain_id);
        prop_assert_eq!(by_chain, by_name);
        prop_assert!(registry.list_supported().contains(name));
        prop_assert_eq!(registry.decimals_for(chain_id), by_chain.decimals);
    }

    #[test]
    fn test_unknown_chains_use_fallback_precision(chain_id in 2_000_000u64..u64::MAX) {
        let registry = NetworkRegistry::builtin();
        prop_assume!(!registry.is_chain_supported(chain_id));

        prop_assert_eq!(registry.decimals_for(chain_id), DEFAULT_DECIMALS);
        prop_assert!(registry.lookup_by_chain_id(chain_id).is_err());
    }
}

#[test]
fn test_builtin_table_is_complete() {
    let registry = NetworkRegistry::builtin();
    assert_eq!(registry.len(), 8);
    assert_eq!(registry.list_supported().len(), registry.list_chain_ids().len());
    assert_eq!(registry.deployed().count(), 8);
    assert_eq!(registry.mainnets().count(), 8);

    // The token has no fractional digits on Polygon and BSC
    assert_eq!(registry.decimals_for(137), 0);
    assert_eq!(registry.decimals_for(56), 0);
    assert_eq!(registry.decimals_for(8453), 2);
}

#[test]
fn test_synthetic_registry_bijection() {
    let registry = test_registry();
    for chain_id in registry.list_chain_ids() {
        let name = registry.network_name(chain_id).unwrap();
        assert_eq!(registry.lookup_by_name(name).unwrap().chain_id, chain_id);
    }
    assert_eq!(registry.deployed().count(), 3);
}
