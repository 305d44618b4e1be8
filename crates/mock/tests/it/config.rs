//! Configuration loading and its effect on the registry.

use foundry_mock::{MockConfig, MockFactory, MockOptions, MockRegistry};
use std::sync::Arc;

#[test]
fn seeded_addresses_are_reproducible() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(MockConfig::FILE_NAME, "seed = 1337")?;
        let config = MockConfig::load().unwrap();
        assert_eq!(config.seed, Some(1337));

        let abi = crate::utils::simple_storage_abi();
        let addresses = || {
            let factory = MockFactory::new(Arc::new(MockRegistry::with_config(&config)));
            (0..3)
                .map(|_| factory.from_abi(&abi, MockOptions::default()).unwrap().address())
                .collect::<Vec<_>>()
        };
        let first = addresses();
        assert_eq!(first, addresses());

        let mut unique = first.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 3);
        Ok(())
    });
}

#[test]
fn env_overrides_file() {
    figment::Jail::expect_with(|jail| {
        jail.create_file(MockConfig::FILE_NAME, "seed = 1")?;
        jail.set_env("MOCK_SEED", "2");
        assert_eq!(MockConfig::load().unwrap().seed, Some(2));
        Ok(())
    });
}

#[test]
fn custom_file() {
    figment::Jail::expect_with(|jail| {
        jail.create_file("mocks.toml", "seed = 5")?;
        assert_eq!(MockConfig::load_with("mocks.toml").unwrap().seed, Some(5));
        assert_eq!(MockConfig::load().unwrap(), MockConfig::default());
        Ok(())
    });
}
