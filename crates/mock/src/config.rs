use crate::Result;
use figment::{
    Figment, Metadata, Profile, Provider,
    providers::{Env, Format, Serialized, Toml},
    value::{Dict, Map},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings of the mock engine.
///
/// Sources, from lowest to highest precedence: built-in defaults, [`MockConfig::FILE_NAME`] in
/// the current directory, `MOCK_`-prefixed environment variables.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Seed for mock address allocation. Unset means addresses come from OS randomness.
    pub seed: Option<u64>,
}

impl MockConfig {
    /// The default config file name.
    pub const FILE_NAME: &'static str = "mock.toml";

    /// The prefix of environment variables that override file settings.
    pub const ENV_PREFIX: &'static str = "MOCK_";

    /// Loads the config from the current directory and environment.
    pub fn load() -> Result<Self> {
        Self::load_with(Self::FILE_NAME)
    }

    /// Loads the config from the given file and environment.
    pub fn load_with(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::figment_with(path).extract()?)
    }

    /// The figment [`load`](Self::load) extracts from.
    pub fn figment() -> Figment {
        Self::figment_with(Self::FILE_NAME)
    }

    fn figment_with(path: impl AsRef<Path>) -> Figment {
        Figment::from(Self::default())
            .merge(Toml::file(path))
            .merge(Env::prefixed(Self::ENV_PREFIX))
    }
}

impl Provider for MockConfig {
    fn metadata(&self) -> Metadata {
        Metadata::named("Mock Config")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, figment::Error> {
        Serialized::defaults(self).data()
    }
}
