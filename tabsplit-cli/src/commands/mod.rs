pub mod auth;
pub mod orders;
pub mod sync;

use anyhow::{Context, Result};

use tabsplit_core::Config;

pub(crate) fn load_config() -> Result<Config> {
    Config::from_env().context("failed to read configuration from the environment")
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}
