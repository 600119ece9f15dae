//! Filesystem layout under the data directory.
//!
//! ```text
//! ~/.tabsplit/
//!   processed_orders.json
//!   aliases.yaml
//!   wolt-session.json
//! ```

use std::path::{Path, PathBuf};

pub const DATA_DIR: &str = ".tabsplit";
pub const LEDGER_FILE: &str = "processed_orders.json";
pub const ALIASES_FILE: &str = "aliases.yaml";
pub const SESSION_FILE: &str = "wolt-session.json";

/// `<home>/.tabsplit`
pub fn data_root(home: &Path) -> PathBuf {
    home.join(DATA_DIR)
}

pub fn ledger_path(data_root: &Path) -> PathBuf {
    data_root.join(LEDGER_FILE)
}

pub fn aliases_path(data_root: &Path) -> PathBuf {
    data_root.join(ALIASES_FILE)
}

pub fn session_file_path(data_root: &Path) -> PathBuf {
    data_root.join(SESSION_FILE)
}
