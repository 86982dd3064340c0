//! Names shared between the stores, the change bus and the hosts.

/// Topic published after every successful save or effective unsave.
pub const TOPIC_SAVE_STATE_CHANGED: &str = "save-state-changed";

/// Topic published after a view counter increment is persisted.
pub const TOPIC_VIEW_COUNT_CHANGED: &str = "view-count-changed";

/// Persistent-store key holding the local saved set.
pub const SAVED_SET_KEY: &str = "saved-set";

/// Prefix of the per-country view counter keys (`viewcount:<entity key>`).
pub const VIEW_COUNT_PREFIX: &str = "viewcount:";

// Labels the hosts render for absent fields (placeholders included).
pub const NO_CAPITAL: &str = "No capital";
pub const NO_REGION: &str = "No region";
pub const NO_POPULATION: &str = "No data";
