//! Application-wide constants.

/// Application name.
pub const APP_NAME: &str = "MetaSnap";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Database schema version.
///
/// Version 1 holds `snaps` and `config`; version 2 adds `applog`.
pub const DB_SCHEMA_VERSION: i32 = 2;

/// Number of snaps rendered per page window.
pub const PAGE_SIZE: u32 = 10;

/// Default number of snaps posted per sync request.
pub const DEFAULT_BATCH_SIZE: u32 = 10;

/// Smallest accepted batch size.
pub const MIN_BATCH_SIZE: u32 = 1;

/// Largest accepted batch size.
pub const MAX_BATCH_SIZE: u32 = 100;

/// Default application log threshold (INFO and above).
pub const DEFAULT_APP_LOG_LEVEL: u8 = 1;

/// Highest application log threshold (ERROR only).
pub const MAX_APP_LOG_LEVEL: u8 = 3;

/// Title pre-filled on new snaps when none is configured.
pub const DEFAULT_SNAP_TITLE: &str = "MetaSnap: ";

/// Longest accepted e-mail address.
pub const MAX_ADDRESS_LEN: usize = 320;

/// Separator between addresses in the stored `mailTo` value.
pub const ADDRESS_SEPARATOR: char = ';';

/// Header carrying the recipient list on sync posts.
pub const MAILTO_HEADER: &str = "configured-mailto";

/// Default sync endpoint.
pub const DEFAULT_SYNC_ENDPOINT: &str = "http://localhost:5000/";

/// Path fragment identifying the offline fallback page.
pub const DEFAULT_OFFLINE_PATH: &str = "offline.html";

/// Default sync request timeout in milliseconds.
pub const DEFAULT_API_TIMEOUT_MS: u64 = 30_000;

/// Sentinel written for coordinates when no location was acquired.
pub const UNKNOWN_COORDINATE: &str = "Unknown";

/// Names of the settings stored in the `config` table.
pub mod setting_keys {
    pub const MAIL_TO: &str = "mailTo";
    pub const APP_LOG_LEVEL: &str = "appLogLevel";
    pub const DEFAULT_TITLE: &str = "defaultTitle";
    pub const BATCH_SIZE: &str = "batchSize";

    /// All recognized setting names.
    pub const ALL: &[&str] = &[MAIL_TO, APP_LOG_LEVEL, DEFAULT_TITLE, BATCH_SIZE];
}

/// User-facing status texts.
pub mod status {
    pub const EDITS_SAVED: &str = "Any edited snaps saved.";
    pub const EDITS_FAILED: &str = "Some snap edits have failed. Please see the app log.";
    pub const NOTHING_TO_POST: &str = "Nothing to post.";
    pub const MISSING_ADDRESS: &str =
        "Please set an email address to send the snaps to using `metasnap config set --mail-to`.";
    pub const PARTIAL_POST: &str = "Some snaps posted, not all. Please check the app log.";
    pub const UNREACHABLE: &str =
        "Cannot submit snaps as the target server appears to be unreachable.";
    pub const POST_IN_PROGRESS: &str = "A post is already in progress.";
    pub const CONFIG_SAVED: &str = "Config saved successfully";
}
