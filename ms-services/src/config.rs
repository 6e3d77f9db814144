//! User settings resolution and the in-memory mirror.
//!
//! Settings live as name/value rows in the `config` table. The resolver
//! turns those rows into a typed `ResolvedConfig`, falling back to defaults
//! for anything absent, unparseable, or out of range. The two settings read
//! on hot paths (`appLogLevel` and `defaultTitle`) are also held in a
//! `ConfigMirror` that is primed at startup and refreshed after every save.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};

use ms_core::constants::{
    setting_keys, status, ADDRESS_SEPARATOR, DEFAULT_APP_LOG_LEVEL, DEFAULT_BATCH_SIZE,
    DEFAULT_SNAP_TITLE, MAX_ADDRESS_LEN, MAX_APP_LOG_LEVEL, MAX_BATCH_SIZE, MIN_BATCH_SIZE,
};
use ms_core::error::{MsError, MsResult};
use ms_models::{ConfigEntry, RecordStore};

use crate::applog::AppLogger;
use crate::event_bus::{AppEvent, EventBus};
use crate::service::{Service, ServiceState, StateCell};

/// Values mirrored in memory for synchronous-style access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorValues {
    pub app_log_level: u8,
    pub default_title: String,
}

impl Default for MirrorValues {
    fn default() -> Self {
        Self {
            app_log_level: DEFAULT_APP_LOG_LEVEL,
            default_title: DEFAULT_SNAP_TITLE.to_string(),
        }
    }
}

/// Shared in-memory copy of the hot settings.
#[derive(Debug, Clone, Default)]
pub struct ConfigMirror {
    inner: Arc<RwLock<MirrorValues>>,
}

impl ConfigMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn app_log_level(&self) -> u8 {
        self.inner.read().await.app_log_level
    }

    pub async fn default_title(&self) -> String {
        self.inner.read().await.default_title.clone()
    }

    pub async fn values(&self) -> MirrorValues {
        self.inner.read().await.clone()
    }

    /// Overwrite the mirror from a full resolution.
    pub async fn prime(&self, resolved: &ResolvedConfig) {
        let mut values = self.inner.write().await;
        values.app_log_level = resolved.app_log_level;
        values.default_title = resolved.default_title.clone();
        debug!(
            "config mirror primed (appLogLevel={}, defaultTitle={:?})",
            values.app_log_level, values.default_title
        );
    }

    pub async fn set_app_log_level(&self, level: u8) {
        self.inner.write().await.app_log_level = level;
    }

    pub async fn set_default_title(&self, title: String) {
        self.inner.write().await.default_title = title;
    }
}

/// Typed view of every recognised setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedConfig {
    pub mail_to: String,
    pub app_log_level: u8,
    pub default_title: String,
    pub batch_size: u32,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            mail_to: String::new(),
            app_log_level: DEFAULT_APP_LOG_LEVEL,
            default_title: DEFAULT_SNAP_TITLE.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl ResolvedConfig {
    /// The configured addresses, one per entry.
    pub fn mail_to_list(&self) -> Vec<String> {
        split_addresses(&self.mail_to)
    }

    pub fn has_address(&self) -> bool {
        !self.mail_to.trim().is_empty()
    }

    fn apply(&mut self, entry: &ConfigEntry) {
        match entry.name.as_str() {
            setting_keys::MAIL_TO => self.mail_to = entry.value.clone(),
            setting_keys::APP_LOG_LEVEL => self.app_log_level = resolve_log_level(&entry.value),
            setting_keys::DEFAULT_TITLE => self.default_title = entry.value.clone(),
            setting_keys::BATCH_SIZE => self.batch_size = resolve_batch_size(&entry.value),
            other => debug!("ignoring unrecognised setting {other}"),
        }
    }
}

/// Parse an integer setting, falling back to `default` when it is not a
/// whole number within `[min, max]`.
fn resolve_bounded(name: &str, raw: &str, min: i64, max: i64, default: i64) -> i64 {
    match raw.trim().parse::<i64>() {
        Ok(value) if (min..=max).contains(&value) => value,
        _ => {
            let err = MsError::ConfigBounds {
                name: name.to_string(),
                value: raw.to_string(),
            };
            debug!("{err}; using default {default}");
            default
        }
    }
}

pub fn resolve_log_level(raw: &str) -> u8 {
    resolve_bounded(
        setting_keys::APP_LOG_LEVEL,
        raw,
        0,
        i64::from(MAX_APP_LOG_LEVEL),
        i64::from(DEFAULT_APP_LOG_LEVEL),
    ) as u8
}

pub fn resolve_batch_size(raw: &str) -> u32 {
    resolve_bounded(
        setting_keys::BATCH_SIZE,
        raw,
        i64::from(MIN_BATCH_SIZE),
        i64::from(MAX_BATCH_SIZE),
        i64::from(DEFAULT_BATCH_SIZE),
    ) as u32
}

/// Addresses rejected while building a `mailTo` value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinedAddresses {
    pub value: String,
    pub rejected: Vec<String>,
}

/// Join addresses into one `mailTo` value.
///
/// Blank entries are dropped silently. Entries longer than the maximum
/// address length are dropped and reported in `rejected`.
pub fn join_addresses(addresses: &[String]) -> JoinedAddresses {
    let mut kept = Vec::new();
    let mut rejected = Vec::new();

    for address in addresses {
        let address = address.trim();
        if address.is_empty() {
            continue;
        }
        if address.chars().count() > MAX_ADDRESS_LEN {
            rejected.push(address.to_string());
            continue;
        }
        kept.push(address);
    }

    let separator = ADDRESS_SEPARATOR.to_string();
    JoinedAddresses {
        value: kept.join(separator.as_str()),
        rejected,
    }
}

/// Split a stored `mailTo` value back into addresses.
pub fn split_addresses(mail_to: &str) -> Vec<String> {
    mail_to
        .split(ADDRESS_SEPARATOR)
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(String::from)
        .collect()
}

/// Reads and writes user settings.
pub struct ConfigResolver {
    state: StateCell,
    store: RecordStore,
    mirror: ConfigMirror,
    logger: AppLogger,
    event_bus: EventBus,
}

impl ConfigResolver {
    pub fn new(
        store: RecordStore,
        mirror: ConfigMirror,
        logger: AppLogger,
        event_bus: EventBus,
    ) -> Self {
        Self {
            state: StateCell::new(),
            store,
            mirror,
            logger,
            event_bus,
        }
    }

    pub fn mirror(&self) -> &ConfigMirror {
        &self.mirror
    }

    /// Resolve every stored setting.
    pub fn load(&self) -> MsResult<ResolvedConfig> {
        let mut resolved = ResolvedConfig::default();
        for entry in self.store.iterate::<ConfigEntry>() {
            resolved.apply(&entry?);
        }
        Ok(resolved)
    }

    /// Resolve and refresh the mirror.
    pub async fn load_and_prime(&self) -> MsResult<ResolvedConfig> {
        let resolved = self.load()?;
        self.mirror.prime(&resolved).await;
        Ok(resolved)
    }

    /// Persist entries in one write unit, then refresh the mirror.
    ///
    /// On failure nothing is written and the mirror is left as it was.
    pub async fn save(&self, entries: &[ConfigEntry]) -> MsResult<()> {
        let result = self.store.write(|unit| {
            for entry in entries {
                unit.put(entry)?;
            }
            Ok(())
        });

        if let Err(e) = result {
            self.logger
                .escalate(format!("Error when attempting to save config: {e}"))
                .await;
            return Err(e);
        }

        for entry in entries {
            match entry.name.as_str() {
                setting_keys::APP_LOG_LEVEL => {
                    self.mirror
                        .set_app_log_level(resolve_log_level(&entry.value))
                        .await
                }
                setting_keys::DEFAULT_TITLE => {
                    self.mirror.set_default_title(entry.value.clone()).await
                }
                _ => {}
            }
        }

        info!("saved {} setting(s)", entries.len());
        self.event_bus.emit(AppEvent::ConfigSaved {
            names: entries.iter().map(|e| e.name.clone()).collect(),
        });
        self.event_bus.status(status::CONFIG_SAVED);
        Ok(())
    }

    /// Save all recognised settings at once.
    pub async fn save_settings(
        &self,
        addresses: &[String],
        app_log_level: u8,
        default_title: &str,
        batch_size: u32,
    ) -> MsResult<()> {
        let joined = join_addresses(addresses);
        for address in &joined.rejected {
            self.logger
                .warning(format!(
                    "Ignoring address longer than {MAX_ADDRESS_LEN} characters: {address}"
                ))
                .await;
        }

        let entries = [
            ConfigEntry::new(setting_keys::MAIL_TO, joined.value),
            ConfigEntry::new(setting_keys::APP_LOG_LEVEL, app_log_level.to_string()),
            ConfigEntry::new(setting_keys::DEFAULT_TITLE, default_title),
            ConfigEntry::new(setting_keys::BATCH_SIZE, batch_size.to_string()),
        ];
        self.save(&entries).await
    }
}

impl Service for ConfigResolver {
    fn name(&self) -> &str {
        "config"
    }

    fn state(&self) -> ServiceState {
        self.state.get()
    }

    fn init(&self) -> MsResult<()> {
        self.state.set(ServiceState::Running);
        Ok(())
    }

    fn shutdown(&self) -> MsResult<()> {
        self.state.set(ServiceState::Stopped);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_size_bounds() {
        assert_eq!(resolve_batch_size("25"), 25);
        assert_eq!(resolve_batch_size(" 100 "), 100);
        assert_eq!(resolve_batch_size("1"), 1);
        assert_eq!(resolve_batch_size("0"), DEFAULT_BATCH_SIZE);
        assert_eq!(resolve_batch_size("101"), DEFAULT_BATCH_SIZE);
        assert_eq!(resolve_batch_size("-5"), DEFAULT_BATCH_SIZE);
        assert_eq!(resolve_batch_size("ten"), DEFAULT_BATCH_SIZE);
        assert_eq!(resolve_batch_size("12.5"), DEFAULT_BATCH_SIZE);
        assert_eq!(resolve_batch_size(""), DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_log_level_bounds() {
        assert_eq!(resolve_log_level("0"), 0);
        assert_eq!(resolve_log_level("3"), 3);
        assert_eq!(resolve_log_level("4"), DEFAULT_APP_LOG_LEVEL);
        assert_eq!(resolve_log_level("debug"), DEFAULT_APP_LOG_LEVEL);
    }

    #[test]
    fn test_join_addresses_drops_blank_and_overlong() {
        let long = format!("{}@example.com", "a".repeat(MAX_ADDRESS_LEN));
        let joined = join_addresses(&[
            "a@example.com".to_string(),
            "   ".to_string(),
            long.clone(),
            " b@example.com ".to_string(),
        ]);
        assert_eq!(joined.value, "a@example.com;b@example.com");
        assert_eq!(joined.rejected, vec![long]);
    }

    #[test]
    fn test_split_addresses() {
        assert_eq!(
            split_addresses("a@example.com; b@example.com;;"),
            vec!["a@example.com".to_string(), "b@example.com".to_string()]
        );
        assert!(split_addresses("").is_empty());
    }

    #[test]
    fn test_unrecognised_names_ignored() {
        let mut resolved = ResolvedConfig::default();
        resolved.apply(&ConfigEntry::new("theme", "dark"));
        assert_eq!(resolved, ResolvedConfig::default());
    }

    #[test]
    fn test_empty_default_title_is_kept() {
        let mut resolved = ResolvedConfig::default();
        resolved.apply(&ConfigEntry::new(setting_keys::DEFAULT_TITLE, ""));
        assert_eq!(resolved.default_title, "");
    }

    #[tokio::test]
    async fn test_mirror_prime() {
        let mirror = ConfigMirror::new();
        assert_eq!(mirror.app_log_level().await, DEFAULT_APP_LOG_LEVEL);

        let resolved = ResolvedConfig {
            app_log_level: 3,
            default_title: "Site: ".into(),
            ..ResolvedConfig::default()
        };
        mirror.prime(&resolved).await;
        assert_eq!(
            mirror.values().await,
            MirrorValues { app_log_level: 3, default_title: "Site: ".into() }
        );
    }
}
