//! Persisted room settings and ban list
//!
//! Guarded by its own mutex. Nothing in here ever touches the session
//! registry, so the two locks are never held together.

use parking_lot::Mutex;
use rand::Rng;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::models::{AccessMode, BanRecord, Settings};
use crate::{Error, Result};

const PASSWORD_LENGTH: usize = 20;

struct SettingsState {
    settings: Settings,
    stream_key_override: Option<String>,
    admin_password_override: Option<String>,
    mod_passwords: Vec<String>,
}

pub struct SettingsStore {
    path: Option<PathBuf>,
    state: Mutex<SettingsState>,
}

impl SettingsStore {
    /// Load settings from a JSON file, creating it when missing
    ///
    /// A fresh admin password is generated on every load and written back.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut settings = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str::<Settings>(&raw)?
        } else {
            info!(path = %path.display(), "Settings file not found, creating defaults");
            Settings::default()
        };

        settings.apply_defaults();
        settings.admin_password = generate_password();
        if settings.stream_key.is_empty() {
            warn!("No stream key configured");
        }

        let store = Self {
            path: Some(path),
            state: Mutex::new(SettingsState {
                settings,
                stream_key_override: None,
                admin_password_override: None,
                mod_passwords: Vec::new(),
            }),
        };
        store.save()?;

        info!(
            admin_password = %store.admin_password(),
            "Settings loaded, new admin password generated"
        );
        Ok(store)
    }

    /// Settings that are never written to disk
    #[must_use]
    pub fn in_memory() -> Self {
        let mut settings = Settings::default();
        settings.admin_password = generate_password();
        Self::from_settings(settings)
    }

    /// Wrap explicit settings without a backing file
    #[must_use]
    pub fn from_settings(mut settings: Settings) -> Self {
        settings.apply_defaults();
        Self {
            path: None,
            state: Mutex::new(SettingsState {
                settings,
                stream_key_override: None,
                admin_password_override: None,
                mod_passwords: Vec::new(),
            }),
        }
    }

    pub fn save(&self) -> Result<()> {
        let state = self.state.lock();
        self.persist(&state.settings)
    }

    fn persist(&self, settings: &Settings) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let encoded = serde_json::to_string_pretty(settings)?;
        std::fs::write(path, encoded)?;
        debug!(path = %path.display(), "Settings saved");
        Ok(())
    }

    /// Known names for a banned host, `None` when the host is not banned
    #[must_use]
    pub fn is_banned(&self, host: &str) -> Option<Vec<String>> {
        let state = self.state.lock();
        state
            .settings
            .bans
            .iter()
            .find(|ban| ban.host == host)
            .map(|ban| ban.names.clone())
    }

    /// Record a ban for a host, merging names into any existing record
    pub fn add_ban(&self, host: &str, names: Vec<String>) -> Result<()> {
        if is_loopback(host) {
            return Err(Error::InvalidInput("Cannot add a ban for localhost.".to_string()));
        }

        let mut state = self.state.lock();
        if let Some(existing) = state.settings.bans.iter_mut().find(|ban| ban.host == host) {
            existing.merge_names(names.iter().cloned());
            existing.banned_at = chrono::Utc::now();
        } else {
            state.settings.bans.push(BanRecord::new(host, names.clone()));
        }

        info!(host, names = %names.join(", "), "Host banned");
        self.persist(&state.settings)
    }

    /// Remove every ban record listing `name`, returns whether any was removed
    pub fn remove_ban(&self, name: &str) -> Result<bool> {
        let mut state = self.state.lock();
        let before = state.settings.bans.len();
        state.settings.bans.retain(|ban| {
            let matched = ban.has_name(name);
            if matched {
                info!(host = %ban.host, name, "Ban removed");
            }
            !matched
        });

        if state.settings.bans.len() == before {
            return Ok(false);
        }
        self.persist(&state.settings)?;
        Ok(true)
    }

    #[must_use]
    pub fn bans(&self) -> Vec<BanRecord> {
        self.state.lock().settings.bans.clone()
    }

    /// The command line password wins over the generated one
    #[must_use]
    pub fn admin_password(&self) -> String {
        let state = self.state.lock();
        state
            .admin_password_override
            .clone()
            .unwrap_or_else(|| state.settings.admin_password.clone())
    }

    /// Held in memory only; the settings file keeps the generated password
    pub fn set_admin_password_override(&self, password: impl Into<String>) {
        let password = password.into();
        let mut state = self.state.lock();
        state.admin_password_override = (!password.is_empty()).then_some(password);
    }

    /// Generate a unique single-use moderator password
    pub fn generate_mod_password(&self) -> String {
        let mut state = self.state.lock();
        let mut password = generate_password();
        while state.mod_passwords.contains(&password) {
            password = generate_password();
        }
        state.mod_passwords.push(password.clone());
        password
    }

    /// Consume a moderator password; each one works exactly once
    pub fn redeem_mod_password(&self, password: &str) -> bool {
        if password.is_empty() {
            return false;
        }
        let mut state = self.state.lock();
        match state.mod_passwords.iter().position(|p| p == password) {
            Some(index) => {
                state.mod_passwords.swap_remove(index);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn access_mode(&self) -> AccessMode {
        self.state.lock().settings.room_access
    }

    #[must_use]
    pub fn pin(&self) -> String {
        self.state.lock().settings.room_access_pin.clone()
    }

    /// Switch the access mode; pin mode without a pin generates one
    ///
    /// Returns the active pin.
    pub fn set_access(&self, mode: AccessMode, pin: Option<String>) -> Result<String> {
        let mut state = self.state.lock();
        state.settings.room_access = mode;
        if mode == AccessMode::Pin {
            state.settings.room_access_pin = pin.unwrap_or_else(generate_pin);
        }
        let pin = state.settings.room_access_pin.clone();
        self.persist(&state.settings)?;
        Ok(pin)
    }

    #[must_use]
    pub fn title_length(&self) -> usize {
        self.state.lock().settings.title_length
    }

    #[must_use]
    pub fn max_message_count(&self) -> usize {
        self.state.lock().settings.max_message_count
    }

    /// The command line key wins over the persisted one
    #[must_use]
    pub fn stream_key(&self) -> String {
        let state = self.state.lock();
        state
            .stream_key_override
            .clone()
            .unwrap_or_else(|| state.settings.stream_key.clone())
    }

    pub fn set_stream_key_override(&self, key: impl Into<String>) {
        let key = key.into();
        let mut state = self.state.lock();
        state.stream_key_override = (!key.is_empty()).then_some(key);
    }
}

fn is_loopback(host: &str) -> bool {
    host.eq_ignore_ascii_case("localhost")
        || host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

/// Twenty uppercase hex digits
fn generate_password() -> String {
    let mut rng = rand::rng();
    (0..PASSWORD_LENGTH)
        .map(|_| {
            let digit: u32 = rng.random_range(0..16);
            char::from_digit(digit, 16).unwrap_or('0').to_ascii_uppercase()
        })
        .collect()
}

fn generate_pin() -> String {
    let pin: u32 = rand::rng().random_range(0..10_000);
    format!("{pin:04}")
}
