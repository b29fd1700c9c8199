use crate::app::config::RdspConfig;
use anyhow::{Error, bail};
use parking_lot::{RwLock, RwLockReadGuard};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// Which reloadable sections differ after a [`ConfigManager::reload`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigChange {
    pub recall: bool,
    pub ledger: bool,
}

impl ConfigChange {
    pub fn any(&self) -> bool {
        self.recall || self.ledger
    }
}

/// Owns the local config file and re-reads it on demand so
/// dependency settings can change without a restart
pub struct ConfigManager {
    path: PathBuf,
    cfg: RwLock<RdspConfig>,
    started: AtomicBool,
}

impl ConfigManager {
    pub fn new(cfg_path: PathBuf) -> ConfigManager {
        ConfigManager {
            path: cfg_path,
            cfg: RwLock::new(RdspConfig::default()),
            started: AtomicBool::new(false),
        }
    }

    /// Loads initial config
    pub fn start(&self) -> Result<(), Error> {
        *self.cfg.write() = RdspConfig::load(&self.path)?;
        self.started.store(true, Ordering::Release);

        Ok(())
    }

    /// Re-reads the file, keeping the current config if it fails to
    /// load, and reports which sections changed
    pub fn reload(&self) -> Result<ConfigChange, Error> {
        let next = RdspConfig::load(&self.path)?;

        Ok(self.replace(next))
    }

    fn replace(&self, next: RdspConfig) -> ConfigChange {
        let mut cfg = self.cfg.write();

        let change = ConfigChange {
            recall: cfg.recall != next.recall,
            ledger: cfg.ledger != next.ledger,
        };

        *cfg = next;

        change
    }

    /// Get an immutable read for the current config
    pub fn get(&self) -> Result<RwLockReadGuard<'_, RdspConfig>, Error> {
        if !self.started.load(Ordering::Acquire) {
            bail!("ConfigManager not started yet but fetching config");
        }

        Ok(self.cfg.read())
    }
}
