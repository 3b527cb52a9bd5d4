//! Configuration file watcher for hot reload.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::{self, ConfigError};
use crate::config::schema::GatewayConfig;

/// Reloads the config file on change and forwards valid configs.
///
/// An invalid file is logged and ignored; the running config stays.
pub struct ConfigWatcher {
    path: PathBuf,
    overrides: Box<dyn Fn(&mut GatewayConfig) + Send + Sync>,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<GatewayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                overrides: Box::new(|_| {}),
                update_tx,
            },
            update_rx,
        )
    }

    /// Re-apply environment/CLI overrides to every reloaded config.
    pub fn with_overrides<F>(mut self, overrides: F) -> Self
    where
        F: Fn(&mut GatewayConfig) + Send + Sync + 'static,
    {
        self.overrides = Box::new(overrides);
        self
    }

    fn reload(&self) -> Result<GatewayConfig, ConfigError> {
        let content = std::fs::read_to_string(&self.path)?;
        let mut config = loader::parse_config(&content)?;
        (self.overrides)(&mut config);
        loader::check(&config)?;
        Ok(config)
    }

    /// Start watching. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if event.kind.is_modify() || event.kind.is_create() => {
                    tracing::info!(path = ?self.path, "Config file change detected, reloading");
                    match self.reload() {
                        Ok(config) => {
                            let _ = self.update_tx.send(config);
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to reload config, keeping current configuration");
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&path, RecursiveMode::NonRecursive)?;
        tracing::info!(path = ?path, "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reload_applies_overrides_before_validation() {
        let mut path = std::env::temp_dir();
        path.push(format!("db-gateway-watch-{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[database]\nuri_template = \"mongodb://u:<PASSWORD>@h/<DATABASE>\"\n"
        )
        .unwrap();

        let (watcher, _rx) = ConfigWatcher::new(&path);
        assert!(matches!(watcher.reload(), Err(ConfigError::Validation(_))));

        let (watcher, _rx) = ConfigWatcher::new(&path);
        let watcher = watcher.with_overrides(|c| c.database.password = Some("pw".into()));
        let config = watcher.reload().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.database.password.as_deref(), Some("pw"));
    }
}
