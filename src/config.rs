use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn, Level};

use crate::controller::profile::{self, ControllerProfile, LOGITECH_F710};

const CONFIG_DIR: &str = ".config/padwatch";
const CONFIG_FILE: &str = "config.toml";

/// Profile value that selects the table from the reported device name
pub const AUTO_PROFILE: &str = "auto";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Unknown controller profile: {0}")]
    UnknownProfile(String),

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),
}

/// How decoded events leave the device thread
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConsumeMode {
    /// Blocking decode loop owned by the session
    #[default]
    Loop,
    /// Chunks pulled into a queue, then decoded
    Queue,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct MonitorConfig {
    pub device: PathBuf,
    /// Profile key, or `auto` to match on the reported name
    pub profile: String,
    pub log_level: String,
    /// Prefix each printed event with the local wall-clock time
    pub timestamps: bool,
    pub mode: ConsumeMode,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/input/js0"),
            profile: AUTO_PROFILE.to_string(),
            log_level: "info".to_string(),
            timestamps: false,
            mode: ConsumeMode::Loop,
        }
    }
}

impl MonitorConfig {
    /// Loads `~/.config/padwatch/config.toml`, falling back to defaults when
    /// the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = default_path();
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Applies `padwatch [/dev/input/jsX]`; extra arguments are ignored.
    pub fn apply_args<I: IntoIterator<Item = String>>(mut self, args: I) -> Self {
        let mut args = args.into_iter();
        if let Some(device) = args.next() {
            self.device = PathBuf::from(device);
        }
        let extra = args.count();
        if extra > 0 {
            warn!("Ignoring {} extra arguments", extra);
        }
        self
    }

    pub fn level(&self) -> Result<Level, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }

    /// Resolves the configured profile, consulting the reported name for `auto`.
    ///
    /// An `auto` lookup that matches nothing yields the F710 table, so the
    /// identity check at bind time rejects the device by name.
    pub fn resolve_profile(
        &self,
        reported_name: &str,
    ) -> Result<&'static ControllerProfile, ConfigError> {
        if self.profile == AUTO_PROFILE {
            return Ok(profile::find_by_signature(reported_name).unwrap_or_else(|| {
                warn!(
                    "No profile matches {:?}, falling back to {}",
                    reported_name, LOGITECH_F710.key
                );
                &LOGITECH_F710
            }));
        }
        profile::find_by_key(&self.profile)
            .ok_or_else(|| ConfigError::UnknownProfile(self.profile.clone()))
    }
}

fn default_path() -> PathBuf {
    let mut path = dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    });
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::device::testing::ScriptedNode;
    use crate::controller::device::DeviceHandle;
    use crate::controller::session::{Bound, ControllerSession, SessionError};
    use std::sync::{Arc, Mutex};

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: MonitorConfig = toml::from_str(
            r#"
            device = "/dev/input/js2"
            timestamps = true
            mode = "queue"
            "#,
        )
        .expect("parse");

        assert_eq!(config.device, PathBuf::from("/dev/input/js2"));
        assert!(config.timestamps);
        assert_eq!(config.mode, ConsumeMode::Queue);
        assert_eq!(config.profile, AUTO_PROFILE);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn from_file_reports_path_on_bad_toml() {
        let path = std::env::temp_dir().join(format!("padwatch-bad-{}.toml", std::process::id()));
        fs::write(&path, "device = [").expect("write");

        let err = MonitorConfig::from_file(&path).expect_err("parse error");
        fs::remove_file(&path).ok();

        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("padwatch-bad-"));
    }

    #[test]
    fn first_argument_overrides_device() {
        let config = MonitorConfig::default()
            .apply_args(vec!["/dev/input/js5".to_string(), "extra".to_string()]);
        assert_eq!(config.device, PathBuf::from("/dev/input/js5"));

        let config = MonitorConfig::default().apply_args(Vec::new());
        assert_eq!(config.device, PathBuf::from("/dev/input/js0"));
    }

    #[test]
    fn level_parsing() {
        let mut config = MonitorConfig::default();
        assert_eq!(config.level().expect("level"), Level::INFO);
        config.log_level = "debug".to_string();
        assert_eq!(config.level().expect("level"), Level::DEBUG);
        config.log_level = "loud".to_string();
        assert!(matches!(config.level(), Err(ConfigError::InvalidLogLevel(_))));
    }

    #[test]
    fn profile_resolution() {
        let mut config = MonitorConfig::default();
        assert_eq!(
            config.resolve_profile("Logitech Gamepad F710").expect("auto"),
            &LOGITECH_F710
        );
        assert_eq!(
            config.resolve_profile("Generic Pad").expect("fallback"),
            &LOGITECH_F710
        );

        config.profile = "logitech-f710".to_string();
        assert_eq!(
            config.resolve_profile("Generic Pad").expect("by key"),
            &LOGITECH_F710
        );

        config.profile = "missing".to_string();
        assert!(matches!(
            config.resolve_profile("Logitech Gamepad F710"),
            Err(ConfigError::UnknownProfile(_))
        ));
    }

    #[test]
    fn auto_profile_still_rejects_foreign_devices_at_bind() {
        let config = MonitorConfig::default();
        let handle = DeviceHandle::from_node(
            "/dev/input/js0",
            Box::new(ScriptedNode::new("Generic Pad", 2, 8)),
        );

        let profile = config.resolve_profile(handle.name()).expect("auto");
        let err = ControllerSession::<Bound>::bind(handle, profile).expect_err("mismatch");

        assert!(matches!(err, SessionError::IdentityMismatch { .. }));
        let message = err.to_string();
        assert!(message.contains("/dev/input/js0"));
        assert!(message.contains("Generic Pad"));
        assert!(message.contains("Logitech Gamepad F710"));
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn config_load_messages_reach_the_startup_subscriber() {
        let path = std::env::temp_dir().join(format!("padwatch-ok-{}.toml", std::process::id()));
        fs::write(&path, "timestamps = true").expect("write");

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = crate::logging::subscriber(Level::INFO, move || writer.clone());
        let config =
            tracing::subscriber::with_default(subscriber, || MonitorConfig::from_file(&path));
        fs::remove_file(&path).ok();

        assert!(config.expect("config").timestamps);
        let output = String::from_utf8(captured.0.lock().expect("lock").clone()).expect("utf8");
        assert!(output.contains("Loaded config from"));
    }
}
