//! Runtime configuration
//!
//! Everything is read from the environment; the initramfs has no config files.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_PLUGIN_PATH: &str = "/usr/lib/splash/plugins";
pub const DEFAULT_MODULE_NAME: &str = "label.so";
pub const DEFAULT_FACTORY_SYMBOL: &str = "splash_label_plugin_get_interface";
pub const DEFAULT_FB_DEVICE: &str = "/dev/fb0";

/// Where a label looks for its backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelConfig {
    /// Directory holding label backend modules
    pub backend_search_path: PathBuf,
    /// File name of the label module inside the search path
    pub module_name: String,
    /// Factory entry point exported by the module
    pub factory_symbol: String,
}

impl LabelConfig {
    pub fn new(backend_search_path: impl Into<PathBuf>) -> Self {
        Self {
            backend_search_path: backend_search_path.into(),
            ..Self::default()
        }
    }

    /// Full path of the module to resolve at bind time.
    pub fn module_path(&self) -> PathBuf {
        self.backend_search_path.join(&self.module_name)
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            backend_search_path: PathBuf::from(DEFAULT_PLUGIN_PATH),
            module_name: DEFAULT_MODULE_NAME.to_string(),
            factory_symbol: DEFAULT_FACTORY_SYMBOL.to_string(),
        }
    }
}

/// How backend modules are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoaderKind {
    /// Shared objects through the platform dynamic loader
    Dynamic,
    /// Backends linked into this binary
    Builtin,
    /// Dynamic first, then builtin
    #[default]
    Auto,
}

impl FromStr for LoaderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dynamic" | "dl" => Ok(LoaderKind::Dynamic),
            "builtin" => Ok(LoaderKind::Builtin),
            "auto" | "" => Ok(LoaderKind::Auto),
            other => Err(format!("unknown loader kind '{other}'")),
        }
    }
}

impl fmt::Display for LoaderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderKind::Dynamic => write!(f, "dynamic"),
            LoaderKind::Builtin => write!(f, "builtin"),
            LoaderKind::Auto => write!(f, "auto"),
        }
    }
}

/// Settings for the splash binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplashConfig {
    pub label: LabelConfig,
    pub loader: LoaderKind,
    pub fb_device: PathBuf,
    pub log_to_kmsg: bool,
}

impl Default for SplashConfig {
    fn default() -> Self {
        Self {
            label: LabelConfig::default(),
            loader: LoaderKind::default(),
            fb_device: PathBuf::from(DEFAULT_FB_DEVICE),
            log_to_kmsg: false,
        }
    }
}

impl SplashConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("SPLASH_PLUGIN_PATH").filter(|p| !p.is_empty()) {
            config.label.backend_search_path = PathBuf::from(path);
        }

        if let Some(kind) = lookup("SPLASH_LABEL_LOADER") {
            config.loader = kind.parse().unwrap_or_else(|e| {
                warn!("{}, using {}", e, LoaderKind::Auto);
                LoaderKind::Auto
            });
        }

        if let Some(dev) = lookup("SPLASH_FB_DEVICE").filter(|d| !d.is_empty()) {
            config.fb_device = PathBuf::from(dev);
        }

        config.log_to_kmsg = lookup("SPLASH_LOG_KMSG")
            .map(|v| matches!(v.trim(), "1" | "true" | "yes"))
            .unwrap_or(false);

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = SplashConfig::from_lookup(|_| None);
        assert_eq!(config, SplashConfig::default());
        assert_eq!(
            config.label.module_path(),
            PathBuf::from("/usr/lib/splash/plugins/label.so")
        );
    }

    #[test]
    fn environment_overrides() {
        let config = SplashConfig::from_lookup(lookup_from(&[
            ("SPLASH_PLUGIN_PATH", "/opt/splash"),
            ("SPLASH_LABEL_LOADER", "Builtin"),
            ("SPLASH_FB_DEVICE", "/dev/fb1"),
            ("SPLASH_LOG_KMSG", "1"),
        ]));
        assert_eq!(config.label.module_path(), PathBuf::from("/opt/splash/label.so"));
        assert_eq!(config.loader, LoaderKind::Builtin);
        assert_eq!(config.fb_device, PathBuf::from("/dev/fb1"));
        assert!(config.log_to_kmsg);
    }

    #[test]
    fn unknown_loader_falls_back_to_auto() {
        let config = SplashConfig::from_lookup(lookup_from(&[("SPLASH_LABEL_LOADER", "magic")]));
        assert_eq!(config.loader, LoaderKind::Auto);
    }
}
