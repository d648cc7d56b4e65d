//! Registry of backends linked into the binary

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{Module, ModuleLoader};
use crate::config::LabelConfig;
use crate::error::LoaderError;
use crate::plugin::text::BitmapTextPlugin;
use crate::plugin::{NativeFactory, Symbol};

/// Resolves modules by full path against a compile-time registry.
///
/// A builtin module only answers at the path it was registered under, so the
/// search path still decides whether a backend is found.
#[derive(Default)]
pub struct BuiltinLoader {
    modules: HashMap<PathBuf, HashMap<String, NativeFactory>>,
}

impl BuiltinLoader {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every backend this crate ships, installed at the
    /// default plugin path
    pub fn with_default_backends() -> Self {
        let defaults = LabelConfig::default();
        let mut loader = Self::new();
        loader.register(
            defaults.module_path(),
            &defaults.factory_symbol,
            BitmapTextPlugin::factory(),
        );
        loader
    }

    /// Export `factory` as `symbol` from the module at `module`
    pub fn register(&mut self, module: impl Into<PathBuf>, symbol: &str, factory: NativeFactory) {
        self.modules
            .entry(module.into())
            .or_default()
            .insert(symbol.to_string(), factory);
    }
}

impl ModuleLoader for BuiltinLoader {
    fn resolve(&self, path: &Path) -> Result<Box<dyn Module>, LoaderError> {
        if path.file_name().is_none() {
            return Err(LoaderError::InvalidPath(path.to_path_buf()));
        }

        let symbols = self
            .modules
            .get(path)
            .ok_or_else(|| LoaderError::NotFound(path.to_path_buf()))?;

        debug!("Resolved builtin module {}", path.display());
        Ok(Box::new(BuiltinModule {
            path: path.to_path_buf(),
            symbols: symbols.clone(),
        }))
    }
}

struct BuiltinModule {
    path: PathBuf,
    symbols: HashMap<String, NativeFactory>,
}

impl Module for BuiltinModule {
    fn path(&self) -> &Path {
        &self.path
    }

    fn look_up(&self, symbol: &str) -> Option<Symbol> {
        self.symbols.get(symbol).cloned().map(Symbol::Native)
    }
}
