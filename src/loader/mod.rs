//! Backend module loading
//!
//! Resolves label backend modules by path and looks up their entry points.
//! Dropping a [`Module`] releases it.

pub mod builtin;
pub mod dl;

use std::path::Path;
use std::rc::Rc;
use tracing::debug;

use crate::config::LoaderKind;
use crate::error::LoaderError;
use crate::plugin::Symbol;

/// Trait for module loaders
pub trait ModuleLoader {
    /// Resolve the module at `path`
    fn resolve(&self, path: &Path) -> Result<Box<dyn Module>, LoaderError>;
}

/// A resolved module
pub trait Module {
    fn path(&self) -> &Path;

    /// Look up an entry point by name
    fn look_up(&self, symbol: &str) -> Option<Symbol>;
}

/// Tries each loader in turn
pub struct FallbackLoader {
    loaders: Vec<Box<dyn ModuleLoader>>,
}

impl FallbackLoader {
    pub fn new(loaders: Vec<Box<dyn ModuleLoader>>) -> Self {
        Self { loaders }
    }
}

impl ModuleLoader for FallbackLoader {
    fn resolve(&self, path: &Path) -> Result<Box<dyn Module>, LoaderError> {
        let mut last_err = LoaderError::NotFound(path.to_path_buf());
        for loader in &self.loaders {
            match loader.resolve(path) {
                Ok(module) => return Ok(module),
                Err(e) => {
                    debug!("Loader could not resolve {}: {}", path.display(), e);
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }
}

/// Create the loader for `kind`
pub fn create_loader(kind: LoaderKind) -> Rc<dyn ModuleLoader> {
    match kind {
        LoaderKind::Dynamic => Rc::new(dl::DlLoader::new()),
        LoaderKind::Builtin => Rc::new(builtin::BuiltinLoader::with_default_backends()),
        LoaderKind::Auto => Rc::new(FallbackLoader::new(vec![
            Box::new(dl::DlLoader::new()),
            Box::new(builtin::BuiltinLoader::with_default_backends()),
        ])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LabelConfig, DEFAULT_FACTORY_SYMBOL, DEFAULT_MODULE_NAME};

    #[test]
    fn auto_falls_back_to_builtin_at_default_path() {
        let path = LabelConfig::default().module_path();

        let loader = create_loader(LoaderKind::Auto);
        let module = loader.resolve(&path).unwrap();
        assert!(module.look_up(DEFAULT_FACTORY_SYMBOL).is_some());
    }

    #[test]
    fn auto_does_not_find_module_outside_search_path() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join(DEFAULT_MODULE_NAME);

        let loader = create_loader(LoaderKind::Auto);
        let err = loader.resolve(&path).err().unwrap();
        assert!(matches!(err, LoaderError::NotFound(p) if p == path));
    }

    #[test]
    fn dynamic_only_reports_missing_module() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join(DEFAULT_MODULE_NAME);

        let loader = create_loader(LoaderKind::Dynamic);
        let err = loader.resolve(&path).err().unwrap();
        assert!(matches!(err, LoaderError::NotFound(p) if p == path));
    }

    #[test]
    fn fallback_returns_last_error() {
        let loader = FallbackLoader::new(vec![
            Box::new(builtin::BuiltinLoader::new()),
            Box::new(builtin::BuiltinLoader::new()),
        ]);
        let err = loader.resolve(Path::new("/nowhere/label.so")).err().unwrap();
        assert!(matches!(err, LoaderError::NotFound(_)));
    }

    #[test]
    fn empty_fallback_is_not_found() {
        let loader = FallbackLoader::new(Vec::new());
        assert!(loader.resolve(Path::new("label.so")).is_err());
    }
}
