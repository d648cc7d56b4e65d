//! Label facade
//!
//! A [`Label`] shows one line of text without knowing which backend draws it.
//! The backend is bound lazily on the first `show`; until then text is only
//! buffered and every query answers as if the label were not on screen.

use std::fmt;
use std::rc::Rc;
use tracing::{debug, info, warn};

use crate::config::LabelConfig;
use crate::error::{BindError, LabelError};
use crate::loader::{self, Module, ModuleLoader};
use crate::plugin::{LabelControl, LabelPlugin};
use crate::ui::Window;

/// Backend state held while bound.
///
/// Fields drop in declaration order: the control goes first, then the
/// interface it came from, then the module that provides both.
struct Binding {
    control: Box<dyn LabelControl>,
    plugin: Box<dyn LabelPlugin>,
    module: Box<dyn Module>,
}

enum BindState {
    Unbound,
    Bound(Binding),
}

impl fmt::Display for BindState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindState::Unbound => write!(f, "Unbound"),
            BindState::Bound(binding) => write!(f, "Bound({})", binding.plugin.name()),
        }
    }
}

/// Single-line text display backed by a lazily bound plugin
pub struct Label {
    state: BindState,
    text: Option<String>,
    config: LabelConfig,
    loader: Rc<dyn ModuleLoader>,
}

impl Label {
    /// Label with the default configuration and loader
    pub fn new() -> Self {
        let config = LabelConfig::default();
        Self::with_loader(config, loader::create_loader(Default::default()))
    }

    /// Label resolving its backend through `loader`
    pub fn with_loader(config: LabelConfig, loader: Rc<dyn ModuleLoader>) -> Self {
        Self {
            state: BindState::Unbound,
            text: None,
            config,
            loader,
        }
    }

    /// Release the label, unbinding its backend first if there is one
    pub fn destroy(self) {
        debug!("Destroying label in state {}", self.state);
    }

    /// Last text passed to [`Label::set_text`]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.state, BindState::Bound(_))
    }

    /// Name of the bound backend, if any
    pub fn backend_name(&self) -> Option<&str> {
        match &self.state {
            BindState::Bound(binding) => Some(binding.plugin.name()),
            BindState::Unbound => None,
        }
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = Some(text.to_string());

        if let BindState::Bound(binding) = &mut self.state {
            binding.control.set_text(text);
        }
    }

    /// Show the label on `window` at (`x`, `y`), binding a backend first if needed.
    ///
    /// Returns the backend's own answer once bound.
    pub fn show(&mut self, window: &Window, x: i64, y: i64) -> Result<bool, LabelError> {
        let mut binding = match std::mem::replace(&mut self.state, BindState::Unbound) {
            BindState::Bound(binding) => binding,
            BindState::Unbound => {
                let binding = self.bind().map_err(|e| {
                    warn!("Label backend unavailable: {}", e);
                    e
                })?;
                info!(
                    "Label bound to '{}' from {}",
                    binding.plugin.name(),
                    binding.module.path().display()
                );
                binding
            }
        };

        let shown = binding.control.show(window, x, y);
        self.state = BindState::Bound(binding);
        Ok(shown)
    }

    pub fn draw(&mut self) {
        if let BindState::Bound(binding) = &mut self.state {
            binding.control.draw();
        }
    }

    pub fn hide(&mut self) {
        if let BindState::Bound(binding) = &mut self.state {
            binding.control.hide();
        }
    }

    /// A label without a backend is never visible
    pub fn is_hidden(&self) -> bool {
        match &self.state {
            BindState::Bound(binding) => binding.control.is_hidden(),
            BindState::Unbound => true,
        }
    }

    pub fn width(&self) -> i64 {
        match &self.state {
            BindState::Bound(binding) => binding.control.width(),
            BindState::Unbound => 0,
        }
    }

    pub fn height(&self) -> i64 {
        match &self.state {
            BindState::Bound(binding) => binding.control.height(),
            BindState::Unbound => 0,
        }
    }

    /// Drop the backend so the next `show` binds a fresh one. Text is kept.
    pub fn unbind(&mut self) {
        if let BindState::Bound(binding) = std::mem::replace(&mut self.state, BindState::Unbound) {
            info!("Unbinding label backend '{}'", binding.plugin.name());
        }
    }

    fn bind(&self) -> Result<Binding, BindError> {
        let path = self.config.module_path();
        debug!("Binding label backend from {}", path.display());

        let module = self.loader.resolve(&path)?;

        // Returning early drops `module`, which releases it.
        let symbol = module.look_up(&self.config.factory_symbol).ok_or_else(|| {
            BindError::MissingEntryPoint {
                module: path.clone(),
                symbol: self.config.factory_symbol.clone(),
            }
        })?;

        let plugin = symbol
            .instantiate()
            .ok_or_else(|| BindError::NullInterface { module: path.clone() })?;

        let mut control = plugin.create_control();
        if let Some(text) = &self.text {
            control.set_text(text);
        }

        Ok(Binding {
            control,
            plugin,
            module,
        })
    }
}

impl Default for Label {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Label")
            .field("state", &self.state.to_string())
            .field("text", &self.text)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoaderKind;
    use crate::error::LoaderError;
    use crate::loader::builtin::BuiltinLoader;
    use crate::plugin::NativeFactory;
    use crate::ui::{self, fb::Framebuffer};
    use std::cell::{Cell, RefCell};
    use std::path::Path;

    const MODULE: &str = "/plugins/label.so";
    const FACTORY: &str = "splash_label_plugin_get_interface";

    /// Everything the stub backend saw, shared with the test body.
    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<String>>,
        controls_created: Cell<usize>,
        controls_dropped: Cell<usize>,
        resolves: Cell<usize>,
        modules_released: Cell<usize>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }

        fn push(&self, call: String) {
            self.calls.borrow_mut().push(call);
        }
    }

    struct StubPlugin {
        recorder: Rc<Recorder>,
        show_result: bool,
    }

    impl LabelPlugin for StubPlugin {
        fn name(&self) -> &str {
            "stub"
        }

        fn create_control(&self) -> Box<dyn LabelControl> {
            self.recorder.controls_created.set(self.recorder.controls_created.get() + 1);
            self.recorder.push("create".to_string());
            Box::new(StubControl {
                recorder: self.recorder.clone(),
                show_result: self.show_result,
                text: String::new(),
                hidden: true,
            })
        }
    }

    struct StubControl {
        recorder: Rc<Recorder>,
        show_result: bool,
        text: String,
        hidden: bool,
    }

    impl LabelControl for StubControl {
        fn set_text(&mut self, text: &str) {
            self.recorder.push(format!("set_text:{text}"));
            self.text = text.to_string();
        }

        fn show(&mut self, _window: &Window, x: i64, y: i64) -> bool {
            self.recorder.push(format!("show:{x},{y}"));
            self.hidden = !self.show_result;
            self.show_result
        }

        fn draw(&mut self) {
            self.recorder.push("draw".to_string());
        }

        fn hide(&mut self) {
            self.recorder.push("hide".to_string());
            self.hidden = true;
        }

        fn is_hidden(&self) -> bool {
            self.hidden
        }

        fn width(&self) -> i64 {
            self.text.len() as i64 * 10
        }

        fn height(&self) -> i64 {
            if self.text.is_empty() {
                0
            } else {
                12
            }
        }
    }

    impl Drop for StubControl {
        fn drop(&mut self) {
            self.recorder.controls_dropped.set(self.recorder.controls_dropped.get() + 1);
        }
    }

    /// Wraps a builtin registry, counting resolves and releases.
    struct CountingLoader {
        inner: BuiltinLoader,
        recorder: Rc<Recorder>,
    }

    struct CountedModule {
        inner: Box<dyn Module>,
        recorder: Rc<Recorder>,
    }

    impl Module for CountedModule {
        fn path(&self) -> &Path {
            self.inner.path()
        }

        fn look_up(&self, symbol: &str) -> Option<crate::plugin::Symbol> {
            self.inner.look_up(symbol)
        }
    }

    impl Drop for CountedModule {
        fn drop(&mut self) {
            // The control must be gone before its module.
            assert_eq!(
                self.recorder.controls_created.get(),
                self.recorder.controls_dropped.get()
            );
            self.recorder.modules_released.set(self.recorder.modules_released.get() + 1);
        }
    }

    impl ModuleLoader for CountingLoader {
        fn resolve(&self, path: &Path) -> Result<Box<dyn Module>, LoaderError> {
            self.recorder.resolves.set(self.recorder.resolves.get() + 1);
            let inner = self.inner.resolve(path)?;
            Ok(Box::new(CountedModule {
                inner,
                recorder: self.recorder.clone(),
            }))
        }
    }

    fn stub_factory(recorder: &Rc<Recorder>, show_result: bool) -> NativeFactory {
        let recorder = recorder.clone();
        Rc::new(move || {
            Some(Box::new(StubPlugin {
                recorder: recorder.clone(),
                show_result,
            }) as Box<dyn LabelPlugin>)
        })
    }

    fn label_with(registry: BuiltinLoader, recorder: &Rc<Recorder>) -> Label {
        let loader = CountingLoader {
            inner: registry,
            recorder: recorder.clone(),
        };
        Label::with_loader(LabelConfig::new("/plugins"), Rc::new(loader))
    }

    fn working_label(recorder: &Rc<Recorder>) -> Label {
        let mut registry = BuiltinLoader::new();
        registry.register(MODULE, FACTORY, stub_factory(recorder, true));
        label_with(registry, recorder)
    }

    fn window() -> Window {
        ui::window(Framebuffer::in_memory(320, 200, 32))
    }

    #[test]
    fn fresh_label_answers_defaults() {
        let recorder = Rc::new(Recorder::default());
        let mut label = working_label(&recorder);

        assert!(!label.is_bound());
        assert!(label.is_hidden());
        assert_eq!(label.width(), 0);
        assert_eq!(label.height(), 0);
        label.draw();
        label.hide();
        assert!(label.text().is_none());
        assert_eq!(recorder.resolves.get(), 0);
        assert!(recorder.calls().is_empty());
    }

    #[test]
    fn buffered_text_is_replayed_once_before_show() {
        let recorder = Rc::new(Recorder::default());
        let mut label = working_label(&recorder);

        label.set_text("Loading...");
        assert!(label.show(&window(), 10, 20).unwrap());

        assert_eq!(
            recorder.calls(),
            vec!["create", "set_text:Loading...", "show:10,20"]
        );
        assert_eq!(recorder.controls_created.get(), 1);
        assert!(!label.is_hidden());
        assert_eq!(label.backend_name(), Some("stub"));
    }

    #[test]
    fn only_last_buffered_text_is_replayed() {
        let recorder = Rc::new(Recorder::default());
        let mut label = working_label(&recorder);

        label.set_text("one");
        label.set_text("two");
        label.show(&window(), 0, 0).unwrap();

        assert_eq!(recorder.calls(), vec!["create", "set_text:two", "show:0,0"]);
        assert_eq!(label.text(), Some("two"));
    }

    #[test]
    fn no_text_means_no_replay() {
        let recorder = Rc::new(Recorder::default());
        let mut label = working_label(&recorder);

        label.show(&window(), 1, 2).unwrap();
        assert_eq!(recorder.calls(), vec!["create", "show:1,2"]);
    }

    #[test]
    fn empty_text_is_still_replayed() {
        let recorder = Rc::new(Recorder::default());
        let mut label = working_label(&recorder);

        label.set_text("");
        label.show(&window(), 0, 0).unwrap();
        assert_eq!(recorder.calls(), vec!["create", "set_text:", "show:0,0"]);
    }

    #[test]
    fn text_after_bind_is_forwarded_immediately() {
        let recorder = Rc::new(Recorder::default());
        let mut label = working_label(&recorder);

        label.show(&window(), 0, 0).unwrap();
        assert_eq!(label.width(), 0);

        label.set_text("Hello");
        assert_eq!(label.width(), 50);
        assert_eq!(label.height(), 12);
        assert_eq!(recorder.calls().last().map(String::as_str), Some("set_text:Hello"));
    }

    #[test]
    fn second_show_is_pure_forwarding() {
        let recorder = Rc::new(Recorder::default());
        let mut label = working_label(&recorder);
        let window = window();

        label.show(&window, 0, 0).unwrap();
        label.show(&window, 5, 6).unwrap();

        assert_eq!(recorder.resolves.get(), 1);
        assert_eq!(recorder.controls_created.get(), 1);
        assert_eq!(recorder.calls(), vec!["create", "show:0,0", "show:5,6"]);
    }

    #[test]
    fn show_returns_backend_result() {
        let recorder = Rc::new(Recorder::default());
        let mut registry = BuiltinLoader::new();
        registry.register(MODULE, FACTORY, stub_factory(&recorder, false));
        let mut label = label_with(registry, &recorder);

        assert!(!label.show(&window(), 0, 0).unwrap());
        assert!(label.is_bound());
        assert!(label.is_hidden());
    }

    #[test]
    fn bound_operations_are_forwarded() {
        let recorder = Rc::new(Recorder::default());
        let mut label = working_label(&recorder);

        label.show(&window(), 0, 0).unwrap();
        label.draw();
        label.hide();
        assert!(label.is_hidden());
        assert_eq!(recorder.calls(), vec!["create", "show:0,0", "draw", "hide"]);
    }

    #[test]
    fn missing_module_is_backend_unavailable() {
        let recorder = Rc::new(Recorder::default());
        let mut label = label_with(BuiltinLoader::new(), &recorder);

        let err = label.show(&window(), 0, 0).unwrap_err();
        assert!(matches!(
            err,
            LabelError::BackendUnavailable(BindError::ModuleNotFound(_))
        ));
        assert!(!label.is_bound());
        assert!(label.is_hidden());
        assert_eq!(label.width(), 0);
    }

    #[test]
    fn missing_entry_point_releases_module() {
        let recorder = Rc::new(Recorder::default());
        let mut registry = BuiltinLoader::new();
        registry.register(MODULE, "some_other_symbol", stub_factory(&recorder, true));
        let mut label = label_with(registry, &recorder);

        let err = label.show(&window(), 0, 0).unwrap_err();
        assert!(matches!(
            err,
            LabelError::BackendUnavailable(BindError::MissingEntryPoint { .. })
        ));
        assert_eq!(recorder.modules_released.get(), 1);
        assert!(!label.is_bound());
    }

    #[test]
    fn null_interface_releases_module() {
        let recorder = Rc::new(Recorder::default());
        let mut registry = BuiltinLoader::new();
        registry.register(MODULE, FACTORY, Rc::new(|| -> Option<Box<dyn LabelPlugin>> { None }));
        let mut label = label_with(registry, &recorder);

        let err = label.show(&window(), 0, 0).unwrap_err();
        assert!(matches!(
            err,
            LabelError::BackendUnavailable(BindError::NullInterface { .. })
        ));
        assert_eq!(recorder.modules_released.get(), 1);
        assert!(label.is_hidden());
    }

    #[test]
    fn failed_bind_is_retried_on_next_show() {
        let recorder = Rc::new(Recorder::default());
        let mut label = label_with(BuiltinLoader::new(), &recorder);

        assert!(label.show(&window(), 0, 0).is_err());
        assert!(label.show(&window(), 0, 0).is_err());
        assert_eq!(recorder.resolves.get(), 2);
    }

    #[test]
    fn unbind_keeps_text_and_rebinds_fresh() {
        let recorder = Rc::new(Recorder::default());
        let mut label = working_label(&recorder);
        let window = window();

        label.set_text("Hello");
        label.show(&window, 0, 0).unwrap();
        label.unbind();

        assert!(!label.is_bound());
        assert!(label.is_hidden());
        assert_eq!(label.width(), 0);
        assert_eq!(label.text(), Some("Hello"));
        assert_eq!(recorder.controls_dropped.get(), 1);
        assert_eq!(recorder.modules_released.get(), 1);

        label.show(&window, 0, 0).unwrap();
        assert_eq!(recorder.resolves.get(), 2);
        assert_eq!(recorder.controls_created.get(), 2);
        assert_eq!(label.width(), 50);
        assert_eq!(
            recorder.calls(),
            vec!["create", "set_text:Hello", "show:0,0", "create", "set_text:Hello", "show:0,0"]
        );
    }

    #[test]
    fn unbind_when_unbound_is_noop() {
        let recorder = Rc::new(Recorder::default());
        let mut label = working_label(&recorder);
        label.unbind();
        assert!(!label.is_bound());
        assert_eq!(recorder.modules_released.get(), 0);
    }

    #[test]
    fn destroy_releases_bound_backend() {
        let recorder = Rc::new(Recorder::default());
        let mut label = working_label(&recorder);

        label.show(&window(), 0, 0).unwrap();
        label.destroy();

        assert_eq!(recorder.controls_dropped.get(), 1);
        assert_eq!(recorder.modules_released.get(), 1);
    }

    #[test]
    fn destroy_unbound_label() {
        let recorder = Rc::new(Recorder::default());
        let mut label = working_label(&recorder);
        label.set_text("bye");
        label.destroy();
        assert_eq!(recorder.modules_released.get(), 0);
    }

    #[test]
    fn default_label_binds_bitmap_backend_via_builtin() {
        let mut label = Label::with_loader(
            LabelConfig::default(),
            loader::create_loader(LoaderKind::Builtin),
        );

        label.set_text("Hello");
        assert!(label.show(&window(), 8, 8).unwrap());
        assert_eq!(label.backend_name(), Some("bitmap-text"));
        assert_eq!(label.width(), 40);
        assert_eq!(label.height(), 8);
        assert!(!label.is_hidden());
    }

    #[test]
    fn auto_label_without_module_in_search_path_is_unavailable() {
        let temp = tempfile::tempdir().unwrap();
        let config = LabelConfig::new(temp.path());
        let mut label = Label::with_loader(config, loader::create_loader(LoaderKind::Auto));

        label.set_text("Hello");
        let err = label.show(&window(), 8, 8).unwrap_err();
        assert!(matches!(
            err,
            LabelError::BackendUnavailable(BindError::ModuleNotFound(LoaderError::NotFound(_)))
        ));
        assert!(!label.is_bound());
        assert!(label.is_hidden());
        assert_eq!(label.width(), 0);
        assert_eq!(label.text(), Some("Hello"));
    }
}
