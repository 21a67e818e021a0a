use libloading::Library;
use plugin_api::{Plugin, PluginMeta};
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::mem::ManuallyDrop;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

pub type SharedPlugin = Arc<Mutex<dyn Plugin>>;

pub struct PluginContainer {
    pub plugin: ManuallyDrop<SharedPlugin>,
    pub meta: ManuallyDrop<PluginMeta>,
    lib: ManuallyDrop<Library>,
}

impl Drop for PluginContainer {
    fn drop(&mut self) {
        unsafe {
            // First drop the plugin, as it depends on both meta and lib
            ManuallyDrop::drop(&mut self.plugin);
            // Drop meta, it depends on lib
            ManuallyDrop::drop(&mut self.meta);
            // Finally drop the lib
            ManuallyDrop::drop(&mut self.lib);
        }
    }
}

/// Where the shared library of plugin `name` is expected.
pub fn library_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{}{}{}", DLL_PREFIX, name, DLL_SUFFIX))
}

/// Lock a plugin even if a previous command panicked while holding it.
pub fn lock(plugin: &SharedPlugin) -> MutexGuard<dyn Plugin> {
    plugin.lock().unwrap_or_else(|e| e.into_inner())
}

impl PluginContainer {
    pub fn load(dir: &Path, name: &str) -> Result<Self, libloading::Error> {
        let path = library_path(dir, name);
        log::debug!("Loading {}", path.display());
        let lib = unsafe { Library::new(&path)? };
        let plugin = {
            let init = unsafe { lib.get::<fn() -> SharedPlugin>(b"init")? };
            init()
        };
        let mut meta = PluginMeta::default();
        lock(&plugin).register(&mut meta);
        Ok(PluginContainer {
            plugin: ManuallyDrop::new(plugin),
            meta: ManuallyDrop::new(meta),
            lib: ManuallyDrop::new(lib),
        })
    }
    pub fn lock(&self) -> MutexGuard<dyn Plugin> {
        lock(&self.plugin)
    }
}

#[test]
fn test_library_path() {
    let path = library_path(Path::new("target/debug"), "modmail");
    let file = path.file_name().and_then(|f| f.to_str()).unwrap();
    assert!(file.contains("modmail"));
    assert!(file.ends_with(DLL_SUFFIX));
    assert!(path.starts_with("target/debug"));
}

#[test]
fn test_missing_library_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(PluginContainer::load(dir.path(), "nothing_here").is_err());
}
