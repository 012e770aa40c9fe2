use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use bbforge_core::config::ConfigStore;
use bbforge_core::context::AppContext;
use bbforge_core::prompt::NonInteractive;

#[test]
fn explicit_config_drives_context() {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("cache");
    fs::create_dir(&base).unwrap();
    let path = temp.path().join("bbforge.toml");
    fs::write(
        &path,
        format!(
            "base_dir = {:?}\n\n[upstream]\nname = \"kde-test\"\nrelease = \"@latest\"\n\n[upstream.inherits]\n\"frameworks/kwindowsystem\" = \"kwindowsystem\"\n\n[recipes]\nlayers = [\"meta-kde\", \"meta-qt\"]\nlayer_directory = \"meta-kde\"\n\n[network]\nconcurrency = 2\n",
            base.to_string_lossy()
        ),
    )
    .unwrap();

    let store = ConfigStore::discover(Some(&path)).unwrap();
    assert_eq!(store.config_path(), Some(path.as_path()));

    let config = store.load().unwrap();
    assert_eq!(config.base_dir, base);
    assert_eq!(config.upstream.release, "@latest");
    assert_eq!(config.upstream.inherits["frameworks/kwindowsystem"], "kwindowsystem");
    assert_eq!(config.recipes.layers, vec![PathBuf::from("meta-kde"), PathBuf::from("meta-qt")]);
    assert_eq!(config.network.concurrency, 2);
    assert_eq!(config.network.max_retries, 3);

    let context = AppContext::new(config, Arc::new(NonInteractive)).unwrap();
    let registry = context.backend_registry().unwrap();
    assert_eq!(registry.names(), vec!["kde-test"]);
}

#[test]
fn explicit_missing_config_is_an_error() {
    let temp = TempDir::new().unwrap();
    let missing = temp.path().join("absent.toml");
    let err = ConfigStore::discover(Some(&missing)).unwrap_err();
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn invalid_config_reports_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("bbforge.toml");
    fs::write(&path, "[network]\nconcurrency = 0\n").unwrap();

    let err = ConfigStore::from_path(&path).load().unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("bbforge.toml"));
    assert!(message.contains("concurrency"));
}
