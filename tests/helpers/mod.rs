#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use noesis::app::AppState;
use noesis::config::NoesisConfig;

/// A fully wired [`AppState`] backed by a temp directory. The directory is
/// kept alive for the test's duration and cleaned up on drop.
pub struct TestApp {
    pub state: Arc<AppState>,
    pub dir: tempfile::TempDir,
}

pub async fn test_app() -> TestApp {
    test_app_with(|_| {}).await
}

pub async fn test_app_with(customize: impl FnOnce(&mut NoesisConfig)) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut config = base_config(dir.path());
    customize(&mut config);
    let state = AppState::init(config).await.expect("init app state");
    TestApp {
        state: Arc::new(state),
        dir,
    }
}

/// Re-open an app against an existing directory, as a restart would.
pub async fn reopen(dir: &Path, customize: impl FnOnce(&mut NoesisConfig)) -> Arc<AppState> {
    let mut config = base_config(dir);
    customize(&mut config);
    Arc::new(AppState::init(config).await.expect("re-init app state"))
}

fn base_config(dir: &Path) -> NoesisConfig {
    let mut config = NoesisConfig::default();
    config.storage.db_path = dir.join("noesis.db").to_string_lossy().into_owned();
    // deterministic strategy selection in tests
    config.learning.exploration_rate = 0.0;
    config.learning.exploration_min = 0.0;
    config
}
