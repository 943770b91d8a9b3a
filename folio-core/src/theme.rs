use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::state::Theme;

/// Persists the theme preference, the only state that survives a restart.
pub trait ThemeStore: Send + Sync {
    fn load(&self) -> Result<Option<Theme>>;
    fn save(&self, theme: Theme) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedPreferences {
    theme: Theme,
}

pub struct FileThemeStore {
    root: PathBuf,
}

impl FileThemeStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create preferences directory at {:?}", root))?;
        Ok(Self { root })
    }

    fn path(&self) -> PathBuf {
        self.root.join("theme.json")
    }
}

impl ThemeStore for FileThemeStore {
    fn load(&self) -> Result<Option<Theme>> {
        let path = self.path();
        if !path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to open preferences file {:?}", path))?;
        let prefs: PersistedPreferences = serde_json::from_str(&raw)
            .with_context(|| format!("failed to decode preferences file {:?}", path))?;
        Ok(Some(prefs.theme))
    }

    fn save(&self, theme: Theme) -> Result<()> {
        let path = self.path();
        let tmp = path.with_extension("json.tmp");
        let payload = serde_json::to_string_pretty(&PersistedPreferences { theme })?;
        let mut file = File::create(&tmp)
            .with_context(|| format!("failed to open temp preferences file {:?}", tmp))?;
        file.write_all(payload.as_bytes())?;
        file.flush()?;
        fs::rename(tmp, path)?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryThemeStore {
    inner: Mutex<Option<Theme>>,
}

impl MemoryThemeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_theme(theme: Theme) -> Self {
        Self {
            inner: Mutex::new(Some(theme)),
        }
    }
}

impl ThemeStore for MemoryThemeStore {
    fn load(&self) -> Result<Option<Theme>> {
        Ok(*self.inner.lock())
    }

    fn save(&self, theme: Theme) -> Result<()> {
        *self.inner.lock() = Some(theme);
        Ok(())
    }
}
