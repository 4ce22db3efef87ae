use crate::config::types::{Config, ExtensionTable, UserSettings};
use anyhow::{Context, Result};
use log::warn;
use std::fs;
use std::path::Path;

/// 編譯時嵌入的副檔名表（不需要外部檔案）
const EXTENSION_TABLE_JSON: &str = include_str!("../data/extension_table.json");

impl Config {
    pub fn new() -> Result<Self> {
        let extension_table = Self::load_embedded_extension_table()?;
        let settings = Self::load_settings().unwrap_or_else(|e| {
            warn!("settings.json 無法載入，改用預設值: {e:#}");
            UserSettings::default()
        });

        Ok(Self {
            extension_table,
            settings,
        })
    }

    fn load_settings() -> Result<UserSettings> {
        let path = Path::new("settings.json");
        if !path.exists() {
            return Ok(UserSettings::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))
    }

    /// 從編譯時嵌入的 JSON 載入副檔名表
    fn load_embedded_extension_table() -> Result<ExtensionTable> {
        serde_json::from_str(EXTENSION_TABLE_JSON).context("無法解析嵌入的副檔名表")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_table_parses() {
        let table = Config::load_embedded_extension_table().unwrap();
        let set = table.extension_set();
        assert!(set.contains(".mp4"));
        assert!(set.contains(".mov"));
        assert!(set.contains(".mts"));
    }
}
