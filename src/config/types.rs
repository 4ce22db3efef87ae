use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;

pub const MAX_RECENT_PATHS: usize = 10;

/// 可辨識的影片副檔名表（編譯時嵌入）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtensionTable {
    #[serde(rename = "VIDEO_FILE")]
    pub video_file: Vec<String>,
}

impl ExtensionTable {
    #[must_use]
    pub fn extension_set(&self) -> HashSet<String> {
        self.video_file
            .iter()
            .map(|ext| ext.to_lowercase())
            .collect()
    }

    #[must_use]
    pub fn is_video_file(&self, path: &Path) -> bool {
        let extensions = self.extension_set();
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.contains(&format!(".{}", ext.to_lowercase())))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "zh-TW")]
    ZhTw,
}

impl Language {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EnUs => "en-US",
            Self::ZhTw => "zh-TW",
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::EnUs
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnUs => write!(f, "English"),
            Self::ZhTw => write!(f, "繁體中文"),
        }
    }
}

/// 註記文字的擺放位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayPosition {
    /// 在縮圖上方保留一條標題帶
    AboveThumbnails,
    /// 直接疊在第一張縮圖上
    OnThumbnails,
}

impl fmt::Display for OverlayPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AboveThumbnails => write!(f, "above_thumbnails"),
            Self::OnThumbnails => write!(f, "on_thumbnails"),
        }
    }
}

/// 預覽圖生成設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetSettings {
    pub output_path: String,
    pub thumbnail_width: u32,
    pub clips_per_row: u32,
    /// 擷取位置字串，逗號分隔（例如 "0%,50%,99%"）
    pub positions: String,
    pub padding: u32,
    pub font_size: u32,
    pub overlay_position: OverlayPosition,
    pub show_frame: bool,
    pub frame_color: String,
    pub frame_thickness: u32,
    pub frame_padding: u32,
    /// 每頁最多列數；0 表示不分頁
    pub max_rows_per_image: u32,
    pub fcpxml_show_placeholders: bool,
    /// false 時相同媒體檔只產生一格，以整部影片為基準
    pub fcpxml_use_interval_positions: bool,
    pub fcpxml_placeholder_color: String,
    pub fcpxml_similarity_threshold: f64,
    /// 媒體搜尋根目錄（時間軸模式的備援查找範圍）
    pub search_roots: Vec<String>,
}

impl Default for SheetSettings {
    fn default() -> Self {
        Self {
            output_path: "output/overview.jpg".to_string(),
            thumbnail_width: 320,
            clips_per_row: 5,
            positions: "0%,50%,99%".to_string(),
            padding: 5,
            font_size: 12,
            overlay_position: OverlayPosition::AboveThumbnails,
            show_frame: true,
            frame_color: "#CCCCCC".to_string(),
            frame_thickness: 2,
            frame_padding: 10,
            max_rows_per_image: 0,
            fcpxml_show_placeholders: true,
            fcpxml_use_interval_positions: true,
            fcpxml_placeholder_color: "#F0F0F0".to_string(),
            fcpxml_similarity_threshold: 0.6,
            search_roots: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub language: Language,
    pub sheet: SheetSettings,
    pub recent_paths: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub extension_table: ExtensionTable,
    pub settings: UserSettings,
}
