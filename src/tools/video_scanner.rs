use crate::tools::video_matcher::has_video_extension;
use anyhow::Result;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct VideoFileInfo {
    pub path: PathBuf,
    pub size: u64,
}

/// 遞迴掃描資料夾中的影片檔案，依路徑排序
pub fn scan_video_files(directory: &Path, extensions: &HashSet<String>) -> Result<Vec<VideoFileInfo>> {
    let mut video_files: Vec<VideoFileInfo> = WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| has_video_extension(entry.path(), extensions))
        .filter_map(|entry| {
            let size = entry.metadata().ok()?.len();
            Some(VideoFileInfo {
                path: entry.into_path(),
                size,
            })
        })
        .collect();

    video_files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(video_files)
}
