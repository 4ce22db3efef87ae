//! 影格來源
//!
//! 以 trait 抽象「讀取影片資訊」與「擷取單一影格」，
//! 生產環境由 ffmpeg/ffprobe 實作，測試可注入假實作。

use crate::tools::ffprobe_info::{VideoMetadata, probe_video};
use anyhow::{Context, Result, bail};
use image::RgbImage;
use log::debug;
use std::path::{Path, PathBuf};
use std::process::Command;
use uuid::Uuid;

/// 兩段式 seek 的前置緩衝時間（秒）
const SEEK_MARGIN: f64 = 2.0;

pub trait FrameSource: Sync {
    /// 取得影片資訊
    fn metadata(&self, path: &Path) -> Result<VideoMetadata>;

    /// 擷取指定秒數的影格，縮放至指定寬度（等比例）
    fn frame(&self, path: &Path, seconds: f64, width: u32) -> Result<RgbImage>;
}

/// 以 ffmpeg 擷取影格的生產實作
pub struct FfmpegFrameSource {
    temp_dir: PathBuf,
}

impl FfmpegFrameSource {
    pub fn new() -> Result<Self> {
        let temp_dir =
            std::env::temp_dir().join(format!("footage_thumbnailer_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&temp_dir)
            .with_context(|| format!("無法建立暫存目錄: {}", temp_dir.display()))?;
        Ok(Self { temp_dir })
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        if self.temp_dir.exists() && std::fs::remove_dir_all(&self.temp_dir).is_err() {
            log::warn!("無法清理暫存目錄: {}", self.temp_dir.display());
        }
    }
}

impl FrameSource for FfmpegFrameSource {
    fn metadata(&self, path: &Path) -> Result<VideoMetadata> {
        probe_video(path)
    }

    fn frame(&self, path: &Path, seconds: f64, width: u32) -> Result<RgbImage> {
        // 兩段式 seek：
        // 1. `-ss` 在 `-i` 前：快速跳轉到最近的關鍵幀
        // 2. `-ss` 在 `-i` 後：精準解碼到目標時間點
        let t0 = (seconds - SEEK_MARGIN).max(0.0);
        let delta = seconds - t0;

        debug!(
            "擷取影格 {}: timestamp={seconds:.3}s, seek={t0:.3}s+{delta:.3}s",
            path.display()
        );

        let output_path = self.temp_dir.join(format!("frame_{}.jpg", Uuid::new_v4()));

        let mut args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
        ];

        if t0 > 0.0 {
            args.push("-ss".to_string());
            args.push(format!("{t0:.3}"));
        }

        args.push("-i".to_string());
        args.push(path.to_string_lossy().to_string());

        if delta > 0.0 {
            args.push("-ss".to_string());
            args.push(format!("{delta:.3}"));
        }

        args.extend([
            "-frames:v".to_string(),
            "1".to_string(),
            "-an".to_string(),
            "-sn".to_string(),
            "-dn".to_string(),
            "-threads".to_string(),
            "1".to_string(),
            "-vf".to_string(),
            format!("scale={width}:-2"),
            "-q:v".to_string(),
            "2".to_string(),
            "-y".to_string(),
            output_path.to_string_lossy().to_string(),
        ]);

        let output = Command::new("ffmpeg")
            .args(&args)
            .output()
            .with_context(|| format!("無法執行 ffmpeg 擷取影格: {}", path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("ffmpeg 擷取影格失敗: {}", stderr.trim());
        }

        if !output_path.exists() {
            bail!("影格檔案未建立: {}", output_path.display());
        }

        let image = image::open(&output_path)
            .with_context(|| format!("無法讀取擷取的影格: {}", output_path.display()))?
            .to_rgb8();

        if std::fs::remove_file(&output_path).is_err() {
            log::warn!("無法刪除暫存影格: {}", output_path.display());
        }

        Ok(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_dir_lifecycle() {
        let source = FfmpegFrameSource::new().unwrap();
        let temp_dir = source.temp_dir.clone();
        assert!(temp_dir.is_dir());
        drop(source);
        assert!(!temp_dir.exists());
    }
}
