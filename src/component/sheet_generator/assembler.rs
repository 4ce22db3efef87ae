//! 縮圖組裝
//!
//! 對每個剪輯讀取影片資訊、解析擷取位置、擷取影格。
//! 使用 rayon 平行處理，結果依時間軸順序重新排序；
//! 任何單一剪輯失敗都以佔位圖代替，不中斷整體流程。

use crate::tools::{FrameSource, PositionSpec, resolve_in_file, resolve_in_interval};
use anyhow::Result;
use image::RgbImage;
use log::{error, warn};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// 一個待處理的剪輯
#[derive(Debug, Clone)]
pub struct ClipJob {
    pub index: usize,
    pub clip_name: String,
    /// 已解析的媒體路徑；None 表示找不到檔案
    pub path: Option<PathBuf>,
    /// 來源區間（秒）；None 表示以整部影片為基準
    pub interval: Option<(f64, f64)>,
}

/// 單一擷取出的影格
pub struct FrameThumb {
    pub seconds: f64,
    pub image: RgbImage,
}

/// 一個剪輯的組裝結果
pub struct ClipCell {
    pub index: usize,
    pub clip_name: String,
    pub file_path: Option<PathBuf>,
    pub creation_date: Option<String>,
    pub duration_seconds: f64,
    pub frames: Vec<FrameThumb>,
    pub placeholder: bool,
}

#[derive(Debug, Default)]
pub struct AssemblyStats {
    pub frames_extracted: usize,
    pub placeholders: usize,
    pub cancelled: usize,
}

/// 平行組裝所有剪輯的縮圖
///
/// 每個 ffmpeg 程序使用單執行緒，以 rayon 控制整體平行度。
/// 收到中斷訊號後不再提交新工作，回傳已完成的部分。
pub fn assemble_cells(
    jobs: &[ClipJob],
    specs: &[PositionSpec],
    source: &dyn FrameSource,
    thumbnail_width: u32,
    shutdown_signal: &Arc<AtomicBool>,
    on_progress: &(dyn Fn(usize, usize) + Sync),
) -> Result<(Vec<ClipCell>, AssemblyStats)> {
    let total = jobs.len();
    let completed = AtomicUsize::new(0);

    let results: Vec<Option<ClipCell>> = jobs
        .par_iter()
        .map(|job| {
            if shutdown_signal.load(Ordering::SeqCst) {
                return None;
            }

            let cell = assemble_single(job, specs, source, thumbnail_width);
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            on_progress(done, total);
            Some(cell)
        })
        .collect();

    let mut stats = AssemblyStats {
        cancelled: results.iter().filter(|r| r.is_none()).count(),
        ..AssemblyStats::default()
    };

    let mut cells: Vec<ClipCell> = results.into_iter().flatten().collect();
    cells.sort_by_key(|c| c.index);

    for cell in &cells {
        stats.frames_extracted += cell.frames.len();
        if cell.placeholder {
            stats.placeholders += 1;
        }
    }

    Ok((cells, stats))
}

fn assemble_single(
    job: &ClipJob,
    specs: &[PositionSpec],
    source: &dyn FrameSource,
    thumbnail_width: u32,
) -> ClipCell {
    let interval_span = job.interval.map(|(i, o)| (o - i).max(0.0));

    let Some(path) = &job.path else {
        warn!("剪輯 {} 沒有對應的媒體檔案，使用佔位圖", job.clip_name);
        return placeholder_cell(job, interval_span.unwrap_or(0.0));
    };

    let metadata = match source.metadata(path) {
        Ok(m) => m,
        Err(e) => {
            error!("無法讀取影片資訊 {}: {e}", path.display());
            return placeholder_cell(job, interval_span.unwrap_or(0.0));
        }
    };

    let positions = match job.interval {
        Some((source_in, source_out)) => {
            resolve_in_interval(specs, source_in, source_out, metadata.frame_rate)
        }
        None => resolve_in_file(specs, metadata.duration_seconds, metadata.frame_rate),
    };

    if positions.is_empty() {
        warn!("剪輯 {} 的有效長度為零，使用佔位圖", job.clip_name);
        let mut cell = placeholder_cell(job, interval_span.unwrap_or(0.0));
        cell.creation_date = metadata.creation_date;
        return cell;
    }

    let mut frames = Vec::with_capacity(positions.len());
    for seconds in positions {
        match source.frame(path, seconds, thumbnail_width) {
            Ok(image) => frames.push(FrameThumb { seconds, image }),
            Err(e) => {
                error!("影格擷取失敗 {} @ {seconds:.3}s: {e}", path.display());
                return ClipCell {
                    creation_date: metadata.creation_date,
                    ..placeholder_cell(job, interval_span.unwrap_or(metadata.duration_seconds))
                };
            }
        }
    }

    ClipCell {
        index: job.index,
        clip_name: job.clip_name.clone(),
        file_path: job.path.clone(),
        creation_date: metadata.creation_date,
        duration_seconds: interval_span.unwrap_or(metadata.duration_seconds),
        frames,
        placeholder: false,
    }
}

fn placeholder_cell(job: &ClipJob, duration_seconds: f64) -> ClipCell {
    ClipCell {
        index: job.index,
        clip_name: job.clip_name.clone(),
        file_path: job.path.clone(),
        creation_date: None,
        duration_seconds,
        frames: Vec::new(),
        placeholder: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{VideoMetadata, parse_position_specs};
    use anyhow::bail;
    use image::Rgb;
    use std::path::Path;

    /// 以秒數決定像素顏色的假影格來源
    struct FakeSource {
        duration: f64,
    }

    impl FrameSource for FakeSource {
        fn metadata(&self, _path: &Path) -> Result<VideoMetadata> {
            Ok(VideoMetadata {
                duration_seconds: self.duration,
                width: 640,
                height: 360,
                frame_rate: 30.0,
                creation_date: Some("2023-06-15".to_string()),
            })
        }

        fn frame(&self, _path: &Path, seconds: f64, width: u32) -> Result<RgbImage> {
            let shade = (seconds * 10.0) as u8;
            Ok(RgbImage::from_pixel(
                width,
                width * 9 / 16,
                Rgb([shade, shade, shade]),
            ))
        }
    }

    /// 永遠失敗的影格來源
    struct BrokenSource;

    impl FrameSource for BrokenSource {
        fn metadata(&self, _path: &Path) -> Result<VideoMetadata> {
            bail!("probe failed")
        }

        fn frame(&self, _path: &Path, _seconds: f64, _width: u32) -> Result<RgbImage> {
            bail!("decode failed")
        }
    }

    fn jobs(count: usize) -> Vec<ClipJob> {
        (0..count)
            .map(|i| ClipJob {
                index: i,
                clip_name: format!("clip_{i}"),
                path: Some(PathBuf::from(format!("/media/clip_{i}.mp4"))),
                interval: Some((i as f64, i as f64 + 5.0)),
            })
            .collect()
    }

    #[test]
    fn test_output_keeps_timeline_order() {
        let specs = parse_position_specs("0%,50%").unwrap();
        let shutdown = Arc::new(AtomicBool::new(false));
        let source = FakeSource { duration: 60.0 };

        let (cells, stats) =
            assemble_cells(&jobs(8), &specs, &source, 160, &shutdown, &|_, _| {}).unwrap();

        assert_eq!(cells.len(), 8);
        for (i, cell) in cells.iter().enumerate() {
            assert_eq!(cell.index, i);
            assert_eq!(cell.frames.len(), 2);
            assert!(!cell.placeholder);
        }
        assert_eq!(stats.frames_extracted, 16);
        assert_eq!(stats.placeholders, 0);
        assert_eq!(stats.cancelled, 0);
    }

    #[test]
    fn test_missing_path_becomes_placeholder() {
        let specs = parse_position_specs("50%").unwrap();
        let shutdown = Arc::new(AtomicBool::new(false));
        let source = FakeSource { duration: 60.0 };

        let mut job_list = jobs(2);
        job_list[1].path = None;

        let (cells, stats) =
            assemble_cells(&job_list, &specs, &source, 160, &shutdown, &|_, _| {}).unwrap();

        assert_eq!(cells.len(), 2);
        assert!(!cells[0].placeholder);
        assert!(cells[1].placeholder);
        assert!(cells[1].frames.is_empty());
        assert_eq!(stats.placeholders, 1);
    }

    #[test]
    fn test_probe_failure_becomes_placeholder() {
        let specs = parse_position_specs("50%").unwrap();
        let shutdown = Arc::new(AtomicBool::new(false));

        let (cells, stats) =
            assemble_cells(&jobs(3), &specs, &BrokenSource, 160, &shutdown, &|_, _| {}).unwrap();

        assert_eq!(cells.len(), 3);
        assert!(cells.iter().all(|c| c.placeholder));
        assert_eq!(stats.placeholders, 3);
    }

    #[test]
    fn test_zero_length_interval_becomes_placeholder() {
        let specs = parse_position_specs("0%,50%").unwrap();
        let shutdown = Arc::new(AtomicBool::new(false));
        let source = FakeSource { duration: 60.0 };

        let mut job_list = jobs(1);
        job_list[0].interval = Some((5.0, 5.0));

        let (cells, _) =
            assemble_cells(&job_list, &specs, &source, 160, &shutdown, &|_, _| {}).unwrap();
        assert!(cells[0].placeholder);
    }

    #[test]
    fn test_whole_file_mode_uses_probed_duration() {
        let specs = parse_position_specs("0%,99%").unwrap();
        let shutdown = Arc::new(AtomicBool::new(false));
        let source = FakeSource { duration: 42.0 };

        let mut job_list = jobs(1);
        job_list[0].interval = None;

        let (cells, _) =
            assemble_cells(&job_list, &specs, &source, 160, &shutdown, &|_, _| {}).unwrap();
        assert!((cells[0].duration_seconds - 42.0).abs() < 1e-9);
        assert_eq!(cells[0].frames.len(), 2);
        assert!(cells[0].frames[1].seconds > 41.0);
    }

    #[test]
    fn test_cancellation_skips_all_pending() {
        let specs = parse_position_specs("50%").unwrap();
        let shutdown = Arc::new(AtomicBool::new(true));
        let source = FakeSource { duration: 60.0 };

        let (cells, stats) =
            assemble_cells(&jobs(5), &specs, &source, 160, &shutdown, &|_, _| {}).unwrap();

        assert!(cells.is_empty());
        assert_eq!(stats.cancelled, 5);
    }

    #[test]
    fn test_progress_callback_reaches_total() {
        let specs = parse_position_specs("50%").unwrap();
        let shutdown = Arc::new(AtomicBool::new(false));
        let source = FakeSource { duration: 60.0 };
        let max_seen = AtomicUsize::new(0);

        let progress = |done: usize, _total: usize| {
            max_seen.fetch_max(done, Ordering::SeqCst);
        };
        assemble_cells(&jobs(4), &specs, &source, 160, &shutdown, &progress).unwrap();

        assert_eq!(max_seen.load(Ordering::SeqCst), 4);
    }
}
