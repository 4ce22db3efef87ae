use super::assembler::{AssemblyStats, ClipJob, assemble_cells};
use super::composer::{ComposeOptions, compose_pages, page_file_path, parse_hex_color, write_page};
use crate::config::{Config, OverlayPosition};
use crate::tools::{
    FfmpegFrameSource, MatchIndex, TextRenderer, TimelineEntry, parse_fcpxml_file,
    parse_position_specs, scan_video_files, validate_directory_exists, validate_file_exists,
};
use anyhow::{Context, Result};
use console::style;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Instant;

/// 一次生成的統計結果
#[derive(Debug)]
pub struct RunSummary {
    pub total_clips: usize,
    pub frames_extracted: usize,
    pub placeholders: usize,
    pub cancelled: usize,
    pub pages_written: usize,
    pub unresolved: Vec<String>,
    pub elapsed_seconds: f64,
}

/// 時間軸剪輯的工作規劃結果
struct TimelinePlan {
    jobs: Vec<ClipJob>,
    unresolved: Vec<String>,
}

/// 預覽圖生成器
///
/// 兩種輸入模式：
/// 1. 時間軸模式：解析 FCPXML，每個剪輯依來源區間擷取影格
/// 2. 資料夾模式：遞迴掃描影片檔，每部影片以整部為基準擷取影格
pub struct SheetGenerator {
    config: Config,
    shutdown_signal: Arc<AtomicBool>,
}

impl SheetGenerator {
    pub const fn new(config: Config, shutdown_signal: Arc<AtomicBool>) -> Self {
        Self {
            config,
            shutdown_signal,
        }
    }

    /// 時間軸模式：從 FCPXML 專案檔生成預覽圖
    pub fn run_timeline(&self) -> Result<()> {
        println!("{}", style("=== 時間軸預覽圖生成 ===").cyan().bold());

        let fcpxml_path = self.prompt_path("請輸入 FCPXML 檔案路徑")?;
        let fcpxml_path = PathBuf::from(&fcpxml_path);
        validate_file_exists(&fcpxml_path)?;

        println!("{}", style("解析時間軸中...").dim());
        let entries = parse_fcpxml_file(&fcpxml_path)?;

        if entries.is_empty() {
            println!("{}", style("時間軸上沒有任何剪輯").yellow());
            return Ok(());
        }

        println!(
            "{}",
            style(format!("時間軸上共有 {} 個剪輯", entries.len())).green()
        );

        // 媒體檔比對：FCPXML 所在目錄永遠是第一個搜尋根目錄
        let mut roots = vec![
            fcpxml_path
                .parent()
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf),
        ];
        roots.extend(
            self.config
                .settings
                .sheet
                .search_roots
                .iter()
                .map(PathBuf::from),
        );

        println!("{}", style("建立媒體檔索引中...").dim());
        let extensions = self.config.extension_table.extension_set();
        let index = MatchIndex::build(&roots, &extensions);

        let sheet = &self.config.settings.sheet;
        let plan = plan_timeline_jobs(
            &entries,
            &index,
            sheet.fcpxml_similarity_threshold,
            sheet.fcpxml_use_interval_positions,
        );

        for name in &plan.unresolved {
            warn!("找不到剪輯的媒體檔案: {name}");
        }

        self.generate(plan.jobs, plan.unresolved)
    }

    /// 資料夾模式：掃描目錄下所有影片生成預覽圖
    pub fn run_folder(&self) -> Result<()> {
        println!("{}", style("=== 資料夾預覽圖生成 ===").cyan().bold());

        let input_path = self.prompt_path("請輸入影片資料夾路徑")?;
        let input_dir = PathBuf::from(&input_path);
        validate_directory_exists(&input_dir)?;

        println!("{}", style("掃描影片檔案中...").dim());
        let extensions = self.config.extension_table.extension_set();
        let videos = scan_video_files(&input_dir, &extensions)?;

        if videos.is_empty() {
            println!("{}", style("找不到任何影片檔案").yellow());
            return Ok(());
        }

        println!(
            "{}",
            style(format!("找到 {} 個影片檔案", videos.len())).green()
        );

        let jobs: Vec<ClipJob> = videos
            .into_iter()
            .enumerate()
            .map(|(index, video)| ClipJob {
                index,
                clip_name: display_name(&video.path),
                path: Some(video.path),
                interval: None,
            })
            .collect();

        self.generate(jobs, Vec::new())
    }

    fn prompt_path(&self, prompt: &str) -> Result<String> {
        let mut input = Input::new().with_prompt(prompt);
        if let Some(recent) = self.config.settings.recent_paths.first() {
            input = input.default(recent.clone());
        }
        let path: String = input.interact_text()?;
        let path = path.trim().to_string();

        // 記住最近使用的路徑，下次作為預設值
        let mut settings = self.config.settings.clone();
        crate::config::save::add_recent_path(&mut settings, &path);
        if let Err(e) = crate::config::save::save_settings(&settings) {
            warn!("無法儲存最近路徑: {e:#}");
        }

        Ok(path)
    }

    fn generate(&self, jobs: Vec<ClipJob>, unresolved: Vec<String>) -> Result<()> {
        let started = Instant::now();
        let sheet = &self.config.settings.sheet;

        let specs = parse_position_specs(&sheet.positions)
            .with_context(|| format!("擷取位置設定無效: {:?}", sheet.positions))?;

        let options = ComposeOptions {
            thumbnail_width: sheet.thumbnail_width,
            clips_per_row: sheet.clips_per_row,
            padding: sheet.padding,
            font_size: sheet.font_size,
            overlay_position: sheet.overlay_position,
            show_frame: sheet.show_frame,
            frame_color: parse_hex_color(&sheet.frame_color)
                .with_context(|| format!("外框顏色設定無效: {:?}", sheet.frame_color))?,
            frame_thickness: sheet.frame_thickness,
            frame_padding: sheet.frame_padding,
            max_rows_per_image: sheet.max_rows_per_image,
            placeholder_color: parse_hex_color(&sheet.fcpxml_placeholder_color).with_context(
                || format!("佔位圖顏色設定無效: {:?}", sheet.fcpxml_placeholder_color),
            )?,
            show_placeholders: sheet.fcpxml_show_placeholders,
        };

        println!();
        println!("{}", style("開始擷取影格...").cyan());

        let source = FfmpegFrameSource::new()?;
        let progress_bar = ProgressBar::new(jobs.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );
        progress_bar.set_message("擷取影格中...");

        let on_progress = |done: usize, _total: usize| {
            progress_bar.set_position(done as u64);
        };

        let (cells, stats) = assemble_cells(
            &jobs,
            &specs,
            &source,
            sheet.thumbnail_width,
            &self.shutdown_signal,
            &on_progress,
        )?;
        progress_bar.finish_and_clear();

        println!("{}", style("合成預覽圖中...").cyan());
        let renderer = TextRenderer::load_system();
        let pages = compose_pages(&cells, &options, &renderer);

        let base = PathBuf::from(&sheet.output_path);
        for (page_index, page) in pages.iter().enumerate() {
            let path = page_file_path(&base, page_index);
            write_page(page, &path)?;
            println!("  {} {}", style("✓").green(), path.display());
        }

        let summary = RunSummary {
            total_clips: jobs.len(),
            frames_extracted: stats.frames_extracted,
            placeholders: stats.placeholders,
            cancelled: stats.cancelled,
            pages_written: pages.len(),
            unresolved,
            elapsed_seconds: started.elapsed().as_secs_f64(),
        };
        self.print_summary(&summary, &stats);

        Ok(())
    }

    fn print_summary(&self, summary: &RunSummary, stats: &AssemblyStats) {
        println!();
        println!("{}", style("=== 預覽圖生成摘要 ===").cyan().bold());
        println!("  剪輯總數: {} 個", summary.total_clips);
        println!(
            "  擷取影格: {} 張",
            style(summary.frames_extracted).green()
        );
        println!("  輸出頁數: {} 頁", summary.pages_written);

        if summary.placeholders > 0 {
            println!("  佔位剪輯: {} 個", style(summary.placeholders).yellow());
        }

        if summary.cancelled > 0 {
            println!(
                "  {} 已取消 {} 個剪輯",
                style("⚠").yellow(),
                summary.cancelled
            );
        }

        if !summary.unresolved.is_empty() {
            println!();
            println!("{}", style("找不到媒體檔案的剪輯:").yellow());
            for name in &summary.unresolved {
                println!("  - {name}");
            }
        }

        println!("  耗時: {:.1} 秒", summary.elapsed_seconds);

        info!(
            "contact sheet run finished - clips: {}, frames: {}, placeholders: {}, cancelled: {}, pages: {}",
            summary.total_clips,
            stats.frames_extracted,
            stats.placeholders,
            stats.cancelled,
            summary.pages_written
        );
    }
}

/// 將時間軸剪輯規劃為擷取工作
///
/// `use_interval_positions` 為 false 時，相同媒體檔只保留第一次出現，
/// 並改以整部影片為基準。
fn plan_timeline_jobs(
    entries: &[TimelineEntry],
    index: &MatchIndex,
    threshold: f64,
    use_interval_positions: bool,
) -> TimelinePlan {
    let mut jobs = Vec::with_capacity(entries.len());
    let mut unresolved = Vec::new();
    let mut seen_paths: HashSet<PathBuf> = HashSet::new();
    let mut seen_names: HashSet<String> = HashSet::new();

    for entry in entries {
        let resolved = entry
            .file_path
            .as_ref()
            .and_then(|requested| index.resolve(requested, threshold).resolved);

        if resolved.is_none() {
            unresolved.push(entry.clip_name.clone());
        }

        if use_interval_positions {
            jobs.push(ClipJob {
                index: jobs.len(),
                clip_name: entry.clip_name.clone(),
                path: resolved,
                interval: Some((
                    entry.source_in.to_seconds(),
                    entry.source_out.to_seconds(),
                )),
            });
            continue;
        }

        // 去重後每個檔案一格
        match resolved {
            Some(path) => {
                if !seen_paths.insert(path.clone()) {
                    continue;
                }
                jobs.push(ClipJob {
                    index: jobs.len(),
                    clip_name: display_name(&path),
                    path: Some(path),
                    interval: None,
                });
            }
            None => {
                if !seen_names.insert(entry.clip_name.clone()) {
                    continue;
                }
                jobs.push(ClipJob {
                    index: jobs.len(),
                    clip_name: entry.clip_name.clone(),
                    path: None,
                    interval: None,
                });
            }
        }
    }

    TimelinePlan { jobs, unresolved }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string())
}
