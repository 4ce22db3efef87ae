//! 預覽圖合成
//!
//! 將組裝好的剪輯格合成為分頁的預覽圖：
//! 每個剪輯一條橫列（影格 + 註記 + 外框），
//! 依設定的每列剪輯數排成格狀，超過每頁列數上限時分頁輸出。

use super::assembler::ClipCell;
use crate::config::OverlayPosition;
use crate::tools::TextRenderer;
use anyhow::{Context, Result, bail};
use image::imageops;
use image::{Rgb, RgbImage};
use log::info;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// 註記文字與邊緣的間距
const TEXT_MARGIN: u32 = 4;
/// 沒有任何剪輯時輸出的最小畫布尺寸
const EMPTY_PAGE_SIZE: (u32, u32) = (320, 180);

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);
const DARK_GRAY: Rgb<u8> = Rgb([64, 64, 64]);

#[derive(Debug, Clone)]
pub struct ComposeOptions {
    pub thumbnail_width: u32,
    pub clips_per_row: u32,
    pub padding: u32,
    pub font_size: u32,
    pub overlay_position: OverlayPosition,
    pub show_frame: bool,
    pub frame_color: Rgb<u8>,
    pub frame_thickness: u32,
    pub frame_padding: u32,
    pub max_rows_per_image: u32,
    pub placeholder_color: Rgb<u8>,
    pub show_placeholders: bool,
}

/// 合成所有頁面
///
/// 零剪輯時仍輸出一張有效的最小畫布。
pub fn compose_pages(
    cells: &[ClipCell],
    options: &ComposeOptions,
    renderer: &TextRenderer,
) -> Vec<RgbImage> {
    let visible: Vec<&ClipCell> = cells
        .iter()
        .filter(|c| options.show_placeholders || !c.placeholder)
        .collect();

    if visible.is_empty() {
        return vec![empty_page(renderer, options.font_size)];
    }

    let per_page = if options.max_rows_per_image > 0 {
        (options.clips_per_row * options.max_rows_per_image) as usize
    } else {
        visible.len()
    };

    visible
        .chunks(per_page.max(1))
        .map(|chunk| compose_single_page(chunk, options, renderer))
        .collect()
}

/// 依頁碼產生輸出檔名：out.jpg、out_page02.jpg、out_page03.jpg…
pub fn page_file_path(base: &Path, page_index: usize) -> PathBuf {
    if page_index == 0 {
        return base.to_path_buf();
    }

    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "overview".to_string());
    let ext = base
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_else(|| "jpg".to_string());
    let name = format!("{stem}_page{:02}.{ext}", page_index + 1);

    match base.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// 依副檔名輸出 PNG 或 JPEG（品質 95）
pub fn write_page(image: &RgbImage, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("無法建立輸出目錄: {}", parent.display()))?;
        }
    }

    let is_png = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"));

    if is_png {
        image
            .save(path)
            .with_context(|| format!("無法寫入 PNG: {}", path.display()))?;
    } else {
        let file =
            File::create(path).with_context(|| format!("無法建立輸出檔案: {}", path.display()))?;
        let writer = BufWriter::new(file);
        let mut encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(writer, 95);
        encoder
            .encode_image(image)
            .with_context(|| format!("無法寫入 JPEG: {}", path.display()))?;
    }

    info!("已輸出預覽圖: {}", path.display());
    Ok(())
}

/// 解析 "#RRGGBB" 形式的顏色設定
pub fn parse_hex_color(value: &str) -> Result<Rgb<u8>> {
    let hex = value.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        bail!("無法解析顏色設定: {value:?}");
    }
    let r = u8::from_str_radix(&hex[0..2], 16)?;
    let g = u8::from_str_radix(&hex[2..4], 16)?;
    let b = u8::from_str_radix(&hex[4..6], 16)?;
    Ok(Rgb([r, g, b]))
}

fn compose_single_page(
    cells: &[&ClipCell],
    options: &ComposeOptions,
    renderer: &TextRenderer,
) -> RgbImage {
    let rendered: Vec<RgbImage> = cells
        .iter()
        .map(|cell| render_cell(cell, options, renderer))
        .collect();

    let cols = options.clips_per_row.max(1) as usize;
    let col_w = rendered.iter().map(RgbImage::width).max().unwrap_or(1);
    let pad = options.padding;

    let rows: Vec<&[RgbImage]> = rendered.chunks(cols).collect();
    let row_heights: Vec<u32> = rows
        .iter()
        .map(|row| row.iter().map(RgbImage::height).max().unwrap_or(1))
        .collect();

    let page_w = cols as u32 * col_w + (cols as u32 + 1) * pad;
    let page_h = row_heights.iter().sum::<u32>() + (rows.len() as u32 + 1) * pad;

    let mut page = RgbImage::from_pixel(page_w, page_h, WHITE);

    let mut y = pad;
    for (row, row_h) in rows.iter().zip(&row_heights) {
        let mut x = pad;
        for cell_image in *row {
            imageops::overlay(&mut page, cell_image, i64::from(x), i64::from(y));
            x += col_w + pad;
        }
        y += row_h + pad;
    }

    page
}

/// 繪製單一剪輯的橫列
fn render_cell(cell: &ClipCell, options: &ComposeOptions, renderer: &TextRenderer) -> RgbImage {
    let thumbs = cell_thumbnails(cell, options, renderer);
    let pad = options.padding;
    let font_size = options.font_size as f32;

    let header_h = match options.overlay_position {
        OverlayPosition::AboveThumbnails => renderer.line_height(font_size) + 2 * TEXT_MARGIN,
        OverlayPosition::OnThumbnails => 0,
    };

    let count = thumbs.len() as u32;
    let content_w = thumbs.iter().map(RgbImage::width).sum::<u32>() + (count - 1) * pad;
    let thumb_h = thumbs.iter().map(RgbImage::height).max().unwrap_or(1);
    let content_h = header_h + thumb_h;

    let inset = if options.show_frame {
        options.frame_thickness + options.frame_padding
    } else {
        0
    };

    let cell_w = content_w + 2 * inset;
    let cell_h = content_h + 2 * inset;

    let mut canvas = if options.show_frame {
        let mut c = RgbImage::from_pixel(cell_w, cell_h, options.frame_color);
        fill_rect(
            &mut c,
            options.frame_thickness,
            options.frame_thickness,
            cell_w - 2 * options.frame_thickness,
            cell_h - 2 * options.frame_thickness,
            WHITE,
        );
        c
    } else {
        RgbImage::from_pixel(cell_w, cell_h, WHITE)
    };

    // 影格
    let mut x = inset;
    for (thumb, seconds) in thumbs.iter().zip(frame_seconds(cell)) {
        let y = inset + header_h;
        imageops::overlay(&mut canvas, thumb, i64::from(x), i64::from(y));

        if let Some(seconds) = seconds {
            let stamp = format_timestamp(seconds);
            let ty = y + thumb.height() - renderer.line_height(font_size) - TEXT_MARGIN;
            renderer.draw(
                &mut canvas,
                (x + TEXT_MARGIN) as i32,
                ty as i32,
                font_size,
                WHITE,
                &stamp,
            );
        }
        x += thumb.width() + pad;
    }

    // 註記：檔名與日期在前，剪輯長度靠右
    let leading = annotation_leading(cell);
    let trailing = format_timestamp(cell.duration_seconds);
    let trailing_w = renderer.text_width(&trailing, font_size);

    match options.overlay_position {
        OverlayPosition::AboveThumbnails => {
            renderer.draw(
                &mut canvas,
                (inset + TEXT_MARGIN) as i32,
                (inset + TEXT_MARGIN) as i32,
                font_size,
                BLACK,
                &leading,
            );
            let tx = (inset + content_w).saturating_sub(trailing_w + TEXT_MARGIN);
            renderer.draw(
                &mut canvas,
                tx as i32,
                (inset + TEXT_MARGIN) as i32,
                font_size,
                BLACK,
                &trailing,
            );
        }
        OverlayPosition::OnThumbnails => {
            renderer.draw(
                &mut canvas,
                (inset + TEXT_MARGIN) as i32,
                (inset + TEXT_MARGIN) as i32,
                font_size,
                WHITE,
                &leading,
            );
            let tx = (inset + content_w).saturating_sub(trailing_w + TEXT_MARGIN);
            renderer.draw(
                &mut canvas,
                tx as i32,
                (inset + TEXT_MARGIN) as i32,
                font_size,
                WHITE,
                &trailing,
            );
        }
    }

    canvas
}

/// 剪輯的影格圖；佔位剪輯回傳單張佔位圖
fn cell_thumbnails(
    cell: &ClipCell,
    options: &ComposeOptions,
    renderer: &TextRenderer,
) -> Vec<RgbImage> {
    if !cell.placeholder && !cell.frames.is_empty() {
        return cell.frames.iter().map(|f| f.image.clone()).collect();
    }

    let w = options.thumbnail_width.max(16);
    let h = w * 9 / 16;
    let mut placeholder = RgbImage::from_pixel(w, h, options.placeholder_color);

    let font_size = options.font_size as f32;
    let text_w = renderer.text_width(&cell.clip_name, font_size);
    let tx = (w.saturating_sub(text_w) / 2) as i32;
    let ty = (h.saturating_sub(renderer.line_height(font_size)) / 2) as i32;
    renderer.draw(&mut placeholder, tx, ty, font_size, DARK_GRAY, &cell.clip_name);

    vec![placeholder]
}

fn frame_seconds(cell: &ClipCell) -> Vec<Option<f64>> {
    if cell.placeholder || cell.frames.is_empty() {
        vec![None]
    } else {
        cell.frames.iter().map(|f| Some(f.seconds)).collect()
    }
}

fn annotation_leading(cell: &ClipCell) -> String {
    let name = cell
        .file_path
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| cell.clip_name.clone());

    match &cell.creation_date {
        Some(date) => format!("{name}  {date}"),
        None => name,
    }
}

fn empty_page(renderer: &TextRenderer, font_size: u32) -> RgbImage {
    let (w, h) = EMPTY_PAGE_SIZE;
    let mut page = RgbImage::from_pixel(w, h, WHITE);
    let text = "No clips";
    let size = font_size.max(12) as f32;
    let tx = (w.saturating_sub(renderer.text_width(text, size)) / 2) as i32;
    let ty = (h.saturating_sub(renderer.line_height(size)) / 2) as i32;
    renderer.draw(&mut page, tx, ty, size, DARK_GRAY, text);
    page
}

fn fill_rect(image: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    for py in y..(y + h).min(image.height()) {
        for px in x..(x + w).min(image.width()) {
            image.put_pixel(px, py, color);
        }
    }
}

/// MM:SS，超過一小時為 H:MM:SS
pub fn format_timestamp(seconds: f64) -> String {
    let total = seconds.max(0.0).floor() as u64;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::sheet_generator::assembler::FrameThumb;

    fn test_options() -> ComposeOptions {
        ComposeOptions {
            thumbnail_width: 64,
            clips_per_row: 5,
            padding: 5,
            font_size: 12,
            overlay_position: OverlayPosition::AboveThumbnails,
            show_frame: true,
            frame_color: Rgb([204, 204, 204]),
            frame_thickness: 2,
            frame_padding: 10,
            max_rows_per_image: 2,
            placeholder_color: Rgb([240, 240, 240]),
            show_placeholders: true,
        }
    }

    fn make_cell(index: usize, shade: u8, frame_count: usize) -> ClipCell {
        ClipCell {
            index,
            clip_name: format!("clip_{index}"),
            file_path: Some(PathBuf::from(format!("/media/clip_{index}.mp4"))),
            creation_date: Some("2023-06-15".to_string()),
            duration_seconds: 12.0,
            frames: (0..frame_count)
                .map(|i| FrameThumb {
                    seconds: i as f64 * 3.0,
                    image: RgbImage::from_pixel(64, 36, Rgb([shade, shade, shade])),
                })
                .collect(),
            placeholder: false,
        }
    }

    fn placeholder(index: usize) -> ClipCell {
        ClipCell {
            index,
            clip_name: format!("missing_{index}"),
            file_path: None,
            creation_date: None,
            duration_seconds: 0.0,
            frames: Vec::new(),
            placeholder: true,
        }
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00");
        assert_eq!(format_timestamp(75.4), "01:15");
        assert_eq!(format_timestamp(3661.0), "1:01:01");
    }

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#CCCCCC").unwrap(), Rgb([204, 204, 204]));
        assert_eq!(parse_hex_color("f0f0f0").unwrap(), Rgb([240, 240, 240]));
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("#12345G").is_err());
    }

    #[test]
    fn test_page_file_path_naming() {
        let base = Path::new("output/out.jpg");
        assert_eq!(page_file_path(base, 0), PathBuf::from("output/out.jpg"));
        assert_eq!(
            page_file_path(base, 1),
            PathBuf::from("output/out_page02.jpg")
        );
        assert_eq!(
            page_file_path(base, 2),
            PathBuf::from("output/out_page03.jpg")
        );
    }

    #[test]
    fn test_pagination_23_clips() {
        let cells: Vec<ClipCell> = (0..23).map(|i| make_cell(i, 100, 3)).collect();
        let renderer = TextRenderer::load_system();
        let pages = compose_pages(&cells, &test_options(), &renderer);

        // 5 個一列、每頁最多 2 列：10 + 10 + 3
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].dimensions(), pages[1].dimensions());
        // 最後一頁只有一列，比較矮
        assert!(pages[2].height() < pages[0].height());
    }

    #[test]
    fn test_single_page_when_rows_unbounded() {
        let cells: Vec<ClipCell> = (0..23).map(|i| make_cell(i, 100, 2)).collect();
        let mut options = test_options();
        options.max_rows_per_image = 0;
        let renderer = TextRenderer::load_system();

        let pages = compose_pages(&cells, &options, &renderer);
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn test_zero_clips_still_produces_page() {
        let renderer = TextRenderer::load_system();
        let pages = compose_pages(&[], &test_options(), &renderer);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].width() > 0 && pages[0].height() > 0);
    }

    #[test]
    fn test_distinct_frames_produce_distinct_pages() {
        let renderer = TextRenderer::load_system();
        let options = test_options();
        let a = compose_pages(&[make_cell(0, 40, 3)], &options, &renderer);
        let b = compose_pages(&[make_cell(0, 200, 3)], &options, &renderer);
        assert_ne!(a[0].as_raw(), b[0].as_raw());
    }

    #[test]
    fn test_placeholder_cell_uses_placeholder_color() {
        let renderer = TextRenderer::load_system();
        let options = test_options();
        let pages = compose_pages(&[placeholder(0)], &options, &renderer);

        let expected = options.placeholder_color;
        let found = pages[0].pixels().any(|p| *p == expected);
        assert!(found, "頁面上應該出現佔位色");
    }

    #[test]
    fn test_placeholders_can_be_hidden() {
        let renderer = TextRenderer::load_system();
        let mut options = test_options();
        options.show_placeholders = false;

        let cells = vec![placeholder(0)];
        let pages = compose_pages(&cells, &options, &renderer);
        // 全部被隱藏時輸出最小畫布
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].dimensions(), EMPTY_PAGE_SIZE);
    }

    #[test]
    fn test_frame_border_color_present() {
        let renderer = TextRenderer::load_system();
        let options = test_options();
        let pages = compose_pages(&[make_cell(0, 100, 2)], &options, &renderer);

        let found = pages[0].pixels().any(|p| *p == options.frame_color);
        assert!(found, "頁面上應該出現外框色");
    }

    #[test]
    fn test_write_page_jpeg_and_png() {
        let dir = tempfile::tempdir().unwrap();
        let image = RgbImage::from_pixel(32, 16, Rgb([10, 20, 30]));

        let jpg = dir.path().join("sheet.jpg");
        write_page(&image, &jpg).unwrap();
        assert!(image::open(&jpg).is_ok());

        let png = dir.path().join("nested/sheet.png");
        write_page(&image, &png).unwrap();
        let reloaded = image::open(&png).unwrap().to_rgb8();
        assert_eq!(reloaded.get_pixel(0, 0), &Rgb([10, 20, 30]));
    }
}
