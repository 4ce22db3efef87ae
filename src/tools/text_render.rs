//! 文字繪製
//!
//! 從系統字型路徑載入 TTF，將註記文字繪製到縮圖上。
//! 找不到任何字型時退化為不繪字，版面尺寸維持不變。

use ab_glyph::{Font, FontVec, PxScale, ScaleFont, point};
use image::{Rgb, RgbImage};
use log::warn;
use std::path::Path;

const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

pub struct TextRenderer {
    font: Option<FontVec>,
}

impl TextRenderer {
    /// 依序嘗試常見的系統字型路徑
    pub fn load_system() -> Self {
        for candidate in FONT_CANDIDATES {
            let path = Path::new(candidate);
            if !path.is_file() {
                continue;
            }
            match std::fs::read(path).map_err(anyhow::Error::from).and_then(|data| {
                FontVec::try_from_vec(data).map_err(anyhow::Error::from)
            }) {
                Ok(font) => {
                    log::debug!("載入字型: {candidate}");
                    return Self { font: Some(font) };
                }
                Err(e) => warn!("字型載入失敗 {candidate}: {e}"),
            }
        }

        warn!("找不到可用的系統字型，輸出將不含文字註記");
        Self { font: None }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// 單行文字的像素寬度
    pub fn text_width(&self, text: &str, size: f32) -> u32 {
        match &self.font {
            Some(font) => {
                let scaled = font.as_scaled(PxScale::from(size));
                let width: f32 = text
                    .chars()
                    .map(|c| scaled.h_advance(scaled.glyph_id(c)))
                    .sum();
                width.ceil() as u32
            }
            // 沒有字型時以概略寬度維持版面
            None => (text.chars().count() as f32 * size * 0.6).ceil() as u32,
        }
    }

    /// 單行文字的像素高度
    pub fn line_height(&self, size: f32) -> u32 {
        match &self.font {
            Some(font) => {
                let scaled = font.as_scaled(PxScale::from(size));
                (scaled.ascent() - scaled.descent()).ceil() as u32
            }
            None => (size * 1.2).ceil() as u32,
        }
    }

    /// 在 (x, y) 繪製單行文字，y 為文字框頂端
    pub fn draw(&self, image: &mut RgbImage, x: i32, y: i32, size: f32, color: Rgb<u8>, text: &str) {
        let Some(font) = &self.font else {
            return;
        };

        let scaled = font.as_scaled(PxScale::from(size));
        let baseline = y as f32 + scaled.ascent();
        let mut pen_x = x as f32;

        for c in text.chars() {
            if c.is_control() {
                continue;
            }
            let glyph_id = scaled.glyph_id(c);
            let advance = scaled.h_advance(glyph_id);
            let glyph = glyph_id.with_scale_and_position(PxScale::from(size), point(pen_x, baseline));
            pen_x += advance;

            let Some(outlined) = font.outline_glyph(glyph) else {
                continue;
            };
            let bounds = outlined.px_bounds();
            outlined.draw(|gx, gy, coverage| {
                let px = bounds.min.x as i32 + gx as i32;
                let py = bounds.min.y as i32 + gy as i32;
                if px < 0 || py < 0 || px >= image.width() as i32 || py >= image.height() as i32 {
                    return;
                }
                let pixel = image.get_pixel_mut(px as u32, py as u32);
                for i in 0..3 {
                    let bg = pixel.0[i] as f32;
                    let fg = color.0[i] as f32;
                    pixel.0[i] = (bg + (fg - bg) * coverage.clamp(0.0, 1.0)) as u8;
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_width_scales_with_length() {
        let renderer = TextRenderer::load_system();
        let short = renderer.text_width("ab", 12.0);
        let long = renderer.text_width("abcdef", 12.0);
        assert!(long > short);
    }

    #[test]
    fn test_line_height_positive() {
        let renderer = TextRenderer::load_system();
        assert!(renderer.line_height(12.0) > 0);
    }

    #[test]
    fn test_draw_clips_to_image_bounds() {
        let renderer = TextRenderer::load_system();
        let mut image = RgbImage::from_pixel(20, 10, Rgb([0, 0, 0]));
        // 部分超出邊界也不可 panic
        renderer.draw(&mut image, -5, -5, 14.0, Rgb([255, 255, 255]), "clipped text");
        renderer.draw(&mut image, 15, 5, 14.0, Rgb([255, 255, 255]), "edge");
    }
}
