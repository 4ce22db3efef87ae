//! 擷取位置解析
//!
//! 設定字串（例如 "0%,50%,99%"）描述每個剪輯要擷取的時間點。
//! 解析為位置規格後，依剪輯的來源區間或整部影片長度
//! 換算成秒數。純函式，結果只取決於輸入。

use anyhow::{Result, bail};

/// 擷取點不可落在最後一幀之後的安全邊界（秒）
pub const POSITION_EPS: f64 = 1e-3;

/// 單一擷取位置規格
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PositionSpec {
    /// 百分比位置，0 到 100
    Percentage(f64),
    /// 絕對秒數
    AbsoluteSeconds(f64),
    /// 幀編號（需要幀率換算）
    FrameIndex(u64),
}

/// 解析逗號分隔的位置設定字串
pub fn parse_position_specs(input: &str) -> Result<Vec<PositionSpec>> {
    let mut specs = Vec::new();

    for raw in input.split(',') {
        let token = raw.trim();
        if token.is_empty() {
            bail!("位置設定含有空白項目: {input:?}");
        }

        if let Some(percent) = token.strip_suffix('%') {
            let value: f64 = percent
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("無法解析百分比位置: {token:?}"))?;
            if !(0.0..=100.0).contains(&value) {
                bail!("百分比位置必須在 0 到 100 之間: {token:?}");
            }
            specs.push(PositionSpec::Percentage(value));
        } else if let Some(frame) = token.strip_prefix(['f', 'F']) {
            let index: u64 = frame
                .parse()
                .map_err(|_| anyhow::anyhow!("無法解析幀編號位置: {token:?}"))?;
            specs.push(PositionSpec::FrameIndex(index));
        } else {
            let seconds: f64 = token
                .parse()
                .map_err(|_| anyhow::anyhow!("無法解析秒數位置: {token:?}"))?;
            if seconds < 0.0 {
                bail!("秒數位置不可為負: {token:?}");
            }
            specs.push(PositionSpec::AbsoluteSeconds(seconds));
        }
    }

    if specs.is_empty() {
        bail!("位置設定為空");
    }

    Ok(specs)
}

/// 在剪輯的來源區間內解析位置
///
/// 百分比以區間長度為基準，秒數與幀編號以 `source_in` 為原點。
/// 區間長度為零或負值時回傳空列表（剪輯會以佔位圖呈現）。
pub fn resolve_in_interval(
    specs: &[PositionSpec],
    source_in: f64,
    source_out: f64,
    frame_rate: f64,
) -> Vec<f64> {
    let span = source_out - source_in;
    if span <= 0.0 {
        return Vec::new();
    }

    let fps = effective_fps(frame_rate);
    let upper = (source_out - POSITION_EPS).max(source_in);

    specs
        .iter()
        .map(|spec| {
            let t = match spec {
                PositionSpec::Percentage(p) => source_in + span * p / 100.0,
                PositionSpec::AbsoluteSeconds(s) => source_in + s,
                PositionSpec::FrameIndex(n) => source_in + *n as f64 / fps,
            };
            t.clamp(source_in, upper)
        })
        .collect()
}

/// 以整部影片長度為基準解析位置
pub fn resolve_in_file(specs: &[PositionSpec], duration: f64, frame_rate: f64) -> Vec<f64> {
    if duration <= 0.0 {
        return Vec::new();
    }

    let fps = effective_fps(frame_rate);
    let upper = (duration - POSITION_EPS).max(0.0);

    specs
        .iter()
        .map(|spec| {
            let t = match spec {
                PositionSpec::Percentage(p) => duration * p / 100.0,
                PositionSpec::AbsoluteSeconds(s) => *s,
                PositionSpec::FrameIndex(n) => *n as f64 / fps,
            };
            t.clamp(0.0, upper)
        })
        .collect()
}

fn effective_fps(frame_rate: f64) -> f64 {
    if frame_rate > 0.0 { frame_rate } else { 30.0 }
}
