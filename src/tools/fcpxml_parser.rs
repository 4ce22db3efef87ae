//! FCPXML 時間軸解析
//!
//! 兩趟掃描：第一趟收集 resources 中的 asset 與媒體路徑，
//! 第二趟走訪 spine，依文件順序產生時間軸條目。

use crate::tools::timecode::Timecode;
use anyhow::{Context, Result, bail};
use log::warn;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// 時間軸上的一個剪輯
#[derive(Debug, Clone)]
pub struct TimelineEntry {
    pub clip_name: String,
    /// 來源媒體路徑；ref 找不到對應 asset 時為 None
    pub file_path: Option<PathBuf>,
    pub source_in: Timecode,
    pub source_out: Timecode,
    pub sequence_start: Timecode,
    pub sequence_end: Timecode,
}

impl TimelineEntry {
    /// 剪輯在來源素材中的長度
    pub fn source_duration(&self) -> Timecode {
        self.source_out - self.source_in
    }
}

pub fn parse_fcpxml_file(path: &Path) -> Result<Vec<TimelineEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("無法讀取 FCPXML 檔案: {}", path.display()))?;
    parse_fcpxml(&content)
}

pub fn parse_fcpxml(xml: &str) -> Result<Vec<TimelineEntry>> {
    let resources = collect_resources(xml)?;
    collect_spine_entries(xml, &resources)
}

/// 第一趟：asset id 對應媒體檔案路徑
///
/// 路徑優先取 asset 內的 media-rep src，其次為 asset 自身的 src。
fn collect_resources(xml: &str) -> Result<HashMap<String, PathBuf>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut resources = HashMap::new();
    let mut current_asset: Option<(String, Option<PathBuf>)> = None;

    loop {
        match reader.read_event().context("FCPXML 格式錯誤")? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"asset" => {
                    let id = attr(&e, "id")?;
                    let src = attr(&e, "src")?.map(|s| normalize_media_uri(&s));
                    match id {
                        Some(id) => current_asset = Some((id, src)),
                        None => warn!("asset 缺少 id 屬性，略過"),
                    }
                }
                b"media-rep" => {
                    if let Some((_, path)) = current_asset.as_mut() {
                        if let Some(src) = attr(&e, "src")? {
                            *path = Some(normalize_media_uri(&src));
                        }
                    }
                }
                _ => {}
            },
            Event::End(e) => {
                if e.local_name().as_ref() == b"asset" {
                    if let Some((id, path)) = current_asset.take() {
                        match path {
                            Some(path) => {
                                resources.insert(id, path);
                            }
                            None => warn!("asset {id} 沒有可用的媒體路徑，略過"),
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(resources)
}

/// 第二趟：依文件順序收集 spine 中的 asset-clip
fn collect_spine_entries(
    xml: &str,
    resources: &HashMap<String, PathBuf>,
) -> Result<Vec<TimelineEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut spine_depth = 0_u32;
    // offset 屬性缺少時，接續前一個剪輯的結尾
    let mut cursor = Timecode::zero();

    loop {
        match reader.read_event().context("FCPXML 格式錯誤")? {
            Event::Start(e) => {
                if e.local_name().as_ref() == b"spine" {
                    spine_depth += 1;
                } else if spine_depth > 0 && e.local_name().as_ref() == b"asset-clip" {
                    if let Some(entry) = parse_asset_clip(&e, resources, cursor)? {
                        cursor = entry.sequence_end;
                        entries.push(entry);
                    }
                }
            }
            Event::Empty(e) => {
                if spine_depth > 0 && e.local_name().as_ref() == b"asset-clip" {
                    if let Some(entry) = parse_asset_clip(&e, resources, cursor)? {
                        cursor = entry.sequence_end;
                        entries.push(entry);
                    }
                }
            }
            Event::End(e) => {
                if e.local_name().as_ref() == b"spine" {
                    spine_depth = spine_depth.saturating_sub(1);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

fn parse_asset_clip(
    e: &BytesStart<'_>,
    resources: &HashMap<String, PathBuf>,
    cursor: Timecode,
) -> Result<Option<TimelineEntry>> {
    let name = attr(e, "name")?.unwrap_or_else(|| "Untitled".to_string());

    let file_path = match attr(e, "ref")? {
        Some(r) => {
            let path = resources.get(&r).cloned();
            if path.is_none() {
                warn!("asset-clip {name} 的 ref={r} 沒有對應的 asset");
            }
            path
        }
        None => {
            warn!("asset-clip {name} 缺少 ref 屬性");
            None
        }
    };

    let duration = parse_time_attr(e, "duration", &name)?.unwrap_or_default();
    let source_in = parse_time_attr(e, "start", &name)?.unwrap_or_default();
    let sequence_start = parse_time_attr(e, "offset", &name)?.unwrap_or(cursor);

    Ok(Some(TimelineEntry {
        clip_name: name,
        file_path,
        source_in,
        source_out: source_in + duration,
        sequence_start,
        sequence_end: sequence_start + duration,
    }))
}

fn parse_time_attr(e: &BytesStart<'_>, name: &str, clip: &str) -> Result<Option<Timecode>> {
    match attr(e, name)? {
        Some(v) => Timecode::parse(&v)
            .map(Some)
            .with_context(|| format!("asset-clip {clip} 的 {name} 屬性無效")),
        None => Ok(None),
    }
}

fn attr(e: &BytesStart<'_>, name: &str) -> Result<Option<String>> {
    match e.try_get_attribute(name) {
        Ok(Some(a)) => {
            let value = a.unescape_value().context("FCPXML 屬性值格式錯誤")?;
            Ok(Some(value.into_owned()))
        }
        Ok(None) => Ok(None),
        Err(err) => bail!("FCPXML 屬性格式錯誤: {err}"),
    }
}

/// 將 file:// URI 正規化為本機路徑
///
/// 處理可選的 localhost 主機名、百分比編碼、Windows 磁碟機形式
/// （/C:/...）與反斜線。
pub fn normalize_media_uri(src: &str) -> PathBuf {
    let mut rest = src.trim();
    if let Some(r) = rest.strip_prefix("file://") {
        rest = r.strip_prefix("localhost").unwrap_or(r);
    }

    let decoded = percent_decode(rest).replace('\\', "/");

    let bytes = decoded.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':' {
        return PathBuf::from(&decoded[1..]);
    }

    PathBuf::from(decoded)
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let Some(hex) = bytes.get(i + 1..i + 3).and_then(|h| std::str::from_utf8(h).ok()) {
                if let Ok(b) = u8::from_str_radix(hex, 16) {
                    out.push(b);
                    i += 3;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
