//! 媒體檔案比對
//!
//! FCPXML 中記錄的路徑常因素材搬移而失效。
//! 先嘗試原始路徑，再以檔名在搜尋根目錄建立的索引中
//! 做精確與模糊比對。索引每次執行只建立一次。

use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 模糊比對的預設相似度門檻
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.6;

/// 單一條目的比對結果
#[derive(Debug, Clone)]
pub struct VideoMatch {
    pub requested: PathBuf,
    pub resolved: Option<PathBuf>,
    pub similarity: f64,
}

#[derive(Debug, Clone)]
struct IndexedFile {
    path: PathBuf,
    root_rank: usize,
    normalized_stem: String,
}

/// 搜尋根目錄下所有影片檔案的索引
pub struct MatchIndex {
    by_basename: HashMap<String, Vec<usize>>,
    files: Vec<IndexedFile>,
}

impl MatchIndex {
    /// 掃描搜尋根目錄，建立以小寫檔名為鍵的索引
    pub fn build(roots: &[PathBuf], extensions: &HashSet<String>) -> Self {
        let mut files = Vec::new();
        let mut by_basename: HashMap<String, Vec<usize>> = HashMap::new();

        for (root_rank, root) in roots.iter().enumerate() {
            if !root.is_dir() {
                warn!("搜尋根目錄不存在: {}", root.display());
                continue;
            }
            for entry in WalkDir::new(root)
                .follow_links(false)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|e| e.file_type().is_file())
                .filter(|e| has_video_extension(e.path(), extensions))
            {
                let path = entry.into_path();
                let basename = match path.file_name() {
                    Some(n) => n.to_string_lossy().to_lowercase(),
                    None => continue,
                };
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();

                let idx = files.len();
                files.push(IndexedFile {
                    path,
                    root_rank,
                    normalized_stem: normalize_name(&stem),
                });
                by_basename.entry(basename).or_default().push(idx);
            }
        }

        debug!("媒體索引建立完成，共 {} 個檔案", files.len());
        Self { by_basename, files }
    }

    /// 解析一個請求路徑
    ///
    /// 依序嘗試：原始路徑存在、檔名精確比對、模糊比對。
    pub fn resolve(&self, requested: &Path, threshold: f64) -> VideoMatch {
        if requested.is_file() {
            return VideoMatch {
                requested: requested.to_path_buf(),
                resolved: Some(requested.to_path_buf()),
                similarity: 1.0,
            };
        }

        if let Some(basename) = requested.file_name().map(|n| n.to_string_lossy().to_lowercase())
        {
            if let Some(candidates) = self.by_basename.get(&basename) {
                let best = candidates
                    .iter()
                    .map(|&i| &self.files[i])
                    .min_by_key(|f| tie_break_key(f));
                if let Some(best) = best {
                    return VideoMatch {
                        requested: requested.to_path_buf(),
                        resolved: Some(best.path.clone()),
                        similarity: 1.0,
                    };
                }
            }
        }

        self.resolve_fuzzy(requested, threshold)
    }

    fn resolve_fuzzy(&self, requested: &Path, threshold: f64) -> VideoMatch {
        let stem = requested
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let normalized = normalize_name(&stem);

        let mut best: Option<(f64, &IndexedFile)> = None;
        for file in &self.files {
            let score = dice_similarity(&normalized, &file.normalized_stem);
            if score < threshold {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_score, best_file)) => {
                    score > best_score
                        || (score == best_score
                            && tie_break_key(file) < tie_break_key(best_file))
                }
            };
            if better {
                best = Some((score, file));
            }
        }

        match best {
            Some((score, file)) => {
                debug!(
                    "模糊比對: {} -> {} ({score:.3})",
                    requested.display(),
                    file.path.display()
                );
                VideoMatch {
                    requested: requested.to_path_buf(),
                    resolved: Some(file.path.clone()),
                    similarity: score,
                }
            }
            None => VideoMatch {
                requested: requested.to_path_buf(),
                resolved: None,
                similarity: 0.0,
            },
        }
    }
}

fn tie_break_key(file: &IndexedFile) -> (usize, usize, &Path) {
    (
        file.root_rank,
        file.path.as_os_str().len(),
        file.path.as_path(),
    )
}

pub fn has_video_extension(path: &Path, extensions: &HashSet<String>) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.contains(&format!(".{}", e.to_lowercase())))
}

/// 檔名正規化：小寫、非英數字元視為分隔、數字串去除前導零
fn normalize_name(stem: &str) -> String {
    let mut cleaned = String::with_capacity(stem.len());
    for c in stem.chars() {
        if c.is_alphanumeric() {
            for lc in c.to_lowercase() {
                cleaned.push(lc);
            }
        } else {
            cleaned.push(' ');
        }
    }

    let mut out = String::with_capacity(cleaned.len());
    let mut digits = String::new();
    let mut flush_digits = |digits: &mut String, out: &mut String| {
        if digits.is_empty() {
            return;
        }
        let trimmed = digits.trim_start_matches('0');
        if trimmed.is_empty() {
            out.push('0');
        } else {
            out.push_str(trimmed);
        }
        digits.clear();
    };

    for token in cleaned.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        for c in token.chars() {
            if c.is_ascii_digit() {
                digits.push(c);
            } else {
                flush_digits(&mut digits, &mut out);
                out.push(c);
            }
        }
        flush_digits(&mut digits, &mut out);
    }

    out
}

/// Sørensen–Dice 雙字母組相似度
fn dice_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    if a_chars.len() < 2 || b_chars.len() < 2 {
        return 0.0;
    }

    let mut counts: HashMap<(char, char), i64> = HashMap::new();
    for w in a_chars.windows(2) {
        *counts.entry((w[0], w[1])).or_insert(0) += 1;
    }

    let mut overlap = 0_i64;
    for w in b_chars.windows(2) {
        if let Some(c) = counts.get_mut(&(w[0], w[1])) {
            if *c > 0 {
                *c -= 1;
                overlap += 1;
            }
        }
    }

    let total = (a_chars.len() - 1) + (b_chars.len() - 1);
    2.0 * overlap as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn extensions() -> HashSet<String> {
        [".mp4", ".mov"].iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Clip_01"), "clip 1");
        assert_eq!(normalize_name("clip-1"), "clip 1");
        assert_eq!(normalize_name("A001_C002"), "a1 c2");
        assert_eq!(normalize_name("take_000"), "take 0");
    }

    #[test]
    fn test_dice_similarity() {
        assert!((dice_similarity("night", "nacht") - 0.25).abs() < 1e-9);
        assert!((dice_similarity("abc", "abc") - 1.0).abs() < 1e-9);
        assert!((dice_similarity("a", "abc") - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_exact_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("clip_01.mp4");
        fs::write(&video, b"x").unwrap();

        let index = MatchIndex::build(&[], &extensions());
        let m = index.resolve(&video, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(m.resolved.as_deref(), Some(video.as_path()));
        assert!((m.similarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_exact_basename_match() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("clip_01.mp4"), b"x").unwrap();

        let index = MatchIndex::build(&[dir.path().to_path_buf()], &extensions());
        let m = index.resolve(
            Path::new("/gone/away/CLIP_01.mp4"),
            DEFAULT_SIMILARITY_THRESHOLD,
        );
        assert_eq!(m.resolved, Some(dir.path().join("clip_01.mp4")));
        assert!((m.similarity - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fuzzy_match_leading_zero_variant() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("clip_1.mp4"), b"x").unwrap();

        let index = MatchIndex::build(&[dir.path().to_path_buf()], &extensions());
        let m = index.resolve(
            Path::new("/gone/away/clip_01.mp4"),
            DEFAULT_SIMILARITY_THRESHOLD,
        );
        assert_eq!(m.resolved, Some(dir.path().join("clip_1.mp4")));
        assert!(m.similarity >= DEFAULT_SIMILARITY_THRESHOLD);
    }

    #[test]
    fn test_no_match_below_threshold() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("interview.mov"), b"x").unwrap();

        let index = MatchIndex::build(&[dir.path().to_path_buf()], &extensions());
        let m = index.resolve(
            Path::new("/gone/away/drone_sunset.mp4"),
            DEFAULT_SIMILARITY_THRESHOLD,
        );
        assert!(m.resolved.is_none());
        assert!((m.similarity - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_video_files_excluded_from_index() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("clip_01.txt"), b"x").unwrap();

        let index = MatchIndex::build(&[dir.path().to_path_buf()], &extensions());
        let m = index.resolve(
            Path::new("/gone/away/clip_01.mp4"),
            DEFAULT_SIMILARITY_THRESHOLD,
        );
        assert!(m.resolved.is_none());
    }

    #[test]
    fn test_tie_break_prefers_earlier_root() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        fs::write(dir_a.path().join("clip_01.mp4"), b"x").unwrap();
        fs::write(dir_b.path().join("clip_01.mp4"), b"x").unwrap();

        let roots = vec![dir_a.path().to_path_buf(), dir_b.path().to_path_buf()];
        let index = MatchIndex::build(&roots, &extensions());
        let m = index.resolve(Path::new("/gone/clip_01.mp4"), DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(m.resolved, Some(dir_a.path().join("clip_01.mp4")));
    }
}
