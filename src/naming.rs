//! 章节标题规范化与安全文件名。

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use url::Url;

static RE_CHAPTER_LABEL: OnceLock<Regex> = OnceLock::new();

fn re_chapter_label() -> &'static Regex {
    RE_CHAPTER_LABEL.get_or_init(|| {
        Regex::new(r"(?i)(episode\s*\d+|chapter\s*\d+)").expect("compile RE_CHAPTER_LABEL")
    })
}

/// 从章节标题中提取 "Chapter N" / "Episode N"，找不到则原样返回。
///
/// 保留原文大小写，例如 "CHAPTER 7: x" 得到 "CHAPTER 7"。
pub fn normalize_title(raw: &str) -> String {
    match re_chapter_label().find(raw) {
        Some(m) => m.as_str().to_string(),
        None => raw.to_string(),
    }
}

/// 只保留字母数字、空格、下划线和连字符
pub fn sanitize(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(*c, ' ' | '_' | '-'))
        .collect()
}

/// 清理后去除首尾空白，为空时使用 `untitled`
pub fn safe_label(name: &str) -> String {
    let cleaned = sanitize(name);
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "untitled".to_string()
    } else {
        cleaned.to_string()
    }
}

/// 从URL路径中提取扩展名（含点），忽略查询参数
pub fn page_extension(page_url: &str) -> String {
    let path = match Url::parse(page_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => page_url
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    let file_name = path.rsplit('/').next().unwrap_or_default();
    match file_name.rfind('.') {
        Some(pos) if pos > 0 => file_name[pos..].to_string(),
        _ => String::new(),
    }
}

pub fn chapter_folder(root: &Path, series_title: &str, chapter_title: &str) -> PathBuf {
    root.join(safe_label(series_title))
        .join(safe_label(&normalize_title(chapter_title)))
}

pub fn page_file_name(page_number: usize, page_url: &str) -> String {
    format!("page_{}{}", page_number, page_extension(page_url))
}
