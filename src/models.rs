use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::TransferError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesInfo {
    pub title: String,
    pub description: String, // 没有简介时为空
    pub authors: Vec<String>,
    pub tags: Vec<String>,
}

/// 单个章节。列表按从旧到新排列，序号从 1 开始
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRef {
    pub url: String,
    pub title: String,
}

pub type PageUrl = String;

/// 选择章节前展示给用户的条目
#[derive(Debug, Clone)]
pub struct ChapterListing {
    pub index: usize,
    pub chapter: ChapterRef,
    pub label: String,
    pub page_count: Option<usize>, // 未获取或获取失败时为 None
}

#[derive(Debug)]
pub struct FailedPage {
    pub page: usize,
    pub url: String,
    pub error: TransferError,
}

/// 单个章节的下载结果
#[derive(Debug)]
pub struct DownloadReport {
    pub chapter_label: String,
    pub folder: PathBuf,
    pub succeeded: usize,
    pub failed: Vec<FailedPage>,
}

impl DownloadReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<DownloadReport>,
    pub skipped: Vec<ChapterRef>, // 没有页面
    pub unresolved: Vec<(ChapterRef, String)>, // 页面列表或目录获取失败
}

impl RunSummary {
    pub fn failed_pages(&self) -> usize {
        self.reports.iter().map(|r| r.failed.len()).sum()
    }
}
