pub mod downloader;
pub mod extractor;
pub mod parser;

pub use downloader::PageDownloader;
pub use extractor::{ExtractMode, ExtractShape, ShapeError};

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use reqwest::Client;
use scraper::Html;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{FetchConfig, RequestHeaders};
use crate::error::{FetchError, SelectionError};
use crate::models::{ChapterListing, ChapterRef, PageUrl, RunSummary, SeriesInfo};
use crate::naming::normalize_title;
use crate::selection::select_chapters;
use parser::{ChapterListShape, PageListShape};

static RE_GALLERY_ID: OnceLock<Regex> = OnceLock::new();

fn re_gallery_id() -> &'static Regex {
    RE_GALLERY_ID.get_or_init(|| {
        Regex::new(r"/(?:series|chapters)/([^/#?]+)").expect("compile RE_GALLERY_ID")
    })
}

/// 从系列或章节链接中提取 ID
pub fn resolve_id(reference_url: &str) -> Option<String> {
    re_gallery_id()
        .captures(reference_url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub struct WeebCentralCrawler {
    client: Client,
    base_url: Url,
    headers: RequestHeaders,
    config: FetchConfig,
    downloader: PageDownloader,
}

impl WeebCentralCrawler {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        // 图片按块计时（见 `PageDownloader::with_idle_timeout`），这里只限制连接
        let client = Client::builder()
            .connect_timeout(config.timeout())
            .build()
            .map_err(|source| FetchError::Transport {
                url: config.base_url.clone(),
                source,
            })?;
        Self::with_client(client, config)
    }

    pub fn with_client(client: Client, config: FetchConfig) -> Result<Self, FetchError> {
        let base_url = Url::parse(&config.base_url).map_err(|source| FetchError::InvalidUrl {
            input: config.base_url.clone(),
            source,
        })?;
        let headers = config.headers();

        Ok(Self {
            client: client.clone(),
            base_url,
            downloader: PageDownloader::new(client, headers.clone(), config.concurrency())
                .with_idle_timeout(config.timeout()),
            headers,
            config,
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url.join(path).map_err(|source| FetchError::InvalidUrl {
            input: path.to_string(),
            source,
        })
    }

    /// 带公共请求头的 GET；网络错误和非成功状态码都返回错误
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        debug!("GET {}", url);
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .headers(self.headers.to_header_map())
            .timeout(self.config.timeout())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        response.text().await.map_err(transport)
    }

    pub async fn get_series_info(&self, series_url: &str) -> Result<SeriesInfo, FetchError> {
        info!("正在获取: {}", series_url);
        let html_content = self.fetch_text(series_url).await?;
        let document = Html::parse_document(&html_content);
        parser::parse_series_info(&document)
    }

    /// 获取章节列表。网站按从新到旧排列，这里反转为从旧到新。
    pub async fn get_chapters(&self, series_url: &str) -> Result<Vec<ChapterRef>, FetchError> {
        let id = resolve_id(series_url).ok_or_else(|| FetchError::Resolution(series_url.to_string()))?;
        let endpoint = self.endpoint(&format!("/series/{}/full-chapter-list", id))?;

        let body = self.fetch_text(endpoint.as_str()).await?;
        let shape = ChapterListShape {
            base: self.base_url.clone(),
        };
        let (mut chapters, mode) = extractor::extract(&shape, &body);
        debug!("解析到 {} 个章节 ({:?})", chapters.len(), mode);

        chapters.reverse();
        Ok(chapters)
    }

    pub async fn get_pages(&self, chapter_url: &str) -> Result<Vec<PageUrl>, FetchError> {
        let id = resolve_id(chapter_url).ok_or_else(|| FetchError::Resolution(chapter_url.to_string()))?;
        let mut endpoint = self.endpoint(&format!("/chapters/{}/images", id))?;
        endpoint
            .query_pairs_mut()
            .append_pair("is_prev", "False")
            .append_pair("reading_style", "long_strip");

        let body = self.fetch_text(endpoint.as_str()).await?;
        let shape = PageListShape {
            base: self.base_url.clone(),
        };
        let (pages, mode) = extractor::extract(&shape, &body);
        debug!("解析到 {} 页 ({:?})", pages.len(), mode);
        Ok(pages)
    }

    pub async fn list_chapters(&self, chapters: &[ChapterRef]) -> Vec<ChapterListing> {
        let mut listings = Vec::with_capacity(chapters.len());
        for (i, chapter) in chapters.iter().enumerate() {
            let page_count = if self.config.show_page_counts {
                match self.get_pages(&chapter.url).await {
                    Ok(pages) => Some(pages.len()),
                    Err(e) => {
                        warn!("无法获取章节 '{}' 的页面: {}", chapter.title, e);
                        None
                    }
                }
            } else {
                None
            };

            listings.push(ChapterListing {
                index: i + 1,
                chapter: chapter.clone(),
                label: normalize_title(&chapter.title),
                page_count,
            });
        }
        listings
    }

    /// 下载选中的章节。
    ///
    /// 先检查所有序号，再请求任何页面列表。之后单个章节或页面失败都不会中断，
    /// 结果汇总在 `RunSummary` 中。
    pub async fn download_selection(
        &self,
        series: &SeriesInfo,
        chapters: &[ChapterRef],
        selection: &BTreeSet<usize>,
        save_dir: &Path,
    ) -> Result<RunSummary, SelectionError> {
        let selected = select_chapters(chapters, selection)?;
        let mut summary = RunSummary::default();

        for (position, (index, chapter)) in selected.into_iter().enumerate() {
            if position > 0 && !self.config.chapter_delay().is_zero() {
                tokio::time::sleep(self.config.chapter_delay()).await;
            }

            let pages = match self.get_pages(&chapter.url).await {
                Ok(pages) => pages,
                Err(e) => {
                    warn!("章节 {} '{}' 解析失败: {}", index, chapter.title, e);
                    summary.unresolved.push((chapter.clone(), e.to_string()));
                    continue;
                }
            };

            if pages.is_empty() {
                warn!("章节 '{}' 没有找到页面，跳过", chapter.title);
                summary.skipped.push(chapter.clone());
                continue;
            }

            match self
                .downloader
                .download_chapter(&series.title, &chapter.title, &pages, &chapter.url, save_dir)
                .await
            {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    warn!("章节 '{}' 下载失败: {}", chapter.title, e);
                    summary.unresolved.push((chapter.clone(), e.to_string()));
                }
            }
        }

        info!(
            "下载完成: {} 个章节, {} 页失败, {} 个跳过, {} 个未解析",
            summary.reports.len(),
            summary.failed_pages(),
            summary.skipped.len(),
            summary.unresolved.len()
        );
        Ok(summary)
    }
}
