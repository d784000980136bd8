use std::path::Path;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use reqwest::Client;
use reqwest::header::HeaderMap;
use tokio::{fs, time};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use crate::config::RequestHeaders;
use crate::error::{FetchError, TransferError};
use crate::models::{DownloadReport, FailedPage, PageUrl};
use crate::naming::{chapter_folder, normalize_title, page_file_name};

/// 每个图片文件的写缓冲大小
const CHUNK_SIZE: usize = 64 * 1024;

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct PageDownloader {
    client: Client,
    headers: RequestHeaders,
    concurrency: usize,
    idle_timeout: Duration,
}

impl PageDownloader {
    pub fn new(client: Client, headers: RequestHeaders, concurrency: usize) -> Self {
        Self {
            client,
            headers,
            concurrency: concurrency.max(1),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// 等待响应头或下一块数据的最长时间。整张图片的下载时间不受限制。
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// 下载单页图片，边接收边写入
    pub async fn download_page(
        &self,
        page_url: &str,
        filepath: &Path,
        headers: HeaderMap,
    ) -> Result<u64, TransferError> {
        let stalled = |_: time::error::Elapsed| TransferError::Stalled(self.idle_timeout);
        let request = self.client.get(page_url).headers(headers).send();
        let mut response = time::timeout(self.idle_timeout, request).await.map_err(stalled)??;
        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status(status));
        }

        let file = fs::File::create(filepath).await?;
        let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
        let mut written = 0u64;
        while let Some(chunk) = time::timeout(self.idle_timeout, response.chunk())
            .await
            .map_err(stalled)??
        {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;

        debug!("已保存 {} ({} bytes)", filepath.display(), written);
        Ok(written)
    }

    /// 下载章节的所有页面到 `{save_dir}/{系列}/{章节}/page_{n}{ext}`。
    ///
    /// 只有创建章节目录失败才返回错误；单页失败记录到报告中，继续下载其余页面。
    pub async fn download_chapter(
        &self,
        series_title: &str,
        chapter_title: &str,
        pages: &[PageUrl],
        referer: &str,
        save_dir: &Path,
    ) -> Result<DownloadReport, FetchError> {
        let chapter_label = normalize_title(chapter_title);
        let folder = chapter_folder(save_dir, series_title, chapter_title);
        fs::create_dir_all(&folder)
            .await
            .map_err(|source| FetchError::Io {
                path: folder.clone(),
                source,
            })?;

        info!(
            "正在下载章节: {} ({} 页) -> {}",
            chapter_label,
            pages.len(),
            folder.display()
        );

        // 图片服务器要求 Referer 为章节页面
        let headers = self.headers.with_referer(referer);
        let folder_ref = &folder;
        let headers_ref = &headers;

        let mut results: Vec<(usize, &PageUrl, Result<u64, TransferError>)> =
            stream::iter(pages.iter().enumerate())
                .map(|(i, page_url)| async move {
                    let page_number = i + 1;
                    let filepath = folder_ref.join(page_file_name(page_number, page_url));
                    let result = self
                        .download_page(page_url, &filepath, headers_ref.clone())
                        .await;
                    (page_number, page_url, result)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;
        results.sort_by_key(|(page_number, _, _)| *page_number);

        let mut succeeded = 0;
        let mut failed = Vec::new();
        for (page_number, page_url, result) in results {
            match result {
                Ok(_) => succeeded += 1,
                Err(error) => {
                    warn!("第 {} 页下载失败 {}: {}", page_number, page_url, error);
                    failed.push(FailedPage {
                        page: page_number,
                        url: page_url.clone(),
                        error,
                    });
                }
            }
        }

        if failed.is_empty() {
            info!("章节 '{}' 下载完成 ({} 页)", chapter_label, succeeded);
        } else {
            warn!(
                "章节 '{}' 部分完成: {}/{} 页成功",
                chapter_label,
                succeeded,
                pages.len()
            );
        }

        Ok(DownloadReport {
            chapter_label,
            folder,
            succeeded,
            failed,
        })
    }
}
