//! 运行配置与固定请求头。

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue, REFERER, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://weebcentral.com";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/139.0.0.0 Safari/537.36";
pub const CONFIG_FILE_NAME: &str = "weebcentral-fetch.yml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub base_url: String,
    pub user_agent: String,
    pub save_dir: Option<PathBuf>,
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub chapter_delay_ms: u64,
    pub show_page_counts: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            save_dir: None,
            concurrency: 4,
            timeout_secs: 30,
            chapter_delay_ms: 500,
            show_page_counts: true,
        }
    }
}

impl FetchConfig {
    /// 读取配置文件；文件不存在时写入默认配置。缺失的字段使用默认值。
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            return Ok(config);
        }

        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let yaml = serde_yaml::to_string(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, yaml).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 配置的保存目录，否则 `~/Downloads`，再否则 `./Downloads`
    pub fn resolved_save_dir(&self) -> PathBuf {
        if let Some(dir) = &self.save_dir {
            return dir.clone();
        }
        default_save_dir()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.max(1)
    }

    pub fn chapter_delay(&self) -> Duration {
        Duration::from_millis(self.chapter_delay_ms)
    }

    pub fn headers(&self) -> RequestHeaders {
        RequestHeaders::new(&self.user_agent)
    }
}

pub fn default_save_dir() -> PathBuf {
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"));
    match home {
        Some(home) => PathBuf::from(home).join("Downloads"),
        None => PathBuf::from("Downloads"),
    }
}

/// 每个请求都携带的请求头。下载图片时另加 `Referer`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeaders {
    user_agent: String,
    accept: String,
    hx_request: bool,
}

impl RequestHeaders {
    pub fn new(user_agent: &str) -> Self {
        Self {
            user_agent: user_agent.to_string(),
            accept: "*/*".to_string(),
            hx_request: true,
        }
    }

    pub fn to_header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        insert_header(&mut headers, USER_AGENT, &self.user_agent);
        insert_header(&mut headers, ACCEPT, &self.accept);
        if self.hx_request {
            headers.insert(
                HeaderName::from_static("hx-request"),
                HeaderValue::from_static("true"),
            );
        }
        headers
    }

    pub fn with_referer(&self, referer: &str) -> HeaderMap {
        let mut headers = self.to_header_map();
        insert_header(&mut headers, REFERER, referer);
        headers
    }
}

impl Default for RequestHeaders {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

fn insert_header(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(e) => warn!("忽略无效请求头 {}: {}", name, e),
    }
}
