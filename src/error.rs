use std::io;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// 获取系列信息、章节列表、页面列表时的错误
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("no series or chapter identifier in `{0}`")]
    Resolution(String),
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },
    #[error("series page has no {0}")]
    MissingField(&'static str),
    #[error("cannot build url from `{input}`: {source}")]
    InvalidUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("invalid chapter number `{0}`")]
    Parse(String),
    #[error("chapter(s) {indices:?} out of range 1..={count}")]
    OutOfRange { indices: Vec<usize>, count: usize },
}

/// 单页下载失败，只记录在下载报告中
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {0}")]
    Status(StatusCode),
    #[error("no data received for {0:?}")]
    Stalled(Duration),
    #[error("write failed: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid yaml at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}
