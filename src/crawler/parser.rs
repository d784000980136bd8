use std::collections::HashSet;
use std::sync::OnceLock;

use scraper::{Element, ElementRef, Html, Selector};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::extractor::ExtractShape;
use crate::error::FetchError;
use crate::models::{ChapterRef, PageUrl, SeriesInfo};

static H1: OnceLock<Selector> = OnceLock::new();
static STRONG: OnceLock<Selector> = OnceLock::new();
static ANCHOR: OnceLock<Selector> = OnceLock::new();
static CHAPTER_LINK: OnceLock<Selector> = OnceLock::new();
static PAGE_IMAGE: OnceLock<Selector> = OnceLock::new();

fn selector(cell: &'static OnceLock<Selector>, css: &'static str) -> &'static Selector {
    cell.get_or_init(|| Selector::parse(css).expect("static selector"))
}

/// 元素内各文本节点去除空白后以空格连接
pub fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn label_markers<'a>(document: &'a Html, label: &str) -> Vec<ElementRef<'a>> {
    document
        .select(selector(&STRONG, "strong"))
        .filter(|strong| strong.text().collect::<String>().contains(label))
        .collect()
}

/// `<strong>` 标签之后紧邻的 `tag` 元素
pub fn adjacent_after_label<'a>(document: &'a Html, label: &str, tag: &str) -> Option<ElementRef<'a>> {
    label_markers(document, label)
        .into_iter()
        .filter_map(|marker| marker.next_sibling_element())
        .find(|next| next.value().name() == tag)
}

/// `<strong>` 标签之后所有兄弟节点中的 `<a>`（包括嵌套的），按文档顺序
pub fn links_after_label<'a>(document: &'a Html, label: &str) -> Vec<ElementRef<'a>> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for marker in label_markers(document, label) {
        for sibling in marker.next_siblings().filter_map(ElementRef::wrap) {
            let candidates: Vec<ElementRef<'a>> = if sibling.value().name() == "a" {
                vec![sibling]
            } else {
                sibling.select(selector(&ANCHOR, "a")).collect()
            };
            for link in candidates {
                if seen.insert(link.id()) {
                    links.push(link);
                }
            }
        }
    }
    links
}

pub fn parse_series_info(document: &Html) -> Result<SeriesInfo, FetchError> {
    let title = document
        .select(selector(&H1, "h1"))
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .ok_or(FetchError::MissingField("title"))?;

    let description = adjacent_after_label(document, "Description", "p")
        .map(element_text)
        .unwrap_or_default();

    let link_texts = |label: &str| -> Vec<String> {
        links_after_label(document, label)
            .into_iter()
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect()
    };

    Ok(SeriesInfo {
        title,
        description,
        authors: link_texts("Author"),
        tags: link_texts("Tags"),
    })
}

fn join_url(base: &Url, reference: &str) -> Option<String> {
    match base.join(reference.trim()) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            debug!("无法解析的链接 `{}`: {}", reference, e);
            None
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChapterRecord {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ChapterListBody {
    Wrapped { chapters: Vec<ChapterRecord> },
    Bare(Vec<ChapterRecord>),
}

/// 章节列表，保持网站顺序（从新到旧）
pub struct ChapterListShape {
    pub base: Url,
}

impl ExtractShape for ChapterListShape {
    type Item = ChapterRef;
    type Body = ChapterListBody;

    fn items_from_json(&self, body: ChapterListBody) -> Vec<ChapterRef> {
        let records = match body {
            ChapterListBody::Wrapped { chapters } => chapters,
            ChapterListBody::Bare(chapters) => chapters,
        };
        records
            .into_iter()
            .filter_map(|record| {
                Some(ChapterRef {
                    url: join_url(&self.base, &record.url)?,
                    title: record.title.trim().to_string(),
                })
            })
            .collect()
    }

    fn items_from_html(&self, document: &Html) -> Vec<ChapterRef> {
        document
            .select(selector(&CHAPTER_LINK, "a[href]"))
            .filter_map(|anchor| {
                let href = anchor.value().attr("href")?;
                if href.starts_with('#') {
                    return None;
                }
                Some(ChapterRef {
                    url: join_url(&self.base, href)?,
                    title: element_text(anchor),
                })
            })
            .collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct ImageRecord {
    pub src: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum PageListBody {
    Wrapped { images: Vec<ImageRecord> },
    Bare(Vec<ImageRecord>),
}

pub struct PageListShape {
    pub base: Url,
}

impl ExtractShape for PageListShape {
    type Item = PageUrl;
    type Body = PageListBody;

    fn items_from_json(&self, body: PageListBody) -> Vec<PageUrl> {
        let records = match body {
            PageListBody::Wrapped { images } => images,
            PageListBody::Bare(images) => images,
        };
        records
            .into_iter()
            .filter_map(|record| join_url(&self.base, &record.src))
            .collect()
    }

    // 带 `x-show` 的图片属于其他阅读模式
    fn items_from_html(&self, document: &Html) -> Vec<PageUrl> {
        document
            .select(selector(&PAGE_IMAGE, r#"img[alt*="Page"]:not([x-show])"#))
            .filter_map(|img| img.value().attr("src"))
            .filter(|src| !src.trim().is_empty())
            .filter_map(|src| join_url(&self.base, src))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::extractor::{ExtractMode, extract};

    const SERIES_PAGE: &str = r#"
        <html><body>
          <h1> Attack on Titan </h1>
          <ul>
            <li><strong>Author(s): </strong><a href="/a/1">Isayama Hajime</a> <a href="/a/2">Someone Else</a></li>
            <li><strong>Tags(s): </strong><span><a href="/t/1">Action</a></span>, <span><a href="/t/2">Drama</a></span></li>
            <li><strong>Type: </strong><a href="/type">Manga</a></li>
          </ul>
          <li><strong>Description</strong><p>Humanity lives behind walls.</p></li>
        </body></html>
    "#;

    fn base() -> Url {
        Url::parse("https://weebcentral.com").unwrap()
    }

    #[test]
    fn test_parse_series_info() {
        let document = Html::parse_document(SERIES_PAGE);
        let info = parse_series_info(&document).unwrap();
        assert_eq!(info.title, "Attack on Titan");
        assert_eq!(info.description, "Humanity lives behind walls.");
        assert_eq!(info.authors, vec!["Isayama Hajime", "Someone Else"]);
        assert_eq!(info.tags, vec!["Action", "Drama"]);
    }

    #[test]
    fn test_missing_description_is_empty() {
        let document = Html::parse_document(
            "<h1>Title</h1><strong>Description</strong><div>not a paragraph</div><p>later</p>",
        );
        let info = parse_series_info(&document).unwrap();
        assert_eq!(info.description, "");
        assert!(info.authors.is_empty());
    }

    #[test]
    fn test_missing_title_is_an_error() {
        let document = Html::parse_document("<p>nothing here</p>");
        assert!(matches!(
            parse_series_info(&document),
            Err(FetchError::MissingField("title"))
        ));
    }

    #[test]
    fn test_links_after_label_ignores_preceding_links() {
        let document = Html::parse_document(
            "<div><a href='/x'>Before</a><strong>Author</strong><a href='/y'>After</a></div>",
        );
        let names: Vec<String> = links_after_label(&document, "Author")
            .into_iter()
            .map(element_text)
            .collect();
        assert_eq!(names, vec!["After"]);
    }

    #[test]
    fn test_chapter_list_json() {
        let shape = ChapterListShape { base: base() };
        let body = r#"{"chapters":[{"url":"/chapters/B","title":"Chapter 2"},{"url":"/chapters/A","title":"Chapter 1"}]}"#;
        let (items, mode) = extract(&shape, body);
        assert_eq!(mode, ExtractMode::Json);
        assert_eq!(items[0].url, "https://weebcentral.com/chapters/B");
        assert_eq!(items[1].title, "Chapter 1");
    }

    #[test]
    fn test_chapter_list_html_skips_fragments() {
        let shape = ChapterListShape { base: base() };
        let body = r##"
            <a href="#top">Top</a>
            <a href="https://weebcentral.com/chapters/B"><span>Chapter 2</span> <time>2 days ago</time></a>
            <a href="/chapters/A">Chapter 1</a>
            <a>no href</a>
        "##;
        let (items, mode) = extract(&shape, body);
        assert_eq!(mode, ExtractMode::Html);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].url, "https://weebcentral.com/chapters/B");
        assert_eq!(items[0].title, "Chapter 2 2 days ago");
        assert_eq!(items[1].url, "https://weebcentral.com/chapters/A");
    }

    #[test]
    fn test_page_list_json_bare_array() {
        let shape = PageListShape { base: base() };
        let (items, mode) = extract(&shape, r#"[{"src":"https://cdn.test/1.png"},{"src":"https://cdn.test/2.png"}]"#);
        assert_eq!(mode, ExtractMode::Json);
        assert_eq!(items, vec!["https://cdn.test/1.png", "https://cdn.test/2.png"]);
    }

    #[test]
    fn test_page_list_html_skips_alternate_mode() {
        let shape = PageListShape { base: base() };
        let body = r#"
            <img src="https://cdn.test/logo.png" alt="Logo">
            <img src="https://cdn.test/1.png" alt="Page 1">
            <img src="https://cdn.test/1-single.png" alt="Page 1" x-show="mode === 'single'">
            <img src="https://cdn.test/2.png" alt="Solo Leveling Page 2">
            <img alt="Page 3">
        "#;
        let (items, mode) = extract(&shape, body);
        assert_eq!(mode, ExtractMode::Html);
        assert_eq!(items, vec!["https://cdn.test/1.png", "https://cdn.test/2.png"]);
    }
}
