//! 双模式解析：同一个响应先按 JSON 解析，失败再按 HTML 解析。

use scraper::Html;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

/// JSON 解析失败的原因。只有这些情况会回退到 HTML。
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("body is not the expected json shape: {0}")]
    Json(#[from] serde_json::Error),
    #[error("json body contained no items")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractMode {
    Json,
    Html,
}

/// 同一份列表数据的 JSON 形式与 HTML 形式
pub trait ExtractShape {
    type Item;
    type Body: DeserializeOwned;

    fn items_from_json(&self, body: Self::Body) -> Vec<Self::Item>;

    fn items_from_html(&self, document: &Html) -> Vec<Self::Item>;
}

pub fn extract_json<S: ExtractShape>(shape: &S, body: &str) -> Result<Vec<S::Item>, ShapeError> {
    let parsed: S::Body = serde_json::from_str(body)?;
    let items = shape.items_from_json(parsed);
    if items.is_empty() {
        return Err(ShapeError::Empty);
    }
    Ok(items)
}

pub fn extract_html<S: ExtractShape>(shape: &S, body: &str) -> Vec<S::Item> {
    let document = Html::parse_document(body);
    shape.items_from_html(&document)
}

/// 先尝试 JSON，失败则回退 HTML。不会返回错误，结果为空表示两种方式都没有找到数据。
pub fn extract<S: ExtractShape>(shape: &S, body: &str) -> (Vec<S::Item>, ExtractMode) {
    match extract_json(shape, body) {
        Ok(items) => (items, ExtractMode::Json),
        Err(e) => {
            debug!("JSON 解析失败，改用 HTML: {}", e);
            (extract_html(shape, body), ExtractMode::Html)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Selector;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Numbers {
        numbers: Vec<u32>,
    }

    struct NumberShape;

    impl ExtractShape for NumberShape {
        type Item = u32;
        type Body = Numbers;

        fn items_from_json(&self, body: Numbers) -> Vec<u32> {
            body.numbers
        }

        fn items_from_html(&self, document: &Html) -> Vec<u32> {
            let selector = Selector::parse("li").unwrap();
            document
                .select(&selector)
                .filter_map(|li| li.text().collect::<String>().trim().parse().ok())
                .collect()
        }
    }

    #[test]
    fn test_json_wins_when_valid() {
        let (items, mode) = extract(&NumberShape, r#"{"numbers":[3,1,2]}"#);
        assert_eq!(items, vec![3, 1, 2]);
        assert_eq!(mode, ExtractMode::Json);
    }

    #[test]
    fn test_html_fallback_on_malformed_json() {
        let (items, mode) = extract(&NumberShape, "<ul><li>7</li><li>8</li></ul>");
        assert_eq!(items, vec![7, 8]);
        assert_eq!(mode, ExtractMode::Html);
    }

    #[test]
    fn test_fallback_on_shape_mismatch_and_empty() {
        assert!(matches!(
            extract_json(&NumberShape, r#"{"other":[1]}"#),
            Err(ShapeError::Json(_))
        ));
        assert!(matches!(
            extract_json(&NumberShape, r#"{"numbers":[]}"#),
            Err(ShapeError::Empty)
        ));
        let (items, mode) = extract(&NumberShape, r#"{"numbers":[]}"#);
        assert!(items.is_empty());
        assert_eq!(mode, ExtractMode::Html);
    }
}
