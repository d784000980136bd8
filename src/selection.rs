//! 章节选择表达式：`all`、`3`、`1,4`、`2-5`、`1,3,5-7`。

use std::collections::BTreeSet;

use crate::error::SelectionError;
use crate::models::ChapterRef;

/// 解析选择表达式，返回去重并升序的章节序号（从 1 开始）。
///
/// 这里不检查越界（见 [`select_chapters`]）。范围最多展开到 `chapter_count + 1`，
/// 超出的部分只保留一个越界序号，足以让 [`select_chapters`] 报错。
/// 反向范围如 `9-2` 不选择任何章节，而不是报错。
pub fn parse_selection(expr: &str, chapter_count: usize) -> Result<BTreeSet<usize>, SelectionError> {
    let expr = expr.trim();
    if expr.eq_ignore_ascii_case("all") {
        return Ok((1..=chapter_count).collect());
    }

    let mut selected = BTreeSet::new();
    for term in expr.split(',') {
        let term = term.trim();
        match term.split_once('-') {
            Some((start, end)) => {
                let start = parse_index(start)?;
                let end = parse_index(end)?;
                if start <= end {
                    let capped = end.min(chapter_count.saturating_add(1)).max(start);
                    selected.extend(start..=capped);
                }
            }
            None => {
                selected.insert(parse_index(term)?);
            }
        }
    }
    Ok(selected)
}

fn parse_index(raw: &str) -> Result<usize, SelectionError> {
    let raw = raw.trim();
    raw.parse::<usize>()
        .map_err(|_| SelectionError::Parse(raw.to_string()))
}

/// 按序号取出章节。只要有一个越界就整体失败。
pub fn select_chapters<'a>(
    chapters: &'a [ChapterRef],
    selection: &BTreeSet<usize>,
) -> Result<Vec<(usize, &'a ChapterRef)>, SelectionError> {
    let out_of_range: Vec<usize> = selection
        .iter()
        .copied()
        .filter(|&index| index == 0 || index > chapters.len())
        .collect();
    if !out_of_range.is_empty() {
        return Err(SelectionError::OutOfRange {
            indices: out_of_range,
            count: chapters.len(),
        });
    }

    Ok(selection
        .iter()
        .map(|&index| (index, &chapters[index - 1]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[usize]) -> BTreeSet<usize> {
        items.iter().copied().collect()
    }

    fn chapters(n: usize) -> Vec<ChapterRef> {
        (1..=n)
            .map(|i| ChapterRef {
                url: format!("https://weebcentral.com/chapters/C{}", i),
                title: format!("Chapter {}", i),
            })
            .collect()
    }

    #[test]
    fn test_parse_list_and_range() {
        assert_eq!(parse_selection("1,3,5-7", 10).unwrap(), set(&[1, 3, 5, 6, 7]));
        assert_eq!(parse_selection(" 2 , 2, 1 - 3 ", 10).unwrap(), set(&[1, 2, 3]));
    }

    #[test]
    fn test_parse_all() {
        assert_eq!(parse_selection("all", 3).unwrap(), set(&[1, 2, 3]));
        assert_eq!(parse_selection("ALL", 0).unwrap(), set(&[]));
    }

    #[test]
    fn test_inverted_range_is_empty() {
        assert_eq!(parse_selection("9-2", 10).unwrap(), set(&[]));
        assert_eq!(parse_selection("9-2,4", 10).unwrap(), set(&[4]));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_selection("1,x", 10), Err(SelectionError::Parse("x".into())));
        assert_eq!(parse_selection("", 10), Err(SelectionError::Parse("".into())));
        assert_eq!(parse_selection("1,", 10), Err(SelectionError::Parse("".into())));
        assert_eq!(parse_selection("-3", 10), Err(SelectionError::Parse("".into())));
        assert!(parse_selection("1-2-3", 10).is_err());
    }

    #[test]
    fn test_parse_does_not_bound_check() {
        assert_eq!(parse_selection("0,99", 3).unwrap(), set(&[0, 99]));
    }

    #[test]
    fn test_huge_range_is_capped_and_still_out_of_range() {
        let started = std::time::Instant::now();
        let selection = parse_selection("1-4000000000", 3).unwrap();
        assert!(started.elapsed() < std::time::Duration::from_secs(1));
        assert_eq!(selection, set(&[1, 2, 3, 4]));

        let err = select_chapters(&chapters(3), &selection).unwrap_err();
        assert_eq!(err, SelectionError::OutOfRange { indices: vec![4], count: 3 });

        assert_eq!(parse_selection("2000000000-4000000000", 3).unwrap(), set(&[2000000000]));
        assert_eq!(parse_selection("2-3", 3).unwrap(), set(&[2, 3]));
    }

    #[test]
    fn test_select_chapters() {
        let list = chapters(5);
        let picked = select_chapters(&list, &set(&[2, 5])).unwrap();
        assert_eq!(picked.len(), 2);
        assert_eq!(picked[0].0, 2);
        assert_eq!(picked[0].1.title, "Chapter 2");
        assert_eq!(picked[1].1.title, "Chapter 5");
    }

    #[test]
    fn test_select_out_of_range() {
        let list = chapters(3);
        let err = select_chapters(&list, &set(&[0, 1, 2, 4])).unwrap_err();
        assert_eq!(
            err,
            SelectionError::OutOfRange {
                indices: vec![0, 4],
                count: 3
            }
        );
    }
}
