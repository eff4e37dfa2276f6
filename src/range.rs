// Phase 1: ページ範囲パーサ
//
// Parses "1-3, 5, 12-10" style page specifications against a page count.
// Parsing never fails: malformed tokens are skipped and out-of-bounds
// indices are dropped. Callers inspect `PageSelection` to report what was
// discarded.

use std::collections::BTreeSet;

/// パース済みのページ指定。
///
/// `ordered()` は指定順（初出優先で重複除去）、`to_set()` は包含判定用の集合。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSelection {
    ordered: Vec<u32>,
    rejected_tokens: Vec<String>,
    out_of_bounds: usize,
}

impl PageSelection {
    /// ページ範囲文字列を `1..=max_page` に対してパースする。
    ///
    /// 形式:
    /// - 単一ページ: `"5"`
    /// - 範囲: `"5-10"` (5, 6, 7, 8, 9, 10)
    /// - 降順範囲: `"12-10"` (12, 11, 10)
    /// - 混合（カンマ区切り）: `"1, 3, 5-10, 15"`
    pub fn parse(spec: &str, max_page: u32) -> Self {
        let mut selection = PageSelection::default();
        let mut seen = BTreeSet::new();

        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }

            let Some((start, end)) = parse_token(part) else {
                selection.rejected_tokens.push(part.to_string());
                continue;
            };

            // Only the in-bounds part of a run is walked; the rest is counted.
            let (low, high) = (start.min(end), start.max(end));
            let span = (i128::from(high) - i128::from(low)) as u128 + 1;
            let clamped_low = low.max(1);
            let clamped_high = high.min(i64::from(max_page));
            let in_bounds = if clamped_low <= clamped_high {
                (clamped_high - clamped_low) as u128 + 1
            } else {
                0
            };
            let dropped = (span - in_bounds).min(usize::MAX as u128) as usize;
            selection.out_of_bounds = selection.out_of_bounds.saturating_add(dropped);
            if in_bounds == 0 {
                continue;
            }

            // Range check above guarantees the values fit in u32.
            let run: Box<dyn Iterator<Item = u32>> = if start <= end {
                Box::new(clamped_low as u32..=clamped_high as u32)
            } else {
                Box::new((clamped_low as u32..=clamped_high as u32).rev())
            };
            for page in run {
                if seen.insert(page) {
                    selection.ordered.push(page);
                }
            }
        }

        selection
    }

    /// 指定順のページ番号（1-based、初出優先で重複除去済み）。
    pub fn ordered(&self) -> &[u32] {
        &self.ordered
    }

    /// 包含判定用のページ集合。
    pub fn to_set(&self) -> BTreeSet<u32> {
        self.ordered.iter().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// 数値として解釈できず読み飛ばしたトークン。
    pub fn rejected_tokens(&self) -> &[String] {
        &self.rejected_tokens
    }

    /// `1..=max_page` の外にあったため捨てたインデックスの数。
    pub fn out_of_bounds(&self) -> usize {
        self.out_of_bounds
    }

    /// 何かを捨てたか、何も選択されなかった場合に理由を返す。
    pub fn shortfall(&self) -> Option<String> {
        let mut reasons = Vec::new();
        if !self.rejected_tokens.is_empty() {
            reasons.push(format!(
                "ignored malformed token(s): {}",
                self.rejected_tokens.join(", ")
            ));
        }
        if self.out_of_bounds > 0 {
            reasons.push(format!(
                "dropped {} out-of-range page index(es)",
                self.out_of_bounds
            ));
        }
        if self.ordered.is_empty() {
            reasons.push("no pages selected".to_string());
        }
        if reasons.is_empty() {
            None
        } else {
            Some(reasons.join("; "))
        }
    }
}

/// ページ範囲文字列をパースして指定順のページ番号列を返す。
pub fn parse_page_range(spec: &str, max_page: u32) -> Vec<u32> {
    PageSelection::parse(spec, max_page).ordered
}

/// 1トークンを `(start, end)` に分解する。単一ページは `(n, n)`。解釈できなければ `None`。
fn parse_token(part: &str) -> Option<(i64, i64)> {
    // The first '-' is always the separator, so "-3" and "-3-5" are malformed.
    match part.split_once('-') {
        Some((start, end)) => {
            let start: i64 = start.trim().parse().ok()?;
            let end: i64 = end.trim().parse().ok()?;
            Some((start, end))
        }
        None => {
            let page: i64 = part.parse().ok()?;
            Some((page, page))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_dash_token_is_rejected() {
        let selection = PageSelection::parse("-3", 10);
        assert!(selection.is_empty());
        assert_eq!(selection.out_of_bounds(), 0);
        assert_eq!(selection.rejected_tokens(), ["-3".to_string()]);
    }

    #[test]
    fn test_leading_dash_range_selects_nothing() {
        let selection = PageSelection::parse("-3-5", 10);
        assert!(selection.is_empty());
        assert_eq!(selection.out_of_bounds(), 0);
        assert_eq!(selection.rejected_tokens(), ["-3-5".to_string()]);
        assert_eq!(parse_page_range("-3-5, 7", 10), vec![7]);
    }

    #[test]
    fn test_zero_page_is_out_of_bounds() {
        let selection = PageSelection::parse("0", 10);
        assert!(selection.is_empty());
        assert_eq!(selection.out_of_bounds(), 1);
        assert!(selection.rejected_tokens().is_empty());
    }

    #[test]
    fn test_range_with_spaces_around_dash() {
        assert_eq!(parse_page_range(" 2 - 4 ", 10), vec![2, 3, 4]);
    }

    #[test]
    fn test_range_to_negative_end_keeps_in_bounds_part() {
        let selection = PageSelection::parse("1--3", 10);
        assert_eq!(selection.ordered(), [1]);
        assert_eq!(selection.out_of_bounds(), 4);
    }

    #[test]
    fn test_three_part_token_is_rejected() {
        let selection = PageSelection::parse("1-2-3", 10);
        assert!(selection.is_empty());
        assert_eq!(selection.rejected_tokens(), ["1-2-3".to_string()]);
    }

    #[test]
    fn test_huge_range_is_clamped_without_walking() {
        let selection = PageSelection::parse("1-4000000000", 3);
        assert_eq!(selection.ordered(), [1, 2, 3]);
        assert_eq!(selection.out_of_bounds(), 3_999_999_997);
    }
}
