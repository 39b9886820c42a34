/// One slot in a pager strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(usize),
    Ellipsis,
}

pub const PAGE_SIZE: usize = 10;

pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    len.div_ceil(page_size).max(1)
}

/// Pager strip for 1-based `page`: always the first and last page, the
/// current page and its neighbors, one more step out when far from the ends,
/// and an ellipsis wherever pages are skipped.
pub fn page_items(page: usize, total: usize) -> Vec<PageItem> {
    let pages: Vec<usize> = (1..=total)
        .filter(|&i| {
            i == 1
                || i == total
                || i.abs_diff(page) <= 1
                || (page >= 2 && i == page - 2 && page > 4)
                || (i == page + 2 && page + 3 < total)
        })
        .collect();

    let mut items = Vec::with_capacity(pages.len() * 2);
    for (idx, &p) in pages.iter().enumerate() {
        if idx > 0 && p - pages[idx - 1] > 1 {
            items.push(PageItem::Ellipsis);
        }
        items.push(PageItem::Page(p));
    }
    items
}

/// Slice of `items` shown on 1-based `page`.
pub fn page_slice<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.saturating_sub(1).saturating_mul(page_size).min(items.len());
    let end = (start + page_size).min(items.len());
    &items[start..end]
}

/// Render a strip like `‹ 1 … 4 [5] 6 … 10 ›`.
pub fn render(page: usize, total: usize) -> String {
    let mut parts = vec!["‹".to_string()];
    for item in page_items(page, total) {
        parts.push(match item {
            PageItem::Ellipsis => "…".to_string(),
            PageItem::Page(p) if p == page => format!("[{p}]"),
            PageItem::Page(p) => p.to_string(),
        });
    }
    parts.push("›".to_string());
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use PageItem::*;

    #[test]
    fn small_totals_show_every_page() {
        assert_eq!(page_items(1, 1), vec![Page(1)]);
        assert_eq!(page_items(2, 3), vec![Page(1), Page(2), Page(3)]);
    }

    #[test]
    fn middle_page_has_two_gaps() {
        assert_eq!(
            page_items(6, 12),
            vec![Page(1), Ellipsis, Page(4), Page(5), Page(6), Page(7), Page(8), Ellipsis, Page(12)]
        );
    }

    #[test]
    fn near_start_has_one_gap() {
        assert_eq!(
            page_items(2, 10),
            vec![Page(1), Page(2), Page(3), Page(4), Ellipsis, Page(10)]
        );
    }

    #[test]
    fn near_end_has_one_gap() {
        assert_eq!(
            page_items(10, 10),
            vec![Page(1), Ellipsis, Page(8), Page(9), Page(10)]
        );
    }

    #[test]
    fn page_counts_and_slices() {
        assert_eq!(total_pages(0, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        let v: Vec<u32> = (0..25).collect();
        assert_eq!(page_slice(&v, 3, 10), &[20, 21, 22, 23, 24]);
        assert!(page_slice(&v, 9, 10).is_empty());
    }

    #[test]
    fn render_marks_current_page() {
        assert_eq!(render(2, 3), "‹ 1 [2] 3 ›");
    }
}
