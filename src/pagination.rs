use serde::Serialize;

/// Offset/limit slice requested from a repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: usize,
    pub limit: usize,
}

impl PageWindow {
    /// Window for 1-based `page`; page numbers below 1 are treated as 1.
    pub fn for_page(page: usize, per_page: usize) -> Self {
        Self { offset: (page.max(1) - 1).saturating_mul(per_page), limit: per_page }
    }

    /// Like [`for_page`](Self::for_page) but `None` when the offset does not
    /// fit a SQL `BIGINT`. Such a page can never hold rows.
    pub fn checked(page: usize, per_page: usize) -> Option<Self> {
        let offset = (page.max(1) - 1).checked_mul(per_page)?;
        i64::try_from(offset).ok()?;
        Some(Self { offset, limit: per_page })
    }

    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        items.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub num_pages: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> Page<T> {
    /// Returns `None` when `page` lies past the last page. Page 1 of an empty
    /// result set is always valid.
    pub fn new(items: Vec<T>, total: usize, page: usize, per_page: usize) -> Option<Self> {
        let page = page.max(1);
        let num_pages = total.div_ceil(per_page.max(1)).max(1);
        if page > num_pages {
            return None;
        }
        Some(Self {
            items,
            page,
            per_page,
            total,
            num_pages,
            has_next: page < num_pages,
            has_previous: page > 1,
        })
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            num_pages: self.num_pages,
            has_next: self.has_next,
            has_previous: self.has_previous,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_offsets() {
        assert_eq!(PageWindow::for_page(1, 12), PageWindow { offset: 0, limit: 12 });
        assert_eq!(PageWindow::for_page(3, 20), PageWindow { offset: 40, limit: 20 });
        assert_eq!(PageWindow::for_page(0, 20).offset, 0);
        assert_eq!(PageWindow::for_page(2, 2).apply(vec![1, 2, 3, 4, 5]), vec![3, 4]);
    }

    #[test]
    fn huge_pages_do_not_overflow() {
        assert_eq!(PageWindow::checked(3, 20), Some(PageWindow::for_page(3, 20)));
        assert!(PageWindow::checked(usize::MAX, 12).is_none());
        assert!(PageWindow::checked(1_000_000_000_000_000_000, 20).is_none());
        assert_eq!(PageWindow::for_page(usize::MAX, 12).offset, usize::MAX);
    }

    #[test]
    fn page_bounds() {
        let p = Page::new(vec![1, 2], 14, 2, 12).unwrap();
        assert_eq!(p.num_pages, 2);
        assert!(!p.has_next && p.has_previous);
        assert!(Page::<i32>::new(vec![], 0, 1, 12).is_some());
        assert!(Page::<i32>::new(vec![], 12, 2, 12).is_none());
    }
}
