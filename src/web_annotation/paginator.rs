//! Page arithmetic for annotation collections.
//!
//! [`Paginator::page`] takes the 0-based number used in URLs; [`Page::number`]
//! is 1-based. An empty collection still has one (empty) page.

use crate::error::{LibraryError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    pub count: i64,
    pub per_page: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    pub per_page: i64,
}

impl Paginator {
    pub fn new(count: i64, per_page: i64) -> Self {
        Self {
            count: count.max(0),
            per_page: per_page.max(1),
        }
    }

    pub fn num_pages(&self) -> i64 {
        let pages = self.count / self.per_page + i64::from(self.count % self.per_page != 0);
        pages.max(1)
    }

    /// The page at 0-based `zero_page`, or `PageNotFound` outside
    /// `0..num_pages`.
    pub fn page(&self, zero_page: i64) -> Result<Page> {
        if !(0..self.num_pages()).contains(&zero_page) {
            return Err(LibraryError::PageNotFound(zero_page));
        }
        Ok(Page {
            number: zero_page + 1,
            num_pages: self.num_pages(),
            count: self.count,
            per_page: self.per_page,
        })
    }
}

impl Page {
    /// Offset of the first record on this page.
    pub fn offset(&self) -> i64 {
        (self.number - 1) * self.per_page
    }

    /// 1-based index of the first record; 0 for an empty collection.
    pub fn start_index(&self) -> i64 {
        if self.count == 0 {
            0
        } else {
            self.offset() + 1
        }
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn previous_number(&self) -> Option<i64> {
        self.has_previous().then(|| self.number - 1)
    }

    pub fn next_number(&self) -> Option<i64> {
        self.has_next().then(|| self.number + 1)
    }
}

/// 1-based index to the 0-based form used in URLs and `startIndex`.
pub fn as_zero_based(n: i64) -> i64 {
    (n - 1).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twenty_five_items_make_three_pages() {
        let paginator = Paginator::new(25, 10);
        assert_eq!(paginator.num_pages(), 3);

        let first = paginator.page(0).unwrap();
        assert!(!first.has_previous());
        assert!(first.has_next());
        assert_eq!(as_zero_based(first.start_index()), 0);

        let middle = paginator.page(1).unwrap();
        assert_eq!(middle.previous_number(), Some(1));
        assert_eq!(middle.next_number(), Some(3));
        assert_eq!(as_zero_based(middle.start_index()), 10);

        let last = paginator.page(2).unwrap();
        assert!(last.has_previous());
        assert!(!last.has_next());
        assert_eq!(last.offset(), 20);
    }

    #[test]
    fn test_out_of_range_pages() {
        let paginator = Paginator::new(25, 10);
        assert!(matches!(paginator.page(-1), Err(LibraryError::PageNotFound(-1))));
        assert!(matches!(paginator.page(3), Err(LibraryError::PageNotFound(3))));
        assert!(matches!(
            paginator.page(i64::MAX),
            Err(LibraryError::PageNotFound(i64::MAX))
        ));
        assert!(matches!(
            paginator.page(i64::MIN),
            Err(LibraryError::PageNotFound(i64::MIN))
        ));
    }

    #[test]
    fn test_empty_collection_has_one_page() {
        let paginator = Paginator::new(0, 10);
        assert_eq!(paginator.num_pages(), 1);
        let page = paginator.page(0).unwrap();
        assert_eq!(page.start_index(), 0);
        assert_eq!(as_zero_based(page.start_index()), 0);
        assert!(!page.has_next());
    }

    #[test]
    fn test_exact_multiple() {
        assert_eq!(Paginator::new(20, 10).num_pages(), 2);
        assert_eq!(Paginator::new(21, 10).num_pages(), 3);
        assert_eq!(Paginator::new(1, 10).num_pages(), 1);
        assert_eq!(Paginator::new(i64::MAX, 10).num_pages(), i64::MAX / 10 + 1);
    }
}
