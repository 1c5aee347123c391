//! Abstractions for offset-based pagination.

/// Default number of items on a [`Page`].
pub const DEFAULT_LIMIT: u32 = 20;

/// Maximum number of items on a [`Page`].
pub const MAX_LIMIT: u32 = 100;

/// Pagination arguments.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Arguments {
    /// One-based number of the requested [`Page`].
    page: u32,

    /// Maximum number of items on the requested [`Page`].
    limit: u32,
}

impl Arguments {
    /// Creates new [`Arguments`] out of the provided optional values.
    ///
    /// Missing values are defaulted to the first [`Page`] of
    /// [`DEFAULT_LIMIT`] items.
    ///
    /// [`None`] is returned if `page` or `limit` is zero, or `limit` exceeds
    /// [`MAX_LIMIT`].
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Option<Self> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        (page > 0 && limit > 0 && limit <= MAX_LIMIT)
            .then_some(Self { page, limit })
    }

    /// Returns the one-based number of the requested [`Page`].
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Returns the maximum number of items on the requested [`Page`].
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Returns the number of items to skip before the requested [`Page`].
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.limit as u64
    }
}

impl Default for Arguments {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// A page of items.
#[derive(Clone, Debug)]
pub struct Page<I> {
    /// Items on this [`Page`].
    pub items: Vec<I>,

    /// [`Arguments`] this [`Page`] was selected with.
    pub arguments: Arguments,

    /// Total number of items across all the pages.
    pub total: u64,
}

impl<I> Page<I> {
    /// Returns the total number of pages.
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(u64::from(self.arguments.limit))
    }

    /// Maps items of this [`Page`] with the provided function.
    #[must_use]
    pub fn map<T>(self, f: impl FnMut(I) -> T) -> Page<T> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            arguments: self.arguments,
            total: self.total,
        }
    }
}

/// Pagination selector.
#[derive(Clone, Debug)]
pub struct Selector<F> {
    /// Pagination [`Arguments`].
    pub arguments: Arguments,

    /// Additional filter being applied to the result.
    pub filter: F,
}

/// Defines pagination types.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_pagination {
    ($node:ty, $filter:ty) => {
        #[doc = "A [`Page`] of [`$node`]s."]
        pub type Page = $crate::pagination::Page<$node>;

        #[doc = "Arguments for selecting a [`Page`]."]
        pub type Arguments = $crate::pagination::Arguments;

        #[doc = "[`Page`] selector."]
        pub type Selector = $crate::pagination::Selector<$filter>;
    };
}

#[cfg(test)]
mod spec {
    use super::{Arguments, Page, DEFAULT_LIMIT};

    #[test]
    fn arguments() {
        let args = Arguments::new(None, None).unwrap();
        assert_eq!(args.page(), 1);
        assert_eq!(args.limit(), DEFAULT_LIMIT);
        assert_eq!(args.offset(), 0);

        let args = Arguments::new(Some(3), Some(10)).unwrap();
        assert_eq!(args.offset(), 20);

        assert!(Arguments::new(Some(0), None).is_none());
        assert!(Arguments::new(None, Some(0)).is_none());
        assert!(Arguments::new(None, Some(1000)).is_none());
    }

    #[test]
    fn total_pages() {
        let page = |total| Page::<()> {
            items: vec![],
            arguments: Arguments::new(None, Some(20)).unwrap(),
            total,
        };

        assert_eq!(page(0).total_pages(), 0);
        assert_eq!(page(20).total_pages(), 1);
        assert_eq!(page(21).total_pages(), 2);
    }
}
