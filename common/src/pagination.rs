//! Abstractions for offset-based pagination.

/// Number of items on a [`Page`] when not specified explicitly.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Maximum allowed number of items on a [`Page`].
pub const MAX_PAGE_SIZE: u32 = 100;

/// Pagination arguments.
///
/// Pages are numbered from `1`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Arguments {
    /// Number of the requested page.
    page: u32,

    /// Number of items on a page.
    page_size: u32,
}

impl Arguments {
    /// Creates new [`Arguments`], falling back to the first page and the
    /// [`DEFAULT_PAGE_SIZE`] for the omitted values.
    ///
    /// [`None`] is returned if the `page` is zero or the `page_size` is out of
    /// `1..=`[`MAX_PAGE_SIZE`] range.
    #[must_use]
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Option<Self> {
        let page = page.unwrap_or(1);
        let page_size = page_size.unwrap_or(DEFAULT_PAGE_SIZE);

        (page >= 1 && (1..=MAX_PAGE_SIZE).contains(&page_size))
            .then_some(Self { page, page_size })
    }

    /// Returns the number of the requested page.
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Returns the number of items to skip before the requested page.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.page_size)
    }

    /// Returns the maximum number of items on the requested page.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.page_size
    }
}

impl Default for Arguments {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A page of items along with the total number of matching items.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Page<I> {
    /// Items on this [`Page`].
    pub items: Vec<I>,

    /// Total number of items matching the filter, across all pages.
    pub total_count: u64,
}

impl<I> Page<I> {
    /// Creates a new [`Page`] out of the already sorted `items`, taking the
    /// part requested by the provided [`Arguments`].
    #[must_use]
    pub fn slice(args: &Arguments, items: impl IntoIterator<Item = I>) -> Self {
        let offset = usize::try_from(args.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(args.limit()).unwrap_or(usize::MAX);

        let mut total_count = 0;
        let mut on_page = Vec::new();
        for (n, item) in items.into_iter().enumerate() {
            total_count += 1;
            if n >= offset && n - offset < limit {
                on_page.push(item);
            }
        }
        Self {
            items: on_page,
            total_count,
        }
    }
}

/// Pagination selector.
#[derive(Clone, Copy, Debug)]
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
        #[doc = "A [`Page`] of nodes."]
        pub type Page = $crate::pagination::Page<$node>;

        #[doc = "Arguments for selecting a [`Page`]."]
        pub type Arguments = $crate::pagination::Arguments;

        #[doc = "[`Page`] selector."]
        pub type Selector = $crate::pagination::Selector<$filter>;
    };
}

#[cfg(test)]
mod tests {
    use super::{Arguments, Page, DEFAULT_PAGE_SIZE};

    #[test]
    fn defaults_to_first_page() {
        let args = Arguments::new(None, None).unwrap();
        assert_eq!(args, Arguments::default());
        assert_eq!(args.offset(), 0);
        assert_eq!(args.limit(), DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(Arguments::new(Some(0), None).is_none());
        assert!(Arguments::new(None, Some(0)).is_none());
        assert!(Arguments::new(None, Some(101)).is_none());
        assert!(Arguments::new(Some(3), Some(100)).is_some());
    }

    #[test]
    fn slices_requested_page() {
        let args = Arguments::new(Some(2), Some(3)).unwrap();
        assert_eq!(args.offset(), 3);

        let page = Page::slice(&args, 1..=8);
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.total_count, 8);

        let args = Arguments::new(Some(3), Some(3)).unwrap();
        let last = Page::slice(&args, 1..=8);
        assert_eq!(last.items, vec![7, 8]);

        let beyond =
            Page::slice(&Arguments::new(Some(4), Some(3)).unwrap(), 1..=8);
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total_count, 8);
    }
}
