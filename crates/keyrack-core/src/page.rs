//! Offset pagination over already-filtered listings.

/// One page of results. `total` counts the whole filtered set, not the page.
#[derive(Clone, Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
}

impl<T> Page<T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Slices a full result set into 1-based pages. Callers apply authorization
/// filtering before slicing so page boundaries are stable for a given
/// identity.
#[derive(Clone, Copy, Debug)]
pub struct Paginator {
    page_size: usize,
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size: page_size.max(1),
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Take page `page` (1-based) of `items`. Pages past the end, and page 0,
    /// come back empty rather than erroring.
    pub fn paginate<T>(&self, items: Vec<T>, page: usize) -> Page<T> {
        let total = items.len();
        let sliced = match page.checked_sub(1) {
            Some(zero_based) => items
                .into_iter()
                .skip(zero_based.saturating_mul(self.page_size))
                .take(self.page_size)
                .collect(),
            None => Vec::new(),
        };
        Page {
            items: sliced,
            page,
            page_size: self.page_size,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_one_based_pages() {
        let p = Paginator::new(10);
        let items: Vec<u32> = (1..=25).collect();

        let page = p.paginate(items.clone(), 3);
        assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
        assert_eq!(page.total, 25);

        let first = p.paginate(items, 1);
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.items[0], 1);
    }

    #[test]
    fn out_of_range_page_is_empty() {
        let p = Paginator::new(10);
        let page = p.paginate(vec![1, 2, 3], 4);
        assert!(page.is_empty());
        assert_eq!(page.total, 3);
    }

    #[test]
    fn page_zero_is_empty() {
        let p = Paginator::new(10);
        assert!(p.paginate(vec![1, 2, 3], 0).is_empty());
    }

    #[test]
    fn zero_page_size_is_clamped() {
        let p = Paginator::new(0);
        assert_eq!(p.page_size(), 1);
        assert_eq!(p.paginate(vec![1, 2], 2).items, vec![2]);
    }
}
