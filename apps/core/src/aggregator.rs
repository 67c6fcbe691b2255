use std::cmp::Ordering;

use crate::model::SearchResult;

/// Most recently accessed first; ties broken by path so the order is deterministic.
pub fn recency_order(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.last_accessed_or_epoch()
        .cmp(&a.last_accessed_or_epoch())
        .then_with(|| a.path.cmp(&b.path))
}

/// Case-insensitive name order used for directory listings.
pub fn listing_order(a: &SearchResult, b: &SearchResult) -> Ordering {
    a.display_name
        .to_lowercase()
        .cmp(&b.display_name.to_lowercase())
        .then_with(|| a.path.cmp(&b.path))
}

/// Display list for incremental search results, unique by path.
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    items: Vec<SearchResult>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fold(&mut self, result: SearchResult) {
        match self.items.iter_mut().find(|item| item.path == result.path) {
            Some(existing) => *existing = result,
            None => self.items.push(result),
        }
        self.items.sort_by(recency_order);
    }

    pub fn fold_all<I>(&mut self, results: I)
    where
        I: IntoIterator<Item = SearchResult>,
    {
        for result in results {
            self.fold(result);
        }
    }

    /// Replaces the list with a directory listing, ordered by name instead of recency.
    pub fn replace_with_listing(&mut self, mut listing: Vec<SearchResult>) {
        listing.sort_by(listing_order);
        listing.dedup_by(|a, b| a.path == b.path);
        self.items = listing;
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn items(&self) -> &[SearchResult] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find(&self, path: &std::path::Path) -> Option<&SearchResult> {
        self.items.iter().find(|item| item.path == path)
    }
}

#[cfg(test)]
mod tests {
    use super::ResultAggregator;
    use crate::model::SearchResult;

    #[test]
    fn later_result_replaces_earlier_in_place() {
        let mut agg = ResultAggregator::new();
        agg.fold(SearchResult::folder("/a").with_last_accessed(10));
        agg.fold(SearchResult::folder("/b").with_last_accessed(20));
        agg.fold(SearchResult::folder("/a").with_last_accessed(30));

        assert_eq!(agg.len(), 2);
        assert_eq!(agg.items()[0].path, std::path::Path::new("/a"));
        assert_eq!(agg.items()[0].last_accessed_epoch_secs, Some(30));
    }

    #[test]
    fn unset_access_time_sorts_last_then_by_path() {
        let mut agg = ResultAggregator::new();
        agg.fold(SearchResult::folder("/z"));
        agg.fold(SearchResult::folder("/m"));
        agg.fold(SearchResult::folder("/q").with_last_accessed(1));

        let names: Vec<_> = agg.items().iter().map(|i| i.display_name.as_str()).collect();
        assert_eq!(names, vec!["q", "m", "z"]);
    }

    #[test]
    fn listing_ignores_recency_and_case() {
        let mut agg = ResultAggregator::new();
        agg.replace_with_listing(vec![
            SearchResult::folder("/p/beta").with_last_accessed(100),
            SearchResult::folder("/p/Alpha"),
            SearchResult::folder("/p/gamma").with_last_accessed(5),
        ]);

        let names: Vec<_> = agg.items().iter().map(|i| i.display_name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "beta", "gamma"]);
    }
}
