//! Crawl frontier and visited-set
//!
//! [`CrawlState`] is owned by a single crawl and is the only place URLs are
//! enqueued. A URL is inserted into the visited-set at enqueue time, so the
//! same normalized URL can never be queued twice, and the visited-set never
//! grows past `max_pages`.

use super::PageAuditResult;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use url::Url;

/// A URL waiting in the frontier
#[derive(Debug, Clone)]
pub struct QueuedUrl {
    pub url: Url,

    /// Link distance from the seed (seed is 0)
    pub depth: u32,

    /// Enqueue order, used to keep the traversal breadth-first and stable
    seq: u64,
}

impl QueuedUrl {
    /// A lone URL at depth 0, outside any frontier
    pub(crate) fn seed(url: Url) -> Self {
        Self { url, depth: 0, seq: 0 }
    }
}

// BinaryHeap is a max-heap: shallower URLs, then earlier ones, pop first
impl Ord for QueuedUrl {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .depth
            .cmp(&self.depth)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedUrl {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for QueuedUrl {
    fn eq(&self, other: &Self) -> bool {
        self.depth == other.depth && self.seq == other.seq
    }
}

impl Eq for QueuedUrl {}

/// Why a URL was not enqueued
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    AlreadyVisited,
    DepthExceeded,
    PageLimitReached,
}

/// Mutable state of one crawl
#[derive(Debug)]
pub struct CrawlState {
    frontier: BinaryHeap<QueuedUrl>,
    visited: HashSet<String>,
    results: Vec<PageAuditResult>,
    max_pages: usize,
    max_depth: u32,
    next_seq: u64,
}

impl CrawlState {
    /// Creates the state with `seed` queued at depth 0
    ///
    /// # Arguments
    ///
    /// * `seed` - The normalized seed URL
    /// * `max_pages` - Upper bound on visited URLs
    /// * `max_depth` - Deepest link distance that may be queued
    pub fn new(seed: Url, max_pages: usize, max_depth: u32) -> Self {
        let mut state = Self {
            frontier: BinaryHeap::new(),
            visited: HashSet::new(),
            results: Vec::new(),
            max_pages,
            max_depth,
            next_seq: 0,
        };
        state.enqueue(seed, 0);
        state
    }

    /// Queues `url` at `depth` unless it was seen before or a bound is hit
    ///
    /// The visited check and insert happen together, so this is the single
    /// point that guarantees no URL is crawled twice.
    pub fn enqueue(&mut self, url: Url, depth: u32) -> EnqueueOutcome {
        if depth > self.max_depth {
            return EnqueueOutcome::DepthExceeded;
        }
        if self.visited.contains(url.as_str()) {
            return EnqueueOutcome::AlreadyVisited;
        }
        if self.visited.len() >= self.max_pages {
            return EnqueueOutcome::PageLimitReached;
        }

        self.visited.insert(url.as_str().to_string());
        self.frontier.push(QueuedUrl {
            url,
            depth,
            seq: self.next_seq,
        });
        self.next_seq += 1;
        EnqueueOutcome::Queued
    }

    /// Takes the next URL to audit
    pub fn pop(&mut self) -> Option<QueuedUrl> {
        self.frontier.pop()
    }

    /// Appends a finished page, in completion order
    pub fn record(&mut self, result: PageAuditResult) {
        self.results.push(result);
    }

    pub fn completed(&self) -> usize {
        self.results.len()
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn frontier_size(&self) -> usize {
        self.frontier.len()
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(url.as_str())
    }

    /// Consumes the state, yielding the finished pages
    pub fn into_results(self) -> Vec<PageAuditResult> {
        self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://example.com{}", path)).unwrap()
    }

    #[test]
    fn test_seed_is_queued() {
        let mut state = CrawlState::new(url("/"), 10, 3);
        assert_eq!(state.visited_count(), 1);
        let seed = state.pop().unwrap();
        assert_eq!(seed.depth, 0);
        assert!(state.pop().is_none());
    }

    #[test]
    fn test_no_url_enqueued_twice() {
        let mut state = CrawlState::new(url("/"), 10, 3);
        for _ in 0..10 {
            state.enqueue(url("/"), 1);
        }
        assert_eq!(state.visited_count(), 1);
        assert_eq!(state.frontier_size(), 1);
        assert_eq!(state.enqueue(url("/"), 1), EnqueueOutcome::AlreadyVisited);
    }

    #[test]
    fn test_depth_bound() {
        let mut state = CrawlState::new(url("/"), 10, 1);
        assert_eq!(state.enqueue(url("/a"), 1), EnqueueOutcome::Queued);
        assert_eq!(state.enqueue(url("/b"), 2), EnqueueOutcome::DepthExceeded);
        assert!(!state.is_visited(&url("/b")));
    }

    #[test]
    fn test_page_limit_bounds_visited() {
        let mut state = CrawlState::new(url("/"), 3, 5);
        for i in 0..10 {
            state.enqueue(url(&format!("/p{}", i)), 1);
        }
        assert_eq!(state.visited_count(), 3);
        assert_eq!(
            state.enqueue(url("/late"), 1),
            EnqueueOutcome::PageLimitReached
        );
    }

    #[test]
    fn test_breadth_first_order() {
        let mut state = CrawlState::new(url("/"), 10, 3);
        state.pop();
        state.enqueue(url("/deep"), 2);
        state.enqueue(url("/a"), 1);
        state.enqueue(url("/b"), 1);

        let order: Vec<String> = std::iter::from_fn(|| state.pop())
            .map(|q| q.url.path().to_string())
            .collect();
        assert_eq!(order, vec!["/a", "/b", "/deep"]);
    }
}
