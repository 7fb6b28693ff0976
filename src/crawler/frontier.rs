use crate::url::dedup_key;
use std::collections::{HashSet, VecDeque};
use url::Url;

/// Working set of a single crawl
///
/// Holds the FIFO queue of discovered-but-unvisited URLs and the set of dedup
/// keys already queued or visited. A URL enters the queue at most once.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<Url>,
    seen: HashSet<String>,
}

impl Frontier {
    /// Creates a frontier seeded with the start URL
    pub fn new(start: Url) -> Self {
        let mut frontier = Self::default();
        frontier.offer(start);
        frontier
    }

    /// Enqueues `url` unless it was queued or visited before
    ///
    /// Returns true if the URL was enqueued.
    pub fn offer(&mut self, url: Url) -> bool {
        if self.seen.insert(dedup_key(&url)) {
            self.queue.push_back(url);
            true
        } else {
            false
        }
    }

    /// Marks `url` as visited, pulling it from the queue if it is waiting there
    ///
    /// Used for redirect targets, which count as visited once the redirect
    /// has been followed.
    pub fn mark_visited(&mut self, url: &Url) {
        let key = dedup_key(url);
        if !self.seen.insert(key.clone()) {
            self.queue.retain(|queued| dedup_key(queued) != key);
        }
    }

    /// Pops up to `max` URLs in FIFO order
    pub fn pop_batch(&mut self, max: usize) -> Vec<Url> {
        let take = max.min(self.queue.len());
        self.queue.drain(..take).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Consumes the frontier, returning the URLs that were never visited
    pub fn into_remaining(self) -> Vec<Url> {
        self.queue.into_iter().collect()
    }
}
