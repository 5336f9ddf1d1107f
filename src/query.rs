//! Read-side queue operations backing the API surface.
//!
//! Counts and listings are computed from the store at call time, never
//! cached. Clearing completed rows is the one mutation exposed here and it
//! ends with a counts broadcast, like every other state change.

use crate::broadcast::Broadcaster;
use crate::error::Result;
use crate::queue::job::Job;
use crate::store::{JobStore, QueueCounts};

/// Current per-state job counts
pub fn get_counts(store: &JobStore) -> Result<QueueCounts> {
    store.counts()
}

/// All jobs in insertion order
pub fn list_jobs(store: &JobStore) -> Result<Vec<Job>> {
    store.list()
}

/// Delete every completed job, broadcast the new counts, and return how
/// many rows were removed
pub fn clear_completed(store: &JobStore, broadcaster: &Broadcaster) -> Result<usize> {
    let cleared = store.clear_completed()?;
    broadcaster.publish_counts(store.counts()?);
    Ok(cleared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::Event;
    use std::path::Path;

    #[test]
    fn clearing_broadcasts_updated_counts() {
        let store = JobStore::in_memory().unwrap();
        let id = store
            .insert(Path::new("/in/a.jpg"), Path::new("/out/a.jpg"))
            .unwrap()
            .unwrap();
        store.claim(id).unwrap();
        store.complete(id, Path::new("/out/a.webp")).unwrap();

        let broadcaster = Broadcaster::new();
        let events = broadcaster.subscribe();

        assert_eq!(clear_completed(&store, &broadcaster).unwrap(), 1);
        assert_eq!(clear_completed(&store, &broadcaster).unwrap(), 0);

        let received: Vec<Event> = events.try_iter().collect();
        assert_eq!(received.len(), 2);
        assert!(matches!(received[0], Event::QueueCounts(c) if c.total == 0));
    }

    #[test]
    fn listings_reflect_the_store() {
        let store = JobStore::in_memory().unwrap();
        store
            .insert(Path::new("/in/a.jpg"), Path::new("/out/a.jpg"))
            .unwrap();
        store
            .insert(Path::new("/in/b.mp4"), Path::new("/out/b.mp4"))
            .unwrap();

        let jobs = list_jobs(&store).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(get_counts(&store).unwrap().total, 2);
    }
}
