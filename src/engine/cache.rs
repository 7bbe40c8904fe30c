//! Time-limited, size-bounded memoization of coverage reports.
//!
//! One mutex guards the whole map and is held only for a lookup or an insert,
//! never while an analysis runs. Expired entries are dropped on lookup; when
//! the entry bound is exceeded the oldest insertion is evicted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::report::CoverageReport;
use crate::algorithms::matching::MatchAlgorithm;

/// Cache key: radii rounded to whole meters, plus the algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub radius_m: i64,
    pub cluster_radius_m: i64,
    pub algorithm: MatchAlgorithm,
}

impl CacheKey {
    pub fn new(radius_meters: f64, cluster_radius_meters: f64, algorithm: MatchAlgorithm) -> Self {
        Self {
            radius_m: radius_meters.round() as i64,
            cluster_radius_m: cluster_radius_meters.round() as i64,
            algorithm,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    report: Arc<CoverageReport>,
    created_at: Instant,
}

/// Thread-safe report cache.
#[derive(Debug)]
pub struct ResultCache {
    ttl: Duration,
    max_entries: usize,
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
}

impl ResultCache {
    /// `max_entries` is clamped to at least 1.
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached report for `key` if it is younger than the TTL.
    pub fn get(&self, key: &CacheKey) -> Option<Arc<CoverageReport>> {
        self.get_at(key, Instant::now())
    }

    /// Store `report` under `key`, replacing any previous entry.
    pub fn insert(&self, key: CacheKey, report: Arc<CoverageReport>) {
        self.insert_at(key, report, Instant::now());
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        if !entries.is_empty() {
            log::debug!("Result cache cleared ({} entries)", entries.len());
        }
        entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn get_at(&self, key: &CacheKey, now: Instant) -> Option<Arc<CoverageReport>> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            None => return None,
            Some(entry) => now.saturating_duration_since(entry.created_at) >= self.ttl,
        };
        if expired {
            entries.remove(key);
            log::debug!("Result cache entry {:?} expired", key);
            return None;
        }
        entries.get(key).map(|entry| Arc::clone(&entry.report))
    }

    fn insert_at(&self, key: CacheKey, report: Arc<CoverageReport>, now: Instant) {
        let mut entries = self.entries.lock();
        entries.insert(
            key,
            CacheEntry {
                report,
                created_at: now,
            },
        );

        while entries.len() > self.max_entries {
            let oldest = entries
                .iter()
                .min_by(|(ka, a), (kb, b)| a.created_at.cmp(&b.created_at).then(ka.cmp(kb)))
                .map(|(k, _)| *k);
            match oldest {
                Some(k) => {
                    entries.remove(&k);
                    log::debug!("Result cache evicted {:?}", k);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::report::CoverageStats;
    use std::collections::BTreeMap;

    fn empty_report(algorithm: MatchAlgorithm) -> Arc<CoverageReport> {
        Arc::new(CoverageReport {
            matched: Vec::new(),
            undetected: Vec::new(),
            new_findings: Vec::new(),
            unclaimed: Vec::new(),
            stats: CoverageStats {
                total_references: 0,
                total_detections: 0,
                total_candidates: 0,
                matched: 0,
                undetected: 0,
                new_findings: 0,
                unclaimed: 0,
                coverage_percent: 0.0,
                processing_time_ms: 0.0,
                algorithm,
                by_category: BTreeMap::new(),
            },
        })
    }

    fn key(radius: f64) -> CacheKey {
        CacheKey::new(radius, 30.0, MatchAlgorithm::GreedyNearest)
    }

    #[test]
    fn test_key_rounds_radii() {
        assert_eq!(key(49.6), key(50.4));
        assert_ne!(key(50.0), key(51.0));
        assert_ne!(
            CacheKey::new(50.0, 30.0, MatchAlgorithm::GreedyNearest),
            CacheKey::new(50.0, 30.0, MatchAlgorithm::MutualNearest)
        );
    }

    #[test]
    fn test_get_returns_same_report() {
        let cache = ResultCache::new(Duration::from_secs(60), 4);
        let report = empty_report(MatchAlgorithm::GreedyNearest);
        cache.insert(key(50.0), Arc::clone(&report));

        let hit = cache.get(&key(50.0)).unwrap();
        assert!(Arc::ptr_eq(&hit, &report));
        assert!(cache.get(&key(20.0)).is_none());
    }

    #[test]
    fn test_expired_entry_is_evicted_on_lookup() {
        let cache = ResultCache::new(Duration::from_secs(10), 4);
        let t0 = Instant::now();
        cache.insert_at(key(50.0), empty_report(MatchAlgorithm::GreedyNearest), t0);

        assert!(cache.get_at(&key(50.0), t0 + Duration::from_secs(9)).is_some());
        assert!(cache.get_at(&key(50.0), t0 + Duration::from_secs(10)).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_oldest_evicted_over_capacity() {
        let cache = ResultCache::new(Duration::from_secs(60), 2);
        let t0 = Instant::now();
        let report = empty_report(MatchAlgorithm::GreedyNearest);
        cache.insert_at(key(10.0), Arc::clone(&report), t0);
        cache.insert_at(key(20.0), Arc::clone(&report), t0 + Duration::from_secs(1));
        cache.insert_at(key(30.0), Arc::clone(&report), t0 + Duration::from_secs(2));

        let now = t0 + Duration::from_secs(3);
        assert_eq!(cache.len(), 2);
        assert!(cache.get_at(&key(10.0), now).is_none());
        assert!(cache.get_at(&key(20.0), now).is_some());
        assert!(cache.get_at(&key(30.0), now).is_some());
    }

    #[test]
    fn test_eviction_by_insertion_not_access() {
        let cache = ResultCache::new(Duration::from_secs(60), 2);
        let t0 = Instant::now();
        let report = empty_report(MatchAlgorithm::GreedyNearest);
        cache.insert_at(key(10.0), Arc::clone(&report), t0);
        cache.insert_at(key(20.0), Arc::clone(&report), t0 + Duration::from_secs(1));
        // Reading the oldest entry does not refresh it
        assert!(cache.get_at(&key(10.0), t0 + Duration::from_secs(2)).is_some());
        cache.insert_at(key(30.0), Arc::clone(&report), t0 + Duration::from_secs(3));

        assert!(cache.get_at(&key(10.0), t0 + Duration::from_secs(4)).is_none());
    }

    #[test]
    fn test_clear() {
        let cache = ResultCache::new(Duration::from_secs(60), 4);
        cache.insert(key(50.0), empty_report(MatchAlgorithm::GreedyNearest));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(ResultCache::new(Duration::from_secs(60), 8));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for j in 0..100 {
                        let k = key(((i * 100 + j) % 12) as f64);
                        cache.insert(k, empty_report(MatchAlgorithm::GreedyNearest));
                        let _ = cache.get(&k);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(cache.len() <= 8);
    }
}
