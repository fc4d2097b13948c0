use std::{
    collections::HashMap,
    num::NonZeroUsize,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use lru::LruCache;
use shared::Coordinate;

use crate::{
    error::LookupError,
    inflight::{self, Flight, Ticket},
    services::Geocoder,
};

type Lookup = Result<String, LookupError>;

/// Memoized reverse geocoding keyed by [`Coordinate::cache_key`].
///
/// Concurrent lookups of the same key share one request to the geocoder.
/// Failures are not cached, so the next resolve tries again.
pub struct PlaceNameCache {
    geocoder: Arc<dyn Geocoder>,
    inner: Mutex<Inner>,
}

struct Inner {
    names: LruCache<String, String>,
    pending: HashMap<String, Ticket<Lookup>>,
    // Bumped by `clear` so lookups started before it cannot refill the cache.
    epoch: u64,
}

enum Slot {
    Cached(String),
    Join(Ticket<Lookup>),
    Lead(Flight<Lookup>, u64),
}

impl PlaceNameCache {
    pub fn new(geocoder: Arc<dyn Geocoder>, capacity: NonZeroUsize) -> Self {
        Self {
            geocoder,
            inner: Mutex::new(Inner {
                names: LruCache::new(capacity),
                pending: HashMap::new(),
                epoch: 0,
            }),
        }
    }

    /// Place name for `coordinate`, or its formatted coordinates when the
    /// lookup fails.
    pub async fn resolve(&self, coordinate: Coordinate) -> String {
        match self.lookup(coordinate).await {
            Ok(name) => name,
            Err(err) => {
                tracing::warn!("{err}; showing raw coordinates");
                coordinate.display()
            }
        }
    }

    pub async fn lookup(&self, coordinate: Coordinate) -> Result<String, LookupError> {
        let key = coordinate.cache_key();

        loop {
            match self.slot(&key) {
                Slot::Cached(name) => return Ok(name),
                Slot::Join(ticket) => {
                    tracing::debug!("joining in-flight place name lookup for {key}");
                    if let Some(result) = ticket.wait().await {
                        return result;
                    }
                    // The leading caller was dropped; pick a slot again so
                    // exactly one waiter takes the lookup over.
                    tracing::debug!("place name lookup for {key} was abandoned");
                }
                Slot::Lead(flight, epoch) => {
                    let result = self.fetch(&key, coordinate).await;
                    {
                        let mut inner = self.lock();
                        if inner.epoch == epoch {
                            inner.pending.remove(&key);
                            if let Ok(name) = &result {
                                inner.names.put(key.clone(), name.clone());
                            }
                        }
                    }
                    flight.land(result.clone());
                    return result;
                }
            }
        }
    }

    pub fn cached(&self, coordinate: Coordinate) -> Option<String> {
        self.lock().names.peek(&coordinate.cache_key()).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.names.clear();
        inner.pending.clear();
        inner.epoch += 1;
    }

    fn slot(&self, key: &str) -> Slot {
        let mut inner = self.lock();
        if let Some(name) = inner.names.get(key) {
            return Slot::Cached(name.clone());
        }
        let joinable = inner
            .pending
            .get(key)
            .filter(|ticket| !ticket.is_abandoned())
            .cloned();
        match joinable {
            Some(ticket) => Slot::Join(ticket),
            None => {
                let (flight, ticket) = inflight::flight();
                inner.pending.insert(key.to_string(), ticket);
                Slot::Lead(flight, inner.epoch)
            }
        }
    }

    async fn fetch(&self, key: &str, coordinate: Coordinate) -> Lookup {
        self.geocoder
            .place_name(coordinate)
            .await
            .map_err(|err| LookupError::new(key, &err))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use shared::PlaceCandidate;

    use super::*;
    use crate::{error::ServiceError, services::BoxFuture};

    struct SlowGeocoder {
        calls: AtomicUsize,
        fail: bool,
    }

    impl SlowGeocoder {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                fail,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Geocoder for SlowGeocoder {
        fn search_locations(
            &self,
            _query: String,
            _limit: usize,
        ) -> BoxFuture<'_, Result<Vec<PlaceCandidate>, ServiceError>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn place_name(
            &self,
            coordinate: Coordinate,
        ) -> BoxFuture<'_, Result<String, ServiceError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail;
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                if fail {
                    Err(ServiceError::EmptyResponse("opencage"))
                } else {
                    Ok(format!("Place near {:.2}", coordinate.lat))
                }
            })
        }
    }

    fn cache(geocoder: Arc<SlowGeocoder>) -> PlaceNameCache {
        PlaceNameCache::new(geocoder, NonZeroUsize::new(8).unwrap())
    }

    const RIGA: Coordinate = Coordinate::new(56.95, 24.10);

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_resolves_share_one_lookup() {
        let geocoder = SlowGeocoder::new(false);
        let cache = cache(geocoder.clone());

        let (first, second) = tokio::join!(cache.resolve(RIGA), cache.resolve(RIGA));

        assert_eq!(first, "Place near 56.95");
        assert_eq!(first, second);
        assert_eq!(geocoder.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_memoized_after_first_lookup() {
        let geocoder = SlowGeocoder::new(false);
        let cache = cache(geocoder.clone());

        cache.resolve(RIGA).await;
        cache.resolve(RIGA).await;
        assert_eq!(geocoder.calls(), 1);
        assert_eq!(cache.cached(RIGA).as_deref(), Some("Place near 56.95"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_degrades_to_coordinates_and_is_not_cached() {
        let geocoder = SlowGeocoder::new(true);
        let cache = cache(geocoder.clone());

        assert_eq!(cache.resolve(RIGA).await, "56.95000, 24.10000");
        assert!(cache.lookup(RIGA).await.is_err());
        assert_eq!(geocoder.calls(), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_forgets_names_and_late_results() {
        let geocoder = SlowGeocoder::new(false);
        let cache = Arc::new(cache(geocoder.clone()));

        let in_flight = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.resolve(RIGA).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        cache.clear();

        assert_eq!(in_flight.await.unwrap(), "Place near 56.95");
        assert!(cache.is_empty());

        cache.resolve(RIGA).await;
        assert_eq!(geocoder.calls(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_lookup_is_taken_over() {
        let geocoder = SlowGeocoder::new(false);
        let cache = cache(geocoder.clone());

        let abandoned = tokio::time::timeout(Duration::from_millis(10), cache.lookup(RIGA)).await;
        assert!(abandoned.is_err());

        assert_eq!(cache.resolve(RIGA).await, "Place near 56.95");
        assert_eq!(geocoder.calls(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_of_a_cancelled_lookup_share_one_retry() {
        let geocoder = SlowGeocoder::new(false);
        let cache = Arc::new(cache(geocoder.clone()));

        let spawn_lookup = |cache: &Arc<PlaceNameCache>| {
            let cache = Arc::clone(cache);
            tokio::spawn(async move { cache.lookup(RIGA).await })
        };
        let leader = spawn_lookup(&cache);
        tokio::time::sleep(Duration::from_millis(10)).await;
        let first = spawn_lookup(&cache);
        let second = spawn_lookup(&cache);
        tokio::time::sleep(Duration::from_millis(10)).await;

        leader.abort();
        assert!(leader.await.unwrap_err().is_cancelled());

        assert_eq!(first.await.unwrap().unwrap(), "Place near 56.95");
        assert_eq!(second.await.unwrap().unwrap(), "Place near 56.95");
        assert_eq!(geocoder.calls(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.cached(RIGA).as_deref(), Some("Place near 56.95"));
    }
}
