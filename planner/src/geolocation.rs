use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use shared::LocationFix;

use crate::{
    error::LocationError,
    inflight::{self, Flight, Ticket},
    services::PositionSource,
};

type Acquisition = Result<LocationFix, LocationError>;

/// Bounded, single-flight access to the platform location API.
///
/// Callers arriving while a request is running get that request's answer; no
/// second platform request is issued and nothing is queued behind it. There
/// are no automatic retries.
pub struct GeoLocationProvider {
    source: Arc<dyn PositionSource>,
    timeout: Duration,
    in_flight: Mutex<Option<Ticket<Acquisition>>>,
}

impl GeoLocationProvider {
    pub fn new(source: Arc<dyn PositionSource>, timeout: Duration) -> Self {
        Self {
            source,
            timeout,
            in_flight: Mutex::new(None),
        }
    }

    pub async fn acquire(&self) -> Acquisition {
        let flight = loop {
            match self.join_or_lead() {
                Ok(flight) => break flight,
                Err(ticket) => {
                    tracing::debug!("location request already in flight, waiting for it");
                    if let Some(result) = ticket.wait().await {
                        return result;
                    }
                    tracing::debug!("location request was abandoned, taking it over");
                }
            }
        };

        let result = match tokio::time::timeout(self.timeout, self.source.current_position()).await
        {
            Ok(result) => result,
            Err(_) => Err(LocationError::Timeout),
        };
        match &result {
            Ok(fix) => tracing::info!(
                "location fix at {:.5}, {:.5}",
                fix.coordinate.lat,
                fix.coordinate.lon
            ),
            Err(err) => tracing::warn!("location unavailable: {err}"),
        }

        self.slot().take();
        flight.land(result.clone());
        result
    }

    fn join_or_lead(&self) -> Result<Flight<Acquisition>, Ticket<Acquisition>> {
        let mut slot = self.slot();
        let joinable = slot
            .as_ref()
            .filter(|ticket| !ticket.is_abandoned())
            .cloned();
        match joinable {
            Some(ticket) => Err(ticket),
            None => {
                let (flight, ticket) = inflight::flight();
                *slot = Some(ticket);
                Ok(flight)
            }
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<Ticket<Acquisition>>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
