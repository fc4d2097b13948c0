use serde::Serialize;
use shared::{CameraView, LocationFix, MapLayer, Marker, QueryStatus, RouteBanner, RouteResult};

use crate::error::LocationError;

/// Snapshot published to the presentation layer after every applied change.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MapState {
    pub markers: Vec<Marker>,
    pub location: Option<LocationFix>,
    pub location_error: Option<LocationError>,
    /// True until the first location attempt of the session has finished.
    pub loading: bool,
    pub route: Option<RouteResult>,
    pub route_status: QueryStatus,
    pub route_error: Option<RouteBanner>,
    pub camera: CameraView,
    pub layer: MapLayer,
}

impl MapState {
    /// The location fix, unless the user hid it.
    pub fn visible_location(&self) -> Option<&LocationFix> {
        self.location.as_ref().filter(|fix| !fix.hidden)
    }
}

#[cfg(test)]
mod tests {
    use shared::Coordinate;

    use super::*;

    #[test]
    fn test_hidden_fix_is_retained_but_not_visible() {
        let mut fix = LocationFix::at(Coordinate::new(56.95, 24.1));
        fix.hidden = true;
        let state = MapState {
            location: Some(fix),
            ..MapState::default()
        };
        assert!(state.location.is_some());
        assert!(state.visible_location().is_none());
    }

    #[test]
    fn test_serializes_for_the_presentation_layer() {
        let state = MapState {
            location_error: Some(LocationError::Timeout),
            ..MapState::default()
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["route_status"], "idle");
        assert_eq!(json["layer"], "street");
        assert_eq!(json["location_error"]["kind"], "timeout");
        assert_eq!(json["camera"]["zoom"], 13.0);
    }
}
