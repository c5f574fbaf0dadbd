//! Zero-power position replies
//!
//! Both replies are always forwarded; a reply without a usable horizontal fix carries
//! no coordinates.

use contracts::{
    BestAvailablePositionInd, Coordinates, Location, LocationEngine, LocationExtended,
    PosTechMask, WwanPositionInd,
};
use tracing::{debug, warn};

use crate::clock;
use crate::convert;

/// Missing modem UTC falls back to the local wall clock
fn timestamp(utc_ms: Option<u64>) -> u64 {
    utc_ms.unwrap_or_else(clock::now_utc_ms)
}

fn horizontal_fix(
    latitude: Option<f64>,
    longitude: Option<f64>,
    hor_unc: Option<f32>,
    confidence: Option<u8>,
) -> Option<(Coordinates, f32)> {
    let (Some(latitude), Some(longitude), Some(unc)) = (latitude, longitude, hor_unc) else {
        return None;
    };
    let accuracy = confidence.map_or(unc, |c| convert::scale_to_68(unc, c, true));
    Some((
        Coordinates {
            latitude,
            longitude,
        },
        accuracy,
    ))
}

pub(crate) fn wwan_location(ind: &WwanPositionInd) -> Location {
    let mut location = Location {
        timestamp_ms: timestamp(ind.timestamp_utc_ms),
        ..Default::default()
    };
    match horizontal_fix(
        ind.latitude,
        ind.longitude,
        ind.hor_unc_circular,
        ind.hor_circular_confidence,
    ) {
        Some((coordinates, accuracy)) => {
            location.coordinates = Some(coordinates);
            location.accuracy = Some(accuracy);
            location.altitude = ind.altitude_wrt_ellipsoid.map(f64::from);
            location.vertical_accuracy = ind.vert_unc;
        }
        None => warn!(
            lat = ind.latitude.is_some(),
            lon = ind.longitude.is_some(),
            unc = ind.hor_unc_circular.is_some(),
            "WWAN position not valid"
        ),
    }
    location
}

pub(crate) fn best_available_location(
    ind: &BestAvailablePositionInd,
) -> (Location, LocationExtended, PosTechMask) {
    let mut location = Location {
        timestamp_ms: timestamp(ind.timestamp_utc_ms),
        ..Default::default()
    };
    let mut extended = LocationExtended::default();
    let mut tech_mask = PosTechMask::empty();

    if let Some((coordinates, accuracy)) = horizontal_fix(
        ind.latitude,
        ind.longitude,
        ind.hor_unc_circular,
        ind.hor_circular_confidence,
    ) {
        location.coordinates = Some(coordinates);
        location.accuracy = Some(accuracy);
        location.altitude = ind.altitude_wrt_ellipsoid.map(f64::from);
        location.speed = ind.hor_speed;
        location.bearing = ind.heading;
        location.spoof_mask = ind.spoof_report_mask;
        extended.vert_unc = ind.vert_unc;
        extended.speed_unc = ind.hor_speed_unc;
        extended.bearing_unc = ind.heading_unc;
        if let Some(native) = ind.technology_mask {
            tech_mask = convert::tech_mask(native);
        }
    }
    (location, extended, tech_mask)
}

pub(crate) fn decode_wwan_position(engine: &dyn LocationEngine, ind: &WwanPositionInd) {
    debug!(status = ?ind.status, "WWAN position reply");
    engine.report_wwan_zpp_fix(&wwan_location(ind));
}

pub(crate) fn decode_best_available_position(
    engine: &dyn LocationEngine,
    ind: &BestAvailablePositionInd,
) {
    debug!(status = ?ind.status, "Best available position reply");
    let (location, extended, tech_mask) = best_available_location(ind);
    engine.report_zpp_best_available_fix(&location, &extended, tech_mask);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::test_support::adapter;
    use crate::mock::EngineCall;
    use contracts::{AdapterConfig, NativeTechMask, ZppResponse};

    #[test]
    fn test_wwan_fix_scaled_to_68() {
        let ind = WwanPositionInd {
            latitude: Some(37.4),
            longitude: Some(-122.1),
            hor_unc_circular: Some(100.0),
            hor_circular_confidence: Some(68),
            altitude_wrt_ellipsoid: Some(12.5),
            vert_unc: Some(8.0),
            timestamp_utc_ms: Some(1_600_000_000_000),
            ..Default::default()
        };
        let location = wwan_location(&ind);
        assert_eq!(
            location.coordinates,
            Some(Coordinates {
                latitude: 37.4,
                longitude: -122.1
            })
        );
        assert_eq!(location.accuracy, Some(100.0));
        assert_eq!(location.altitude, Some(12.5));
        assert_eq!(location.vertical_accuracy, Some(8.0));
        assert_eq!(location.timestamp_ms, 1_600_000_000_000);

        let scaled = wwan_location(&WwanPositionInd {
            hor_circular_confidence: Some(39),
            ..ind
        });
        assert!(scaled.accuracy.unwrap() > 100.0);
    }

    #[test]
    fn test_wwan_fix_without_uncertainty_has_no_coordinates() {
        let location = wwan_location(&WwanPositionInd {
            latitude: Some(1.0),
            longitude: Some(2.0),
            altitude_wrt_ellipsoid: Some(5.0),
            ..Default::default()
        });
        assert!(location.coordinates.is_none());
        assert!(location.altitude.is_none());
        assert!(location.timestamp_ms > 0);
    }

    #[test]
    fn test_best_available_extended_fields() {
        let ind = BestAvailablePositionInd {
            latitude: Some(10.0),
            longitude: Some(20.0),
            hor_unc_circular: Some(30.0),
            hor_speed: Some(1.5),
            hor_speed_unc: Some(0.5),
            heading: Some(90.0),
            heading_unc: Some(4.0),
            vert_unc: Some(6.0),
            technology_mask: Some(NativeTechMask::SATELLITE),
            spoof_report_mask: Some(0x2),
            timestamp_utc_ms: Some(42),
            ..Default::default()
        };
        let (location, extended, tech) = best_available_location(&ind);
        assert_eq!(location.speed, Some(1.5));
        assert_eq!(location.bearing, Some(90.0));
        assert_eq!(location.spoof_mask, Some(0x2));
        assert_eq!(extended.vert_unc, Some(6.0));
        assert_eq!(extended.speed_unc, Some(0.5));
        assert_eq!(extended.bearing_unc, Some(4.0));
        assert_eq!(tech, PosTechMask::SATELLITE);
    }

    #[tokio::test]
    async fn test_responses_reach_engine() {
        let (mut api, _, engine) = adapter(AdapterConfig::default());
        api.handle_response(&ZppResponse::WwanPosition(WwanPositionInd {
            timestamp_utc_ms: Some(7),
            ..Default::default()
        }));
        api.handle_response(&ZppResponse::BestAvailablePosition(
            BestAvailablePositionInd {
                timestamp_utc_ms: Some(9),
                ..Default::default()
            },
        ));
        assert_eq!(
            engine.calls(),
            vec![
                EngineCall::WwanZppFix(Location {
                    timestamp_ms: 7,
                    ..Default::default()
                }),
                EngineCall::ZppBestAvailableFix(
                    Location {
                        timestamp_ms: 9,
                        ..Default::default()
                    },
                    LocationExtended::default(),
                    PosTechMask::empty(),
                ),
            ]
        );
    }
}
