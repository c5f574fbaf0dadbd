//! Abstract → native event mask mapping

use contracts::{AdapterEventMask, NativeEventMask};

/// One-to-one part of the mapping; the batched geofence breach bit is resolved separately
const EVENT_MAP: &[(AdapterEventMask, NativeEventMask)] = &[
    (
        AdapterEventMask::POSITION_REPORT,
        NativeEventMask::POSITION_REPORT,
    ),
    (
        AdapterEventMask::UNPROPAGATED_POSITION_REPORT,
        NativeEventMask::UNPROPAGATED_POSITION_REPORT,
    ),
    (
        AdapterEventMask::SATELLITE_REPORT,
        NativeEventMask::GNSS_SV_INFO,
    ),
    (AdapterEventMask::NMEA_POSITION_REPORT, NativeEventMask::NMEA),
    (AdapterEventMask::NMEA_1HZ_REPORT, NativeEventMask::NMEA),
    (
        AdapterEventMask::NI_NOTIFY_VERIFY_REQUEST,
        NativeEventMask::NI_NOTIFY_VERIFY_REQ,
    ),
    (
        AdapterEventMask::ASSISTANCE_DATA_REQUEST,
        NativeEventMask::INJECT_PREDICTED_ORBITS_REQ.union(NativeEventMask::INJECT_TIME_REQ),
    ),
    (
        AdapterEventMask::POSITION_INJECTION_REQUEST,
        NativeEventMask::INJECT_POSITION_REQ,
    ),
    (AdapterEventMask::STATUS_REPORT, NativeEventMask::ENGINE_STATE),
    (
        AdapterEventMask::LOCATION_SERVER_REQUEST,
        NativeEventMask::LOCATION_SERVER_CONNECTION_REQ,
    ),
    (AdapterEventMask::REQUEST_WIFI, NativeEventMask::WIFI_REQ),
    (
        AdapterEventMask::SENSOR_STATUS,
        NativeEventMask::SENSOR_STREAMING_READY_STATUS,
    ),
    (
        AdapterEventMask::REQUEST_TIME_SYNC,
        NativeEventMask::TIME_SYNC_REQ,
    ),
    (
        AdapterEventMask::REPORT_SPI,
        NativeEventMask::SET_SPI_STREAMING_REPORT,
    ),
    (
        AdapterEventMask::REPORT_NI_GEOFENCE,
        NativeEventMask::NI_GEOFENCE_NOTIFICATION,
    ),
    (
        AdapterEventMask::GEOFENCE_GEN_ALERT,
        NativeEventMask::GEOFENCE_GEN_ALERT,
    ),
    (
        AdapterEventMask::GEOFENCE_BREACH,
        NativeEventMask::GEOFENCE_BREACH_NOTIFICATION,
    ),
    (
        AdapterEventMask::PEDOMETER_CTRL,
        NativeEventMask::PEDOMETER_CONTROL,
    ),
    (
        AdapterEventMask::GEOFENCE_DWELL,
        NativeEventMask::GEOFENCE_BATCH_DWELL_NOTIFICATION,
    ),
    (
        AdapterEventMask::MOTION_CTRL,
        NativeEventMask::MOTION_DATA_CONTROL,
    ),
    (
        AdapterEventMask::REQUEST_WIFI_AP_DATA,
        NativeEventMask::INJECT_WIFI_AP_DATA_REQ,
    ),
    (
        AdapterEventMask::BATCH_FULL,
        NativeEventMask::BATCH_FULL_NOTIFICATION,
    ),
    (AdapterEventMask::BATCH_STATUS, NativeEventMask::BATCHING_STATUS),
    (
        AdapterEventMask::BATCHED_POSITION_REPORT,
        NativeEventMask::LIVE_BATCHED_POSITION_REPORT,
    ),
    (
        AdapterEventMask::GNSS_MEASUREMENT_REPORT,
        NativeEventMask::GNSS_MEASUREMENT_REPORT,
    ),
    (
        AdapterEventMask::GNSS_MEASUREMENT,
        NativeEventMask::GNSS_MEASUREMENT_REPORT,
    ),
    (
        AdapterEventMask::SV_POLYNOMIAL_REPORT,
        NativeEventMask::GNSS_SV_POLYNOMIAL_REPORT,
    ),
    (
        AdapterEventMask::SV_EPHEMERIS_REPORT,
        NativeEventMask::EPHEMERIS_REPORT,
    ),
    (
        AdapterEventMask::GDT_UPLOAD_BEGIN_REQ,
        NativeEventMask::GDT_UPLOAD_BEGIN_REQ,
    ),
    (
        AdapterEventMask::GDT_UPLOAD_END_REQ,
        NativeEventMask::GDT_UPLOAD_END_REQ,
    ),
    (
        AdapterEventMask::REQUEST_TIMEZONE,
        NativeEventMask::GET_TIME_ZONE_REQ,
    ),
    (
        AdapterEventMask::REQUEST_SRN_DATA,
        NativeEventMask::INJECT_SRN_AP_DATA_REQ,
    ),
    (
        AdapterEventMask::FDCL_SERVICE_REQ,
        NativeEventMask::FDCL_SERVICE_REQ,
    ),
    (
        AdapterEventMask::BS_OBS_DATA_SERVICE_REQ,
        NativeEventMask::BS_OBS_DATA_SERVICE_REQ,
    ),
    (
        AdapterEventMask::LOC_SYSTEM_INFO,
        NativeEventMask::NEXT_LS_INFO_REPORT,
    ),
    (
        AdapterEventMask::EVENT_REPORT_INFO,
        NativeEventMask::GNSS_EVENT_REPORT,
    ),
    (
        AdapterEventMask::GNSS_NHZ_MEASUREMENT,
        NativeEventMask::GNSS_NHZ_MEASUREMENT_REPORT,
    ),
];

/// Map an abstract mask to the native bits it subscribes
///
/// `batched_breach_supported` selects where the batched geofence breach bit lands.
pub fn convert_mask(mask: AdapterEventMask, batched_breach_supported: bool) -> NativeEventMask {
    let mut native = EVENT_MAP
        .iter()
        .filter(|(abstract_bit, _)| mask.intersects(*abstract_bit))
        .fold(NativeEventMask::empty(), |acc, (_, bits)| acc | *bits);

    if mask.contains(AdapterEventMask::BATCHED_GEOFENCE_BREACH) {
        native |= if batched_breach_supported {
            NativeEventMask::GEOFENCE_BATCH_BREACH_NOTIFICATION
        } else {
            NativeEventMask::GEOFENCE_BREACH_NOTIFICATION
        };
    }
    native
}

/// Drop session-gated bits while no fix session is active
pub fn adjust_for_session(native: NativeEventMask, in_session: bool) -> NativeEventMask {
    if in_session {
        native
    } else {
        native.difference(NativeEventMask::SESSION_GATED)
    }
}

/// Native mask to register for an abstract mask in the given session state
pub fn native_mask_for(
    mask: AdapterEventMask,
    in_session: bool,
    batched_breach_supported: bool,
) -> NativeEventMask {
    adjust_for_session(convert_mask(mask, batched_breach_supported), in_session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_abstract_bit_is_mapped() {
        for bit in AdapterEventMask::all().iter() {
            let native = convert_mask(bit, false);
            assert!(!native.is_empty(), "{bit:?} maps to nothing");
        }
    }

    #[test]
    fn test_no_gated_bits_outside_session() {
        // Walk a spread of masks, including all-set and single bits
        let mut masks = vec![AdapterEventMask::all(), AdapterEventMask::empty()];
        masks.extend(AdapterEventMask::all().iter());
        let mut seed: u64 = 0x9E37_79B9_7F4A_7C15;
        for _ in 0..256 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            masks.push(AdapterEventMask::from_bits_truncate(seed));
        }

        for mask in masks {
            for supported in [false, true] {
                let native = native_mask_for(mask, false, supported);
                assert!(
                    !native.intersects(NativeEventMask::SESSION_GATED),
                    "{mask:?} leaked gated bits: {native:?}"
                );
            }
        }
    }

    #[test]
    fn test_in_session_keeps_gated_bits() {
        let mask = AdapterEventMask::POSITION_REPORT | AdapterEventMask::STATUS_REPORT;
        let native = native_mask_for(mask, true, false);
        assert_eq!(
            native,
            NativeEventMask::POSITION_REPORT | NativeEventMask::ENGINE_STATE
        );
        assert!(native_mask_for(mask, false, false).is_empty());
    }

    #[test]
    fn test_nmea_and_measurement_aliases() {
        let a = convert_mask(AdapterEventMask::NMEA_1HZ_REPORT, false);
        let b = convert_mask(AdapterEventMask::NMEA_POSITION_REPORT, false);
        assert_eq!(a, NativeEventMask::NMEA);
        assert_eq!(a, b);

        let m = convert_mask(AdapterEventMask::GNSS_MEASUREMENT, false);
        assert_eq!(m, NativeEventMask::GNSS_MEASUREMENT_REPORT);
    }

    #[test]
    fn test_assistance_data_subscribes_two_requests() {
        let native = convert_mask(AdapterEventMask::ASSISTANCE_DATA_REQUEST, false);
        assert_eq!(
            native,
            NativeEventMask::INJECT_PREDICTED_ORBITS_REQ | NativeEventMask::INJECT_TIME_REQ
        );
    }

    #[test]
    fn test_batched_breach_depends_on_support() {
        let mask = AdapterEventMask::BATCHED_GEOFENCE_BREACH;
        assert_eq!(
            convert_mask(mask, true),
            NativeEventMask::GEOFENCE_BATCH_BREACH_NOTIFICATION
        );
        assert_eq!(
            convert_mask(mask, false),
            NativeEventMask::GEOFENCE_BREACH_NOTIFICATION
        );
    }
}
