//! Satellite visibility decoding

use contracts::{
    GnssSv, GnssSvNotification, GnssSvOptions, Indication, SvInfo, SvInfoInd, SvInfoMask,
};
use tracing::trace;

use super::{DecodeContext, Followup};
use crate::convert;

fn options(mask: Option<SvInfoMask>) -> GnssSvOptions {
    let mut options = GnssSvOptions::empty();
    if let Some(mask) = mask {
        if mask.contains(SvInfoMask::HAS_EPHEMERIS) {
            options |= GnssSvOptions::HAS_EPHEMERIS;
        }
        if mask.contains(SvInfoMask::HAS_ALMANAC) {
            options |= GnssSvOptions::HAS_ALMANAC;
        }
    }
    options
}

/// Visible satellites; the expanded list wins and entries without system or id are skipped
pub(crate) fn sv_notification(ind: &SvInfoInd) -> GnssSvNotification {
    let entries: Vec<(SvInfo, u8)> = match (&ind.expanded_sv_list, &ind.sv_list) {
        (Some(expanded), _) => expanded.iter().map(|e| (e.sv_info, e.glo_frequency)).collect(),
        (None, Some(list)) => list.iter().map(|info| (*info, 0)).collect(),
        (None, None) => Vec::new(),
    };
    let signal_types = ind.signal_type_list.as_deref();

    let mut svs: Vec<GnssSv> = Vec::with_capacity(entries.len());
    for (info, glo_frequency) in entries {
        let (Some(system), Some(gnss_sv_id)) = (info.system, info.gnss_sv_id) else {
            continue;
        };
        if gnss_sv_id == 0 {
            continue;
        }
        let (sv_type, sv_id) = convert::sv_info_id(system, gnss_sv_id);
        let mut sv = GnssSv {
            sv_id,
            sv_type,
            cn0_dbhz: info.snr.unwrap_or_default(),
            elevation: info.elevation.unwrap_or_default(),
            azimuth: info.azimuth.unwrap_or_default(),
            options: options(info.sv_info_mask),
            ..Default::default()
        };

        match signal_types {
            // Signal list is indexed by reported satellite, not by list entry
            Some(list) => match list.get(svs.len()) {
                Some(&signal) if !signal.is_empty() => {
                    sv.carrier_frequency_hz = convert::carrier_frequency(signal, glo_frequency);
                    sv.signal_type = signal;
                    sv.options |= GnssSvOptions::HAS_CARRIER_FREQUENCY;
                }
                _ => trace!(sv_id, "No signal type for satellite"),
            },
            None => {
                sv.carrier_frequency_hz =
                    convert::carrier_frequency(convert::default_signal_type(sv_type), 0);
                sv.options |= GnssSvOptions::HAS_CARRIER_FREQUENCY;
            }
        }
        svs.push(sv);
    }

    GnssSvNotification {
        signal_type_valid: signal_types.is_some(),
        svs,
    }
}

pub(crate) fn decode_sv_info(ctx: &mut DecodeContext<'_>, ind: &Indication) -> Option<Followup> {
    let Indication::SvInfo(info) = ind else {
        return None;
    };
    ctx.engine.report_sv(&sv_notification(info));
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{carrier, ExpandedSvInfo, GnssSignalTypeMask, GnssSvType, SvSystem};

    fn info(system: SvSystem, id: u16) -> SvInfo {
        SvInfo {
            system: Some(system),
            gnss_sv_id: Some(id),
            snr: Some(35.5),
            elevation: Some(40.0),
            azimuth: Some(120.0),
            sv_info_mask: Some(SvInfoMask::HAS_EPHEMERIS),
        }
    }

    #[test]
    fn test_default_carrier_without_signal_list() {
        let ind = SvInfoInd {
            sv_list: Some(vec![info(SvSystem::Gps, 5), info(SvSystem::Qzss, 194)]),
            ..Default::default()
        };
        let notification = sv_notification(&ind);
        assert!(!notification.signal_type_valid);
        assert_eq!(notification.svs.len(), 2);

        let qzss = &notification.svs[1];
        assert_eq!((qzss.sv_type, qzss.sv_id), (GnssSvType::Qzss, 2));
        assert_eq!(qzss.carrier_frequency_hz, carrier::QZSS_L1CA);
        assert!(qzss
            .options
            .contains(GnssSvOptions::HAS_EPHEMERIS | GnssSvOptions::HAS_CARRIER_FREQUENCY));
        assert_eq!(qzss.cn0_dbhz, 35.5);
    }

    #[test]
    fn test_expanded_list_with_glonass_channel() {
        let ind = SvInfoInd {
            sv_list: Some(vec![info(SvSystem::Gps, 1)]),
            expanded_sv_list: Some(vec![
                ExpandedSvInfo {
                    sv_info: info(SvSystem::Glonass, 70),
                    glo_frequency: 9,
                },
                ExpandedSvInfo {
                    sv_info: info(SvSystem::Galileo, 305),
                    glo_frequency: 0,
                },
            ]),
            signal_type_list: Some(vec![GnssSignalTypeMask::GLONASS_G1]),
        };
        let notification = sv_notification(&ind);
        assert!(notification.signal_type_valid);
        assert_eq!(notification.svs.len(), 2);

        let glo = &notification.svs[0];
        assert_eq!(glo.sv_id, 70);
        assert_eq!(
            glo.carrier_frequency_hz,
            carrier::GLONASS_G1 + carrier::GLONASS_G1_CHANNEL_STEP
        );
        assert_eq!(glo.signal_type, GnssSignalTypeMask::GLONASS_G1);

        // Past the end of the signal list: no carrier
        let gal = &notification.svs[1];
        assert_eq!((gal.sv_type, gal.sv_id), (GnssSvType::Galileo, 5));
        assert!(!gal.options.contains(GnssSvOptions::HAS_CARRIER_FREQUENCY));
        assert_eq!(gal.carrier_frequency_hz, 0.0);
    }

    #[test]
    fn test_invalid_entries_skipped() {
        let ind = SvInfoInd {
            sv_list: Some(vec![
                info(SvSystem::Gps, 0),
                SvInfo {
                    system: None,
                    ..info(SvSystem::Gps, 3)
                },
                info(SvSystem::Bds, 210),
            ]),
            ..Default::default()
        };
        let notification = sv_notification(&ind);
        assert_eq!(notification.svs.len(), 1);
        assert_eq!(
            (notification.svs[0].sv_type, notification.svs[0].sv_id),
            (GnssSvType::Beidou, 10)
        );
    }
}
