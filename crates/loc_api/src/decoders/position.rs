//! Position report decoding, propagated and unpropagated

use contracts::{
    ApTimestamp, Coordinates, Enu, GnssDataNotification, GnssSvType, GnssSystemTime,
    Indication, Location, LocationExtended, LocationSource, MeasUsageInfo, PosTechMask,
    PositionReport, PositionReportInd, ReportStatus, SessionStatus, SignalJamming, SvUsedIds,
    SystemTime, UncEllipse, GNSS_INVALID_JAMMER_IND,
};
use tracing::{debug, trace};

use super::{DecodeContext, Followup};
use crate::{clock, convert};

pub(crate) fn decode_position(ctx: &mut DecodeContext<'_>, ind: &Indication) -> Option<Followup> {
    let Indication::Position(report) = ind else {
        return None;
    };
    report_position(ctx, report, false);
    None
}

pub(crate) fn decode_unpropagated_position(
    ctx: &mut DecodeContext<'_>,
    ind: &Indication,
) -> Option<Followup> {
    let Indication::UnpropagatedPosition(report) = ind else {
        return None;
    };
    report_position(ctx, report, true);
    None
}

fn jammer_metric(raw: i32) -> Option<f64> {
    (raw != GNSS_INVALID_JAMMER_IND).then(|| f64::from(raw) / 100.0)
}

/// Per-band jammer data; the aggregate entry at index 0 is skipped
fn jammer_data(ind: &PositionReportInd) -> GnssDataNotification {
    let signals = ind
        .jammer_indicators
        .iter()
        .flatten()
        .skip(1)
        .map(|j| SignalJamming {
            agc_db: jammer_metric(j.agc_metric_db),
            jammer_ind_db: jammer_metric(j.bp_metric_db),
        })
        .collect();
    GnssDataNotification { signals }
}

/// Horizontal accuracy at 68% confidence
fn horizontal_accuracy(ind: &PositionReportInd) -> Option<f32> {
    let accuracy = ind.hor_unc_circular.or_else(|| {
        match (ind.hor_unc_ellipse_semi_minor, ind.hor_unc_ellipse_semi_major) {
            (Some(minor), Some(major)) => Some((minor * minor + major * major).sqrt()),
            _ => None,
        }
    })?;
    Some(match ind.hor_confidence {
        Some(confidence) => {
            convert::scale_to_68(accuracy, confidence, ind.hor_unc_circular.is_some())
        }
        None => accuracy,
    })
}

/// North and east standard deviations of the uncertainty ellipse
fn ellipse_std_dev(ellipse: &UncEllipse) -> Option<(f32, f32)> {
    let (major, minor, azimuth) = (
        f64::from(ellipse.semi_major?),
        f64::from(ellipse.semi_minor?),
        f64::from(ellipse.azimuth?),
    );
    let (sin, cos) = azimuth.sin_cos();
    let north = major * major * cos * cos + minor * minor * sin * sin;
    let east = major * major * sin * sin + minor * minor * cos * cos;
    Some((north.sqrt() as f32, east.sqrt() as f32))
}

/// Used-satellite masks and per-satellite usage; engine signal types win over defaults
fn sv_usage(ind: &PositionReportInd) -> Option<(SvUsedIds, Vec<MeasUsageInfo>)> {
    let used = ind
        .expanded_gnss_sv_used_list
        .as_ref()
        .or(ind.gnss_sv_used_list.as_ref())
        .filter(|list| !list.is_empty())?;
    let signals = ind
        .gnss_sv_used_signal_type_list
        .as_deref()
        .filter(|list| !list.is_empty());

    let mut ids = SvUsedIds::default();
    let usage = used
        .iter()
        .enumerate()
        .map(|(idx, &sv_id)| {
            let constellation =
                convert::mark_sv_used(&mut ids, sv_id).unwrap_or(GnssSvType::Unknown);
            let signal_type = signals
                .and_then(|list| list.get(idx).copied())
                .unwrap_or_else(|| convert::default_signal_type(constellation));
            MeasUsageInfo {
                constellation,
                sv_id,
                signal_type,
            }
        })
        .collect();
    Some((ids, usage))
}

fn location(ind: &PositionReportInd, coordinates: Coordinates, unpropagated: bool) -> Location {
    Location {
        coordinates: Some(coordinates),
        altitude: ind.altitude_wrt_ellipsoid.map(f64::from),
        speed: ind.speed_horizontal,
        bearing: ind.heading,
        accuracy: horizontal_accuracy(ind),
        vertical_accuracy: ind.vert_unc,
        timestamp_ms: ind.timestamp_utc_ms.unwrap_or(0),
        source: LocationSource::Gnss,
        spoof_mask: ind.spoof_report_mask,
        unpropagated,
    }
}

fn extended(ind: &PositionReportInd, ap_timestamp: ApTimestamp) -> LocationExtended {
    let hor_unc_ellipse = UncEllipse {
        semi_major: ind.hor_unc_ellipse_semi_major,
        semi_minor: ind.hor_unc_ellipse_semi_minor,
        azimuth: ind.hor_unc_ellipse_orient_azimuth,
    };
    let std_dev = ellipse_std_dev(&hor_unc_ellipse);
    let (sv_used_ids, meas_usage) = match sv_usage(ind) {
        Some((ids, usage)) => (Some(ids), usage),
        None => (None, Vec::new()),
    };
    let system_time = ind.gps_time.map(|t| {
        GnssSystemTime::Gps(SystemTime {
            week: t.week,
            week_ms: t.tow_ms,
            clk_time_bias_ms: 0.0,
            clk_time_unc_ms: ind.time_unc_ms.unwrap_or(0.0),
        })
    });

    LocationExtended {
        ap_timestamp: Some(ap_timestamp),
        tech_mask: Some(convert::tech_mask(ind.technology_mask)),
        magnetic_deviation: ind.magnetic_deviation,
        dop: ind.dop,
        ext_dop: ind.ext_dop,
        altitude_mean_sea_level: ind.altitude_wrt_mean_sea_level,
        vert_unc: ind.vert_unc,
        speed_unc: ind.speed_unc,
        bearing_unc: ind.heading_unc,
        horizontal_reliability: ind.hor_reliability,
        vertical_reliability: ind.vert_reliability,
        hor_unc_ellipse,
        north_std_dev: std_dev.map(|(north, _)| north),
        east_std_dev: std_dev.map(|(_, east)| east),
        sv_used_ids,
        meas_usage,
        nav_solution_mask: ind.nav_solution_mask.map(convert::nav_solution_mask),
        gps_time: ind.gps_time,
        velocity: ind.vel_enu.map(Enu::from_array),
        velocity_unc: ind.vel_unc_enu.map(Enu::from_array),
        system_time,
        time_unc_ms: ind.time_unc_ms,
        leap_seconds: ind.leap_seconds,
    }
}

fn report_position(ctx: &mut DecodeContext<'_>, ind: &PositionReportInd, unpropagated: bool) {
    let ap_timestamp = ApTimestamp {
        boot_time: clock::boot_time(),
        uncertainty_ms: ctx.config.ap_timestamp_uncertainty_ms,
    };
    let data = jammer_data(ind);
    let jammed = data
        .signals
        .iter()
        .any(|s| s.agc_db.is_some() || s.jammer_ind_db.is_some());
    let ms_in_week = if jammed {
        -1
    } else {
        ind.gps_time
            .and_then(|t| i32::try_from(t.tow_ms).ok())
            .unwrap_or(0)
    };

    let status = match ind.session_status {
        SessionStatus::Success => ReportStatus::Success,
        SessionStatus::InProgress => ReportStatus::Intermediate,
        other => {
            debug!(status = ?other, unpropagated, "Position session failed");
            let report = PositionReport {
                location: Location {
                    unpropagated,
                    ..Default::default()
                },
                extended: LocationExtended {
                    ap_timestamp: Some(ap_timestamp),
                    ..Default::default()
                },
                status: ReportStatus::Failure,
                tech_mask: PosTechMask::empty(),
                data,
                ms_in_week,
            };
            ctx.engine.report_position(&report);
            return;
        }
    };

    let (Some(latitude), Some(longitude)) = (ind.latitude, ind.longitude) else {
        trace!(ms_in_week, "Position without coordinates, forwarding data only");
        ctx.engine.report_data(&data, ms_in_week);
        return;
    };

    let tech_mask = convert::tech_mask(ind.technology_mask);
    let report = PositionReport {
        location: location(
            ind,
            Coordinates {
                latitude,
                longitude,
            },
            unpropagated,
        ),
        extended: extended(ind, ap_timestamp),
        status,
        tech_mask,
        data,
        ms_in_week,
    };
    ctx.engine.report_position(&report);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::test_support::adapter;
    use crate::mock::EngineCall;
    use contracts::{
        AdapterConfig, GnssSignalTypeMask, GpsTime, JammerIndicator, NativeTechMask,
    };

    fn fix() -> PositionReportInd {
        PositionReportInd {
            session_status: SessionStatus::Success,
            latitude: Some(37.42),
            longitude: Some(-122.08),
            hor_unc_circular: Some(10.0),
            hor_confidence: Some(39),
            technology_mask: NativeTechMask::SATELLITE,
            timestamp_utc_ms: Some(1_700_000_000_000),
            gps_time: Some(GpsTime {
                week: 2300,
                tow_ms: 345_000,
            }),
            ..Default::default()
        }
    }

    fn positions(calls: Vec<EngineCall>) -> Vec<PositionReport> {
        calls
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::Position(report) => Some(report),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_final_fix() {
        let (mut api, _, engine) = adapter(AdapterConfig::default());
        api.handle_indication(&Indication::Position(Box::new(fix())))
            .await;

        let reports = positions(engine.calls());
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert_eq!(report.status, ReportStatus::Success);
        assert_eq!(report.tech_mask, PosTechMask::SATELLITE);
        assert_eq!(report.ms_in_week, 345_000);
        assert_eq!(report.location.source, LocationSource::Gnss);
        assert!(!report.location.unpropagated);
        // Circular uncertainty is always scaled from 63%
        let accuracy = report.location.accuracy.unwrap();
        assert!((accuracy - 10.72).abs() < 1e-4);
        assert!(matches!(
            report.extended.system_time,
            Some(GnssSystemTime::Gps(SystemTime { week: 2300, .. }))
        ));
    }

    #[tokio::test]
    async fn test_in_progress_is_intermediate() {
        let (mut api, _, engine) = adapter(AdapterConfig::default());
        let ind = PositionReportInd {
            session_status: SessionStatus::InProgress,
            ..fix()
        };
        api.handle_indication(&Indication::UnpropagatedPosition(Box::new(ind)))
            .await;

        let reports = positions(engine.calls());
        assert_eq!(reports[0].status, ReportStatus::Intermediate);
        assert!(reports[0].location.unpropagated);
    }

    #[tokio::test]
    async fn test_ellipse_accuracy_and_std_dev() {
        let (mut api, _, engine) = adapter(AdapterConfig::default());
        let ind = PositionReportInd {
            hor_unc_circular: None,
            hor_confidence: None,
            hor_unc_ellipse_semi_major: Some(4.0),
            hor_unc_ellipse_semi_minor: Some(3.0),
            hor_unc_ellipse_orient_azimuth: Some(0.0),
            ..fix()
        };
        api.handle_indication(&Indication::Position(Box::new(ind)))
            .await;

        let report = &positions(engine.calls())[0];
        assert_eq!(report.location.accuracy, Some(5.0));
        // Azimuth 0: the major axis points north
        assert!((report.extended.north_std_dev.unwrap() - 4.0).abs() < 1e-5);
        assert!((report.extended.east_std_dev.unwrap() - 3.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_sv_used_with_and_without_signal_types() {
        let (mut api, _, engine) = adapter(AdapterConfig::default());
        let ind = PositionReportInd {
            gnss_sv_used_list: Some(vec![3, 66]),
            expanded_gnss_sv_used_list: Some(vec![3, 66, 302]),
            gnss_sv_used_signal_type_list: Some(vec![GnssSignalTypeMask::GPS_L5_Q]),
            ..fix()
        };
        api.handle_indication(&Indication::Position(Box::new(ind)))
            .await;

        let report = &positions(engine.calls())[0];
        let ids = report.extended.sv_used_ids.unwrap();
        assert_eq!(ids.gps, 1 << 2);
        assert_eq!(ids.glonass, 1 << 1);
        assert_eq!(ids.galileo, 1 << 1);
        let signals: Vec<_> = report
            .extended
            .meas_usage
            .iter()
            .map(|u| u.signal_type)
            .collect();
        assert_eq!(
            signals,
            vec![
                GnssSignalTypeMask::GPS_L5_Q,
                GnssSignalTypeMask::GLONASS_G1,
                GnssSignalTypeMask::GALILEO_E1_C,
            ]
        );
    }

    #[tokio::test]
    async fn test_no_coordinates_reports_data_only() {
        let (mut api, _, engine) = adapter(AdapterConfig::default());
        let ind = PositionReportInd {
            latitude: None,
            ..fix()
        };
        api.handle_indication(&Indication::Position(Box::new(ind)))
            .await;

        assert_eq!(
            engine.calls(),
            vec![EngineCall::Data(GnssDataNotification::default(), 345_000)]
        );
    }

    #[tokio::test]
    async fn test_failed_session_reports_failure() {
        let (mut api, _, engine) = adapter(AdapterConfig::default());
        let ind = PositionReportInd {
            session_status: SessionStatus::Timeout,
            ..fix()
        };
        api.handle_indication(&Indication::UnpropagatedPosition(Box::new(ind)))
            .await;

        let report = &positions(engine.calls())[0];
        assert_eq!(report.status, ReportStatus::Failure);
        assert!(report.location.coordinates.is_none());
        assert!(report.location.unpropagated);
        assert!(report.tech_mask.is_empty());
    }

    #[tokio::test]
    async fn test_jammer_data_overrides_ms_in_week() {
        let (mut api, _, engine) = adapter(AdapterConfig::default());
        let ind = PositionReportInd {
            jammer_indicators: Some(vec![
                JammerIndicator {
                    agc_metric_db: 999,
                    bp_metric_db: 999,
                },
                JammerIndicator {
                    agc_metric_db: 250,
                    ..Default::default()
                },
                JammerIndicator::default(),
            ]),
            ..fix()
        };
        api.handle_indication(&Indication::Position(Box::new(ind)))
            .await;

        let report = &positions(engine.calls())[0];
        assert_eq!(report.ms_in_week, -1);
        assert_eq!(
            report.data.signals,
            vec![
                SignalJamming {
                    agc_db: Some(2.5),
                    jammer_ind_db: None,
                },
                SignalJamming::default(),
            ]
        );
    }
}
