//! Processed GNSS measurements and receiver clock

use contracts::{
    GnssMeasurementState, GnssMeasurements, GnssMeasurementsClock, GnssMeasurementsData,
    GnssPowerMode, GnssSvType, MeasStatus, MultipathIndicator, NativeSvMeasurement, SvMeasInfoInd,
    SvSystem, GNSS_INVALID_JAMMER_IND, GPS_WEEK_UNKNOWN, WEEK_MSECS,
};
use tracing::{debug, trace};

use super::DecodeContext;
use crate::convert;

/// Measurements kept per epoch
pub(crate) const GNSS_MEASUREMENT_CAPACITY: usize = 64;

/// Metres per second to nanoseconds per second
const MPS_TO_NSPS: f64 = 1.0e9 / 299_792_458.0;

/// Clock bias uncertainty above which the GPS time is not trusted (ms)
const MAX_CLOCK_UNC_MS: f32 = 16.0;

/// GLONASS orbit slot reported when only the frequency channel is known
const GLO_UNKNOWN_SLOT: u16 = 255;

/// BeiDou GEO satellites broadcasting the D2 message
const BDS_D2_PRNS: std::ops::RangeInclusive<u16> = 1..=5;

/// Discontinuity bookkeeping; survives across epochs
#[derive(Debug, Default)]
struct ClockTracker {
    ref_fcount: u32,
    clock_resets: u32,
    discontinuities: u32,
}

#[derive(Debug)]
pub(crate) struct MeasurementAccumulator {
    epoch: GnssMeasurements,
    gps_clock_seen: bool,
    ms_in_week: i32,
    agc_present: bool,
    tracker: ClockTracker,
}

impl Default for MeasurementAccumulator {
    fn default() -> Self {
        Self {
            epoch: GnssMeasurements::default(),
            gps_clock_seen: false,
            ms_in_week: -1,
            agc_present: false,
            tracker: ClockTracker::default(),
        }
    }
}

impl MeasurementAccumulator {
    fn restart(&mut self) {
        self.epoch = GnssMeasurements::default();
        self.gps_clock_seen = false;
        self.ms_in_week = -1;
        self.agc_present = false;
    }
}

fn sv_identity(system: SvSystem, native: &NativeSvMeasurement) -> (GnssSvType, u16, u8) {
    let id = native.gnss_sv_id;
    match system {
        SvSystem::Gps => (GnssSvType::Gps, id, 0),
        SvSystem::Galileo => (
            GnssSvType::Galileo,
            id.saturating_add(1).saturating_sub(contracts::prn::GAL_MIN),
            0,
        ),
        SvSystem::Sbas => (GnssSvType::Sbas, id, 0),
        SvSystem::Glonass => {
            let sv_id = if id == GLO_UNKNOWN_SLOT {
                u16::from(native.glo_frequency) + 92
            } else {
                id.saturating_add(1).saturating_sub(contracts::prn::GLO_MIN)
            };
            (GnssSvType::Glonass, sv_id, native.glo_frequency)
        }
        SvSystem::Bds | SvSystem::Compass => (
            GnssSvType::Beidou,
            id.saturating_add(1).saturating_sub(contracts::prn::BDS_MIN),
            0,
        ),
        SvSystem::Qzss => (GnssSvType::Qzss, id, 0),
        SvSystem::Unknown => (GnssSvType::Unknown, id, 0),
    }
}

/// Tracking state and received satellite time, strongest sync level first
fn tracking_state(
    sv_type: GnssSvType,
    sv_id: u16,
    native: &NativeSvMeasurement,
    glo_time_known: bool,
) -> (GnssMeasurementState, i64, i64) {
    let status = native.measurement_status;
    let valid = status & native.valid_meas_status_mask;
    let time = &native.time_speed;
    let unc_ns = (f64::from(time.sv_time_unc_ms) * 1e6) as i64;
    let sv_time_ms = f64::from(time.sv_time_ms) + f64::from(time.sv_time_sub_ms);

    let mut galileo = GnssMeasurementState::empty();
    if sv_type == GnssSvType::Galileo {
        galileo |= GnssMeasurementState::GAL_E1BC_CODE_LOCK;
        if status.contains(MeasStatus::GAL_100MS) {
            galileo |= GnssMeasurementState::GAL_E1C_2ND_CODE_LOCK;
        }
        if status.contains(MeasStatus::GAL_2S) {
            galileo |= GnssMeasurementState::GAL_E1B_PAGE_SYNC;
        }
    }

    let bit_sync = MeasStatus::BE_CONFIRM | MeasStatus::SB_VALID;
    if valid.contains(MeasStatus::MS_VALID) {
        let mut state = GnssMeasurementState::SUBFRAME_SYNC
            | GnssMeasurementState::TOW_DECODED
            | GnssMeasurementState::BIT_SYNC
            | GnssMeasurementState::CODE_LOCK
            | galileo;
        if glo_time_known {
            state |= GnssMeasurementState::GLO_STRING_SYNC | GnssMeasurementState::GLO_TOD_DECODED;
        }
        if sv_type == GnssSvType::Beidou && BDS_D2_PRNS.contains(&sv_id) {
            state |=
                GnssMeasurementState::BDS_D2_BIT_SYNC | GnssMeasurementState::BDS_D2_SUBFRAME_SYNC;
        }
        (state, (sv_time_ms * 1e6) as i64, unc_ns)
    } else if valid.contains(bit_sync) {
        let state = GnssMeasurementState::BIT_SYNC | GnssMeasurementState::CODE_LOCK | galileo;
        (state, ((sv_time_ms % 20.0) * 1e6) as i64, unc_ns)
    } else if valid.contains(MeasStatus::SM_VALID) {
        let state = GnssMeasurementState::CODE_LOCK | galileo;
        (state, (f64::from(time.sv_time_sub_ms) * 1e6) as i64, unc_ns)
    } else {
        (GnssMeasurementState::empty(), 0, 0)
    }
}

/// One processed measurement; the flag says whether the fragment carried AGC data
fn measurement(fragment: &SvMeasInfoInd, native: &NativeSvMeasurement) -> (GnssMeasurementsData, bool) {
    let (sv_type, sv_id, glo_frequency) = sv_identity(fragment.system, native);
    let glo_time_known = sv_type == GnssSvType::Glonass
        && fragment.glo_time.is_some_and(|t| t.is_known());
    let (state, received_sv_time_ns, received_sv_time_unc_ns) =
        tracking_state(sv_type, sv_id, native, glo_time_known);

    let (rate, rate_unc) = if native.measurement_status.contains(MeasStatus::VELOCITY_FINE) {
        (
            native.fine_speed.unwrap_or_default(),
            native.fine_speed_unc.unwrap_or_default(),
        )
    } else {
        (
            native.time_speed.doppler_shift,
            native.time_speed.doppler_shift_unc,
        )
    };

    let signal = fragment
        .gnss_signal_type
        .unwrap_or_else(|| convert::default_signal_type(sv_type));
    let carrier_frequency_hz = convert::carrier_frequency(signal, glo_frequency);

    let agc_level_db = fragment
        .jammer_indicator
        .filter(|j| j.agc_metric_db != GNSS_INVALID_JAMMER_IND)
        .map(|j| f64::from(j.agc_metric_db) / 100.0);

    let data = GnssMeasurementsData {
        sv_type,
        sv_id,
        time_offset_ns: 0.0,
        state,
        received_sv_time_ns,
        received_sv_time_unc_ns,
        cn0_dbhz: f64::from(native.cno) / 10.0,
        pseudorange_rate_mps: f64::from(rate),
        pseudorange_rate_unc_mps: f64::from(rate_unc),
        carrier_frequency_hz: Some(carrier_frequency_hz),
        multipath: MultipathIndicator::Unknown,
        agc_level_db,
    };
    (data, fragment.jammer_indicator.is_some())
}

/// Receiver clock from the GPS fragment; returns the GPS time of week when known
fn receiver_clock(
    tracker: &mut ClockTracker,
    clock: &mut GnssMeasurementsClock,
    fragment: &SvMeasInfoInd,
    new_session: bool,
    full_power: bool,
) -> i32 {
    let mut ms_in_week = -1;

    if let (Some(ext), Some(resets)) = (fragment.system_time_ext, fragment.num_clock_resets) {
        if new_session || resets != tracker.clock_resets || ext.ref_fcount <= tracker.ref_fcount {
            // Full power mode keeps its own continuity
            if !full_power {
                tracker.discontinuities += 1;
            }
        }
        tracker.clock_resets = resets;
        tracker.ref_fcount = ext.ref_fcount;

        clock.time_ns = i64::from(ext.ref_fcount) * 1_000_000;
        clock.time_unc_ns = 0.0;
        clock.hw_clock_discontinuity_count = tracker.discontinuities;

        if let Some(time) = fragment.system_time {
            ms_in_week = i32::try_from(time.week_ms).unwrap_or(-1);
            if time.week != GPS_WEEK_UNKNOWN && time.clk_time_unc_ms <= MAX_CLOCK_UNC_MS {
                let bias_ns = f64::from(time.clk_time_bias_ms) * 1e6;
                let total_ms = i64::from(time.week) * WEEK_MSECS as i64 + i64::from(time.week_ms);
                let gps_time_ns = total_ms * 1_000_000 - bias_ns as i64;
                clock.full_bias_ns = Some(clock.time_ns - gps_time_ns);
                clock.bias_ns = Some(bias_ns - (bias_ns as i64) as f64);
                clock.bias_unc_ns = Some(f64::from(time.clk_time_unc_ms) * 1e6);
            }
        }
    }

    if let Some(freq) = fragment.rcvr_clock_frequency {
        clock.drift_nsps = Some(f64::from(freq.clock_drift) * MPS_TO_NSPS);
        clock.drift_unc_nsps = Some(f64::from(freq.clock_drift_unc) * MPS_TO_NSPS);
    }
    ms_in_week
}

/// Merge one fragment; report the epoch when the sequence is complete and a GPS clock was seen
pub(crate) fn accumulate(ctx: &mut DecodeContext<'_>, fragment: &SvMeasInfoInd) {
    if fragment.seq_num > fragment.max_message_num {
        debug!(
            seq = fragment.seq_num,
            max = fragment.max_message_num,
            "Invalid measurement sequence number"
        );
        return;
    }
    let full_power = ctx.state.power_mode == Some(GnssPowerMode::M1);
    let acc = &mut ctx.state.gnss_measurements;
    if fragment.seq_num == 1 {
        acc.restart();
    }

    // Overflow list continues the primary one
    let primary = fragment.sv_measurements.as_deref().unwrap_or_default();
    if !primary.is_empty() {
        if acc.epoch.measurements.is_empty() {
            acc.agc_present = true;
        }
        let overflow = fragment.ext_sv_measurements.as_deref().unwrap_or_default();
        for native in primary.iter().chain(overflow) {
            if acc.epoch.measurements.len() >= GNSS_MEASUREMENT_CAPACITY {
                break;
            }
            let fresh = native.valid_meas_status_mask.contains(MeasStatus::FRESH_MEAS)
                && native.measurement_status.contains(MeasStatus::FRESH_MEAS);
            if !fresh {
                trace!(sv_id = native.gnss_sv_id, "Stale measurement not reported");
                continue;
            }
            let (data, has_agc) = measurement(fragment, native);
            acc.agc_present &= has_agc;
            acc.epoch.measurements.push(data);
        }
    }

    if fragment.system == SvSystem::Gps && !acc.gps_clock_seen {
        acc.gps_clock_seen = true;
        let new_session = std::mem::take(&mut ctx.state.measurements_started);
        let acc = &mut ctx.state.gnss_measurements;
        acc.ms_in_week = receiver_clock(
            &mut acc.tracker,
            &mut acc.epoch.clock,
            fragment,
            new_session,
            full_power,
        );
    }

    let acc = &mut ctx.state.gnss_measurements;
    if fragment.seq_num == fragment.max_message_num
        && !acc.epoch.measurements.is_empty()
        && acc.gps_clock_seen
    {
        // AGC from measurements makes the NMEA-derived one redundant
        let ms_in_week = if acc.agc_present { -1 } else { acc.ms_in_week };
        let satellites = acc.epoch.measurements.len();
        debug!(satellites, ms_in_week, "Reporting GNSS measurements");
        ctx.engine.report_gnss_measurement_data(&acc.epoch, ms_in_week);
        observability::record_measurement_flushed("processed", satellites);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::test_support::adapter;
    use crate::mock::EngineCall;
    use contracts::{
        carrier, AdapterConfig, GloTime, GnssSignalTypeMask, Indication, JammerIndicator,
        RcvrClockFrequency, SvTimeSpeed, SystemTime, SystemTimeExt,
    };

    fn native(id: u16, status: MeasStatus) -> NativeSvMeasurement {
        NativeSvMeasurement {
            gnss_sv_id: id,
            cno: 385,
            time_speed: SvTimeSpeed {
                sv_time_ms: 123,
                sv_time_sub_ms: 0.5,
                sv_time_unc_ms: 0.001,
                doppler_shift: -12.5,
                doppler_shift_unc: 0.25,
            },
            measurement_status: status | MeasStatus::FRESH_MEAS,
            valid_meas_status_mask: MeasStatus::all(),
            ..Default::default()
        }
    }

    fn gps_fragment(seq: u8, max: u8, ids: &[u16]) -> SvMeasInfoInd {
        SvMeasInfoInd {
            seq_num: seq,
            max_message_num: max,
            system: SvSystem::Gps,
            system_time: Some(SystemTime {
                week: 2000,
                week_ms: 345_600_000,
                clk_time_bias_ms: 0.25,
                clk_time_unc_ms: 1.0,
            }),
            system_time_ext: Some(SystemTimeExt {
                ref_fcount: 1000,
                system_rtc_ms: None,
            }),
            num_clock_resets: Some(0),
            sv_measurements: Some(
                ids.iter()
                    .map(|id| native(*id, MeasStatus::MS_VALID))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    fn epochs(calls: &[EngineCall]) -> Vec<(GnssMeasurements, i32)> {
        calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::GnssMeasurement(m, ms) => Some((m.clone(), *ms)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_state_priority() {
        let ms = native(3, MeasStatus::MS_VALID | MeasStatus::SM_VALID);
        let (state, time_ns, unc_ns) = tracking_state(GnssSvType::Gps, 3, &ms, false);
        assert!(state.contains(
            GnssMeasurementState::TOW_DECODED
                | GnssMeasurementState::SUBFRAME_SYNC
                | GnssMeasurementState::BIT_SYNC
                | GnssMeasurementState::CODE_LOCK
        ));
        assert_eq!(time_ns, 123_500_000);
        assert_eq!(unc_ns, 1000);

        let bit = native(3, MeasStatus::BE_CONFIRM | MeasStatus::SB_VALID);
        let (state, time_ns, _) = tracking_state(GnssSvType::Gps, 3, &bit, false);
        assert_eq!(
            state,
            GnssMeasurementState::BIT_SYNC | GnssMeasurementState::CODE_LOCK
        );
        // 123.5 ms modulo the 20 ms bit
        assert_eq!(time_ns, 3_500_000);

        let code = native(3, MeasStatus::SM_VALID | MeasStatus::BE_CONFIRM);
        let (state, time_ns, _) = tracking_state(GnssSvType::Gps, 3, &code, false);
        assert_eq!(state, GnssMeasurementState::CODE_LOCK);
        assert_eq!(time_ns, 500_000);

        let none = native(3, MeasStatus::empty());
        assert_eq!(
            tracking_state(GnssSvType::Gps, 3, &none, false),
            (GnssMeasurementState::empty(), 0, 0)
        );
    }

    #[test]
    fn test_constellation_specific_bits() {
        let ms = native(2, MeasStatus::MS_VALID);
        let (state, _, _) = tracking_state(GnssSvType::Beidou, 2, &ms, false);
        assert!(state.contains(
            GnssMeasurementState::BDS_D2_BIT_SYNC | GnssMeasurementState::BDS_D2_SUBFRAME_SYNC
        ));
        let (state, _, _) = tracking_state(GnssSvType::Beidou, 6, &ms, false);
        assert!(!state.contains(GnssMeasurementState::BDS_D2_BIT_SYNC));

        let (state, _, _) = tracking_state(GnssSvType::Glonass, 4, &ms, true);
        assert!(state.contains(GnssMeasurementState::GLO_TOD_DECODED));

        let gal = native(
            301,
            MeasStatus::SM_VALID | MeasStatus::GAL_100MS | MeasStatus::GAL_2S,
        );
        let (state, _, _) = tracking_state(GnssSvType::Galileo, 1, &gal, false);
        assert_eq!(
            state,
            GnssMeasurementState::CODE_LOCK
                | GnssMeasurementState::GAL_E1BC_CODE_LOCK
                | GnssMeasurementState::GAL_E1C_2ND_CODE_LOCK
                | GnssMeasurementState::GAL_E1B_PAGE_SYNC
        );
    }

    #[test]
    fn test_glonass_identity_and_carrier() {
        let fragment = SvMeasInfoInd {
            system: SvSystem::Glonass,
            glo_time: Some(GloTime {
                four_year: 255,
                ..Default::default()
            }),
            ..Default::default()
        };
        let mut unknown_slot = native(GLO_UNKNOWN_SLOT, MeasStatus::MS_VALID);
        unknown_slot.glo_frequency = 10;
        let (data, has_agc) = measurement(&fragment, &unknown_slot);
        assert_eq!((data.sv_type, data.sv_id), (GnssSvType::Glonass, 102));
        assert_eq!(
            data.carrier_frequency_hz,
            Some(carrier::GLONASS_G1 + 2.0 * carrier::GLONASS_G1_CHANNEL_STEP)
        );
        // Unknown GLONASS four-year counter: no string sync
        assert!(!data.state.contains(GnssMeasurementState::GLO_STRING_SYNC));
        assert!(!has_agc);

        let (data, _) = measurement(&fragment, &native(70, MeasStatus::MS_VALID));
        assert_eq!(data.sv_id, 6);
    }

    #[test]
    fn test_explicit_signal_and_fine_speed() {
        let fragment = SvMeasInfoInd {
            system: SvSystem::Galileo,
            gnss_signal_type: Some(GnssSignalTypeMask::GALILEO_E5A_Q),
            jammer_indicator: Some(JammerIndicator {
                agc_metric_db: -250,
                bp_metric_db: 0,
            }),
            ..Default::default()
        };
        let mut fine = native(305, MeasStatus::VELOCITY_FINE);
        fine.fine_speed = Some(3.5);
        fine.fine_speed_unc = Some(0.5);
        let (data, has_agc) = measurement(&fragment, &fine);

        assert_eq!(data.sv_id, 5);
        assert_eq!(data.carrier_frequency_hz, Some(carrier::GALILEO_E5A_Q));
        assert_eq!(data.pseudorange_rate_mps, 3.5);
        assert_eq!(data.pseudorange_rate_unc_mps, 0.5);
        assert_eq!(data.agc_level_db, Some(-2.5));
        assert_eq!(data.cn0_dbhz, 38.5);
        assert!(has_agc);
    }

    #[tokio::test]
    async fn test_epoch_reported_with_gps_clock() {
        let (mut api, _, engine) = adapter(AdapterConfig::default());
        api.state.measurements_started = true;

        let mut first = gps_fragment(1, 2, &[5, 9]);
        first.rcvr_clock_frequency = Some(RcvrClockFrequency {
            clock_drift: 299_792_458.0 / 1.0e9,
            ..Default::default()
        });
        api.handle_indication(&Indication::GnssMeasurement(Box::new(first)))
            .await;
        let second = SvMeasInfoInd {
            seq_num: 2,
            max_message_num: 2,
            system: SvSystem::Bds,
            sv_measurements: Some(vec![native(203, MeasStatus::SM_VALID)]),
            ..Default::default()
        };
        api.handle_indication(&Indication::GnssMeasurement(Box::new(second)))
            .await;

        let reported = epochs(&engine.calls());
        assert_eq!(reported.len(), 1);
        let (epoch, ms_in_week) = &reported[0];
        assert_eq!(*ms_in_week, 345_600_000);
        assert_eq!(epoch.measurements.len(), 3);
        assert_eq!(epoch.measurements[2].sv_type, GnssSvType::Beidou);
        assert_eq!(epoch.measurements[2].sv_id, 3);

        let clock = &epoch.clock;
        assert_eq!(clock.time_ns, 1_000_000_000);
        assert_eq!(clock.hw_clock_discontinuity_count, 1);
        let gps_ns = (2000i64 * WEEK_MSECS as i64 + 345_600_000) * 1_000_000 - 250_000;
        assert_eq!(clock.full_bias_ns, Some(1_000_000_000 - gps_ns));
        assert_eq!(clock.bias_unc_ns, Some(1.0e6));
        assert!((clock.drift_nsps.unwrap() - 1.0).abs() < 1e-3);
        assert!(!api.state.measurements_started);
    }

    #[tokio::test]
    async fn test_agc_suppresses_time_of_week() {
        let (mut api, _, engine) = adapter(AdapterConfig::default());
        let mut fragment = gps_fragment(1, 1, &[5]);
        fragment.jammer_indicator = Some(JammerIndicator::default());
        api.handle_indication(&Indication::GnssMeasurement(Box::new(fragment)))
            .await;

        let reported = epochs(&engine.calls());
        assert_eq!(reported[0].1, -1);
        assert_eq!(reported[0].0.measurements[0].agc_level_db, None);
    }

    #[tokio::test]
    async fn test_no_report_without_gps_clock() {
        let (mut api, _, engine) = adapter(AdapterConfig::default());
        let fragment = SvMeasInfoInd {
            seq_num: 1,
            max_message_num: 1,
            system: SvSystem::Glonass,
            sv_measurements: Some(vec![native(66, MeasStatus::SM_VALID)]),
            ..Default::default()
        };
        api.handle_indication(&Indication::GnssMeasurement(Box::new(fragment)))
            .await;
        assert!(epochs(&engine.calls()).is_empty());
    }

    #[tokio::test]
    async fn test_full_power_does_not_count_discontinuities() {
        let (mut api, _, engine) = adapter(AdapterConfig::default());
        api.state.power_mode = Some(GnssPowerMode::M1);
        api.state.measurements_started = true;
        api.handle_indication(&Indication::GnssMeasurement(Box::new(gps_fragment(
            1,
            1,
            &[5],
        ))))
        .await;

        let reported = epochs(&engine.calls());
        assert_eq!(reported[0].0.clock.hw_clock_discontinuity_count, 0);
    }
}
