//! Raw satellite measurement accumulation
//!
//! A measurement epoch arrives as a sequence of fragments, one per constellation and
//! signal. Fragments are merged into one [`SvMeasurementSet`] that is reported when the
//! last fragment of the sequence arrives.

use contracts::{
    MeasGloTime, MeasStatus, MeasSystemTime, NativeSvMeasurement, SvMeasInfoInd, SvMeasurement,
    SvMeasurementExtras, SvMeasurementHeader, SvMeasurementSet, SvSystem,
};
use tracing::{debug, trace, warn};

use super::DecodeContext;
use crate::clock;

/// Satellites kept per epoch; later ones are dropped
pub(crate) const RAW_MEASUREMENT_CAPACITY: usize = 128;

/// Epoch being assembled, keyed by the frame counter of its fragments
#[derive(Debug, Default)]
pub(crate) struct RawMeasurementBuffer {
    ref_fcount: u32,
    set: SvMeasurementSet,
}

impl RawMeasurementBuffer {
    fn restart(&mut self, ref_fcount: u32, is_nhz: bool) {
        self.ref_fcount = ref_fcount;
        self.set = SvMeasurementSet {
            is_nhz,
            ..Default::default()
        };
    }

    fn merge_header(&mut self, fragment: &SvMeasInfoInd) {
        let header = &mut self.set.header;
        if let Some(freq) = fragment.rcvr_clock_frequency {
            header.clock_frequency = Some(freq);
        }
        // Only a leap second without uncertainty is trusted
        if let Some(leap) = fragment.leap_second.filter(|l| l.leap_sec_unc == 0) {
            header.leap_sec = Some(leap.leap_sec);
        }
        merge_biases(header, fragment);

        let ref_fcount = fragment.system_time_ext.map(|ext| ext.ref_fcount);
        if let Some(time) = fragment.glo_time {
            header.glo_time = MeasGloTime {
                time: Some(time),
                ref_fcount,
                num_clock_resets: fragment.num_clock_resets,
            };
        }

        let slot = match fragment.system {
            SvSystem::Gps => Some(&mut header.gps_time),
            SvSystem::Galileo => Some(&mut header.gal_time),
            SvSystem::Bds | SvSystem::Compass => Some(&mut header.bds_time),
            SvSystem::Qzss => Some(&mut header.qzss_time),
            _ => None,
        };
        if let Some(slot) = slot {
            merge_system_time(slot, fragment, ref_fcount);
        }
        if let Some(rtc) = fragment.system_time_ext.and_then(|ext| ext.system_rtc_ms) {
            header.system_rtc_ms = Some(rtc);
        }
    }

    fn push_satellites(&mut self, fragment: &SvMeasInfoInd) {
        let Some(list) = fragment.sv_measurements.as_deref() else {
            return;
        };
        // Carrier phase uncertainty only lines up when both lists have the same length
        let phase_unc = fragment
            .carrier_phase_unc
            .as_deref()
            .filter(|unc| unc.len() == list.len());

        for (i, native) in list.iter().enumerate() {
            if self.set.measurements.len() >= RAW_MEASUREMENT_CAPACITY {
                warn!(
                    capacity = RAW_MEASUREMENT_CAPACITY,
                    "Raw measurement set full"
                );
                break;
            }
            if native.gnss_sv_id == 0
                || !native.measurement_status.contains(MeasStatus::FRESH_MEAS)
            {
                trace!(
                    sv_id = native.gnss_sv_id,
                    status = native.measurement_status.bits(),
                    "Skipping stale measurement"
                );
                continue;
            }
            let carrier_phase_unc = phase_unc.and_then(|unc| unc.get(i).copied());
            self.set
                .measurements
                .push(sv_measurement(fragment, native, carrier_phase_unc));
        }
    }
}

fn merge_biases(header: &mut SvMeasurementHeader, fragment: &SvMeasInfoInd) {
    let biases = &fragment.biases;
    let merged = &mut header.biases;
    merged.gps_glo = biases.gps_glo.or(merged.gps_glo);
    merged.gps_bds = biases.gps_bds.or(merged.gps_bds);
    merged.gps_gal = biases.gps_gal.or(merged.gps_gal);
    merged.bds_glo = biases.bds_glo.or(merged.bds_glo);
    merged.gal_glo = biases.gal_glo.or(merged.gal_glo);
    merged.gal_bds = biases.gal_bds.or(merged.gal_bds);
    merged.gal_e1_e5a = biases.gal_e1_e5a.or(merged.gal_e1_e5a);
    merged.gps_l1_l5 = biases.gps_l1_l5.or(merged.gps_l1_l5);
}

fn merge_system_time(slot: &mut MeasSystemTime, fragment: &SvMeasInfoInd, ref_fcount: Option<u32>) {
    if let Some(time) = fragment.system_time {
        slot.time = Some(time);
    }
    if ref_fcount.is_some() {
        slot.ref_fcount = ref_fcount;
    }
    if let Some(resets) = fragment.num_clock_resets {
        slot.num_clock_resets = Some(resets);
    }
}

fn sv_measurement(
    fragment: &SvMeasInfoInd,
    native: &NativeSvMeasurement,
    carrier_phase_unc: Option<f32>,
) -> SvMeasurement {
    SvMeasurement {
        system: fragment.system,
        signal_type: fragment.gnss_signal_type,
        sv_id: native.gnss_sv_id,
        glo_frequency: native.glo_frequency,
        loss_of_lock: native.loss_of_lock,
        sv_status: native.sv_status,
        health_status: native.health_status,
        sv_info_mask: native.sv_info_mask,
        cno: native.cno,
        glo_rf_loss: native.glo_rf_loss,
        meas_latency: native.meas_latency,
        time_speed: native.time_speed,
        measurement_status: native.measurement_status,
        valid_meas_status_mask: native.valid_meas_status_mask,
        extras: SvMeasurementExtras {
            multipath_estimate: native.multipath_estimate,
            fine_speed: native.fine_speed,
            fine_speed_unc: native.fine_speed_unc,
            carrier_phase: native.carrier_phase,
            carrier_phase_unc,
            elevation: native.sv_elevation,
            azimuth: native.sv_azimuth,
            cycle_slip_count: native.cycle_slip_count,
        },
    }
}

/// Merge one fragment; report and clear the set on the last fragment of a sequence
pub(crate) fn accumulate(ctx: &mut DecodeContext<'_>, fragment: &SvMeasInfoInd) {
    debug!(
        seq = fragment.seq_num,
        max = fragment.max_message_num,
        system = ?fragment.system,
        "Raw measurement fragment"
    );
    if !ctx.state.in_session {
        debug!("No fix session, raw measurement ignored");
        return;
    }

    let buffer = ctx.state.raw_measurements.get_or_insert_with(Default::default);
    let ref_fcount = fragment
        .system_time_ext
        .map(|ext| ext.ref_fcount)
        .unwrap_or_default();
    // A changed frame counter means the first fragment of this epoch was lost
    if fragment.seq_num == 1 || ref_fcount != buffer.ref_fcount {
        buffer.restart(ref_fcount, fragment.nhz_measurement.unwrap_or(false));
    }

    if fragment.system == SvSystem::Unknown {
        debug!("Unknown satellite system in raw measurement");
        return;
    }

    buffer.merge_header(fragment);
    buffer.push_satellites(fragment);

    if fragment.seq_num == fragment.max_message_num {
        let mut set = std::mem::take(&mut buffer.set);
        set.header
            .stamp(clock::boot_time(), ctx.config.ap_timestamp_uncertainty_ms);
        let satellites = set.measurements.len();
        debug!(ref_fcount, satellites, "Reporting raw measurement set");

        ctx.engine.report_sv_measurement(&set);
        ctx.metrics.inc_measurement_sets();
        observability::record_measurement_flushed("raw", satellites);
    }
}
