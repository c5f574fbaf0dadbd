//! Ephemeris reports for the five GPS-like and GLONASS families

use contracts::{
    BdsEphemeris, EphGnssData, EphemerisAction, EphemerisCommon, EphemerisData,
    GalEphSignalSource, GalileoEphemeris, GlonassEphemeris, GpsEphemeris, Indication,
    NativeBdsEphemeris, NativeEphemerisList, NativeGalEphemeris, NativeGloEphemeris,
    NativeGpsEphemeris, SvEphemerisReport,
};
use tracing::trace;

use super::{DecodeContext, Followup};

/// Unknown codes read as an update from an unknown source
fn action(code: u8) -> EphemerisAction {
    match code {
        1 => EphemerisAction::UpdateSrcOta,
        2 => EphemerisAction::UpdateSrcNetwork,
        3 => EphemerisAction::DeleteSrcUnknown,
        4 => EphemerisAction::DeleteSrcNetwork,
        5 => EphemerisAction::DeleteSrcOta,
        _ => EphemerisAction::UpdateSrcUnknown,
    }
}

fn signal_source(code: u8) -> GalEphSignalSource {
    match code {
        1 => GalEphSignalSource::E1b,
        2 => GalEphSignalSource::E5a,
        3 => GalEphSignalSource::E5b,
        _ => GalEphSignalSource::Unknown,
    }
}

fn common(eph: &EphGnssData) -> EphemerisCommon {
    trace!(sv_id = eph.gnss_sv_id, action = eph.update_action, "Ephemeris");
    EphemerisCommon {
        sv_id: eph.gnss_sv_id,
        action: action(eph.update_action),
        iode: eph.iode,
        a_sqrt: eph.a_sqrt,
        delta_n: eph.delta_n,
        m0: eph.m0,
        eccentricity: eph.eccentricity,
        omega0: eph.omega0,
        i0: eph.i0,
        omega: eph.omega,
        omega_dot: eph.omega_dot,
        i_dot: eph.i_dot,
        c_uc: eph.c_uc,
        c_us: eph.c_us,
        c_rc: eph.c_rc,
        c_rs: eph.c_rs,
        c_ic: eph.c_ic,
        c_is: eph.c_is,
        toe: eph.toe,
        toc: eph.toc,
        af0: eph.af0,
        af1: eph.af1,
        af2: eph.af2,
    }
}

fn gps(eph: &NativeGpsEphemeris) -> GpsEphemeris {
    GpsEphemeris {
        common: common(&eph.common),
        signal_health: eph.signal_health,
        urai: eph.urai,
        code_l2: eph.code_l2,
        data_flag_l2p: eph.data_flag_l2p,
        tgd: eph.tgd,
        fit_interval: eph.fit_interval,
        iodc: eph.iodc,
    }
}

fn glonass(eph: &NativeGloEphemeris) -> GlonassEphemeris {
    GlonassEphemeris {
        sv_id: eph.gnss_sv_id,
        action: action(eph.update_action),
        bn_health: eph.bn_health,
        ln_health: eph.ln_health,
        tb: eph.tb,
        ft: eph.ft,
        glo_m: eph.glo_m,
        en_age: eph.en_age,
        glo_frequency: eph.glo_frequency,
        p1: eph.p1,
        p2: eph.p2,
        delta_tau: eph.delta_tau,
        position: eph.position,
        velocity: eph.velocity,
        acceleration: eph.acceleration,
        tau_n: eph.tau_n,
        gamma: eph.gamma,
        toe: eph.toe,
        nt: eph.nt,
    }
}

fn bds(eph: &NativeBdsEphemeris) -> BdsEphemeris {
    BdsEphemeris {
        common: common(&eph.common),
        sv_health: eph.sv_health,
        aodc: eph.aodc,
        tgd1: eph.tgd1,
        tgd2: eph.tgd2,
        urai: eph.urai,
    }
}

fn galileo(eph: &NativeGalEphemeris) -> GalileoEphemeris {
    GalileoEphemeris {
        common: common(&eph.common),
        data_source_signal: signal_source(eph.data_source_signal),
        sis_index: eph.sis_index,
        bgd_e1_e5a: eph.bgd_e1_e5a,
        bgd_e1_e5b: eph.bgd_e1_e5b,
        sv_health: eph.sv_health,
    }
}

pub(crate) fn ephemeris_data(list: &NativeEphemerisList) -> EphemerisData {
    match list {
        NativeEphemerisList::Gps(v) => EphemerisData::Gps(v.iter().map(gps).collect()),
        NativeEphemerisList::Glonass(v) => EphemerisData::Glonass(v.iter().map(glonass).collect()),
        NativeEphemerisList::Bds(v) => EphemerisData::Bds(v.iter().map(bds).collect()),
        NativeEphemerisList::Galileo(v) => EphemerisData::Galileo(v.iter().map(galileo).collect()),
        NativeEphemerisList::Qzss(v) => EphemerisData::Qzss(v.iter().map(gps).collect()),
    }
}

pub(crate) fn decode_ephemeris(ctx: &mut DecodeContext<'_>, ind: &Indication) -> Option<Followup> {
    let Indication::Ephemeris(report) = ind else {
        return None;
    };
    let report = SvEphemerisReport {
        system_time: report.gps_system_time,
        data: ephemeris_data(&report.list),
    };
    trace!(
        constellation = ?report.data.constellation(),
        count = report.data.len(),
        "Ephemeris report"
    );
    ctx.engine.report_sv_ephemeris(&report);
    None
}
