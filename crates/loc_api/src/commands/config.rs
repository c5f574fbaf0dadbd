//! Engine configuration setters and queries

use contracts::{
    AGlonassProtocolMask, ConstrainedTuncReq, EngineLock, GpsLock, LocationError, LocationResult,
    LockSubType, LppConfigMask, LppProfile, LppeMask, NativeSuplVersion, ProtocolConfigReq,
    Request, ResponsePayload, SensorPerfControl, SensorPerfControlReq, SensorProperties,
    SuplVersion, Transport,
};
use tracing::{debug, warn};

use crate::adapter::LocApi;
use crate::bridge::{location_result, success_or_general_failure};

/// Raw sensor control mode meaning "leave unchanged"
const SENSOR_CONTROL_MODE_UNSET: i32 = 2;

fn supl_version(version: SuplVersion) -> NativeSuplVersion {
    match version {
        SuplVersion::V1_0_0 => NativeSuplVersion::V1_0,
        SuplVersion::V2_0_0 => NativeSuplVersion::V2_0,
        SuplVersion::V2_0_2 => NativeSuplVersion::V2_0_2,
    }
}

fn lpp_config(profile: LppProfile) -> LppConfigMask {
    match profile {
        LppProfile::Rrlp => LppConfigMask::empty(),
        LppProfile::UserPlane => LppConfigMask::USER_PLANE,
        LppProfile::ControlPlane => LppConfigMask::CONTROL_PLANE,
        LppProfile::UserPlaneAndControlPlane => {
            LppConfigMask::USER_PLANE | LppConfigMask::CONTROL_PLANE
        }
    }
}

fn engine_lock(lock: GpsLock) -> EngineLock {
    match lock {
        GpsLock::None => EngineLock::None,
        GpsLock::Mo => EngineLock::Mi,
        GpsLock::Ni => EngineLock::Mt,
        GpsLock::MoAndNi => EngineLock::All,
    }
}

fn gps_lock(lock: EngineLock) -> GpsLock {
    match lock {
        EngineLock::None => GpsLock::None,
        EngineLock::Mi => GpsLock::Mo,
        EngineLock::Mt => GpsLock::Ni,
        EngineLock::All => GpsLock::MoAndNi,
    }
}

fn sensor_perf_request(config: &SensorPerfControl) -> SensorPerfControlReq {
    SensorPerfControlReq {
        performance_control_mode: (config.control_mode != SENSOR_CONTROL_MODE_UNSET)
            .then_some(config.control_mode),
        accel_sampling: config.accel,
        gyro_sampling: config.gyro,
        accel_sampling_high: config.accel_high,
        gyro_sampling_high: config.gyro_high,
        algorithm_config: config.algorithm_config,
    }
}

impl<T: Transport + Sync + 'static> LocApi<T> {
    async fn set_protocol_config(&mut self, request: ProtocolConfigReq) -> LocationResult {
        debug!(?request, "Setting protocol configuration");
        let result = self
            .sync_send(Request::SetProtocolConfigParameters(request))
            .await;
        success_or_general_failure(&result)
    }

    pub async fn set_supl_version(&mut self, version: SuplVersion) -> LocationResult {
        self.set_protocol_config(ProtocolConfigReq {
            supl_version: Some(supl_version(version)),
            ..Default::default()
        })
        .await
    }

    pub async fn set_lpp_config(&mut self, profile: LppProfile) -> LocationResult {
        self.set_protocol_config(ProtocolConfigReq {
            lpp_config: Some(lpp_config(profile)),
            ..Default::default()
        })
        .await
    }

    pub async fn set_aglonass_protocol(&mut self, protocols: AGlonassProtocolMask) -> LocationResult {
        self.set_protocol_config(ProtocolConfigReq {
            assisted_glonass_protocol: Some(protocols),
            ..Default::default()
        })
        .await
    }

    pub async fn set_lppe_protocol_cp(&mut self, lppe: LppeMask) -> LocationResult {
        self.set_protocol_config(ProtocolConfigReq {
            lppe_cp_config: Some(lppe),
            ..Default::default()
        })
        .await
    }

    pub async fn set_lppe_protocol_up(&mut self, lppe: LppeMask) -> LocationResult {
        self.set_protocol_config(ProtocolConfigReq {
            lppe_up_config: Some(lppe),
            ..Default::default()
        })
        .await
    }

    /// Select NMEA sentence types; unchanged types are not resent
    pub async fn set_nmea_types(&mut self, sentence_types: u32) -> LocationResult {
        if self.state.nmea_types == Some(sentence_types) {
            debug!(sentence_types, "NMEA types unchanged");
            return Ok(());
        }
        let result = self
            .sync_send(Request::SetNmeaTypes { sentence_types })
            .await;
        self.state.nmea_types = Some(sentence_types);
        location_result(&result)
    }

    pub async fn set_sensor_properties(&mut self, properties: &SensorProperties) -> LocationResult {
        let result = self
            .sync_send(Request::SetSensorProperties(*properties))
            .await;
        location_result(&result)
    }

    pub async fn set_sensor_perf_control_config(&mut self, config: &SensorPerfControl) -> LocationResult {
        let result = self
            .sync_send(Request::SetSensorPerformanceControlConfig(
                sensor_perf_request(config),
            ))
            .await;
        location_result(&result)
    }

    pub async fn set_gps_lock(&mut self, lock: GpsLock) -> LocationResult {
        let result = self
            .sync_send(Request::SetEngineLock {
                lock: engine_lock(lock),
                sub_type: LockSubType::All,
            })
            .await;
        success_or_general_failure(&result)
    }

    pub async fn get_gps_lock(&mut self, sub_type: LockSubType) -> Result<GpsLock, LocationError> {
        let result = self.sync_send(Request::GetEngineLock { sub_type }).await;
        success_or_general_failure(&result)?;
        match result.map(|resp| resp.payload) {
            Ok(ResponsePayload::EngineLock(Some(lock))) => Ok(gps_lock(lock)),
            _ => {
                warn!(?sub_type, "Engine lock missing from reply");
                Err(LocationError::GeneralFailure)
            }
        }
    }

    /// Constrain the time uncertainty; zero values leave the engine default
    pub async fn set_constrained_tunc(
        &mut self,
        enabled: bool,
        tunc_constraint: f32,
        energy_budget: u32,
    ) -> LocationResult {
        let request = ConstrainedTuncReq {
            enabled,
            tunc_constraint: (tunc_constraint > 0.0).then_some(tunc_constraint),
            energy_budget: (energy_budget != 0).then_some(energy_budget),
        };
        let result = self.sync_send(Request::SetConstrainedTuncMode(request)).await;
        success_or_general_failure(&result)
    }

    pub async fn set_position_assisted_clock_estimator(&mut self, enabled: bool) -> LocationResult {
        let result = self
            .sync_send(Request::EnablePositionAssistedClockEst { enabled })
            .await;
        success_or_general_failure(&result)
    }

    /// Query the engine's energy use; failures report `u64::MAX`
    pub async fn get_gnss_energy_consumed(&mut self) -> LocationResult {
        let result = self.sync_send(Request::QueryGnssEnergyConsumed).await;
        let energy = match &result {
            Ok(resp) if resp.status.is_success() => match resp.payload {
                ResponsePayload::EnergyConsumed { since_first_boot } => Some(since_first_boot),
                _ => None,
            },
            _ => None,
        };
        match energy {
            Some(since_first_boot) => {
                self.engine.report_gnss_eng_energy_consumed(since_first_boot);
                Ok(())
            }
            None => {
                warn!(result = ?result, "Energy query failed");
                self.engine.report_gnss_eng_energy_consumed(u64::MAX);
                Err(LocationError::GeneralFailure)
            }
        }
    }
}
