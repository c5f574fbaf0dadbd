//! Satellite blacklist and constellation control

use contracts::{
    BlacklistSvInd, BlacklistSvReq, ConstellationConfigInd, ConstellationControlReq,
    ConstellationStatus, GnssSvTypesMask, LocationResult, Request, ResponsePayload, SvIdConfig,
    SvTypeConfig, Transport,
};
use tracing::{debug, warn};

use crate::adapter::LocApi;
use crate::bridge::{location_result, success_or_general_failure};

fn blacklist_request(config: &SvIdConfig) -> BlacklistSvReq {
    BlacklistSvReq {
        glo_blacklist: config.glo_blacklist,
        glo_clear: !config.glo_blacklist,
        bds_blacklist: config.bds_blacklist,
        bds_clear: !config.bds_blacklist,
        qzss_blacklist: config.qzss_blacklist,
        qzss_clear: !config.qzss_blacklist,
        gal_blacklist: config.gal_blacklist,
        gal_clear: !config.gal_blacklist,
    }
}

/// Blacklist reported by the engine; absent constellations read as empty
pub(crate) fn sv_id_config(ind: &BlacklistSvInd) -> SvIdConfig {
    SvIdConfig {
        glo_blacklist: ind.glo_blacklist.unwrap_or(0),
        bds_blacklist: ind.bds_blacklist.unwrap_or(0),
        qzss_blacklist: ind.qzss_blacklist.unwrap_or(0),
        gal_blacklist: ind.gal_blacklist.unwrap_or(0),
    }
}

/// Enabled and blacklisted constellations; absent constellations are in neither set
pub(crate) fn sv_type_config(ind: &ConstellationConfigInd) -> SvTypeConfig {
    let entries: [(Option<ConstellationStatus>, GnssSvTypesMask); 4] = [
        (ind.glonass, GnssSvTypesMask::GLO),
        (ind.bds, GnssSvTypesMask::BDS),
        (ind.qzss, GnssSvTypesMask::QZSS),
        (ind.galileo, GnssSvTypesMask::GAL),
    ];
    entries
        .into_iter()
        .filter_map(|(status, bit)| status.map(|s| (s, bit)))
        .fold(SvTypeConfig::default(), |mut config, (status, bit)| {
            if status.is_enabled() {
                config.enabled |= bit;
            } else {
                config.blacklisted |= bit;
            }
            config
        })
}

fn some_if_set(mask: GnssSvTypesMask) -> Option<GnssSvTypesMask> {
    (!mask.is_empty()).then_some(mask)
}

impl<T: Transport + Sync + 'static> LocApi<T> {
    /// Replace the persistent blacklist; satellites not listed are cleared
    pub async fn set_blacklist_sv(&mut self, config: &SvIdConfig) -> LocationResult {
        let result = self
            .sync_send(Request::SetBlacklistSv(blacklist_request(config)))
            .await;
        location_result(&result)
    }

    /// The blacklist arrives later as an indication
    pub async fn get_blacklist_sv(&mut self) -> LocationResult {
        self.send(Request::GetBlacklistSv)
            .await
            .map_err(|_| contracts::LocationError::GeneralFailure)
    }

    pub async fn set_constellation_control(&mut self, config: &SvTypeConfig) -> LocationResult {
        let request = ConstellationControlReq {
            reset: false,
            enable_mask: some_if_set(config.enabled),
            disable_mask: some_if_set(config.blacklisted),
        };
        debug!(?request, "Setting constellation control");
        let result = self
            .sync_send(Request::SetConstellationControl(request))
            .await;
        location_result(&result)
    }

    pub async fn reset_constellation_control(&mut self) -> LocationResult {
        let request = ConstellationControlReq {
            reset: true,
            ..Default::default()
        };
        let result = self
            .sync_send(Request::SetConstellationControl(request))
            .await;
        location_result(&result)
    }

    /// Query the constellation configuration and report it to the engine
    pub async fn get_constellation_control(&mut self) -> LocationResult {
        let result = self.sync_send(Request::GetConstellationControl).await;
        let status = success_or_general_failure(&result);
        match result.map(|resp| resp.payload) {
            Ok(ResponsePayload::ConstellationConfig(ind)) if status.is_ok() => {
                self.engine.report_gnss_sv_type_config(&sv_type_config(&ind));
            }
            _ => warn!("Constellation configuration unavailable"),
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::test_support::adapter;
    use crate::mock::EngineCall;
    use contracts::{AdapterConfig, AdapterEventMask, IndStatus, MessageId, Response};

    #[test]
    fn test_blacklist_clears_complement() {
        let req = blacklist_request(&SvIdConfig {
            glo_blacklist: 0b101,
            ..Default::default()
        });
        assert_eq!(req.glo_clear, !0b101u64);
        assert_eq!(req.bds_blacklist, 0);
        assert_eq!(req.bds_clear, u64::MAX);
    }

    #[test]
    fn test_sv_type_config_from_statuses() {
        let config = sv_type_config(&ConstellationConfigInd {
            status: IndStatus::Success,
            glonass: Some(ConstellationStatus::EnabledMandatory),
            bds: Some(ConstellationStatus::DisabledByClient),
            qzss: None,
            galileo: Some(ConstellationStatus::EnabledByClient),
        });
        assert_eq!(config.enabled, GnssSvTypesMask::GLO | GnssSvTypesMask::GAL);
        assert_eq!(config.blacklisted, GnssSvTypesMask::BDS);
    }

    #[tokio::test]
    async fn test_constellation_control_requests() {
        let (mut api, transport, _) = adapter(AdapterConfig::default());
        api.open(AdapterEventMask::empty()).await.unwrap();

        api.set_constellation_control(&SvTypeConfig {
            enabled: GnssSvTypesMask::GAL,
            blacklisted: GnssSvTypesMask::empty(),
        })
        .await
        .unwrap();
        api.reset_constellation_control().await.unwrap();

        assert_eq!(
            transport.requests_for(MessageId::SetConstellationControl),
            vec![
                Request::SetConstellationControl(ConstellationControlReq {
                    reset: false,
                    enable_mask: Some(GnssSvTypesMask::GAL),
                    disable_mask: None,
                }),
                Request::SetConstellationControl(ConstellationControlReq {
                    reset: true,
                    enable_mask: None,
                    disable_mask: None,
                }),
            ]
        );
    }

    #[tokio::test]
    async fn test_get_constellation_control_reports() {
        let (mut api, transport, engine) = adapter(AdapterConfig::default());
        api.open(AdapterEventMask::empty()).await.unwrap();
        let ind = ConstellationConfigInd {
            status: IndStatus::Success,
            qzss: Some(ConstellationStatus::EnabledInternally),
            ..Default::default()
        };
        transport.respond_with(
            MessageId::GetConstellationControl,
            Response::with_payload(IndStatus::Success, ResponsePayload::ConstellationConfig(ind)),
        );

        api.get_constellation_control().await.unwrap();
        assert!(engine.calls().contains(&EngineCall::SvTypeConfig(SvTypeConfig {
            enabled: GnssSvTypesMask::QZSS,
            blacklisted: GnssSvTypesMask::empty(),
        })));
    }

    #[tokio::test]
    async fn test_get_blacklist_is_fire_and_forget() {
        let (mut api, transport, _) = adapter(AdapterConfig::default());
        api.open(AdapterEventMask::empty()).await.unwrap();
        transport.clear_requests();

        api.get_blacklist_sv().await.unwrap();
        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert!(!sent[0].sync);
        assert_eq!(sent[0].request, Request::GetBlacklistSv);
    }
}
