//! Network-initiated responses, location servers, data connections and SUPL certificates

use bytes::Bytes;
use contracts::{
    AgpsBearer, ApnTypeMask, DerCertificate, LocationError, LocationResult, NativeApnProfile,
    NativeServerType, NiResponse, NiToken, NiUserResponse, PdnType, Request, ServerAddress,
    ServerConnStatusReq, ServerType, SetServerReq, Transport, AGPS_CERTIFICATE_MAX_SLOTS,
    MAX_SERVER_ADDR_LENGTH, MAX_SUPL_CERT_LENGTH,
};
use tracing::{debug, info, warn};

use crate::adapter::LocApi;
use crate::bridge::success_or_general_failure;
use crate::convert;

/// Content of the placeholder injected into a slot before it is deleted
const PLACEHOLDER_CERTIFICATE: [u8; 1] = [1];

fn ni_user_response(response: NiResponse) -> NiUserResponse {
    match response {
        NiResponse::Accept => NiUserResponse::Accept,
        NiResponse::Deny => NiUserResponse::Deny,
        NiResponse::NoResponse => NiUserResponse::NoResponse,
    }
}

fn url_server_type(server_type: ServerType) -> NativeServerType {
    match server_type {
        ServerType::MoSupl => NativeServerType::CustomSlp,
        _ => NativeServerType::UmtsSlp,
    }
}

fn ipv4_server_type(server_type: ServerType) -> NativeServerType {
    match server_type {
        ServerType::Mpc => NativeServerType::CdmaMpc,
        ServerType::CustomPde => NativeServerType::CustomPde,
        _ => NativeServerType::CdmaPde,
    }
}

fn pdn_type(bearer: AgpsBearer) -> Option<PdnType> {
    match bearer {
        AgpsBearer::Ipv4 => Some(PdnType::Ipv4),
        AgpsBearer::Ipv6 => Some(PdnType::Ipv6),
        AgpsBearer::Ipv4v6 => Some(PdnType::Ipv4v6),
        AgpsBearer::Invalid => None,
    }
}

impl<T: Transport + Sync + 'static> LocApi<T> {
    /// Answer a network-initiated request, quoting its original payloads
    pub async fn inform_ni_response(&mut self, response: NiResponse, token: &NiToken) -> LocationResult {
        debug!(?response, "Informing NI response");
        let result = self
            .sync_send(Request::NiUserResponse {
                response: ni_user_response(response),
                request: Box::new(token.request().clone()),
            })
            .await;
        success_or_general_failure(&result)
    }

    pub async fn set_server_url(&mut self, url: &str, server_type: ServerType) -> LocationResult {
        if url.len() > MAX_SERVER_ADDR_LENGTH {
            warn!(len = url.len(), "Server URL too long");
            return Err(LocationError::InvalidParameter);
        }
        let request = SetServerReq {
            server_type: url_server_type(server_type),
            address: ServerAddress::Url(url.to_owned()),
        };
        info!(url, server_type = ?request.server_type, "Setting location server");
        let result = self.sync_send(Request::SetServer(request)).await;
        success_or_general_failure(&result)
    }

    pub async fn set_server_ipv4(&mut self, addr: u32, port: u16, server_type: ServerType) -> LocationResult {
        let request = SetServerReq {
            server_type: ipv4_server_type(server_type),
            address: ServerAddress::Ipv4 { addr, port },
        };
        info!(addr, port, server_type = ?request.server_type, "Setting location server");
        let result = self.sync_send(Request::SetServer(request)).await;
        success_or_general_failure(&result)
    }

    /// Report the outcome of a data connection the engine asked for
    pub async fn atl_open_status(
        &mut self,
        conn_handle: u32,
        success: bool,
        apn: &str,
        bearer: AgpsBearer,
        apn_type_mask: ApnTypeMask,
    ) {
        let mut request = ServerConnStatusReq {
            conn_handle,
            open: true,
            success,
            apn_profile: None,
            apn_type_mask: None,
        };
        if success {
            request.apn_profile = pdn_type(bearer).map(|pdn_type| NativeApnProfile {
                pdn_type,
                apn_name: apn.to_owned(),
            });
            if !apn_type_mask.is_empty() {
                request.apn_type_mask = Some(convert::native_apn_type_mask(apn_type_mask));
            }
        }
        debug!(conn_handle, success, ?bearer, "Informing data connection open status");
        let result = self
            .sync_send(Request::InformLocationServerConnStatus(request))
            .await;
        if let Err(e) = success_or_general_failure(&result) {
            warn!(conn_handle, error = %e, "Data connection open status not accepted");
        }
    }

    pub async fn atl_close_status(&mut self, conn_handle: u32, success: bool) {
        let request = ServerConnStatusReq {
            conn_handle,
            open: false,
            success,
            apn_profile: None,
            apn_type_mask: None,
        };
        debug!(conn_handle, success, "Informing data connection close status");
        let result = self
            .sync_send(Request::InformLocationServerConnStatus(request))
            .await;
        if let Err(e) = success_or_general_failure(&result) {
            warn!(conn_handle, error = %e, "Data connection close status not accepted");
        }
    }

    /// Install SUPL certificates into the slots selected by `slot_mask`
    ///
    /// Selected slots take the next certificate in order. A selected slot with no
    /// certificate left is cleared: a placeholder is injected, then deleted. Failures
    /// are logged per slot.
    pub async fn install_agps_cert(&mut self, certs: &[DerCertificate], slot_mask: u32) {
        let mut next = 0;
        for slot in 0..AGPS_CERTIFICATE_MAX_SLOTS {
            if slot_mask & (1 << slot) == 0 {
                continue;
            }
            match certs.get(next).filter(|cert| !cert.data.is_empty()) {
                Some(cert) => {
                    next += 1;
                    if cert.data.len() > MAX_SUPL_CERT_LENGTH {
                        warn!(slot, len = cert.data.len(), "SUPL certificate too long, skipped");
                        continue;
                    }
                    let data = Bytes::copy_from_slice(&cert.data);
                    self.inject_supl_certificate(slot, data).await;
                }
                None => {
                    let placeholder = Bytes::from_static(&PLACEHOLDER_CERTIFICATE);
                    self.inject_supl_certificate(slot, placeholder).await;
                    let result = self.sync_send(Request::DeleteSuplCertificate { slot }).await;
                    if success_or_general_failure(&result).is_err() {
                        warn!(slot, "SUPL certificate deletion failed");
                    }
                }
            }
        }
    }

    async fn inject_supl_certificate(&mut self, slot: u8, data: Bytes) {
        let len = data.len();
        let result = self
            .sync_send(Request::InjectSuplCertificate { slot, data })
            .await;
        match success_or_general_failure(&result) {
            Ok(()) => debug!(slot, len, "SUPL certificate injected"),
            Err(_) => warn!(slot, len, "SUPL certificate injection failed"),
        }
    }
}
