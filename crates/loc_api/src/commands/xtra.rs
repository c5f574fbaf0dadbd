//! Predicted-orbit (XTRA) injection and server discovery

use bytes::Bytes;
use contracts::{
    LocationError, LocationResult, Request, ResponsePayload, Transport, XtraVersionCheck,
    XtraVersionCheckMode, MAX_PREDICTED_ORBITS_PART_LEN,
};
use tracing::{debug, error, info, warn};

use crate::adapter::LocApi;
use crate::bridge::success_or_general_failure;

/// XTRA servers forwarded to the engine at most
const MAX_XTRA_SERVERS: usize = 3;

fn version_check_mode(check: XtraVersionCheck) -> XtraVersionCheckMode {
    match check {
        XtraVersionCheck::Disabled => XtraVersionCheckMode::Disable,
        XtraVersionCheck::Auto => XtraVersionCheckMode::Auto,
        XtraVersionCheck::Xtra2 => XtraVersionCheckMode::Xtra2,
        XtraVersionCheck::Xtra3 => XtraVersionCheckMode::Xtra3,
    }
}

impl<T: Transport + Sync + 'static> LocApi<T> {
    /// Inject predicted-orbit data in parts of at most 1024 bytes
    ///
    /// Parts are numbered from 1 and each must be acknowledged with its own part
    /// number; the first failure aborts the injection. Returns the bytes injected.
    pub async fn set_xtra_data(&mut self, data: Bytes) -> Result<usize, LocationError> {
        if data.is_empty() {
            warn!("Empty XTRA data");
            return Err(LocationError::InvalidParameter);
        }
        let total_size = u32::try_from(data.len()).map_err(|_| LocationError::InvalidParameter)?;
        let total_parts = u16::try_from(data.len().div_ceil(MAX_PREDICTED_ORBITS_PART_LEN))
            .map_err(|_| LocationError::InvalidParameter)?;
        info!(total_size, total_parts, "Injecting XTRA data");

        let mut injected = 0;
        for part_num in 1..=total_parts {
            let start = usize::from(part_num - 1) * MAX_PREDICTED_ORBITS_PART_LEN;
            let end = (start + MAX_PREDICTED_ORBITS_PART_LEN).min(data.len());
            let part = data.slice(start..end);
            let len = part.len();

            let result = self
                .sync_send(Request::InjectPredictedOrbitsData {
                    total_size,
                    total_parts,
                    part_num,
                    data: part,
                })
                .await;

            let acked = match &result {
                Ok(resp) if resp.status.is_success() => match resp.payload {
                    ResponsePayload::PredictedOrbitsPart { part_num: acked } => acked == part_num,
                    _ => false,
                },
                _ => false,
            };
            if !acked {
                error!(part_num, total_parts, result = ?result, "XTRA part injection failed");
                observability::record_xtra_bytes_injected(injected);
                return Err(LocationError::GeneralFailure);
            }
            injected += len;
            debug!(part_num, len, "XTRA part injected");
        }

        observability::record_xtra_bytes_injected(injected);
        Ok(injected)
    }

    /// Ask the engine where to download XTRA data from
    pub async fn request_xtra_server(&mut self) -> LocationResult {
        let result = self.sync_send(Request::GetPredictedOrbitsDataSource).await;
        let status = success_or_general_failure(&result);
        if let Ok(resp) = result {
            match resp.payload {
                ResponsePayload::XtraServers(urls) if status.is_ok() && !urls.is_empty() => {
                    let count = urls.len().min(MAX_XTRA_SERVERS);
                    debug!(count, "XTRA servers received");
                    self.engine.report_xtra_server(&urls[..count]);
                }
                _ => debug!("No XTRA server reported"),
            }
        }
        status
    }

    pub async fn set_xtra_version_check(&mut self, check: u32) -> LocationResult {
        let mode = version_check_mode(XtraVersionCheck::from_raw(check));
        debug!(check, ?mode, "Setting XTRA version check");
        let result = self.sync_send(Request::SetXtraVersionCheck(mode)).await;
        success_or_general_failure(&result)
    }
}
