//! Zero-power position queries; replies arrive as transport responses

use contracts::{LocationError, LocationResult, Request, Transport};
use tracing::debug;

use crate::adapter::LocApi;

impl<T: Transport + Sync + 'static> LocApi<T> {
    pub async fn get_wwan_zpp_fix(&mut self) -> LocationResult {
        debug!("Requesting WWAN position");
        self.send(Request::GetAvailWwanPosition)
            .await
            .map_err(|_| LocationError::GeneralFailure)
    }

    pub async fn get_best_available_zpp_fix(&mut self) -> LocationResult {
        debug!("Requesting best available position");
        self.send(Request::GetBestAvailablePosition)
            .await
            .map_err(|_| LocationError::GeneralFailure)
    }
}

#[cfg(test)]
mod tests {
    use crate::adapter::test_support::adapter;
    use contracts::{AdapterConfig, AdapterEventMask, LocationError, Request};

    #[tokio::test]
    async fn test_zpp_queries_are_async() {
        let (mut api, transport, _) = adapter(AdapterConfig::default());
        assert_eq!(
            api.get_wwan_zpp_fix().await,
            Err(LocationError::GeneralFailure)
        );

        api.open(AdapterEventMask::empty()).await.unwrap();
        transport.clear_requests();
        api.get_wwan_zpp_fix().await.unwrap();
        api.get_best_available_zpp_fix().await.unwrap();

        let sent = transport.requests();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|r| !r.sync));
        assert_eq!(sent[0].request, Request::GetAvailWwanPosition);
        assert_eq!(sent[1].request, Request::GetBestAvailablePosition);
    }
}
