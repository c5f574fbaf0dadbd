//! Status enums carried by indications and reported to the location engine

use serde::{Deserialize, Serialize};

/// Verdict of the remote engine carried in a response indication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IndStatus {
    #[default]
    Success,
    GeneralFailure,
    Unsupported,
    InvalidParameter,
    EngineBusy,
    PhoneOffline,
    Timeout,
    ConfigNotSupported,
    InsufficientMemory,
}

impl IndStatus {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }

    /// Busy still means the engine accepted the request for later processing
    pub fn is_success_or_busy(self) -> bool {
        matches!(self, Self::Success | Self::EngineBusy)
    }
}

/// Session status attached to a position indication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SessionStatus {
    #[default]
    Success,
    InProgress,
    GeneralFailure,
    Timeout,
    UserEnd,
    BadParameter,
    PhoneOffline,
    EngineLocked,
}

/// Engine power state indication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineState {
    On,
    Off,
}

/// Fix session state indication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FixSessionState {
    Started,
    Finished,
    Unknown,
}

/// Engine status forwarded to the location engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EngineStatus {
    None,
    SessionBegin,
    SessionEnd,
    EngineOn,
    EngineOff,
}

/// Session status of a normalized position report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReportStatus {
    Success,
    Intermediate,
    Failure,
}

/// Fatal error delivered by the transport outside any request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceError {
    ServiceUnavailable,
    Other,
}
