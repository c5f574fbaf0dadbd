//! Network-initiated notify/verify requests

use contracts::{
    GnssNiNotification, Indication, NiDataCodingScheme, NiEncoding, NiNotifyVerifyReqInd,
    NiNotifyVerifyType, NiOptions, NiResponse, NiToken, NiType, NI_NO_RESPONSE_TIME_S,
};
use tracing::{debug, warn};

use super::{DecodeContext, Followup};
use crate::convert::hex_string;

/// Key of the client address entry in the notification extras
const ADDRESS_KEY: &str = "Address";

/// Type-of-number octet announcing an international number
const INTERNATIONAL_NUMBER: u8 = 0x91;

fn encoding(scheme: NiDataCodingScheme) -> NiEncoding {
    match scheme {
        NiDataCodingScheme::SuplUtf8 => NiEncoding::Utf8,
        NiDataCodingScheme::SuplUcs2 => NiEncoding::Ucs2,
        NiDataCodingScheme::SuplGsmDefault | NiDataCodingScheme::SsLanguageUnspec => {
            NiEncoding::Gsm
        }
        NiDataCodingScheme::Unknown => NiEncoding::None,
    }
}

fn bcd_digit(nibble: u8) -> Option<char> {
    match nibble {
        0..=9 => Some(char::from(b'0' + nibble)),
        0xA => Some('*'),
        0xB => Some('#'),
        0xC => Some('a'),
        0xD => Some('b'),
        0xE => Some('c'),
        _ => None,
    }
}

/// Decodes a BCD client address: low nibble first, `0xF` ends the number
pub(crate) fn decode_address(raw: &[u8]) -> String {
    let (prefix, digits) = match raw.split_first() {
        Some((&INTERNATIONAL_NUMBER, rest)) => ("+", rest),
        _ => ("", raw),
    };
    let mut address = String::from(prefix);
    for byte in digits {
        for nibble in [byte & 0x0F, byte >> 4] {
            match bcd_digit(nibble) {
                Some(c) => address.push(c),
                None => return address,
            }
        }
    }
    address
}

/// Options and default response for the network's privacy class
fn interaction(kind: NiNotifyVerifyType) -> (NiOptions, NiResponse) {
    match kind {
        NiNotifyVerifyType::NoNotifyNoVerify => (NiOptions::empty(), NiResponse::NoResponse),
        NiNotifyVerifyType::NotifyOnly => (NiOptions::NOTIFICATION, NiResponse::NoResponse),
        NiNotifyVerifyType::NotifyVerifyAllowNoResp => (
            NiOptions::NOTIFICATION | NiOptions::VERIFICATION,
            NiResponse::Accept,
        ),
        NiNotifyVerifyType::NotifyVerifyNotAllowNoResp => (
            NiOptions::NOTIFICATION | NiOptions::VERIFICATION,
            NiResponse::Deny,
        ),
        NiNotifyVerifyType::PrivacyOverride => {
            (NiOptions::PRIVACY_OVERRIDE, NiResponse::NoResponse)
        }
    }
}

/// Normalized notification, or `None` when no known payload is present
pub(crate) fn ni_notification(ind: &NiNotifyVerifyReqInd) -> Option<GnssNiNotification> {
    let (options, timeout_response) = interaction(ind.notification_type);
    let mut notification = GnssNiNotification {
        ni_type: NiType::Voice,
        options,
        timeout_s: NI_NO_RESPONSE_TIME_S,
        timeout_response,
        requestor: String::new(),
        requestor_encoding: NiEncoding::None,
        message: String::new(),
        message_encoding: NiEncoding::None,
        extras: String::new(),
    };

    if let Some(vx) = &ind.vx {
        notification.requestor = hex_string(&vx.requestor_id);
    } else if let Some(cp) = &ind.umts_cp {
        notification.ni_type = NiType::ControlPlane;
        notification.message = hex_string(&cp.notification_text);
        notification.requestor = hex_string(&cp.requestor_id.text);
        notification.message_encoding = encoding(cp.data_coding_scheme);
        notification.requestor_encoding = encoding(cp.requestor_id.data_coding_scheme);
        if !cp.client_address.is_empty() {
            notification.extras =
                format!("{ADDRESS_KEY} = {}", decode_address(&cp.client_address));
        }
    } else if let Some(supl) = &ind.supl {
        notification.ni_type = if ind.supl_emergency.is_some() {
            NiType::EmergencySupl
        } else {
            NiType::Supl
        };
        if let Some(name) = &supl.client_name {
            notification.message = hex_string(&name.text);
        }
        if let Some(requestor) = &supl.requestor_id {
            notification.requestor = hex_string(&requestor.text);
        }
        if let Some(scheme) = supl.data_coding_scheme {
            notification.message_encoding = encoding(scheme);
            notification.requestor_encoding = encoding(scheme);
        }
    } else {
        return None;
    }
    Some(notification)
}

pub(crate) fn decode_ni_request(ctx: &mut DecodeContext<'_>, ind: &Indication) -> Option<Followup> {
    let Indication::NiNotifyVerifyReq(req) = ind else {
        return None;
    };
    let Some(notification) = ni_notification(req) else {
        warn!(kind = ?req.notification_type, "NI request without a known payload");
        return None;
    };
    debug!(ni_type = ?notification.ni_type, options = ?notification.options, "NI request");
    ctx.engine
        .request_ni_notify(&notification, NiToken::new(req.as_ref().clone()));
    None
}
