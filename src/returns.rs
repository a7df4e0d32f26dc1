//! Reading the signal carried by the URL the user comes back on.
//!
//! * `/success?session_id=…`: the payment page finished; the reference
//!   still has to be verified.
//! * `?canceled=true`: the user backed out of checkout.
//! * `?restored=true`: a hand-off snapshot should be restored.
//!
//! Anything else is [`ReturnSignal::None`], a no-op.

use url::Url;

pub const SUCCESS_PATH: &str = "success";
pub const PARAM_CANCELED: &str = "canceled";
pub const PARAM_RESTORED: &str = "restored";
pub const PARAM_SESSION: &str = "session_id";

pub const CANCELED_NOTICE: &str = "Payment was canceled";
pub const RESTORED_NOTICE: &str =
    "Your QR code design has been restored! Download with Pro features now.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnSignal {
    None,
    Canceled,
    Paid { reference: Option<String> },
    Restore,
}

/// Classifies a return URL. The success path wins over query markers.
pub fn parse_return(url: &Url) -> ReturnSignal {
    let mut canceled = false;
    let mut restore = false;
    let mut reference = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            PARAM_CANCELED => canceled |= value == "true",
            PARAM_RESTORED => restore |= value == "true",
            PARAM_SESSION => {
                if !value.is_empty() {
                    reference = Some(value.to_string());
                }
            }
            _ => {}
        }
    }

    let on_success_page = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .is_some_and(|last| last == SUCCESS_PATH);

    if on_success_page {
        ReturnSignal::Paid { reference }
    } else if canceled {
        ReturnSignal::Canceled
    } else if restore {
        ReturnSignal::Restore
    } else {
        ReturnSignal::None
    }
}

/// `url` with every return marker removed from the query.
pub fn strip_signal(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !matches!(k.as_ref(), PARAM_CANCELED | PARAM_RESTORED | PARAM_SESSION))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut clean = url.clone();
    if kept.is_empty() {
        clean.set_query(None);
    } else {
        clean.query_pairs_mut().clear().extend_pairs(kept);
    }
    clean
}

/// Where to send the user after a verified payment when a design is waiting.
pub fn restore_location(app_base: &Url) -> Url {
    let mut url = app_base.clone();
    url.set_query(None);
    url.query_pairs_mut().append_pair(PARAM_RESTORED, "true");
    url
}
