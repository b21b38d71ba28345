//! Best-effort classification of upstream failures.
//!
//! Upstream error text is not a stable contract. These markers only steer
//! which user message is shown; anything unrecognised stays an
//! [`Error::AiProvider`] carrying the raw text.

use crate::error::RefusalReason;
use crate::Error;

const RECITATION_MARKERS: &[&str] = &["RECITATION"];
const SAFETY_MARKERS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];
const AUTH_MARKERS: &[&str] = &[
    "PERMISSION_DENIED",
    "RESOURCE_EXHAUSTED",
    "API_KEY_INVALID",
    "UNAUTHENTICATED",
    "quota",
];
const AUTH_STATUSES: &[u16] = &[401, 403, 429];

/// Map a structured block/finish reason to a refusal, if it is one.
pub fn refusal_reason(reason: &str) -> Option<RefusalReason> {
    let reason = reason.to_ascii_uppercase();
    if RECITATION_MARKERS.iter().any(|m| reason.contains(m)) {
        Some(RefusalReason::Recitation)
    } else if SAFETY_MARKERS.iter().any(|m| reason.contains(m)) {
        Some(RefusalReason::Safety)
    } else {
        None
    }
}

/// Classify a failed call from its HTTP status (when known) and error text.
pub fn classify_failure(status: Option<u16>, message: &str) -> Error {
    if let Some(reason) = refusal_reason(message) {
        return Error::SafetyRejected { reason };
    }

    let auth_status = status.is_some_and(|s| AUTH_STATUSES.contains(&s))
        || (status.is_none() && AUTH_STATUSES.iter().any(|s| message.contains(&s.to_string())));
    if auth_status || AUTH_MARKERS.iter().any(|m| message.contains(m)) {
        return Error::QuotaOrAuth(message.to_string());
    }

    match status {
        Some(status) => Error::AiProvider(format!("status {}: {}", status, message)),
        None => Error::AiProvider(message.to_string()),
    }
}
