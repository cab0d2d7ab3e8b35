use netsoc_core::{Alert, AlertKind, EventPayload, EventRecord};

use super::{contains_any, EventRule};

/// URI substrings that indicate command execution attempts.
pub const SUSPICIOUS_URI_MARKERS: &[&str] = &["cmd.exe", "powershell"];

pub struct SuspiciousHttpRequest;

impl EventRule for SuspiciousHttpRequest {
    fn name(&self) -> &'static str {
        "suspicious_http_request"
    }

    fn evaluate(&self, event: &EventRecord) -> Option<Alert> {
        let EventPayload::Http(http) = &event.payload else {
            return None;
        };
        let uri = http.uri.as_deref()?;
        if !contains_any(uri, SUSPICIOUS_URI_MARKERS) {
            return None;
        }

        let method = http.method.as_deref().unwrap_or("GET");
        Some(Alert::new(
            AlertKind::SuspiciousHttpRequest,
            event.timestamp,
            &event.source_host,
            &event.dest_host,
            &format!("Suspicious HTTP {} to {}: {}", method, event.dest_host, uri),
        ))
    }
}
