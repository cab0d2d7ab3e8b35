use netsoc_core::{Alert, AlertKind, EventRecord};

use super::EventRule;

/// Destination ports considered routine on the monitored network.
pub const COMMON_PORTS: &[u16] = &[22, 53, 80, 443, 445, 3389];

/// Any event, of any kind, addressed to a port outside [`COMMON_PORTS`].
pub struct UnusualPort;

impl EventRule for UnusualPort {
    fn name(&self) -> &'static str {
        "unusual_port"
    }

    fn evaluate(&self, event: &EventRecord) -> Option<Alert> {
        let port = event.dest_port.filter(|p| !COMMON_PORTS.contains(p))?;

        Some(Alert::new(
            AlertKind::UnusualPort,
            event.timestamp,
            &event.source_host,
            &event.dest_host,
            &format!(
                "Traffic from {} to {} on uncommon port {} ({})",
                event.source_host,
                event.dest_host,
                port,
                event.kind()
            ),
        ))
    }
}
