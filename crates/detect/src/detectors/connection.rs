use netsoc_core::{Alert, AlertKind, ConnState, EventPayload, EventRecord};

use super::EventRule;

/// Connection states that mean no reply, rejection, or originator reset.
pub const FAILED_STATES: &[ConnState] = &[ConnState::S0, ConnState::REJ, ConnState::RSTO];

/// Bytes in either direction above which a single connection is flagged.
pub const HIGH_TRANSFER_BYTES: u64 = 5_000_000;

/// Connection events that never completed.
pub struct FailedConnection;

impl EventRule for FailedConnection {
    fn name(&self) -> &'static str {
        "failed_connection"
    }

    fn evaluate(&self, event: &EventRecord) -> Option<Alert> {
        let EventPayload::Connection(conn) = &event.payload else {
            return None;
        };
        let state = conn.conn_state.as_ref().filter(|s| FAILED_STATES.contains(s))?;

        let proto = event.proto.as_deref().unwrap_or("unknown");
        Some(Alert::new(
            AlertKind::FailedConnection,
            event.timestamp,
            &event.source_host,
            &event.dest_host,
            &format!(
                "Connection {} -> {} failed ({}) over {}",
                event.source_host, event.dest_host, state, proto
            ),
        ))
    }
}

/// Fixed-threshold bulk transfer rule. Fires alongside the volume scorer
/// when both trip on the same connection.
pub struct HighDataTransfer;

impl EventRule for HighDataTransfer {
    fn name(&self) -> &'static str {
        "high_data_transfer"
    }

    fn evaluate(&self, event: &EventRecord) -> Option<Alert> {
        let EventPayload::Connection(conn) = &event.payload else {
            return None;
        };
        let over = |b: Option<u64>| b.is_some_and(|b| b > HIGH_TRANSFER_BYTES);
        if !over(conn.resp_bytes) && !over(conn.orig_bytes) {
            return None;
        }

        let fmt_bytes = |b: Option<u64>| b.map_or_else(|| "-".to_string(), |b| b.to_string());
        Some(Alert::new(
            AlertKind::HighDataTransfer,
            event.timestamp,
            &event.source_host,
            &event.dest_host,
            &format!(
                "High data transfer {} -> {} (resp {} bytes, orig {} bytes)",
                event.source_host,
                event.dest_host,
                fmt_bytes(conn.resp_bytes),
                fmt_bytes(conn.orig_bytes)
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::*;

    #[test]
    fn failed_states_fire() {
        for state in ["S0", "REJ", "RSTO"] {
            let alert = FailedConnection.evaluate(&conn(0, state, 0, 0)).unwrap();
            assert_eq!(alert.kind, AlertKind::FailedConnection);
            assert!(alert.description().contains(state));
            assert!(alert.description().contains("10.0.0.5"));
            assert!(alert.description().contains("10.0.0.9"));
        }
    }

    #[test]
    fn established_and_other_kinds_do_not_fire() {
        assert!(FailedConnection.evaluate(&conn(0, "SF", 0, 0)).is_none());
        assert!(FailedConnection.evaluate(&ssh(0, Some("S0"), None)).is_none());
    }

    #[test]
    fn transfer_threshold_is_strict() {
        assert!(HighDataTransfer.evaluate(&conn(0, "SF", 0, HIGH_TRANSFER_BYTES)).is_none());
        let alert = HighDataTransfer
            .evaluate(&conn(0, "SF", HIGH_TRANSFER_BYTES + 1, 10))
            .unwrap();
        assert!(alert.description().contains("5000001"));
    }

    #[test]
    fn transfer_missing_byte_counts_does_not_fire() {
        let mut ev = conn(0, "SF", 0, 0);
        if let EventPayload::Connection(c) = &mut ev.payload {
            c.orig_bytes = None;
            c.resp_bytes = None;
        }
        assert!(HighDataTransfer.evaluate(&ev).is_none());
    }
}
