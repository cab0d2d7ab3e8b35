use chrono::{DateTime, Utc};
use indexmap::IndexSet;

use netsoc_core::{Alert, AlertKind, EventPayload, EventRecord};

use super::{DetectionContext, Detector};

/// One DHCP offer observed on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct DhcpOffer {
    pub responder: String,
    pub at: DateTime<Utc>,
}

/// Flags a network where more than one host answers DHCP discovery.
///
/// Runs in two phases: [`observe`](Self::observe) extracts offers per event,
/// [`aggregate`](Self::aggregate) decides over the whole batch.
pub struct RogueDhcpServer;

impl RogueDhcpServer {
    pub fn observe(&self, events: &[EventRecord]) -> Vec<DhcpOffer> {
        events
            .iter()
            .filter_map(|e| match &e.payload {
                EventPayload::Dhcp(d) => {
                    let is_offer = d
                        .msg_type
                        .as_deref()
                        .is_some_and(|m| m.to_ascii_lowercase().contains("offer"));
                    is_offer.then(|| DhcpOffer {
                        responder: e.dest_host.clone(),
                        at: e.timestamp,
                    })
                }
                _ => None,
            })
            .collect()
    }

    /// Distinct offering hosts in first-seen order. The alert description is
    /// length-capped, so this is the full list when many servers answer.
    pub fn responders<'a>(&self, offers: &'a [DhcpOffer]) -> IndexSet<&'a str> {
        offers.iter().map(|o| o.responder.as_str()).collect()
    }

    /// At most one alert per batch, stamped with the processing time.
    /// The responder count leads the description so it survives truncation.
    pub fn aggregate(&self, offers: &[DhcpOffer], now: DateTime<Utc>) -> Option<Alert> {
        let responders = self.responders(offers);
        if responders.len() <= 1 {
            return None;
        }

        let list = responders.iter().copied().collect::<Vec<_>>().join(", ");
        Some(Alert::new(
            AlertKind::RogueDhcpServer,
            now,
            "multiple",
            "broadcast",
            &format!(
                "Multiple DHCP servers offering leases ({}): {}",
                responders.len(),
                list
            ),
        ))
    }
}

impl Detector for RogueDhcpServer {
    fn name(&self) -> &'static str {
        "rogue_dhcp_server"
    }

    fn detect(&self, events: &[EventRecord], ctx: &DetectionContext) -> Vec<Alert> {
        let offers = self.observe(events);
        self.aggregate(&offers, ctx.now).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::*;

    #[test]
    fn single_server_is_quiet() {
        let events = vec![dhcp(0, "10.0.0.1", "OFFER"), dhcp(5, "10.0.0.1", "offer")];
        let alerts = RogueDhcpServer.detect(&events, &DetectionContext::at(ts(60)));
        assert!(alerts.is_empty());
    }

    #[test]
    fn two_servers_raise_one_alert_at_processing_time() {
        let events = vec![
            dhcp(0, "10.0.0.1", "DHCPOFFER"),
            dhcp(1, "10.0.0.66", "Offer"),
            dhcp(2, "10.0.0.1", "OFFER"),
        ];
        let alerts = RogueDhcpServer.detect(&events, &DetectionContext::at(ts(60)));
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].timestamp, Some(ts(60)));
        assert!(alerts[0].description().contains("10.0.0.1, 10.0.0.66"));
    }

    #[test]
    fn non_offers_are_ignored() {
        let events = vec![dhcp(0, "10.0.0.1", "OFFER"), dhcp(1, "10.0.0.66", "ACK")];
        assert_eq!(RogueDhcpServer.observe(&events).len(), 1);
        assert!(RogueDhcpServer.detect(&events, &DetectionContext::at(ts(0))).is_empty());
    }

    #[test]
    fn many_servers_keep_the_count_when_the_list_is_cut() {
        let events: Vec<EventRecord> = (0..20)
            .map(|i| dhcp(i, &format!("192.168.100.{}", i + 10), "OFFER"))
            .collect();
        let offers = RogueDhcpServer.observe(&events);
        assert_eq!(RogueDhcpServer.responders(&offers).len(), 20);

        let alert = RogueDhcpServer.aggregate(&offers, ts(60)).unwrap();
        let desc = alert.description();
        assert!(desc.starts_with("Multiple DHCP servers offering leases (20): 192.168.100.10, "));
        assert!(desc.ends_with("...[truncated]"));
        assert_eq!(desc.chars().count(), netsoc_core::MAX_DESCRIPTION_CHARS);
        assert!(!desc.contains("192.168.100.29"));
    }
}
