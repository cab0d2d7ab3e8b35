//! The composed detection and correlation entry points used by the glue.

use tracing::info;

use netsoc_core::{Alert, DetectionConfig, Episode, EventRecord};

use crate::anomaly::AnomalyScorer;
use crate::detectors::{DetectorSet, HighEntropyDnsQuery, IocList, IocMatch, PerEvent};
use crate::timeline::{TimelineBuilder, TimelineError};

/// Run every fixed rule, the volume scorer and DNS entropy scoring,
/// stable-sorted by timestamp.
pub fn generate_alerts(events: &[EventRecord], config: &DetectionConfig) -> Vec<Alert> {
    generate_alerts_with_iocs(events, config, None)
}

/// [`generate_alerts`] plus an IOC match rule when a non-empty list is given.
pub fn generate_alerts_with_iocs(
    events: &[EventRecord],
    config: &DetectionConfig,
    iocs: Option<&IocList>,
) -> Vec<Alert> {
    let mut set = DetectorSet::standard(AnomalyScorer::from_config(config))
        .with(PerEvent(HighEntropyDnsQuery::from_config(config)));
    if let Some(list) = iocs.filter(|l| !l.is_empty()) {
        set = set.with(PerEvent(IocMatch::new(list.clone())));
    }
    let alerts = set.detect(events);
    info!(
        events = events.len(),
        alerts = alerts.len(),
        detectors = set.len(),
        "alerts generated"
    );
    alerts
}

pub fn build_timeline(alerts: &[Alert], gap_seconds: i64) -> Result<Vec<Episode>, TimelineError> {
    TimelineBuilder::new(gap_seconds)?.build(alerts)
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::test_support::*;
    use netsoc_core::AlertKind;

    #[test]
    fn end_to_end_alerts_then_episodes() {
        let mut events: Vec<EventRecord> = (0..50).map(|i| conn(i, "SF", 10, 100)).collect();
        events.push(conn(50, "SF", 10, 6_000_000));
        events.push(ssh(400, Some("S0"), Some(9)));
        events.push(dhcp(410, "10.0.0.1", "OFFER"));

        let alerts = generate_alerts(&events, &DetectionConfig::default());
        let kinds: Vec<AlertKind> = alerts.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            vec![
                AlertKind::HighDataTransfer,
                AlertKind::VolumeAnomaly,
                AlertKind::SshBruteForce,
                AlertKind::SshRecon,
            ]
        );

        let episodes = build_timeline(&alerts, 120).unwrap();
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].len(), 2);
        assert_eq!(episodes[1].len(), 2);
    }

    #[test]
    fn batch_alert_at_wall_clock_still_sorts() {
        let events = vec![dhcp(0, "10.0.0.1", "OFFER"), dhcp(1, "10.0.0.2", "OFFER")];
        let alerts = generate_alerts(&events, &DetectionConfig::default());
        assert_eq!(alerts.len(), 1);
        assert_eq!(build_timeline(&alerts, 120).unwrap().len(), 1);
    }

    #[test]
    fn entropy_and_ioc_rules_join_the_standard_set() {
        let events = vec![
            dns(0, "x7k2q9vbz3lm8wpt.badcdn.example"),
            dns(30, "updates.evil-c2.example"),
        ];
        let config = DetectionConfig::default();

        let plain = generate_alerts(&events, &config);
        let kinds: Vec<AlertKind> = plain.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AlertKind::HighEntropyDnsQuery]);

        let iocs = IocList::parse("evil-c2.example\n");
        let enriched = generate_alerts_with_iocs(&events, &config, Some(&iocs));
        let kinds: Vec<AlertKind> = enriched.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AlertKind::HighEntropyDnsQuery, AlertKind::IocMatch]);

        let empty = IocList::default();
        assert_eq!(generate_alerts_with_iocs(&events, &config, Some(&empty)), plain);
    }
}
