use netsoc_core::{Alert, AlertKind, ConnState, EventPayload, EventRecord};

use super::EventRule;

/// Authentication attempts above which an SSH session is brute force.
pub const BRUTE_FORCE_ATTEMPTS: u32 = 5;

/// Partial-handshake states that indicate SSH scanning.
pub const RECON_STATES: &[ConnState] = &[ConnState::OTH, ConnState::S0];

pub struct SshBruteForce;

impl EventRule for SshBruteForce {
    fn name(&self) -> &'static str {
        "ssh_brute_force"
    }

    fn evaluate(&self, event: &EventRecord) -> Option<Alert> {
        let EventPayload::Ssh(ssh) = &event.payload else {
            return None;
        };
        let attempts = ssh.auth_attempts.filter(|&n| n > BRUTE_FORCE_ATTEMPTS)?;

        Some(Alert::new(
            AlertKind::SshBruteForce,
            event.timestamp,
            &event.source_host,
            &event.dest_host,
            &format!(
                "Multiple SSH auth attempts ({}) from {} to {}",
                attempts, event.source_host, event.dest_host
            ),
        ))
    }
}

pub struct SshRecon;

impl EventRule for SshRecon {
    fn name(&self) -> &'static str {
        "ssh_recon"
    }

    fn evaluate(&self, event: &EventRecord) -> Option<Alert> {
        let EventPayload::Ssh(ssh) = &event.payload else {
            return None;
        };
        let state = ssh.conn_state.as_ref().filter(|s| RECON_STATES.contains(s))?;

        Some(Alert::new(
            AlertKind::SshRecon,
            event.timestamp,
            &event.source_host,
            &event.dest_host,
            &format!(
                "SSH partial handshake ({}) from {} to {}",
                state, event.source_host, event.dest_host
            ),
        ))
    }
}
