//! Offline keyword hints from alert text to ATT&CK techniques.
//!
//! A cheap first pass shown next to alerts before (or without) the
//! retrieval-backed tactic mapping.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Technique {
    pub id: &'static str,
    pub name: &'static str,
}

/// Keyword table, checked in order; first match wins.
pub const KEYWORD_TECHNIQUES: &[(&str, Technique)] = &[
    ("ssh", Technique { id: "T1021.004", name: "Remote Services: SSH" }),
    ("dns", Technique { id: "T1071.004", name: "Application Layer Protocol: DNS" }),
    ("http", Technique { id: "T1071.001", name: "Application Layer Protocol: Web Traffic" }),
    ("smb", Technique { id: "T1021.002", name: "SMB/Windows Admin Shares" }),
    ("high data transfer", Technique { id: "T1041", name: "Exfiltration Over Command Channel" }),
    ("high transfer", Technique { id: "T1041", name: "Exfiltration Over Command Channel" }),
    ("recon", Technique { id: "T1595", name: "Active Scanning" }),
    ("dhcp", Technique { id: "T1557.003", name: "Adversary-in-the-Middle: DHCP Spoofing" }),
    ("uncommon port", Technique { id: "T1571", name: "Non-Standard Port" }),
];

pub const UNMAPPED: &str = "Unmapped";

/// Case-insensitive keyword lookup over an alert description.
pub fn fast_map(description: &str) -> Option<&'static Technique> {
    let lower = description.to_lowercase();
    KEYWORD_TECHNIQUES
        .iter()
        .find(|(keyword, _)| lower.contains(keyword))
        .map(|(_, technique)| technique)
}

/// `"T1041 Exfiltration Over Command Channel"` or [`UNMAPPED`].
pub fn label(description: &str) -> String {
    match fast_map(description) {
        Some(t) => format!("{} {}", t.id, t.name),
        None => UNMAPPED.to_string(),
    }
}
