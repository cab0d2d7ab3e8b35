//! Reference corpus for the retrieval index.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::document::{extract_file, DocumentType};
use crate::error::IngestError;

/// One retrievable reference text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusDocument {
    pub id: String,
    pub text: String,
}

impl CorpusDocument {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Enterprise ATT&CK tactics with a one-line description each.
const TACTICS: &[(&str, &str)] = &[
    ("Reconnaissance", "Information gathering: scanning, enumeration."),
    ("Resource Development", "Acquiring infrastructure, accounts and tooling for operations."),
    ("Initial Access", "Gaining a foothold: phishing, exploiting public-facing services, valid accounts."),
    ("Execution", "Running adversary code: command interpreters such as cmd.exe and PowerShell."),
    ("Persistence", "Keeping access across restarts and credential changes."),
    ("Privilege Escalation", "Gaining higher-level permissions on a system or network."),
    ("Defense Evasion", "Avoiding detection: obfuscation, encoding, disabling security tools."),
    ("Credential Access", "Stealing account names and passwords: brute force, credential dumping."),
    ("Discovery", "Identifying internal assets and topology."),
    ("Lateral Movement", "Moving through the environment: remote services such as SSH, SMB and RDP."),
    ("Collection", "Gathering data of interest ahead of exfiltration."),
    ("Command and Control", "Maintaining remote access."),
    ("Exfiltration", "Extracting data from systems."),
    ("Impact", "Disrupting availability or integrity: destruction, encryption, service stops."),
];

/// Built-in tactic seed documents, always present in the index.
pub fn tactic_seeds() -> Vec<CorpusDocument> {
    TACTICS
        .iter()
        .map(|(name, desc)| {
            let id = format!("mitre_{}", name.to_ascii_lowercase().replace(' ', "_"));
            CorpusDocument::new(id, format!("{name}: {desc}"))
        })
        .collect()
}

/// Tactic seeds plus every supported document under `dir`.
///
/// A missing directory yields just the seeds. Files that fail to extract
/// are logged and skipped. Each PDF page or Markdown section becomes its
/// own document.
pub fn load_corpus(dir: &Path) -> Result<Vec<CorpusDocument>, IngestError> {
    let mut docs = tactic_seeds();

    if !dir.exists() {
        warn!(dir = %dir.display(), "corpus directory missing, using tactic seeds only");
        return Ok(docs);
    }

    let mut files = 0usize;
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| IngestError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if DocumentType::from_filename(&name).is_none() {
            debug!(file = %entry.path().display(), "skipping unsupported corpus file");
            continue;
        }

        let extracted = match extract_file(entry.path()) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(file = %entry.path().display(), error = %e, "corpus extraction failed");
                continue;
            }
        };

        let rel = entry
            .path()
            .strip_prefix(dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .into_owned();
        for (i, section) in extracted.sections.into_iter().enumerate() {
            docs.push(CorpusDocument::new(format!("{rel}#{i}"), section.text));
        }
        files += 1;
    }

    info!(files, documents = docs.len(), "reference corpus loaded");
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_cover_the_core_tactics() {
        let seeds = tactic_seeds();
        let ids: Vec<&str> = seeds.iter().map(|d| d.id.as_str()).collect();
        assert!(ids.contains(&"mitre_reconnaissance"));
        assert!(ids.contains(&"mitre_command_and_control"));
        assert!(seeds
            .iter()
            .any(|d| d.text == "Exfiltration: Extracting data from systems."));
    }

    #[test]
    fn missing_directory_yields_seeds_only() {
        let docs = load_corpus(Path::new("/definitely/not/here")).unwrap();
        assert_eq!(docs.len(), TACTICS.len());
    }

    #[test]
    fn loads_text_and_markdown_sections() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "Zeek conn_state S0 means no reply.").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(
            dir.path().join("sub/guide.md"),
            "# DNS\nLong base64 labels suggest tunnelling.\n# HTTP\ncmd.exe in a URI is suspicious.",
        )
        .unwrap();
        std::fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();

        let docs = load_corpus(dir.path()).unwrap();
        let extra: Vec<&CorpusDocument> = docs.iter().skip(TACTICS.len()).collect();
        assert_eq!(extra.len(), 3);
        assert_eq!(extra[0].id, "notes.txt#0");
        assert!(extra[1].id.starts_with("sub"));
        assert!(extra[1].text.contains("base64"));
    }
}
