//! Analyst-facing explanation of one tactic across mapped episodes.

use tracing::info;

use netsoc_core::{MapperConfig, TacticMapping};

use crate::mapper::{MapperError, SYSTEM_PROMPT};
use crate::provider::{LlmProvider, Message};
use crate::retrieval::Retriever;

/// Mapped episodes rendered as `summary\nmapping` blocks.
pub fn timeline_text(mappings: &[TacticMapping]) -> String {
    mappings
        .iter()
        .map(|m| format!("{}\n{}", m.summary, m.mapping_text))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn report_prompt(tactic: &str, mappings: &[TacticMapping], context: &[String]) -> String {
    format!(
        "Tactic: {tactic}\nTimeline:\n{}\n\n\
         Explain where this tactic appears in the attack, how it fits into an adversary \
         playbook, and list 3 SOC actions to take.\nContext:\n{}",
        timeline_text(mappings),
        context.join("\n")
    )
}

/// Ask the provider where `tactic` shows up in the mapped timeline and
/// what the SOC should do about it.
pub async fn explain_tactic(
    tactic: &str,
    mappings: &[TacticMapping],
    retriever: &dyn Retriever,
    provider: &dyn LlmProvider,
    config: &MapperConfig,
) -> Result<String, MapperError> {
    let context = retriever.retrieve(tactic, config.top_k).await?;
    let prompt = report_prompt(tactic, mappings, &context);

    let text = provider
        .complete(
            vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)],
            config.temperature,
            config.max_tokens,
        )
        .await?;

    info!(tactic, episodes = mappings.len(), "tactic report generated");
    Ok(text)
}
