pub mod mapper;
pub mod provider;
pub mod providers;
pub mod reporter;
pub mod retrieval;
pub mod summarizer;

pub use mapper::{map_episodes_to_tactics, MapperError, TacticMapper, TacticMappings};
pub use provider::{LlmError, LlmProvider, Message, Role};
pub use providers::create_provider;
pub use reporter::explain_tactic;
pub use retrieval::{Hit, RetrievalError, RetrievalIndex, Retriever};
pub use summarizer::{summarize_events, SocSummary, SummarizerError, DEFAULT_EVENT_FILTER};
