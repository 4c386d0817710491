//! `contentforge-ai`
//!
//! **Responsibility:** the agent capability boundary.
//!
//! - Agents are stateless: everything a stage needs arrives in its
//!   [`AgentInput`], everything it produces leaves in its [`StageOutput`].
//! - Agents never touch the job store; the workflow engine persists results.
//! - The hosted model is reached only through [`GenerationBackend`].

pub mod agent;
pub mod backend;
pub mod drafting;
pub mod openai;
pub mod result;
pub mod review;
pub mod revision;

pub use agent::{Agent, AgentInput, SharedContext};
pub use backend::{GenerationBackend, GenerationPrompt, GenerationTask, TemplateBackend};
pub use drafting::DraftingAgent;
pub use openai::{OpenAiCompatibleBackend, OpenAiCompatibleConfig};
pub use result::{GenerationError, GenerationErrorKind, StageOutput};
pub use review::ReviewAgent;
pub use revision::RevisionAgent;
