//! Turn orchestration for Lucy.
//!
//! The agent wraps the deterministic conversation tracker from `lucy-core` with the parts that
//! talk to the outside world:
//!
//! 1. **Responding** (`responder`): a reply is drafted from templates and optionally rephrased
//!    by a language model behind [`llm::LlmClient`].
//! 2. **Guarding** (`guardrails`): model replies that alter offer terms are discarded.
//! 3. **Recording** (`runtime`): accepted and declined offers go to the acceptance ledger.
//!
//! The language model is strictly a translator. Loan amounts, rates and dates always come from
//! the core offer engine.

pub mod guardrails;
pub mod llm;
pub mod responder;
pub mod runtime;
pub mod templates;

pub use llm::{HttpLlmClient, LlmClient};
pub use responder::{LlmResponder, Responder, ResponseRequest, TemplateResponder};
pub use runtime::{LucyRuntime, TurnReply};
pub use templates::{TemplateCatalog, TemplateError};
