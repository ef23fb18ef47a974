//! The logic behind each endpoint.

mod assistant;
mod explain;
mod invoice;
mod rag;

pub use assistant::{AssistantService, DEFAULT_SESSION};
pub use explain::{CostEstimator, ExplainService};
pub use invoice::{Invoice, InvoiceService, strip_code_fences};
pub use rag::{RagService, format_context};
