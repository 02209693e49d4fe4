//! Language server core: document sync, analysis sequencing, and
//! epoch-ordered diagnostic publication.

pub mod analysis;
pub mod codec;
pub mod delimiters;
pub mod dispatch;
pub mod protocol;
pub mod reindex;
pub mod reporter;
pub mod server;
pub mod types;

pub use analysis::{AnalysisEngine, Infeasible};
pub use delimiters::DelimiterEngine;
pub use dispatch::{Dispatcher, ReindexJob, ReindexResult, SlowPathJob, SlowPathResult, Step};
pub use reporter::{ErrorReporter, FileErrorStatus};
pub use server::{Exit, run};
pub use types::{EngineConfig, ServerConfig};
