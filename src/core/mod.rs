pub mod artifacts;
pub mod config;
pub mod error;
pub mod inputs;
pub mod invocation;
pub mod job;
pub mod runner;
pub mod types;

pub use artifacts::{ArtifactRecord, ArtifactStore, CleanupSummary};
pub use config::{ConfigLoader, DispatchConfig};
pub use error::{AppError, DefaultErrorReporter, ErrorReporter};
pub use inputs::{InputField, RawInputs, ResolvedInputs};
pub use invocation::{InvalidInputs, MergeInvocation};
pub use job::{Job, JobReport, PreparedJob};
pub use runner::{ScriptOutput, ScriptRequest, ScriptRunner, TokioScriptRunner};
pub use types::*;
