//! Interview orchestration: the per-call state machine, the voice directives
//! it emits, the fixed interview script, and post-interview reporting.

mod directive;
mod machine;
mod report;
pub mod script;

pub use directive::{VoiceDirective, VoiceResponse};
pub use machine::{CallbackEvent, InterviewError, InterviewMachine, InterviewSettings};
pub use report::{FileReportHook, InterviewReport, PostInterviewHook};
