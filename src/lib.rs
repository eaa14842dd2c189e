//! Phonescreen conducts automated phone-based technical interviews.
//!
//! A telephony provider places the outbound call and fires stateless HTTP
//! callbacks as the call progresses; the [`interview::InterviewMachine`] is the
//! only component with cross-request memory and drives each call through a
//! scripted introduction, two technical questions, and an open Q&A loop,
//! answering every callback with a declarative voice-response document.

pub mod api;
pub mod app;
pub mod audio;
pub mod config;
pub mod generation;
pub mod global;
pub mod interview;
pub mod session;
pub mod telephony;
pub mod transcription;
