//! Real-time chat sessions.
//!
//! - `PreemptiveWorkQueue`: serialized operations where newer work cancels
//!   older in-flight work
//! - `ActivityTracker`: idle / generating / speaking, timed by a `Clock`
//! - `reconciler`: merges or truncates the log when the user interrupts
//! - `SessionOrchestrator`: routes client messages into queued operations
//! - `run_session`: drives one session over a `Tunnel`

pub mod activity;
pub mod clock;
pub mod context;
pub mod orchestrator;
pub mod queue;
pub mod reconciler;
pub mod runner;
