//! Pipeline services: sending, dispatch, recording, orchestration, and
//! result analysis.

pub mod analyzer;
pub mod dispatch;
pub mod recorder;
pub mod sender;
pub mod wafs;
