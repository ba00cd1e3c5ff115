//! Library side of the `cohort` command: logging setup and the run pipeline.

pub mod logging;
pub mod pipeline;
