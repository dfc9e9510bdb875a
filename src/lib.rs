pub mod config;
pub mod constants;
pub mod error;

// Domain data shapes shared across layers
pub mod domain;

// File formats on one side, processing stages on the other
pub mod infra;
pub mod pipeline;

pub mod observability;
