// Observability: diagnostics sinks, logging, and metrics

pub mod diagnostics;
pub mod logging;
pub mod metrics;

pub use diagnostics::{CapturedDiagnostics, Diagnostics, Level, TracingDiagnostics};
pub use logging::init_logging;
