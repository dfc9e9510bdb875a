use serde::Serialize;
use std::cell::RefCell;
use tracing::{error, info, warn};

/// Severity of a diagnostic event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

/// Sink for the messages a pipeline stage reports.
///
/// Stages receive the sink as an argument instead of reaching for a global
/// logger, so callers decide where diagnostics go.
pub trait Diagnostics {
    fn info(&self, message: &str);
    fn warning(&self, message: &str);
    fn error(&self, message: &str);

    fn emit(&self, level: Level, message: &str) {
        match level {
            Level::Info => self.info(message),
            Level::Warning => self.warning(message),
            Level::Error => self.error(message),
        }
    }
}

/// Forwards diagnostics to `tracing`, tagged with the stage name
#[derive(Debug, Clone, Copy)]
pub struct TracingDiagnostics {
    stage: &'static str,
}

impl TracingDiagnostics {
    pub fn new(stage: &'static str) -> Self {
        Self { stage }
    }

    pub fn stage(&self) -> &'static str {
        self.stage
    }
}

impl Default for TracingDiagnostics {
    fn default() -> Self {
        Self::new("pipeline")
    }
}

impl Diagnostics for TracingDiagnostics {
    fn info(&self, message: &str) {
        info!(stage = self.stage, "{}", message);
    }

    fn warning(&self, message: &str) {
        warn!(stage = self.stage, "{}", message);
    }

    fn error(&self, message: &str) {
        error!(stage = self.stage, "{}", message);
    }
}

/// Keeps every diagnostic in memory, optionally echoing to `tracing` as well
#[derive(Debug, Default)]
pub struct CapturedDiagnostics {
    events: RefCell<Vec<(Level, String)>>,
    echo: Option<TracingDiagnostics>,
}

impl CapturedDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture and also forward to `tracing` under `stage`
    pub fn echoing(stage: &'static str) -> Self {
        Self {
            events: RefCell::default(),
            echo: Some(TracingDiagnostics::new(stage)),
        }
    }

    pub fn events(&self) -> Vec<(Level, String)> {
        self.events.borrow().clone()
    }

    pub fn messages(&self, level: Level) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn count(&self, level: Level) -> usize {
        self.events.borrow().iter().filter(|(l, _)| *l == level).count()
    }

    /// Whether any message at `level` contains `needle`
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.events
            .borrow()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }

    fn record(&self, level: Level, message: &str) {
        if let Some(echo) = &self.echo {
            echo.emit(level, message);
        }
        self.events.borrow_mut().push((level, message.to_string()));
    }
}

impl Diagnostics for CapturedDiagnostics {
    fn info(&self, message: &str) {
        self.record(Level::Info, message);
    }

    fn warning(&self, message: &str) {
        self.record(Level::Warning, message);
    }

    fn error(&self, message: &str) {
        self.record(Level::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captured_diagnostics_keeps_order_and_level() {
        let diag = CapturedDiagnostics::new();
        diag.info("loaded");
        diag.warning("nulls found");
        diag.emit(Level::Error, "write failed");

        assert_eq!(
            diag.events(),
            vec![
                (Level::Info, "loaded".to_string()),
                (Level::Warning, "nulls found".to_string()),
                (Level::Error, "write failed".to_string()),
            ]
        );
        assert_eq!(diag.count(Level::Warning), 1);
        assert!(diag.contains(Level::Error, "write"));
        assert!(!diag.contains(Level::Info, "write"));
    }

    #[test]
    fn test_echoing_still_captures() {
        let diag = CapturedDiagnostics::echoing("test");
        diag.warning("careful");
        assert_eq!(diag.messages(Level::Warning), vec!["careful".to_string()]);
    }
}
