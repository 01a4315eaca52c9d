use business::domain::logger::Logger;
use tracing::{debug, error, info, warn};

/// Target every catalog log line is emitted under, so `RUST_LOG` can
/// address the domain separately from poem and reqwest.
pub const LOG_TARGET: &str = "catalog";

/// `Logger` port backed by `tracing`. `component` names the adapter or use
/// case that owns the instance and is attached as a structured field.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    component: Option<&'static str>,
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_component(component: &'static str) -> Self {
        Self {
            component: Some(component),
        }
    }

    pub fn component(&self) -> &str {
        self.component.unwrap_or("-")
    }
}

impl Logger for TracingLogger {
    fn info(&self, message: &str) {
        info!(target: LOG_TARGET, component = self.component(), "{}", message);
    }
    fn warn(&self, message: &str) {
        warn!(target: LOG_TARGET, component = self.component(), "{}", message);
    }
    fn error(&self, message: &str) {
        error!(target: LOG_TARGET, component = self.component(), "{}", message);
    }
    fn debug(&self, message: &str) {
        debug!(target: LOG_TARGET, component = self.component(), "{}", message);
    }
}
