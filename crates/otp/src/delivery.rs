use std::io::{self, Write};
use std::sync::Mutex;

use tracing::info;
use ttlgate_common::{TtlGateError, TtlGateResult};

/// Channel that hands an issued code to its owner (console, SMS, ...).
pub trait CodeDelivery: Send + Sync {
    fn deliver(&self, identity: &str, code: &str) -> TtlGateResult<()>;
}

/// Writes one `identity: code` line per issued code to an output stream.
pub struct ConsoleDelivery<W> {
    output: Mutex<W>,
}

impl ConsoleDelivery<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleDelivery<W> {
    pub fn new(output: W) -> Self {
        Self {
            output: Mutex::new(output),
        }
    }

    /// Consume the channel and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.output
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<W: Write + Send> CodeDelivery for ConsoleDelivery<W> {
    fn deliver(&self, identity: &str, code: &str) -> TtlGateResult<()> {
        let mut output = self
            .output
            .lock()
            .map_err(|_| TtlGateError::Delivery("console output lock poisoned".into()))?;
        writeln!(output, "{identity}: {code}")?;
        output.flush()?;
        Ok(())
    }
}

/// Emits each code as a structured `info` event instead of printing it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDelivery;

impl CodeDelivery for TracingDelivery {
    fn deliver(&self, identity: &str, code: &str) -> TtlGateResult<()> {
        info!(identity, code, "verification code issued");
        Ok(())
    }
}
