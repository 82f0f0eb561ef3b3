use std::sync::Mutex;

use crate::alerts::model::Variant;

/// Fire-and-forget visual feedback. Nothing pushed here survives the session;
/// anything durable goes through the notification ledger.
pub trait ToastChannel: Send + Sync {
    fn push(&self, message: &str, variant: Variant) -> anyhow::Result<()>;
}

/// Routes toasts to the log, at a level matching the variant.
#[derive(Debug, Default)]
pub struct TracingToastChannel;

impl ToastChannel for TracingToastChannel {
    fn push(&self, message: &str, variant: Variant) -> anyhow::Result<()> {
        match variant {
            Variant::Error => tracing::error!(message, "toast"),
            Variant::Warning => tracing::warn!(message, "toast"),
            Variant::Info | Variant::Success => tracing::info!(message, "toast"),
        }
        Ok(())
    }
}

/// Buffers pushes in memory so tests can assert on them.
#[derive(Debug, Default)]
pub struct MemoryToastChannel {
    pushed: Mutex<Vec<(String, Variant)>>,
}

impl MemoryToastChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pushed(&self) -> Vec<(String, Variant)> {
        self.pushed
            .lock()
            .map(|pushed| pushed.clone())
            .unwrap_or_default()
    }
}

impl ToastChannel for MemoryToastChannel {
    fn push(&self, message: &str, variant: Variant) -> anyhow::Result<()> {
        let mut pushed = self
            .pushed
            .lock()
            .map_err(|_| anyhow::anyhow!("toast mutex poisoned"))?;
        pushed.push((message.to_owned(), variant));
        Ok(())
    }
}
