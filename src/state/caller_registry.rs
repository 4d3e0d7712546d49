use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

/// In-memory `CallSid -> caller number` map for forwarded calls
///
/// Filled by `/forward-call` and consumed by the status callbacks that
/// arrive once the forwarded leg ends.
#[derive(Debug, Default)]
pub struct CallerRegistry {
    callers: Mutex<HashMap<String, String>>,
}

impl CallerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember who is behind `call_sid`; blank values are ignored
    pub fn remember(&self, call_sid: &str, caller: &str) {
        if call_sid.trim().is_empty() || caller.trim().is_empty() {
            return;
        }
        let mut callers = self.callers.lock();
        callers.insert(call_sid.to_string(), caller.to_string());
        debug!(call_sid, tracked = callers.len(), "Remembered forwarded caller");
    }

    /// Remove and return the caller for `call_sid`
    pub fn take(&self, call_sid: &str) -> Option<String> {
        self.callers.lock().remove(call_sid)
    }

    pub fn len(&self) -> usize {
        self.callers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.callers.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_consumes_entry() {
        let registry = CallerRegistry::new();
        registry.remember("CA1", "+15550100");

        assert_eq!(registry.take("CA1").as_deref(), Some("+15550100"));
        assert_eq!(registry.take("CA1"), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let registry = CallerRegistry::new();
        registry.remember("", "+15550100");
        registry.remember("CA1", "  ");
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_latest_caller_wins() {
        let registry = CallerRegistry::new();
        registry.remember("CA1", "+15550100");
        registry.remember("CA1", "+15550199");
        assert_eq!(registry.take("CA1").as_deref(), Some("+15550199"));
    }
}
