// Ordered, timestamped log carried in progress events and results
use chrono::Utc;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugLog {
    entries: Vec<String>,
}

impl DebugLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append "[HH:MM:SS] message"
    pub fn push(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        debug!(target: "wordvoice_lib::debug_log", "{}", message);
        self.entries
            .push(format!("[{}] {}", Utc::now().format("%H:%M:%S"), message));
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }

    /// True if any entry contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|e| e.contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_ordered_and_stamped() {
        let mut log = DebugLog::new();
        log.push("first");
        log.push("second");
        assert_eq!(log.len(), 2);
        assert!(log.entries()[0].ends_with("] first"));
        assert!(log.entries()[1].ends_with("] second"));
        // "[HH:MM:SS] "
        assert_eq!(&log.entries()[0][0..1], "[");
        assert_eq!(&log.entries()[0][9..11], "] ");
    }
}
