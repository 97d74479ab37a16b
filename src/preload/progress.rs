// Progress model for a preload run: phases, events and the final result
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::debug_log::DebugLog;

/// Orchestration phases, in the only order a run may visit them
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    CheckingCache,
    TestingConnection,
    BatchLoading,
    FallbackMode,
    Complete,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::CheckingCache => "checking-cache",
            Phase::TestingConnection => "testing-connection",
            Phase::BatchLoading => "batch-loading",
            Phase::FallbackMode => "fallback-mode",
            Phase::Complete => "complete",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the vocabulary ended up being voiced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PreloadMethod {
    Online,
    Proxy,
    BrowserVoice,
    None,
}

impl PreloadMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreloadMethod::Online => "online",
            PreloadMethod::Proxy => "proxy",
            PreloadMethod::BrowserVoice => "browser-voice",
            PreloadMethod::None => "none",
        }
    }
}

impl fmt::Display for PreloadMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot handed to the progress callback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub current: usize,
    pub total: usize,
    pub current_word: Option<String>,
    pub percentage: f32,
    pub estimated_remaining: Duration,
    pub success_count: usize,
    pub error_count: usize,
    pub phase: Phase,
    pub debug_log: Vec<String>,
}

/// Terminal artifact of one preload run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreloadResult {
    pub success: bool,
    pub total_words: usize,
    pub successful_words: usize,
    pub failed_words: Vec<String>,
    pub duration: Duration,
    pub debug_log: Vec<String>,
    pub method: PreloadMethod,
}

/// Keeps every reported figure non-decreasing within a run
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    total: usize,
    current: usize,
    percentage: f32,
    success_count: usize,
    error_count: usize,
    phase: Phase,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            current: 0,
            percentage: 0.0,
            success_count: 0,
            error_count: 0,
            phase: Phase::CheckingCache,
        }
    }

    pub fn enter(&mut self, phase: Phase) {
        self.phase = self.phase.max(phase);
    }

    pub fn set_current(&mut self, current: usize) {
        self.current = self.current.max(current.min(self.total));
    }

    pub fn set_percentage(&mut self, percentage: f32) {
        self.percentage = self.percentage.max(percentage.clamp(0.0, 100.0));
    }

    pub fn set_success_count(&mut self, count: usize) {
        self.success_count = self.success_count.max(count);
    }

    pub fn add_errors(&mut self, count: usize) {
        self.error_count += count;
    }

    pub fn event(
        &self,
        current_word: Option<&str>,
        estimated_remaining: Duration,
        log: &DebugLog,
    ) -> ProgressEvent {
        ProgressEvent {
            current: self.current,
            total: self.total,
            current_word: current_word.map(str::to_string),
            percentage: self.percentage,
            estimated_remaining,
            success_count: self.success_count,
            error_count: self.error_count,
            phase: self.phase,
            debug_log: log.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        assert!(Phase::CheckingCache < Phase::TestingConnection);
        assert!(Phase::TestingConnection < Phase::BatchLoading);
        assert!(Phase::BatchLoading < Phase::FallbackMode);
        assert!(Phase::FallbackMode < Phase::Complete);
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(serde_json::to_string(&Phase::FallbackMode).unwrap(), "\"fallback-mode\"");
        assert_eq!(
            serde_json::to_string(&PreloadMethod::BrowserVoice).unwrap(),
            "\"browser-voice\""
        );
        assert_eq!(Phase::BatchLoading.to_string(), "batch-loading");
    }

    #[test]
    fn test_tracker_never_goes_backwards() {
        let mut tracker = ProgressTracker::new(5);
        tracker.enter(Phase::FallbackMode);
        tracker.enter(Phase::BatchLoading);
        tracker.set_current(4);
        tracker.set_current(2);
        tracker.set_percentage(80.0);
        tracker.set_percentage(70.0);
        tracker.set_success_count(3);
        tracker.set_success_count(1);

        let event = tracker.event(None, Duration::ZERO, &DebugLog::new());
        assert_eq!(event.phase, Phase::FallbackMode);
        assert_eq!(event.current, 4);
        assert_eq!(event.percentage, 80.0);
        assert_eq!(event.success_count, 3);
    }

    #[test]
    fn test_tracker_clamps_to_bounds() {
        let mut tracker = ProgressTracker::new(2);
        tracker.set_current(10);
        tracker.set_percentage(140.0);
        let event = tracker.event(Some("apple"), Duration::ZERO, &DebugLog::new());
        assert_eq!(event.current, 2);
        assert_eq!(event.percentage, 100.0);
        assert_eq!(event.current_word.as_deref(), Some("apple"));
    }
}
