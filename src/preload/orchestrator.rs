// Batch preload: cache check, connectivity probe, canary sample, then the
// rest of the batch or a switch to on-device voice for everything left.
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{info, warn};

use super::progress::{Phase, PreloadMethod, PreloadResult, ProgressEvent, ProgressTracker};
use crate::audio::{AudioReference, AudioSourceKind, Resolution};
use crate::cancel::CancelToken;
use crate::db::migrations::SCHEMA_VERSION;
use crate::db::models::CacheMetadata;
use crate::debug_log::DebugLog;
use crate::error::AudioError;
use crate::network::ConnectivityProbe;
use crate::resolver::{ChainMode, SourceChain};
use crate::vocabulary::VocabularyWord;

#[derive(Debug, Clone)]
pub struct PreloadConfig {
    /// Words attempted before deciding whether the rest are worth trying
    pub canary_size: usize,
    /// Abort the batch when the canary failure ratio reaches this
    pub canary_failure_threshold: f64,
    /// Switch everything to on-device voice when the run's failure ratio exceeds this
    pub global_failure_threshold: f64,
    /// Delay between per-word network attempts
    pub pacing: Duration,
    /// Delay inserted every `fallback_pacing_every` words in fallback-mode
    pub fallback_pacing: Duration,
    pub fallback_pacing_every: usize,
}

impl Default for PreloadConfig {
    fn default() -> Self {
        Self {
            canary_size: 3,
            canary_failure_threshold: 0.7,
            global_failure_threshold: 0.7,
            pacing: Duration::from_millis(200),
            fallback_pacing: Duration::from_millis(50),
            fallback_pacing_every: 10,
        }
    }
}

/// State of one run
struct Run<'w, F> {
    words: &'w mut [VocabularyWord],
    failed: Vec<bool>,
    relay_used: bool,
    log: DebugLog,
    tracker: ProgressTracker,
    on_progress: F,
    started: Instant,
}

impl<F: FnMut(&ProgressEvent)> Run<'_, F> {
    fn emit(&mut self, current_word: Option<&str>, estimated_remaining: Duration) {
        let event = self.tracker.event(current_word, estimated_remaining, &self.log);
        (self.on_progress)(&event);
    }

    fn mark_failed(&mut self, index: usize) {
        if !self.failed[index] {
            self.failed[index] = true;
            self.tracker.add_errors(1);
        }
    }

    fn failed_among(&self, indices: &[usize]) -> usize {
        indices.iter().filter(|&&i| self.failed[i]).count()
    }

    fn resolved_count(&self) -> usize {
        self.words.iter().filter(|w| w.audio.is_some()).count()
    }

    /// Method for a run that ends without a blanket fallback
    fn settled_method(&self) -> PreloadMethod {
        if self.resolved_count() == 0 {
            PreloadMethod::None
        } else if self.relay_used {
            PreloadMethod::Proxy
        } else {
            PreloadMethod::Online
        }
    }
}

pub struct PreloadOrchestrator {
    chain: Arc<SourceChain>,
    probe: Arc<ConnectivityProbe>,
    config: PreloadConfig,
}

impl PreloadOrchestrator {
    pub fn new(chain: Arc<SourceChain>, probe: Arc<ConnectivityProbe>, config: PreloadConfig) -> Self {
        Self {
            chain,
            probe,
            config,
        }
    }

    /// Resolve audio for every word, annotating `word.audio` in place.
    ///
    /// Words are processed sequentially. `on_progress` is called on every
    /// phase transition and after each per-word attempt; the last call is
    /// always the `complete` event. Never fails: problems end up in the
    /// result's debug log and failed-word list.
    pub async fn preload<F>(
        &self,
        words: &mut [VocabularyWord],
        on_progress: F,
        cancel: &CancelToken,
    ) -> PreloadResult
    where
        F: FnMut(&ProgressEvent),
    {
        let total = words.len();
        let mut run = Run {
            failed: vec![false; total],
            words,
            relay_used: false,
            log: DebugLog::new(),
            tracker: ProgressTracker::new(total),
            on_progress,
            started: Instant::now(),
        };

        info!(total, "Starting audio preload");
        run.log.push(format!("Preloading audio for {} words", total));
        run.emit(None, Duration::ZERO);

        // checking-cache
        let pending = self.check_cache(&mut run).await;
        if pending.is_empty() {
            run.log.push("All words already have audio");
            return self.finish(run, PreloadMethod::Online, cancel).await;
        }
        if cancel.is_cancelled() {
            let method = run.settled_method();
            return self.finish(run, method, cancel).await;
        }

        // testing-connection
        run.tracker.enter(Phase::TestingConnection);
        run.emit(None, Duration::ZERO);
        let reachable = self.probe.check(&mut run.log).await;
        run.tracker.set_percentage(30.0);
        run.emit(None, Duration::ZERO);

        if !reachable {
            run.log.push("Network audio unavailable, using on-device voice");
            let method = self.fallback(&mut run, &pending, cancel).await;
            return self.finish(run, method, cancel).await;
        }
        if cancel.is_cancelled() {
            let method = run.settled_method();
            return self.finish(run, method, cancel).await;
        }

        // batch-loading
        self.batch_load(&mut run, &pending, cancel).await;
        if cancel.is_cancelled() {
            let method = run.settled_method();
            return self.finish(run, method, cancel).await;
        }

        let failures = run.failed.iter().filter(|&&f| f).count();
        let ratio = failures as f64 / total as f64;
        if ratio > self.config.global_failure_threshold {
            run.log.push(format!(
                "{} of {} words failed ({:.0}%), switching every word to on-device voice",
                failures,
                total,
                ratio * 100.0
            ));
            let everything: Vec<usize> = (0..total).collect();
            let method = self.fallback(&mut run, &everything, cancel).await;
            return self.finish(run, method, cancel).await;
        }

        let method = run.settled_method();
        self.finish(run, method, cancel).await
    }

    /// Annotate cache hits and return the indices of words still needing audio
    async fn check_cache<F: FnMut(&ProgressEvent)>(&self, run: &mut Run<'_, F>) -> Vec<usize> {
        let cache = self.chain.cache();
        let available = cache.is_available();
        if !available {
            run.log.push("Audio cache unavailable, continuing without it");
        }

        let mut pending = Vec::new();
        let mut hits = 0;
        for i in 0..run.words.len() {
            if run.words[i].has_payload() {
                hits += 1;
                continue;
            }
            if available {
                match cache.lookup(&run.words[i].english).await {
                    Ok(Some(entry)) => {
                        run.words[i].audio = Some(AudioReference::Cached(Arc::new(entry.payload)));
                        hits += 1;
                        continue;
                    }
                    Ok(None) => {}
                    Err(e) => run
                        .log
                        .push(format!("Cache lookup failed for {}: {}", run.words[i].english, e)),
                }
            }
            pending.push(i);
        }

        run.log.push(format!("Found {}/{} words in cache", hits, run.words.len()));
        run.tracker.set_current(hits);
        run.tracker.set_success_count(hits);
        run.tracker.set_percentage(10.0);
        run.emit(None, Duration::ZERO);
        pending
    }

    async fn batch_load<F: FnMut(&ProgressEvent)>(
        &self,
        run: &mut Run<'_, F>,
        pending: &[usize],
        cancel: &CancelToken,
    ) {
        run.tracker.enter(Phase::BatchLoading);
        run.emit(None, Duration::ZERO);

        let done_before = run.words.len() - pending.len();
        let canary = self.config.canary_size.min(pending.len());
        run.log.push(format!("Testing {} canary words", canary));

        let mut spent = Duration::ZERO;
        for (n, &i) in pending.iter().enumerate() {
            if n == canary && canary > 0 {
                let failures = run.failed_among(&pending[..canary]);
                let rate = failures as f64 / canary as f64;
                let skipped = &pending[canary..];
                if rate >= self.config.canary_failure_threshold {
                    run.log.push(format!(
                        "Canary failed for {}/{} words, skipping remaining {}",
                        failures,
                        canary,
                        skipped.len()
                    ));
                    warn!(failures, canary, "Canary sample failed, aborting batch");
                    for &j in skipped {
                        run.mark_failed(j);
                    }
                    run.tracker.set_current(done_before + pending.len());
                    run.tracker.set_percentage(90.0);
                    run.emit(None, Duration::ZERO);
                    return;
                }
                run.log.push(format!(
                    "Canary passed ({}/{} failed), loading remaining {} words",
                    failures,
                    canary,
                    skipped.len()
                ));
            }

            if cancel.is_cancelled() || (n > 0 && !cancel.sleep(self.config.pacing).await) {
                run.log
                    .push(format!("Preload cancelled, {} words not attempted", pending.len() - n));
                return;
            }

            let started = Instant::now();
            let resolution = self
                .chain
                .resolve_with(&run.words[i], ChainMode::NetworkOnly, &mut run.log, cancel)
                .await;
            spent += started.elapsed();

            let word = run.words[i].english.clone();
            match resolution {
                Resolution::Resolved(audio) => {
                    if audio.source == AudioSourceKind::ProxyRelay {
                        run.relay_used = true;
                    }
                    run.words[i].audio = Some(audio.reference);
                }
                Resolution::Unresolved if run.words[i].audio.is_some() => {
                    run.log
                        .push(format!("No network audio for {}, keeping on-device voice", word));
                }
                Resolution::Unresolved => {
                    run.log.push(format!("No network audio for {}", word));
                    run.mark_failed(i);
                }
            }

            let attempted = n + 1;
            let left = pending.len() - attempted;
            let estimated = spent / attempted as u32 * left as u32;
            run.tracker.set_current(done_before + attempted);
            run.tracker.set_success_count(run.resolved_count());
            run.tracker
                .set_percentage(30.0 + 60.0 * attempted as f32 / pending.len() as f32);
            run.emit(Some(&word), estimated);
        }
    }

    /// Tag the given words for on-device synthesis
    async fn fallback<F: FnMut(&ProgressEvent)>(
        &self,
        run: &mut Run<'_, F>,
        indices: &[usize],
        cancel: &CancelToken,
    ) -> PreloadMethod {
        run.tracker.enter(Phase::FallbackMode);
        run.tracker.set_percentage(70.0);
        run.emit(None, Duration::ZERO);

        if !self.chain.synthesizer().is_supported() {
            run.log.push(format!(
                "{}, words without audio are reported as failed",
                AudioError::SynthesisUnsupported
            ));
            warn!("No speech synthesis available for fallback");
            for &i in indices {
                if run.words[i].audio.is_none() {
                    run.mark_failed(i);
                }
            }
            run.emit(None, Duration::ZERO);
            return run.settled_method();
        }

        let done_before = run.words.len() - indices.len();
        let every = self.config.fallback_pacing_every;
        let mut assigned = 0;
        for (n, &i) in indices.iter().enumerate() {
            if cancel.is_cancelled()
                || (every > 0 && n > 0 && n % every == 0 && !cancel.sleep(self.config.fallback_pacing).await)
            {
                run.log.push("Preload cancelled during fallback");
                break;
            }

            let word = run.words[i].english.clone();
            if word.trim().is_empty() {
                run.log.push(format!("Skipping word {} with empty text", run.words[i].id));
                run.mark_failed(i);
            } else {
                run.words[i].audio = Some(AudioReference::OnDeviceSynthesis(self.chain.utterance(&word)));
                assigned += 1;
            }

            run.tracker.set_current(done_before + n + 1);
            run.tracker.set_success_count(run.resolved_count());
            run.tracker
                .set_percentage(70.0 + 25.0 * (n + 1) as f32 / indices.len() as f32);
            run.emit(Some(&word), Duration::ZERO);
        }

        run.log.push(format!("On-device voice assigned to {} words", assigned));
        PreloadMethod::BrowserVoice
    }

    async fn finish<F: FnMut(&ProgressEvent)>(
        &self,
        mut run: Run<'_, F>,
        method: PreloadMethod,
        cancel: &CancelToken,
    ) -> PreloadResult {
        let total = run.words.len();
        let cancelled = cancel.is_cancelled();
        let failed_words: Vec<String> = run
            .words
            .iter()
            .filter(|w| w.audio.is_none())
            .map(|w| w.english.clone())
            .collect();
        let successful_words = total - failed_words.len();

        if cancelled {
            run.log.push(format!(
                "Preload cancelled with {} words left without audio",
                failed_words.len()
            ));
        }

        let cache = self.chain.cache();
        cache
            .store_metadata(CacheMetadata {
                schema_version: SCHEMA_VERSION,
                last_updated: Utc::now(),
                total_words: total,
                successful_words,
            })
            .await;
        let swept = cache.sweep_expired().await;
        if swept > 0 {
            run.log.push(format!("Removed {} expired cache entries", swept));
        }

        let duration = run.started.elapsed();
        run.log.push(format!(
            "Preload finished in {}ms via {}: {}/{} words ready",
            duration.as_millis(),
            method,
            successful_words,
            total
        ));
        info!(
            %method,
            successful_words,
            failed = failed_words.len(),
            elapsed_ms = duration.as_millis() as u64,
            "Audio preload complete"
        );

        run.tracker.enter(Phase::Complete);
        if !cancelled {
            run.tracker.set_current(total);
        }
        run.tracker.set_success_count(successful_words);
        run.tracker.set_percentage(100.0);
        run.emit(None, Duration::ZERO);

        PreloadResult {
            success: failed_words.is_empty() && !cancelled,
            total_words: total,
            successful_words,
            failed_words,
            duration,
            debug_log: run.log.into_entries(),
            method,
        }
    }
}
