// Platform speech engine through the `tts` crate
// The engine lives on its own thread; requests and completions cross channels.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::source::Utterance;
use super::synthesis::SpeechSynthesizer;
use crate::cancel::CancelToken;
use crate::error::AudioError;

struct SpeakRequest {
    utterance: Utterance,
    done: oneshot::Sender<Result<(), String>>,
}

pub struct NativeSynthesizer {
    requests: Mutex<mpsc::Sender<SpeakRequest>>,
    stop: Arc<AtomicBool>,
}

impl NativeSynthesizer {
    /// Start the engine thread. None if the platform engine fails to initialise.
    pub fn new() -> Option<Self> {
        let (tx, rx) = mpsc::channel::<SpeakRequest>();
        let (ready_tx, ready_rx) = mpsc::channel::<bool>();
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        thread::Builder::new()
            .name("wordvoice-tts".to_string())
            .spawn(move || {
                let mut engine = match tts::Tts::default() {
                    Ok(engine) => {
                        let _ = ready_tx.send(true);
                        engine
                    }
                    Err(e) => {
                        warn!(error = %e, "Native TTS unavailable");
                        let _ = ready_tx.send(false);
                        return;
                    }
                };
                while let Ok(request) = rx.recv() {
                    let result = speak_blocking(&mut engine, &request.utterance, &thread_stop);
                    let _ = request.done.send(result);
                }
            })
            .ok()?;

        match ready_rx.recv() {
            Ok(true) => Some(Self {
                requests: Mutex::new(tx),
                stop,
            }),
            _ => None,
        }
    }
}

fn speak_blocking(engine: &mut tts::Tts, utterance: &Utterance, stop: &AtomicBool) -> Result<(), String> {
    stop.store(false, Ordering::SeqCst);

    let rate = (engine.normal_rate() * utterance.rate).clamp(engine.min_rate(), engine.max_rate());
    let _ = engine.set_rate(rate);

    if let Ok(voices) = engine.voices() {
        let prefix = utterance.locale.tag();
        if let Some(voice) = voices.iter().find(|v| v.language().as_str().starts_with(prefix)) {
            let _ = engine.set_voice(voice);
        }
    }

    engine.speak(utterance.text.clone(), true).map_err(|e| e.to_string())?;

    loop {
        if stop.load(Ordering::SeqCst) {
            let _ = engine.stop();
            return Err("stopped".to_string());
        }
        match engine.is_speaking() {
            Ok(true) => thread::sleep(Duration::from_millis(50)),
            Ok(false) => return Ok(()),
            // Backend can't report progress; the utterance was queued fine
            Err(_) => return Ok(()),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for NativeSynthesizer {
    fn name(&self) -> &'static str {
        "native"
    }

    fn is_supported(&self) -> bool {
        true
    }

    async fn speak(&self, utterance: &Utterance, cancel: &CancelToken) -> Result<(), AudioError> {
        if cancel.is_cancelled() {
            return Err(AudioError::Cancelled);
        }

        let (done_tx, done_rx) = oneshot::channel();
        self.requests
            .lock()
            .send(SpeakRequest {
                utterance: utterance.clone(),
                done: done_tx,
            })
            .map_err(|_| AudioError::SynthesisFailed("speech thread has exited".to_string()))?;

        debug!(text = %utterance.text, "Native speech queued");

        tokio::select! {
            result = done_rx => match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(AudioError::SynthesisFailed(e)),
                Err(_) => Err(AudioError::SynthesisFailed("speech thread dropped the request".to_string())),
            },
            _ = cancel.cancelled() => {
                self.stop.store(true, Ordering::SeqCst);
                Err(AudioError::Cancelled)
            }
        }
    }
}
