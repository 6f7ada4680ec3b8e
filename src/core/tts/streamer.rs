//! Reply-to-audio streaming with latest-reply-wins semantics.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{
    format_text_for_synthesis, length_scale_for_speed, AudioChunkMessage, SpeechSynthesizer,
};

/// One reply queued for synthesis.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: String,
    pub speaker_id: Option<u32>,
    pub speed: f32,
}

/// Drains a request channel and streams synthesized audio chunks out.
///
/// Only the newest request matters: a backlog is collapsed before synthesis
/// starts, and a request arriving mid-stream cancels the chunks still in
/// flight. The shared `speaking` flag is true exactly while chunks are being
/// produced, so callers can suppress recognition of played-back audio.
pub struct SynthesisStreamer {
    engine: Arc<dyn SpeechSynthesizer>,
    speaking: Arc<AtomicBool>,
}

impl SynthesisStreamer {
    pub fn new(engine: Arc<dyn SpeechSynthesizer>, speaking: Arc<AtomicBool>) -> Self {
        Self { engine, speaking }
    }

    /// Run until the request channel closes or the outbound channel drops.
    ///
    /// When the request channel closes while a reply is streaming, that reply
    /// still runs to completion before the task exits.
    pub async fn run(
        self,
        mut requests: mpsc::Receiver<SynthesisRequest>,
        out: mpsc::Sender<AudioChunkMessage>,
    ) {
        let mut next: Option<SynthesisRequest> = None;
        let mut requests_closed = false;
        'replies: loop {
            let mut request = match next.take() {
                Some(request) => request,
                None => {
                    if requests_closed {
                        break;
                    }
                    match requests.recv().await {
                        Some(request) => request,
                        None => break,
                    }
                }
            };
            // Collapse any backlog down to the newest reply.
            while let Ok(newer) = requests.try_recv() {
                request = newer;
            }

            let formatted = format_text_for_synthesis(&request.text);
            if formatted.is_empty() {
                continue;
            }
            let scale = length_scale_for_speed(request.speed);
            let mut stream = match self
                .engine
                .synthesize(&formatted, request.speaker_id, scale)
                .await
            {
                Ok(stream) => stream,
                Err(err) => {
                    warn!(error = %err, "synthesis request failed");
                    continue;
                }
            };

            let sample_rate = self.engine.sample_rate();
            self.speaking.store(true, Ordering::SeqCst);
            loop {
                let chunk = if requests_closed {
                    stream.next().await
                } else {
                    tokio::select! {
                        biased;
                        newer = requests.recv() => {
                            match newer {
                                Some(newer) => {
                                    debug!("reply superseded mid-stream");
                                    next = Some(newer);
                                    self.speaking.store(false, Ordering::SeqCst);
                                    continue 'replies;
                                }
                                None => {
                                    requests_closed = true;
                                    continue;
                                }
                            }
                        }
                        chunk = stream.next() => chunk,
                    }
                };
                match chunk {
                    Some(Ok(pcm)) => {
                        let msg =
                            AudioChunkMessage::new(&pcm, sample_rate, &request.voice, request.speed);
                        if out.send(msg).await.is_err() {
                            self.speaking.store(false, Ordering::SeqCst);
                            return;
                        }
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, "synthesis stream failed mid-reply");
                        break;
                    }
                    None => break,
                }
            }
            self.speaking.store(false, Ordering::SeqCst);
        }
    }
}
