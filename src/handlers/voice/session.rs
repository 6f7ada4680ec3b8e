//! Per-session state machine and recognition pipeline.
//!
//! Each WebSocket connection gets one [`SessionController`] plus two worker
//! tasks: a recognition pipeline draining chunk jobs in order, and a
//! synthesis streamer draining reply requests with latest-reply-wins
//! semantics. The controller is owned by the socket receive loop and is the
//! only place session state mutates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::messages::{IncomingMessage, MessageRoute, OutgoingMessage, MAX_AUDIO_FRAME_SIZE};
use crate::core::audio::{pcm16_to_f32, resample, AudioIngestBuffer};
use crate::core::llm::ResponseGenerator;
use crate::core::stt::{join_segments, SpeechRecognizer, TranscriptStabilizer};
use crate::core::tts::{SynthesisRequest, SynthesisStreamer};
use crate::errors::{SessionError, SessionResult};
use crate::state::AppState;

/// Session lifecycle.
///
/// `Stopped` is the drain phase: the client has ended the utterance but the
/// pipeline is still flushing. New audio is ignored until the flush
/// completes and the session returns to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Listening,
    Stopped,
}

/// Work items for the recognition pipeline, processed strictly in order.
#[derive(Debug)]
pub enum ChunkJob {
    /// One full recognition chunk of input-rate PCM.
    Chunk(Vec<u8>),
    /// End of utterance: the buffered tail plus the reply rendering
    /// parameters captured at stop time.
    Flush {
        tail: Vec<u8>,
        voice: String,
        speaker_id: Option<u32>,
        speed: f32,
    },
}

/// Events flowing back from the pipeline to the controller.
#[derive(Debug, PartialEq, Eq)]
pub enum PipelineEvent {
    FlushComplete,
}

/// Per-session state, owned by the socket receive loop.
pub struct SessionController {
    state: SessionState,
    buffer: AudioIngestBuffer,
    voice: String,
    speaker_id: Option<u32>,
    speed: f32,
    suppress_while_speaking: bool,
    speaking: Arc<AtomicBool>,
    /// Chunks cut so far, session-scoped.
    chunks_cut: u64,
    app: Arc<AppState>,
    chunk_tx: mpsc::Sender<ChunkJob>,
    message_tx: mpsc::Sender<MessageRoute>,
}

impl SessionController {
    pub fn new(
        app: Arc<AppState>,
        speaking: Arc<AtomicBool>,
        chunk_tx: mpsc::Sender<ChunkJob>,
        message_tx: mpsc::Sender<MessageRoute>,
    ) -> SessionResult<Self> {
        let buffer = AudioIngestBuffer::new(
            app.config.audio.chunk_size_bytes(),
            app.config.audio.overlap_size_bytes(),
        )?;
        Ok(Self {
            state: SessionState::Idle,
            buffer,
            voice: app.config.synthesis.default_voice.clone(),
            speaker_id: app
                .config
                .voice_profile(&app.config.synthesis.default_voice)
                .speaker_id,
            speed: app.config.synthesis.default_speed,
            suppress_while_speaking: app.config.synthesis.suppress_while_speaking,
            speaking,
            chunks_cut: 0,
            app,
            chunk_tx,
            message_tx,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of chunks this session has cut and dispatched.
    pub fn chunks_cut(&self) -> u64 {
        self.chunks_cut
    }

    /// Handle one JSON envelope from the client.
    pub async fn handle_message(&mut self, msg: IncomingMessage) -> SessionResult<()> {
        match msg {
            IncomingMessage::Listening { audio, voice, speed } => {
                if let Some(voice) = voice {
                    self.speaker_id = self.app.config.voice_profile(&voice).speaker_id;
                    self.voice = voice;
                }
                if let Some(speed) = speed {
                    if speed <= 0.0 {
                        return Err(SessionError::Protocol(format!(
                            "speed must be positive, got {speed}"
                        )));
                    }
                    self.speed = speed;
                }
                if self.state == SessionState::Idle {
                    debug!("session listening");
                    self.state = SessionState::Listening;
                }
                if let Some(audio) = audio {
                    let bytes = BASE64
                        .decode(audio.as_bytes())
                        .map_err(|e| SessionError::Protocol(format!("invalid audio base64: {e}")))?;
                    self.ingest_audio(bytes)?;
                }
                Ok(())
            }
            IncomingMessage::Speaking { audio } => {
                if self.state == SessionState::Idle {
                    debug!("session listening through playback");
                    self.state = SessionState::Listening;
                }
                if let Some(audio) = audio {
                    let bytes = BASE64
                        .decode(audio.as_bytes())
                        .map_err(|e| SessionError::Protocol(format!("invalid audio base64: {e}")))?;
                    // The client has declared playback is audible; under the
                    // suppression policy this audio never reaches recognition.
                    if self.suppress_while_speaking {
                        debug!(bytes = bytes.len(), "dropping audio captured during playback");
                        return Ok(());
                    }
                    self.ingest_audio(bytes)?;
                }
                Ok(())
            }
            IncomingMessage::Stopped => self.handle_stopped().await,
        }
    }

    /// Handle a raw binary frame: PCM audio while listening.
    pub fn handle_binary(&mut self, data: Vec<u8>) -> SessionResult<()> {
        self.ingest_audio(data)
    }

    /// React to a pipeline event.
    pub async fn handle_event(&mut self, event: PipelineEvent) {
        match event {
            PipelineEvent::FlushComplete => {
                if self.state == SessionState::Stopped {
                    debug!("utterance flushed, session idle");
                    self.state = SessionState::Idle;
                    let _ = self
                        .message_tx
                        .send(MessageRoute::Outgoing(OutgoingMessage::Idle))
                        .await;
                }
            }
        }
    }

    fn ingest_audio(&mut self, bytes: Vec<u8>) -> SessionResult<()> {
        if bytes.len() > MAX_AUDIO_FRAME_SIZE {
            return Err(SessionError::Protocol(format!(
                "audio frame of {} bytes exceeds limit",
                bytes.len()
            )));
        }
        if self.state != SessionState::Listening {
            // Audio outside an utterance is dropped, not an error; clients
            // may keep streaming briefly after a stop.
            debug!(state = ?self.state, bytes = bytes.len(), "dropping audio outside utterance");
            return Ok(());
        }
        if self.suppress_while_speaking && self.speaking.load(Ordering::SeqCst) {
            debug!(bytes = bytes.len(), "dropping audio while reply is playing");
            return Ok(());
        }

        self.buffer.extend(&bytes);
        while let Some(chunk) = self.buffer.cut_chunk() {
            self.chunks_cut += 1;
            // The receive loop must never stall behind recognition; a full
            // pipeline drops the chunk and relies on overlap to recover.
            if let Err(err) = self.chunk_tx.try_send(ChunkJob::Chunk(chunk)) {
                warn!(error = %err, seq = self.chunks_cut, "recognition pipeline full, dropping chunk");
            }
        }
        Ok(())
    }

    async fn handle_stopped(&mut self) -> SessionResult<()> {
        if self.state != SessionState::Listening {
            debug!(state = ?self.state, "ignoring stop outside utterance");
            return Ok(());
        }
        self.state = SessionState::Stopped;
        let tail = self.buffer.flush();
        let job = ChunkJob::Flush {
            tail,
            voice: self.voice.clone(),
            speaker_id: self.speaker_id,
            speed: self.speed,
        };
        // Unlike chunks, the flush must reach the pipeline; the session is
        // stopped, so blocking here cannot stall live audio.
        self.chunk_tx
            .send(job)
            .await
            .map_err(|_| SessionError::Transport("recognition pipeline gone".to_string()))
    }
}

/// Ordered chunk consumer: resample, transcribe, stabilize, and on flush
/// seal the utterance and hand the reply to the synthesis side.
pub struct RecognitionPipeline {
    recognizer: Arc<dyn SpeechRecognizer>,
    generator: Arc<dyn ResponseGenerator>,
    stabilizer: TranscriptStabilizer,
    input_rate: u32,
    target_rate: u32,
    language: String,
    message_tx: mpsc::Sender<MessageRoute>,
    synthesis_tx: mpsc::Sender<SynthesisRequest>,
    event_tx: mpsc::Sender<PipelineEvent>,
}

impl RecognitionPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        recognizer: Arc<dyn SpeechRecognizer>,
        generator: Arc<dyn ResponseGenerator>,
        input_rate: u32,
        target_rate: u32,
        language: String,
        message_tx: mpsc::Sender<MessageRoute>,
        synthesis_tx: mpsc::Sender<SynthesisRequest>,
        event_tx: mpsc::Sender<PipelineEvent>,
    ) -> Self {
        Self {
            recognizer,
            generator,
            stabilizer: TranscriptStabilizer::new(),
            input_rate,
            target_rate,
            language,
            message_tx,
            synthesis_tx,
            event_tx,
        }
    }

    /// Drain chunk jobs until the channel closes.
    pub async fn run(mut self, mut jobs: mpsc::Receiver<ChunkJob>) {
        while let Some(job) = jobs.recv().await {
            match job {
                ChunkJob::Chunk(bytes) => {
                    self.process_chunk(&bytes, false).await;
                }
                ChunkJob::Flush {
                    tail,
                    voice,
                    speaker_id,
                    speed,
                } => {
                    if !tail.is_empty() {
                        self.process_chunk(&tail, true).await;
                    }
                    self.finish_utterance(voice, speaker_id, speed).await;
                    if self.event_tx.send(PipelineEvent::FlushComplete).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    /// Transcribe one stretch of input-rate PCM and commit what stabilizes.
    async fn process_chunk(&mut self, bytes: &[u8], is_tail: bool) {
        let samples = pcm16_to_f32(bytes);
        let resampled = resample(&samples, self.input_rate, self.target_rate);

        let segments = match self.recognizer.transcribe(&resampled, &self.language).await {
            Ok(segments) => segments,
            Err(err) => {
                warn!(error = %err, is_tail, "recognition failed for chunk");
                self.send_error(format!("recognition failed: {err}")).await;
                return;
            }
        };
        let hypothesis = join_segments(&segments);
        if hypothesis.is_empty() {
            return;
        }

        if let Some(delta) = self.stabilizer.stabilize(&hypothesis) {
            let _ = self
                .message_tx
                .send(MessageRoute::Outgoing(OutgoingMessage::Transcript {
                    text: delta,
                    is_final: false,
                }))
                .await;
        }
    }

    /// Seal the utterance, emit the final transcript, and queue a reply.
    async fn finish_utterance(&mut self, voice: String, speaker_id: Option<u32>, speed: f32) {
        let Some(utterance) = self.stabilizer.finish_utterance() else {
            return;
        };
        let _ = self
            .message_tx
            .send(MessageRoute::Outgoing(OutgoingMessage::Transcript {
                text: utterance.clone(),
                is_final: true,
            }))
            .await;

        match self.generator.generate(&utterance).await {
            Ok(Some(reply)) => {
                debug!(chars = reply.len(), "queueing reply for synthesis");
                let request = SynthesisRequest {
                    text: reply,
                    voice,
                    speaker_id,
                    speed,
                };
                if self.synthesis_tx.send(request).await.is_err() {
                    warn!("synthesis task gone, dropping reply");
                }
            }
            Ok(None) => {
                debug!("no reply for utterance");
            }
            Err(err) => {
                warn!(error = %err, "reply generation failed");
                self.send_error(format!("reply generation failed: {err}")).await;
            }
        }
    }

    async fn send_error(&self, message: String) {
        let _ = self
            .message_tx
            .send(MessageRoute::Outgoing(OutgoingMessage::Error { message }))
            .await;
    }
}

/// Wire up the controller and its worker tasks for one connection.
///
/// Returns the controller and the pipeline event receiver; the pipeline,
/// synthesis streamer, and audio forwarder run as background tasks that end
/// when their channels close.
pub fn spawn_session(
    app: Arc<AppState>,
    message_tx: mpsc::Sender<MessageRoute>,
) -> SessionResult<(SessionController, mpsc::Receiver<PipelineEvent>)> {
    let (chunk_tx, chunk_rx) = mpsc::channel::<ChunkJob>(32);
    let (synthesis_tx, synthesis_rx) = mpsc::channel::<SynthesisRequest>(8);
    let (event_tx, event_rx) = mpsc::channel::<PipelineEvent>(4);
    let (audio_tx, mut audio_rx) = mpsc::channel(32);

    let speaking = Arc::new(AtomicBool::new(false));
    let controller = SessionController::new(
        app.clone(),
        speaking.clone(),
        chunk_tx,
        message_tx.clone(),
    )?;

    let pipeline = RecognitionPipeline::new(
        app.recognizer.clone(),
        app.generator.clone(),
        app.config.audio.input_sample_rate,
        app.config.audio.target_sample_rate,
        app.config.audio.language.clone(),
        message_tx.clone(),
        synthesis_tx,
        event_tx,
    );
    tokio::spawn(pipeline.run(chunk_rx));

    let streamer = SynthesisStreamer::new(app.synthesizer.clone(), speaking);
    tokio::spawn(streamer.run(synthesis_rx, audio_tx));

    // Forward synthesized chunks into the socket's outgoing route.
    tokio::spawn(async move {
        while let Some(chunk) = audio_rx.recv().await {
            if message_tx
                .send(MessageRoute::Outgoing(OutgoingMessage::Speaking { chunk }))
                .await
                .is_err()
            {
                break;
            }
        }
    });

    Ok((controller, event_rx))
}
