//! HTTP engine adapter tests against a local mock server.

use futures::StreamExt;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use vocalink::core::llm::{HttpGenerator, HttpGeneratorConfig, ResponseGenerator};
use vocalink::core::stt::{HttpRecognizer, HttpRecognizerConfig, SpeechRecognizer};
use vocalink::core::tts::{HttpSynthesizer, HttpSynthesizerConfig, SpeechSynthesizer};
use vocalink::errors::EngineError;

fn recognizer_for(server: &MockServer, api_key: Option<&str>) -> HttpRecognizer {
    HttpRecognizer::new(HttpRecognizerConfig {
        endpoint: format!("{}/v1/audio/transcriptions", server.uri()),
        api_key: api_key.map(str::to_string),
        model: "whisper-small".to_string(),
        sample_rate: 16_000,
    })
}

#[tokio::test]
async fn test_recognizer_posts_wav_and_parses_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": " hello world "})))
        .expect(1)
        .mount(&server)
        .await;

    let recognizer = recognizer_for(&server, None);
    let segments = recognizer
        .transcribe(&[0.0f32; 1600], "en")
        .await
        .unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].text, " hello world ");

    // The multipart body carries an actual RIFF/WAVE payload.
    let requests = server.received_requests().await.unwrap();
    let body = &requests[0].body;
    let riff = b"RIFF";
    assert!(body.windows(riff.len()).any(|w| w == riff));
    let model = b"whisper-small";
    assert!(body.windows(model.len()).any(|w| w == model));
}

#[tokio::test]
async fn test_recognizer_sends_bearer_token_and_language() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/audio/transcriptions"))
        .and(header("authorization", "Bearer sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let recognizer = recognizer_for(&server, Some("sk-test"));
    recognizer.transcribe(&[0.0f32; 160], "de").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let needle = b"de";
    assert!(requests[0].body.windows(needle.len()).any(|w| w == needle));
}

#[tokio::test]
async fn test_recognizer_empty_text_yields_no_segments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"text": "  "})))
        .mount(&server)
        .await;

    let recognizer = recognizer_for(&server, None);
    let segments = recognizer.transcribe(&[0.0f32; 160], "en").await.unwrap();
    assert!(segments.is_empty());
}

#[tokio::test]
async fn test_recognizer_surfaces_http_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("engine on fire"))
        .mount(&server)
        .await;

    let recognizer = recognizer_for(&server, None);
    let err = recognizer
        .transcribe(&[0.0f32; 160], "en")
        .await
        .unwrap_err();
    match err {
        EngineError::Recognition(message) => {
            assert!(message.contains("500"));
            assert!(message.contains("engine on fire"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_synthesizer_streams_pcm_and_sends_length_scale() {
    let server = MockServer::start().await;
    let pcm: Vec<u8> = (0u8..=255).collect();
    Mock::given(method("POST"))
        .and(path("/synthesize"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(pcm.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let synthesizer = HttpSynthesizer::new(HttpSynthesizerConfig {
        endpoint: format!("{}/synthesize", server.uri()),
        api_key: None,
        sample_rate: 22_050,
    });
    assert_eq!(synthesizer.sample_rate(), 22_050);

    let mut stream = synthesizer.synthesize("hello.", Some(3), 0.5).await.unwrap();
    let mut received = Vec::new();
    while let Some(chunk) = stream.next().await {
        received.extend_from_slice(&chunk.unwrap());
    }
    assert_eq!(received, pcm);

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["text"], "hello.");
    assert_eq!(body["speaker_id"], 3);
    assert_eq!(body["length_scale"], 0.5);
}

#[tokio::test]
async fn test_synthesizer_omits_speaker_id_when_unset() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 4]))
        .mount(&server)
        .await;

    let synthesizer = HttpSynthesizer::new(HttpSynthesizerConfig {
        endpoint: format!("{}/synthesize", server.uri()),
        api_key: None,
        sample_rate: 22_050,
    });
    let _ = synthesizer.synthesize("hi.", None, 1.0).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("speaker_id").is_none());
}

#[tokio::test]
async fn test_synthesizer_surfaces_http_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let synthesizer = HttpSynthesizer::new(HttpSynthesizerConfig {
        endpoint: format!("{}/synthesize", server.uri()),
        api_key: None,
        sample_rate: 22_050,
    });
    let err = synthesizer.synthesize("hi.", None, 1.0).await.err().unwrap();
    assert!(matches!(err, EngineError::Synthesis(_)));
}

fn generator_for(server: &MockServer) -> HttpGenerator {
    HttpGenerator::new(HttpGeneratorConfig {
        endpoint: format!("{}/v1/chat/completions", server.uri()),
        api_key: None,
        model: "mistral-7b-instruct".to_string(),
        system_prompt: "Keep it short.".to_string(),
    })
}

fn chat_body(request: &Request) -> serde_json::Value {
    serde_json::from_slice(&request.body).unwrap()
}

#[tokio::test]
async fn test_generator_sends_prompt_and_parses_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": " lights are on "}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let generator = generator_for(&server);
    let reply = generator.generate("turn on the lights").await.unwrap();
    assert_eq!(reply.as_deref(), Some("lights are on"));

    let requests = server.received_requests().await.unwrap();
    let body = chat_body(&requests[0]);
    assert_eq!(body["model"], "mistral-7b-instruct");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], "Keep it short.");
    assert_eq!(body["messages"][1]["content"], "turn on the lights");
}

#[tokio::test]
async fn test_generator_empty_utterance_skips_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let generator = generator_for(&server);
    assert_eq!(generator.generate("   ").await.unwrap(), None);
}

#[tokio::test]
async fn test_generator_blank_reply_is_silence() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "  "}}]
        })))
        .mount(&server)
        .await;

    let generator = generator_for(&server);
    assert_eq!(generator.generate("hello").await.unwrap(), None);
}

#[tokio::test]
async fn test_generator_surfaces_http_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let generator = generator_for(&server);
    let err = generator.generate("hello").await.unwrap_err();
    match err {
        EngineError::Generation(message) => assert!(message.contains("429")),
        other => panic!("unexpected error: {other:?}"),
    }
}
