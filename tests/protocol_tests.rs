use base64::Engine;
use virecord::protocol::{ClientMessage, ServerMessage};

#[test]
fn init_message_serialization() {
    let msg = ClientMessage::Init {
        title_id: "7".to_string(),
        title_name: "Standup".to_string(),
        stt_language: "zh".to_string(),
        translate_source: "zh".to_string(),
        translate_target: "vi".to_string(),
    };

    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"type\":\"init\""));
    assert!(json.contains("\"title_id\":\"7\""));
    assert!(json.contains("\"stt_language\":\"zh\""));
    assert!(json.contains("\"translate_target\":\"vi\""));
}

#[test]
fn audio_chunk_carries_base64_pcm() {
    let pcm_bytes: Vec<u8> = [100i16, -200, 300]
        .iter()
        .flat_map(|s| s.to_le_bytes())
        .collect();
    let encoded = base64::engine::general_purpose::STANDARD.encode(&pcm_bytes);

    let msg = ClientMessage::AudioChunk {
        pcm16_b64: encoded.clone(),
    };
    let json = serde_json::to_string(&msg).unwrap();
    assert!(json.contains("\"type\":\"audio.chunk\""));
    assert!(json.contains(&encoded));

    let back: ClientMessage = serde_json::from_str(&json).unwrap();
    assert_eq!(back, msg);
}

#[test]
fn stop_message_is_bare_tag() {
    let json = serde_json::to_string(&ClientMessage::Stop).unwrap();
    assert_eq!(json, r#"{"type":"stop"}"#);
}

#[test]
fn stt_delta_parses_text() {
    let msg = ServerMessage::parse(r#"{"type":"stt.delta","text":"你好"}"#).unwrap();
    assert_eq!(
        msg,
        ServerMessage::SttDelta {
            text: "你好".to_string()
        }
    );
}

#[test]
fn stt_delta_missing_text_defaults_empty() {
    let msg = ServerMessage::parse(r#"{"type":"stt.delta"}"#).unwrap();
    assert_eq!(msg, ServerMessage::SttDelta { text: String::new() });
}

#[test]
fn translation_delta_accepts_legacy_field_name() {
    let msg = ServerMessage::parse(r#"{"type":"translation.delta","text_delta":"Xin"}"#).unwrap();
    assert_eq!(
        msg,
        ServerMessage::TranslationDelta {
            delta: "Xin".to_string()
        }
    );

    let msg = ServerMessage::parse(r#"{"type":"translation.delta","delta":" chào"}"#).unwrap();
    assert_eq!(
        msg,
        ServerMessage::TranslationDelta {
            delta: " chào".to_string()
        }
    );
}

#[test]
fn final_result_parses_both_tracks() {
    let msg =
        ServerMessage::parse(r#"{"type":"final.result","source":"A","target":"B"}"#).unwrap();
    assert_eq!(
        msg,
        ServerMessage::FinalResult {
            source: "A".to_string(),
            target: "B".to_string()
        }
    );
}

#[test]
fn error_reason_prefers_error_field() {
    let msg = ServerMessage::parse(r#"{"type":"error","error":"stt_fail"}"#).unwrap();
    match msg {
        ServerMessage::Error { error, message } => {
            assert_eq!(ServerMessage::error_reason(&error, &message), "stt_fail");
        }
        other => panic!("unexpected message: {other:?}"),
    }

    let msg = ServerMessage::parse(r#"{"type":"error","message":"boom"}"#).unwrap();
    match msg {
        ServerMessage::Error { error, message } => {
            assert_eq!(ServerMessage::error_reason(&error, &message), "boom");
        }
        other => panic!("unexpected message: {other:?}"),
    }

    let msg = ServerMessage::parse(r#"{"type":"error"}"#).unwrap();
    match msg {
        ServerMessage::Error { error, message } => {
            assert_eq!(ServerMessage::error_reason(&error, &message), "unknown");
        }
        other => panic!("unexpected message: {other:?}"),
    }
}

#[test]
fn unknown_types_are_dropped() {
    assert_eq!(
        ServerMessage::parse(r#"{"type":"summary.update","summary":"..."}"#),
        None
    );
}

#[test]
fn malformed_payloads_are_dropped() {
    assert_eq!(ServerMessage::parse("not json at all"), None);
    assert_eq!(ServerMessage::parse(r#"{"no_type":true}"#), None);
}
