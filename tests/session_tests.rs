mod common;

use common::{const_frame, test_config, MockCapture, MockOutput, MockTransport, OutputLog, SentLog};
use parlance::event::SessionEvent;
use parlance::playback::PlaybackState;
use parlance::segment::SegmenterState;
use parlance::session::{Role, SessionCoordinator};
use parlance::transport::ServerMessage;
use parlance::PipelineError;
use tokio::sync::mpsc;

struct Harness {
    session: SessionCoordinator<MockCapture, MockOutput, MockTransport>,
    sent: SentLog,
    output: OutputLog,
    acquired: std::sync::Arc<std::sync::Mutex<u32>>,
    released: std::sync::Arc<std::sync::Mutex<u32>>,
    tx: mpsc::Sender<SessionEvent>,
    _rx: mpsc::Receiver<SessionEvent>,
}

fn harness(config: parlance::PipelineConfig) -> Harness {
    let capture = MockCapture::new(16000);
    let acquired = capture.acquired.clone();
    let released = capture.released.clone();
    let output_log = OutputLog::default();
    let sent = SentLog::default();
    let session = SessionCoordinator::new(
        config,
        capture,
        MockOutput::new(output_log.clone()),
        MockTransport::new(sent.clone()),
    );
    let (tx, rx) = mpsc::channel(64);
    Harness {
        session,
        sent,
        output: output_log,
        acquired,
        released,
        tx,
        _rx: rx,
    }
}

#[tokio::test]
async fn start_and_stop_are_idempotent() {
    let mut h = harness(test_config());

    h.session.start(h.tx.clone()).unwrap();
    h.session.start(h.tx.clone()).unwrap();
    assert!(h.session.is_running());
    assert_eq!(*h.acquired.lock().unwrap(), 1);

    h.session.stop();
    h.session.stop();
    assert!(!h.session.is_running());
    assert_eq!(*h.released.lock().unwrap(), 1);
}

#[tokio::test]
async fn start_surfaces_device_unavailable() {
    let mut capture = MockCapture::new(16000);
    capture.fail = true;
    let mut session = SessionCoordinator::new(
        test_config(),
        capture,
        MockOutput::new(OutputLog::default()),
        MockTransport::new(SentLog::default()),
    );
    let (tx, _rx) = mpsc::channel(8);

    let err = session.start(tx).unwrap_err();
    assert!(matches!(err, PipelineError::DeviceUnavailable(_)));
    assert!(!session.is_running());
}

#[tokio::test]
async fn voiced_frames_then_silence_transmit_one_utterance() {
    let mut h = harness(test_config());
    h.session.start(h.tx.clone()).unwrap();

    // Three voiced 30ms frames, then silence past the 60ms hangover.
    for _ in 0..3 {
        h.session.handle_event(SessionEvent::Frame(const_frame(0.1)));
    }
    for _ in 0..4 {
        h.session.handle_event(SessionEvent::Frame(const_frame(0.0)));
    }

    let sent = h.sent.utterances.lock().unwrap();
    assert_eq!(sent.len(), 1);
    // 3 frames x 480 samples x 2 bytes, little-endian mono.
    assert_eq!(sent[0].len(), 3 * 480 * 2);
}

#[tokio::test]
async fn stop_mid_utterance_transmits_nothing() {
    let mut h = harness(test_config());
    h.session.start(h.tx.clone()).unwrap();

    h.session.handle_event(SessionEvent::Frame(const_frame(0.1)));
    h.session.handle_event(SessionEvent::Frame(const_frame(0.1)));
    assert_eq!(h.session.segmenter_state(), SegmenterState::Speaking);

    h.session.stop();
    assert_eq!(h.session.segmenter_state(), SegmenterState::Idle);
    assert_eq!(*h.released.lock().unwrap(), 1);
    assert!(h.sent.utterances.lock().unwrap().is_empty());

    // Frames trailing in after release are ignored.
    h.session.handle_event(SessionEvent::Frame(const_frame(0.1)));
    assert_eq!(h.session.segmenter_state(), SegmenterState::Idle);
    assert!(h.sent.utterances.lock().unwrap().is_empty());
}

#[tokio::test]
async fn speech_message_routes_to_playback_and_transcript() {
    let mut h = harness(test_config());
    h.session.start(h.tx.clone()).unwrap();

    h.session.handle_event(SessionEvent::Transport(ServerMessage::Caption {
        text: "turn on the".into(),
    }));
    h.session.handle_event(SessionEvent::Transport(ServerMessage::Caption {
        text: "turn on the lights".into(),
    }));
    assert_eq!(h.session.caption().current(), Some("turn on the lights"));

    h.session.handle_event(SessionEvent::Transport(ServerMessage::Speech {
        audio: vec![0; 32],
        text: "done, lights are on".into(),
        interrupt: true,
    }));

    // Pending caption promoted to a User turn, bot text appended after.
    let entries = h.session.transcript().entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].role, Role::User);
    assert_eq!(entries[0].text, "turn on the lights");
    assert_eq!(entries[1].role, Role::Bot);
    assert_eq!(entries[1].text, "done, lights are on");
    assert_eq!(h.session.caption().current(), None);

    assert_eq!(h.session.playback().state(), PlaybackState::Playing);
    assert_eq!(h.output.played.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn speech_start_barges_into_playback() {
    let mut h = harness(test_config());
    h.session.start(h.tx.clone()).unwrap();

    h.session.handle_event(SessionEvent::Transport(ServerMessage::Speech {
        audio: vec![0; 32],
        text: "a long answer".into(),
        interrupt: true,
    }));
    let playing = h.session.playback().current_id().unwrap();

    h.session.handle_event(SessionEvent::Frame(const_frame(0.1)));

    assert_eq!(h.session.playback().state(), PlaybackState::Idle);
    assert_eq!(h.output.stopped.lock().unwrap().as_slice(), &[playing]);

    // The stale natural end for the stopped playback is ignored.
    h.session.handle_event(SessionEvent::PlaybackEnded(playing));
    assert_eq!(h.session.playback().state(), PlaybackState::Idle);
}

#[tokio::test]
async fn barge_in_can_be_disabled() {
    let mut config = test_config();
    config.barge_in = false;
    let mut h = harness(config);
    h.session.start(h.tx.clone()).unwrap();

    h.session.handle_event(SessionEvent::Transport(ServerMessage::Speech {
        audio: vec![0; 32],
        text: "still talking".into(),
        interrupt: true,
    }));
    h.session.handle_event(SessionEvent::Frame(const_frame(0.1)));

    assert_eq!(h.session.playback().state(), PlaybackState::Playing);
    assert!(h.output.stopped.lock().unwrap().is_empty());
}

#[tokio::test]
async fn natural_end_event_clears_playback() {
    let mut h = harness(test_config());
    h.session.start(h.tx.clone()).unwrap();

    h.session.handle_event(SessionEvent::Transport(ServerMessage::Speech {
        audio: vec![0; 32],
        text: "short answer".into(),
        interrupt: true,
    }));
    let id = h.session.playback().current_id().unwrap();

    h.session.handle_event(SessionEvent::PlaybackEnded(id));
    assert_eq!(h.session.playback().state(), PlaybackState::Idle);
}

#[tokio::test]
async fn status_message_updates_connected_flag() {
    let mut h = harness(test_config());
    h.session.start(h.tx.clone()).unwrap();

    assert!(!h.session.is_connected());
    h.session.handle_event(SessionEvent::Transport(ServerMessage::Status {
        connected: true,
    }));
    assert!(h.session.is_connected());
    h.session.handle_event(SessionEvent::Transport(ServerMessage::Status {
        connected: false,
    }));
    assert!(!h.session.is_connected());
}

#[tokio::test]
async fn speech_without_caption_logs_only_bot_turn() {
    let mut h = harness(test_config());
    h.session.start(h.tx.clone()).unwrap();

    h.session.handle_event(SessionEvent::Transport(ServerMessage::Speech {
        audio: vec![0; 32],
        text: "unprompted remark".into(),
        interrupt: false,
    }));

    let entries = h.session.transcript().entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].role, Role::Bot);
}
