//! Degraded audio, rejected commands and the response window.

use crate::support::{settle, started_tags, test_settings, two_question_config, Harness};
use audioquiz::audio::AudioError;
use audioquiz::quiz::SessionConfig;
use audioquiz::session::{ActionTag, AnswerRejection, SessionError, SessionEvent, SessionState};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_network_failure_skips_to_next_action() {
    let mut h = Harness::new();
    h.resolver.fail(
        "session_intro.mp3",
        AudioError::NetworkFailure {
            resource: "session_intro.mp3".to_string(),
            reason: "timed out".to_string(),
        },
    );

    h.controller.start(two_question_config()).await.unwrap();
    settle().await;
    h.finish_current().await;
    settle().await;

    assert_eq!(h.player.played(), vec!["host_intro.mp3", "q1.mp3"]);

    let events = h.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::Warning {
            tag: Some(ActionTag::SessionIntro),
            error: AudioError::NetworkFailure { .. },
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_missing_resource_counts_as_completed() {
    let mut h = Harness::new();
    h.resolver.fail(
        "correct.mp3",
        AudioError::ResourceNotFound("correct.mp3".to_string()),
    );

    h.start_and_reach_first_question().await;
    h.controller.select_answer("A").await.unwrap();
    settle().await;
    settle().await;

    assert_eq!(
        h.player.last_played().as_deref(),
        Some("https://cdn.test/q2.mp3")
    );
    let events = h.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::ActionCompleted {
            tag: ActionTag::CorrectCallout(0),
            ..
        }
    )));
    assert_eq!(h.controller.snapshot().score.correct, 1);
}

#[tokio::test(start_paused = true)]
async fn test_player_failure_does_not_stall_queue() {
    let mut h = Harness::new();
    h.player.fail_on("host_intro.mp3", AudioError::Decode("bad header".to_string()));

    h.controller.start(two_question_config()).await.unwrap();
    settle().await;
    settle().await;

    assert_eq!(h.player.played(), vec!["session_intro.mp3"]);
    let events = h.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::Warning {
            tag: Some(ActionTag::HostIntro),
            error: AudioError::Decode(_),
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_device_loss_still_advances() {
    let mut h = Harness::new();
    h.player.fail_on(
        "session_intro.mp3",
        AudioError::DeviceNotAvailable("no output".to_string()),
    );

    h.controller.start(two_question_config()).await.unwrap();
    settle().await;
    h.finish_current().await;
    settle().await;

    assert_eq!(h.player.played(), vec!["host_intro.mp3", "q1.mp3"]);
    let events = h.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::Warning {
            tag: Some(ActionTag::SessionIntro),
            error: AudioError::DeviceNotAvailable(_),
        }
    )));
}

#[tokio::test(start_paused = true)]
async fn test_music_failure_is_a_warning() {
    let mut h = Harness::new();
    h.resolver.fail(
        "ambience.mp3",
        AudioError::ResourceNotFound("ambience.mp3".to_string()),
    );

    h.controller.start(two_question_config()).await.unwrap();
    settle().await;

    assert!(h.music.started().is_empty());
    let events = h.drain_events();
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::Warning {
            tag: None,
            error: AudioError::ResourceNotFound(_),
        }
    )));
    assert_eq!(h.player.played(), vec!["host_intro.mp3"]);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_option_leaves_state_unchanged() {
    let h = Harness::new();
    h.start_and_reach_first_question().await;
    let before = h.controller.snapshot();

    let result = h.controller.select_answer("Z").await;
    assert_eq!(
        result,
        Err(SessionError::InvalidAnswerSelection(
            AnswerRejection::UnknownOption("Z".to_string())
        ))
    );

    settle().await;
    assert_eq!(h.controller.snapshot(), before);
    assert_eq!(h.player.last_played().as_deref(), Some("q1.mp3"));
}

#[tokio::test(start_paused = true)]
async fn test_answer_outside_window_is_rejected() {
    let h = Harness::new();
    h.controller.start(two_question_config()).await.unwrap();
    settle().await;

    assert_eq!(
        h.controller.select_answer("A").await,
        Err(SessionError::InvalidAnswerSelection(
            AnswerRejection::NotAwaitingResponse
        ))
    );
    assert_eq!(h.controller.snapshot().score.total, 0);
}

#[tokio::test(start_paused = true)]
async fn test_second_answer_is_rejected() {
    let h = Harness::new();
    h.start_and_reach_first_question().await;

    h.controller.select_answer("B").await.unwrap();
    assert_eq!(
        h.controller.select_answer("A").await,
        Err(SessionError::InvalidAnswerSelection(
            AnswerRejection::NotAwaitingResponse
        ))
    );

    let score = h.controller.snapshot().score;
    assert_eq!((score.correct, score.incorrect, score.total), (0, 1, 1));
}

#[tokio::test(start_paused = true)]
async fn test_empty_question_set_is_rejected() {
    let h = Harness::new();

    let result = h.controller.start(SessionConfig::default()).await;
    assert_eq!(result, Err(SessionError::EmptyQuestionSet));
    assert!(h.controller.snapshot().session_id.is_none());
    settle().await;
    assert!(h.player.played().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_start_while_active_is_rejected() {
    let h = Harness::new();
    h.controller.start(two_question_config()).await.unwrap();

    assert_eq!(
        h.controller.start(two_question_config()).await,
        Err(SessionError::SessionAlreadyActive)
    );
}

#[tokio::test(start_paused = true)]
async fn test_response_window_expiry_routes_to_no_response() {
    let mut h = Harness::new();
    h.start_and_reach_first_question().await;
    h.drain_events();

    tokio::time::sleep(Duration::from_secs(16)).await;
    assert_eq!(h.player.last_played().as_deref(), Some("no_response.mp3"));
    assert_eq!(h.controller.snapshot().score.no_response, 1);

    h.finish_current().await;
    assert_eq!(h.player.last_played().as_deref(), Some("q1_correction.mp3"));
    h.finish_current().await;

    let events = h.drain_events();
    assert_eq!(
        started_tags(&events),
        vec![
            ActionTag::NoResponseCallout(0),
            ActionTag::Correction(0),
            ActionTag::QuestionAudio(1),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_pause_suspends_response_window() {
    let h = Harness::new();
    h.start_and_reach_first_question().await;

    h.controller.pause().await.unwrap();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(
        h.controller.snapshot().state,
        SessionState::AwaitingResponse(0)
    );

    // Resuming re-arms the full window
    h.controller.resume().await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(h.controller.snapshot().is_awaiting_response);

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(h.player.last_played().as_deref(), Some("no_response.mp3"));
}

#[tokio::test(start_paused = true)]
async fn test_disabled_response_window_waits_forever() {
    let mut settings = test_settings();
    settings.playback.response_window_secs = 0;
    let h = Harness::with_settings(settings);
    h.start_and_reach_first_question().await;

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert!(h.controller.snapshot().is_awaiting_response);
    assert_eq!(h.controller.snapshot().score.total, 0);
}
