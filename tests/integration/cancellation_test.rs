//! Stop, skip and pause behaviour, including late completions.

use crate::support::{settle, started_tags, two_question_config, Harness};
use audioquiz::session::{ActionTag, SessionError, SessionEvent, SessionState, Stage};
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_stop_discards_late_completion() {
    let mut h = Harness::new();
    h.controller.start(two_question_config()).await.unwrap();
    settle().await;
    assert_eq!(h.player.played(), vec!["host_intro.mp3"]);
    h.drain_events();

    h.controller.stop().await.unwrap();

    // The torn-down intro reports completion after the stop
    assert_eq!(h.player.fire_detached(), 1);
    settle().await;
    settle().await;

    let events = h.drain_events();
    assert_eq!(events, vec![SessionEvent::Stopped]);
    assert_eq!(h.player.played().len(), 1);

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.state, SessionState::Closed);
    assert_eq!(snapshot.stage, Some(Stage::Closed));
    assert!(!snapshot.is_playing);
    assert_eq!(snapshot.score.total, 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_resets_score_and_cursor() {
    let h = Harness::new();
    h.start_and_reach_first_question().await;
    h.controller.select_answer("A").await.unwrap();
    settle().await;
    h.finish_current().await;
    assert_eq!(h.controller.snapshot().question_index, 1);

    h.controller.stop().await.unwrap();

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.question_index, 0);
    assert_eq!(snapshot.score.total, 0);
    assert!(!snapshot.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_music_envelope() {
    let h = Harness::new();
    h.controller.start(two_question_config()).await.unwrap();
    settle().await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    h.controller.stop().await.unwrap();
    let volumes_at_stop = h.music.volumes().len();
    assert!(h.music.stops() >= 1);

    tokio::time::sleep(Duration::from_secs(90)).await;
    assert_eq!(h.music.volumes().len(), volumes_at_stop);
}

#[tokio::test(start_paused = true)]
async fn test_stop_without_session() {
    let h = Harness::new();
    assert_eq!(h.controller.stop().await, Err(SessionError::NoActiveSession));
}

#[tokio::test(start_paused = true)]
async fn test_stop_after_session_closed() {
    let mut h = Harness::new();
    h.start_and_reach_first_question().await;

    h.controller.select_answer("A").await.unwrap();
    settle().await;
    h.finish_current().await; // correct callout
    h.finish_current().await; // question 2
    h.controller.select_answer("B").await.unwrap();
    settle().await;
    for _ in 0..5 {
        // callout, prepare review, sponsor, review, outro
        h.finish_current().await;
    }
    assert_eq!(h.controller.snapshot().state, SessionState::Closed);
    h.drain_events();

    assert_eq!(h.controller.stop().await, Err(SessionError::NoActiveSession));
    settle().await;
    assert!(!h
        .drain_events()
        .iter()
        .any(|e| matches!(e, SessionEvent::Stopped)));
}

#[tokio::test(start_paused = true)]
async fn test_skip_while_awaiting_records_no_response() {
    let mut h = Harness::new();
    h.start_and_reach_first_question().await;
    h.drain_events();

    h.controller.skip_question().await.unwrap();
    settle().await;
    assert_eq!(h.player.last_played().as_deref(), Some("skipped.mp3"));

    let snapshot = h.controller.snapshot();
    assert_eq!(snapshot.score.no_response, 1);
    assert!(!snapshot.is_awaiting_response);

    h.finish_current().await;
    assert_eq!(
        h.player.last_played().as_deref(),
        Some("https://cdn.test/q2.mp3")
    );

    let events = h.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::NoResponse { index: 0, .. })));
    assert_eq!(
        started_tags(&events),
        vec![ActionTag::SkipNotice(0), ActionTag::QuestionAudio(1)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_skip_interrupts_question_audio() {
    let mut h = Harness::new();
    h.controller.start(two_question_config()).await.unwrap();
    settle().await;
    h.finish_current().await;
    h.finish_current().await;
    assert_eq!(h.player.last_played().as_deref(), Some("q1.mp3"));
    h.drain_events();

    h.controller.skip_question().await.unwrap();
    settle().await;
    assert_eq!(h.player.last_played().as_deref(), Some("skipped.mp3"));

    // The interrupted prompt finishing late must not count
    h.player.fire_detached();
    settle().await;

    let events = h.drain_events();
    assert!(!events.iter().any(|e| matches!(
        e,
        SessionEvent::ActionCompleted {
            tag: ActionTag::QuestionAudio(0),
            ..
        }
    )));
    assert_eq!(h.player.last_played().as_deref(), Some("skipped.mp3"));
}

#[tokio::test(start_paused = true)]
async fn test_skip_rejected_outside_questions() {
    let h = Harness::new();
    h.controller.start(two_question_config()).await.unwrap();
    settle().await;

    let result = h.controller.skip_question().await;
    assert!(matches!(result, Err(SessionError::InvalidState(_))));
    assert_eq!(h.player.played(), vec!["host_intro.mp3"]);
}

#[tokio::test(start_paused = true)]
async fn test_pause_holds_queue_until_resume() {
    let h = Harness::new();
    h.controller.start(two_question_config()).await.unwrap();
    settle().await;

    h.controller.pause().await.unwrap();
    assert!(h.player.is_paused());
    assert!(h.controller.snapshot().is_paused);
    assert_eq!(
        h.controller.pause().await,
        Err(SessionError::InvalidState("session already paused".to_string()))
    );

    // The intro ends while paused; the next action waits
    h.finish_current().await;
    settle().await;
    assert_eq!(h.player.played().len(), 1);

    h.controller.resume().await.unwrap();
    settle().await;
    assert_eq!(h.player.last_played().as_deref(), Some("session_intro.mp3"));
}

#[tokio::test(start_paused = true)]
async fn test_repeat_question_reopens_answer_window() {
    let h = Harness::new();
    h.start_and_reach_first_question().await;

    h.controller.repeat_question().await.unwrap();
    assert!(!h.controller.snapshot().is_awaiting_response);
    settle().await;
    assert_eq!(h.player.last_played().as_deref(), Some("q1_repeat.mp3"));

    h.finish_current().await;
    assert_eq!(
        h.controller.snapshot().state,
        SessionState::AwaitingResponse(0)
    );
    assert!(h.controller.select_answer("A").await.unwrap().correct);
}

#[tokio::test(start_paused = true)]
async fn test_repeat_requires_answer_window() {
    let h = Harness::new();
    h.controller.start(two_question_config()).await.unwrap();
    settle().await;

    assert!(matches!(
        h.controller.repeat_question().await,
        Err(SessionError::InvalidState(_))
    ));
}
