//! Integration tests for request → supersession → movement task → state.
//!
//! Every test drives the real `LocalExecutor` with a scripted `MockLink`
//! and millisecond-scale timing.

use std::rc::Rc;

use deskctl::adapters::sim_link::SimulatedDesk;
use deskctl::app::commands::DeskCommand;
use deskctl::app::events::DeskEvent;
use deskctl::app::ports::Link;
use deskctl::app::service::{DeskController, DeskExecutor};
use deskctl::config::DeskConfig;
use deskctl::fsm::AttemptOutcome;
use deskctl::presets::PresetStore;
use deskctl::state::DeskState;
use deskctl::{Error, LinkError, ValidationError};

use crate::mock_link::{LinkCall, MockHandle, MockLink, RecordingSink, Script, run_local, wait_until};

type Controller = DeskController<MockLink, PresetStore>;

fn test_config() -> DeskConfig {
    DeskConfig {
        poll_interval_ms: 2,
        stall_ticks: 4,
        connect_timeout_ms: 30,
        retry_count: 1,
        retry_delay_ms: 2,
        ..DeskConfig::default()
    }
}

fn build<L: Link + 'static>(
    config: &DeskConfig,
    link: L,
) -> (Rc<DeskExecutor>, DeskController<L, PresetStore>, Rc<RecordingSink>) {
    let executor = Rc::new(DeskExecutor::new());
    let sink = Rc::new(RecordingSink::default());
    let controller = DeskController::new(
        Rc::clone(&executor),
        link,
        PresetStore::with_defaults(config.bounds()),
        sink.clone(),
        config,
    );
    (executor, controller, sink)
}

fn setup_with(
    config: &DeskConfig,
    height_mm: i32,
    scripts: &[Script],
) -> (Rc<DeskExecutor>, Controller, MockHandle, Rc<RecordingSink>) {
    let (link, handle) = MockLink::new(height_mm, scripts);
    let (executor, controller, sink) = build(config, link);
    (executor, controller, handle, sink)
}

fn setup(height_mm: i32, scripts: &[Script]) -> (Rc<DeskExecutor>, Controller, MockHandle, Rc<RecordingSink>) {
    setup_with(&test_config(), height_mm, scripts)
}

fn attempt_numbers(sink: &RecordingSink, target: i32) -> Vec<u32> {
    sink.events
        .borrow()
        .iter()
        .filter_map(|e| match e {
            DeskEvent::AttemptFinished {
                target_mm, attempt, ..
            } if *target_mm == target => Some(*attempt),
            _ => None,
        })
        .collect()
}

fn initial_state() -> DeskState {
    DeskState {
        name: "my_desk".into(),
        current_height_mm: 1000,
        target_height_mm: 1000,
        is_moving: false,
        active_preset: None,
    }
}

// ── Validation ────────────────────────────────────────────────

#[test]
fn out_of_range_height_rejected_and_state_unchanged() {
    let (ex, ctl, handle, _sink) = setup(1000, &[Script::Travel { step_mm: 50 }]);

    let results = run_local(&ex, async move {
        let mut out = Vec::new();
        for mm in [1500, 1400, 600, -5] {
            out.push(ctl.set_target_height(mm).await);
        }
        (out, ctl.get_state())
    });

    let (out, state) = results;
    assert_eq!(
        out[0],
        Err(Error::Validation(ValidationError::OutOfRange {
            height_mm: 1500,
            min_mm: 600,
            max_mm: 1400
        }))
    );
    assert!(out.iter().all(Result::is_err));
    assert_eq!(state, initial_state());
    assert!(handle.calls().is_empty(), "rejected requests must not touch the link");
}

#[test]
fn unknown_preset_rejected_and_state_unchanged() {
    let (ex, ctl, handle, _sink) = setup(1000, &[Script::Travel { step_mm: 50 }]);

    let (res, state) = run_local(&ex, async move {
        let res = ctl.apply_preset("Unknown").await;
        (res, ctl.get_state())
    });

    assert_eq!(
        res,
        Err(Error::Validation(ValidationError::PresetNotFound(
            "Unknown".into()
        )))
    );
    assert_eq!(state, initial_state());
    assert!(handle.calls().is_empty());
}

// ── Movement ──────────────────────────────────────────────────

#[test]
fn standing_preset_from_1200_reaches_1050() {
    let (ex, ctl, handle, _sink) = setup(1200, &[Script::Travel { step_mm: 50 }]);

    let (report, state) = run_local(&ex, async move {
        ctl.apply_preset("Standing").await.unwrap();
        let report = ctl.wait_for_movement().await;
        (report, ctl.get_state())
    });

    let report = report.unwrap();
    assert_eq!(report.outcome, AttemptOutcome::Reached);
    assert_eq!(report.attempts, 1);
    assert_eq!(
        state,
        DeskState {
            name: "my_desk".into(),
            current_height_mm: 1050,
            target_height_mm: 1050,
            is_moving: false,
            active_preset: Some("Standing".into()),
        }
    );
    assert_eq!(handle.height_mm(), 1050);
    assert!(!handle.is_connected());
}

#[test]
fn handle_command_dispatches_presets_and_heights() {
    let (ex, ctl, _handle, _sink) = setup(1000, &[Script::Travel { step_mm: 100 }]);

    let (sitting, raised) = run_local(&ex, async move {
        ctl.handle_command(DeskCommand::ApplyPreset("Sitting".into()))
            .await
            .unwrap();
        ctl.wait_for_movement().await;
        let sitting = ctl.get_state();

        ctl.handle_command(DeskCommand::SetHeight(900)).await.unwrap();
        ctl.wait_for_movement().await;
        (sitting, ctl.get_state())
    });

    assert_eq!(sitting.current_height_mm, 680);
    assert_eq!(sitting.active_preset.as_deref(), Some("Sitting"));
    assert_eq!(raised.current_height_mm, 900);
    assert_eq!(raised.target_height_mm, 900);
    assert_eq!(raised.active_preset, None, "plain height requests clear the preset");
}

#[test]
fn immediate_supersede_never_overlaps_sessions() {
    let (ex, ctl, handle, sink) = setup(800, &[Script::Travel { step_mm: 50 }]);

    let (report, state) = run_local(&ex, async move {
        ctl.set_target_height(1300).await.unwrap();
        ctl.set_target_height(1000).await.unwrap();
        let report = ctl.wait_for_movement().await;
        (report, ctl.get_state())
    });

    assert_eq!(handle.overlapping_sessions(), 0);
    assert_eq!(
        handle.sessions(),
        1,
        "a task cancelled before it ran must not open a session"
    );
    assert_eq!(report.unwrap().outcome, AttemptOutcome::Reached);
    assert_eq!(state.target_height_mm, 1000);
    assert_eq!(state.current_height_mm, 1000);
    assert!(!state.is_moving);

    let events = sink.events.borrow();
    assert!(events.contains(&DeskEvent::Superseded { target_mm: 1300 }));
    assert!(events.contains(&DeskEvent::MovementFinished {
        target_mm: 1300,
        success: false,
        attempts: 1
    }));
}

#[test]
fn supersede_mid_movement_cleans_up_before_next_connect() {
    let (ex, ctl, handle, _sink) = setup(900, &[Script::Travel { step_mm: 10 }]);
    let watch = handle.clone();

    let state = run_local(&ex, async move {
        ctl.set_target_height(1300).await.unwrap();
        wait_until(|| watch.moves_this_session() >= 3).await;
        ctl.set_target_height(900).await.unwrap();
        ctl.wait_for_movement().await;
        ctl.get_state()
    });

    let calls = handle.calls();
    let connects: Vec<usize> = calls
        .iter()
        .enumerate()
        .filter(|(_, c)| **c == LinkCall::Connect)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(connects.len(), 2);

    let first_session = &calls[connects[0]..connects[1]];
    let up = deskctl::units::to_wire(deskctl::units::to_raw(1300));
    assert!(
        first_session
            .iter()
            .filter(|c| **c == LinkCall::MoveTo(up))
            .count()
            >= 3
    );
    assert_eq!(
        &first_session[first_session.len() - 3..],
        &[LinkCall::Unsubscribe, LinkCall::Stop, LinkCall::Disconnect],
        "cleanup must finish before the second connect"
    );
    assert_eq!(handle.overlapping_sessions(), 0);
    assert_eq!(state.target_height_mm, 900);
    assert_eq!(state.current_height_mm, 900);
    assert!(!state.is_moving);
}

// ── Failure and retry ─────────────────────────────────────────

#[test]
fn stall_is_retried_exactly_once() {
    let (ex, ctl, handle, sink) = setup(900, &[Script::Stuck]);

    let (report, state) = run_local(&ex, async move {
        ctl.set_target_height(1300).await.unwrap();
        let report = ctl.wait_for_movement().await;
        (report, ctl.get_state())
    });

    let report = report.unwrap();
    assert_eq!(report.outcome, AttemptOutcome::Stalled);
    assert_eq!(report.attempts, 2);
    assert_eq!(handle.sessions(), 2);
    assert_eq!(handle.count(LinkCall::Unsubscribe), 2);
    assert_eq!(handle.count(LinkCall::Disconnect), 2);

    assert!(!state.is_moving);
    assert_eq!(state.target_height_mm, 1300);
    assert_eq!(state.current_height_mm, 900);
    assert_ne!(state.target_height_mm, state.current_height_mm);

    let attempts: Vec<u32> = sink
        .events
        .borrow()
        .iter()
        .filter_map(|e| match e {
            DeskEvent::AttemptFinished { attempt, .. } => Some(*attempt),
            _ => None,
        })
        .collect();
    assert_eq!(attempts, vec![1, 2]);
}

#[test]
fn supersede_during_pending_connect_only_disconnects() {
    let config = DeskConfig {
        connect_timeout_ms: 5_000,
        ..test_config()
    };
    let (ex, ctl, handle, sink) = setup_with(
        &config,
        1000,
        &[Script::HangConnect, Script::Travel { step_mm: 50 }],
    );
    let watch = handle.clone();

    let (report, state) = run_local(&ex, async move {
        ctl.set_target_height(1300).await.unwrap();
        wait_until(|| watch.count(LinkCall::Connect) >= 1).await;
        ctl.set_target_height(1100).await.unwrap();
        let report = ctl.wait_for_movement().await;
        (report, ctl.get_state())
    });

    let calls = handle.calls();
    assert_eq!(
        &calls[..3],
        &[LinkCall::Connect, LinkCall::Disconnect, LinkCall::Connect]
    );
    assert_eq!(handle.overlapping_sessions(), 0);
    assert_eq!(report.unwrap().outcome, AttemptOutcome::Reached);
    assert_eq!(state.current_height_mm, 1100);
    assert_eq!(attempt_numbers(&sink, 1300), vec![1]);
    assert!(sink.events.borrow().contains(&DeskEvent::AttemptFinished {
        target_mm: 1300,
        attempt: 1,
        outcome: AttemptOutcome::Cancelled,
    }));
}

#[test]
fn supersede_during_retry_pause_skips_the_retry() {
    let config = DeskConfig {
        retry_delay_ms: 5_000,
        ..test_config()
    };
    let (ex, ctl, handle, sink) = setup_with(&config, 900, &[Script::Stuck]);
    let events = Rc::clone(&sink);

    let (superseded, report) = run_local(&ex, async move {
        ctl.set_target_height(1300).await.unwrap();
        wait_until(|| {
            events
                .events
                .borrow()
                .iter()
                .any(|e| matches!(e, DeskEvent::AttemptFinished { .. }))
        })
        .await;
        ctl.set_target_height(900).await.unwrap();
        let superseded = ctl.last_report();
        (superseded, ctl.wait_for_movement().await)
    });

    let superseded = superseded.unwrap();
    assert_eq!(superseded.target_mm, 1300);
    assert_eq!(superseded.outcome, AttemptOutcome::Cancelled);
    assert_eq!(superseded.attempts, 1);
    assert_eq!(attempt_numbers(&sink, 1300), vec![1]);
    assert_eq!(handle.sessions(), 2, "the pending retry must not open a session");
    assert_eq!(report.unwrap().outcome, AttemptOutcome::Reached);
}

#[test]
fn obstructed_simulated_desk_stalls_and_retries_once() {
    let config = test_config();
    let desk = SimulatedDesk::new(1000).with_obstruction(1030);
    let (ex, ctl, sink) = build(&config, desk);

    let (report, state) = run_local(&ex, async move {
        ctl.set_target_height(1300).await.unwrap();
        let report = ctl.wait_for_movement().await;
        (report, ctl.get_state())
    });

    let report = report.unwrap();
    assert_eq!(report.outcome, AttemptOutcome::Stalled);
    assert_eq!(report.attempts, 2);
    assert_eq!(attempt_numbers(&sink, 1300), vec![1, 2]);
    assert_eq!(state.current_height_mm, 1030);
    assert_eq!(state.target_height_mm, 1300);
    assert!(!state.is_moving);
}

#[test]
fn connect_timeout_faults_without_stop() {
    let (ex, ctl, handle, _sink) = setup(1000, &[Script::HangConnect]);

    let report = run_local(&ex, async move {
        ctl.set_target_height(1100).await.unwrap();
        ctl.wait_for_movement().await
    });

    let report = report.unwrap();
    assert_eq!(report.outcome, AttemptOutcome::Faulted(LinkError::ConnectTimeout));
    assert_eq!(report.attempts, 2);
    assert_eq!(
        handle.calls(),
        vec![
            LinkCall::Connect,
            LinkCall::Disconnect,
            LinkCall::Connect,
            LinkCall::Disconnect
        ]
    );
}

#[test]
fn retry_recovers_from_failed_connect() {
    let (ex, ctl, handle, _sink) = setup(
        1000,
        &[Script::FailConnect, Script::Travel { step_mm: 50 }],
    );

    let (report, health) = run_local(&ex, async move {
        ctl.set_target_height(1100).await.unwrap();
        let report = ctl.wait_for_movement().await;
        (report, ctl.health())
    });

    let report = report.unwrap();
    assert!(report.is_success());
    assert_eq!(report.attempts, 2);
    assert_eq!(&handle.calls()[..3], &[
        LinkCall::Connect,
        LinkCall::Disconnect,
        LinkCall::Connect
    ]);
    assert_eq!(handle.height_mm(), 1100);
    assert!(!health.movement_active);
    assert_eq!(health.last_movement_ok, Some(true));
}

#[test]
fn state_and_health_readable_while_moving() {
    let (ex, ctl, handle, _sink) = setup(700, &[Script::Travel { step_mm: 2 }]);
    let watch = handle.clone();

    let (during, after) = run_local(&ex, async move {
        ctl.set_target_height(800).await.unwrap();
        wait_until(|| watch.moves_this_session() >= 2).await;
        let during = (ctl.get_state(), ctl.health(), ctl.last_report());
        ctl.wait_for_movement().await;
        (during, (ctl.get_state(), ctl.last_report()))
    });

    let (state, health, report) = during;
    assert!(health.movement_active);
    assert!(state.is_moving);
    assert_eq!(state.target_height_mm, 800);
    assert!(report.is_none());

    let (state, report) = after;
    assert_eq!(state.current_height_mm, 800);
    assert!(report.unwrap().is_success());
}

#[test]
fn wait_without_movement_returns_none() {
    let (ex, ctl, _handle, _sink) = setup(1000, &[Script::Stuck]);
    let report = run_local(&ex, async move { ctl.wait_for_movement().await });
    assert!(report.is_none());
}
