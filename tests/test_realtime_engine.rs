//! The engine on the Tokio scheduler, with the clock paused so timers fire
//! deterministically as virtual time auto-advances.

use std::sync::Arc;
use std::time::Duration;

use stillwater::config::{EngineOptions, PhaseConfig, SessionConfig};
use stillwater::session::{Phase, RunEvent, SessionEngine, SessionEvent};
use stillwater::timer::TokioScheduler;
use tokio::sync::mpsc;

fn engine() -> (SessionEngine, mpsc::UnboundedReceiver<RunEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let engine = SessionEngine::new(
        Arc::new(TokioScheduler::new()),
        Arc::new(tx),
        EngineOptions::default(),
    )
    .unwrap();
    (engine, rx)
}

fn drain(rx: &mut mpsc::UnboundedReceiver<RunEvent>) -> Vec<RunEvent> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

#[tokio::test(start_paused = true)]
async fn meditation_completes_on_wall_clock() {
    let (engine, mut rx) = engine();
    let config = SessionConfig::for_mode("focus").with_total_seconds(3.0);
    let run = engine.session_controller().start(&config).unwrap();

    let mut ticks = Vec::new();
    let completed = tokio::time::timeout(Duration::from_secs(10), async {
        while let Some(event) = rx.recv().await {
            assert_eq!(event.run, run.id());
            match event.event {
                SessionEvent::SessionTick { remaining_seconds } => ticks.push(remaining_seconds),
                SessionEvent::SessionComplete => return true,
                _ => {}
            }
        }
        false
    })
    .await
    .unwrap();

    assert!(completed);
    assert_eq!(ticks, vec![2, 1, 0]);
    assert_eq!(engine.active(), None);
}

#[tokio::test(start_paused = true)]
async fn breathing_phase_changes_at_configured_times() {
    let (engine, mut rx) = engine();
    let start = tokio::time::Instant::now();
    engine
        .phase_cycle()
        .start(&PhaseConfig::new(1.0, 2.0, 1.0))
        .unwrap();

    let mut changes = Vec::new();
    while changes.len() < 4 {
        let event = rx.recv().await.unwrap();
        if let SessionEvent::PhaseChanged { phase, .. } = event.event {
            changes.push((phase, start.elapsed()));
        }
    }

    assert_eq!(
        changes,
        vec![
            (Phase::Inhale, Duration::ZERO),
            (Phase::Hold, Duration::from_secs(1)),
            (Phase::Exhale, Duration::from_secs(3)),
            (Phase::Inhale, Duration::from_secs(4)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn stopped_run_stays_silent() {
    let (engine, mut rx) = engine();
    let cycle = engine.phase_cycle();
    let run = cycle.start(&PhaseConfig::default()).unwrap();

    tokio::time::sleep(Duration::from_millis(1550)).await;
    assert!(cycle.stop(run));
    let before = drain(&mut rx);
    assert_eq!(before.len(), 1 + 15);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(drain(&mut rx).is_empty());
}

#[tokio::test(start_paused = true)]
async fn restart_switches_runs_without_interleaving() {
    let (engine, mut rx) = engine();
    let first = engine
        .session_controller()
        .start(&SessionConfig::for_mode("relax"))
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let second = engine.phase_cycle().start(&PhaseConfig::default()).unwrap();
    tokio::time::sleep(Duration::from_secs(20)).await;

    let events = drain(&mut rx);
    let switch = events
        .iter()
        .position(|e| e.run == second.id())
        .unwrap();
    assert!(events[..switch].iter().all(|e| e.run == first.id()));
    assert!(events[switch..].iter().all(|e| e.run == second.id()));
}
