mod common;

use common::{
    buffer, crashing_sink, key_failing_sink, key_press, key_release, mouse_move,
    recording_sink, unavailable_sink, Log,
};
use macrorec_core::error::PlaybackError;
use macrorec_core::{MacroBuffer, PlaybackConfig, PlaybackMode};
use macrorec_engine::{
    PlaybackNotification, PlaybackOrchestrator, PlaybackOutcome, PlaybackScheduler,
    PlaybackState, RunReport, Timing,
};
use std::{
    sync::{mpsc::Receiver, Arc},
    thread,
    time::{Duration, Instant},
};

const TOLERANCE: Duration = Duration::from_millis(150);

/// Timing where one interval "second" lasts 50ms
fn fast_timing() -> Timing {
    Timing {
        interval_unit: Duration::from_millis(50),
        interval_slice: Duration::from_millis(20),
        ..Default::default()
    }
}

fn wait_idle(scheduler: &PlaybackScheduler) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while scheduler.is_playing() {
        assert!(Instant::now() < deadline, "replay never finished");
        thread::sleep(Duration::from_millis(5));
    }
}

/// Collects notifications up to and including the first `Finished`
fn until_finished(rx: &Receiver<PlaybackNotification>) -> Vec<PlaybackNotification> {
    let mut seen = vec![];
    loop {
        let n = rx
            .recv_timeout(Duration::from_secs(10))
            .expect("playback never finished");
        let done = matches!(n, PlaybackNotification::Finished { .. });
        seen.push(n);
        if done {
            return seen;
        }
    }
}

fn finished(seen: &[PlaybackNotification]) -> (u32, PlaybackOutcome) {
    match seen.last() {
        Some(PlaybackNotification::Finished { completed, outcome }) => {
            (*completed, outcome.clone())
        }
        other => panic!("expected Finished, got {:?}", other),
    }
}

fn progress_count(seen: &[PlaybackNotification]) -> usize {
    seen.iter()
        .filter(|n| matches!(n, PlaybackNotification::Progress(_)))
        .count()
}

fn assert_close(actual: Duration, expected: Duration) {
    let diff = if actual > expected {
        actual - expected
    } else {
        expected - actual
    };
    assert!(
        diff <= TOLERANCE,
        "expected about {:?}, got {:?}",
        expected,
        actual
    );
}

fn dispatch_times(log: &Log) -> Vec<Instant> {
    log.lock().unwrap().iter().map(|(_, at)| *at).collect()
}

fn two_keys_one_second_apart() -> Arc<MacroBuffer> {
    buffer(&[(key_press('a'), 0.0), (key_release('a'), 1.0)])
}

#[test]
fn scheduler_replays_in_order() {
    let (factory, log) = recording_sink();
    let scheduler = PlaybackScheduler::new(factory);
    let events = buffer(&[
        (mouse_move(1, 1), 0.0),
        (key_press('a'), 0.05),
        (key_release('a'), 0.1),
        (mouse_move(2, 2), 0.1),
    ]);

    scheduler.play(Arc::clone(&events), 1.0).unwrap();
    wait_idle(&scheduler);

    let kinds: Vec<_> = log.lock().unwrap().iter().map(|(k, _)| k.clone()).collect();
    let expected: Vec<_> = events.events().iter().map(|e| e.kind.clone()).collect();
    assert_eq!(kinds, expected);
    assert_eq!(
        scheduler.last_report(),
        Some(RunReport {
            dispatched: 4,
            ..Default::default()
        })
    );
}

#[test]
fn double_speed_halves_the_wait() {
    let (factory, log) = recording_sink();
    let scheduler = PlaybackScheduler::new(factory);
    scheduler.play(two_keys_one_second_apart(), 2.0).unwrap();
    wait_idle(&scheduler);

    let times = dispatch_times(&log);
    assert_eq!(times.len(), 2);
    assert_close(times[1] - times[0], Duration::from_millis(500));
}

#[test]
fn half_speed_doubles_the_wait() {
    let (factory, log) = recording_sink();
    let scheduler = PlaybackScheduler::new(factory);
    scheduler.play(two_keys_one_second_apart(), 0.5).unwrap();
    wait_idle(&scheduler);

    let times = dispatch_times(&log);
    assert_eq!(times.len(), 2);
    assert_close(times[1] - times[0], Duration::from_secs(2));
}

#[test]
fn empty_buffer_finishes_immediately() {
    let (factory, log) = recording_sink();
    let scheduler = PlaybackScheduler::new(factory);
    scheduler.play(buffer(&[]), 1.0).unwrap();

    assert!(!scheduler.is_playing());
    assert_eq!(scheduler.last_report(), Some(RunReport::default()));
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn scheduler_rejects_bad_speed() {
    let (factory, _log) = recording_sink();
    let scheduler = PlaybackScheduler::new(factory);
    for speed in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        assert!(matches!(
            scheduler.play(two_keys_one_second_apart(), speed),
            Err(PlaybackError::InvalidConfiguration(_))
        ));
    }
    assert!(!scheduler.is_playing());
}

#[test]
fn scheduler_rejects_second_play() {
    let (factory, log) = recording_sink();
    let scheduler = PlaybackScheduler::new(factory);
    scheduler.play(two_keys_one_second_apart(), 1.0).unwrap();
    assert!(matches!(
        scheduler.play(two_keys_one_second_apart(), 1.0),
        Err(PlaybackError::Busy)
    ));

    scheduler.stop();
    wait_idle(&scheduler);
    assert!(log.lock().unwrap().len() <= 1);
    assert!(scheduler.last_report().unwrap().cancelled);
}

#[test]
fn injection_failures_are_skipped() {
    let (factory, log) = key_failing_sink();
    let scheduler = PlaybackScheduler::new(factory);
    let events = buffer(&[
        (key_press('a'), 0.0),
        (mouse_move(3, 4), 0.01),
        (key_release('a'), 0.02),
        (mouse_move(5, 6), 0.03),
    ]);
    scheduler.play(events, 1.0).unwrap();
    wait_idle(&scheduler);

    let report = scheduler.last_report().unwrap();
    assert_eq!(report.dispatched, 2);
    assert_eq!(report.failed, 2);
    assert!(!report.cancelled);
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[test]
fn stop_interrupts_a_long_wait() {
    let (factory, log) = recording_sink();
    let scheduler = PlaybackScheduler::new(factory);
    let events = buffer(&[(key_press('a'), 0.0), (key_release('a'), 30.0)]);
    scheduler.play(events, 1.0).unwrap();
    thread::sleep(Duration::from_millis(50));

    let stopped_at = Instant::now();
    scheduler.stop();
    wait_idle(&scheduler);
    assert!(stopped_at.elapsed() < TOLERANCE);
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn stop_right_after_start_cancels_the_new_run() {
    let (factory, _log) = recording_sink();
    let scheduler = Arc::new(PlaybackScheduler::new(factory));
    let events = buffer(&[(key_press('a'), 0.0), (key_release('a'), 30.0)]);

    for _ in 0..50 {
        let stopper = {
            let scheduler = Arc::clone(&scheduler);
            thread::spawn(move || {
                while !scheduler.is_playing() {
                    std::hint::spin_loop();
                }
                scheduler.stop();
            })
        };
        scheduler.play(Arc::clone(&events), 1.0).unwrap();
        stopper.join().unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while scheduler.is_playing() {
            assert!(Instant::now() < deadline, "stop was lost");
            thread::sleep(Duration::from_millis(1));
        }
        assert!(scheduler.last_report().unwrap().cancelled);
    }
}

#[test]
fn panicking_sink_is_reported() {
    let scheduler = PlaybackScheduler::new(crashing_sink("driver crashed"));
    scheduler.play(two_keys_one_second_apart(), 1.0).unwrap();
    wait_idle(&scheduler);

    let report = scheduler.last_report().unwrap();
    assert_eq!(report.panic.as_deref(), Some("driver crashed"));
    assert_eq!(report.dispatched, 0);

    // the scheduler is usable again
    scheduler.play(two_keys_one_second_apart(), 1.0).unwrap();
    wait_idle(&scheduler);
}

#[test]
fn stop_when_idle_does_nothing() {
    let (factory, _log) = recording_sink();
    let scheduler = PlaybackScheduler::new(factory);
    scheduler.stop();
    assert!(!scheduler.is_playing());

    let (orchestrator, rx) = PlaybackOrchestrator::new(recording_sink().0);
    orchestrator.stop();
    assert_eq!(orchestrator.state(), PlaybackState::Idle);
    assert!(rx.try_recv().is_err());
}

#[test]
fn plays_once() {
    let (factory, log) = recording_sink();
    let (orchestrator, rx) = PlaybackOrchestrator::new(factory);
    let events = buffer(&[(key_press('a'), 0.0), (key_release('a'), 0.05)]);

    orchestrator.play(events, &PlaybackConfig::once(1.0)).unwrap();
    let seen = until_finished(&rx);

    assert_eq!(
        seen[0],
        PlaybackNotification::Started {
            mode: PlaybackMode::Once,
            speed: 1.0
        }
    );
    assert_eq!(progress_count(&seen), 1);
    assert_eq!(finished(&seen), (1, PlaybackOutcome::Completed));
    assert_eq!(log.lock().unwrap().len(), 2);
    assert!(!orchestrator.is_running());
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn plays_n_times() {
    let (factory, log) = recording_sink();
    let (orchestrator, rx) = PlaybackOrchestrator::new(factory);
    let events = buffer(&[(key_press('a'), 0.0), (key_release('a'), 0.02)]);

    orchestrator
        .play(events, &PlaybackConfig::times(2.0, 3))
        .unwrap();
    let seen = until_finished(&rx);

    let completed: Vec<_> = seen
        .iter()
        .filter_map(|n| match n {
            PlaybackNotification::Progress(p) => Some((p.completed, p.target)),
            _ => None,
        })
        .collect();
    assert_eq!(completed, vec![(1, Some(3)), (2, Some(3)), (3, Some(3))]);
    assert_eq!(finished(&seen), (3, PlaybackOutcome::Completed));
    assert_eq!(log.lock().unwrap().len(), 6);
}

#[test]
fn infinite_runs_until_stopped() {
    let (factory, _log) = recording_sink();
    let (orchestrator, rx) = PlaybackOrchestrator::new(factory);
    let events = buffer(&[(mouse_move(0, 0), 0.0), (mouse_move(1, 1), 0.01)]);

    orchestrator
        .play(events, &PlaybackConfig::times(1.0, 0))
        .unwrap();
    assert_eq!(orchestrator.state(), PlaybackState::Running);

    // let a few runs go by
    let mut runs = 0;
    while runs < 3 {
        if let PlaybackNotification::Progress(p) = rx.recv_timeout(Duration::from_secs(5)).unwrap()
        {
            assert_eq!(p.target, None);
            runs += 1;
        }
    }
    orchestrator.stop();

    let seen = until_finished(&rx);
    let (completed, outcome) = finished(&seen);
    assert!(completed >= 3);
    assert_eq!(outcome, PlaybackOutcome::Cancelled);
    assert!(!orchestrator.is_running());
    assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
}

#[test]
fn interval_waits_between_runs() {
    let (factory, log) = recording_sink();
    let (orchestrator, rx) = PlaybackOrchestrator::with_timing(factory, fast_timing());
    let events = buffer(&[(key_press('a'), 0.0)]);

    // 5 simulated seconds = 250ms
    orchestrator
        .play(events, &PlaybackConfig::interval(1.0, 2, 5))
        .unwrap();
    let seen = until_finished(&rx);
    assert_eq!(finished(&seen), (2, PlaybackOutcome::Completed));

    let times = dispatch_times(&log);
    assert_eq!(times.len(), 2);
    assert!(times[1] - times[0] >= Duration::from_millis(250));
    assert_close(times[1] - times[0], Duration::from_millis(250));
}

#[test]
fn stop_during_interval_prevents_next_run() {
    let (factory, log) = recording_sink();
    let (orchestrator, rx) = PlaybackOrchestrator::with_timing(factory, fast_timing());
    let events = buffer(&[(key_press('a'), 0.0)]);

    // 40 simulated seconds = 2s
    orchestrator
        .play(events, &PlaybackConfig::interval(1.0, 0, 40))
        .unwrap();
    loop {
        let n = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        if let PlaybackNotification::Progress(p) = n {
            assert_eq!(p.interval, Some(40));
            break;
        }
    }
    thread::sleep(Duration::from_millis(100));

    let stopped_at = Instant::now();
    orchestrator.stop();
    let seen = until_finished(&rx);
    assert!(stopped_at.elapsed() < TOLERANCE);
    assert_eq!(finished(&seen), (1, PlaybackOutcome::Cancelled));
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn stop_handle_works_from_another_thread() {
    let (factory, _log) = recording_sink();
    let (orchestrator, rx) = PlaybackOrchestrator::new(factory);
    let events = buffer(&[(key_press('a'), 0.0), (key_release('a'), 20.0)]);
    orchestrator.play(events, &PlaybackConfig::once(1.0)).unwrap();

    let handle = orchestrator.stop_handle();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        handle.stop();
    })
    .join()
    .unwrap();

    let seen = until_finished(&rx);
    assert_eq!(finished(&seen), (0, PlaybackOutcome::Cancelled));
    assert_eq!(orchestrator.state(), PlaybackState::Idle);
}

#[test]
fn rejected_play_sends_nothing() {
    let (factory, _log) = recording_sink();
    let (orchestrator, rx) = PlaybackOrchestrator::new(factory);

    assert!(matches!(
        orchestrator.play(buffer(&[]), &PlaybackConfig::once(1.0)),
        Err(PlaybackError::EmptyMacro)
    ));
    assert!(matches!(
        orchestrator.play(two_keys_one_second_apart(), &PlaybackConfig::once(0.0)),
        Err(PlaybackError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        orchestrator.play(
            two_keys_one_second_apart(),
            &PlaybackConfig::interval(1.0, 1, 0)
        ),
        Err(PlaybackError::InvalidConfiguration(_))
    ));
    assert!(!orchestrator.is_running());
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
}

#[test]
fn second_play_is_rejected_while_running() {
    let (factory, _log) = recording_sink();
    let (orchestrator, rx) = PlaybackOrchestrator::new(factory);
    orchestrator
        .play(two_keys_one_second_apart(), &PlaybackConfig::once(1.0))
        .unwrap();

    assert!(matches!(
        orchestrator.play(two_keys_one_second_apart(), &PlaybackConfig::once(1.0)),
        Err(PlaybackError::Busy)
    ));

    orchestrator.stop();
    let seen = until_finished(&rx);
    assert_eq!(
        seen.iter()
            .filter(|n| matches!(n, PlaybackNotification::Finished { .. }))
            .count(),
        1
    );
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
}

#[test]
fn config_is_snapshotted_at_start() {
    let (factory, _log) = recording_sink();
    let (orchestrator, rx) = PlaybackOrchestrator::new(factory);
    let mut config = PlaybackConfig::times(1.0, 2);
    orchestrator
        .play(buffer(&[(key_press('a'), 0.0)]), &config)
        .unwrap();
    config.repeat_count = 10;

    let seen = until_finished(&rx);
    assert_eq!(finished(&seen), (2, PlaybackOutcome::Completed));
}

#[test]
fn missing_sink_fails_the_playback() {
    let (orchestrator, rx) = PlaybackOrchestrator::new(unavailable_sink());
    orchestrator
        .play(two_keys_one_second_apart(), &PlaybackConfig::times(1.0, 3))
        .unwrap();

    let seen = until_finished(&rx);
    let (completed, outcome) = finished(&seen);
    assert_eq!(completed, 0);
    assert!(matches!(outcome, PlaybackOutcome::Failed(_)));
    assert!(!orchestrator.is_running());
}

#[test]
fn can_play_again_after_finishing() {
    let (factory, log) = recording_sink();
    let (orchestrator, rx) = PlaybackOrchestrator::new(factory);
    let events = buffer(&[(key_press('a'), 0.0)]);

    for _ in 0..2 {
        orchestrator
            .play(Arc::clone(&events), &PlaybackConfig::once(1.0))
            .unwrap();
        let seen = until_finished(&rx);
        assert_eq!(finished(&seen), (1, PlaybackOutcome::Completed));
    }
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[test]
fn panicking_sink_finishes_exactly_once() {
    let (orchestrator, rx) = PlaybackOrchestrator::new(crashing_sink("driver crashed"));
    let events = buffer(&[(mouse_move(1, 1), 0.0), (key_press('a'), 0.01)]);

    for _ in 0..2 {
        orchestrator
            .play(Arc::clone(&events), &PlaybackConfig::times(1.0, 3))
            .unwrap();
        let seen = until_finished(&rx);

        assert_eq!(progress_count(&seen), 0);
        let (completed, outcome) = finished(&seen);
        assert_eq!(completed, 0);
        match outcome {
            PlaybackOutcome::Failed(reason) => assert!(
                reason.contains("driver crashed"),
                "unexpected reason {:?}",
                reason
            ),
            other => panic!("expected a failure, got {:?}", other),
        }
        assert!(!orchestrator.is_running());
        assert_eq!(orchestrator.state(), PlaybackState::Idle);
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }
}
