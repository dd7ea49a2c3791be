use std::sync::mpsc;
use std::time::{Duration, Instant, SystemTime};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use typemaster::{
    engine::Engine,
    input_policy::{Edit, InputBuffer},
    runtime::{AppEvent, Drivers, FixedTicker, Runner, TestEventSource},
    session::{Phase, SessionConfig},
    stats::SessionResult,
};

fn key(c: char) -> AppEvent {
    AppEvent::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
}

fn runner(
    rx: mpsc::Receiver<AppEvent>,
    countdown: Duration,
    sample: Duration,
) -> Runner<TestEventSource, FixedTicker> {
    Runner::new(
        TestEventSource::new(rx),
        FixedTicker::new(Duration::from_millis(5)),
        Drivers::new(countdown, sample),
    )
}

/// Minimal event loop mirroring the binary: keys go through the input
/// buffer, the first edit arms the drivers, driver events reach the engine.
fn drive<F>(
    runner: &mut Runner<TestEventSource, FixedTicker>,
    engine: &mut Engine,
    max_steps: usize,
    mut on_event: F,
) -> Option<SessionResult>
where
    F: FnMut(&AppEvent),
{
    let mut input = InputBuffer::new();
    for _ in 0..max_steps {
        let event = runner.step();
        on_event(&event);
        let now = SystemTime::now();
        let result = match event {
            AppEvent::Key(k) => match input.on_key(&k) {
                Edit::Changed(snapshot) => {
                    let was_running = engine.is_running();
                    let result = engine.apply_input(&snapshot, now);
                    if !was_running && engine.is_running() {
                        runner.drivers_mut().arm(Instant::now());
                    }
                    result
                }
                _ => None,
            },
            AppEvent::Countdown => engine.tick(now),
            AppEvent::Sample => {
                engine.sample(now);
                None
            }
            _ => None,
        };
        if result.is_some() {
            runner.drivers_mut().cancel_all();
            return result;
        }
    }
    None
}

#[test]
fn headless_typing_flow_completes() {
    let (tx, rx) = mpsc::channel();
    let mut runner = runner(rx, Duration::from_secs(1), Duration::from_millis(500));
    let mut engine = Engine::new("hi".to_string(), SessionConfig::default());

    tx.send(key('h')).unwrap();
    tx.send(key('i')).unwrap();

    let result = drive(&mut runner, &mut engine, 100, |_| {});

    let result = result.expect("typing the whole prompt should finish the session");
    assert_eq!(engine.phase(), Phase::Finished);
    assert_eq!(result.accuracy, 100);
    assert_eq!(result.total_chars, 2);
    assert!(!runner.drivers().is_armed());
}

#[test]
fn headless_countdown_expiry_finishes_session() {
    let (tx, rx) = mpsc::channel();
    let mut runner = runner(rx, Duration::from_millis(10), Duration::from_millis(4));
    let mut engine = Engine::new(
        "hello world".to_string(),
        SessionConfig { duration_secs: 3 },
    );

    tx.send(key('h')).unwrap();
    tx.send(key('e')).unwrap();

    let mut countdowns = 0;
    let mut samples = 0;
    let result = drive(&mut runner, &mut engine, 1000, |event| match event {
        AppEvent::Countdown => countdowns += 1,
        AppEvent::Sample => samples += 1,
        _ => {}
    });

    let result = result.expect("countdown should finish the session");
    assert_eq!(countdowns, 3);
    assert!(samples > 0);
    assert_eq!(engine.seconds_remaining(), 0);
    assert_eq!(result.total_chars, 2);
    assert!(result.elapsed_time >= 1.0);
    assert!(!result.history.is_empty());
    assert!(result.history.windows(2).all(|w| w[0].t < w[1].t));
}

#[test]
fn headless_idle_session_never_arms_drivers() {
    let (_tx, rx) = mpsc::channel();
    let mut runner = runner(rx, Duration::from_millis(1), Duration::from_millis(1));
    let mut engine = Engine::new("hi".to_string(), SessionConfig::default());

    let mut ticks = 0;
    let result = drive(&mut runner, &mut engine, 5, |event| {
        if *event == AppEvent::Tick {
            ticks += 1;
        }
    });

    assert!(result.is_none());
    assert_eq!(ticks, 5);
    assert_eq!(engine.phase(), Phase::Idle);
    assert_eq!(engine.seconds_remaining(), 60);
}
