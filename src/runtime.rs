use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// Unified event type consumed by the app runner
#[derive(Clone, Debug, PartialEq)]
pub enum AppEvent {
    Key(KeyEvent),
    /// Bulk text insertion from the terminal; rejected by the input policy
    Paste(String),
    Resize,
    /// One countdown period has elapsed
    Countdown,
    /// Time to take a live sample
    Sample,
    /// Nothing happened within the idle poll interval
    Tick,
}

/// Source of terminal events (keyboard, paste, resize)
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<AppEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let ev = match event::read() {
                Ok(CtEvent::Key(key)) if key.kind != KeyEventKind::Release => AppEvent::Key(key),
                Ok(CtEvent::Paste(text)) => AppEvent::Paste(text),
                Ok(CtEvent::Resize(_, _)) => AppEvent::Resize,
                Ok(_) => continue,
                Err(_) => break,
            };
            if tx.send(ev).is_err() {
                break;
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<AppEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<AppEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<AppEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverKind {
    Countdown,
    Sample,
}

impl From<DriverKind> for AppEvent {
    fn from(kind: DriverKind) -> Self {
        match kind {
            DriverKind::Countdown => AppEvent::Countdown,
            DriverKind::Sample => AppEvent::Sample,
        }
    }
}

/// Shortest period a driver may have; a zero period would never advance
const MIN_PERIOD: Duration = Duration::from_millis(1);

#[derive(Clone, Copy, Debug)]
struct Driver {
    period: Duration,
    next_due: Instant,
}

/// The two periodic drivers of a running session.
///
/// Both are armed together when the session starts running and cancelled
/// together when it stops, so neither can fire into a session that has
/// finished or been replaced.
#[derive(Clone, Debug)]
pub struct Drivers {
    countdown_period: Duration,
    sample_period: Duration,
    countdown: Option<Driver>,
    sampler: Option<Driver>,
}

impl Drivers {
    pub fn new(countdown_period: Duration, sample_period: Duration) -> Self {
        Self {
            countdown_period: countdown_period.max(MIN_PERIOD),
            sample_period: sample_period.max(MIN_PERIOD),
            countdown: None,
            sampler: None,
        }
    }

    pub fn arm(&mut self, now: Instant) {
        self.countdown = Some(Driver {
            period: self.countdown_period,
            next_due: now + self.countdown_period,
        });
        self.sampler = Some(Driver {
            period: self.sample_period,
            next_due: now + self.sample_period,
        });
    }

    pub fn cancel_all(&mut self) {
        self.countdown = None;
        self.sampler = None;
    }

    pub fn is_armed(&self) -> bool {
        self.countdown.is_some() || self.sampler.is_some()
    }

    /// Earliest pending driver; the countdown wins ties
    pub fn next_due(&self) -> Option<(Instant, DriverKind)> {
        let countdown = self.countdown.map(|d| (d.next_due, DriverKind::Countdown));
        let sampler = self.sampler.map(|d| (d.next_due, DriverKind::Sample));
        match (countdown, sampler) {
            (Some(c), Some(s)) => Some(if s.0 < c.0 { s } else { c }),
            (c, s) => c.or(s),
        }
    }

    /// Mark `kind` as fired and schedule its next period
    fn fire(&mut self, kind: DriverKind) {
        let driver = match kind {
            DriverKind::Countdown => self.countdown.as_mut(),
            DriverKind::Sample => self.sampler.as_mut(),
        };
        if let Some(d) = driver {
            d.next_due += d.period;
        }
    }
}

/// Runner that advances the application one event at a time, interleaving
/// terminal events with the session drivers
pub struct Runner<E: EventSource, T: Ticker> {
    event_source: E,
    ticker: T,
    drivers: Drivers,
}

impl<E: EventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T, drivers: Drivers) -> Self {
        Self {
            event_source,
            ticker,
            drivers,
        }
    }

    pub fn drivers(&self) -> &Drivers {
        &self.drivers
    }

    pub fn drivers_mut(&mut self) -> &mut Drivers {
        &mut self.drivers
    }

    /// Blocks until the next event or due driver. With no drivers armed,
    /// waits up to the ticker interval and returns Tick on timeout.
    pub fn step(&mut self) -> AppEvent {
        let Some((due, kind)) = self.drivers.next_due() else {
            return match self.event_source.recv_timeout(self.ticker.interval()) {
                Ok(ev) => ev,
                Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                    AppEvent::Tick
                }
            };
        };

        let wait = due.saturating_duration_since(Instant::now());
        if !wait.is_zero() {
            match self.event_source.recv_timeout(wait) {
                Ok(ev) => return ev,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    std::thread::sleep(due.saturating_duration_since(Instant::now()))
                }
            }
        }

        self.drivers.fire(kind);
        kind.into()
    }
}
