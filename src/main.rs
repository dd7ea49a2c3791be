mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::{Duration, Instant, SystemTime},
};
use tracing::{info, warn};
use typemaster::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    corpus::{Corpus, CorpusProvider, FixedText, TextProvider},
    engine::Engine,
    history::{HistoryDb, HistorySummary},
    input_policy::{Edit, InputBuffer},
    logging::{init_tracing, LogFormat},
    runtime::{AppEvent, CrosstermEventSource, Drivers, FixedTicker, Runner},
    sink::{HistorySink, MemorySink, ResultSink},
    stats::SessionResult,
    AppError, COUNTDOWN_INTERVAL_MS, IDLE_POLL_MS,
};

/// typing speed trainer with live wpm sampling and local history
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A typing speed trainer: type a sample paragraph against the clock and get net WPM, accuracy, and a WPM-over-time chart, with results kept in a local history."
)]
pub struct Cli {
    /// custom prompt to use instead of a random paragraph
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// number of seconds before the test ends
    #[clap(short = 's', long)]
    secs: Option<u64>,

    /// profile name results are stored under
    #[clap(long)]
    profile: Option<String>,

    /// JSON corpus file of the form {"name": ..., "texts": [...]}
    #[clap(long)]
    corpus: Option<PathBuf>,

    /// do not save results to history for this run
    #[clap(long)]
    no_history: bool,

    /// open the history dashboard on start
    #[clap(long)]
    history: bool,

    /// write the profile's history to a CSV file and exit
    #[clap(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// delete the profile's history and exit
    #[clap(long, conflicts_with = "export")]
    clear_history: bool,

    /// format of the log file
    #[clap(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl Cli {
    /// Overlay command line flags onto the stored configuration
    fn apply_to(&self, config: &mut Config) {
        if let Some(secs) = self.secs {
            config.duration_secs = secs;
        }
        if let Some(ref profile) = self.profile {
            config.profile = profile.clone();
        }
        if let Some(ref corpus) = self.corpus {
            config.corpus_path = Some(corpus.clone());
        }
        if self.no_history {
            config.record_history = false;
        }
    }

    fn text_provider(&self, config: &Config) -> typemaster::Result<Box<dyn TextProvider>> {
        if let Some(ref prompt) = self.prompt {
            if prompt.trim().is_empty() {
                return Err(AppError::Config("prompt must not be empty".to_string()));
            }
            return Ok(Box::new(FixedText::new(prompt.clone())));
        }
        let corpus = match config.corpus_path {
            Some(ref path) => Corpus::from_path(path)?,
            None => Corpus::english()?,
        };
        Ok(Box::new(CorpusProvider::new(corpus)))
    }
}

fn result_sink(config: &Config) -> Box<dyn ResultSink> {
    if !config.record_history {
        return Box::new(MemorySink::default());
    }
    match HistoryDb::open_default() {
        Ok(db) => Box::new(HistorySink::new(db, config.profile.clone())),
        Err(err) => {
            warn!(%err, "history unavailable, keeping results in memory");
            Box::new(MemorySink::default())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Typing,
    Results,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

#[derive(Debug, Default)]
pub struct HistoryView {
    pub summary: HistorySummary,
    pub scroll_offset: usize,
    pub return_to: Option<AppState>,
}

pub struct App {
    pub config: Config,
    pub engine: Engine,
    pub input: InputBuffer,
    pub state: AppState,
    pub history_view: HistoryView,
    provider: Box<dyn TextProvider>,
    sink: Box<dyn ResultSink>,
}

impl App {
    pub fn new(
        config: Config,
        provider: Box<dyn TextProvider>,
        sink: Box<dyn ResultSink>,
    ) -> Self {
        let engine = Engine::new(provider.choose_text(), config.session_config());
        Self {
            config,
            engine,
            input: InputBuffer::new(),
            state: AppState::Typing,
            history_view: HistoryView::default(),
            provider,
            sink,
        }
    }

    pub fn drivers(&self) -> Drivers {
        Drivers::new(
            Duration::from_millis(COUNTDOWN_INTERVAL_MS),
            self.config.sample_interval(),
        )
    }

    /// Drop the current session and start over with a freshly chosen text.
    /// Drivers are cancelled first so nothing fires into the new session.
    pub fn restart(&mut self, drivers: &mut Drivers) {
        drivers.cancel_all();
        self.engine.restart(self.provider.as_ref());
        self.input.clear();
        self.state = AppState::Typing;
    }

    pub fn open_history(&mut self) {
        let return_to = match self.state {
            AppState::History => self.history_view.return_to,
            state => Some(state),
        };
        self.history_view = HistoryView {
            summary: self.sink.summary().unwrap_or_default(),
            scroll_offset: 0,
            return_to,
        };
        self.state = AppState::History;
    }

    /// Hand a freshly produced result to the sink and show it
    fn complete(&mut self, result: Option<SessionResult>, drivers: &mut Drivers) {
        let Some(result) = result else {
            return;
        };
        drivers.cancel_all();
        if let Err(err) = self.sink.record(&result) {
            warn!(%err, "failed to record session result");
        }
        self.state = AppState::Results;
    }

    pub fn on_event(&mut self, event: AppEvent, drivers: &mut Drivers, now: SystemTime) -> Control {
        match event {
            AppEvent::Key(key) => return self.on_key(key, drivers, now),
            AppEvent::Paste(text) => {
                if self.state == AppState::Typing {
                    self.input.on_paste(&text);
                }
            }
            AppEvent::Countdown => {
                let result = self.engine.tick(now);
                self.complete(result, drivers);
            }
            AppEvent::Sample => self.engine.sample(now),
            AppEvent::Resize | AppEvent::Tick => {}
        }
        Control::Continue
    }

    fn on_key(&mut self, key: KeyEvent, drivers: &mut Drivers, now: SystemTime) -> Control {
        if key.code == KeyCode::Esc
            || (key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c'))
        {
            return Control::Quit;
        }

        match self.state {
            AppState::Typing => match key.code {
                KeyCode::Tab => self.restart(drivers),
                KeyCode::Enter => {
                    if self.engine.has_started() {
                        let result = self.engine.finish(now);
                        self.complete(result, drivers);
                    }
                }
                _ => {
                    if let Edit::Changed(snapshot) = self.input.on_key(&key) {
                        let was_running = self.engine.is_running();
                        let result = self.engine.apply_input(&snapshot, now);
                        if !was_running && self.engine.is_running() {
                            drivers.arm(Instant::now());
                        }
                        self.complete(result, drivers);
                    }
                }
            },
            AppState::Results => match key.code {
                KeyCode::Enter | KeyCode::Tab | KeyCode::Char('r') | KeyCode::Char('n') => {
                    self.restart(drivers)
                }
                KeyCode::Char('h') => self.open_history(),
                KeyCode::Char('q') => return Control::Quit,
                _ => {}
            },
            AppState::History => match key.code {
                KeyCode::Char('b') | KeyCode::Backspace => {
                    self.state = self.history_view.return_to.unwrap_or(AppState::Typing);
                }
                KeyCode::Char('r') | KeyCode::Char('n') => self.restart(drivers),
                KeyCode::Char('q') => return Control::Quit,
                KeyCode::Up => {
                    self.history_view.scroll_offset = self.history_view.scroll_offset.saturating_sub(1);
                }
                KeyCode::Down => self.history_view.scroll_offset += 1,
                KeyCode::PageUp => {
                    self.history_view.scroll_offset = self.history_view.scroll_offset.saturating_sub(10);
                }
                KeyCode::PageDown => self.history_view.scroll_offset += 10,
                KeyCode::Home => self.history_view.scroll_offset = 0,
                _ => {}
            },
        }
        Control::Continue
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if let Some(log_path) = AppDirs::log_path() {
        if let Err(err) = init_tracing(&log_path, cli.log_format) {
            eprintln!("logging disabled: {err}");
        }
    }

    let store = FileConfigStore::new();
    let stored = store.load();
    if !store.path().exists() {
        if let Err(err) = store.save(&stored) {
            warn!(%err, "failed to write default config");
        }
    }
    let mut config = stored;
    cli.apply_to(&mut config);

    if let Some(ref path) = cli.export {
        let db = HistoryDb::open_default()?;
        let rows = db.export_csv(&config.profile, path)?;
        println!("exported {rows} results to {}", path.display());
        return Ok(());
    }

    if cli.clear_history {
        let db = HistoryDb::open_default()?;
        let removed = db.clear(&config.profile)?;
        info!(profile = %config.profile, removed, "history cleared");
        println!("cleared {removed} results for profile {}", config.profile);
        return Ok(());
    }

    let provider = match cli.text_provider(&config) {
        Ok(provider) => provider,
        Err(AppError::Config(msg)) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::InvalidValue, msg).exit();
        }
        Err(err) => return Err(err.into()),
    };

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let sink = result_sink(&config);
    let mut app = App::new(config, provider, sink);
    if cli.history {
        app.open_history();
    }
    info!(profile = %app.config.profile, secs = app.config.duration_secs, "starting");

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    outcome
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(IDLE_POLL_MS)),
        app.drivers(),
    );

    terminal.draw(|f| ui(app, f))?;

    loop {
        let event = runner.step();
        let redraw = event != AppEvent::Tick;

        if app.on_event(event, runner.drivers_mut(), SystemTime::now()) == Control::Quit {
            break;
        }

        if redraw {
            terminal.draw(|f| ui(app, f))?;
        }
    }

    Ok(())
}

fn ui(app: &mut App, f: &mut Frame) {
    match app.state {
        AppState::History => ui::history::render_history(app, f),
        AppState::Typing | AppState::Results => f.render_widget(&*app, f.area()),
    }
}
