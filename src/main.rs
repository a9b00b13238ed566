//! Terminal FHE Tetris runner (default binary).
//!
//! crossterm drives input and the framebuffer renderer; ledger commands run on a
//! current-thread tokio runtime with `block_on`, between frames.

use std::fs::File;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use tokio::runtime::Runtime;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fhe_tetris::core::GameState;
use fhe_tetris::input::{handle_key_event, should_quit, Command};
use fhe_tetris::ledger::{
    FileSessionStore, LedgerConfig, LocalGateway, LocalLedger, LocalSigner, MemorySessionStore,
    SessionStore, StatusReport, SyncClient, SystemClock, WalletSigner,
};
use fhe_tetris::term::{FrameBuffer, GameView, SidePanel, TerminalRenderer, Viewport};
use fhe_tetris::types::TICK_MS;

const PLAYER_SEED: &str = "local-player";

fn main() -> Result<()> {
    init_logging()?;

    let config = LedgerConfig::from_env()?;
    info!(chain_id = config.chain_id, contract = %config.contract, "starting");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to build tokio runtime")?;
    let client = build_client(&config)?;

    let mut term = TerminalRenderer::new();
    term.enter()?;

    let result = App::new(client, runtime).run(&mut term);

    // Always try to restore terminal state.
    let _ = term.exit();
    result
}

/// Log to `TETRIS_LOG_PATH` when set; the terminal itself is in raw mode.
fn init_logging() -> Result<()> {
    let Some(path) = std::env::var_os("TETRIS_LOG_PATH") else {
        return Ok(());
    };
    let file = File::create(&path)
        .with_context(|| format!("failed to create log file {}", path.to_string_lossy()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn build_client(config: &LedgerConfig) -> Result<SyncClient> {
    let clock = Arc::new(SystemClock);
    let signer = Arc::new(LocalSigner::from_seed(PLAYER_SEED));
    let ledger = Arc::new(LocalLedger::new(clock.clone()).connect(signer.address()));

    let store: Arc<dyn SessionStore> = match &config.store_path {
        Some(path) => Arc::new(
            FileSessionStore::open(path)
                .with_context(|| format!("failed to open store {}", path.display()))?,
        ),
        None => Arc::new(MemorySessionStore::new()),
    };

    Ok(SyncClient::new(
        config,
        signer,
        ledger,
        Arc::new(LocalGateway::new()),
        store,
        clock,
    ))
}

struct App {
    client: SyncClient,
    runtime: Runtime,
    state: GameState,
    view: GameView,
    fb: FrameBuffer,
    plays: Option<u32>,
    status: String,
    leaderboard: Vec<String>,
    /// The current final result has already been published.
    published: bool,
}

impl App {
    fn new(client: SyncClient, runtime: Runtime) -> Self {
        let seed = std::process::id();
        Self {
            client,
            runtime,
            state: GameState::new(seed),
            view: GameView::default(),
            fb: FrameBuffer::new(0, 0),
            plays: None,
            status: String::new(),
            leaderboard: Vec::new(),
            published: false,
        }
    }

    fn run(mut self, term: &mut TerminalRenderer) -> Result<()> {
        self.set_status("Connecting wallet...");
        self.draw(term)?;
        let report = self.runtime.block_on(self.client.connect());
        self.report(report);
        self.refresh_plays();

        let tick = Duration::from_millis(TICK_MS as u64);
        let mut last_tick = Instant::now();

        loop {
            self.draw(term)?;

            let timeout = tick.saturating_sub(last_tick.elapsed());
            if event::poll(timeout)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        if should_quit(key) {
                            self.client.end_session();
                            return Ok(());
                        }
                        if let Some(command) = handle_key_event(key) {
                            self.execute(command, term)?;
                            if !matches!(command, Command::Game(_)) {
                                last_tick = Instant::now();
                            }
                        }
                    }
                }
            }

            if last_tick.elapsed() >= tick {
                last_tick = Instant::now();
                self.state.tick(TICK_MS);
            }
        }
    }

    fn execute(&mut self, command: Command, term: &mut TerminalRenderer) -> Result<()> {
        match command {
            Command::Game(action) => {
                self.state.apply_action(action);
            }
            Command::NewGame => {
                if self.state.is_active() {
                    return Ok(());
                }
                self.set_status("Using a play...");
                self.draw(term)?;
                let report = self.runtime.block_on(self.client.start_game());
                if report.ok && self.state.start() {
                    self.published = false;
                }
                self.report(report);
                self.refresh_plays();
            }
            Command::Publish => {
                let Some(result) = self.state.final_result() else {
                    self.set_status("Finish a game before publishing");
                    return Ok(());
                };
                if self.published {
                    self.set_status("Score already published");
                    return Ok(());
                }
                self.set_status("Encrypting score...");
                self.draw(term)?;
                let report = self.runtime.block_on(self.client.publish(result));
                self.published = report.ok;
                self.report(report);
                self.load_leaderboard_rows();
            }
            Command::CheckIn => {
                self.set_status("Signing check-in request...");
                self.draw(term)?;
                let report = self.runtime.block_on(self.client.check_in());
                self.report(report);
                self.refresh_plays();
            }
            Command::Leaderboard => {
                self.set_status("Loading leaderboard...");
                self.draw(term)?;
                let report = self.runtime.block_on(self.client.leaderboard());
                self.report(report);
                self.load_leaderboard_rows();
            }
        }
        Ok(())
    }

    fn draw(&mut self, term: &mut TerminalRenderer) -> Result<()> {
        let (w, h) = crossterm::terminal::size().unwrap_or((80, 24));
        let panel = SidePanel {
            plays: self.plays,
            status: Some(self.status.as_str()).filter(|s| !s.is_empty()),
            leaderboard: &self.leaderboard,
        };
        self.view
            .render_into(&self.state, &panel, Viewport::new(w, h), &mut self.fb);
        term.draw(&self.fb)
    }

    fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
    }

    fn report(&mut self, report: StatusReport) {
        self.status = report.message;
    }

    fn refresh_plays(&mut self) {
        self.plays = self
            .runtime
            .block_on(self.client.balance())
            .filter(|balance| balance.supported)
            .map(|balance| balance.plays);
    }

    fn load_leaderboard_rows(&mut self) {
        self.leaderboard = self
            .client
            .entries()
            .iter()
            .enumerate()
            .map(|(rank, entry)| {
                format!("{:>2}. {:<10} {:>6}", rank + 1, entry.display_name, entry.score)
            })
            .collect();
    }
}
