// Composition root: wires adapters into the session service and runs the
// MVU terminal loop

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, Event as TermEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use qrsign_core::app::{Command, ImportSource};
use qrsign_core::domain::Event;
use qrsign_core::ports::{AppConfig, Clock, ConfigStore, ImageSource, QrCodec};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::adapters::{clipboard::ClipboardSource, codec::QrcodeCodec, config_store::FileConfigStore};
use crate::cli::CliArgs;
use crate::logging;
use crate::services::session_service::SessionService;
use crate::tui::{TuiMessage, TuiModel, TuiUpdate, TuiView};

type Term = Terminal<CrosstermBackend<io::Stdout>>;

/// The main application struct that coordinates everything
pub struct QrSignApp {
    service: SessionService,
    tui_model: TuiModel,
    terminal: Term,
    event_rx: mpsc::UnboundedReceiver<Event>,
    command_tx: mpsc::UnboundedSender<Command>,
    codec: Arc<dyn QrCodec>,
    clock: Arc<dyn Clock>,
}

impl QrSignApp {
    /// Create the application from a loaded configuration
    /// This is the composition root - where dependency injection happens
    pub fn new(config: &AppConfig) -> Result<Self> {
        info!("Initializing QrSign");

        let codec: Arc<dyn QrCodec> = Arc::new(QrcodeCodec::new(config.qr.error_correction));
        let clipboard: Arc<dyn ImageSource> = Arc::new(ClipboardSource::new());
        let clock: Arc<dyn Clock> = Arc::new(config.clock()?);

        let (service, event_rx, command_tx) = SessionService::new(codec.clone(), clipboard, clock.clone(), config)?;

        // Initialize terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        let tui_model = TuiModel::with_identifiers(config.payload.identifiers.clone());

        Ok(Self {
            service,
            tui_model,
            terminal,
            event_rx,
            command_tx,
            codec,
            clock,
        })
    }

    /// Sender for commands queued before the loop starts
    pub fn commands(&self) -> mpsc::UnboundedSender<Command> {
        self.command_tx.clone()
    }

    /// Run the application
    pub async fn run(self) -> Result<()> {
        info!("Starting QrSign");

        // Destructure self to take ownership of parts
        let QrSignApp {
            mut service,
            mut tui_model,
            mut terminal,
            event_rx,
            command_tx,
            codec,
            clock,
        } = self;

        let service_handle = tokio::spawn(async move { service.run().await });

        let loop_parts = LoopParts {
            event_rx,
            command_tx,
            codec,
            clock,
        };
        let result = run_main_loop(&mut tui_model, &mut terminal, loop_parts).await;

        shutdown(&mut terminal)?;

        match service_handle.await {
            Ok(Err(e)) => error!("Session service failed: {}", e),
            Err(e) => error!("Session service task failed: {:?}", e),
            Ok(Ok(())) => {}
        }

        result
    }
}

struct LoopParts {
    event_rx: mpsc::UnboundedReceiver<Event>,
    command_tx: mpsc::UnboundedSender<Command>,
    codec: Arc<dyn QrCodec>,
    clock: Arc<dyn Clock>,
}

/// Main application loop - coordinates TUI and session service
async fn run_main_loop(tui_model: &mut TuiModel, terminal: &mut Term, parts: LoopParts) -> Result<()> {
    let LoopParts {
        mut event_rx,
        command_tx,
        codec,
        clock,
    } = parts;

    let mut last_render = Instant::now();
    let render_interval = Duration::from_millis(100);
    let mut needs_redraw = true;

    loop {
        // Handle events from the session service
        while let Ok(event) = event_rx.try_recv() {
            debug!("Received event from session service: {:?}", event);
            if let Event::SlotChanged { payload, .. } = &event {
                match codec.encode(payload) {
                    Ok(matrix) => tui_model.set_qr(matrix),
                    Err(e) => tui_model.add_error(format!("Failed to render code: {e}")),
                }
            }
            tui_model.apply_event(&event);
            needs_redraw = true;
        }

        // Handle user input
        if event::poll(Duration::from_millis(10))? {
            if let TermEvent::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Press {
                    let message = TuiUpdate::handle_key(tui_model, key_event.code, key_event.modifiers)?;

                    if let TuiMessage::Command(cmd) = message {
                        info!("Sending command to session service: {:?}", cmd);
                        if matches!(cmd, Command::Quit) {
                            tui_model.should_quit = true;
                        }
                        if let Err(e) = command_tx.send(cmd) {
                            error!("Failed to send command: {}", e);
                        }
                    }

                    needs_redraw = true;
                }
            }
        }

        // Check if we should quit
        if tui_model.should_quit {
            info!("Quit requested, exiting main loop");
            break;
        }

        // Render at regular intervals or when needed
        if needs_redraw || last_render.elapsed() >= render_interval {
            TuiUpdate::handle_clock(tui_model, clock.now())?;
            render(terminal, tui_model)?;
            last_render = Instant::now();
            needs_redraw = false;
        }

        // Small sleep to prevent busy waiting
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    Ok(())
}

fn render(terminal: &mut Term, tui_model: &TuiModel) -> Result<()> {
    terminal.draw(|frame| {
        TuiView::render(tui_model, frame);
    })?;

    Ok(())
}

/// Restore the terminal
fn shutdown(terminal: &mut Term) -> Result<()> {
    info!("Shutting down QrSign");

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}

/// Load configuration and apply command-line overrides
pub fn load_config(cli_args: &CliArgs) -> Result<AppConfig> {
    let store = match &cli_args.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new()?,
    };
    let mut config = store.load()?;

    // CLI overrides config file
    if let Some(interval) = cli_args.interval {
        config.timing.interval_secs = interval;
    }
    if let Some(log_file) = &cli_args.log_file {
        config.log_file = Some(log_file.clone());
    }

    config.validate().context("Invalid settings")?;
    Ok(config)
}

/// Parse arguments, set up logging and run the TUI until the user quits
pub async fn run() -> Result<()> {
    let cli_args = CliArgs::parse();
    let config = load_config(&cli_args)?;

    logging::init(config.log_file.as_deref())?;
    info!(
        "Loaded config: interval {}s, poll {}ms, UTC offset {} min",
        config.timing.interval_secs, config.timing.poll_interval_ms, config.timing.utc_offset_minutes
    );

    let app = QrSignApp::new(&config)?;

    if let Some(path) = cli_args.import {
        info!("Importing {} at launch", path.display());
        app.commands()
            .send(Command::Import {
                source: ImportSource::File(path),
            })
            .context("Session service is not accepting commands")?;
    }

    app.run().await?;

    info!("QrSign shut down cleanly");
    Ok(())
}
