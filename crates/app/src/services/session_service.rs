use super::rotation::RotationHandle;
use crate::adapters::file::FileImageSource;
use anyhow::Result;
use qrsign_core::app::{Command, ImportSource};
use qrsign_core::domain::{Event, Identifiers, PayloadLayout, SessionState, SlotInterval, Template, TimeWindowClock};
use qrsign_core::ports::{AppConfig, Clock, ImageSource, QrCodec};
use qrsign_core::{CoreError, Result as CoreResult};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Owns the active session and the rotation loop.
///
/// Commands arrive over a channel; every outcome, including failures, leaves
/// as an `Event` on the external channel.
pub struct SessionService {
    // Ports (dependency injection)
    codec: Arc<dyn QrCodec>,
    clipboard: Arc<dyn ImageSource>,
    clock: Arc<dyn Clock>,

    // Settings
    layout: PayloadLayout,
    interval: SlotInterval,
    poll_interval: Duration,

    // Session
    state: SessionState,
    template: Option<Template>,
    rotation: Option<RotationHandle>,

    // Channels
    event_tx: mpsc::UnboundedSender<Event>,
    command_rx: mpsc::UnboundedReceiver<Command>,
}

impl SessionService {
    pub fn new(
        codec: Arc<dyn QrCodec>,
        clipboard: Arc<dyn ImageSource>,
        clock: Arc<dyn Clock>,
        config: &AppConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Event>, mpsc::UnboundedSender<Command>)> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let service = Self {
            codec,
            clipboard,
            clock,
            layout: config.payload.layout.clone(),
            interval: config.interval()?,
            poll_interval: config.poll_interval(),
            state: SessionState::default(),
            template: None,
            rotation: None,
            event_tx,
            command_rx,
        };

        Ok((service, event_rx, command_tx))
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    /// Process commands until `Quit` or until every sender is gone
    pub async fn run(&mut self) -> Result<()> {
        info!("Session service started");

        while let Some(cmd) = self.command_rx.recv().await {
            let quit = matches!(cmd, Command::Quit);
            self.handle_command(cmd).await;
            if quit {
                break;
            }
        }

        if let Err(e) = self.stop_rotation().await {
            error!("Failed to stop rotation on shutdown: {}", e);
        }
        info!("Session service stopped");
        Ok(())
    }

    /// Handle a command (CQRS Command side). Failures become `Event::Error`
    /// and leave the session as it was.
    pub async fn handle_command(&mut self, cmd: Command) {
        let result = match cmd {
            Command::Generate { ids } => self.generate(&ids).await,
            Command::Import { source } => self.import(source).await,
            Command::Start => self.start(),
            Command::Stop => self.stop_requested().await,
            Command::Quit => {
                info!("Quit command received");
                let result = self.stop_rotation().await;
                self.emit(Event::QuitRequested);
                result
            }
        };

        if let Err(e) = result {
            warn!("Command failed: {}", e);
            self.emit(Event::Error { msg: e.to_string() });
        }
    }

    async fn generate(&mut self, ids: &Identifiers) -> CoreResult<()> {
        let now = self.clock.now();
        let template = Template::generate(ids, now, &self.layout);
        info!("Generated template at {}", now);
        self.install(template).await
    }

    async fn import(&mut self, source: ImportSource) -> CoreResult<()> {
        let image_source: Arc<dyn ImageSource> = match source {
            ImportSource::Clipboard => self.clipboard.clone(),
            ImportSource::File(path) => Arc::new(FileImageSource::new(path)),
        };
        let codec = self.codec.clone();

        // Capture and decode before touching the session, so a failure
        // leaves the current template and rotation in place
        let raw = tokio::task::spawn_blocking(move || capture_and_decode(image_source.as_ref(), codec.as_ref()))
            .await
            .map_err(|e| CoreError::Port { source: e.into() })??;

        let template = Template::import(raw)?;
        info!("Imported template with epoch {}", template.epoch());
        self.install(template).await
    }

    /// Replace the active template, stopping any rotation first, and show
    /// the epoch slot
    async fn install(&mut self, template: Template) -> CoreResult<()> {
        self.stop_rotation().await?;

        let window = TimeWindowClock::new(template.epoch(), self.interval);
        let slot = window.slot_at(template.epoch());
        let payload = template.payload_at(slot.current);

        self.emit(Event::TemplateLoaded {
            summary: template.summary(),
        });
        self.emit(Event::SlotChanged { slot, payload });
        self.template = Some(template);
        Ok(())
    }

    fn start(&mut self) -> CoreResult<()> {
        let template = self.template.clone().ok_or(CoreError::NoTemplate)?;
        self.state = self.state.start()?;

        info!("Starting rotation every {}s", self.interval.as_delta().num_seconds());
        // Announce before spawning so the loop's first slot follows it
        self.emit(Event::RotationStarted);

        let window = TimeWindowClock::new(template.epoch(), self.interval);
        self.rotation = Some(RotationHandle::spawn(
            template,
            window,
            self.clock.clone(),
            self.poll_interval,
            self.event_tx.clone(),
        ));
        Ok(())
    }

    async fn stop_requested(&mut self) -> CoreResult<()> {
        if self.template.is_none() {
            return Err(CoreError::NoTemplate);
        }
        self.state.begin_stop()?;
        self.stop_rotation().await
    }

    /// Stop the loop if it is running; a no-op while idle
    async fn stop_rotation(&mut self) -> CoreResult<()> {
        if !self.state.is_running() {
            return Ok(());
        }

        self.state = self.state.begin_stop()?;
        if let Some(rotation) = self.rotation.take() {
            rotation.stop().await;
        }
        self.state = self.state.finish_stop()?;

        info!("Rotation stopped");
        self.emit(Event::RotationStopped);
        Ok(())
    }

    fn emit(&self, event: Event) {
        if self.event_tx.send(event).is_err() {
            warn!("Event receiver dropped");
        }
    }
}

fn capture_and_decode(source: &dyn ImageSource, codec: &dyn QrCodec) -> CoreResult<String> {
    let image = source
        .capture()
        .map_err(|e| CoreError::Port { source: e })?
        .filter(|image| !image.is_empty())
        .ok_or_else(|| CoreError::CaptureEmpty {
            source_name: source.name().to_string(),
        })?;

    codec.decode(&image).ok_or(CoreError::DecodeFailed)
}
