//! TUI application state and logic

use std::sync::mpsc as std_mpsc;

use anyhow::Result;
use nostr_sdk::prelude::*;
use tokio::runtime::Handle;

use crate::config::Config;
use crate::identity::{self, LocalSigner};
use crate::session::{ChatSession, FeedUpdate};
use crate::storage::FileStorage;
use crate::tui::components::TextInput;

/// Which screen is showing
pub enum Screen {
    /// No identity yet: generate or import one
    Setup,
    /// Connected chat view
    Chat,
}

/// Sub-state of the setup screen
#[derive(PartialEq, Eq)]
pub enum SetupMode {
    Choose,
    Import,
}

/// Main application state
pub struct App {
    pub screen: Screen,
    pub config: Config,
    pub storage: FileStorage,
    pub handle: Handle,

    /// Connected session, present on the chat screen
    pub session: Option<ChatSession<LocalSigner>>,

    /// Chat input line
    pub input: TextInput,

    /// Lines scrolled up from the bottom of the timeline
    pub scroll_from_bottom: usize,

    /// Status line content
    pub status: Option<String>,

    pub setup_mode: SetupMode,
    pub import_input: TextInput,
    pub setup_error: Option<String>,

    pub should_quit: bool,

    /// Publish outcomes arriving from spawned send tasks
    publish_tx: std_mpsc::Sender<String>,
    publish_rx: std_mpsc::Receiver<String>,
}

impl App {
    /// Create the app: jump straight into the chat when an identity is
    /// stored, otherwise start on the setup screen.
    pub fn new(config: Config, storage: FileStorage, handle: Handle) -> Result<Self> {
        let (publish_tx, publish_rx) = std_mpsc::channel();
        let mut app = Self {
            screen: Screen::Setup,
            config,
            storage,
            handle,
            session: None,
            input: TextInput::new().with_placeholder("Nachricht schreiben..."),
            scroll_from_bottom: 0,
            status: None,
            setup_mode: SetupMode::Choose,
            import_input: TextInput::new().with_placeholder("nsec1... oder hex"),
            setup_error: None,
            should_quit: false,
            publish_tx,
            publish_rx,
        };
        if let Some(keys) = identity::load(&app.storage)? {
            app.connect(keys)?;
        }
        Ok(app)
    }

    /// Connect the session and switch to the chat screen
    fn connect(&mut self, keys: Keys) -> Result<()> {
        let config = self.config.clone();
        let signer = LocalSigner::new(keys.clone());
        let session = self
            .handle
            .block_on(ChatSession::connect(config, keys, signer))?;
        self.status = Some(format!("Channel {}", session.channel()));
        self.session = Some(session);
        self.screen = Screen::Chat;
        Ok(())
    }

    /// One UI tick: drain inbound events, fire queued profile requests,
    /// collect publish outcomes.
    pub fn tick(&mut self) -> Result<()> {
        while let Ok(outcome) = self.publish_rx.try_recv() {
            self.status = Some(outcome);
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };
        while let Some(update) = session.try_recv() {
            if let FeedUpdate::Message(_) = update {
                // stay glued to the bottom unless the user scrolled away
                if self.scroll_from_bottom > 0 {
                    self.scroll_from_bottom += 1;
                }
            }
        }
        if session.has_pending_profile_requests() {
            self.handle.block_on(session.flush_profile_requests())?;
        }
        Ok(())
    }

    /// Sign and echo the input line, then broadcast off the UI thread
    pub fn send_current_input(&mut self) {
        let content = self.input.value().trim().to_string();
        if content.is_empty() {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.prepare(&content) {
            Ok(event) => {
                self.input.clear();
                self.scroll_from_bottom = 0;
                let client = session.client_handle();
                let tx = self.publish_tx.clone();
                self.handle.spawn(async move {
                    let outcome = match client.publish(event).await {
                        Ok(report) => format!("Gesendet: {}", report.summary()),
                        Err(e) => format!("Senden fehlgeschlagen: {e}"),
                    };
                    let _ = tx.send(outcome);
                });
            }
            Err(e) => self.status = Some(format!("Signieren fehlgeschlagen: {e}")),
        }
    }

    pub fn scroll_up(&mut self) {
        // clamped against the rendered line count when drawing
        self.scroll_from_bottom += 1;
    }

    pub fn scroll_down(&mut self) {
        self.scroll_from_bottom = self.scroll_from_bottom.saturating_sub(1);
    }

    /// Setup action: generate a fresh identity and join
    pub fn generate_identity(&mut self) {
        match identity::generate(&self.storage).and_then(|keys| self.connect(keys)) {
            Ok(()) => self.setup_error = None,
            Err(e) => self.setup_error = Some(e.to_string()),
        }
    }

    /// Setup action: import the key in the import field and join
    pub fn import_identity(&mut self) {
        let secret = self.import_input.value().trim().to_string();
        if secret.is_empty() {
            self.setup_error = Some("Bitte einen Schlüssel eingeben".to_string());
            return;
        }
        match identity::import(&self.storage, &secret).and_then(|keys| self.connect(keys)) {
            Ok(()) => self.setup_error = None,
            Err(e) => self.setup_error = Some(e.to_string()),
        }
    }

    pub fn quit(&mut self) {
        if let Some(session) = self.session.take() {
            self.handle.block_on(session.disconnect());
        }
        self.should_quit = true;
    }
}
