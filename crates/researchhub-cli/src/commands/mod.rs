//! Command handlers and the state they share.

pub mod auth;
pub mod chat;
pub mod papers;
pub mod workspaces;

use std::io::{self, BufRead, Write};

use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};

use researchhub_core::auth::open_store;
use researchhub_core::models::UserProfile;
use researchhub_core::{ApiClient, ClientConfig, Config, SessionContext, SessionEvent};

pub use chat::ChatAction;
pub use papers::PaperAction;
pub use workspaces::WorkspaceAction;

const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please log in again.";

/// Loaded config plus a bootstrapped session.
pub struct App {
    pub config: Config,
    pub session: SessionContext,
}

impl App {
    pub async fn start(api_url: Option<String>) -> Result<Self> {
        let config = Config::load()?;
        let data_dir = config.data_dir()?;
        let store = open_store(config.credential_backend, &data_dir);

        let client_config = match api_url {
            Some(url) => ClientConfig::new(url),
            None => config.client_config(),
        };
        let api = ApiClient::new(client_config, store).context("Failed to create API client")?;
        api.on_session_event(|event| {
            if event == SessionEvent::Invalidated {
                eprintln!("{}", SESSION_EXPIRED_MESSAGE);
            }
        });

        let mut session = SessionContext::new(api);
        let phase = session.bootstrap().await;
        debug!(?phase, "Session bootstrapped");

        Ok(Self { config, session })
    }

    pub fn api(&self) -> &ApiClient {
        self.session.api()
    }

    pub fn require_user(&self) -> Result<UserProfile> {
        self.session
            .user()
            .ok_or_else(|| anyhow!("Not logged in. Run `researchhub login` first."))
    }

    /// Remember the email for the next login prompt.
    pub fn remember_email(&mut self, email: &str) {
        self.config.last_email = Some(email.to_string());
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }
    }
}

/// Read one trimmed line from stdin. `None` at end of input.
pub fn prompt_line(label: &str) -> Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;
    Ok(read_trimmed(&mut io::stdin().lock())?)
}

/// Like `prompt_line`, but end of input is an error.
pub fn prompt(label: &str) -> Result<String> {
    prompt_line(label)?.ok_or_else(|| anyhow!("No input"))
}

fn read_trimmed(reader: &mut impl BufRead) -> io::Result<Option<String>> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
