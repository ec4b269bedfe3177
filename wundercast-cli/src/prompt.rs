use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use inquire::{Password, PasswordDisplayMode};
use wundercast_core::{CredentialStore, KeyPrompt};

pub fn ask_api_key() -> anyhow::Result<String> {
    let key = Password::new("OpenWeatherMap API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .with_help_message("Create one at https://home.openweathermap.org/api_keys")
        .prompt()?;

    Ok(key.trim().to_string())
}

/// Asks for a replacement key on the terminal when the service rejects ours.
#[derive(Debug, Clone)]
pub struct TerminalKeyPrompt {
    credentials: CredentialStore,
    open: Arc<AtomicBool>,
}

impl TerminalKeyPrompt {
    pub fn new(credentials: CredentialStore) -> Self {
        Self { credentials, open: Arc::new(AtomicBool::new(false)) }
    }
}

impl KeyPrompt for TerminalKeyPrompt {
    fn request_key(&self) {
        // One prompt on screen at a time.
        if self.open.swap(true, Ordering::SeqCst) {
            return;
        }

        let credentials = self.credentials.clone();
        let open = self.open.clone();

        tokio::task::spawn_blocking(move || {
            let answer = ask_api_key();
            // Cleared before publishing: the retried lookup may need to prompt again.
            open.store(false, Ordering::SeqCst);

            match answer {
                Ok(key) if !key.is_empty() => credentials.set_key(key),
                _ => {
                    let current = credentials.current();
                    if current.is_empty() {
                        tracing::warn!("no API key entered; the search stays paused until one is");
                    } else {
                        // Cancelling retries with the key we already have.
                        credentials.set_key(current);
                    }
                }
            }
        });
    }
}
