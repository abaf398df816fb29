//! Telegram Bot API delivery.

use std::time::Duration;

use reqwest::blocking::{Client, Response, multipart};
use serde::Serialize;

use crate::config::TelegramCredentials;
use crate::error::AppError;
use crate::notify::NotificationSink;
use crate::plot::Artifact;

const API_BASE: &str = "https://api.telegram.org";
const TEXT_TIMEOUT: Duration = Duration::from_secs(15);
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Telegram caps captions at 1024 characters.
const MAX_CAPTION_CHARS: usize = 1024;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
}

pub struct TelegramSink {
    client: Client,
    bot_url: String,
    chat_id: String,
}

impl TelegramSink {
    pub fn new(credentials: &TelegramCredentials) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::new(4, format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            bot_url: format!("{API_BASE}/bot{}", credentials.token),
            chat_id: credentials.chat_id.clone(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.bot_url)
    }
}

impl NotificationSink for TelegramSink {
    fn send_text(&self, text: &str) -> Result<(), AppError> {
        let resp = self
            .client
            .post(self.method_url("sendMessage"))
            .timeout(TEXT_TIMEOUT)
            .json(&SendMessage {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .map_err(|e| AppError::new(4, format!("sendMessage failed: {e}")))?;
        check("sendMessage", resp)
    }

    fn send_artifact(&self, artifact: &Artifact, caption: &str) -> Result<(), AppError> {
        let path = match artifact {
            Artifact::File(path) => path,
            Artifact::Text(chart) => return self.send_text(&format!("{caption}\n{chart}")),
        };

        let caption: String = caption.chars().take(MAX_CAPTION_CHARS).collect();
        let form = multipart::Form::new()
            .text("chat_id", self.chat_id.clone())
            .text("caption", caption)
            .file("document", path)
            .map_err(|e| AppError::new(4, format!("Failed to read chart '{}': {e}", path.display())))?;

        let resp = self
            .client
            .post(self.method_url("sendDocument"))
            .timeout(UPLOAD_TIMEOUT)
            .multipart(form)
            .send()
            .map_err(|e| AppError::new(4, format!("sendDocument failed: {e}")))?;
        check("sendDocument", resp)
    }
}

fn check(method: &str, resp: Response) -> Result<(), AppError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().unwrap_or_default();
    let snippet: String = body.chars().take(200).collect();
    Err(AppError::new(4, format!("{method} returned HTTP {status}: {snippet}")))
}
