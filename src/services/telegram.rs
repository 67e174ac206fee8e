use std::path::Path;

use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, ParseMode};

use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct TelegramService {
    bot: Bot,
}

impl TelegramService {
    pub async fn new(token: String) -> AppResult<Self> {
        let bot = Bot::new(token);

        // Verify the bot token by getting bot info
        match bot.get_me().await {
            Ok(me) => {
                tracing::info!("Telegram bot initialized: @{}", me.username());
                Ok(Self { bot })
            }
            Err(e) => {
                tracing::error!("Failed to initialize Telegram bot: {}", e);
                Err(AppError::Telegram(format!(
                    "Failed to initialize bot: {}",
                    e
                )))
            }
        }
    }

    fn parse_chat_id(chat_id: &str) -> AppResult<ChatId> {
        chat_id
            .parse::<i64>()
            .map(ChatId)
            .map_err(|_| AppError::Telegram("Invalid chat_id".to_string()))
    }

    pub async fn send_message(&self, chat_id: &str, text: &str) -> AppResult<i32> {
        let chat_id = Self::parse_chat_id(chat_id)?;

        match self
            .bot
            .send_message(chat_id, text)
            .parse_mode(ParseMode::Html)
            .disable_web_page_preview(true)
            .await
        {
            Ok(sent_message) => {
                tracing::debug!(
                    "Telegram message sent to {}: message_id={}",
                    chat_id,
                    sent_message.id
                );
                Ok(sent_message.id.0)
            }
            Err(e) => {
                tracing::error!("Failed to send Telegram message: {}", e);
                Err(AppError::Telegram(format!("Failed to send message: {}", e)))
            }
        }
    }

    /// Send a local file (an archived FIT export) as a document with an
    /// optional caption.
    pub async fn send_document(
        &self,
        chat_id: &str,
        path: &Path,
        caption: Option<&str>,
    ) -> AppResult<i32> {
        let chat_id = Self::parse_chat_id(chat_id)?;

        let mut request = self.bot.send_document(chat_id, InputFile::file(path));
        if let Some(caption) = caption {
            request = request.caption(caption.to_string());
        }

        match request.await {
            Ok(sent_message) => {
                tracing::debug!(
                    "Telegram document sent to {}: message_id={}",
                    chat_id,
                    sent_message.id
                );
                Ok(sent_message.id.0)
            }
            Err(e) => {
                tracing::error!("Failed to send Telegram document: {}", e);
                Err(AppError::Telegram(format!(
                    "Failed to send document: {}",
                    e
                )))
            }
        }
    }
}
