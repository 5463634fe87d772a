//! Telegram Bot channel: long polling and message sending via the Bot API.

use async_trait::async_trait;
use futures::stream::Stream;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use wird_core::config::TelegramConfig;
use wird_core::error::TransportError;
use wird_core::tenant::TenantId;
use wird_core::traits::Transport;

/// Back-off used when a 429 carries no `retry_after`.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Telegram Bot API client. Cheap to clone; the polling loop runs on its own copy.
#[derive(Clone)]
pub struct TelegramChannel {
    config: TelegramConfig,
    client: reqwest::Client,
    last_update_id: i64,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
            last_update_id: 0,
        }
    }

    fn api_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token,
            method
        )
    }

    /// POST a JSON body and unwrap the Bot API envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: serde_json::Value,
    ) -> Result<T, TransportError> {
        let response = self
            .client
            .post(self.api_url(method))
            .json(&body)
            .timeout(Duration::from_secs(self.config.poll_timeout_secs + 10))
            .send()
            .await
            .map_err(|e| TransportError::Http(format!("{method} failed: {e}")))?;
        Self::unwrap_response(method, response).await
    }

    async fn unwrap_response<T: DeserializeOwned>(
        method: &str,
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let status = response.status();
        let body: TelegramApiResponse<T> = match response.json().await {
            Ok(body) => body,
            Err(_) if status.as_u16() == 429 => {
                return Err(TransportError::RateLimited {
                    retry_after: DEFAULT_RETRY_AFTER,
                });
            }
            Err(e) => {
                return Err(TransportError::Http(format!(
                    "Invalid {method} response ({status}): {e}"
                )));
            }
        };

        if !body.ok {
            let retry_after = body.parameters.as_ref().and_then(|p| p.retry_after);
            if body.error_code == Some(429) || retry_after.is_some() {
                return Err(TransportError::RateLimited {
                    retry_after: retry_after
                        .map(Duration::from_secs)
                        .unwrap_or(DEFAULT_RETRY_AFTER),
                });
            }
            return Err(TransportError::Api(format!(
                "{method}: {}",
                body.description.unwrap_or_default()
            )));
        }
        body.result
            .ok_or_else(|| TransportError::Api(format!("{method}: empty result")))
    }

    /// Get updates using long polling.
    pub async fn get_updates(&mut self) -> Result<Vec<TelegramUpdate>, TransportError> {
        let updates: Vec<TelegramUpdate> = self
            .call(
                "getUpdates",
                serde_json::json!({
                    "offset": self.last_update_id + 1,
                    "timeout": self.config.poll_timeout_secs,
                    "allowed_updates": ["message", "my_chat_member"],
                }),
            )
            .await?;
        if let Some(last) = updates.last() {
            self.last_update_id = last.update_id;
        }
        Ok(updates)
    }

    /// Send a plain text message.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TransportError> {
        let _: serde_json::Value = self
            .call(
                "sendMessage",
                serde_json::json!({ "chat_id": chat_id, "text": text }),
            )
            .await?;
        Ok(())
    }

    /// Send photos (by URL) as one album; the caption is attached to the first.
    pub async fn send_media_group(
        &self,
        chat_id: i64,
        image_urls: &[String],
        caption: &str,
    ) -> Result<(), TransportError> {
        let media: Vec<serde_json::Value> = image_urls
            .iter()
            .enumerate()
            .map(|(i, url)| {
                if i == 0 {
                    serde_json::json!({ "type": "photo", "media": url, "caption": caption })
                } else {
                    serde_json::json!({ "type": "photo", "media": url })
                }
            })
            .collect();
        let _: serde_json::Value = self
            .call(
                "sendMediaGroup",
                serde_json::json!({ "chat_id": chat_id, "media": media }),
            )
            .await?;
        Ok(())
    }

    /// Send a single photo by URL.
    pub async fn send_photo(
        &self,
        chat_id: i64,
        photo_url: &str,
        caption: &str,
    ) -> Result<(), TransportError> {
        let _: serde_json::Value = self
            .call(
                "sendPhoto",
                serde_json::json!({ "chat_id": chat_id, "photo": photo_url, "caption": caption }),
            )
            .await?;
        Ok(())
    }

    /// Upload a local file as a document.
    pub async fn send_document(
        &self,
        chat_id: i64,
        path: &Path,
        caption: &str,
    ) -> Result<(), TransportError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| TransportError::Api(format!("read {}: {e}", path.display())))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".into());
        let form = reqwest::multipart::Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part(
                "document",
                reqwest::multipart::Part::bytes(bytes).file_name(file_name),
            );
        let response = self
            .client
            .post(self.api_url("sendDocument"))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Http(format!("sendDocument failed: {e}")))?;
        let _: serde_json::Value = Self::unwrap_response("sendDocument", response).await?;
        Ok(())
    }

    pub async fn get_chat(&self, chat_id: i64) -> Result<TelegramChat, TransportError> {
        self.call("getChat", serde_json::json!({ "chat_id": chat_id }))
            .await
    }

    pub async fn get_chat_member(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<ChatMember, TransportError> {
        self.call(
            "getChatMember",
            serde_json::json!({ "chat_id": chat_id, "user_id": user_id }),
        )
        .await
    }

    pub async fn get_chat_administrators(
        &self,
        chat_id: i64,
    ) -> Result<Vec<ChatMember>, TransportError> {
        self.call(
            "getChatAdministrators",
            serde_json::json!({ "chat_id": chat_id }),
        )
        .await
    }

    pub async fn get_chat_member_count(&self, chat_id: i64) -> Result<u32, TransportError> {
        self.call(
            "getChatMemberCount",
            serde_json::json!({ "chat_id": chat_id }),
        )
        .await
    }

    /// Start the polling loop and return a stream of updates.
    pub fn start_polling(self) -> TelegramPollingStream {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut channel = self;
            tracing::info!("Telegram polling loop started");

            loop {
                match channel.get_updates().await {
                    Ok(updates) => {
                        for update in updates {
                            if tx.send(update).is_err() {
                                tracing::info!("Telegram polling stopped (receiver dropped)");
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::error!("Telegram polling error: {e}");
                        let backoff = e.retry_after().unwrap_or(DEFAULT_RETRY_AFTER);
                        tokio::time::sleep(backoff).await;
                    }
                }
                if tx.is_closed() {
                    tracing::info!("Telegram polling stopped (receiver dropped)");
                    return;
                }
            }
        });

        TelegramPollingStream { rx }
    }
}

/// Stream of Telegram updates from polling.
pub struct TelegramPollingStream {
    rx: tokio::sync::mpsc::UnboundedReceiver<TelegramUpdate>,
}

impl Stream for TelegramPollingStream {
    type Item = TelegramUpdate;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

#[async_trait]
impl Transport for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_album(
        &self,
        tenant: TenantId,
        image_urls: &[String],
        caption: &str,
    ) -> Result<(), TransportError> {
        self.send_media_group(tenant, image_urls, caption).await
    }

    async fn send_text(&self, tenant: TenantId, text: &str) -> Result<(), TransportError> {
        self.send_message(tenant, text).await
    }

    async fn send_photo(
        &self,
        tenant: TenantId,
        image_url: &str,
        caption: &str,
    ) -> Result<(), TransportError> {
        TelegramChannel::send_photo(self, tenant, image_url, caption).await
    }
}

// --- Telegram API Types ---

#[derive(Debug, Deserialize)]
pub struct TelegramApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<u16>,
    pub parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseParameters {
    pub retry_after: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUpdate {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
    pub my_chat_member: Option<ChatMemberUpdated>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    pub text: Option<String>,
    pub date: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
    pub username: Option<String>,
}

impl TelegramChat {
    pub fn is_private(&self) -> bool {
        self.chat_type == "private"
    }

    /// Public t.me link, if the chat has a username.
    pub fn link(&self) -> String {
        self.username
            .as_deref()
            .map(|u| format!("https://t.me/{u}"))
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMember {
    pub status: String,
    pub user: TelegramUser,
}

impl ChatMember {
    pub fn is_admin(&self) -> bool {
        matches!(self.status.as_str(), "administrator" | "creator")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMemberUpdated {
    pub chat: TelegramChat,
    pub from: TelegramUser,
    pub new_chat_member: ChatMember,
}

/// What the bot front-end reacts to.
#[derive(Debug, Clone)]
pub enum BotEvent {
    /// The bot was added to (or promoted in) a chat.
    Joined { chat: TelegramChat },
    /// A human sent a text message.
    Text {
        chat: TelegramChat,
        from: TelegramUser,
        text: String,
    },
}

impl TelegramUpdate {
    pub fn to_event(&self) -> Option<BotEvent> {
        if let Some(member) = &self.my_chat_member {
            return match member.new_chat_member.status.as_str() {
                "member" | "administrator" => Some(BotEvent::Joined {
                    chat: member.chat.clone(),
                }),
                _ => None,
            };
        }

        let msg = self.message.as_ref()?;
        let text = msg.text.as_ref()?;
        let from = msg.from.as_ref()?;

        // Skip bot messages
        if from.is_bot {
            return None;
        }

        Some(BotEvent::Text {
            chat: msg.chat.clone(),
            from: from.clone(),
            text: text.clone(),
        })
    }
}
