//! Bot front-end: routes Telegram updates to the configuration dialog and the
//! operator commands. Runs next to the scheduler and shares only the store.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::watch;

use wird_core::config::OperatorConfig;
use wird_core::error::TransportError;
use wird_core::tenant::TenantId;
use wird_scheduler::store::SharedStore;

use crate::dialog::{ConfigDialog, ConfigureRequest};
use crate::operator::{self, OperatorCommand};
use crate::telegram::{BotEvent, TelegramChannel, TelegramChat, TelegramUpdate, TelegramUser};

pub const WELCOME: &str = "السلام عليكم! 🤖\nأنا بوت الورد اليومي للقرآن الكريم.\n\nللبدء، يجب على المشرف إعداد البوت باستخدام الأمر:\n/configure";
pub const START: &str = "مرحباً! استخدم الأمر /configure لإعداد أوقات الصلاة لهذه المجموعة.";

pub struct BotService {
    telegram: TelegramChannel,
    dialog: Arc<ConfigDialog>,
    store: SharedStore,
    operator: OperatorConfig,
}

impl BotService {
    pub fn new(
        telegram: TelegramChannel,
        dialog: Arc<ConfigDialog>,
        store: SharedStore,
        operator: OperatorConfig,
    ) -> Self {
        Self {
            telegram,
            dialog,
            store,
            operator,
        }
    }

    /// Poll and handle updates until `shutdown` flips.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut updates = self.telegram.clone().start_polling();
        tracing::info!("🤖 Bot front-end started");

        loop {
            tokio::select! {
                update = updates.next() => {
                    let Some(update) = update else { break };
                    if let Err(e) = self.handle_update(&update).await {
                        tracing::warn!("Update {} not handled: {e}", update.update_id);
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("🤖 Bot front-end stopped");
    }

    pub async fn handle_update(&self, update: &TelegramUpdate) -> Result<(), TransportError> {
        match update.to_event() {
            Some(BotEvent::Joined { chat }) => self.on_joined(&chat).await,
            Some(BotEvent::Text { chat, from, text }) => self.on_text(&chat, &from, &text).await,
            None => Ok(()),
        }
    }

    async fn on_joined(&self, chat: &TelegramChat) -> Result<(), TransportError> {
        self.remember(chat).await;
        tracing::info!("👋 Added to chat {} ({})", chat.id, chat.title.as_deref().unwrap_or("-"));
        self.telegram.send_message(chat.id, WELCOME).await
    }

    async fn on_text(
        &self,
        chat: &TelegramChat,
        from: &TelegramUser,
        text: &str,
    ) -> Result<(), TransportError> {
        self.remember(chat).await;

        if let Some(command) = OperatorCommand::parse(text) {
            if self.operator.is_operator(from.username.as_deref()) {
                return self.run_operator(chat.id, command).await;
            }
            tracing::debug!("Ignoring operator command from {:?}", from.username);
            return Ok(());
        }

        let head = text.split_whitespace().next().unwrap_or("");
        match head.split('@').next().unwrap_or(head) {
            "/start" => self.telegram.send_message(chat.id, START).await,
            "/configure" => {
                let is_admin = self.is_admin(chat, from).await;
                let request = ConfigureRequest {
                    display_name: display_name(chat, from),
                    link: chat.link(),
                    admin_username: from.username.clone().unwrap_or_default(),
                    admin_id: from.id,
                };
                let reply = self.dialog.begin(chat.id, is_admin, request).await;
                self.telegram.send_message(chat.id, &reply).await
            }
            _ if self.dialog.is_in_progress(chat.id) => {
                let is_admin = self.is_admin(chat, from).await;
                match self.dialog.handle_text(chat.id, is_admin, text).await {
                    Some(reply) => self.telegram.send_message(chat.id, &reply).await,
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }

    /// Every chat the bot hears from gets a record.
    async fn remember(&self, chat: &TelegramChat) {
        let mut store = self.store.lock().await;
        let record = store.get_or_create(chat.id);
        if record.metadata.display_name.is_empty()
            && let Some(title) = &chat.title
        {
            store.update(chat.id, |r| r.metadata.display_name = title.clone());
        }
    }

    /// Private chats are always administered by their user. Otherwise ask
    /// `getChatMember`, falling back to the administrator list.
    async fn is_admin(&self, chat: &TelegramChat, from: &TelegramUser) -> bool {
        if chat.is_private() {
            return true;
        }
        match self.telegram.get_chat_member(chat.id, from.id).await {
            Ok(member) => member.is_admin(),
            Err(e) => {
                tracing::debug!("getChatMember failed for {}: {e}", chat.id);
                match self.telegram.get_chat_administrators(chat.id).await {
                    Ok(admins) => admins.iter().any(|m| m.user.id == from.id),
                    Err(e) => {
                        tracing::warn!("Admin check failed for chat {}: {e}", chat.id);
                        false
                    }
                }
            }
        }
    }

    async fn run_operator(&self, reply_to: TenantId, command: OperatorCommand) -> Result<(), TransportError> {
        match command {
            OperatorCommand::List => {
                let records = self.store.lock().await.list();
                self.telegram
                    .send_message(reply_to, &operator::format_list(&records))
                    .await
            }
            OperatorCommand::Stats => {
                self.refresh_metadata().await;
                let records = self.store.lock().await.list();
                self.telegram
                    .send_message(reply_to, &operator::format_stats(&records))
                    .await
            }
            OperatorCommand::Dump => {
                let path = self.store.lock().await.file_path().to_path_buf();
                self.telegram
                    .send_document(reply_to, &path, "tenants.json")
                    .await
            }
            OperatorCommand::Broadcast { text, scope } => {
                let report = operator::broadcast(&self.store, &self.telegram, scope, &text).await;
                self.telegram.send_message(reply_to, &report.summary()).await
            }
        }
    }

    /// Pull chat titles and member counts before reporting stats.
    async fn refresh_metadata(&self) {
        let ids: Vec<TenantId> = self.store.lock().await.list().iter().map(|r| r.id).collect();
        for id in ids {
            let chat = self.telegram.get_chat(id).await;
            let members = self.telegram.get_chat_member_count(id).await;
            if let Err(e) = &chat {
                tracing::debug!("getChat {id} failed: {e}");
            }
            let mut store = self.store.lock().await;
            store.update(id, |r| {
                if let Ok(chat) = &chat {
                    if let Some(title) = &chat.title {
                        r.metadata.display_name = title.clone();
                    }
                    let link = chat.link();
                    if !link.is_empty() {
                        r.metadata.link = link;
                    }
                }
                if let Ok(count) = members {
                    r.metadata.member_count = count;
                }
            });
        }
    }
}

fn display_name(chat: &TelegramChat, from: &TelegramUser) -> String {
    chat.title.clone().unwrap_or_else(|| match &from.last_name {
        Some(last) => format!("{} {last}", from.first_name),
        None => from.first_name.clone(),
    })
}
