//! Configuration dialog: the short admin conversation that turns a chat into
//! an active tenant.
//!
//! `Idle → AwaitingCity → AwaitingCountry → Active | Idle (error)`
//!
//! Conversation state lives here only; the scheduler never sees it. The
//! location is committed together with `active = true`, and only after the
//! prayer-time lookup succeeded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Local, NaiveDate, Utc};

use wird_core::error::ResolveError;
use wird_core::tenant::{Location, TenantId, TriggerSet};
use wird_core::traits::TriggerResolver;
use wird_scheduler::store::SharedStore;

pub const NOT_ADMIN: &str = "عذراً، يمكن للمشرفين فقط إعداد البوت.";
pub const ASK_CITY: &str = "الرجاء إدخال اسم المدينة لحساب أوقات الصلاة:";
pub const ASK_COUNTRY: &str = "ممتاز! الآن الرجاء إدخال اسم الدولة:";
pub const NOT_FOUND: &str = "لم يتم العثور على أوقات الصلاة لهذا الموقع. الرجاء المحاولة مرة أخرى باستخدام /configure مع التأكد من صحة اسم المدينة والدولة.";
pub const LOOKUP_UNAVAILABLE: &str = "تعذر الاتصال بخدمة أوقات الصلاة حالياً. الرجاء المحاولة لاحقاً باستخدام /configure.";

/// Where a chat is in the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogState {
    AwaitingCity,
    AwaitingCountry { city: String },
}

/// Who started the dialog, recorded as tenant metadata.
#[derive(Debug, Clone, Default)]
pub struct ConfigureRequest {
    pub display_name: String,
    pub link: String,
    pub admin_username: String,
    pub admin_id: i64,
}

/// Per-chat configuration conversations.
pub struct ConfigDialog {
    states: Mutex<HashMap<TenantId, DialogState>>,
    store: SharedStore,
    resolver: Arc<dyn TriggerResolver>,
}

impl ConfigDialog {
    pub fn new(store: SharedStore, resolver: Arc<dyn TriggerResolver>) -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            store,
            resolver,
        }
    }

    pub fn state(&self, chat: TenantId) -> Option<DialogState> {
        self.lock_states().get(&chat).cloned()
    }

    pub fn is_in_progress(&self, chat: TenantId) -> bool {
        self.lock_states().contains_key(&chat)
    }

    fn lock_states(&self) -> std::sync::MutexGuard<'_, HashMap<TenantId, DialogState>> {
        // A poisoned map only holds conversation state; keep serving.
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// `/configure`: record who asked and prompt for the city.
    pub async fn begin(&self, chat: TenantId, is_admin: bool, request: ConfigureRequest) -> String {
        if !is_admin {
            return NOT_ADMIN.to_string();
        }
        {
            let mut store = self.store.lock().await;
            store.get_or_create(chat);
            store.update(chat, |r| {
                r.metadata.display_name = request.display_name;
                r.metadata.link = request.link;
                r.metadata.admin_username = request.admin_username;
                r.metadata.admin_id = request.admin_id;
            });
        }
        self.lock_states().insert(chat, DialogState::AwaitingCity);
        tracing::info!("⚙️ Configuration started for chat {chat}");
        ASK_CITY.to_string()
    }

    /// Feed a message into an in-progress dialog. `None` when there is
    /// nothing to say (no dialog, sender not an admin).
    pub async fn handle_text(&self, chat: TenantId, is_admin: bool, text: &str) -> Option<String> {
        self.handle_text_on(chat, is_admin, text, Local::now().date_naive())
            .await
    }

    pub async fn handle_text_on(
        &self,
        chat: TenantId,
        is_admin: bool,
        text: &str,
        today: NaiveDate,
    ) -> Option<String> {
        let state = self.state(chat)?;
        if !is_admin {
            return None;
        }
        let input = text.trim();
        if input.is_empty() {
            return Some(match state {
                DialogState::AwaitingCity => ASK_CITY.to_string(),
                DialogState::AwaitingCountry { .. } => ASK_COUNTRY.to_string(),
            });
        }

        match state {
            DialogState::AwaitingCity => {
                self.lock_states().insert(
                    chat,
                    DialogState::AwaitingCountry {
                        city: input.to_string(),
                    },
                );
                Some(ASK_COUNTRY.to_string())
            }
            DialogState::AwaitingCountry { city } => {
                self.lock_states().remove(&chat);
                let location = Location::new(&city, input);
                Some(self.complete(chat, location, today).await)
            }
        }
    }

    async fn complete(&self, chat: TenantId, location: Location, today: NaiveDate) -> String {
        match self.resolver.resolve(&location, today).await {
            Ok(set) => {
                let reply = success_message(&location, &set);
                let mut store = self.store.lock().await;
                store.get_or_create(chat);
                store.update(chat, |r| {
                    r.location = location.clone();
                    r.active = true;
                    r.trigger_set = Some(set);
                    r.metadata.subscribed_at.get_or_insert_with(Utc::now);
                });
                tracing::info!("✅ Chat {chat} configured for {location}");
                reply
            }
            Err(e) => {
                tracing::info!("Configuration of chat {chat} for {location} failed: {e}");
                match e {
                    ResolveError::Transient(_) => LOOKUP_UNAVAILABLE.to_string(),
                    ResolveError::NotFound { .. } | ResolveError::Invalid(_) => NOT_FOUND.to_string(),
                }
            }
        }
    }
}

fn success_message(location: &Location, set: &TriggerSet) -> String {
    let mut msg = format!(
        "تم حفظ الإعدادات! أوقات الصلاة لمدينة {}, {}:\n",
        location.city, location.country
    );
    for (name, time) in &set.times {
        msg.push_str(&format!("{}: {}\n", name.arabic_name(), time.format("%H:%M")));
    }
    msg.push_str("\nسيقوم البوت بإرسال صفحات القرآن في هذه الأوقات إن شاء الله.");
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveTime;
    use wird_core::tenant::TriggerName;
    use wird_scheduler::store::TenantStore;

    /// Knows Algiers; everything else is unknown, "Flaky" times out.
    struct AtlasResolver;

    #[async_trait]
    impl TriggerResolver for AtlasResolver {
        fn name(&self) -> &str {
            "atlas"
        }
        async fn resolve(&self, location: &Location, date: NaiveDate) -> Result<TriggerSet, ResolveError> {
            match location.city.as_str() {
                "Algiers" => TriggerSet::new(
                    date,
                    TriggerName::ALL
                        .iter()
                        .enumerate()
                        .map(|(i, n)| (*n, NaiveTime::from_hms_opt(5 + 3 * i as u32, 0, 0).unwrap())),
                ),
                "Flaky" => Err(ResolveError::Transient("timeout".into())),
                _ => Err(ResolveError::NotFound {
                    city: location.city.clone(),
                    country: location.country.clone(),
                }),
            }
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn setup() -> (tempfile::TempDir, SharedStore, ConfigDialog) {
        let dir = tempfile::tempdir().unwrap();
        let store = TenantStore::open(dir.path()).unwrap().shared();
        let dialog = ConfigDialog::new(store.clone(), Arc::new(AtlasResolver));
        (dir, store, dialog)
    }

    #[tokio::test]
    async fn test_happy_path_activates_tenant() {
        let (_dir, store, dialog) = setup();
        let reply = dialog
            .begin(-100, true, ConfigureRequest { admin_username: "amina".into(), ..Default::default() })
            .await;
        assert_eq!(reply, ASK_CITY);
        assert_eq!(dialog.state(-100), Some(DialogState::AwaitingCity));

        let reply = dialog.handle_text_on(-100, true, " Algiers ", today()).await;
        assert_eq!(reply.as_deref(), Some(ASK_COUNTRY));

        let reply = dialog.handle_text_on(-100, true, "Algeria", today()).await.unwrap();
        assert!(reply.contains("Algiers, Algeria"));
        assert!(reply.contains("الفجر: 05:00"));
        assert!(!dialog.is_in_progress(-100));

        let rec = store.lock().await.get(-100).cloned().unwrap();
        assert!(rec.active);
        assert_eq!(rec.location, Location::new("Algiers", "Algeria"));
        assert_eq!(rec.trigger_set.unwrap().date, today());
        assert_eq!(rec.metadata.admin_username, "amina");
        assert!(rec.metadata.subscribed_at.is_some());
    }

    #[tokio::test]
    async fn test_unknown_location_stays_inactive() {
        let (_dir, store, dialog) = setup();
        dialog.begin(-100, true, ConfigureRequest::default()).await;
        dialog.handle_text_on(-100, true, "Atlantis", today()).await;
        let reply = dialog.handle_text_on(-100, true, "Nowhere", today()).await;

        assert_eq!(reply.as_deref(), Some(NOT_FOUND));
        assert!(!dialog.is_in_progress(-100));
        let rec = store.lock().await.get(-100).cloned().unwrap();
        assert!(!rec.active);
        assert!(rec.trigger_set.is_none());
        assert_eq!(rec.location, Location::default());
    }

    #[tokio::test]
    async fn test_failed_reconfigure_keeps_active_tenant() {
        let (_dir, store, dialog) = setup();
        dialog.begin(-100, true, ConfigureRequest::default()).await;
        dialog.handle_text_on(-100, true, "Algiers", today()).await;
        dialog.handle_text_on(-100, true, "Algeria", today()).await;

        dialog.begin(-100, true, ConfigureRequest::default()).await;
        dialog.handle_text_on(-100, true, "Flaky", today()).await;
        let reply = dialog.handle_text_on(-100, true, "Anywhere", today()).await;

        assert_eq!(reply.as_deref(), Some(LOOKUP_UNAVAILABLE));
        let rec = store.lock().await.get(-100).cloned().unwrap();
        assert!(rec.active);
        assert_eq!(rec.location.city, "Algiers");
    }

    #[tokio::test]
    async fn test_non_admins_cannot_start_or_advance() {
        let (_dir, store, dialog) = setup();
        assert_eq!(dialog.begin(-100, false, ConfigureRequest::default()).await, NOT_ADMIN);
        assert!(!dialog.is_in_progress(-100));
        assert!(store.lock().await.get(-100).is_none());

        dialog.begin(-100, true, ConfigureRequest::default()).await;
        assert_eq!(dialog.handle_text_on(-100, false, "Cairo", today()).await, None);
        assert_eq!(dialog.state(-100), Some(DialogState::AwaitingCity));
    }

    #[tokio::test]
    async fn test_messages_outside_dialog_are_ignored() {
        let (_dir, _store, dialog) = setup();
        assert_eq!(dialog.handle_text_on(-5, true, "hello", today()).await, None);
    }
}
