//! Operator commands: tenant listing, statistics and broadcasts.
//!
//! Only usernames listed under `[operator]` may run these; the gate lives in
//! the bot front-end.

use wird_core::tenant::TenantRecord;
use wird_core::traits::Transport;
use wird_scheduler::engine::with_rate_limit_retry;
use wird_scheduler::store::SharedStore;

/// Which tenants a broadcast goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastScope {
    All,
    InactiveOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    List,
    Stats,
    /// Send the raw tenant file.
    Dump,
    Broadcast { text: String, scope: BroadcastScope },
}

impl OperatorCommand {
    /// Parse a message. `/cmd@botname` is accepted; a broadcast needs text.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let (head, rest) = match text.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim()),
            None => (text, ""),
        };
        let command = head.split('@').next().unwrap_or(head);

        match command {
            "/list" => Some(Self::List),
            "/stats" => Some(Self::Stats),
            "/see" => Some(Self::Dump),
            "/broadcast" | "/broadcast_inactive" if !rest.is_empty() => Some(Self::Broadcast {
                text: rest.to_string(),
                scope: if command == "/broadcast" {
                    BroadcastScope::All
                } else {
                    BroadcastScope::InactiveOnly
                },
            }),
            _ => None,
        }
    }
}

/// Outcome of a broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
}

impl BroadcastReport {
    pub fn summary(&self) -> String {
        format!("📣 تم الإرسال إلى {} مجموعة (فشل {}).", self.sent, self.failed)
    }
}

/// One line per tenant.
pub fn format_list(records: &[TenantRecord]) -> String {
    if records.is_empty() {
        return "لا توجد مجموعات مسجلة بعد.".to_string();
    }
    let mut out = format!("📋 المجموعات ({}):\n", records.len());
    for r in records {
        let name = if r.metadata.display_name.is_empty() {
            r.id.to_string()
        } else {
            r.metadata.display_name.clone()
        };
        let status = if r.active { "✅" } else { "⏸" };
        let location = if r.location.is_complete() {
            r.location.to_string()
        } else {
            "-".to_string()
        };
        out.push_str(&format!(
            "{status} {name} ({}) | {location} | صفحة {}\n",
            r.id, r.content_position
        ));
    }
    out
}

/// Aggregate numbers across all tenants.
pub fn format_stats(records: &[TenantRecord]) -> String {
    let active = records.iter().filter(|r| r.active).count();
    let members: u64 = records.iter().map(|r| r.metadata.member_count as u64).sum();
    let deliveries: u64 = records.iter().map(|r| r.delivery_count).sum();
    let reactions: u64 = records.iter().map(|r| r.metadata.total_reactions).sum();

    format!(
        "📊 الإحصائيات\n\
         المجموعات: {}\n\
         النشطة: {}\n\
         غير النشطة: {}\n\
         إجمالي الأعضاء: {}\n\
         الأوراد المرسلة: {}\n\
         التفاعلات: {}",
        records.len(),
        active,
        records.len() - active,
        members,
        deliveries,
        reactions
    )
}

/// Send `text` to every tenant in `scope`. Failures are counted, not fatal.
pub async fn broadcast(
    store: &SharedStore,
    transport: &dyn Transport,
    scope: BroadcastScope,
    text: &str,
) -> BroadcastReport {
    let targets: Vec<_> = {
        let store = store.lock().await;
        store
            .list()
            .into_iter()
            .filter(|r| scope == BroadcastScope::All || !r.active)
            .map(|r| r.id)
            .collect()
    };

    let mut report = BroadcastReport::default();
    for id in targets {
        match with_rate_limit_retry(id, || transport.send_text(id, text)).await {
            Ok(()) => report.sent += 1,
            Err(e) => {
                tracing::warn!("Broadcast to {id} failed: {e}");
                report.failed += 1;
            }
        }
    }
    tracing::info!(
        "📣 Broadcast ({scope:?}): sent {}, failed {}",
        report.sent,
        report.failed
    );
    report
}
