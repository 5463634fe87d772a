//! Scheduler engine: the tick loop that refreshes prayer times and fires
//! releases. Uses tokio::interval (sleeps between checks).
//!
//! Each tick runs two phases over the active tenants:
//! 1. refresh: re-resolve trigger sets whose date is not today;
//! 2. fire: run the gate, deliver due releases, commit position on success.
//!
//! The store lock is never held across network I/O. Commits only touch the
//! scheduler's field group (trigger_set, content_position, last_fired_at,
//! delivery_count), so the bot can edit location/active concurrently.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use wird_core::config::{ContentConfig, SchedulerConfig, WirdConfig};
use wird_core::error::{Result, TransportError, WirdError};
use wird_core::tenant::{TenantId, TenantRecord};
use wird_core::traits::{Transport, TriggerResolver};

use crate::content::{self, FollowUp};
use crate::cycler;
use crate::gate::{self, DueTrigger, GateConfig, GateDecision};
use crate::store::SharedStore;

/// Counters for one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub refreshed: usize,
    pub refresh_failed: usize,
    pub delivered: usize,
    pub completed: usize,
    pub delivery_failed: usize,
    /// Shutdown was requested mid-tick.
    pub interrupted: bool,
}

impl TickReport {
    pub fn has_activity(&self) -> bool {
        self.refreshed + self.refresh_failed + self.delivered + self.delivery_failed > 0
    }
}

/// The scheduler engine. Owns the collaborators and runs ticks.
pub struct SchedulerEngine {
    store: SharedStore,
    resolver: Arc<dyn TriggerResolver>,
    transport: Arc<dyn Transport>,
    config: SchedulerConfig,
    gate: GateConfig,
    content: ContentConfig,
}

impl SchedulerEngine {
    pub fn new(
        store: SharedStore,
        resolver: Arc<dyn TriggerResolver>,
        transport: Arc<dyn Transport>,
        config: &WirdConfig,
    ) -> Self {
        Self {
            store,
            resolver,
            transport,
            gate: GateConfig::from_scheduler(&config.scheduler),
            config: config.scheduler.clone(),
            content: config.content.clone(),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.config.tick_secs.max(1))
    }

    /// Run one full tick at `now` (local wall-clock time).
    pub async fn tick_at(&self, now: NaiveDateTime) -> TickReport {
        self.run_tick(now, None).await
    }

    async fn run_tick(
        &self,
        now: NaiveDateTime,
        shutdown: Option<&watch::Receiver<bool>>,
    ) -> TickReport {
        let stopping = || shutdown.is_some_and(|rx| *rx.borrow());
        let mut report = TickReport::default();
        let today = now.date();

        // ── Refresh phase ──
        let stale: Vec<TenantRecord> = {
            let store = self.store.lock().await;
            store
                .active()
                .into_iter()
                .filter(|t| t.needs_refresh(today))
                .collect()
        };
        for tenant in stale {
            if stopping() {
                report.interrupted = true;
                return report;
            }
            match self.resolver.resolve(&tenant.location, today).await {
                Ok(set) => {
                    // The dialog may have reconfigured the tenant while we were resolving.
                    let applied = self.store.lock().await.update(tenant.id, |r| {
                        let current = r.location == tenant.location && r.needs_refresh(today);
                        if current {
                            r.trigger_set = Some(set);
                        }
                        current
                    });
                    if applied == Some(true) {
                        tracing::info!(
                            "🕌 Prayer times for tenant {} ({}) updated for {today}",
                            tenant.id,
                            tenant.location
                        );
                        report.refreshed += 1;
                    } else {
                        tracing::debug!(
                            "Discarding prayer times for tenant {} ({}): record changed during lookup",
                            tenant.id,
                            tenant.location
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Prayer time refresh failed for tenant {} ({}): {e}",
                        tenant.id,
                        tenant.location
                    );
                    report.refresh_failed += 1;
                }
            }
        }

        // ── Fire phase ──
        let active = self.store.lock().await.active();
        for tenant in active {
            if stopping() {
                report.interrupted = true;
                return report;
            }
            let due = match gate::evaluate(&tenant, now, &self.gate) {
                GateDecision::NeedsResolution => {
                    tracing::debug!("Tenant {} has no prayer times for {today}, skipping", tenant.id);
                    continue;
                }
                GateDecision::Due(due) => due,
            };
            let limit = self.config.max_catch_up.unwrap_or(usize::MAX);
            if due.len() > limit {
                tracing::warn!(
                    "Tenant {} has {} releases due, sending the {limit} oldest",
                    tenant.id,
                    due.len()
                );
            }
            for trigger in due.into_iter().take(limit) {
                match self.fire(tenant.id, trigger).await {
                    Ok(Some(completed)) => {
                        report.delivered += 1;
                        report.completed += completed as usize;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(
                            "⚠️ Delivery of {} to tenant {} failed: {e}",
                            trigger.name,
                            tenant.id
                        );
                        report.delivery_failed += 1;
                        // Later triggers would reuse the same position; retry all next tick.
                        break;
                    }
                }
            }
        }

        report
    }

    /// Deliver one release. `Ok(Some(completed))` on delivery, `Ok(None)` if
    /// the tenant went away or was deactivated since the snapshot.
    async fn fire(&self, id: TenantId, trigger: DueTrigger) -> Result<Option<bool>> {
        let position = {
            let store = self.store.lock().await;
            match store.get(id) {
                Some(r) if r.active => r.content_position,
                _ => return Ok(None),
            }
        };

        let release = cycler::advance(position, self.config.run_length, self.config.corpus_size);
        let delivery = content::compose(&self.content, trigger.name, &release);

        tracing::info!(
            "📖 Sending {} wird (pages {}–{}) to tenant {id}",
            trigger.name,
            release.pages.first().copied().unwrap_or(position),
            release.pages.last().copied().unwrap_or(position),
        );
        with_rate_limit_retry(id, || {
            self.transport
                .send_album(id, &delivery.image_urls, &delivery.caption)
        })
        .await
        .map_err(WirdError::Transport)?;

        self.store.lock().await.update(id, |r| {
            r.content_position = release.next_position;
            r.last_fired_at = Some(trigger.instant);
            r.delivery_count += 1;
        });

        if release.completed {
            tracing::info!("🎉 Tenant {id} completed a khatma");
        }
        for follow_up in &delivery.follow_ups {
            let sent = match follow_up {
                FollowUp::Text(text) => {
                    with_rate_limit_retry(id, || self.transport.send_text(id, text)).await
                }
                FollowUp::Photo { url, caption } => {
                    with_rate_limit_retry(id, || self.transport.send_photo(id, url, caption)).await
                }
            };
            if let Err(e) = sent {
                tracing::warn!("⚠️ Follow-up message to tenant {id} failed: {e}");
            }
        }

        Ok(Some(release.completed))
    }
}

/// Run `op`; on a rate-limit wait the server's delay plus a second and try
/// exactly once more.
pub async fn with_rate_limit_retry<F, Fut>(
    tenant: TenantId,
    mut op: F,
) -> std::result::Result<(), TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<(), TransportError>>,
{
    match op().await {
        Err(TransportError::RateLimited { retry_after }) => {
            let wait = retry_after + Duration::from_secs(1);
            tracing::warn!("⏳ Rate limited sending to tenant {tenant}, retrying in {wait:?}");
            tokio::time::sleep(wait).await;
            op().await
        }
        other => other,
    }
}

/// Spawn the scheduler loop. Returns when `shutdown` flips to true (or its
/// sender is dropped); a tick in progress stops after its current tenant.
pub async fn spawn_scheduler(engine: Arc<SchedulerEngine>, mut shutdown: watch::Receiver<bool>) {
    let period = engine.tick_interval();
    tracing::info!("⏰ Scheduler started (tick every {}s)", period.as_secs());

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }
        if *shutdown.borrow() {
            break;
        }

        let now = Local::now().naive_local();
        let report = engine.run_tick(now, Some(&shutdown)).await;
        if report.has_activity() {
            tracing::info!(
                "🔔 Tick {}: refreshed {} (failed {}), delivered {} (failed {}), khatmas {}",
                now.format("%H:%M"),
                report.refreshed,
                report.refresh_failed,
                report.delivered,
                report.delivery_failed,
                report.completed
            );
        }
        if report.interrupted {
            break;
        }
    }

    tracing::info!("⏰ Scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TenantStore;
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveTime};
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex as StdMutex;
    use wird_core::error::ResolveError;
    use wird_core::tenant::{Location, TriggerName, TriggerSet};

    #[derive(Debug, Clone, PartialEq)]
    enum Sent {
        Album { tenant: TenantId, pages: usize, caption: String },
        Text { tenant: TenantId, text: String },
        Photo { tenant: TenantId, url: String },
    }

    #[derive(Default)]
    struct FakeTransport {
        sent: StdMutex<Vec<Sent>>,
        failures: StdMutex<VecDeque<TransportError>>,
        photo_error: StdMutex<Option<TransportError>>,
        attempts: StdMutex<usize>,
    }

    impl FakeTransport {
        fn fail_next(&self, err: TransportError) {
            self.failures.lock().unwrap().push_back(err);
        }
        fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }
        fn albums(&self) -> usize {
            self.sent()
                .iter()
                .filter(|s| matches!(s, Sent::Album { .. }))
                .count()
        }
        fn attempt(&self, sent: Sent) -> std::result::Result<(), TransportError> {
            *self.attempts.lock().unwrap() += 1;
            if let Some(err) = self.failures.lock().unwrap().pop_front() {
                return Err(err);
            }
            self.sent.lock().unwrap().push(sent);
            Ok(())
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        fn name(&self) -> &str {
            "fake"
        }
        async fn send_album(
            &self,
            tenant: TenantId,
            image_urls: &[String],
            caption: &str,
        ) -> std::result::Result<(), TransportError> {
            self.attempt(Sent::Album {
                tenant,
                pages: image_urls.len(),
                caption: caption.to_string(),
            })
        }
        async fn send_text(&self, tenant: TenantId, text: &str) -> std::result::Result<(), TransportError> {
            self.attempt(Sent::Text { tenant, text: text.to_string() })
        }
        async fn send_photo(
            &self,
            tenant: TenantId,
            image_url: &str,
            _caption: &str,
        ) -> std::result::Result<(), TransportError> {
            if let Some(err) = self.photo_error.lock().unwrap().clone() {
                return Err(err);
            }
            self.attempt(Sent::Photo { tenant, url: image_url.to_string() })
        }
    }

    /// Resolves every location to the same schedule unless told otherwise.
    #[derive(Default)]
    struct FakeResolver {
        errors: StdMutex<HashMap<String, ResolveError>>,
        calls: StdMutex<usize>,
    }

    impl FakeResolver {
        fn fail_for(&self, city: &str, err: ResolveError) {
            self.errors.lock().unwrap().insert(city.to_string(), err);
        }
        fn clear(&self) {
            self.errors.lock().unwrap().clear();
        }
        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl TriggerResolver for FakeResolver {
        fn name(&self) -> &str {
            "fake"
        }
        async fn resolve(
            &self,
            location: &Location,
            date: NaiveDate,
        ) -> std::result::Result<TriggerSet, ResolveError> {
            *self.calls.lock().unwrap() += 1;
            if let Some(err) = self.errors.lock().unwrap().get(&location.city) {
                return Err(err.clone());
            }
            Ok(schedule(date))
        }
    }

    fn schedule(date: NaiveDate) -> TriggerSet {
        let times = [(5, 12), (12, 30), (15, 45), (18, 20), (19, 40)];
        TriggerSet::new(
            date,
            TriggerName::ALL
                .iter()
                .zip(times)
                .map(|(n, (h, m))| (*n, NaiveTime::from_hms_opt(h, m, 0).unwrap())),
        )
        .unwrap()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()
    }

    fn at(h: u32, m: u32) -> NaiveDateTime {
        day().and_hms_opt(h, m, 0).unwrap()
    }

    struct Harness {
        _dir: tempfile::TempDir,
        store: SharedStore,
        transport: Arc<FakeTransport>,
        resolver: Arc<FakeResolver>,
        engine: SchedulerEngine,
    }

    fn harness(config: WirdConfig) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = TenantStore::open(dir.path()).unwrap().shared();
        let transport = Arc::new(FakeTransport::default());
        let resolver = Arc::new(FakeResolver::default());
        let engine = SchedulerEngine::new(store.clone(), resolver.clone(), transport.clone(), &config);
        Harness {
            _dir: dir,
            store,
            transport,
            resolver,
            engine,
        }
    }

    async fn add_tenant(store: &SharedStore, id: TenantId, city: &str, position: u32) {
        let mut rec = TenantRecord::new(id);
        rec.location = Location::new(city, "Algeria");
        rec.active = true;
        rec.content_position = position;
        store.lock().await.upsert(rec);
    }

    async fn record(store: &SharedStore, id: TenantId) -> TenantRecord {
        store.lock().await.get(id).cloned().unwrap()
    }

    #[tokio::test]
    async fn test_fires_once_across_ticks_in_window() {
        let h = harness(WirdConfig::default());
        add_tenant(&h.store, 1, "Algiers", 1).await;

        let first = h.engine.tick_at(at(5, 13)).await;
        assert_eq!(first.refreshed, 1);
        assert_eq!(first.delivered, 1);

        let second = h.engine.tick_at(at(5, 14)).await;
        assert_eq!(second.delivered, 0);
        assert_eq!(h.transport.albums(), 1);

        let rec = record(&h.store, 1).await;
        assert_eq!(rec.last_fired_at, Some(at(5, 12)));
        assert_eq!(rec.content_position, 6);
        assert_eq!(rec.delivery_count, 1);
        assert_eq!(h.resolver.calls(), 1);
    }

    #[tokio::test]
    async fn test_restart_mid_window_does_not_resend() {
        let h = harness(WirdConfig::default());
        add_tenant(&h.store, 1, "Algiers", 1).await;
        h.engine.tick_at(at(5, 13)).await;

        // Fresh engine over the same store, as after a process restart.
        let restarted = SchedulerEngine::new(
            h.store.clone(),
            h.resolver.clone(),
            h.transport.clone(),
            &WirdConfig::default(),
        );
        let report = restarted.tick_at(at(5, 15)).await;
        assert_eq!(report.delivered, 0);
        assert_eq!(h.transport.albums(), 1);
    }

    #[tokio::test]
    async fn test_inactive_tenants_are_ignored() {
        let h = harness(WirdConfig::default());
        add_tenant(&h.store, 1, "Algiers", 1).await;
        h.store.lock().await.update(1, |r| r.active = false);

        let report = h.engine.tick_at(at(5, 13)).await;
        assert_eq!(report, TickReport::default());
        assert_eq!(h.resolver.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_fire_after_rollover_until_refresh_succeeds() {
        let h = harness(WirdConfig::default());
        add_tenant(&h.store, 1, "Algiers", 1).await;
        h.engine.tick_at(at(5, 13)).await;

        h.resolver
            .fail_for("Algiers", ResolveError::Transient("timeout".into()));
        let next_fajr = at(5, 13) + chrono::Duration::days(1);
        let report = h.engine.tick_at(next_fajr).await;
        assert_eq!(report.refresh_failed, 1);
        assert_eq!(report.delivered, 0);
        assert_eq!(record(&h.store, 1).await.trigger_set.unwrap().date, day());

        h.resolver.clear();
        let report = h
            .engine
            .tick_at(next_fajr + chrono::Duration::minutes(1))
            .await;
        assert_eq!(report.refreshed, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(h.transport.albums(), 2);
    }

    /// Moves tenant 1 to Oran (with its own times) while resolving Algiers.
    struct ReconfiguringResolver {
        store: SharedStore,
    }

    fn fajr_at(date: NaiveDate, hour: u32) -> TriggerSet {
        TriggerSet::new(
            date,
            TriggerName::ALL
                .iter()
                .enumerate()
                .map(|(i, n)| (*n, NaiveTime::from_hms_opt(hour + 3 * i as u32, 0, 0).unwrap())),
        )
        .unwrap()
    }

    #[async_trait]
    impl TriggerResolver for ReconfiguringResolver {
        fn name(&self) -> &str {
            "reconfiguring"
        }
        async fn resolve(
            &self,
            _location: &Location,
            date: NaiveDate,
        ) -> std::result::Result<TriggerSet, ResolveError> {
            self.store.lock().await.update(1, |r| {
                r.location = Location::new("Oran", "Algeria");
                r.trigger_set = Some(fajr_at(date, 6));
            });
            Ok(fajr_at(date, 4))
        }
    }

    #[tokio::test]
    async fn test_refresh_does_not_overwrite_reconfigured_tenant() {
        let dir = tempfile::tempdir().unwrap();
        let store = TenantStore::open(dir.path()).unwrap().shared();
        add_tenant(&store, 1, "Algiers", 1).await;
        let engine = SchedulerEngine::new(
            store.clone(),
            Arc::new(ReconfiguringResolver { store: store.clone() }),
            Arc::new(FakeTransport::default()),
            &WirdConfig::default(),
        );

        let report = engine.tick_at(at(3, 0)).await;
        assert_eq!(report.refreshed, 0);

        let rec = record(&store, 1).await;
        assert_eq!(rec.location, Location::new("Oran", "Algeria"));
        let fajr = rec.trigger_set.unwrap().times[&TriggerName::Fajr];
        assert_eq!(fajr, NaiveTime::from_hms_opt(6, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_transport_failure_leaves_state_and_retries() {
        let h = harness(WirdConfig::default());
        add_tenant(&h.store, 1, "Algiers", 40).await;
        h.transport.fail_next(TransportError::Api("Bad Gateway".into()));

        let report = h.engine.tick_at(at(5, 13)).await;
        assert_eq!(report.delivery_failed, 1);
        let rec = record(&h.store, 1).await;
        assert_eq!(rec.content_position, 40);
        assert_eq!(rec.last_fired_at, None);

        let report = h.engine.tick_at(at(5, 14)).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(record(&h.store, 1).await.content_position, 45);
    }

    #[tokio::test]
    async fn test_repeated_failure_is_bounded() {
        let h = harness(WirdConfig::default());
        add_tenant(&h.store, 1, "Algiers", 1).await;

        for minute in 12..30 {
            h.transport.fail_next(TransportError::Http("connection reset".into()));
            h.engine.tick_at(at(5, minute)).await;
        }
        // Due from 05:12 up to (not including) 05:17: five attempts, then dropped.
        assert_eq!(*h.transport.attempts.lock().unwrap(), 5);
        assert_eq!(h.transport.albums(), 0);
        assert_eq!(record(&h.store, 1).await.content_position, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_retried_once() {
        let h = harness(WirdConfig::default());
        add_tenant(&h.store, 1, "Algiers", 1).await;
        h.transport.fail_next(TransportError::RateLimited {
            retry_after: Duration::from_secs(3),
        });

        let report = h.engine.tick_at(at(5, 13)).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(*h.transport.attempts.lock().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_rate_limit_fails_the_tenant_only() {
        let h = harness(WirdConfig::default());
        add_tenant(&h.store, 1, "Algiers", 1).await;
        add_tenant(&h.store, 2, "Oran", 1).await;
        let limited = TransportError::RateLimited {
            retry_after: Duration::from_secs(1),
        };
        h.transport.fail_next(limited.clone());
        h.transport.fail_next(limited);

        let report = h.engine.tick_at(at(5, 13)).await;
        assert_eq!(report.delivery_failed, 1);
        assert_eq!(report.delivered, 1);
        assert_eq!(record(&h.store, 1).await.content_position, 1);
        assert_eq!(record(&h.store, 2).await.content_position, 6);
    }

    #[tokio::test]
    async fn test_completion_sends_closing_messages() {
        let h = harness(WirdConfig::default());
        add_tenant(&h.store, 1, "Algiers", 602).await;

        let report = h.engine.tick_at(at(5, 13)).await;
        assert_eq!(report.completed, 1);
        let sent = h.transport.sent();
        assert_eq!(sent.len(), 3);
        assert!(matches!(&sent[0], Sent::Album { pages: 5, .. }));
        assert_eq!(
            sent[1],
            Sent::Text {
                tenant: 1,
                text: WirdConfig::default().content.completion_text
            }
        );
        assert_eq!(record(&h.store, 1).await.content_position, 3);
    }

    #[tokio::test]
    async fn test_follow_up_failure_does_not_undo_release() {
        let mut config = WirdConfig::default();
        config.content.morning_adhkar_url = Some("https://example.org/sabah.png".into());
        let h = harness(config);
        add_tenant(&h.store, 1, "Algiers", 1).await;
        *h.transport.photo_error.lock().unwrap() = Some(TransportError::Api("file too big".into()));

        let report = h.engine.tick_at(at(5, 13)).await;
        assert_eq!(report.delivered, 1);
        assert_eq!(report.delivery_failed, 0);
        assert_eq!(record(&h.store, 1).await.content_position, 6);
        assert_eq!(h.transport.sent().len(), 1);

        // Adhkar works again: next day's Fajr carries it.
        *h.transport.photo_error.lock().unwrap() = None;
        h.engine.tick_at(at(5, 13) + chrono::Duration::days(1)).await;
        assert_eq!(
            h.transport.sent().last(),
            Some(&Sent::Photo {
                tenant: 1,
                url: "https://example.org/sabah.png".into()
            })
        );
    }

    #[tokio::test]
    async fn test_catch_up_fires_oldest_first() {
        let mut config = WirdConfig::default();
        config.scheduler.fire_window_mins = 600;
        config.scheduler.dedup_margin_mins = 600;
        let h = harness(config);
        add_tenant(&h.store, 1, "Algiers", 1).await;

        // Two prayers inside the (very wide) window, nothing delivered yet.
        let report = h.engine.tick_at(at(12, 31)).await;
        assert_eq!(report.delivered, 2);
        let captions: Vec<_> = h
            .transport
            .sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Album { caption, .. } => Some(caption),
                _ => None,
            })
            .collect();
        assert_eq!(
            captions,
            vec![
                content::caption(TriggerName::Fajr),
                content::caption(TriggerName::Dhuhr)
            ]
        );
        let rec = record(&h.store, 1).await;
        assert_eq!(rec.content_position, 11);
        assert_eq!(rec.last_fired_at, Some(at(12, 30)));
    }

    #[tokio::test]
    async fn test_max_catch_up_limits_releases() {
        let mut config = WirdConfig::default();
        config.scheduler.fire_window_mins = 600;
        config.scheduler.dedup_margin_mins = 600;
        config.scheduler.max_catch_up = Some(1);
        let h = harness(config);
        add_tenant(&h.store, 1, "Algiers", 1).await;

        let report = h.engine.tick_at(at(12, 31)).await;
        assert_eq!(report.delivered, 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let h = harness(WirdConfig::default());
        let engine = Arc::new(h.engine);
        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(spawn_scheduler(engine, rx));
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler should stop")
            .unwrap();
    }
}
