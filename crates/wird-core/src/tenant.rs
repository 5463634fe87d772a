//! Tenant records, one per Telegram group/channel receiving the wird.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

/// Telegram chat id.
pub type TenantId = i64;

/// The five daily prayers, in the order they occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TriggerName {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl TriggerName {
    pub const ALL: [TriggerName; 5] = [
        TriggerName::Fajr,
        TriggerName::Dhuhr,
        TriggerName::Asr,
        TriggerName::Maghrib,
        TriggerName::Isha,
    ];

    /// Key used by the prayer-times API.
    pub fn api_key(&self) -> &'static str {
        match self {
            TriggerName::Fajr => "Fajr",
            TriggerName::Dhuhr => "Dhuhr",
            TriggerName::Asr => "Asr",
            TriggerName::Maghrib => "Maghrib",
            TriggerName::Isha => "Isha",
        }
    }

    /// Name shown in captions.
    pub fn arabic_name(&self) -> &'static str {
        match self {
            TriggerName::Fajr => "الفجر",
            TriggerName::Dhuhr => "الظهر",
            TriggerName::Asr => "العصر",
            TriggerName::Maghrib => "المغرب",
            TriggerName::Isha => "العشاء",
        }
    }
}

impl fmt::Display for TriggerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_key())
    }
}

/// City + country used to look up prayer times.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    pub country: String,
}

impl Location {
    pub fn new(city: &str, country: &str) -> Self {
        Self {
            city: city.trim().to_string(),
            country: country.trim().to_string(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.city.is_empty() && !self.country.is_empty()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.city, self.country)
    }
}

/// The five prayer times of one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSet {
    pub date: NaiveDate,
    pub times: BTreeMap<TriggerName, NaiveTime>,
}

impl TriggerSet {
    /// Build a set, rejecting it unless all five prayers are present.
    pub fn new(
        date: NaiveDate,
        times: impl IntoIterator<Item = (TriggerName, NaiveTime)>,
    ) -> Result<Self, ResolveError> {
        let times: BTreeMap<_, _> = times.into_iter().collect();
        if let Some(missing) = TriggerName::ALL.iter().find(|n| !times.contains_key(n)) {
            return Err(ResolveError::Invalid(format!("missing {missing}")));
        }
        Ok(Self { date, times })
    }

    /// A set is only usable on the date it was resolved for.
    pub fn is_valid_on(&self, date: NaiveDate) -> bool {
        self.date == date
    }

    /// Absolute trigger instants, in prayer order.
    pub fn instants(&self) -> Vec<(TriggerName, NaiveDateTime)> {
        self.times
            .iter()
            .map(|(name, time)| (*name, self.date.and_time(*time)))
            .collect()
    }
}

/// Descriptive fields with no effect on scheduling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantMetadata {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub admin_username: String,
    #[serde(default)]
    pub admin_id: i64,
    #[serde(default)]
    pub subscribed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_reactions: u64,
}

/// Persistent state of one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantRecord {
    pub id: TenantId,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub active: bool,
    /// Start page of the next release, in `[1, corpus_size]`.
    #[serde(default = "default_position")]
    pub content_position: u32,
    #[serde(default)]
    pub trigger_set: Option<TriggerSet>,
    /// Trigger instant of the last fully delivered release.
    #[serde(default)]
    pub last_fired_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub delivery_count: u64,
    #[serde(default)]
    pub metadata: TenantMetadata,
}

fn default_position() -> u32 {
    1
}

impl TenantRecord {
    /// A freshly seen chat: inactive, at the start of the cycle.
    pub fn new(id: TenantId) -> Self {
        Self {
            id,
            location: Location::default(),
            active: false,
            content_position: default_position(),
            trigger_set: None,
            last_fired_at: None,
            delivery_count: 0,
            metadata: TenantMetadata::default(),
        }
    }

    /// Whether the refresh phase must resolve prayer times for `today`.
    pub fn needs_refresh(&self, today: NaiveDate) -> bool {
        !self
            .trigger_set
            .as_ref()
            .is_some_and(|set| set.is_valid_on(today))
    }
}
