//! Turns a release into the messages that go out: the page album, then any
//! follow-ups (adhkar image, khatma closing).

use wird_core::config::ContentConfig;
use wird_core::tenant::TriggerName;

use crate::cycler::Release;

/// A message sent after the album succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    Text(String),
    Photo { url: String, caption: String },
}

/// Everything one release sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub image_urls: Vec<String>,
    pub caption: String,
    pub follow_ups: Vec<FollowUp>,
}

/// Album caption for a prayer.
pub fn caption(trigger: TriggerName) -> String {
    format!("ورد صلاة {} 📖", trigger.arabic_name())
}

/// Build the delivery for `release` at `trigger`.
pub fn compose(config: &ContentConfig, trigger: TriggerName, release: &Release) -> Delivery {
    let image_urls = release.pages.iter().map(|p| config.page_url(*p)).collect();

    let mut follow_ups = Vec::new();
    let adhkar = match trigger {
        TriggerName::Fajr => config
            .morning_adhkar_url
            .as_ref()
            .map(|url| (url, "أذكار الصباح")),
        TriggerName::Asr => config
            .evening_adhkar_url
            .as_ref()
            .map(|url| (url, "أذكار المساء")),
        _ => None,
    };
    if let Some((url, caption)) = adhkar {
        follow_ups.push(FollowUp::Photo {
            url: url.clone(),
            caption: caption.to_string(),
        });
    }

    if release.completed {
        follow_ups.push(FollowUp::Text(config.completion_text.clone()));
        if let Some(url) = &config.completion_image_url {
            follow_ups.push(FollowUp::Photo {
                url: url.clone(),
                caption: "دعاء ختم القرآن الكريم 🤲".to_string(),
            });
        }
        follow_ups.push(FollowUp::Text(config.restart_text.clone()));
    }

    Delivery {
        image_urls,
        caption: caption(trigger),
        follow_ups,
    }
}
