//! Derived study-tracking operations.
//!
//! Lesson progress, the study streak, and the user profile are plain values
//! stored through the generic session primitives; nothing here has its own
//! storage path except the per-lesson mirror documents.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use crate::clock::Clock;
use crate::constants::{LAST_STUDY_DATE_KEY, PROGRESS_KEY, STREAK_KEY, USER_PROFILE_KEY};
use crate::session::{Session, SessionError};
use crate::store::{DocPath, Document};

/// Stored dates use the local calendar day, no time component.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Completion record for a single lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonRecord {
    pub completed: bool,
    /// RFC3339 instant of the most recent completion update.
    pub completed_at: String,
}

impl Session {
    /// Record a lesson completion.
    ///
    /// Updates the lesson's entry in the progress map under the `"progress"`
    /// key, and additionally mirrors the completion flag to the dedicated
    /// per-lesson document so progress is queryable both as one blob and per
    /// lesson.
    ///
    /// The read-modify-write of the progress map is not atomic against
    /// concurrent writers of the same map; last writer wins. Sessions assume
    /// a single writer per user.
    pub async fn save_progress(&self, lesson_id: impl AsRef<str>, completed: bool) -> Result<()> {
        let lesson_id = lesson_id.as_ref();
        if lesson_id.is_empty() {
            return Err(SessionError::EmptyLessonId.into());
        }

        let completed_at = self.clock().now_rfc3339();
        let mut progress = self.progress().await;
        progress.insert(
            lesson_id.to_string(),
            LessonRecord {
                completed,
                completed_at: completed_at.clone(),
            },
        );
        self.set(PROGRESS_KEY, serde_json::to_value(&progress)?)
            .await?;

        if let Some(user) = self.current_user() {
            let mut fields = Document::new();
            fields.insert("completed".to_string(), completed.into());
            fields.insert("completedAt".to_string(), completed_at.into());
            let path = DocPath::user_progress(&user, lesson_id);
            if let Err(e) = self.remote(self.store().write_merge(&path, fields)).await {
                tracing::error!("failed to mirror progress for lesson '{lesson_id}': {e}");
            }
        }
        Ok(())
    }

    /// The decoded progress map, empty when absent or malformed.
    pub async fn progress(&self) -> HashMap<String, LessonRecord> {
        let raw = self
            .get(PROGRESS_KEY, Value::Object(Default::default()))
            .await;
        serde_json::from_value(raw).unwrap_or_else(|e| {
            tracing::warn!("stored progress is malformed, starting fresh: {e}");
            HashMap::new()
        })
    }

    /// The per-lesson mirror documents for the signed-in user.
    ///
    /// Returns an empty map when signed out or on store failure.
    pub async fn lesson_records(&self) -> HashMap<String, Value> {
        let Some(user) = self.current_user() else {
            return HashMap::new();
        };
        let collection = DocPath::progress_collection(&user);
        match self.remote(self.store().list_children(&collection)).await {
            Ok(children) => children
                .into_iter()
                .map(|(id, doc)| (id, Value::Object(doc)))
                .collect(),
            Err(e) => {
                tracing::error!("failed to list lesson records for {user}: {e}");
                HashMap::new()
            }
        }
    }

    /// Advance the study streak for today, at most once per local day.
    ///
    /// Consecutive local calendar days increment the streak; a gap of one or
    /// more full days resets it to 1. Calling again on the same day is a
    /// no-op.
    pub async fn update_streak(&self) -> Result<()> {
        let today = self.clock().today_local();
        let today_str = today.format(DATE_FORMAT).to_string();

        let last = self.get(LAST_STUDY_DATE_KEY, Value::Null).await;
        let last = last.as_str().map(str::to_string);
        if last.as_deref() == Some(today_str.as_str()) {
            return Ok(());
        }

        let yesterday = (today - chrono::Days::new(1))
            .format(DATE_FORMAT)
            .to_string();
        let streak = if last.as_deref() == Some(yesterday.as_str()) {
            self.streak().await + 1
        } else {
            1
        };

        self.set(STREAK_KEY, streak.into()).await?;
        self.set(LAST_STUDY_DATE_KEY, today_str.into()).await?;
        Ok(())
    }

    /// The current study streak in days, 0 when never studied.
    pub async fn streak(&self) -> u64 {
        self.get(STREAK_KEY, 0.into()).await.as_u64().unwrap_or(0)
    }

    /// Store the user's profile blob under the `"userProfile"` key.
    pub async fn save_user_profile(&self, profile: Value) -> Result<()> {
        self.set(USER_PROFILE_KEY, profile).await
    }

    /// The stored user profile, an empty object when absent.
    pub async fn user_profile(&self) -> Value {
        self.get(USER_PROFILE_KEY, Value::Object(Default::default()))
            .await
    }
}
