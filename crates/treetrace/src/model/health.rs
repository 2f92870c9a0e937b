//! Health condition annotations attached to family members.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::normalize_text;
use crate::error::{Error, Result};

/// A hereditary or medical annotation on a family member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCondition {
    /// Unique identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// The member this condition belongs to.
    pub family_member_id: String,
    /// Name of the condition, e.g. "Type 2 diabetes".
    pub condition_name: String,
    /// When the condition was diagnosed.
    pub diagnosis_date: Option<NaiveDate>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl HealthCondition {
    /// Check the condition's own invariants.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the condition name is blank.
    pub fn check_fields(&self) -> Result<()> {
        if self.condition_name.trim().is_empty() {
            return Err(Error::validation("conditionName must not be blank"));
        }
        Ok(())
    }
}

/// Payload for creating a health condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewHealthCondition {
    /// Name of the condition.
    pub condition_name: String,
    /// When the condition was diagnosed.
    #[serde(deserialize_with = "super::optional_date")]
    pub diagnosis_date: Option<NaiveDate>,
    /// Free-form notes.
    pub notes: Option<String>,
}

impl NewHealthCondition {
    /// Build the stored record.
    #[must_use]
    pub fn into_condition(
        self,
        id: String,
        family_member_id: String,
        now: DateTime<Utc>,
    ) -> HealthCondition {
        HealthCondition {
            id,
            family_member_id,
            condition_name: self.condition_name.trim().to_string(),
            diagnosis_date: self.diagnosis_date,
            notes: normalize_text(self.notes),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a health condition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HealthConditionPatch {
    /// Name of the condition.
    pub condition_name: Option<String>,
    /// When the condition was diagnosed; `null` clears it.
    #[serde(deserialize_with = "super::patch_date")]
    pub diagnosis_date: Option<Option<NaiveDate>>,
    /// Free-form notes; `null` clears them.
    #[serde(deserialize_with = "super::patch_field")]
    pub notes: Option<Option<String>>,
}

impl HealthConditionPatch {
    /// Apply the patch, returning `true` if anything changed.
    pub fn apply(self, condition: &mut HealthCondition) -> bool {
        let before = condition.clone();

        if let Some(name) = self.condition_name {
            condition.condition_name = name.trim().to_string();
        }
        if let Some(date) = self.diagnosis_date {
            condition.diagnosis_date = date;
        }
        if let Some(notes) = self.notes {
            condition.notes = normalize_text(notes);
        }

        *condition != before
    }
}
