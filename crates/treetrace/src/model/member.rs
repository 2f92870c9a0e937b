//! Family member records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::normalize_text;
use crate::error::{Error, Result};

/// Gender of a family member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    /// Male.
    #[serde(alias = "Male", alias = "M", alias = "m")]
    Male,
    /// Female.
    #[serde(alias = "Female", alias = "F", alias = "f")]
    Female,
    /// Any other gender.
    #[serde(alias = "Other")]
    Other,
    /// Not recorded.
    #[default]
    #[serde(other)]
    Unknown,
}

impl Gender {
    /// Whether the gender has been recorded.
    #[must_use]
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
            Self::Other => write!(f, "other"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for Gender {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "male" | "m" => Self::Male,
            "female" | "f" => Self::Female,
            "other" => Self::Other,
            _ => Self::Unknown,
        })
    }
}

/// Whether a family member is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifeStatus {
    /// Living.
    #[serde(alias = "Alive", alias = "living")]
    Alive,
    /// Deceased.
    #[serde(alias = "Dead", alias = "deceased")]
    Dead,
    /// Not recorded.
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for LifeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alive => write!(f, "alive"),
            Self::Dead => write!(f, "dead"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

impl FromStr for LifeStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "alive" | "living" => Self::Alive,
            "dead" | "deceased" => Self::Dead,
            _ => Self::Unknown,
        })
    }
}

/// A node in a family tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMember {
    /// Unique identifier.
    #[serde(rename = "_id")]
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Given name.
    pub name: String,
    /// Family name.
    pub surname: String,
    /// Gender.
    pub gender: Gender,
    /// Alive, dead or unknown.
    pub status: LifeStatus,
    /// Date of birth.
    pub birth_date: Option<NaiveDate>,
    /// Date of death.
    pub death_date: Option<NaiveDate>,
    /// Father's member id.
    pub father_id: Option<String>,
    /// Mother's member id.
    pub mother_id: Option<String>,
    /// Partner's member id.
    pub partner_id: Option<String>,
    /// Occupation.
    pub occupation: Option<String>,
    /// Country of residence or origin.
    pub country: Option<String>,
    /// Link to a portrait.
    pub photo_url: Option<String>,
    /// Visible to other users.
    pub is_public: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl FamilyMember {
    /// Full display name, `name surname`.
    #[must_use]
    pub fn full_name(&self) -> String {
        if self.surname.is_empty() {
            self.name.clone()
        } else {
            format!("{} {}", self.name, self.surname)
        }
    }

    /// Ids of the recorded parents.
    pub fn parent_ids(&self) -> impl Iterator<Item = &str> {
        self.father_id
            .as_deref()
            .into_iter()
            .chain(self.mother_id.as_deref())
    }

    /// Check the invariants that can be verified on the record alone.
    ///
    /// Referential checks (parents exist, no cycles) need the rest of the
    /// tree and happen in storage.
    ///
    /// # Errors
    ///
    /// Returns a validation error describing the first violated rule.
    pub fn check_fields(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("name must not be blank"));
        }

        if let (Some(birth), Some(death)) = (self.birth_date, self.death_date) {
            if death < birth {
                return Err(Error::validation(format!(
                    "deathDate ({death}) cannot be before birthDate ({birth})"
                )));
            }
        }

        if self.status == LifeStatus::Alive && self.death_date.is_some() {
            return Err(Error::validation(
                "a member with status alive cannot have a deathDate",
            ));
        }

        for (field, value) in [
            ("fatherId", &self.father_id),
            ("motherId", &self.mother_id),
            ("partnerId", &self.partner_id),
        ] {
            if value.as_deref() == Some(self.id.as_str()) {
                return Err(Error::validation(format!(
                    "{field} cannot reference the member itself"
                )));
            }
        }

        if self.father_id.is_some() && self.father_id == self.mother_id {
            return Err(Error::validation("fatherId and motherId must differ"));
        }

        Ok(())
    }
}

/// Payload for creating a family member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewFamilyMember {
    /// Given name.
    pub name: String,
    /// Family name.
    pub surname: String,
    /// Gender.
    pub gender: Gender,
    /// Alive, dead or unknown.
    pub status: LifeStatus,
    /// Date of birth.
    #[serde(deserialize_with = "super::optional_date")]
    pub birth_date: Option<NaiveDate>,
    /// Date of death.
    #[serde(deserialize_with = "super::optional_date")]
    pub death_date: Option<NaiveDate>,
    /// Father's member id.
    pub father_id: Option<String>,
    /// Mother's member id.
    pub mother_id: Option<String>,
    /// Partner's member id.
    pub partner_id: Option<String>,
    /// Occupation.
    pub occupation: Option<String>,
    /// Country.
    pub country: Option<String>,
    /// Link to a portrait.
    pub photo_url: Option<String>,
    /// Visible to other users.
    pub is_public: bool,
}

impl NewFamilyMember {
    /// Build the stored record, normalizing text fields.
    #[must_use]
    pub fn into_member(self, id: String, user_id: String, now: DateTime<Utc>) -> FamilyMember {
        FamilyMember {
            id,
            user_id,
            name: self.name.trim().to_string(),
            surname: self.surname.trim().to_string(),
            gender: self.gender,
            status: self.status,
            birth_date: self.birth_date,
            death_date: self.death_date,
            father_id: normalize_text(self.father_id),
            mother_id: normalize_text(self.mother_id),
            partner_id: normalize_text(self.partner_id),
            occupation: normalize_text(self.occupation),
            country: normalize_text(self.country),
            photo_url: normalize_text(self.photo_url),
            is_public: self.is_public,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a family member.
///
/// A missing field leaves the stored value alone; an explicit `null` (or a
/// blank string) clears an optional field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FamilyMemberPatch {
    /// Given name.
    pub name: Option<String>,
    /// Family name.
    pub surname: Option<String>,
    /// Gender.
    pub gender: Option<Gender>,
    /// Alive, dead or unknown.
    pub status: Option<LifeStatus>,
    /// Date of birth.
    #[serde(deserialize_with = "super::patch_date")]
    pub birth_date: Option<Option<NaiveDate>>,
    /// Date of death.
    #[serde(deserialize_with = "super::patch_date")]
    pub death_date: Option<Option<NaiveDate>>,
    /// Father's member id.
    #[serde(deserialize_with = "super::patch_field")]
    pub father_id: Option<Option<String>>,
    /// Mother's member id.
    #[serde(deserialize_with = "super::patch_field")]
    pub mother_id: Option<Option<String>>,
    /// Partner's member id.
    #[serde(deserialize_with = "super::patch_field")]
    pub partner_id: Option<Option<String>>,
    /// Occupation.
    #[serde(deserialize_with = "super::patch_field")]
    pub occupation: Option<Option<String>>,
    /// Country.
    #[serde(deserialize_with = "super::patch_field")]
    pub country: Option<Option<String>>,
    /// Link to a portrait.
    #[serde(deserialize_with = "super::patch_field")]
    pub photo_url: Option<Option<String>>,
    /// Visible to other users.
    pub is_public: Option<bool>,
}

impl FamilyMemberPatch {
    /// Apply the patch to a member.
    ///
    /// Returns `true` if any field changed. `updated_at` is left to the caller.
    pub fn apply(self, member: &mut FamilyMember) -> bool {
        let before = member.clone();

        if let Some(name) = self.name {
            member.name = name.trim().to_string();
        }
        if let Some(surname) = self.surname {
            member.surname = surname.trim().to_string();
        }
        if let Some(gender) = self.gender {
            member.gender = gender;
        }
        if let Some(status) = self.status {
            member.status = status;
        }
        if let Some(birth_date) = self.birth_date {
            member.birth_date = birth_date;
        }
        if let Some(death_date) = self.death_date {
            member.death_date = death_date;
        }
        if let Some(father_id) = self.father_id {
            member.father_id = normalize_text(father_id);
        }
        if let Some(mother_id) = self.mother_id {
            member.mother_id = normalize_text(mother_id);
        }
        if let Some(partner_id) = self.partner_id {
            member.partner_id = normalize_text(partner_id);
        }
        if let Some(occupation) = self.occupation {
            member.occupation = normalize_text(occupation);
        }
        if let Some(country) = self.country {
            member.country = normalize_text(country);
        }
        if let Some(photo_url) = self.photo_url {
            member.photo_url = normalize_text(photo_url);
        }
        if let Some(is_public) = self.is_public {
            member.is_public = is_public;
        }

        *member != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str) -> FamilyMember {
        NewFamilyMember {
            name: "Ada".to_string(),
            surname: "Lovelace".to_string(),
            ..NewFamilyMember::default()
        }
        .into_member(id.to_string(), "u1".to_string(), Utc::now())
    }

    #[test]
    fn test_gender_parsing_is_lenient() {
        let g: Gender = serde_json::from_str("\"Female\"").unwrap();
        assert_eq!(g, Gender::Female);
        let g: Gender = serde_json::from_str("\"prefer not to say\"").unwrap();
        assert_eq!(g, Gender::Unknown);
        assert_eq!("MALE".parse::<Gender>().unwrap(), Gender::Male);
    }

    #[test]
    fn test_status_display_roundtrips_through_from_str() {
        for status in [LifeStatus::Alive, LifeStatus::Dead, LifeStatus::Unknown] {
            assert_eq!(status.to_string().parse::<LifeStatus>().unwrap(), status);
        }
        assert_eq!("deceased".parse::<LifeStatus>().unwrap(), LifeStatus::Dead);
    }

    #[test]
    fn test_member_serializes_client_field_names() {
        let mut member = sample("m1");
        member.birth_date = NaiveDate::from_ymd_opt(1815, 12, 10);
        let json = serde_json::to_value(&member).unwrap();

        assert_eq!(json["_id"], "m1");
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["birthDate"], "1815-12-10");
        assert_eq!(json["isPublic"], false);
        assert!(json["fatherId"].is_null());
    }

    #[test]
    fn test_new_member_accepts_blank_form_fields() {
        let payload: NewFamilyMember = serde_json::from_str(
            r#"{"name": " Ada ", "birthDate": "", "fatherId": "", "gender": "female"}"#,
        )
        .unwrap();
        let member = payload.into_member("m1".to_string(), "u1".to_string(), Utc::now());

        assert_eq!(member.name, "Ada");
        assert_eq!(member.birth_date, None);
        assert_eq!(member.father_id, None);
        assert_eq!(member.gender, Gender::Female);
        assert_eq!(member.status, LifeStatus::Unknown);
    }

    #[test]
    fn test_check_fields_rejects_blank_name() {
        let mut member = sample("m1");
        member.name = "  ".to_string();
        assert!(member.check_fields().is_err());
    }

    #[test]
    fn test_check_fields_rejects_death_before_birth() {
        let mut member = sample("m1");
        member.birth_date = NaiveDate::from_ymd_opt(1900, 1, 1);
        member.death_date = NaiveDate::from_ymd_opt(1899, 1, 1);
        let err = member.check_fields().unwrap_err().to_string();
        assert!(err.contains("deathDate"));
    }

    #[test]
    fn test_check_fields_rejects_alive_with_death_date() {
        let mut member = sample("m1");
        member.status = LifeStatus::Alive;
        member.death_date = NaiveDate::from_ymd_opt(1999, 1, 1);
        assert!(member.check_fields().is_err());
    }

    #[test]
    fn test_check_fields_rejects_self_reference() {
        let mut member = sample("m1");
        member.father_id = Some("m1".to_string());
        let err = member.check_fields().unwrap_err().to_string();
        assert!(err.contains("fatherId"));
    }

    #[test]
    fn test_check_fields_rejects_same_father_and_mother() {
        let mut member = sample("m1");
        member.father_id = Some("p".to_string());
        member.mother_id = Some("p".to_string());
        assert!(member.check_fields().is_err());
    }

    #[test]
    fn test_patch_distinguishes_missing_and_null() {
        let mut member = sample("m1");
        member.country = Some("Norway".to_string());
        member.occupation = Some("Smith".to_string());

        let patch: FamilyMemberPatch =
            serde_json::from_str(r#"{"country": null, "surname": "Byron"}"#).unwrap();
        assert!(patch.apply(&mut member));

        assert_eq!(member.country, None);
        assert_eq!(member.occupation, Some("Smith".to_string()));
        assert_eq!(member.surname, "Byron");
    }

    #[test]
    fn test_patch_is_idempotent() {
        let mut member = sample("m1");
        let patch: FamilyMemberPatch =
            serde_json::from_str(r#"{"occupation": "Mathematician", "isPublic": true}"#).unwrap();

        assert!(patch.clone().apply(&mut member));
        let after_first = member.clone();
        assert!(!patch.apply(&mut member));
        assert_eq!(member, after_first);
    }

    #[test]
    fn test_parent_ids() {
        let mut member = sample("m1");
        assert_eq!(member.parent_ids().count(), 0);
        member.mother_id = Some("mom".to_string());
        assert_eq!(member.parent_ids().collect::<Vec<_>>(), vec!["mom"]);
    }

    #[test]
    fn test_full_name() {
        let mut member = sample("m1");
        assert_eq!(member.full_name(), "Ada Lovelace");
        member.surname.clear();
        assert_eq!(member.full_name(), "Ada");
    }
}
