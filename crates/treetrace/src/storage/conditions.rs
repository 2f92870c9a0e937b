//! Health condition storage.
//!
//! Conditions are private to the owner of the member they annotate, even when
//! the member itself is public.

use std::collections::HashMap;

use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

use super::{format_timestamp, now, parse_date, parse_timestamp, Storage};
use crate::error::{Error, Result};
use crate::model::{new_id, HealthCondition, HealthConditionPatch, NewHealthCondition};

const CONDITION_COLUMNS: &str =
    "c.id, c.family_member_id, c.condition_name, c.diagnosis_date, c.notes, c.created_at, c.updated_at";

impl Storage {
    /// Attach a condition to a member owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the owner has no such member, or a
    /// validation error for a blank condition name.
    pub fn create_condition(
        &self,
        family_member_id: &str,
        owner_id: &str,
        new_condition: NewHealthCondition,
    ) -> Result<HealthCondition> {
        self.get_owned_member(family_member_id, owner_id)?;

        let condition =
            new_condition.into_condition(new_id(), family_member_id.to_string(), now());
        condition.check_fields()?;

        self.conn.execute(
            r"
            INSERT INTO health_conditions
                (id, family_member_id, condition_name, diagnosis_date, notes, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
            params![
                condition.id,
                condition.family_member_id,
                condition.condition_name,
                condition.diagnosis_date.map(|d| d.format("%Y-%m-%d").to_string()),
                condition.notes,
                format_timestamp(condition.created_at),
                format_timestamp(condition.updated_at),
            ],
        )?;

        info!(
            "Added health condition {} to family member {family_member_id}",
            condition.id
        );
        Ok(condition)
    }

    /// List the conditions of a member owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the owner has no such member.
    pub fn list_conditions(
        &self,
        family_member_id: &str,
        owner_id: &str,
    ) -> Result<Vec<HealthCondition>> {
        self.get_owned_member(family_member_id, owner_id)?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CONDITION_COLUMNS} FROM health_conditions c \
             WHERE c.family_member_id = ?1 ORDER BY c.created_at, c.id"
        ))?;
        let conditions = stmt
            .query_map([family_member_id], Self::row_to_condition)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(conditions)
    }

    /// Get a condition whose member is owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the condition is missing or belongs to
    /// another user's member.
    pub fn get_condition(&self, id: &str, owner_id: &str) -> Result<HealthCondition> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {CONDITION_COLUMNS} FROM health_conditions c \
                     JOIN family_members m ON m.id = c.family_member_id \
                     WHERE c.id = ?1 AND m.user_id = ?2"
                ),
                params![id, owner_id],
                Self::row_to_condition,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("health condition", id))
    }

    /// Apply a partial update to a condition.
    ///
    /// A patch that changes nothing is not written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the owner cannot see the condition, or a
    /// validation error for a blank condition name.
    pub fn update_condition(
        &self,
        id: &str,
        owner_id: &str,
        patch: HealthConditionPatch,
    ) -> Result<HealthCondition> {
        let current = self.get_condition(id, owner_id)?;
        let mut condition = current.clone();
        if !patch.apply(&mut condition) {
            debug!("Update of health condition {id} changed nothing");
            return Ok(current);
        }

        condition.check_fields()?;
        condition.updated_at = now();

        self.conn.execute(
            r"
            UPDATE health_conditions
            SET condition_name = ?2, diagnosis_date = ?3, notes = ?4, updated_at = ?5
            WHERE id = ?1
            ",
            params![
                condition.id,
                condition.condition_name,
                condition.diagnosis_date.map(|d| d.format("%Y-%m-%d").to_string()),
                condition.notes,
                format_timestamp(condition.updated_at),
            ],
        )?;

        info!("Updated health condition {id}");
        Ok(condition)
    }

    /// Delete a condition.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the owner cannot see the condition.
    pub fn delete_condition(&self, id: &str, owner_id: &str) -> Result<()> {
        self.get_condition(id, owner_id)?;
        self.conn
            .execute("DELETE FROM health_conditions WHERE id = ?1", [id])?;
        info!("Deleted health condition {id}");
        Ok(())
    }

    /// All conditions on a user's members, keyed by member id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn conditions_by_member(&self, user_id: &str) -> Result<HashMap<String, Vec<HealthCondition>>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CONDITION_COLUMNS} FROM health_conditions c \
             JOIN family_members m ON m.id = c.family_member_id \
             WHERE m.user_id = ?1 ORDER BY c.created_at, c.id"
        ))?;

        let mut by_member: HashMap<String, Vec<HealthCondition>> = HashMap::new();
        for condition in stmt.query_map([user_id], Self::row_to_condition)? {
            let condition = condition?;
            by_member
                .entry(condition.family_member_id.clone())
                .or_default()
                .push(condition);
        }
        Ok(by_member)
    }

    fn row_to_condition(row: &rusqlite::Row) -> rusqlite::Result<HealthCondition> {
        let created_at: String = row.get(5)?;
        let updated_at: String = row.get(6)?;
        Ok(HealthCondition {
            id: row.get(0)?,
            family_member_id: row.get(1)?,
            condition_name: row.get(2)?,
            diagnosis_date: parse_date(3, row.get(3)?)?,
            notes: row.get(4)?,
            created_at: parse_timestamp(5, &created_at)?,
            updated_at: parse_timestamp(6, &updated_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::model::NewFamilyMember;
    use crate::storage::tests::register;

    fn setup() -> (Storage, String, String) {
        let storage = Storage::open_in_memory().unwrap();
        let user = register(&storage, "ada@example.com");
        let member = storage
            .create_member(
                &user.id,
                NewFamilyMember {
                    name: "Ingrid".to_string(),
                    is_public: true,
                    ..NewFamilyMember::default()
                },
            )
            .unwrap();
        (storage, user.id, member.id)
    }

    fn asthma() -> NewHealthCondition {
        NewHealthCondition {
            condition_name: "Asthma".to_string(),
            diagnosis_date: NaiveDate::from_ymd_opt(1950, 5, 1),
            notes: None,
        }
    }

    #[test]
    fn test_condition_crud() {
        let (storage, user_id, member_id) = setup();

        let created = storage.create_condition(&member_id, &user_id, asthma()).unwrap();
        assert_eq!(storage.get_condition(&created.id, &user_id).unwrap(), created);
        assert_eq!(
            storage.list_conditions(&member_id, &user_id).unwrap(),
            vec![created.clone()]
        );

        let patch: HealthConditionPatch = serde_json::from_str(r#"{"notes": "seasonal"}"#).unwrap();
        let updated = storage.update_condition(&created.id, &user_id, patch).unwrap();
        assert_eq!(updated.notes.as_deref(), Some("seasonal"));
        assert_eq!(storage.get_condition(&created.id, &user_id).unwrap(), updated);

        storage.delete_condition(&created.id, &user_id).unwrap();
        assert!(storage.get_condition(&created.id, &user_id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_identical_update_keeps_timestamp() {
        let (storage, user_id, member_id) = setup();
        let created = storage.create_condition(&member_id, &user_id, asthma()).unwrap();

        let patch: HealthConditionPatch =
            serde_json::from_str(r#"{"conditionName": "Asthma"}"#).unwrap();
        let same = storage.update_condition(&created.id, &user_id, patch).unwrap();
        assert_eq!(same, created);
    }

    #[test]
    fn test_blank_name_rejected() {
        let (storage, user_id, member_id) = setup();
        let err = storage
            .create_condition(
                &member_id,
                &user_id,
                NewHealthCondition {
                    condition_name: " ".to_string(),
                    ..asthma()
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_conditions_private_to_owner() {
        let (storage, user_id, member_id) = setup();
        let other = register(&storage, "bob@example.com");
        let created = storage.create_condition(&member_id, &user_id, asthma()).unwrap();

        assert!(storage.list_conditions(&member_id, &other.id).unwrap_err().is_not_found());
        assert!(storage.get_condition(&created.id, &other.id).unwrap_err().is_not_found());
        assert!(storage
            .create_condition(&member_id, &other.id, asthma())
            .unwrap_err()
            .is_not_found());
        assert!(storage.delete_condition(&created.id, &other.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_conditions_by_member() {
        let (storage, user_id, member_id) = setup();
        storage.create_condition(&member_id, &user_id, asthma()).unwrap();
        storage
            .create_condition(
                &member_id,
                &user_id,
                NewHealthCondition {
                    condition_name: "Gout".to_string(),
                    ..NewHealthCondition::default()
                },
            )
            .unwrap();

        let by_member = storage.conditions_by_member(&user_id).unwrap();
        assert_eq!(by_member.len(), 1);
        assert_eq!(by_member[&member_id].len(), 2);

        let other = register(&storage, "bob@example.com");
        assert!(storage.conditions_by_member(&other.id).unwrap().is_empty());
    }
}
