//! Family member storage.
//!
//! Every write validates the record's own fields and its parent/partner
//! references against the owner's other members. Cycle detection uses a
//! [`FamilyIndex`] built from the stored tree.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};

use super::{format_timestamp, now, parse_date, parse_timestamp, Storage};
use crate::error::{Error, Result};
use crate::model::{new_id, FamilyMember, FamilyMemberPatch, Gender, NewFamilyMember};
use crate::tree::FamilyIndex;

const MEMBER_COLUMNS: &str = "id, user_id, name, surname, gender, status, birth_date, death_date, \
     father_id, mother_id, partner_id, occupation, country, photo_url, is_public, created_at, updated_at";

const MEMBER_ORDER: &str = "ORDER BY surname, name, created_at, id";

/// Which link of a member points at another member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Father,
    Mother,
    Partner,
}

impl Link {
    fn field(self) -> &'static str {
        match self {
            Self::Father => "fatherId",
            Self::Mother => "motherId",
            Self::Partner => "partnerId",
        }
    }
}

fn date_text(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format("%Y-%m-%d").to_string())
}

impl Storage {
    /// Create a family member owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the record is invalid or references a
    /// member the user does not own.
    pub fn create_member(&self, user_id: &str, new_member: NewFamilyMember) -> Result<FamilyMember> {
        let member = new_member.into_member(new_id(), user_id.to_string(), now());
        member.check_fields()?;
        self.check_references(&member)?;

        self.conn.execute(
            &format!(
                "INSERT INTO family_members ({MEMBER_COLUMNS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
            ),
            params![
                member.id,
                member.user_id,
                member.name,
                member.surname,
                member.gender.to_string(),
                member.status.to_string(),
                date_text(member.birth_date),
                date_text(member.death_date),
                member.father_id,
                member.mother_id,
                member.partner_id,
                member.occupation,
                member.country,
                member.photo_url,
                member.is_public,
                format_timestamp(member.created_at),
                format_timestamp(member.updated_at),
            ],
        )?;

        info!("Created family member {} for user {user_id}", member.id);
        Ok(member)
    }

    /// Get a member by id regardless of owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn get_member(&self, id: &str) -> Result<Option<FamilyMember>> {
        let member = self
            .conn
            .query_row(
                &format!("SELECT {MEMBER_COLUMNS} FROM family_members WHERE id = ?1"),
                [id],
                Self::row_to_member,
            )
            .optional()?;
        Ok(member)
    }

    /// Get a member the viewer may read: their own, or a public one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the member is missing or private to
    /// another user.
    pub fn get_visible_member(&self, id: &str, viewer_id: &str) -> Result<FamilyMember> {
        self.get_member(id)?
            .filter(|m| m.user_id == viewer_id || m.is_public)
            .ok_or_else(|| Error::not_found("family member", id))
    }

    /// Get a member owned by `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the member is missing or owned by
    /// another user.
    pub fn get_owned_member(&self, id: &str, owner_id: &str) -> Result<FamilyMember> {
        self.get_member(id)?
            .filter(|m| m.user_id == owner_id)
            .ok_or_else(|| Error::not_found("family member", id))
    }

    fn query_members(&self, filter: &str, params: impl rusqlite::Params) -> Result<Vec<FamilyMember>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {MEMBER_COLUMNS} FROM family_members WHERE {filter} {MEMBER_ORDER}"
        ))?;
        let members = stmt
            .query_map(params, Self::row_to_member)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(members)
    }

    /// List all members owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_members(&self, user_id: &str) -> Result<Vec<FamilyMember>> {
        self.query_members("user_id = ?1", [user_id])
    }

    /// List the public members owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn list_public_members(&self, user_id: &str) -> Result<Vec<FamilyMember>> {
        self.query_members("user_id = ?1 AND is_public = 1", [user_id])
    }

    /// Public members of every user except `exclude_user_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn public_candidates(&self, exclude_user_id: &str) -> Result<Vec<FamilyMember>> {
        self.query_members("user_id != ?1 AND is_public = 1", [exclude_user_id])
    }

    /// Build the tree index of a user's members.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn family_index(&self, user_id: &str) -> Result<FamilyIndex> {
        Ok(FamilyIndex::new(self.list_members(user_id)?))
    }

    /// Apply a partial update to a member owned by `owner_id`.
    ///
    /// A patch that changes nothing is not written and keeps `updatedAt`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for members the owner cannot modify, a
    /// validation error for invalid results, or [`Error::CycleDetected`].
    pub fn update_member(
        &self,
        id: &str,
        owner_id: &str,
        patch: FamilyMemberPatch,
    ) -> Result<FamilyMember> {
        let current = self.get_owned_member(id, owner_id)?;
        let mut member = current.clone();
        if !patch.apply(&mut member) {
            debug!("Update of family member {id} changed nothing");
            return Ok(current);
        }

        member.check_fields()?;
        self.check_references(&member)?;
        if member.gender != current.gender {
            self.check_parent_roles(&member)?;
        }
        member.updated_at = now();

        self.conn.execute(
            r"
            UPDATE family_members SET
                name = ?2, surname = ?3, gender = ?4, status = ?5, birth_date = ?6,
                death_date = ?7, father_id = ?8, mother_id = ?9, partner_id = ?10,
                occupation = ?11, country = ?12, photo_url = ?13, is_public = ?14,
                updated_at = ?15
            WHERE id = ?1
            ",
            params![
                member.id,
                member.name,
                member.surname,
                member.gender.to_string(),
                member.status.to_string(),
                date_text(member.birth_date),
                date_text(member.death_date),
                member.father_id,
                member.mother_id,
                member.partner_id,
                member.occupation,
                member.country,
                member.photo_url,
                member.is_public,
                format_timestamp(member.updated_at),
            ],
        )?;

        info!("Updated family member {id}");
        Ok(member)
    }

    /// Delete a member owned by `owner_id`.
    ///
    /// Links to it from the owner's other members are cleared and its health
    /// conditions removed, all in one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the owner has no such member.
    pub fn delete_member(&self, id: &str, owner_id: &str) -> Result<()> {
        self.get_owned_member(id, owner_id)?;
        let cleared_at = format_timestamp(now());

        let tx = self.conn.unchecked_transaction()?;
        let mut cleared = 0;
        for column in ["father_id", "mother_id", "partner_id"] {
            cleared += tx.execute(
                &format!(
                    "UPDATE family_members SET {column} = NULL, updated_at = ?3 \
                     WHERE {column} = ?1 AND user_id = ?2"
                ),
                params![id, owner_id, cleared_at],
            )?;
        }
        let conditions = tx.execute(
            "DELETE FROM health_conditions WHERE family_member_id = ?1",
            [id],
        )?;
        tx.execute("DELETE FROM family_members WHERE id = ?1", [id])?;
        tx.commit()?;

        info!(
            "Deleted family member {id} ({cleared} links cleared, {conditions} conditions removed)"
        );
        Ok(())
    }

    /// Validate the parent and partner links of `member`.
    fn check_references(&self, member: &FamilyMember) -> Result<()> {
        let links = [
            (Link::Father, member.father_id.as_deref()),
            (Link::Mother, member.mother_id.as_deref()),
            (Link::Partner, member.partner_id.as_deref()),
        ];

        for (link, target) in links {
            let Some(target) = target else { continue };
            let referenced = self
                .get_member(target)?
                .filter(|m| m.user_id == member.user_id)
                .ok_or_else(|| {
                    Error::validation(format!(
                        "{} references unknown family member {target}",
                        link.field()
                    ))
                })?;

            match (link, referenced.gender) {
                (Link::Father, Gender::Female) => {
                    return Err(Error::validation("fatherId must not reference a female member"));
                }
                (Link::Mother, Gender::Male) => {
                    return Err(Error::validation("motherId must not reference a male member"));
                }
                _ => {}
            }
        }

        if member.parent_ids().next().is_some() {
            let index = self.family_index(&member.user_id)?;
            if let Some(parent) = member
                .parent_ids()
                .find(|parent| index.would_create_cycle(&member.id, parent))
            {
                return Err(Error::CycleDetected {
                    member: member.id.clone(),
                    parent: parent.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Reject a gender change that contradicts the member's role as a parent.
    fn check_parent_roles(&self, member: &FamilyMember) -> Result<()> {
        let column = match member.gender {
            Gender::Female => "father_id",
            Gender::Male => "mother_id",
            Gender::Other | Gender::Unknown => return Ok(()),
        };
        let children: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM family_members WHERE {column} = ?1"),
            [&member.id],
            |row| row.get(0),
        )?;
        if children > 0 {
            return Err(Error::validation(format!(
                "gender {} conflicts with the member being recorded as a {}",
                member.gender,
                if column == "father_id" { "father" } else { "mother" }
            )));
        }
        Ok(())
    }

    fn row_to_member(row: &rusqlite::Row) -> rusqlite::Result<FamilyMember> {
        let gender: String = row.get(4)?;
        let status: String = row.get(5)?;
        let created_at: String = row.get(15)?;
        let updated_at: String = row.get(16)?;

        Ok(FamilyMember {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            surname: row.get(3)?,
            gender: gender.parse().unwrap_or_default(),
            status: status.parse().unwrap_or_default(),
            birth_date: parse_date(6, row.get(6)?)?,
            death_date: parse_date(7, row.get(7)?)?,
            father_id: row.get(8)?,
            mother_id: row.get(9)?,
            partner_id: row.get(10)?,
            occupation: row.get(11)?,
            country: row.get(12)?,
            photo_url: row.get(13)?,
            is_public: row.get(14)?,
            created_at: parse_timestamp(15, &created_at)?,
            updated_at: parse_timestamp(16, &updated_at)?,
        })
    }
}
