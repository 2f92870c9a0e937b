//! Hereditary health history.
//!
//! Collects the health conditions recorded on a member's blood relatives and
//! summarizes how often each condition occurs in the family.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use crate::model::{Gender, HealthCondition};
use crate::tree::{RelationKind, Relative};

/// Health history of one member's family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthHistory {
    /// The member the history was built for.
    pub family_member_id: String,
    /// Conditions recorded on the member itself.
    pub own_conditions: Vec<HealthCondition>,
    /// Relatives with at least one recorded condition, closest first.
    pub relatives: Vec<RelativeConditions>,
    /// Per-condition occurrence counts across relatives.
    pub summary: Vec<ConditionSummary>,
}

/// Conditions of one relative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelativeConditions {
    /// Relative's member id.
    pub family_member_id: String,
    /// Relative's display name.
    pub name: String,
    /// Relative's gender.
    pub gender: Gender,
    /// Relationship label.
    pub relation: String,
    /// Relationship kind.
    pub kind: RelationKind,
    /// Generation offset.
    pub generation: i32,
    /// Degree of relationship.
    pub degree: u32,
    /// Recorded conditions.
    pub conditions: Vec<HealthCondition>,
}

/// How often a condition occurs among relatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionSummary {
    /// Condition name as first recorded.
    pub condition_name: String,
    /// Number of distinct relatives carrying the condition.
    pub relatives: usize,
    /// Number of first-degree relatives carrying it.
    pub first_degree_relatives: usize,
    /// Closest degree at which the condition occurs.
    pub closest_degree: u32,
}

/// Grouping key for condition names.
fn condition_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Build the health history of `family_member_id`.
///
/// `conditions` maps member ids to their recorded conditions; members absent
/// from the map have none.
#[must_use]
pub fn build_history(
    family_member_id: &str,
    relatives: Vec<Relative>,
    conditions: &HashMap<String, Vec<HealthCondition>>,
) -> HealthHistory {
    let own_conditions = conditions
        .get(family_member_id)
        .cloned()
        .unwrap_or_default();

    let mut with_conditions: Vec<RelativeConditions> = relatives
        .into_iter()
        .filter_map(|relative| {
            let found = conditions.get(&relative.member.id)?;
            if found.is_empty() {
                return None;
            }
            Some(RelativeConditions {
                name: relative.member.full_name(),
                family_member_id: relative.member.id,
                gender: relative.member.gender,
                relation: relative.relation,
                kind: relative.kind,
                generation: relative.generation,
                degree: relative.degree,
                conditions: found.clone(),
            })
        })
        .collect();
    with_conditions.sort_by(|a, b| {
        a.degree
            .cmp(&b.degree)
            .then_with(|| b.generation.cmp(&a.generation))
            .then_with(|| a.name.cmp(&b.name))
    });

    HealthHistory {
        family_member_id: family_member_id.to_string(),
        own_conditions,
        summary: summarize(&with_conditions),
        relatives: with_conditions,
    }
}

fn summarize(relatives: &[RelativeConditions]) -> Vec<ConditionSummary> {
    struct Tally<'a> {
        display: &'a str,
        carriers: HashSet<&'a str>,
        first_degree: HashSet<&'a str>,
        closest: u32,
    }

    let mut tallies: BTreeMap<String, Tally<'_>> = BTreeMap::new();
    for relative in relatives {
        for condition in &relative.conditions {
            let tally = tallies
                .entry(condition_key(&condition.condition_name))
                .or_insert_with(|| Tally {
                    display: condition.condition_name.as_str(),
                    carriers: HashSet::new(),
                    first_degree: HashSet::new(),
                    closest: relative.degree,
                });
            tally.carriers.insert(relative.family_member_id.as_str());
            if relative.degree == 1 {
                tally.first_degree.insert(relative.family_member_id.as_str());
            }
            tally.closest = tally.closest.min(relative.degree);
        }
    }

    let mut summary: Vec<ConditionSummary> = tallies
        .into_values()
        .map(|tally| ConditionSummary {
            condition_name: tally.display.to_string(),
            relatives: tally.carriers.len(),
            first_degree_relatives: tally.first_degree.len(),
            closest_degree: tally.closest,
        })
        .collect();
    summary.sort_by(|a, b| {
        b.relatives
            .cmp(&a.relatives)
            .then_with(|| a.closest_degree.cmp(&b.closest_degree))
            .then_with(|| a.condition_name.cmp(&b.condition_name))
    });
    summary
}
