//! Relative suggestions.
//!
//! Matches one of a user's members against public members of other users'
//! trees, so the user can discover people who are plausibly the same person.

use chrono::Datelike;
use serde::Serialize;

use crate::config::SuggestionConfig;
use crate::model::FamilyMember;

/// Points awarded for each matching attribute.
const SURNAME_POINTS: u32 = 3;
const NAME_POINTS: u32 = 2;
const BIRTH_YEAR_POINTS: u32 = 2;
const NEAR_BIRTH_YEAR_POINTS: u32 = 1;
const COUNTRY_POINTS: u32 = 1;
const GENDER_POINTS: u32 = 1;

/// Birth years at most this far apart count as a near match.
const NEAR_BIRTH_YEAR_SPAN: i32 = 2;

/// A candidate match for a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    /// The matching public member.
    pub member: FamilyMember,
    /// Total score.
    pub score: u32,
    /// Attributes that matched.
    pub reasons: Vec<&'static str>,
}

fn same_text(a: &str, b: &str) -> bool {
    let a = a.trim();
    !a.is_empty() && a.to_lowercase() == b.trim().to_lowercase()
}

/// Score how likely `candidate` is the same person as `member`.
#[must_use]
pub fn score(member: &FamilyMember, candidate: &FamilyMember) -> (u32, Vec<&'static str>) {
    let mut total = 0;
    let mut reasons = Vec::new();

    if same_text(&member.surname, &candidate.surname) {
        total += SURNAME_POINTS;
        reasons.push("surname");
    }
    if same_text(&member.name, &candidate.name) {
        total += NAME_POINTS;
        reasons.push("name");
    }
    if let (Some(a), Some(b)) = (member.birth_date, candidate.birth_date) {
        let gap = (a.year() - b.year()).abs();
        if gap == 0 {
            total += BIRTH_YEAR_POINTS;
            reasons.push("birthYear");
        } else if gap <= NEAR_BIRTH_YEAR_SPAN {
            total += NEAR_BIRTH_YEAR_POINTS;
            reasons.push("nearBirthYear");
        }
    }
    if let (Some(a), Some(b)) = (&member.country, &candidate.country) {
        if same_text(a, b) {
            total += COUNTRY_POINTS;
            reasons.push("country");
        }
    }
    if member.gender.is_known() && member.gender == candidate.gender {
        total += GENDER_POINTS;
        reasons.push("gender");
    }

    (total, reasons)
}

/// Rank candidates for `member`.
///
/// Candidates owned by the member's own user or not marked public are never
/// suggested.
#[must_use]
pub fn suggest(
    member: &FamilyMember,
    candidates: impl IntoIterator<Item = FamilyMember>,
    config: &SuggestionConfig,
) -> Vec<Suggestion> {
    let mut suggestions: Vec<Suggestion> = candidates
        .into_iter()
        .filter(|c| c.is_public && c.user_id != member.user_id)
        .filter_map(|candidate| {
            let (score, reasons) = score(member, &candidate);
            (score >= config.min_score).then_some(Suggestion {
                member: candidate,
                score,
                reasons,
            })
        })
        .collect();

    suggestions.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.member.surname.cmp(&b.member.surname))
            .then_with(|| a.member.name.cmp(&b.member.name))
            .then_with(|| a.member.id.cmp(&b.member.id))
    });
    suggestions.truncate(config.max_results);
    suggestions
}
