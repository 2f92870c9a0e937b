//! Family tree construction from flat member records.
//!
//! Members reference their parents by id. [`FamilyIndex`] inverts those links
//! once so that ancestors, descendants, blood relatives and the chart layout
//! for the rendering widget can all be produced without further queries.
//!
//! Every walk tracks the nodes on its current path, so malformed stored data
//! (a parent loop written before validation existed) terminates instead of
//! recursing forever.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::model::{FamilyMember, Gender};

/// Index over one user's members.
#[derive(Debug, Clone, Default)]
pub struct FamilyIndex {
    members: HashMap<String, FamilyMember>,
    children: HashMap<String, Vec<String>>,
    partners: HashMap<String, BTreeSet<String>>,
}

/// A member with its pedigree, as nested father/mother links.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AncestorNode {
    /// The member at this position.
    pub member: FamilyMember,
    /// Father's subtree, if recorded and within depth.
    pub father: Option<Box<AncestorNode>>,
    /// Mother's subtree, if recorded and within depth.
    pub mother: Option<Box<AncestorNode>>,
}

/// A member with its descendants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescendantNode {
    /// The member at this position.
    pub member: FamilyMember,
    /// Recorded partner.
    pub partner: Option<FamilyMember>,
    /// Children, oldest first.
    pub children: Vec<DescendantNode>,
}

/// How a relative is connected to the root member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationKind {
    /// Parent, grandparent, ...
    Ancestor,
    /// Child, grandchild, ...
    Descendant,
    /// Shares both recorded parents.
    Sibling,
    /// Shares exactly one parent.
    HalfSibling,
    /// Sibling of a parent.
    ParentSibling,
    /// Child of a sibling.
    SiblingChild,
    /// Child of a parent's sibling.
    Cousin,
}

/// A blood relative of a root member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Relative {
    /// The relative.
    pub member: FamilyMember,
    /// Kind of relationship.
    pub kind: RelationKind,
    /// Human label such as "grandmother" or "half-brother".
    pub relation: String,
    /// Generation offset: parents +1, children -1, siblings 0.
    pub generation: i32,
    /// Degree of relationship (1 = parent, sibling or child).
    pub degree: u32,
}

/// One entry of the flat layout consumed by the tree rendering widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartNode {
    /// Member id.
    pub id: String,
    /// Display data.
    pub data: ChartData,
    /// Relationship ids.
    pub rels: ChartRels,
}

/// Display fields of a chart node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    /// Given name.
    pub name: String,
    /// Family name.
    pub surname: String,
    /// Gender.
    pub gender: Gender,
    /// Birth date as `YYYY-MM-DD`.
    pub birth_date: Option<String>,
    /// Death date as `YYYY-MM-DD`.
    pub death_date: Option<String>,
    /// Portrait URL.
    pub photo_url: Option<String>,
    /// Visible to other users.
    pub is_public: bool,
}

/// Relationship ids of a chart node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRels {
    /// Father id, if present in the tree.
    pub father: Option<String>,
    /// Mother id, if present in the tree.
    pub mother: Option<String>,
    /// Partner ids.
    pub spouses: Vec<String>,
    /// Children ids, oldest first.
    pub children: Vec<String>,
}

impl FamilyIndex {
    /// Build the index from a flat list of members.
    ///
    /// Links pointing at members outside the list are ignored.
    #[must_use]
    pub fn new(members: impl IntoIterator<Item = FamilyMember>) -> Self {
        let members: HashMap<String, FamilyMember> =
            members.into_iter().map(|m| (m.id.clone(), m)).collect();

        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        let mut partners: HashMap<String, BTreeSet<String>> = HashMap::new();

        for member in members.values() {
            let mut parents: Vec<&str> = member.parent_ids().collect();
            parents.dedup();
            for parent in parents {
                if members.contains_key(parent) {
                    children
                        .entry(parent.to_string())
                        .or_default()
                        .push(member.id.clone());
                }
            }
            if let Some(partner) = member.partner_id.as_deref() {
                if members.contains_key(partner) && partner != member.id {
                    partners
                        .entry(member.id.clone())
                        .or_default()
                        .insert(partner.to_string());
                    partners
                        .entry(partner.to_string())
                        .or_default()
                        .insert(member.id.clone());
                }
            }
        }

        for ids in children.values_mut() {
            ids.sort_by(|a, b| birth_order(&members[a], &members[b]));
        }

        Self {
            members,
            children,
            partners,
        }
    }

    /// Number of indexed members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Look up a member.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&FamilyMember> {
        self.members.get(id)
    }

    /// Direct children of a member, oldest first.
    pub fn children_of(&self, id: &str) -> impl Iterator<Item = &FamilyMember> {
        self.children
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|child| self.members.get(child))
    }

    /// Partners of a member, in id order.
    pub fn partners_of(&self, id: &str) -> impl Iterator<Item = &FamilyMember> {
        self.partners
            .get(id)
            .into_iter()
            .flatten()
            .filter_map(|partner| self.members.get(partner))
    }

    fn father_of(&self, member: &FamilyMember) -> Option<&FamilyMember> {
        member.father_id.as_deref().and_then(|id| self.members.get(id))
    }

    fn mother_of(&self, member: &FamilyMember) -> Option<&FamilyMember> {
        member.mother_id.as_deref().and_then(|id| self.members.get(id))
    }

    /// Build the pedigree of `root`, walking at most `depth` generations up.
    #[must_use]
    pub fn ancestors(&self, root: &str, depth: usize) -> Option<AncestorNode> {
        let member = self.members.get(root)?;
        let mut path = HashSet::new();
        Some(self.ancestor_node(member, depth, &mut path))
    }

    fn ancestor_node<'a>(
        &'a self,
        member: &'a FamilyMember,
        depth: usize,
        path: &mut HashSet<&'a str>,
    ) -> AncestorNode {
        path.insert(member.id.as_str());

        let mut branch = |parent: Option<&'a FamilyMember>| {
            parent
                .filter(|p| depth > 0 && !path.contains(p.id.as_str()))
                .map(|p| Box::new(self.ancestor_node(p, depth - 1, path)))
        };
        let father = branch(self.father_of(member));
        let mother = branch(self.mother_of(member));

        path.remove(member.id.as_str());
        AncestorNode {
            member: member.clone(),
            father,
            mother,
        }
    }

    /// Build the descendant tree of `root`, walking at most `depth` generations down.
    #[must_use]
    pub fn descendants(&self, root: &str, depth: usize) -> Option<DescendantNode> {
        let member = self.members.get(root)?;
        let mut path = HashSet::new();
        Some(self.descendant_node(member, depth, &mut path))
    }

    fn descendant_node<'a>(
        &'a self,
        member: &'a FamilyMember,
        depth: usize,
        path: &mut HashSet<&'a str>,
    ) -> DescendantNode {
        path.insert(member.id.as_str());

        let mut children = Vec::new();
        if depth > 0 {
            for child in self.children_of(&member.id) {
                if !path.contains(child.id.as_str()) {
                    children.push(self.descendant_node(child, depth - 1, path));
                }
            }
        }

        path.remove(member.id.as_str());
        DescendantNode {
            member: member.clone(),
            partner: self.partners_of(&member.id).next().cloned(),
            children,
        }
    }

    /// Ids of every descendant of `root` (excluding `root` itself).
    #[must_use]
    pub fn descendant_ids(&self, root: &str) -> HashSet<&str> {
        let mut seen = HashSet::new();
        let mut queue: VecDeque<&str> = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            for child in self.children_of(id) {
                if child.id != root && seen.insert(child.id.as_str()) {
                    queue.push_back(child.id.as_str());
                }
            }
        }
        seen
    }

    /// Whether making `candidate_parent` a parent of `member` would create a cycle.
    #[must_use]
    pub fn would_create_cycle(&self, member: &str, candidate_parent: &str) -> bool {
        member == candidate_parent || self.descendant_ids(member).contains(candidate_parent)
    }

    /// Ancestors of `root` with their generation distance, nearest first.
    fn ancestors_with_generation(&self, root: &FamilyMember) -> Vec<(&FamilyMember, i32)> {
        let mut found = Vec::new();
        let mut seen: HashSet<&str> = HashSet::from([root.id.as_str()]);
        let mut queue: VecDeque<(&FamilyMember, i32)> = VecDeque::from([(root, 0)]);

        while let Some((member, generation)) = queue.pop_front() {
            for parent in [self.father_of(member), self.mother_of(member)]
                .into_iter()
                .flatten()
            {
                if seen.insert(parent.id.as_str()) {
                    found.push((parent, generation + 1));
                    queue.push_back((parent, generation + 1));
                }
            }
        }
        found
    }

    /// Descendants of `root` with their (negative) generation offset, nearest first.
    fn descendants_with_generation(&self, root: &FamilyMember) -> Vec<(&FamilyMember, i32)> {
        let mut found = Vec::new();
        let mut seen: HashSet<&str> = HashSet::from([root.id.as_str()]);
        let mut queue: VecDeque<(&FamilyMember, i32)> = VecDeque::from([(root, 0)]);

        while let Some((member, generation)) = queue.pop_front() {
            for child in self.children_of(&member.id) {
                if seen.insert(child.id.as_str()) {
                    found.push((child, generation - 1));
                    queue.push_back((child, generation - 1));
                }
            }
        }
        found
    }

    /// Members sharing at least one parent with `member`, with the sibling kind.
    fn siblings_of(&self, member: &FamilyMember) -> Vec<(&FamilyMember, RelationKind)> {
        let mut candidates: BTreeSet<&str> = BTreeSet::new();
        for parent in member.parent_ids() {
            for child in self.children_of(parent) {
                if child.id != member.id {
                    candidates.insert(child.id.as_str());
                }
            }
        }

        let mut siblings: Vec<(&FamilyMember, RelationKind)> = candidates
            .into_iter()
            .filter_map(|id| self.members.get(id))
            .map(|sibling| (sibling, sibling_kind(member, sibling)))
            .collect();
        siblings.sort_by(|a, b| birth_order(a.0, b.0));
        siblings
    }

    /// Every blood relative of `root` reachable through recorded parent links.
    ///
    /// Each relative appears once, under the closest relationship found.
    /// Returns an empty list when `root` is unknown.
    #[must_use]
    pub fn relatives(&self, root: &str) -> Vec<Relative> {
        let Some(root) = self.members.get(root) else {
            return Vec::new();
        };

        let mut seen: HashSet<String> = HashSet::from([root.id.clone()]);
        let mut relatives = Vec::new();
        let mut push = |member: &FamilyMember, kind: RelationKind, generation: i32| {
            if seen.insert(member.id.clone()) {
                relatives.push(Relative {
                    member: member.clone(),
                    kind,
                    relation: relation_label(kind, generation, member.gender),
                    generation,
                    degree: relation_degree(kind, generation),
                });
            }
        };

        for (ancestor, generation) in self.ancestors_with_generation(root) {
            push(ancestor, RelationKind::Ancestor, generation);
        }
        for (descendant, generation) in self.descendants_with_generation(root) {
            push(descendant, RelationKind::Descendant, generation);
        }

        let siblings = self.siblings_of(root);
        for (sibling, kind) in &siblings {
            push(*sibling, *kind, 0);
        }

        let parents: Vec<&FamilyMember> = [self.father_of(root), self.mother_of(root)]
            .into_iter()
            .flatten()
            .collect();
        let mut parent_siblings = Vec::new();
        for parent in &parents {
            for (aunt_or_uncle, _) in self.siblings_of(parent) {
                push(aunt_or_uncle, RelationKind::ParentSibling, 1);
                parent_siblings.push(aunt_or_uncle);
            }
        }

        for (sibling, _) in &siblings {
            for child in self.children_of(&sibling.id) {
                push(child, RelationKind::SiblingChild, -1);
            }
        }

        for aunt_or_uncle in parent_siblings {
            for cousin in self.children_of(&aunt_or_uncle.id) {
                push(cousin, RelationKind::Cousin, 0);
            }
        }

        relatives
    }

    /// Flat node list for the tree rendering widget, ordered by birth.
    #[must_use]
    pub fn chart(&self) -> Vec<ChartNode> {
        let mut members: Vec<&FamilyMember> = self.members.values().collect();
        members.sort_by(|a, b| birth_order(a, b));

        members
            .into_iter()
            .map(|member| ChartNode {
                id: member.id.clone(),
                data: ChartData {
                    name: member.name.clone(),
                    surname: member.surname.clone(),
                    gender: member.gender,
                    birth_date: member.birth_date.map(|d| d.to_string()),
                    death_date: member.death_date.map(|d| d.to_string()),
                    photo_url: member.photo_url.clone(),
                    is_public: member.is_public,
                },
                rels: ChartRels {
                    father: self.father_of(member).map(|m| m.id.clone()),
                    mother: self.mother_of(member).map(|m| m.id.clone()),
                    spouses: self
                        .partners_of(&member.id)
                        .map(|m| m.id.clone())
                        .collect(),
                    children: self.children_of(&member.id).map(|m| m.id.clone()).collect(),
                },
            })
            .collect()
    }
}

/// Order members by birth date (unknown last), then name, then id.
fn birth_order(a: &FamilyMember, b: &FamilyMember) -> Ordering {
    match (a.birth_date, b.birth_date) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.name.cmp(&b.name))
    .then_with(|| a.id.cmp(&b.id))
}

fn sibling_kind(member: &FamilyMember, other: &FamilyMember) -> RelationKind {
    let differs = |x: &Option<String>, y: &Option<String>| match (x, y) {
        (Some(x), Some(y)) => x != y,
        _ => false,
    };
    if differs(&member.father_id, &other.father_id) || differs(&member.mother_id, &other.mother_id)
    {
        RelationKind::HalfSibling
    } else {
        RelationKind::Sibling
    }
}

fn relation_degree(kind: RelationKind, generation: i32) -> u32 {
    match kind {
        RelationKind::Ancestor | RelationKind::Descendant => generation.unsigned_abs(),
        RelationKind::Sibling => 1,
        RelationKind::HalfSibling | RelationKind::ParentSibling | RelationKind::SiblingChild => 2,
        RelationKind::Cousin => 3,
    }
}

fn gendered(gender: Gender, male: &str, female: &str, neutral: &str) -> String {
    match gender {
        Gender::Male => male,
        Gender::Female => female,
        Gender::Other | Gender::Unknown => neutral,
    }
    .to_string()
}

/// Human-readable relationship label, e.g. "great-grandmother".
#[must_use]
pub fn relation_label(kind: RelationKind, generation: i32, gender: Gender) -> String {
    match kind {
        RelationKind::Ancestor | RelationKind::Descendant => {
            let base = if kind == RelationKind::Ancestor {
                gendered(gender, "father", "mother", "parent")
            } else {
                gendered(gender, "son", "daughter", "child")
            };
            match generation.unsigned_abs() {
                0 | 1 => base,
                n => format!("{}grand{base}", "great-".repeat((n - 2) as usize)),
            }
        }
        RelationKind::Sibling => gendered(gender, "brother", "sister", "sibling"),
        RelationKind::HalfSibling => {
            format!("half-{}", gendered(gender, "brother", "sister", "sibling"))
        }
        RelationKind::ParentSibling => gendered(gender, "uncle", "aunt", "parent's sibling"),
        RelationKind::SiblingChild => gendered(gender, "nephew", "niece", "sibling's child"),
        RelationKind::Cousin => "cousin".to_string(),
    }
}
