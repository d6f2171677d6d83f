//! Group store: role name → set of member user names.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::error::{StoreError, StoreResult};
use crate::store::record_store::Mutation;
use crate::store::{normalize_key, ConstraintChecker, RecordStore, ReplayPolicy, SharedChecker};

/// Record kind used in error messages and logs.
pub const GROUP_KIND: &str = "role";

/// Members of one role, sorted and deduplicated.
pub type MemberSet = BTreeSet<String>;

/// Normalize every member name into a set.
pub fn member_set<I, S>(members: I) -> MemberSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    members
        .into_iter()
        .map(|m| normalize_key(m.as_ref()))
        .collect()
}

/// Gate for role records: minimum lengths for the role name and for every
/// member name.
#[derive(Debug, Clone)]
pub struct MinNameLengths {
    min_role_len: usize,
    min_member_len: usize,
}

impl MinNameLengths {
    pub fn new(min_role_len: usize, min_member_len: usize) -> Self {
        Self {
            min_role_len,
            min_member_len,
        }
    }
}

impl ConstraintChecker<MemberSet> for MinNameLengths {
    fn check(&self, role: &str, members: &MemberSet) -> Result<(), String> {
        if role.chars().count() < self.min_role_len {
            return Err(format!("role name must have min {} chars", self.min_role_len));
        }
        match members
            .iter()
            .find(|m| m.chars().count() < self.min_member_len)
        {
            Some(short) => Err(format!(
                "user name must have min {} chars: {short}",
                self.min_member_len
            )),
            None => Ok(()),
        }
    }
}

/// Roles and their members, backed by an append log.
#[derive(Debug)]
pub struct GroupStore {
    records: RecordStore<MemberSet>,
}

impl GroupStore {
    pub fn in_memory() -> Self {
        Self {
            records: RecordStore::in_memory(GROUP_KIND),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        RecordStore::open(GROUP_KIND, path).map(|records| Self { records })
    }

    pub fn open_with(
        path: impl AsRef<Path>,
        gate: SharedChecker<MemberSet>,
        policy: ReplayPolicy,
    ) -> StoreResult<Self> {
        RecordStore::open_with(GROUP_KIND, path, gate, policy).map(|records| Self { records })
    }

    pub fn create_empty(path: impl AsRef<Path>) -> StoreResult<Self> {
        RecordStore::create_empty(GROUP_KIND, path).map(|records| Self { records })
    }

    pub fn set_constraint_gate(&self, gate: impl ConstraintChecker<MemberSet> + 'static) {
        self.records.set_constraint_gate(gate);
    }

    pub fn path(&self) -> Option<&Path> {
        self.records.path()
    }

    // ── Record API ──────────────────────────────────────────────────

    /// Create `role` with `members`. Member names are normalized.
    pub fn insert(&self, role: &str, members: MemberSet) -> StoreResult<()> {
        self.records.insert(role, member_set(members))
    }

    /// Replace the member set of an existing role.
    pub fn update(&self, role: &str, members: MemberSet) -> StoreResult<()> {
        self.records.update(role, member_set(members))
    }

    pub fn delete(&self, role: &str) -> StoreResult<()> {
        self.records.delete(role)
    }

    pub fn lookup(&self, role: &str) -> Option<MemberSet> {
        self.records.lookup(role)
    }

    /// Role names, sorted.
    pub fn list_keys(&self) -> Vec<String> {
        self.records.list_keys()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn save_file(&self) -> StoreResult<()> {
        self.records.save_file()
    }

    // ── Membership ──────────────────────────────────────────────────

    /// True iff `user` is a member of `role`. Unknown roles grant nothing.
    pub fn authorized(&self, role: &str, user: &str) -> bool {
        let user = normalize_key(user);
        self.records
            .with_value(role, |members| members.is_some_and(|m| m.contains(&user)))
    }

    /// Sorted members of `role`, or `None` if the role does not exist.
    pub fn list_members(&self, role: &str) -> Option<Vec<String>> {
        self.records
            .with_value(role, |members| members.map(|m| m.iter().cloned().collect()))
    }

    pub fn role_exists(&self, role: &str) -> bool {
        self.records.contains(role)
    }

    /// Every role with its members, sorted by role.
    pub fn list_roles_and_members(&self) -> BTreeMap<String, MemberSet> {
        self.records.snapshot()
    }

    /// Roles that list `user` as a member, sorted.
    pub fn roles_for(&self, user: &str) -> Vec<String> {
        let user = normalize_key(user);
        self.records
            .snapshot()
            .into_iter()
            .filter(|(_, members)| members.contains(&user))
            .map(|(role, _)| role)
            .collect()
    }

    /// Add `members` to `role`, creating the role if needed.
    ///
    /// A new role is logged as an insert, a grown one as an update. Adding
    /// only existing members writes nothing.
    pub fn add_members<I, S>(&self, role: &str, members: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let added = member_set(members);
        self.records.modify(role, |_, current| {
            Ok(match current {
                None => Mutation::Insert(added),
                Some(existing) if added.is_subset(existing) => Mutation::Unchanged,
                Some(existing) => Mutation::Update(existing.union(&added).cloned().collect()),
            })
        })
    }

    /// Remove `user` from `role`. Removing the last member deletes the role.
    pub fn remove_member(&self, role: &str, user: &str) -> StoreResult<()> {
        let user = normalize_key(user);
        self.records.modify(role, |role, current| {
            let Some(existing) = current else {
                return Err(StoreError::NotFound {
                    kind: GROUP_KIND,
                    key: role.to_string(),
                });
            };
            if !existing.contains(&user) {
                return Err(StoreError::NotFound {
                    kind: "member",
                    key: format!("{user} in {role}"),
                });
            }

            let mut remaining = existing.clone();
            remaining.remove(&user);
            Ok(if remaining.is_empty() {
                Mutation::Delete
            } else {
                Mutation::Update(remaining)
            })
        })
    }
}
