//! Who may trigger a sync.

use std::collections::HashSet;

/// Allow-lists of user ids and role ids. Both empty means anyone may run the command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    users: HashSet<String>,
    roles: HashSet<String>,
}

impl Roster {
    pub fn new<U, R>(users: U, roles: R) -> Self
    where
        U: IntoIterator,
        U::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            users: collect_ids(users),
            roles: collect_ids(roles),
        }
    }

    /// Builds a roster from two comma-separated lists, e.g. `"123,456"`.
    pub fn from_csv(users: &str, roles: &str) -> Self {
        Self::new(users.split(','), roles.split(','))
    }

    pub fn is_unrestricted(&self) -> bool {
        self.users.is_empty() && self.roles.is_empty()
    }

    pub fn users(&self) -> impl Iterator<Item = &str> {
        self.users.iter().map(String::as_str)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }

    pub fn permits<S: AsRef<str>>(&self, user_id: &str, role_ids: &[S]) -> bool {
        if self.is_unrestricted() {
            return true;
        }
        if self.users.contains(user_id) {
            return true;
        }
        role_ids
            .iter()
            .any(|role| self.roles.contains(role.as_ref()))
    }
}

fn collect_ids<I>(ids: I) -> HashSet<String>
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    ids.into_iter()
        .map(Into::into)
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}
