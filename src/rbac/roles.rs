use indexmap::IndexSet;

/// Set of role names known to the system.
///
/// Only ever replaced wholesale; insertion order of first occurrence is kept so
/// `roles()` is stable for logs and the "authorized" expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleRegistry {
    roles: IndexSet<String>,
}

impl RoleRegistry {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_registered(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.roles.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_collapse_keeping_first_occurrence() {
        let registry = RoleRegistry::new(["user", "admin", "user", "admin", "guest"]);

        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.iter().collect::<Vec<_>>(),
            vec!["user", "admin", "guest"]
        );
    }

    #[test]
    fn rebuilding_from_same_input_is_stable() {
        let input = vec!["admin", "user", "admin"];
        let first = RoleRegistry::new(input.clone());
        let second = RoleRegistry::new(input);

        assert_eq!(first, second);
        assert!(second.is_registered("admin"));
        assert!(!second.is_registered("root"));
    }

    #[test]
    fn empty_by_default() {
        let registry = RoleRegistry::default();
        assert!(registry.is_empty());
        assert!(!registry.is_registered(""));
    }
}
