// Databases the cluster maintains for its own operation; never backed up.
pub const SYSTEM_DATABASES: &[&str] = &["admin", "local", "config"];

pub fn is_system_database(name: &str) -> bool {
    SYSTEM_DATABASES.contains(&name)
}

/// Drops system databases from a listing, keeping the cluster's order.
pub fn filter_system_databases<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    names
        .into_iter()
        .filter(|name| !is_system_database(name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_filters_exclusion_set() {
        let result = filter_system_databases(names(&["admin", "sales", "local", "users", "config"]));
        assert_eq!(result, names(&["sales", "users"]));
    }

    #[test]
    fn test_filter_independent_of_ordering() {
        let mut forward = filter_system_databases(names(&["config", "a", "admin", "b", "local"]));
        let mut reversed = filter_system_databases(names(&["local", "b", "admin", "a", "config"]));
        forward.sort();
        reversed.sort();
        assert_eq!(forward, reversed);
        assert_eq!(forward, names(&["a", "b"]));
    }

    #[test]
    fn test_similar_names_are_kept() {
        let result = filter_system_databases(names(&["admin_portal", "Local", "configs"]));
        assert_eq!(result, names(&["admin_portal", "Local", "configs"]));
    }

    #[test]
    fn test_only_system_databases_yields_empty() {
        assert!(filter_system_databases(names(&["admin", "local", "config"])).is_empty());
    }
}
