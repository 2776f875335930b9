use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct Pod {
    pub name: String,
    pub created_at: i64,
}

impl From<infra::table::pods::PodRecord> for Pod {
    fn from(r: infra::table::pods::PodRecord) -> Self {
        Self {
            name: r.name,
            created_at: r.created_at,
        }
    }
}

/// DNS-label rules from spec.md §3: lowercase, alphanumeric + hyphen,
/// 1-63 chars, must start with a letter.
pub fn is_valid_pod_name(name: &str) -> bool {
    let max_len = config::get_config().limits.max_pod_name_len;
    if name.is_empty() || name.len() > max_len {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return false,
    }
    name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        assert!(is_valid_pod_name("alice"));
        assert!(is_valid_pod_name("alice-blog"));
        assert!(is_valid_pod_name("a1"));
    }

    #[test]
    fn invalid_names() {
        assert!(!is_valid_pod_name(""));
        assert!(!is_valid_pod_name("1alice"));
        assert!(!is_valid_pod_name("-alice"));
        assert!(!is_valid_pod_name("Alice"));
        assert!(!is_valid_pod_name("alice_blog"));
        assert!(!is_valid_pod_name(&"a".repeat(64)));
    }
}
