//! Logical ID allocation.
//!
//! A logical ID is derived from the construct path of a resource relative to
//! its stack. The human-readable part keeps the alphanumeric characters of the
//! path components; the suffix is the first eight upper-case hex digits of the
//! MD5 of the `/`-joined path, so two paths that read the same still get
//! distinct IDs. Renaming a construct changes the ID, which the provisioning
//! engine treats as a replacement.

/// Component that is dropped from both the hash and the human part.
const HIDDEN_ID: &str = "Default";

/// Component that is kept in the hash but hidden from the human part.
const HIDDEN_FROM_HUMAN_ID: &str = "Resource";

const PATH_SEP: &str = "/";
const HASH_LEN: usize = 8;
const MAX_HUMAN_LEN: usize = 240;
const MAX_ID_LEN: usize = 255;

/// Compute the logical ID for a construct path.
///
/// Returns `None` for an empty path (after `Default` components are dropped).
pub fn make_unique_id<S: AsRef<str>>(components: &[S]) -> Option<String> {
    let components: Vec<&str> = components
        .iter()
        .map(AsRef::as_ref)
        .filter(|c| *c != HIDDEN_ID)
        .collect();

    if components.is_empty() {
        return None;
    }

    if components.len() == 1 {
        let top_level = remove_non_alphanumeric(components[0]);
        if top_level.len() <= MAX_ID_LEN {
            return Some(top_level);
        }
    }

    let hash = path_hash(&components);
    let mut human: String = remove_dupes(&components)
        .into_iter()
        .filter(|c| *c != HIDDEN_FROM_HUMAN_ID)
        .map(remove_non_alphanumeric)
        .collect();
    human.truncate(MAX_HUMAN_LEN);

    Some(human + &hash)
}

fn path_hash(components: &[&str]) -> String {
    let digest = md5::compute(components.join(PATH_SEP).as_bytes());
    let hex = format!("{:x}", digest);
    hex[..HASH_LEN].to_uppercase()
}

/// Drop a component when the previous kept one already ends with it
/// (`Bucket/Bucket` reads as `Bucket`).
fn remove_dupes<'a>(components: &[&'a str]) -> Vec<&'a str> {
    let mut kept: Vec<&'a str> = Vec::with_capacity(components.len());
    for &component in components {
        match kept.last() {
            Some(last) if last.ends_with(component) => {}
            _ => kept.push(component),
        }
    }
    kept
}

fn remove_non_alphanumeric(s: &str) -> String {
    s.chars().filter(char::is_ascii_alphanumeric).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_component_is_bare() {
        assert_eq!(
            make_unique_id(&["efs-root-access-instance-profile"]).unwrap(),
            "efsrootaccessinstanceprofile"
        );
        assert_eq!(make_unique_id(&["efsArn"]).unwrap(), "efsArn");
    }

    #[test]
    fn test_resource_component_hidden_from_human_part() {
        let id = make_unique_id(&["efs-root-sg", "Resource"]).unwrap();
        assert!(id.starts_with("efsrootsg"));
        assert_eq!(id.len(), "efsrootsg".len() + HASH_LEN);

        let expected_hash = format!("{:x}", md5::compute(b"efs-root-sg/Resource"))[..8].to_uppercase();
        assert!(id.ends_with(&expected_hash));
    }

    #[test]
    fn test_hash_distinguishes_paths_with_same_human_part() {
        let a = make_unique_id(&["efs-root", "sg"]).unwrap();
        let b = make_unique_id(&["efsroot", "sg"]).unwrap();
        assert_ne!(a, b);
        assert_eq!(a[..9], b[..9]);
    }

    #[test]
    fn test_default_is_dropped() {
        assert_eq!(
            make_unique_id(&["ecs-app-efs", "Default"]),
            make_unique_id(&["ecs-app-efs"])
        );
        assert_eq!(make_unique_id::<&str>(&["Default"]), None);
        assert_eq!(make_unique_id::<&str>(&[]), None);
    }

    #[test]
    fn test_remove_dupes() {
        assert_eq!(remove_dupes(&["Bucket", "Bucket", "Policy"]), vec!["Bucket", "Policy"]);
        assert_eq!(remove_dupes(&["MyBucket", "Bucket"]), vec!["MyBucket"]);
    }

    #[test]
    fn test_ids_are_stable() {
        let path = ["ecs-app-efs", "efs-root-access-point", "Resource"];
        assert_eq!(make_unique_id(&path), make_unique_id(&path));
    }
}
