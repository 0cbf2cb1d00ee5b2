/// The backend rejects `:` in path segments, so it is carried as the
/// literal `%3a` on the backend side and reverted for display.
pub fn convert_invalid_char(name: &str) -> String {
    name.replace(':', "%3a")
}

pub fn revert_invalid_char(name: &str) -> String {
    name.replace("%3a", ":")
}

/// Split a file target into its directory and final segment.
/// `/a/b/c.txt` -> (`/a/b`, `c.txt`); `/c.txt` -> (``, `c.txt`).
pub fn split_target(target: &str) -> (&str, &str) {
    match target.rfind('/') {
        Some(idx) => (&target[..idx], &target[idx + 1..]),
        None => ("", target),
    }
}

/// Parent of a slash-terminated directory target, for the listing's
/// up-link. The root has no parent.
pub fn parent_dir(target: &str) -> Option<String> {
    let trimmed = target.trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.rfind('/') {
        Some(0) => Some("/".to_string()),
        Some(idx) => Some(format!("{}/", &trimmed[..idx])),
        None => None,
    }
}

/// Join a directory and a child name into a backend path.
pub fn join(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    format!("{dir}/{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colon_round_trips() {
        for name in ["plain.txt", "a:b:c", ":starts", "ends:"] {
            assert_eq!(revert_invalid_char(&convert_invalid_char(name)), name);
        }
        assert_eq!(convert_invalid_char("a:b"), "a%3ab");
    }

    #[test]
    fn split_separates_dir_and_name() {
        assert_eq!(split_target("/a/b/c.txt"), ("/a/b", "c.txt"));
        assert_eq!(split_target("/c.txt"), ("", "c.txt"));
    }

    #[test]
    fn parent_walks_up_one_level() {
        assert_eq!(parent_dir("/a/b/"), Some("/a/".to_string()));
        assert_eq!(parent_dir("/a/"), Some("/".to_string()));
        assert_eq!(parent_dir("/"), None);
    }
}
