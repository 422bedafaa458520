// Simple glob-style matcher supporting '*' and '?'. Not full-featured but
// sufficient for matching file names inside one directory.
pub fn wildcard_match(pat: &str, text: &str) -> bool {
    let p: Vec<char> = pat.chars().collect();
    let t: Vec<char> = text.chars().collect();
    fn helper(p: &[char], t: &[char]) -> bool {
        if p.is_empty() {
            return t.is_empty();
        }
        if p[0] == '*' {
            if helper(&p[1..], t) {
                return true;
            }
            if !t.is_empty() && helper(p, &t[1..]) {
                return true;
            }
            return false;
        } else if !t.is_empty() && (p[0] == '?' || p[0] == t[0]) {
            return helper(&p[1..], &t[1..]);
        }
        false
    }
    helper(&p, &t)
}

/// Remote destination for `file_name` inside `remote_dir`.
///
/// SCP does not expand `~` (the path is quoted on the remote side), but a
/// relative path already resolves against the login directory, so a leading
/// `~/` is dropped instead.
pub fn remote_file_path(remote_dir: &str, file_name: &str) -> String {
    let dir = if remote_dir == "~" {
        ""
    } else {
        remote_dir.strip_prefix("~/").unwrap_or(remote_dir)
    };
    if dir.is_empty() {
        return file_name.to_string();
    }
    let trimmed = dir.trim_end_matches('/');
    if trimmed.is_empty() {
        format!("/{}", file_name)
    } else {
        format!("{}/{}", trimmed, file_name)
    }
}

// Lightweight path display wrapper that renders with forward slashes.
pub(crate) struct DisplayPath<'a>(pub(crate) &'a std::path::Path);

impl<'a> std::fmt::Display for DisplayPath<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = self.0.to_string_lossy();
        if s.contains('\\') { f.write_str(&s.replace('\\', "/")) } else { f.write_str(&s) }
    }
}

pub(crate) fn display_path(p: &std::path::Path) -> DisplayPath<'_> {
    DisplayPath(p)
}
