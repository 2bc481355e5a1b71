use regex::Regex;

/// Translate a glob pattern (`**`, `*`, `?`, `[...]`) to an anchored regex,
/// wrapping each wildcard in a capturing group so callers can recover the
/// matched segments (used by `regex-match`'s `${0}`/`${1}` substitution).
pub fn to_regex(pattern: &str) -> Option<Regex> {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str("(.*)");
            }
            '*' => out.push_str("([^/]*)"),
            '?' => out.push_str("([^/])"),
            '[' => {
                out.push('[');
                if chars.peek() == Some(&'!') {
                    chars.next();
                    out.push('^');
                }
            }
            '.' | '+' | '(' | ')' | '^' | '$' | '|' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            other => out.push(other),
        }
    }
    out.push('$');
    Regex::new(&out).ok()
}

/// Matched wildcard segments for `path` against `pattern`, or `None` if it
/// doesn't match at all.
pub fn captures(pattern: &str, path: &str) -> Option<Vec<String>> {
    let re = to_regex(pattern)?;
    let caps = re.captures(path)?;
    Some(
        (1..caps.len())
            .map(|i| caps.get(i).map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect(),
    )
}

pub fn matches(pattern: &str, path: &str) -> bool {
    to_regex(pattern).map(|re| re.is_match(path)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_double_star_matches_nested_paths() {
        assert!(matches("**/domain/**", "src/domain/user.ts"));
        assert!(!matches("**/domain/**", "src/presentation/c.ts"));
    }

    #[test]
    fn test_single_star_does_not_cross_segments() {
        assert!(matches("*.ts", "a.ts"));
        assert!(!matches("*.ts", "a/b.ts"));
    }

    #[test]
    fn test_captures_returns_wildcard_segments() {
        let caps = captures("internal/*/README.md", "internal/x/README.md").unwrap();
        assert_eq!(caps, vec!["x".to_string()]);
    }
}
