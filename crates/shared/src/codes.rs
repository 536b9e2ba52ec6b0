//! Join-code normalization.
//!
//! Users paste whatever they have: the bare invitation token, a share link,
//! a sentence from an email. `normalize_join_code` makes a best effort to
//! dig the token out. Pure string work, no I/O, deterministic.

/// Query parameter names a share link may carry the token under.
const QUERY_PARAMS: &[&str] = &["code", "join", "invite", "token"];

/// Extract a best-effort uppercase join code from arbitrary user text.
///
/// Ordered strategy, first match wins:
/// 1. the whole input is an invitation token (2 letters + 4-6 alphanumerics,
///    uppercase as issued);
/// 2. an invitation token appears anywhere in the input;
/// 3. the input looks like a URL: recognized query params, then a
///    token-shaped path segment, then the last path segment;
/// 4. any alphanumeric run of 4-10 characters;
/// 5. the trimmed input itself, if its length is plausible for a code.
pub fn normalize_join_code(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    if is_invitation_token(trimmed) {
        return Some(trimmed.to_string());
    }

    if let Some(token) = find_invitation_token(trimmed) {
        return Some(token.to_string());
    }

    if looks_like_url(trimmed) {
        if let Some(token) = extract_from_url(trimmed) {
            return Some(token.to_ascii_uppercase());
        }
    }

    if let Some(run) = find_alphanumeric_run(trimmed) {
        return Some(run.to_ascii_uppercase());
    }

    let len = trimmed.chars().count();
    if (4..=20).contains(&len) {
        return Some(trimmed.to_ascii_uppercase());
    }

    None
}

/// Invitation tokens as issued: two uppercase letters followed by 4-6
/// uppercase alphanumerics. Case-sensitive on purpose, so the scan in
/// `find_invitation_token` does not trip over lowercase prose or hostnames.
pub fn is_invitation_token(s: &str) -> bool {
    let bytes = s.as_bytes();
    if !(6..=8).contains(&bytes.len()) {
        return false;
    }
    bytes[0].is_ascii_uppercase()
        && bytes[1].is_ascii_uppercase()
        && bytes[2..]
            .iter()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Leftmost occurrence of the token pattern, longest match at that position.
/// Walks char boundaries, not byte offsets: pasted text is arbitrary and may
/// put multi-byte characters right next to a candidate token.
fn find_invitation_token(s: &str) -> Option<&str> {
    for (start, _) in s.char_indices() {
        for len in (6..=8).rev() {
            let end = start + len;
            if end <= s.len() && s.is_char_boundary(end) && is_invitation_token(&s[start..end]) {
                return Some(&s[start..end]);
            }
        }
    }
    None
}

fn looks_like_url(s: &str) -> bool {
    s.contains("://") || s.starts_with("www.")
}

fn extract_from_url(s: &str) -> Option<&str> {
    // Fragment never carries the code.
    let s = s.split('#').next().unwrap_or(s);

    let (path_part, query) = match s.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (s, None),
    };

    if let Some(query) = query {
        for pair in query.split('&') {
            let (key, value) = match pair.split_once('=') {
                Some(kv) => kv,
                None => continue,
            };
            if QUERY_PARAMS.iter().any(|p| key.eq_ignore_ascii_case(p)) && !value.is_empty() {
                return Some(value);
            }
        }
    }

    // Drop the scheme and host, keep path segments.
    let after_scheme = match path_part.split_once("://") {
        Some((_, rest)) => rest,
        None => path_part,
    };
    let segments: Vec<&str> = after_scheme
        .split('/')
        .skip(1) // host
        .filter(|seg| !seg.is_empty())
        .collect();

    if let Some(seg) = segments
        .iter()
        .copied()
        .find(|seg| is_invitation_token(&seg.to_ascii_uppercase()))
    {
        return Some(seg);
    }

    segments.last().copied()
}

/// First maximal alphanumeric run of 4-10 characters.
fn find_alphanumeric_run(s: &str) -> Option<&str> {
    s.split(|c: char| !c.is_ascii_alphanumeric())
        .find(|run| (4..=10).contains(&run.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_token_passes_through_unchanged() {
        assert_eq!(normalize_join_code("UKAB12").as_deref(), Some("UKAB12"));
        assert_eq!(normalize_join_code("  UKAB12  ").as_deref(), Some("UKAB12"));
    }

    #[test]
    fn lowercase_token_is_uppercased() {
        // Misses the exact pattern but lands on the alphanumeric-run rule.
        assert_eq!(normalize_join_code("ukab12").as_deref(), Some("UKAB12"));
        assert_eq!(normalize_join_code("xj4k29f").as_deref(), Some("XJ4K29F"));
    }

    #[test]
    fn token_found_inside_free_text() {
        assert_eq!(
            normalize_join_code("use code UKAB12 to join before friday").as_deref(),
            Some("UKAB12")
        );
    }

    #[test]
    fn non_ascii_text_around_a_token_is_handled() {
        assert_eq!(
            normalize_join_code("café UKAB12").as_deref(),
            Some("UKAB12")
        );
        assert_eq!(
            normalize_join_code("¡únete con UKAB12!").as_deref(),
            Some("UKAB12")
        );
        // No token at all: the trimmed input falls through untouched.
        assert_eq!(
            normalize_join_code("héllo wörld").as_deref(),
            Some("HÉLLO WÖRLD")
        );
    }

    #[test]
    fn url_query_parameter_wins() {
        assert_eq!(
            normalize_join_code("https://app.example.com/join?code=xj4k29f").as_deref(),
            Some("XJ4K29F")
        );
        assert_eq!(
            normalize_join_code("https://app.example.com/c?utm=x&invite=ukab12").as_deref(),
            Some("UKAB12")
        );
    }

    #[test]
    fn url_path_segment_fallback() {
        assert_eq!(
            normalize_join_code("https://app.example.com/join/ukab12").as_deref(),
            Some("UKAB12")
        );
        // Last segment fallback even when not token-shaped.
        assert_eq!(
            normalize_join_code("https://app.example.com/classrooms/abc").as_deref(),
            Some("ABC")
        );
    }

    #[test]
    fn generic_alphanumeric_run() {
        assert_eq!(normalize_join_code("** 1234 **").as_deref(), Some("1234"));
    }

    #[test]
    fn plausible_input_is_kept_when_no_run_matches() {
        // Runs are all shorter than four characters, so the trimmed input
        // itself is the fallback.
        assert_eq!(normalize_join_code("ab1-cd2").as_deref(), Some("AB1-CD2"));
    }

    #[test]
    fn implausible_input_is_rejected() {
        assert_eq!(normalize_join_code(""), None);
        assert_eq!(normalize_join_code("   "), None);
        assert_eq!(normalize_join_code("ab"), None);
        let long = "x y ".repeat(20);
        assert_eq!(normalize_join_code(&long), None);
    }

    #[test]
    fn token_shape_boundaries() {
        assert!(is_invitation_token("UKAB12"));
        assert!(is_invitation_token("XJ4K29F"));
        assert!(!is_invitation_token("xj4k29f")); // issued codes are uppercase
        assert!(!is_invitation_token("1KAB12")); // digit prefix
        assert!(!is_invitation_token("UKA12")); // too short
        assert!(!is_invitation_token("UKAB12345")); // too long
        assert!(!is_invitation_token("UK AB12")); // embedded space
    }
}
