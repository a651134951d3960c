//! Authorization callback handling.
//!
//! After the user authorizes, Shapes sends them back to the redirect URI with
//! a `code` query parameter. The code is read once and removed from the
//! address so replaying the address does not replay the code.

use url::Url;

/// Query parameter carrying the one-time code.
pub const CODE_PARAM: &str = "code";

/// Remove the `code` parameter from `location` and return its value.
///
/// Other parameters keep their order. When none remain the query is dropped
/// entirely. Returns `None` (leaving `location` untouched) if there is no
/// non-empty code.
pub fn take_code(location: &mut Url) -> Option<String> {
    let mut code = None;
    let mut rest = Vec::new();
    for (key, value) in location.query_pairs() {
        if key == CODE_PARAM {
            if code.is_none() {
                code = Some(value.into_owned());
            }
        } else {
            rest.push((key.into_owned(), value.into_owned()));
        }
    }

    let code = code.filter(|c| !c.is_empty())?;

    if rest.is_empty() {
        location.set_query(None);
    } else {
        location.query_pairs_mut().clear().extend_pairs(rest);
    }
    Some(code)
}

/// Parse user input as a callback address, if it looks like one.
pub fn parse_location(input: &str) -> Option<Url> {
    let input = input.trim();
    if !(input.starts_with("http://") || input.starts_with("https://")) {
        return None;
    }
    Url::parse(input).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_only_param() {
        let mut url = Url::parse("http://localhost:8080/?code=abc123").unwrap();
        assert_eq!(take_code(&mut url).as_deref(), Some("abc123"));
        assert_eq!(url.as_str(), "http://localhost:8080/");
        assert!(!url.as_str().contains("code="));
    }

    #[test]
    fn test_take_keeps_other_params() {
        let mut url = Url::parse("http://localhost/cb?a=1&code=xyz&b=2").unwrap();
        assert_eq!(take_code(&mut url).as_deref(), Some("xyz"));
        assert_eq!(url.query(), Some("a=1&b=2"));
    }

    #[test]
    fn test_no_code_leaves_url() {
        let mut url = Url::parse("http://localhost/cb?a=1").unwrap();
        assert_eq!(take_code(&mut url), None);
        assert_eq!(url.as_str(), "http://localhost/cb?a=1");
    }

    #[test]
    fn test_decodes_value() {
        let mut url = Url::parse("http://localhost/?code=a%2Bb").unwrap();
        assert_eq!(take_code(&mut url).as_deref(), Some("a+b"));
    }

    #[test]
    fn test_parse_location() {
        assert!(parse_location("abc123").is_none());
        assert!(parse_location(" http://localhost/?code=1 ").is_some());
    }
}
