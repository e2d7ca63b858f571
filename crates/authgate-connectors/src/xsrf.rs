//! XSRF cookie helpers.
//!
//! The backend hands out an `XSRF-TOKEN` cookie from the CSRF bootstrap
//! endpoint. Browsers' HTTP clients echo it back URL-decoded in the
//! `X-XSRF-TOKEN` header; we do the same from the cookie jar.

use percent_encoding::percent_decode_str;

/// Cookie set by the CSRF bootstrap endpoint.
pub const XSRF_COOKIE_NAME: &str = "XSRF-TOKEN";

/// Header the backend reads the token from.
pub const XSRF_HEADER_NAME: &str = "X-XSRF-TOKEN";

/// Find `name` in a `Cookie` request header value (`a=1; b=2`).
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key.trim() == name).then(|| value.trim().trim_matches('"'))
    })
}

/// Extract and URL-decode the XSRF token from a `Cookie` header value.
pub fn xsrf_token(header: &str) -> Option<String> {
    let raw = cookie_value(header, XSRF_COOKIE_NAME)?;
    if raw.is_empty() {
        return None;
    }
    percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(|token| token.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_cookie_among_others() {
        let header = "laravel_session=abc; XSRF-TOKEN=tok; theme=dark";
        assert_eq!(cookie_value(header, "XSRF-TOKEN"), Some("tok"));
        assert_eq!(cookie_value(header, "theme"), Some("dark"));
        assert_eq!(cookie_value(header, "missing"), None);
    }

    #[test]
    fn token_is_url_decoded() {
        let header = "XSRF-TOKEN=eyJpdiI6IkFC%3D%3D; laravel_session=abc";
        assert_eq!(xsrf_token(header).as_deref(), Some("eyJpdiI6IkFC=="));
    }

    #[test]
    fn empty_token_is_none() {
        assert_eq!(xsrf_token("XSRF-TOKEN=; a=b"), None);
        assert_eq!(xsrf_token("a=b"), None);
    }
}
