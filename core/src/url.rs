//! Base URL resolution.

use url::Url;

/// Resolve `path` against `base_url`.
///
/// Absolute URLs pass through untouched, and an empty base leaves the path
/// as given. Otherwise `path` is joined below the base's path, so
/// `http://h/api` + `/users` gives `http://h/api/users`; a leading `/` on
/// the path does not discard the base path. Query and fragment of the path
/// are kept as written.
///
/// A base that does not parse is joined textually and left for the
/// transport to reject when the request is built.
pub fn resolve_url(base_url: &str, path: &str) -> String {
    if base_url.is_empty() || is_absolute(path) {
        return path.to_string();
    }
    let relative = path.trim_start_matches('/');
    match Url::parse(base_url) {
        Ok(base) if !base.cannot_be_a_base() => join(base, relative),
        _ => format!("{}/{relative}", base_url.trim_end_matches('/')),
    }
}

fn join(mut base: Url, relative: &str) -> String {
    let dir = format!("{}/", base.path().trim_end_matches('/'));
    base.set_path(&dir);
    base.set_query(None);
    base.set_fragment(None);
    // `./` keeps a first segment like `users:batch` from reading as a scheme.
    match base.join(&format!("./{relative}")) {
        Ok(url) => url.into(),
        Err(_) => format!("{}{relative}", base.as_str()),
    }
}

fn is_absolute(path: &str) -> bool {
    Url::parse(path).is_ok_and(|url| url.has_host())
}
