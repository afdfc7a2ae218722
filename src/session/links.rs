//! What happens when a link inside a server page is clicked.

use std::path::PathBuf;

use url::Url;

use crate::registry::is_under;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    /// Uploaded file served by the host; fetch it as a download.
    Download(String),
    /// Local file link; show it in the file manager.
    RevealFile(PathBuf),
    /// Same-site or relative link; let the context navigate.
    Stay,
    /// Anything else goes to the system browser.
    OpenExternal(String),
}

fn is_relative(href: &str) -> bool {
    // `//host/x` and `scheme://...` are absolute
    if href.starts_with("//") {
        return false;
    }
    match href.split_once("://") {
        Some((scheme, _)) => !scheme.chars().all(|c| c.is_ascii_lowercase()) || scheme.is_empty(),
        None => true,
    }
}

/// Decide what a click on `href` does inside the context for `site_url`.
pub fn classify(href: &str, download_attribute: bool, site_url: &str) -> LinkAction {
    if href.starts_with("/file-upload/") && !download_attribute {
        return LinkAction::Download(format!("{}{}", site_url.trim_end_matches('/'), href));
    }

    if let Some(rest) = href.strip_prefix("file://").filter(|r| !r.is_empty()) {
        let path = Url::parse(href)
            .ok()
            .and_then(|u| u.to_file_path().ok())
            .unwrap_or_else(|| PathBuf::from(rest));
        return LinkAction::RevealFile(path);
    }

    if is_under(site_url, href) || is_relative(href) {
        return LinkAction::Stay;
    }

    LinkAction::OpenExternal(href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITE: &str = "https://chat.example.com";

    #[test]
    fn test_file_upload_becomes_download() {
        assert_eq!(
            classify("/file-upload/abc/report.pdf", false, SITE),
            LinkAction::Download("https://chat.example.com/file-upload/abc/report.pdf".into())
        );
        assert_eq!(classify("/file-upload/abc/report.pdf", true, SITE), LinkAction::Stay);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_link_is_revealed() {
        assert_eq!(
            classify("file:///home/me/notes.txt", false, SITE),
            LinkAction::RevealFile(PathBuf::from("/home/me/notes.txt"))
        );
    }

    #[test]
    fn test_same_site_and_relative_stay() {
        assert_eq!(classify("https://chat.example.com/channel/general", false, SITE), LinkAction::Stay);
        assert_eq!(classify("/direct/bob", false, SITE), LinkAction::Stay);
        assert_eq!(classify("#anchor", false, SITE), LinkAction::Stay);
    }

    #[test]
    fn test_foreign_links_open_externally() {
        assert_eq!(
            classify("https://docs.example.org/help", false, SITE),
            LinkAction::OpenExternal("https://docs.example.org/help".into())
        );
        assert_eq!(
            classify("//cdn.example.org/x", false, SITE),
            LinkAction::OpenExternal("//cdn.example.org/x".into())
        );
    }

    #[test]
    fn test_lookalike_domain_opens_externally() {
        assert_eq!(
            classify("https://chat.example.com.evil.net/login", false, SITE),
            LinkAction::OpenExternal("https://chat.example.com.evil.net/login".into())
        );
    }
}
