use thiserror::Error;
use url::Url;

/// Errors that can occur when validating a URL handed to the OS.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme the system browser should not be asked to open.
    #[error("Unsupported scheme: {0} (only http/https/mailto allowed)")]
    UnsupportedScheme(String),
}

/// Validates a URL before passing it to [`open::that`].
///
/// Only `http`, `https` and `mailto` are accepted so page content cannot
/// make the shell launch local programs or files.
///
/// # Examples
///
/// ```
/// use chatdeck::util::validate_url_for_open;
///
/// assert!(validate_url_for_open("https://rocket.chat/docs").is_ok());
/// assert!(validate_url_for_open("file:///etc/passwd").is_err());
/// ```
pub fn validate_url_for_open(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" | "mailto" => Ok(url),
        scheme => Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_and_mail_links_accepted() {
        assert!(validate_url_for_open("https://example.com/help").is_ok());
        assert!(validate_url_for_open("http://10.0.0.1:3000/").is_ok());
        assert!(validate_url_for_open("mailto:team@example.com").is_ok());
    }

    #[test]
    fn test_other_schemes_rejected() {
        assert!(matches!(
            validate_url_for_open("file:///etc/passwd"),
            Err(UrlValidationError::UnsupportedScheme(s)) if s == "file"
        ));
        assert!(validate_url_for_open("javascript:alert(1)").is_err());
        assert!(validate_url_for_open("smb://share/x").is_err());
    }

    #[test]
    fn test_unparseable_rejected() {
        assert!(matches!(
            validate_url_for_open("/relative/path"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
    }
}
