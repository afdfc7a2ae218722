//! Custom-scheme intake: `<scheme>://host/path?insecure=true` → server URL.

use url::Url;

/// Server URLs carried by the custom-scheme arguments in `args`.
///
/// Arguments that are not `<scheme>://` URLs with something after the
/// separator are ignored. `insecure=true` selects plain HTTP.
pub fn parse_protocol_urls<I, S>(args: I, scheme: &str) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let prefix = format!("{}://", scheme);
    args.into_iter()
        .filter_map(|arg| {
            let arg = arg.as_ref();
            let rest = arg.strip_prefix(&prefix)?;
            if rest.is_empty() {
                return None;
            }
            parse_one(arg)
        })
        .collect()
}

fn parse_one(uri: &str) -> Option<String> {
    let parsed = match Url::parse(uri) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(uri = %uri, error = %e, "Ignoring malformed protocol URL");
            return None;
        }
    };
    let host = parsed.host_str().filter(|h| !h.is_empty())?;

    let insecure = parsed
        .query_pairs()
        .any(|(key, value)| key == "insecure" && value == "true");
    let scheme = if insecure { "http" } else { "https" };

    let authority = match parsed.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };
    let path = match parsed.path() {
        "/" => "",
        path => path,
    };
    Some(format!("{}://{}{}", scheme, authority, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_secure_by_default() {
        assert_eq!(
            parse_protocol_urls(["rocketchat://chat.example.com"], "rocketchat"),
            vec!["https://chat.example.com".to_string()]
        );
    }

    #[test]
    fn test_insecure_query_and_path() {
        assert_eq!(
            parse_protocol_urls(
                ["rocketchat://chat.example.com/team?insecure=true"],
                "rocketchat"
            ),
            vec!["http://chat.example.com/team".to_string()]
        );
        assert_eq!(
            parse_protocol_urls(["rocketchat://chat.example.com?insecure=false"], "rocketchat"),
            vec!["https://chat.example.com".to_string()]
        );
    }

    #[test]
    fn test_keeps_port() {
        assert_eq!(
            parse_protocol_urls(["rocketchat://localhost:3000"], "rocketchat"),
            vec!["https://localhost:3000".to_string()]
        );
    }

    #[test]
    fn test_filters_other_arguments() {
        let args = [
            "/usr/bin/chatdeck",
            "--reset-app-data",
            "rocketchat://",
            "https://chat.example.com",
            "rocketchat://b.example.com",
        ];
        assert_eq!(
            parse_protocol_urls(args, "rocketchat"),
            vec!["https://b.example.com".to_string()]
        );
    }

    #[test]
    fn test_custom_scheme() {
        assert_eq!(
            parse_protocol_urls(["acmechat://chat.acme.test"], "acmechat"),
            vec!["https://chat.acme.test".to_string()]
        );
        assert!(parse_protocol_urls(["rocketchat://chat.acme.test"], "acmechat").is_empty());
    }
}
