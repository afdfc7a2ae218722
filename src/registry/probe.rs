//! Reachability probe against a server's `/api/info` endpoint.

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Why a server did not validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProbeError {
    #[error("Timed out trying to connect")]
    Timeout,

    #[error("No valid server found at the URL")]
    Invalid,

    #[error("Authentication needed, try username:password@host")]
    BasicAuthRequired,
}

fn info_url(host_url: &str) -> Option<(Url, Option<(String, Option<String>)>)> {
    let mut url = Url::parse(host_url.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }

    let credentials = (!url.username().is_empty())
        .then(|| (url.username().to_string(), url.password().map(str::to_string)));
    let _ = url.set_username("");
    let _ = url.set_password(None);
    url.set_query(None);
    url.set_fragment(None);

    let path = format!("{}/api/info", url.path().trim_end_matches('/'));
    url.set_path(&path);
    Some((url, credentials))
}

/// Probe `host_url` with `GET <host_url>/api/info`, raced against `timeout`.
///
/// Credentials embedded in `host_url` are sent as basic auth. Only a 2xx
/// response validates the host.
///
/// # Errors
///
/// - [`ProbeError::Timeout`] if no response arrived in time
/// - [`ProbeError::BasicAuthRequired`] on HTTP 401
/// - [`ProbeError::Invalid`] for unparseable URLs, network failures and any
///   other status
pub async fn validate_host(
    client: &reqwest::Client,
    host_url: &str,
    timeout: Duration,
) -> Result<(), ProbeError> {
    let Some((url, credentials)) = info_url(host_url) else {
        tracing::debug!(url = %host_url, "Probe skipped, not an http(s) URL");
        return Err(ProbeError::Invalid);
    };

    let mut request = client.get(url.clone());
    if let Some((user, pass)) = credentials {
        request = request.basic_auth(user, pass);
    }

    let response = match tokio::time::timeout(timeout, request.send()).await {
        Err(_) => {
            tracing::debug!(url = %url, timeout_ms = timeout.as_millis() as u64, "Probe timed out");
            return Err(ProbeError::Timeout);
        }
        Ok(Err(e)) => {
            tracing::debug!(url = %url, error = %e, "Probe request failed");
            return Err(if e.is_timeout() {
                ProbeError::Timeout
            } else {
                ProbeError::Invalid
            });
        }
        Ok(Ok(response)) => response,
    };

    let status = response.status();
    if status.is_success() {
        tracing::debug!(url = %url, "Probe succeeded");
        Ok(())
    } else if status == reqwest::StatusCode::UNAUTHORIZED {
        Err(ProbeError::BasicAuthRequired)
    } else {
        tracing::debug!(url = %url, status = status.as_u16(), "Probe rejected");
        Err(ProbeError::Invalid)
    }
}

fn has_scheme(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Bare `localhost` or `user:pass@localhost`, with an optional port.
fn is_localhost(input: &str) -> bool {
    let host = input.rsplit_once('@').map_or(input, |(_, h)| h);
    let host = host.split_once(':').map_or(host, |(h, port)| {
        if !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()) {
            h
        } else {
            host
        }
    });
    host == "localhost"
}

/// Resolve what the user typed into the add-server form into a server URL.
///
/// Empty input means `default_instance`. Otherwise candidates are probed in
/// turn: the input as typed; a bare word without dots becomes
/// `https://<word>.<default_domain>`; anything else without a scheme gets
/// `https://` prepended. Input that already carries a scheme reports its
/// failure directly, as does a basic-auth challenge.
pub async fn resolve_host_input(
    client: &reqwest::Client,
    input: &str,
    default_instance: &str,
    default_domain: &str,
    timeout: Duration,
) -> Result<String, ProbeError> {
    let mut candidate = input.trim().to_string();
    if candidate.is_empty() {
        return Ok(default_instance.to_string());
    }

    loop {
        let error = match validate_host(client, &candidate, timeout).await {
            Ok(()) => return Ok(candidate),
            Err(e) => e,
        };

        if has_scheme(&candidate) || error == ProbeError::BasicAuthRequired {
            return Err(error);
        }

        candidate = if !candidate.contains('.') && !is_localhost(&candidate) {
            format!("https://{}.{}", candidate, default_domain)
        } else {
            format!("https://{}", candidate)
        };
        tracing::debug!(candidate = %candidate, "Retrying host input");
    }
}
