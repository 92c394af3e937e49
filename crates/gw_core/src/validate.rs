use url::Url;

use crate::endpoint::EndpointUrl;
use crate::error::GatewayError;

/// Validate a single endpoint URL (spec §4.6):
/// non-empty, `ws`/`wss` scheme, successfully parses.
pub fn validate_endpoint(raw: &str) -> Result<EndpointUrl, GatewayError> {
    if raw.is_empty() {
        return Err(GatewayError::InvalidEndpoint {
            endpoint: raw.to_string(),
            reason: "endpoint must not be empty".to_string(),
        });
    }

    let url = Url::parse(raw).map_err(|e| GatewayError::InvalidEndpoint {
        endpoint: raw.to_string(),
        reason: format!("failed to parse as URL: {e}"),
    })?;

    match url.scheme() {
        "ws" | "wss" => Ok(EndpointUrl::from_validated(url)),
        other => Err(GatewayError::InvalidEndpoint {
            endpoint: raw.to_string(),
            reason: format!("scheme must be ws or wss, got {other:?}"),
        }),
    }
}

/// Partition a batch of candidate endpoints into valid and invalid, so
/// callers like `updateEndpoints` can proceed with what validates and log
/// what doesn't, rather than failing the whole batch on the first offender.
pub fn partition_endpoints<I, S>(raw: I) -> (Vec<EndpointUrl>, Vec<(String, GatewayError)>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut valid = Vec::new();
    let mut invalid = Vec::new();
    for candidate in raw {
        let candidate = candidate.as_ref();
        match validate_endpoint(candidate) {
            Ok(url) => valid.push(url),
            Err(e) => invalid.push((candidate.to_string(), e)),
        }
    }
    (valid, invalid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ws_and_wss() {
        assert!(validate_endpoint("ws://localhost:8080/mcp").is_ok());
        assert!(validate_endpoint("wss://example.test/mcp").is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert!(validate_endpoint("").is_err());
    }

    #[test]
    fn rejects_wrong_scheme() {
        assert!(validate_endpoint("https://example.test").is_err());
    }

    #[test]
    fn rejects_unparseable() {
        assert!(validate_endpoint("not a url at all").is_err());
    }

    #[test]
    fn partition_keeps_valid_and_reports_invalid() {
        let (valid, invalid) =
            partition_endpoints(["wss://a", "not-a-url", "ws://b", "https://c"]);
        assert_eq!(valid.len(), 2);
        assert_eq!(invalid.len(), 2);
    }
}
