use std::net::IpAddr;

use axum::http::{header, HeaderMap};
use base64::Engine;
use lazy_static::lazy_static;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};

use crate::config::AccessConfig;
use crate::error::AppError;

lazy_static! {
    static ref BASIC_REGEX: Regex = Regex::new(r"(?i)^\s*Basic\s+(\S+)\s*$").unwrap();
}

/// Caller allow-list plus a single basic-auth account, fixed at startup.
pub struct AccessPolicy {
    authorized_ips: Vec<IpAddr>,
    username: String,
    password: SecretString,
    realm: String,
    fallback_header: String,
}

impl AccessPolicy {
    pub fn new(config: AccessConfig) -> Self {
        Self {
            authorized_ips: config.authorized_ips,
            username: config.username,
            password: config.password,
            realm: config.realm,
            fallback_header: config.fallback_header,
        }
    }

    pub fn check_address(&self, remote_addr: Option<IpAddr>) -> Result<(), AppError> {
        if self.authorized_ips.is_empty() {
            return Ok(());
        }

        match remote_addr.map(|ip| ip.to_canonical()) {
            Some(ip) if self.authorized_ips.contains(&ip) => Ok(()),
            other => {
                tracing::warn!("Rejected caller {:?}: not in allow-list", other);
                Err(AppError::Forbidden)
            }
        }
    }

    pub fn check_credentials(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let accepted = basic_credentials(headers, &self.fallback_header)
            .map(|(user, password)| {
                user == self.username && password == self.password.expose_secret()
            })
            .unwrap_or(false);

        if accepted {
            Ok(())
        } else {
            Err(AppError::Unauthorized {
                realm: self.realm.clone(),
            })
        }
    }
}

/// Decode `Authorization: Basic ...`, falling back to the proxy-forwarded header.
pub fn basic_credentials(headers: &HeaderMap, fallback_header: &str) -> Option<(String, String)> {
    let value = headers
        .get(header::AUTHORIZATION)
        .or_else(|| headers.get(fallback_header))?
        .to_str()
        .ok()?;

    let encoded = BASIC_REGEX.captures(value)?.get(1)?.as_str();
    let decoded = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .ok()?;
    let decoded = String::from_utf8(decoded).ok()?;

    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn policy(ips: &[&str]) -> AccessPolicy {
        AccessPolicy::new(AccessConfig {
            authorized_ips: ips.iter().map(|ip| ip.parse().unwrap()).collect(),
            username: "esp".into(),
            password: SecretString::from("s3cret:with:colons".to_string()),
            realm: "Speech Synthesis".into(),
            fallback_header: "X-Forwarded-Authorization".into(),
        })
    }

    fn basic(user: &str, password: &str) -> HeaderValue {
        let token = base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", user, password));
        HeaderValue::from_str(&format!("Basic {}", token)).unwrap()
    }

    #[test]
    fn test_empty_allow_list_accepts_anyone() {
        let policy = policy(&[]);
        assert!(policy.check_address(Some("203.0.113.9".parse().unwrap())).is_ok());
        assert!(policy.check_address(None).is_ok());
    }

    #[test]
    fn test_allow_list() {
        let policy = policy(&["192.168.1.10"]);
        assert!(policy.check_address(Some("192.168.1.10".parse().unwrap())).is_ok());
        assert!(policy.check_address(Some("::ffff:192.168.1.10".parse().unwrap())).is_ok());
        assert!(matches!(
            policy.check_address(Some("192.168.1.11".parse().unwrap())),
            Err(AppError::Forbidden)
        ));
        assert!(matches!(policy.check_address(None), Err(AppError::Forbidden)));
    }

    #[test]
    fn test_valid_credentials() {
        let policy = policy(&[]);
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, basic("esp", "s3cret:with:colons"));
        assert!(policy.check_credentials(&headers).is_ok());
    }

    #[test]
    fn test_fallback_header() {
        let policy = policy(&[]);
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-authorization", basic("esp", "s3cret:with:colons"));
        assert!(policy.check_credentials(&headers).is_ok());
    }

    #[test]
    fn test_rejected_credentials() {
        let policy = policy(&[]);

        let mut headers = HeaderMap::new();
        assert!(matches!(
            policy.check_credentials(&headers),
            Err(AppError::Unauthorized { .. })
        ));

        headers.insert(header::AUTHORIZATION, basic("esp", "wrong"));
        assert!(matches!(
            policy.check_credentials(&headers),
            Err(AppError::Unauthorized { ref realm }) if realm == "Speech Synthesis"
        ));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert!(policy.check_credentials(&headers).is_err());

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic !!!"));
        assert!(policy.check_credentials(&headers).is_err());
    }

    #[test]
    fn test_basic_credentials_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("basic ZXNwOnB3"));
        assert_eq!(
            basic_credentials(&headers, "X-Forwarded-Authorization"),
            Some(("esp".to_string(), "pw".to_string()))
        );
    }
}
