//! AWS Signature Version 4 request signing.
//!
//! Only what the control plane and parameter store need: header-based signing of
//! requests with small JSON bodies. Paths are double-encoded (non-S3 rules) and
//! query parameters are sorted and re-encoded.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use url::Url;

use crate::error::{LifecycleError, Result};

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Static credentials used for signing.
#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl std::fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl AwsCredentials {
    /// Read `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and optional `AWS_SESSION_TOKEN`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if either required variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| LifecycleError::Config(format!("{key} is not set")))
        };
        Ok(Self {
            access_key_id: required("AWS_ACCESS_KEY_ID")?,
            secret_access_key: required("AWS_SECRET_ACCESS_KEY")?,
            session_token: lookup("AWS_SESSION_TOKEN").filter(|v| !v.trim().is_empty()),
        })
    }
}

/// Signs requests for one service in one region.
#[derive(Debug, Clone)]
pub struct SigV4Signer {
    credentials: AwsCredentials,
    region: String,
    service: String,
}

impl SigV4Signer {
    pub fn new(
        credentials: AwsCredentials,
        region: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            region: region.into(),
            service: service.into(),
        }
    }

    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Sign with the current time. Adds `host`, `x-amz-date`, the session token
    /// (if any) and `authorization` to `headers`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL has no host.
    pub fn sign(
        &self,
        method: &str,
        url: &Url,
        headers: &mut BTreeMap<String, String>,
        body: &[u8],
    ) -> Result<()> {
        self.sign_at(method, url, headers, body, Utc::now())
    }

    /// Sign as of `now`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the URL has no host.
    pub fn sign_at(
        &self,
        method: &str,
        url: &Url,
        headers: &mut BTreeMap<String, String>,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<()> {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date_stamp = now.format("%Y%m%d").to_string();

        // Header names are compared lowercase; the map keeps them sorted.
        *headers = std::mem::take(headers)
            .into_iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v))
            .collect();
        headers.insert("host".to_string(), host_header(url)?);
        headers.insert("x-amz-date".to_string(), amz_date.clone());
        if let Some(token) = &self.credentials.session_token {
            headers.insert("x-amz-security-token".to_string(), token.clone());
        }

        let signed_headers = headers
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(";");
        let mut canonical_headers = String::new();
        for (name, value) in headers.iter() {
            let _ = writeln!(canonical_headers, "{name}:{}", value.trim());
        }
        let payload_hash = hex::encode(sha256(body));

        let canonical_request = format!(
            "{method}\n{}\n{}\n{canonical_headers}\n{signed_headers}\n{payload_hash}",
            canonical_uri(url),
            canonical_query(url),
        );

        let credential_scope = format!(
            "{date_stamp}/{}/{}/aws4_request",
            self.region, self.service
        );
        let string_to_sign = format!(
            "{ALGORITHM}\n{amz_date}\n{credential_scope}\n{}",
            hex::encode(sha256(canonical_request.as_bytes()))
        );

        let k_date = hmac_sha256(
            format!("AWS4{}", self.credentials.secret_access_key).as_bytes(),
            date_stamp.as_bytes(),
        )?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, self.service.as_bytes())?;
        let k_signing = hmac_sha256(&k_service, b"aws4_request")?;
        let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes())?);

        headers.insert(
            "authorization".to_string(),
            format!(
                "{ALGORITHM} Credential={}/{credential_scope}, SignedHeaders={signed_headers}, Signature={signature}",
                self.credentials.access_key_id
            ),
        );
        Ok(())
    }
}

/// Build a signed `reqwest` request. `headers` should not include `host`.
pub(crate) fn signed_request(
    http: &reqwest::Client,
    signer: &SigV4Signer,
    method: reqwest::Method,
    url: Url,
    mut headers: BTreeMap<String, String>,
    body: Vec<u8>,
) -> Result<reqwest::RequestBuilder> {
    signer.sign(method.as_str(), &url, &mut headers, &body)?;
    let mut req = http.request(method, url);
    for (name, value) in &headers {
        // reqwest derives Host from the URL.
        if name == "host" {
            continue;
        }
        req = req.header(name.as_str(), value.as_str());
    }
    if !body.is_empty() {
        req = req.body(body);
    }
    Ok(req)
}

fn host_header(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| LifecycleError::Config(format!("endpoint '{url}' has no host")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

fn canonical_query(url: &Url) -> String {
    if url.query().is_none() {
        return String::new();
    }
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_encode(&k), uri_encode(&v)))
        .collect();
    pairs.sort();
    pairs
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn uri_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(char::from(b));
            }
            _ => {
                let _ = write!(out, "%{b:02X}");
            }
        }
    }
    out
}

fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    Sha256::digest(data).into()
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<[u8; 32]> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|e| LifecycleError::Config(format!("invalid signing key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn example_signer(session_token: Option<&str>) -> SigV4Signer {
        SigV4Signer::new(
            AwsCredentials {
                access_key_id: "AKIDEXAMPLE".to_string(),
                secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
                session_token: session_token.map(str::to_string),
            },
            "us-east-1",
            "service",
        )
    }

    fn example_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0)
            .single()
            .expect("valid time")
    }

    #[test]
    fn matches_aws_get_vanilla_vector() {
        let url = Url::parse("https://example.amazonaws.com/").expect("url");
        let mut headers = BTreeMap::new();
        example_signer(None)
            .sign_at("GET", &url, &mut headers, b"", example_time())
            .expect("sign");

        assert_eq!(headers["x-amz-date"], "20150830T123600Z");
        assert_eq!(
            headers["authorization"],
            "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/service/aws4_request, \
             SignedHeaders=host;x-amz-date, \
             Signature=5fa00fa31553b73ebf1942676e86291e8372ff2a2260956d9b8aae1d763fbf31"
        );
    }

    #[test]
    fn session_token_and_extra_headers_are_signed() {
        let url = Url::parse("http://127.0.0.1:9000/gateways/gw-1/targets/?maxResults=100")
            .expect("url");
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        example_signer(Some("token"))
            .sign_at("GET", &url, &mut headers, b"", example_time())
            .expect("sign");

        assert_eq!(headers["host"], "127.0.0.1:9000");
        assert_eq!(headers["x-amz-security-token"], "token");
        assert!(headers["authorization"].contains(
            "SignedHeaders=content-type;host;x-amz-date;x-amz-security-token,"
        ));
    }

    #[test]
    fn canonical_query_sorts_and_encodes() {
        let url = Url::parse("https://h/p?nextToken=a%2Bb%3D&maxResults=100").expect("url");
        assert_eq!(canonical_query(&url), "maxResults=100&nextToken=a%2Bb%3D");
        assert_eq!(canonical_query(&Url::parse("https://h/p").expect("url")), "");
    }

    #[test]
    fn canonical_uri_double_encodes_segments() {
        let url = Url::parse("https://h/gateways/a%20b/").expect("url");
        assert_eq!(canonical_uri(&url), "/gateways/a%2520b/");
    }

    #[test]
    fn credentials_require_key_and_secret() {
        let err = AwsCredentials::from_lookup(|k| {
            (k == "AWS_ACCESS_KEY_ID").then(|| "AKID".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("AWS_SECRET_ACCESS_KEY"));

        let creds = AwsCredentials::from_lookup(|k| match k {
            "AWS_ACCESS_KEY_ID" => Some("AKID".to_string()),
            "AWS_SECRET_ACCESS_KEY" => Some("secret".to_string()),
            _ => None,
        })
        .expect("creds");
        assert_eq!(creds.session_token, None);
        assert!(!format!("{creds:?}").contains("secret\""));
    }
}
