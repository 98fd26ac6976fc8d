//! Gateway notification signature verification.
//!
//! The gateway signs notifications with HMAC-SHA256 under a shared secret
//! and sends the digest in one or both of two headers:
//!
//! - `Content-HMAC`, computed over the raw body
//! - `X-Content-HMAC`, computed over the URL-decoded body
//!
//! Integrations disagree on how the secret is encoded and on what exactly
//! was signed, so verification tries a fixed, ordered list of candidates
//! (key form × body form) against every decoding of every header. The
//! first match wins. All digest comparisons are constant-time.

use std::borrow::Cow;

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString, SecretVec};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::notification::is_json;

/// Header carrying the digest of the raw body.
pub const CONTENT_HMAC_HEADER: &str = "Content-HMAC";

/// Header carrying the digest of the URL-decoded body.
pub const X_CONTENT_HMAC_HEADER: &str = "X-Content-HMAC";

const DIGEST_LEN: usize = 32;

/// How the configured secret is turned into HMAC key bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyForm {
    /// The secret's UTF-8 bytes.
    Raw,
    /// The secret decoded as base64, when it looks like base64.
    Base64,
    /// The secret decoded as hex, when it looks like hex.
    Hex,
}

/// Which bytes of the request were signed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyForm {
    /// The body exactly as received.
    Raw,
    /// The body without trailing whitespace.
    TrimmedRaw,
    /// A form body rebuilt from its decoded `key=value` pairs.
    CanonicalForm,
}

/// One way the sender might have computed the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub key: KeyForm,
    pub body: BodyForm,
}

const fn candidate(key: KeyForm, body: BodyForm) -> Candidate {
    Candidate { key, body }
}

/// Candidates in the order they are tried.
pub const CANDIDATES: [Candidate; 9] = [
    candidate(KeyForm::Raw, BodyForm::Raw),
    candidate(KeyForm::Raw, BodyForm::TrimmedRaw),
    candidate(KeyForm::Raw, BodyForm::CanonicalForm),
    candidate(KeyForm::Base64, BodyForm::Raw),
    candidate(KeyForm::Base64, BodyForm::TrimmedRaw),
    candidate(KeyForm::Base64, BodyForm::CanonicalForm),
    candidate(KeyForm::Hex, BodyForm::Raw),
    candidate(KeyForm::Hex, BodyForm::TrimmedRaw),
    candidate(KeyForm::Hex, BodyForm::CanonicalForm),
];

/// Signature header values as received.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureHeaders {
    pub content_hmac: Option<String>,
    pub x_content_hmac: Option<String>,
}

impl SignatureHeaders {
    pub fn new(content_hmac: Option<String>, x_content_hmac: Option<String>) -> Self {
        Self {
            content_hmac,
            x_content_hmac,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values().next().is_none()
    }

    fn values(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            (CONTENT_HMAC_HEADER, self.content_hmac.as_deref()),
            (X_CONTENT_HMAC_HEADER, self.x_content_hmac.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (name, v))
        })
    }
}

/// Which header and candidate produced the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureMatch {
    pub header: &'static str,
    pub candidate: Candidate,
}

/// Verifies notification signatures against the shared webhook secret.
pub struct SignatureVerifier {
    keys: Vec<(KeyForm, SecretVec<u8>)>,
}

impl SignatureVerifier {
    /// Prepares every key form the secret supports.
    pub fn new(secret: &SecretString) -> Self {
        let raw = secret.expose_secret().trim();
        let mut keys = Vec::with_capacity(3);

        if !raw.is_empty() {
            keys.push((KeyForm::Raw, SecretVec::new(raw.as_bytes().to_vec())));
        }
        if let Some(decoded) = decode_base64_key(raw) {
            keys.push((KeyForm::Base64, SecretVec::new(decoded)));
        }
        if let Some(decoded) = decode_hex_key(raw) {
            keys.push((KeyForm::Hex, SecretVec::new(decoded)));
        }

        Self { keys }
    }

    /// True if any header matches any candidate.
    pub fn verify(&self, body: &[u8], headers: &SignatureHeaders) -> bool {
        self.find_match(body, headers).is_some()
    }

    /// Returns the first header and candidate that match, in candidate order.
    pub fn find_match(&self, body: &[u8], headers: &SignatureHeaders) -> Option<SignatureMatch> {
        let provided: Vec<(&'static str, Vec<Vec<u8>>)> = headers
            .values()
            .map(|(name, value)| (name, decode_signature(value)))
            .filter(|(_, digests)| !digests.is_empty())
            .collect();
        if provided.is_empty() {
            return None;
        }

        for candidate in CANDIDATES {
            let Some(key) = self.key(candidate.key) else {
                continue;
            };
            let Some(signed) = body_variant(body, candidate.body) else {
                continue;
            };
            let Some(expected) = hmac_sha256(key, &signed) else {
                continue;
            };

            for (header, digests) in &provided {
                if digests.iter().any(|d| constant_time_compare(&expected, d)) {
                    return Some(SignatureMatch {
                        header: *header,
                        candidate,
                    });
                }
            }
        }
        None
    }

    fn key(&self, form: KeyForm) -> Option<&[u8]> {
        self.keys
            .iter()
            .find(|(f, _)| *f == form)
            .map(|(_, k)| k.expose_secret().as_slice())
    }
}

/// Bytes signed under `form`, or `None` when the form adds nothing new.
fn body_variant(body: &[u8], form: BodyForm) -> Option<Cow<'_, [u8]>> {
    match form {
        BodyForm::Raw => Some(Cow::Borrowed(body)),
        BodyForm::TrimmedRaw => {
            let trimmed = body.trim_ascii_end();
            (trimmed.len() != body.len()).then_some(Cow::Borrowed(trimmed))
        }
        BodyForm::CanonicalForm => {
            let canonical = canonical_form(body)?;
            (canonical.as_bytes() != body).then(|| Cow::Owned(canonical.into_bytes()))
        }
    }
}

/// Rebuilds a form body from its decoded pairs: `k1=v1&k2=v2`, original order.
pub fn canonical_form(body: &[u8]) -> Option<String> {
    let trimmed = body.trim_ascii();
    if trimmed.is_empty() || is_json(trimmed) {
        return None;
    }
    let pairs: Vec<String> = form_urlencoded::parse(trimmed)
        .map(|(k, v)| format!("{}={}", k, v))
        .collect();
    Some(pairs.join("&"))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Option<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).ok()?;
    mac.update(data);
    Some(mac.finalize().into_bytes().to_vec())
}

/// Every 32-byte digest a header value decodes to, as hex or any base64 flavour.
fn decode_signature(value: &str) -> Vec<Vec<u8>> {
    let mut digests: Vec<Vec<u8>> = Vec::new();
    let mut push = |bytes: Vec<u8>| {
        if bytes.len() == DIGEST_LEN && !digests.contains(&bytes) {
            digests.push(bytes);
        }
    };

    if looks_like_hex(value) {
        if let Ok(bytes) = hex::decode(value) {
            push(bytes);
        }
    }
    for config in BASE64_CONFIGS {
        if let Ok(bytes) = base64::decode_config(value, config) {
            push(bytes);
        }
    }
    digests
}

const BASE64_CONFIGS: [base64::Config; 4] = [
    base64::STANDARD,
    base64::STANDARD_NO_PAD,
    base64::URL_SAFE,
    base64::URL_SAFE_NO_PAD,
];

fn decode_base64_key(secret: &str) -> Option<Vec<u8>> {
    if !looks_like_base64(secret) {
        return None;
    }
    BASE64_CONFIGS
        .iter()
        .find_map(|config| base64::decode_config(secret, *config).ok())
        .filter(|bytes| !bytes.is_empty())
}

fn decode_hex_key(secret: &str) -> Option<Vec<u8>> {
    if !looks_like_hex(secret) {
        return None;
    }
    hex::decode(secret).ok().filter(|bytes| !bytes.is_empty())
}

fn looks_like_hex(s: &str) -> bool {
    s.len() >= 2 && s.len() % 2 == 0 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

fn looks_like_base64(s: &str) -> bool {
    let body = s.trim_end_matches('=');
    s.len() >= 4
        && s.len() - body.len() <= 2
        && !body.is_empty()
        && body
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'-' | b'_'))
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
