//! Direct-to-storage uploads.
//!
//! The API hands the client a short-lived signed `PUT` URL on the object
//! store. Records only ever persist the stable `/public-objects/<uploadId>`
//! path; `GET /public-objects/<uploadId>` redirects to a fresh signed `GET`.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha2::Sha256;
use thiserror::Error;
use url::Url;

use crate::config::ObjectStorageConfig;

type HmacSha256 = Hmac<Sha256>;

/// Prefix of every persisted object reference.
pub const PUBLIC_OBJECTS_PREFIX: &str = "/public-objects/";

/// Query parameter carrying the URL signature.
const SIGNATURE_PARAM: &str = "signature";

/// Upload errors.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("object storage base URL cannot carry a path")]
    InvalidBaseUrl,

    #[error("object storage signing key rejected")]
    InvalidKey,

    #[error("invalid upload id")]
    InvalidId,

    #[error("signed URLs cannot be stored; use the upload id")]
    SignedUrl,

    #[error("unrecognized object reference")]
    InvalidReference,
}

/// HTTP method a URL is signed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignedMethod {
    Put,
    Get,
}

impl SignedMethod {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Put => "PUT",
            Self::Get => "GET",
        }
    }
}

/// Signs object store URLs with HMAC-SHA256.
#[derive(Clone)]
pub struct UploadSigner {
    base_url: Url,
    mac: HmacSha256,
    ttl_secs: i64,
}

impl std::fmt::Debug for UploadSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadSigner")
            .field("base_url", &self.base_url.as_str())
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl UploadSigner {
    /// Build a signer from configuration.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::InvalidBaseUrl` for a base URL that cannot
    /// take path segments.
    pub fn new(config: &ObjectStorageConfig) -> Result<Self, UploadError> {
        if config.base_url.cannot_be_a_base() {
            return Err(UploadError::InvalidBaseUrl);
        }
        let mac = HmacSha256::new_from_slice(config.signing_key.expose_secret().as_bytes())
            .map_err(|_| UploadError::InvalidKey)?;

        Ok(Self {
            base_url: config.base_url.clone(),
            mac,
            ttl_secs: i64::try_from(config.url_ttl.as_secs()).unwrap_or(i64::MAX),
        })
    }

    /// Signed `PUT` URL for the client to upload `upload_id` directly.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::InvalidId` for an id that is not a plain token.
    pub fn sign_put(&self, upload_id: &str, now: DateTime<Utc>) -> Result<Url, UploadError> {
        self.sign(SignedMethod::Put, upload_id, now)
    }

    /// Signed `GET` URL for serving `upload_id`.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::InvalidId` for an id that is not a plain token.
    pub fn sign_get(&self, upload_id: &str, now: DateTime<Utc>) -> Result<Url, UploadError> {
        self.sign(SignedMethod::Get, upload_id, now)
    }

    fn sign(
        &self,
        method: SignedMethod,
        upload_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Url, UploadError> {
        validate_upload_id(upload_id)?;

        let mut url = self.object_url(upload_id)?;
        let expires = now.timestamp().saturating_add(self.ttl_secs);
        let signature = self.signature(method, url.path(), expires);

        url.query_pairs_mut()
            .append_pair("method", method.as_str())
            .append_pair("expires", &expires.to_string())
            .append_pair(SIGNATURE_PARAM, &signature);
        Ok(url)
    }

    /// Check a signed URL produced by this signer.
    #[must_use]
    pub fn verify(&self, url: &Url, method: SignedMethod, now: DateTime<Utc>) -> bool {
        let mut expires = None;
        let mut signature = None;
        let mut signed_method = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "expires" => expires = value.parse::<i64>().ok(),
                "method" => signed_method = Some(value.into_owned()),
                SIGNATURE_PARAM => signature = hex::decode(value.as_bytes()).ok(),
                _ => {}
            }
        }

        let (Some(expires), Some(signature)) = (expires, signature) else {
            return false;
        };
        if signed_method.as_deref() != Some(method.as_str()) || expires < now.timestamp() {
            return false;
        }

        let mut mac = self.mac.clone();
        mac.update(signing_input(method, url.path(), expires).as_bytes());
        mac.verify_slice(&signature).is_ok()
    }

    fn object_url(&self, upload_id: &str) -> Result<Url, UploadError> {
        let mut url = self.base_url.clone();
        url.set_query(None);
        url.path_segments_mut()
            .map_err(|()| UploadError::InvalidBaseUrl)?
            .pop_if_empty()
            .push("uploads")
            .push(upload_id);
        Ok(url)
    }

    fn signature(&self, method: SignedMethod, path: &str, expires: i64) -> String {
        let mut mac = self.mac.clone();
        mac.update(signing_input(method, path, expires).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Convert a client-supplied reference into the persisted form.
    ///
    /// - `/public-objects/<id>` is kept (any query string dropped).
    /// - A URL on this object store becomes `/public-objects/<id>`.
    /// - Any other URL carrying a signature is rejected.
    /// - Other `http(s)` URLs (external logos) are kept unchanged.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::SignedUrl` or `UploadError::InvalidReference`.
    pub fn normalize_object_reference(&self, reference: &str) -> Result<String, UploadError> {
        normalize_object_reference(reference, &self.base_url)
    }
}

fn signing_input(method: SignedMethod, path: &str, expires: i64) -> String {
    format!("{}\n{path}\n{expires}", method.as_str())
}

/// The persisted reference for an upload.
///
/// # Errors
///
/// Returns `UploadError::InvalidId` for an empty id or one containing
/// anything but ASCII letters, digits, `-` and `_`.
pub fn public_object_path(upload_id: &str) -> Result<String, UploadError> {
    validate_upload_id(upload_id)?;
    Ok(format!("{PUBLIC_OBJECTS_PREFIX}{upload_id}"))
}

fn validate_upload_id(upload_id: &str) -> Result<(), UploadError> {
    let valid = !upload_id.is_empty()
        && upload_id.len() <= 64
        && upload_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid { Ok(()) } else { Err(UploadError::InvalidId) }
}

/// See [`UploadSigner::normalize_object_reference`].
///
/// # Errors
///
/// Returns `UploadError::SignedUrl` or `UploadError::InvalidReference`.
pub fn normalize_object_reference(reference: &str, storage_base: &Url) -> Result<String, UploadError> {
    let reference = reference.trim();

    if let Some(rest) = reference.strip_prefix(PUBLIC_OBJECTS_PREFIX) {
        let id = rest.split(['?', '#']).next().unwrap_or_default();
        return public_object_path(id).map_err(|_| UploadError::InvalidReference);
    }

    let url = Url::parse(reference).map_err(|_| UploadError::InvalidReference)?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(UploadError::InvalidReference);
    }

    if let Some(id) = storage_object_id(&url, storage_base) {
        return public_object_path(id).map_err(|_| UploadError::InvalidReference);
    }

    let signed = url.query_pairs().any(|(key, _)| {
        let key = key.to_ascii_lowercase();
        key == SIGNATURE_PARAM || key.ends_with("-signature") || key == "sig"
    });
    if signed {
        return Err(UploadError::SignedUrl);
    }

    Ok(url.to_string())
}

/// The upload id of a URL under `<storage_base>/uploads/`.
fn storage_object_id<'u>(url: &'u Url, storage_base: &Url) -> Option<&'u str> {
    if url.origin() != storage_base.origin() {
        return None;
    }
    let base_path = storage_base.path().trim_end_matches('/');
    let rest = url.path().strip_prefix(base_path)?.strip_prefix("/uploads/")?;
    (!rest.is_empty() && !rest.contains('/')).then_some(rest)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use chrono::Duration;

    fn signer() -> UploadSigner {
        UploadSigner::new(&test_config().object_storage).unwrap()
    }

    #[test]
    fn test_put_url_shape() {
        let url = signer().sign_put("abc123", Utc::now()).unwrap();
        assert_eq!(url.host_str(), Some("storage.test"));
        assert_eq!(url.path(), "/rich-habits/uploads/abc123");
        assert!(url.query_pairs().any(|(k, v)| k == "method" && v == "PUT"));
        assert!(url.query_pairs().any(|(k, _)| k == "signature"));
    }

    #[test]
    fn test_signature_verifies_for_its_method_only() {
        let signer = signer();
        let now = Utc::now();
        let url = signer.sign_put("abc123", now).unwrap();
        assert!(signer.verify(&url, SignedMethod::Put, now));
        assert!(!signer.verify(&url, SignedMethod::Get, now));
    }

    #[test]
    fn test_signature_expires() {
        let signer = signer();
        let now = Utc::now();
        let url = signer.sign_get("abc123", now).unwrap();
        assert!(!signer.verify(&url, SignedMethod::Get, now + Duration::seconds(901)));
    }

    #[test]
    fn test_tampered_path_fails_verification() {
        let signer = signer();
        let now = Utc::now();
        let url = signer.sign_get("abc123", now).unwrap();
        let tampered = Url::parse(&url.as_str().replace("abc123", "abc124")).unwrap();
        assert!(!signer.verify(&tampered, SignedMethod::Get, now));
    }

    #[test]
    fn test_signed_storage_url_normalizes_to_public_path() {
        let signer = signer();
        let url = signer.sign_put("abc123", Utc::now()).unwrap();
        assert_eq!(
            signer.normalize_object_reference(url.as_str()).unwrap(),
            "/public-objects/abc123"
        );
    }

    #[test]
    fn test_public_path_is_kept() {
        let signer = signer();
        assert_eq!(
            signer
                .normalize_object_reference("/public-objects/abc123?v=2")
                .unwrap(),
            "/public-objects/abc123"
        );
        assert!(matches!(
            signer.normalize_object_reference("/public-objects/../etc"),
            Err(UploadError::InvalidReference)
        ));
    }

    #[test]
    fn test_foreign_signed_url_is_rejected() {
        let result = signer().normalize_object_reference(
            "https://bucket.s3.amazonaws.com/logo.png?X-Amz-Signature=deadbeef",
        );
        assert!(matches!(result, Err(UploadError::SignedUrl)));
    }

    #[test]
    fn test_external_url_is_kept() {
        assert_eq!(
            signer()
                .normalize_object_reference("https://eagles.example.org/logo.png")
                .unwrap(),
            "https://eagles.example.org/logo.png"
        );
    }

    #[test]
    fn test_invalid_upload_ids() {
        assert!(public_object_path("").is_err());
        assert!(public_object_path("a/b").is_err());
        assert_eq!(public_object_path("abc123").unwrap(), "/public-objects/abc123");
    }
}
