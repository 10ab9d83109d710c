//! Canonical object references for completed uploads.

use std::time::Duration;

use chrono::Utc;
use rich_habits_server::config::ObjectStorageConfig;
use rich_habits_server::routes::uploads::{CompleteRequest, resolve_object_path};
use rich_habits_server::services::UploadSigner;
use rich_habits_server::services::uploads::SignedMethod;
use secrecy::SecretString;
use url::Url;

fn signer() -> UploadSigner {
    UploadSigner::new(&ObjectStorageConfig {
        base_url: Url::parse("https://storage.test/rich-habits").expect("url"),
        signing_key: SecretString::from("integration-signing-key"),
        url_ttl: Duration::from_secs(900),
    })
    .expect("signer")
}

#[test]
fn test_upload_id_wins_over_signed_url() {
    let request = CompleteRequest {
        upload_id: Some("abc123".to_string()),
        upload_url: Some("https://signed.example.com/abc123?X-Signature=deadbeef".to_string()),
    };

    assert_eq!(
        resolve_object_path(&signer(), &request).expect("path"),
        "/public-objects/abc123"
    );
}

#[test]
fn test_signed_store_url_reduces_to_public_path() {
    let signer = signer();
    let put = signer.sign_put("abc123", Utc::now()).expect("sign");
    let request = CompleteRequest {
        upload_id: None,
        upload_url: Some(put.to_string()),
    };

    let path = resolve_object_path(&signer, &request).expect("path");

    assert_eq!(path, "/public-objects/abc123");
    assert!(!path.contains('?'));
}

#[test]
fn test_foreign_signed_url_is_rejected() {
    let request = CompleteRequest {
        upload_id: None,
        upload_url: Some("https://signed.example.com/abc123?X-Signature=deadbeef".to_string()),
    };

    assert!(resolve_object_path(&signer(), &request).is_err());
}

#[test]
fn test_signed_urls_verify_only_for_their_method() {
    let signer = signer();
    let now = Utc::now();
    let put = signer.sign_put("abc123", now).expect("sign");

    assert!(signer.verify(&put, SignedMethod::Put, now));
    assert!(!signer.verify(&put, SignedMethod::Get, now));
    assert!(!signer.verify(&put, SignedMethod::Put, now + chrono::Duration::hours(1)));
}
