// AWS Signature Version 4 for the single-path JSON POSTs we send.
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

/// Headers to attach to a signed request, besides `Content-Type` and `X-Amz-Target`.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    pub authorization: String,
    pub amz_date: String,
    pub security_token: Option<String>,
}

pub struct SigningInput<'a> {
    pub host: &'a str,
    pub region: &'a str,
    pub service: &'a str,
    pub content_type: &'a str,
    pub target: &'a str,
    pub body: &'a [u8],
}

fn hmac(key: &[u8], data: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length
    let mut mac = HmacSha256::new_from_slice(key).expect("hmac key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

pub fn signing_key(secret: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac(format!("AWS4{secret}").as_bytes(), date_stamp.as_bytes());
    let k_region = hmac(&k_date, region.as_bytes());
    let k_service = hmac(&k_region, service.as_bytes());
    hmac(&k_service, b"aws4_request")
}

pub fn sign(creds: &Credentials, input: &SigningInput<'_>, now: DateTime<Utc>) -> SignedHeaders {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = now.format("%Y%m%d").to_string();

    // header names sorted: content-type, host, x-amz-date, x-amz-security-token, x-amz-target
    let mut canonical_headers = format!(
        "content-type:{}\nhost:{}\nx-amz-date:{}\n",
        input.content_type, input.host, amz_date
    );
    let mut signed_headers = String::from("content-type;host;x-amz-date");
    if let Some(token) = &creds.session_token {
        canonical_headers.push_str(&format!("x-amz-security-token:{token}\n"));
        signed_headers.push_str(";x-amz-security-token");
    }
    canonical_headers.push_str(&format!("x-amz-target:{}\n", input.target));
    signed_headers.push_str(";x-amz-target");

    let canonical_request = format!(
        "POST\n/\n\n{}\n{}\n{}",
        canonical_headers,
        signed_headers,
        sha256_hex(input.body)
    );

    let scope = format!("{}/{}/{}/aws4_request", date_stamp, input.region, input.service);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        sha256_hex(canonical_request.as_bytes())
    );

    let key = signing_key(&creds.secret_access_key, &date_stamp, input.region, input.service);
    let signature = hex::encode(hmac(&key, string_to_sign.as_bytes()));

    SignedHeaders {
        authorization: format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, creds.access_key_id, scope, signed_headers, signature
        ),
        amz_date,
        security_token: creds.session_token.clone(),
    }
}
