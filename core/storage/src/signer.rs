//! Backend-agnostic signing primitives.
//!
//! HMAC-SHA1 and digest helpers, the base64 flavours the backends expect,
//! and the two canonical string builders: delimiter-joined header signing
//! strings and sorted `key=value` parameter strings.

use base64::{
    engine::general_purpose::{STANDARD as BASE64_STANDARD, URL_SAFE as BASE64_URL_SAFE},
    Engine,
};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use md5::Md5;
use sha1::{Digest, Sha1};

use picbed_common::{Error, Result};

type HmacSha1 = Hmac<Sha1>;

/// HMAC-SHA1 of `data` keyed with `key`.
pub fn hmac_sha1(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Lowercase hex SHA1 digest.
pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// Lowercase hex MD5 digest.
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(Md5::digest(data))
}

/// Standard base64 with padding.
pub fn base64_encode(data: &[u8]) -> String {
    BASE64_STANDARD.encode(data)
}

/// URL-safe base64 (`-` and `_` alphabet) with padding.
pub fn url_safe_base64(data: &[u8]) -> String {
    BASE64_URL_SAFE.encode(data)
}

/// Rewrite a standard base64 string into the URL-safe alphabet.
pub fn safe64(encoded: &str) -> String {
    encoded.replace('+', "-").replace('/', "_")
}

/// Re-encode UTF-16 code units as a UTF-8 string.
///
/// Unpaired surrogates are rejected.
pub fn utf16_to_utf8(units: &[u16]) -> Result<String> {
    String::from_utf16(units).map_err(|e| Error::InvalidInput(format!("Invalid UTF-16: {}", e)))
}

/// RFC 7231 HTTP-date, e.g. `Tue, 14 Nov 2023 22:13:20 GMT`.
pub fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Join signing-string parts with a fixed delimiter, e.g. `METHOD&URI&Date`.
pub fn signing_string(parts: &[&str], delimiter: &str) -> String {
    parts.join(delimiter)
}

/// Sorted, `&`-joined `key=value` parameter string.
///
/// Pairs are rendered as `key=value` first and the rendered strings are sorted
/// lexicographically.
pub fn canonical_params<K, V>(pairs: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut rendered: Vec<String> = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k.as_ref(), v.as_ref()))
        .collect();
    rendered.sort();
    rendered.join("&")
}

/// SHA1 hex digest of the canonical parameter string with `secret` appended.
pub fn sign_params<K, V>(pairs: &[(K, V)], secret: &str) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let base = canonical_params(pairs);
    sha1_hex(format!("{}{}", base, secret).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hmac_sha1_known_vector() {
        // RFC 2202 test case 2
        let mac = hmac_sha1(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(hex::encode(mac), "effcdf6ae5eb2fa2d27416d5f184df9c259a7c79");
    }

    #[test]
    fn test_digests() {
        assert_eq!(sha1_hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn test_safe64() {
        assert_eq!(safe64("a+b/c="), "a-b_c=");
        assert_eq!(url_safe_base64(&[0xfb, 0xff]), "-_8=");
        assert_eq!(base64_encode(&[0xfb, 0xff]), "+/8=");
    }

    #[test]
    fn test_utf16_to_utf8() {
        let units: Vec<u16> = "图床".encode_utf16().collect();
        assert_eq!(utf16_to_utf8(&units).unwrap(), "图床");
        assert!(utf16_to_utf8(&[0xd800]).is_err());
    }

    #[test]
    fn test_http_date() {
        use chrono::TimeZone;
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        assert_eq!(http_date(now), "Tue, 14 Nov 2023 22:13:20 GMT");
    }

    #[test]
    fn test_signing_string() {
        assert_eq!(signing_string(&["PUT", "/b/k", "date"], "&"), "PUT&/b/k&date");
    }

    #[test]
    fn test_canonical_params_sorted() {
        let pairs = [("timestamp", "10"), ("folder", "f"), ("upload_preset", "p")];
        assert_eq!(canonical_params(&pairs), "folder=f&timestamp=10&upload_preset=p");
    }

    #[test]
    fn test_sign_params() {
        let pairs = [("timestamp", "10"), ("folder", "f")];
        assert_eq!(sign_params(&pairs, "s"), sha1_hex(b"folder=f&timestamp=10s"));
    }
}
