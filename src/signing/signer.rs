// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HMAC-SHA1 signatures and MD5 body digests, both base64 encoded.

use base64ct::{Base64, Encoding};
use hmac::{Hmac, Mac};
use md5::{Digest, Md5};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Compute `Base64(HMAC-SHA1(secret, string_to_sign))`.
///
/// The secret is used as raw key bytes; there is no key derivation.
pub fn sign(string_to_sign: &str, secret: &str) -> String {
    let mac = keyed_mac(secret, string_to_sign);
    Base64::encode_string(&mac.finalize().into_bytes())
}

/// Check a base64 signature in constant time.
///
/// Signatures that are not valid base64 never match.
pub fn verify(string_to_sign: &str, secret: &str, signature: &str) -> bool {
    let Ok(provided) = Base64::decode_vec(signature) else {
        return false;
    };
    keyed_mac(secret, string_to_sign)
        .verify_slice(&provided)
        .is_ok()
}

/// Base64 MD5 digest of a request body, as sent in `Content-MD5`.
pub fn content_md5(body: &[u8]) -> String {
    Base64::encode_string(&Md5::digest(body))
}

fn keyed_mac(secret: &str, string_to_sign: &str) -> HmacSha1 {
    let mut mac =
        HmacSha1::new_from_slice(secret.as_bytes()).expect("HMAC can accept any key length");
    mac.update(string_to_sign.as_bytes());
    mac
}
