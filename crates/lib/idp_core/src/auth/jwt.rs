//! HS256 signing contexts shared by every token domain.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

use super::TokenError;

/// The only algorithm any domain signs with or accepts.
pub const ALGORITHM: Algorithm = Algorithm::HS256;

/// One HMAC secret, usable for both signing and verification.
#[derive(Clone)]
pub struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }

    /// Sign `claims` as an HS256 JWT.
    pub fn sign<C: Serialize>(&self, claims: &C) -> Result<String, TokenError> {
        encode(&Header::new(ALGORITHM), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature and expiry, then deserialize the claims.
    ///
    /// The header is inspected before anything else: a token announcing any
    /// algorithm other than HS256 (including `none`) is rejected outright.
    pub fn verify<C: DeserializeOwned>(&self, token: &str) -> Result<C, TokenError> {
        require_hs256_header(token)?;

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        decode::<C>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(classify)
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(..)")
    }
}

fn require_hs256_header(token: &str) -> Result<(), TokenError> {
    let mut segments = token.split('.');
    let (Some(header), Some(_), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(TokenError::Malformed("expected three segments".into()));
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(header)
        .map_err(|e| TokenError::Malformed(format!("header encoding: {e}")))?;
    let header: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::Malformed(format!("header json: {e}")))?;

    match header.get("alg").and_then(serde_json::Value::as_str) {
        Some("HS256") => Ok(()),
        Some(_) => Err(TokenError::InvalidSignature),
        None => Err(TokenError::Malformed("missing alg header".into())),
    }
}

fn classify(e: jsonwebtoken::errors::Error) -> TokenError {
    match e.kind() {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidAlgorithmName
        | ErrorKind::InvalidKeyFormat => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::MissingRequiredClaim(claim) => {
            TokenError::Malformed(format!("missing claim '{claim}'"))
        }
        _ => TokenError::Malformed(e.to_string()),
    }
}

/// Short, non-reversible token identifier for log lines.
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest[..6].iter().map(|b| format!("{b:02x}")).collect()
}

/// Compare two tokens without short-circuiting on the first differing byte.
pub fn tokens_match(a: &str, b: &str) -> bool {
    let (a, b) = (Sha256::digest(a.as_bytes()), Sha256::digest(b.as_bytes()));
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Claims {
        sub: String,
        exp: i64,
    }

    fn claims(exp_offset: i64) -> Claims {
        Claims {
            sub: "abc".into(),
            exp: chrono::Utc::now().timestamp() + exp_offset,
        }
    }

    fn forge(header: &str, payload: &str) -> String {
        format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload),
            URL_SAFE_NO_PAD.encode("sig")
        )
    }

    #[test]
    fn sign_then_verify() {
        let key = SigningKey::from_secret(b"one");
        let token = key.sign(&claims(60)).unwrap();
        let back: Claims = key.verify(&token).unwrap();
        assert_eq!(back.sub, "abc");
    }

    #[test]
    fn other_secret_is_invalid_signature() {
        let token = SigningKey::from_secret(b"one").sign(&claims(60)).unwrap();
        let err = SigningKey::from_secret(b"two")
            .verify::<Claims>(&token)
            .unwrap_err();
        assert_eq!(err, TokenError::InvalidSignature);
    }

    #[test]
    fn expired_is_reported() {
        let key = SigningKey::from_secret(b"one");
        let token = key.sign(&claims(-5)).unwrap();
        assert_eq!(key.verify::<Claims>(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn none_algorithm_is_rejected() {
        let exp = chrono::Utc::now().timestamp() + 60;
        let token = forge(
            r#"{"alg":"none","typ":"JWT"}"#,
            &format!(r#"{{"sub":"abc","exp":{exp}}}"#),
        );
        let err = SigningKey::from_secret(b"one")
            .verify::<Claims>(&token)
            .unwrap_err();
        assert_eq!(err, TokenError::InvalidSignature);
    }

    #[test]
    fn asymmetric_algorithm_is_rejected() {
        let token = forge(r#"{"alg":"RS256","typ":"JWT"}"#, r#"{"sub":"abc","exp":1}"#);
        let err = SigningKey::from_secret(b"one")
            .verify::<Claims>(&token)
            .unwrap_err();
        assert_eq!(err, TokenError::InvalidSignature);
    }

    #[test]
    fn garbage_is_malformed() {
        let key = SigningKey::from_secret(b"one");
        assert!(matches!(
            key.verify::<Claims>("not-a-token"),
            Err(TokenError::Malformed(_))
        ));
        assert!(matches!(
            key.verify::<Claims>("a.b.c"),
            Err(TokenError::Malformed(_))
        ));
    }

    #[test]
    fn fingerprint_is_short_and_stable() {
        assert_eq!(fingerprint("abc"), fingerprint("abc"));
        assert_eq!(fingerprint("abc").len(), 12);
        assert_ne!(fingerprint("abc"), fingerprint("abd"));
    }

    #[test]
    fn tokens_match_compares_whole_value() {
        assert!(tokens_match("abc.def.ghi", "abc.def.ghi"));
        assert!(!tokens_match("abc.def.ghi", "abc.def.ghj"));
        assert!(!tokens_match("abc", ""));
    }
}
