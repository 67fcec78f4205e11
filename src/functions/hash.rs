use crate::rpn::{Arity, FunctionRegistry, RpnError, Scalar};
use md5::Md5;
use rpn_eval_macros::rpn_fn;
use sha1::Sha1;
use sha2::{Digest, Sha256};

pub fn register(registry: &mut FunctionRegistry) {
    registry.define("md5", Arity::exact(1), md5_hex);
    registry.define("hash1", Arity::exact(1), hash1);
    registry.define("hash256", Arity::exact(1), hash256);
}

/// Lowercase hex of the digest of `text`.
fn hex_digest<D: Digest>(text: &str) -> Scalar {
    let digest = D::digest(text.as_bytes());
    Scalar::Text(digest.iter().map(|byte| format!("{:02x}", byte)).collect())
}

#[rpn_fn("md5")]
fn md5_hex(text: String) -> Result<Scalar, RpnError> {
    Ok(hex_digest::<Md5>(&text))
}

#[rpn_fn]
fn hash1(text: String) -> Result<Scalar, RpnError> {
    Ok(hex_digest::<Sha1>(&text))
}

#[rpn_fn]
fn hash256(text: String) -> Result<Scalar, RpnError> {
    Ok(hex_digest::<Sha256>(&text))
}
