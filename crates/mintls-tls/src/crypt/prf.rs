//! TLS 1.0/1.1 PRF (RFC 2246 §5) and the SSL 3.0 key derivation function.
//!
//! ```text
//! PRF(secret, label, seed) = P_MD5(S1, label + seed) XOR P_SHA1(S2, label + seed)
//!
//! P_hash(secret, seed) = HMAC_hash(secret, A(1) + seed) ||
//!                         HMAC_hash(secret, A(2) + seed) || ...
//! A(0) = seed
//! A(i) = HMAC_hash(secret, A(i-1))
//! ```
//!
//! S1 and S2 are the first and last `ceil(len / 2)` bytes of the secret; for
//! odd lengths they share the middle byte.

use super::{md5_factory, sha1_factory};
use mintls_crypto::hmac::Hmac;
use mintls_crypto::md5::Md5;
use mintls_crypto::provider::Digest;
use mintls_crypto::sha1::Sha1;
use mintls_types::TlsError;
use zeroize::Zeroize;

/// Longest output PRF_SSL can produce (26 labels "A" .. "ZZZ...Z").
pub const SSL3_PRF_MAX: usize = 26 * 16;

/// TLS 1.0/1.1 PRF: derive `output_len` bytes from `secret`, `label` and `seed`.
pub fn prf(secret: &[u8], label: &[u8], seed: &[u8], output_len: usize) -> Result<Vec<u8>, TlsError> {
    let mut label_seed = Vec::with_capacity(label.len() + seed.len());
    label_seed.extend_from_slice(label);
    label_seed.extend_from_slice(seed);

    let half = secret.len().div_ceil(2);
    let s1 = &secret[..half];
    let s2 = &secret[secret.len() - half..];

    let mut result = p_hash(md5_factory, s1, &label_seed, output_len)?;
    let mut sha_part = p_hash(sha1_factory, s2, &label_seed, output_len)?;
    for (r, s) in result.iter_mut().zip(sha_part.iter()) {
        *r ^= s;
    }
    sha_part.zeroize();
    Ok(result)
}

/// P_hash expansion function (RFC 2246 §5).
fn p_hash(
    factory: fn() -> Box<dyn Digest>,
    secret: &[u8],
    seed: &[u8],
    output_len: usize,
) -> Result<Vec<u8>, TlsError> {
    let keyed = Hmac::new(factory, secret)?;
    let mut result = Vec::with_capacity(output_len);
    let mut block = vec![0u8; keyed.output_size()];

    // A(0) = seed
    let mut a = seed.to_vec();

    while result.len() < output_len {
        // A(i) = HMAC_hash(secret, A(i-1))
        let mut ctx = keyed.fork();
        ctx.update(&a)?;
        a.resize(block.len(), 0);
        ctx.finish(&mut a)?;

        // HMAC_hash(secret, A(i) + seed)
        let mut ctx = keyed.fork();
        ctx.update(&a)?;
        ctx.update(seed)?;
        ctx.finish(&mut block)?;

        let take = (output_len - result.len()).min(block.len());
        result.extend_from_slice(&block[..take]);
    }

    a.zeroize();
    block.zeroize();
    Ok(result)
}

/// SSL 3.0 key derivation:
/// `MD5(secret || SHA1("A" || secret || seed)) || MD5(secret || SHA1("BB" || secret || seed)) || ...`
pub fn prf_ssl3(secret: &[u8], seed: &[u8], output_len: usize) -> Result<Vec<u8>, TlsError> {
    if output_len > SSL3_PRF_MAX {
        return Err(TlsError::CryptoError(
            mintls_types::CryptoError::InvalidArg,
        ));
    }
    let mut result = Vec::with_capacity(output_len);
    let mut i = 0u8;
    while result.len() < output_len {
        let label = vec![b'A' + i; usize::from(i) + 1];

        let mut sha = Sha1::new();
        sha.update(&label)?;
        sha.update(secret)?;
        sha.update(seed)?;
        let mut inner = [0u8; 20];
        sha.finish(&mut inner)?;

        let mut md5 = Md5::new();
        md5.update(secret)?;
        md5.update(&inner)?;
        let mut block = [0u8; 16];
        md5.finish(&mut block)?;

        let take = (output_len - result.len()).min(block.len());
        result.extend_from_slice(&block[..take]);
        inner.zeroize();
        block.zeroize();
        i += 1;
    }
    Ok(result)
}
