//! Hybrid encryption primitives for onion layers
//!
//! RSA-2048 with OAEP/SHA-256 protects the per-hop symmetric key and
//! AES-256-GCM with a 16-byte IV protects the layer body. Everything here is a
//! pure function over explicit keys and byte buffers.

use aes_gcm::aead::{consts::U16, Aead, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

// =============================================================================
// SIZES
// =============================================================================

/// Modulus size of every relay key
pub const RSA_MODULUS_BITS: usize = 2048;
/// Length of an RSA ciphertext, and so of the wrapped key at the head of a layer
pub const WRAPPED_KEY_LEN: usize = RSA_MODULUS_BITS / 8;
/// Largest plaintext OAEP/SHA-256 accepts under a 2048-bit modulus
pub const MAX_ASYMMETRIC_PLAINTEXT: usize = WRAPPED_KEY_LEN - 2 * 32 - 2;
/// AES-256 key length
pub const SYMMETRIC_KEY_LEN: usize = 32;
/// IV prefixed to every symmetric ciphertext
pub const IV_LEN: usize = 16;
/// GCM authentication tag appended to every symmetric ciphertext
pub const TAG_LEN: usize = 16;

type LayerCipher = AesGcm<Aes256, U16>;

/// Cryptographic errors
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key generation failed: {0}")]
    KeyGeneration(String),
    #[error("invalid key: {0}")]
    InvalidKey(String),
    #[error("expected {expected:?} key, got {actual:?}")]
    WrongKeyKind { expected: KeyKind, actual: KeyKind },
    #[error("unsupported modulus: {0} bits (expected 2048)")]
    UnsupportedModulus(usize),
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("decryption failed")]
    DecryptionFailed,
    #[error("ciphertext truncated: {0} bytes")]
    Truncated(usize),
    #[error("invalid key encoding: {0}")]
    Encoding(#[from] base64::DecodeError),
}

// =============================================================================
// GENERIC KEY REPRESENTATION
// =============================================================================

/// Algorithm tag of a [`CryptoKey`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyKind {
    /// RSA-OAEP public key, SPKI DER
    AsymmetricPublic,
    /// RSA-OAEP private key, PKCS#8 DER
    AsymmetricPrivate,
    /// AES-256 key, raw bytes
    Symmetric,
}

/// Key material in its external form.
///
/// This is what crosses process boundaries. The typed keys below convert to
/// and from it exactly once, at ingestion.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct CryptoKey {
    #[zeroize(skip)]
    kind: KeyKind,
    data: Vec<u8>,
    extractable: bool,
}

impl CryptoKey {
    pub fn new(kind: KeyKind, data: Vec<u8>) -> Self {
        Self {
            kind,
            data,
            extractable: true,
        }
    }

    pub fn kind(&self) -> KeyKind {
        self.kind
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn is_extractable(&self) -> bool {
        self.extractable
    }

    /// Text-safe (base64) encoding of the key bytes
    pub fn encode(&self) -> String {
        STANDARD.encode(&self.data)
    }

    /// Inverse of [`CryptoKey::encode`]
    pub fn decode(kind: KeyKind, encoded: &str) -> Result<Self, CryptoError> {
        Ok(Self::new(kind, STANDARD.decode(encoded.trim())?))
    }

    fn expect_kind(&self, expected: KeyKind) -> Result<(), CryptoError> {
        if self.kind != expected {
            return Err(CryptoError::WrongKeyKind {
                expected,
                actual: self.kind,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for CryptoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("CryptoKey");
        s.field("kind", &self.kind).field("len", &self.data.len());
        if self.kind == KeyKind::AsymmetricPublic {
            s.field("data", &hex::encode(&self.data));
        }
        s.finish()
    }
}

// =============================================================================
// TYPED KEYS
// =============================================================================

/// A relay's RSA public key
#[derive(Clone)]
pub struct PublicKey {
    inner: RsaPublicKey,
    der: Vec<u8>,
}

impl PublicKey {
    /// Parse an SPKI DER public key. Only 2048-bit moduli are accepted, since
    /// the layer split point depends on the ciphertext length.
    pub fn from_der(der: &[u8]) -> Result<Self, CryptoError> {
        let inner = RsaPublicKey::from_public_key_der(der)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        check_modulus(inner.size())?;
        Ok(Self {
            inner,
            der: der.to_vec(),
        })
    }

    fn from_rsa(inner: RsaPublicKey) -> Result<Self, CryptoError> {
        check_modulus(inner.size())?;
        let der = inner
            .to_public_key_der()
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?
            .as_bytes()
            .to_vec();
        Ok(Self { inner, der })
    }

    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    /// Short hex fingerprint for logs
    pub fn fingerprint(&self) -> String {
        hex::encode(&blake3::hash(&self.der).as_bytes()[..8])
    }

    pub fn to_crypto_key(&self) -> CryptoKey {
        CryptoKey::new(KeyKind::AsymmetricPublic, self.der.clone())
    }

    pub fn import(encoded: &str) -> Result<Self, CryptoError> {
        Self::try_from(&CryptoKey::decode(KeyKind::AsymmetricPublic, encoded)?)
    }

    pub fn export(&self) -> String {
        self.to_crypto_key().encode()
    }
}

impl TryFrom<&CryptoKey> for PublicKey {
    type Error = CryptoError;

    fn try_from(key: &CryptoKey) -> Result<Self, Self::Error> {
        key.expect_kind(KeyKind::AsymmetricPublic)?;
        Self::from_der(key.data())
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for PublicKey {}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.fingerprint())
    }
}

/// A relay's RSA private key
#[derive(Clone)]
pub struct PrivateKey {
    inner: RsaPrivateKey,
}

impl PrivateKey {
    /// Parse a PKCS#8 DER private key
    pub fn from_der(der: &[u8]) -> Result<Self, CryptoError> {
        let inner = RsaPrivateKey::from_pkcs8_der(der)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        check_modulus(inner.size())?;
        Ok(Self { inner })
    }

    pub fn public_key(&self) -> Result<PublicKey, CryptoError> {
        PublicKey::from_rsa(RsaPublicKey::from(&self.inner))
    }

    pub fn to_crypto_key(&self) -> Result<CryptoKey, CryptoError> {
        let doc = self
            .inner
            .to_pkcs8_der()
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))?;
        Ok(CryptoKey::new(
            KeyKind::AsymmetricPrivate,
            doc.as_bytes().to_vec(),
        ))
    }

    pub fn import(encoded: &str) -> Result<Self, CryptoError> {
        Self::try_from(&CryptoKey::decode(KeyKind::AsymmetricPrivate, encoded)?)
    }

    pub fn export(&self) -> Result<String, CryptoError> {
        Ok(self.to_crypto_key()?.encode())
    }
}

impl TryFrom<&CryptoKey> for PrivateKey {
    type Error = CryptoError;

    fn try_from(key: &CryptoKey) -> Result<Self, Self::Error> {
        key.expect_kind(KeyKind::AsymmetricPrivate)?;
        Self::from_der(key.data())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(..)")
    }
}

/// RSA keypair held by a relay for its whole lifetime
#[derive(Clone, Debug)]
pub struct KeyPair {
    public: PublicKey,
    private: PrivateKey,
}

impl KeyPair {
    /// Generate a new random keypair
    pub fn generate() -> Result<Self, CryptoError> {
        Self::generate_with(&mut OsRng)
    }

    /// Generate from a caller-supplied RNG (seeded RNGs give deterministic keys)
    pub fn generate_with<R: CryptoRng + RngCore>(rng: &mut R) -> Result<Self, CryptoError> {
        let inner = RsaPrivateKey::new(rng, RSA_MODULUS_BITS)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        Self::from_private(PrivateKey { inner })
    }

    pub fn from_private(private: PrivateKey) -> Result<Self, CryptoError> {
        let public = private.public_key()?;
        Ok(Self { public, private })
    }

    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    pub fn private(&self) -> &PrivateKey {
        &self.private
    }
}

/// Per-hop AES-256 key
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; SYMMETRIC_KEY_LEN]);

impl SymmetricKey {
    /// Generate a fresh random key
    pub fn generate() -> Self {
        let mut key = [0u8; SYMMETRIC_KEY_LEN];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let key: [u8; SYMMETRIC_KEY_LEN] =
            bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
                expected: SYMMETRIC_KEY_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; SYMMETRIC_KEY_LEN] {
        &self.0
    }

    pub fn to_crypto_key(&self) -> CryptoKey {
        CryptoKey::new(KeyKind::Symmetric, self.0.to_vec())
    }

    pub fn import(encoded: &str) -> Result<Self, CryptoError> {
        Self::try_from(&CryptoKey::decode(KeyKind::Symmetric, encoded)?)
    }

    pub fn export(&self) -> String {
        self.to_crypto_key().encode()
    }
}

impl TryFrom<&CryptoKey> for SymmetricKey {
    type Error = CryptoError;

    fn try_from(key: &CryptoKey) -> Result<Self, Self::Error> {
        key.expect_kind(KeyKind::Symmetric)?;
        Self::from_bytes(key.data())
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(..)")
    }
}

fn check_modulus(size_bytes: usize) -> Result<(), CryptoError> {
    if size_bytes != WRAPPED_KEY_LEN {
        return Err(CryptoError::UnsupportedModulus(size_bytes * 8));
    }
    Ok(())
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Encrypt under a relay's public key.
///
/// `plaintext` must be at most [`MAX_ASYMMETRIC_PLAINTEXT`] bytes. Onion
/// layers only ever pass 32-byte symmetric keys here.
pub fn asymmetric_encrypt(plaintext: &[u8], key: &PublicKey) -> Result<Vec<u8>, CryptoError> {
    key.inner
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)
}

/// Decrypt with a relay's private key
pub fn asymmetric_decrypt(ciphertext: &[u8], key: &PrivateKey) -> Result<Vec<u8>, CryptoError> {
    key.inner
        .decrypt(Oaep::new::<Sha256>(), ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)
}

/// Encrypt with a fresh random IV, returning `iv || ciphertext || tag`
pub fn symmetric_encrypt(key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher =
        LayerCipher::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::EncryptionFailed)?;

    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);

    let sealed = cipher
        .encrypt(Nonce::<U16>::from_slice(&iv), plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;

    let mut out = Vec::with_capacity(IV_LEN + sealed.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Split off the IV and decrypt the remainder
pub fn symmetric_decrypt(key: &SymmetricKey, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if data.len() < IV_LEN + TAG_LEN {
        return Err(CryptoError::Truncated(data.len()));
    }
    let (iv, sealed) = data.split_at(IV_LEN);

    let cipher =
        LayerCipher::new_from_slice(key.as_bytes()).map_err(|_| CryptoError::DecryptionFailed)?;
    cipher
        .decrypt(Nonce::<U16>::from_slice(iv), sealed)
        .map_err(|_| CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::keypair;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_asymmetric_roundtrip() {
        let kp = keypair(0);
        for len in [0, 1, SYMMETRIC_KEY_LEN, MAX_ASYMMETRIC_PLAINTEXT] {
            let msg = vec![0xA5u8; len];
            let ct = asymmetric_encrypt(&msg, kp.public()).unwrap();
            assert_eq!(ct.len(), WRAPPED_KEY_LEN);
            assert_eq!(asymmetric_decrypt(&ct, kp.private()).unwrap(), msg);
        }
    }

    #[test]
    fn test_asymmetric_wrong_key() {
        let ct = asymmetric_encrypt(b"secret", keypair(0).public()).unwrap();
        assert!(matches!(
            asymmetric_decrypt(&ct, keypair(1).private()),
            Err(CryptoError::DecryptionFailed)
        ));
    }

    #[test]
    fn test_symmetric_roundtrip() {
        let key = SymmetricKey::generate();
        for msg in [&b""[..], b"hello", &[7u8; 1000][..]] {
            let ct = symmetric_encrypt(&key, msg).unwrap();
            assert_eq!(ct.len(), IV_LEN + msg.len() + TAG_LEN);
            assert_eq!(symmetric_decrypt(&key, &ct).unwrap(), msg);
        }
    }

    #[test]
    fn test_symmetric_fresh_iv() {
        let key = SymmetricKey::generate();
        let a = symmetric_encrypt(&key, b"same message").unwrap();
        let b = symmetric_encrypt(&key, b"same message").unwrap();
        assert_ne!(a, b);
        assert_ne!(a[..IV_LEN], b[..IV_LEN]);
    }

    #[test]
    fn test_symmetric_rejects_tampering() {
        let key = SymmetricKey::generate();
        let ct = symmetric_encrypt(&key, b"payload bytes").unwrap();

        for i in 0..ct.len() {
            let mut bad = ct.clone();
            bad[i] ^= 0x01;
            assert!(symmetric_decrypt(&key, &bad).is_err(), "flip at {i} accepted");
        }

        let other = SymmetricKey::generate();
        assert!(symmetric_decrypt(&other, &ct).is_err());
    }

    #[test]
    fn test_symmetric_truncated() {
        let key = SymmetricKey::generate();
        assert!(matches!(
            symmetric_decrypt(&key, &[0u8; IV_LEN]),
            Err(CryptoError::Truncated(16))
        ));
    }

    #[test]
    fn test_key_export_import() {
        let kp = keypair(0);

        let public = PublicKey::import(&kp.public().export()).unwrap();
        assert_eq!(&public, kp.public());

        let private = PrivateKey::import(&kp.private().export().unwrap()).unwrap();
        assert_eq!(&private.public_key().unwrap(), kp.public());

        let sym = SymmetricKey::generate();
        assert_eq!(SymmetricKey::import(&sym.export()).unwrap(), sym);
    }

    #[test]
    fn test_crypto_key_encode_decode() {
        let key = keypair(1).private().to_crypto_key().unwrap();
        assert!(key.is_extractable());

        let decoded = CryptoKey::decode(key.kind(), &key.encode()).unwrap();
        assert_eq!(decoded, key);
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let sym = SymmetricKey::generate().to_crypto_key();
        assert!(matches!(
            PublicKey::try_from(&sym),
            Err(CryptoError::WrongKeyKind {
                expected: KeyKind::AsymmetricPublic,
                actual: KeyKind::Symmetric,
            })
        ));
    }

    #[test]
    fn test_symmetric_key_length() {
        assert!(matches!(
            SymmetricKey::from_bytes(&[0u8; 16]),
            Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: 16
            })
        ));
    }

    #[test]
    fn test_rejects_other_modulus() {
        let small = RsaPrivateKey::new(&mut StdRng::seed_from_u64(9), 1024).unwrap();
        let der = RsaPublicKey::from(&small).to_public_key_der().unwrap();
        assert!(matches!(
            PublicKey::from_der(der.as_bytes()),
            Err(CryptoError::UnsupportedModulus(1024))
        ));
    }

    #[test]
    fn test_fingerprint_stable() {
        let kp = keypair(2);
        assert_eq!(kp.public().fingerprint(), kp.public().fingerprint());
        assert_eq!(kp.public().fingerprint().len(), 16);
        assert_ne!(kp.public().fingerprint(), keypair(0).public().fingerprint());
    }
}
