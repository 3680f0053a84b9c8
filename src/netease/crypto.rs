//! The NetEase request crypto envelope.
//!
//! Every POST to a `/weapi/` endpoint carries its JSON body encrypted with
//! the `weapi` scheme: the body is AES-128-CBC encrypted twice (first with a
//! fixed preset key, then with a fresh random 16-character key), and the
//! random key — reversed — is wrapped with raw RSA under the vendor's public
//! key. The `eapi` scheme (MD5-signed AES-128-ECB) is used by the desktop
//! client for `/eapi/` endpoints and is kept for completeness.

use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit, block_padding::Pkcs7};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use md5::{Digest, Md5};
use rand::Rng;
use rsa::{BigUint, RsaPublicKey, pkcs8::DecodePublicKey, traits::PublicKeyParts};
use serde_json::Value;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes128EcbEnc = ecb::Encryptor<aes::Aes128>;
type Aes128EcbDec = ecb::Decryptor<aes::Aes128>;

const IV: &[u8; 16] = b"0102030405060708";
const PRESET_KEY: &[u8; 16] = b"0CoJUm6Qyw8W8jud";
const EAPI_KEY: &[u8; 16] = b"e82ckenh8dichen8";
const BASE62: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const EAPI_SEPARATOR: &str = "-36cd479b6b5-";

/// The vendor's RSA-1024 public key (SPKI DER, base64).
const PUBLIC_KEY_B64: &str = "MIGfMA0GCSqGSIb3DQEBAQUAA4GNADCBiQKBgQDgtQn2JZ34ZC28NWYpAUd98iZ3\
7BUrX/aKzmFbt7clFSs6sXqHauqKWqdtLkF2KexO40H1YTX8z2lSgBBOAxLsvaklV\
8k4cBFK9snQXE9/DDaFt6Rr7iVZMldczhC0JNgTz+SHXT6CBHuX3e9SdB1Ua44onc\
aTWz7OBGLbCiK45wIDAQAB";

const RSA_BLOCK_LEN: usize = 128;

/// The two form fields of a weapi-encrypted POST body.
#[derive(Debug, Clone)]
pub struct WeapiEnvelope {
    pub params: String,
    pub enc_sec_key: String,
}

/// The single form field of an eapi-encrypted POST body.
#[derive(Debug, Clone)]
pub struct EapiEnvelope {
    pub params: String,
}

/// Encrypts a JSON payload with the weapi scheme.
///
/// A fresh random key is drawn per call, so two envelopes over the same
/// payload differ.
pub fn weapi(payload: &Value) -> Result<WeapiEnvelope, String> {
    let text = serde_json::to_vec(payload).map_err(|e| e.to_string())?;

    let mut secret_key = [0u8; 16];
    let mut rng = rand::rng();
    for byte in secret_key.iter_mut() {
        let drawn: u8 = rng.random();
        *byte = BASE62[drawn as usize % BASE62.len()];
    }

    let first_pass = aes_cbc_encrypt_base64(&text, PRESET_KEY);
    let params = aes_cbc_encrypt_base64(first_pass.as_bytes(), &secret_key);

    secret_key.reverse();
    let enc_sec_key = hex::encode(rsa_encrypt_no_padding(&secret_key)?);

    Ok(WeapiEnvelope {
        params,
        enc_sec_key,
    })
}

/// Encrypts a JSON payload with the eapi scheme for the given endpoint path.
pub fn eapi(url: &str, payload: &Value) -> Result<EapiEnvelope, String> {
    let text = serde_json::to_string(payload).map_err(|e| e.to_string())?;

    let message = format!("nobody{}use{}md5forencrypt", url, text);
    let digest = hex::encode(Md5::digest(message.as_bytes()));

    let data = format!(
        "{url}{sep}{text}{sep}{digest}",
        url = url,
        sep = EAPI_SEPARATOR,
        text = text,
        digest = digest
    );

    let encrypted = Aes128EcbEnc::new(EAPI_KEY.into()).encrypt_padded_vec_mut::<Pkcs7>(data.as_bytes());

    Ok(EapiEnvelope {
        params: hex::encode_upper(encrypted),
    })
}

/// Decrypts an eapi request body back into its endpoint path and payload.
pub fn eapi_req_decrypt(params_hex: &str) -> Result<(String, Value), String> {
    let encrypted = hex::decode(params_hex).map_err(|e| e.to_string())?;
    let decrypted = Aes128EcbDec::new(EAPI_KEY.into())
        .decrypt_padded_vec_mut::<Pkcs7>(&encrypted)
        .map_err(|e| e.to_string())?;
    let text = String::from_utf8(decrypted).map_err(|e| e.to_string())?;

    let mut parts = text.splitn(3, EAPI_SEPARATOR);
    let url = parts.next().unwrap_or_default().to_string();
    let payload_text = parts
        .next()
        .ok_or_else(|| "eapi request body is missing its payload segment".to_string())?;
    let payload: Value = serde_json::from_str(payload_text).map_err(|e| e.to_string())?;

    Ok((url, payload))
}

/// One CBC layer of the weapi envelope.
pub fn aes_cbc_encrypt_base64(plain: &[u8], key: &[u8; 16]) -> String {
    let ciphertext = Aes128CbcEnc::new(key.into(), IV.into()).encrypt_padded_vec_mut::<Pkcs7>(plain);
    BASE64.encode(ciphertext)
}

/// CBC decryption counterpart, used by tests to verify the envelope layers.
pub fn aes_cbc_decrypt_base64(ciphertext_b64: &str, key: &[u8; 16]) -> Result<Vec<u8>, String> {
    let ciphertext = BASE64.decode(ciphertext_b64).map_err(|e| e.to_string())?;
    Aes128CbcDec::new(key.into(), IV.into())
        .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
        .map_err(|e| e.to_string())
}

/// Raw (NO_PADDING) RSA of a short message under the vendor public key.
///
/// The vendor scheme prepends zero bytes up to the 128-byte modulus size and
/// applies the plain `m^e mod n` transform; the padded encrypt APIs cannot
/// express this, so the transform is done over the key parts directly.
fn rsa_encrypt_no_padding(plain: &[u8]) -> Result<Vec<u8>, String> {
    if plain.len() > RSA_BLOCK_LEN {
        return Err("plaintext longer than the RSA modulus".to_string());
    }

    let der = BASE64.decode(PUBLIC_KEY_B64).map_err(|e| e.to_string())?;
    let key = RsaPublicKey::from_public_key_der(&der).map_err(|e| e.to_string())?;

    let mut padded = vec![0u8; RSA_BLOCK_LEN - plain.len()];
    padded.extend_from_slice(plain);

    let message = BigUint::from_bytes_be(&padded);
    let ciphertext = message.modpow(key.e(), key.n());

    let mut out = ciphertext.to_bytes_be();
    while out.len() < RSA_BLOCK_LEN {
        out.insert(0, 0);
    }
    Ok(out)
}
