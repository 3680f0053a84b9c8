use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use serde_json::json;

use ncmcli::netease::auth::{anonymous_username, encode_device_id};
use ncmcli::netease::crypto::{
    aes_cbc_decrypt_base64, aes_cbc_encrypt_base64, eapi, eapi_req_decrypt, weapi,
};

#[test]
fn weapi_envelope_has_the_expected_shape() {
    let payload = json!({"s": "never gonna", "type": "1"});
    let envelope = weapi(&payload).unwrap();

    // params is valid base64 ciphertext.
    let decoded = BASE64.decode(&envelope.params).unwrap();
    assert!(!decoded.is_empty());
    assert_eq!(decoded.len() % 16, 0);

    // encSecKey is the hex of a 128-byte RSA block.
    assert_eq!(envelope.enc_sec_key.len(), 256);
    assert!(envelope.enc_sec_key.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn weapi_uses_a_fresh_key_per_call() {
    let payload = json!({"s": "x"});
    let first = weapi(&payload).unwrap();
    let second = weapi(&payload).unwrap();

    assert_ne!(first.params, second.params);
    assert_ne!(first.enc_sec_key, second.enc_sec_key);
}

#[test]
fn cbc_layer_round_trips() {
    let key = b"0123456789abcdef";
    let ciphertext = aes_cbc_encrypt_base64(b"some payload text", key);
    let plain = aes_cbc_decrypt_base64(&ciphertext, key).unwrap();
    assert_eq!(plain, b"some payload text");
}

#[test]
fn eapi_envelope_round_trips_through_the_request_decryptor() {
    let payload = json!({"ids": "[42]", "level": "exhigh"});
    let envelope = eapi("/api/song/enhance/player/url/v1", &payload).unwrap();

    // Hex, uppercase, block-aligned.
    assert!(envelope.params.chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(envelope.params.len() % 32, 0);

    let (url, decoded) = eapi_req_decrypt(&envelope.params).unwrap();
    assert_eq!(url, "/api/song/enhance/player/url/v1");
    assert_eq!(decoded, payload);
}

#[test]
fn device_id_encoding_is_deterministic() {
    assert_eq!(encode_device_id("NMUSIC"), encode_device_id("NMUSIC"));
    assert_ne!(encode_device_id("NMUSIC"), encode_device_id("OTHER"));

    // An MD5 digest base64-encodes to 24 characters.
    assert_eq!(encode_device_id("NMUSIC").len(), 24);
}

#[test]
fn anonymous_username_wraps_the_encoded_id() {
    let username = anonymous_username("NMUSIC");
    let decoded = BASE64.decode(&username).unwrap();
    let text = String::from_utf8(decoded).unwrap();

    assert!(text.starts_with("NMUSIC "));
    assert_eq!(text.len(), "NMUSIC ".len() + 24);
}
