//! Anonymous session registration.
//!
//! The web API hands out a usable guest session when presented with an
//! encoded device id: the id is XOR-ed with a fixed key, MD5-hashed, base64
//! encoded, and sent to `/api/register/anonimous`. The session cookies come
//! back in `Set-Cookie` headers.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use md5::{Digest, Md5};
use reqwest::{Client, header::SET_COOKIE};
use serde_json::Value;

use crate::{config, netease, utils};

const DEVICE_ID: &str = "NMUSIC";
const ID_XOR_KEY: &[u8] = b"3go8&$833h0k(2)2";

/// XOR-MD5-base64 encoding of a device id, as the vendor client does it.
pub fn encode_device_id(device_id: &str) -> String {
    let xored: Vec<u8> = device_id
        .bytes()
        .enumerate()
        .map(|(i, byte)| byte ^ ID_XOR_KEY[i % ID_XOR_KEY.len()])
        .collect();
    BASE64.encode(Md5::digest(&xored))
}

/// The `username` parameter for the anonymous register call:
/// `base64("<device_id> <encoded_device_id>")`.
pub fn anonymous_username(device_id: &str) -> String {
    BASE64.encode(format!("{} {}", device_id, encode_device_id(device_id)))
}

/// Registers an anonymous session and returns the captured cookies.
pub async fn authenticate() -> Result<Vec<(String, String)>, String> {
    let url = format!(
        "{}/api/register/anonimous?username={}",
        config::netease_apiurl(),
        urlencoding::encode(&anonymous_username(DEVICE_ID))
    );

    let client = Client::new();
    let response = client
        .get(&url)
        .header("User-Agent", utils::random_user_agent())
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let mut cookies = Vec::new();
    for header in response.headers().get_all(SET_COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        let Some(pair) = raw.split(';').next() else {
            continue;
        };
        if let Some((name, value)) = pair.split_once('=') {
            cookies.push((name.trim().to_string(), value.trim().to_string()));
        }
    }

    let status = response.status().as_u16();
    let body = response.bytes().await.map_err(|e| e.to_string())?.to_vec();

    let json = netease::parse_json_object(Ok(netease::RawReply {
        status,
        mimetype: None,
        body,
    }))
    .map_err(|e| e.to_string())?;

    let code = json.get("code").and_then(Value::as_i64).unwrap_or(0);
    if code != 200 {
        return Err(format!("Anonymous register failed with code {}", code));
    }
    if cookies.is_empty() {
        return Err("No session cookies received.".to_string());
    }

    Ok(cookies)
}
