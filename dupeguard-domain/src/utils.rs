use chrono::{DateTime, TimeZone, Utc};
use sha2::{Digest, Sha256};

pub fn current_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn millis_to_utc(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

pub fn millis_to_rfc3339(ms: i64) -> String {
    millis_to_utc(ms).to_rfc3339()
}

pub fn sha256_hex(input: &[u8]) -> String {
    to_hex(&Sha256::digest(input))
}

pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}
