pub mod logging;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Generate a unique session token: timestamp prefix plus random suffix.
pub fn generate_session_id() -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let random_str: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("{}_{}", timestamp, random_str)
}

/// Hash a raw device fingerprint before storing it. Raw fingerprints never
/// leave the registration path.
pub fn hash_fingerprint(fingerprint: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(fingerprint.as_bytes());
    hex_encode(&hasher.finalize())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Mobile numbers on the verification surface must be exactly ten digits.
pub fn is_valid_mobile(mobile: &str) -> bool {
    mobile.len() == 10 && mobile.chars().all(|c| c.is_ascii_digit())
}

/// Headless-browser signatures in the user agent mark the device as an
/// emulator for scoring purposes.
pub fn is_headless_user_agent(user_agent: &str) -> bool {
    let ua = user_agent.to_lowercase();
    ua.contains("headless") || ua.contains("phantomjs") || ua.contains("electron")
}

/// Mask a mobile number for log output, keeping the first and last two
/// digits.
pub fn mask_mobile(mobile: &str) -> String {
    if mobile.len() < 4 {
        return "****".to_string();
    }
    format!("{}****{}", &mobile[..2], &mobile[mobile.len() - 2..])
}

/// Mask a personal name for log output, keeping initials only.
pub fn mask_name(name: &str) -> String {
    name.split_whitespace()
        .filter_map(|part| part.chars().next())
        .map(|c| format!("{}***", c))
        .collect::<Vec<_>>()
        .join(" ")
}
