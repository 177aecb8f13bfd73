//! Key layout and encoding utilities for the Fjall backend
//!
//! Partition structure:
//! - `values`: {key} -> {expires_at_nanos:u64 BE}{payload}   (0 = never expires)
//! - `scores`: {set}\0{score:8 sortable BE}{member} -> empty
//! - `members`: {set}\0{member} -> {score:8 sortable BE}
//!
//! Scores are stored with the sign bit flipped so that big-endian byte order
//! matches numeric order for negative scores too.

const SEPARATOR: u8 = 0;
const SCORE_LEN: usize = 8;
const EXPIRY_LEN: usize = 8;

/// Encode a score so lexicographic order equals numeric order
pub fn encode_score(score: i64) -> [u8; SCORE_LEN] {
    ((score as u64) ^ (1 << 63)).to_be_bytes()
}

pub fn decode_score(bytes: &[u8]) -> Option<i64> {
    let raw: [u8; SCORE_LEN] = bytes.try_into().ok()?;
    Some((u64::from_be_bytes(raw) ^ (1 << 63)) as i64)
}

/// Encode a set prefix for range scans: {set}\0
pub fn encode_set_prefix(set: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(set.len() + 1);
    key.extend_from_slice(set.as_bytes());
    key.push(SEPARATOR);
    key
}

/// Encode a score-ordered entry: {set}\0{score}{member}
pub fn encode_score_key(set: &str, score: i64, member: &str) -> Vec<u8> {
    let mut key = encode_set_prefix(set);
    key.extend_from_slice(&encode_score(score));
    key.extend_from_slice(member.as_bytes());
    key
}

/// Decode a score-ordered entry back into (score, member)
pub fn decode_score_key(set: &str, key: &[u8]) -> Option<(i64, String)> {
    let rest = key.strip_prefix(encode_set_prefix(set).as_slice())?;
    if rest.len() < SCORE_LEN {
        return None;
    }
    let (score, member) = rest.split_at(SCORE_LEN);
    let score = decode_score(score)?;
    let member = std::str::from_utf8(member).ok()?.to_string();
    Some((score, member))
}

/// Encode a member lookup key: {set}\0{member}
pub fn encode_member_key(set: &str, member: &str) -> Vec<u8> {
    let mut key = encode_set_prefix(set);
    key.extend_from_slice(member.as_bytes());
    key
}

/// Encode a stored value with its absolute expiry
pub fn encode_value(expires_at_nanos: u64, payload: &[u8]) -> Vec<u8> {
    let mut value = Vec::with_capacity(EXPIRY_LEN + payload.len());
    value.extend_from_slice(&expires_at_nanos.to_be_bytes());
    value.extend_from_slice(payload);
    value
}

/// Decode a stored value into (expires_at_nanos, payload)
pub fn decode_value(value: &[u8]) -> Option<(u64, &[u8])> {
    if value.len() < EXPIRY_LEN {
        return None;
    }
    let (expiry, payload) = value.split_at(EXPIRY_LEN);
    let expiry = u64::from_be_bytes(expiry.try_into().ok()?);
    Some((expiry, payload))
}
