//! Short quiz identifiers
//!
//! A quiz id is the leading `length` base-62 digits of a random v4 UUID's
//! integer value. Ids are short and printable but not guaranteed unique;
//! the repository checks for collisions before saving.

use uuid::Uuid;

pub const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Base-62 rendering of `num`, most significant digit first
pub fn to_base62(mut num: u128) -> String {
    if num == 0 {
        return (BASE62_ALPHABET[0] as char).to_string();
    }

    let mut digits = Vec::new();
    while num > 0 {
        digits.push(BASE62_ALPHABET[(num % 62) as usize]);
        num /= 62;
    }
    digits.iter().rev().map(|&b| b as char).collect()
}

/// Leading `length` base-62 digits of `uuid`
pub fn short_id_from_uuid(uuid: Uuid, length: usize) -> String {
    to_base62(uuid.as_u128()).chars().take(length).collect()
}

/// A fresh random quiz id
pub fn new_quiz_id(length: usize) -> String {
    short_id_from_uuid(Uuid::new_v4(), length)
}
