use md5::{Digest, Md5};

/// Mailchimp identifies list members by the MD5 hex digest of the
/// lower-cased email address.
pub fn email_hash(email_address: &str) -> String {
    let formatted = email_address.to_lowercase();
    hex::encode(Md5::digest(formatted.as_bytes()))
}
