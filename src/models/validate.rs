//! Checks we run on names before they ever get near a record.

use crate::error::{RError, RResult};

/// Keys the backend owns. They live in the record's identity, never in its
/// fields.
pub static RESERVED_KEYS: &'static [&'static str] = &["objectId", "createdAt", "updatedAt", "ACL"];

/// A class name is any alphanumeric string (underscores allowed) that begins
/// with a letter.
pub fn class_name(name: &str) -> RResult<()> {
    let mut chars = name.chars();
    let starts_ok = match chars.next() {
        Some(c) => c.is_ascii_alphabetic(),
        None => false,
    };
    if !starts_ok || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(RError::Validation(format!("bad class name: {:?}", name)));
    }
    Ok(())
}

/// Field keys must be non-empty and not one of the reserved keys.
pub fn field_key(key: &str) -> RResult<()> {
    if key.is_empty() {
        return Err(RError::Validation(String::from("field keys cannot be empty")));
    }
    if RESERVED_KEYS.contains(&key) {
        return Err(RError::Validation(format!("field key {:?} is reserved", key)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_names() {
        assert!(class_name("Note").is_ok());
        assert!(class_name("Game_Score2").is_ok());
        assert!(class_name("").is_err());
        assert!(class_name("2fast").is_err());
        assert!(class_name("_User").is_err());
        assert!(class_name("has space").is_err());
    }

    #[test]
    fn keys() {
        assert!(field_key("title").is_ok());
        assert!(field_key("").is_err());
        assert!(field_key("objectId").is_err());
        assert!(field_key("ACL").is_err());
    }
}
