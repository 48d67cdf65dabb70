//! Address moderation.
//!
//! Inbound message content is expected to be a single Ethereum address.
//! Moderation checks the address format and then looks the address up in a
//! static blacklist. Lookups ignore case, matching how wallets render
//! checksummed addresses.

mod blacklist;
mod result;

pub use blacklist::BlacklistSet;
pub use result::{ModerationResult, ModerationStatus, MAX_ECHOED_CONTENT};

use chrono::Utc;

use crate::error::ValidationError;

/// Number of hex digits following the `0x` prefix.
pub const ADDRESS_HEX_LEN: usize = 40;

/// Check that `content` is `0x` followed by exactly 40 hex digits.
///
/// The digits may be either case. The prefix must be lower-case `0x`.
pub fn validate_format(content: &str) -> bool {
    match content.strip_prefix("0x") {
        Some(digits) => {
            digits.len() == ADDRESS_HEX_LEN && digits.bytes().all(|b| b.is_ascii_hexdigit())
        }
        None => false,
    }
}

/// Like [`validate_format`], but returns the lower-cased address on success.
pub fn normalize_address(content: &str) -> Result<String, ValidationError> {
    if validate_format(content) {
        Ok(content.to_ascii_lowercase())
    } else {
        Err(ValidationError::InvalidAddressFormat(content.to_string()))
    }
}

/// Case-insensitive blacklist membership.
pub fn check_blacklist(address: &str, blacklist: &BlacklistSet) -> bool {
    blacklist.contains(address)
}

/// Run the full moderation rule over one piece of content.
///
/// The returned result echoes `content` exactly as received.
pub fn moderate(content: &str, blacklist: &BlacklistSet) -> ModerationResult {
    let timestamp = Utc::now();
    match normalize_address(content) {
        Ok(normalized) => {
            ModerationResult::success(content, check_blacklist(&normalized, blacklist), timestamp)
        }
        Err(e) => ModerationResult::error(content, e.public_message(), timestamp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCKED: &str = "0x8576acc5c05d6ce88f4e49bf65bdf0c62f91353c";
    const CLEAN: &str = "0x1234567890abcdef1234567890abcdef12345678";

    fn blacklist() -> BlacklistSet {
        BlacklistSet::from_addresses([BLOCKED])
    }

    #[test]
    fn test_validate_format() {
        assert!(validate_format(CLEAN));
        assert!(validate_format("0xABCDEFabcdef0123456789ABCDEFabcdef012345"));

        assert!(!validate_format("not-an-address"));
        assert!(!validate_format(""));
        assert!(!validate_format("0x"));
        // 39 and 41 digits
        assert!(!validate_format(&CLEAN[..41]));
        assert!(!validate_format(&format!("{}0", CLEAN)));
        // Upper-case prefix is not accepted.
        assert!(!validate_format(&CLEAN.replacen("0x", "0X", 1)));
        // Missing prefix
        assert!(!validate_format(&CLEAN[2..]));
        assert!(!validate_format("0x123456789gabcdef1234567890abcdef12345678"));
        assert!(!validate_format(&format!(" {}", CLEAN)));
    }

    #[test]
    fn test_normalize_address() {
        let mixed = "0xABCDEFabcdef0123456789ABCDEFabcdef012345";
        assert_eq!(normalize_address(mixed).unwrap(), mixed.to_lowercase());
        assert!(matches!(
            normalize_address("nope"),
            Err(ValidationError::InvalidAddressFormat(ref s)) if s == "nope"
        ));
    }

    #[test]
    fn test_check_blacklist_ignores_case() {
        let set = blacklist();
        for candidate in [BLOCKED.to_string(), BLOCKED.to_uppercase(), CLEAN.to_string()] {
            assert_eq!(
                check_blacklist(&candidate, &set),
                check_blacklist(&candidate.to_lowercase(), &set)
            );
        }
        assert!(check_blacklist(BLOCKED, &set));
        assert!(!check_blacklist(CLEAN, &set));
    }

    #[test]
    fn test_moderate_clean_address() {
        let result = moderate(CLEAN, &blacklist());
        assert_eq!(result.status, ModerationStatus::Success);
        assert_eq!(result.address, CLEAN);
        assert!(!result.is_blacklisted);
        assert!(result.message.is_none());
    }

    #[test]
    fn test_moderate_invalid_content() {
        let result = moderate("not-an-address", &blacklist());
        assert_eq!(result.status, ModerationStatus::Error);
        assert_eq!(result.address, "not-an-address");
        assert_eq!(result.message.as_deref(), Some("Invalid Ethereum address format"));
        assert!(!result.is_blacklisted);
    }

    #[test]
    fn test_moderate_upper_case_blacklisted() {
        // Keep the lower-case prefix so the format rule still passes.
        let shouted = format!("0x{}", BLOCKED[2..].to_uppercase());
        let result = moderate(&shouted, &blacklist());
        assert_eq!(result.status, ModerationStatus::Success);
        assert!(result.is_blacklisted);
        assert_eq!(result.address, shouted);
    }
}
