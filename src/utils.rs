//! Utility functions for identifiers

use bech32::Bech32m;
use uuid7::uuid7;

// construct a unique id then encode using bech32
pub fn new_uuid_to_bech32(hrp: &str) -> anyhow::Result<String> {
    let hrp = bech32::Hrp::parse(hrp)?;
    let encode = bech32::encode::<Bech32m>(hrp, uuid7().as_bytes())?;
    Ok(encode)
}

/// Fresh identifier for a request record, `request1...`
pub fn new_request_id() -> anyhow::Result<String> {
    new_uuid_to_bech32("request")
}

/// Fresh identifier for an audit record, `audit1...`
pub fn new_audit_id() -> anyhow::Result<String> {
    new_uuid_to_bech32("audit")
}

/// Substring containment honouring the configured case sensitivity.
///
/// Returns the byte offset of the first occurrence, mirroring how group names
/// are matched against their canonical fragments.
pub fn find_fragment(haystack: &str, fragment: &str, case_sensitive: bool) -> Option<usize> {
    if case_sensitive {
        haystack.find(fragment)
    } else {
        haystack
            .to_ascii_uppercase()
            .find(fragment.to_ascii_uppercase().as_str())
    }
}
