//! Display-handle derivation.
//!
//! A handle is the lower-cased ASCII alphanumeric runs of the first and last
//! name joined with `-`, e.g. `"Ada", "Lovelace"` becomes `ada-lovelace`.
//! The derivation is pure; uniqueness is enforced by the store.

/// Used when neither name contains anything URL-safe
pub const FALLBACK_HANDLE: &str = "user";

/// Derive the handle for a name pair
pub fn generate_handle(first_name: &str, last_name: &str) -> String {
    let handle = [first_name, last_name]
        .iter()
        .flat_map(|name| segments(name))
        .collect::<Vec<_>>()
        .join("-");

    if handle.is_empty() {
        FALLBACK_HANDLE.to_string()
    } else {
        handle
    }
}

fn segments(name: &str) -> Vec<String> {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_ascii_lowercase())
        .collect()
}
