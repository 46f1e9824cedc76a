//! Resource-name safety.
//!
//! A resource name is safe iff it is non-empty and equal to its own
//! IDNA-ASCII form. This keeps names byte-stable across clients: two
//! parties that agree on a name string agree on every derived chunk key.

use thiserror::Error;

/// Error converting a name to its IDNA-ASCII form.
#[derive(Debug, Error)]
#[error("Name '{name}' has no IDNA-ASCII form")]
pub struct NameError {
    /// The offending name.
    pub name: String,
}

/// Converts a name to its IDNA-ASCII form.
///
/// Unicode names such as `"føø.bar"` convert to their punycode rendering;
/// names already in ASCII are lowercased where IDNA mandates it.
pub fn to_safe_name(name: &str) -> Result<String, NameError> {
    idna::domain_to_ascii(name).map_err(|_| NameError {
        name: name.to_string(),
    })
}

/// Returns true iff the name is non-empty and equals its own IDNA-ASCII form.
pub fn is_safe_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    match idna::domain_to_ascii(name) {
        Ok(ascii) => ascii == name,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_name_is_safe() {
        assert!(is_safe_name("foo.bar"));
        assert!(is_safe_name("a"));
    }

    #[test]
    fn test_empty_name_is_unsafe() {
        assert!(!is_safe_name(""));
    }

    #[test]
    fn test_uppercase_name_is_unsafe() {
        // IDNA lowercases, so the ASCII form differs from the input.
        assert!(!is_safe_name("Foo.Bar"));
        assert_eq!(to_safe_name("Foo.Bar").unwrap(), "foo.bar");
    }

    #[test]
    fn test_unicode_name_is_unsafe_but_convertible() {
        assert!(!is_safe_name("føø.bar"));
        let ascii = to_safe_name("føø.bar").unwrap();
        assert!(ascii.starts_with("xn--"));
        assert!(is_safe_name(&ascii));
    }
}
