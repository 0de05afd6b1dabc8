//! Canonicalization of identity attributes.
//!
//! Duplicate detection never compares raw user input. Emails and phone
//! numbers are first brought into a canonical form so that equivalent
//! values compare equal. Both functions are pure, total, and idempotent:
//! `normalize(normalize(x)) == normalize(x)`.

/// Canonicalize an email address for comparison: trim and lowercase.
#[must_use]
pub fn email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Canonicalize a phone number for comparison.
///
/// Keeps digits and a leading `+` only; every other character (spaces,
/// dashes, parentheses) is stripped. Returns `None` when the input is
/// empty or contains no digits at all.
#[must_use]
pub fn phone(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut out = String::with_capacity(trimmed.len());
    for (i, c) in trimmed.chars().enumerate() {
        if c.is_ascii_digit() || (c == '+' && i == 0) {
            out.push(c);
        }
    }

    if out.chars().any(|c| c.is_ascii_digit()) {
        Some(out)
    } else {
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_email_lowercases_and_trims() {
        assert_eq!(email("Foo@Bar.COM"), "foo@bar.com");
        assert_eq!(email("  alice@test.com  "), "alice@test.com");
    }

    #[test]
    fn test_email_idempotent() {
        let once = email(" MiXeD@Case.Org ");
        assert_eq!(email(&once), once);
    }

    #[test]
    fn test_phone_strips_formatting() {
        assert_eq!(phone("+254 700 000-000").unwrap(), "+254700000000");
        assert_eq!(phone("(020) 123 4567").unwrap(), "0201234567");
    }

    #[test]
    fn test_phone_keeps_only_leading_plus() {
        assert_eq!(phone("+1+2+3").unwrap(), "+123");
        assert_eq!(phone("12+34").unwrap(), "1234");
    }

    #[test]
    fn test_phone_rejects_empty_and_digitless() {
        assert!(phone("").is_none());
        assert!(phone("   ").is_none());
        assert!(phone("n/a").is_none());
        assert!(phone("+").is_none());
    }

    #[test]
    fn test_phone_idempotent() {
        let once = phone("+254 700 000 000").unwrap();
        assert_eq!(phone(&once).unwrap(), once);
    }
}
