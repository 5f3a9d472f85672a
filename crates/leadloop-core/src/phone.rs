// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phone number canonicalization.
//!
//! Every number stored or compared anywhere in leadloop goes through
//! [`normalize`] first: the canonical form is `+` followed by digits only.

/// Canonicalize an arbitrary phone string.
///
/// Strips everything that is not an ASCII digit and prefixes the result
/// with `+`. Returns the empty string when the input carries no digits.
/// Idempotent: normalizing an already-normalized number is a no-op.
pub fn normalize(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        String::new()
    } else {
        format!("+{digits}")
    }
}

/// Whether a normalized number is long enough to be a real destination.
///
/// Filters out extension-only and obviously truncated values coming from
/// free-text CRM phone fields. Requires more than eight digits.
pub fn is_plausible(normalized: &str) -> bool {
    normalized.strip_prefix('+').is_some_and(|d| d.len() > 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_formatting() {
        assert_eq!(normalize("+55 61 9999-8888"), "+556199998888");
        assert_eq!(normalize("(11) 99999 8888"), "+11999998888");
    }

    #[test]
    fn empty_and_digitless_inputs_yield_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("n/a"), "");
        assert_eq!(normalize("+ -"), "");
    }

    #[test]
    fn idempotent() {
        for raw in ["+55 32 99174-9187", "sem telefone", "+5532991749187"] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn output_shape_is_plus_then_digits() {
        let out = normalize("tel: +55 (32) 98402-1870 ramal 4");
        let digits = out.strip_prefix('+').unwrap();
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn plausibility_requires_more_than_eight_digits() {
        assert!(is_plausible("+5532991749187"));
        assert!(!is_plausible("+12345678"));
        assert!(!is_plausible(""));
        assert!(!is_plausible("+"));
    }
}
