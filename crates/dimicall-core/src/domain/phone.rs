const COUNTRY_PREFIX: &str = "+33";

/// Rewrites a French phone number into `+33 X XX XX XX XX`.
///
/// Accepted shapes, once everything but digits and `+` is dropped:
/// `+33` + 9 digits, `+330` + 9 digits, `33` + 9 digits, `0` + 9 digits and a
/// bare 9-digit number starting with 1 to 7. Anything else is returned as is.
pub fn canonicalize_phone(value: &str) -> String {
    match national_digits(value) {
        Some(digits) => format_grouped(&digits),
        None => value.to_string(),
    }
}

pub fn is_canonical_phone(value: &str) -> bool {
    canonicalize_phone(value) == value && national_digits(value).is_some()
}

fn national_digits(value: &str) -> Option<String> {
    let cleaned: String = value
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '+')
        .collect();

    let national = if let Some(rest) = cleaned.strip_prefix(COUNTRY_PREFIX) {
        rest.strip_prefix('0').unwrap_or(rest)
    } else if let Some(rest) = cleaned.strip_prefix("33").filter(|rest| rest.len() == 9) {
        rest
    } else if let Some(rest) = cleaned.strip_prefix('0').filter(|rest| rest.len() == 9) {
        rest
    } else if cleaned.len() == 9 && cleaned.starts_with(['1', '2', '3', '4', '5', '6', '7']) {
        cleaned.as_str()
    } else {
        return None;
    };

    if national.len() == 9 && national.bytes().all(|b| b.is_ascii_digit()) {
        Some(national.to_string())
    } else {
        None
    }
}

fn format_grouped(digits: &str) -> String {
    let mut out = String::with_capacity(17);
    out.push_str(COUNTRY_PREFIX);
    out.push(' ');
    out.push_str(&digits[..1]);
    for pair in digits.as_bytes()[1..].chunks(2) {
        out.push(' ');
        out.extend(pair.iter().map(|b| char::from(*b)));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{canonicalize_phone, is_canonical_phone};
    use proptest::prelude::*;

    const CANONICAL: &str = "+33 6 12 34 56 78";

    #[test]
    fn recognized_shapes_share_one_canonical_form() {
        for input in [
            "0612345678",
            "+33612345678",
            "33 6 12 34 56 78",
            "+330612345678",
            "612345678",
            "+33 (0)6 12 34 56 78",
            "06.12.34.56.78",
            "06-12-34-56-78",
            CANONICAL,
        ] {
            assert_eq!(canonicalize_phone(input), CANONICAL, "input {input:?}");
        }
    }

    #[test]
    fn fixed_lines_are_grouped() {
        assert_eq!(canonicalize_phone("0145678901"), "+33 1 45 67 89 01");
        assert_eq!(canonicalize_phone("145678901"), "+33 1 45 67 89 01");
    }

    #[test]
    fn unrecognized_values_pass_through() {
        for input in [
            "",
            "n/a",
            "12345",
            "+44 20 7946 0958",
            "0033612345678",
            "812345678",
            "+33 6 12 34 56 7",
            "  0612 ",
        ] {
            assert_eq!(canonicalize_phone(input), input, "input {input:?}");
        }
    }

    #[test]
    fn canonical_check_requires_grouped_form() {
        assert!(is_canonical_phone(CANONICAL));
        assert!(!is_canonical_phone("0612345678"));
        assert!(!is_canonical_phone("hello"));
    }

    proptest! {
        #[test]
        fn mobile_numbers_canonicalize_from_every_shape(
            lead in 6u8..=7,
            rest in proptest::collection::vec(0u8..=9, 8),
        ) {
            let digits: String = std::iter::once(lead)
                .chain(rest)
                .map(|d| char::from(b'0' + d))
                .collect();
            let expected = canonicalize_phone(&format!("0{digits}"));
            prop_assert!(is_canonical_phone(&expected));
            prop_assert_eq!(canonicalize_phone(&format!("+33{digits}")), expected.clone());
            prop_assert_eq!(canonicalize_phone(&format!("33{digits}")), expected.clone());
            prop_assert_eq!(canonicalize_phone(&digits), expected);
        }

        #[test]
        fn strings_without_digits_are_left_alone(input in "[^0-9]*") {
            prop_assert_eq!(canonicalize_phone(&input), input);
        }

        #[test]
        fn short_digit_runs_are_left_alone(input in "[0-9]{1,7}") {
            prop_assert_eq!(canonicalize_phone(&input), input);
        }
    }
}
