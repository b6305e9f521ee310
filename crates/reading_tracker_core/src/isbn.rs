//! ISBN checks. Books store ISBN-13 only; an ISBN-10 is accepted and converted.

/// Drops spaces and hyphens and upper-cases the ISBN-10 check character.
pub fn strip_isbn(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

pub fn is_valid_isbn10(isbn: &str) -> bool {
    let bytes = isbn.as_bytes();
    if bytes.len() != 10
        || !bytes[..9].iter().all(u8::is_ascii_digit)
        || !(bytes[9].is_ascii_digit() || bytes[9] == b'X')
    {
        return false;
    }

    let sum: u32 = bytes
        .iter()
        .enumerate()
        .map(|(i, b)| {
            let value = if *b == b'X' { 10 } else { u32::from(b - b'0') };
            value * (10 - i as u32)
        })
        .sum();
    sum % 11 == 0
}

fn isbn13_check_digit(first_twelve: &[u8]) -> u8 {
    let sum: u32 = first_twelve
        .iter()
        .enumerate()
        .map(|(i, b)| u32::from(b - b'0') * if i % 2 == 0 { 1 } else { 3 })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

pub fn is_valid_isbn13(isbn: &str) -> bool {
    let bytes = isbn.as_bytes();
    bytes.len() == 13
        && bytes.iter().all(u8::is_ascii_digit)
        && isbn13_check_digit(&bytes[..12]) == bytes[12] - b'0'
}

/// Expects a valid ISBN-10.
pub fn isbn10_to_isbn13(isbn10: &str) -> String {
    let mut isbn13 = format!("978{}", &isbn10[..9]);
    let check = isbn13_check_digit(isbn13.as_bytes());
    isbn13.push(char::from(b'0' + check));
    isbn13
}

/// The ISBN-13 form of `input`, or `None` when it is neither a valid
/// ISBN-10 nor a valid ISBN-13.
pub fn to_isbn13(input: &str) -> Option<String> {
    let isbn = strip_isbn(input);
    if is_valid_isbn13(&isbn) {
        Some(isbn)
    } else if is_valid_isbn10(&isbn) {
        Some(isbn10_to_isbn13(&isbn))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isbn13_checksums() {
        assert!(is_valid_isbn13("9780441172719"));
        assert!(!is_valid_isbn13("9780441172718"));
        assert!(!is_valid_isbn13("978044117271"));
        assert!(!is_valid_isbn13("97804411727X9"));
    }

    #[test]
    fn isbn10_checksums_allow_x() {
        assert!(is_valid_isbn10("0441172717"));
        assert!(is_valid_isbn10("080442957X"));
        assert!(!is_valid_isbn10("0441172718"));
        assert!(!is_valid_isbn10("X441172717"));
    }

    #[test]
    fn inputs_are_normalized_to_isbn13() {
        assert_eq!(to_isbn13("978-0-441-17271-9").as_deref(), Some("9780441172719"));
        assert_eq!(to_isbn13("0 441 17271 7").as_deref(), Some("9780441172719"));
        assert_eq!(to_isbn13("0-8044-2957-x").as_deref(), Some("9780804429573"));
        assert_eq!(to_isbn13("12-34"), None);
    }
}
