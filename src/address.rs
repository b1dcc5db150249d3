//! A1-style cell references. Rows and columns are zero-based everywhere in the
//! crate; only the rendered reference is one-based ("A1" is `(0, 0)`).

/// Largest column index a worksheet can hold (XFD).
pub const MAX_COLUMN: u32 = 16_383;

/// Zero-based column index to letters: 0 -> "A", 25 -> "Z", 26 -> "AA".
pub fn column_name(col: u32) -> String {
    let mut n = col + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8_lossy(&letters).into_owned()
}

/// Column letters to a zero-based index. Case-insensitive.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut acc: u32 = 0;
    for ch in letters.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        acc = acc.checked_mul(26)?.checked_add(digit)?;
    }
    let col = acc - 1;
    (col <= MAX_COLUMN).then_some(col)
}

pub fn encode_cell(row: u32, col: u32) -> String {
    format!("{}{}", column_name(col), row + 1)
}

/// Parses "F7" into `(6, 5)`. Absolute markers (`$F$7`) are not accepted; cell
/// references inside worksheet parts never carry them.
pub fn decode_cell(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    let col = column_index(letters)?;
    if !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_name() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(5), "F");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
        assert_eq!(column_name(MAX_COLUMN), "XFD");
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("f"), Some(5));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index("XFD"), Some(MAX_COLUMN));
        assert_eq!(column_index("XFE"), None);
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
    }

    #[test]
    fn test_encode_cell() {
        assert_eq!(encode_cell(0, 0), "A1");
        assert_eq!(encode_cell(6, 5), "F7");
        assert_eq!(encode_cell(99, 27), "AB100");
    }

    #[test]
    fn test_decode_cell() {
        assert_eq!(decode_cell("A1"), Some((0, 0)));
        assert_eq!(decode_cell("F7"), Some((6, 5)));
        assert_eq!(decode_cell("ab100"), Some((99, 27)));
    }

    #[test]
    fn test_decode_cell_rejects_malformed() {
        assert_eq!(decode_cell(""), None);
        assert_eq!(decode_cell("F"), None);
        assert_eq!(decode_cell("7"), None);
        assert_eq!(decode_cell("F0"), None);
        assert_eq!(decode_cell("F7X"), None);
        assert_eq!(decode_cell("$F$7"), None);
    }
}
