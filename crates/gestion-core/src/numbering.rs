//! # Document Numbering
//!
//! Human-readable numbers printed on tickets and billing documents:
//!
//! ```text
//! V-20261017-0001   sale ticket
//! R-20261017-0001   return
//! F-20261017-0001   invoice (facture)
//! D-20261017-0001   quote (devis)
//! │ │        │
//! │ │        └── per-day sequence, zero padded to 4 digits
//! │ └─────────── calendar day (local store date)
//! └───────────── document kind
//! ```
//!
//! Printed tickets and historical reports depend on this format.
//! Sequences past 9999 simply widen.
//!
//! Only formatting lives here. Picking a free sequence (count of the day
//! plus one, re-checked against existing rows) is done by gestion-db inside
//! the transaction that inserts the document.

use chrono::NaiveDate;

/// Kind of numbered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    Sale,
    Return,
    Invoice,
    Quote,
}

impl DocumentKind {
    pub const fn letter(&self) -> char {
        match self {
            DocumentKind::Sale => 'V',
            DocumentKind::Return => 'R',
            DocumentKind::Invoice => 'F',
            DocumentKind::Quote => 'D',
        }
    }
}

/// Prefix shared by every number of `kind` issued on `date`, e.g.
/// `V-20261017-`.
pub fn day_prefix(kind: DocumentKind, date: NaiveDate) -> String {
    format!("{}-{}-", kind.letter(), date.format("%Y%m%d"))
}

/// Formats a full document number.
///
/// ```rust
/// use chrono::NaiveDate;
/// use gestion_core::numbering::{format_number, DocumentKind};
///
/// let date = NaiveDate::from_ymd_opt(2026, 10, 17).unwrap();
/// assert_eq!(format_number(DocumentKind::Sale, date, 7), "V-20261017-0007");
/// ```
pub fn format_number(kind: DocumentKind, date: NaiveDate, sequence: i64) -> String {
    format!("{}{:04}", day_prefix(kind, date), sequence)
}

/// A document number split back into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedNumber {
    pub kind: DocumentKind,
    pub date: NaiveDate,
    pub sequence: i64,
}

/// Parses a number produced by [`format_number`]. Returns `None` when the
/// text is not a well-formed document number.
pub fn parse_number(number: &str) -> Option<ParsedNumber> {
    let mut parts = number.splitn(3, '-');
    let kind = match parts.next()? {
        "V" => DocumentKind::Sale,
        "R" => DocumentKind::Return,
        "F" => DocumentKind::Invoice,
        "D" => DocumentKind::Quote,
        _ => return None,
    };

    let date_part = parts.next()?;
    if date_part.len() != 8 {
        return None;
    }
    let date = NaiveDate::parse_from_str(date_part, "%Y%m%d").ok()?;

    let seq_part = parts.next()?;
    if seq_part.len() < 4 || !seq_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let sequence = seq_part.parse().ok()?;

    Some(ParsedNumber {
        kind,
        date,
        sequence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 5).unwrap()
    }

    #[test]
    fn test_prefixes() {
        assert_eq!(day_prefix(DocumentKind::Sale, day()), "V-20260305-");
        assert_eq!(day_prefix(DocumentKind::Return, day()), "R-20260305-");
        assert_eq!(day_prefix(DocumentKind::Invoice, day()), "F-20260305-");
        assert_eq!(day_prefix(DocumentKind::Quote, day()), "D-20260305-");
    }

    #[test]
    fn test_padding_and_overflow() {
        assert_eq!(format_number(DocumentKind::Return, day(), 1), "R-20260305-0001");
        assert_eq!(format_number(DocumentKind::Sale, day(), 12345), "V-20260305-12345");
    }

    #[test]
    fn test_parse() {
        let parsed = parse_number("F-20260305-0042").unwrap();
        assert_eq!(parsed.kind, DocumentKind::Invoice);
        assert_eq!(parsed.date, day());
        assert_eq!(parsed.sequence, 42);

        assert!(parse_number("X-20260305-0001").is_none());
        assert!(parse_number("V-2026035-0001").is_none());
        assert!(parse_number("V-20261345-0001").is_none());
        assert!(parse_number("V-20260305-12").is_none());
        assert!(parse_number("V-20260305").is_none());
    }
}
