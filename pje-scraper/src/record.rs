//! Judicial process numbers and extracted party data.
//!
//! Brazilian case numbers follow the CNJ standard: 20 digits rendered as
//! `NNNNNNN-DD.AAAA.J.TR.OOOO` (sequence, check digits, year, branch,
//! tribunal, originating unit).

use serde::Serialize;

/// Canonical length of a CNJ process number.
pub const PROCESS_NUMBER_LEN: usize = 20;

/// Strip non-digits and normalize to exactly 20 characters: shorter inputs
/// are left-padded with zeros, longer ones keep their leading 20 digits.
pub fn normalize_digits(raw: &str) -> String {
    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < PROCESS_NUMBER_LEN {
        let mut padded = "0".repeat(PROCESS_NUMBER_LEN - digits.len());
        padded.push_str(&digits);
        digits = padded;
    } else {
        digits.truncate(PROCESS_NUMBER_LEN);
    }
    digits
}

/// A process number in canonical 20-digit form. Equality and hashing work
/// on the canonical digits, so the same case collected from differently
/// formatted cells deduplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProcessRecord(String);

impl ProcessRecord {
    pub fn parse(raw: &str) -> Self {
        Self(normalize_digits(raw))
    }

    pub fn digits(&self) -> &str {
        &self.0
    }

    /// CNJ display form, e.g. `0000001-02.2023.8.05.0001`.
    pub fn formatted(&self) -> String {
        let d = &self.0;
        format!(
            "{}-{}.{}.{}.{}.{}",
            &d[0..7],
            &d[7..9],
            &d[9..13],
            &d[13..14],
            &d[14..16],
            &d[16..20]
        )
    }
}

impl std::fmt::Display for ProcessRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.formatted())
    }
}

/// Personal details scraped from a case's party view. Fields the page does
/// not show stay `None` rather than failing the whole record.
#[derive(Debug, Clone, Serialize)]
pub struct PartyDetails {
    pub process: ProcessRecord,
    pub cpf: Option<String>,
    pub civil_name: Option<String>,
    pub birth_date: Option<String>,
    pub father: Option<String>,
    pub mother: Option<String>,
}

impl PartyDetails {
    pub fn empty(process: ProcessRecord) -> Self {
        Self {
            process,
            cpf: None,
            civil_name: None,
            birth_date: None,
            father: None,
            mother: None,
        }
    }
}
