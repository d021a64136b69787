//! BOLT11 invoice decoding.
//!
//! Only the parts needed to compare an invoice with its proxied counterpart are
//! extracted: the amount, the payment hash, the description (literal or hashed)
//! and the signature. The bech32 checksum is not verified.

use bech32::{Fe32, Fe32IterExt};
use hex::encode as hex_encode;
use sha2::{Digest as ShaDigest, Sha256};
use std::fmt;
use thiserror::Error;

/// Human-readable prefix of a mainnet invoice.
const PREFIX: &str = "lnbc";

/// Separates the human-readable part from the data part.
const SEPARATOR: char = '1';

/// Timestamp symbols at the start of the data part.
const TIMESTAMP_LENGTH: usize = 7;

/// 65-byte recoverable signature as 5-bit symbols.
const SIGNATURE_LENGTH: usize = 104;

/// Trailing bech32 checksum symbols.
const CHECKSUM_LENGTH: usize = 6;

/// Tag symbol plus two length symbols.
const FIELD_HEADER_LENGTH: usize = 3;

const PAYMENT_HASH_TAG: u8 = b'p';
const DESCRIPTION_TAG: u8 = b'd';
const DESCRIPTION_HASH_TAG: u8 = b'h';

/// Amount multiplier suffix of the human-readable part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Multiplier {
    /// `m`, milli-bitcoin
    Milli,
    /// `u`, micro-bitcoin
    Micro,
    /// `n`, nano-bitcoin
    Nano,
    /// `p`, pico-bitcoin
    Pico,
}

impl Multiplier {
    /// Reverse lookup from the suffix character.
    #[must_use]
    pub fn from_char(c: char) -> Option<Multiplier> {
        match c {
            'm' => Some(Multiplier::Milli),
            'u' => Some(Multiplier::Micro),
            'n' => Some(Multiplier::Nano),
            'p' => Some(Multiplier::Pico),
            _ => None,
        }
    }

    /// Converts a count of this unit into millisatoshi.
    ///
    /// Pico amounts are truncated toward zero. Returns `None` on overflow.
    #[must_use]
    pub fn to_msat(self, units: u64) -> Option<u64> {
        match self {
            Multiplier::Milli => units.checked_mul(100_000_000),
            Multiplier::Micro => units.checked_mul(100_000),
            Multiplier::Nano => units.checked_mul(100),
            Multiplier::Pico => Some(units / 10),
        }
    }
}

/// Errors that can occur during invoice decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The string does not follow the `lnbc[<amount>]1<data>` grammar
    #[error("invalid invoice format: {0}")]
    InvalidFormat(&'static str),

    /// Amount digits do not fit in a `u64` once scaled to millisatoshi
    #[error("invalid invoice amount: {0}")]
    InvalidAmount(String),

    /// A field (or the fixed-width trailer) runs past the end of the data part
    #[error("invoice truncated: need {needed} symbols, {available} available")]
    Truncated { needed: usize, available: usize },
}

/// The decoded components of an invoice.
///
/// `payment_hash`, `description` and `signature` hold the raw bech32 symbols
/// copied out of the lower-cased invoice.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvoiceFields {
    /// Payable amount in millisatoshi, 0 when the invoice carries no amount
    pub amount_msat: u64,
    /// Whether an amount segment was present at all
    pub has_amount: bool,
    /// Symbols of the `p` field
    pub payment_hash: Vec<u8>,
    /// Symbols of the `d` field, or of the `h` field when `description_is_hash`
    pub description: Vec<u8>,
    /// The description is a commitment to an out-of-band text
    pub description_is_hash: bool,
    /// The trailing signature symbols
    pub signature: Vec<u8>,
}

impl InvoiceFields {
    /// The payment hash as raw bytes.
    #[must_use]
    pub fn payment_hash_bytes(&self) -> Vec<u8> {
        symbols_to_bytes(&self.payment_hash)
    }

    /// The hex representation of the payment hash
    #[must_use]
    pub fn payment_hash_hex(&self) -> String {
        hex_encode(self.payment_hash_bytes())
    }

    /// The literal description, if the invoice carries one and it is valid UTF-8.
    #[must_use]
    pub fn description_text(&self) -> Option<String> {
        if self.description_is_hash {
            return None;
        }
        String::from_utf8(symbols_to_bytes(&self.description)).ok()
    }

    /// Checks whether `text` is the description this invoice commits to.
    ///
    /// For `h` invoices the SHA-256 of `text` must equal the committed hash;
    /// for `d` invoices the literal description must equal `text`.
    #[must_use]
    pub fn commits_to_description(&self, text: &str) -> bool {
        if self.description_is_hash {
            let digest = Sha256::digest(text.as_bytes());
            symbols_to_bytes(&self.description) == digest.as_slice()
        } else {
            self.description_text().as_deref() == Some(text)
        }
    }
}

impl fmt::Display for InvoiceFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_amount {
            writeln!(f, "amount_msat : {}", self.amount_msat)?;
        } else {
            writeln!(f, "amount_msat : none")?;
        }
        writeln!(f, "payment_hash: {}", self.payment_hash_hex())?;
        if self.description_is_hash {
            writeln!(
                f,
                "description : hash {}",
                hex_encode(symbols_to_bytes(&self.description))
            )?;
        } else {
            match self.description_text() {
                Some(text) => writeln!(f, "description : {text:?}")?,
                None => writeln!(f, "description : <not utf-8>")?,
            }
        }
        write!(f, "signature   : {}", String::from_utf8_lossy(&self.signature))
    }
}

/// Decode an invoice string into the fields used for proxy validation.
///
/// # Errors
/// Returns `DecodeError` on any failure:
/// - Prefix, separator or character set mismatch
/// - Amount that overflows once scaled to millisatoshi
/// - Tagged field or signature running past the end of the data part
/// - Both a `d` and an `h` field present
pub fn decode_invoice(raw: &str) -> Result<InvoiceFields, DecodeError> {
    let invoice = raw.to_ascii_lowercase();
    let separator = check_grammar(&invoice)?;

    let amount_segment = &invoice[PREFIX.len()..separator];
    let has_amount = !amount_segment.is_empty();
    let amount_msat = if has_amount {
        parse_amount(amount_segment)?
    } else {
        0
    };

    // Grammar check guarantees everything past the separator is ASCII bech32.
    let data = &invoice.as_bytes()[separator + 1..];
    let trailer = TIMESTAMP_LENGTH + SIGNATURE_LENGTH + CHECKSUM_LENGTH;
    if data.len() < trailer {
        return Err(DecodeError::Truncated {
            needed: trailer,
            available: data.len(),
        });
    }
    let signature_start = data.len() - SIGNATURE_LENGTH - CHECKSUM_LENGTH;
    let fields = &data[TIMESTAMP_LENGTH..signature_start];
    let signature = data[signature_start..data.len() - CHECKSUM_LENGTH].to_vec();

    let mut payment_hash = Vec::new();
    let mut literal: Option<&[u8]> = None;
    let mut hashed: Option<&[u8]> = None;

    let mut cursor = 0;
    while cursor < fields.len() {
        let (tag, body) = read_field(fields, cursor)?;
        match tag {
            PAYMENT_HASH_TAG => payment_hash = body.to_vec(),
            DESCRIPTION_TAG => literal = Some(body),
            DESCRIPTION_HASH_TAG => hashed = Some(body),
            _ => {}
        }
        cursor += FIELD_HEADER_LENGTH + body.len();
    }

    let (description, description_is_hash) = match (literal, hashed) {
        (Some(_), Some(_)) => {
            return Err(DecodeError::InvalidFormat(
                "both description and description hash present",
            ));
        }
        (Some(text), None) => (text.to_vec(), false),
        (None, Some(hash)) => (hash.to_vec(), true),
        (None, None) => (Vec::new(), false),
    };

    Ok(InvoiceFields {
        amount_msat,
        has_amount,
        payment_hash,
        description,
        description_is_hash,
        signature,
    })
}

/// Matches `lnbc(?:[0-9]+[pnum])?1[<bech32>]+` and returns the separator index.
fn check_grammar(invoice: &str) -> Result<usize, DecodeError> {
    if !invoice.starts_with(PREFIX) {
        return Err(DecodeError::InvalidFormat("missing lnbc prefix"));
    }
    let separator = invoice
        .rfind(SEPARATOR)
        .ok_or(DecodeError::InvalidFormat("missing separator"))?;

    let mut amount = invoice[PREFIX.len()..separator].chars();
    if let Some(suffix) = amount.next_back() {
        let digits = amount.as_str();
        if Multiplier::from_char(suffix).is_none()
            || digits.is_empty()
            || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(DecodeError::InvalidFormat("malformed amount"));
        }
    }

    let data = &invoice[separator + 1..];
    if data.is_empty() {
        return Err(DecodeError::InvalidFormat("empty data part"));
    }
    if !data.chars().all(|c| Fe32::from_char(c).is_ok()) {
        return Err(DecodeError::InvalidFormat("non-bech32 character in data part"));
    }

    Ok(separator)
}

/// Parses `<digits><multiplier>` into millisatoshi.
fn parse_amount(segment: &str) -> Result<u64, DecodeError> {
    let invalid = || DecodeError::InvalidAmount(segment.to_string());

    let mut chars = segment.chars();
    let multiplier = chars
        .next_back()
        .and_then(Multiplier::from_char)
        .ok_or_else(invalid)?;
    let units: u64 = chars.as_str().parse().map_err(|_| invalid())?;

    multiplier.to_msat(units).ok_or_else(invalid)
}

/// Reads the tagged field starting at `start`, bounds-checked against `fields`.
fn read_field(fields: &[u8], start: usize) -> Result<(u8, &[u8]), DecodeError> {
    let remaining = fields.len() - start;
    let header = fields
        .get(start..start + FIELD_HEADER_LENGTH)
        .ok_or(DecodeError::Truncated {
            needed: FIELD_HEADER_LENGTH,
            available: remaining,
        })?;

    let length = symbol_value(header[1])? * 32 + symbol_value(header[2])?;
    let body_start = start + FIELD_HEADER_LENGTH;
    let body = fields
        .get(body_start..body_start + length)
        .ok_or(DecodeError::Truncated {
            needed: length,
            available: fields.len() - body_start,
        })?;

    Ok((header[0], body))
}

fn symbol_value(symbol: u8) -> Result<usize, DecodeError> {
    Fe32::from_char(char::from(symbol))
        .map(|fe| usize::from(fe.to_u8()))
        .map_err(|_| DecodeError::InvalidFormat("non-bech32 character in data part"))
}

/// Packs 5-bit symbols into bytes, dropping the trailing padding bits.
fn symbols_to_bytes(symbols: &[u8]) -> Vec<u8> {
    symbols
        .iter()
        .filter_map(|&s| Fe32::from_char(char::from(s)).ok())
        .fes_to_bytes()
        .collect()
}
