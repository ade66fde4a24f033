//! Line configuration codec.
//!
//! The canonical form of a line configuration is the
//! (data bits, parity, stop bits) triple held by [`LineConfig`]. The two
//! external spellings are derived from it and parsed back into it:
//!
//! * a packed integer `0xDPS`, where `D` is the number of data bits, `P` the
//!   parity nibble (`0` none, `2` even, `3` odd) and `S` the stop bits nibble
//!   (`1` one, `2` two, `3` one and a half), e.g. `0x801` for 8N1;
//! * a 3-character mnemonic such as `"8N1"` or `"7e2"`.
//!
//! Anything that does not decode to a supported triple is rejected with
//! [`Error::InvalidConfig`], never coerced to a default.

use std::{convert::TryFrom, fmt, str::FromStr};

use crate::error::{Error, Result};

const DATA_BITS_MASK: i64 = 0xF00;
const PARITY_MASK: i64 = 0x0F0;
const STOP_BITS_MASK: i64 = 0x00F;

// =============================================================================
// Public Interface
// =============================================================================

/// Number of bits used to represent a character sent on the line.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}
impl DataBits {
    pub fn count(self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }

    fn from_count(count: i64) -> Option<Self> {
        match count {
            5 => Some(DataBits::Five),
            6 => Some(DataBits::Six),
            7 => Some(DataBits::Seven),
            8 => Some(DataBits::Eight),
            _ => None,
        }
    }
}

/// The type of parity to use for error checking.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Parity {
    None,
    Odd,
    Even,
}
impl Parity {
    fn nibble(self) -> i64 {
        match self {
            Parity::None => 0x0,
            Parity::Even => 0x2,
            Parity::Odd => 0x3,
        }
    }

    fn from_nibble(nibble: i64) -> Option<Self> {
        match nibble {
            0x0 => Some(Parity::None),
            0x2 => Some(Parity::Even),
            0x3 => Some(Parity::Odd),
            _ => None,
        }
    }

    fn letter(self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        }
    }

    fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'N' => Some(Parity::None),
            'O' => Some(Parity::Odd),
            'E' => Some(Parity::Even),
            _ => None,
        }
    }
}

/// Number of bits to use to signal the end of a character.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum StopBits {
    One,
    OnePointFive,
    Two,
}
impl StopBits {
    fn nibble(self) -> i64 {
        match self {
            StopBits::One => 0x1,
            StopBits::Two => 0x2,
            StopBits::OnePointFive => 0x3,
        }
    }

    fn from_nibble(nibble: i64) -> Option<Self> {
        match nibble {
            0x1 => Some(StopBits::One),
            0x2 => Some(StopBits::Two),
            0x3 => Some(StopBits::OnePointFive),
            _ => None,
        }
    }
}

/// The framing of characters on a serial line.
///
/// The default is 8 data bits, no parity and 1 stop bit (`8N1`), used only
/// when no configuration at all was supplied by the caller.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct LineConfig {
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl Default for LineConfig {
    fn default() -> Self {
        LineConfig {
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl LineConfig {
    pub fn new(data_bits: DataBits, parity: Parity, stop_bits: StopBits) -> Self {
        LineConfig {
            data_bits,
            parity,
            stop_bits,
        }
    }
}

/// Decode a packed `0xDPS` integer.
pub fn decode_integer(value: i64) -> Result<LineConfig> {
    let invalid = || Error::InvalidConfig(format!("{:#x}", value));

    if value & !(DATA_BITS_MASK | PARITY_MASK | STOP_BITS_MASK) != 0 {
        return Err(invalid());
    }
    let data_bits = DataBits::from_count((value & DATA_BITS_MASK) >> 8).ok_or_else(invalid)?;
    let parity = Parity::from_nibble((value & PARITY_MASK) >> 4).ok_or_else(invalid)?;
    let stop_bits = StopBits::from_nibble(value & STOP_BITS_MASK).ok_or_else(invalid)?;

    Ok(LineConfig::new(data_bits, parity, stop_bits))
}

/// Encode into the packed `0xDPS` integer; the exact inverse of
/// [`decode_integer`].
pub fn encode_integer(config: &LineConfig) -> i64 {
    (i64::from(config.data_bits.count()) << 8)
        | (config.parity.nibble() << 4)
        | config.stop_bits.nibble()
}

/// Decode a 3-character mnemonic: data bits digit (`5`-`8`), parity letter
/// (`N`, `O` or `E`, any case) and stop bits digit (`1` or `2`).
pub fn decode_mnemonic(text: &str) -> Result<LineConfig> {
    let invalid = || Error::InvalidConfig(format!("`{}`", text));

    let chars: Vec<char> = text.chars().collect();
    if chars.len() != 3 {
        return Err(invalid());
    }

    let data_bits = chars[0]
        .to_digit(10)
        .and_then(|d| DataBits::from_count(i64::from(d)))
        .ok_or_else(invalid)?;
    let parity = Parity::from_letter(chars[1]).ok_or_else(invalid)?;
    let stop_bits = match chars[2] {
        '1' => StopBits::One,
        '2' => StopBits::Two,
        _ => return Err(invalid()),
    };

    Ok(LineConfig::new(data_bits, parity, stop_bits))
}

/// Encode into the upper-case mnemonic; the exact inverse of
/// [`decode_mnemonic`]. One and a half stop bits has no mnemonic spelling.
pub fn encode_mnemonic(config: &LineConfig) -> Result<String> {
    let stop = match config.stop_bits {
        StopBits::One => '1',
        StopBits::Two => '2',
        StopBits::OnePointFive => {
            return Err(Error::InvalidConfig(
                "1.5 stop bits has no mnemonic".to_string(),
            ))
        }
    };
    Ok(format!(
        "{}{}{}",
        config.data_bits.count(),
        config.parity.letter(),
        stop
    ))
}

impl FromStr for LineConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        decode_mnemonic(s)
    }
}

impl TryFrom<i64> for LineConfig {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        decode_integer(value)
    }
}

impl fmt::Display for LineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match encode_mnemonic(self) {
            Ok(mnemonic) => f.write_str(&mnemonic),
            Err(_) => write!(f, "{:#05x}", encode_integer(self)),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
fn all_supported() -> Vec<LineConfig> {
    let mut configs = vec![];
    for &data_bits in &[
        DataBits::Five,
        DataBits::Six,
        DataBits::Seven,
        DataBits::Eight,
    ] {
        for &parity in &[Parity::None, Parity::Odd, Parity::Even] {
            for &stop_bits in &[StopBits::One, StopBits::Two] {
                configs.push(LineConfig::new(data_bits, parity, stop_bits));
            }
        }
    }
    configs
}

#[test]
fn every_supported_triple_round_trips() {
    let configs = all_supported();
    assert_eq!(configs.len(), 24);
    for config in configs {
        let mnemonic = encode_mnemonic(&config).unwrap();
        assert_eq!(decode_mnemonic(&mnemonic).unwrap(), config);
        assert_eq!(decode_integer(encode_integer(&config)).unwrap(), config);
    }
}

#[test]
fn known_integer_values() {
    assert_eq!(encode_integer(&LineConfig::default()), 0x801);
    assert_eq!(
        decode_integer(0x722).unwrap(),
        LineConfig::new(DataBits::Seven, Parity::Even, StopBits::Two)
    );
    assert_eq!(
        decode_integer(0x531).unwrap(),
        LineConfig::new(DataBits::Five, Parity::Odd, StopBits::One)
    );
}

#[test]
fn one_and_a_half_stop_bits_only_as_integer() {
    let config = LineConfig::new(DataBits::Eight, Parity::None, StopBits::OnePointFive);
    assert_eq!(encode_integer(&config), 0x803);
    assert_eq!(decode_integer(0x803).unwrap(), config);
    assert!(matches!(
        encode_mnemonic(&config),
        Err(Error::InvalidConfig(_))
    ));
    assert_eq!(config.to_string(), "0x803");
}

#[test]
fn unsupported_integers_are_rejected() {
    for &value in &[0x901, 0x401, 0x000, 0x811, 0x841, 0x800, 0x804, 0x1801, -1] {
        assert!(
            matches!(decode_integer(value), Err(Error::InvalidConfig(_))),
            "{:#x} should be rejected",
            value
        );
    }
}

#[test]
fn mnemonic_parity_is_case_insensitive() {
    assert_eq!(
        decode_mnemonic("7e2").unwrap(),
        LineConfig::new(DataBits::Seven, Parity::Even, StopBits::Two)
    );
    assert_eq!(
        decode_mnemonic("6o1").unwrap(),
        LineConfig::new(DataBits::Six, Parity::Odd, StopBits::One)
    );
    assert_eq!(decode_mnemonic("8n1").unwrap(), LineConfig::default());
}

#[test]
fn bad_mnemonics_are_rejected() {
    for text in &["", "8N", "8N12", "8X1", "9N1", "4N1", "8N3", "8N0", "N81", "８N1"] {
        assert!(
            matches!(decode_mnemonic(text), Err(Error::InvalidConfig(_))),
            "`{}` should be rejected",
            text
        );
    }
}

#[test]
fn parse_and_display() {
    let config: LineConfig = "8E1".parse().unwrap();
    assert_eq!(config.to_string(), "8E1");
    assert_eq!(LineConfig::try_from(0x801).unwrap(), LineConfig::default());
}
