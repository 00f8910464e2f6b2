//! Extrinsic mortality
//!
//! A mortal era is valid on `[birth, birth + period)`. Built periods are powers
//! of two in `[4, 4096]`; a requested period is rounded down, never up, so a
//! payload is never valid for longer than asked. Up to 4096 the phase is exact
//! and the era is born at the block it was built from. The wire format allows
//! periods up to 65536 with a quantized phase; those still decode.

use crate::error::{RelayError, RelayResult};
use serde::{Deserialize, Serialize};

pub const MIN_PERIOD: u64 = 4;
/// Longest period an era is built with
pub const MAX_PERIOD: u64 = 4_096;
/// Longest period the two-byte encoding can carry
pub const MAX_WIRE_PERIOD: u64 = 65_536;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Era {
    Immortal,
    Mortal { period: u64, phase: u64 },
}

impl Era {
    /// Mortal era starting at `current_block`
    pub fn mortal(requested_period: u64, current_block: u64) -> RelayResult<Self> {
        let period = align_period(requested_period)?;
        Ok(Self::Mortal {
            period,
            phase: current_block % period,
        })
    }

    pub fn is_immortal(&self) -> bool {
        matches!(self, Self::Immortal)
    }

    /// Birth block of the latest window starting at or before `current`
    pub fn birth(&self, current: u64) -> u64 {
        match self {
            Self::Immortal => 0,
            Self::Mortal { period, phase } => (current.max(*phase) - phase) / period * period + phase,
        }
    }

    /// First block at which the era is no longer valid
    pub fn death(&self, current: u64) -> u64 {
        match self {
            Self::Immortal => u64::MAX,
            Self::Mortal { period, .. } => self.birth(current).saturating_add(*period),
        }
    }

    /// Validity window of an era anchored at `anchor_block`
    pub fn window(&self, anchor_block: u64) -> MortalityWindow {
        MortalityWindow {
            birth: self.birth(anchor_block),
            death: self.death(anchor_block),
        }
    }

    /// SCALE encoding: `0x00` for immortal, two bytes otherwise
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::Immortal => vec![0x00],
            Self::Mortal { period, phase } => {
                let quantize_factor = (*period >> 12).max(1);
                let encoded_period = (period.trailing_zeros().saturating_sub(1)).clamp(1, 15) as u16;
                let quantized_phase = (phase / quantize_factor) as u16;
                (encoded_period | quantized_phase << 4).to_le_bytes().to_vec()
            }
        }
    }

    /// Decode from the front of `input`, advancing it
    pub fn decode(input: &mut &[u8]) -> RelayResult<Self> {
        let first = *input
            .first()
            .ok_or_else(|| RelayError::parse_error("Era: unexpected end of input"))?;
        if first == 0 {
            *input = &input[1..];
            return Ok(Self::Immortal);
        }
        if input.len() < 2 {
            return Err(RelayError::parse_error("Era: unexpected end of input"));
        }
        let encoded = u16::from_le_bytes([input[0], input[1]]) as u64;
        *input = &input[2..];

        let period = 2u64 << (encoded % (1 << 4));
        let quantize_factor = (period >> 12).max(1);
        let phase = (encoded >> 4) * quantize_factor;
        if period >= MIN_PERIOD && phase < period {
            Ok(Self::Mortal { period, phase })
        } else {
            Err(RelayError::parse_error(format!("Invalid era encoding 0x{:04x}", encoded)))
        }
    }
}

/// Round a requested period down to a valid power of two
pub fn align_period(requested: u64) -> RelayResult<u64> {
    if requested < MIN_PERIOD {
        return Err(RelayError::invalid_input(format!(
            "Mortality period {} is below the minimum of {}",
            requested, MIN_PERIOD
        )));
    }
    let capped = requested.min(MAX_PERIOD);
    Ok(1u64 << (63 - capped.leading_zeros()))
}

/// Half-open block range `[birth, death)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MortalityWindow {
    pub birth: u64,
    pub death: u64,
}

impl MortalityWindow {
    pub fn contains(&self, block: u64) -> bool {
        self.birth <= block && block < self.death
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_period_64_birth_100() {
        let era = Era::mortal(64, 100).unwrap();
        let window = era.window(100);

        assert_eq!(window, MortalityWindow { birth: 100, death: 164 });
        assert!(window.contains(100));
        assert!(window.contains(163));
        assert!(!window.contains(164));
        assert!(!window.contains(99));
    }

    #[test]
    fn test_align_rounds_down() {
        assert_eq!(align_period(64).unwrap(), 64);
        assert_eq!(align_period(100).unwrap(), 64);
        assert_eq!(align_period(127).unwrap(), 64);
        assert_eq!(align_period(4).unwrap(), 4);
        assert_eq!(align_period(1_000_000).unwrap(), MAX_PERIOD);
        assert!(align_period(3).is_err());
        assert!(align_period(0).is_err());
    }

    #[test]
    fn test_encoding_known_vectors() {
        // period 64, phase 36 (block 100): log2(64) - 1 = 5, 36 << 4 = 0x240
        let era = Era::mortal(64, 100).unwrap();
        assert_eq!(era, Era::Mortal { period: 64, phase: 36 });
        assert_eq!(era.encode(), vec![0x45, 0x02]);
        assert_eq!(Era::Immortal.encode(), vec![0x00]);
    }

    #[test]
    fn test_decode_roundtrip() {
        for (period, block) in [(4, 0), (64, 100), (1024, 987_654), (65_536, 12_345_678)] {
            let era = Era::mortal(period, block).unwrap();
            let bytes = era.encode();
            let mut input = bytes.as_slice();
            assert_eq!(Era::decode(&mut input).unwrap(), era);
            assert!(input.is_empty());
        }

        let mut input: &[u8] = &[0x00, 0xff];
        assert_eq!(Era::decode(&mut input).unwrap(), Era::Immortal);
        assert_eq!(input, &[0xff]);
    }

    #[test]
    fn test_long_period_is_born_at_current_block() {
        let era = Era::mortal(65_536, 100_005).unwrap();
        assert_eq!(era, Era::Mortal { period: 4_096, phase: 100_005 % 4_096 });
        assert_eq!(era.birth(100_005), 100_005);
        assert_eq!(era.window(100_005), MortalityWindow { birth: 100_005, death: 104_101 });
    }

    #[test]
    fn test_wire_period_above_build_limit_decodes() {
        // period 65536, phase 34464: encoded phase is quantized by 16
        let era = Era::Mortal { period: MAX_WIRE_PERIOD, phase: 34_464 };
        let bytes = era.encode();
        assert_eq!(Era::decode(&mut bytes.as_slice()).unwrap(), era);
        assert_eq!(era.birth(100_005), 100_000);
    }

    #[test]
    fn test_immortal_window_is_unbounded() {
        let window = Era::Immortal.window(5);
        assert!(window.contains(0));
        assert!(window.contains(u64::MAX - 1));
    }
}
