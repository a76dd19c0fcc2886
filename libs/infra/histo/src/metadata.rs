// [libs/infra/histo/src/metadata.rs]
//! Out-of-band histogram flags, smuggled across the wire inside the
//! object's own name rather than as a separate frame field: names
//! containing `!` are split `name!metadata` on send and rejoined on
//! receive. `HistoContainer::to_wire`/`from_wire` are where the splice
//! actually happens; this module only owns the flag word and its hex
//! encoding.

use crate::errors::{HistoError, Result};

/// A histogram's metadata is a flag word packed into a `u32`, so it fits
/// in the small hex suffix appended to a name on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HistoFlags(u32);

impl HistoFlags {
    /// Also publish an extra 2D histogram of this one's content per timeslice id.
    pub const STORE_VS_TS_ID: u32 = 1 << 0;
    /// Omit this histogram's integrated (all-bins) entry from the canvas.
    pub const OMIT_INTEGRATED: u32 = 1 << 1;
    /// A minimum axis value was explicitly set and should not be auto-ranged.
    pub const SET_MINIMUM: u32 = 1 << 2;

    /// No flags set.
    #[must_use]
    pub fn empty() -> Self {
        Self(0)
    }

    /// Wraps a raw flag word.
    #[must_use]
    pub fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw flag word.
    #[must_use]
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Whether `flag` (one of the associated constants) is set.
    #[must_use]
    pub fn contains(&self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    /// Sets `flag` (one of the associated constants).
    pub fn set(&mut self, flag: u32) {
        self.0 |= flag;
    }

    /// Renders the flag word as a lowercase hex string, `""` when empty.
    #[must_use]
    pub fn to_hex(&self) -> String {
        if self.0 == 0 {
            String::new()
        } else {
            format!("{:x}", self.0)
        }
    }

    /// Parses a hex string produced by [`Self::to_hex`].
    ///
    /// # Errors
    /// Returns [`HistoError::InvalidMetadata`] if `s` is not valid hex.
    pub fn from_hex(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Ok(Self::empty());
        }
        u32::from_str_radix(s, 16).map(Self).map_err(|_| HistoError::InvalidMetadata(s.to_string()))
    }
}

/// Splits a wire-level name of the form `name!hex` into its bare name and,
/// if a metadata suffix was present and valid, its flags. A name with no
/// `!` suffix, or an unparsable suffix, yields `None` for the flags.
#[must_use]
pub fn split_name_metadata(wire_name: &str) -> (String, Option<HistoFlags>) {
    match wire_name.split_once('!') {
        Some((name, meta)) => (name.to_string(), HistoFlags::from_hex(meta).ok()),
        None => (wire_name.to_string(), None),
    }
}

/// Joins a bare name and its flags into the wire-level `name!hex` form.
/// Flags of zero are not appended, so an unflagged name round-trips
/// byte-for-byte.
#[must_use]
pub fn join_name_metadata(name: &str, flags: HistoFlags) -> String {
    if flags.bits() == 0 {
        name.to_string()
    } else {
        format!("{name}!{}", flags.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn unflagged_name_round_trips_without_a_suffix() {
        let wire = join_name_metadata("sts_cluster_size", HistoFlags::empty());
        assert_eq!(wire, "sts_cluster_size");
        let (name, flags) = split_name_metadata(&wire);
        assert_eq!(name, "sts_cluster_size");
        assert!(flags.is_none());
    }

    #[test]
    fn flagged_name_round_trips_through_the_hex_suffix() {
        let mut flags = HistoFlags::empty();
        flags.set(HistoFlags::STORE_VS_TS_ID);
        flags.set(HistoFlags::SET_MINIMUM);

        let wire = join_name_metadata("trd_cluster_charge", flags);
        assert_eq!(wire, "trd_cluster_charge!5");

        let (name, parsed) = split_name_metadata(&wire);
        assert_eq!(name, "trd_cluster_charge");
        let parsed = parsed.unwrap();
        assert!(parsed.contains(HistoFlags::STORE_VS_TS_ID));
        assert!(parsed.contains(HistoFlags::SET_MINIMUM));
        assert!(!parsed.contains(HistoFlags::OMIT_INTEGRATED));
    }

    #[test]
    fn an_unparsable_suffix_yields_no_flags_but_still_recovers_the_name() {
        let (name, flags) = split_name_metadata("bmon_tot!not_hex");
        assert_eq!(name, "bmon_tot");
        assert!(flags.is_none());
    }

    proptest! {
        #[test]
        fn any_flag_word_round_trips(bits in 0u32..=0b111) {
            let flags = HistoFlags::from_bits(bits);
            let wire = join_name_metadata("h", flags);
            let (name, parsed) = split_name_metadata(&wire);
            prop_assert_eq!(name, "h");
            if bits == 0 {
                prop_assert!(parsed.is_none());
            } else {
                prop_assert_eq!(parsed.unwrap().bits(), bits);
            }
        }
    }
}
