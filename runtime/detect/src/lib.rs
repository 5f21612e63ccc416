// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2022 Takashi Sakamoto

#![doc = include_str!("../README.md")]

use {avdecc_stream_format_protocols::*, tracing::debug};

/// The reason that an advertised entry is not available as replacement of the current format.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FormatMismatch {
    /// The values belong to different transportation subtypes.
    SubtypeMismatch,
    /// The values disagree on a field which is never adjustable.
    StructuralMismatch,
    /// The entry is coded for a different sampling frequency than the requested one.
    SampleRateMismatch,
    /// The entry does not cover the count of channels of the current format.
    ChannelCountMismatch,
    /// The clock reference formats describe different base frequencies.
    BaseFrequencyMismatch,
    /// The common subtype is out of scope of negotiation.
    UnsupportedSubtype,
}

impl std::fmt::Display for FormatMismatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SubtypeMismatch => write!(f, "subtype mismatch"),
            Self::StructuralMismatch => write!(f, "structural field mismatch"),
            Self::SampleRateMismatch => write!(f, "sampling frequency mismatch"),
            Self::ChannelCountMismatch => write!(f, "channel count mismatch"),
            Self::BaseFrequencyMismatch => write!(f, "base frequency mismatch"),
            Self::UnsupportedSubtype => write!(f, "unsupported subtype"),
        }
    }
}

/// Re-run the predicates of compatibility detection for the pair of values and report the
/// first failing one. `None` expresses that the entry is available as replacement at the
/// frequency. The result is for diagnostics; `compatible_format` itself keeps its binary
/// contract.
pub fn mismatch_reason(current: u64, freq: u32, entry: u64) -> Option<FormatMismatch> {
    if StreamFormat::subtype(current) != StreamFormat::subtype(entry) {
        return Some(FormatMismatch::SubtypeMismatch);
    }

    match (StreamFormat::from(current), StreamFormat::from(entry)) {
        (StreamFormat::Iec61883Iidc(current_format), StreamFormat::Iec61883Iidc(entry_format)) => {
            if (current & !Iec61883IidcFormat::COMPARE_MASK)
                != (entry & !Iec61883IidcFormat::COMPARE_MASK)
            {
                Some(FormatMismatch::StructuralMismatch)
            } else if entry_format.freq() != freq {
                Some(FormatMismatch::SampleRateMismatch)
            } else if entry_format.upto && entry_format.mbla_count >= current_format.mbla_count {
                None
            } else if !entry_format.upto && entry_format.mbla_count == current_format.mbla_count {
                None
            } else {
                Some(FormatMismatch::ChannelCountMismatch)
            }
        }
        (StreamFormat::Aaf(current_format), StreamFormat::Aaf(entry_format)) => {
            if (current & !AafFormat::COMPARE_MASK) != (entry & !AafFormat::COMPARE_MASK) {
                Some(FormatMismatch::StructuralMismatch)
            } else if entry_format.freq() != freq {
                Some(FormatMismatch::SampleRateMismatch)
            } else if entry_format.upto
                && entry_format.channels_per_frame >= current_format.channels_per_frame
            {
                None
            } else if !entry_format.upto
                && entry_format.channels_per_frame == current_format.channels_per_frame
            {
                None
            } else {
                Some(FormatMismatch::ChannelCountMismatch)
            }
        }
        (StreamFormat::Crf(current_format), StreamFormat::Crf(entry_format)) => {
            if current_format.base_freq == entry_format.base_freq {
                None
            } else {
                Some(FormatMismatch::BaseFrequencyMismatch)
            }
        }
        _ => Some(FormatMismatch::UnsupportedSubtype),
    }
}

/// The interface to read stream format values of a stream from the protocol layer, with
/// detection of the supported entry available at requested sampling frequency.
///
/// The implementation of required methods is expected to communicate to the end station in
/// charge of the stream and deliver the retrieved values as is. The provided method operates
/// on the materialized values alone and initiates no communication itself.
pub trait StreamFormatSource<E> {
    /// Read the value of stream format currently applied to the stream.
    fn current_format(&self) -> Result<u64, E>;

    /// Read the values of stream format supported by the stream, in the advertised order.
    fn format_entries(&self) -> Result<Vec<u64>, E>;

    /// Detect the first supported entry available as replacement of the current format at
    /// the given sampling frequency. `Ok(None)` expresses that the list includes no
    /// compatible entry.
    fn detect_compatible_format(&self, freq: u32) -> Result<Option<u64>, E> {
        let current = self.current_format()?;
        let entries = self.format_entries()?;

        let result = entries
            .iter()
            .find_map(|&entry| match compatible_format(current, freq, entry) {
                Some(replacement) => {
                    debug!(
                        "compatible: current 0x{:016x}, entry 0x{:016x}, replacement 0x{:016x}",
                        current, entry, replacement
                    );
                    Some(replacement)
                }
                None => {
                    if let Some(reason) = mismatch_reason(current, freq, entry) {
                        debug!("skip: entry 0x{:016x}, {}", entry, reason);
                    }
                    None
                }
            });

        Ok(result)
    }
}
