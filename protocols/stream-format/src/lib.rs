// SPDX-License-Identifier: MIT
// Copyright (c) 2022 Takashi Sakamoto

#![doc = include_str!("../README.md")]

/// The stream format value decoded according to the subtype of transportation, described in
/// IEEE 1722.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StreamFormat {
    /// Audio data with packetization compliant to IEC 61883/IIDC (e.g. AM824 data in
    /// IEC 61883-6).
    Iec61883Iidc(Iec61883IidcFormat),
    /// Audio data with AVTP audio framing.
    Aaf(AafFormat),
    /// Clock reference data.
    Crf(CrfFormat),
    /// Unrecognized subtype, kept with the raw value.
    Reserved(u64),
}

impl StreamFormat {
    /// The code of subtype for IEC 61883/IIDC packetization.
    pub const SUBTYPE_IEC61883_IIDC: u8 = 0x00;
    /// The code of subtype for AVTP audio format.
    pub const SUBTYPE_AAF: u8 = 0x02;
    /// The code of subtype for clock reference format.
    pub const SUBTYPE_CRF: u8 = 0x04;

    const SUBTYPE_SHIFT: usize = 56;
    const SUBTYPE_MASK: u64 = 0x7f;

    /// The code of transportation subtype in the value.
    pub fn subtype(val: u64) -> u8 {
        ((val >> Self::SUBTYPE_SHIFT) & Self::SUBTYPE_MASK) as u8
    }
}

impl From<u64> for StreamFormat {
    fn from(val: u64) -> Self {
        match Self::subtype(val) {
            Self::SUBTYPE_IEC61883_IIDC => Self::Iec61883Iidc(Iec61883IidcFormat::from(val)),
            Self::SUBTYPE_AAF => Self::Aaf(AafFormat::from(val)),
            Self::SUBTYPE_CRF => Self::Crf(CrfFormat::from(val)),
            _ => Self::Reserved(val),
        }
    }
}

/// The fields of stream format value in subtype of IEC 61883/IIDC packetization.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Iec61883IidcFormat {
    /// The indicator of source/format.
    pub sf: bool,
    /// The sub-format in IEC 61883 family (e.g. AM824 in IEC 61883-6).
    pub iec61883_type: u8,
    /// The mode of packetization.
    pub packetization_type: u8,
    /// The code of sampling frequency (sfc).
    pub sfc: u8,
    /// The size of data block, expressing the count of channels.
    pub dbs: u8,
    pub blocking: bool,
    pub nonblocking: bool,
    /// Whether the counts of channels express ceilings instead of exact counts.
    pub upto: bool,
    pub synchronous: bool,
    /// The count of channels for IEC 60958 conformant data.
    pub iec60958_count: u8,
    /// The count of channels for multi bit linear audio data.
    pub mbla_count: u8,
    /// The count of channels for MIDI conformant data.
    pub midi_count: u8,
    /// The count of channels for SMPTE time code data.
    pub smpte_count: u8,
}

impl Iec61883IidcFormat {
    const SF_SHIFT: usize = 55;
    const SF_MASK: u64 = 0x01;
    const TYPE_SHIFT: usize = 49;
    const TYPE_MASK: u64 = 0x3f;
    const PACKETIZATION_SHIFT: usize = 43;
    const PACKETIZATION_MASK: u64 = 0x1f;
    const SFC_SHIFT: usize = 40;
    const SFC_MASK: u64 = 0x07;
    const DBS_SHIFT: usize = 32;
    const DBS_MASK: u64 = 0xff;
    const BLOCKING_SHIFT: usize = 31;
    const BLOCKING_MASK: u64 = 0x01;
    const NONBLOCKING_SHIFT: usize = 30;
    const NONBLOCKING_MASK: u64 = 0x01;
    const UPTO_SHIFT: usize = 29;
    const UPTO_MASK: u64 = 0x01;
    const SYNCHRONOUS_SHIFT: usize = 28;
    const SYNCHRONOUS_MASK: u64 = 0x01;
    const IEC60958_COUNT_SHIFT: usize = 16;
    const IEC60958_COUNT_MASK: u64 = 0xff;
    const MBLA_COUNT_SHIFT: usize = 8;
    const MBLA_COUNT_MASK: u64 = 0xff;
    const MIDI_COUNT_SHIFT: usize = 4;
    const MIDI_COUNT_MASK: u64 = 0x0f;
    const SMPTE_COUNT_SHIFT: usize = 0;
    const SMPTE_COUNT_MASK: u64 = 0x0f;

    const SFC_32000: u8 = 0x00;
    const SFC_44100: u8 = 0x01;
    const SFC_48000: u8 = 0x02;
    const SFC_88200: u8 = 0x03;
    const SFC_96000: u8 = 0x04;
    const SFC_176400: u8 = 0x05;
    const SFC_192000: u8 = 0x06;

    /// The positions of bits allowed to differ between two values compatible to each other;
    /// the code of sampling frequency, the counts of channels, and the up-to flag.
    pub const COMPARE_MASK: u64 = (Self::SFC_MASK << Self::SFC_SHIFT)
        | (Self::DBS_MASK << Self::DBS_SHIFT)
        | (Self::MBLA_COUNT_MASK << Self::MBLA_COUNT_SHIFT)
        | (Self::UPTO_MASK << Self::UPTO_SHIFT);

    /// The sampling frequency expressed by the sfc field, in Hz. A reserved code expresses
    /// 0 Hz.
    pub fn freq(&self) -> u32 {
        match self.sfc {
            Self::SFC_32000 => 32000,
            Self::SFC_44100 => 44100,
            Self::SFC_48000 => 48000,
            Self::SFC_88200 => 88200,
            Self::SFC_96000 => 96000,
            Self::SFC_176400 => 176400,
            Self::SFC_192000 => 192000,
            _ => 0,
        }
    }

    // The replacement keeps the channel geometry of the current format; the entry contributes
    // the code of sampling frequency alone. The remaining fields are left zero.
    fn adapt_freq(&self, entry: &Self) -> u64 {
        ((StreamFormat::SUBTYPE_IEC61883_IIDC as u64) << StreamFormat::SUBTYPE_SHIFT)
            | ((self.sf as u64) << Self::SF_SHIFT)
            | ((self.iec61883_type as u64) << Self::TYPE_SHIFT)
            | ((self.packetization_type as u64) << Self::PACKETIZATION_SHIFT)
            | ((entry.sfc as u64) << Self::SFC_SHIFT)
            | ((self.dbs as u64) << Self::DBS_SHIFT)
            | ((self.nonblocking as u64) << Self::NONBLOCKING_SHIFT)
            | ((self.mbla_count as u64) << Self::MBLA_COUNT_SHIFT)
    }
}

impl From<u64> for Iec61883IidcFormat {
    fn from(val: u64) -> Self {
        Iec61883IidcFormat {
            sf: (val >> Self::SF_SHIFT) & Self::SF_MASK > 0,
            iec61883_type: ((val >> Self::TYPE_SHIFT) & Self::TYPE_MASK) as u8,
            packetization_type: ((val >> Self::PACKETIZATION_SHIFT) & Self::PACKETIZATION_MASK)
                as u8,
            sfc: ((val >> Self::SFC_SHIFT) & Self::SFC_MASK) as u8,
            dbs: ((val >> Self::DBS_SHIFT) & Self::DBS_MASK) as u8,
            blocking: (val >> Self::BLOCKING_SHIFT) & Self::BLOCKING_MASK > 0,
            nonblocking: (val >> Self::NONBLOCKING_SHIFT) & Self::NONBLOCKING_MASK > 0,
            upto: (val >> Self::UPTO_SHIFT) & Self::UPTO_MASK > 0,
            synchronous: (val >> Self::SYNCHRONOUS_SHIFT) & Self::SYNCHRONOUS_MASK > 0,
            iec60958_count: ((val >> Self::IEC60958_COUNT_SHIFT) & Self::IEC60958_COUNT_MASK)
                as u8,
            mbla_count: ((val >> Self::MBLA_COUNT_SHIFT) & Self::MBLA_COUNT_MASK) as u8,
            midi_count: ((val >> Self::MIDI_COUNT_SHIFT) & Self::MIDI_COUNT_MASK) as u8,
            smpte_count: ((val >> Self::SMPTE_COUNT_SHIFT) & Self::SMPTE_COUNT_MASK) as u8,
        }
    }
}

/// The fields of stream format value in subtype of AVTP audio format.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AafFormat {
    /// Whether the count of channels expresses a ceiling instead of an exact count.
    pub upto: bool,
    /// The code of nominal sampling frequency (nsr).
    pub nsr: u8,
    /// The mode of packetization.
    pub packetization_type: u8,
    /// The depth of PCM sample, in bits.
    pub bit_depth: u8,
    /// The count of channels in a frame.
    pub channels_per_frame: u16,
    /// The count of samples in a frame.
    pub samples_per_frame: u16,
}

impl AafFormat {
    const UPTO_SHIFT: usize = 52;
    const UPTO_MASK: u64 = 0x01;
    const NSR_SHIFT: usize = 48;
    const NSR_MASK: u64 = 0x0f;
    const TYPE_SHIFT: usize = 40;
    const TYPE_MASK: u64 = 0xff;
    const BIT_DEPTH_SHIFT: usize = 32;
    const BIT_DEPTH_MASK: u64 = 0xff;
    const CHANNELS_PER_FRAME_SHIFT: usize = 22;
    const CHANNELS_PER_FRAME_MASK: u64 = 0x3ff;
    const SAMPLES_PER_FRAME_SHIFT: usize = 12;
    const SAMPLES_PER_FRAME_MASK: u64 = 0x3ff;

    const NSR_8000: u8 = 0x01;
    const NSR_16000: u8 = 0x02;
    const NSR_32000: u8 = 0x03;
    const NSR_44100: u8 = 0x04;
    const NSR_48000: u8 = 0x05;
    const NSR_88200: u8 = 0x06;
    const NSR_96000: u8 = 0x07;
    const NSR_176400: u8 = 0x08;
    const NSR_192000: u8 = 0x09;
    const NSR_24000: u8 = 0x0a;

    /// The positions of bits allowed to differ between two values compatible to each other;
    /// the code of nominal sampling frequency, the counts of channels and samples, and the
    /// up-to flag.
    pub const COMPARE_MASK: u64 = (Self::UPTO_MASK << Self::UPTO_SHIFT)
        | (Self::NSR_MASK << Self::NSR_SHIFT)
        | (Self::CHANNELS_PER_FRAME_MASK << Self::CHANNELS_PER_FRAME_SHIFT)
        | (Self::SAMPLES_PER_FRAME_MASK << Self::SAMPLES_PER_FRAME_SHIFT);

    /// The sampling frequency expressed by the nsr field, in Hz. The user-specified code and
    /// reserved codes express 0 Hz.
    pub fn freq(&self) -> u32 {
        match self.nsr {
            Self::NSR_8000 => 8000,
            Self::NSR_16000 => 16000,
            Self::NSR_32000 => 32000,
            Self::NSR_44100 => 44100,
            Self::NSR_48000 => 48000,
            Self::NSR_88200 => 88200,
            Self::NSR_96000 => 96000,
            Self::NSR_176400 => 176400,
            Self::NSR_192000 => 192000,
            Self::NSR_24000 => 24000,
            _ => 0,
        }
    }

    // The replacement keeps the channel geometry and the depth of PCM sample of the current
    // format; the entry contributes the code of nominal sampling frequency and the count of
    // samples in a frame.
    fn adapt_freq(&self, entry: &Self) -> u64 {
        ((StreamFormat::SUBTYPE_AAF as u64) << StreamFormat::SUBTYPE_SHIFT)
            | ((entry.nsr as u64) << Self::NSR_SHIFT)
            | ((self.packetization_type as u64) << Self::TYPE_SHIFT)
            | ((self.bit_depth as u64) << Self::BIT_DEPTH_SHIFT)
            | ((self.channels_per_frame as u64) << Self::CHANNELS_PER_FRAME_SHIFT)
            | ((entry.samples_per_frame as u64) << Self::SAMPLES_PER_FRAME_SHIFT)
    }
}

impl From<u64> for AafFormat {
    fn from(val: u64) -> Self {
        AafFormat {
            upto: (val >> Self::UPTO_SHIFT) & Self::UPTO_MASK > 0,
            nsr: ((val >> Self::NSR_SHIFT) & Self::NSR_MASK) as u8,
            packetization_type: ((val >> Self::TYPE_SHIFT) & Self::TYPE_MASK) as u8,
            bit_depth: ((val >> Self::BIT_DEPTH_SHIFT) & Self::BIT_DEPTH_MASK) as u8,
            channels_per_frame: ((val >> Self::CHANNELS_PER_FRAME_SHIFT)
                & Self::CHANNELS_PER_FRAME_MASK) as u16,
            samples_per_frame: ((val >> Self::SAMPLES_PER_FRAME_SHIFT)
                & Self::SAMPLES_PER_FRAME_MASK) as u16,
        }
    }
}

/// The fields of stream format value in subtype of clock reference format.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CrfFormat {
    /// The base frequency of clock, in Hz.
    pub base_freq: u32,
}

impl CrfFormat {
    const BASE_FREQ_SHIFT: usize = 0;
    const BASE_FREQ_MASK: u64 = 0x7ffff;
}

impl From<u64> for CrfFormat {
    fn from(val: u64) -> Self {
        CrfFormat {
            base_freq: ((val >> Self::BASE_FREQ_SHIFT) & Self::BASE_FREQ_MASK) as u32,
        }
    }
}

/// Judge whether the entry advertised for a stream is available as replacement of the format
/// currently applied to the stream, at the given sampling frequency in Hz.
///
/// The two values are candidates for matching at all when they express the same subtype and
/// agree bit-for-bit outside the compare mask of the subtype. When the entry carries the
/// up-to flag with a sufficient ceiling for the count of channels, the result is built from
/// the current format with the sampling frequency fields of the entry, so that the channel
/// geometry of the running stream is kept. Without the flag the count of channels must match
/// exactly and the entry itself is the result. A clock reference stream identifies a clock
/// base instead of an audio rate; for the subtype the decoded base frequencies are compared
/// and the given frequency takes no role.
///
/// `None` expresses that no compatible value exists for the triplet.
pub fn compatible_format(current: u64, freq: u32, entry: u64) -> Option<u64> {
    match (StreamFormat::from(current), StreamFormat::from(entry)) {
        (StreamFormat::Iec61883Iidc(current_format), StreamFormat::Iec61883Iidc(entry_format)) => {
            if (current & !Iec61883IidcFormat::COMPARE_MASK)
                != (entry & !Iec61883IidcFormat::COMPARE_MASK)
            {
                None
            } else if entry_format.freq() != freq {
                None
            } else if entry_format.upto {
                if entry_format.mbla_count >= current_format.mbla_count {
                    Some(current_format.adapt_freq(&entry_format))
                } else {
                    None
                }
            } else if entry_format.mbla_count == current_format.mbla_count {
                Some(entry)
            } else {
                None
            }
        }
        (StreamFormat::Aaf(current_format), StreamFormat::Aaf(entry_format)) => {
            if (current & !AafFormat::COMPARE_MASK) != (entry & !AafFormat::COMPARE_MASK) {
                None
            } else if entry_format.freq() != freq {
                None
            } else if entry_format.upto {
                if entry_format.channels_per_frame >= current_format.channels_per_frame {
                    Some(current_format.adapt_freq(&entry_format))
                } else {
                    None
                }
            } else if entry_format.channels_per_frame == current_format.channels_per_frame {
                Some(entry)
            } else {
                None
            }
        }
        (StreamFormat::Crf(current_format), StreamFormat::Crf(entry_format)) => {
            if current_format.base_freq == entry_format.base_freq {
                Some(entry)
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Find the first entry in the advertised list available as replacement of the current format
/// at the given sampling frequency. The order of entries is the order of preference and is
/// kept as advertised.
pub fn find_compatible_format(current: u64, freq: u32, entries: &[u64]) -> Option<u64> {
    entries
        .iter()
        .find_map(|&entry| compatible_format(current, freq, entry))
}

#[cfg(test)]
mod tests {
    use crate::*;

    #[test]
    fn iec61883_iidc_format_from() {
        let format = Iec61883IidcFormat::from(0x00a0010840000800);
        assert_eq!(true, format.sf);
        assert_eq!(0x10, format.iec61883_type);
        assert_eq!(0x00, format.packetization_type);
        assert_eq!(0x01, format.sfc);
        assert_eq!(44100, format.freq());
        assert_eq!(0x08, format.dbs);
        assert_eq!(false, format.blocking);
        assert_eq!(true, format.nonblocking);
        assert_eq!(false, format.upto);
        assert_eq!(false, format.synchronous);
        assert_eq!(0x00, format.iec60958_count);
        assert_eq!(0x08, format.mbla_count);
        assert_eq!(0x00, format.midi_count);
        assert_eq!(0x00, format.smpte_count);

        let format = Iec61883IidcFormat::from(0x00a0060860000800);
        assert_eq!(0x06, format.sfc);
        assert_eq!(192000, format.freq());
        assert_eq!(true, format.nonblocking);
        assert_eq!(true, format.upto);
        assert_eq!(0x08, format.mbla_count);
    }

    #[test]
    fn aaf_format_from() {
        let format = AafFormat::from(0x0205021802006000);
        assert_eq!(false, format.upto);
        assert_eq!(0x05, format.nsr);
        assert_eq!(48000, format.freq());
        assert_eq!(0x02, format.packetization_type);
        assert_eq!(24, format.bit_depth);
        assert_eq!(8, format.channels_per_frame);
        assert_eq!(6, format.samples_per_frame);

        let format = AafFormat::from(0x021702180200c000);
        assert_eq!(true, format.upto);
        assert_eq!(0x07, format.nsr);
        assert_eq!(96000, format.freq());
        assert_eq!(8, format.channels_per_frame);
        assert_eq!(12, format.samples_per_frame);
    }

    #[test]
    fn crf_format_from() {
        let format = CrfFormat::from(0x041006010000bb80);
        assert_eq!(48000, format.base_freq);

        let format = CrfFormat::from(0x0410060100017700);
        assert_eq!(96000, format.base_freq);
    }

    #[test]
    fn stream_format_from() {
        assert_eq!(0x00, StreamFormat::subtype(0x00a0010840000800));
        assert_eq!(0x02, StreamFormat::subtype(0x0205021802006000));
        assert_eq!(0x04, StreamFormat::subtype(0x041006010000bb80));
        // The version bit takes no part in the subtype.
        assert_eq!(0x00, StreamFormat::subtype(0x80a0010840000800));

        if let StreamFormat::Iec61883Iidc(format) = StreamFormat::from(0x00a0010840000800) {
            assert_eq!(0x08, format.mbla_count);
        } else {
            unreachable!();
        }

        if let StreamFormat::Aaf(format) = StreamFormat::from(0x0205021802006000) {
            assert_eq!(8, format.channels_per_frame);
        } else {
            unreachable!();
        }

        if let StreamFormat::Crf(format) = StreamFormat::from(0x041006010000bb80) {
            assert_eq!(48000, format.base_freq);
        } else {
            unreachable!();
        }

        if let StreamFormat::Reserved(val) = StreamFormat::from(0x05ff000000000000) {
            assert_eq!(0x05ff000000000000, val);
        } else {
            unreachable!();
        }
    }

    #[test]
    fn stream_format_from_any_value() {
        // Decoding is total and repeatable for arbitrary values.
        [0u64, u64::MAX, 0x123456789abcdef0, 0x7f00dead00000000]
            .iter()
            .for_each(|&val| {
                assert_eq!(StreamFormat::from(val), StreamFormat::from(val));
            });
    }

    #[test]
    fn compatible_format_crf() {
        assert_eq!(
            Some(0x041006010000bb80),
            compatible_format(0x041006010000bb80, 48000, 0x041006010000bb80)
        );
        // The base frequencies differ.
        assert_eq!(
            None,
            compatible_format(0x041006010000bb80, 48000, 0x0410060100017700)
        );
    }

    #[test]
    fn compatible_format_aaf_exact() {
        assert_eq!(
            Some(0x020702180200c000),
            compatible_format(0x0205021802006000, 96000, 0x020702180200c000)
        );
        // The entry is coded for a different sampling frequency than the requested one.
        assert_eq!(
            None,
            compatible_format(0x0205021802006000, 48000, 0x020702180200c000)
        );
        // The counts of channels differ without the up-to flag.
        assert_eq!(
            None,
            compatible_format(0x0205021800806000, 96000, 0x020702180200c000)
        );
    }

    #[test]
    fn compatible_format_aaf_upto() {
        assert_eq!(
            Some(0x020702180080c000),
            compatible_format(0x0205021800806000, 96000, 0x021702180200c000)
        );
        // The ceiling is below the current count of channels.
        assert_eq!(
            None,
            compatible_format(0x0205021802006000, 96000, 0x021702180080c000)
        );
    }

    #[test]
    fn compatible_format_iec61883_exact() {
        assert_eq!(
            Some(0x00a0060840000800),
            compatible_format(0x00a0010840000800, 192000, 0x00a0060840000800)
        );
        // The entry is coded for a different sampling frequency than the requested one.
        assert_eq!(
            None,
            compatible_format(0x00a0010840000800, 96000, 0x00a0060840000800)
        );
        // The counts of channels differ without the up-to flag.
        assert_eq!(
            None,
            compatible_format(0x00a0010240000200, 192000, 0x00a0060840000800)
        );
    }

    #[test]
    fn compatible_format_iec61883_upto() {
        assert_eq!(
            Some(0x00a0060240000200),
            compatible_format(0x00a0010240000200, 192000, 0x00a0060860000800)
        );
        // The ceiling is below the current count of channels.
        assert_eq!(
            None,
            compatible_format(0x00a0010840000800, 192000, 0x00a0060260000200)
        );
    }

    #[test]
    fn compatible_format_upto_builds_replacement() {
        // With the up-to flag and an equal count of channels the replacement is still built
        // from the current format instead of returning the entry as is; the up-to flag and
        // the fields outside the adapted set are left zero.
        assert_eq!(
            Some(0x00a0060840000800),
            compatible_format(0x00a0010840000800, 192000, 0x00a0060860000800)
        );
        assert_eq!(
            Some(0x00a0060840000800),
            compatible_format(0x00a0010840000810, 192000, 0x00a0060860000810)
        );
    }

    #[test]
    fn compatible_format_subtype_mismatch() {
        assert_eq!(
            None,
            compatible_format(0x0205021802006000, 96000, 0x00a0060840000800)
        );
        assert_eq!(
            None,
            compatible_format(0x00a0010840000800, 48000, 0x041006010000bb80)
        );
        // Unrecognized subtypes never match, even to themselves.
        assert_eq!(
            None,
            compatible_format(0x7f00000000000000, 48000, 0x7f00000000000000)
        );
    }

    #[test]
    fn compatible_format_structural_mismatch() {
        // The modes of packetization differ.
        assert_eq!(
            None,
            compatible_format(0x00a0010840000800, 192000, 0x00a00e0840000800)
        );
        // The depths of PCM sample differ.
        assert_eq!(
            None,
            compatible_format(0x0205021802006000, 96000, 0x020702200200c000)
        );
    }

    #[test]
    fn find_compatible_format_first_fit() {
        let current = 0x00a0010240000200;
        let entries = [
            0x00a0010240000200,
            0x00a0060440000200,
            0x00a0060240000200,
        ];
        assert_eq!(
            Some(0x00a0060440000200),
            find_compatible_format(current, 192000, &entries)
        );

        // The order of entries is the tie-break between the available ones.
        let entries = [
            0x00a0010240000200,
            0x00a0060240000200,
            0x00a0060440000200,
        ];
        assert_eq!(
            Some(0x00a0060240000200),
            find_compatible_format(current, 192000, &entries)
        );

        assert_eq!(None, find_compatible_format(current, 88200, &entries));
        assert_eq!(None, find_compatible_format(current, 192000, &[]));
    }
}
