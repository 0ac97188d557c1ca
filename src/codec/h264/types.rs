/// NAL unit types that matter when normalizing an access unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NALUnitType {
    /// Unspecified or reserved type (0, 13..=31)
    Unspecified = 0,
    /// Coded slice of a non-IDR picture
    CodedSliceNonIDR = 1,
    /// Coded slice data partition A
    CodedSliceDataPartitionA = 2,
    /// Coded slice data partition B
    CodedSliceDataPartitionB = 3,
    /// Coded slice data partition C
    CodedSliceDataPartitionC = 4,
    /// Coded slice of an IDR picture
    CodedSliceIDR = 5,
    /// Supplemental enhancement information
    SEI = 6,
    /// Sequence parameter set
    SPS = 7,
    /// Picture parameter set
    PPS = 8,
    /// Access unit delimiter
    AccessUnitDelimiter = 9,
    /// End of sequence
    EndOfSequence = 10,
    /// End of stream
    EndOfStream = 11,
    /// Filler data
    FillerData = 12,
}

impl From<u8> for NALUnitType {
    fn from(header: u8) -> Self {
        match header & 0x1F {
            1 => NALUnitType::CodedSliceNonIDR,
            2 => NALUnitType::CodedSliceDataPartitionA,
            3 => NALUnitType::CodedSliceDataPartitionB,
            4 => NALUnitType::CodedSliceDataPartitionC,
            5 => NALUnitType::CodedSliceIDR,
            6 => NALUnitType::SEI,
            7 => NALUnitType::SPS,
            8 => NALUnitType::PPS,
            9 => NALUnitType::AccessUnitDelimiter,
            10 => NALUnitType::EndOfSequence,
            11 => NALUnitType::EndOfStream,
            12 => NALUnitType::FillerData,
            _ => NALUnitType::Unspecified,
        }
    }
}

impl NALUnitType {
    /// Whether the NAL unit starts with a slice header carrying `slice_type`.
    pub fn has_slice_header(self) -> bool {
        matches!(
            self,
            NALUnitType::CodedSliceNonIDR
                | NALUnitType::CodedSliceDataPartitionA
                | NALUnitType::CodedSliceIDR
        )
    }

    /// Whether the NAL unit is a sequence or picture parameter set.
    pub fn is_parameter_set(self) -> bool {
        matches!(self, NALUnitType::SPS | NALUnitType::PPS)
    }
}

/// Coding type of the picture carried by an access unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PicType {
    /// Intra coded
    I,
    /// Predicted
    P,
    /// Bi-predicted
    B,
    /// No slice could be classified
    #[default]
    Unknown,
}

impl PicType {
    /// Maps an H.264 `slice_type` (0..=9) to a picture type.
    pub fn from_slice_type(slice_type: u32) -> Self {
        match slice_type % 5 {
            0 | 3 => PicType::P,
            1 => PicType::B,
            _ => PicType::I,
        }
    }

    /// `primary_pic_type` signalled in an access unit delimiter.
    ///
    /// 0 allows I slices only, 1 adds P, 2 adds B; 7 allows every slice type.
    pub fn primary_pic_type(self) -> u8 {
        match self {
            PicType::I => 0,
            PicType::P => 1,
            PicType::B => 2,
            PicType::Unknown => 7,
        }
    }

    /// Whether the picture can be decoded without earlier pictures.
    pub fn is_key(self) -> bool {
        self == PicType::I
    }
}

/// What classification learned about a length-prefixed access unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NalSummary {
    /// An access unit delimiter is already present.
    pub has_aud: bool,
    /// Picture type of the first slice, or `Unknown` when there is none.
    pub pic_type: PicType,
    /// An SPS or PPS is carried in-band.
    pub has_parameter_sets: bool,
}
