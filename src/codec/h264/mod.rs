//! # H.264/AVC Access Unit Inspection
//!
//! Just enough of H.264 to normalize an access unit for a program stream:
//!
//! - Walking length-prefixed (ISO/IEC 14496-15) NAL units
//! - Picture type and delimiter detection through [`NalClassifier`]
//! - Parameter set extraction from an `AVCDecoderConfigurationRecord`
//!
//! ## Example
//!
//! ```rust
//! use psmux::codec::h264::{H264Classifier, NalClassifier, PicType};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // One IDR slice behind a 4-byte length prefix
//! let access_unit = [0x00, 0x00, 0x00, 0x03, 0x25, 0xb8, 0x20];
//!
//! let summary = H264Classifier::new().classify(&access_unit, 4)?;
//! assert_eq!(summary.pic_type, PicType::I);
//! assert!(!summary.has_aud);
//! # Ok(())
//! # }
//! ```

/// Length-prefixed NAL iteration, classification and avcC parsing
pub mod parser;
/// NAL unit and picture types
pub mod types;

#[doc(inline)]
pub use parser::*;
#[doc(inline)]
pub use types::*;
