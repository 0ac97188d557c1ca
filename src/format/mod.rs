/// MPEG-2 Program Stream muxing
pub mod ps;

pub use self::ps::{ProgramStreamMuxer, ProgramStreamWriter};
