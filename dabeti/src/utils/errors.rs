#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err.into());
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("Input does not look like a known ETI carriage (no sync word found)")]
    FormatUnrecognized,

    #[error("Declared frame length {0} exceeds the 6144 byte ETI frame size")]
    FrameTooLarge(usize),

    #[error("Short read: got {read} bytes of a {expected} byte frame")]
    IncompleteFrame { read: usize, expected: usize },

    #[error("Insufficient buffer data for frame extraction")]
    InsufficientData,
}

#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    #[error("ERR byte {0:#04X} signals a corrupted frame")]
    ErrByteSet(u8),

    #[error("FSYNC {read:#08X} does not alternate with previous sync {prev:#08X}")]
    SyncNotAlternating { read: u32, prev: u32 },

    #[error("FCT discontinuity: read {read}, expected {expected}")]
    FctDiscontinuity { read: u8, expected: u8 },

    #[error("ETI header CRC mismatch. Calculated {calculated:#06X}, Read {read:#06X}")]
    HeaderCrcMismatch { calculated: u16, read: u16 },

    #[error("ETI EOF CRC mismatch. Calculated {calculated:#06X}, Read {read:#06X}")]
    EofCrcMismatch { calculated: u16, read: u16 },

    #[error("Frame layout exceeds the 6144 byte frame: {0}")]
    LayoutOverrun(String),

    #[error("Frame length field FL={fl} words does not match the header layout ({expected} words)")]
    InvalidFrameLength { fl: u16, expected: u16 },
}

#[derive(thiserror::Error, Debug)]
pub enum FicError {
    #[error("FIB CRC mismatch. Calculated {calculated:#06X}, Read {read:#06X}")]
    FibCrcMismatch { calculated: u16, read: u16 },

    #[error("FIG {figtype}/{ext} of length {len} overruns its FIB")]
    FigOverrun { figtype: u8, ext: u8, len: usize },

    #[error("FIC length {0} is not a multiple of the 32 byte FIB size")]
    UnalignedFicLength(usize),
}

#[derive(thiserror::Error, Debug)]
pub enum SuperframeError {
    #[error("No plausible firecode word found in {0} buffered bytes")]
    FirecodeNotFound(usize),

    #[error("Reed-Solomon decode failed on column {column} of the superframe")]
    RsUncorrectable { column: usize },

    #[error("Invalid DAB+ audio parameters: mpeg_surround_config={0}")]
    InvalidAudioParams(u8),

    #[error("AU {index} start {start} is out of order or beyond the superframe end {end}")]
    InvalidAuBoundary {
        index: usize,
        start: usize,
        end: usize,
    },

    #[error("AU {index} CRC mismatch. Calculated {calculated:#06X}, Read {read:#06X}")]
    AuCrcMismatch {
        index: usize,
        calculated: u16,
        read: u16,
    },
}
