//! Decoder library for ETI (Ensemble Transport Interface) streams as
//! specified in ETSI EN 300 799.
//!
//! ## Technical Overview
//!
//! An ETI NI stream is a sequence of 6144 byte frames, one per 24 ms.
//! Each frame carries the Fast Information Channel (FIC) with the
//! multiplex configuration and service information, and the Main
//! Service Channel (MST) with the subchannel payloads.
//!
//! ## Quick Start
//!
//! Steps for processing an ETI stream:
//!
//! 1. Extract frames from the carriage using [`process::extract::Extractor`]
//! 2. Parse frames into LIDATA fields using [`process::parse::Parser`]
//! 3. Decode the FIC using [`fic::FicDecoder`]
//!
//! ```rust,no_run
//! use dabeti::fic::FicDecoder;
//! use dabeti::process::{extract::Extractor, parse::Parser};
//!
//! let mut extractor = Extractor::default();
//! let mut parser = Parser::default();
//! let mut fic_decoder = FicDecoder::new();
//!
//! let data: &[u8] = &[];
//! extractor.push_bytes(data);
//!
//! for frame_result in extractor {
//!     match frame_result {
//!         Ok(frame) => {
//!             let parsed = parser.parse(&frame)?;
//!             fic_decoder.set_mode_identity(parsed.fc.mid);
//!             let report = fic_decoder.process_fic(&parsed.fic)?;
//!             for fib in &report.fibs {
//!                 for fig in &fib.figs {
//!                     println!("FIG {}/{}", fig.figtype, fig.ext);
//!                 }
//!             }
//!         }
//!         Err(extract_error) => {
//!             eprintln!("Frame extraction error: {extract_error}");
//!         }
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Processing pipeline for ETI streams.
///
/// 1. **Frame Extraction** ([`process::extract`]): Finds the ETI sync
///    word and cuts the input into 6144 byte frames.
///
/// 2. **Parsing** ([`process::parse`]): Validates and slices LIDATA
///    frames into FIC and stream payloads.
///
/// 3. **DAB+ decoding** ([`process::dabplus`]): Superframe assembly
///    for selected subchannels.
pub mod process;

/// Fast Information Channel decoding.
///
/// FIB and FIG parsing, the ensemble database, label character sets,
/// FIG repetition statistics and the multiplexer watermark decoder.
pub mod fic;

/// Data structures representing ETI and FIC components.
pub mod structs;

/// Utility functions and supporting infrastructure.
pub mod utils;
