/// ETI frame extraction from raw, streamed and framed carriages.
///
/// Provides the [`Extractor`](extract::Extractor) for finding the ETI
/// sync word and extracting individual [`EtiFrame`](extract::EtiFrame)
/// objects from continuous input data.
pub mod extract;

/// LIDATA frame parsing.
///
/// Provides the [`Parser`](parse::Parser) for converting raw 6144 byte
/// frames into [`ParsedFrame`](parse::ParsedFrame) objects with their
/// FIC and MST payloads.
pub mod parse;

/// DAB+ superframe decoding for selected subchannels.
///
/// Provides the [`SuperframeDecoder`](dabplus::SuperframeDecoder) that
/// Reed-Solomon corrects audio superframes and cuts them into access
/// units.
pub mod dabplus;
