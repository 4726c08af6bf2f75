use std::fs::File;
use std::io::Write;

use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::Level;

use super::command::{AnalyseArgs, Cli};
use crate::input::InputReader;
use crate::stats::{StatisticsDocument, SubchannelDumpStats};
use dabeti::fic::rates::RateStatistics;
use dabeti::fic::{FibReport, FicDecoder, FicReport};
use dabeti::process::dabplus::SuperframeDecoder;
use dabeti::process::extract::{EtiFrame, Extractor, FibSource};
use dabeti::process::parse::{ParsedFrame, Parser};
use dabeti::utils::errors::ExtractError;

pub fn cmd_analyse(args: &AnalyseArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Analysing ETI stream: {}", args.input.display());

    let mut input_reader = InputReader::new(&args.input)?;
    let mut context = AnalyseContext::new(args, cli);

    if let Some(multi) = multi {
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb.set_message("Analysing frames...");
        context.pb = Some(pb);
    }

    if args.fic_dump {
        context.run_fic_dump(&mut input_reader)?;
    } else {
        context.run_eti(&mut input_reader)?;
    }

    context.finish()
}

/// MSC extraction state for the `--decode-stream` subchannel.
struct MscDump {
    subch_id: u8,
    decoder: Option<SuperframeDecoder>,
    file: Option<File>,
    access_units: usize,
    bytes_written: usize,
    rs_corrections: usize,
}

struct AnalyseContext<'a> {
    args: &'a AnalyseArgs,
    strict: bool,
    parser: Parser,
    fic_decoder: FicDecoder,
    frame_count: usize,
    msc: Option<MscDump>,
    pb: Option<ProgressBar>,
}

impl<'a> AnalyseContext<'a> {
    fn new(args: &'a AnalyseArgs, cli: &Cli) -> Self {
        let mut parser = Parser::default();
        let fail_level = if cli.strict {
            Level::Warn
        } else {
            Level::Error
        };
        parser.set_fail_level(fail_level);
        parser.set_ignore_error(args.ignore_error);

        let msc = args.decode_stream.map(|subch_id| MscDump {
            subch_id,
            decoder: None,
            file: None,
            access_units: 0,
            bytes_written: 0,
            rs_corrections: 0,
        });

        Self {
            args,
            strict: cli.strict,
            parser,
            fic_decoder: FicDecoder::new(),
            frame_count: 0,
            msc,
            pb: None,
        }
    }

    fn run_eti(&mut self, input_reader: &mut InputReader) -> Result<()> {
        let mut extractor = Extractor::default();

        input_reader.process_chunks(64 * 1024, |chunk| {
            extractor.push_bytes(chunk);

            for frame_result in extractor.by_ref() {
                let frame = match frame_result {
                    Ok(frame) => frame,
                    Err(ExtractError::InsufficientData) => continue,
                    Err(e) => return Err(e.into()),
                };

                if !self.process_frame(&frame)? {
                    return Ok(false);
                }
            }

            Ok(true)
        })?;

        if let Err(e) = extractor.finish() {
            log::warn!("{e}");
        }

        Ok(())
    }

    /// FIC-only input: a bare concatenation of 32 byte FIBs.
    fn run_fic_dump(&mut self, input_reader: &mut InputReader) -> Result<()> {
        let mut source = FibSource::default();

        input_reader.process_chunks(64 * 1024, |chunk| {
            source.push_bytes(chunk);

            for fib in source.by_ref() {
                if !self.process_dumped_fib(&fib)? {
                    return Ok(false);
                }
            }

            Ok(true)
        })?;

        if source.leftover() != 0 {
            log::warn!("{} trailing bytes after the last FIB", source.leftover());
        }

        Ok(())
    }

    fn process_frame(&mut self, frame: &EtiFrame) -> Result<bool> {
        let parsed = match self.parser.parse(frame) {
            Ok(parsed) => parsed,
            Err(e) => {
                if self.strict {
                    return Err(e);
                }
                log::warn!("Frame {}: {e}", self.frame_count);
                return Ok(self.advance());
            }
        };

        let fic_report = if parsed.fic.is_empty() {
            None
        } else {
            self.fic_decoder.set_mode_identity(parsed.fc.mid);
            match self.fic_decoder.process_fic(&parsed.fic) {
                Ok(report) => Some(report),
                Err(e) => {
                    if self.strict {
                        return Err(e.into());
                    }
                    log::warn!("Frame {}: {e}", self.frame_count);
                    None
                }
            }
        };

        self.print_suspended(|| self.display_frame(&parsed, fic_report.as_ref()));
        self.dump_msc(&parsed)?;

        Ok(self.advance())
    }

    fn process_dumped_fib(&mut self, fib: &[u8]) -> Result<bool> {
        match self.fic_decoder.process_fic(fib) {
            Ok(report) => {
                self.print_suspended(|| {
                    for fib_report in &report.fibs {
                        self.display_fib(self.frame_count, fib_report);
                    }
                });
            }
            Err(e) => {
                if self.strict {
                    return Err(e.into());
                }
                log::warn!("FIB {}: {e}", self.frame_count);
            }
        }

        Ok(self.advance())
    }

    /// Counts the processed frame, honoring the `-n` limit.
    fn advance(&mut self) -> bool {
        self.frame_count += 1;

        if self.frame_count.is_multiple_of(100) {
            if let Some(ref pb) = self.pb {
                pb.set_message(format!("Analysing frames...       {}", self.frame_count));
                pb.tick();
            }
        }

        self.args
            .num_frames
            .is_none_or(|limit| self.frame_count < limit)
    }

    fn dump_msc(&mut self, parsed: &ParsedFrame) -> Result<()> {
        let Some(msc) = &mut self.msc else {
            return Ok(());
        };
        let Some(pos) = parsed.streams.iter().position(|s| s.scid == msc.subch_id) else {
            return Ok(());
        };

        let stream = &parsed.streams[pos];
        let decoder = msc
            .decoder
            .get_or_insert_with(|| SuperframeDecoder::new(stream.subchannel_index()));

        match decoder.push(&parsed.stream_data[pos]) {
            Ok(Some(superframe)) => {
                if msc.file.is_none() {
                    let name = format!("stream-{}.msc", msc.subch_id);
                    log::info!("writing subchannel {} access units to {name}", msc.subch_id);
                    msc.file = Some(File::create(name)?);
                }
                if let Some(file) = msc.file.as_mut() {
                    for au in &superframe.aus {
                        file.write_all(au)?;
                        msc.bytes_written += au.len();
                    }
                }
                msc.access_units += superframe.aus.len();
                msc.rs_corrections += superframe.rs_corrections;
            }
            Ok(None) => {}
            Err(e) => log::warn!("Subchannel {}: {e}", msc.subch_id),
        }

        Ok(())
    }

    fn display_frame(&self, parsed: &ParsedFrame, fic_report: Option<&FicReport>) {
        let fc = &parsed.fc;
        println!(
            "Frame {} FCT={} FICF={} NST={} FP={} MID={} FL={} words",
            self.frame_count, fc.fct, fc.ficf as u8, fc.nst, fc.fp, fc.mid, fc.fl
        );
        println!(
            "  MNSC=0x{:04x} header CRC {}",
            parsed.mnsc,
            ok_str(parsed.header_crc_ok)
        );

        for (index, stream) in parsed.streams.iter().enumerate() {
            println!(
                "  Stream {index} SCId={} SAD={} STL={} => {} kbit/s, {}",
                stream.scid,
                stream.sad,
                stream.stl,
                stream.bitrate_kbps(),
                stream.protection().describe()
            );
        }

        if let Some(report) = fic_report {
            for fib in &report.fibs {
                self.display_fib(fib.index as usize, fib);
            }
        }

        if self.args.fic {
            println!("{}", self.fic_decoder.carousel_occupancy());
        }

        println!(
            "  EOF CRC {}, TIST 0x{:08x} ({:.3} ms)",
            ok_str(parsed.eof_crc_ok),
            parsed.tist.raw,
            parsed.tist.milliseconds()
        );
    }

    fn display_fib(&self, index: usize, fib: &FibReport) {
        println!("  FIB {index} CRC {}", ok_str(fib.crc_ok));

        for fig in &fib.figs {
            if !self.selected(fig.figtype, fig.ext) {
                continue;
            }

            println!(
                "    FIG {}/{} (len={}) {}",
                fig.figtype, fig.ext, fig.len, fig.header
            );
            for msg in &fig.result.msgs {
                let indent = 6 + 2 * msg.indent;
                println!("{:indent$}{}", "", msg.text);
            }
            for error in &fig.result.errors {
                println!("      ERROR: {error}");
            }
        }
    }

    fn selected(&self, figtype: u8, ext: u8) -> bool {
        self.args.filter.is_empty()
            || self
                .args
                .filter
                .iter()
                .any(|f| f.figtype == figtype && f.ext == ext)
    }

    fn print_suspended<F: FnOnce()>(&self, f: F) {
        match &self.pb {
            Some(pb) => pb.suspend(f),
            None => f(),
        }
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(ref pb) = self.pb {
            pb.finish_and_clear();
        }

        println!();
        println!("{} frames analysed", self.frame_count);

        if let Some(msc) = &self.msc {
            println!(
                "Subchannel {}: {} access units ({} bytes) written to stream-{}.msc, {} bytes RS-corrected",
                msc.subch_id,
                msc.access_units,
                msc.bytes_written,
                msc.subch_id,
                msc.rs_corrections
            );
        }

        if self.args.watermark {
            println!("Watermark:");
            println!("  {}", self.fic_decoder.wm_decoder.calculate_watermark());
        }

        if self.args.rates || self.args.rates_frames {
            let per_second = self.args.rates;
            println!("{}", RateStatistics::header(per_second));
            for line in self.fic_decoder.rates.analysis(true, per_second) {
                println!("{line}");
            }
        }

        if let Some(path) = &self.args.statistics {
            let decoded = self
                .msc
                .iter()
                .map(|msc| SubchannelDumpStats {
                    subchannel_id: msc.subch_id,
                    access_units: msc.access_units,
                    bytes_written: msc.bytes_written,
                    rs_corrections: msc.rs_corrections,
                })
                .collect();
            let document = StatisticsDocument::from_ensemble(&self.fic_decoder.ensemble, decoded);
            document.write_to(path)?;
            log::info!("statistics written to {}", path.display());
        }

        self.fic_decoder.clear_change_db();

        Ok(())
    }
}

fn ok_str(ok: bool) -> &'static str {
    if ok { "ok" } else { "FAIL" }
}
