use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::Level;

use super::command::{Cli, InfoArgs};
use crate::input::InputReader;
use dabeti::fic::FicDecoder;
use dabeti::process::extract::{EtiFrame, Extractor, StreamType};
use dabeti::process::parse::{ParsedFrame, Parser};
use dabeti::utils::errors::ExtractError;

pub fn cmd_info(args: &InfoArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Analysing ETI stream: {}", args.input.display());

    let mut input_reader = InputReader::new(&args.input)?;
    let mut extractor = Extractor::default();
    let mut parser = Parser::default();

    // Configure fail level based on strict mode
    let fail_level = if cli.strict {
        Level::Warn
    } else {
        Level::Error
    };
    parser.set_fail_level(fail_level);

    let mut context = InfoContext::default();

    // Create progress bar for frame counting if enabled
    if let Some(multi) = multi {
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb.set_message("Analysing frames...");
        context.pb = Some(pb);
    }

    input_reader.process_chunks(64 * 1024, |chunk| {
        context.total_bytes += chunk.len();
        extractor.push_bytes(chunk);

        for frame_result in extractor.by_ref() {
            let frame = match frame_result {
                Ok(frame) => frame,
                Err(ExtractError::InsufficientData) => continue,
                Err(e) => return Err(e.into()),
            };

            context.process_frame(&frame, &mut parser, cli)?;
        }

        context.stream_type = extractor.stream_type();

        Ok(true)
    })?;

    if let Some(ref pb) = context.pb {
        pb.finish_and_clear();
    }

    if context.frame_count == 0 {
        println!("No ETI frames found in the input.");
        return Ok(());
    }

    context.display_summary();

    Ok(())
}

#[derive(Default)]
struct InfoContext {
    stream_type: Option<StreamType>,
    first_frame: Option<ParsedFrame>,
    fic_decoder: FicDecoder,
    frame_count: usize,
    total_bytes: usize,
    info_displayed: bool,
    pb: Option<ProgressBar>,
}

impl InfoContext {
    fn process_frame(&mut self, frame: &EtiFrame, parser: &mut Parser, cli: &Cli) -> Result<()> {
        match parser.parse(frame) {
            Ok(parsed) => {
                if !parsed.fic.is_empty() {
                    self.fic_decoder.set_mode_identity(parsed.fc.mid);
                    if let Err(e) = self.fic_decoder.process_fic(&parsed.fic) {
                        if cli.strict {
                            return Err(e.into());
                        }
                        log::warn!("Frame {}: {e}", self.frame_count);
                    }
                }

                if self.first_frame.is_none() {
                    self.first_frame = Some(parsed);

                    if !self.info_displayed {
                        self.display_immediate_info();
                        self.info_displayed = true;
                    }
                }
            }
            Err(e) => {
                if cli.strict {
                    return Err(e);
                }
                log::warn!("Parse error at frame {}: {e}", self.frame_count);
            }
        }

        self.frame_count += 1;

        if self.frame_count.is_multiple_of(100) {
            if let Some(ref pb) = self.pb {
                pb.set_message(format!("Analysing frames...       {}", self.frame_count));
                pb.tick();
            }
        }

        Ok(())
    }

    fn display_immediate_info(&self) {
        let Some(parsed) = &self.first_frame else {
            return;
        };

        self.print_suspended(|| {
            println!();
            println!("ETI Stream Information");
            println!("======================");
            println!();

            let fc = &parsed.fc;
            println!("  Mode identity             {}", fc.mid);
            println!(
                "  FIC                       {}",
                if fc.ficf { "present" } else { "absent" }
            );
            println!("  Streams                   {}", fc.nst);

            for stream in &parsed.streams {
                println!(
                    "    SubChId {:2}  SAD={:<4} {:3} kbit/s  {}",
                    stream.scid,
                    stream.sad,
                    stream.bitrate_kbps(),
                    stream.protection().short_label()
                );
            }
            println!();
        });
    }

    fn display_summary(&self) {
        let ensemble = &self.fic_decoder.ensemble;

        println!("Ensemble");
        println!("  EId                       0x{:04X}", ensemble.eid);
        let label = ensemble.label.label.trim_end();
        if !label.is_empty() {
            println!(
                "  Label                     \"{label}\" (short \"{}\")",
                ensemble.label.shortlabel().trim_end()
            );
        }
        println!("  Services                  {}", ensemble.services.len());
        println!("  Subchannels               {}", ensemble.subchannels.len());

        for service in &ensemble.services {
            let kind = if service.programme_not_data {
                "programme"
            } else {
                "data"
            };
            println!(
                "  Service 0x{:X} ({kind})  \"{}\"",
                service.id,
                service.label.label.trim_end()
            );
            for component in &service.components {
                let subch = component
                    .subch_id
                    .map_or("?".to_owned(), |id| id.to_string());
                let scids = component.scids.map_or("?".to_owned(), |s| s.to_string());
                println!("    Component SubChId={subch} SCIdS={scids}");
            }
        }

        for subchannel in &ensemble.subchannels {
            println!(
                "  Subchannel {:2}             start={} CUs={} {}",
                subchannel.id, subchannel.start_address, subchannel.num_cu, subchannel.protection
            );
        }

        println!();
        println!("Analysis Summary");
        if let Some(stream_type) = self.stream_type {
            println!("  Carriage                  {stream_type}");
        }
        println!("  Frames processed          {}", self.frame_count);

        let size_mb = self.total_bytes as f64 / 1_000_000.0;
        println!(
            "  Size                      {size_mb:.2} MB ({} bytes)",
            self.total_bytes
        );

        // one ETI frame covers 24 ms
        let duration_secs = self.frame_count as f64 * 0.024;
        println!("  Duration                  {}", time_str(duration_secs));
        println!();
    }

    fn print_suspended<F: FnOnce()>(&self, f: F) {
        match &self.pb {
            Some(pb) => pb.suspend(f),
            None => f(),
        }
    }
}

fn time_str(seconds: f64) -> String {
    let total = seconds as u64;
    format!(
        "{}:{:02}:{:06.3}",
        total / 3600,
        (total % 3600) / 60,
        seconds % 60.0
    )
}

#[test]
fn duration_rendering() {
    assert_eq!(time_str(0.024), "0:00:00.024");
    assert_eq!(time_str(3725.5), "1:02:05.500");
}
