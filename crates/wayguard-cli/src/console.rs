//! Terminal rendition of the alert channels.
//!
//! The banner is printed only when it changes, haptic pulses show as a short
//! marker and speech as a quoted line.

use colored::{ColoredString, Colorize};
use std::io::Write;

use wayguard_hal::{AlertColor, AlertSink, SpeechRequest, VisualUpdate};
use wayguard_types::WayError;

/// [`AlertSink`] writing to any [`Write`] target.
pub struct ConsoleSink<W: Write + Send> {
    out: W,
    banner: Option<VisualUpdate>,
    pub haptic_pulses: usize,
    pub phrases: usize,
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            banner: None,
            haptic_pulses: 0,
            phrases: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, channel: &str, line: impl std::fmt::Display) -> Result<(), WayError> {
        writeln!(self.out, "{line}").map_err(|e| WayError::Sink {
            channel: channel.to_string(),
            details: e.to_string(),
        })
    }
}

/// Split a `#RRGGBB` code into its channels.
fn rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

fn paint(text: &str, color: AlertColor) -> ColoredString {
    match rgb(color.hex()) {
        Some((r, g, b)) => text.truecolor(r, g, b).bold(),
        None => text.bold(),
    }
}

impl<W: Write + Send> AlertSink for ConsoleSink<W> {
    fn on_visual_update(&mut self, update: &VisualUpdate) -> Result<(), WayError> {
        if self.banner.as_ref() == Some(update) {
            return Ok(());
        }
        self.banner = Some(update.clone());
        match update {
            VisualUpdate::Show { text, color } => {
                let line = format!("  ▌ {}", paint(text, *color));
                self.write_line("visual", line)
            }
            VisualUpdate::Clear => {
                let line = format!("  {}", "▌ path clear".dimmed());
                self.write_line("visual", line)
            }
        }
    }

    fn on_haptic(&mut self) -> Result<(), WayError> {
        self.haptic_pulses += 1;
        let line = format!("    {}", "~ buzz".magenta());
        self.write_line("haptic", line)
    }

    fn on_speech(&mut self, request: &SpeechRequest) -> Result<(), WayError> {
        self.phrases += 1;
        let line = format!("    {} \"{}\"", "say".green(), request.text);
        self.write_line("speech", line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output(sink: ConsoleSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn banner_printed_once_per_change() {
        let mut sink = ConsoleSink::new(Vec::new());
        let stop = VisualUpdate::Show {
            text: "STOP!".to_string(),
            color: AlertColor::Orange,
        };
        sink.on_visual_update(&stop).unwrap();
        sink.on_visual_update(&stop).unwrap();
        sink.on_visual_update(&VisualUpdate::Clear).unwrap();
        let out = output(sink);
        assert_eq!(out.matches("STOP!").count(), 1);
        assert!(out.contains("path clear"));
    }

    #[test]
    fn banner_colours_come_from_hex_codes() {
        assert_eq!(rgb(AlertColor::Orange.hex()), Some((255, 165, 0)));
        assert_eq!(rgb(AlertColor::Cyan.hex()), Some((0, 255, 255)));
        assert_eq!(rgb("FFA500"), None);
        assert_eq!(rgb("#FFA5"), None);
    }

    #[test]
    fn haptic_and_speech_are_counted() {
        let mut sink = ConsoleSink::new(Vec::new());
        sink.on_haptic().unwrap();
        sink.on_speech(&SpeechRequest {
            text: "STOP chair".to_string(),
            flush_queue: true,
        })
        .unwrap();
        assert_eq!(sink.haptic_pulses, 1);
        assert_eq!(sink.phrases, 1);
        assert!(output(sink).contains("STOP chair"));
    }
}
