//! Sensor event stream: newline-delimited JSON, one lifecycle event or frame per line.

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Deserialize;
use std::{
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
    sync::mpsc::Sender,
    thread,
    time::Duration,
};

use crate::frame::Frame;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SensorEvent {
    Init,
    Connect,
    Disconnect,
    /// The sensor is going away; also sent when the stream ends.
    Exit,
    Frame(Frame),
}

pub fn parse_line(line: &str) -> Result<Option<SensorEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

pub fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead + Send>> {
    match path {
        None => Ok(Box::new(BufReader::new(io::stdin()))),
        Some(p) if p == Path::new("-") => Ok(Box::new(BufReader::new(io::stdin()))),
        Some(p) => {
            let f = File::open(p).with_context(|| format!("failed to open {}", p.display()))?;
            Ok(Box::new(BufReader::new(f)))
        }
    }
}

/// Paces frames by their sensor timestamps.
#[derive(Debug, Default)]
struct Pacer {
    last_us: Option<u64>,
}

impl Pacer {
    fn delay(&mut self, frame: &Frame) -> Option<Duration> {
        let ts = frame.timestamp?;
        let delay = self
            .last_us
            .filter(|last| ts > *last)
            .map(|last| Duration::from_micros(ts - last));
        self.last_us = Some(ts);
        delay
    }
}

/// Read events until EOF or the receiver hangs up. Bad lines are logged and
/// skipped. An `Exit` is always sent last.
pub fn pump<R, T>(reader: R, realtime: bool, tx: &Sender<T>) -> Result<()>
where
    R: BufRead,
    T: From<SensorEvent>,
{
    let mut pacer = Pacer::default();
    for (n, line) in reader.lines().enumerate() {
        let line = line.context("failed to read sensor stream")?;
        let event = match parse_line(&line) {
            Ok(Some(ev)) => ev,
            Ok(None) => continue,
            Err(e) => {
                warn!("sensor line {}: {e}", n + 1);
                continue;
            }
        };
        if realtime {
            if let SensorEvent::Frame(f) = &event {
                if let Some(d) = pacer.delay(f) {
                    thread::sleep(d);
                }
            }
        }
        let exit = matches!(event, SensorEvent::Exit);
        if tx.send(event.into()).is_err() {
            return Ok(());
        }
        if exit {
            return Ok(());
        }
    }
    debug!("sensor stream ended");
    let _ = tx.send(SensorEvent::Exit.into());
    Ok(())
}

pub fn spawn_reader<T>(reader: Box<dyn BufRead + Send>, realtime: bool, tx: Sender<T>) -> thread::JoinHandle<()>
where
    T: From<SensorEvent> + Send + 'static,
{
    thread::spawn(move || {
        if let Err(e) = pump(reader, realtime, &tx) {
            warn!("sensor reader stopped: {e:#}");
            let _ = tx.send(SensorEvent::Exit.into());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_parse_lifecycle_and_frames() {
        assert!(matches!(parse_line(r#"{"event":"connect"}"#).unwrap(), Some(SensorEvent::Connect)));
        assert!(parse_line("   ").unwrap().is_none());
        assert!(parse_line("# recorded 2013-05-01").unwrap().is_none());
        let ev = parse_line(r#"{"event":"frame","id":12,"hands":[{"id":1,"fingers":[
            {"id":2,"tip_position":[0,0,0],"tip_velocity":[1,2,3]}]}]}"#)
        .unwrap();
        let Some(SensorEvent::Frame(f)) = ev else {
            panic!("expected a frame");
        };
        assert_eq!(f.id, 12);
        assert_eq!(f.finger_count(), 1);
        assert!(parse_line(r#"{"event":"explode"}"#).is_err());
    }

    #[test]
    fn test_pump_skips_bad_lines_and_ends_with_exit() {
        let input = "{\"event\":\"init\"}\nnot json\n{\"event\":\"frame\",\"id\":1}\n";
        let (tx, rx) = mpsc::channel::<SensorEvent>();
        pump(input.as_bytes(), false, &tx).unwrap();
        let got: Vec<_> = rx.try_iter().collect();
        assert_eq!(got.len(), 3);
        assert!(matches!(got[0], SensorEvent::Init));
        assert!(matches!(got[1], SensorEvent::Frame(ref f) if f.id == 1));
        assert!(matches!(got[2], SensorEvent::Exit));
    }

    #[test]
    fn test_pump_stops_at_exit() {
        let input = "{\"event\":\"exit\"}\n{\"event\":\"frame\",\"id\":1}\n";
        let (tx, rx) = mpsc::channel::<SensorEvent>();
        pump(input.as_bytes(), false, &tx).unwrap();
        let got: Vec<_> = rx.try_iter().collect();
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn test_pacer_uses_timestamp_deltas() {
        let mut p = Pacer::default();
        let mut f: Frame = serde_json::from_str(r#"{"id":1,"timestamp":1000}"#).unwrap();
        assert_eq!(p.delay(&f), None);
        f.timestamp = Some(17_667);
        assert_eq!(p.delay(&f), Some(Duration::from_micros(16_667)));
        f.timestamp = Some(10);
        assert_eq!(p.delay(&f), None);
    }
}
