use anyhow::{Context, Result};
use log::{error, info, warn};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde::Serialize;
use signal_hook::{
    consts::{SIGINT, SIGTERM},
    iterator::Signals,
};
use std::{
    io::BufRead,
    path::{Path, PathBuf},
    sync::mpsc::{self, Sender},
    thread,
};

use crate::config::{CalibrationMode, CalibrationSettings, Settings};
use crate::frame::Frame;
use crate::mapper::{BoundingVolume, Calibration, CoordinateMapper};
use crate::source::{self, SensorEvent};
use crate::translator::{FrameTranslator, Translation};
use crate::transport::{LogTransport, Transport, UdpTransport};
use crate::tuio::BundleEncoder;

pub enum DaemonMsg {
    Sensor(SensorEvent),
    Reload,
    Shutdown,
}

impl From<SensorEvent> for DaemonMsg {
    fn from(ev: SensorEvent) -> Self {
        DaemonMsg::Sensor(ev)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub input: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub adaptive: bool,
    pub realtime: bool,
    pub dry_run: bool,
}

impl RunOptions {
    /// Command-line flags win over the file.
    pub fn apply(&self, mut settings: Settings) -> Result<Settings> {
        if let Some(h) = &self.host {
            settings.output.host = h.clone();
        }
        if let Some(p) = self.port {
            settings.output.port = p;
        }
        if self.adaptive {
            settings.calibration.mode = CalibrationMode::Adaptive;
        }
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub frames: u64,
    pub duplicates: u64,
    pub empty: u64,
    pub bundles: u64,
    pub gestures: u64,
}

/// Owns the translator and the transport; fed one event at a time.
pub struct Session<T: Transport> {
    translator: FrameTranslator,
    calibration: CalibrationSettings,
    encoder: BundleEncoder,
    transport: T,
    stats: Stats,
}

impl<T: Transport> Session<T> {
    pub fn new(settings: &Settings, transport: T) -> Result<Self> {
        let ids = settings.identity()?;
        info!(
            "tracking: {} ids per hand, velocity scale {}, {:?} calibration",
            ids.capacity(),
            settings.tracking.velocity_scale,
            settings.calibration.mode
        );
        let translator =
            FrameTranslator::new(settings.mapper(), ids, settings.tracking.velocity_scale);
        Ok(Self {
            translator,
            calibration: settings.calibration.clone(),
            encoder: BundleEncoder,
            transport,
            stats: Stats::default(),
        })
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    #[cfg(test)]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The mapper, and with it any learned adaptive volume, survives unless
    /// the `[calibration]` section itself changed.
    pub fn reconfigure(&mut self, settings: &Settings) -> Result<()> {
        let ids = settings.identity()?;
        self.translator.reconfigure(ids, settings.tracking.velocity_scale);
        if settings.calibration != self.calibration {
            if settings.calibration.mode == CalibrationMode::Adaptive {
                info!("calibration changed; adaptive volume restarts empty");
            }
            self.translator.replace_mapper(settings.mapper());
            self.calibration = settings.calibration.clone();
        }
        Ok(())
    }

    pub fn on_frame(&mut self, frame: &Frame) {
        self.stats.frames += 1;
        match self.translator.process(frame) {
            Translation::Duplicate => self.stats.duplicates += 1,
            Translation::Empty => self.stats.empty += 1,
            Translation::Report(report) => {
                let bundle = self
                    .encoder
                    .bundle(&report.cursors, &report.alive, report.frame_id);
                self.transport.send(&bundle);
                self.stats.bundles += 1;
                for g in &report.gestures {
                    self.stats.gestures += 1;
                    info!("[gesture] {g}");
                }
            }
        }
    }

    /// Returns false once the sensor has gone away.
    pub fn on_sensor(&mut self, ev: SensorEvent) -> bool {
        match ev {
            SensorEvent::Init => info!("sensor: initialized"),
            SensorEvent::Connect => info!("sensor: connected"),
            SensorEvent::Disconnect => warn!("sensor: disconnected"),
            SensorEvent::Exit => {
                info!("sensor: exited");
                return false;
            }
            SensorEvent::Frame(f) => self.on_frame(&f),
        }
        true
    }
}

pub fn run(opts: RunOptions) -> Result<()> {
    let (file_settings, cfg_path) = Settings::load_or_install_default(opts.config.as_deref())?;
    let settings = opts.apply(file_settings)?;
    info!("config: {}", cfg_path.display());

    let (tx, rx) = mpsc::channel::<DaemonMsg>();
    spawn_signal_listener(tx.clone())?;
    let _watcher = match watch_config(&cfg_path, tx.clone()) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!("config hot reload disabled: {e}");
            None
        }
    };
    let input = source::open_input(opts.input.as_deref())?;
    source::spawn_reader(input, opts.realtime, tx);

    if opts.dry_run {
        drive(Session::new(&settings, LogTransport)?, rx, &settings, &opts, &cfg_path)
    } else {
        let udp = UdpTransport::connect(&settings.output.host, settings.output.port)?;
        drive(Session::new(&settings, udp)?, rx, &settings, &opts, &cfg_path)
    }
}

fn drive<T: Transport>(
    mut session: Session<T>,
    rx: mpsc::Receiver<DaemonMsg>,
    settings: &Settings,
    opts: &RunOptions,
    cfg_path: &Path,
) -> Result<()> {
    let mut output = settings.output.clone();
    for msg in rx {
        match msg {
            DaemonMsg::Sensor(ev) => {
                if !session.on_sensor(ev) {
                    break;
                }
            }
            DaemonMsg::Reload => match Settings::load(cfg_path)
                .map_err(anyhow::Error::from)
                .and_then(|s| opts.apply(s))
            {
                Ok(s) => {
                    if s.output != output {
                        warn!("output destination changes take effect after a restart");
                        output = s.output.clone();
                    }
                    match session.reconfigure(&s) {
                        Ok(()) => info!("config reloaded"),
                        Err(e) => error!("reload failed: {e}"),
                    }
                }
                Err(e) => error!("reload failed, keeping last good config: {e:#}"),
            },
            DaemonMsg::Shutdown => break,
        }
    }
    let st = session.stats();
    info!(
        "stopped: {} frames, {} bundles, {} duplicates, {} empty, {} gestures",
        st.frames, st.bundles, st.duplicates, st.empty, st.gestures
    );
    Ok(())
}

fn spawn_signal_listener(tx: Sender<DaemonMsg>) -> Result<()> {
    let mut signals = Signals::new([SIGINT, SIGTERM]).context("failed to register signal handlers")?;
    thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            info!("received signal {sig}, shutting down");
            let _ = tx.send(DaemonMsg::Shutdown);
        }
    });
    Ok(())
}

fn watch_config(path: &Path, tx: Sender<DaemonMsg>) -> notify::Result<RecommendedWatcher> {
    let name = path.file_name().map(|n| n.to_os_string());
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        match res {
            Ok(ev) if ev.kind.is_modify() || ev.kind.is_create() => {
                let ours = ev
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == name);
                if ours {
                    let _ = tx.send(DaemonMsg::Reload);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("config watch error: {e}"),
        }
    })?;
    // editors often replace the file, so watch the directory
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    watcher.watch(dir, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

/// Sweep a recording through adaptive calibration and return the final volume.
pub fn calibrate<R: BufRead>(reader: R) -> Result<Option<BoundingVolume>> {
    let mut mapper = CoordinateMapper::new(Calibration::Adaptive);
    for (n, line) in reader.lines().enumerate() {
        let line = line.context("failed to read recording")?;
        match source::parse_line(&line) {
            Ok(Some(SensorEvent::Frame(frame))) => {
                for finger in frame.hands.iter().flat_map(|h| &h.fingers) {
                    mapper.map(&finger.tip_position);
                }
            }
            Ok(Some(SensorEvent::Exit)) => break,
            Ok(_) => {}
            Err(e) => warn!("line {}: {e}", n + 1),
        }
    }
    let volume = *mapper.volume();
    Ok((!volume.is_empty()).then_some(volume))
}

/// `[calibration]` table for a measured volume.
pub fn calibration_toml(volume: &BoundingVolume) -> Result<String> {
    #[derive(Serialize)]
    struct Doc {
        calibration: CalibrationSettings,
    }
    let doc = Doc {
        calibration: CalibrationSettings {
            mode: CalibrationMode::Fixed,
            min: [volume.min.x, volume.min.y, volume.min.z],
            max: [volume.max.x, volume.max.y, volume.max.z],
        },
    };
    Ok(toml::to_string(&doc)?)
}
