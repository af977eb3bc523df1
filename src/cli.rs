use anyhow::{Result, anyhow};
use pico_args::Arguments;
use serde_json::{Value, json};
use std::{
    env,
    path::{Path, PathBuf},
};

use crate::config::{self, Settings};
use crate::daemon::{self, RunOptions};
use crate::source;

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains(["-h", "--help"]) {
        print_help();
        return Ok(());
    }

    let subcmd: Option<String> = pargs.subcommand()?;

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.opt_free_from_str()?;
            match topic {
                Some(t) => print_subcmd_help(&t),
                None => print_help(),
            }
            Ok(())
        }

        Some("run") => {
            let opts = RunOptions {
                input: pargs.opt_value_from_str("--input")?,
                config: pargs.opt_value_from_str("--config")?,
                host: pargs.opt_value_from_str("--host")?,
                port: pargs.opt_value_from_str("--port")?,
                adaptive: pargs.contains("--adaptive"),
                realtime: pargs.contains("--realtime"),
                dry_run: pargs.contains("--dry-run"),
            };
            reject_leftovers(pargs)?;
            daemon::run(opts)
        }

        Some("calibrate") => {
            let input: Option<PathBuf> = pargs.opt_value_from_str("--input")?;
            reject_leftovers(pargs)?;
            let reader = source::open_input(input.as_deref())?;
            match daemon::calibrate(reader)? {
                Some(volume) => {
                    print!("{}", daemon::calibration_toml(&volume)?);
                    Ok(())
                }
                None => Err(anyhow!("no fingertips in the recording; nothing to calibrate")),
            }
        }

        Some("check") => {
            let path: Option<PathBuf> = pargs.opt_value_from_str("--config")?;
            reject_leftovers(pargs)?;
            let path = match path {
                Some(p) => p,
                None => config::default_config_path()?,
            };
            println!("{}", serde_json::to_string_pretty(&check_report(&path)?)?);
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

/// Effective settings of a config file, validated.
fn check_report(path: &Path) -> Result<Value> {
    let settings = Settings::load(path)?;
    Ok(json!({
        "ok": true,
        "config": path,
        "settings": settings,
    }))
}

fn reject_leftovers(pargs: Arguments) -> Result<()> {
    let rest = pargs.finish();
    if !rest.is_empty() {
        return Err(anyhow!("unexpected arguments: {rest:?}"));
    }
    Ok(())
}

fn print_help() {
    println!(
        r#"leaptuio — hand tracking to TUIO cursor bridge

USAGE:
  leaptuio help [command]             Show general or command-specific help
  leaptuio run [options]              Translate a sensor stream and send TUIO
  leaptuio calibrate [--input PATH]   Measure a bounding volume from a recording
  leaptuio check [--config PATH]      Validate and print the configuration

RUN OPTIONS:
  --input PATH     JSON-lines sensor stream ('-' or omitted: stdin)
  --config PATH    Config file (default ~/.config/leaptuio/config.toml)
  --host HOST      TUIO destination host (overrides config)
  --port PORT      TUIO destination port (overrides config)
  --adaptive       Grow the bounding volume from observed fingertips
  --realtime       Pace recorded frames by their timestamps
  --dry-run        Log bundles instead of sending them

TIPS:
  - Log level: RUST_LOG=debug leaptuio run ...
  - Edits to the config file are picked up while running
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "run" => println!(
            "usage: leaptuio run [--input PATH] [--config PATH] [--host HOST] [--port PORT] [--adaptive] [--realtime] [--dry-run]\nTranslates frames into /tuio/2Dcur bundles until the stream ends or SIGINT/SIGTERM."
        ),
        "calibrate" => println!(
            "usage: leaptuio calibrate [--input PATH]\nReplays a recording through adaptive calibration and prints a [calibration] table."
        ),
        "check" => println!(
            "usage: leaptuio check [--config PATH]\nLoads and validates the config, prints effective settings as JSON."
        ),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_config(name: &str, body: &str) -> PathBuf {
        let path = env::temp_dir().join(format!("leaptuio-{}-{name}.toml", std::process::id()));
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_check_reports_effective_settings() {
        let path = write_config("check-ok", "[output]\nport = 4444\n\n[calibration]\nmode = \"adaptive\"\n");
        let report = check_report(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(report["ok"], true);
        assert_eq!(report["config"], path.to_str().unwrap());
        assert_eq!(report["settings"]["output"]["host"], "127.0.0.1");
        assert_eq!(report["settings"]["output"]["port"], 4444);
        assert_eq!(report["settings"]["tracking"]["fingers_per_hand"], 20);
        assert_eq!(report["settings"]["calibration"]["mode"], "adaptive");
    }

    #[test]
    fn test_check_rejects_invalid_config() {
        let path = write_config("check-bad", "[tracking]\nfingers_per_hand = 2\n");
        let err = check_report(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(matches!(
            err.downcast_ref::<config::ConfigError>(),
            Some(config::ConfigError::Capacity(_))
        ));
    }

    #[test]
    fn test_check_missing_file() {
        let path = env::temp_dir().join(format!("leaptuio-{}-absent.toml", std::process::id()));
        assert!(check_report(&path).is_err());
    }
}
