//! Check and repair a settings file.
//!
//! Exits 0 when the file is valid (or was repaired with `--write`) and 1
//! when it needs repair or does not exist.

use anyhow::{Context, Result};
use clap::Parser;
use rust_i18n::t;
use serde_json::Value;
use settle::fix;
use settle::settings::Settings;
use settle::store::Dirs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

rust_i18n::i18n!("locales", fallback = "en");

#[derive(Debug, Parser)]
#[command(name = "settle-doctor", about = "Check and repair a settings file")]
struct Args {
    /// Settings file to check (defaults to the system settings path)
    file: Option<PathBuf>,

    /// Write the repaired settings back to the file
    #[arg(long)]
    write: bool,

    /// Report language
    #[arg(long, default_value = "en")]
    lang: String,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    rust_i18n::set_locale(&args.lang);

    let path = match args.file {
        Some(path) => path,
        None => Dirs::from_system()
            .context("could not resolve the system config directory")?
            .settings_path(),
    };
    let shown = path.display().to_string();

    if !path.exists() {
        println!("{}", t!("doctor.missing", path = shown.as_str()));
        return Ok(ExitCode::from(1));
    }

    let content =
        std::fs::read_to_string(&path).with_context(|| format!("could not read {shown}"))?;

    let raw: Value = match serde_json::from_str(&content) {
        Ok(raw) => raw,
        Err(e) => {
            println!("{}", t!("doctor.unparsable", path = shown.as_str(), error = e.to_string()));
            if args.write {
                write_repaired(&path, Settings::fix(&Value::Null).repaired())?;
                println!("{}", t!("doctor.wrote", path = shown.as_str()));
                return Ok(ExitCode::SUCCESS);
            }
            return Ok(ExitCode::from(1));
        }
    };

    let fixed = Settings::fix(&raw);
    let broken = fix::repaired_keys(fixed.original(), fixed.repaired());

    if broken.is_empty() {
        if let Err(e) = fixed.value().validate() {
            println!("{}", t!("doctor.invalid", path = shown.as_str(), error = e.to_string()));
            return Ok(ExitCode::from(1));
        }
        println!("{}", t!("doctor.ok", path = shown.as_str()));
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{}",
        t!("doctor.repairs", path = shown.as_str(), count = broken.len().to_string())
    );
    for field in &broken {
        println!("  - {field}");
    }

    if args.write {
        write_repaired(&path, fixed.repaired())?;
        println!("{}", t!("doctor.wrote", path = shown.as_str()));
        return Ok(ExitCode::SUCCESS);
    }
    Ok(ExitCode::from(1))
}

fn write_repaired(path: &Path, repaired: &Value) -> Result<()> {
    let mut contents = serde_json::to_string_pretty(repaired)?;
    contents.push('\n');
    std::fs::write(path, contents).with_context(|| format!("could not write {}", path.display()))
}
