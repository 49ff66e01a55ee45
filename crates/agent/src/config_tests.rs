// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::ffi::OsString;
use std::time::Duration;

use clap::Parser;

use super::{AgentConfig, InstanceStrategy};

fn parse(args: &[&str]) -> anyhow::Result<AgentConfig> {
    let mut argv = vec!["hookcast"];
    argv.extend_from_slice(args);
    Ok(AgentConfig::try_parse_from(argv)?)
}

fn strings(args: &[OsString]) -> Vec<String> {
    args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
}

#[test]
fn defaults() -> anyhow::Result<()> {
    let config = parse(&[])?;
    assert!(!config.background);
    let settings = config.connection_settings();
    assert_eq!(settings.retry_min, Duration::from_secs(5));
    assert_eq!(settings.retry_max, Duration::from_secs(60));
    assert_eq!(settings.connect_timeout, Duration::from_secs(5));
    assert_eq!(settings.idle_timeout, Duration::from_secs(60));
    assert_eq!(config.instance_strategy()?, InstanceStrategy::Process);
    assert_eq!(config.log_dir.to_string_lossy(), "logs");
    config.validate()?;
    Ok(())
}

#[test]
fn background_with_server() -> anyhow::Result<()> {
    let config = parse(&["--background", "http://relay:59999"])?;
    assert!(config.background);
    assert_eq!(config.server.as_deref(), Some("http://relay:59999"));
    Ok(())
}

#[test]
fn validate_rejects_max_below_min() -> anyhow::Result<()> {
    let config = parse(&["--retry-min-ms", "1000", "--retry-max-ms", "500"])?;
    assert!(config.validate().is_err());
    Ok(())
}

#[test]
fn validate_rejects_unknown_choices() -> anyhow::Result<()> {
    assert!(parse(&["--instance", "pidfile"])?.validate().is_err());
    assert!(parse(&["--notifier", "dbus"])?.validate().is_err());
    assert!(parse(&["--log-format", "xml"])?.validate().is_err());
    Ok(())
}

#[test]
fn lockfile_strategy_parses_case_insensitively() -> anyhow::Result<()> {
    let config = parse(&["--instance", "LockFile"])?;
    assert_eq!(config.instance_strategy()?, InstanceStrategy::Lockfile);
    Ok(())
}

#[test]
fn background_args_mark_role_and_forward_tuning() -> anyhow::Result<()> {
    let config = parse(&[
        "--retry-min-ms",
        "100",
        "--log-dir",
        "/var/log/hookcast",
        "--instance",
        "lockfile",
        "--lock-path",
        "/run/hookcast.lock",
    ])?;
    let args = strings(&config.background_args("http://relay:59999"));

    assert_eq!(args[0], "--background");
    assert_eq!(args[1], "http://relay:59999");
    let joined = args.join(" ");
    assert!(joined.contains("--retry-min-ms 100"), "{joined}");
    assert!(joined.contains("--log-dir /var/log/hookcast"), "{joined}");
    assert!(joined.contains("--instance lockfile"), "{joined}");
    assert!(joined.contains("--lock-path /run/hookcast.lock"), "{joined}");

    // The worker's argv must parse back into the same settings.
    let mut argv = vec!["hookcast".to_owned()];
    argv.extend(args);
    let worker = AgentConfig::try_parse_from(argv)?;
    assert!(worker.background);
    assert_eq!(worker.retry_min_ms, 100);
    assert_eq!(worker.instance_strategy()?, InstanceStrategy::Lockfile);
    Ok(())
}

#[test]
fn relative_log_dir_is_made_absolute_for_worker() -> anyhow::Result<()> {
    let config = parse(&[])?;
    let args = strings(&config.background_args("http://relay:59999"));
    let pos = args.iter().position(|a| a == "--log-dir").ok_or_else(|| anyhow::anyhow!("no --log-dir"))?;
    assert!(std::path::Path::new(&args[pos + 1]).is_absolute());
    assert!(args[pos + 1].ends_with("logs"));
    Ok(())
}
