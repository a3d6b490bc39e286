pub mod cli;
pub mod color;
pub mod commands;
pub mod config;
pub mod date;
pub mod datetime;
pub mod error;
pub mod holiday;
pub mod locale;
pub mod lunar;
pub mod range;
pub mod render;
pub mod view;

use std::ffi::OsString;

use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting hilal"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.hilalrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let inv = cli::Invocation::parse(
    &cfg, cli.rest
  )?;
  let renderer =
    render::Renderer::new(&cfg)?;

  let lunar = lunar::UmmAlQura;
  let session = commands::Session {
    settings: cfg.display_settings()?,
    holidays: cfg.holidays()?,
    lunar:    &lunar,
    now:      Utc::now()
  };

  commands::dispatch(
    &session, &cfg, &renderer, inv
  )?;

  info!("done");
  Ok(())
}
