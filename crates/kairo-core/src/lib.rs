pub mod api;
pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datekey;
pub mod model;
pub mod recurrence;
pub mod render;
pub mod reorder;
pub mod session;
pub mod snapshot;
pub mod stats;
pub mod timegrid;

use std::ffi::OsString;
use std::io::{
  self,
  Write
};

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let stdout = io::stdout();
  let mut out = stdout.lock();
  run_to(raw_args, &mut out)
}

/// Like [`run`], writing command
/// output to `out`.
#[tracing::instrument(skip_all)]
pub fn run_to<W: Write>(
  raw_args: Vec<OsString>,
  out: &mut W
) -> anyhow::Result<()> {
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting kairo CLI"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  )?;
  debug!(?cfg, "effective config");

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let snapshot =
    snapshot::Snapshot::open(&data_dir)
      .with_context(|| {
        format!(
          "failed to open snapshot at \
           {}",
          data_dir.display()
        )
      })?;

  let renderer =
    render::Renderer::new(&cfg);
  let ctx = commands::CommandContext {
    cfg:       &cfg,
    snapshot:  &snapshot,
    renderer:  &renderer,
    today:     cfg.today(),
    json:      cli.json
  };

  commands::dispatch(
    ctx,
    cli.command,
    out
  )?;

  info!("done");
  Ok(())
}
