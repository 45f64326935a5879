pub mod battery;
pub mod cli;
pub mod config;
pub mod datetime;
pub mod entry;
pub mod error;
pub mod grid;
pub mod layout;
pub mod pipeline;
pub mod raster;
pub mod separate;
pub mod store;
pub mod template;

use std::ffi::OsString;

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
  let cli =
    cli::GlobalCli::parse_from(raw_args);

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting inkal"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .into_iter()
      .map(|kv| (kv.key, kv.value))
  );
  let display = cfg
    .display_config()
    .context("invalid configuration")?;

  let page = match &display.template {
    | Some(path) => {
      template::PageTemplate::load(path)?
    }
    | None => {
      template::PageTemplate::default()
    }
  };

  let entries =
    store::load_entries(&cli.entries)?;
  let today = cli.today.unwrap_or_else(
    || datetime::today_in(display.timezone)
  );
  debug!(%today, entries = entries.len(), "render inputs ready");

  let rasterizer =
    raster::ChromeRasterizer::new(
      display.chromium_binary.clone(),
      display.rasterize_timeout
    );
  let refreshed =
    datetime::now_in(display.timezone);
  let pipeline = pipeline::RenderPipeline::new(
    display, page, rasterizer
  )
  .with_span(tracing::info_span!(
    "render",
    %today
  ));

  let output = pipeline
    .render(&pipeline::RenderRequest {
      entries: &entries,
      today,
      refreshed,
      battery_level: cli.battery
    })
    .context("render failed")?;

  if cli.emit_html {
    let page_path = store::save_page(
      &output.html,
      &cli.out_dir
    )?;
    info!(page = %page_path.display(), "wrote page");
  }

  store::save_image_pair(
    &output.images,
    &cli.out_dir
  )
  .with_context(|| {
    format!(
      "failed to save images to {}",
      cli.out_dir.display()
    )
  })?;

  info!("done");
  Ok(())
}
