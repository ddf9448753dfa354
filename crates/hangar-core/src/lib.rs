pub mod cli;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod filter;
pub mod header;
pub mod order;
pub mod params;
pub mod progress;
pub mod render;
pub mod task;
pub mod view;

use std::ffi::OsString;

use anyhow::{
  Context,
  anyhow
};
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

use crate::cli::{
  Command,
  ViewArgs
};
use crate::config::Config;
use crate::datastore::DataStore;
use crate::order::{
  Comparators,
  Listing,
  resolve_sort
};
use crate::params::RequestParams;
use crate::render::Renderer;
use crate::view::{
  ViewOptions,
  build_view
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
    "starting hangar CLI"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = Config::load(
    cli.hangarrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let store = DataStore::open(
    &data_dir
  )
  .with_context(|| {
    format!(
      "failed to open datastore at {}",
      data_dir.display()
    )
  })?;

  let renderer = Renderer::new(&cfg)?;

  match cli.command.unwrap_or_else(
    || Command::List(ViewArgs::default())
  ) {
    | Command::List(args) => {
      cmd_list(
        &store, &cfg, &renderer, &args
      )?
    }
    | Command::Summary(args) => {
      cmd_summary(
        &store, &cfg, &renderer, &args
      )?
    }
    | Command::Import {
      file
    } => {
      let snapshot = store
        .import_file(&file)
        .with_context(|| {
          format!(
            "failed to import {}",
            file.display()
          )
        })?;
      println!(
        "imported {} tasks, {} \
         categories, {} priorities",
        snapshot.tasks.len(),
        snapshot.categories.len(),
        snapshot.priorities.len()
      );
    }
  }

  info!("done");
  Ok(())
}

fn view_options(
  cfg: &Config,
  args: &ViewArgs
) -> anyhow::Result<ViewOptions> {
  let listing = match args
    .listing
    .as_deref()
  {
    | Some(raw) => {
      Listing::parse(raw).ok_or_else(
        || {
          anyhow!(
            "unknown listing: {raw} \
             (expected tasks, \
             category or subtasks)"
          )
        }
      )?
    }
    | None => cfg.default_listing()
  };

  let mut opts =
    ViewOptions::new(listing, Utc::now());
  opts.default_sort = resolve_sort(
    &cfg.default_order(),
    listing
  );
  Ok(opts)
}

#[tracing::instrument(skip_all)]
fn cmd_list(
  store: &DataStore,
  cfg: &Config,
  renderer: &Renderer,
  args: &ViewArgs
) -> anyhow::Result<()> {
  let snapshot = store.load_snapshot()?;
  let params = RequestParams::from_query(
    args.query_pairs()
  );
  let opts = view_options(cfg, args)?;
  let view = build_view(
    &snapshot,
    &params,
    &opts,
    &Comparators::standard()
  );

  if args.json {
    renderer.print_view_json(&view)
  } else {
    renderer.print_view(&view)
  }
}

#[tracing::instrument(skip_all)]
fn cmd_summary(
  store: &DataStore,
  cfg: &Config,
  renderer: &Renderer,
  args: &ViewArgs
) -> anyhow::Result<()> {
  let snapshot = store.load_snapshot()?;
  let params = RequestParams::from_query(
    args.query_pairs()
  );
  let opts = view_options(cfg, args)?;
  let view = build_view(
    &snapshot,
    &params,
    &opts,
    &Comparators::standard()
  );

  if args.json {
    println!(
      "{}",
      serde_json::to_string_pretty(
        &view.summary
      )?
    );
    Ok(())
  } else {
    renderer.print_summary(&view.summary)
  }
}
