use crate::{emit_json, OutputMode};
use proverbs::config::{self, ProverbsConfig};
use proverbs::ui::{self, Icons, Spinner};
use proverbs::{BackendKind, QueryEngine, StorageBackend, open_backend};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Global options every command sees
pub struct Context {
    pub config_path: Option<PathBuf>,
    pub backend: Option<BackendKind>,
    pub output: OutputMode,
}

impl Context {
    fn open(&self) -> anyhow::Result<Box<dyn StorageBackend>> {
        let config = config::load_config(self.config_path.as_deref())?;
        let store = config.resolve(self.backend)?;
        tracing::debug!("Resolved store config: {:?}", store);
        Ok(open_backend(&store)?)
    }
}

pub fn run_import(ctx: &Context, path: &Path) -> anyhow::Result<()> {
    let mut backend = ctx.open()?;
    let spinner = Spinner::new(&format!("Importing {}", path.display()));
    let result = proverbs::import_file(backend.as_mut(), path);
    let elapsed = spinner.finish();
    let report = result?;

    if ctx.output.is_human() {
        if report.inserted == 0 {
            ui::warn(&format!("{} has no records", path.display()));
        }
        ui::success(&format!("Imported {} proverbs into {} backend", report.inserted, backend.kind()));
        ui::timing(&elapsed);
    } else {
        emit_json(&report)?;
    }
    Ok(())
}

fn print_proverbs(ctx: &Context, list: &[proverbs::Proverb]) -> anyhow::Result<()> {
    if ctx.output.is_human() {
        ui::proverbs(list);
        Ok(())
    } else {
        emit_json(&list)
    }
}

pub fn run_all(ctx: &Context) -> anyhow::Result<()> {
    let backend = ctx.open()?;
    let found = QueryEngine::new(backend.as_ref()).all()?;
    print_proverbs(ctx, &found)
}

pub fn run_contains(ctx: &Context, text: &str) -> anyhow::Result<()> {
    let backend = ctx.open()?;
    let found = QueryEngine::new(backend.as_ref()).contains(text)?;
    print_proverbs(ctx, &found)
}

pub fn run_tagged(ctx: &Context, tag: &str) -> anyhow::Result<()> {
    let backend = ctx.open()?;
    let found = QueryEngine::new(backend.as_ref()).tagged(tag)?;
    print_proverbs(ctx, &found)
}

#[derive(Serialize)]
struct TagCount<'a> {
    tag: &'a str,
    count: usize,
}

pub fn run_tags(ctx: &Context) -> anyhow::Result<()> {
    let backend = ctx.open()?;
    let counts = QueryEngine::new(backend.as_ref()).tag_counts()?;

    if ctx.output.is_human() {
        let table = ui::tag_table(&counts);
        if !table.is_empty() {
            println!("{}", table);
        }
    } else {
        let rows: Vec<TagCount> = counts
            .iter()
            .map(|(tag, count)| TagCount { tag, count: *count })
            .collect();
        emit_json(&rows)?;
    }
    Ok(())
}

pub fn run_stats(ctx: &Context) -> anyhow::Result<()> {
    let backend = ctx.open()?;
    let stats = QueryEngine::new(backend.as_ref()).stats()?;

    if ctx.output.is_human() {
        ui::header("Proverbs Statistics");
        println!(
            "{}",
            ui::stats_table(&[
                ("Backend", stats.backend.to_string()),
                ("Proverbs", stats.proverbs.to_string()),
                ("Distinct tags", stats.distinct_tags.to_string()),
            ])
        );
    } else {
        emit_json(&stats)?;
    }
    Ok(())
}

pub fn run_init(ctx: &Context, force: bool) -> anyhow::Result<()> {
    let path = ctx.config_path.clone().unwrap_or_else(config::default_config_path);
    config::write_config(&path, &ProverbsConfig::with_defaults(), force)?;

    if ctx.output.is_human() {
        ui::info("Config written", &path.display().to_string());
        println!("  {} {}", Icons::DATABASE, ui::dim("edit `backend` to switch stores"));
    } else {
        emit_json(&serde_json::json!({ "config": path }))?;
    }
    Ok(())
}
