use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use docset_engine::{EngineSnapshot, InMemoryEngine};
use docset_store::{DocStore, ParamOptions, RangeQuery, SearchParams, StoreConfig};
use docset_types::Document;
use serde_json::{json, Number, Value};
use tracing::debug;

use crate::cli::*;

/// Result of one command: what to print and whether the snapshot changed.
#[derive(Debug, PartialEq)]
pub struct Outcome {
    pub value: Value,
    pub mutated: bool,
}

impl Outcome {
    fn read(value: Value) -> Self {
        Self { value, mutated: false }
    }

    fn write(value: Value) -> Self {
        Self { value, mutated: true }
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => StoreConfig::default(),
    };
    let engine = Arc::new(load_snapshot(&cli.data)?);
    let store = DocStore::new(engine.clone(), config)?;
    let options = match &cli.collection {
        Some(name) => ParamOptions::new().collection(name.as_str()),
        None => ParamOptions::new(),
    };

    let runtime = tokio::runtime::Runtime::new()?;
    let outcome = runtime.block_on(execute(&store, &options, cli.command))?;
    if outcome.mutated {
        save_snapshot(&cli.data, &engine)?;
        debug!(path = %cli.data.display(), "snapshot written");
    }
    render(&outcome.value, &cli.format)
}

/// Read a snapshot file; a missing file is an empty store.
pub fn load_snapshot(path: &Path) -> anyhow::Result<InMemoryEngine> {
    if !path.exists() {
        debug!(path = %path.display(), "no snapshot, starting empty");
        return Ok(InMemoryEngine::new());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;
    let snapshot: EngineSnapshot = serde_json::from_str(&text)
        .with_context(|| format!("parsing snapshot {}", path.display()))?;
    Ok(InMemoryEngine::from_snapshot(snapshot)?)
}

/// Replace the snapshot file through a temporary file in the same directory.
pub fn save_snapshot(path: &Path, engine: &InMemoryEngine) -> anyhow::Result<()> {
    let snapshot = engine.snapshot()?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, &snapshot)?;
    tmp.persist(path)
        .with_context(|| format!("writing snapshot {}", path.display()))?;
    Ok(())
}

fn member(value: String, numeric: bool) -> anyhow::Result<Value> {
    if numeric {
        let n: Number = value
            .parse()
            .with_context(|| format!("{value:?} is not a number"))?;
        return Ok(Value::Number(n));
    }
    Ok(Value::String(value))
}

pub async fn execute(
    store: &DocStore,
    options: &ParamOptions,
    command: Command,
) -> anyhow::Result<Outcome> {
    let outcome = match command {
        Command::Get(args) => {
            if args.all {
                let docs = store.get_objects(&args.key, &args.fields, options).await?;
                Outcome::read(Value::Array(docs.into_iter().map(Value::Object).collect()))
            } else {
                let doc = store.get_object(&args.key, &args.fields, options).await?;
                Outcome::read(doc.map_or(Value::Null, Value::Object))
            }
        }
        Command::Set(args) => {
            let data: Document =
                serde_json::from_str(&args.json).context("value must be a JSON object")?;
            let doc = store.set_object(&args.key, data, options).await?;
            Outcome::write(Value::Object(doc))
        }
        Command::Del(args) => {
            let n = store.delete_objects_with_keys(&args.keys, options).await?;
            Outcome::write(json!(n))
        }
        Command::Zadd(args) => {
            let value = member(args.value, args.numeric)?;
            let n = store.sorted_set_add_key(&args.key, value, args.rank, options).await?;
            Outcome::write(json!(n))
        }
        Command::Zrem(args) => {
            let value = member(args.value, args.numeric)?;
            let n = store.sorted_set_remove_key(&args.key, value, options).await?;
            Outcome::write(json!(n))
        }
        Command::Zrange(args) => {
            let mut query = RangeQuery::new(&args.keys, args.start, args.stop).ranks(
                args.min.unwrap_or(f64::NEG_INFINITY),
                args.max.unwrap_or(f64::INFINITY),
            );
            if args.rev {
                query = query.reverse();
            }
            let members = store.fetch_sorted_sets_range_by(&query, options).await?;
            let value = if args.with_ranks {
                serde_json::to_value(members)?
            } else {
                Value::Array(members.into_iter().map(|m| m.value).collect())
            };
            Outcome::read(value)
        }
        Command::Zlex(args) => {
            let value = if args.count_only {
                let n = store
                    .get_sorted_sets_lexical_count(&args.key, &args.min, &args.max, options)
                    .await?;
                json!(n)
            } else if args.rev {
                let values = store
                    .get_sorted_sets_lexical_reverse(
                        &args.key, &args.min, &args.max, args.start, args.count, options,
                    )
                    .await?;
                Value::Array(values)
            } else {
                let values = store
                    .get_sorted_sets_lexical(
                        &args.key, &args.min, &args.max, args.start, args.count, options,
                    )
                    .await?;
                Value::Array(values)
            };
            Outcome::read(value)
        }
        Command::Zsearch(args) => {
            let params = SearchParams {
                key: args.key,
                term: args.term,
                skip: args.skip,
                limit: args.limit,
            };
            let value = if args.with_ranks {
                let members = store.get_sorted_sets_search_with_ranks(&params, options).await?;
                serde_json::to_value(members)?
            } else {
                Value::Array(store.get_sorted_sets_search(&params, options).await?)
            };
            Outcome::read(value)
        }
        Command::Zinter(args) => {
            let n = store.sorted_set_intersect_keys(&args.keys, options).await?;
            Outcome::read(json!(n))
        }
        Command::Incr(args) => {
            let value = match args.by {
                Some(by) => {
                    let n = store.increment_object_field_by(&args.key, &args.field, by).await?;
                    json!(n)
                }
                None => {
                    let n = store.increment_field_count(&args.field, Some(&args.key)).await?;
                    json!(n)
                }
            };
            Outcome::write(value)
        }
        Command::Decr(args) => {
            let n = store.decrement_field_count(&args.field, Some(&args.key)).await?;
            Outcome::write(json!(n))
        }
    };
    Ok(outcome)
}

fn render(value: &Value, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Text => render_text(value),
    }
    Ok(())
}

fn render_text(value: &Value) {
    match value {
        Value::Null => println!("{}", "(nil)".dimmed()),
        Value::Array(items) if items.is_empty() => println!("{}", "(empty)".dimmed()),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                println!("{} {}", format!("{})", i + 1).dimmed(), scalar(item));
            }
        }
        Value::Object(_) => println!("{value:#}"),
        other => println!("{}", scalar(other)),
    }
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string().yellow().to_string(),
        Value::Object(map) => match (map.get("value"), map.get("rank")) {
            (Some(v), Some(rank)) if map.len() == 2 => {
                format!("{} {}", scalar(v), format!("({rank})").dimmed())
            }
            _ => value.to_string(),
        },
        other => other.to_string(),
    }
}
