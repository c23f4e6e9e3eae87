//!
//! faro CLI binary
//! ---------------
//! Loads one or more files into a fresh in-memory database, runs statements
//! against it and optionally writes a snapshot file at the end.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use faro::{Database, DatabaseConfig, IfExists, ReadOptions};

fn print_usage(program: &str) {
    eprintln!(
        "Usage:\n  {program} [--name <db>] --load <file>[=<table>] ... [--query \"<SQL>\"] [--export [<path>]]\n\nFlags:\n  --name <db>              Database name (default: $FARO_DB_NAME or 'faro')\n  --load <file>[=<table>]  Load a .csv, .json or .xlsx file; table defaults to the file stem\n  --if-exists <policy>     fail | replace | append (default: fail)\n  --sep <char>             Field separator for csv files (default: ',')\n  --sheet <name>           Sheet to read from xlsx files (default: first sheet)\n  -e, --execute <SQL>      Run a statement that returns no rows\n  -q, --query <SQL>        Run a read statement and print the result\n  --export [<path>]        Write a snapshot file (default: <name>.db under $FARO_SNAPSHOT_DIR)\n  -h, --help               Show this help\n\nExamples:\n  {program} --load fruits.csv -q \"SELECT * FROM fruits WHERE in_stock\"\n  {program} --name shop --load stock.xlsx=stock --export"
    );
}

enum Step {
    Load { path: PathBuf, table: String },
    Execute(String),
    Query(String),
}

fn parse_load(arg: &str) -> Result<(PathBuf, String)> {
    let (path, table) = match arg.rsplit_once('=') {
        Some((p, t)) if !t.is_empty() => (PathBuf::from(p), t.to_string()),
        _ => {
            let path = PathBuf::from(arg);
            let stem = Path::new(arg)
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| anyhow!("cannot derive a table name from '{}'", arg))?
                .to_string();
            (path, stem)
        }
    };
    Ok((path, table))
}

fn value_of(args: &[String], i: usize, flag: &str) -> Result<String> {
    args.get(i + 1).cloned().ok_or_else(|| anyhow!("{} requires a value", flag))
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let mut args: Vec<String> = env::args().collect();
    let program = args.remove(0);

    let mut config = DatabaseConfig::from_env();
    let mut opts = ReadOptions::default();
    let mut if_exists = IfExists::Fail;
    let mut steps: Vec<Step> = Vec::new();
    let mut export: Option<Option<PathBuf>> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--name" => { config.name = value_of(&args, i, "--name")?; i += 2; }
            "--load" => {
                let (path, table) = parse_load(&value_of(&args, i, "--load")?)?;
                steps.push(Step::Load { path, table });
                i += 2;
            }
            "--if-exists" => {
                if_exists = value_of(&args, i, "--if-exists")?.parse::<IfExists>().context("invalid --if-exists")?;
                i += 2;
            }
            "--sep" => {
                let sep = value_of(&args, i, "--sep")?;
                match sep.as_bytes() {
                    [b] => opts = opts.with_separator(*b),
                    _ => return Err(anyhow!("--sep takes a single ASCII character, got '{}'", sep)),
                }
                i += 2;
            }
            "--sheet" => { opts = opts.with_sheet(value_of(&args, i, "--sheet")?); i += 2; }
            "--execute" | "-e" => { steps.push(Step::Execute(value_of(&args, i, "--execute")?)); i += 2; }
            "--query" | "-q" => { steps.push(Step::Query(value_of(&args, i, "--query")?)); i += 2; }
            "--export" => match args.get(i + 1).filter(|a| !a.starts_with('-')) {
                Some(p) => { export = Some(Some(PathBuf::from(p))); i += 2; }
                None => { export = Some(None); i += 1; }
            },
            "-h" | "--help" => {
                print_usage(&program);
                return Ok(());
            }
            unk => {
                eprintln!("Unrecognized argument: {}", unk);
                print_usage(&program);
                std::process::exit(2);
            }
        }
    }
    if steps.is_empty() && export.is_none() {
        print_usage(&program);
        std::process::exit(2);
    }

    let mut db = Database::with_config(config).context("open database")?;
    info!(target: "faro", "faro starting: db='{}' steps={}", db.name(), steps.len());

    for step in steps {
        match step {
            Step::Load { path, table } => {
                db.add_table_with(path.as_path(), &table, if_exists, &opts)
                    .with_context(|| format!("load '{}' as '{}'", path.display(), table))?;
            }
            Step::Execute(sql) => {
                let changed = db.execute(&sql).with_context(|| format!("execute: {}", sql))?;
                println!("{} row(s) changed", changed);
            }
            Step::Query(sql) => {
                let result = db.query(&sql).with_context(|| format!("query: {}", sql))?;
                println!("{}", result);
                println!("({} row(s))", result.len());
            }
        }
    }

    match export {
        Some(Some(path)) => {
            db.export_snapshot(&path).context("export snapshot")?;
            println!("snapshot written to {}", path.display());
        }
        Some(None) => {
            let path = db.export_default_snapshot().context("export snapshot")?;
            println!("snapshot written to {}", path.display());
        }
        None => {}
    }
    db.close().context("close database")?;
    Ok(())
}
