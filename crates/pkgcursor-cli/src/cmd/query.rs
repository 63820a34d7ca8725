//! Query command

use std::io::Write;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result, bail};
use pkgcursor_core::{
    Cursor, CursorConfig, Database, DbIndex, ElementKind, GiFlags, MemoryDb, SourceKind, Status,
    Transaction,
};
use pkgcursor_schema::Tag;
use serde_json::json;

use crate::QueryArgs;

/// Drain a cursor over the selected source, printing one line per step.
pub fn query(args: &QueryArgs, verbose: bool) -> Result<()> {
    let config = load_config(args, verbose)?;
    let db = open_db(&config.resolved_db_path())?;
    let ts = Transaction::new(Rc::new(db));

    let flags = args.flags();
    let key = args.key.as_deref().map(str::as_bytes);
    let mut cursor = Cursor::with_config(&ts, args.tag, key, config);
    cursor.set_args(&args.args, flags);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut ordinal = 0usize;
    let mut failed = 0usize;

    while cursor.next().context("Iteration failed")? == Status::Ok {
        let provenance = cursor.provenance();

        if cursor.kind() == SourceKind::ArgList {
            if let Some(name) = provenance.strip_prefix('-').filter(|n| !n.is_empty()) {
                if erase_named(&ts, name) == 0 {
                    tracing::error!("package {name} cannot be erased");
                    failed += 1;
                }
                continue;
            }
        }

        if !flags.contains(GiFlags::TS_ADD) {
            let header = cursor.header();
            if args.json {
                let line = json!({
                    "index": ordinal,
                    "provenance": provenance,
                    "nevra": header.map(|h| h.nevra()),
                });
                writeln!(out, "{line}")?;
            } else {
                let text = match (&args.queryformat, header) {
                    (Some(qf), Some(h)) => h.format(qf)?.trim_end_matches('\n').to_string(),
                    _ => provenance.to_string(),
                };
                writeln!(out, "{ordinal:5} {text}")?;
            }
        }
        ordinal += 1;
    }

    if flags.contains(GiFlags::TS_ORDER) {
        print_elements(&mut out, &ts, args.json)?;
    }

    if failed > 0 {
        bail!("{failed} package(s) cannot be erased");
    }
    Ok(())
}

fn load_config(args: &QueryArgs, verbose: bool) -> Result<CursorConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let mut config = CursorConfig::load(path)?;
            config.apply_overrides(|name| std::env::var(name).ok());
            config
        }
        None => CursorConfig::discover()?,
    };

    if let Some(path) = &args.dbpath {
        config.db_path = Some(path.clone());
    }
    if let Some(path) = &args.hdlist {
        config.hdlist_path = Some(path.clone());
    }
    if args.nofollow {
        config.walk.follow_links = false;
    }
    config.verbose |= verbose;
    Ok(config)
}

/// Load the installed database; a missing file is an empty database.
fn open_db(path: &Path) -> Result<MemoryDb> {
    if !path.exists() {
        tracing::debug!("No installed database at {}", path.display());
        return Ok(MemoryDb::new());
    }
    MemoryDb::load_archive(path)
        .with_context(|| format!("Failed to load installed database {}", path.display()))
}

/// Add an erase element for every installed package called `name`.
fn erase_named(ts: &Transaction, name: &str) -> usize {
    let db = ts.db();
    let Some(mut it) = db.open_iterator(DbIndex::Tag(Tag::Name), Some(name.as_bytes())) else {
        return 0;
    };
    let mut count = 0;
    while let Some(header) = it.next_header() {
        let offset = it.offset();
        if offset == 0 {
            break;
        }
        ts.add_erase_element(header, i64::from(offset));
        count += 1;
    }
    count
}

fn print_elements(out: &mut impl Write, ts: &Transaction, as_json: bool) -> Result<()> {
    let elements = ts.elements(None);

    if as_json {
        for (i, e) in elements.iter().enumerate() {
            let kind = match e.kind {
                ElementKind::Added => "added",
                ElementKind::Removed => "removed",
            };
            let line = json!({
                "index": i,
                "kind": kind,
                "depth": e.depth,
                "degree": e.degree,
                "nevra": e.nevra(),
            });
            writeln!(out, "{line}")?;
        }
        return Ok(());
    }

    writeln!(
        out,
        "======================= {} transaction elements",
        elements.len()
    )?;
    writeln!(out, "    # Depth Degree Package")?;
    writeln!(out, "=======================")?;
    for (i, e) in elements.iter().enumerate() {
        let mark = match e.kind {
            ElementKind::Added => '+',
            ElementKind::Removed => '-',
        };
        let indent = 2 * e.depth;
        writeln!(
            out,
            "{i:5}{:6}{:7} {:indent$}{mark}{}",
            e.depth,
            e.degree,
            "",
            e.nevra()
        )?;
    }
    Ok(())
}
