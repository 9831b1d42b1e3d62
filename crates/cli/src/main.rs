//! Command-line driver for the embedded storage engine.
//!
//! Supports both one-shot execute mode (`-e`/`--execute`) and an interactive
//! `rustyline`-backed REPL. Every statement runs against a single
//! process-lifetime [`Engine`]; on error the REPL prints the error and keeps
//! reading rather than exiting.

use anyhow::Result;
use clap::Parser;
use common::Config;
use common::pretty::{self, TableStyleKind};
use engine::Engine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::PathBuf;
use tracing::info;

const DEFAULT_BUFFER_POOL_PAGES: usize = 64;
const DEFAULT_BTREE_ORDER: usize = 64;

#[derive(Parser, Debug)]
#[command(name = "lightdb", about = "Single-node relational storage engine")]
struct Args {
    /// Execute the provided SQL and exit.
    #[arg(short = 'e', long)]
    execute: Option<String>,

    /// Directory reserved for catalog/durability metadata. The core keeps
    /// every page resident in memory; nothing is written here yet, but every
    /// process run logs it as the hook where durable writing would attach.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Frames held by every table's/index's buffer pool.
    #[arg(long, default_value_t = DEFAULT_BUFFER_POOL_PAGES)]
    buffer_pool_pages: usize,

    /// Default B+Tree order for newly created indexes.
    #[arg(long, default_value_t = DEFAULT_BTREE_ORDER)]
    btree_order: usize,
}

fn main() -> Result<()> {
    common::init_logging();
    let args = Args::parse();

    let config = Config::builder()
        .maybe_data_dir(args.data_dir)
        .buffer_pool_pages(args.buffer_pool_pages)
        .btree_order(args.btree_order)
        .build();
    info!(data_dir = %config.data_dir.display(), "starting lightdb");

    let mut engine = Engine::new(config.buffer_pool_pages, config.btree_order);

    if let Some(sql) = args.execute {
        run_statements(&mut engine, &sql);
    } else {
        interactive_loop(&mut engine)?;
    }
    Ok(())
}

fn run_statements(engine: &mut Engine, sql: &str) {
    match parser::parse_sql(sql) {
        Ok(stmts) => {
            for stmt in stmts {
                execute_and_print(engine, stmt);
            }
        }
        Err(e) => eprintln!("Error: {e}"),
    }
}

fn execute_and_print(engine: &mut Engine, stmt: parser::Statement) {
    let result = planner::plan(stmt, engine.catalog()).and_then(|plan| engine.execute(plan));
    match result {
        Ok(batch) => {
            let rendered = pretty::render_record_batch(&batch, TableStyleKind::Modern);
            println!("{rendered}");
        }
        Err(e) => eprintln!("Error: {e}"),
    }
}

fn interactive_loop(engine: &mut Engine) -> Result<()> {
    let mut rl = DefaultEditor::new()?;

    println!("lightdb — type SQL statements or .quit to exit");

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);
                if line == ".quit" || line == ".exit" {
                    break;
                }
                if line == ".help" {
                    print_help();
                    continue;
                }
                run_statements(engine, line);
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(e) => {
                eprintln!("Error: {e:?}");
                break;
            }
        }
    }
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  .help    Show this help");
    println!("  .quit    Exit");
    println!();
    println!("Or enter SQL: CREATE TABLE, CREATE INDEX, INSERT, SELECT, UPDATE, DELETE.");
}
