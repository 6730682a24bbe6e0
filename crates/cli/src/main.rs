//! # siltkv — interactive shell
//!
//! A REPL binding for the storage engine. Reads commands from stdin,
//! routes the data operations through the request shim in
//! [`siltkv::handlers`], and prints `[status] body` lines, so a scripted
//! session behaves like a sequence of requests against the engine.
//!
//! ## Commands
//!
//! ```text
//! GET key            Look up a key
//! SET <json-object>  Apply every pair in the object, e.g. SET {"name":"imane"}
//! DEL key            Delete a key (prints the pre-delete value)
//! KEYS               List the keys buffered in the memtable
//! FLUSH              Force-flush the memtable to an SSTable
//! COMPACT            Run the compaction policy
//! STATS              Print engine debug info
//! EXIT / QUIT        Leave the shell
//! ```
//!
//! ## Configuration
//!
//! Everything comes from environment variables:
//!
//! ```text
//! SILT_WAL_PATH              WAL file path            (default "wal.log")
//! SILT_SST_DIR               SSTable directory        (default "data/sst")
//! SILT_THRESHOLD             memtable entry threshold (default 100)
//! SILT_COMPACTION_THRESHOLD  sstable count threshold  (default 2)
//! SILT_WAL_SYNC              fsync every WAL append   (default "true")
//! ```

use anyhow::Result;
use engine::{Db, Options};
use siltkv::handlers::{self, Response};
use std::io::{self, BufRead, Write};
use tracing_subscriber::{fmt, EnvFilter};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn print_response(resp: &Response) {
    println!("[{}] {}", resp.status, String::from_utf8_lossy(&resp.body));
}

fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let wal_path = env_or("SILT_WAL_PATH", "wal.log");
    let sst_dir = env_or("SILT_SST_DIR", "data/sst");
    let threshold: usize = env_or("SILT_THRESHOLD", "100").parse().unwrap_or(100);
    let compaction_threshold: usize = env_or("SILT_COMPACTION_THRESHOLD", "2")
        .parse()
        .unwrap_or(2);
    let wal_sync: bool = env_or("SILT_WAL_SYNC", "true").parse().unwrap_or(true);

    let db = Db::open(
        &wal_path,
        &sst_dir,
        Options {
            threshold,
            compaction_threshold,
            wal_sync,
        },
    )?;

    println!(
        "siltkv started (wal={wal_path}, sst_dir={sst_dir}, threshold={threshold}, \
         compaction_threshold={compaction_threshold}, wal_sync={wal_sync})"
    );
    println!("Commands: GET key | SET <json-object> | DEL key");
    println!("          KEYS | FLUSH | COMPACT | STATS | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        let (cmd, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd, rest.trim()),
            None => (trimmed, ""),
        };

        match cmd.to_uppercase().as_str() {
            "" => {}
            "GET" => {
                let key = (!rest.is_empty()).then_some(rest);
                print_response(&handlers::get(&db, key));
            }
            "SET" => {
                print_response(&handlers::set(&db, rest.as_bytes()));
            }
            "DEL" => {
                let key = (!rest.is_empty()).then_some(rest);
                print_response(&handlers::del(&db, key));
            }
            "KEYS" => match db.keys() {
                Ok(keys) => {
                    for key in &keys {
                        println!("{}", String::from_utf8_lossy(key));
                    }
                    println!("({} entries)", keys.len());
                }
                Err(e) => println!("ERR keys failed: {e}"),
            },
            "FLUSH" => match db.force_flush() {
                Ok(()) => println!("OK"),
                Err(e) => println!("ERR flush failed: {e}"),
            },
            "COMPACT" => match db.compact() {
                Ok(()) => println!("OK"),
                Err(e) => println!("ERR compaction failed: {e}"),
            },
            "STATS" => println!("{db:?}"),
            "EXIT" | "QUIT" => {
                println!("bye");
                break;
            }
            other => println!("ERR unknown command: {other}"),
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    Ok(())
}
