#![forbid(unsafe_code)]

mod entry;
mod server;
mod support;
mod tools;

pub(crate) use support::*;

use std::fmt::Write as _;
use td_storage::SqliteStore;

// Protocol negotiation:
// Some MCP clients are strict about the server echoing a compatible protocol version.
// We keep this at the widely deployed baseline and remain forward-compatible in behavior.
const MCP_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "taskdeck-mcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const STORAGE_DIR_ENV: &str = "TASKDECK_STORAGE_DIR";
const DEFAULT_STORAGE_DIR: &str = ".taskdeck";

fn write_last_crash(storage_dir: &std::path::Path, kind: &str, detail: &str) {
    // Best-effort crash report to help debug MCP transport issues without logging request bodies.
    let _ = std::fs::create_dir_all(storage_dir);
    let path = storage_dir.join("taskdeck_mcp_last_crash.txt");

    let mut out = String::new();
    let ts_ms = crate::support::now_ms_i64();
    let _ = writeln!(out, "ts={}", crate::support::ts_ms_to_rfc3339(ts_ms));
    let _ = writeln!(out, "pid={}", std::process::id());
    let _ = writeln!(out, "kind={kind}");
    let cwd = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
    let _ = writeln!(out, "cwd={}", cwd.to_string_lossy());
    let _ = writeln!(out, "args={:?}", std::env::args().collect::<Vec<_>>());
    let _ = writeln!(out, "detail={detail}");

    let _ = std::fs::write(path, out);
}

fn write_last_spawn() {
    // Best-effort spawn record for diagnosing "Transport closed" cases where the client never
    // establishes framing. Local-only; contains no request bodies.
    let base = std::env::var("XDG_RUNTIME_DIR")
        .ok()
        .map(std::path::PathBuf::from)
        .filter(|p| p.is_absolute())
        .unwrap_or_else(std::env::temp_dir);
    let dir = base.join("taskdeck_mcp");
    let _ = std::fs::create_dir_all(&dir);
    let path = dir.join("taskdeck_mcp_last_spawn.txt");

    let mut out = String::new();
    let ts_ms = crate::support::now_ms_i64();
    let _ = writeln!(out, "ts={}", crate::support::ts_ms_to_rfc3339(ts_ms));
    let _ = writeln!(out, "pid={}", std::process::id());
    let cwd = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
    let _ = writeln!(out, "cwd={}", cwd.to_string_lossy());
    let _ = writeln!(out, "args={:?}", std::env::args().collect::<Vec<_>>());

    let _ = std::fs::write(path, out);
}

fn install_crash_reporter(storage_dir: std::path::PathBuf) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let mut detail = info.to_string();
        let backtrace = std::backtrace::Backtrace::force_capture();
        let _ = write!(&mut detail, "\nbacktrace:\n{backtrace}");
        write_last_crash(&storage_dir, "panic", &detail);
        default_hook(info);
    }));
}

pub(crate) struct McpServer {
    initialized: bool,
    store: SqliteStore,
}

fn parse_storage_dir() -> std::path::PathBuf {
    let args = std::env::args().collect::<Vec<_>>();
    for pair in args.windows(2) {
        if pair[0] == "--storage-dir" && !pair[1].trim().is_empty() {
            return std::path::PathBuf::from(pair[1].trim());
        }
    }
    if let Ok(dir) = std::env::var(STORAGE_DIR_ENV)
        && !dir.trim().is_empty()
    {
        return std::path::PathBuf::from(dir.trim());
    }
    std::path::PathBuf::from(DEFAULT_STORAGE_DIR)
}

fn usage() -> &'static str {
    "td_mcp — taskdeck MCP server (Rust, deterministic, stdio-first)\n\n\
USAGE:\n\
  td_mcp [--storage-dir DIR]\n\
\n\
FLAGS:\n\
  -h, --help       Print this help and exit\n\
  -V, --version    Print version and exit\n\
\n\
NOTES:\n\
  - Storage defaults to <cwd>/.taskdeck/ (override with --storage-dir or TASKDECK_STORAGE_DIR)\n"
}

fn version_line() -> String {
    format!("td_mcp {SERVER_VERSION}")
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = std::env::args().collect::<Vec<_>>();
    if args
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print!("{}", usage());
        return Ok(());
    }
    if args
        .iter()
        .any(|arg| matches!(arg.as_str(), "-V" | "--version"))
    {
        println!("{}", version_line());
        return Ok(());
    }

    write_last_spawn();

    let storage_dir = parse_storage_dir();
    install_crash_reporter(storage_dir.clone());
    let storage_dir_for_errors = storage_dir.clone();

    let store = SqliteStore::open(&storage_dir)?;
    let mut server = McpServer {
        initialized: false,
        store,
    };
    let result = entry::run_stdio(&mut server);
    if let Err(err) = &result {
        write_last_crash(&storage_dir_for_errors, "error", &format!("{err:?}"));
    }
    result
}
