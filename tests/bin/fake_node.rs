//! Stand-in for a development node.
//!
//! Appends its arguments to the file named by `--record`, prints a
//! `Private Keys` banner for the deterministic dev keys and serves
//! `--port` on 127.0.0.1 until killed. A taken port makes it exit with
//! status 1, as a real node would.

#![allow(unused_crate_dependencies, reason = "test dependencies shared across test suite")]

use std::{
    env,
    fs::OpenOptions,
    io::{self, Write},
    net::TcpListener,
    process::ExitCode,
};

use provctl_config::GANACHE_DETERMINISTIC_KEYS;

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|pair| pair[0] == flag)
        .map(|pair| pair[1].as_str())
}

fn record(path: &str, args: &[String]) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", args.join(" "))
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();

    if let Some(path) = flag_value(&args, "--record") {
        if let Err(e) = record(path, &args) {
            eprintln!("cannot record invocation: {e}");
            return ExitCode::FAILURE;
        }
    }

    let Some(port) = flag_value(&args, "--port").and_then(|p| p.parse::<u16>().ok()) else {
        eprintln!("--port is required");
        return ExitCode::FAILURE;
    };
    let listener = match TcpListener::bind(("127.0.0.1", port)) {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("EADDRINUSE: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut out = io::stdout().lock();
    let _ = writeln!(out, "Private Keys\n==================");
    for (idx, key) in GANACHE_DETERMINISTIC_KEYS.iter().enumerate() {
        let _ = writeln!(out, "({idx}) {key}");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "RPC Listening on 127.0.0.1:{port}");
    let _ = out.flush();
    drop(out);

    for stream in listener.incoming() {
        drop(stream);
    }
    ExitCode::SUCCESS
}
