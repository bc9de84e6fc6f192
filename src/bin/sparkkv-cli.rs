//! Interactive command-line client for SparkKV.
//!
//! ```text
//! $ sparkkv-cli --port 6379
//! 127.0.0.1:6379> SET name blue
//! OK
//! 127.0.0.1:6379> GET name
//! "blue"
//! ```

use anyhow::Context;
use clap::Parser;
use sparkkv::client::{command_from_line, is_exit_command, Client};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Interactive client for a SparkKV server
#[derive(Parser, Debug)]
#[command(name = "sparkkv-cli", version = sparkkv::VERSION, about)]
struct Args {
    /// Server host
    #[arg(long, default_value = sparkkv::DEFAULT_HOST)]
    host: String,

    /// Server port
    #[arg(short, long, default_value_t = sparkkv::DEFAULT_PORT)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);

    let mut client = Client::connect(&address)
        .await
        .with_context(|| format!("could not connect to {}", address))?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}> ", address);
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await.context("failed to read input")? else {
            break;
        };

        if is_exit_command(&line) {
            break;
        }

        let Some(command) = command_from_line(&line) else {
            continue;
        };

        let reply = client
            .send(&command)
            .await
            .context("failed to talk to server")?;
        println!("{}", reply);
    }

    Ok(())
}
