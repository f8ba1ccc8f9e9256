//! Relaychat terminal client
//!
//! Completes the name handshake in cooked mode, then runs two concurrent
//! activities over the one connection: an inbound loop rendering broadcasts
//! as they arrive, and a raw-mode line editor sending each completed line as
//! a frame. Typing "/exit" ends the session.

mod raw_mode;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use relaychat_core::{protocol, FrameCodec, DEFAULT_ENDPOINT};
use std::io::Write as _;
use std::sync::{Arc, Mutex};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

/// Relaychat client - line-oriented terminal chat
#[derive(Parser, Debug)]
#[command(name = "relaychat")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Terminal client for the relaychat server", long_about = None)]
struct Args {
    /// Server address (host:port)
    #[arg(short, long, default_value = DEFAULT_ENDPOINT)]
    connect: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    println!("relaychat client v{}", env!("CARGO_PKG_VERSION"));
    println!("Connecting to {}...", args.connect);
    let stream = TcpStream::connect(&args.connect)
        .await
        .with_context(|| format!("Failed to connect to {}", args.connect))?;
    let (mut reader, mut writer) = stream.into_split();

    negotiate_name(&mut reader, &mut writer).await?;

    // Shared between the line editor (which builds it keystroke by
    // keystroke) and the inbound loop (which reprints it under each
    // incoming message).
    let input_line = Arc::new(Mutex::new(String::new()));

    // Fall back to cooked input in non-TTY environments.
    let guard = match raw_mode::RawModeGuard::enable() {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: raw mode not available: {e}");
            None
        }
    };
    print!("\r> ");
    let _ = std::io::stdout().flush();

    let mut inbound = tokio::spawn(display_messages(reader, Arc::clone(&input_line)));

    let (line_tx, mut line_rx) = mpsc::channel::<String>(32);
    let _editor = tokio::task::spawn_blocking(move || edit_lines(line_tx, input_line));

    loop {
        tokio::select! {
            maybe_line = line_rx.recv() => {
                match maybe_line {
                    Some(line) => {
                        // A failed send after the server is gone ends the
                        // client; the inbound loop has already reported it.
                        if FrameCodec::write(&mut writer, &line).await.is_err() {
                            break;
                        }
                        if line == protocol::EXIT_COMMAND {
                            break;
                        }
                    }
                    // Editor stopped (Ctrl+C or stdin closed).
                    None => break,
                }
            }
            _ = &mut inbound => break,
        }
    }

    inbound.abort();

    // The editor thread may still be parked waiting for a keystroke;
    // restore the terminal ourselves and leave rather than wait for it.
    drop(guard);
    print!("\r\n");
    let _ = std::io::stdout().flush();
    std::process::exit(0);
}

/// Name handshake, run in cooked mode before the interactive loops start.
///
/// Prints whatever the server prompts (first prompt or "name taken"
/// re-prompts) and answers with a line from stdin, until the welcome frame
/// admits us.
async fn negotiate_name(reader: &mut OwnedReadHalf, writer: &mut OwnedWriteHalf) -> Result<()> {
    let mut message = FrameCodec::read(reader)
        .await
        .context("Server closed during handshake")?;
    while message != protocol::WELCOME {
        println!("{message}");
        let name = tokio::task::spawn_blocking(read_name_line)
            .await
            .context("Input task failed")??;
        FrameCodec::write(writer, &name)
            .await
            .context("Server closed during handshake")?;
        message = FrameCodec::read(reader)
            .await
            .context("Server closed during handshake")?;
    }
    println!("{message}");
    Ok(())
}

fn read_name_line() -> Result<String> {
    print!("Enter your name: ");
    std::io::stdout().flush()?;
    let mut name = String::new();
    std::io::stdin().read_line(&mut name)?;
    Ok(name.trim_end_matches(['\r', '\n']).to_string())
}

/// Inbound loop: render each broadcast above the in-progress input line.
///
/// Stops with a "connection lost" notice on the first decode failure; peer
/// closed and garbage on the wire are deliberately indistinguishable.
async fn display_messages(mut reader: OwnedReadHalf, input_line: Arc<Mutex<String>>) {
    loop {
        match FrameCodec::read(&mut reader).await {
            Ok(message) => {
                let current = input_line.lock().unwrap().clone();
                print!("\r\x1b[K{message}\n\r> {current}");
                let _ = std::io::stdout().flush();
            }
            Err(_) => {
                print!("\r\x1b[KConnection to server lost.\r\n");
                let _ = std::io::stdout().flush();
                break;
            }
        }
    }
}

/// Blocking line editor running under raw mode.
///
/// Builds the shared input line one key event at a time and hands each
/// completed line to the async sender. Backspace clamps at an empty buffer.
fn edit_lines(line_tx: mpsc::Sender<String>, input_line: Arc<Mutex<String>>) {
    loop {
        let event = match event::read() {
            Ok(event) => event,
            Err(_) => break,
        };
        let Event::Key(key) = event else { continue };
        if key.kind == KeyEventKind::Release {
            continue;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
            KeyCode::Backspace => {
                let mut line = input_line.lock().unwrap();
                line.pop();
                print!("\r\x1b[K> {line}");
                let _ = std::io::stdout().flush();
            }
            KeyCode::Enter => {
                let line = std::mem::take(&mut *input_line.lock().unwrap());
                let exiting = line == protocol::EXIT_COMMAND;
                if line_tx.blocking_send(line).is_err() {
                    break;
                }
                if exiting {
                    break;
                }
                print!("\n\r> ");
                let _ = std::io::stdout().flush();
            }
            KeyCode::Char(c) => {
                let mut line = input_line.lock().unwrap();
                line.push(c);
                print!("\r> {line}");
                let _ = std::io::stdout().flush();
            }
            _ => {}
        }
    }
}
