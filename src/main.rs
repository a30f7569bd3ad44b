use color_eyre::eyre::{Result, WrapErr, eyre};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use udsecho::common::EchoServerTrait;
use udsecho::{
    ConnectionConfig, DatagramConfig, DatagramEchoClient, DatagramEchoServer, EchoClient, Mode,
    SeqpacketEchoClient, SeqpacketEchoServer, StreamEchoClient, StreamEchoServer,
};

const DEFAULT_SOCKET_PATH: &str = "/tmp/unix-domain-socket-example";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Initialize logging; stdout is reserved for echoed data
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("udsecho=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let program = program_name(&args);
    let (Some(mode), Some(role)) = (args.get(1), args.get(2)) else {
        usage(program);
    };
    let mode: Mode = match mode.parse() {
        Ok(mode) => mode,
        Err(_) => usage(program),
    };
    let socket_path: PathBuf = args
        .get(3)
        .map(PathBuf::from)
        .unwrap_or_else(|| DEFAULT_SOCKET_PATH.into());

    match role.to_lowercase().as_str() {
        "server" => run_server(mode, socket_path).await,
        "client" => run_client(mode, socket_path).await,
        other => Err(eyre!("unknown role {other:?}, expected server or client")),
    }
}

async fn run_server(mode: Mode, socket_path: PathBuf) -> Result<()> {
    info!(%mode, socket_path = %socket_path.display(), "Starting echo server");

    match mode {
        Mode::Datagram => {
            let server = DatagramEchoServer::new(DatagramConfig::new(socket_path));
            stop_on_ctrl_c(server.shutdown_signal());
            server.run().await.wrap_err("Failed to run datagram echo server")
        }
        Mode::Seqpacket => {
            let server = SeqpacketEchoServer::new(ConnectionConfig::new(socket_path));
            stop_on_ctrl_c(server.shutdown_signal());
            server.run().await.wrap_err("Failed to run seqpacket echo server")
        }
        Mode::Stream => {
            let server = StreamEchoServer::new(ConnectionConfig::new(socket_path));
            stop_on_ctrl_c(server.shutdown_signal());
            server.run().await.wrap_err("Failed to run stream echo server")
        }
    }
}

async fn run_client(mode: Mode, socket_path: PathBuf) -> Result<()> {
    match mode {
        Mode::Datagram => {
            let client = DatagramEchoClient::connect(&socket_path)
                .await
                .wrap_err("Failed to start datagram client")?;
            echo_stdin(client).await
        }
        Mode::Seqpacket => {
            let client = SeqpacketEchoClient::connect(&socket_path)
                .await
                .wrap_err("Failed to connect seqpacket client")?;
            echo_stdin(client).await
        }
        Mode::Stream => {
            let client = StreamEchoClient::connect(&socket_path)
                .await
                .wrap_err("Failed to connect stream client")?;
            echo_stdin(client).await
        }
    }
}

/// Sends every stdin line to the server and prints the reply
async fn echo_stdin<C: EchoClient>(mut client: C) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await.wrap_err("Failed to read stdin")? {
        let mut request = line.into_bytes();
        request.push(b'\n');

        let response = client.echo(&request).await.wrap_err("Echo request failed")?;
        println!("{} bytes received", response.len());
        print!("{}", String::from_utf8_lossy(&response));
    }

    Ok(())
}

fn stop_on_ctrl_c(shutdown: tokio::sync::broadcast::Sender<()>) {
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, shutting down");
            if shutdown.send(()).is_err() {
                warn!("Server is no longer running");
            }
        }
    });
}

/// Name to print in usage; argv may be empty when exec'd without one
fn program_name(args: &[String]) -> &str {
    args.first().map(String::as_str).unwrap_or("udsecho")
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {program} <dgram|seqpacket|stream> <server|client> [socket_path]");
    eprintln!("  socket_path: Unix domain socket path (default: {DEFAULT_SOCKET_PATH})");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {program} seqpacket server                 # Serve on the default path");
    eprintln!("  {program} seqpacket client                 # Echo stdin lines through it");
    eprintln!("  {program} stream server /tmp/echo.sock     # Stream server on a custom path");
    eprintln!("  {program} dgram client /tmp/echo.sock      # Datagram client");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_name_with_empty_args() {
        assert_eq!(program_name(&[]), "udsecho");
    }

    #[test]
    fn test_program_name_from_first_arg() {
        let args = vec!["/usr/bin/udsecho".to_string(), "stream".to_string()];
        assert_eq!(program_name(&args), "/usr/bin/udsecho");
    }
}
