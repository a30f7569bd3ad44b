use super::connection::write_fully;
use super::*;
use crate::common::{
    ClientConfig, ConnectionConfig, ConnectionState, EchoClient, Received, spawn_connection_server,
};
use crate::endpoint::SocketPath;
use crate::EchoError;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tempfile::tempdir;
use tokio::io::AsyncWrite;

async fn pair(path: &SocketPath) -> (StreamListener, StreamConnection, StreamConnection) {
    let listener = StreamListener::listen(path, 5).await.unwrap();
    let client = StreamConnection::connect(path).await.unwrap();
    let server = listener.accept().await.unwrap();
    (listener, client, server)
}

/// Writer that never accepts a byte
struct Saturated;

impl AsyncWrite for Saturated {
    fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, _: &[u8]) -> Poll<std::io::Result<usize>> {
        Poll::Ready(Ok(0))
    }

    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn test_write_fully_resubmits_remainder() {
    let mut writer = tokio_test::io::Builder::new()
        .write(b"hello ")
        .wait(Duration::from_millis(1))
        .write(b"world")
        .build();

    let writes = write_fully(&mut writer, b"hello world").await.unwrap();
    assert_eq!(writes, 2);
}

#[tokio::test]
async fn test_write_fully_zero_byte_write_fails() {
    let err = write_fully(&mut Saturated, b"stuck").await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::WriteZero);
}

#[tokio::test]
async fn test_large_payload_is_reconstructed_from_several_receives() {
    let temp_dir = tempdir().unwrap();
    let path = SocketPath::new(temp_dir.path().join("large.sock")).unwrap();
    let (_listener, mut client, mut server) = pair(&path).await;

    let payload: Vec<u8> = (0..1024 * 1024).map(|i| (i % 251) as u8).collect();

    let reader = tokio::spawn(async move {
        let mut collected = Vec::new();
        let mut receives = 0;
        loop {
            match server.recv().await.unwrap() {
                Received::Message(message) => {
                    receives += 1;
                    collected.extend_from_slice(message.payload());
                }
                Received::Shutdown => break,
            }
        }
        (collected, receives)
    });

    client.send(&payload).await.unwrap();
    client.shutdown().await.unwrap();

    let (collected, receives) = reader.await.unwrap();
    assert_eq!(collected.len(), payload.len());
    assert!(collected == payload, "stream payload was corrupted");
    assert!(receives > 1, "1 MiB arrived in a single receive");
}

#[tokio::test]
async fn test_empty_send_is_a_no_op() {
    let temp_dir = tempdir().unwrap();
    let path = SocketPath::new(temp_dir.path().join("empty.sock")).unwrap();
    let (_listener, mut client, mut server) = pair(&path).await;

    client.send(&[]).await.unwrap();
    client.send(b"data").await.unwrap();

    let message = server.recv().await.unwrap().into_message().unwrap();
    assert_eq!(&message.payload()[..], b"data");
}

#[tokio::test]
async fn test_shutdown_is_reported_exactly_once() {
    let temp_dir = tempdir().unwrap();
    let path = SocketPath::new(temp_dir.path().join("shutdown.sock")).unwrap();
    let (_listener, mut client, mut server) = pair(&path).await;

    client.shutdown().await.unwrap();

    assert_eq!(server.recv().await.unwrap(), Received::Shutdown);
    assert_eq!(server.state(), ConnectionState::Closed);
    assert!(matches!(server.recv().await, Err(EchoError::Closed)));
    assert!(matches!(server.send(b"late").await, Err(EchoError::Closed)));
    assert_eq!(client.state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_recv_is_bounded_by_buffer_size() {
    let temp_dir = tempdir().unwrap();
    let path = SocketPath::new(temp_dir.path().join("bounded.sock")).unwrap();
    let (_listener, mut client, server) = pair(&path).await;
    let mut server = server.with_buffer_size(4);

    client.send(b"abcdefgh").await.unwrap();

    let mut collected = Vec::new();
    while collected.len() < 8 {
        let message = server.recv().await.unwrap().into_message().unwrap();
        assert!(message.len() <= 4);
        collected.extend_from_slice(message.payload());
    }
    assert_eq!(collected, b"abcdefgh");
}

#[tokio::test]
async fn test_stream_echo_server() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("server.sock");
    let server = spawn_connection_server::<StreamListener>(ConnectionConfig::new(&socket_path))
        .await
        .unwrap();

    let mut client = StreamEchoClient::connect_with_config(
        &socket_path,
        ClientConfig::default().with_read_timeout(Some(Duration::from_secs(5))),
    )
    .await
    .unwrap();

    assert_eq!(client.echo_string("Hello, Stream!").await.unwrap(), "Hello, Stream!");
    let large = vec![b'z'; 64 * 1024];
    assert_eq!(client.echo(&large).await.unwrap(), large);

    server.stop().await.unwrap();
    assert!(!socket_path.exists());
}

#[tokio::test]
async fn test_client_reports_peer_shutdown() {
    let temp_dir = tempdir().unwrap();
    let path = SocketPath::new(temp_dir.path().join("silent.sock")).unwrap();
    let listener = StreamListener::listen(&path, 5).await.unwrap();

    let mut client = StreamEchoClient::connect(path.as_path()).await.unwrap();
    let accepted = listener.accept().await.unwrap();
    accepted.close();

    let result = client.echo(b"anyone?").await;
    assert!(
        matches!(result, Err(EchoError::PeerShutdown) | Err(EchoError::SendFailed(_))),
        "unexpected result: {result:?}"
    );
}

#[tokio::test]
async fn test_server_stopped_right_after_spawn() {
    let temp_dir = tempdir().unwrap();
    let socket_path = temp_dir.path().join("quick.sock");
    let server = spawn_connection_server::<StreamListener>(ConnectionConfig::new(&socket_path))
        .await
        .unwrap();

    let stopped = tokio::time::timeout(Duration::from_secs(2), server.stop()).await;
    assert!(matches!(stopped, Ok(Ok(()))), "server ignored an early shutdown: {stopped:?}");
    assert!(!socket_path.exists());
}
