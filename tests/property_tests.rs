use proptest::prelude::*;
use tempfile::tempdir;
use udsecho::common::spawn_connection_server;
use udsecho::endpoint::max_path_len;
use udsecho::{
    ConnectionConfig, DatagramConfig, DatagramSocket, EchoClient, EchoError, Received,
    SeqpacketConnection, SeqpacketListener, SocketPath, StreamConnection, StreamEchoClient,
    StreamListener,
};

fn fail(what: &str) -> impl Fn(EchoError) -> TestCaseError + '_ {
    move |e| TestCaseError::fail(format!("{what} failed: {e}"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// Property: a datagram arrives exactly as sent, including empty ones
    #[test]
    fn datagram_preserves_message(data in prop::collection::vec(any::<u8>(), 0..4096)) {
        tokio_test::block_on(async {
            let temp_dir = tempdir().map_err(|e| TestCaseError::fail(e.to_string()))?;
            let config = DatagramConfig::new(temp_dir.path().join("sender.sock"));
            let sender = DatagramSocket::from_config(&config).map_err(fail("Sender bind"))?;
            let receiver = DatagramSocket::from_config(&DatagramConfig::new(temp_dir.path().join("receiver.sock")))
                .map_err(fail("Receiver bind"))?;
            let target = SocketPath::new(temp_dir.path().join("receiver.sock")).map_err(fail("Path"))?;

            sender.send_to(&data, &target).await.map_err(fail("Send"))?;
            let message = receiver.recv_from().await.map_err(fail("Receive"))?;

            prop_assert_eq!(&message.payload()[..], &data[..]);
            Ok(())
        })?;
    }

    /// Property: every seqpacket send is received as exactly one message
    #[test]
    fn seqpacket_preserves_boundaries(
        messages in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..512), 1..10)
    ) {
        tokio_test::block_on(async {
            let temp_dir = tempdir().map_err(|e| TestCaseError::fail(e.to_string()))?;
            let path = SocketPath::new(temp_dir.path().join("seqpacket.sock")).map_err(fail("Path"))?;
            let listener = SeqpacketListener::listen(&path, 5).await.map_err(fail("Listen"))?;
            let mut client = SeqpacketConnection::connect(&path).await.map_err(fail("Connect"))?;
            let mut server = listener.accept().await.map_err(fail("Accept"))?;

            for message in &messages {
                client.send(message).await.map_err(fail("Send"))?;
            }
            for message in &messages {
                let received = server.recv().await.map_err(fail("Receive"))?;
                let Received::Message(received) = received else {
                    return Err(TestCaseError::fail("unexpected shutdown"));
                };
                prop_assert_eq!(&received.payload()[..], &message[..]);
            }
            Ok(())
        })?;
    }

    /// Property: a stream delivers the concatenation of all sends, whatever the split
    #[test]
    fn stream_preserves_byte_sequence(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..2048), 1..10)
    ) {
        tokio_test::block_on(async {
            let temp_dir = tempdir().map_err(|e| TestCaseError::fail(e.to_string()))?;
            let path = SocketPath::new(temp_dir.path().join("stream.sock")).map_err(fail("Path"))?;
            let listener = StreamListener::listen(&path, 5).await.map_err(fail("Listen"))?;
            let mut client = StreamConnection::connect(&path).await.map_err(fail("Connect"))?;
            let mut server = listener.accept().await.map_err(fail("Accept"))?;

            for chunk in &chunks {
                client.send(chunk).await.map_err(fail("Send"))?;
            }
            client.shutdown().await.map_err(fail("Shutdown"))?;

            let mut received = Vec::new();
            while let Received::Message(message) = server.recv().await.map_err(fail("Receive"))? {
                received.extend_from_slice(message.payload());
            }

            prop_assert_eq!(received, chunks.concat());
            Ok(())
        })?;
    }

    /// Property: the stream echo server returns strings unchanged
    #[test]
    fn stream_echo_preserves_strings(text in ".{1,256}") {
        tokio_test::block_on(async {
            let temp_dir = tempdir().map_err(|e| TestCaseError::fail(e.to_string()))?;
            let socket_path = temp_dir.path().join("echo.sock");
            let server = spawn_connection_server::<StreamListener>(ConnectionConfig::new(&socket_path))
                .await
                .map_err(fail("Server setup"))?;

            let mut client = StreamEchoClient::connect(&socket_path).await.map_err(fail("Client connection"))?;
            let response = client.echo_string(&text).await.map_err(fail("Echo string"))?;

            drop(client);
            server.stop().await.map_err(fail("Server shutdown"))?;

            prop_assert_eq!(response, text);
            Ok(())
        })?;
    }

    /// Property: paths longer than the platform limit are rejected, never truncated
    #[test]
    fn overlong_paths_are_rejected(extra in 1usize..64) {
        let path = "/".to_string() + &"p".repeat(max_path_len() + extra - 1);
        let result = SocketPath::new(path);
        prop_assert!(
            matches!(result, Err(EchoError::InvalidAddress { .. })),
            "expected InvalidAddress error"
        );
    }

    /// Property: paths within the limit are accepted as given
    #[test]
    fn paths_within_limit_are_accepted(name in "[a-z0-9_-]{1,64}") {
        let path = format!("/tmp/{name}.sock");
        let socket_path = SocketPath::new(&path).map_err(fail("Path"))?;
        prop_assert_eq!(socket_path.as_path(), std::path::Path::new(&path));
    }
}
