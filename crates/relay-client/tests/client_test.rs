//! Client tests against loopback servers.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use relay_client::{Client, ClientConfig, ClientError, ClientExit};
use relay_core::{DispatchMode, Dispatcher};
use relay_server::{RelayServer, ServerConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const TIMEOUT: Duration = Duration::from_secs(5);

fn config_for(port: u16) -> ClientConfig {
    ClientConfig {
        host: "127.0.0.1".into(),
        port,
        ..Default::default()
    }
}

async fn listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

#[tokio::test]
async fn exit_sentinel_is_not_sent() {
    let (listener, port) = listener().await;
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let _ = socket.read_to_end(&mut received).await.unwrap();
        received
    });

    let client = Client::connect(&config_for(port)).await.unwrap();
    let input = Cursor::new(b"hello\nexit\nafter\n".to_vec());
    let exit = timeout(TIMEOUT, client.run(input, tokio::io::sink()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit, ClientExit::Sentinel);

    let received = timeout(TIMEOUT, server).await.unwrap().unwrap();
    assert_eq!(received, b"hello\n");
}

#[tokio::test]
async fn non_utf8_input_is_forwarded_raw() {
    let (listener, port) = listener().await;
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let _ = socket.read_to_end(&mut received).await.unwrap();
        received
    });

    let client = Client::connect(&config_for(port)).await.unwrap();
    let input = Cursor::new(b"caf\xe9\r\nhello\nexit\n".to_vec());
    let exit = timeout(TIMEOUT, client.run(input, tokio::io::sink()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit, ClientExit::Sentinel);

    let received = timeout(TIMEOUT, server).await.unwrap().unwrap();
    assert_eq!(received, b"caf\xe9\nhello\n");
}

#[tokio::test]
async fn server_lines_are_printed_until_close() {
    let (listener, port) = listener().await;
    let _server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(b"one\r\ntwo\nthree").await.unwrap();
        // dropping the socket closes the connection
    });

    let client = Client::connect(&config_for(port)).await.unwrap();
    // Input stays open: the closed socket alone must end the session.
    let (_input_tx, input) = tokio::io::duplex(64);
    let (output, mut printed) = tokio::io::duplex(1024);

    let exit = timeout(TIMEOUT, client.run(input, output))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit, ClientExit::ServerClosed);

    let mut text = String::new();
    let _ = printed.read_to_string(&mut text).await.unwrap();
    assert_eq!(text, "one\ntwo\nthree\n");
}

#[tokio::test]
async fn input_eof_ends_session() {
    let (listener, port) = listener().await;
    let _server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut sink = Vec::new();
        let _ = socket.read_to_end(&mut sink).await;
    });

    let client = Client::connect(&config_for(port)).await.unwrap();
    let exit = timeout(TIMEOUT, client.run(Cursor::new(Vec::new()), tokio::io::sink()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(exit, ClientExit::InputClosed);
}

#[tokio::test]
async fn external_cancel_interrupts_both_tasks() {
    let (listener, port) = listener().await;
    let _server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut sink = Vec::new();
        let _ = socket.read_to_end(&mut sink).await;
    });

    let client = Client::connect(&config_for(port)).await.unwrap();
    let (_input_tx, input) = tokio::io::duplex(64);
    let shutdown = CancellationToken::new();
    let run = tokio::spawn(client.run_until(input, tokio::io::sink(), shutdown.clone()));

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.cancel();

    let exit = timeout(TIMEOUT, run).await.unwrap().unwrap().unwrap();
    assert_eq!(exit, ClientExit::Interrupted);
}

#[tokio::test]
async fn refused_connection_reports_target() {
    let (listener, port) = listener().await;
    drop(listener);

    let err = match Client::connect(&config_for(port)).await {
        Ok(_) => panic!("connect should fail with no listener"),
        Err(e) => e,
    };
    assert!(matches!(err, ClientError::Connect { .. }));
    assert!(err.to_string().contains(&format!("127.0.0.1:{port}")));
}

#[tokio::test]
async fn chats_through_relay_server() {
    let server = RelayServer::new(
        ServerConfig {
            host: "127.0.0.1".into(),
            port: 0,
            ..Default::default()
        },
        Arc::new(Dispatcher::new(DispatchMode::Echo)),
    );
    let (addr, accept_loop) = server.listen().await.unwrap();

    let client = Client::connect(&config_for(addr.port())).await.unwrap();
    let (mut typed, input) = tokio::io::duplex(256);
    let (output, mut printed) = tokio::io::duplex(256);
    let run = tokio::spawn(client.run(input, output));

    typed.write_all(b"hi there\n").await.unwrap();
    let mut echoed = [0u8; 9];
    let _ = timeout(TIMEOUT, printed.read_exact(&mut echoed))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&echoed, b"hi there\n");

    typed.write_all(b"exit\n").await.unwrap();
    let exit = timeout(TIMEOUT, run).await.unwrap().unwrap().unwrap();
    assert_eq!(exit, ClientExit::Sentinel);

    server.stop(accept_loop).await;
}
