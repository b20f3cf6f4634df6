//! Integration tests for the UDP endpoints.
//!
//! Each test runs a sender and a receiver as separate tokio tasks talking
//! over the loopback interface.

use std::time::Duration;

use selective_repeat::endpoint::{run_receiver, run_sender, EndpointConfig, EndpointError};
use selective_repeat::socket::Socket;
use selective_repeat::{Message, SrConfig};

/// Bind a socket to an OS-assigned port on loopback.
async fn ephemeral() -> Socket {
    let addr = "127.0.0.1:0".parse().unwrap();
    Socket::bind(addr).await.expect("bind failed")
}

fn config(window: usize) -> EndpointConfig {
    EndpointConfig {
        protocol: SrConfig::new(window, 16.0).unwrap(),
        time_unit: Duration::from_millis(5),
        max_retries: 20,
        linger: Duration::from_millis(200),
    }
}

fn messages(count: usize) -> Vec<Message> {
    (0..count)
        .map(|i| Message::from_slice(format!("msg-{i:04}").as_bytes()))
        .collect()
}

#[tokio::test]
async fn transfer_over_loopback() {
    const COUNT: usize = 40;

    let receiver_sock = ephemeral().await;
    let receiver_addr = receiver_sock.local_addr;

    let receiver = tokio::spawn(async move {
        run_receiver(&receiver_sock, COUNT, &config(6))
            .await
            .expect("receive")
    });

    let sender = tokio::spawn(async move {
        let sock = ephemeral().await;
        run_sender(&sock, receiver_addr, &messages(COUNT), &config(6))
            .await
            .expect("send")
    });

    let (received, stats) = tokio::join!(receiver, sender);
    let received = received.unwrap();
    let stats = stats.unwrap();

    assert_eq!(received.messages, messages(COUNT));
    assert_eq!(received.stats.packets_delivered, COUNT as u64);
    assert_eq!(stats.packets_sent, COUNT as u64);
    assert_eq!(stats.window_full, 0);
}

#[tokio::test]
async fn stop_and_wait_window() {
    const COUNT: usize = 10;

    let receiver_sock = ephemeral().await;
    let receiver_addr = receiver_sock.local_addr;

    let receiver = tokio::spawn(async move {
        run_receiver(&receiver_sock, COUNT, &config(1))
            .await
            .expect("receive")
    });
    let sender = tokio::spawn(async move {
        let sock = ephemeral().await;
        run_sender(&sock, receiver_addr, &messages(COUNT), &config(1))
            .await
            .expect("send")
    });

    let (received, sent) = tokio::join!(receiver, sender);
    assert_eq!(received.unwrap().messages, messages(COUNT));
    assert_eq!(sent.unwrap().new_acks, COUNT as u64);
}

#[tokio::test]
async fn silent_peer_exhausts_retries() {
    // Bound but never read: every packet goes unacknowledged.
    let silent = ephemeral().await;
    let sock = ephemeral().await;
    let cfg = EndpointConfig {
        time_unit: Duration::from_millis(1),
        max_retries: 3,
        ..config(4)
    };

    let result = run_sender(&sock, silent.local_addr, &messages(2), &cfg).await;
    assert!(matches!(result, Err(EndpointError::MaxRetriesExceeded(3))));
}

#[tokio::test]
async fn nothing_to_send_returns_immediately() {
    let peer = ephemeral().await;
    let sock = ephemeral().await;
    let stats = run_sender(&sock, peer.local_addr, &[], &config(6))
        .await
        .expect("empty transfer");
    assert_eq!(stats.packets_sent, 0);
}
