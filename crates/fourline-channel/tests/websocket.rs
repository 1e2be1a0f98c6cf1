//! Integration tests for the WebSocket relay.
//!
//! These spin up a real relay on an OS-assigned port and subscribe to it
//! over the network.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use fourline_channel::{
        ChannelError, Publisher, UpdateChannel, UpdateStream, WebSocketChannel,
        WebSocketRelay,
    };
    use fourline_protocol::{ParticipantId, RoomCode, SessionRecord, Username};

    fn record(code: &str, version: u64) -> SessionRecord {
        let mut record = SessionRecord::new(
            RoomCode::parse(code).unwrap(),
            Username::parse("alice").unwrap(),
            ParticipantId::new("userA"),
        );
        record.version = version;
        record
    }

    async fn start_relay() -> (String, fourline_channel::RelayHandle) {
        // "127.0.0.1:0" lets the OS pick a free port.
        let relay = WebSocketRelay::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let url = format!("ws://{}", relay.local_addr().unwrap());
        let handle = relay.handle();
        tokio::spawn(relay.run());
        (url, handle)
    }

    #[tokio::test]
    async fn test_relay_delivers_update_to_room_subscriber() {
        let (url, relay) = start_relay().await;
        let channel = WebSocketChannel::new(url);
        let code = RoomCode::parse("AB12C3").unwrap();

        let mut stream = channel.open(&code).await.expect("should subscribe");
        assert_eq!(relay.subscriber_count(&code), 1);

        relay.publish(&record("AB12C3", 3));

        let got = tokio::time::timeout(Duration::from_secs(2), stream.recv())
            .await
            .expect("update within timeout")
            .expect("recv should succeed")
            .expect("should have a record");
        assert_eq!(got.room_code, code);
        assert_eq!(got.version, 3);
    }

    #[tokio::test]
    async fn test_relay_does_not_cross_rooms() {
        let (url, relay) = start_relay().await;
        let channel = WebSocketChannel::new(url);

        let mut stream = channel
            .open(&RoomCode::parse("ZZZZZZ").unwrap())
            .await
            .unwrap();

        relay.publish(&record("AB12C3", 1));
        relay.publish(&record("ZZZZZZ", 7));

        let got = tokio::time::timeout(Duration::from_secs(2), stream.recv())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(got.room_code.as_str(), "ZZZZZZ");
        assert_eq!(got.version, 7);
    }

    #[tokio::test]
    async fn test_relay_forgets_disconnected_subscriber() {
        let (url, relay) = start_relay().await;
        let channel = WebSocketChannel::new(url);
        let code = RoomCode::parse("AB12C3").unwrap();

        let stream = channel.open(&code).await.unwrap();
        drop(stream);

        // The relay notices the dropped socket on its next read or send.
        let mut count = relay.subscriber_count(&code);
        for _ in 0..50 {
            if count == 0 {
                break;
            }
            relay.publish(&record("AB12C3", 1));
            tokio::time::sleep(Duration::from_millis(20)).await;
            count = relay.subscriber_count(&code);
        }
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_connect_to_missing_relay_fails() {
        let channel = WebSocketChannel::new("ws://127.0.0.1:1");
        let result = channel.open(&RoomCode::parse("AB12C3").unwrap()).await;
        assert!(matches!(result, Err(ChannelError::ConnectFailed(_))));
    }
}
