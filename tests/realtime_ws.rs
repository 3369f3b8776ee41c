//! Realtime channels against a local WebSocket server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use cashier::config::RealtimeConfig;
use cashier::realtime::{
    ChannelKind, ChatMessage, ConnectionStatus, MessageKind, PushMessage, RealtimeHub, WsConnector,
};

mod common;

fn config(server: &common::MockWsServer) -> RealtimeConfig {
    RealtimeConfig {
        notification_url: server.url("/notifications"),
        chat_url: server.url("/chat"),
        service_key: "svc-key".to_string(),
        reconnect_base_delay_ms: 50,
        max_reconnect_attempts: 3,
    }
}

#[tokio::test]
async fn test_notification_channel_delivers_valid_frames_only() {
    let server = common::MockWsServer::start().await;
    let hub = RealtimeHub::init(&config(&server), Arc::new(WsConnector::default())).unwrap();

    let withdrawals = Arc::new(Mutex::new(Vec::new()));
    let w = withdrawals.clone();
    let _sub = hub
        .notifications()
        .registry()
        .subscribe(MessageKind::Withdraw, move |message| {
            if let PushMessage::Withdraw(n) = message {
                w.lock().unwrap().push(n.hash.clone());
            }
        });

    hub.connect_notifications("user-42");
    assert!(
        common::wait_until(Duration::from_secs(5), || {
            hub.notifications().status() == ConnectionStatus::Connected && server.connections() == 1
        })
        .await
    );

    let uri = &server.uris()[0];
    assert!(uri.starts_with("/notifications?"));
    assert!(uri.contains("serviceKey=svc-key"));
    assert!(uri.contains("userId=user-42"));

    server.push("not json at all");
    server.push(r#"{"amount":"5"}"#);
    server.push(r#"{"type":"SOMETHINGELSE"}"#);
    server.push(
        r#"{"type":"WITHDRAWNOTIFICATION","amount":"5","tokenSymbol":"USDT","hash":"0xabc","status":"CONFIRMED"}"#,
    );

    assert!(common::wait_until(Duration::from_secs(5), || !withdrawals.lock().unwrap().is_empty()).await);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(*withdrawals.lock().unwrap(), vec![Some("0xabc".to_string())]);
    assert_eq!(hub.notifications().status(), ConnectionStatus::Connected);

    hub.shutdown();
}

#[tokio::test]
async fn test_chat_round_trip() {
    let server = common::MockWsServer::start().await;
    let hub = RealtimeHub::init(&config(&server), Arc::new(WsConnector::default())).unwrap();

    let replies = Arc::new(Mutex::new(Vec::new()));
    let r = replies.clone();
    let _sub = hub.chat().subscribe(move |line| r.lock().unwrap().push(line.clone()));

    let line = ChatMessage {
        text: "hello".into(),
        sender: "user-42".into(),
        is_agent: false,
    };
    assert!(hub.chat().send(&line).is_err());

    hub.connect_chat("user-42");
    assert!(
        common::wait_until(Duration::from_secs(5), || {
            hub.channel(ChannelKind::Chat).status() == ConnectionStatus::Connected
        })
        .await
    );
    let uri = &server.uris()[0];
    assert!(uri.contains("serviceKey=svc-key"));
    assert!(!uri.contains("userId"));

    hub.chat().send(&line).unwrap();
    assert!(common::wait_until(Duration::from_secs(5), || !server.received().is_empty()).await);
    let sent: serde_json::Value = serde_json::from_str(&server.received()[0]).unwrap();
    assert_eq!(sent["text"], "hello");
    assert_eq!(sent["isAgent"], false);

    server.push(r#"{"text":"how can I help?","sender":"support","isAgent":true}"#);
    assert!(common::wait_until(Duration::from_secs(5), || !replies.lock().unwrap().is_empty()).await);
    let reply = replies.lock().unwrap()[0].clone();
    assert!(reply.is_agent);
    assert_eq!(reply.text, "how can I help?");

    // The notification channel was never opened.
    assert_eq!(hub.notifications().status(), ConnectionStatus::Idle);
    hub.shutdown();
}

#[tokio::test]
async fn test_reconnects_after_server_drop() {
    let server = common::MockWsServer::start().await;
    let hub = RealtimeHub::init(&config(&server), Arc::new(WsConnector::default())).unwrap();

    hub.connect_notifications("user-42");
    assert!(common::wait_until(Duration::from_secs(5), || server.connections() == 1).await);
    assert!(
        common::wait_until(Duration::from_secs(5), || {
            hub.notifications().status() == ConnectionStatus::Connected
        })
        .await
    );

    server.drop_connections();
    assert!(common::wait_until(Duration::from_secs(5), || server.connections() == 2).await);
    assert!(
        common::wait_until(Duration::from_secs(5), || {
            hub.notifications().status() == ConnectionStatus::Connected
        })
        .await
    );
    assert_eq!(hub.notifications().snapshot().reconnect_attempts, 0);

    hub.shutdown();
    assert_eq!(hub.notifications().status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_gives_up_when_server_is_gone() {
    // Grab a port and release it so nothing is listening there.
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = RealtimeConfig {
        notification_url: format!("ws://127.0.0.1:{}/notifications", port),
        chat_url: format!("ws://127.0.0.1:{}/chat", port),
        service_key: "svc-key".into(),
        reconnect_base_delay_ms: 10,
        max_reconnect_attempts: 2,
    };
    let hub = RealtimeHub::init(&config, Arc::new(WsConnector::default())).unwrap();

    hub.connect_notifications("user-42");
    assert!(
        common::wait_until(Duration::from_secs(5), || {
            hub.notifications().status() == ConnectionStatus::Disconnected
        })
        .await
    );
    let snapshot = hub.notifications().snapshot();
    assert_eq!(snapshot.reconnect_attempts, 2);
    assert_eq!(snapshot.last_identity.as_deref(), Some("user-42"));

    // Chat was never touched by the notification channel's failures.
    assert_eq!(hub.channel(ChannelKind::Chat).status(), ConnectionStatus::Idle);
}
