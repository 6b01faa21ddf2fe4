use pairline_server::protocol::{ConnectionId, ServerMessage};
use pairline_server::server::{ChatServer, MatchOutcome};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Barrier};
use uuid::Uuid;

type Inbox = mpsc::Receiver<Arc<ServerMessage>>;

fn connect(server: &ChatServer) -> (ConnectionId, Inbox) {
    let id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel(64);
    server.connect_client(id, tx);
    (id, rx)
}

fn drain(inbox: &mut Inbox) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Ok(message) = inbox.try_recv() {
        out.push((*message).clone());
    }
    out
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_never_double_pair() {
    let server = ChatServer::with_defaults();
    let attempts = 41;
    let barrier = Arc::new(Barrier::new(attempts));

    let mut inboxes = HashMap::new();
    let mut handles = Vec::new();
    for i in 0..attempts {
        let (id, inbox) = connect(&server);
        inboxes.insert(id, inbox);
        let server = server.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            server.join(&id, &format!("user-{i}"), None).await
        }));
    }

    let mut matched = 0;
    for handle in handles {
        if let MatchOutcome::Matched(_) = handle.await.unwrap().unwrap() {
            matched += 1;
        }
    }

    // Joins serialize on the registry: every second joiner finds a partner.
    assert_eq!(matched, attempts / 2);
    assert_eq!(server.registered_count().await, attempts);
    assert_eq!(server.waiting_count().await, attempts % 2);
    server.check_pairing_invariants().await.unwrap();

    // Each paired connection heard exactly one `matched`, naming its partner.
    for (id, inbox) in &mut inboxes {
        let messages = drain(inbox);
        let matched: Vec<_> = messages
            .iter()
            .filter_map(|m| match m {
                ServerMessage::Matched { partner_name } => Some(partner_name.clone()),
                _ => None,
            })
            .collect();
        match server.partner_of(id).await {
            Some(partner) => {
                assert_eq!(matched.len(), 1);
                assert_eq!(server.display_name(&partner).await, Some(matched[0].clone()));
                assert_eq!(server.partner_of(&partner).await, Some(*id));
            }
            None => assert!(matched.is_empty()),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_skips_and_disconnects_keep_pairing_symmetric() {
    let server = ChatServer::with_defaults();
    let count = 24;

    let mut ids = Vec::new();
    let mut inboxes = Vec::new();
    for i in 0..count {
        let (id, inbox) = connect(&server);
        server.join(&id, &format!("user-{i}"), None).await.unwrap();
        ids.push(id);
        inboxes.push(inbox);
    }
    assert_eq!(server.waiting_count().await, 0);

    let barrier = Arc::new(Barrier::new(count));
    let mut handles = Vec::new();
    for (i, id) in ids.iter().copied().enumerate() {
        let server = server.clone();
        let barrier = barrier.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            match i % 3 {
                0 => {
                    server.disconnect(&id).await;
                }
                1 => {
                    let _ = server.skip(&id).await;
                }
                _ => {
                    let _ = server.skip(&id).await;
                    let _ = server.skip(&id).await;
                }
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    server.check_pairing_invariants().await.unwrap();
    assert_eq!(server.registered_count().await, count - count / 3);
    assert_eq!(
        (server.registered_count().await - server.waiting_count().await) % 2,
        0
    );

    assert_eq!(server.transport_count(), count - count / 3);
    for (i, id) in ids.iter().enumerate() {
        assert_eq!(server.is_joined(id).await, i % 3 != 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_relay_during_disconnect() {
    let server = ChatServer::with_defaults();
    let (alice, mut alice_inbox) = connect(&server);
    let (bob, _bob_inbox) = connect(&server);
    server.join(&alice, "alice", None).await.unwrap();
    server.join(&bob, "bob", None).await.unwrap();
    drain(&mut alice_inbox);

    let barrier = Arc::new(Barrier::new(2));
    let sender = {
        let server = server.clone();
        let barrier = barrier.clone();
        tokio::spawn(async move {
            barrier.wait().await;
            for n in 0..50 {
                let message = serde_json::json!({"type": "content", "data": n.to_string()});
                server.handle_text_frame(&bob, &message.to_string()).await;
            }
        })
    };
    let leaver = {
        let server = server.clone();
        tokio::spawn(async move {
            barrier.wait().await;
            server.disconnect(&alice).await;
        })
    };
    sender.await.unwrap();
    leaver.await.unwrap();

    server.check_pairing_invariants().await.unwrap();
    assert_eq!(server.partner_of(&bob).await, None);
    assert_eq!(server.waiting_count().await, 1);

    // Whatever reached alice before she left arrived in order.
    let received: Vec<u32> = drain(&mut alice_inbox)
        .into_iter()
        .filter_map(|m| match m {
            ServerMessage::Content { data, .. } => data.parse().ok(),
            _ => None,
        })
        .collect();
    assert!(received.windows(2).all(|w| w[0] + 1 == w[1]));
}
