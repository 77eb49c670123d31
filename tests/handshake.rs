//! Handshake scenarios between a bootstrap session and a scripted remote peer
//! over an in-memory stream.

mod common;

use std::sync::Arc;

use common::{bootstrap_context, duplex_pair, RecordingPeerKeeper, RemotePeer, PROTOCOL_ID};
use overlay_bootstrap::crypto::{PrivateKey, SessionCrypto};
use overlay_bootstrap::network::{
    Disconnect, DisconnectReason, Message, MessageKind, Peer, RandVal,
};
use overlay_bootstrap::{BootstrapError, PeerSession};

fn disconnect(reason: DisconnectReason) -> MessageKind {
    MessageKind::Disconnect(Disconnect { reason })
}

#[tokio::test]
async fn test_full_handshake() {
    let keeper = Arc::new(RecordingPeerKeeper::new(10));
    let ctx = bootstrap_context(0, keeper.clone());
    let (local, mut conn) = duplex_pair();
    let session = tokio::spawn(PeerSession::new(ctx, local).run());

    let mut remote = RemotePeer::new("peer-b");
    let their_hello = remote.recv_hello(&mut conn).await;
    assert_eq!(their_hello.proto_id, PROTOCOL_ID);

    remote.send(&mut conn, remote.hello(PROTOCOL_ID, 0.4242)).await.unwrap();
    remote.send(&mut conn, RandVal { rand_val: their_hello.rand_val }).await.unwrap();

    assert_eq!(remote.recv(&mut conn).await.unwrap(), MessageKind::RandVal(RandVal { rand_val: 0.4242 }));
    match remote.recv(&mut conn).await.unwrap() {
        MessageKind::Peers(peers) => assert!(peers.peers.is_empty()),
        other => panic!("expected Peers, got {:?}", other),
    }
    assert_eq!(remote.recv(&mut conn).await.unwrap(), disconnect(DisconnectReason::Bootstrap));

    session.await.unwrap().unwrap();
    assert_eq!(*keeper.added.lock(), vec!["peer-b".to_string()]);
    assert_eq!(*keeper.queried.lock(), vec!["peer-b".to_string()]);
}

#[tokio::test]
async fn test_second_peer_receives_first() {
    let keeper = Arc::new(RecordingPeerKeeper::new(10));
    let ctx = bootstrap_context(0, keeper.clone());

    for (id, expected) in [("peer-1", 0usize), ("peer-2", 1)] {
        let (local, mut conn) = duplex_pair();
        let session = tokio::spawn(PeerSession::new(ctx.clone(), local).run());
        let mut remote = RemotePeer::new(id);
        let their_hello = remote.recv_hello(&mut conn).await;
        remote.send(&mut conn, remote.hello(PROTOCOL_ID, 0.5)).await.unwrap();
        remote.send(&mut conn, RandVal { rand_val: their_hello.rand_val }).await.unwrap();
        remote.recv(&mut conn).await.unwrap();

        let MessageKind::Peers(peers) = remote.recv(&mut conn).await.unwrap() else {
            panic!("expected Peers");
        };
        assert_eq!(peers.peers.len(), expected);
        if expected == 1 {
            let peer = Peer::from_value(&peers.peers[0]).unwrap();
            assert_eq!(peer.node_name, "peer-1");
            assert_eq!(peer.address, "192.0.2.7");
            assert_eq!(peer.port, 40103);
        }
        remote.recv(&mut conn).await.unwrap();
        session.await.unwrap().unwrap();
    }
    assert_eq!(keeper.added.lock().len(), 2);
}

#[tokio::test]
async fn test_key_not_difficult_enough() {
    let keeper = Arc::new(RecordingPeerKeeper::new(10));
    let ctx = bootstrap_context(100, keeper.clone());
    let (local, mut conn) = duplex_pair();
    let session = tokio::spawn(PeerSession::new(ctx, local).run());

    let mut remote = RemotePeer::new("weak");
    remote.recv_hello(&mut conn).await;
    remote.send(&mut conn, remote.hello(PROTOCOL_ID, 0.1)).await.unwrap();

    assert_eq!(remote.recv(&mut conn).await.unwrap(), disconnect(DisconnectReason::KeyNotDifficult));
    assert!(matches!(
        session.await.unwrap(),
        Err(BootstrapError::KeyNotDifficult { required: 100, .. })
    ));
    assert!(matches!(remote.recv(&mut conn).await, Err(BootstrapError::ConnectionClosed)));
    assert!(keeper.added.lock().is_empty());
}

#[tokio::test]
async fn test_protocol_id_mismatch() {
    let keeper = Arc::new(RecordingPeerKeeper::new(10));
    let ctx = bootstrap_context(0, keeper.clone());
    let (local, mut conn) = duplex_pair();
    let session = tokio::spawn(PeerSession::new(ctx, local).run());

    let mut remote = RemotePeer::new("old");
    remote.recv_hello(&mut conn).await;
    remote.send(&mut conn, remote.hello("30", 0.1)).await.unwrap();

    assert_eq!(remote.recv(&mut conn).await.unwrap(), disconnect(DisconnectReason::ProtocolVersion));
    match session.await.unwrap() {
        Err(BootstrapError::ProtocolMismatch { remote, local }) => {
            assert_eq!(remote, "30");
            assert_eq!(local, PROTOCOL_ID);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(keeper.queried.lock().is_empty());
}

#[tokio::test]
async fn test_bad_rand_val_signature() {
    let keeper = Arc::new(RecordingPeerKeeper::new(10));
    let ctx = bootstrap_context(0, keeper.clone());
    let bootstrap_key = ctx.private_key().public_key();
    let (local, mut conn) = duplex_pair();
    let session = tokio::spawn(PeerSession::new(ctx, local).run());

    let mut remote = RemotePeer::new("forger");
    let their_hello = remote.recv_hello(&mut conn).await;
    remote.send(&mut conn, remote.hello(PROTOCOL_ID, 0.3)).await.unwrap();

    // correct value, but signed by a key other than the one announced
    let forger = SessionCrypto::with_remote(PrivateKey::generate(), bootstrap_key);
    let mut rand_val = Message::new(RandVal { rand_val: their_hello.rand_val });
    conn.send(&mut rand_val, &forger).await.unwrap();

    assert_eq!(remote.recv(&mut conn).await.unwrap(), disconnect(DisconnectReason::Unverified));
    assert!(matches!(session.await.unwrap(), Err(BootstrapError::VerificationFailed)));
    assert!(keeper.added.lock().is_empty());
}

#[tokio::test]
async fn test_incorrect_rand_val() {
    let keeper = Arc::new(RecordingPeerKeeper::new(10));
    let ctx = bootstrap_context(0, keeper.clone());
    let (local, mut conn) = duplex_pair();
    let session = tokio::spawn(PeerSession::new(ctx, local).run());

    let mut remote = RemotePeer::new("guesser");
    let their_hello = remote.recv_hello(&mut conn).await;
    remote.send(&mut conn, remote.hello(PROTOCOL_ID, 0.3)).await.unwrap();
    remote.send(&mut conn, RandVal { rand_val: their_hello.rand_val + 1.0 }).await.unwrap();

    let err = session.await.unwrap().unwrap_err();
    assert!(err.to_string().contains("incorrect RandVal"));
    // no disconnect notice: the stream just ends
    assert!(matches!(remote.recv(&mut conn).await, Err(BootstrapError::ConnectionClosed)));
}
