//! Full-stack wire tests: ECIES transport, `p2p` hello exchange and the `eth` status
//! handshake layered over a real TCP socket.

use elc_ecies::{util::pk2id, ECIESStream};
use elc_eth_wire::{
    Capability, EthMessage, EthVersion, GetPooledTransactions, HelloMessage, ProtocolVersion,
    RequestPair, Status, UnauthedEthStream, UnauthedP2PStream,
};
use elc_primitives::B256;
use futures::{SinkExt, StreamExt};
use secp256k1::{PublicKey, SecretKey, SECP256K1};
use tokio::net::{TcpListener, TcpStream};

fn hello_for(secret: &SecretKey) -> HelloMessage {
    HelloMessage {
        protocol_version: ProtocolVersion::V5,
        client_version: "elc/0.1.0".to_string(),
        capabilities: vec![Capability::eth_66(), Capability::eth_68()],
        port: 30303,
        id: pk2id(&PublicKey::from_secret_key(SECP256K1, secret)),
    }
}

fn status() -> Status {
    Status::new(EthVersion::Eth68, 1, B256::repeat_byte(0xd4))
}

#[tokio::test]
async fn ecies_p2p_eth_roundtrip() {
    let server_secret = SecretKey::new(&mut rand::thread_rng());
    let server_id = pk2id(&PublicKey::from_secret_key(SECP256K1, &server_secret));
    let client_secret = SecretKey::new(&mut rand::thread_rng());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server_hello = hello_for(&server_secret);
    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let transport = ECIESStream::incoming(socket, server_secret).await.unwrap();
        let (p2p, _their_hello) =
            UnauthedP2PStream::new(transport).handshake(server_hello).await.unwrap();
        assert_eq!(p2p.shared_capabilities().eth_version().unwrap(), EthVersion::Eth68);

        let (mut eth, _their_status) =
            UnauthedEthStream::new(p2p).handshake(status()).await.unwrap();

        // answer one pooled-transactions request with an empty response
        match eth.next().await.unwrap().unwrap() {
            EthMessage::GetPooledTransactions(RequestPair { request_id, message }) => {
                assert_eq!(request_id, 0x1337);
                assert_eq!(message.0.len(), 2);
                eth.send(EthMessage::PooledTransactions(RequestPair {
                    request_id,
                    message: Default::default(),
                }))
                .await
                .unwrap();
            }
            other => panic!("unexpected message: {other:?}"),
        }
    });

    let socket = TcpStream::connect(addr).await.unwrap();
    let transport = ECIESStream::connect(socket, client_secret, server_id).await.unwrap();
    assert_eq!(transport.remote_id(), server_id);

    let (p2p, _their_hello) =
        UnauthedP2PStream::new(transport).handshake(hello_for(&client_secret)).await.unwrap();
    assert_eq!(p2p.shared_capabilities().eth_version().unwrap(), EthVersion::Eth68);

    let (mut eth, _their_status) =
        UnauthedEthStream::new(p2p).handshake(status()).await.unwrap();

    eth.send(EthMessage::GetPooledTransactions(RequestPair {
        request_id: 0x1337,
        message: GetPooledTransactions(vec![
            B256::repeat_byte(0x01),
            B256::repeat_byte(0x02),
        ]),
    }))
    .await
    .unwrap();

    match eth.next().await.unwrap().unwrap() {
        EthMessage::PooledTransactions(RequestPair { request_id, message }) => {
            assert_eq!(request_id, 0x1337);
            assert!(message.0.is_empty());
        }
        other => panic!("unexpected message: {other:?}"),
    }

    server.await.unwrap();
}
