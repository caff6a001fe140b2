//! UDP transport tests against a local DNS responder.

use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use consul_discovery::transport::ResponseCode;
use consul_discovery::{
    AnswerRecord, DiscoveryConfig, DnsQuery, DnsTransport, Resolver, UdpTransport,
};
use hickory_resolver::proto::op::{Message, MessageType};
use hickory_resolver::proto::rr::rdata::{A, SRV};
use hickory_resolver::proto::rr::{Name, RData, Record, RecordType};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, UdpSocket};

fn name(s: &str) -> Name {
    Name::from_str(s).unwrap()
}

/// Build the catalog's answer to `request`.
fn answer(request: &Message) -> Message {
    let mut response = Message::new();
    response
        .set_id(request.id())
        .set_message_type(MessageType::Response)
        .set_recursion_desired(request.recursion_desired());

    let Some(query) = request.queries().first() else {
        response.set_response_code(ResponseCode::FormErr);
        return response;
    };
    response.add_query(query.clone());

    let qname = query.name().to_ascii();
    match (qname.as_str(), query.query_type()) {
        ("api.service.consul.", RecordType::SRV) => {
            for (target, port) in [("host1.node.dc1.consul.", 8080), ("host2.node.dc1.consul.", 8081)] {
                response.add_answer(Record::from_rdata(
                    query.name().clone(),
                    0,
                    RData::SRV(SRV::new(1, 1, port, name(target))),
                ));
            }
        }
        ("host1.node.dc1.consul.", RecordType::A) => {
            response.add_answer(Record::from_rdata(
                query.name().clone(),
                0,
                RData::A(A::new(10, 0, 0, 1)),
            ));
        }
        ("host1.node.dc1.consul.", RecordType::AAAA) => {}
        ("broken.service.consul.", _) => {
            response.set_response_code(ResponseCode::ServFail);
        }
        ("host2.node.dc1.consul.", RecordType::A) => {
            response.add_answer(Record::from_rdata(
                query.name().clone(),
                0,
                RData::A(A::new(10, 0, 0, 2)),
            ));
        }
        _ => {
            response.set_response_code(ResponseCode::NXDomain);
        }
    }
    response
}

async fn bind_udp() -> (SocketAddr, UdpSocket) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = socket.local_addr().unwrap();
    (addr, socket)
}

/// Serve DNS over UDP. When `truncate` is set, every reply is emptied and
/// marked truncated.
fn serve_udp(socket: UdpSocket, truncate: bool) {
    tokio::spawn(async move {
        let mut buf = vec![0u8; 4096];
        loop {
            let Ok((len, peer)) = socket.recv_from(&mut buf).await else {
                return;
            };
            let Ok(request) = Message::from_vec(&buf[..len]) else {
                continue;
            };

            let mut response = answer(&request);
            if truncate {
                response.take_answers();
                response.set_truncated(true);
            }
            let bytes = response.to_vec().unwrap();
            let _ = socket.send_to(&bytes, peer).await;
        }
    });
}

fn serve_tcp(listener: TcpListener) {
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                loop {
                    let mut len_buf = [0u8; 2];
                    if stream.read_exact(&mut len_buf).await.is_err() {
                        return;
                    }
                    let mut body = vec![0u8; u16::from_be_bytes(len_buf) as usize];
                    if stream.read_exact(&mut body).await.is_err() {
                        return;
                    }
                    let request = Message::from_vec(&body).unwrap();
                    let bytes = answer(&request).to_vec().unwrap();

                    let mut framed = (bytes.len() as u16).to_be_bytes().to_vec();
                    framed.extend_from_slice(&bytes);
                    if stream.write_all(&framed).await.is_err() {
                        return;
                    }
                }
            });
        }
    });
}

/// Serve DNS over UDP and TCP on the same port.
async fn dns_server() -> SocketAddr {
    let (addr, socket) = bind_udp().await;
    let listener = TcpListener::bind(addr).await.unwrap();
    serve_udp(socket, false);
    serve_tcp(listener);
    addr
}

#[tokio::test]
async fn test_udp_exchange_srv() {
    let server = dns_server().await;
    let transport = UdpTransport::new(Duration::from_secs(2));

    let response = transport
        .exchange(server, &DnsQuery::srv("api.service.consul"))
        .await
        .expect("Exchange failed");

    assert!(response.is_success());
    let targets: Vec<_> = response
        .answers
        .iter()
        .filter_map(|a| match a {
            AnswerRecord::Srv(srv) => Some((srv.target.as_str(), srv.port)),
            _ => None,
        })
        .collect();
    assert_eq!(
        targets,
        vec![("host1.node.dc1.consul.", 8080), ("host2.node.dc1.consul.", 8081)]
    );
}

#[tokio::test]
async fn test_udp_exchange_nxdomain() {
    let server = dns_server().await;
    let transport = UdpTransport::new(Duration::from_secs(2));

    let response = transport
        .exchange(server, &DnsQuery::a("missing.node.consul"))
        .await
        .unwrap();
    assert_eq!(response.response_code, ResponseCode::NXDomain);
}

#[tokio::test]
async fn test_resolver_over_udp() {
    let server = dns_server().await;
    let resolver = Resolver::with_config(
        DiscoveryConfig::new(server.to_string()).timeout(Duration::from_secs(2)),
    )
    .await
    .unwrap();

    let instances = resolver
        .discover_all_service_instances("api")
        .await
        .unwrap();
    let endpoints: Vec<String> = instances.iter().map(ToString::to_string).collect();
    assert_eq!(endpoints, vec!["10.0.0.1:8080", "10.0.0.2:8081"]);

    let (ip, port) = resolver.discover_service("api").await.unwrap();
    assert_eq!((ip.as_str(), port.as_str()), ("10.0.0.1", "8080"));

    // Second discovery hits the cache for both targets.
    assert_eq!(resolver.stats().target_queries, 2);
}

#[tokio::test]
async fn test_truncated_reply_retried_over_tcp() {
    let (addr, socket) = bind_udp().await;
    let listener = TcpListener::bind(addr).await.unwrap();
    serve_udp(socket, true);
    serve_tcp(listener);

    let transport = UdpTransport::new(Duration::from_secs(2));
    let response = transport
        .exchange(addr, &DnsQuery::a("host1.node.dc1.consul"))
        .await
        .expect("TCP fallback failed");

    assert_eq!(
        response.answers,
        vec![AnswerRecord::A(Ipv4Addr::new(10, 0, 0, 1))]
    );
}

#[tokio::test]
async fn test_truncated_reply_without_fallback() {
    let (addr, socket) = bind_udp().await;
    serve_udp(socket, true);

    let transport = UdpTransport::new(Duration::from_secs(2)).tcp_fallback(false);
    let err = transport
        .exchange(addr, &DnsQuery::a("host1.node.dc1.consul"))
        .await
        .unwrap_err();

    assert!(err.is_transport(), "unexpected error: {err}");
}

#[tokio::test]
async fn test_empty_answer_is_success() {
    let server = dns_server().await;
    let transport = UdpTransport::new(Duration::from_secs(2));

    let response = transport
        .exchange(server, &DnsQuery::new("host1.node.dc1.consul", RecordType::AAAA))
        .await
        .unwrap();

    assert!(response.is_success());
    assert!(response.answers.is_empty());
}

#[tokio::test]
async fn test_server_failure_code_is_returned() {
    let server = dns_server().await;
    let transport = UdpTransport::new(Duration::from_secs(2));

    let response = transport
        .exchange(server, &DnsQuery::srv("broken.service.consul"))
        .await
        .unwrap();
    assert_eq!(response.response_code, ResponseCode::ServFail);
}

#[tokio::test]
async fn test_silent_server_times_out() {
    // Bound but never read from.
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let server = silent.local_addr().unwrap();

    let transport = UdpTransport::new(Duration::from_millis(200));
    let err = transport
        .exchange(server, &DnsQuery::srv("api.service.consul"))
        .await
        .unwrap_err();

    assert!(err.is_transport(), "unexpected error: {err}");
}
