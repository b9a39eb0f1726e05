use std::net::SocketAddr;
use std::time::Duration;

use plumber::middleware::{self, Plumber};
use plumber::{Handler, Request, Response, Server, health};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

/// Reserves a free local port by binding and immediately releasing it.
fn free_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

async fn send(addr: SocketAddr, raw: &str) -> String {
    let mut stream = None;
    for _ in 0..50 {
        match TcpStream::connect(addr).await {
            Ok(s) => {
                stream = Some(s);
                break;
            }
            Err(_) => tokio::time::sleep(Duration::from_millis(20)).await,
        }
    }
    let mut stream = stream.expect("server did not start");
    stream.write_all(raw.as_bytes()).await.unwrap();

    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

fn echo(req: &Request, res: &mut Response) {
    res.set_header("x-path", req.path());
    res.write(req.body());
}

fn explode(_req: &Request, _res: &mut Response) {
    panic!("unrecovered");
}

async fn serving<H: Handler>(handler: H, test: impl AsyncFnOnce(SocketAddr)) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let addr = free_addr();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(Server::bind(&addr.to_string()).serve_with_shutdown(handler, async move {
        let _ = stopped.await;
    }));

    test(addr).await;

    stop.send(()).unwrap();
    server.await.unwrap().unwrap();
}

#[tokio::test]
async fn serves_a_composed_pipeline() {
    let app = Plumber::new()
        .stage(middleware::trace())
        .action(|_: &Request, res: &mut Response| res.write_str("hello "))
        .action(echo)
        .build();

    serving(app, async |addr| {
        let reply = send(
            addr,
            "POST /greet HTTP/1.1\r\nhost: test\r\ncontent-length: 5\r\nconnection: close\r\n\r\nworld",
        )
        .await;
        assert!(reply.starts_with("HTTP/1.1 200 OK"), "{reply}");
        assert!(reply.contains("x-path: /greet"), "{reply}");
        assert!(reply.ends_with("hello world"), "{reply}");
    })
    .await;
}

#[tokio::test]
async fn unrecovered_panic_becomes_internal_error() {
    let app = Plumber::new().action(explode).build();

    serving(app, async |addr| {
        let reply = send(addr, "GET / HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n").await;
        assert!(reply.starts_with("HTTP/1.1 500 Internal Server Error"), "{reply}");
    })
    .await;
}

#[tokio::test]
async fn health_action_is_served_directly() {
    serving(health::liveness, async |addr| {
        let reply = send(addr, "GET /healthz HTTP/1.1\r\nhost: test\r\nconnection: close\r\n\r\n").await;
        assert!(reply.starts_with("HTTP/1.1 200 OK"), "{reply}");
        assert!(reply.ends_with("ok"), "{reply}");
    })
    .await;
}
