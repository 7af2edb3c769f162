use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use waypoint::transport::{MemoryHandle, MemoryTransport};
use waypoint::{App, Config};

const GET_HOME: &[u8] = b"GET /home/friday HTTP/1.1\r\nHost: localhost\r\n\r\n";

fn demo_app() -> App {
    let mut app = App::new();
    app.get("/", |_req, res| {
        res.send("Eureka!");
        Ok(())
    });
    app.get("/home/:epic", |req, res| {
        let epic = req.params.get("epic").unwrap_or_default().to_string();
        res.send(format!("{epic}!"));
        Ok(())
    });
    app
}

async fn serve(app: App, transport: (MemoryTransport, MemoryHandle)) -> (String, MemoryHandle) {
    let (transport, handle) = transport;
    app.build().handle(transport, None).await.unwrap();
    (handle.output_string(), handle)
}

async fn exchange<I, C>(app: App, chunks: I) -> String
where
    I: IntoIterator<Item = C>,
    C: Into<Vec<u8>>,
{
    serve(app, MemoryTransport::new(chunks)).await.0
}

fn body(response: &str) -> &str {
    response.split_once("\r\n\r\n").map_or("", |(_, b)| b)
}

#[tokio::test]
async fn test_root_route() {
    let (out, handle) = serve(
        demo_app(),
        MemoryTransport::new([&b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n"[..]]),
    )
    .await;

    assert_eq!(
        out,
        "HTTP/1.1 200 OK\r\n\
         Connection: keep-alive\r\n\
         Content-Type: text/plain\r\n\
         Content-Length: 7\r\n\
         \r\n\
         Eureka!"
    );
    assert!(handle.is_closed());
}

#[tokio::test]
async fn test_path_parameter() {
    let out = exchange(demo_app(), [GET_HOME]).await;

    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body(&out), "friday!");
}

#[tokio::test]
async fn test_unmatched_request_gets_404() {
    let out = exchange(demo_app(), [b"GET /nowhere HTTP/1.1\r\n\r\n"]).await;

    assert_eq!(
        out,
        "HTTP/1.1 404 Not Found\r\n\
         Connection: keep-alive\r\n\
         Content-Type: text/plain\r\n\
         Content-Length: 15\r\n\
         \r\n\
         Page Not Found!"
    );
}

#[tokio::test]
async fn test_split_reads_match_single_read() {
    let whole = serve(demo_app(), MemoryTransport::new([GET_HOME])).await.0;

    for size in [1, 3, 10, 17] {
        let split = serve(demo_app(), MemoryTransport::chunked(GET_HOME, size)).await.0;
        assert_eq!(split, whole, "read size {size}");
    }
}

#[tokio::test]
async fn test_three_ten_byte_reads() {
    let request = b"GET / HTTP/1.1\r\nHost: b\r\n\r\n";
    let out = serve(demo_app(), MemoryTransport::chunked(request, 10)).await.0;

    assert_eq!(body(&out), "Eureka!");
}

#[tokio::test]
async fn test_small_chunk_size_config() {
    let config = Config {
        chunk_size: 4,
        ..Config::default()
    };
    let mut app = App::with_config(config);
    app.get("/home/:epic", |req, res| {
        res.send(req.params.get("epic").unwrap_or_default().to_string());
        Ok(())
    });

    let out = exchange(app, [GET_HOME]).await;
    assert_eq!(body(&out), "friday");
}

#[tokio::test]
async fn test_leading_blank_lines_are_skipped() {
    let out = exchange(demo_app(), [&b"\r\n"[..], b"\r\nGET / HTTP/1.1\r\n\r\n"]).await;
    assert_eq!(body(&out), "Eureka!");
}

#[tokio::test]
async fn test_bare_lf_request() {
    let out = exchange(demo_app(), [b"GET /home/lf HTTP/1.1\nHost: a\n\n"]).await;
    assert_eq!(body(&out), "lf!");
}

#[tokio::test]
async fn test_malformed_request_line_gets_400() {
    let out = exchange(demo_app(), [b"GET /\r\n\r\n"]).await;

    assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert_eq!(body(&out), "Bad Request");
}

#[tokio::test]
async fn test_unknown_method_reaches_use_middleware() {
    let mut app = App::new();
    app.get("/", |_req, res| {
        res.send("get");
        Ok(())
    });
    app.use_all(|req, res, _next| {
        res.send(format!("mw {}", req.method));
        Ok(())
    });

    let out = exchange(app, [b"TRACE / HTTP/1.1\r\n\r\n"]).await;

    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body(&out), "mw TRACE");
}

#[tokio::test]
async fn test_unknown_method_without_route_gets_404() {
    let out = exchange(demo_app(), [b"BREW /pot HTTP/1.1\r\n\r\n"]).await;
    assert_eq!(body(&out), "Page Not Found!");
}

#[tokio::test]
async fn test_oversized_head_gets_431() {
    let config = Config {
        max_header_bytes: 64,
        ..Config::default()
    };
    let mut request = b"GET / HTTP/1.1\r\nX-Filler: ".to_vec();
    request.extend(std::iter::repeat_n(b'a', 200));

    let out = exchange(App::with_config(config), [&request[..]]).await;
    assert!(out.starts_with("HTTP/1.1 431 Request Header Fields Too Large\r\n"));
}

#[tokio::test]
async fn test_truncated_head_gets_400() {
    let out = exchange(demo_app(), [b"GET / HTTP/1.1\r\nHost: a\r\n"]).await;
    assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
}

#[tokio::test]
async fn test_read_error_before_head_completes() {
    let (transport, handle) = MemoryTransport::new([&b"GET / HTTP/1.1\r\n"[..]]);
    let transport = transport.fail_after_script();

    let (out, handle) = serve(demo_app(), (transport, handle)).await;

    assert!(out.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(handle.is_closed());
}

#[tokio::test]
async fn test_silent_peer_gets_nothing() {
    let (out, handle) = serve(demo_app(), MemoryTransport::new(Vec::<Vec<u8>>::new())).await;

    assert!(out.is_empty());
    assert!(handle.is_closed());
}

#[tokio::test]
async fn test_handler_error_gets_500() {
    let mut app = App::new();
    app.get("/", |_req, _res| Err(anyhow::anyhow!("cache offline")));

    let out = exchange(app, [b"GET / HTTP/1.1\r\n\r\n"]).await;

    assert_eq!(
        out,
        "HTTP/1.1 500 Internal Server Error\r\n\
         Connection: keep-alive\r\n\
         Content-Type: text/plain\r\n\
         Content-Length: 21\r\n\
         \r\n\
         Internal Server Error"
    );
}

#[tokio::test]
async fn test_handler_panic_gets_500() {
    let mut app = App::new();
    app.get("/", |_req, _res| panic!("handler bug"));

    let out = exchange(app, [b"GET / HTTP/1.1\r\n\r\n"]).await;
    assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
}

#[tokio::test]
async fn test_middleware_runs_before_handler() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut app = App::new();

    let l = log.clone();
    app.use_all(move |req, res, next| {
        l.lock().unwrap().push(format!("log {}", req.path));
        res.header("X-Powered-By", "waypoint");
        next.proceed();
        Ok(())
    });
    let l = log.clone();
    app.get("/", move |_req, res| {
        l.lock().unwrap().push("handler".to_string());
        res.send("ok");
        Ok(())
    });

    let out = exchange(app, [b"GET / HTTP/1.1\r\n\r\n"]).await;

    assert_eq!(*log.lock().unwrap(), vec!["log /", "handler"]);
    assert!(out.contains("\r\nx-powered-by: waypoint\r\n"));
    assert_eq!(body(&out), "ok");
}

#[tokio::test]
async fn test_halted_chain_gets_404() {
    let reached = Arc::new(AtomicBool::new(false));
    let mut app = App::new();

    app.use_all(|_req, _res, _next| Ok(()));
    let r = reached.clone();
    app.get("/", move |_req, res| {
        r.store(true, Ordering::SeqCst);
        res.send("no");
        Ok(())
    });

    let out = exchange(app, [b"GET / HTTP/1.1\r\n\r\n"]).await;

    assert!(!reached.load(Ordering::SeqCst));
    assert_eq!(body(&out), "Page Not Found!");
}

#[tokio::test]
async fn test_method_mismatch_moves_on() {
    let mut app = App::new();
    app.post("/", |_req, res| {
        res.send("post");
        Ok(())
    });
    app.get("/", |_req, res| {
        res.send("get");
        Ok(())
    });

    let out = exchange(app, [b"GET / HTTP/1.1\r\n\r\n"]).await;
    assert_eq!(body(&out), "get");
}

#[tokio::test]
async fn test_use_prefix_applies_to_any_method() {
    let mut app = App::new();
    app.use_at("/api", |req, res, _next| {
        res.send(format!("api {}", req.method));
        Ok(())
    });

    let out = exchange(app, [b"DELETE /api/items/3 HTTP/1.1\r\n\r\n"]).await;
    assert_eq!(body(&out), "api DELETE");
}

#[tokio::test]
async fn test_query_string_is_not_part_of_route() {
    let mut app = App::new();
    app.get("/search", |req, res| {
        let q = req.query("q").unwrap_or_default();
        res.send(q);
        Ok(())
    });

    let out = exchange(app, [b"GET /search?q=rust%20lang HTTP/1.1\r\n\r\n"]).await;
    assert_eq!(body(&out), "rust lang");
}

#[tokio::test]
async fn test_headers_lookup_ignores_case() {
    let mut app = App::new();
    app.get("/", |req, res| {
        let kind = req.header("content-type").unwrap_or("none").to_string();
        res.send(kind);
        Ok(())
    });

    let out = exchange(app, [b"GET / HTTP/1.1\r\nCONTENT-TYPE: text/csv\r\n\r\n"]).await;
    assert_eq!(body(&out), "text/csv");
}

fn echo_app() -> App {
    let mut app = App::new();
    app.post("/echo", |req, res| {
        let text = req.body_text().into_owned();
        res.send(text);
        Ok(())
    });
    app
}

#[tokio::test]
async fn test_post_body_across_reads() {
    let out = exchange(
        echo_app(),
        [
            &b"POST /echo HTTP/1.1\r\nContent-Length: 11\r\n\r\n"[..],
            b"hello",
            b" world",
        ],
    )
    .await;

    assert_eq!(body(&out), "hello world");
}

#[tokio::test]
async fn test_post_body_in_same_read_as_head() {
    let out = exchange(
        echo_app(),
        [b"POST /echo HTTP/1.1\r\nContent-Length: 4\r\n\r\nping"],
    )
    .await;

    assert_eq!(body(&out), "ping");
}

#[tokio::test]
async fn test_post_runs_with_partial_body_when_peer_closes() {
    let out = exchange(
        echo_app(),
        [&b"POST /echo HTTP/1.1\r\nContent-Length: 50\r\n\r\n"[..], b"short"],
    )
    .await;

    assert_eq!(body(&out), "short");
}

#[tokio::test]
async fn test_request_events() {
    let data = Arc::new(Mutex::new(Vec::new()));
    let end = Arc::new(Mutex::new(Vec::new()));
    let mut app = App::new();

    let (d, e) = (data.clone(), end.clone());
    app.use_all(move |req, _res, next| {
        let d = d.clone();
        req.on("data", move |chunk| d.lock().unwrap().push(chunk.to_string_lossy()));
        let e = e.clone();
        req.once("end", move |all| e.lock().unwrap().push(all.to_string_lossy()));
        next.proceed();
        Ok(())
    });
    app.post("/echo", |req, res| {
        let text = req.body_text().into_owned();
        res.send(text);
        Ok(())
    });

    let head = "POST /echo HTTP/1.1\r\nContent-Length: 5\r\n\r\n";
    let out = exchange(app, [head.as_bytes(), b"hel", b"lo"]).await;

    assert_eq!(body(&out), "hello");
    assert_eq!(*data.lock().unwrap(), vec![head, "hel", "lo"]);
    assert_eq!(*end.lock().unwrap(), vec![format!("{head}hello")]);
}

#[tokio::test]
async fn test_panicking_subscriber_gets_500() {
    let mut app = App::new();
    app.use_all(|req, _res, next| {
        req.on("data", |_| panic!("subscriber bug"));
        next.proceed();
        Ok(())
    });
    app.get("/", |_req, res| {
        res.send("never");
        Ok(())
    });

    let out = exchange(app, [b"GET / HTTP/1.1\r\n\r\n"]).await;
    assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
}

#[tokio::test]
async fn test_streamed_response_body() {
    let mut app = App::new();
    app.get("/stream", |_req, res| {
        res.header("Content-Length", 6);
        res.send("abc");
        res.send("def");
        res.send("ignored");
        Ok(())
    });

    let out = exchange(app, [b"GET /stream HTTP/1.1\r\n\r\n"]).await;

    assert!(out.contains("Content-Length: 6\r\n"));
    assert_eq!(body(&out), "abcdef");
}

#[tokio::test]
async fn test_partial_body_is_not_followed_by_fallback() {
    let mut app = App::new();
    app.get("/partial", |_req, res| {
        res.header("Content-Length", 10);
        res.send("abc");
        Ok(())
    });

    let (out, handle) = serve(
        app,
        MemoryTransport::new([&b"GET /partial HTTP/1.1\r\n\r\n"[..]]),
    )
    .await;

    assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(out.contains("Content-Length: 10\r\n"));
    assert_eq!(body(&out), "abc");
    assert!(!out.contains("Page Not Found!"));
    assert!(handle.is_closed());
}

#[tokio::test]
async fn test_overlong_streamed_body_is_truncated() {
    let mut app = App::new();
    app.get("/", |_req, res| {
        res.header("Content-Length", 6);
        res.send("abc");
        res.send("defghij");
        Ok(())
    });

    let out = exchange(app, [b"GET / HTTP/1.1\r\n\r\n"]).await;
    assert_eq!(body(&out), "abcdef");
}
