//! Integration tests for the reqwest transport.
//!
//! Each test spins up a one-shot raw HTTP responder on a random port and
//! points a real `ReqwestTransport` at it, so the bytes on the wire are
//! what we assert on.

#[cfg(feature = "http")]
mod http {
    use postzen_transport::{
        ApiRequest, HttpTransport, ReqwestTransport, TransportError,
        AUTHORIZATION,
    };
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accepts one connection, captures the raw request, and answers with
    /// the given status line and body. Returns the base URL and a handle
    /// resolving to the captured request text.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener =
            TcpListener::bind("127.0.0.1:0").await.expect("should bind");
        let addr = listener.local_addr().expect("should have local addr");

        let handle = tokio::spawn(async move {
            let (mut stream, _) =
                listener.accept().await.expect("should accept");
            let raw = read_request(&mut stream).await;

            let response = format!(
                "HTTP/1.1 {status_line}\r\n\
                 Content-Type: application/json\r\n\
                 Content-Length: {}\r\n\
                 Connection: close\r\n\r\n{body}",
                body.len()
            );
            stream
                .write_all(response.as_bytes())
                .await
                .expect("should write response");
            raw
        });

        (format!("http://{addr}/api"), handle)
    }

    /// Reads the request head plus a `content-length` body.
    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = stream.read(&mut buf).await.expect("should read");
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);

            let text = String::from_utf8_lossy(&raw).to_string();
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.trim()
                            .eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if raw.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&raw).to_string()
    }

    #[tokio::test]
    async fn test_get_sends_path_and_bearer_header() {
        let (base, server) = serve_once("200 OK", r#"{"ok":true}"#).await;
        let transport = ReqwestTransport::new(base);

        let request = ApiRequest::get("/posts?page=0&size=10")
            .with_header(AUTHORIZATION, "Bearer abc123");
        let response = transport.send(&request).await.expect("should send");

        assert_eq!(response.status, 200);
        assert_eq!(response.text(), r#"{"ok":true}"#);

        let raw = server.await.expect("server task should complete");
        assert!(raw.starts_with("GET /api/posts?page=0&size=10 HTTP/1.1"));
        assert!(
            raw.to_ascii_lowercase()
                .contains("authorization: bearer abc123"),
            "bearer header missing from: {raw}"
        );
    }

    #[tokio::test]
    async fn test_post_body_defaults_to_json_content_type() {
        let (base, server) = serve_once("200 OK", "{}").await;
        let transport = ReqwestTransport::new(base);

        let request = ApiRequest::post("/auth/login")
            .with_body(br#"{"email":"a@b.c","password":"pw"}"#.to_vec());
        transport.send(&request).await.expect("should send");

        let raw = server.await.expect("server task should complete");
        assert!(raw.starts_with("POST /api/auth/login HTTP/1.1"));
        assert!(
            raw.to_ascii_lowercase()
                .contains("content-type: application/json")
        );
        assert!(raw.ends_with(r#"{"email":"a@b.c","password":"pw"}"#));
    }

    #[tokio::test]
    async fn test_unauthorized_status_is_not_an_error() {
        let (base, _server) = serve_once(
            "401 Unauthorized",
            r#"{"status":401,"message":"expired"}"#,
        )
        .await;
        let transport = ReqwestTransport::new(base);

        let response = transport
            .send(&ApiRequest::get("/profile"))
            .await
            .expect("a 401 is still a response");

        assert!(response.is_unauthorized());
        assert_eq!(response.header("content-type"), Some("application/json"));
    }

    #[tokio::test]
    async fn test_connection_refused_is_request_error() {
        // Bind then drop to get a port nobody listens on.
        let listener =
            TcpListener::bind("127.0.0.1:0").await.expect("should bind");
        let addr = listener.local_addr().expect("should have local addr");
        drop(listener);

        let transport = ReqwestTransport::new(format!("http://{addr}/api"));
        let result = transport.send(&ApiRequest::get("/posts")).await;

        assert!(matches!(result, Err(TransportError::Request(_))));
    }
}
