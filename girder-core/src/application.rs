// HTTP hosting adapter: hyper server in front of a Dispatcher

use crate::content_negotiation::ResponseFormat;
use crate::dispatcher::{render_error, Dispatcher};
use crate::form::{MultipartParser, UploadLimits};
use crate::logging::{debug, error, info, warn};
use crate::{Error, HttpRequest, HttpResponse};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{body::Incoming as IncomingBody, Request, Response};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, ToSocketAddrs};

/// Serves a [`Dispatcher`] over HTTP/1.1.
///
/// Each connection gets its own task; each request is dispatched on the
/// blocking pool, since handlers are synchronous. Bodies larger than
/// [`UploadLimits::max_request_size`] are answered with 413.
///
/// ```no_run
/// use girder_core::{Application, Dispatcher, RouteTable};
///
/// # async fn run() -> Result<(), girder_core::Error> {
/// let dispatcher = Dispatcher::new(RouteTable::new());
/// Application::new(dispatcher).listen("127.0.0.1:8080").await
/// # }
/// ```
#[derive(Clone)]
pub struct Application {
    dispatcher: Arc<Dispatcher>,
}

impl Application {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::from_shared(Arc::new(dispatcher))
    }

    pub fn from_shared(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Bind and serve until the listener fails.
    pub async fn listen(self, addr: impl ToSocketAddrs) -> Result<(), Error> {
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> Result<(), Error> {
        let local: SocketAddr = listener.local_addr()?;
        info!(address = %local, routes = self.dispatcher.routes().len(), "Server listening");

        loop {
            let (stream, peer) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let dispatcher = self.dispatcher.clone();

            tokio::spawn(async move {
                let service = service_fn(move |req: Request<IncomingBody>| {
                    let dispatcher = dispatcher.clone();
                    async move { handle_request(req, dispatcher).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    debug!(peer = %peer, error = %err, "Connection closed with error");
                }
            });
        }
    }
}

async fn handle_request(
    req: Request<IncomingBody>,
    dispatcher: Arc<Dispatcher>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let limits = dispatcher.config().uploads.clone();

    let request = match Limited::new(body, limits.max_request_size).collect().await {
        Ok(collected) => build_request(&parts, collected.to_bytes(), &limits).await,
        Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => Err(Error::PayloadTooLarge(
            format!("request body exceeds {} bytes", limits.max_request_size),
        )),
        Err(err) => Err(Error::BadRequest(format!("Failed to read request body: {}", err))),
    };

    let request = match request {
        Ok(request) => request,
        Err(err) => {
            warn!(path = %parts.uri.path(), error = %err, "Rejected request body");
            let head = request_head(&parts);
            return Ok(into_hyper_response(render_error(
                &err,
                ResponseFormat::negotiate(&head),
            )));
        }
    };

    let response = match tokio::task::spawn_blocking(move || dispatcher.dispatch(request)).await {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "Dispatch task failed");
            render_error(&Error::Internal(err.to_string()), ResponseFormat::Html)
        }
    };

    Ok(into_hyper_response(response))
}

fn request_target(uri: &http::Uri) -> &str {
    uri.path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path())
}

/// Method, target and headers, without the body.
fn request_head(parts: &http::request::Parts) -> HttpRequest {
    let mut request = HttpRequest::new(parts.method.as_str(), request_target(&parts.uri));
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            request.headers.insert(name.to_string(), value.to_string());
        }
    }
    request
}

/// Convert hyper request parts and a collected body into an [`HttpRequest`].
///
/// Urlencoded bodies are appended to the parameter space after the query
/// values. Multipart bodies contribute their text fields the same way and
/// their files as uploads, subject to `limits`.
pub async fn build_request(
    parts: &http::request::Parts,
    body: Bytes,
    limits: &UploadLimits,
) -> Result<HttpRequest, Error> {
    let mut request = request_head(parts);
    request.body = body.to_vec();

    let multipart = request
        .content_type()
        .filter(|ct| MultipartParser::is_multipart(ct))
        .map(MultipartParser::from_content_type)
        .transpose()?;

    match multipart {
        Some(parser) => {
            let form = parser.with_limits(limits.clone()).parse(body).await?;
            debug!(fields = form.fields.len(), files = form.files.len(), "Parsed multipart body");
            for (key, values) in form.fields.iter() {
                for value in values {
                    request.params.append(key, value.clone());
                }
            }
            request.uploads.extend(form.files);
        }
        None => request.merge_form_body(),
    }

    Ok(request)
}

/// Convert an [`HttpResponse`] into a hyper response.
pub fn into_hyper_response(response: HttpResponse) -> Response<Full<Bytes>> {
    let mut builder = Response::builder().status(response.status);
    for (key, value) in &response.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }

    match builder.body(Full::new(Bytes::from(response.body))) {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "Invalid response head");
            let mut fallback = Response::new(Full::new(Bytes::from_static(b"Internal Server Error")));
            *fallback.status_mut() = http::StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::DispatcherConfig;
    use crate::handler::{HandlerResult, ParamSpec};
    use crate::routing::{RouteBuilder, RouteTable};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn parts(method: &str, uri: &str, content_type: Option<&str>) -> http::request::Parts {
        let mut builder = http::Request::builder().method(method).uri(uri);
        if let Some(ct) = content_type {
            builder = builder.header("content-type", ct);
        }
        builder.body(()).unwrap().into_parts().0
    }

    const UPLOAD: &[u8] = b"--XyZ\r\n\
Content-Disposition: form-data; name=\"title\"\r\n\r\n\
Report\r\n\
--XyZ\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"r.txt\"\r\n\
Content-Type: text/plain\r\n\r\n\
hello\r\n\
--XyZ--\r\n";

    #[tokio::test]
    async fn test_build_request_merges_form_body() {
        let parts = parts(
            "POST",
            "/dept?name=query",
            Some("application/x-www-form-urlencoded"),
        );
        let request = build_request(
            &parts,
            Bytes::from_static(b"name=form&size=3"),
            &UploadLimits::default(),
        )
        .await
        .unwrap();

        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/dept");
        assert_eq!(request.params.get("name").unwrap(), ["query", "form"]);
        assert_eq!(request.query("size"), Some("3"));
    }

    #[tokio::test]
    async fn test_build_request_multipart() {
        let parts = parts("POST", "/upload", Some("multipart/form-data; boundary=XyZ"));
        let request = build_request(&parts, Bytes::from_static(UPLOAD), &UploadLimits::default())
            .await
            .unwrap();

        assert_eq!(request.query("title"), Some("Report"));
        let upload = request.upload("file").unwrap();
        assert_eq!(upload.file_name, "r.txt");
        assert_eq!(upload.content_as_string(), "hello");
    }

    #[tokio::test]
    async fn test_build_request_rejects_oversized_part() {
        let parts = parts("POST", "/upload", Some("multipart/form-data; boundary=XyZ"));
        let limits = UploadLimits {
            max_file_size: 3,
            ..UploadLimits::default()
        };
        let err = build_request(&parts, Bytes::from_static(UPLOAD), &limits)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::PayloadTooLarge(_)), "{:?}", err);
        let response = render_error(&err, ResponseFormat::Html);
        assert_eq!(response.status, 413);
    }

    #[tokio::test]
    async fn test_build_request_rejects_boundaryless_multipart() {
        let parts = parts("POST", "/upload", Some("multipart/form-data"));
        let result = build_request(&parts, Bytes::new(), &UploadLimits::default()).await;
        assert!(matches!(result, Err(Error::BadRequest(_))));
    }

    #[test]
    fn test_into_hyper_response() {
        let response = into_hyper_response(
            HttpResponse::ok()
                .with_header("Content-Type", "text/plain")
                .with_body(b"hi".to_vec()),
        );
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers()["content-type"], "text/plain");
    }

    #[tokio::test]
    async fn test_serves_over_tcp() {
        let mut table = RouteTable::new();
        table
            .add(
                RouteBuilder::get("/hello/{name}", |_ctx, args| {
                    Ok(HandlerResult::text(format!(
                        "hello {}",
                        args.value::<String>("name").unwrap_or_default()
                    )))
                })
                .param(ParamSpec::of::<String>("name")),
            )
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(Application::new(Dispatcher::new(table)).serve(listener));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /hello/ada HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();

        assert!(raw.starts_with("HTTP/1.1 200 OK"));
        assert!(raw.ends_with("hello ada"));
    }

    #[tokio::test]
    async fn test_oversized_body_is_rejected_over_tcp() {
        let mut table = RouteTable::new();
        table
            .add(RouteBuilder::post("/echo", |_ctx, _args| {
                Ok(HandlerResult::text("accepted"))
            }))
            .unwrap();
        let mut config = DispatcherConfig::default();
        config.uploads.max_request_size = 16;
        let dispatcher = Dispatcher::new(table).with_config(config);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(Application::new(dispatcher).serve(listener));

        let send = |body: &'static str| async move {
            let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
            let raw_request = format!(
                "POST /echo HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\
                 Content-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            stream.write_all(raw_request.as_bytes()).await.unwrap();
            let mut raw = String::new();
            stream.read_to_string(&mut raw).await.unwrap();
            raw
        };

        let raw = send("a=1").await;
        assert!(raw.starts_with("HTTP/1.1 200 OK"), "{}", raw);

        let raw = send("name=aaaaaaaaaaaaaaaaaaaaaaaaaaaa").await;
        assert!(raw.starts_with("HTTP/1.1 413"), "{}", raw);
    }
}
