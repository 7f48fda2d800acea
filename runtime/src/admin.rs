//! `/ready` HTTP endpoint (spec §6 "External interfaces: admin/health").
//! Reports readiness from a `watch::Receiver<bool>` the runtime flips
//! once the index has completed its initial sync.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    body::Incoming,
    server::conn::http1,
    service::service_fn,
    Method, Request, Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use std::{convert::Infallible, net::SocketAddr};
use tokio::{net::TcpListener, sync::watch};
use tracing::{info, instrument, warn};

#[instrument(skip(ready))]
pub async fn serve(addr: SocketAddr, ready: watch::Receiver<bool>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "admin server listening");

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let ready = ready.clone();

        tokio::spawn(async move {
            let service = service_fn(move |req| handle(req, ready.clone()));
            if let Err(error) = http1::Builder::new().serve_connection(io, service).await {
                warn!(%error, "admin connection error");
            }
        });
    }
}

async fn handle(
    req: Request<Incoming>,
    ready: watch::Receiver<bool>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let response = match (req.method(), req.uri().path()) {
        (&Method::GET | &Method::HEAD, "/ready") => ready_response(&ready),
        _ => Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::new()))
            .unwrap(),
    };
    Ok(response)
}

fn ready_response(ready: &watch::Receiver<bool>) -> Response<Full<Bytes>> {
    let (status, body) = if *ready.borrow() {
        (StatusCode::OK, "ready\n")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready\n")
    };
    Response::builder()
        .status(status)
        .header(hyper::header::CONTENT_TYPE, "text/plain")
        .body(Full::new(Bytes::from_static(body.as_bytes())))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn ready_reports_ok_once_flag_flips() {
        let (tx, rx) = watch::channel(false);
        let resp = ready_response(&rx);
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        tx.send(true).unwrap();
        let resp = ready_response(&rx);
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ready\n");
    }
}
