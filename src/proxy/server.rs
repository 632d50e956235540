use crate::inference::{InferenceError, InferenceService};
use crate::job::JobParameters;
use crate::proxy::types::{ErrorBody, SubmitRequest};
use log::{error, info};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

struct AppState {
    service: Arc<dyn InferenceService>,
    /// Parameters submitted on behalf of browser callers, who only supply
    /// the image URL.
    params: JobParameters,
}

/// Bind and serve the proxy until the caller drops the future.
pub async fn run_server(
    listen: &str,
    service: Arc<dyn InferenceService>,
    params: JobParameters,
) -> Result<(), String> {
    let addr: SocketAddr = listen.parse::<SocketAddr>().map_err(|e| e.to_string())?;
    let listener = TcpListener::bind(addr).await.map_err(|e| e.to_string())?;
    info!("prediction proxy listening on {}", addr);
    serve(listener, service, params).await
}

/// Serve connections from an already-bound listener.
pub async fn serve(
    listener: TcpListener,
    service: Arc<dyn InferenceService>,
    params: JobParameters,
) -> Result<(), String> {
    let state = Arc::new(AppState { service, params });
    loop {
        let (stream, _) = listener.accept().await.map_err(|e| e.to_string())?;
        let st = state.clone();
        tokio::spawn(async move {
            let _ = handle_connection(stream, st).await;
        });
    }
}

async fn handle_connection(stream: TcpStream, state: Arc<AppState>) -> Result<(), String> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader
        .read_line(&mut request_line)
        .await
        .map_err(|e| e.to_string())?;
    if request_line.is_empty() {
        return Ok(());
    }

    let mut headers = Vec::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await.map_err(|e| e.to_string())?;
        if line == "\r\n" || line.is_empty() {
            break;
        }
        headers.push(line);
    }

    let parts: Vec<&str> = request_line.split_whitespace().collect();
    let method = parts.first().copied().unwrap_or("");
    let path = parts.get(1).copied().unwrap_or("/");

    let mut content_length = 0usize;
    for h in &headers {
        if h.to_lowercase().starts_with("content-length:") {
            if let Some(pos) = h.find(':') {
                content_length = h[pos + 1..].trim().parse::<usize>().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader
            .read_exact(&mut body)
            .await
            .map_err(|e| e.to_string())?;
    }

    let mut stream = reader.into_inner();

    match (method, path) {
        ("POST", "/api/predictions") => {
            let image = serde_json::from_slice::<SubmitRequest>(&body)
                .ok()
                .and_then(|r| r.image)
                .unwrap_or_default();
            if image.is_empty() {
                return write_json(
                    &mut stream,
                    "400 Bad Request",
                    json!(ErrorBody {
                        detail: "image is required".to_string()
                    }),
                )
                .await;
            }

            match state.service.submit(&image, &state.params).await {
                Ok(job) => write_json(&mut stream, "201 Created", json!(job)).await,
                Err(e) => {
                    error!("job submission failed: {}", e);
                    write_json(
                        &mut stream,
                        "500 Internal Server Error",
                        json!(ErrorBody {
                            detail: detail_for(&e)
                        }),
                    )
                    .await
                }
            }
        }
        ("GET", p) if p.starts_with("/api/predictions/") => {
            let id = p.trim_start_matches("/api/predictions/").to_string();
            if id.is_empty() {
                return write_json(
                    &mut stream,
                    "400 Bad Request",
                    json!(ErrorBody {
                        detail: "prediction id is required".to_string()
                    }),
                )
                .await;
            }

            match state.service.get(&id).await {
                Ok(job) => {
                    // A job body carrying an error is relayed as a failure so
                    // callers see the upstream detail instead of a snapshot
                    // they would keep polling.
                    if let Some(detail) = job.error.clone() {
                        return write_json(
                            &mut stream,
                            "500 Internal Server Error",
                            json!(ErrorBody { detail }),
                        )
                        .await;
                    }
                    write_json(&mut stream, "200 OK", json!(job)).await
                }
                Err(e) => {
                    error!("status query for {} failed: {}", id, e);
                    write_json(
                        &mut stream,
                        "500 Internal Server Error",
                        json!(ErrorBody {
                            detail: detail_for(&e)
                        }),
                    )
                    .await
                }
            }
        }
        _ => stream
            .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n")
            .await
            .map_err(|e| e.to_string()),
    }
}

/// Upstream-reported details pass through; anything else stays opaque.
fn detail_for(error: &InferenceError) -> String {
    match error {
        InferenceError::Http { message, .. } if !message.is_empty() => message.clone(),
        _ => "internal server error".to_string(),
    }
}

async fn write_json(
    stream: &mut TcpStream,
    code: &str,
    value: serde_json::Value,
) -> Result<(), String> {
    let payload = value.to_string();
    let resp = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        code,
        payload.len(),
        payload
    );
    stream.write_all(resp.as_bytes()).await.map_err(|e| e.to_string())
}
