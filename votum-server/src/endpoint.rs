//! The submission endpoint: one POST records one vote

use std::sync::Arc;

use serde_json::json;
use tokio::io::BufStream;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, warn};

use votum_core::ingest::Ingest;
use votum_core::kms::KeyService;
use votum_core::store::DocumentStore;
use votum_core::submission::RawSubmission;

use crate::http::{self, HttpError};

/// Accept loop: one task per connection, no state retained between
/// requests
pub async fn serve<S, K>(listener: TcpListener, ingest: Arc<Ingest<S, K>>) -> std::io::Result<()>
where
    S: DocumentStore + Send + Sync + 'static,
    K: KeyService + Send + Sync + 'static,
{
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "connection accepted");

        let ingest = ingest.clone();

        tokio::spawn(async move {
            if let Err(reason) = handle_connection(stream, ingest).await {
                warn!(%reason, "connection dropped");
            }
        });
    }
}

pub async fn handle_connection<S, K>(
    stream: TcpStream,
    ingest: Arc<Ingest<S, K>>,
) -> Result<(), HttpError>
where
    S: DocumentStore + Sync,
    K: KeyService + Sync,
{
    let mut stream = BufStream::new(stream);

    let request = match http::read_request(&mut stream).await {
        Ok(request) => request,
        Err(HttpError::Io(inner)) => return Err(HttpError::Io(inner)),
        Err(reason) => {
            let body = error_body(&reason.to_string());
            return http::write_response(&mut stream, 400, Some(&body)).await;
        }
    };

    let (status, body) = respond(&request, ingest.as_ref()).await;

    http::write_response(&mut stream, status, body.as_deref()).await
}

async fn respond<S, K>(request: &http::Request, ingest: &Ingest<S, K>) -> (u16, Option<String>)
where
    S: DocumentStore + Sync,
    K: KeyService + Sync,
{
    match request.method.as_str() {
        "OPTIONS" => (204, None),
        "POST" => submit(&request.body, ingest).await,
        _ => (405, Some(error_body("Method not allowed. Use POST."))),
    }
}

async fn submit<S, K>(body: &[u8], ingest: &Ingest<S, K>) -> (u16, Option<String>)
where
    S: DocumentStore + Sync,
    K: KeyService + Sync,
{
    let raw: RawSubmission = match serde_json::from_slice(body) {
        Ok(raw) => raw,
        Err(_) => return (400, Some(error_body("request body is not valid JSON"))),
    };

    match ingest.submit(raw).await {
        Ok(receipt) => {
            debug!(booth = %receipt.booth_id, "vote recorded");
            (200, Some(success_body("Vote recorded successfully")))
        }
        Err(reason) if reason.is_rejection() => (400, Some(error_body(&reason.to_string()))),
        Err(reason) => {
            error!(?reason, "submission failed");
            (500, Some(error_body(&reason.to_string())))
        }
    }
}

fn success_body(message: &str) -> String {
    json!({ "status": "success", "message": message }).to_string()
}

fn error_body(message: &str) -> String {
    json!({ "status": "error", "message": message }).to_string()
}
