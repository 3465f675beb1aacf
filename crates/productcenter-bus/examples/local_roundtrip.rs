//! Local round-trip demo: publish a few events through the dispatcher and
//! feed them back through the consume path, all against the in-memory
//! transport. No broker required.
//!
//! ```sh
//! cargo run --example local_roundtrip
//! ```

use std::sync::Arc;

use serde_json::json;

use productcenter_bus::dispatch::{DeliveryMetadata, Dispatcher};
use productcenter_bus::error::HandlerError;
use productcenter_bus::transport::{InMemoryTransport, Transport};
use productcenter_events::{SchemaRegistry, TopicId, ValidatedPayload};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let registry = Arc::new(SchemaRegistry::with_catalog());
    let transport = Arc::new(InMemoryTransport::new());
    let mut dispatcher = Dispatcher::new(registry, Arc::clone(&transport) as Arc<dyn Transport>);

    dispatcher.register_handler(
        TopicId::PhotoUpload,
        |_: TopicId, payload: &ValidatedPayload, _: &DeliveryMetadata| -> Result<(), HandlerError> {
            tracing::info!(photo = ?payload.get("photoId"), "photo uploaded");
            Ok(())
        },
    )?;
    dispatcher.register_handler(
        TopicId::MlResult,
        |_: TopicId, _: &ValidatedPayload, _: &DeliveryMetadata| -> Result<(), HandlerError> {
            Err(HandlerError::new("results store offline"))
        },
    )?;

    // Outbound: validated publishes.
    dispatcher
        .publish_event(
            TopicId::PhotoUpload,
            &json!({
                "photoId": "p1",
                "userId": "u1",
                "projectId": "proj1",
                "fileName": "a.png",
                "fileSize": 1024,
                "mimeType": "image/png",
            }),
            Some("p1".into()),
        )
        .await?;

    // This one fails validation before any transport call.
    let rejected = dispatcher
        .publish_event(
            TopicId::UserCreate,
            &json!({"userId": "u1", "email": "oops", "name": "A", "department": "D"}),
            None,
        )
        .await;
    tracing::info!(error = %rejected.unwrap_err(), "rejected as expected");

    // Inbound: replay what the transport accepted, plus a poison message.
    for record in transport.records() {
        dispatcher.dispatch_bytes(&record.topic, &record.payload, &DeliveryMetadata::default());
    }
    dispatcher.dispatch_bytes(
        "ml.result",
        br#"{"photoId":"p1","modelType":"ocr","results":{"text":"SN-204"}}"#,
        &DeliveryMetadata::default(),
    );

    let metrics = dispatcher.metrics();
    tracing::info!(
        published = metrics.published_total,
        rejected = metrics.publish_rejected_total,
        processed = metrics.processed_total,
        handler_failed = metrics.handler_failed_total,
        "round trip complete"
    );
    Ok(())
}
