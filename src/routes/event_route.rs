use std::convert::Infallible;

use actix_web::{get, web, HttpResponse};
use futures::{stream, StreamExt};
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};

use crate::services::{Broadcaster, Event, Orchestrator};

/// Server-Sent Events feed of `status_update` and `new_data`. A new observer
/// gets the current status first.
#[get("/events")]
async fn events(
    broadcaster: web::Data<Broadcaster>,
    orchestrator: web::Data<Orchestrator>,
) -> HttpResponse {
    let receiver = broadcaster.subscribe();
    log::info!("Event observer connected, {} listening", broadcaster.observers());
    let greeting = Event::StatusUpdate(orchestrator.snapshot().await);

    let live = BroadcastStream::new(receiver).filter_map(|event| async move {
        match event {
            Ok(event) => Some(event),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                log::warn!("Event observer lagged, skipped {} events", skipped);
                None
            }
        }
    });

    let frames = stream::once(async move { greeting })
        .chain(live)
        .filter_map(|event| async move { event.to_sse_frame() })
        .map(|frame| Ok::<_, Infallible>(web::Bytes::from(frame)));

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(frames)
}
