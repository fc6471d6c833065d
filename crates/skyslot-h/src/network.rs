use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use skyslot_engine::navigator::NetworkEvent;
use skyslot_engine::renderer::RenderError;

/// Request start/finish events for `page`, merged into one stream.
///
/// Subscribe before navigating, otherwise the first requests are missed.
pub async fn network_events(page: &Page) -> Result<BoxStream<'static, NetworkEvent>, RenderError> {
    let subscribe_error = |e: chromiumoxide::error::CdpError| {
        RenderError::Navigation(format!("Failed to subscribe to network events: {}", e))
    };

    let started = page
        .event_listener::<EventRequestWillBeSent>()
        .await
        .map_err(subscribe_error)?
        .map(|e| NetworkEvent::Started(e.request_id.inner().clone()));
    let finished = page
        .event_listener::<EventLoadingFinished>()
        .await
        .map_err(subscribe_error)?
        .map(|e| NetworkEvent::Finished(e.request_id.inner().clone()));
    let failed = page
        .event_listener::<EventLoadingFailed>()
        .await
        .map_err(subscribe_error)?
        .map(|e| NetworkEvent::Finished(e.request_id.inner().clone()));

    Ok(stream::select_all([started.boxed(), finished.boxed(), failed.boxed()]).boxed())
}
