use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use poem::http::StatusCode;
use poem::web::websocket::{Message, WebSocket};
use poem::web::{Data, Query};
use poem::{IntoResponse, handler};
use serde::Deserialize;

use business::application::product::catalog_view::CatalogView;
use business::application::product::debounce::Debouncer;
use business::application::product::form::{FormStatus, ProductFormController};
use business::application::product::synchronizer::ProductSynchronizer;
use business::domain::product::filter::ProductFilter;

use crate::api::product::dto::{FormStatusFrame, LiveCatalogFrame, ProductResponse};
use crate::api::security::FirebaseTokenVerifier;

/// Everything a live catalog session needs, shared through request data.
pub struct LiveCatalog {
    pub catalog: Arc<ProductSynchronizer>,
    pub form: Arc<ProductFormController>,
    pub filter: ProductFilter,
    pub debounce_window: Duration,
}

impl LiveCatalog {
    fn view(&self) -> (Debouncer<String>, CatalogView) {
        let (debouncer, queries) = Debouncer::new(self.debounce_window);
        let view = CatalogView::new(self.catalog.watch(), queries, self.filter.clone());
        (debouncer, view)
    }
}

#[derive(Debug, Deserialize)]
pub struct LiveParams {
    token: String,
}

fn encode<T: serde::Serialize>(frame: &T) -> Option<String> {
    match serde_json::to_string(frame) {
        Ok(text) => Some(text),
        Err(err) => {
            tracing::error!("Could not encode live catalog frame: {err}");
            None
        }
    }
}

fn frame(view: &mut CatalogView) -> Option<String> {
    encode(&LiveCatalogFrame {
        query: view.query().to_string(),
        products: view.visible().into_iter().map(ProductResponse::from).collect(),
    })
}

fn status_frame(status: &FormStatus) -> Option<String> {
    encode(&FormStatusFrame::from(status))
}

/// Live catalog feed.
///
/// Text frames from the client are search keystrokes; they are debounced
/// before the filter is applied. The server pushes the filtered grid on
/// connect and after every snapshot or settled query, and the progress of
/// the signed-in user's form submissions as it changes.
#[handler]
pub async fn live_catalog(
    ws: WebSocket,
    Query(params): Query<LiveParams>,
    Data(live): Data<&Arc<LiveCatalog>>,
    Data(verifier): Data<&Arc<FirebaseTokenVerifier>>,
) -> poem::Result<impl IntoResponse> {
    let uid = verifier.verify(&params.token).await.map_err(|err| {
        tracing::warn!("Live catalog auth failed: {err}");
        poem::Error::from_status(StatusCode::UNAUTHORIZED)
    })?;
    let live = live.clone();

    Ok(ws.on_upgrade(move |socket| async move {
        tracing::info!("Live catalog session opened for {uid}");
        let (mut sink, mut stream) = socket.split();
        let (debouncer, mut view) = live.view();
        let mut form_status = live.form.watch_status(&uid);

        if let Some(text) = frame(&mut view)
            && sink.send(Message::Text(text)).await.is_err()
        {
            return;
        }

        loop {
            tokio::select! {
                message = stream.next() => match message {
                    Some(Ok(Message::Text(query))) => debouncer.push(query),
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                },
                changed = view.changed() => {
                    if !changed {
                        break;
                    }
                    let Some(text) = frame(&mut view) else { continue };
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                changed = form_status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let status = form_status.borrow_and_update().clone();
                    let Some(text) = status_frame(&status) else { continue };
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
            }
        }

        debouncer.cancel();
        tracing::info!("Live catalog session closed for {uid}");
    }))
}
