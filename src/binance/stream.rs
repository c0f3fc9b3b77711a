// =============================================================================
// Binance WebSocket subscriptions
// =============================================================================
//
// One raw stream per connection: `<ws_url>/<symbol>@<channel>`.  Each text
// frame is a single JSON event.  Control frames are handled by tungstenite;
// a Close frame ends the stream.
// =============================================================================

use futures_util::{future, StreamExt};
use serde::de::DeserializeOwned;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info};

use crate::error::FeedError;
use crate::feed::EventStream;

pub fn agg_trade_channel() -> String {
    "aggTrade".to_string()
}

pub fn kline_channel(interval: &str) -> String {
    format!("kline_{interval}")
}

/// Diff-depth updates; zero quantities mark removed levels.
pub fn depth_channel() -> String {
    "depth".to_string()
}

pub fn stream_url(ws_url: &str, symbol: &str, channel: &str) -> String {
    format!("{}/{}@{}", ws_url, symbol.to_lowercase(), channel)
}

/// A rejected handshake or a malformed URL will not fix itself by retrying;
/// everything else (DNS, TCP, TLS, protocol) is transient.
fn classify_connect_error(err: WsError) -> FeedError {
    match err {
        WsError::Http(resp) => {
            FeedError::Subscribe(format!("handshake rejected with {}", resp.status()))
        }
        WsError::Url(e) => FeedError::Subscribe(format!("invalid stream URL: {e}")),
        other => FeedError::Transport(format!("websocket connect failed: {other}")),
    }
}

fn decode_frame<T: DeserializeOwned>(
    msg: Result<Message, WsError>,
) -> Option<Option<Result<T, FeedError>>> {
    match msg {
        Ok(Message::Text(text)) => Some(Some(
            serde_json::from_str(&text).map_err(|e| FeedError::Decode(format!("{e}: {text}"))),
        )),
        Ok(Message::Close(frame)) => {
            debug!(?frame, "websocket closed by peer");
            Some(None)
        }
        Ok(_) => None,
        Err(e) => Some(Some(Err(FeedError::Transport(format!("websocket read error: {e}"))))),
    }
}

/// Connect to `url` and expose its text frames as decoded events.
pub async fn subscribe<T>(url: &str) -> Result<EventStream<T>, FeedError>
where
    T: DeserializeOwned + Send + 'static,
{
    info!(url = %url, "connecting to WebSocket");
    let (ws_stream, _response) = connect_async(url).await.map_err(classify_connect_error)?;
    debug!(url = %url, "WebSocket connected");

    // Outer Option: frame produced an item.  Inner Option: stream still open.
    let events = ws_stream
        .filter_map(|msg| future::ready(decode_frame::<T>(msg)))
        .take_while(|item| future::ready(item.is_some()))
        .filter_map(future::ready)
        .boxed();

    Ok(events)
}
