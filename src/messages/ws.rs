use std::pin::pin;

use axum::{
    debug_handler,
    extract::{ws::{Message as Frame, WebSocket}, Path, State, WebSocketUpgrade},
    response::{IntoResponse, Response},
};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use sqlx::SqlitePool;
use tokio::sync::broadcast::{self, error::RecvError};

use crate::{
    auth::Viewer,
    chat::{self, ChatHub},
    res,
    store::{chat_rooms::{self, ChatRoom}, users::User},
    AppResult, AppState,
};

use super::create::{post_message, NewMessage, Posted};

#[debug_handler(state = AppState)]
pub(crate) async fn cable(
    Path(room_id): Path<i64>,
    State(db_pool): State<SqlitePool>,
    State(hub): State<ChatHub>,
    Viewer(viewer): Viewer,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let Some(room) = chat_rooms::find(&db_pool, room_id).await? else {
        return Ok(res::sorry("chat room"));
    };

    Ok(ws
        .on_upgrade(move |socket| stream_room(socket, db_pool, hub, room, viewer))
        .into_response())
}

async fn stream_room(socket: WebSocket, db_pool: SqlitePool, hub: ChatHub, room: ChatRoom, author: Option<User>) {
    let stream = chat::stream_name(room.id);
    let rx = hub.subscribe(&stream);
    let (sender, receiver) = socket.split();
    tracing::info!(%stream, user_id = ?author.as_ref().map(|user| user.id), "cable subscribed");

    pump(rx, sender, receiver, db_pool, hub, room, author).await;
    tracing::info!(%stream, "cable closed");
}

/// Forwards the room's stream to the socket until either side goes away.
/// Text frames from a signed-in user are posted as messages.
async fn pump<Tx, Rx, E>(
    mut rx: broadcast::Receiver<String>,
    sender: Tx,
    receiver: Rx,
    db_pool: SqlitePool,
    hub: ChatHub,
    room: ChatRoom,
    author: Option<User>,
) where
    Tx: Sink<Frame> + Send + 'static,
    Rx: Stream<Item = Result<Frame, E>> + Send + 'static,
    E: Send + 'static,
{
    let stream = chat::stream_name(room.id);

    let mut broadcast_task = tokio::spawn(async move {
        let mut sender = pin!(sender);
        loop {
            match rx.recv().await {
                Ok(fragment) => {
                    if sender.send(Frame::Text(fragment.into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "cable subscriber fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let inbound_hub = hub.clone();
    let mut receive_task = tokio::spawn(async move {
        let mut receiver = pin!(receiver);
        while let Some(Ok(frame)) = receiver.next().await {
            let data = match frame {
                Frame::Text(text) => text,
                Frame::Close(_) => break,
                _ => continue,
            };
            let Some(author) = author.as_ref() else {
                continue;
            };
            let Ok(form) = serde_json::from_str::<NewMessage>(data.as_str()) else {
                continue;
            };
            match post_message(&db_pool, &inbound_hub, &room, author, form).await {
                Ok(Posted::Created(_)) => {}
                Ok(Posted::Invalid(errors)) => tracing::debug!(?errors, "ignored invalid cable message"),
                Err(err) => tracing::warn!(error = %err.0, "failed to post cable message"),
            }
        }
    });

    // wait for the aborted side too, so its receiver is gone before pruning
    tokio::select! {
        _ = &mut broadcast_task => {
            receive_task.abort();
            let _ = receive_task.await;
        }
        _ = &mut receive_task => {
            broadcast_task.abort();
            let _ = broadcast_task.await;
        }
    };

    hub.prune(&stream);
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use futures_util::{sink, stream};
    use tokio::sync::mpsc;

    use super::*;
    use crate::store::{chat_rooms, events, messages, testing};

    type Inbound = mpsc::UnboundedSender<Result<Frame, Infallible>>;
    type Outbound = mpsc::UnboundedReceiver<Frame>;

    fn text(value: &str) -> Frame {
        Frame::Text(value.to_owned().into())
    }

    fn sent_text(frame: Frame) -> String {
        match frame {
            Frame::Text(text) => text.as_str().to_owned(),
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    async fn room(db_pool: &SqlitePool) -> ChatRoom {
        let organizer = testing::user(db_pool, "org@example.com").await;
        let activity = testing::activity(db_pool).await;
        let new_event = events::NewEvent {
            activity_id: activity.id,
            location: "Pier 4".to_owned(),
            location_name: None,
            start_time: time::macros::datetime!(2030-06-01 09:00),
            description: None,
            max_participants: 10,
        };
        let event_id = events::create_with_chat_room(db_pool, organizer.id, &new_event).await.unwrap();
        chat_rooms::for_event(db_pool, event_id).await.unwrap().unwrap()
    }

    /// Runs a cable over in-memory channels in place of a socket.
    fn connect(
        db_pool: &SqlitePool,
        hub: &ChatHub,
        room: &ChatRoom,
        author: Option<User>,
    ) -> (Inbound, Outbound, tokio::task::JoinHandle<()>) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<Result<Frame, Infallible>>();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Frame>();

        let receiver = stream::unfold(inbound_rx, |mut rx| async move { rx.recv().await.map(|frame| (frame, rx)) });
        let sender = sink::unfold(outbound_tx, |tx, frame: Frame| async move {
            tx.send(frame).map_err(|_| ())?;
            Ok::<_, ()>(tx)
        });

        let rx = hub.subscribe(&chat::stream_name(room.id));
        let task = tokio::spawn(pump(rx, sender, receiver, db_pool.clone(), hub.clone(), room.clone(), author));
        (inbound_tx, outbound_rx, task)
    }

    #[tokio::test]
    async fn signed_in_cable_forwards_and_posts() {
        let db_pool = testing::pool().await;
        let hub = ChatHub::new();
        let room = room(&db_pool).await;
        let author = testing::user(&db_pool, "talker@example.com").await;
        let stream = chat::stream_name(room.id);

        let (inbound, mut outbound, task) = connect(&db_pool, &hub, &room, Some(author));

        hub.broadcast_append(&stream, "<p>from the web form</p>");
        let frame = sent_text(outbound.recv().await.unwrap());
        assert!(frame.contains(&format!(r#"target="{stream}""#)));
        assert!(frame.contains("<p>from the web form</p>"));

        inbound.send(Ok(text("not json"))).unwrap();
        inbound.send(Ok(text(r#"{"content": "   "}"#))).unwrap();
        inbound.send(Ok(text(r#"{"content": "on my way"}"#))).unwrap();
        let frame = sent_text(outbound.recv().await.unwrap());
        assert!(frame.contains("on my way"));

        inbound.send(Ok(Frame::Close(None))).unwrap();
        task.await.unwrap();

        let history = messages::for_room(&db_pool, room.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "on my way");
        assert_eq!(hub.stream_count(), 0);
    }

    #[tokio::test]
    async fn anonymous_cable_only_listens() {
        let db_pool = testing::pool().await;
        let hub = ChatHub::new();
        let room = room(&db_pool).await;
        let stream = chat::stream_name(room.id);

        let (inbound, mut outbound, task) = connect(&db_pool, &hub, &room, None);

        inbound.send(Ok(text(r#"{"content": "let me in"}"#))).unwrap();
        hub.broadcast_append(&stream, "<p>hello lurker</p>");
        assert!(sent_text(outbound.recv().await.unwrap()).contains("hello lurker"));
        assert_eq!(hub.subscriber_count(&stream), 1);

        drop(inbound);
        task.await.unwrap();

        assert!(messages::for_room(&db_pool, room.id).await.unwrap().is_empty());
        assert_eq!(hub.stream_count(), 0);
    }
}
