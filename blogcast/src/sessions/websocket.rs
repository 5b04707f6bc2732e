use rocket::futures::{SinkExt, StreamExt};
use rocket::{get, State};
use rocket_ws::{Channel, Message, WebSocket};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use super::Conversation;

/// Extract the chat text from a frame: `{"message": "..."}` or raw text.
fn parse_user_message(text: String) -> String {
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(json) => json["message"].as_str().map(str::to_string).unwrap_or(text),
        Err(_) => text,
    }
}

/// WebSocket chat over the scraped content of pipeline run `id`.
/// Each connection owns its own conversation.
#[get("/chat?<id>")]
pub fn chat_websocket(ws: WebSocket, id: &str, state: &State<crate::server::AppState>) -> Channel<'static> {
    let run_id = Uuid::parse_str(id).ok();
    let documents = state.documents.clone();
    let llm = state.pipeline.llm();
    let policy = state.chat_policy;

    ws.channel(move |mut stream| {
        Box::pin(async move {
            let content = match run_id {
                Some(run_id) => documents.read().await.get(&run_id).cloned(),
                None => None,
            };

            let Some(content) = content else {
                let frame = json!({
                    "type": "error",
                    "message": "Unknown podcast id; generate a podcast before chatting.",
                });
                let _ = stream.send(Message::Text(frame.to_string())).await;
                return Ok(());
            };

            info!("WebSocket chat connected for run {}", id_label(run_id));
            let mut conversation = Conversation::new(llm, policy).with_blog_context(content);

            let ready = json!({ "type": "ready" });
            stream.send(Message::Text(ready.to_string())).await?;

            while let Some(message) = stream.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        let user_message = parse_user_message(text);
                        if user_message.trim().is_empty() {
                            continue;
                        }

                        let frame = match conversation.turn(&user_message).await {
                            Ok(reply) => json!({
                                "type": "message",
                                "role": "assistant",
                                "content": reply,
                            }),
                            Err(e) => {
                                error!("chat turn failed: {}", e);
                                json!({
                                    "type": "error",
                                    "message": e.to_string(),
                                })
                            }
                        };

                        if let Err(e) = stream.send(Message::Text(frame.to_string())).await {
                            error!("Failed to send response: {}", e);
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => {
                        info!("WebSocket chat closed for run {}", id_label(run_id));
                        break;
                    }
                    Err(e) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }

            Ok(())
        })
    })
}

fn id_label(run_id: Option<Uuid>) -> String {
    run_id.map(|id| id.to_string()).unwrap_or_default()
}
