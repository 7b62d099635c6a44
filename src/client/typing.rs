use super::ChannelClient;
use crate::infrastructure::TaskKind;
use crate::types::OutboundMessage;

impl ChannelClient {
    fn typing_frame(&self, is_typing: bool) -> OutboundMessage {
        OutboundMessage::Typing {
            is_typing,
            room_id: self.endpoint.room_id().map(str::to_string),
        }
    }

    /// Records an input event.
    ///
    /// The first event after idle sends `typing: true`; every event restarts the stop
    /// timer, and `typing: false` goes out once the timeout passes without input.
    pub async fn notify_typing(&self) {
        let first = {
            let mut state = self.state.write().await;
            let first = !state.typing_active;
            state.typing_active = true;

            let client = self.clone();
            let timeout = self.options.typing_timeout();
            state.task_manager.spawn(TaskKind::TypingStop, async move {
                tokio::time::sleep(timeout).await;
                client.finish_typing(true).await;
            });
            first
        };

        if first {
            self.send(self.typing_frame(true)).await;
        }
    }

    /// Sends `typing: false` now if a typing flag is outstanding.
    pub async fn stop_typing(&self) {
        self.finish_typing(false).await;
    }

    async fn finish_typing(&self, from_timer: bool) {
        {
            let mut state = self.state.write().await;
            if from_timer {
                state.task_manager.detach(TaskKind::TypingStop);
            } else {
                state.task_manager.abort(TaskKind::TypingStop);
            }
            if !state.typing_active {
                return;
            }
            state.typing_active = false;
        }

        self.send(self.typing_frame(false)).await;
    }
}
