use std::fmt;
use std::sync::Arc;

use spikelink_exec::{CommandExecutor, EventSubscription};
use spikelink_transport::Transport;
use tracing::warn;

use crate::error::Result;
use crate::port::ButtonId;
use crate::reply::{parse_bool, parse_int};

/// A face button on the hub (`hub.button.<id>`).
pub struct Button<T> {
    id: ButtonId,
    executor: Arc<CommandExecutor<T>>,
}

impl<T> Clone for Button<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            executor: Arc::clone(&self.executor),
        }
    }
}

impl<T> fmt::Debug for Button<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Button").field("id", &self.id).finish()
    }
}

impl<T: Transport> Button<T> {
    pub(crate) fn new(id: ButtonId, executor: Arc<CommandExecutor<T>>) -> Self {
        Self { id, executor }
    }

    pub fn id(&self) -> ButtonId {
        self.id
    }

    /// Remote callable that accepts the button callback.
    pub fn callback_method(&self) -> String {
        format!("hub.button.{}.callback", self.id)
    }

    /// Invoke `callback` with the hub's integer argument on every change
    /// (press duration in ms on release, 0 on press).
    ///
    /// Runs on the delivery path. Notifications whose payload is not an
    /// integer are logged and skipped.
    pub fn on_change<F>(&self, callback: F) -> Result<EventSubscription>
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        let method = self.callback_method();
        let id = self.id;
        let subscription = self.executor.register_event_with(&method, move |payload| {
            match payload.trim().parse::<i32>() {
                Ok(value) => callback(value),
                Err(_) => warn!(button = %id, payload, "non-integer button payload"),
            }
        })?;
        Ok(subscription)
    }

    pub fn is_pressed(&self) -> Result<bool> {
        self.read_bool("is_pressed()")
    }

    /// Whether the button was pressed since the last query.
    pub fn was_pressed(&self) -> Result<bool> {
        self.read_bool("was_pressed()")
    }

    /// Number of presses since the last query.
    pub fn presses(&self) -> Result<i32> {
        let command = format!("hub.button.{}.presses()", self.id);
        let reply = self.executor.execute_sync(&command)?;
        parse_int(&command, &reply)
    }

    fn read_bool(&self, call: &str) -> Result<bool> {
        let command = format!("hub.button.{}.{call}", self.id);
        let reply = self.executor.execute_sync(&command)?;
        parse_bool(&command, &reply)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::testing::{answer_next_call, linked_executor};

    #[test]
    fn on_change_registers_callback_hook() {
        let (exec, tap) = linked_executor();
        let button = Button::new(ButtonId::Left, Arc::clone(&exec));
        let values = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&values);

        let sub = button
            .on_change(move |v| sink.lock().unwrap().push(v))
            .unwrap();
        assert_eq!(sub.id(), 1);
        assert_eq!(
            tap.last_line().unwrap(),
            "hub.button.left.callback(lambda x: print(\"CB:1:\" + str(x) + \"%\"))\r\n"
        );

        exec.on_inbound_chunk(b"CB:1:0%");
        exec.on_inbound_chunk(b"CB:1:350%");
        exec.on_inbound_chunk(b"CB:1:oops%");
        assert_eq!(*values.lock().unwrap(), vec![0, 350]);
    }

    #[test]
    fn second_button_gets_next_event_id() {
        let (exec, _tap) = linked_executor();
        let left = Button::new(ButtonId::Left, Arc::clone(&exec));
        let right = Button::new(ButtonId::Right, Arc::clone(&exec));
        assert_eq!(left.on_change(|_| {}).unwrap().id(), 1);
        assert_eq!(right.on_change(|_| {}).unwrap().id(), 2);
    }

    #[test]
    fn is_pressed_parses_bool() {
        let (exec, tap) = linked_executor();
        let button = Button::new(ButtonId::Center, Arc::clone(&exec));
        let hub = answer_next_call(&exec, &tap, "False");
        assert!(!button.is_pressed().unwrap());
        assert_eq!(hub.join().unwrap(), "hub.button.center.is_pressed()");
    }
}
