use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use spikelink_exec::CommandExecutor;
use spikelink_transport::Transport;

use crate::error::Result;
use crate::port::Port;
use crate::reply::{parse_bool, parse_int};

/// What a motor does once it stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopAction {
    #[default]
    Coast,
    Brake,
    Hold,
}

impl StopAction {
    pub fn as_str(self) -> &'static str {
        match self {
            StopAction::Coast => "coast",
            StopAction::Brake => "brake",
            StopAction::Hold => "hold",
        }
    }
}

/// A motor bound to the REPL variable `motor<PORT>`.
///
/// Actions are sent without waiting; getters block for the reply.
pub struct Motor<T> {
    port: Port,
    executor: Arc<CommandExecutor<T>>,
}

impl<T> Clone for Motor<T> {
    fn clone(&self) -> Self {
        Self {
            port: self.port,
            executor: Arc::clone(&self.executor),
        }
    }
}

impl<T> fmt::Debug for Motor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Motor").field("port", &self.port).finish()
    }
}

impl<T: Transport> Motor<T> {
    pub(crate) fn new(port: Port, executor: Arc<CommandExecutor<T>>) -> Self {
        Self { port, executor }
    }

    pub fn port(&self) -> Port {
        self.port
    }

    /// REPL variable holding this motor.
    pub fn variable(&self) -> String {
        format!("motor{}", self.port)
    }

    /// Line that constructs the motor on the hub.
    pub fn construct_command(&self) -> String {
        format!("{} = Motor('{}')", self.variable(), self.port)
    }

    pub fn run_for_seconds(&self, seconds: i32) -> Result<()> {
        self.act(&format!("run_for_seconds({seconds})"))
    }

    pub fn run_for_degrees(&self, degrees: i32) -> Result<()> {
        self.act(&format!("run_for_degrees({degrees})"))
    }

    pub fn run_for_rotations(&self, rotations: f32) -> Result<()> {
        self.act(&format!("run_for_rotations({rotations})"))
    }

    pub fn run_to_position(&self, position: i32) -> Result<()> {
        self.act(&format!("run_to_position({position})"))
    }

    pub fn run_to_degrees_counted(&self, degrees: i32) -> Result<()> {
        self.act(&format!("run_to_degrees_counted({degrees})"))
    }

    /// Start at the default speed.
    pub fn start(&self) -> Result<()> {
        self.act("start()")
    }

    pub fn start_at_speed(&self, speed: i32) -> Result<()> {
        self.act(&format!("start({speed})"))
    }

    pub fn start_at_power(&self, power: i32) -> Result<()> {
        self.act(&format!("start_at_power({power})"))
    }

    pub fn stop(&self) -> Result<()> {
        self.act("stop()")
    }

    pub fn set_degrees_counted(&self, degrees: i32) -> Result<()> {
        self.act(&format!("set_degrees_counted({degrees})"))
    }

    /// Default speed, 0-100.
    pub fn set_default_speed(&self, speed: i32) -> Result<()> {
        self.act(&format!("set_default_speed({speed})"))
    }

    pub fn set_stop_action(&self, action: StopAction) -> Result<()> {
        self.act(&format!("set_stop_action('{}')", action.as_str()))
    }

    pub fn speed(&self) -> Result<i32> {
        self.read_int("get_speed()")
    }

    pub fn position(&self) -> Result<i32> {
        self.read_int("get_position()")
    }

    pub fn degrees_counted(&self) -> Result<i32> {
        self.read_int("get_degrees_counted()")
    }

    pub fn default_speed(&self) -> Result<i32> {
        self.read_int("get_default_speed()")
    }

    pub fn was_interrupted(&self) -> Result<bool> {
        self.read_bool("was_interrupted()")
    }

    pub fn was_stalled(&self) -> Result<bool> {
        self.read_bool("was_stalled()")
    }

    fn command(&self, call: &str) -> String {
        format!("motor{}.{call}", self.port)
    }

    fn act(&self, call: &str) -> Result<()> {
        self.executor.execute_fire_and_forget(&self.command(call))?;
        Ok(())
    }

    fn read_int(&self, call: &str) -> Result<i32> {
        let command = self.command(call);
        let reply = self.executor.execute_sync(&command)?;
        parse_int(&command, &reply)
    }

    fn read_bool(&self, call: &str) -> Result<bool> {
        let command = self.command(call);
        let reply = self.executor.execute_sync(&command)?;
        parse_bool(&command, &reply)
    }
}

#[cfg(test)]
mod tests {
    use spikelink_transport::MemoryTransport;

    use super::*;
    use crate::testing::{answer_next_call, linked_executor};

    #[test]
    fn actions_are_raw_lines() {
        let (exec, tap) = linked_executor();
        let motor = Motor::new(Port::B, exec);

        motor.run_for_seconds(2).unwrap();
        motor.start_at_speed(-40).unwrap();
        motor.run_for_rotations(1.5).unwrap();
        motor.set_stop_action(StopAction::Hold).unwrap();
        motor.stop().unwrap();

        assert_eq!(
            tap.lines(),
            vec![
                "motorB.run_for_seconds(2)\r\n",
                "motorB.start(-40)\r\n",
                "motorB.run_for_rotations(1.5)\r\n",
                "motorB.set_stop_action('hold')\r\n",
                "motorB.stop()\r\n",
            ]
        );
    }

    #[test]
    fn getters_parse_replies() {
        let (exec, tap) = linked_executor();
        let motor = Motor::new(Port::A, Arc::clone(&exec));

        let hub = answer_next_call(&exec, &tap, "-270");
        assert_eq!(motor.position().unwrap(), -270);
        assert_eq!(hub.join().unwrap(), "motorA.get_position()");

        let hub = answer_next_call(&exec, &tap, "True");
        assert!(motor.was_stalled().unwrap());
        assert_eq!(hub.join().unwrap(), "motorA.was_stalled()");
    }

    #[test]
    fn unparseable_reply_is_invalid_reply() {
        let (exec, tap) = linked_executor();
        let motor = Motor::new(Port::E, Arc::clone(&exec));

        let hub = answer_next_call(&exec, &tap, "NameError");
        let err = motor.speed().unwrap_err();
        hub.join().unwrap();
        assert!(matches!(err, crate::HubError::InvalidReply { .. }));
    }

    #[test]
    fn construct_command_names_port() {
        let (transport, _tap) = MemoryTransport::new();
        let motor = Motor::new(Port::F, Arc::new(CommandExecutor::new(transport)));
        assert_eq!(motor.construct_command(), "motorF = Motor('F')");
    }
}
