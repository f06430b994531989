use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spikelink_exec::CommandExecutor;
use spikelink_transport::Transport;

use crate::error::Result;
use crate::port::Port;
use crate::reply::{parse_reading, NONE_READING};

/// REPL variable holding the distance sensor.
pub const DISTANCE_SENSOR_VAR: &str = "distance_sensor";
/// REPL variable holding the color sensor.
pub const COLOR_SENSOR_VAR: &str = "color_sensor";

/// Unit for distance thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceUnit {
    #[default]
    Cm,
    In,
    Percent,
}

impl DistanceUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            DistanceUnit::Cm => "cm",
            DistanceUnit::In => "in",
            DistanceUnit::Percent => "%",
        }
    }
}

/// Ultrasonic distance sensor.
pub struct DistanceSensor<T> {
    port: Port,
    executor: Arc<CommandExecutor<T>>,
}

impl<T: Transport> DistanceSensor<T> {
    pub(crate) fn new(port: Port, executor: Arc<CommandExecutor<T>>) -> Self {
        Self { port, executor }
    }

    pub fn port(&self) -> Port {
        self.port
    }

    pub fn construct_command(&self) -> String {
        format!("{DISTANCE_SENSOR_VAR} = DistanceSensor('{}')", self.port)
    }

    /// Light all four segments at `brightness` (0-100).
    pub fn light_up_all(&self, brightness: i32) -> Result<()> {
        self.act(&format!("light_up_all({brightness})"))
    }

    /// Light all four segments at full brightness.
    pub fn light_up_all_default(&self) -> Result<()> {
        self.act("light_up_all()")
    }

    pub fn light_up(
        &self,
        right_top: i32,
        right_bottom: i32,
        left_bottom: i32,
        left_top: i32,
    ) -> Result<()> {
        self.act(&format!(
            "light_up({right_top}, {right_bottom}, {left_bottom}, {left_top})"
        ))
    }

    /// Distance in centimetres; 0 when nothing is in range.
    pub fn distance_cm(&self) -> Result<i32> {
        self.read("get_distance_cm()")
    }

    pub fn distance_inches(&self) -> Result<i32> {
        self.read("get_distance_inches()")
    }

    pub fn distance_percentage(&self) -> Result<i32> {
        self.read("get_distance_percentage()")
    }

    /// Block until the measured distance exceeds `distance`.
    ///
    /// The hub only replies once the condition holds, so pass a `timeout`
    /// long enough for the situation.
    pub fn wait_for_distance_farther_than(
        &self,
        distance: f32,
        unit: DistanceUnit,
        timeout: Duration,
    ) -> Result<()> {
        self.wait(
            &format!("wait_for_distance_farther_than({distance}, '{}')", unit.as_str()),
            timeout,
        )
    }

    /// Block until the measured distance drops below `distance`.
    pub fn wait_for_distance_closer_than(
        &self,
        distance: f32,
        unit: DistanceUnit,
        timeout: Duration,
    ) -> Result<()> {
        self.wait(
            &format!("wait_for_distance_closer_than({distance}, '{}')", unit.as_str()),
            timeout,
        )
    }

    fn act(&self, call: &str) -> Result<()> {
        self.executor
            .execute_fire_and_forget(&format!("{DISTANCE_SENSOR_VAR}.{call}"))?;
        Ok(())
    }

    fn read(&self, call: &str) -> Result<i32> {
        let command = format!("{DISTANCE_SENSOR_VAR}.{call}");
        let reply = self.executor.execute_sync(&command)?;
        parse_reading(&command, &reply)
    }

    fn wait(&self, call: &str, timeout: Duration) -> Result<()> {
        let command = format!("{DISTANCE_SENSOR_VAR}.{call}");
        self.executor.execute_sync_with_timeout(&command, timeout)?;
        Ok(())
    }
}

/// Color and light sensor.
pub struct ColorSensor<T> {
    port: Port,
    executor: Arc<CommandExecutor<T>>,
}

impl<T: Transport> ColorSensor<T> {
    pub(crate) fn new(port: Port, executor: Arc<CommandExecutor<T>>) -> Self {
        Self { port, executor }
    }

    pub fn port(&self) -> Port {
        self.port
    }

    pub fn construct_command(&self) -> String {
        format!("{COLOR_SENSOR_VAR} = ColorSensor('{}')", self.port)
    }

    pub fn light_up_all(&self, brightness: i32) -> Result<()> {
        self.act(&format!("light_up_all({brightness})"))
    }

    pub fn light_up(&self, light1: i32, light2: i32, light3: i32) -> Result<()> {
        self.act(&format!("light_up({light1}, {light2}, {light3})"))
    }

    /// Ask the hub to block its REPL until `color` is seen. Does not wait
    /// on the host side.
    pub fn wait_until_color(&self, color: &str) -> Result<()> {
        self.act(&format!("wait_until_color('{color}')"))
    }

    pub fn wait_for_new_color(&self, color: &str) -> Result<()> {
        self.act(&format!("wait_for_new_color('{color}')"))
    }

    /// Detected color name, or `None` when no color is detected.
    pub fn color(&self) -> Result<Option<String>> {
        let command = format!("{COLOR_SENSOR_VAR}.get_color()");
        let reply = self.executor.execute_sync(&command)?;
        let reply = reply.trim();
        if reply == NONE_READING {
            return Ok(None);
        }
        Ok(Some(reply.trim_matches('\'').to_string()))
    }

    pub fn ambient_light(&self) -> Result<i32> {
        self.read("get_ambient_light()")
    }

    pub fn reflected_light(&self) -> Result<i32> {
        self.read("get_reflected_light()")
    }

    fn act(&self, call: &str) -> Result<()> {
        self.executor
            .execute_fire_and_forget(&format!("{COLOR_SENSOR_VAR}.{call}"))?;
        Ok(())
    }

    fn read(&self, call: &str) -> Result<i32> {
        let command = format!("{COLOR_SENSOR_VAR}.{call}");
        let reply = self.executor.execute_sync(&command)?;
        parse_reading(&command, &reply)
    }
}

macro_rules! device_boilerplate {
    ($name:ident) => {
        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                Self {
                    port: self.port,
                    executor: Arc::clone(&self.executor),
                }
            }
        }

        impl<T> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("port", &self.port)
                    .finish()
            }
        }
    };
}

device_boilerplate!(DistanceSensor);
device_boilerplate!(ColorSensor);
