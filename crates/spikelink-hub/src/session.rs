use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use spikelink_exec::CommandExecutor;
use spikelink_frame::{escape_command, EVALUATOR_DEFINITION, INTERRUPT};
use spikelink_transport::Transport;
use tracing::{debug, info};

use crate::button::Button;
use crate::error::Result;
use crate::motor::Motor;
use crate::port::{ButtonId, Port};
use crate::sensors::{ColorSensor, DistanceSensor};

/// Imports the hub's device classes into the REPL namespace.
pub const SPIKE_IMPORTS: &str = "from spike import PrimeHub, LightMatrix, Button, StatusLight, MotionSensor, Speaker, ColorSensor, App, DistanceSensor, Motor";

/// Which devices [`HubSession::initialize`] sets up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    /// Default: A, B, E, F.
    pub motors: Vec<Port>,
    /// Default: C.
    pub color_sensor_port: Option<Port>,
    /// Default: D.
    pub distance_sensor_port: Option<Port>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            motors: vec![Port::A, Port::B, Port::E, Port::F],
            color_sensor_port: Some(Port::C),
            distance_sensor_port: Some(Port::D),
        }
    }
}

/// A hub driven through one [`CommandExecutor`].
///
/// [`initialize`](Self::initialize) interrupts any running program, imports
/// the device classes, constructs the configured devices and defines the
/// remote `evaluator` helper that synchronous calls depend on.
pub struct HubSession<T> {
    executor: Arc<CommandExecutor<T>>,
    config: HubConfig,
    motors: BTreeMap<Port, Motor<T>>,
    distance_sensor: Option<DistanceSensor<T>>,
    color_sensor: Option<ColorSensor<T>>,
    initialized: bool,
}

impl<T: Transport> HubSession<T> {
    pub fn new(executor: Arc<CommandExecutor<T>>) -> Self {
        Self::with_config(executor, HubConfig::default())
    }

    pub fn with_config(executor: Arc<CommandExecutor<T>>, config: HubConfig) -> Self {
        Self {
            executor,
            config,
            motors: BTreeMap::new(),
            distance_sensor: None,
            color_sensor: None,
            initialized: false,
        }
    }

    /// Run the setup sequence. Every line is fire-and-forget.
    pub fn initialize(&mut self) -> Result<()> {
        info!(transport = self.executor.name(), "initializing hub");
        self.send(INTERRUPT)?;
        self.send(SPIKE_IMPORTS)?;
        self.send("import hub")?;
        self.send("primeHub = PrimeHub()")?;

        for port in self.config.motors.clone() {
            self.create_motor(port)?;
        }
        if let Some(port) = self.config.color_sensor_port {
            self.create_color_sensor(port)?;
        }
        if let Some(port) = self.config.distance_sensor_port {
            self.create_distance_sensor(port)?;
        }
        self.define_evaluator()?;

        self.initialized = true;
        info!(motors = self.motors.len(), "hub initialized");
        Ok(())
    }

    /// (Re)define the remote `evaluator` helper.
    pub fn define_evaluator(&self) -> Result<()> {
        self.send(EVALUATOR_DEFINITION)
    }

    pub fn create_motor(&mut self, port: Port) -> Result<&Motor<T>> {
        let motor = Motor::new(port, Arc::clone(&self.executor));
        self.send(&motor.construct_command())?;
        debug!(%port, "motor created");
        Ok(&*self.motors.entry(port).or_insert(motor))
    }

    pub fn create_distance_sensor(&mut self, port: Port) -> Result<&DistanceSensor<T>> {
        let sensor = DistanceSensor::new(port, Arc::clone(&self.executor));
        self.send(&sensor.construct_command())?;
        debug!(%port, "distance sensor created");
        Ok(&*self.distance_sensor.insert(sensor))
    }

    pub fn create_color_sensor(&mut self, port: Port) -> Result<&ColorSensor<T>> {
        let sensor = ColorSensor::new(port, Arc::clone(&self.executor));
        self.send(&sensor.construct_command())?;
        debug!(%port, "color sensor created");
        Ok(&*self.color_sensor.insert(sensor))
    }

    /// Show `text` on the light matrix.
    pub fn display_text(&self, text: &str) -> Result<()> {
        self.send(&format!("hub.display.show(\"{}\")", escape_command(text)))
    }

    /// Show an image expression such as `hub.Image.HAPPY`, waiting for the
    /// hub to acknowledge.
    pub fn display_image(&self, image: &str) -> Result<()> {
        self.executor
            .execute_sync(&format!("hub.display.show({image})"))?;
        Ok(())
    }

    pub fn motor(&self, port: Port) -> Option<&Motor<T>> {
        self.motors.get(&port)
    }

    pub fn motors(&self) -> impl Iterator<Item = &Motor<T>> {
        self.motors.values()
    }

    pub fn distance_sensor(&self) -> Option<&DistanceSensor<T>> {
        self.distance_sensor.as_ref()
    }

    pub fn color_sensor(&self) -> Option<&ColorSensor<T>> {
        self.color_sensor.as_ref()
    }

    /// Buttons need no remote construction; every id is always available.
    pub fn button(&self, id: ButtonId) -> Button<T> {
        Button::new(id, Arc::clone(&self.executor))
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn executor(&self) -> &Arc<CommandExecutor<T>> {
        &self.executor
    }

    fn send(&self, line: &str) -> Result<()> {
        self.executor.execute_fire_and_forget(line)?;
        Ok(())
    }
}

impl<T> std::fmt::Debug for HubSession<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubSession")
            .field("config", &self.config)
            .field("motors", &self.motors.keys().collect::<Vec<_>>())
            .field("initialized", &self.initialized)
            .finish()
    }
}
