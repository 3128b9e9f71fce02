//! Scenario lifecycle integration.
//!
//! # Design
//! A test runner fires [`LifecycleEvent`]s through a [`Dispatcher`]; plugins
//! react to the ones they care about. [`RecorderPlugin`] turns the shared
//! [`RequestRecorder`] on when request saving was requested, clears it at
//! the start of each scenario and attaches the scenario's requests as a HAR
//! file when the scenario ends, whether it passed or failed.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::config::PluginConfig;
use crate::error::Result;
use crate::recorder::RequestRecorder;

/// A file attached to a scenario result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArtifact {
    pub name: String,
    pub mime_type: String,
    pub path: PathBuf,
}

/// Outcome of one scenario as seen by plugins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioResult {
    pub scenario: String,
    artifacts: Vec<FileArtifact>,
}

impl ScenarioResult {
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            scenario: scenario.into(),
            artifacts: Vec::new(),
        }
    }

    pub fn attach(&mut self, artifact: FileArtifact) {
        self.artifacts.push(artifact);
    }

    pub fn artifacts(&self) -> &[FileArtifact] {
        &self.artifacts
    }
}

#[derive(Debug)]
pub enum LifecycleEvent<'a> {
    /// Command line parsed; `save_requests` reflects `--httpx-save-requests`.
    ArgParsed { save_requests: bool },
    ScenarioRun,
    ScenarioPassed(&'a mut ScenarioResult),
    ScenarioFailed(&'a mut ScenarioResult),
}

pub trait Plugin {
    fn handle(&mut self, event: &mut LifecycleEvent<'_>) -> Result<()>;
}

/// Delivers events to plugins in registration order.
#[derive(Default)]
pub struct Dispatcher {
    plugins: Vec<Box<dyn Plugin>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, plugin: impl Plugin + 'static) -> &mut Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Stops at the first plugin error.
    pub fn fire(&mut self, mut event: LifecycleEvent<'_>) -> Result<()> {
        for plugin in &mut self.plugins {
            plugin.handle(&mut event)?;
        }
        Ok(())
    }
}

/// Records HTTP requests per scenario and attaches them as HAR artifacts.
#[derive(Debug)]
pub struct RecorderPlugin {
    config: PluginConfig,
    recorder: Arc<RequestRecorder>,
    save_requests: bool,
}

impl RecorderPlugin {
    pub fn new(config: PluginConfig, recorder: Arc<RequestRecorder>) -> Self {
        let save_requests = config.save_requests;
        Self {
            config,
            recorder,
            save_requests,
        }
    }

    pub fn recorder(&self) -> &Arc<RequestRecorder> {
        &self.recorder
    }

    fn on_arg_parsed(&mut self, save_requests: bool) {
        self.save_requests = self.save_requests || save_requests;
        if self.save_requests {
            self.recorder.enable();
        }
    }

    fn on_scenario_run(&self) {
        if self.save_requests {
            self.recorder.reset();
        }
    }

    fn on_scenario_end(&self, result: &mut ScenarioResult) -> Result<()> {
        if !self.save_requests {
            return Ok(());
        }
        let file = tempfile::Builder::new()
            .prefix("httpx-requests-")
            .suffix(".har")
            .tempfile()?;
        let (_, path) = file.keep().map_err(|err| err.error)?;
        self.recorder.save(&path)?;

        debug!(scenario = %result.scenario, path = %path.display(), "attached HAR artifact");
        result.attach(FileArtifact {
            name: self.config.requests_artifact_name.clone(),
            mime_type: "application/json".to_string(),
            path,
        });
        Ok(())
    }
}

impl Plugin for RecorderPlugin {
    fn handle(&mut self, event: &mut LifecycleEvent<'_>) -> Result<()> {
        if !self.config.enabled {
            return Ok(());
        }
        match event {
            LifecycleEvent::ArgParsed { save_requests } => self.on_arg_parsed(*save_requests),
            LifecycleEvent::ScenarioRun => self.on_scenario_run(),
            LifecycleEvent::ScenarioPassed(result) | LifecycleEvent::ScenarioFailed(result) => {
                self.on_scenario_end(result)?
            }
        }
        Ok(())
    }
}
