use std::fmt;
use std::str::FromStr;

use tracing::info;

use crate::uniforms::{UniformError, UniformSet};

/// Tunable property shown in the parameter panel.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub value: f32,
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl ParamSpec {
    /// Builds a spec whose step is one hundredth of its range.
    pub fn new(name: impl Into<String>, value: f32, min: f32, max: f32) -> Self {
        let step = ((max - min) / 100.0).abs().max(f32::EPSILON);
        Self {
            name: name.into(),
            value,
            min,
            max,
            step,
        }
    }

    pub fn with_step(mut self, step: f32) -> Self {
        if step.is_finite() && step > 0.0 {
            self.step = step;
        }
        self
    }

    fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PanelError {
    #[error("parameter '{0}' is not bound")]
    UnknownParam(String),
    #[error("parameter '{0}' is already bound")]
    Duplicate(String),
    #[error("parameter '{name}' has an empty range ({min} > {max})")]
    InvalidRange { name: String, min: f32, max: f32 },
    #[error("invalid panel command: {0}")]
    Parse(String),
    #[error(transparent)]
    Uniform(#[from] UniformError),
}

type OnChange = Box<dyn FnMut(f32, &mut UniformSet) -> Result<(), UniformError>>;

struct Binding {
    spec: ParamSpec,
    on_change: OnChange,
}

/// Binds named properties to change callbacks that write into the uniform set.
///
/// Callbacks run synchronously inside `set`, so a change is visible to the
/// next render without any extra synchronisation.
#[derive(Default)]
pub struct ParamPanel {
    bindings: Vec<Binding>,
    selected: usize,
}

impl fmt::Debug for ParamPanel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamPanel")
            .field("params", &self.snapshot())
            .field("selected", &self.selected)
            .finish()
    }
}

impl ParamPanel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a property and applies its initial value through `on_change`.
    pub fn bind<F>(
        &mut self,
        spec: ParamSpec,
        uniforms: &mut UniformSet,
        mut on_change: F,
    ) -> Result<(), PanelError>
    where
        F: FnMut(f32, &mut UniformSet) -> Result<(), UniformError> + 'static,
    {
        if spec.min > spec.max {
            return Err(PanelError::InvalidRange {
                name: spec.name,
                min: spec.min,
                max: spec.max,
            });
        }
        if self.position(&spec.name).is_some() {
            return Err(PanelError::Duplicate(spec.name));
        }
        let mut spec = spec;
        spec.value = spec.clamp(spec.value);
        on_change(spec.value, uniforms)?;
        self.bindings.push(Binding {
            spec,
            on_change: Box::new(on_change),
        });
        Ok(())
    }

    /// Binds a property that writes straight into the scalar `uniform`.
    pub fn bind_uniform(
        &mut self,
        spec: ParamSpec,
        uniform: &str,
        uniforms: &mut UniformSet,
    ) -> Result<(), PanelError> {
        let uniform = uniform.to_string();
        self.bind(spec, uniforms, move |value, set| set.set_scalar(&uniform, value))
    }

    /// Stores `value` (clamped to the property range) and runs the callback.
    /// Returns the value actually applied.
    pub fn set(
        &mut self,
        name: &str,
        value: f32,
        uniforms: &mut UniformSet,
    ) -> Result<f32, PanelError> {
        let index = self
            .position(name)
            .ok_or_else(|| PanelError::UnknownParam(name.to_string()))?;
        let binding = &mut self.bindings[index];
        let applied = binding.spec.clamp(value);
        (binding.on_change)(applied, uniforms)?;
        binding.spec.value = applied;
        Ok(applied)
    }

    /// Moves a property by `steps` increments of its step size.
    pub fn nudge(
        &mut self,
        name: &str,
        steps: i32,
        uniforms: &mut UniformSet,
    ) -> Result<f32, PanelError> {
        let spec = self
            .get(name)
            .ok_or_else(|| PanelError::UnknownParam(name.to_string()))?;
        let target = spec.value + spec.step * steps as f32;
        self.set(name, target, uniforms)
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.position(name).map(|index| &self.bindings[index].spec)
    }

    pub fn selected(&self) -> Option<&ParamSpec> {
        self.bindings.get(self.selected).map(|binding| &binding.spec)
    }

    pub fn select_next(&mut self) -> Option<&ParamSpec> {
        if !self.bindings.is_empty() {
            self.selected = (self.selected + 1) % self.bindings.len();
        }
        self.selected()
    }

    pub fn select_previous(&mut self) -> Option<&ParamSpec> {
        if !self.bindings.is_empty() {
            self.selected = (self.selected + self.bindings.len() - 1) % self.bindings.len();
        }
        self.selected()
    }

    /// Current `(name, value)` pairs in binding order.
    pub fn snapshot(&self) -> Vec<(String, f32)> {
        self.bindings
            .iter()
            .map(|binding| (binding.spec.name.clone(), binding.spec.value))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn apply(
        &mut self,
        command: &PanelCommand,
        uniforms: &mut UniformSet,
    ) -> Result<(), PanelError> {
        match command {
            PanelCommand::Set { name, value } => {
                let applied = self.set(name, *value, uniforms)?;
                info!(param = %name, value = applied, "parameter updated");
            }
            PanelCommand::Nudge { name, steps } => {
                let applied = self.nudge(name, *steps, uniforms)?;
                info!(param = %name, value = applied, "parameter updated");
            }
            PanelCommand::List => {
                for spec in self.bindings.iter().map(|binding| &binding.spec) {
                    info!(
                        param = %spec.name,
                        value = spec.value,
                        min = spec.min,
                        max = spec.max,
                        step = spec.step,
                        "parameter"
                    );
                }
            }
        }
        Ok(())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.bindings
            .iter()
            .position(|binding| binding.spec.name == name)
    }
}

/// Textual panel command, as typed on the control channel.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelCommand {
    Set { name: String, value: f32 },
    Nudge { name: String, steps: i32 },
    List,
}

impl FromStr for PanelCommand {
    type Err = PanelError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            ["list"] => Ok(PanelCommand::List),
            ["set", name, value] => {
                let value: f32 = value
                    .parse()
                    .map_err(|_| PanelError::Parse(format!("'{value}' is not a number")))?;
                if !value.is_finite() {
                    return Err(PanelError::Parse(format!("'{value}' is not finite")));
                }
                Ok(PanelCommand::Set {
                    name: (*name).to_string(),
                    value,
                })
            }
            ["nudge", name, steps] => {
                let steps: i32 = steps
                    .parse()
                    .map_err(|_| PanelError::Parse(format!("'{steps}' is not an integer")))?;
                Ok(PanelCommand::Nudge {
                    name: (*name).to_string(),
                    steps,
                })
            }
            [] => Err(PanelError::Parse("empty command".into())),
            _ => Err(PanelError::Parse(format!(
                "'{}'; expected `set <name> <value>`, `nudge <name> <steps>`, or `list`",
                line.trim()
            ))),
        }
    }
}
