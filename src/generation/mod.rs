//! Everything between "prompt goes out" and "validated payload comes back":
//! generator backends, payload extraction, quote repair, phase schemas and
//! the bounded retry loop that ties them together.

pub mod extract;
pub mod generator;
pub mod repair;
pub mod retry;
pub mod schema;

use serde_json::Value;

pub use extract::extract_payload;
pub use generator::{
    build_generator, CommandGenerator, DynGenerator, Generator, OpenAiGenerator, ScriptedGenerator,
};
pub use repair::repair_json;
pub use retry::{run_phase, AttemptState, RetryConfig, RunOptions};

/// Top-level JSON shape a phase expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    Array,
    Object,
}

impl PayloadShape {
    pub fn matches(&self, v: &Value) -> bool {
        match self {
            PayloadShape::Array => v.is_array(),
            PayloadShape::Object => v.is_object(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PayloadShape::Array => "array",
            PayloadShape::Object => "object",
        }
    }
}

pub type Validator = Box<dyn Fn(&Value) -> Vec<String> + Send + Sync>;

/// Turns a raw response into a payload for phases whose output is not JSON.
pub type Parser = Box<dyn Fn(&str) -> Option<Value> + Send + Sync>;

/// Descriptor for one generated-content phase: the only thing call sites
/// supply to the shared retry loop.
pub struct PhaseSpec {
    pub name: String,
    pub shape: PayloadShape,
    pub validator: Validator,
    /// Replaces JSON extraction when set.
    pub parser: Option<Parser>,
}

impl PhaseSpec {
    pub fn new<F>(name: impl Into<String>, shape: PayloadShape, validator: F) -> Self
    where
        F: Fn(&Value) -> Vec<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            shape,
            validator: Box::new(validator),
            parser: None,
        }
    }

    pub fn with_parser<P>(mut self, parser: P) -> Self
    where
        P: Fn(&str) -> Option<Value> + Send + Sync + 'static,
    {
        self.parser = Some(Box::new(parser));
        self
    }

    /// Payload from a raw response: the phase parser, else JSON extraction
    /// (repair included) for `shape`.
    pub fn extract(&self, raw: &str) -> Option<Value> {
        match &self.parser {
            Some(parse) => parse(raw).filter(|v| self.shape.matches(v)),
            None => extract_payload(raw, self.shape),
        }
    }

    pub fn validate(&self, v: &Value) -> Vec<String> {
        (self.validator)(v)
    }

    /// Feedback used when nothing parseable came back.
    pub fn parse_failure_message(&self) -> String {
        if self.parser.is_some() {
            return "Could not parse the response. Follow the output format exactly.".to_string();
        }
        format!(
            "Could not parse JSON from response. Make sure to return ONLY a JSON {}.",
            self.shape.label()
        )
    }
}

impl std::fmt::Debug for PhaseSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseSpec")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("parser", &self.parser.is_some())
            .finish_non_exhaustive()
    }
}
