use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;
use trellis_core::{EvalError, Scope, State, Value};
use trellis_renderer::{Component, Host};

/// Tag of the element the CLI mounts templates under.
pub const HOST_TAG: &str = "trellis-root";

/// A template file ready to render: markup plus any component styles.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Source {
    pub template: String,
    pub styles: Vec<String>,
}

impl Source {
    /// Component files are split into template and styles; anything else is
    /// taken as bare template markup.
    pub fn parse(text: &str) -> Result<Self> {
        if trellis_markup::is_component(text) {
            let parts = trellis_markup::parse_component(text)?;
            Ok(Self {
                template: parts.template,
                styles: parts.styles,
            })
        } else {
            Ok(Self {
                template: text.to_string(),
                styles: Vec::new(),
            })
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("failed to parse {}", path.display()))
    }
}

/// Where the initial scope comes from.
#[derive(Debug, Clone, Copy, Default)]
pub enum StateInput<'a> {
    #[default]
    Empty,
    File(&'a Path),
    Inline(&'a str),
}

/// Builds the scope for a file from a JSON object.
pub fn load_state(input: StateInput<'_>) -> Result<State> {
    let json = match input {
        StateInput::Empty => return Ok(State::new("state")),
        StateInput::File(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("{} is not valid JSON", path.display()))?
        }
        StateInput::Inline(text) => {
            serde_json::from_str(text).context("inline state is not valid JSON")?
        }
    };
    State::from_json("state", json).context("state must be a JSON object")
}

struct FileComponent {
    state: State,
    source: Source,
}

impl Scope for FileComponent {
    fn get(&self, name: &str) -> Option<Value> {
        self.state.get(name)
    }

    fn set(&mut self, name: &str, value: Value) -> Result<(), EvalError> {
        self.state.set(name, value)
    }

    fn call(&mut self, name: &str, args: Vec<Value>) -> Option<Result<Value, EvalError>> {
        self.state.call(name, args)
    }

    fn scope_name(&self) -> &str {
        self.state.scope_name()
    }
}

impl Component for FileComponent {
    fn template(&self) -> String {
        self.source.template.clone()
    }

    fn styles(&self) -> Vec<String> {
        self.source.styles.clone()
    }
}

fn mount(source: Source, state: State) -> Result<Host<FileComponent>> {
    let mut host = Host::new(HOST_TAG, FileComponent { state, source });
    host.connect()?;
    Ok(host)
}

/// Renders `source` once against `state` and returns the produced HTML.
/// With `pretty`, nodes go on their own lines, indented by depth.
pub fn render_source(source: Source, state: State, pretty: bool) -> Result<String> {
    let host = mount(source, state)?;
    if pretty {
        let html = host.document().pretty_html(host.element());
        Ok(html.trim_end().to_string())
    } else {
        Ok(host.html())
    }
}

pub fn render_cmd(input: &Path, state: StateInput<'_>, pretty: bool) -> Result<String> {
    let source = Source::read(input)?;
    let state = load_state(state)?;
    debug!(file = %input.display(), "rendering");
    render_source(source, state, pretty)
        .with_context(|| format!("failed to render {}", input.display()))
}

/// What a successful `check` saw in the first pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Report {
    pub nodes: usize,
    pub listeners: usize,
    pub hidden: usize,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ok: {} nodes, {} listeners, {} hidden conditionals",
            self.nodes, self.listeners, self.hidden
        )
    }
}

pub fn check_source(source: Source, state: State) -> Result<Report> {
    let host = mount(source, state)?;
    let tree = host.tree();
    Ok(Report {
        nodes: host.document().descendants(host.element()).len(),
        listeners: tree.bound_listeners(),
        hidden: tree.masks(),
    })
}

/// Parses `input` and builds it once; directive errors name the
/// expression and the tag they sit on.
pub fn check_cmd(input: &Path, state: StateInput<'_>) -> Result<Report> {
    let source = Source::read(input)?;
    let state = load_state(state)?;
    check_source(source, state).with_context(|| format!("{} failed to build", input.display()))
}
