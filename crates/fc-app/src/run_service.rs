//! Scripted frame-by-frame execution of a compiled engine.

use fc_controls::{FcsEngine, FcsOutputs, Step};
use fc_project::schema::ControlProject;
use fc_props::PropertyManager;
use serde::Serialize;

use crate::compile::{CompileOptions, compile_project};
use crate::error::{AppError, AppResult};

/// Property write applied just before frame `frame` runs.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptEvent {
    pub frame: u64,
    pub path: String,
    pub value: f64,
}

impl ScriptEvent {
    /// Parse `path=value`, applied before the first frame.
    pub fn parse_assignment(text: &str) -> AppResult<Self> {
        Self::parse_at(text, 0)
    }

    /// Parse `path=value` or `path=value@frame`.
    pub fn parse_at(text: &str, default_frame: u64) -> AppResult<Self> {
        let (path, rest) = text
            .split_once('=')
            .ok_or_else(|| AppError::InvalidInput(format!("expected path=value, got '{text}'")))?;
        let (value, frame) = match rest.split_once('@') {
            Some((v, f)) => (
                v,
                f.trim().parse().map_err(|_| {
                    AppError::InvalidInput(format!("bad frame number in '{text}'"))
                })?,
            ),
            None => (rest, default_frame),
        };
        let value = value
            .trim()
            .parse()
            .map_err(|_| AppError::InvalidInput(format!("bad value in '{text}'")))?;
        Ok(Self {
            frame,
            path: path.trim().to_string(),
            value,
        })
    }
}

/// Options for a scripted run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Frame period in seconds; `0.0` runs steady-state frames.
    pub dt: f64,
    pub frames: u64,
    /// Frames run in trim mode before the recorded frames.
    pub trim_frames: u64,
    pub events: Vec<ScriptEvent>,
    /// Properties recorded after every frame.
    pub watch: Vec<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dt: 1.0 / 120.0,
            frames: 120,
            trim_frames: 0,
            events: Vec::new(),
            watch: Vec::new(),
        }
    }
}

/// Recorded time history, one row per frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunRecord {
    /// `time` followed by the watched paths.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl RunRecord {
    /// Column of a watched path.
    pub fn series(&self, path: &str) -> Option<Vec<f64>> {
        let col = self.columns.iter().position(|c| c == path)?;
        Some(self.rows.iter().map(|r| r[col]).collect())
    }

    /// Last recorded value of a watched path.
    pub fn last(&self, path: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == path)?;
        self.rows.last().map(|r| r[col])
    }

    /// Delimited text table with a header line.
    pub fn to_delimited(&self, delimiter: &str) -> String {
        let mut out = self.columns.join(delimiter);
        out.push('\n');
        for row in &self.rows {
            let line: Vec<String> = row.iter().map(|v| format!("{v:.6}")).collect();
            out.push_str(&line.join(delimiter));
            out.push('\n');
        }
        out
    }
}

/// Result of `run_project`.
#[derive(Debug)]
pub struct RunResponse {
    pub record: RunRecord,
    pub outputs: FcsOutputs,
    pub frames_run: u64,
}

/// Run `engine` for the configured frames, applying script events.
pub fn run_frames(
    engine: &mut FcsEngine,
    props: &mut PropertyManager,
    options: &RunOptions,
) -> AppResult<RunRecord> {
    if !(options.dt >= 0.0) || !options.dt.is_finite() {
        return Err(AppError::InvalidInput(format!(
            "dt must be finite and non-negative, got {}",
            options.dt
        )));
    }
    let watched = options
        .watch
        .iter()
        .map(|path| {
            props
                .lookup(path)
                .ok_or_else(|| AppError::InvalidInput(format!("unknown watch property '{path}'")))
        })
        .collect::<AppResult<Vec<_>>>()?;
    let step = Step::from_dt(options.dt);

    let mut events: Vec<&ScriptEvent> = options.events.iter().collect();
    events.sort_by_key(|e| e.frame);
    let mut pending = events.into_iter().peekable();

    if options.trim_frames > 0 {
        tracing::debug!(frames = options.trim_frames, "trimming");
        engine.set_trimming(true);
        for _ in 0..options.trim_frames {
            engine.run(props, step)?;
        }
        engine.set_trimming(false);
    }

    let mut record = RunRecord {
        columns: std::iter::once("time".to_string())
            .chain(options.watch.iter().cloned())
            .collect(),
        rows: Vec::new(),
    };

    for frame in 0..options.frames {
        while let Some(event) = pending.next_if(|e| e.frame <= frame) {
            props.set_value(&event.path, event.value)?;
        }
        engine.run(props, step)?;
        let time = (frame + 1) as f64 * options.dt;
        let mut row = Vec::with_capacity(watched.len() + 1);
        row.push(time);
        row.extend(watched.iter().map(|&id| props.get(id)));
        record.rows.push(row);
    }
    Ok(record)
}

/// Compile `project` into a fresh property store and run it.
pub fn run_project(
    project: &ControlProject,
    options: &RunOptions,
    compile: CompileOptions,
) -> AppResult<RunResponse> {
    let mut props = PropertyManager::new();
    let compile = CompileOptions {
        dt: options.dt,
        ..compile
    };
    let mut engine = compile_project(project, &mut props, compile)?;
    let record = run_frames(&mut engine, &mut props, options)?;
    Ok(RunResponse {
        outputs: engine.outputs(&props),
        frames_run: options.frames,
        record,
    })
}
