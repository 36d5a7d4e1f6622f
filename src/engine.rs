use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::geometry::LonLat;
use crate::grid::{CellId, HexGrid, InfraKind};
use crate::objective::{EvaluationStats, Model};
use crate::params::ParameterSet;
use crate::propagate::{self, PropagationStats, DEFAULT_HOP_KM};
use crate::sampler::{self, DEFAULT_INTERVAL_KM, MIN_INTERVAL_KM};
use crate::snapshot::GridSnapshot;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub sample_interval_km: f64,
    pub hop_km: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_interval_km: DEFAULT_INTERVAL_KM,
            hop_km: DEFAULT_HOP_KM,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LineId(u64);

impl LineId {
    pub fn raw(self) -> u64 {
        self.0
    }

    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

/// A drawn polyline and the cells it touches.
#[derive(Debug, Clone, Serialize)]
pub struct InfrastructureLine {
    pub id: LineId,
    pub kind: InfraKind,
    pub points: Vec<LonLat>,
    pub seeds: Vec<CellId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassTrigger {
    Initial,
    Draw,
    Edit,
    Delete,
    Parameters,
}

#[derive(Debug, Clone, Serialize)]
pub struct PassSummary {
    pub pass: u64,
    pub trigger: PassTrigger,
    pub kind: Option<InfraKind>,
    pub line: Option<LineId>,
    pub seeds: usize,
    pub updated: usize,
    pub producing: usize,
    pub total_output: f64,
    pub total_profit: f64,
    pub duration_ms: f64,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no infrastructure line with id {0}")]
    UnknownLine(u64),
    #[error("sampling interval must be at least 0.01 km and hop increment positive")]
    InvalidSettings,
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Owns the working grid for one simulation. Every mutating call runs a
/// complete pass and publishes a fresh [`GridSnapshot`].
pub struct Engine {
    grid: HexGrid,
    lines: BTreeMap<LineId, InfrastructureLine>,
    next_line: u64,
    params: ParameterSet,
    model: Box<dyn Model>,
    settings: EngineSettings,
    pass: u64,
    published: Arc<GridSnapshot>,
}

impl Engine {
    /// Evaluates the grid once so the first snapshot already carries
    /// derived attributes; fails if the model cannot resolve `params`.
    pub fn new(
        grid: HexGrid,
        params: ParameterSet,
        model: impl Model + 'static,
        settings: EngineSettings,
    ) -> Result<Self, EngineError> {
        let valid = |v: f64, min: f64| v >= min && v > 0.0 && v.is_finite();
        if !valid(settings.sample_interval_km, MIN_INTERVAL_KM) || !valid(settings.hop_km, 0.0) {
            return Err(EngineError::InvalidSettings);
        }
        let published = Arc::new(GridSnapshot::new(0, grid.clone()));
        let mut engine = Self {
            grid,
            lines: BTreeMap::new(),
            next_line: 0,
            params,
            model: Box::new(model),
            settings,
            pass: 0,
            published,
        };
        engine.run_pass(PassTrigger::Initial, None, None, PropagationStats::default(), Instant::now())?;
        Ok(engine)
    }

    pub fn settings(&self) -> EngineSettings {
        self.settings
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn lines(&self) -> impl Iterator<Item = &InfrastructureLine> + '_ {
        self.lines.values()
    }

    pub fn line(&self, id: LineId) -> Option<&InfrastructureLine> {
        self.lines.get(&id)
    }

    /// Latest published snapshot; stays valid and unchanged across later passes.
    pub fn snapshot(&self) -> Arc<GridSnapshot> {
        Arc::clone(&self.published)
    }

    pub fn draw_line(&mut self, kind: InfraKind, points: Vec<LonLat>) -> Result<(LineId, PassSummary), EngineError> {
        let started = Instant::now();
        let seeds = self.sample(kind, &points);
        let id = LineId(self.next_line);
        self.next_line += 1;
        let stats = propagate::propagate(&mut self.grid, &seeds, kind, 0.0, self.settings.hop_km);
        self.lines.insert(
            id,
            InfrastructureLine {
                id,
                kind,
                points,
                seeds,
            },
        );
        let summary = self.run_pass(PassTrigger::Draw, Some(kind), Some(id), stats, started)?;
        Ok((id, summary))
    }

    /// Replaces a line's geometry. The edit may move the line away from cells
    /// it used to serve, so the line's distance attribute is rebuilt.
    pub fn update_line(&mut self, id: LineId, points: Vec<LonLat>) -> Result<PassSummary, EngineError> {
        let started = Instant::now();
        let kind = self.lines.get(&id).ok_or(EngineError::UnknownLine(id.0))?.kind;
        let seeds = self.sample(kind, &points);
        let line = self.lines.get_mut(&id).ok_or(EngineError::UnknownLine(id.0))?;
        line.points = points;
        line.seeds = seeds;
        let stats = self.recompute(kind);
        self.run_pass(PassTrigger::Edit, Some(kind), Some(id), stats, started)
    }

    pub fn delete_line(&mut self, id: LineId) -> Result<PassSummary, EngineError> {
        let started = Instant::now();
        let line = self.lines.remove(&id).ok_or(EngineError::UnknownLine(id.0))?;
        let stats = self.recompute(line.kind);
        self.run_pass(PassTrigger::Delete, Some(line.kind), Some(id), stats, started)
    }

    pub fn set_param(&mut self, id: &str, value: f64) -> Result<PassSummary, EngineError> {
        self.set_params([(id, value)])
    }

    /// Applies all values or none, then re-evaluates. Distances are untouched.
    pub fn set_params<'a>(
        &mut self,
        values: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Result<PassSummary, EngineError> {
        let started = Instant::now();
        let mut next = self.params.clone();
        next.set_all(values)?;
        let previous = std::mem::replace(&mut self.params, next);
        match self.run_pass(PassTrigger::Parameters, None, None, PropagationStats::default(), started) {
            Ok(summary) => Ok(summary),
            Err(err) => {
                self.params = previous;
                Err(err)
            }
        }
    }

    /// Cells under `points`. A line that misses the grid entirely is kept
    /// but seeds nothing.
    fn sample(&self, kind: InfraKind, points: &[LonLat]) -> Vec<CellId> {
        let seeds = sampler::sample_line(&self.grid, points, self.settings.sample_interval_km);
        if seeds.is_empty() {
            tracing::warn!(
                target: "hexsite::engine",
                kind = %kind,
                points = points.len(),
                "line.outside_grid"
            );
        }
        seeds
    }

    /// Resets `kind` to unreached and propagates again from the seeds of
    /// every remaining line of that kind.
    fn recompute(&mut self, kind: InfraKind) -> PropagationStats {
        let mut seeds: Vec<CellId> = self
            .lines
            .values()
            .filter(|line| line.kind == kind)
            .flat_map(|line| line.seeds.iter().copied())
            .collect();
        seeds.sort_unstable();
        seeds.dedup();
        propagate::recompute(&mut self.grid, &seeds, kind, self.settings.hop_km)
    }

    fn run_pass(
        &mut self,
        trigger: PassTrigger,
        kind: Option<InfraKind>,
        line: Option<LineId>,
        propagation: PropagationStats,
        started: Instant,
    ) -> Result<PassSummary, EngineError> {
        let evaluation: EvaluationStats = self.model.evaluate(&mut self.grid, &self.params)?;
        self.pass += 1;
        self.published = Arc::new(GridSnapshot::new(self.pass, self.grid.clone()));

        let summary = PassSummary {
            pass: self.pass,
            trigger,
            kind,
            line,
            seeds: propagation.seeds,
            updated: propagation.updated,
            producing: evaluation.producing,
            total_output: evaluation.total_output,
            total_profit: evaluation.total_profit,
            duration_ms: started.elapsed().as_secs_f64() * 1_000.0,
        };
        tracing::info!(
            target: "hexsite::engine",
            pass = summary.pass,
            trigger = ?summary.trigger,
            kind = ?summary.kind,
            seeds = summary.seeds,
            updated = summary.updated,
            producing = summary.producing,
            duration_ms = summary.duration_ms,
            "pass.completed"
        );
        Ok(summary)
    }
}
