//! Protocol configuration shared by every node in a run.

use gossipsim_types::{NodeIndex, Tick};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Rejected configuration values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown dissemination mode id {0}")]
    UnknownMode(u32),

    #[error("unknown probability function id {0}")]
    UnknownProbabilityFunction(u32),

    #[error("{name} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Forwarding probability as a function of a peer's advertised degree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbabilityFunction {
    /// `1 / degree^c`
    InversePower,
    /// `1 / ln(c * degree)`
    InverseLog,
}

impl ProbabilityFunction {
    pub fn from_id(id: u32) -> Result<Self, ConfigError> {
        match id {
            1 => Ok(ProbabilityFunction::InversePower),
            2 => Ok(ProbabilityFunction::InverseLog),
            other => Err(ConfigError::UnknownProbabilityFunction(other)),
        }
    }

    /// Probability in `[0, 1]`. Anything the formula yields outside that
    /// range (negative, above one, NaN, infinite) becomes 1.
    pub fn probability(self, degree: u32, coefficient: f64) -> f64 {
        let degree = f64::from(degree);
        let p = match self {
            ProbabilityFunction::InversePower => 1.0 / degree.powf(coefficient),
            ProbabilityFunction::InverseLog => 1.0 / (coefficient * degree).ln(),
        };
        if (0.0..=1.0).contains(&p) {
            p
        } else {
            1.0
        }
    }
}

/// Relay strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisseminationMode {
    /// Flood to every neighbor, gated once per relay by `threshold` percent.
    Broadcast { threshold: f64 },
    /// Independent per-neighbor coin with `threshold` percent.
    FixedProbability { threshold: f64 },
    /// Per-neighbor coin weighted by the neighbor's advertised degree.
    DegreeDependent {
        function: ProbabilityFunction,
        coefficient: f64,
    },
    /// Three distinct neighbors, or everyone when poorly connected.
    FixedFanout,
    /// Hop-count stem phase followed by flooding.
    Dandelion { stem_steps: u32 },
    /// Per-node, per-epoch stem/fluff choice.
    DandelionPlusPlus { stem_steps: u32 },
}

/// Raw numeric parameters as they arrive from the environment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModeParameters {
    pub broadcast_threshold: f64,
    pub fixed_threshold: f64,
    pub probability_function: u32,
    pub function_coefficient: f64,
    pub stem_steps: u32,
}

impl Default for ModeParameters {
    fn default() -> Self {
        Self {
            broadcast_threshold: 100.0,
            fixed_threshold: 50.0,
            probability_function: 1,
            function_coefficient: 1.0,
            stem_steps: 5,
        }
    }
}

impl DisseminationMode {
    /// Builds a mode from its numeric id.
    ///
    /// | id | mode |
    /// |----|------|
    /// | 0 | broadcast |
    /// | 1 | fixed probability |
    /// | 2 | degree dependent |
    /// | 3 | fixed fanout |
    /// | 4 | Dandelion |
    /// | 5 | Dandelion++ |
    pub fn from_id(id: u32, params: &ModeParameters) -> Result<Self, ConfigError> {
        Ok(match id {
            0 => DisseminationMode::Broadcast {
                threshold: params.broadcast_threshold,
            },
            1 => DisseminationMode::FixedProbability {
                threshold: params.fixed_threshold,
            },
            2 => DisseminationMode::DegreeDependent {
                function: ProbabilityFunction::from_id(params.probability_function)?,
                coefficient: params.function_coefficient,
            },
            3 => DisseminationMode::FixedFanout,
            4 => DisseminationMode::Dandelion {
                stem_steps: params.stem_steps,
            },
            5 => DisseminationMode::DandelionPlusPlus {
                stem_steps: params.stem_steps,
            },
            other => return Err(ConfigError::UnknownMode(other)),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            DisseminationMode::Broadcast { .. } => "broadcast",
            DisseminationMode::FixedProbability { .. } => "fixed-probability",
            DisseminationMode::DegreeDependent { .. } => "degree-dependent",
            DisseminationMode::FixedFanout => "fixed-fanout",
            DisseminationMode::Dandelion { .. } => "dandelion",
            DisseminationMode::DandelionPlusPlus { .. } => "dandelion++",
        }
    }

    /// Stem length for the Dandelion family.
    pub fn stem_steps(&self) -> Option<u32> {
        match self {
            DisseminationMode::Dandelion { stem_steps }
            | DisseminationMode::DandelionPlusPlus { stem_steps } => Some(*stem_steps),
            _ => None,
        }
    }

    pub fn is_dandelion_family(&self) -> bool {
        self.stem_steps().is_some()
    }
}

/// Core-and-periphery variant of the churn model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HierarchyMode {
    #[default]
    Flat,
    /// Nodes `0..core_size` never churn and attract new attachments.
    Core { core_size: u32 },
}

impl HierarchyMode {
    pub fn is_core(self, id: NodeIndex) -> bool {
        match self {
            HierarchyMode::Flat => false,
            HierarchyMode::Core { core_size } => id < core_size,
        }
    }

    /// Subtracted from the churn deactivation threshold.
    pub fn deactivation_offset(self) -> f64 {
        match self {
            HierarchyMode::Flat => 0.0,
            HierarchyMode::Core { .. } => 1.0,
        }
    }

    /// Possibly replaces an attachment candidate with a core node.
    ///
    /// Draws from `[0, 5 * core_size)`; below `2 * core_size` (before
    /// stabilization) or `core_size` (after) the draw picks a core node.
    pub fn redirect_attachment(
        self,
        rng: &mut ChaCha8Rng,
        now: Tick,
        stabilization_tick: Tick,
    ) -> Option<NodeIndex> {
        let HierarchyMode::Core { core_size } = self else {
            return None;
        };
        if core_size == 0 {
            return None;
        }
        let draw = rng.gen_range(0..core_size * 5);
        let bound = if now < stabilization_tick {
            core_size * 2
        } else {
            core_size
        };
        (draw < bound).then_some(draw % core_size)
    }
}

/// Protocol parameters, identical for every node.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtocolConfig {
    pub mode: DisseminationMode,
    /// Epoch length and initial request TTL.
    pub max_ttl: u16,
    /// Steady-state percentage of active nodes, in `(0, 100)`.
    pub active_target_percent: u32,
    /// Inclusive range of new connections per attachment.
    pub attach_min: u32,
    pub attach_max: u32,
    /// Tick of the initial deactivation pass. Topology is loaded one tick later.
    pub building_step: Tick,
    /// No rounds are counted and no recovery runs before this tick.
    pub stabilization_tick: Tick,
    pub hierarchy: HierarchyMode,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            mode: DisseminationMode::Broadcast { threshold: 100.0 },
            max_ttl: 20,
            active_target_percent: 50,
            attach_min: 5,
            attach_max: 10,
            building_step: 1,
            stabilization_tick: 400,
            hierarchy: HierarchyMode::Flat,
        }
    }
}

impl ProtocolConfig {
    pub fn new(mode: DisseminationMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn with_max_ttl(mut self, max_ttl: u16) -> Self {
        self.max_ttl = max_ttl;
        self
    }

    pub fn with_active_target(mut self, percent: u32) -> Self {
        self.active_target_percent = percent;
        self
    }

    pub fn with_attach_range(mut self, min: u32, max: u32) -> Self {
        self.attach_min = min;
        self.attach_max = max;
        self
    }

    pub fn with_building_step(mut self, tick: Tick) -> Self {
        self.building_step = tick;
        self
    }

    pub fn with_stabilization_tick(mut self, tick: Tick) -> Self {
        self.stabilization_tick = tick;
        self
    }

    pub fn with_hierarchy(mut self, hierarchy: HierarchyMode) -> Self {
        self.hierarchy = hierarchy;
        self
    }

    pub fn max_ttl_ticks(&self) -> Tick {
        Tick::from(self.max_ttl)
    }

    /// Position of `now` within its epoch.
    pub fn epoch_offset(&self, now: Tick) -> Tick {
        now % self.max_ttl_ticks()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("max_ttl", f64::from(self.max_ttl), 1.0, f64::from(u16::MAX))?;
        check_range(
            "active_target_percent",
            f64::from(self.active_target_percent),
            1.0,
            99.0,
        )?;
        check_range(
            "attach_min",
            f64::from(self.attach_min),
            1.0,
            f64::from(self.attach_max),
        )?;
        match self.mode {
            DisseminationMode::Broadcast { threshold } => {
                check_range("broadcast_threshold", threshold, 0.0, 100.0)?
            }
            DisseminationMode::FixedProbability { threshold } => {
                check_range("fixed_threshold", threshold, 0.0, 100.0)?
            }
            DisseminationMode::DegreeDependent { coefficient, .. } => {
                check_range("function_coefficient", coefficient, 0.0, f64::MAX)?
            }
            DisseminationMode::FixedFanout => {}
            DisseminationMode::Dandelion { stem_steps }
            | DisseminationMode::DandelionPlusPlus { stem_steps } => check_range(
                "stem_steps",
                f64::from(stem_steps),
                0.0,
                f64::from(self.max_ttl),
            )?,
        }
        Ok(())
    }
}

fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_nan() || value < min || value > max {
        return Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}
