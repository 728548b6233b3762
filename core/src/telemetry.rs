use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Resolution of a single player action.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// The player struck the intended target.
    Hit,
    /// The player acted but missed or struck the wrong target.
    Miss,
    /// The target expired before the player reacted.
    Timeout,
    /// The player struck a bomb.
    Bomb,
}

impl Outcome {
    /// Reports whether the outcome counts as a success.
    #[must_use]
    pub const fn is_hit(self) -> bool {
        matches!(self, Self::Hit)
    }
}

/// Category of the target the outcome refers to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// Regular scoring target.
    #[default]
    Normal,
    /// Target that must be ignored.
    Decoy,
    /// Hazard that must be avoided.
    Bomb,
    /// Pickup that restores health.
    Heal,
    /// Pickup that grants a shield.
    Shield,
    /// Boss weak point.
    Boss,
}

impl TargetKind {
    /// Hazardous kinds penalise the player when struck.
    #[must_use]
    pub const fn is_hazard(self) -> bool {
        matches!(self, Self::Bomb | Self::Decoy)
    }

    /// Support kinds help a struggling player.
    #[must_use]
    pub const fn is_support(self) -> bool {
        matches!(self, Self::Heal | Self::Shield)
    }
}

/// Coarse progression phase of a play session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Opening section of the session.
    #[default]
    Early,
    /// Middle section of the session.
    Mid,
    /// Closing section, usually with the boss.
    Late,
}

impl Phase {
    /// Phase position normalised to `[0, 1]`.
    #[must_use]
    pub const fn normalized(self) -> f64 {
        match self {
            Self::Early => 0.0,
            Self::Mid => 0.5,
            Self::Late => 1.0,
        }
    }
}

/// Failure to parse a [`Phase`] from its textual form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsePhaseError(String);

impl fmt::Display for ParsePhaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown phase `{}`", self.0)
    }
}

impl std::error::Error for ParsePhaseError {}

impl FromStr for Phase {
    type Err = ParsePhaseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "early" | "1" => Ok(Self::Early),
            "mid" | "2" => Ok(Self::Mid),
            "late" | "3" | "boss" => Ok(Self::Late),
            other => Err(ParsePhaseError(other.to_owned())),
        }
    }
}

/// Telemetry record produced by the game loop once per resolved player action.
///
/// Fields are private so that readers always see sanitised values: invalid
/// reaction times read as absent and health is clamped to `[0, 1]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutcomeEvent {
    t_ms: u64,
    outcome: Outcome,
    reaction_time_ms: Option<f64>,
    target_kind: TargetKind,
    zone_id: u8,
    phase: Phase,
    player_hp: f64,
    fever_active: bool,
}

impl OutcomeEvent {
    /// Creates an event for a normal target at full health with no reaction time.
    #[must_use]
    pub const fn new(t_ms: u64, outcome: Outcome) -> Self {
        Self {
            t_ms,
            outcome,
            reaction_time_ms: None,
            target_kind: TargetKind::Normal,
            zone_id: 0,
            phase: Phase::Early,
            player_hp: 1.0,
            fever_active: false,
        }
    }

    /// Attaches the measured reaction time.
    #[must_use]
    pub fn with_reaction_time(mut self, reaction_time_ms: f64) -> Self {
        self.reaction_time_ms = Some(reaction_time_ms);
        self
    }

    /// Sets the kind of target the outcome refers to.
    #[must_use]
    pub fn with_target(mut self, target_kind: TargetKind) -> Self {
        self.target_kind = target_kind;
        self
    }

    /// Sets the spatial zone in which the target appeared.
    #[must_use]
    pub fn with_zone(mut self, zone_id: u8) -> Self {
        self.zone_id = zone_id;
        self
    }

    /// Sets the session phase during which the outcome happened.
    #[must_use]
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = phase;
        self
    }

    /// Sets the player's health fraction at resolution time.
    #[must_use]
    pub fn with_player_hp(mut self, player_hp: f64) -> Self {
        self.player_hp = player_hp;
        self
    }

    /// Marks whether fever mode was active.
    #[must_use]
    pub fn with_fever(mut self, fever_active: bool) -> Self {
        self.fever_active = fever_active;
        self
    }

    /// Timestamp of the resolution in session milliseconds.
    #[must_use]
    pub const fn t_ms(&self) -> u64 {
        self.t_ms
    }

    /// Resolution of the action.
    #[must_use]
    pub const fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Reaction time when present, finite and non-negative.
    #[must_use]
    pub fn reaction_time_ms(&self) -> Option<f64> {
        self.reaction_time_ms
            .filter(|value| value.is_finite() && *value >= 0.0)
    }

    /// Reports whether a reaction time was supplied but had to be discarded.
    #[must_use]
    pub fn has_invalid_reaction_time(&self) -> bool {
        self.reaction_time_ms.is_some() && self.reaction_time_ms().is_none()
    }

    /// Kind of target involved.
    #[must_use]
    pub const fn target_kind(&self) -> TargetKind {
        self.target_kind
    }

    /// Spatial zone identifier.
    #[must_use]
    pub const fn zone_id(&self) -> u8 {
        self.zone_id
    }

    /// Session phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Health fraction clamped to `[0, 1]`; non-finite values read as full health.
    #[must_use]
    pub fn player_hp(&self) -> f64 {
        if self.player_hp.is_finite() {
            self.player_hp.clamp(0.0, 1.0)
        } else {
            1.0
        }
    }

    /// Whether fever mode was active.
    #[must_use]
    pub const fn fever_active(&self) -> bool {
        self.fever_active
    }
}

/// Derived statistics over the rolling telemetry window.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Number of events in the window.
    pub samples: usize,
    /// Share of hits, `1 - miss_rate`; zero when empty.
    pub accuracy: f64,
    /// Share of non-hit outcomes.
    pub miss_rate: f64,
    /// Share of timeouts.
    pub timeout_rate: f64,
    /// Share of bomb strikes.
    pub bomb_rate: f64,
    /// Share of failed decoy targets.
    pub decoy_rate: f64,
    /// Mean of valid reaction times.
    pub rt_mean: Option<f64>,
    /// Population standard deviation of valid reaction times.
    pub rt_std: Option<f64>,
    /// Mean of the later half of reaction times minus the earlier half; positive means slowing.
    pub rt_trend: Option<f64>,
    /// Heuristic fatigue estimate in `[0, 1]`.
    pub fatigue_heuristic: f64,
    /// Reaction time consistency in `[0, 1]`.
    pub stability: f64,
    /// Whether the newest event reported low health.
    pub low_hp: bool,
}

impl Stats {
    /// Neutral statistics reported for an empty window.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            samples: 0,
            accuracy: 0.0,
            miss_rate: 0.0,
            timeout_rate: 0.0,
            bomb_rate: 0.0,
            decoy_rate: 0.0,
            rt_mean: None,
            rt_std: None,
            rt_trend: None,
            fatigue_heuristic: 0.0,
            stability: 1.0,
            low_hp: false,
        }
    }

    /// Reports whether the window held no samples.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.samples == 0
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::empty()
    }
}
