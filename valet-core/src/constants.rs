/// Valet system version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The scope shared by every sub-agent. Facts and rules stored here are
/// visible from any requested scope; episodes may never use it.
pub const GLOBAL_SCOPE: &str = "global";

/// Effective confidence below this moves an active row to `fading`.
pub const FADING_THRESHOLD: f64 = 0.2;

/// Effective confidence below this moves a row to `expired`.
pub const EXPIRED_THRESHOLD: f64 = 0.05;

/// Decay rate (per day) applied to rules. Rules carry no permanence
/// class; they decay like a `standard` fact.
pub const RULE_DECAY_RATE: f64 = 0.01;

/// Confidence assigned to every freshly stored rule.
pub const INITIAL_RULE_CONFIDENCE: f64 = 0.5;

/// RRF smoothing constant. Fixed by design, not a tunable.
pub const RRF_K: u32 = 60;

/// Weight applied to harmful outcomes in the effectiveness formula.
pub const HARMFUL_WEIGHT: f64 = 4.0;

/// Denominator epsilon so zero-application rules score 0, not NaN.
pub const EFFECTIVENESS_EPSILON: f64 = 0.01;

/// candidate → established: minimum successes and effectiveness.
pub const ESTABLISHED_MIN_SUCCESSES: u64 = 5;
pub const ESTABLISHED_MIN_EFFECTIVENESS: f64 = 0.6;

/// established → proven: minimum successes, effectiveness, and age.
pub const PROVEN_MIN_SUCCESSES: u64 = 15;
pub const PROVEN_MIN_EFFECTIVENESS: f64 = 0.8;
pub const PROVEN_MIN_AGE_DAYS: i64 = 30;

/// Anti-pattern inversion: at least this many harmful outcomes and
/// effectiveness below the ceiling.
pub const ANTI_PATTERN_MIN_HARMFUL: u64 = 3;
pub const ANTI_PATTERN_MAX_EFFECTIVENESS: f64 = 0.3;
