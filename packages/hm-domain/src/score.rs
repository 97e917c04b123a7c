use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const CORE_TECH_CAP: f64 = 35.0;
pub const DOMAIN_CAP: f64 = 20.0;
pub const OWNERSHIP_CAP: f64 = 15.0;
pub const ARCHITECTURE_CAP: f64 = 15.0;
pub const CHALLENGE_CAP: f64 = 15.0;
pub const MAX_TOTAL: f64 = 100.0;
pub const MAX_REASONS: usize = 5;

const TOTAL_TOLERANCE: f64 = 0.005;

/// The five sub-scores. Each component stays inside `[0, cap]`; the total is derived, never
/// stored.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "BreakdownRepr")]
pub struct ScoreBreakdown {
	core_tech_depth: f64,
	domain_alignment: f64,
	ownership_alignment: f64,
	architecture_scale_alignment: f64,
	challenge_alignment: f64,
}
impl ScoreBreakdown {
	pub fn new(
		core_tech_depth: f64,
		domain_alignment: f64,
		ownership_alignment: f64,
		architecture_scale_alignment: f64,
		challenge_alignment: f64,
	) -> Result<Self> {
		for (label, value, cap) in [
			("coreTechDepth", core_tech_depth, CORE_TECH_CAP),
			("domainAlignment", domain_alignment, DOMAIN_CAP),
			("ownershipAlignment", ownership_alignment, OWNERSHIP_CAP),
			("architectureScaleAlignment", architecture_scale_alignment, ARCHITECTURE_CAP),
			("challengeAlignment", challenge_alignment, CHALLENGE_CAP),
		] {
			if !value.is_finite() || !(0.0..=cap).contains(&value) {
				return Err(Error::InvariantViolation {
					message: format!("{label} must be within 0-{cap}; got {value}."),
				});
			}
		}

		Ok(Self {
			core_tech_depth,
			domain_alignment,
			ownership_alignment,
			architecture_scale_alignment,
			challenge_alignment,
		})
	}

	/// Clamps each raw component into its range and rounds to two decimals. Non-finite input
	/// collapses to zero.
	pub fn clamped(
		core_tech_depth: f64,
		domain_alignment: f64,
		ownership_alignment: f64,
		architecture_scale_alignment: f64,
		challenge_alignment: f64,
	) -> Self {
		Self {
			core_tech_depth: clamp_component(core_tech_depth, CORE_TECH_CAP),
			domain_alignment: clamp_component(domain_alignment, DOMAIN_CAP),
			ownership_alignment: clamp_component(ownership_alignment, OWNERSHIP_CAP),
			architecture_scale_alignment: clamp_component(
				architecture_scale_alignment,
				ARCHITECTURE_CAP,
			),
			challenge_alignment: clamp_component(challenge_alignment, CHALLENGE_CAP),
		}
	}

	pub fn core_tech_depth(&self) -> f64 {
		self.core_tech_depth
	}

	pub fn domain_alignment(&self) -> f64 {
		self.domain_alignment
	}

	pub fn ownership_alignment(&self) -> f64 {
		self.ownership_alignment
	}

	pub fn architecture_scale_alignment(&self) -> f64 {
		self.architecture_scale_alignment
	}

	pub fn challenge_alignment(&self) -> f64 {
		self.challenge_alignment
	}

	pub fn sum(&self) -> f64 {
		self.core_tech_depth
			+ self.domain_alignment
			+ self.ownership_alignment
			+ self.architecture_scale_alignment
			+ self.challenge_alignment
	}

	pub fn total(&self) -> f64 {
		self.sum().clamp(0.0, MAX_TOTAL)
	}
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BreakdownRepr {
	core_tech_depth: f64,
	domain_alignment: f64,
	ownership_alignment: f64,
	architecture_scale_alignment: f64,
	challenge_alignment: f64,
}
impl TryFrom<BreakdownRepr> for ScoreBreakdown {
	type Error = Error;

	fn try_from(repr: BreakdownRepr) -> Result<Self> {
		Self::new(
			repr.core_tech_depth,
			repr.domain_alignment,
			repr.ownership_alignment,
			repr.architecture_scale_alignment,
			repr.challenge_alignment,
		)
	}
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchReasons {
	pub top_matches: Vec<String>,
	pub top_gaps: Vec<String>,
	pub risks: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HardFilterVerdict {
	Passed,
	/// Every failed rule, in evaluation order. Never empty.
	Failed { failures: Vec<String> },
}
impl HardFilterVerdict {
	pub fn from_failures(failures: Vec<String>) -> Self {
		if failures.is_empty() { Self::Passed } else { Self::Failed { failures } }
	}

	pub fn passed(&self) -> bool {
		matches!(self, Self::Passed)
	}

	pub fn failures(&self) -> &[String] {
		match self {
			Self::Passed => &[],
			Self::Failed { failures } => failures,
		}
	}
}

/// Result of scoring one (job, candidate) pair. Built once and never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "MatchScoreRepr", try_from = "MatchScoreRepr")]
pub struct MatchScore {
	breakdown: ScoreBreakdown,
	verdict: HardFilterVerdict,
	reasons: MatchReasons,
}
impl MatchScore {
	pub fn new(
		breakdown: ScoreBreakdown,
		verdict: HardFilterVerdict,
		reasons: MatchReasons,
	) -> Result<Self> {
		if let HardFilterVerdict::Failed { failures } = &verdict
			&& failures.is_empty()
		{
			return Err(Error::InvariantViolation {
				message: "A failed hard-filter verdict must list at least one failure.".to_string(),
			});
		}

		for (label, items) in [
			("topMatches", &reasons.top_matches),
			("topGaps", &reasons.top_gaps),
			("risks", &reasons.risks),
		] {
			if items.len() > MAX_REASONS {
				return Err(Error::InvariantViolation {
					message: format!("reasons.{label} must hold at most {MAX_REASONS} items."),
				});
			}
		}

		Ok(Self { breakdown, verdict, reasons })
	}

	/// Builds a score that satisfies every invariant by construction: reasons are truncated and
	/// an empty failure list becomes a pass.
	pub(crate) fn assemble(
		breakdown: ScoreBreakdown,
		failures: Vec<String>,
		mut reasons: MatchReasons,
	) -> Self {
		reasons.top_matches.truncate(MAX_REASONS);
		reasons.top_gaps.truncate(MAX_REASONS);
		reasons.risks.truncate(MAX_REASONS);

		Self { breakdown, verdict: HardFilterVerdict::from_failures(failures), reasons }
	}

	pub fn total_score(&self) -> f64 {
		self.breakdown.total()
	}

	pub fn passes_hard_filters(&self) -> bool {
		self.verdict.passed()
	}

	pub fn hard_filter_failures(&self) -> &[String] {
		self.verdict.failures()
	}

	pub fn verdict(&self) -> &HardFilterVerdict {
		&self.verdict
	}

	pub fn breakdown(&self) -> &ScoreBreakdown {
		&self.breakdown
	}

	pub fn reasons(&self) -> &MatchReasons {
		&self.reasons
	}
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MatchScoreRepr {
	total_score: f64,
	pass_hard_filters: bool,
	#[serde(default)]
	hard_filter_failures: Vec<String>,
	breakdown: ScoreBreakdown,
	#[serde(default)]
	reasons: MatchReasons,
}
impl From<MatchScore> for MatchScoreRepr {
	fn from(score: MatchScore) -> Self {
		let total_score = score.total_score();
		let pass_hard_filters = score.passes_hard_filters();
		let hard_filter_failures = match score.verdict {
			HardFilterVerdict::Passed => Vec::new(),
			HardFilterVerdict::Failed { failures } => failures,
		};

		Self {
			total_score,
			pass_hard_filters,
			hard_filter_failures,
			breakdown: score.breakdown,
			reasons: score.reasons,
		}
	}
}
impl TryFrom<MatchScoreRepr> for MatchScore {
	type Error = Error;

	fn try_from(repr: MatchScoreRepr) -> Result<Self> {
		if (repr.total_score - repr.breakdown.total()).abs() > TOTAL_TOLERANCE {
			return Err(Error::InvariantViolation {
				message: format!(
					"totalScore {} does not match the breakdown sum {}.",
					repr.total_score,
					repr.breakdown.total()
				),
			});
		}

		let verdict = match (repr.pass_hard_filters, repr.hard_filter_failures.is_empty()) {
			(true, true) => HardFilterVerdict::Passed,
			(false, false) => HardFilterVerdict::Failed { failures: repr.hard_filter_failures },
			(true, false) => {
				return Err(Error::InvariantViolation {
					message: "passHardFilters is true but hardFilterFailures is not empty."
						.to_string(),
				});
			},
			(false, true) => {
				return Err(Error::InvariantViolation {
					message: "passHardFilters is false but no failure is listed.".to_string(),
				});
			},
		};

		Self::new(repr.breakdown, verdict, repr.reasons)
	}
}

fn clamp_component(value: f64, cap: f64) -> f64 {
	if !value.is_finite() {
		return 0.0;
	}

	round2(value.clamp(0.0, cap))
}

pub(crate) fn round2(value: f64) -> f64 {
	(value * 100.0).round() / 100.0
}
