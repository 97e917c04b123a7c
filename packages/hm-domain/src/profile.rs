use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TechDepth {
	#[default]
	None,
	Basic,
	Working,
	Strong,
	Expert,
}
impl TechDepth {
	pub fn rank(self) -> u8 {
		match self {
			Self::None => 0,
			Self::Basic => 1,
			Self::Working => 2,
			Self::Strong => 3,
			Self::Expert => 4,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::None => "none",
			Self::Basic => "basic",
			Self::Working => "working",
			Self::Strong => "strong",
			Self::Expert => "expert",
		}
	}
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TriState {
	Yes,
	No,
	#[default]
	Unknown,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchitectureStyle {
	Microservices,
	Monolith,
	EventDriven,
	#[default]
	Unknown,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainImportance {
	None,
	Helpful,
	Important,
	Critical,
	#[default]
	Unknown,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainDepth {
	Low,
	Medium,
	High,
}
impl DomainDepth {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Low => "low",
			Self::Medium => "medium",
			Self::High => "high",
		}
	}
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAuthority {
	Executor,
	Contributor,
	TechnicalLead,
	Architect,
	#[default]
	Unknown,
}
impl DecisionAuthority {
	pub fn rank(self) -> Option<u8> {
		match self {
			Self::Executor => Some(0),
			Self::Contributor => Some(1),
			Self::TechnicalLead => Some(2),
			Self::Architect => Some(3),
			Self::Unknown => None,
		}
	}
}

/// Shared by hands-on level, system complexity, and interview confidence.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
	Low,
	Medium,
	High,
	#[default]
	Unknown,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TechRequirement {
	pub name: String,
	pub depth: TechDepth,
	#[serde(default)]
	pub mandatory: bool,
}
impl TechRequirement {
	pub fn core(name: impl Into<String>, depth: TechDepth) -> Self {
		Self { name: name.into(), depth, mandatory: true }
	}

	pub fn secondary(name: impl Into<String>, depth: TechDepth) -> Self {
		Self { name: name.into(), depth, mandatory: false }
	}
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct TechMap {
	pub core: Vec<TechRequirement>,
	pub secondary: Vec<TechRequirement>,
}
impl TechMap {
	pub fn entries(&self) -> impl Iterator<Item = &TechRequirement> {
		self.core.iter().chain(self.secondary.iter())
	}

	pub fn is_empty(&self) -> bool {
		self.core.is_empty() && self.secondary.is_empty()
	}
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ArchitectureRequirement {
	pub style: ArchitectureStyle,
	pub distributed: TriState,
	pub high_load: TriState,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct DomainRequirement {
	pub importance: DomainImportance,
	pub primary_domain: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct OwnershipRequirement {
	pub decision_authority: DecisionAuthority,
	pub production_responsibility: bool,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct JobProfile {
	pub title: String,
	pub product_context: String,
	pub work_scope: String,
	pub tech: TechMap,
	pub architecture: ArchitectureRequirement,
	pub domain: DomainRequirement,
	pub ownership: OwnershipRequirement,
	pub constraints: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct SkillDepth {
	pub deep: Vec<String>,
	pub working: Vec<String>,
	pub mentioned: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TechSignal {
	pub name: String,
	pub confidence: f32,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DomainExpertise {
	pub domain: String,
	pub depth: DomainDepth,
	#[serde(default)]
	pub confidence: f32,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct ArchitectureSignals {
	pub microservices: bool,
	pub monolith: bool,
	pub event_driven: bool,
	pub distributed: bool,
	pub high_load: bool,
}
impl ArchitectureSignals {
	pub fn supports(&self, style: ArchitectureStyle) -> Option<bool> {
		match style {
			ArchitectureStyle::Microservices => Some(self.microservices),
			ArchitectureStyle::Monolith => Some(self.monolith),
			ArchitectureStyle::EventDriven => Some(self.event_driven),
			ArchitectureStyle::Unknown => None,
		}
	}
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct OwnershipSignals {
	pub production_responsibility: bool,
	pub architecture_decisions: bool,
	pub team_leadership: bool,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct CandidateResumeAnalysis {
	pub primary_direction: String,
	pub seniority: String,
	pub decision_authority: DecisionAuthority,
	pub hands_on: Level,
	pub skills: SkillDepth,
	pub core_technologies: Vec<TechSignal>,
	pub domains: Vec<DomainExpertise>,
	pub architecture: ArchitectureSignals,
	pub ownership: OwnershipSignals,
	pub system_complexity: Level,
	pub impact_highlights: Vec<String>,
	pub current_focus: String,
	pub risk_flags: Vec<String>,
	pub interview_confidence: Level,
}
impl CandidateResumeAnalysis {
	/// Every technology name the analysis mentions, across all buckets.
	pub fn technology_names(&self) -> impl Iterator<Item = &str> {
		self.skills
			.deep
			.iter()
			.chain(self.skills.working.iter())
			.chain(self.skills.mentioned.iter())
			.map(String::as_str)
			.chain(self.core_technologies.iter().map(|signal| signal.name.as_str()))
	}
}

/// The intake pipeline classifies a resume before analysing it; only technical resumes are
/// scored.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResumeAnalysis {
	Technical(CandidateResumeAnalysis),
	NonTechnical { reason: String },
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CandidateMatchSource {
	pub searchable_text: String,
	pub resume_analysis: ResumeAnalysis,
	pub technical_summary: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
	Active,
	Inactive,
}
impl JobStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Active => "active",
			Self::Inactive => "inactive",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw.trim().to_ascii_lowercase().as_str() {
			"active" => Some(Self::Active),
			"inactive" => Some(Self::Inactive),
			_ => None,
		}
	}
}
