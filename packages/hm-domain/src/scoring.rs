//! Deterministic job/candidate scoring.
//!
//! Hard filters and the numeric score are computed independently: a high total never rescues a
//! failed hard filter, and a failed hard filter never changes the breakdown.

use std::collections::BTreeSet;

use crate::{
	profile::{
		ArchitectureStyle, CandidateResumeAnalysis, DecisionAuthority, DomainDepth,
		DomainExpertise, DomainImportance, JobProfile, Level, TechDepth, TechRequirement,
		TriState,
	},
	score::{
		ARCHITECTURE_CAP, CHALLENGE_CAP, CORE_TECH_CAP, DOMAIN_CAP, MAX_REASONS, MatchReasons,
		MatchScore, ScoreBreakdown,
	},
	text,
};

const MANDATORY_WEIGHT: f64 = 1.5;
const OPTIONAL_WEIGHT: f64 = 1.0;
const RAW_CONFIDENCE_WORKING: f32 = 0.75;
const CHALLENGE_TEXT_POINTS: f64 = 10.0;
const CHALLENGE_TECH_POINTS: f64 = 5.0;
const NEUTRAL_RATIO: f64 = 0.5;

pub fn score(candidate: &CandidateResumeAnalysis, job: &JobProfile) -> MatchScore {
	let breakdown = ScoreBreakdown::clamped(
		core_tech_depth(candidate, job),
		domain_alignment(candidate, job),
		ownership_alignment(candidate, job),
		architecture_alignment(candidate, job),
		challenge_alignment(candidate, job),
	);

	debug_assert!(
		(breakdown.total() - breakdown.sum().clamp(0.0, 100.0)).abs() < f64::EPSILON,
		"Total must be the clamped breakdown sum."
	);

	let failures = hard_filter_failures(candidate, job);
	let reasons = build_reasons(candidate, job, &failures);

	MatchScore::assemble(breakdown, failures, reasons)
}

/// Candidate depth for one technology: the skill buckets win, then the raw technology list.
pub fn resolve_depth(candidate: &CandidateResumeAnalysis, technology: &str) -> TechDepth {
	let skills = &candidate.skills;
	let bucketed = [
		(&skills.deep, TechDepth::Expert),
		(&skills.working, TechDepth::Strong),
		(&skills.mentioned, TechDepth::Basic),
	]
	.into_iter()
	.filter(|(bucket, _)| bucket.iter().any(|name| text::terms_match(name, technology)))
	.map(|(_, depth)| depth)
	.max();

	if let Some(depth) = bucketed {
		return depth;
	}

	candidate
		.core_technologies
		.iter()
		.filter(|signal| text::terms_match(&signal.name, technology))
		.map(|signal| {
			if signal.confidence >= RAW_CONFIDENCE_WORKING {
				TechDepth::Working
			} else {
				TechDepth::Basic
			}
		})
		.max()
		.unwrap_or(TechDepth::None)
}

pub fn hard_filter_failures(candidate: &CandidateResumeAnalysis, job: &JobProfile) -> Vec<String> {
	let mut failures = Vec::new();

	for requirement in job.tech.entries().filter(|requirement| requirement.mandatory) {
		if resolve_depth(candidate, &requirement.name) == TechDepth::None {
			failures.push(format!("Missing mandatory technology: {}", requirement.name));
		}
	}

	if job.domain.importance == DomainImportance::Critical
		&& let Some(domain) = required_domain(job)
		&& !matching_domain(candidate, domain)
			.map(|entry| entry.depth >= DomainDepth::Medium)
			.unwrap_or(false)
	{
		failures.push(format!("Critical domain experience missing: {domain}"));
	}

	let required_authority = job.ownership.decision_authority;

	if matches!(required_authority, DecisionAuthority::TechnicalLead | DecisionAuthority::Architect)
		&& candidate.decision_authority == DecisionAuthority::Executor
	{
		failures.push(format!(
			"Role requires {} decision authority; candidate works as an executor.",
			authority_label(required_authority)
		));
	}
	if job.ownership.production_responsibility && !candidate.ownership.production_responsibility {
		failures.push("Production responsibility required but not evidenced.".to_string());
	}

	failures
}

fn core_tech_depth(candidate: &CandidateResumeAnalysis, job: &JobProfile) -> f64 {
	let mut earned = 0.0;
	let mut possible = 0.0;

	for requirement in job.tech.entries() {
		let weight = if requirement.mandatory { MANDATORY_WEIGHT } else { OPTIONAL_WEIGHT };

		earned += weight * depth_credit(resolve_depth(candidate, &requirement.name), requirement);
		possible += weight;
	}

	if possible == 0.0 {
		return CORE_TECH_CAP * NEUTRAL_RATIO;
	}

	CORE_TECH_CAP * earned / possible
}

fn depth_credit(actual: TechDepth, requirement: &TechRequirement) -> f64 {
	let actual = actual.rank();
	let required = requirement.depth.rank();

	if actual >= required {
		1.0
	} else if actual > 0 && actual + 1 == required {
		0.5
	} else {
		0.0
	}
}

fn domain_alignment(candidate: &CandidateResumeAnalysis, job: &JobProfile) -> f64 {
	if job.domain.importance == DomainImportance::None {
		return 14.0;
	}

	let Some(domain) = required_domain(job) else {
		return 10.0;
	};
	let depth = matching_domain(candidate, domain).map(|entry| entry.depth);
	let points: f64 = match (job.domain.importance, depth) {
		(DomainImportance::Helpful, Some(DomainDepth::High)) => 20.0,
		(DomainImportance::Helpful, Some(DomainDepth::Medium)) => 17.0,
		(DomainImportance::Helpful, Some(DomainDepth::Low)) => 14.0,
		(DomainImportance::Helpful, None) => 10.0,
		(DomainImportance::Important, Some(DomainDepth::High)) => 20.0,
		(DomainImportance::Important, Some(DomainDepth::Medium)) => 16.0,
		(DomainImportance::Important, Some(DomainDepth::Low)) => 10.0,
		(DomainImportance::Important, None) => 4.0,
		(DomainImportance::Critical, Some(DomainDepth::High)) => 20.0,
		(DomainImportance::Critical, Some(DomainDepth::Medium)) => 14.0,
		(DomainImportance::Critical, Some(DomainDepth::Low)) => 4.0,
		(DomainImportance::Critical, None) => 0.0,
		(DomainImportance::Unknown, Some(DomainDepth::High | DomainDepth::Medium)) => 14.0,
		(DomainImportance::Unknown, Some(DomainDepth::Low)) => 12.0,
		(DomainImportance::Unknown, None) => 10.0,
		(DomainImportance::None, _) => 14.0,
	};

	points.min(DOMAIN_CAP)
}

fn ownership_alignment(candidate: &CandidateResumeAnalysis, job: &JobProfile) -> f64 {
	let authority_points: f64 = match (
		job.ownership.decision_authority.rank(),
		candidate.decision_authority.rank(),
	) {
		(Some(required), Some(actual)) => match required.abs_diff(actual) {
			0 => 12.0,
			1 => 9.0,
			2 => 5.0,
			_ => 2.0,
		},
		_ => 7.0,
	};
	let hands_on: f64 = match candidate.hands_on {
		Level::High => 2.0,
		Level::Medium => 1.0,
		Level::Low => -1.0,
		Level::Unknown => 0.0,
	};
	let production: f64 = match (
		job.ownership.production_responsibility,
		candidate.ownership.production_responsibility,
	) {
		(false, _) | (true, true) => 1.0,
		(true, false) => -2.0,
	};

	authority_points + hands_on + production
}

fn architecture_alignment(candidate: &CandidateResumeAnalysis, job: &JobProfile) -> f64 {
	let signals = &candidate.architecture;
	let style: f64 = match job.architecture.style {
		ArchitectureStyle::Unknown => 2.0,
		style => match signals.supports(style) {
			Some(true) => 4.0,
			Some(false) | None => 0.0,
		},
	};
	let distributed = flag_points(job.architecture.distributed, signals.distributed);
	let high_load = flag_points(job.architecture.high_load, signals.high_load);
	let complexity: f64 = match candidate.system_complexity {
		Level::High => 3.0,
		Level::Medium => 2.0,
		Level::Low | Level::Unknown => 1.0,
	};

	(style + distributed + high_load + complexity).min(ARCHITECTURE_CAP)
}

fn flag_points(required: TriState, present: bool) -> f64 {
	match (required, present) {
		(TriState::Yes, true) => 4.0,
		(TriState::Yes, false) => 0.0,
		(TriState::No, _) => 3.0,
		(TriState::Unknown, _) => 2.0,
	}
}

fn challenge_alignment(candidate: &CandidateResumeAnalysis, job: &JobProfile) -> f64 {
	let job_text =
		if job.work_scope.trim().is_empty() { &job.product_context } else { &job.work_scope };
	let job_tokens = text::tokenize(job_text);
	let mut candidate_text = candidate.impact_highlights.join(" ");

	for part in [candidate.current_focus.as_str(), candidate.primary_direction.as_str()] {
		candidate_text.push(' ');
		candidate_text.push_str(part);
	}
	for name in candidate.technology_names() {
		candidate_text.push(' ');
		candidate_text.push_str(name);
	}

	let candidate_tokens = text::tokenize(&candidate_text);
	let text_ratio = overlap_ratio(&job_tokens, &candidate_tokens);
	let job_techs: BTreeSet<String> =
		job.tech.entries().map(|requirement| text::normalize_term(&requirement.name)).collect();
	let candidate_techs: BTreeSet<String> =
		candidate.technology_names().map(text::normalize_term).collect();
	let tech_ratio = overlap_ratio(&job_techs, &candidate_techs);

	(CHALLENGE_TEXT_POINTS * text_ratio + CHALLENGE_TECH_POINTS * tech_ratio).min(CHALLENGE_CAP)
}

/// Share of `wanted` present in `offered`. An empty `wanted` set says nothing, so it scores
/// neutral.
fn overlap_ratio(wanted: &BTreeSet<String>, offered: &BTreeSet<String>) -> f64 {
	let wanted_len = wanted.iter().filter(|item| !item.is_empty()).count();

	if wanted_len == 0 {
		return NEUTRAL_RATIO;
	}

	let hits = wanted.iter().filter(|item| !item.is_empty() && offered.contains(*item)).count();

	hits as f64 / wanted_len as f64
}

fn build_reasons(
	candidate: &CandidateResumeAnalysis,
	job: &JobProfile,
	failures: &[String],
) -> MatchReasons {
	let mut reasons = MatchReasons::default();

	for requirement in job.tech.entries() {
		let depth = resolve_depth(candidate, &requirement.name);

		if depth == TechDepth::None {
			if requirement.mandatory {
				reasons
					.top_gaps
					.push(format!("Missing mandatory technology: {}", requirement.name));
			}

			continue;
		}

		if depth.rank() >= requirement.depth.rank() {
			reasons.top_matches.push(format!("{} at {} depth", requirement.name, depth.as_str()));
		} else {
			reasons.top_gaps.push(format!(
				"{} below required depth ({} vs {})",
				requirement.name,
				depth.as_str(),
				requirement.depth.as_str()
			));
		}
	}

	if candidate.ownership.production_responsibility {
		reasons.top_matches.push("Owns production systems".to_string());
	}
	if let Some(domain) = required_domain(job)
		&& let Some(entry) = matching_domain(candidate, domain)
	{
		reasons
			.top_matches
			.push(format!("Domain exposure: {} ({})", entry.domain, entry.depth.as_str()));
	}
	if candidate.hands_on == Level::Unknown {
		reasons.top_gaps.push("Hands-on level is unclear".to_string());
	}

	reasons.risks.extend(failures.iter().cloned());
	reasons.risks.extend(
		candidate
			.risk_flags
			.iter()
			.map(|flag| flag.trim())
			.filter(|flag| !flag.is_empty())
			.map(str::to_string),
	);

	reasons.top_matches.truncate(MAX_REASONS);
	reasons.top_gaps.truncate(MAX_REASONS);
	reasons.risks.truncate(MAX_REASONS);

	reasons
}

fn required_domain(job: &JobProfile) -> Option<&str> {
	job.domain.primary_domain.as_deref().map(str::trim).filter(|domain| !domain.is_empty())
}

/// Deepest candidate domain entry that matches `domain`.
fn matching_domain<'a>(
	candidate: &'a CandidateResumeAnalysis,
	domain: &str,
) -> Option<&'a DomainExpertise> {
	candidate
		.domains
		.iter()
		.filter(|entry| text::phrases_overlap(&entry.domain, domain))
		.max_by_key(|entry| entry.depth)
}

fn authority_label(authority: DecisionAuthority) -> &'static str {
	match authority {
		DecisionAuthority::Executor => "executor",
		DecisionAuthority::Contributor => "contributor",
		DecisionAuthority::TechnicalLead => "technical lead",
		DecisionAuthority::Architect => "architect",
		DecisionAuthority::Unknown => "unknown",
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::profile::{
		ArchitectureRequirement, DomainRequirement, OwnershipRequirement, SkillDepth, TechMap,
		TechSignal,
	};

	fn go_job() -> JobProfile {
		JobProfile {
			title: "Backend engineer".to_string(),
			product_context: "Payments platform".to_string(),
			work_scope: "Scale the payment ledger and build Kubernetes operators".to_string(),
			tech: TechMap {
				core: vec![
					TechRequirement::core("Go", TechDepth::Working),
					TechRequirement::core("Kubernetes", TechDepth::Working),
				],
				secondary: vec![TechRequirement::secondary("PostgreSQL", TechDepth::Basic)],
			},
			architecture: ArchitectureRequirement {
				style: ArchitectureStyle::Microservices,
				distributed: TriState::Yes,
				high_load: TriState::Unknown,
			},
			domain: DomainRequirement {
				importance: DomainImportance::Helpful,
				primary_domain: Some("fintech".to_string()),
			},
			ownership: OwnershipRequirement {
				decision_authority: DecisionAuthority::Contributor,
				production_responsibility: false,
			},
			constraints: Vec::new(),
		}
	}

	fn go_candidate() -> CandidateResumeAnalysis {
		CandidateResumeAnalysis {
			primary_direction: "backend".to_string(),
			decision_authority: DecisionAuthority::Contributor,
			hands_on: Level::High,
			skills: SkillDepth {
				deep: vec!["Go".to_string()],
				working: Vec::new(),
				mentioned: vec!["PostgreSQL".to_string()],
			},
			impact_highlights: vec!["Scaled the payment ledger to 10x traffic".to_string()],
			..Default::default()
		}
	}

	#[test]
	fn missing_mandatory_technology_fails_hard_filter() {
		let result = score(&go_candidate(), &go_job());

		assert!(!result.passes_hard_filters());
		assert!(result.hard_filter_failures().iter().any(|failure| failure.contains("Kubernetes")));
		assert!(result.reasons().risks.iter().any(|risk| risk.contains("Kubernetes")));
		assert!(result.reasons().top_gaps.iter().any(|gap| gap.contains("Kubernetes")));
	}

	#[test]
	fn every_failure_is_listed() {
		let mut job = go_job();

		job.ownership = OwnershipRequirement {
			decision_authority: DecisionAuthority::TechnicalLead,
			production_responsibility: true,
		};

		let mut candidate = go_candidate();

		candidate.decision_authority = DecisionAuthority::Executor;

		let failures = hard_filter_failures(&candidate, &job);

		assert_eq!(failures.len(), 3);
	}

	#[test]
	fn critical_domain_at_high_depth_scores_full_points() {
		let mut job = go_job();

		job.domain = DomainRequirement {
			importance: DomainImportance::Critical,
			primary_domain: Some("fintech".to_string()),
		};

		let mut candidate = go_candidate();

		candidate.domains = vec![DomainExpertise {
			domain: "Fintech".to_string(),
			depth: DomainDepth::High,
			confidence: 0.9,
		}];

		let result = score(&candidate, &job);

		assert_eq!(result.breakdown().domain_alignment(), 20.0);
		assert!(!result.hard_filter_failures().iter().any(|failure| failure.contains("domain")));
	}

	#[test]
	fn critical_domain_at_low_depth_fails() {
		let mut job = go_job();

		job.domain.importance = DomainImportance::Critical;

		let mut candidate = go_candidate();

		candidate.domains = vec![DomainExpertise {
			domain: "fintech".to_string(),
			depth: DomainDepth::Low,
			confidence: 0.4,
		}];

		assert!(
			hard_filter_failures(&candidate, &job)
				.iter()
				.any(|failure| failure.contains("Critical domain"))
		);
	}

	#[test]
	fn depth_resolution_prefers_buckets_then_confidence() {
		let mut candidate = go_candidate();

		candidate.core_technologies = vec![
			TechSignal { name: "Go".to_string(), confidence: 0.1 },
			TechSignal { name: "Rust".to_string(), confidence: 0.8 },
			TechSignal { name: "Kafka".to_string(), confidence: 0.5 },
		];

		assert_eq!(resolve_depth(&candidate, "go"), TechDepth::Expert);
		assert_eq!(resolve_depth(&candidate, "postgresql"), TechDepth::Basic);
		assert_eq!(resolve_depth(&candidate, "RUST"), TechDepth::Working);
		assert_eq!(resolve_depth(&candidate, "kafka"), TechDepth::Basic);
		assert_eq!(resolve_depth(&candidate, "Erlang"), TechDepth::None);
	}

	#[test]
	fn depth_credit_is_full_half_or_nothing() {
		let requirement = TechRequirement::core("Go", TechDepth::Strong);

		assert_eq!(depth_credit(TechDepth::Expert, &requirement), 1.0);
		assert_eq!(depth_credit(TechDepth::Strong, &requirement), 1.0);
		assert_eq!(depth_credit(TechDepth::Working, &requirement), 0.5);
		assert_eq!(depth_credit(TechDepth::Basic, &requirement), 0.0);
		assert_eq!(depth_credit(TechDepth::None, &requirement), 0.0);
	}

	#[test]
	fn core_tech_weights_mandatory_entries() {
		// Go: full (1.5), Kubernetes: none (1.5), PostgreSQL: full (1.0).
		let value = core_tech_depth(&go_candidate(), &go_job());

		assert!((value - CORE_TECH_CAP * 2.5 / 4.0).abs() < 1e-9);
	}

	#[test]
	fn ownership_combines_authority_hands_on_and_production() {
		let job = go_job();
		let candidate = go_candidate();

		assert_eq!(ownership_alignment(&candidate, &job), 15.0);

		let mut executor = candidate.clone();

		executor.decision_authority = DecisionAuthority::Architect;
		executor.hands_on = Level::Low;

		let mut strict = job.clone();

		strict.ownership.production_responsibility = true;

		assert_eq!(ownership_alignment(&executor, &strict), 5.0 - 1.0 - 2.0);
	}

	#[test]
	fn total_is_clamped_sum_of_breakdown() {
		let mut candidate = go_candidate();

		candidate.skills.working.push("Kubernetes".to_string());
		candidate.architecture.microservices = true;
		candidate.architecture.distributed = true;
		candidate.system_complexity = Level::High;

		let result = score(&candidate, &go_job());
		let breakdown = result.breakdown();

		assert!(result.passes_hard_filters());
		assert_eq!(result.total_score(), breakdown.sum().clamp(0.0, 100.0));
		assert_eq!(breakdown.core_tech_depth(), 35.0);
		assert_eq!(breakdown.architecture_scale_alignment(), 13.0);
	}

	#[test]
	fn rescoring_is_idempotent() {
		let candidate = go_candidate();
		let job = go_job();

		assert_eq!(score(&candidate, &job), score(&candidate, &job));
	}

	#[test]
	fn empty_job_scores_neutral_and_passes() {
		let result = score(&CandidateResumeAnalysis::default(), &JobProfile::default());

		assert!(result.passes_hard_filters());
		assert_eq!(result.breakdown().core_tech_depth(), 17.5);
		assert_eq!(result.breakdown().domain_alignment(), 10.0);
		assert!(result.reasons().top_gaps.iter().any(|gap| gap.contains("Hands-on")));
	}

	#[test]
	fn domain_alignment_follows_importance_table() {
		let mut job = go_job();
		let mut candidate = go_candidate();

		for (importance, depth, expected) in [
			(DomainImportance::Helpful, Some(DomainDepth::Medium), 17.0),
			(DomainImportance::Important, None, 4.0),
			(DomainImportance::Critical, Some(DomainDepth::High), 20.0),
			(DomainImportance::Critical, None, 0.0),
			(DomainImportance::None, Some(DomainDepth::Low), 14.0),
		] {
			job.domain.importance = importance;
			candidate.domains = depth
				.map(|depth| {
					let domain = "Fintech".to_string();

					vec![DomainExpertise { domain, depth, confidence: 0.9 }]
				})
				.unwrap_or_default();

			assert_eq!(domain_alignment(&candidate, &job), expected, "{importance:?} {depth:?}");
		}

		job.domain.importance = DomainImportance::Critical;
		job.domain.primary_domain = None;

		assert_eq!(domain_alignment(&candidate, &job), 10.0);
	}
}
