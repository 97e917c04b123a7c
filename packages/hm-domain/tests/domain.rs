use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use hm_config::Notification;
use hm_domain::{
	decision::{self, DecisionContext, MatchingDecision, MessageLength, Priority},
	mandatory::{
		CandidateMandatoryFields, ConstraintSignals, FilterOutcome, JobMandatoryFields,
		SalaryPeriod, WorkMode,
	},
	profile::{
		CandidateResumeAnalysis, JobProfile, JobStatus, Level, SkillDepth, TechDepth, TechMap,
		TechRequirement,
	},
	record::{HistorySnapshot, MatchRecord, MatchStatus},
	scoring,
};

fn remote_poland_ukraine() -> JobMandatoryFields {
	JobMandatoryFields {
		work_format: Some(WorkMode::Remote),
		allowed_countries: vec!["Poland".to_string(), "Ukraine".to_string()],
		worldwide: false,
		budget_min: Some(3_000.0),
		budget_max: Some(5_000.0),
		budget_currency: Some("EUR".to_string()),
		budget_period: Some(SalaryPeriod::Month),
	}
}

fn go_k8s_job() -> JobProfile {
	JobProfile {
		title: "Platform engineer".to_string(),
		work_scope: "Operate Kubernetes clusters for Go services".to_string(),
		tech: TechMap {
			core: vec![
				TechRequirement::core("Go", TechDepth::Working),
				TechRequirement::core("Kubernetes", TechDepth::Working),
			],
			secondary: Vec::new(),
		},
		..Default::default()
	}
}

fn go_only_candidate() -> CandidateResumeAnalysis {
	CandidateResumeAnalysis {
		hands_on: Level::High,
		skills: SkillDepth { deep: vec!["Go".to_string()], ..Default::default() },
		..Default::default()
	}
}

fn record(candidate_id: i64, notified: bool, created_at: OffsetDateTime) -> MatchRecord {
	MatchRecord {
		record_id: Uuid::new_v4(),
		run_id: Uuid::new_v4(),
		manager_id: 7,
		candidate_id,
		job_id: Some(70),
		candidate_profile_id: None,
		score: scoring::score(&go_only_candidate(), &JobProfile::default()),
		decision: MatchingDecision {
			notify_candidate: notified,
			notify_manager: false,
			priority: Priority::Normal,
			message_length: MessageLength::Short,
			cooldown_hours_candidate: 12,
			cooldown_hours_manager: 6,
			reason: "test".to_string(),
		},
		job_summary: "Platform engineer".to_string(),
		candidate_summary: "Go engineer".to_string(),
		explanation: None,
		status: MatchStatus::Pending,
		last_actor_id: None,
		created_at,
		updated_at: created_at,
	}
}

#[test]
fn remote_job_rejects_candidate_outside_allowed_countries() {
	let job = remote_poland_ukraine();
	let candidate = CandidateMandatoryFields {
		country: Some("Germany".to_string()),
		work_mode: Some(WorkMode::Remote),
		salary_amount: Some(4_000.0),
		salary_currency: Some("EUR".to_string()),
		salary_period: Some(SalaryPeriod::Month),
	};
	let signals = ConstraintSignals::parse(&["Remote only".to_string()]);

	assert!(job.is_complete());
	assert!(candidate.is_complete());
	assert!(matches!(
		hm_domain::mandatory::prefilter(&signals, &job, &candidate),
		FilterOutcome::Reject { .. }
	));
}

#[test]
fn missing_mandatory_kubernetes_fails_scoring() {
	let result = scoring::score(&go_only_candidate(), &go_k8s_job());

	assert!(!result.passes_hard_filters());
	assert!(result.hard_filter_failures().iter().any(|failure| failure.contains("Kubernetes")));
}

#[test]
fn hard_failure_blocks_notification_even_at_high_score() {
	let result = scoring::score(&go_only_candidate(), &go_k8s_job());
	let ctx = DecisionContext {
		score: &result,
		risk_flag_count: 0,
		interview_confidence: Level::High,
		job_status: JobStatus::Active,
		pair_rejected: false,
		candidate_in_cooldown: false,
	};
	let decision = decision::decide(&ctx, &Notification { candidate_threshold: 0, ..Default::default() });

	assert!(!decision.notify_candidate);
	assert!(!decision.notify_manager);
}

#[test]
fn snapshot_reports_cooldown_and_rejection() {
	let now = OffsetDateTime::now_utc();
	let mut rejected = record(3, false, now - Duration::days(10));

	rejected.status = MatchStatus::CandidateRejected;

	let snapshot = HistorySnapshot::new(
		vec![
			record(1, true, now - Duration::hours(2)),
			record(2, true, now - Duration::hours(20)),
			record(4, false, now - Duration::hours(1)),
			rejected,
		],
		now,
	);

	assert!(snapshot.candidate_in_cooldown(1, 12));
	assert!(!snapshot.candidate_in_cooldown(2, 12));
	assert!(!snapshot.candidate_in_cooldown(4, 12));
	assert!(snapshot.pair_rejected(7, 3));
	assert!(!snapshot.pair_rejected(8, 3));
	assert!(!snapshot.manager_rejected(7, 3));
	assert_eq!(snapshot.known_candidate_ids(), vec![4, 1, 2, 3]);
}

#[test]
fn match_record_serializes_iso_timestamps() {
	let created_at = OffsetDateTime::from_unix_timestamp(1_700_000_000).expect("Valid timestamp.");
	let value = serde_json::to_value(record(1, true, created_at)).expect("Record must serialize.");

	assert_eq!(value["createdAt"], serde_json::json!("2023-11-14T22:13:20Z"));
	assert_eq!(value["status"], serde_json::json!("pending"));
	assert_eq!(value["decision"]["notifyCandidate"], serde_json::json!(true));
	assert!(value["score"]["breakdown"]["coreTechDepth"].is_number());
}
