use hm_domain::profile::{DomainDepth, JobStatus};

use super::{MemoryIndex, MemoryProfiles, candidate_fields, harness, rust_job, strong_rust_analysis};

#[tokio::test]
async fn candidate_run_covers_every_active_job() {
	let profiles = MemoryProfiles::default();

	profiles.add_candidate(
		1,
		candidate_fields("Poland"),
		"Rust",
		Some(strong_rust_analysis(DomainDepth::High)),
	);
	profiles.add_job(8, JobStatus::Active, rust_job());
	profiles.add_job(7, JobStatus::Active, rust_job());
	profiles.add_job(9, JobStatus::Inactive, rust_job());

	let h = harness(profiles, MemoryIndex::default());
	let report = h.service.run_candidate(1).await.expect("Run must succeed.");
	let managers: Vec<i64> = report.entries.iter().map(|record| record.manager_id).collect();

	assert_eq!(report.counters.shortlisted, 2);
	assert_eq!(managers, vec![7, 8]);
	assert_eq!(report.counters.records_written, 2);
	assert!(report.entries.iter().all(|record| record.candidate_id == 1));
	assert!(report.entries.iter().all(|record| record.job_id == Some(record.manager_id * 10)));
}

#[tokio::test]
async fn candidate_run_delivers_top_k_jobs() {
	let profiles = MemoryProfiles::default();

	profiles.add_candidate(
		1,
		candidate_fields("Poland"),
		"Rust",
		Some(strong_rust_analysis(DomainDepth::High)),
	);

	for manager_id in 1..=5 {
		profiles.add_job(manager_id, JobStatus::Active, rust_job());
	}

	let h = harness(profiles, MemoryIndex::default());
	let report = h.service.run_candidate(1).await.expect("Run must succeed.");

	assert_eq!(report.entries.len(), 3);
	assert_eq!(report.counters.notifiable, 5);
	assert_eq!(h.records.snapshot().len(), 5);
	assert_eq!(
		h.records.snapshot().iter().filter(|record| record.decision.notify_candidate).count(),
		3
	);
}

#[tokio::test]
async fn unknown_candidate_is_skipped_everywhere() {
	let profiles = MemoryProfiles::default();

	profiles.add_job(7, JobStatus::Active, rust_job());

	let h = harness(profiles, MemoryIndex::default());
	let report = h.service.run_candidate(42).await.expect("Run must succeed.");

	assert!(report.entries.is_empty());
	assert_eq!(report.counters.skipped_missing_source, 1);
	assert!(h.records.snapshot().is_empty());
}
