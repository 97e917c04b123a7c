use std::sync::atomic::Ordering;

use super::{
	KeywordEmbedding, MemoryIndex, MemoryProfiles, candidate_fields, harness, harness_with,
	python_analysis, rust_job, weak_rust_analysis,
};

fn three_candidates(profiles: &MemoryProfiles) {
	profiles.add_candidate(1, candidate_fields("Poland"), "Python", Some(python_analysis()));
	profiles.add_candidate(2, candidate_fields("Poland"), "Rust Python", Some(weak_rust_analysis()));
	profiles.add_candidate(3, candidate_fields("Poland"), "Rust Rust", Some(weak_rust_analysis()));
}

#[tokio::test]
async fn brute_force_ranks_when_index_and_relational_are_empty() {
	let profiles = MemoryProfiles::default();

	three_candidates(&profiles);

	let h = harness(profiles, MemoryIndex::default());
	let ids = h.service.resolve_shortlist(&rust_job(), None, 50).await;

	assert_eq!(ids, vec![3, 2, 1]);

	let capped = h.service.resolve_shortlist(&rust_job(), None, 2).await;

	assert_eq!(capped, vec![3, 2]);
}

#[tokio::test]
async fn empty_index_is_synced_then_searched_again() {
	let profiles = MemoryProfiles::default();

	three_candidates(&profiles);

	let h = harness(profiles, MemoryIndex::enabled());
	let ids = h.service.resolve_shortlist(&rust_job(), None, 50).await;

	assert_eq!(ids, vec![3, 2, 1]);
	assert_eq!(h.index.searches.load(Ordering::SeqCst), 2);
	assert_eq!(h.index.points.lock().expect("Lock poisoned.").len(), 3);
	assert_eq!(h.profiles.embeddings.lock().expect("Lock poisoned.").len(), 3);
}

#[tokio::test]
async fn relational_search_answers_before_brute_force() {
	let profiles = MemoryProfiles { relational_search: true, ..MemoryProfiles::default() };

	three_candidates(&profiles);

	let h = harness(profiles, MemoryIndex::default());
	let report = h.service.sync_index(10).await.expect("Sync must succeed.");

	assert_eq!(report.indexed, 3);
	assert_eq!(h.embedding.calls.load(Ordering::SeqCst), 3);

	let ids = h.service.resolve_shortlist(&rust_job(), None, 50).await;

	assert_eq!(ids, vec![3, 2, 1]);
	// Only the job text was embedded; the brute-force tier never ran.
	assert_eq!(h.embedding.calls.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn embedding_outage_falls_back_to_static_list() {
	let profiles = MemoryProfiles::default();

	three_candidates(&profiles);

	let h = harness_with(profiles, MemoryIndex::enabled(), KeywordEmbedding::failing(), None);
	let ids = h.service.resolve_shortlist(&rust_job(), None, 50).await;

	assert_eq!(ids, vec![1, 2, 3]);
	assert_eq!(h.index.searches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn static_list_survives_unreadable_history() {
	let profiles = MemoryProfiles::default();

	three_candidates(&profiles);

	let h = harness_with(profiles, MemoryIndex::enabled(), KeywordEmbedding::failing(), None);

	h.records.history_broken.store(true, Ordering::SeqCst);

	let ids = h.service.resolve_shortlist(&rust_job(), None, 50).await;

	assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn no_candidates_means_no_shortlist() {
	let h = harness(MemoryProfiles::default(), MemoryIndex::enabled());

	assert!(h.service.resolve_shortlist(&rust_job(), None, 50).await.is_empty());
}

#[tokio::test]
async fn removed_candidate_leaves_the_index() {
	let profiles = MemoryProfiles::default();

	three_candidates(&profiles);

	let h = harness(profiles, MemoryIndex::enabled());

	h.service.sync_index(10).await.expect("Sync must succeed.");
	h.service.remove_candidate_from_index(3).await.expect("Delete must succeed.");

	let ids = h.service.resolve_shortlist(&rust_job(), None, 50).await;

	assert_eq!(ids, vec![2, 1]);
}
