use std::cmp::Ordering;

use futures::{StreamExt, stream};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{JobSnapshot, MatchService, Result};
use hm_domain::{
	decision::{self, DecisionContext, MatchingDecision, NotificationCeiling},
	mandatory::{self, ConstraintSignals, FilterOutcome, JobMandatoryFields},
	profile::{CandidateResumeAnalysis, JobStatus, ResumeAnalysis},
	record::{CandidateMatch, HistorySnapshot, MatchBatch, MatchRecord},
	scoring, text,
};

const SUMMARY_MAX_CHARS: usize = 280;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
	pub shortlisted: usize,
	pub skipped_incomplete: usize,
	pub skipped_filtered: usize,
	pub skipped_missing_source: usize,
	pub skipped_non_technical: usize,
	pub hard_failed: usize,
	pub scored: usize,
	pub notifiable: usize,
	pub records_written: usize,
	pub failed: usize,
}

/// Result of one run. `entries` are the matches to deliver, best first; every scored pair is
/// persisted whether delivered or not.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
	pub run_id: Uuid,
	pub entries: Vec<MatchRecord>,
	pub counters: RunCounters,
}
impl RunReport {
	fn empty(run_id: Uuid) -> Self {
		Self { run_id, entries: Vec::new(), counters: RunCounters::default() }
	}
}

/// A job that passed the run preconditions: active, profiled and with complete mandatory fields.
struct JobContext {
	manager_id: i64,
	status: JobStatus,
	snapshot: JobSnapshot,
	mandatory: JobMandatoryFields,
	signals: ConstraintSignals,
}
impl JobContext {
	fn summary(&self) -> String {
		summary_text(self.snapshot.technical_summary.as_deref(), &self.snapshot.profile.title)
	}
}

enum CandidateOutcome {
	Incomplete,
	Filtered,
	MissingSource,
	NonTechnical,
	HardFailed,
	Scored(Box<CandidateMatch>),
}

impl MatchService {
	/// Matches one manager's job against its shortlist and persists every scored pair.
	pub async fn run_manager(&self, manager_id: i64) -> Result<RunReport> {
		let run_id = Uuid::new_v4();
		let mut report = RunReport::empty(run_id);
		let Some(job) = self.load_job_context(manager_id).await? else {
			return Ok(report);
		};
		let history = self.load_history().await?;
		let mut ids = self
			.resolve_shortlist(
				&job.snapshot.profile,
				job.snapshot.technical_summary.as_deref(),
				self.cfg.shortlist.size as usize,
			)
			.await;

		ids.truncate(self.cfg.matching.max_candidates as usize);

		report.counters.shortlisted = ids.len();

		let outcomes: Vec<(i64, Result<CandidateOutcome>)> = stream::iter(ids)
			.map(|candidate_id| {
				let job = &job;
				let history = &history;

				async move { (candidate_id, self.evaluate_pair(job, candidate_id, history).await) }
			})
			.buffer_unordered(self.concurrency())
			.collect()
			.await;
		let mut matches: Vec<CandidateMatch> = outcomes
			.into_iter()
			.filter_map(|(candidate_id, outcome)| {
				tally(&mut report.counters, manager_id, candidate_id, outcome)
			})
			.collect();

		matches.sort_by(|left, right| {
			compare_scores(left, right).then(left.candidate_id.cmp(&right.candidate_id))
		});

		report.counters.notifiable = self.limit_deliveries(matches.iter_mut());

		if matches.is_empty() {
			tracing::info!(
				manager_id,
				%run_id,
				counters = ?report.counters,
				"Manager run produced no matches."
			);

			return Ok(report);
		}

		let batch = MatchBatch {
			run_id,
			manager_id,
			job_id: job.snapshot.job_id,
			job_summary: job.summary(),
			matches,
		};
		let stored = self.backends.records.create_for_job(&batch).await?;

		report.counters.records_written = stored.len();
		report.entries = delivered(stored);

		tracing::info!(
			manager_id,
			%run_id,
			delivered = report.entries.len(),
			counters = ?report.counters,
			"Manager run finished."
		);

		Ok(report)
	}

	/// Matches one candidate against every active job. One record per scored job is written.
	pub async fn run_candidate(&self, candidate_id: i64) -> Result<RunReport> {
		let run_id = Uuid::new_v4();
		let mut report = RunReport::empty(run_id);
		let history = self.load_history().await?;
		let manager_ids = self.backends.profiles.list_active_manager_ids().await?;

		report.counters.shortlisted = manager_ids.len();

		let outcomes: Vec<(i64, Result<Option<(JobContext, CandidateOutcome)>>)> =
			stream::iter(manager_ids)
				.map(|manager_id| {
					let history = &history;

					async move {
						let outcome: Result<Option<(JobContext, CandidateOutcome)>> = async {
							let Some(job) = self.load_job_context(manager_id).await? else {
								return Ok(None);
							};
							let outcome = self.evaluate_pair(&job, candidate_id, history).await?;

							Ok(Some((job, outcome)))
						}
						.await;

						(manager_id, outcome)
					}
				})
				.buffer_unordered(self.concurrency())
				.collect()
				.await;
		let mut scored: Vec<(JobContext, CandidateMatch)> = Vec::new();

		for (manager_id, outcome) in outcomes {
			let (job, outcome) = match outcome {
				Ok(Some(pair)) => pair,
				Ok(None) => continue,
				Err(err) => {
					report.counters.failed += 1;

					tracing::warn!(manager_id, candidate_id, error = %err, "Failed to evaluate job.");

					continue;
				},
			};

			if let Some(entry) = tally(&mut report.counters, manager_id, candidate_id, Ok(outcome)) {
				scored.push((job, entry));
			}
		}

		scored.sort_by(|left, right| {
			compare_scores(&left.1, &right.1).then(left.0.manager_id.cmp(&right.0.manager_id))
		});

		report.counters.notifiable =
			self.limit_deliveries(scored.iter_mut().map(|(_, entry)| entry));

		let mut stored = Vec::with_capacity(scored.len());

		for (job, entry) in scored {
			let batch = MatchBatch {
				run_id,
				manager_id: job.manager_id,
				job_id: job.snapshot.job_id,
				job_summary: job.summary(),
				matches: vec![entry],
			};

			match self.backends.records.create_for_job(&batch).await {
				Ok(records) => stored.extend(records),
				Err(err) => {
					report.counters.failed += 1;

					tracing::warn!(
						manager_id = job.manager_id,
						candidate_id,
						error = %err,
						"Failed to persist match record."
					);
				},
			}
		}

		report.counters.records_written = stored.len();
		report.entries = delivered(stored);

		tracing::info!(
			candidate_id,
			%run_id,
			delivered = report.entries.len(),
			counters = ?report.counters,
			"Candidate run finished."
		);

		Ok(report)
	}

	/// Match history as of now. Loaded once per run so every check in it agrees.
	async fn load_history(&self) -> Result<HistorySnapshot> {
		let records = self.backends.records.list_all().await?;

		Ok(HistorySnapshot::new(records, OffsetDateTime::now_utc()))
	}

	async fn load_job_context(&self, manager_id: i64) -> Result<Option<JobContext>> {
		let profiles = &self.backends.profiles;
		let Some(status) = profiles.get_manager_job_status(manager_id).await? else {
			tracing::info!(manager_id, "Manager has no job; skipping.");

			return Ok(None);
		};

		if status != JobStatus::Active {
			tracing::info!(manager_id, status = status.as_str(), "Job is not active; skipping.");

			return Ok(None);
		}

		let Some(snapshot) = profiles.get_job_profile(manager_id).await? else {
			tracing::info!(manager_id, "Job profile is not built yet; skipping.");

			return Ok(None);
		};
		let Some(mandatory) = profiles.get_job_mandatory_fields(manager_id).await? else {
			return Ok(None);
		};

		if !mandatory.is_complete() {
			tracing::info!(manager_id, "Job mandatory fields are incomplete; skipping.");

			return Ok(None);
		}

		let signals = ConstraintSignals::parse(&snapshot.profile.constraints);

		Ok(Some(JobContext { manager_id, status, snapshot, mandatory, signals }))
	}

	async fn evaluate_pair(
		&self,
		job: &JobContext,
		candidate_id: i64,
		history: &HistorySnapshot,
	) -> Result<CandidateOutcome> {
		let Some(candidate) = self.backends.profiles.get_candidate(candidate_id).await? else {
			return Ok(CandidateOutcome::MissingSource);
		};

		if !candidate.fields.is_complete() {
			return Ok(CandidateOutcome::Incomplete);
		}
		if let FilterOutcome::Reject { reason } =
			mandatory::prefilter(&job.signals, &job.mandatory, &candidate.fields)
		{
			tracing::debug!(
				manager_id = job.manager_id,
				candidate_id,
				reason = %reason,
				"Candidate filtered."
			);

			return Ok(CandidateOutcome::Filtered);
		}

		let Some(source) = &candidate.source else {
			return Ok(CandidateOutcome::MissingSource);
		};
		let analysis = match &source.resume_analysis {
			ResumeAnalysis::Technical(analysis) => analysis,
			ResumeAnalysis::NonTechnical { reason } => {
				tracing::debug!(candidate_id, reason = %reason, "Resume is not technical; skipping.");

				return Ok(CandidateOutcome::NonTechnical);
			},
		};
		let score = scoring::score(analysis, &job.snapshot.profile);

		if !score.passes_hard_filters() {
			tracing::debug!(
				manager_id = job.manager_id,
				candidate_id,
				failures = ?score.hard_filter_failures(),
				"Candidate failed hard filters."
			);

			return Ok(CandidateOutcome::HardFailed);
		}

		let ctx = DecisionContext {
			score: &score,
			risk_flag_count: analysis.risk_flags.len(),
			interview_confidence: analysis.interview_confidence,
			job_status: job.status,
			pair_rejected: history.pair_rejected(job.manager_id, candidate_id),
			candidate_in_cooldown: history
				.candidate_in_cooldown(candidate_id, self.cfg.notification.candidate_cooldown_hours),
		};
		let base = decision::decide(&ctx, &self.cfg.notification);
		let decision = self.refine_decision(&ctx, base).await;

		Ok(CandidateOutcome::Scored(Box::new(CandidateMatch {
			candidate_id,
			candidate_profile_id: candidate.profile_id,
			candidate_summary: candidate_summary(source.technical_summary.as_deref(), analysis),
			explanation: None,
			score,
			decision,
		})))
	}

	/// Lets the refinement model adjust `base`. Any failure keeps `base`.
	async fn refine_decision(
		&self,
		ctx: &DecisionContext<'_>,
		base: MatchingDecision,
	) -> MatchingDecision {
		let cfg = &self.cfg.providers.decision;

		if !cfg.enabled {
			return base;
		}

		let input = serde_json::json!({
			"score": ctx.score,
			"decision": &base,
			"riskFlagCount": ctx.risk_flag_count,
			"interviewConfidence": ctx.interview_confidence,
		});
		let raw = match self.timed("refine_decision", self.providers.refiner.refine(cfg, &input)).await
		{
			Ok(raw) => raw,
			Err(err) => {
				tracing::warn!(error = %err, "Decision refinement failed; keeping the fallback.");

				return base;
			},
		};
		let refined = decision::parse_refinement(raw).and_then(|refinement| {
			decision::apply_refinement(&base, &refinement, NotificationCeiling::for_context(ctx))
		});

		match refined {
			Ok(decision) => decision,
			Err(err) => {
				tracing::warn!(error = %err, "Decision refinement rejected; keeping the fallback.");

				base
			},
		}
	}

	/// Walks `ranked` best first and keeps the candidate notification only on the first top-K
	/// entries that clear the threshold. Returns how many entries were notifiable before the cut.
	fn limit_deliveries<'m>(&self, ranked: impl Iterator<Item = &'m mut CandidateMatch>) -> usize {
		let threshold = f64::from(self.cfg.notification.candidate_threshold);
		let top_k = self.cfg.matching.top_k as usize;
		let mut notifiable = 0;

		for entry in ranked {
			if !entry.decision.notify_candidate {
				continue;
			}
			if entry.score.total_score() < threshold {
				entry.decision.notify_candidate = false;
				entry.decision.reason = "Score is below the candidate threshold.".to_string();

				continue;
			}

			notifiable += 1;

			if notifiable > top_k {
				entry.decision.notify_candidate = false;
				entry.decision.reason = format!("Outside the top {top_k} matches of this run.");
			}
		}

		notifiable
	}
}

fn tally(
	counters: &mut RunCounters,
	manager_id: i64,
	candidate_id: i64,
	outcome: Result<CandidateOutcome>,
) -> Option<CandidateMatch> {
	match outcome {
		Ok(CandidateOutcome::Scored(entry)) => {
			counters.scored += 1;

			Some(*entry)
		},
		Ok(CandidateOutcome::Incomplete) => {
			counters.skipped_incomplete += 1;

			None
		},
		Ok(CandidateOutcome::Filtered) => {
			counters.skipped_filtered += 1;

			None
		},
		Ok(CandidateOutcome::MissingSource) => {
			counters.skipped_missing_source += 1;

			None
		},
		Ok(CandidateOutcome::NonTechnical) => {
			counters.skipped_non_technical += 1;

			None
		},
		Ok(CandidateOutcome::HardFailed) => {
			counters.hard_failed += 1;

			None
		},
		Err(err) => {
			counters.failed += 1;

			tracing::warn!(manager_id, candidate_id, error = %err, "Failed to evaluate candidate.");

			None
		},
	}
}

fn compare_scores(left: &CandidateMatch, right: &CandidateMatch) -> Ordering {
	right.score.total_score().total_cmp(&left.score.total_score())
}

/// Stored records that still notify the candidate, best first.
fn delivered(stored: Vec<MatchRecord>) -> Vec<MatchRecord> {
	let mut entries: Vec<MatchRecord> =
		stored.into_iter().filter(|record| record.decision.notify_candidate).collect();

	entries.sort_by(|left, right| {
		right
			.score
			.total_score()
			.total_cmp(&left.score.total_score())
			.then(left.manager_id.cmp(&right.manager_id))
			.then(left.candidate_id.cmp(&right.candidate_id))
	});

	entries
}

fn candidate_summary(
	technical_summary: Option<&str>,
	analysis: &CandidateResumeAnalysis,
) -> String {
	let fallback = [analysis.primary_direction.trim(), analysis.seniority.trim()]
		.into_iter()
		.filter(|part| !part.is_empty())
		.collect::<Vec<_>>()
		.join(", ");

	summary_text(technical_summary, &fallback)
}

fn summary_text(technical_summary: Option<&str>, fallback: &str) -> String {
	let text =
		technical_summary.map(str::trim).filter(|summary| !summary.is_empty()).unwrap_or(fallback);

	text::truncate_chars(text.trim(), SUMMARY_MAX_CHARS)
}
