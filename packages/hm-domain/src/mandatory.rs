use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::text;

/// Budget figures below this, without a `k` suffix, are read as noise rather than a ceiling.
const MIN_BUDGET_FIGURE: f64 = 100.0;

static REMOTE_ONLY_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)\bremote[\s-]*only\b|\bfully[\s-]+remote\b|\b100%\s*remote\b")
		.expect("Invalid remote-only regex.")
});
static ONSITE_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)\bon[\s-]?site\b|\bin[\s-]office\b|\bno\s+remote\b")
		.expect("Invalid onsite regex.")
});
// A figure, an optional `k`, then an optional range end with its own `k`.
static BUDGET_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(concat!(
		r"(?i)\b(?:budget|salary|compensation|up\s+to|max(?:imum)?)\b[^0-9\n]{0,16}",
		r"(\d{1,3}(?:[ ,.]\d{3})+|\d+(?:\.\d+)?)\s*(k\b)?",
		r"(?:\s*(?:-|–|to)\s*(\d{1,3}(?:[ ,.]\d{3})+|\d+(?:\.\d+)?)\s*(k\b)?)?",
	))
	.expect("Invalid budget regex.")
});
static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(concat!(
		r"(?i)\b(?:based|located|residing|living|resident)\s+in\s+",
		r"([a-z][a-z '\-]{1,40})",
	))
	.expect("Invalid location regex.")
});

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkMode {
	Remote,
	Onsite,
	Hybrid,
	Any,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryPeriod {
	Hour,
	Month,
	Year,
}
impl SalaryPeriod {
	fn per_year(self) -> Option<f64> {
		match self {
			Self::Hour => None,
			Self::Month => Some(12.0),
			Self::Year => Some(1.0),
		}
	}
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct CandidateMandatoryFields {
	pub country: Option<String>,
	pub work_mode: Option<WorkMode>,
	pub salary_amount: Option<f64>,
	pub salary_currency: Option<String>,
	pub salary_period: Option<SalaryPeriod>,
}
impl CandidateMandatoryFields {
	pub fn is_complete(&self) -> bool {
		has_text(self.country.as_deref())
			&& self.work_mode.is_some()
			&& self.salary_amount.map(|amount| amount.is_finite() && amount >= 0.0).unwrap_or(false)
			&& has_text(self.salary_currency.as_deref())
			&& self.salary_period.is_some()
	}
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct JobMandatoryFields {
	pub work_format: Option<WorkMode>,
	pub allowed_countries: Vec<String>,
	pub worldwide: bool,
	pub budget_min: Option<f64>,
	pub budget_max: Option<f64>,
	pub budget_currency: Option<String>,
	pub budget_period: Option<SalaryPeriod>,
}
impl JobMandatoryFields {
	pub fn is_complete(&self) -> bool {
		let Some(work_format) = self.work_format else {
			return false;
		};
		let location_known = self.worldwide
			|| !self.allowed_countries.is_empty()
			|| !matches!(work_format, WorkMode::Remote);

		location_known
			&& (self.budget_min.is_some() || self.budget_max.is_some())
			&& has_text(self.budget_currency.as_deref())
			&& self.budget_period.is_some()
	}
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FilterOutcome {
	Pass,
	Reject { reason: String },
}
impl FilterOutcome {
	pub fn is_pass(&self) -> bool {
		matches!(self, Self::Pass)
	}

	fn reject(reason: impl Into<String>) -> Self {
		Self::Reject { reason: reason.into() }
	}
}

/// Signals pulled out of a job's free-text constraints. Parse once per job and reuse for every
/// candidate of the run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConstraintSignals {
	pub remote_only: bool,
	pub onsite: bool,
	pub budget_ceiling: Option<f64>,
	pub location: Option<String>,
}
impl ConstraintSignals {
	pub fn parse(constraints: &[String]) -> Self {
		let mut signals = Self::default();

		for constraint in constraints {
			if REMOTE_ONLY_RE.is_match(constraint) {
				signals.remote_only = true;
			}
			if ONSITE_RE.is_match(constraint) {
				signals.onsite = true;
			}
			if signals.budget_ceiling.is_none()
				&& let Some(captures) = BUDGET_RE.captures(constraint)
			{
				signals.budget_ceiling = budget_ceiling(&captures);
			}
			if signals.location.is_none()
				&& let Some(captures) = LOCATION_RE.captures(constraint)
			{
				signals.location = captures
					.get(1)
					.map(|place| place.as_str().trim().trim_end_matches(['.', ',', '-']).to_string())
					.filter(|place| !place.is_empty());
			}
		}

		signals
	}
}

/// Structured work-format, location and budget compatibility.
pub fn check_job_mandatory(
	job: &JobMandatoryFields,
	candidate: &CandidateMandatoryFields,
) -> FilterOutcome {
	if matches!(job.work_format, Some(WorkMode::Onsite | WorkMode::Hybrid))
		&& candidate.work_mode == Some(WorkMode::Remote)
	{
		return FilterOutcome::reject("Job requires office presence; candidate wants remote only.");
	}
	if job.work_format == Some(WorkMode::Remote)
		&& !job.worldwide
		&& !job.allowed_countries.is_empty()
		&& let Some(country) = candidate.country.as_deref()
		&& !job.allowed_countries.iter().any(|allowed| text::terms_match(allowed, country))
	{
		return FilterOutcome::reject(format!(
			"Candidate country {country} is not in the job's allowed countries."
		));
	}
	if let Some(ceiling) = job.budget_max
		&& let Some(salary) = comparable_salary(job, candidate)
		&& salary > ceiling
	{
		return FilterOutcome::reject(format!(
			"Candidate salary expectation {salary:.0} exceeds budget ceiling {ceiling:.0}."
		));
	}

	FilterOutcome::Pass
}

/// Keyword scan of the job's free-text constraints against the candidate's structured fields.
pub fn check_constraints(
	signals: &ConstraintSignals,
	job: &JobMandatoryFields,
	candidate: &CandidateMandatoryFields,
) -> FilterOutcome {
	if signals.remote_only && candidate.work_mode == Some(WorkMode::Onsite) {
		return FilterOutcome::reject("Job constraints say remote only; candidate wants onsite.");
	}
	if signals.onsite && candidate.work_mode == Some(WorkMode::Remote) {
		return FilterOutcome::reject(
			"Job constraints require onsite presence; candidate wants remote only.",
		);
	}
	if let Some(ceiling) = signals.budget_ceiling
		&& let Some(salary) = comparable_salary(job, candidate)
		&& salary > ceiling
	{
		return FilterOutcome::reject(format!(
			"Candidate salary expectation {salary:.0} exceeds constraint budget {ceiling:.0}."
		));
	}
	// Only country names the job itself lists are trusted; a bare city would otherwise reject
	// every candidate who reported a country.
	if let Some(location) = signals.location.as_deref()
		&& job.allowed_countries.iter().any(|allowed| text::phrases_overlap(allowed, location))
		&& let Some(country) = candidate.country.as_deref()
		&& !text::phrases_overlap(location, country)
	{
		return FilterOutcome::reject(format!(
			"Job constraints require location {location}; candidate is in {country}."
		));
	}

	FilterOutcome::Pass
}

/// Runs the structured check, then the constraint scan.
pub fn prefilter(
	signals: &ConstraintSignals,
	job: &JobMandatoryFields,
	candidate: &CandidateMandatoryFields,
) -> FilterOutcome {
	match check_job_mandatory(job, candidate) {
		FilterOutcome::Pass => check_constraints(signals, job, candidate),
		rejected => rejected,
	}
}

/// Candidate salary expressed in the job's budget period, when currencies agree and the periods
/// can be converted.
fn comparable_salary(
	job: &JobMandatoryFields,
	candidate: &CandidateMandatoryFields,
) -> Option<f64> {
	let amount = candidate.salary_amount.filter(|amount| amount.is_finite())?;
	let job_currency = job.budget_currency.as_deref()?;
	let candidate_currency = candidate.salary_currency.as_deref()?;

	if !job_currency.trim().eq_ignore_ascii_case(candidate_currency.trim()) {
		return None;
	}

	let job_period = job.budget_period?;
	let candidate_period = candidate.salary_period?;

	if job_period == candidate_period {
		return Some(amount);
	}

	let yearly = amount * candidate_period.per_year()?;

	Some(yearly / job_period.per_year()?)
}

/// Upper bound of a budget match. A range yields its end; a trailing `k` scales the figure it
/// follows, and a range end with no suffix inherits the start's. `None` when unsure.
fn budget_ceiling(captures: &regex::Captures<'_>) -> Option<f64> {
	let start_k = captures.get(2).is_some();
	let start = parse_figure(captures.get(1)?.as_str(), start_k)?;
	let ceiling = match captures.get(3) {
		Some(end) => {
			let end_k = captures.get(4).is_some() || start_k;
			let end = parse_figure(end.as_str(), end_k)?;
			// "80-100k" puts the suffix on the end only; the start shares it.
			let start =
				if end_k && !start_k && start * 1_000.0 <= end { start * 1_000.0 } else { start };

			if end < start {
				return None;
			}

			end
		},
		None => start,
	};

	(ceiling >= MIN_BUDGET_FIGURE).then_some(ceiling)
}

/// Reads `5,500`, `80 000`, `5.500` as grouped thousands and `1.5` as a decimal.
fn parse_figure(raw: &str, thousands: bool) -> Option<f64> {
	let grouped = raw.len() > 4
		&& raw.chars().rev().nth(3).is_some_and(|ch| matches!(ch, ' ' | ',' | '.'));
	let value: f64 = if grouped {
		raw.chars().filter(|ch| ch.is_ascii_digit()).collect::<String>().parse().ok()?
	} else {
		raw.parse().ok()?
	};

	if !value.is_finite() {
		return None;
	}

	Some(if thousands { value * 1_000.0 } else { value })
}

fn has_text(value: Option<&str>) -> bool {
	value.map(|value| !value.trim().is_empty()).unwrap_or(false)
}

#[cfg(test)]
mod tests {
	use super::*;

	fn remote_job(countries: &[&str]) -> JobMandatoryFields {
		JobMandatoryFields {
			work_format: Some(WorkMode::Remote),
			allowed_countries: countries.iter().map(|country| country.to_string()).collect(),
			worldwide: false,
			budget_min: Some(4_000.0),
			budget_max: Some(6_000.0),
			budget_currency: Some("USD".to_string()),
			budget_period: Some(SalaryPeriod::Month),
		}
	}

	fn candidate(country: &str, mode: WorkMode, salary: f64) -> CandidateMandatoryFields {
		CandidateMandatoryFields {
			country: Some(country.to_string()),
			work_mode: Some(mode),
			salary_amount: Some(salary),
			salary_currency: Some("usd".to_string()),
			salary_period: Some(SalaryPeriod::Month),
		}
	}

	#[test]
	fn remote_job_rejects_country_outside_allow_list() {
		let job = remote_job(&["Poland", "Ukraine"]);
		let outcome = check_job_mandatory(&job, &candidate("Germany", WorkMode::Remote, 5_000.0));

		assert!(matches!(outcome, FilterOutcome::Reject { reason } if reason.contains("Germany")));
		assert!(check_job_mandatory(&job, &candidate("poland", WorkMode::Any, 5_000.0)).is_pass());
	}

	#[test]
	fn worldwide_flag_bypasses_country_list() {
		let mut job = remote_job(&["Poland"]);

		job.worldwide = true;

		assert!(check_job_mandatory(&job, &candidate("Brazil", WorkMode::Remote, 5_000.0)).is_pass());
	}

	#[test]
	fn office_jobs_reject_remote_only_candidates() {
		let mut job = remote_job(&[]);

		job.work_format = Some(WorkMode::Hybrid);

		assert!(!check_job_mandatory(&job, &candidate("Poland", WorkMode::Remote, 5_000.0)).is_pass());
		assert!(check_job_mandatory(&job, &candidate("Poland", WorkMode::Hybrid, 5_000.0)).is_pass());
	}

	#[test]
	fn budget_ceiling_converts_yearly_salary() {
		let job = remote_job(&["Poland"]);
		let mut yearly = candidate("Poland", WorkMode::Remote, 84_000.0);

		yearly.salary_period = Some(SalaryPeriod::Year);

		assert!(!check_job_mandatory(&job, &yearly).is_pass());

		yearly.salary_amount = Some(60_000.0);

		assert!(check_job_mandatory(&job, &yearly).is_pass());
	}

	#[test]
	fn budget_is_ignored_across_currencies() {
		let job = remote_job(&["Poland"]);
		let mut pricey = candidate("Poland", WorkMode::Remote, 90_000.0);

		pricey.salary_currency = Some("PLN".to_string());

		assert!(check_job_mandatory(&job, &pricey).is_pass());
	}

	#[test]
	fn constraint_signals_are_extracted() {
		let signals = ConstraintSignals::parse(&[
			"Remote only, EU timezone".to_string(),
			"Budget up to 5,500 per month".to_string(),
			"Must be based in Poland.".to_string(),
		]);

		assert!(signals.remote_only);
		assert!(!signals.onsite);
		assert_eq!(signals.budget_ceiling, Some(5_500.0));
		assert_eq!(signals.location.as_deref(), Some("Poland"));

		let thousands = ConstraintSignals::parse(&["Max salary 7k".to_string()]);

		assert_eq!(thousands.budget_ceiling, Some(7_000.0));

		for (raw, ceiling) in [
			("Budget 80-100k USD per year", Some(100_000.0)),
			("Salary up to 1.5k per month", Some(1_500.0)),
			("Budget 5000 - 7000 per month", Some(7_000.0)),
			("Budget 5 000 to 7 500 EUR", Some(7_500.0)),
			("Budget 5.500 per month", Some(5_500.0)),
			("Budget 90k-120k", Some(120_000.0)),
			("Budget 9000 - 7000", None),
			("Salary band 3", None),
		] {
			let signals = ConstraintSignals::parse(&[raw.to_string()]);

			assert_eq!(signals.budget_ceiling, ceiling, "{raw}");
		}
	}

	#[test]
	fn budget_range_keeps_candidates_inside_the_band() {
		let mut job = remote_job(&["Poland"]);

		job.budget_max = None;
		job.budget_period = Some(SalaryPeriod::Year);

		let signals = ConstraintSignals::parse(&["Budget 80-100k USD per year".to_string()]);
		let mut inside = candidate("Poland", WorkMode::Remote, 90_000.0);
		let mut above = candidate("Poland", WorkMode::Remote, 120_000.0);

		inside.salary_period = Some(SalaryPeriod::Year);
		above.salary_period = Some(SalaryPeriod::Year);

		assert!(prefilter(&signals, &job, &inside).is_pass());
		assert!(!prefilter(&signals, &job, &above).is_pass());
	}

	#[test]
	fn constraints_contradicting_structured_fields_reject() {
		let mut job = remote_job(&["Poland", "Ukraine"]);

		job.budget_max = None;

		let signals = ConstraintSignals::parse(&[
			"Onsite two days a week".to_string(),
			"Budget 5000".to_string(),
			"Candidates located in Poland".to_string(),
		]);

		for (country, mode, salary, passes) in [
			("Poland", WorkMode::Remote, 4_000.0, false),
			("Poland", WorkMode::Any, 5_200.0, false),
			("Ukraine", WorkMode::Any, 4_000.0, false),
			("Poland", WorkMode::Any, 4_000.0, true),
		] {
			let outcome = check_constraints(&signals, &job, &candidate(country, mode, salary));

			assert_eq!(outcome.is_pass(), passes, "{country} {mode:?} {salary}");
		}
	}

	#[test]
	fn completeness_requires_every_mandatory_field() {
		assert!(candidate("Poland", WorkMode::Remote, 1.0).is_complete());
		assert!(!CandidateMandatoryFields::default().is_complete());
		assert!(remote_job(&["Poland"]).is_complete());
		assert!(!remote_job(&[]).is_complete());

		let mut onsite = remote_job(&[]);

		onsite.work_format = Some(WorkMode::Onsite);

		assert!(onsite.is_complete());
	}
}
