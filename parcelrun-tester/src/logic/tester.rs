use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::common::scenario::TestScenario;
use crate::logic::autopilot::{Autopilot, AutopilotPlan, RunSummary};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub seed: u64,
    pub passed: bool,
    pub iterations_run: usize,
    pub successful_iterations: usize,
    pub failures: Vec<String>,
    pub days_completed: usize,
    pub deliveries: usize,
    pub destructions: u32,
    #[serde(with = "duration_serde")]
    pub average_duration: Duration,
    #[serde(with = "duration_vec_serde")]
    pub performance_data: Vec<Duration>,
}

pub struct LogicTester {
    autopilot: Autopilot,
    verbose: bool,
}

impl LogicTester {
    pub const fn new(verbose: bool) -> Self {
        Self {
            autopilot: Autopilot::new(verbose),
            verbose,
        }
    }

    pub fn run_scenario(
        &self,
        scenario: &TestScenario,
        seeds: &[u64],
        iterations: usize,
    ) -> Vec<ScenarioResult> {
        seeds
            .iter()
            .map(|&seed| {
                if self.verbose {
                    println!(
                        "🧪 Testing scenario: {} (style: {} seed: {})",
                        scenario.name.bright_white(),
                        scenario.plan.style.label(),
                        seed
                    );
                }
                self.run_single_scenario(scenario, seed, iterations)
            })
            .collect()
    }

    fn run_single_scenario(
        &self,
        scenario: &TestScenario,
        seed: u64,
        iterations: usize,
    ) -> ScenarioResult {
        let mut successes = 0;
        let mut failures = Vec::new();
        let mut performance_data = Vec::new();
        let mut days_completed = 0;
        let mut deliveries = 0;
        let mut destructions = 0;

        for i in 0..iterations {
            let start_time = Instant::now();
            let iteration_seed = seed.wrapping_add(u64::try_from(i).unwrap_or(u64::MAX));
            let summary = self.autopilot.run_plan(&scenario.plan, iteration_seed);

            days_completed += summary.days_completed();
            deliveries += summary.deliveries();
            destructions += summary.destructions;

            let verdict = evaluate_expectations(&scenario.plan, &summary).or_else(|| {
                scenario
                    .plan
                    .verify_replay
                    .then(|| self.autopilot.run_plan(&scenario.plan, iteration_seed))
                    .filter(|replay| replay != &summary)
                    .map(|replay| describe_divergence(&summary, &replay))
            });

            if let Some(err) = verdict {
                failures.push(format!(
                    "Iteration {} (style {}, seed {}, ticks {}, days {}, deliveries {}, destroyed {}): {} | {}",
                    i + 1,
                    scenario.plan.style.label(),
                    summary.seed,
                    summary.ticks,
                    summary.days_completed(),
                    summary.deliveries(),
                    summary.destructions,
                    err,
                    summarize_violations(&summary)
                ));
                if self.verbose {
                    println!(
                        "  ❌ Iteration {}/{} failed: {}",
                        i + 1,
                        iterations,
                        err.red()
                    );
                }
            } else {
                successes += 1;
                let duration = start_time.elapsed();
                performance_data.push(duration);
                if self.verbose {
                    println!(
                        "  ✅ Iteration {}/{} passed ({duration:?}) days:{} deliveries:{} tips:{}",
                        i + 1,
                        iterations,
                        summary.days_completed(),
                        summary.deliveries(),
                        summary.tips.iter().sum::<u32>()
                    );
                }
            }
        }

        let average_duration = if performance_data.is_empty() {
            Duration::ZERO
        } else {
            performance_data.iter().sum::<Duration>()
                / u32::try_from(performance_data.len()).unwrap_or(1)
        };

        ScenarioResult {
            scenario_name: scenario.name.clone(),
            seed,
            passed: failures.is_empty(),
            iterations_run: iterations,
            successful_iterations: successes,
            failures,
            days_completed,
            deliveries,
            destructions,
            average_duration,
            performance_data,
        }
    }
}

fn evaluate_expectations(plan: &AutopilotPlan, summary: &RunSummary) -> Option<String> {
    if !summary.violations.is_empty() {
        return Some(format!("{} invariant violation(s)", summary.violations.len()));
    }
    plan.expectations
        .iter()
        .find_map(|expectation| expectation.evaluate(summary).err())
        .map(|err| err.to_string())
}

fn describe_divergence(first: &RunSummary, replay: &RunSummary) -> String {
    format!(
        "replay diverged: ticks {} vs {}, deliveries {} vs {}, records {:?} vs {:?}",
        first.ticks,
        replay.ticks,
        first.deliveries(),
        replay.deliveries(),
        first.records,
        replay.records
    )
}

fn summarize_violations(summary: &RunSummary) -> String {
    if summary.violations.is_empty() {
        return "no invariant violations".to_string();
    }
    summary
        .violations
        .iter()
        .take(3)
        .cloned()
        .collect::<Vec<_>>()
        .join(" | ")
}

mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u128::deserialize(deserializer)?;
        Ok(Duration::from_millis(u64::try_from(millis).unwrap_or(0)))
    }
}

mod duration_vec_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(durations: &[Duration], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis: Vec<u128> = durations.iter().map(Duration::as_millis).collect();
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = Vec::<u128>::deserialize(deserializer)?;
        Ok(millis
            .into_iter()
            .map(|m| Duration::from_millis(u64::try_from(m).unwrap_or(0)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::scenario::get_scenario;
    use crate::logic::DrivingStyle;

    #[test]
    fn smoke_scenario_passes_for_one_seed() {
        let scenario = get_scenario("smoke").expect("smoke exists");
        let results = LogicTester::new(false).run_scenario(&scenario, &[1337], 1);
        assert_eq!(results.len(), 1);
        assert!(results[0].passed, "failures: {:?}", results[0].failures);
        assert_eq!(results[0].days_completed, 1);
    }

    #[test]
    fn failing_expectation_is_reported() {
        let scenario = TestScenario::new(
            "Impossible",
            AutopilotPlan::new(DrivingStyle::Careful, 1).with_expectation(
                |_: &RunSummary| -> anyhow::Result<()> { anyhow::bail!("never satisfied") },
            ),
        );
        let results = LogicTester::new(false).run_scenario(&scenario, &[3], 2);
        assert!(!results[0].passed);
        assert_eq!(results[0].failures.len(), 2);
        assert!(results[0].failures[0].contains("never satisfied"));
    }

    #[test]
    fn result_serializes_durations_as_millis() {
        let result = ScenarioResult {
            scenario_name: "Smoke".to_string(),
            seed: 1,
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            failures: Vec::new(),
            days_completed: 1,
            deliveries: 3,
            destructions: 0,
            average_duration: Duration::from_millis(12),
            performance_data: vec![Duration::from_millis(12)],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["average_duration"], 12);
        let back: ScenarioResult = serde_json::from_value(json).unwrap();
        assert_eq!(back.performance_data, vec![Duration::from_millis(12)]);
    }
}
