use anyhow::{Result, ensure};

use crate::logic::{AutopilotPlan, DrivingStyle, RunSummary};

const MIN_TIP: u32 = 5;
const MAX_TIP: u32 = 40;

#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: AutopilotPlan,
}

impl TestScenario {
    #[must_use]
    pub fn new(name: impl Into<String>, plan: AutopilotPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

fn completes_all_days(days: u32) -> impl Fn(&RunSummary) -> Result<()> + Send + Sync {
    move |summary| {
        ensure!(!summary.halted, "run halted after {} ticks", summary.ticks);
        ensure!(
            summary.days_completed() == usize::try_from(days).unwrap_or(usize::MAX),
            "expected {days} finished days, got {}",
            summary.days_completed()
        );
        Ok(())
    }
}

fn tips_within_range(summary: &RunSummary) -> Result<()> {
    let played = summary.tips.iter().filter(|tip| **tip > 0);
    for tip in played {
        ensure!(
            (MIN_TIP..=MAX_TIP).contains(tip),
            "tip {tip} outside {MIN_TIP}..={MAX_TIP}"
        );
    }
    Ok(())
}

fn records_match_deliveries(summary: &RunSummary) -> Result<()> {
    let recorded: u32 = summary.records.iter().map(|r| r.tips_earned).sum();
    ensure!(
        recorded <= summary.tips.iter().sum::<u32>(),
        "records claim {recorded} tips, more than were paid out"
    );
    for record in &summary.records {
        ensure!(
            record.time_taken.is_finite() && record.time_taken > 0.0,
            "record with invalid day time {}",
            record.time_taken
        );
    }
    Ok(())
}

fn tutorial_fails_once(summary: &RunSummary) -> Result<()> {
    ensure!(
        summary.failed_deliveries == 1,
        "expected exactly one tutorial failure, saw {}",
        summary.failed_deliveries
    );
    ensure!(
        summary.tips.contains(&0),
        "tutorial delivery should pay nothing"
    );
    Ok(())
}

fn destruction_replays_day(summary: &RunSummary) -> Result<()> {
    ensure!(summary.collisions > 0, "reckless driver never hit anything");
    ensure!(
        summary.restarts == summary.destructions,
        "{} destructions but {} replays",
        summary.destructions,
        summary.restarts
    );
    Ok(())
}

fn smoke_scenario() -> TestScenario {
    TestScenario::new(
        "Smoke Test",
        AutopilotPlan::new(DrivingStyle::Careful, 1)
            .with_expectation(completes_all_days(1))
            .with_expectation(tips_within_range),
    )
}

fn full_week_scenario() -> TestScenario {
    TestScenario::new(
        "Full Week",
        AutopilotPlan::new(DrivingStyle::Careful, 7)
            .with_expectation(completes_all_days(7))
            .with_expectation(tips_within_range)
            .with_expectation(records_match_deliveries),
    )
}

fn tutorial_scenario() -> TestScenario {
    TestScenario::new(
        "Tutorial Day",
        AutopilotPlan::new(DrivingStyle::Careful, 1)
            .with_expectation(completes_all_days(1))
            .with_expectation(tutorial_fails_once),
    )
}

fn reckless_scenario() -> TestScenario {
    TestScenario::new(
        "Reckless Driver",
        AutopilotPlan::new(DrivingStyle::Reckless, 2)
            .with_max_ticks(30 * 60 * 20)
            .with_expectation(destruction_replays_day)
            .with_expectation(records_match_deliveries),
    )
}

fn erratic_scenario() -> TestScenario {
    TestScenario::new(
        "Erratic Needle",
        AutopilotPlan::new(DrivingStyle::Erratic, 3)
            .with_expectation(completes_all_days(3))
            .with_expectation(tips_within_range),
    )
}

fn deterministic_scenario() -> TestScenario {
    TestScenario::new(
        "Deterministic Replay",
        AutopilotPlan::new(DrivingStyle::Erratic, 2).with_replay_check(),
    )
}

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    match name.to_lowercase().as_str() {
        "smoke" => Some(smoke_scenario()),
        "full-week" | "week" => Some(full_week_scenario()),
        "tutorial-day" | "tutorial" => Some(tutorial_scenario()),
        "reckless-driver" | "reckless" => Some(reckless_scenario()),
        "erratic-needle" | "erratic" => Some(erratic_scenario()),
        "deterministic" | "replay" => Some(deterministic_scenario()),
        _ => None,
    }
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    vec![
        ("smoke", "Smoke Test"),
        ("full-week", "Full Week"),
        ("tutorial-day", "Tutorial Day"),
        ("reckless-driver", "Reckless Driver"),
        ("erratic-needle", "Erratic Needle"),
        ("deterministic", "Deterministic Replay"),
    ]
}
