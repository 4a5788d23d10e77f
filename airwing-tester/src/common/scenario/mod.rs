pub mod catalog;

use crate::logic::CampaignPlan;

// Logic test scenario
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: CampaignPlan,
}

impl TestScenario {
    #[must_use]
    pub fn campaign(name: impl Into<String>, plan: CampaignPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

pub fn get_scenario(name: &str) -> Option<TestScenario> {
    let (name, plan) = match name.to_lowercase().as_str() {
        "smoke" | "recon" => ("Smoke Test", catalog::smoke()),
        "strike-package" | "strike" => ("Strike Package", catalog::strike_package()),
        "sweep-and-cap" | "cap" => ("Airfield Sweep and Distant CAP", catalog::sweep_and_cap()),
        "ferry-transfer" | "ferry" => ("Ferry Transfer", catalog::ferry_transfer()),
        "recall" => ("Mid-flight Recall", catalog::recall()),
        "deterministic" | "replay" => ("Deterministic Replay", catalog::deterministic()),
        "save-restore" | "checkpoint" => ("Save and Restore Mid-flight", catalog::save_restore()),
        "strike-estimate" | "estimate" => ("Strike Estimate Tables", catalog::strike_estimate()),
        _ => return None,
    };
    Some(TestScenario::campaign(name, plan))
}

pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    vec![
        ("smoke", "Smoke Test"),
        ("strike-package", "Strike Package"),
        ("sweep-and-cap", "Airfield Sweep and Distant CAP"),
        ("ferry-transfer", "Ferry Transfer"),
        ("recall", "Mid-flight Recall"),
        ("deterministic", "Deterministic Replay"),
        ("save-restore", "Save and Restore Mid-flight"),
        ("strike-estimate", "Strike Estimate Tables"),
    ]
}
