use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::airlines::AirlineDirectory;
use crate::context::CabinClass;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub trip_window: TripWindowConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub drivers: DriverConfig,
    #[serde(default)]
    pub lodging: LodgingConfig,
    #[serde(default)]
    pub advisor: AdvisorConfig,
    #[serde(default)]
    pub reasoning: ReasoningConfig,
    #[serde(default)]
    pub airlines: AirlineDirectory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_layer1_min_savings")]
    pub layer1_min_savings: f64,
    #[serde(default = "default_layer2_min_savings")]
    pub layer2_min_savings: f64,
    #[serde(default = "default_layer4_min_savings")]
    pub layer4_min_savings: f64,
    #[serde(default = "default_max_airline_swaps")]
    pub max_airline_swaps: usize,
    #[serde(default = "default_max_nearby_airports")]
    pub max_nearby_airports: usize,
    #[serde(default = "default_max_routing")]
    pub max_routing: usize,
    #[serde(default = "default_max_date_shifts")]
    pub max_date_shifts: usize,
    #[serde(default = "default_max_cabin_downgrades")]
    pub max_cabin_downgrades: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripWindowConfig {
    #[serde(default = "default_search_days")]
    pub search_days: i64,
    #[serde(default = "default_duration_tolerance_days")]
    pub duration_tolerance_days: i64,
    #[serde(default = "default_near_shift_max_days")]
    pub near_shift_max_days: i64,
    #[serde(default = "default_proposal_min_savings")]
    pub min_savings: f64,
    #[serde(default = "default_reserved_user_airline_slots")]
    pub reserved_user_airline_slots: usize,
    #[serde(default = "default_max_proposals")]
    pub max_proposals: usize,
    #[serde(default = "default_trip_window_cap")]
    pub trip_window_cap: usize,
    #[serde(default = "default_different_month_cap")]
    pub different_month_cap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    #[serde(default = "default_outbound_weekdays")]
    pub outbound_weekdays: Vec<Weekday>,
    #[serde(default = "default_return_weekdays")]
    pub return_weekdays: Vec<Weekday>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default = "default_red_eye_start_hour")]
    pub red_eye_start_hour: u32,
    #[serde(default = "default_red_eye_end_hour")]
    pub red_eye_end_hour: u32,
    #[serde(default = "default_red_eye_economy_multiplier")]
    pub red_eye_economy_multiplier: f64,
    #[serde(default = "default_red_eye_premium_multiplier")]
    pub red_eye_premium_multiplier: f64,
    #[serde(default)]
    pub preference: PreferenceScores,
    #[serde(default = "default_per_leg_cap")]
    pub per_leg_cap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringWeights {
    #[serde(default = "default_weight_savings")]
    pub savings: f64,
    #[serde(default = "default_weight_preference")]
    pub preference: f64,
    #[serde(default = "default_weight_disruption")]
    pub disruption: f64,
    #[serde(default = "default_weight_sustainability")]
    pub sustainability: f64,
    /// Carried as a hard filter in configuration; the resolver annotates
    /// over-budget candidates and never drops them.
    #[serde(default)]
    pub policy_compliance: f64,
    #[serde(default = "default_true")]
    pub policy_hard_filter: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceScores {
    #[serde(default = "default_pref_own")]
    pub own_airline: f64,
    #[serde(default = "default_pref_alliance")]
    pub alliance_partner: f64,
    #[serde(default = "default_pref_full_service")]
    pub full_service: f64,
    #[serde(default = "default_pref_mid_tier")]
    pub mid_tier: f64,
    #[serde(default = "default_pref_low_cost")]
    pub low_cost: f64,
    #[serde(default = "default_pref_unknown")]
    pub unknown: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_budget_economy")]
    pub economy_budget: f64,
    #[serde(default = "default_budget_premium_economy")]
    pub premium_economy_budget: f64,
    #[serde(default = "default_budget_business")]
    pub business_budget: f64,
    #[serde(default = "default_budget_first")]
    pub first_budget: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default = "default_driver_airline_pct")]
    pub airline_threshold_pct: f64,
    #[serde(default = "default_driver_date_pct")]
    pub date_threshold_pct: f64,
    #[serde(default = "default_driver_stops_pct")]
    pub stops_threshold_pct: f64,
    #[serde(default = "default_driver_route_pct")]
    pub route_threshold_pct: f64,
    #[serde(default = "default_driver_cabin_pct")]
    pub cabin_threshold_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LodgingConfig {
    #[serde(default = "default_unknown_impact_materiality")]
    pub unknown_impact_materiality: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvisorConfig {
    #[serde(default = "default_approve_max_premium")]
    pub approve_max_premium: f64,
    #[serde(default = "default_approve_max_premium_pct")]
    pub approve_max_premium_pct: f64,
    #[serde(default = "default_optimize_min_premium")]
    pub optimize_min_premium: f64,
    #[serde(default = "default_optimize_min_premium_pct")]
    pub optimize_min_premium_pct: f64,
    #[serde(default = "default_reason_max_chars")]
    pub reason_max_chars: usize,
    #[serde(default = "default_downgrade_min_savings")]
    pub downgrade_suggestion_min_savings: f64,
    #[serde(default = "default_downgrade_min_pct")]
    pub downgrade_suggestion_min_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_reasoning_model")]
    pub model: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_reasoning_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub reasoning_endpoint: Option<String>,
    pub disable_reasoning: bool,
}

impl EngineConfig {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/trip-tradeoff/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        let parsed: Self = toml::from_str(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))?;
        Ok(parsed)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(endpoint) = overrides.reasoning_endpoint {
            self.reasoning.endpoint = endpoint;
            self.reasoning.enabled = true;
        }
        if overrides.disable_reasoning {
            self.reasoning.enabled = false;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn default_template() -> String {
        let template = r#"[generation]
layer1_min_savings = 25.0
layer2_min_savings = 50.0
layer4_min_savings = 100.0
max_airline_swaps = 3
max_nearby_airports = 2
max_routing = 2
max_date_shifts = 3
max_cabin_downgrades = 2

[trip_window]
search_days = 45
duration_tolerance_days = 2
near_shift_max_days = 21
min_savings = 50.0
reserved_user_airline_slots = 4
max_proposals = 16
trip_window_cap = 6
different_month_cap = 4

[calendar]
outbound_weekdays = ["Sun", "Mon", "Tue", "Wed"]
return_weekdays = ["Wed", "Thu", "Fri", "Sat"]

[scoring]
red_eye_start_hour = 22
red_eye_end_hour = 5
red_eye_economy_multiplier = 0.5
red_eye_premium_multiplier = 0.8
per_leg_cap = 5

[scoring.weights]
savings = 0.40
preference = 0.25
disruption = 0.20
sustainability = 0.15
policy_compliance = 0.0
policy_hard_filter = true

[scoring.preference]
own_airline = 1.0
alliance_partner = 0.8
full_service = 0.6
mid_tier = 0.5
low_cost = 0.3
unknown = 0.4

[policy]
economy_budget = 800.0
premium_economy_budget = 1500.0
business_budget = 4000.0
first_budget = 8000.0

[drivers]
airline_threshold_pct = 5.0
date_threshold_pct = 5.0
stops_threshold_pct = 10.0
route_threshold_pct = 5.0
cabin_threshold_pct = 15.0

[lodging]
unknown_impact_materiality = 200.0

[advisor]
approve_max_premium = 100.0
approve_max_premium_pct = 10.0
optimize_min_premium = 300.0
optimize_min_premium_pct = 25.0
reason_max_chars = 140
downgrade_suggestion_min_savings = 200.0
downgrade_suggestion_min_pct = 15.0

[reasoning]
enabled = false
endpoint = ""
model = "default"
api_key_env = "TRIP_TRADEOFF_API_KEY"
timeout_secs = 8

# A table set here replaces the built-in one, e.g.
# [airlines.tiers]
# UA = "full_service"
# [airlines.alliances]
# UA = "star_alliance"
[airlines]
"#;
        template.to_string()
    }
}

impl PolicyConfig {
    pub fn budget_for(&self, cabin: CabinClass) -> Option<f64> {
        let budget = match cabin {
            CabinClass::Economy => self.economy_budget,
            CabinClass::PremiumEconomy => self.premium_economy_budget,
            CabinClass::Business => self.business_budget,
            CabinClass::First => self.first_budget,
        };
        (budget.is_finite() && budget > 0.0).then_some(budget)
    }
}

impl ScoringWeights {
    pub fn total(&self) -> f64 {
        [
            self.savings,
            self.preference,
            self.disruption,
            self.sustainability,
        ]
        .iter()
        .map(|w| w.max(0.0))
        .sum()
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            layer1_min_savings: default_layer1_min_savings(),
            layer2_min_savings: default_layer2_min_savings(),
            layer4_min_savings: default_layer4_min_savings(),
            max_airline_swaps: default_max_airline_swaps(),
            max_nearby_airports: default_max_nearby_airports(),
            max_routing: default_max_routing(),
            max_date_shifts: default_max_date_shifts(),
            max_cabin_downgrades: default_max_cabin_downgrades(),
        }
    }
}

impl Default for TripWindowConfig {
    fn default() -> Self {
        Self {
            search_days: default_search_days(),
            duration_tolerance_days: default_duration_tolerance_days(),
            near_shift_max_days: default_near_shift_max_days(),
            min_savings: default_proposal_min_savings(),
            reserved_user_airline_slots: default_reserved_user_airline_slots(),
            max_proposals: default_max_proposals(),
            trip_window_cap: default_trip_window_cap(),
            different_month_cap: default_different_month_cap(),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            outbound_weekdays: default_outbound_weekdays(),
            return_weekdays: default_return_weekdays(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            red_eye_start_hour: default_red_eye_start_hour(),
            red_eye_end_hour: default_red_eye_end_hour(),
            red_eye_economy_multiplier: default_red_eye_economy_multiplier(),
            red_eye_premium_multiplier: default_red_eye_premium_multiplier(),
            preference: PreferenceScores::default(),
            per_leg_cap: default_per_leg_cap(),
        }
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            savings: default_weight_savings(),
            preference: default_weight_preference(),
            disruption: default_weight_disruption(),
            sustainability: default_weight_sustainability(),
            policy_compliance: 0.0,
            policy_hard_filter: true,
        }
    }
}

impl Default for PreferenceScores {
    fn default() -> Self {
        Self {
            own_airline: default_pref_own(),
            alliance_partner: default_pref_alliance(),
            full_service: default_pref_full_service(),
            mid_tier: default_pref_mid_tier(),
            low_cost: default_pref_low_cost(),
            unknown: default_pref_unknown(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            economy_budget: default_budget_economy(),
            premium_economy_budget: default_budget_premium_economy(),
            business_budget: default_budget_business(),
            first_budget: default_budget_first(),
        }
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            airline_threshold_pct: default_driver_airline_pct(),
            date_threshold_pct: default_driver_date_pct(),
            stops_threshold_pct: default_driver_stops_pct(),
            route_threshold_pct: default_driver_route_pct(),
            cabin_threshold_pct: default_driver_cabin_pct(),
        }
    }
}

impl Default for LodgingConfig {
    fn default() -> Self {
        Self {
            unknown_impact_materiality: default_unknown_impact_materiality(),
        }
    }
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            approve_max_premium: default_approve_max_premium(),
            approve_max_premium_pct: default_approve_max_premium_pct(),
            optimize_min_premium: default_optimize_min_premium(),
            optimize_min_premium_pct: default_optimize_min_premium_pct(),
            reason_max_chars: default_reason_max_chars(),
            downgrade_suggestion_min_savings: default_downgrade_min_savings(),
            downgrade_suggestion_min_pct: default_downgrade_min_pct(),
        }
    }
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            model: default_reasoning_model(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_reasoning_timeout_secs(),
        }
    }
}

fn default_layer1_min_savings() -> f64 {
    25.0
}

fn default_layer2_min_savings() -> f64 {
    50.0
}

fn default_layer4_min_savings() -> f64 {
    100.0
}

fn default_max_airline_swaps() -> usize {
    3
}

fn default_max_nearby_airports() -> usize {
    2
}

fn default_max_routing() -> usize {
    2
}

fn default_max_date_shifts() -> usize {
    3
}

fn default_max_cabin_downgrades() -> usize {
    2
}

fn default_search_days() -> i64 {
    45
}

fn default_duration_tolerance_days() -> i64 {
    2
}

fn default_near_shift_max_days() -> i64 {
    21
}

fn default_proposal_min_savings() -> f64 {
    50.0
}

fn default_reserved_user_airline_slots() -> usize {
    4
}

fn default_max_proposals() -> usize {
    16
}

fn default_trip_window_cap() -> usize {
    6
}

fn default_different_month_cap() -> usize {
    4
}

fn default_outbound_weekdays() -> Vec<Weekday> {
    vec![Weekday::Sun, Weekday::Mon, Weekday::Tue, Weekday::Wed]
}

fn default_return_weekdays() -> Vec<Weekday> {
    vec![Weekday::Wed, Weekday::Thu, Weekday::Fri, Weekday::Sat]
}

fn default_red_eye_start_hour() -> u32 {
    22
}

fn default_red_eye_end_hour() -> u32 {
    5
}

fn default_red_eye_economy_multiplier() -> f64 {
    0.5
}

fn default_red_eye_premium_multiplier() -> f64 {
    0.8
}

fn default_per_leg_cap() -> usize {
    5
}

fn default_weight_savings() -> f64 {
    0.40
}

fn default_weight_preference() -> f64 {
    0.25
}

fn default_weight_disruption() -> f64 {
    0.20
}

fn default_weight_sustainability() -> f64 {
    0.15
}

fn default_pref_own() -> f64 {
    1.0
}

fn default_pref_alliance() -> f64 {
    0.8
}

fn default_pref_full_service() -> f64 {
    0.6
}

fn default_pref_mid_tier() -> f64 {
    0.5
}

fn default_pref_low_cost() -> f64 {
    0.3
}

fn default_pref_unknown() -> f64 {
    0.4
}

fn default_budget_economy() -> f64 {
    800.0
}

fn default_budget_premium_economy() -> f64 {
    1_500.0
}

fn default_budget_business() -> f64 {
    4_000.0
}

fn default_budget_first() -> f64 {
    8_000.0
}

fn default_driver_airline_pct() -> f64 {
    5.0
}

fn default_driver_date_pct() -> f64 {
    5.0
}

fn default_driver_stops_pct() -> f64 {
    10.0
}

fn default_driver_route_pct() -> f64 {
    5.0
}

fn default_driver_cabin_pct() -> f64 {
    15.0
}

fn default_unknown_impact_materiality() -> f64 {
    200.0
}

fn default_approve_max_premium() -> f64 {
    100.0
}

fn default_approve_max_premium_pct() -> f64 {
    10.0
}

fn default_optimize_min_premium() -> f64 {
    300.0
}

fn default_optimize_min_premium_pct() -> f64 {
    25.0
}

fn default_reason_max_chars() -> usize {
    140
}

fn default_downgrade_min_savings() -> f64 {
    200.0
}

fn default_downgrade_min_pct() -> f64 {
    15.0
}

fn default_reasoning_model() -> String {
    "default".to_string()
}

fn default_api_key_env() -> String {
    "TRIP_TRADEOFF_API_KEY".to_string()
}

fn default_reasoning_timeout_secs() -> u64 {
    8
}

fn default_true() -> bool {
    true
}
