//! Performance features: ARK progress, milestones, XP and level.
//! Reads beyond the pattern history degrade to empty inputs on failure.

use crate::features::types::PerformanceFeatures;
use crate::features::window::{mean, ratio, FeatureWindow};
use crate::features::or_degraded;
use crate::store::ActivitySource;
use crate::types::{ArkStatus, BehavioralPattern};
use chrono::{DateTime, Duration, Utc};

const DEFAULT_LEVEL: u32 = 1;

pub async fn extract(
    source: &dyn ActivitySource,
    student_id: &str,
    window: &FeatureWindow<'_>,
    now: DateTime<Utc>,
) -> PerformanceFeatures {
    let long_start = now - Duration::days(i64::from(window.long_days));
    let short_start = now - Duration::days(i64::from(window.short_days));

    let (arks, xp, level) = tokio::join!(
        source.arks(student_id),
        source.xp_transactions(student_id, long_start, now),
        source.student_level(student_id),
    );
    let arks = or_degraded(arks, student_id, "arks");
    let xp = or_degraded(xp, student_id, "xp_transactions");
    let level = or_degraded(level, student_id, "student_level");

    let ark_ids: Vec<String> = arks.iter().map(|a| a.id.clone()).collect();
    let milestones = if ark_ids.is_empty() {
        Vec::new()
    } else {
        or_degraded(source.milestones(&ark_ids).await, student_id, "milestones")
    };
    let completed_milestones = milestones.iter().filter(|m| m.completed).count();

    let xp_earned_30d: i64 = xp.iter().map(|t| t.amount).sum();
    let xp_earned_7d: i64 = xp
        .iter()
        .filter(|t| t.created_at >= short_start)
        .map(|t| t.amount)
        .sum();

    PerformanceFeatures {
        ark_progress_rate_30d: mean_delta(&window.long),
        ark_progress_rate_7d: mean_delta(&window.short),
        completed_arks_count: count_status(&arks, ArkStatus::Completed),
        active_arks_count: count_status(&arks, ArkStatus::Active),
        milestone_completion_rate: ratio(completed_milestones as f64, milestones.len() as f64),
        xp_earned_30d,
        xp_earned_7d,
        xp_earning_rate: ratio(xp_earned_30d as f64, f64::from(window.long_days)),
        level: level.unwrap_or(DEFAULT_LEVEL),
        progress_decline_days_30d: window
            .long
            .iter()
            .filter(|p| p.declining_progress_days > 0)
            .count() as u32,
    }
}

fn mean_delta(patterns: &[&BehavioralPattern]) -> f64 {
    let deltas: Vec<f64> = patterns.iter().map(|p| p.ark_progress_delta).collect();
    mean(&deltas)
}

fn count_status(arks: &[crate::types::Ark], status: ArkStatus) -> u32 {
    arks.iter().filter(|a| a.status == status).count() as u32
}
