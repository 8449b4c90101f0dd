//! Social features: mentor interventions and peer matches

use crate::features::or_degraded;
use crate::features::types::SocialFeatures;
use crate::store::ActivitySource;
use chrono::{DateTime, Duration, Utc};

pub async fn extract(
    source: &dyn ActivitySource,
    student_id: &str,
    long_days: u32,
    now: DateTime<Utc>,
) -> SocialFeatures {
    let since = now - Duration::days(i64::from(long_days));
    let (interventions, peer_matches) = tokio::join!(
        source.count_interventions(student_id, since, now),
        source.count_peer_matches(student_id),
    );
    let interventions = or_degraded(interventions, student_id, "interventions") as u32;
    let peer_matches = or_degraded(peer_matches, student_id, "peer_matches") as u32;

    SocialFeatures {
        intervention_count_30d: interventions,
        peer_match_count: peer_matches,
        social_engagement_score: compute_social_engagement(interventions, peer_matches),
    }
}

/// Exponential saturation over social touchpoints
///
/// Formula: `1.0 - exp(-(interventions + peer_matches) / 2.0)`
/// Two touchpoints map to ~63%; approaches 1.0 asymptotically
fn compute_social_engagement(interventions: u32, peer_matches: u32) -> f64 {
    let touchpoints = f64::from(interventions) + f64::from(peer_matches);
    (1.0 - (-touchpoints / 2.0).exp()).clamp(0.0, 1.0)
}
