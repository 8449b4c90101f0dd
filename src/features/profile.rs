//! Profile features from the student record and onboarding answers

use crate::features::types::{
    ProfileFeatures, DEFAULT_CONFIDENCE_LEVEL, DEFAULT_GRADE_LEVEL, DEFAULT_MOTIVATION_LEVEL,
    DEFAULT_STRESS_LEVEL,
};
use crate::types::StudentProfile;
use chrono::{DateTime, Utc};

pub fn extract(profile: Option<&StudentProfile>, now: DateTime<Utc>) -> ProfileFeatures {
    let Some(profile) = profile else {
        return ProfileFeatures::default();
    };
    let onboarding = profile.onboarding_profile.as_ref();

    let days_since_onboarding = profile
        .onboarding_completed_at
        .map(|at| (now - at).num_days().max(0))
        .map_or(0, |days| u32::try_from(days).unwrap_or(u32::MAX));

    ProfileFeatures {
        grade_level: profile
            .grade
            .as_deref()
            .and_then(parse_grade)
            .unwrap_or(DEFAULT_GRADE_LEVEL),
        motivation_level: level_or(
            onboarding.and_then(|o| o.motivation_level),
            DEFAULT_MOTIVATION_LEVEL,
        ),
        confidence_level: level_or(
            onboarding.and_then(|o| o.confidence_level),
            DEFAULT_CONFIDENCE_LEVEL,
        ),
        stress_level: level_or(onboarding.and_then(|o| o.stress_level), DEFAULT_STRESS_LEVEL),
        has_onboarding: onboarding.is_some(),
        days_since_onboarding,
        interests_count: onboarding.map_or(0, |o| o.interests.len() as u32),
        goals_count: onboarding.map_or(0, |o| o.goals.len() as u32),
    }
}

/// Leading integer of a grade label ("12", "12th", " 9 ")
fn parse_grade(grade: &str) -> Option<u32> {
    let digits: String = grade
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok().filter(|g| *g > 0)
}

/// Unanswered or zero levels fall back to the population default
fn level_or(value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() && v != 0.0 => v,
        _ => default,
    }
}
