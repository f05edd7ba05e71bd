//! Ethical coherence check.
//!
//! Scans the multi-perspective weighting for omissions and imbalances and
//! grades the result. Each finding adds severity points:
//! - perspective with no score at all: 3
//! - principle scored 0 within a perspective: 1 each
//! - internal spread (max - min) of 4 or more within a perspective: 2
//! - external gap of 8 or more between the heaviest and lightest perspective: 2
//!
//! 5+ points is Critical, 2+ is Moderate, otherwise Low.

use crate::models::{EthicalAnalysis, Perspective, Perspectives, Severity};

const OMITTED_PERSPECTIVE_POINTS: u32 = 3;
const OMITTED_PRINCIPLE_POINTS: u32 = 1;
const IMBALANCE_POINTS: u32 = 2;

const INTERNAL_SPREAD_THRESHOLD: u8 = 4;
const EXTERNAL_GAP_THRESHOLD: u32 = 8;

const CRITICAL_POINTS: u32 = 5;
const MODERATE_POINTS: u32 = 2;

pub fn check_coherence(perspectives: &Perspectives) -> EthicalAnalysis {
    let mut warnings = Vec::new();
    let mut recommendations = Vec::new();
    let mut points = 0;

    for (perspective, scores) in perspectives.iter() {
        let name = perspective.label();

        if scores.total() == 0 {
            warnings.push(format!(
                "Omitted perspective: the '{name}' perspective did not score any principle."
            ));
            recommendations.push(format!(
                "Verify whether the '{name}' weighting was omitted by accident, so that the deliberation is complete."
            ));
            points += OMITTED_PERSPECTIVE_POINTS;
        }

        for principle in crate::models::Principle::ALL {
            if scores.get(principle) == 0 {
                let principle = principle.label();
                warnings.push(format!(
                    "Omitted principle in '{name}': the principle of '{principle}' has a value of 0."
                ));
                recommendations.push(format!(
                    "Assess whether omitting '{principle}' in the '{name}' perspective is intentional and justified."
                ));
                points += OMITTED_PRINCIPLE_POINTS;
            }
        }

        if scores.total() > 0 {
            let spread = scores.spread();
            if spread >= INTERNAL_SPREAD_THRESHOLD {
                warnings.push(format!(
                    "High internal imbalance: the '{name}' perspective weighs its principles very unevenly (difference of {spread} points)."
                ));
                recommendations.push(
                    "Review whether the large disparity within this perspective is sufficiently justified or calls for a more balanced deliberation."
                        .to_string(),
                );
                points += IMBALANCE_POINTS;
            }
        }
    }

    if let Some((heaviest, lightest, gap)) = external_gap(perspectives) {
        if gap >= EXTERNAL_GAP_THRESHOLD {
            warnings.push(format!(
                "High external imbalance: the '{}' perspective carries significantly more total weight than '{}'.",
                heaviest.label(),
                lightest.label()
            ));
            recommendations.push(
                "Analyze whether the dominance of one perspective over another is appropriate for this case or whether the weighting should be rebalanced for a fairer decision."
                    .to_string(),
            );
            points += IMBALANCE_POINTS;
        }
    }

    EthicalAnalysis {
        warnings,
        recommendations,
        severity: grade(points),
        severity_points: points,
    }
}

pub fn grade(points: u32) -> Severity {
    if points >= CRITICAL_POINTS {
        Severity::Critical
    } else if points >= MODERATE_POINTS {
        Severity::Moderate
    } else {
        Severity::Low
    }
}

/// Heaviest and lightest perspective by total score; the earliest wins ties.
fn external_gap(perspectives: &Perspectives) -> Option<(Perspective, Perspective, u32)> {
    let mut iter = perspectives.iter();
    let (first, scores) = iter.next()?;
    let mut max = (first, scores.total());
    let mut min = max;
    for (perspective, scores) in iter {
        let total = scores.total();
        if total > max.1 {
            max = (perspective, total);
        }
        if total < min.1 {
            min = (perspective, total);
        }
    }
    Some((max.0, min.0, max.1 - min.1))
}
