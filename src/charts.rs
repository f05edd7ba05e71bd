//! Dashboard chart specs.
//!
//! Figures are emitted as Plotly-compatible JSON (`{"data": [...], "layout": {...}}`)
//! so any front end can render them without server-side imaging.

use serde_json::{json, Value};

use crate::models::{CaseCharts, Perspective, Perspectives, Principle, MAX_SCORE};

const RADAR_TITLE: &str = "Ethical Radar";
const CONSENSUS_TITLE: &str = "Consensus & Dissent by Principle";
const BALANCE_TITLE: &str = "Principle Balance by Perspective";

/// Per-principle agreement across the three perspectives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrincipleConsensus {
    pub principle: Principle,
    pub mean: f64,
    /// Population standard deviation; 0 means full consensus.
    pub std_dev: f64,
}

pub fn build_charts(perspectives: &Perspectives) -> CaseCharts {
    CaseCharts {
        radar: Some(radar_chart(perspectives)),
        consensus: Some(consensus_chart(perspectives)),
        balance: Some(balance_chart(perspectives)),
    }
}

fn principle_labels() -> Vec<&'static str> {
    Principle::ALL.iter().map(|p| p.label()).collect()
}

/// One filled polar trace per perspective over the four principles.
pub fn radar_chart(perspectives: &Perspectives) -> Value {
    let data: Vec<Value> = perspectives
        .iter()
        .map(|(perspective, scores)| {
            // Close the polygon by repeating the first vertex
            let mut r: Vec<u8> = scores.values().to_vec();
            r.push(r[0]);
            let mut theta = principle_labels();
            theta.push(theta[0]);
            json!({
                "type": "scatterpolar",
                "name": perspective.label(),
                "r": r,
                "theta": theta,
                "fill": "toself",
                "fillcolor": perspective.fill_color(),
                "line": {"color": perspective.color()},
            })
        })
        .collect();

    json!({
        "data": data,
        "layout": {
            "title": {"text": RADAR_TITLE},
            "polar": {"radialaxis": {"visible": true, "range": [0, MAX_SCORE]}},
            "showlegend": true,
        }
    })
}

pub fn principle_consensus(perspectives: &Perspectives) -> Vec<PrincipleConsensus> {
    Principle::ALL
        .iter()
        .map(|&principle| {
            let values: Vec<f64> = perspectives
                .iter()
                .map(|(_, scores)| f64::from(scores.get(principle)))
                .collect();
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            PrincipleConsensus {
                principle,
                mean,
                std_dev: variance.sqrt(),
            }
        })
        .collect()
}

/// Mean score per principle with standard-deviation error bars.
pub fn consensus_chart(perspectives: &Perspectives) -> Value {
    let consensus = principle_consensus(perspectives);
    let means: Vec<f64> = consensus.iter().map(|c| round2(c.mean)).collect();
    let stds: Vec<f64> = consensus.iter().map(|c| round2(c.std_dev)).collect();

    json!({
        "data": [{
            "type": "bar",
            "name": "Average score",
            "x": principle_labels(),
            "y": means,
            "error_y": {"type": "data", "array": stds, "visible": true},
            "marker": {"color": "#6366F1"},
        }],
        "layout": {
            "title": {"text": CONSENSUS_TITLE},
            "yaxis": {"title": {"text": "Average score (0-5)"}, "range": [0, 6]},
            "xaxis": {"title": {"text": "Principle"}},
        }
    })
}

/// Grouped bars: every perspective's score for each principle.
pub fn balance_chart(perspectives: &Perspectives) -> Value {
    let data: Vec<Value> = perspectives
        .iter()
        .map(|(perspective, scores)| {
            json!({
                "type": "bar",
                "name": perspective.label(),
                "x": principle_labels(),
                "y": scores.values(),
                "marker": {"color": perspective.color()},
            })
        })
        .collect();

    json!({
        "data": data,
        "layout": {
            "title": {"text": BALANCE_TITLE},
            "barmode": "group",
            "yaxis": {"title": {"text": "Score (0-5)"}, "range": [0, 5.5]},
            "xaxis": {"title": {"text": "Principle"}},
            "legend": {"title": {"text": "Perspective"}},
        }
    })
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Trace names in chart order, mostly for consumers that build legends.
pub fn perspective_names() -> Vec<&'static str> {
    Perspective::ALL.iter().map(|p| p.label()).collect()
}
