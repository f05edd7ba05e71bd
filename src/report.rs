//! Deliberative report: assembly from an analyzed case and PDF export.

use chrono::Local;
use serde_json::Value;

use crate::models::{BioethicsCase, CaseCharts, CaseReport, EthicalAnalysis, Principle};
use crate::pdf::{PdfError, PdfWriter};

pub const REPORT_TITLE: &str = "Deliberative Report - BIOETHICARE 360";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Build the report for a freshly submitted case. Deliberation and chat start empty.
pub fn compile_report(
    case: &BioethicsCase,
    charts: CaseCharts,
    ethical_analysis: EthicalAnalysis,
) -> CaseReport {
    CaseReport {
        case_id: case.case_id.clone(),
        analyzed_at: Local::now().format(TIMESTAMP_FORMAT).to_string(),
        analyst: case.analyst.clone(),
        patient_summary: case.patient_summary(),
        primary_dilemma: case.primary_dilemma.clone(),
        suggested_dilemma: case.suggested_dilemma.clone().unwrap_or_default(),
        case_description: case.case_description.clone(),
        sociocultural_context: case.sociocultural_context.clone(),
        ai_key_points: case.ai_key_points.clone(),
        clinical_history_analysis: case.clinical_history_analysis.clone(),
        perspectives: case.perspectives,
        ethical_analysis,
        deliberative_analysis: String::new(),
        chat_history: Vec::new(),
        charts,
    }
}

/// Report JSON handed to the model, without chart specs.
pub fn prompt_context(report: &CaseReport) -> Result<String, serde_json::Error> {
    let mut value = serde_json::to_value(report)?;
    if let Value::Object(map) = &mut value {
        map.remove("charts");
    }
    serde_json::to_string_pretty(&value)
}

/// Labeled text sections in print order.
fn text_sections(report: &CaseReport) -> [(&'static str, &str); 10] {
    [
        ("Case ID", report.case_id.as_str()),
        ("Analysis Date", report.analyzed_at.as_str()),
        ("Analyst", report.analyst.as_str()),
        ("Patient Summary", report.patient_summary.as_str()),
        ("Primary Ethical Dilemma (Selected)", report.primary_dilemma.as_str()),
        ("AI-Suggested Dilemma", report.suggested_dilemma.as_str()),
        ("Detailed Case Description", report.case_description.as_str()),
        ("Sociocultural and Family Context", report.sociocultural_context.as_str()),
        ("Key Points for AI Deliberation", report.ai_key_points.as_str()),
        ("AI Clinical History Analysis", report.clinical_history_analysis.as_str()),
    ]
}

pub fn generate_report_pdf(report: &CaseReport) -> Result<Vec<u8>, PdfError> {
    let mut pdf = PdfWriter::new(REPORT_TITLE)?;
    pdf.title(REPORT_TITLE);

    for (label, value) in text_sections(report) {
        if !value.trim().is_empty() {
            pdf.heading(label);
            pdf.paragraph(value);
        }
    }

    let analysis = &report.ethical_analysis;
    pdf.heading("Ethical Coherence Analysis");
    pdf.paragraph(&format!("Severity Level: {}", analysis.severity.label()));
    for warning in &analysis.warnings {
        pdf.bullet(warning);
    }
    if !analysis.recommendations.is_empty() {
        pdf.space(2.0);
        pdf.paragraph(&format!(
            "Recommendations: {}",
            analysis.recommendations.join(" ")
        ));
    }

    pdf.heading("Multi-perspective Analysis");
    for (perspective, scores) in report.perspectives.iter() {
        let line = Principle::ALL
            .iter()
            .map(|&p| format!("{}: {}", p.label(), scores.get(p)))
            .collect::<Vec<_>>()
            .join(", ");
        pdf.paragraph(&format!("{}: {line}", perspective.label()));
    }

    if !report.deliberative_analysis.trim().is_empty() {
        pdf.heading("Deliberative Analysis (AI)");
        pdf.paragraph(&report.deliberative_analysis);
    }

    pdf.new_page();
    pdf.title("Data Visualizations");
    pdf.paragraph(
        "The radar and consensus/dissent charts are displayed interactively in the web application.",
    );

    if !report.chat_history.is_empty() {
        pdf.new_page();
        pdf.title("Deliberation Chat History");
        for message in &report.chat_history {
            pdf.field(&format!("{}:", message.role.label()), &message.content);
        }
    }

    pdf.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::build_charts;
    use crate::ethics::check_coherence;
    use crate::models::{CaseForm, ChatMessage, DilemmaCatalog, Gender};

    fn sample_case() -> BioethicsCase {
        let form = CaseForm {
            case_id: "HC-42".into(),
            patient_name: "Ana Ruiz".into(),
            age: 80,
            gender: Some(Gender::Female),
            case_description: "Advanced COPD, repeated ICU admissions.".into(),
            ..CaseForm::default()
        };
        let catalog = DilemmaCatalog::bundled().unwrap();
        BioethicsCase::from_form(form, Some("dr@example.org"), &catalog, Some("Key facts"))
            .unwrap()
    }

    fn sample_report() -> CaseReport {
        let case = sample_case();
        compile_report(
            &case,
            build_charts(&case.perspectives),
            check_coherence(&case.perspectives),
        )
    }

    #[test]
    fn compile_report_copies_case_fields() {
        let report = sample_report();
        assert_eq!(report.case_id, "HC-42");
        assert_eq!(report.analyst, "dr@example.org");
        assert_eq!(report.clinical_history_analysis, "Key facts");
        assert!(report.patient_summary.starts_with("Patient Ana Ruiz, 80 years"));
        assert!(report.suggested_dilemma.is_empty());
        assert!(report.deliberative_analysis.is_empty());
        assert!(report.chat_history.is_empty());
        assert!(report.charts.radar.is_some());
        // YYYY-MM-DD HH:MM:SS
        assert_eq!(report.analyzed_at.len(), 19);
        assert_eq!(&report.analyzed_at[4..5], "-");
        assert_eq!(&report.analyzed_at[10..11], " ");
    }

    #[test]
    fn prompt_context_omits_charts() {
        let report = sample_report();
        let context = prompt_context(&report).unwrap();
        assert!(!context.contains("scatterpolar"));
        assert!(!context.contains("\"charts\""));
        assert!(context.contains("HC-42"));
        assert!(context.contains("ethical_analysis"));
    }

    #[test]
    fn report_pdf_renders() {
        let bytes = generate_report_pdf(&sample_report()).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn report_pdf_with_chat_and_deliberation() {
        let mut report = sample_report();
        report.deliberative_analysis = "Long deliberation\n\nwith paragraphs".into();
        report.chat_history = vec![
            ChatMessage::user("What does the patient want?"),
            ChatMessage::assistant("Comfort-focused care."),
        ];
        let bytes = generate_report_pdf(&report).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
