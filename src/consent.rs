//! Informed consent/assent document.

use chrono::Local;

use crate::models::{BioethicsCase, DilemmaCatalog};
use crate::pdf::{PdfError, PdfWriter};

const NOT_SPECIFIED: &str = "Not specified";
const SEPARATOR: &str = "------------------------------------------------------------------";
const CONSENT_PDF_TITLE: &str = "Informed Consent - BIOETHICARE 360";

fn bullet_list(items: Option<&[String]>) -> String {
    match items {
        Some(items) if !items.is_empty() => items
            .iter()
            .map(|i| format!("- {i}"))
            .collect::<Vec<_>>()
            .join("\n"),
        _ => format!("- {NOT_SPECIFIED}"),
    }
}

/// Plain-text consent document for the case's primary dilemma.
pub fn consent_text(case: &BioethicsCase, catalog: &DilemmaCatalog) -> String {
    let dilemma = catalog.get(&case.primary_dilemma);
    let risks = bullet_list(dilemma.map(|d| d.risks.as_slice()));
    let benefits = bullet_list(dilemma.map(|d| d.benefits.as_slice()));
    let alternatives = bullet_list(dilemma.map(|d| d.alternatives.as_slice()));
    let regulations = bullet_list(dilemma.map(|d| d.regulations.as_slice()));
    let gender = case.gender.map(|g| g.label()).unwrap_or("N/A");
    let date = Local::now().format("%Y-%m-%d");

    format!(
        "\
INFORMED CONSENT/ASSENT (BIOETHICARE 360)

Date: {date}
Case ID: {case_id}

{SEPARATOR}
PATIENT DATA
{SEPARATOR}
Name: {name}
Age: {age} years
Gender: {gender}
Primary Ethical Dilemma: {dilemma_name}

{SEPARATOR}
INFORMATION ABOUT THE DECISION
{SEPARATOR}
In the context of your clinical situation, a primary ethical dilemma related to \"{dilemma_name}\" has been identified. The relevant information is presented below so that you (or your representative) can make an informed decision.

1. POTENTIAL RISKS:
{risks}

2. EXPECTED BENEFITS:
{benefits}

3. AVAILABLE ALTERNATIVES:
{alternatives}

4. REGULATORY AND ETHICAL FRAMEWORK:
This deliberation is framed by the following regulations and principles:
{regulations}

{SEPARATOR}
DECLARATION AND SIGNATURE
{SEPARATOR}
I declare that I have read (or have had read to me) and understood the information above. I have had the opportunity to ask questions and all of them have been answered to my satisfaction.

I understand that my decision is voluntary and that I may withdraw it at any time without affecting the quality of my medical care.

Signature of Patient/Legal Guardian: _________________________
Name: _________________________
Date: _________________________

Signature of Healthcare Professional: _________________________
Name: {analyst}
Date: _________________________
",
        case_id = case.case_id,
        name = case.patient_name,
        age = case.age,
        dilemma_name = case.primary_dilemma,
        analyst = case.analyst,
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentLine {
    Title,
    Heading,
    Body,
}

/// A line is a heading when it has cased characters and all of them are
/// upper case, unless it is a list item.
pub fn classify_line(line: &str) -> ConsentLine {
    let mut has_cased = false;
    for c in line.chars() {
        if c.is_lowercase() {
            return ConsentLine::Body;
        }
        if c.is_uppercase() {
            has_cased = true;
        }
    }
    if !has_cased || line.starts_with('-') {
        ConsentLine::Body
    } else if line.contains("CONSENT") {
        ConsentLine::Title
    } else {
        ConsentLine::Heading
    }
}

pub fn generate_consent_pdf(text: &str) -> Result<Vec<u8>, PdfError> {
    let mut pdf = PdfWriter::new(CONSENT_PDF_TITLE)?;
    for line in text.split('\n') {
        match classify_line(line) {
            ConsentLine::Title => pdf.title(line),
            ConsentLine::Heading => {
                pdf.heading(line);
                pdf.rule();
            }
            ConsentLine::Body => pdf.paragraph(line),
        }
    }
    pdf.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CaseForm;

    fn case(dilemma: &str, catalog: &DilemmaCatalog) -> BioethicsCase {
        let form = CaseForm {
            case_id: "HC-7".into(),
            patient_name: "Luis Perez".into(),
            age: 54,
            primary_dilemma: dilemma.into(),
            ..CaseForm::default()
        };
        BioethicsCase::from_form(form, Some("dr@example.org"), catalog, None).unwrap()
    }

    #[test]
    fn text_lists_dilemma_details() {
        let catalog = DilemmaCatalog::bundled().unwrap();
        let text = consent_text(&case("Refusal of treatment", &catalog), &catalog);
        assert!(text.starts_with("INFORMED CONSENT/ASSENT"));
        assert!(text.contains("Case ID: HC-7"));
        assert!(text.contains("Name: Luis Perez"));
        assert!(text.contains("- Second medical opinion"));
        assert!(text.contains("Name: dr@example.org"));
        assert!(!text.contains(NOT_SPECIFIED));
    }

    #[test]
    fn unknown_dilemma_defaults_to_not_specified() {
        let empty = DilemmaCatalog::empty();
        let text = consent_text(&case("Custom dilemma", &empty), &empty);
        assert_eq!(text.matches("- Not specified").count(), 4);
        assert!(text.contains("\"Custom dilemma\""));
    }

    #[test]
    fn heading_detection() {
        assert_eq!(
            classify_line("INFORMED CONSENT/ASSENT (BIOETHICARE 360)"),
            ConsentLine::Title
        );
        assert_eq!(classify_line("PATIENT DATA"), ConsentLine::Heading);
        assert_eq!(classify_line("1. POTENTIAL RISKS:"), ConsentLine::Heading);
        assert_eq!(classify_line(SEPARATOR), ConsentLine::Body);
        assert_eq!(classify_line(""), ConsentLine::Body);
        assert_eq!(classify_line("- ICU"), ConsentLine::Body);
        assert_eq!(classify_line("Name: Luis"), ConsentLine::Body);
    }

    #[test]
    fn consent_pdf_renders() {
        let catalog = DilemmaCatalog::bundled().unwrap();
        let text = consent_text(&case("", &catalog), &catalog);
        let bytes = generate_consent_pdf(&text).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
