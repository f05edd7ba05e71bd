//! Bioethics case: patient context plus the three-perspective weighting
//! of the four principles.

use serde::{Deserialize, Serialize};

use super::{Condition, DilemmaCatalog, Gender, ModelError, Perspective, Principle};

/// Highest score a principle can receive.
pub const MAX_SCORE: u8 = 5;
/// Score every slider starts at.
pub const DEFAULT_SCORE: u8 = 3;
pub const MAX_AGE: u32 = 120;
pub const MAX_GESTATION_WEEKS: u32 = 42;
/// Case ids become document ids; Firestore caps those well above this.
pub const MAX_CASE_ID_LEN: usize = 128;

const NOT_AVAILABLE: &str = "N/A";
const UNKNOWN_ANALYST: &str = "Unknown Analyst";

// ═══════════════════════════════════════════════════════════
// Scores
// ═══════════════════════════════════════════════════════════

/// One perspective's 0-5 weighting of the four principles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrincipleScores {
    pub autonomy: u8,
    pub beneficence: u8,
    pub non_maleficence: u8,
    pub justice: u8,
}

impl Default for PrincipleScores {
    fn default() -> Self {
        Self::uniform(DEFAULT_SCORE)
    }
}

impl PrincipleScores {
    pub fn new(autonomy: u8, beneficence: u8, non_maleficence: u8, justice: u8) -> Self {
        Self {
            autonomy,
            beneficence,
            non_maleficence,
            justice,
        }
    }

    pub fn uniform(score: u8) -> Self {
        Self::new(score, score, score, score)
    }

    pub fn get(&self, principle: Principle) -> u8 {
        match principle {
            Principle::Autonomy => self.autonomy,
            Principle::Beneficence => self.beneficence,
            Principle::NonMaleficence => self.non_maleficence,
            Principle::Justice => self.justice,
        }
    }

    /// Scores in `Principle::ALL` order.
    pub fn values(&self) -> [u8; 4] {
        Principle::ALL.map(|p| self.get(p))
    }

    pub fn total(&self) -> u32 {
        self.values().iter().map(|&v| u32::from(v)).sum()
    }

    /// Difference between the highest and lowest principle score.
    pub fn spread(&self) -> u8 {
        let values = self.values();
        let max = values.iter().copied().max().unwrap_or(0);
        let min = values.iter().copied().min().unwrap_or(0);
        max - min
    }

    fn validate(&self, perspective: Perspective) -> Result<(), ModelError> {
        for principle in Principle::ALL {
            let score = self.get(principle);
            if score > MAX_SCORE {
                return Err(ModelError::Validation(format!(
                    "{} score for {} must be between 0 and {MAX_SCORE} (got {score})",
                    principle.label(),
                    perspective.label(),
                )));
            }
        }
        Ok(())
    }
}

/// Weighting by each stakeholder group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Perspectives {
    pub medical_team: PrincipleScores,
    pub family_patient: PrincipleScores,
    pub ethics_committee: PrincipleScores,
}

impl Perspectives {
    pub fn get(&self, perspective: Perspective) -> &PrincipleScores {
        match perspective {
            Perspective::MedicalTeam => &self.medical_team,
            Perspective::FamilyPatient => &self.family_patient,
            Perspective::EthicsCommittee => &self.ethics_committee,
        }
    }

    /// Perspectives in `Perspective::ALL` order.
    pub fn iter(&self) -> impl Iterator<Item = (Perspective, &PrincipleScores)> + '_ {
        Perspective::ALL.into_iter().map(move |p| (p, self.get(p)))
    }
}

// ═══════════════════════════════════════════════════════════
// Input form
// ═══════════════════════════════════════════════════════════

/// Case registration form as submitted by the client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaseForm {
    pub case_id: String,
    pub patient_name: String,
    pub age: u32,
    pub gender: Option<Gender>,
    pub gestation_weeks: u32,
    pub condition: Condition,
    /// Must name a catalog dilemma; blank picks the catalog's first entry.
    pub primary_dilemma: String,
    pub suggested_dilemma: Option<String>,
    pub case_description: String,
    pub sociocultural_context: String,
    pub ai_key_points: String,
    pub perspectives: Perspectives,
    pub generate_consent: bool,
}

// ═══════════════════════════════════════════════════════════
// Case
// ═══════════════════════════════════════════════════════════

/// A validated, normalized case ready for analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BioethicsCase {
    pub case_id: String,
    pub patient_name: String,
    pub age: u32,
    pub gender: Option<Gender>,
    pub analyst: String,
    pub primary_dilemma: String,
    pub suggested_dilemma: Option<String>,
    pub case_description: String,
    pub sociocultural_context: String,
    pub condition: Condition,
    pub gestation_weeks: u32,
    pub ai_key_points: String,
    pub clinical_history_analysis: String,
    pub perspectives: Perspectives,
}

impl BioethicsCase {
    /// Validate a form and normalize its text fields.
    ///
    /// `analyst` is the signed-in user's e-mail. `clinical_history_analysis`
    /// carries the AI pre-analysis from the same session, if any.
    pub fn from_form(
        form: CaseForm,
        analyst: Option<&str>,
        catalog: &DilemmaCatalog,
        clinical_history_analysis: Option<&str>,
    ) -> Result<Self, ModelError> {
        let case_id = validate_case_id(&form.case_id)?;

        if form.age > MAX_AGE {
            return Err(ModelError::Validation(format!(
                "Age must be between 0 and {MAX_AGE} (got {})",
                form.age
            )));
        }
        if form.gestation_weeks > MAX_GESTATION_WEEKS {
            return Err(ModelError::Validation(format!(
                "Gestation weeks must be between 0 and {MAX_GESTATION_WEEKS} (got {})",
                form.gestation_weeks
            )));
        }
        for (perspective, scores) in form.perspectives.iter() {
            scores.validate(perspective)?;
        }

        let primary_dilemma = resolve_dilemma(&form.primary_dilemma, catalog)?;

        Ok(Self {
            case_id,
            patient_name: text_or(&form.patient_name, NOT_AVAILABLE),
            age: form.age,
            gender: form.gender,
            analyst: analyst
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .unwrap_or(UNKNOWN_ANALYST)
                .to_string(),
            primary_dilemma,
            suggested_dilemma: form
                .suggested_dilemma
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            case_description: form.case_description.trim().to_string(),
            sociocultural_context: form.sociocultural_context.trim().to_string(),
            condition: form.condition,
            gestation_weeks: form.gestation_weeks,
            ai_key_points: form.ai_key_points.trim().to_string(),
            clinical_history_analysis: clinical_history_analysis
                .unwrap_or_default()
                .trim()
                .to_string(),
            perspectives: form.perspectives,
        })
    }

    /// One-line patient summary used at the top of the report.
    pub fn patient_summary(&self) -> String {
        let gender = self.gender.map(|g| g.label()).unwrap_or(NOT_AVAILABLE);
        let mut summary = format!(
            "Patient {}, {} years, gender {}, condition {}.",
            self.patient_name,
            self.age,
            gender,
            self.condition.label()
        );
        if self.gestation_weeks > 0 {
            summary.push_str(&format!(" Neonate of {} wk.", self.gestation_weeks));
        }
        summary
    }
}

/// Case ids are user-chosen and become storage document ids.
pub fn validate_case_id(raw: &str) -> Result<String, ModelError> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(ModelError::Validation("The case id field is required".into()));
    }
    if id.chars().count() > MAX_CASE_ID_LEN {
        return Err(ModelError::Validation(format!(
            "Case id is too long (max {MAX_CASE_ID_LEN} characters)"
        )));
    }
    if id.contains('/') || id == "." || id == ".." || (id.starts_with("__") && id.ends_with("__"))
    {
        return Err(ModelError::Validation(format!(
            "Case id '{id}' contains reserved characters"
        )));
    }
    Ok(id.to_string())
}

fn resolve_dilemma(requested: &str, catalog: &DilemmaCatalog) -> Result<String, ModelError> {
    let requested = requested.trim();
    if requested.is_empty() {
        return catalog
            .default_name()
            .map(str::to_string)
            .ok_or_else(|| ModelError::Validation("A primary dilemma is required".into()));
    }
    if !catalog.is_empty() && catalog.get(requested).is_none() {
        return Err(ModelError::Validation(format!(
            "Unknown dilemma '{requested}'"
        )));
    }
    Ok(requested.to_string())
}

fn text_or(value: &str, default: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> DilemmaCatalog {
        DilemmaCatalog::bundled().unwrap()
    }

    fn form(case_id: &str) -> CaseForm {
        CaseForm {
            case_id: case_id.into(),
            patient_name: "  Ana Ruiz ".into(),
            age: 67,
            gender: Some(Gender::Female),
            ..CaseForm::default()
        }
    }

    #[test]
    fn form_defaults_match_slider_defaults() {
        let form: CaseForm = serde_json::from_str(r#"{"case_id": "HC-1"}"#).unwrap();
        assert_eq!(form.perspectives.medical_team, PrincipleScores::uniform(3));
        assert_eq!(form.condition, Condition::Stable);
        assert!(!form.generate_consent);
    }

    #[test]
    fn from_form_normalizes_fields() {
        let case = BioethicsCase::from_form(form(" HC-100 "), Some("dr@example.org"), &catalog(), None)
            .unwrap();
        assert_eq!(case.case_id, "HC-100");
        assert_eq!(case.patient_name, "Ana Ruiz");
        assert_eq!(case.analyst, "dr@example.org");
        assert_eq!(case.primary_dilemma, catalog().default_name().unwrap());
        assert!(case.clinical_history_analysis.is_empty());
    }

    #[test]
    fn blank_names_fall_back() {
        let mut f = form("HC-1");
        f.patient_name = "   ".into();
        let case = BioethicsCase::from_form(f, None, &catalog(), Some(" notes ")).unwrap();
        assert_eq!(case.patient_name, "N/A");
        assert_eq!(case.analyst, "Unknown Analyst");
        assert_eq!(case.clinical_history_analysis, "notes");
    }

    #[test]
    fn case_id_is_required() {
        let err = BioethicsCase::from_form(form("   "), None, &catalog(), None).unwrap_err();
        assert!(err.to_string().contains("required"));
    }

    #[test]
    fn case_id_rejects_path_separator() {
        assert!(validate_case_id("a/b").is_err());
        assert!(validate_case_id("..").is_err());
        assert!(validate_case_id("__x__").is_err());
        assert!(validate_case_id(&"x".repeat(129)).is_err());
        assert_eq!(validate_case_id("HC-2024-17").unwrap(), "HC-2024-17");
    }

    #[test]
    fn out_of_range_values_rejected() {
        let mut f = form("HC-1");
        f.age = 121;
        assert!(BioethicsCase::from_form(f, None, &catalog(), None).is_err());

        let mut f = form("HC-1");
        f.gestation_weeks = 43;
        assert!(BioethicsCase::from_form(f, None, &catalog(), None).is_err());

        let mut f = form("HC-1");
        f.perspectives.family_patient.justice = 6;
        let err = BioethicsCase::from_form(f, None, &catalog(), None).unwrap_err();
        assert!(err.to_string().contains("Family/Patient"));
    }

    #[test]
    fn unknown_dilemma_rejected_when_catalog_present() {
        let mut f = form("HC-1");
        f.primary_dilemma = "Not in catalog".into();
        assert!(BioethicsCase::from_form(f.clone(), None, &catalog(), None).is_err());
        // An empty catalog accepts any named dilemma
        let case = BioethicsCase::from_form(f, None, &DilemmaCatalog::empty(), None).unwrap();
        assert_eq!(case.primary_dilemma, "Not in catalog");
    }

    #[test]
    fn empty_catalog_requires_dilemma() {
        let err = BioethicsCase::from_form(form("HC-1"), None, &DilemmaCatalog::empty(), None)
            .unwrap_err();
        assert!(err.to_string().contains("dilemma"));
    }

    #[test]
    fn patient_summary_format() {
        let case = BioethicsCase::from_form(form("HC-1"), None, &catalog(), None).unwrap();
        assert_eq!(
            case.patient_summary(),
            "Patient Ana Ruiz, 67 years, gender Female, condition Stable."
        );
    }

    #[test]
    fn patient_summary_mentions_gestation() {
        let mut f = form("HC-1");
        f.age = 0;
        f.gender = None;
        f.condition = Condition::Neonate;
        f.gestation_weeks = 29;
        let case = BioethicsCase::from_form(f, None, &catalog(), None).unwrap();
        assert_eq!(
            case.patient_summary(),
            "Patient Ana Ruiz, 0 years, gender N/A, condition Neonate. Neonate of 29 wk."
        );
    }

    #[test]
    fn scores_total_and_spread() {
        let scores = PrincipleScores::new(5, 1, 3, 0);
        assert_eq!(scores.total(), 9);
        assert_eq!(scores.spread(), 5);
        assert_eq!(scores.values(), [5, 1, 3, 0]);
    }
}
