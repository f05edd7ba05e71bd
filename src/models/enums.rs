use serde::{Deserialize, Serialize};

use super::ModelError;

/// Macro to generate enum with as_str + label + std::str::FromStr pattern.
/// The wire form (serde, storage) is the `as_str` value.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal, $label:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            /// Human-readable name used in reports and charts.
            pub fn label(&self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.label())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ModelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(ModelError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Gender {
    Male => "male", "Male",
    Female => "female", "Female",
    Other => "other", "Other",
});

str_enum!(Condition {
    Stable => "stable", "Stable",
    Critical => "critical", "Critical",
    Terminal => "terminal", "Terminal",
    Neonate => "neonate", "Neonate",
});

str_enum!(Principle {
    Autonomy => "autonomy", "Autonomy",
    Beneficence => "beneficence", "Beneficence",
    NonMaleficence => "non_maleficence", "Non-Maleficence",
    Justice => "justice", "Justice",
});

str_enum!(Perspective {
    MedicalTeam => "medical_team", "Medical Team",
    FamilyPatient => "family_patient", "Family/Patient",
    EthicsCommittee => "ethics_committee", "Bioethics Committee",
});

str_enum!(Severity {
    Low => "low", "Low",
    Moderate => "moderate", "Moderate",
    Critical => "critical", "Critical",
});

str_enum!(ChatRole {
    User => "user", "User",
    Assistant => "assistant", "Assistant",
});

impl Default for Condition {
    fn default() -> Self {
        Self::Stable
    }
}

impl Principle {
    /// Fixed principle order used by every score table and chart axis.
    pub const ALL: [Principle; 4] = [
        Principle::Autonomy,
        Principle::Beneficence,
        Principle::NonMaleficence,
        Principle::Justice,
    ];
}

impl Perspective {
    /// Fixed perspective order; ties in the coherence check resolve to the earliest.
    pub const ALL: [Perspective; 3] = [
        Perspective::MedicalTeam,
        Perspective::FamilyPatient,
        Perspective::EthicsCommittee,
    ];

    /// Chart colour (hex) for this perspective.
    pub fn color(&self) -> &'static str {
        match self {
            Perspective::MedicalTeam => "#EF4444",
            Perspective::FamilyPatient => "#3B82F6",
            Perspective::EthicsCommittee => "#22C55E",
        }
    }

    /// Translucent chart fill for radar areas.
    pub fn fill_color(&self) -> &'static str {
        match self {
            Perspective::MedicalTeam => "rgba(239, 68, 68, 0.7)",
            Perspective::FamilyPatient => "rgba(59, 130, 246, 0.7)",
            Perspective::EthicsCommittee => "rgba(34, 197, 94, 0.7)",
        }
    }
}
