pub(crate) const UNDEFINED_AMOUNT: &str = "Non défini";
pub(crate) const NO_POINTS: &str = "Aucun";
pub(crate) const NO_DETENTION: &str = "Aucune";
pub(crate) const NO_FLAG: &str = "Non";

const PLACEHOLDER: &str = "///";
const DEFAULT_CATEGORY: &str = "Autres infractions";

const CATEGORY_KEYWORDS: [(&str, &[&str]); 4] = [
    ("Crimes et délits", &["vol", "homicide", "agression", "otage"]),
    ("Stupéfiants", &["cannabis", "drogue"]),
    ("Infractions routières", &["vitesse", "permis", "feu"]),
    ("Troubles à l'ordre public", &["manifestation", "outrage"]),
];

/// Trim a cell and replace empty values and the `///` placeholder with `fallback`.
pub(crate) fn cell_or(value: Option<&str>, fallback: &str) -> String {
    let trimmed = value.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return fallback.to_string();
    }
    trimmed.replace(PLACEHOLDER, fallback)
}

/// First matching keyword group wins; order matters.
pub(crate) fn category_for(infraction: &str) -> &'static str {
    let lower = infraction.to_lowercase();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|keyword| lower.contains(keyword)))
        .map(|(category, _)| *category)
        .unwrap_or(DEFAULT_CATEGORY)
}

pub(crate) fn flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "oui" | "yes" | "true" | "x"
    )
}
