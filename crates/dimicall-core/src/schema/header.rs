use crate::text::fold;
use serde::Serialize;
use std::collections::HashMap;

/// Canonical header keys and the folded spellings that resolve to them.
const SYNONYMS: &[(&str, &[&str])] = &[
    (
        "prenom",
        &["prenom", "firstname", "first_name", "first name", "fname", "given name", "given_name"],
    ),
    (
        "nom",
        &["nom", "lastname", "last_name", "last name", "lname", "surname", "family_name", "family name", "nom de famille"],
    ),
    (
        "telephone",
        &[
            "telephone", "tel", "phone", "numero", "number", "mobile", "gsm", "portable",
            "cellulaire", "numero de telephone", "phone_number", "phone number",
        ],
    ),
    (
        "email",
        &[
            "email", "e-mail", "mail", "mel", "courriel", "adresse_mail", "adresse mail",
            "email_address", "email address",
        ],
    ),
    (
        "source",
        &[
            "source", "origin", "origine", "ecole", "etablissement", "institution",
            "university", "universite", "school",
        ],
    ),
    ("statut", &["statut", "status", "etat", "state", "situation", "resultat"]),
    ("statut_final", &["statut_final", "statut final", "final status"]),
    (
        "commentaire",
        &[
            "commentaire", "commentaires", "comment", "comments", "note", "notes", "remarque",
            "remarques", "observation", "observations",
        ],
    ),
    ("date_rappel", &["date_rappel", "date rappel", "date de rappel", "callback date"]),
    ("heure_rappel", &["heure_rappel", "heure rappel", "heure de rappel", "callback time"]),
    ("date_rdv", &["date_rdv", "date rdv", "date de rdv", "date rendez-vous", "appointment date"]),
    ("heure_rdv", &["heure_rdv", "heure rdv", "heure de rdv", "heure rendez-vous", "appointment time"]),
    ("date_appel", &["date_appel", "date appel", "date d'appel", "call date"]),
    ("heure_appel", &["heure_appel", "heure appel", "heure d'appel", "call time"]),
    ("duree_appel", &["duree_appel", "duree appel", "duree", "duree d'appel", "call duration"]),
    ("sexe", &["sexe", "sex", "genre", "gender", "civilite"]),
    ("don", &["don", "donation", "dons"]),
    ("qualite", &["qualite", "quality"]),
    ("type", &["type", "kind"]),
    ("uid", &["uid", "identifiant", "external_id"]),
];

/// Result of resolving one source header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedHeader {
    pub original: String,
    pub key: String,
    pub recognized: bool,
}

/// Resolves raw column headers to canonical header keys.
///
/// Lookups are case- and accent-insensitive. A header missing from the
/// dictionary comes back folded with `recognized == false`; it stays a
/// mapping candidate and is never dropped.
#[derive(Debug, Clone)]
pub struct HeaderNormalizer {
    lookup: HashMap<String, &'static str>,
}

impl Default for HeaderNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderNormalizer {
    pub fn new() -> Self {
        let lookup = SYNONYMS
            .iter()
            .flat_map(|(key, spellings)| spellings.iter().map(move |s| (fold(s), *key)))
            .collect();
        Self { lookup }
    }

    /// Adds extra spellings. Entries whose target is not a canonical header
    /// key are skipped and returned.
    pub fn with_synonyms<I, S, T>(mut self, synonyms: I) -> (Self, Vec<String>)
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        let mut rejected = Vec::new();
        for (spelling, target) in synonyms {
            match canonical_key(target.as_ref()) {
                Some(key) => {
                    self.lookup.insert(fold(spelling.as_ref()), key);
                }
                None => rejected.push(target.as_ref().to_string()),
            }
        }
        (self, rejected)
    }

    pub fn normalize(&self, header: &str) -> NormalizedHeader {
        let cleaned = fold(header);
        match self.lookup.get(&cleaned) {
            Some(key) => NormalizedHeader {
                original: header.to_string(),
                key: (*key).to_string(),
                recognized: true,
            },
            None => {
                tracing::debug!(header, key = %cleaned, "unrecognized column header");
                NormalizedHeader {
                    original: header.to_string(),
                    key: cleaned,
                    recognized: false,
                }
            }
        }
    }

    pub fn key(&self, header: &str) -> String {
        self.normalize(header).key
    }
}

/// Returns the static canonical header key matching `value`, if any.
pub fn canonical_key(value: &str) -> Option<&'static str> {
    let folded = fold(value);
    SYNONYMS
        .iter()
        .map(|(key, _)| *key)
        .find(|key| *key == folded)
}

#[cfg(test)]
mod tests {
    use super::{canonical_key, HeaderNormalizer, SYNONYMS};

    #[test]
    fn case_and_accents_do_not_matter() {
        let normalizer = HeaderNormalizer::new();
        for header in ["Prénom", "PRENOM", "prenom ", "  PRÉNOM", "First Name"] {
            let normalized = normalizer.normalize(header);
            assert_eq!(normalized.key, "prenom", "header {header:?}");
            assert!(normalized.recognized);
        }
    }

    #[test]
    fn phone_synonyms_resolve() {
        let normalizer = HeaderNormalizer::new();
        for header in ["Téléphone", "Numéro", "tel", "Mobile", "GSM", "Portable"] {
            assert_eq!(normalizer.key(header), "telephone", "header {header:?}");
        }
    }

    #[test]
    fn every_core_key_has_five_synonyms() {
        for key in [
            "prenom",
            "nom",
            "telephone",
            "email",
            "source",
            "statut",
            "commentaire",
        ] {
            let (_, spellings) = SYNONYMS.iter().find(|(k, _)| *k == key).unwrap();
            assert!(spellings.len() >= 5, "{key} has {} synonyms", spellings.len());
        }
    }

    #[test]
    fn unknown_headers_come_back_folded() {
        let normalizer = HeaderNormalizer::new();
        let normalized = normalizer.normalize(" Date_Appel_1 ");
        assert_eq!(normalized.key, "date_appel_1");
        assert!(!normalized.recognized);
        assert_eq!(normalized.original, " Date_Appel_1 ");
    }

    #[test]
    fn extra_synonyms_extend_the_dictionary() {
        let (normalizer, rejected) = HeaderNormalizer::new()
            .with_synonyms([("Cellphone", "telephone"), ("Ville", "city")]);
        assert_eq!(normalizer.key("cellphone"), "telephone");
        assert_eq!(rejected, vec!["city".to_string()]);
        assert_eq!(canonical_key("Téléphone"), Some("telephone"));
    }
}
