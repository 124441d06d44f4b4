//! Fixed legal vocabulary tables
//!
//! Abbreviations, synonyms, the closed spelling vocabulary, use-of-force
//! keywords and jurisdiction indicators. All keys are lowercase.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Abbreviation -> expansions, most specific first
pub static ABBREVIATIONS: Lazy<Vec<(&'static str, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        // impaired driving
        ("owi", vec!["operating while intoxicated", "dui"]),
        ("dui", vec!["driving under the influence", "owi"]),
        ("dwi", vec!["driving while intoxicated", "owi"]),
        ("pac", vec!["prohibited alcohol concentration"]),
        ("bac", vec!["blood alcohol concentration"]),
        // law enforcement
        ("ofc", vec!["officer"]),
        ("sgt", vec!["sergeant"]),
        ("lt", vec!["lieutenant"]),
        ("det", vec!["detective"]),
        ("dept", vec!["department"]),
        // legal standards and process
        ("pc", vec!["probable cause"]),
        ("rs", vec!["reasonable suspicion"]),
        ("sw", vec!["search warrant"]),
        ("arw", vec!["arrest warrant"]),
        ("da", vec!["district attorney"]),
        ("ada", vec!["assistant district attorney"]),
        ("cvsa", vec!["commercial vehicle safety alliance"]),
        // Wisconsin
        ("wis", vec!["wisconsin"]),
        ("stat", vec!["statute"]),
        ("terry stop", vec!["investigatory detention", "stop and frisk"]),
    ]
});

/// Expansion -> abbreviation, derived from [`ABBREVIATIONS`]
///
/// Only multi-word expansions are reversed so that a short expansion like
/// `owi` does not loop back through another abbreviation.
pub static REVERSE_ABBREVIATIONS: Lazy<Vec<(&'static str, Vec<&'static str>)>> = Lazy::new(|| {
    let mut reverse: Vec<(&'static str, Vec<&'static str>)> = Vec::new();
    for (abbrev, expansions) in ABBREVIATIONS.iter() {
        if abbrev.contains(' ') {
            continue;
        }
        for expansion in expansions.iter().filter(|e| e.contains(' ')) {
            match reverse.iter_mut().find(|(e, _)| e == expansion) {
                Some((_, abbrevs)) => abbrevs.push(abbrev),
                None => reverse.push((expansion, vec![abbrev])),
            }
        }
    }
    reverse
});

/// Legal synonyms and closely related terms
pub static SYNONYMS: Lazy<Vec<(&'static str, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        ("investigatory detention", vec!["terry stop", "temporary detention"]),
        ("stop and frisk", vec!["terry stop", "investigatory detention"]),
        ("search warrant", vec!["warrant"]),
        ("probable cause", vec!["reasonable belief"]),
        ("reasonable suspicion", vec!["articulable suspicion"]),
        ("miranda warning", vec!["miranda rights", "rights advisement"]),
        ("miranda rights", vec!["miranda warning", "rights advisement"]),
        ("traffic stop", vec!["vehicle stop"]),
        ("vehicle stop", vec!["traffic stop"]),
        ("homicide", vec!["murder", "manslaughter"]),
        ("assault", vec!["battery"]),
        ("theft", vec!["larceny"]),
        ("burglary", vec!["unlawful entry"]),
        ("arraignment", vec!["initial appearance"]),
        ("plea bargain", vec!["plea agreement"]),
        ("due process", vec!["procedural fairness"]),
    ]
});

/// Closed spelling vocabulary: misspelling -> legal term
///
/// Tokens outside this table are never corrected.
pub static SPELLING: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("homocide", "homicide"),
        ("homicde", "homicide"),
        ("mirranda", "miranda"),
        ("miranada", "miranda"),
        ("probabl", "probable"),
        ("arangement", "arraignment"),
        ("arraingment", "arraignment"),
        ("manslauter", "manslaughter"),
        ("burglery", "burglary"),
        ("intoxicted", "intoxicated"),
        ("subpena", "subpoena"),
        ("warrent", "warrant"),
        ("jurisdicton", "jurisdiction"),
        ("terri", "terry"),
    ])
});

/// Use-of-force keywords, matched on word boundaries
pub static USE_OF_FORCE_KEYWORDS: &[&str] = &[
    "use of force",
    "force",
    "deadly force",
    "lethal force",
    "shooting",
    "taser",
    "restraint",
    "chokehold",
    "neck restraint",
    "handcuff",
    "take down",
    "take-down",
    "self-defense",
    "imminent threat",
    "excessive force",
];

/// Query phrase -> jurisdiction code
pub static JURISDICTION_INDICATORS: &[(&str, &str)] = &[
    ("wisconsin", "WI"),
    ("wis. stat", "WI"),
    ("wis stat", "WI"),
    ("wi", "WI"),
    ("federal", "US"),
    ("u.s.c", "US"),
    ("usc", "US"),
    ("united states code", "US"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_abbreviations_derived() {
        let entry = REVERSE_ABBREVIATIONS
            .iter()
            .find(|(e, _)| *e == "operating while intoxicated")
            .map(|(_, a)| a.clone());
        assert_eq!(entry, Some(vec!["owi"]));

        assert!(REVERSE_ABBREVIATIONS.iter().all(|(e, _)| e.contains(' ')));
        assert!(!REVERSE_ABBREVIATIONS.iter().any(|(_, a)| a.contains(&"terry stop")));
    }

    #[test]
    fn test_keys_are_lowercase() {
        for (key, _) in ABBREVIATIONS.iter().chain(SYNONYMS.iter()) {
            assert_eq!(*key, key.to_lowercase());
        }
        for key in SPELLING.keys() {
            assert_eq!(*key, key.to_lowercase());
        }
    }
}
