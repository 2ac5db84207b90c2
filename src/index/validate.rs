//! Integrity checks for a loaded index.

use super::model::{Postings, SearchIndex};
use crate::error::ValidationError;
use std::collections::BTreeMap;

/// Environment schema numbers this crate has been checked against.
pub const KNOWN_SPHINX_SCHEMAS: std::ops::RangeInclusive<i64> = 50..=64;

/// Outcome of validating an index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

impl Report {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Checks every structural invariant and collects all violations.
pub fn validate(index: &SearchIndex) -> Report {
    let mut report = Report::default();
    let len = index.docnames.len();

    if index.titles.len() != len {
        report.errors.push(ValidationError::LengthMismatch {
            field: "titles",
            expected: len,
            actual: index.titles.len(),
        });
    }
    if let Some(filenames) = &index.filenames
        && filenames.len() != len
    {
        report.errors.push(ValidationError::LengthMismatch {
            field: "filenames",
            expected: len,
            actual: filenames.len(),
        });
    }

    check_terms(&mut report, "terms", &index.terms, len);
    if let Some(titleterms) = &index.titleterms {
        check_terms(&mut report, "titleterms", titleterms, len);
    }

    let objtypes = index.objtypes.as_ref();
    let objnames = index.objnames.as_ref();

    if let Some(objects) = &index.objects {
        for (prefix, entry) in objects.iter() {
            let fullname = if prefix.is_empty() {
                entry.name.clone()
            } else {
                format!("{}.{}", prefix, entry.name)
            };
            if entry.doc >= len {
                report.errors.push(ValidationError::ObjectDocOutOfRange {
                    name: fullname.clone(),
                    doc: entry.doc,
                    len,
                });
            }
            let key = entry.objtype.to_string();
            if !objtypes.is_some_and(|t| t.contains_key(&key)) {
                report.errors.push(ValidationError::UnknownObjectType {
                    name: fullname.clone(),
                    objtype: entry.objtype,
                    table: "objtypes",
                });
            }
            if !objnames.is_some_and(|n| n.contains_key(&key)) {
                report.errors.push(ValidationError::UnknownObjectType {
                    name: fullname,
                    objtype: entry.objtype,
                    table: "objnames",
                });
            }
        }
    }

    if let (Some(objtypes), Some(objnames)) = (objtypes, objnames) {
        for key in objtypes.keys().filter(|k| !objnames.contains_key(*k)) {
            report.errors.push(ValidationError::ObjectTypeTableMismatch {
                objtype: key.clone(),
                present_in: "objtypes",
                missing_from: "objnames",
            });
        }
        for key in objnames.keys().filter(|k| !objtypes.contains_key(*k)) {
            report.errors.push(ValidationError::ObjectTypeTableMismatch {
                objtype: key.clone(),
                present_in: "objnames",
                missing_from: "objtypes",
            });
        }
    }

    match index.envversion.as_ref().map(super::model::EnvVersion::sphinx) {
        Some(Some(schema)) if !KNOWN_SPHINX_SCHEMAS.contains(&schema) => {
            report.warnings.push(format!(
                "environment schema {} is outside the tested range {}..={}",
                schema,
                KNOWN_SPHINX_SCHEMAS.start(),
                KNOWN_SPHINX_SCHEMAS.end()
            ));
        }
        Some(None) => report
            .warnings
            .push("envversion has no 'sphinx' entry".to_string()),
        _ => {}
    }

    for warning in &report.warnings {
        tracing::warn!("{}", warning);
    }

    report
}

fn check_terms(
    report: &mut Report,
    field: &'static str,
    terms: &BTreeMap<String, Postings>,
    len: usize,
) {
    for (term, postings) in terms {
        if term.is_empty() {
            report.errors.push(ValidationError::EmptyTerm { field });
        }
        for doc in postings.docs() {
            if doc >= len {
                report.errors.push(ValidationError::PostingOutOfRange {
                    field,
                    term: term.clone(),
                    doc,
                    len,
                });
            }
        }
    }
}
