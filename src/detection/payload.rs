//! Wire format for the language service PII call

use super::settings::DetectionSettings;
use super::DocumentResult;
use crate::scanner::types::{DetectionResult, ScanUnit};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const PII_TASK_KIND: &str = "PiiEntityRecognition";

// Offsets come back in code points so they line up with unit character offsets
const STRING_INDEX_TYPE: &str = "UnicodeCodePoint";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest<'a> {
    pub kind: &'static str,
    pub analysis_input: AnalysisInput<'a>,
    pub parameters: Parameters<'a>,
}

#[derive(Debug, Serialize)]
pub struct AnalysisInput<'a> {
    pub documents: Vec<InputDocument<'a>>,
}

#[derive(Debug, Serialize)]
pub struct InputDocument<'a> {
    pub id: &'a str,
    pub language: &'a str,
    pub text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters<'a> {
    pub model_version: &'a str,
    pub domain: &'a str,
    pub string_index_type: &'static str,
}

impl<'a> AnalyzeRequest<'a> {
    pub fn new(units: &'a [ScanUnit], settings: &'a DetectionSettings) -> Self {
        Self {
            kind: PII_TASK_KIND,
            analysis_input: AnalysisInput {
                documents: units
                    .iter()
                    .map(|unit| InputDocument {
                        id: unit.id(),
                        language: &settings.language,
                        text: unit.text(),
                    })
                    .collect(),
            },
            parameters: Parameters {
                model_version: &settings.model_version,
                domain: &settings.domain,
                string_index_type: STRING_INDEX_TYPE,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeResponse {
    pub results: AnalyzeResults,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeResults {
    #[serde(default)]
    pub documents: Vec<ResponseDocument>,
    #[serde(default)]
    pub errors: Vec<DocumentError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseDocument {
    pub id: String,
    #[serde(default)]
    pub redacted_text: Option<String>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub text: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    pub offset: usize,
    pub length: usize,
    pub confidence_score: f64,
}

#[derive(Debug, Deserialize)]
pub struct DocumentError {
    pub id: String,
    pub error: ServiceError,
}

#[derive(Debug, Deserialize)]
pub struct ServiceError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

/// Map a decoded response back onto the requested units
///
/// Only documents the service analysed come back, in request order.
/// Entities under `threshold` are dropped. Units the service reported an
/// error for, or left out of the response, are logged and omitted so the
/// caller never mistakes them for clean text.
pub fn assemble_documents(
    units: &[ScanUnit],
    response: AnalyzeResponse,
    threshold: f64,
    service: &str,
) -> Vec<DocumentResult> {
    let index: HashMap<&str, usize> = units
        .iter()
        .enumerate()
        .map(|(position, unit)| (unit.id(), position))
        .collect();
    let mut analysed: Vec<Option<DocumentResult>> = vec![None; units.len()];

    for document in response.results.documents {
        let Some(&position) = index.get(document.id.as_str()) else {
            log::warn!("{}: response names unknown document {}", service, document.id);
            continue;
        };
        let total = document.entities.len();
        let results: Vec<DetectionResult> = document
            .entities
            .into_iter()
            .filter(|entity| entity.confidence_score >= threshold)
            .map(|entity| DetectionResult {
                category: entity.category,
                subcategory: entity.subcategory,
                text: entity.text,
                offset: entity.offset,
                length: entity.length,
                confidence: entity.confidence_score,
                service: service.to_string(),
            })
            .collect();
        if results.len() < total {
            log::trace!(
                "{}: document {} kept {} of {} entities at threshold {}",
                service,
                document.id,
                results.len(),
                total,
                threshold
            );
        }
        analysed[position] = Some(DocumentResult {
            id: document.id,
            redacted_text: document.redacted_text,
            results,
        });
    }

    let mut errored: HashSet<&str> = HashSet::new();
    for failure in &response.results.errors {
        let Some(&position) = index.get(failure.id.as_str()) else {
            log::warn!("{}: error for unknown document {}", service, failure.id);
            continue;
        };
        log::warn!(
            "{}: document {} was not analysed: {} {}",
            service,
            failure.id,
            failure.error.code,
            failure.error.message
        );
        analysed[position] = None;
        errored.insert(units[position].id());
    }

    for (unit, document) in units.iter().zip(&analysed) {
        if document.is_none() && !errored.contains(unit.id()) {
            log::warn!("{}: response has no result for document {}", service, unit.id());
        }
    }

    analysed.into_iter().flatten().collect()
}
