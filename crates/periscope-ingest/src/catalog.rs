//! Reference-manual catalog retrieval.
//!
//! The catalog endpoint serves a JSON grid of technical-literature rows.
//! Rows are keyed by document title (e.g. "RM0008") and carry localized
//! descriptions and download links plus the part numbers they cover.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use periscope_core::Manual;

use crate::IngestError;

/// STM32 reference-manual grid endpoint.
pub const DEFAULT_CATALOG_URL: &str = "https://www.st.com/content/st_com/en/products/microcontrollers-microprocessors/stm32-32-bit-arm-cortex-mcus.cxst-rs-grid.html/CL1734.technical_literature.reference_manual.json";

/// Link targets in catalog rows are site-relative.
const LINK_PREFIX: &str = "https://www.st.com";

/// The endpoint rejects requests without a browser-looking User-Agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.11 \
                          (KHTML, like Gecko) Chrome/23.0.1271.64 Safari/537.11";

#[derive(Debug, Deserialize)]
struct Catalog {
    rows: Vec<CatalogRow>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogRow {
    title: String,
    #[serde(default)]
    localized_descriptions: HashMap<String, String>,
    #[serde(default)]
    localized_links: HashMap<String, String>,
    #[serde(default)]
    part_numbers: Vec<PartNumber>,
}

#[derive(Debug, Deserialize)]
struct PartNumber {
    text: String,
}

/// Build the HTTP client used for catalog and document requests.
pub fn build_client() -> Result<reqwest::Client, IngestError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| IngestError::Http(e.to_string()))
}

/// Parse a catalog JSON body into manual records.
///
/// Each manual's download path is `<data_dir>/documents/<title>.pdf`. Rows
/// without an English description or link are skipped with a warning rather
/// than failing the whole catalog.
pub fn parse_catalog(body: &str, data_dir: &Path) -> Result<Vec<Manual>, IngestError> {
    let catalog: Catalog = serde_json::from_str(body)?;
    let documents_dir = data_dir.join("documents");

    let mut manuals = Vec::with_capacity(catalog.rows.len());
    for row in catalog.rows {
        let Some(description) = row.localized_descriptions.get("en") else {
            tracing::warn!(title = %row.title, "catalog row has no English description, skipping");
            continue;
        };
        let Some(link) = row.localized_links.get("en") else {
            tracing::warn!(title = %row.title, "catalog row has no English link, skipping");
            continue;
        };

        manuals.push(Manual::new(
            row.title.clone(),
            description.clone(),
            format!("{LINK_PREFIX}{link}"),
            row.part_numbers.into_iter().map(|pn| pn.text).collect(),
            documents_dir.join(format!("{}.pdf", row.title)),
        ));
    }

    tracing::info!(manuals = manuals.len(), "catalog parsed");
    Ok(manuals)
}

/// Fetch and parse the manual catalog from `url`.
pub async fn fetch_catalog(
    client: &reqwest::Client,
    url: &str,
    data_dir: &Path,
) -> Result<Vec<Manual>, IngestError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| IngestError::Http(e.to_string()))?;

    if !response.status().is_success() {
        return Err(IngestError::Status {
            status: response.status().as_u16(),
            url: url.to_string(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| IngestError::Http(e.to_string()))?;
    parse_catalog(&body, data_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const FIXTURE: &str = r#"{
        "rows": [
            {
                "title": "RM0008",
                "localizedDescriptions": {
                    "en": "STM32F101xx, STM32F102xx, STM32F103xx reference manual"
                },
                "localizedLinks": {
                    "en": "/resource/en/reference_manual/rm0008.pdf"
                },
                "partNumbers": [
                    {"text": "STM32F101"},
                    {"text": "STM32F103"}
                ]
            },
            {
                "title": "RM0433",
                "localizedDescriptions": {},
                "localizedLinks": {
                    "en": "/resource/en/reference_manual/rm0433.pdf"
                },
                "partNumbers": []
            }
        ]
    }"#;

    #[test]
    fn parses_rows_into_manuals() {
        let manuals = parse_catalog(FIXTURE, &PathBuf::from("/data")).unwrap();

        assert_eq!(manuals.len(), 1);
        let m = &manuals[0];
        assert_eq!(m.title, "RM0008");
        assert_eq!(
            m.url,
            "https://www.st.com/resource/en/reference_manual/rm0008.pdf"
        );
        assert_eq!(m.parts, vec!["STM32F101", "STM32F103"]);
        assert_eq!(m.path, PathBuf::from("/data/documents/RM0008.pdf"));
        assert!(m.sections.is_none());
    }

    #[test]
    fn row_without_english_description_is_skipped() {
        let manuals = parse_catalog(FIXTURE, &PathBuf::from("/data")).unwrap();
        assert!(manuals.iter().all(|m| m.title != "RM0433"));
    }

    #[test]
    fn malformed_body_is_a_parse_error() {
        assert!(matches!(
            parse_catalog("not json", &PathBuf::from("/data")),
            Err(IngestError::Parse(_))
        ));
    }

    #[test]
    fn missing_rows_key_is_a_parse_error() {
        assert!(matches!(
            parse_catalog("{}", &PathBuf::from("/data")),
            Err(IngestError::Parse(_))
        ));
    }
}
