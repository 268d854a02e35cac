//! XML documents of the multipart wire protocol.
//!
//! Only the handful of documents the upload engine touches are modeled:
//! the initiate and complete responses, and the completion manifest body.

use serde::{Deserialize, Serialize};
use stevedore_core::{Error, Result};

const XML_PROLOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;
const S3_XMLNS: &str = "http://s3.amazonaws.com/doc/2006-03-01/";

/// One finished part: its sequence number and the ETag the service
/// assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedPart {
    /// ETag returned by the part upload, quotes stripped.
    #[serde(rename = "ETag")]
    pub e_tag: String,
    /// Part number, starting at 1.
    #[serde(rename = "PartNumber")]
    pub part_number: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "CompleteMultipartUpload")]
struct CompleteMultipartUpload {
    #[serde(rename = "@xmlns", default)]
    xmlns: String,
    #[serde(rename = "Part", default)]
    parts: Vec<CompletedPart>,
}

/// Build the completion manifest: ordered `Part` children under a
/// namespaced root, with the standard prolog.
pub fn build_complete_body(parts: &[CompletedPart]) -> Result<String> {
    let doc = CompleteMultipartUpload {
        xmlns: S3_XMLNS.to_string(),
        parts: parts.to_vec(),
    };
    let body = quick_xml::se::to_string(&doc)
        .map_err(|e| Error::unexpected("failed to build completion manifest").with_source(e))?;
    Ok(format!("{XML_PROLOG}{body}"))
}

/// Parse a completion manifest back into its ordered parts.
pub fn parse_complete_body(body: &str) -> Result<Vec<CompletedPart>> {
    let doc: CompleteMultipartUpload = quick_xml::de::from_str(body)
        .map_err(|e| Error::unexpected("failed to parse completion manifest").with_source(e))?;
    Ok(doc.parts)
}

/// Response of the initiate call; only `UploadId` matters to the engine.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct InitiateMultipartUploadResult {
    /// Bucket the upload was opened in.
    pub bucket: String,
    /// Object key of the upload.
    pub key: String,
    /// Identifier every subsequent call must carry.
    pub upload_id: String,
}

/// Parse the initiate response, requiring a non-empty `UploadId`.
pub fn parse_initiate(body: &str) -> Result<InitiateMultipartUploadResult> {
    let doc: InitiateMultipartUploadResult = quick_xml::de::from_str(body)
        .map_err(|e| Error::unexpected("failed to parse initiate response").with_source(e))?;
    if doc.upload_id.is_empty() {
        return Err(Error::unexpected("initiate response carried no UploadId"));
    }
    Ok(doc)
}

/// Response of the completion call.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct CompleteMultipartUploadResult {
    /// URL of the assembled object.
    pub location: Option<String>,
    /// Bucket the object landed in.
    pub bucket: Option<String>,
    /// Object key.
    pub key: Option<String>,
    /// ETag of the assembled object.
    pub e_tag: Option<String>,
}

/// Parse the completion response.
pub fn parse_complete_result(body: &str) -> Result<CompleteMultipartUploadResult> {
    quick_xml::de::from_str(body)
        .map_err(|e| Error::unexpected("failed to parse completion response").with_source(e))
}
