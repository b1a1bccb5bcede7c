//! Reference URI parsing.
//!
//! | Form                 | Reference        |
//! |----------------------|------------------|
//! | `http(s)://…`        | HTTP             |
//! | `git+URL#REV`        | Git revision     |
//! | `s3://bucket/key`    | S3 object        |
//! | `oss://bucket/key`   | OSS object       |
//! | `model:ID`           | model link       |
//! | `dataset:ID`         | dataset link     |
//! | anything else        | local path       |

use anyhow::{bail, Context, Result};
use registry_core::{Document, ObjectLocation, Reference, ReferenceSet};

/// Parses a single reference URI.
///
/// # Errors
///
/// Returns an error for a malformed git or object-store URI.
pub fn parse_reference(uri: &str) -> Result<Reference> {
    let uri = uri.trim();
    if uri.is_empty() {
        bail!("Empty reference");
    }

    if uri.starts_with("http://") || uri.starts_with("https://") {
        return Ok(Reference::http(uri));
    }
    if let Some(rest) = uri.strip_prefix("git+") {
        let Some((repo, revision)) = rest.rsplit_once('#') else {
            bail!("Git reference '{uri}' needs a revision: git+URL#REV");
        };
        if repo.is_empty() || revision.is_empty() {
            bail!("Git reference '{uri}' needs a repository and a revision");
        }
        return Ok(Reference::git(repo, revision));
    }
    if let Some(rest) = uri.strip_prefix("s3://") {
        return Ok(Reference::s3(object_location(uri, rest)?));
    }
    if let Some(rest) = uri.strip_prefix("oss://") {
        return Ok(Reference::oss(object_location(uri, rest)?));
    }
    if let Some(id) = uri.strip_prefix("model:") {
        return link(uri, id).map(Reference::model);
    }
    if let Some(id) = uri.strip_prefix("dataset:") {
        return link(uri, id).map(Reference::dataset);
    }

    Ok(Reference::local(uri))
}

/// Parses repeated reference values into a set.
///
/// One plain value gives a single reference, several give a list, and
/// `KEY=URI` values give a map. Keys and plain values cannot be mixed.
///
/// # Errors
///
/// Returns an error for a malformed URI, a mix of keyed and plain values,
/// or a repeated key.
pub fn parse_set(values: &[String]) -> Result<Option<ReferenceSet>> {
    if values.is_empty() {
        return Ok(None);
    }

    let keyed: Vec<Option<(&str, &str)>> = values.iter().map(|v| split_key(v)).collect();
    if keyed.iter().all(Option::is_some) {
        let mut entries = std::collections::BTreeMap::new();
        for (key, uri) in keyed.into_iter().flatten() {
            if entries.insert(key.to_string(), parse_reference(uri)?).is_some() {
                bail!("Key '{key}' given more than once");
            }
        }
        return Ok(Some(ReferenceSet::Map(entries)));
    }
    if keyed.iter().any(Option::is_some) {
        bail!("Cannot mix KEY=URI and plain values for one field");
    }

    let mut references = values
        .iter()
        .map(|v| parse_reference(v))
        .collect::<Result<Vec<_>>>()?;
    if references.len() == 1 {
        return Ok(references.pop().map(ReferenceSet::Single));
    }
    Ok(Some(ReferenceSet::List(references)))
}

/// Parses a `parameters` or `spec` value.
///
/// A value starting with `{` or `[` is inline JSON; anything else is a
/// reference URI, with plain paths uploaded on insert.
///
/// # Errors
///
/// Returns an error for invalid inline JSON, a malformed URI or a link.
pub fn parse_document(input: &str) -> Result<Document> {
    let trimmed = input.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        let value = serde_json::from_str(trimmed).context("Invalid inline JSON document")?;
        return Ok(Document::Inline(value));
    }
    let reference = parse_reference(trimmed)?;
    if reference.is_link() {
        bail!("Document '{input}' cannot be a {} link", reference.kind_name());
    }
    Ok(Document::Stored(reference))
}

/// Parses a `KEY=VALUE` label.
///
/// # Errors
///
/// Returns an error if there is no `=` or the key is empty.
pub fn parse_label(input: &str) -> Result<(String, String)> {
    match input.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => bail!("Label '{input}' must be KEY=VALUE"),
    }
}

/// Splits `KEY=URI`, treating a prefix with `:` or `/` as part of the URI.
fn split_key(value: &str) -> Option<(&str, &str)> {
    let (key, uri) = value.split_once('=')?;
    if key.is_empty() || key.contains(':') || key.contains('/') {
        return None;
    }
    Some((key, uri))
}

fn object_location(uri: &str, rest: &str) -> Result<ObjectLocation> {
    match rest.split_once('/') {
        Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
            Ok(ObjectLocation::new("", bucket, key))
        }
        _ => bail!("Object reference '{uri}' must be SCHEME://bucket/key"),
    }
}

fn link<'a>(uri: &str, id: &'a str) -> Result<&'a str> {
    if id.is_empty() {
        bail!("Link '{uri}' has no id");
    }
    Ok(id)
}
