//! Metadata merging and template-metadata helpers.

use crate::error::{Error, Result};
use crate::fields::FieldTree;
use crate::model::ContentModel;

/// Union two content models.
///
/// On a key collision the primary's value wins and the name is reported in
/// the returned list; collisions are advisory, callers typically log them.
/// Either side may be absent: the result is then the other side, or absent
/// when both are.
pub fn merge_fields(
    primary: Option<ContentModel>,
    secondary: Option<ContentModel>,
) -> (Option<ContentModel>, Vec<String>) {
    match (primary, secondary) {
        (primary, None) => (primary, Vec::new()),
        (None, secondary) => (secondary, Vec::new()),
        (Some(mut result), Some(secondary)) => {
            let mut duplicates = Vec::new();
            for (name, value) in secondary {
                if result.contains(&name) {
                    duplicates.push(name);
                } else {
                    result.insert(name, value);
                }
            }
            (Some(result), duplicates)
        }
    }
}

/// Split a `module:name` qualified name.
///
/// A bare name has no module. More than one colon is malformed template
/// metadata and fatal to the current build step.
pub fn strip_module_name(qualified_name: &str) -> Result<(Option<&str>, &str)> {
    if qualified_name.is_empty() {
        return Ok((None, qualified_name));
    }

    let parts: Vec<&str> = qualified_name.split(':').collect();
    match parts.as_slice() {
        [name] => Ok((None, name)),
        [module, name] => Ok((Some(module), name)),
        _ => Err(Error::InvalidQualifiedName(qualified_name.to_string())),
    }
}

/// View routing data derived from template metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MvcData {
    pub view_name: String,
    pub area_name: Option<String>,
}

/// Derive region view routing from template metadata.
///
/// Reads the qualified `regionView` field and the optional `regionName`
/// field; the view name defaults to `"Main"` and the region name defaults
/// to the view name. Returns the routing data and the region name.
pub fn region_mvc_data(template_metadata: &FieldTree) -> Result<(MvcData, String)> {
    let qualified_view = template_metadata.text_field("regionView").unwrap_or("");
    let (module, view) = strip_module_name(qualified_view)?;
    let view_name = if view.is_empty() { "Main" } else { view };

    let region_name = match template_metadata.text_field("regionName") {
        Some(name) if !name.is_empty() => name,
        _ => view_name,
    };

    Ok((
        MvcData {
            view_name: view_name.to_string(),
            area_name: module.map(str::to_string),
        },
        region_name.to_string(),
    ))
}
