//! Attribute heuristics for credential inputs
//!
//! When the configured candidates miss (white-label portals restyle the login
//! form), the flow falls back to scanning the form's inputs: the combined
//! name/aria-label/placeholder attributes decide which input is which, with
//! `type=password` as the structural tell.

use std::sync::Arc;

use tracing::debug;
use waybill_core_types::{ScopeId, SelectorCandidate};
use waybill_locator::ResolvedElement;
use waybill_surface::{ElementHandle, PageSurface};

use crate::errors::BootstrapError;

/// Which credential input the scan is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialField {
    Username,
    Password,
}

impl CredentialField {
    pub fn name(&self) -> &'static str {
        match self {
            CredentialField::Username => "username",
            CredentialField::Password => "password",
        }
    }
}

/// Scan the main document's inputs for the given field.
///
/// Username prefers inputs whose combined attributes mention "email" or
/// "user" (never a password-typed input), falling back to the first
/// non-password input. Password prefers a "password" attribute mention or
/// `type=password`. Returns `None` when nothing qualifies.
pub async fn heuristic_scan(
    page: &Arc<dyn PageSurface>,
    field: CredentialField,
) -> Result<Option<ResolvedElement>, BootstrapError> {
    let input_candidate = SelectorCandidate::Css("input".to_string());
    let inputs = match page.query(&ScopeId::Main, &input_candidate).await {
        Ok(handles) => handles,
        Err(err) if err.is_empty_query() => Vec::new(),
        Err(err) => return Err(err.into()),
    };

    let mut fallback: Option<ElementHandle> = None;
    for handle in inputs {
        let kind = page
            .attribute(&handle, "type")
            .await?
            .unwrap_or_default()
            .to_lowercase();
        let is_password_kind = kind == "password";

        let mut combined = String::new();
        for attr in ["name", "aria-label", "placeholder"] {
            if let Some(value) = page.attribute(&handle, attr).await? {
                combined.push_str(&value.to_lowercase());
                combined.push(' ');
            }
        }

        let semantic_hit = match field {
            CredentialField::Username => {
                !is_password_kind && (combined.contains("email") || combined.contains("user"))
            }
            CredentialField::Password => is_password_kind || combined.contains("password"),
        };
        if semantic_hit {
            debug!(field = field.name(), element = %handle.element.0, "heuristic match");
            return Ok(Some(ResolvedElement::new(handle, input_candidate.clone())));
        }

        // First input of the right kind, kept in case nothing semantic shows up.
        let right_kind = match field {
            CredentialField::Username => !is_password_kind,
            CredentialField::Password => is_password_kind,
        };
        if right_kind && fallback.is_none() {
            fallback = Some(handle);
        }
    }

    Ok(fallback.map(|handle| {
        debug!(field = field.name(), element = %handle.element.0, "heuristic fallback");
        ResolvedElement::new(handle, input_candidate.clone())
    }))
}
