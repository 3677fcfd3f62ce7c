//! OIDC claims requests (OIDC Core Section 5.5).
//!
//! The raw `claims` parameter travels verbatim through the redirection state
//! into the code registration under [`ExtraProperties::CLAIMS`]. It is only
//! decoded when the ID token is assembled, via
//! [`ClaimsRequest::from_extra_properties`].

use std::collections::BTreeMap;

use op_grant::{
    ExtraProperties, GrantError, GrantResult, OAuthRedirectionState, RedirectionStateExtension,
    RequestParams,
};
use serde::{Deserialize, Serialize};

/// The `claims` request parameter.
pub const CLAIMS: &str = "claims";

/// Copies the first `claims` parameter value into the redirection state.
///
/// A value already carried under the claims key is kept. Without a `claims`
/// parameter the state is left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimsRequestExtension;

impl ClaimsRequestExtension {
    /// Creates the extension.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl RedirectionStateExtension for ClaimsRequestExtension {
    fn extend_state(&self, state: &mut OAuthRedirectionState, params: &RequestParams) {
        if let Some(claims) = params.first(CLAIMS) {
            state
                .extra_properties
                .insert_if_absent(ExtraProperties::CLAIMS, claims);
        }
    }
}

/// Decoded `claims` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimsRequest {
    /// Claims requested from the UserInfo endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userinfo: Option<BTreeMap<String, Option<IndividualClaimRequest>>>,

    /// Claims requested in the ID token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<BTreeMap<String, Option<IndividualClaimRequest>>>,
}

/// Requirements attached to one requested claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndividualClaimRequest {
    /// Whether the claim is essential.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub essential: Option<bool>,

    /// Required value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,

    /// Acceptable values, in order of preference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<serde_json::Value>>,
}

impl ClaimsRequest {
    /// Parses a raw `claims` parameter value.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::InvalidRequest`] if the value is not a claims
    /// request object.
    pub fn parse(raw: &str) -> GrantResult<Self> {
        serde_json::from_str(raw)
            .map_err(|e| GrantError::InvalidRequest(format!("invalid claims parameter: {e}")))
    }

    /// Decodes the claims request carried in extra properties, if any.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::InvalidRequest`] if the carried value does not parse.
    pub fn from_extra_properties(properties: &ExtraProperties) -> GrantResult<Option<Self>> {
        properties
            .get(ExtraProperties::CLAIMS)
            .map(Self::parse)
            .transpose()
    }

    /// Names of the claims requested for the ID token.
    pub fn id_token_claims(&self) -> impl Iterator<Item = &str> {
        self.id_token.iter().flat_map(|m| m.keys().map(String::as_str))
    }

    /// Names of the claims requested for the UserInfo response.
    pub fn userinfo_claims(&self) -> impl Iterator<Item = &str> {
        self.userinfo.iter().flat_map(|m| m.keys().map(String::as_str))
    }

    /// Checks whether a claim is marked essential in either member.
    #[must_use]
    pub fn is_essential(&self, claim: &str) -> bool {
        [&self.id_token, &self.userinfo]
            .into_iter()
            .flatten()
            .filter_map(|m| m.get(claim))
            .flatten()
            .any(|c| c.essential == Some(true))
    }
}
