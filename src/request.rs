//! Creation request payloads for prebuild templates.
//!
//! A [`RunParameters`] value captures everything shared by every location in
//! a run; [`RunParameters::request_for`] stamps out one [`CreationRequest`]
//! per configured location.

use serde::Serialize;

/// Optional backend target override forwarded to the provisioning API.
///
/// The target and its URL always travel together.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TargetOverride {
    /// Target environment name (for example `localdev`).
    pub target: String,
    /// Base URL for the target environment.
    pub target_url: String,
}

/// Run-level parameters shared by every creation request.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunParameters {
    /// Git ref the prebuild is built from.
    pub git_ref: String,
    /// Commit SHA the prebuild is built from.
    pub sha: String,
    /// Machine SKU used for the prebuild.
    pub sku_name: String,
    /// Optional target override.
    pub target: Option<TargetOverride>,
}

impl RunParameters {
    /// Builds the creation request for a single location.
    #[must_use]
    pub fn request_for(&self, location: &str) -> CreationRequest {
        let (vscs_target, vscs_target_url) = self.target.as_ref().map_or((None, None), |over| {
            (Some(over.target.clone()), Some(over.target_url.clone()))
        });

        CreationRequest {
            git_ref: self.git_ref.clone(),
            location: location.to_owned(),
            sku_name: self.sku_name.clone(),
            sha: self.sha.clone(),
            vscs_target,
            vscs_target_url,
        }
    }

    /// Builds one request per location, preserving the given order.
    #[must_use]
    pub fn requests_for<S: AsRef<str>>(&self, locations: &[S]) -> Vec<CreationRequest> {
        locations
            .iter()
            .map(|location| self.request_for(location.as_ref()))
            .collect()
    }
}

/// Body of a prebuild template creation call.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct CreationRequest {
    /// Git ref the prebuild is built from.
    #[serde(rename = "ref")]
    pub git_ref: String,
    /// Region the prebuild is created in.
    pub location: String,
    /// Machine SKU used for the prebuild.
    pub sku_name: String,
    /// Commit SHA the prebuild is built from.
    pub sha: String,
    /// Target override name, present only together with the URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vscs_target: Option<String>,
    /// Target override URL, present only together with the name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vscs_target_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn params() -> RunParameters {
        RunParameters {
            git_ref: String::from("main"),
            sha: String::from("abcdef1234567890"),
            sku_name: String::from("futuristicQuantumComputer"),
            target: None,
        }
    }

    #[rstest]
    fn request_omits_target_fields_when_absent(params: RunParameters) {
        let request = params.request_for("WestUs2");
        let body = serde_json::to_value(&request).expect("serialise request");

        assert_eq!(
            body,
            json!({
                "ref": "main",
                "location": "WestUs2",
                "sku_name": "futuristicQuantumComputer",
                "sha": "abcdef1234567890",
            })
        );
    }

    #[rstest]
    fn request_carries_target_pair(mut params: RunParameters) {
        params.target = Some(TargetOverride {
            target: String::from("localdev"),
            target_url: String::from("http://localhost/example"),
        });
        let body = serde_json::to_value(params.request_for("WestUs2")).expect("serialise request");

        assert_eq!(body["vscs_target"], "localdev");
        assert_eq!(body["vscs_target_url"], "http://localhost/example");
    }

    #[rstest]
    fn requests_follow_configured_order(params: RunParameters) {
        let requests = params.requests_for(&["WestUs2", "EastUs1", "SouthEastAsia"]);
        let locations = requests
            .iter()
            .map(|request| request.location.as_str())
            .collect::<Vec<_>>();

        assert_eq!(locations, ["WestUs2", "EastUs1", "SouthEastAsia"]);
    }
}
