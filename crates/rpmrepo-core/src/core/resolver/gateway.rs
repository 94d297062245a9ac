use serde::Deserialize;

/// The parts of an API gateway proxy event the resolver reads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayEvent {
    #[serde(default)]
    pub request_context: RequestContext,
    #[serde(default)]
    pub path_parameters: Option<PathParameters>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct RequestContext {
    #[serde(default)]
    pub stage: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct PathParameters {
    #[serde(default)]
    pub proxy: Option<String>,
}

impl GatewayEvent {
    pub fn from_json(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Events without a stage came in on the unnamed one.
    pub fn stage(&self) -> &str {
        self.request_context.stage.as_deref().unwrap_or("$default")
    }

    /// A root request carries no proxy parameter at all.
    pub fn path(&self) -> &str {
        self.path_parameters
            .as_ref()
            .and_then(|params| params.proxy.as_deref())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_stage_and_proxy_path() {
        let event = GatewayEvent::from_json(
            r#"{
                "resource": "/{proxy+}",
                "requestContext": {"stage": "v1", "requestId": "abc"},
                "pathParameters": {"proxy": "anon/el8/snap/a.rpm"}
            }"#,
        )
        .expect("event");
        assert_eq!(event.stage(), "v1");
        assert_eq!(event.path(), "anon/el8/snap/a.rpm");
    }

    #[test]
    fn root_requests_have_null_path_parameters() {
        let event = GatewayEvent::from_json(
            r#"{"requestContext": {"stage": "default"}, "pathParameters": null}"#,
        )
        .expect("event");
        assert_eq!(event.path(), "");
        assert_eq!(GatewayEvent::default().stage(), "$default");
    }
}
