use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::Serialize;

use super::filesystem::EmptyInput;
use crate::catalog::{CapabilityKind, ToolContext, TypedCapability};
use crate::errors::AgentResult;

#[derive(Debug, Serialize, JsonSchema)]
pub struct TimeOutput {
    /// RFC 3339 timestamp in UTC
    pub time: String,
}

pub struct GetCurrentTime;

#[async_trait]
impl TypedCapability for GetCurrentTime {
    type Input = EmptyInput;
    type Output = TimeOutput;
    const NAME: &'static str = "GetCurrentTime";

    fn description(&self) -> &str {
        "A tool to get the current time."
    }

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Utility
    }

    async fn run(&self, _ctx: &ToolContext, _input: EmptyInput) -> AgentResult<TimeOutput> {
        Ok(TimeOutput {
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        })
    }
}
