use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    #[serde(default)]
    pub input: String,
}

/// Body of the upstream `workflows/run` call.
#[derive(Debug, Serialize)]
pub struct WorkflowRequest<'a> {
    pub inputs: WorkflowInputs<'a>,
    pub response_mode: &'static str,
    pub user: &'a str,
}

#[derive(Debug, Serialize)]
pub struct WorkflowInputs<'a> {
    pub input: &'a str,
}

impl<'a> WorkflowRequest<'a> {
    pub fn blocking(input: &'a str, user: &'a str) -> Self {
        Self {
            inputs: WorkflowInputs { input },
            response_mode: "blocking",
            user,
        }
    }
}
