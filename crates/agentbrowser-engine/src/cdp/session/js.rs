//! `Runtime` domain: evaluation and remote object handles.

use serde::Deserialize;
use serde_json::{json, Value};

use crate::cdp::error::CdpError;
use crate::cdp::protocol::{ExceptionDetails, RemoteObject};

use super::core::PageSession;

impl PageSession {
    /// Evaluate `expression` and return the result as JSON. `context_id`
    /// picks a frame's execution context; `None` means the main frame.
    pub async fn evaluate(
        &self,
        expression: &str,
        context_id: Option<i64>,
    ) -> Result<Value, CdpError> {
        let mut result = self.runtime_evaluate(expression, context_id, true).await?;
        Ok(result["value"].take())
    }

    /// Like [`evaluate`](Self::evaluate), but the result stays in the page
    /// and comes back as a handle.
    pub async fn evaluate_handle(
        &self,
        expression: &str,
        context_id: Option<i64>,
    ) -> Result<RemoteObject, CdpError> {
        let result = self.runtime_evaluate(expression, context_id, false).await?;
        Ok(serde_json::from_value(result)?)
    }

    /// Run `function` with `this` bound to the handle `object_id`.
    pub async fn call_function_on(
        &self,
        object_id: &str,
        function: &str,
        args: Vec<Value>,
    ) -> Result<Value, CdpError> {
        let arguments: Vec<Value> = args
            .into_iter()
            .map(|value| json!({ "value": value }))
            .collect();
        let mut reply = self
            .call(
                "Runtime.callFunctionOn",
                Some(json!({
                    "objectId": object_id,
                    "functionDeclaration": function,
                    "arguments": arguments,
                    "returnByValue": true,
                    "awaitPromise": true,
                })),
            )
            .await?;
        thrown(&reply)?;
        Ok(reply["result"]["value"].take())
    }

    pub async fn release_object(&self, object_id: &str) -> Result<(), CdpError> {
        self.call("Runtime.releaseObject", Some(json!({ "objectId": object_id })))
            .await
            .map(drop)
    }

    /// Execution context id of a new isolated world in `frame_id`.
    pub async fn create_isolated_world(&self, frame_id: &str) -> Result<i64, CdpError> {
        let reply = self
            .call(
                "Page.createIsolatedWorld",
                Some(json!({ "frameId": frame_id, "worldName": "agentbrowser" })),
            )
            .await?;
        reply["executionContextId"].as_i64().ok_or_else(|| {
            CdpError::InvalidResponse("no executionContextId in reply".to_string())
        })
    }

    async fn runtime_evaluate(
        &self,
        expression: &str,
        context_id: Option<i64>,
        by_value: bool,
    ) -> Result<Value, CdpError> {
        let mut params = json!({
            "expression": expression,
            "returnByValue": by_value,
            "awaitPromise": true,
        });
        if let Some(id) = context_id {
            params["contextId"] = id.into();
        }
        let mut reply = self.call("Runtime.evaluate", Some(params)).await?;
        thrown(&reply)?;
        Ok(reply["result"].take())
    }
}

/// Turn `exceptionDetails` in a reply into an error.
fn thrown(reply: &Value) -> Result<(), CdpError> {
    let Some(raw) = reply.get("exceptionDetails") else {
        return Ok(());
    };
    let message = match ExceptionDetails::deserialize(raw) {
        Ok(details) => details.message(),
        Err(_) => raw["text"].as_str().unwrap_or("script error").to_string(),
    };
    Err(CdpError::JavaScript(message))
}
