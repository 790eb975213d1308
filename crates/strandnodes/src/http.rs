use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use strandcore::{Node, NodeError, NodeRecord, TaskContext};
use strandruntime::NodeFactory;

pub const HTTP_FETCH_NODE: &str = "http.fetch";

/// GETs a URL and records `{status, body}`.
///
/// The URL is either fixed at construction or read from the event via a
/// JSON pointer (default `/url`). A missing URL or a network failure is
/// recorded as a soft error so the chain continues.
pub struct HttpFetchNode {
    client: reqwest::Client,
    url: Option<String>,
    url_pointer: String,
}

impl HttpFetchNode {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            url: None,
            url_pointer: "/url".to_string(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_url_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.url_pointer = pointer.into();
        self
    }

    async fn fetch(&self, url: &str) -> Result<NodeRecord, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        let body = serde_json::from_str::<Value>(&body).unwrap_or_else(|_| Value::String(body));
        Ok(NodeRecord::success(json!({ "status": status, "body": body })))
    }
}

impl Default for HttpFetchNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E> Node<E> for HttpFetchNode
where
    E: Serialize + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        HTTP_FETCH_NODE
    }

    async fn process(&self, mut ctx: TaskContext<E>) -> Result<TaskContext<E>, NodeError> {
        let url = match &self.url {
            Some(url) => Some(url.clone()),
            None => serde_json::to_value(&ctx.event).ok().and_then(|event| {
                event
                    .pointer(&self.url_pointer)
                    .and_then(|v| v.as_str().map(String::from))
            }),
        };
        let Some(url) = url else {
            ctx.record_error(
                HTTP_FETCH_NODE,
                format!("no url at pointer {}", self.url_pointer),
            );
            return Ok(ctx);
        };

        tracing::info!(%url, "fetching");
        match self.fetch(&url).await {
            Ok(record) => ctx.update_node(HTTP_FETCH_NODE, record),
            Err(error) => {
                tracing::warn!(%url, %error, "fetch failed");
                ctx.record_error(HTTP_FETCH_NODE, error.to_string());
            }
        }
        Ok(ctx)
    }
}

pub struct HttpFetchNodeFactory;

impl<E> NodeFactory<E> for HttpFetchNodeFactory
where
    E: Serialize + Send + Sync + 'static,
{
    fn node_name(&self) -> &str {
        HTTP_FETCH_NODE
    }

    fn create(&self) -> Box<dyn Node<E>> {
        Box::new(HttpFetchNode::new())
    }
}
