// Model-and-view results and the view resolver seam

use crate::{Error, HttpRequest, HttpResponse};
use serde::Serialize;
use std::collections::BTreeMap;

/// A named view plus the model it renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelView {
    pub view: String,
    pub model: BTreeMap<String, serde_json::Value>,
}

impl ModelView {
    pub fn new(view: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            model: BTreeMap::new(),
        }
    }

    /// Add a model attribute; values that fail to serialize become `null`.
    pub fn add(&mut self, key: impl Into<String>, value: impl Serialize) {
        let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
        self.model.insert(key.into(), value);
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        self.add(key, value);
        self
    }

    /// What a JSON route reports for this view: the single model value, or
    /// the whole model when it holds zero or several entries.
    pub fn json_data(&self) -> serde_json::Value {
        if self.model.len() == 1 {
            if let Some(value) = self.model.values().next() {
                return value.clone();
            }
        }
        serde_json::Value::Object(
            self.model
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

/// Renders a named view.
///
/// Called after the model has been copied into the request attributes. No
/// template engine ships with the crate; hosts plug theirs in here.
pub trait ViewResolver: Send + Sync {
    fn forward(
        &self,
        view: &str,
        request: &HttpRequest,
        response: &mut HttpResponse,
    ) -> Result<(), Error>;
}

impl<F> ViewResolver for F
where
    F: Fn(&str, &HttpRequest, &mut HttpResponse) -> Result<(), Error> + Send + Sync,
{
    fn forward(
        &self,
        view: &str,
        request: &HttpRequest,
        response: &mut HttpResponse,
    ) -> Result<(), Error> {
        self(view, request, response)
    }
}
