// Handlers, their declared parameters and their results
//
// A handler is a stateless callable shared by every request of its route. It
// receives an explicit per-request context plus the arguments the dispatcher
// bound from the declared `ParamSpec`s; any state that outlives a request is
// captured by the handler itself and synchronized there.

use crate::binding::{Bindable, TypeDescriptor, Value};
use crate::form::UploadedFile;
use crate::json::JsonResponse;
use crate::view::ModelView;
use crate::{Error, HttpRequest, HttpResponse};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-request handles passed to a handler.
pub struct HandlerContext<'a> {
    pub request: &'a HttpRequest,
    /// Response under construction; status and headers set here survive
    /// rendering.
    pub response: &'a mut HttpResponse,
}

impl<'a> HandlerContext<'a> {
    pub fn new(request: &'a HttpRequest, response: &'a mut HttpResponse) -> Self {
        Self { request, response }
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.response.set_header(name, value);
    }

    pub fn set_status(&mut self, status: u16) {
        self.response.status = status;
    }
}

/// A route handler.
///
/// Implemented for every matching closure:
///
/// ```
/// use girder_core::{Arguments, HandlerContext, HandlerResult, Error};
///
/// fn show(_ctx: &mut HandlerContext<'_>, args: Arguments) -> Result<HandlerResult, Error> {
///     let id: i64 = args.value("id").unwrap_or_default();
///     Ok(HandlerResult::text(format!("dept {}", id)))
/// }
/// ```
pub trait Handler: Send + Sync {
    fn call(&self, ctx: &mut HandlerContext<'_>, args: Arguments) -> Result<HandlerResult, Error>;
}

impl<F> Handler for F
where
    F: Fn(&mut HandlerContext<'_>, Arguments) -> Result<HandlerResult, Error> + Send + Sync,
{
    fn call(&self, ctx: &mut HandlerContext<'_>, args: Arguments) -> Result<HandlerResult, Error> {
        self(ctx, args)
    }
}

/// How a declared parameter is resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    /// The request handle, available through the context
    Request,
    /// The response handle, available through the context
    Response,
    /// A single upload matched by name or alias
    Upload,
    /// All uploads keyed by field name
    UploadMap,
    /// All uploads in arrival order
    UploadList,
    /// Bound from path and request parameters
    Bound(TypeDescriptor),
}

/// A declared handler parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    /// Parameter-space name to use instead of `name`
    pub alias: Option<String>,
    pub kind: ParamKind,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, kind: ParamKind) -> Self {
        Self {
            name: name.into(),
            alias: None,
            kind,
        }
    }

    /// Bound parameter typed by a [`Bindable`] Rust type
    pub fn of<T: Bindable>(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Bound(T::descriptor()))
    }

    /// Bound parameter with an explicit descriptor
    pub fn bound(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self::new(name, ParamKind::Bound(ty))
    }

    pub fn request() -> Self {
        Self::new("request", ParamKind::Request)
    }

    pub fn response() -> Self {
        Self::new("response", ParamKind::Response)
    }

    pub fn upload(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Upload)
    }

    pub fn upload_map(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::UploadMap)
    }

    pub fn upload_list(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::UploadList)
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Name looked up in the request: the alias when present
    pub fn key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

/// A resolved argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Argument {
    Request,
    Response,
    Upload(Option<UploadedFile>),
    UploadMap(BTreeMap<String, UploadedFile>),
    UploadList(Vec<UploadedFile>),
    Value(Value),
}

/// Resolved arguments in declaration order, addressable by name or position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    entries: Vec<(String, Argument)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, argument: Argument) {
        self.entries.push((name.into(), argument));
    }

    pub fn get(&self, name: &str) -> Option<&Argument> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, arg)| arg)
    }

    pub fn at(&self, index: usize) -> Option<&Argument> {
        self.entries.get(index).map(|(_, arg)| arg)
    }

    /// Raw bound value
    pub fn raw(&self, name: &str) -> Option<&Value> {
        match self.get(name)? {
            Argument::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Typed copy of a bound value
    pub fn value<T: Bindable>(&self, name: &str) -> Option<T> {
        self.raw(name).cloned().and_then(T::from_value)
    }

    /// Move a bound value out, leaving `Null` behind.
    pub fn take<T: Bindable>(&mut self, name: &str) -> Option<T> {
        let entry = self.entries.iter_mut().find(|(n, _)| n == name)?;
        match &mut entry.1 {
            Argument::Value(value) => T::from_value(std::mem::take(value)),
            _ => None,
        }
    }

    pub fn upload(&self, name: &str) -> Option<&UploadedFile> {
        match self.get(name)? {
            Argument::Upload(file) => file.as_ref(),
            _ => None,
        }
    }

    pub fn upload_list(&self, name: &str) -> Option<&[UploadedFile]> {
        match self.get(name)? {
            Argument::UploadList(files) => Some(files),
            _ => None,
        }
    }

    pub fn upload_map(&self, name: &str) -> Option<&BTreeMap<String, UploadedFile>> {
        match self.get(name)? {
            Argument::UploadMap(files) => Some(files),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Argument)> {
        self.entries.iter().map(|(n, arg)| (n.as_str(), arg))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What a handler returns; the dispatcher renders it.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerResult {
    /// Forward to a named view, or report the model on a JSON route
    View(ModelView),
    /// Prebuilt envelope, written as is on a JSON route
    Envelope(JsonResponse),
    /// Written verbatim
    Text(String),
    /// Any other value
    Value(serde_json::Value),
    /// No body
    Empty,
}

impl HandlerResult {
    pub fn text(text: impl Into<String>) -> Self {
        HandlerResult::Text(text.into())
    }

    /// Serialize any value; a serialization failure is an error.
    pub fn value(value: impl Serialize) -> Result<Self, Error> {
        Ok(HandlerResult::Value(serde_json::to_value(value)?))
    }

    pub fn view(view: ModelView) -> Self {
        HandlerResult::View(view)
    }
}

impl From<ModelView> for HandlerResult {
    fn from(view: ModelView) -> Self {
        HandlerResult::View(view)
    }
}

impl From<JsonResponse> for HandlerResult {
    fn from(envelope: JsonResponse) -> Self {
        HandlerResult::Envelope(envelope)
    }
}

impl From<String> for HandlerResult {
    fn from(text: String) -> Self {
        HandlerResult::Text(text)
    }
}

impl From<&str> for HandlerResult {
    fn from(text: &str) -> Self {
        HandlerResult::Text(text.to_string())
    }
}

impl From<serde_json::Value> for HandlerResult {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => HandlerResult::Empty,
            other => HandlerResult::Value(other),
        }
    }
}

impl From<Value> for HandlerResult {
    fn from(value: Value) -> Self {
        value.to_json().into()
    }
}

impl From<()> for HandlerResult {
    fn from(_: ()) -> Self {
        HandlerResult::Empty
    }
}
