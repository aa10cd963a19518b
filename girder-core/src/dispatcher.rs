//! Request dispatch.
//!
//! One request runs to completion through a fixed sequence of stages:
//!
//! 1. static resources short-circuit routing,
//! 2. route lookup (404 when no pattern matches, 405 when only the verb fails),
//! 3. the route's [`AuthPolicy`](crate::AuthPolicy) is checked against the session,
//! 4. declared parameters are bound from the path and the parameter space,
//! 5. the handler runs behind an error and panic boundary,
//! 6. the result is rendered as a view, a JSON envelope or plain text.
//!
//! Failures at any stage are answered in HTML or JSON depending on what the
//! client asked for (see [`ResponseFormat`]).

use crate::binding::Binder;
use crate::content_negotiation::ResponseFormat;
use crate::form::UploadLimits;
use crate::guard::{authorize, SessionKeys};
use crate::handler::{Argument, Arguments, HandlerContext, HandlerResult, ParamKind};
use crate::json::{JsonResponse, JSON_CONTENT_TYPE, NO_CACHE};
use crate::logging::{debug, error, info_span, warn};
use crate::routing::{RouteDescriptor, RouteMatch, RouteTable};
use crate::static_assets::{ResourceResolver, StaticDirectory};
use crate::view::ViewResolver;
use crate::{Error, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

/// Content type of text and error pages
pub const HTML_CONTENT_TYPE: &str = "text/html;charset=UTF-8";

/// Content type of non-string handler values on HTML routes
pub const TEXT_CONTENT_TYPE: &str = "text/plain;charset=UTF-8";

/// Dispatcher settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Session attribute names read by the authorization check
    pub session_keys: SessionKeys,
    /// Directory served ahead of routing, if any
    pub static_root: Option<PathBuf>,
    /// Body and multipart part size caps
    pub uploads: UploadLimits,
}

/// Routes requests to handlers and renders their results.
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    binder: Binder,
    resources: Option<Box<dyn ResourceResolver>>,
    views: Option<Box<dyn ViewResolver>>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(routes: RouteTable) -> Self {
        Self::from_shared(Arc::new(routes))
    }

    pub fn from_shared(routes: Arc<RouteTable>) -> Self {
        Self {
            routes,
            binder: Binder::new(),
            resources: None,
            views: None,
            config: DispatcherConfig::default(),
        }
    }

    /// Apply settings. A configured static root installs a
    /// [`StaticDirectory`] unless a resolver is already set.
    pub fn with_config(mut self, config: DispatcherConfig) -> Self {
        if self.resources.is_none() {
            if let Some(root) = &config.static_root {
                self.resources = Some(Box::new(StaticDirectory::new(root.clone())));
            }
        }
        self.config = config;
        self
    }

    pub fn with_binder(mut self, binder: Binder) -> Self {
        self.binder = binder;
        self
    }

    pub fn with_resource_resolver(mut self, resolver: impl ResourceResolver + 'static) -> Self {
        self.resources = Some(Box::new(resolver));
        self
    }

    pub fn with_view_resolver(mut self, resolver: impl ViewResolver + 'static) -> Self {
        self.views = Some(Box::new(resolver));
        self
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Dispatch one request. Never fails: every error becomes a response.
    pub fn dispatch(&self, mut request: HttpRequest) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4();
        let span = info_span!(
            "dispatch",
            method = %request.method,
            path = %request.path,
            request_id = %request_id
        );
        let _enter = span.enter();

        if let Some(resolver) = &self.resources {
            if let Some(response) = resolver.resolve(&request) {
                debug!(status = response.status, "Served static resource");
                return response;
            }
        }

        let format = ResponseFormat::negotiate(&request);

        let (route, path_params) = match self.routes.lookup(&request.path, &request.method) {
            RouteMatch::Found(route, params) => (route, params),
            RouteMatch::NotFound => {
                return render_error(&Error::RouteNotFound(request.path.clone()), format);
            }
            RouteMatch::MethodNotAllowed(allowed) => {
                let err = Error::MethodNotAllowed {
                    path: request.path.clone(),
                    allowed,
                };
                return render_error(&err, format);
            }
        };
        request.path_params = path_params;

        if let Err(err) = authorize(
            route.auth.as_ref(),
            request.session.as_ref(),
            &self.config.session_keys,
        ) {
            warn!(handler = %route.name, error = %err, "Access denied");
            return render_error(&err, format);
        }

        let args = self.bind_arguments(route, &request);
        let mut response = HttpResponse::ok();

        match invoke(route, &request, &mut response, args) {
            Ok(result) => self.render(route, result, request, response, format),
            Err(err) => {
                error!(handler = %route.name, error = %err, "Handler failed");
                render_error(&err, format)
            }
        }
    }

    /// Resolve every declared parameter of a route.
    fn bind_arguments(&self, route: &RouteDescriptor, request: &HttpRequest) -> Arguments {
        let mut args = Arguments::new();
        for spec in &route.params {
            let key = spec.key();
            let argument = match &spec.kind {
                ParamKind::Request => Argument::Request,
                ParamKind::Response => Argument::Response,
                // declared name first, then the alias
                ParamKind::Upload => Argument::Upload(
                    request
                        .upload(&spec.name)
                        .or_else(|| spec.alias.as_deref().and_then(|alias| request.upload(alias)))
                        .cloned(),
                ),
                ParamKind::UploadMap => Argument::UploadMap(
                    request
                        .uploads
                        .iter()
                        .map(|upload| (upload.field_name.clone(), upload.clone()))
                        .collect(),
                ),
                ParamKind::UploadList => Argument::UploadList(request.uploads.clone()),
                ParamKind::Bound(ty) if ty.is_scalar_like() => {
                    match request.path_params.get(key) {
                        Some(raw) => Argument::Value(self.binder.convert(ty, Some(raw), key)),
                        None => Argument::Value(self.binder.bind(ty, &request.params, key)),
                    }
                }
                ParamKind::Bound(ty) => Argument::Value(self.binder.bind(ty, &request.params, key)),
            };
            args.push(spec.name.clone(), argument);
        }
        args
    }

    fn render(
        &self,
        route: &RouteDescriptor,
        result: HandlerResult,
        mut request: HttpRequest,
        mut response: HttpResponse,
        format: ResponseFormat,
    ) -> HttpResponse {
        if route.produces_json {
            let envelope = match result {
                HandlerResult::Envelope(envelope) => envelope,
                HandlerResult::View(view) => JsonResponse::standard(view.json_data()),
                HandlerResult::Text(text) => JsonResponse::standard(serde_json::Value::String(text)),
                HandlerResult::Value(value) => JsonResponse::standard(value),
                HandlerResult::Empty => JsonResponse::standard(serde_json::Value::Null),
            };
            return match write_envelope(response, &envelope) {
                Ok(response) => response,
                Err(err) => {
                    error!(handler = %route.name, error = %err, "JSON rendering failed");
                    render_error(&err, ResponseFormat::Json)
                }
            };
        }

        match result {
            HandlerResult::View(view) => {
                let Some(views) = &self.views else {
                    let err = Error::View(format!("No view resolver for '{}'", view.view));
                    error!(handler = %route.name, error = %err, "View rendering failed");
                    return render_error(&err, format);
                };
                for (key, value) in view.model {
                    request.set_attribute(key, value);
                }
                if let Err(err) = views.forward(&view.view, &request, &mut response) {
                    error!(handler = %route.name, view = %view.view, error = %err, "View rendering failed");
                    return render_error(&err, format);
                }
                response
            }
            HandlerResult::Envelope(envelope) => match write_envelope(response, &envelope) {
                Ok(response) => response,
                Err(err) => render_error(&err, ResponseFormat::Json),
            },
            HandlerResult::Text(text) => {
                set_default_content_type(&mut response, HTML_CONTENT_TYPE);
                response.set_body(text);
                response
            }
            HandlerResult::Value(value) => {
                let text = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                set_default_content_type(&mut response, TEXT_CONTENT_TYPE);
                response.set_body(text);
                response
            }
            HandlerResult::Empty => response,
        }
    }
}

/// Run the handler; returned errors and panics both become `Error::Handler`.
fn invoke(
    route: &RouteDescriptor,
    request: &HttpRequest,
    response: &mut HttpResponse,
    args: Arguments,
) -> Result<HandlerResult, Error> {
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let mut ctx = HandlerContext::new(request, response);
        route.handler.call(&mut ctx, args)
    }));

    match outcome {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(err)) => Err(Error::Handler {
            handler: route.name.clone(),
            message: error_chain(&err),
        }),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(Error::Handler {
                handler: route.name.clone(),
                message: format!("panicked: {}", message),
            })
        }
    }
}

fn write_envelope(mut response: HttpResponse, envelope: &JsonResponse) -> Result<HttpResponse, Error> {
    let body = serde_json::to_vec(envelope)?;
    if !envelope.is_success() && response.status == 200 {
        response.status = envelope.code;
    }
    response.set_header("Content-Type", JSON_CONTENT_TYPE);
    response.set_header("Cache-Control", NO_CACHE);
    response.set_body(body);
    Ok(response)
}

fn set_default_content_type(response: &mut HttpResponse, content_type: &str) {
    if response.header("content-type").is_none() {
        response.set_header("Content-Type", content_type);
    }
}

/// Render a failure in the negotiated representation.
pub fn render_error(err: &Error, format: ResponseFormat) -> HttpResponse {
    let status = err.http_status();
    let mut response = HttpResponse::with_status(status);

    let allowed = match err {
        Error::MethodNotAllowed { allowed, .. } => {
            response.set_header("Allow", allowed.join(", "));
            Some(allowed)
        }
        _ => None,
    };

    if format.is_json() {
        let mut envelope = JsonResponse::error(err.public_message(), status.code());
        if let Some(allowed) = allowed {
            envelope = envelope.with_meta("allowedMethods", allowed);
        }
        let body = serde_json::to_vec(&envelope).unwrap_or_else(|_| {
            format!(
                r#"{{"status":"error","code":{},"data":null,"message":null,"meta":{{}}}}"#,
                status.code()
            )
            .into_bytes()
        });
        response.set_header("Content-Type", JSON_CONTENT_TYPE);
        response.set_header("Cache-Control", NO_CACHE);
        response.set_body(body);
        return response;
    }

    let mut page = format!(
        "<h1>{} - {}</h1><p>{}</p>",
        status.code(),
        status.reason(),
        escape_html(&err.public_message())
    );
    if status.is_server_error() {
        page.push_str(&format!("<pre>{}</pre>", escape_html(&error_chain(err))));
    }
    response.set_header("Content-Type", HTML_CONTENT_TYPE);
    response.set_body(page);
    response
}

/// An error and its sources, one per line
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut chain = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        chain.push_str("\ncaused by: ");
        chain.push_str(&cause.to_string());
        source = cause.source();
    }
    chain
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
