// Route table: ordered route descriptors and method-aware lookup

use crate::guard::AuthPolicy;
use crate::handler::{Arguments, Handler, HandlerContext, HandlerResult, ParamSpec};
use crate::logging::{debug, info};
use crate::pattern::{PathParams, PathPattern};
use crate::{Error, HttpMethod};
use std::fmt;
use std::sync::Arc;

/// A registered route. Immutable once built.
#[derive(Clone)]
pub struct RouteDescriptor {
    pub pattern: PathPattern,
    pub method: HttpMethod,
    pub handler: Arc<dyn Handler>,
    /// Handler name used in logs
    pub name: String,
    pub auth: Option<AuthPolicy>,
    pub produces_json: bool,
    /// Declared handler parameters, in call order
    pub params: Vec<ParamSpec>,
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("pattern", &self.pattern.template())
            .field("method", &self.method)
            .field("name", &self.name)
            .field("auth", &self.auth)
            .field("produces_json", &self.produces_json)
            .field("params", &self.params)
            .finish()
    }
}

/// Builder for [`RouteDescriptor`].
///
/// ```
/// use girder_core::{HandlerResult, ParamSpec, RouteBuilder, RouteTable};
///
/// let mut table = RouteTable::new();
/// table
///     .add(
///         RouteBuilder::get("/dept/{id}", |_ctx, args| {
///             Ok(HandlerResult::text(format!("dept {}", args.value::<i64>("id").unwrap_or(0))))
///         })
///         .name("DeptController::show")
///         .param(ParamSpec::of::<i64>("id")),
///     )
///     .unwrap();
/// assert!(table.find("/dept/42", "GET").is_some());
/// ```
pub struct RouteBuilder {
    template: String,
    method: HttpMethod,
    handler: Arc<dyn Handler>,
    name: Option<String>,
    auth: Option<AuthPolicy>,
    produces_json: bool,
    params: Vec<ParamSpec>,
}

impl RouteBuilder {
    pub fn new<F>(method: HttpMethod, template: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut HandlerContext<'_>, Arguments) -> Result<HandlerResult, Error>
            + Send
            + Sync
            + 'static,
    {
        Self::with_handler(method, template, Arc::new(handler))
    }

    /// Use an already shared handler, e.g. one implemented on a struct.
    pub fn with_handler(
        method: HttpMethod,
        template: impl Into<String>,
        handler: Arc<dyn Handler>,
    ) -> Self {
        Self {
            template: template.into(),
            method,
            handler,
            name: None,
            auth: None,
            produces_json: false,
            params: Vec::new(),
        }
    }

    pub fn get<F>(template: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut HandlerContext<'_>, Arguments) -> Result<HandlerResult, Error>
            + Send
            + Sync
            + 'static,
    {
        Self::new(HttpMethod::GET, template, handler)
    }

    pub fn post<F>(template: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut HandlerContext<'_>, Arguments) -> Result<HandlerResult, Error>
            + Send
            + Sync
            + 'static,
    {
        Self::new(HttpMethod::POST, template, handler)
    }

    pub fn put<F>(template: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut HandlerContext<'_>, Arguments) -> Result<HandlerResult, Error>
            + Send
            + Sync
            + 'static,
    {
        Self::new(HttpMethod::PUT, template, handler)
    }

    pub fn delete<F>(template: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut HandlerContext<'_>, Arguments) -> Result<HandlerResult, Error>
            + Send
            + Sync
            + 'static,
    {
        Self::new(HttpMethod::DELETE, template, handler)
    }

    pub fn any<F>(template: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut HandlerContext<'_>, Arguments) -> Result<HandlerResult, Error>
            + Send
            + Sync
            + 'static,
    {
        Self::new(HttpMethod::ANY, template, handler)
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn auth(mut self, policy: AuthPolicy) -> Self {
        self.auth = Some(policy);
        self
    }

    /// Render results as the JSON envelope
    pub fn json(mut self) -> Self {
        self.produces_json = true;
        self
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn params(mut self, specs: impl IntoIterator<Item = ParamSpec>) -> Self {
        self.params.extend(specs);
        self
    }

    /// Compile the template and freeze the descriptor.
    pub fn build(self) -> Result<RouteDescriptor, Error> {
        let pattern = PathPattern::compile(&self.template)?;
        let name = self
            .name
            .unwrap_or_else(|| format!("{} {}", self.method, self.template));

        Ok(RouteDescriptor {
            pattern,
            method: self.method,
            handler: self.handler,
            name,
            auth: self.auth,
            produces_json: self.produces_json,
            params: self.params,
        })
    }
}

/// Outcome of a method-aware lookup.
#[derive(Debug)]
pub enum RouteMatch<'a> {
    Found(&'a RouteDescriptor, PathParams),
    /// The path matched, the verb did not. Carries the `Allow` verbs.
    MethodNotAllowed(Vec<String>),
    NotFound,
}

/// Ordered route table. Built once at startup, read-only afterwards.
#[derive(Debug, Default, Clone)]
pub struct RouteTable {
    routes: Vec<RouteDescriptor>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a descriptor. Duplicates are kept; the earlier one wins lookups.
    pub fn register(&mut self, descriptor: RouteDescriptor) {
        info!(
            pattern = %descriptor.pattern,
            method = %descriptor.method,
            handler = %descriptor.name,
            json = descriptor.produces_json,
            "Mapped route"
        );
        self.routes.push(descriptor);
    }

    /// Build and register in one step
    pub fn add(&mut self, builder: RouteBuilder) -> Result<&mut Self, Error> {
        self.register(builder.build()?);
        Ok(self)
    }

    /// First descriptor, in registration order, matching both path and verb.
    pub fn find(&self, path: &str, method: &str) -> Option<&RouteDescriptor> {
        self.routes
            .iter()
            .find(|route| route.method.accepts(method) && route.pattern.matches(path))
    }

    /// Every descriptor whose pattern matches the path, regardless of verb.
    pub fn find_all_matching_path(&self, path: &str) -> Vec<&RouteDescriptor> {
        self.routes
            .iter()
            .filter(|route| route.pattern.matches(path))
            .collect()
    }

    /// Distinct verbs registered for a path, in first-seen order.
    pub fn allowed_methods(&self, path: &str) -> Vec<String> {
        let mut allowed: Vec<String> = Vec::new();
        for route in self.find_all_matching_path(path) {
            let verb = route.method.as_str().to_string();
            if !allowed.contains(&verb) {
                allowed.push(verb);
            }
        }
        allowed
    }

    /// Resolve a request to a route, a 405 verb list, or nothing.
    pub fn lookup(&self, path: &str, method: &str) -> RouteMatch<'_> {
        if let Some(route) = self.find(path, method) {
            let params = route.pattern.extract(path).unwrap_or_default();
            debug!(path, method, handler = %route.name, "Route matched");
            return RouteMatch::Found(route, params);
        }

        let allowed = self.allowed_methods(path);
        if allowed.is_empty() {
            debug!(path, method, "No route for path");
            RouteMatch::NotFound
        } else {
            debug!(path, method, allowed = ?allowed, "Method not allowed");
            RouteMatch::MethodNotAllowed(allowed)
        }
    }

    pub fn routes(&self) -> &[RouteDescriptor] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
