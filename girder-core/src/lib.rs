// Core library for the Girder dispatch layer
// Path patterns, the route table, the argument binder and the dispatcher,
// plus a hyper adapter to serve them.

pub mod application;
pub mod binding;
pub mod content_negotiation;
pub mod dispatcher;
pub mod error;
pub mod form;
pub mod guard;
pub mod handler;
pub mod http;
pub mod json;
pub mod logging;
pub mod params;
pub mod pattern;
pub mod routing;
pub mod session;
pub mod static_assets;
pub mod status;
pub mod view;

// Re-export commonly used types
pub use application::Application;
pub use binding::{Bindable, Binder, BinderConfig, ConversionTable, ScalarType, TemporalType, TypeDescriptor, Value};
pub use content_negotiation::ResponseFormat;
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use error::*;
pub use form::{MultipartForm, MultipartParser, UploadLimits, UploadedFile};
pub use guard::{authorize, AuthPolicy, SessionKeys};
pub use handler::{Argument, Arguments, Handler, HandlerContext, HandlerResult, ParamKind, ParamSpec};
pub use crate::http::*;
pub use json::JsonResponse;
pub use params::ParameterSpace;
pub use pattern::{PathParams, PathPattern};
pub use routing::{RouteBuilder, RouteDescriptor, RouteMatch, RouteTable};
pub use session::Session;
pub use static_assets::{CacheStrategy, ResourceResolver, StaticDirectory};
pub use status::*;
pub use view::{ModelView, ViewResolver};
