// Girder - a minimal MVC dispatch layer for Rust
//
// Requests are matched against path patterns, their parameters are bound to
// typed handler arguments, and results are rendered as views or JSON.

// Re-export core functionality
pub use girder_core::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use girder_config;

#[cfg(feature = "testing")]
pub use girder_testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Application, Arguments, AuthPolicy, Bindable, Dispatcher, DispatcherConfig, Error,
        HandlerContext, HandlerResult, HttpMethod, HttpRequest, HttpResponse, JsonResponse,
        ModelView, ParamSpec, RouteBuilder, RouteTable, Session, UploadedFile, ViewResolver,
        bindable, bindable_enum,
    };
}
