//! Method + path routing over the adapter's request/response model.
//!
//! The [`Router`] is the middleware chain deployed behind the invocation
//! adapter: it runs the first matching route, forwards a route error to the
//! error continuation, and falls through to the continuation (404) when
//! nothing matches.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use storefront_adapter_core::{
    BoxError, CanonicalRequest, ErrorContinuation, MiddlewareChain, ResponseEmulator,
};

pub type RouteFuture = Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send>>;

type RouteHandler =
    Arc<dyn Fn(Arc<CanonicalRequest>, ResponseEmulator) -> RouteFuture + Send + Sync>;

#[derive(Clone)]
struct Route {
    method: String,
    path: String,
    handler: RouteHandler,
}

impl Route {
    fn matches(&self, method: &str, path: &str) -> bool {
        self.method.eq_ignore_ascii_case(method) && self.path == path
    }
}

#[derive(Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
    mount_alias: Option<(String, String)>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route<F, Fut>(mut self, method: &str, path: &str, handler: F) -> Self
    where
        F: Fn(Arc<CanonicalRequest>, ResponseEmulator) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.routes.push(Route {
            method: method.to_ascii_uppercase(),
            path: trim_trailing_slash(path).to_string(),
            handler: Arc::new(
                move |request: Arc<CanonicalRequest>, response: ResponseEmulator| -> RouteFuture {
                    Box::pin(handler(request, response))
                },
            ),
        });
        self
    }

    pub fn get<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Arc<CanonicalRequest>, ResponseEmulator) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.route("GET", path, handler)
    }

    pub fn post<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Arc<CanonicalRequest>, ResponseEmulator) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.route("POST", path, handler)
    }

    /// Serves paths under `mounted` as if they were under `canonical`, e.g.
    /// `/.netlify/functions/api/ping` as `/api/ping`.
    pub fn with_mount_alias(mut self, mounted: &str, canonical: &str) -> Self {
        self.mount_alias = Some((
            trim_trailing_slash(mounted).to_string(),
            trim_trailing_slash(canonical).to_string(),
        ));
        self
    }

    fn resolve_path(&self, path: &str) -> String {
        let path = trim_trailing_slash(path);
        if let Some((mounted, canonical)) = &self.mount_alias {
            if let Some(rest) = path.strip_prefix(mounted.as_str()) {
                if rest.is_empty() || rest.starts_with('/') {
                    return format!("{canonical}{rest}");
                }
            }
        }
        path.to_string()
    }

    fn find(&self, method: &str, path: &str) -> Option<&Route> {
        let path = self.resolve_path(path);
        self.routes
            .iter()
            .find(|candidate| candidate.matches(method, &path))
    }
}

impl MiddlewareChain for Router {
    async fn handle(
        &self,
        request: Arc<CanonicalRequest>,
        response: ResponseEmulator,
        next: ErrorContinuation,
    ) {
        let Some(route) = self.find(request.method(), request.path()) else {
            next.pass();
            return;
        };

        let handler = Arc::clone(&route.handler);
        if let Err(error) = handler(request, response).await {
            next.fail(error);
        }
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}
