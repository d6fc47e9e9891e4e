use axum::{extract::Request, middleware::Next, response::Response};
use axum_extra::extract::cookie::CookieJar;
use tracing::trace;

/// Parse the `Cookie` header once and store the jar in request extensions.
///
/// Downstream handlers read it with `Extension<CookieJar>`.
pub async fn parse_cookies(mut request: Request, next: Next) -> Response {
    let jar = CookieJar::from_headers(request.headers());
    trace!(count = jar.iter().count(), "cookies parsed");
    request.extensions_mut().insert(jar);
    next.run(request).await
}
