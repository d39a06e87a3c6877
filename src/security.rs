use actix_web::dev::{Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{Error, http::header};
use futures_util::future::{LocalBoxFuture, ready, Ready};
use std::rc::Rc;

/// Pages pull Font Awesome and Vazirmatn from jsDelivr.
const DEFAULT_CSP: &str = "default-src 'self'; img-src 'self' data:; style-src 'self' 'unsafe-inline' https://cdn.jsdelivr.net; \
font-src 'self' https://cdn.jsdelivr.net; script-src 'self'; object-src 'none'; base-uri 'self'; frame-ancestors 'none'; form-action 'self'";

const HSTS: &str = "max-age=63072000; includeSubDomains; preload";

/// Adds browser hardening headers unless a handler already set them.
#[derive(Clone)]
pub struct SecurityHeaders {
    pub enable_hsts: bool,
    pub content_security_policy: String,
}

impl Default for SecurityHeaders {
    fn default() -> Self {
        Self { enable_hsts: false, content_security_policy: DEFAULT_CSP.to_string() }
    }
}

impl SecurityHeaders {
    pub fn from_env() -> Self {
        let enable_hsts = std::env::var("ENABLE_HSTS").map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false);
        Self { enable_hsts, ..Self::default() }
    }

    pub fn with_hsts(mut self, enable: bool) -> Self {
        self.enable_hsts = enable;
        self
    }

    pub fn with_csp(mut self, policy: impl Into<String>) -> Self {
        self.content_security_policy = policy.into();
        self
    }

    fn headers(&self) -> Vec<(header::HeaderName, header::HeaderValue)> {
        let mut out = vec![
            (header::REFERRER_POLICY, header::HeaderValue::from_static("same-origin")),
            (header::X_CONTENT_TYPE_OPTIONS, header::HeaderValue::from_static("nosniff")),
            (header::X_FRAME_OPTIONS, header::HeaderValue::from_static("DENY")),
        ];
        match header::HeaderValue::from_str(&self.content_security_policy) {
            Ok(v) => out.push((header::CONTENT_SECURITY_POLICY, v)),
            Err(_) => log::warn!("ignoring content security policy with invalid header characters"),
        }
        if self.enable_hsts {
            out.push((header::STRICT_TRANSPORT_SECURITY, header::HeaderValue::from_static(HSTS)));
        }
        out
    }
}

impl<S, B> Transform<S, ServiceRequest> for SecurityHeaders
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SecurityHeadersMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SecurityHeadersMiddleware {
            service: Rc::new(service),
            headers: Rc::new(self.headers()),
        }))
    }
}

pub struct SecurityHeadersMiddleware<S> {
    service: Rc<S>,
    headers: Rc<Vec<(header::HeaderName, header::HeaderValue)>>,
}

impl<S, B> Service<ServiceRequest> for SecurityHeadersMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let svc = self.service.clone();
        let headers = self.headers.clone();
        Box::pin(async move {
            let mut res = svc.call(req).await?;
            let out = res.response_mut().headers_mut();
            for (name, value) in headers.iter() {
                if !out.contains_key(name) {
                    out.insert(name.clone(), value.clone());
                }
            }
            Ok(res)
        })
    }
}
