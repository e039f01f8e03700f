//! Request ID middleware
//!
//! 为每个请求分配 ID（优先沿用上游代理传入的 X-Request-ID），并注入到 tracing span 中，
//! 地理解析和重定向日志都能按请求关联。

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{HeaderName, HeaderValue},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use tracing::{Instrument, info_span};
use uuid::Uuid;

use crate::utils::ip::extract_client_ip;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// 请求 ID 类型，可从 request extensions 中提取
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Reuse an inbound ID when it is short and printable, otherwise mint a UUID v4
    pub fn from_inbound(value: Option<&HeaderValue>) -> Self {
        let inbound = value
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty() && v.len() <= 128)
            .filter(|v| v.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        match inbound {
            Some(id) => RequestId(id.to_string()),
            None => RequestId(Uuid::new_v4().to_string()),
        }
    }
}

/// Request ID 中间件工厂
#[derive(Clone, Default)]
pub struct RequestIdMiddleware;

impl<S, B> Transform<S, ServiceRequest> for RequestIdMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestIdService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestIdService {
            service: Rc::new(service),
        }))
    }
}

pub struct RequestIdService<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for RequestIdService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
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
        let srv = self.service.clone();

        let request_id = RequestId::from_inbound(req.headers().get(REQUEST_ID_HEADER));
        let client_ip = extract_client_ip(req.headers());

        let span = info_span!(
            "request",
            request_id = %request_id.0,
            client_ip = %client_ip,
            method = %req.method(),
            path = %req.path(),
        );

        req.extensions_mut().insert(request_id.clone());

        Box::pin(
            async move {
                let mut response = srv.call(req).await?;

                if let Ok(header_value) = HeaderValue::from_str(&request_id.0) {
                    response
                        .headers_mut()
                        .insert(HeaderName::from_static(REQUEST_ID_HEADER), header_value);
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inbound_id_reused() {
        let value = HeaderValue::from_static("edge-4f2a_01");
        assert_eq!(RequestId::from_inbound(Some(&value)).0, "edge-4f2a_01");
    }

    #[test]
    fn test_bad_inbound_id_replaced() {
        let value = HeaderValue::from_static("not ok; injected");
        let id = RequestId::from_inbound(Some(&value));
        assert!(Uuid::parse_str(&id.0).is_ok());

        let id = RequestId::from_inbound(None);
        assert!(Uuid::parse_str(&id.0).is_ok());
    }
}
