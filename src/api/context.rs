use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use axum::{
    async_trait,
    extract::{ConnectInfo, Form, FromRequest, Query, Request},
    http::{header, uri::Authority, HeaderMap, Method, Uri},
};

use crate::error::AppError;

/// Everything a handler may look at for one request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Query parameters, overridden by urlencoded form fields on POST.
    pub params: HashMap<String, String>,
    pub remote_addr: Option<IpAddr>,
    pub headers: HeaderMap,
    pub uri: Uri,
}

impl RequestContext {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// `scheme://host:port/dir` of this request, where `dir` is the path up to its last `/`.
    pub fn base_url(&self, scheme: &str, fallback_host: &str, fallback_port: u16) -> String {
        let authority = self
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Authority::from_str(v).ok())
            .or_else(|| self.uri.authority().cloned());

        let (host, port) = match &authority {
            Some(authority) => (
                authority.host().to_string(),
                authority.port_u16().unwrap_or(fallback_port),
            ),
            None => (fallback_host.to_string(), fallback_port),
        };

        let path = self.uri.path();
        let dir = &path[..path.rfind('/').unwrap_or(0)];

        format!("{}://{}:{}{}", scheme, host, port, dir)
    }
}

#[async_trait]
impl<S> FromRequest<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());
        let headers = request.headers().clone();
        let uri = request.uri().clone();

        let mut params = Query::<HashMap<String, String>>::try_from_uri(&uri)
            .map(|Query(q)| q)
            .unwrap_or_default();

        if request.method() == Method::POST {
            // Non-form bodies carry no parameters.
            if let Ok(Form(fields)) = Form::<HashMap<String, String>>::from_request(request, state).await {
                params.extend(fields);
            }
        }

        Ok(Self {
            params,
            remote_addr,
            headers,
            uri,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::HeaderValue;

    fn context(uri: &str, host: Option<&str>) -> RequestContext {
        let mut headers = HeaderMap::new();
        if let Some(host) = host {
            headers.insert(header::HOST, HeaderValue::from_str(host).unwrap());
        }
        RequestContext {
            params: HashMap::new(),
            remote_addr: None,
            headers,
            uri: uri.parse().unwrap(),
        }
    }

    #[test]
    fn test_base_url_from_host_header() {
        let ctx = context("/tts?text=hi", Some("speaker.local:8080"));
        assert_eq!(ctx.base_url("http", "0.0.0.0", 3000), "http://speaker.local:8080");
    }

    #[test]
    fn test_base_url_keeps_request_dir() {
        let ctx = context("/companion/tts", Some("speaker.local"));
        assert_eq!(
            ctx.base_url("https", "0.0.0.0", 3000),
            "https://speaker.local:3000/companion"
        );
    }

    #[test]
    fn test_base_url_without_host() {
        let ctx = context("/tts", None);
        assert_eq!(ctx.base_url("http", "10.0.0.5", 3000), "http://10.0.0.5:3000");
    }

    #[tokio::test]
    async fn test_extract_query_and_form() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/tts?text=from+query&voice=Joanna")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("text=from%20body"))
            .unwrap();

        let ctx = RequestContext::from_request(request, &()).await.unwrap();
        assert_eq!(ctx.param("text"), Some("from body"));
        assert_eq!(ctx.param("voice"), Some("Joanna"));
        assert_eq!(ctx.remote_addr, None);
    }

    #[tokio::test]
    async fn test_extract_peer_address() {
        let mut request = Request::builder()
            .uri("/audio?action=list")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 168, 1, 10], 51234))));

        let ctx = RequestContext::from_request(request, &()).await.unwrap();
        assert_eq!(ctx.param("action"), Some("list"));
        assert_eq!(ctx.remote_addr, Some("192.168.1.10".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_extract_ignores_json_body() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/tts")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"text\":\"hi\"}"))
            .unwrap();

        let ctx = RequestContext::from_request(request, &()).await.unwrap();
        assert_eq!(ctx.param("text"), None);
    }
}
