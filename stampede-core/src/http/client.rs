use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::{BodyExt as _, Full};
use hyper::Request;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;

use super::{
    DEFAULT_REQUEST_TIMEOUT, Error, HttpRequest, HttpResponse, Result, has_header,
    host_header_value,
};

/// Pooled plain-HTTP client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client<HttpConnector, Full<Bytes>>,
    default_timeout: Duration,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl HttpClient {
    /// `default_timeout` applies to requests that don't carry their own.
    pub fn new(default_timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.enforce_http(false);
        connector.set_nodelay(true);

        let inner = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            inner,
            default_timeout,
        }
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    pub async fn request(&self, req: HttpRequest) -> Result<HttpResponse> {
        let timeout = req.timeout.unwrap_or(self.default_timeout);
        let parsed = url::Url::parse(&req.url).map_err(|_| Error::InvalidUrl(req.url.clone()))?;
        if parsed.scheme() != "http" {
            return Err(Error::OnlyHttpSupported(req.url));
        }

        let uri: hyper::Uri = req
            .url
            .parse()
            .map_err(|_| Error::InvalidUrl(req.url.clone()))?;

        let mut builder = Request::builder().method(req.method).uri(uri);
        if !has_header(&req.headers, "host")
            && let Some(host) = host_header_value(&parsed)
        {
            builder = builder.header(http::header::HOST, host);
        }
        for (k, v) in req.headers {
            let name = http::header::HeaderName::from_bytes(k.as_bytes())?;
            let value = http::header::HeaderValue::from_str(&v)?;
            builder = builder.header(name, value);
        }
        let req: Request<Full<Bytes>> = builder.body(Full::new(req.body))?;

        let started = Instant::now();

        // The deadline covers the response head and the body read.
        let exchange = async {
            let res = self.inner.request(req).await?;
            let (parts, body) = res.into_parts();
            let body = body.collect().await?.to_bytes();
            Ok::<_, Error>((parts.status.as_u16(), body))
        };

        let (status, body) = match tokio::time::timeout(timeout, exchange).await {
            Ok(res) => res?,
            Err(_) => return Err(Error::Timeout(timeout)),
        };

        Ok(HttpResponse {
            status,
            body,
            elapsed: started.elapsed(),
        })
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.request(HttpRequest::get(url)).await
    }

    pub async fn post(
        &self,
        url: &str,
        body: impl Into<Bytes>,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse> {
        let mut req = HttpRequest::post(url, body);
        for (k, v) in headers {
            req = req.header(*k, *v);
        }
        self.request(req).await
    }

    pub async fn put(
        &self,
        url: &str,
        body: impl Into<Bytes>,
        headers: &[(&str, &str)],
    ) -> Result<HttpResponse> {
        let mut req = HttpRequest::put(url, body);
        for (k, v) in headers {
            req = req.header(*k, *v);
        }
        self.request(req).await
    }

    pub async fn delete(&self, url: &str) -> Result<HttpResponse> {
        self.request(HttpRequest::delete(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_http_urls() {
        let client = HttpClient::default();
        match client.get("https://example.com/").await {
            Err(Error::OnlyHttpSupported(url)) => assert_eq!(url, "https://example.com/"),
            other => panic!("expected OnlyHttpSupported, got {other:?}"),
        }
        assert!(matches!(
            client.get("not a url").await,
            Err(Error::InvalidUrl(_))
        ));
    }
}
