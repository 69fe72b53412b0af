use crate::{
    data::{Headers, RequestData, ResponseData},
    error::Error,
    util,
};
use async_trait::async_trait;
use hyper::{body, client::HttpConnector, Body, Client, Request};
use hyper_tls::HttpsConnector;
use std::fmt::Debug;

/// Transport used to send a request and collect the complete response.
#[async_trait]
pub trait HttpClient: Debug {
    async fn send(&self, request: &RequestData) -> Result<ResponseData, Error>;
}

#[derive(Debug)]
pub struct HyperHttpClient {
    client: Client<HttpsConnector<HttpConnector>>,
}

impl HyperHttpClient {
    pub fn new() -> Self {
        Self {
            client: Client::builder().build(HttpsConnector::new()),
        }
    }
}

#[async_trait]
impl HttpClient for HyperHttpClient {
    async fn send(&self, request_data: &RequestData) -> Result<ResponseData, Error> {
        let mut request_builder = Request::builder()
            .uri(request_data.url.as_str())
            .method(request_data.method.as_str());

        if let Some(headers_mut) = request_builder.headers_mut() {
            util::put_headers(
                headers_mut,
                request_data
                    .headers
                    .iter()
                    .filter(|(header_name, _)| *header_name != "host"),
            )?;
        }

        let body = match &request_data.body {
            Some(bytes) => Body::from(bytes.clone()),
            None => Body::empty(),
        };
        let request: Request<Body> = request_builder.body(body)?;

        let response = self.client.request(request).await?;

        let status_code = response.status().as_u16();
        let headers: Headers = util::extract_headers(response.headers());
        let body = body::to_bytes(response.into_body()).await?;

        Ok(ResponseData {
            status_code,
            headers,
            body,
        })
    }
}

impl Default for HyperHttpClient {
    fn default() -> Self {
        Self::new()
    }
}
