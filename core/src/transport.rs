//! The two `reqwest` request builders behind one interface.
//!
//! Both interfaces prepare requests through the same code path
//! ([`crate::request::prepare`]); only the builder flavour differs. The
//! methods map one to one onto `reqwest`'s own builder methods, so
//! encoding, auth headers and query handling stay the transport's.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, Url};

use crate::error::Result;
use crate::request::{Part, PartValue};

pub(crate) trait TransportBuilder: Sized {
    type Request: TransportRequest;

    fn header(self, name: &str, value: &str) -> Self;
    fn query(self, pairs: &[(String, String)]) -> Self;
    fn basic_auth(self, username: &str, password: Option<&str>) -> Self;
    fn bearer_auth(self, token: &str) -> Self;
    fn json(self, value: &serde_json::Value) -> Self;
    fn form(self, fields: &[(String, String)]) -> Self;
    fn body(self, bytes: Bytes) -> Self;
    fn multipart(self, parts: &[Part]) -> Result<Self>;
    fn timeout(self, timeout: Duration) -> Self;
    fn build(self) -> reqwest::Result<Self::Request>;
}

/// A built request, before it is handed to the client.
pub(crate) trait TransportRequest {
    fn url(&self) -> &Url;
    fn method(&self) -> &Method;
    fn headers(&self) -> &HeaderMap;
    fn headers_mut(&mut self) -> &mut HeaderMap;
    /// `None` for streamed bodies (multipart) and when there is no body.
    fn body_bytes(&self) -> Option<&[u8]>;
}

macro_rules! impl_transport {
    ($builder:ty, $request:ty, [$($multipart:ident)::+]) => {
        impl TransportBuilder for $builder {
            type Request = $request;

            fn header(self, name: &str, value: &str) -> Self {
                <$builder>::header(self, name, value)
            }

            fn query(self, pairs: &[(String, String)]) -> Self {
                <$builder>::query(self, pairs)
            }

            fn basic_auth(self, username: &str, password: Option<&str>) -> Self {
                <$builder>::basic_auth(self, username, password)
            }

            fn bearer_auth(self, token: &str) -> Self {
                <$builder>::bearer_auth(self, token)
            }

            fn json(self, value: &serde_json::Value) -> Self {
                <$builder>::json(self, value)
            }

            fn form(self, fields: &[(String, String)]) -> Self {
                <$builder>::form(self, fields)
            }

            fn body(self, bytes: Bytes) -> Self {
                <$builder>::body(self, bytes)
            }

            fn multipart(self, parts: &[Part]) -> Result<Self> {
                use reqwest::$($multipart)::+::{Form, Part as FormPart};

                let mut form = Form::new();
                for part in parts {
                    form = match &part.value {
                        PartValue::Text(text) => form.text(part.name.clone(), text.clone()),
                        PartValue::File {
                            file_name,
                            bytes,
                            content_type,
                        } => {
                            let file = FormPart::bytes(bytes.to_vec())
                                .file_name(file_name.clone())
                                .mime_str(content_type)?;
                            form.part(part.name.clone(), file)
                        }
                    };
                }
                Ok(<$builder>::multipart(self, form))
            }

            fn timeout(self, timeout: Duration) -> Self {
                <$builder>::timeout(self, timeout)
            }

            fn build(self) -> reqwest::Result<Self::Request> {
                <$builder>::build(self)
            }
        }

        impl TransportRequest for $request {
            fn url(&self) -> &Url {
                <$request>::url(self)
            }

            fn method(&self) -> &Method {
                <$request>::method(self)
            }

            fn headers(&self) -> &HeaderMap {
                <$request>::headers(self)
            }

            fn headers_mut(&mut self) -> &mut HeaderMap {
                <$request>::headers_mut(self)
            }

            fn body_bytes(&self) -> Option<&[u8]> {
                <$request>::body(self).and_then(|body| body.as_bytes())
            }
        }
    };
}

impl_transport!(reqwest::RequestBuilder, reqwest::Request, [multipart]);
impl_transport!(
    reqwest::blocking::RequestBuilder,
    reqwest::blocking::Request,
    [blocking::multipart]
);
