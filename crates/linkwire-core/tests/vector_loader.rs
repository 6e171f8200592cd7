//! JSON test vector loader shared by the envelope tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use base64::Engine as _;
use serde::Deserialize;

use linkwire_core::protocol::Frame;

#[derive(Debug, Deserialize)]
pub struct TestVector {
    pub description: String,
    pub frame: FrameData,
    #[serde(default)]
    pub expect: Option<serde_json::Value>,
    #[serde(default)]
    pub expect_error: Option<ExpectError>,
}

#[derive(Debug, Deserialize)]
pub struct ExpectError {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct FrameData {
    pub encoding: String,
    pub data: String,
}

impl FrameData {
    pub fn to_frame(&self) -> Frame {
        match self.encoding.as_str() {
            "text" => Frame::Text(self.data.clone()),
            "base64" => Frame::Binary(
                base64::engine::general_purpose::STANDARD
                    .decode(&self.data)
                    .expect("invalid base64 in test vector")
                    .into(),
            ),
            other => panic!("unsupported encoding: {other}"),
        }
    }
}
